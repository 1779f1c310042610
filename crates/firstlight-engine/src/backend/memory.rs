use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::command::{PassCommand, PassRecording};
use crate::device::{AcquireOptions, Device, Surface};
use crate::error::{Error, Result};
use crate::id::ResourceId;
use crate::resource::BufferDescriptor;

use super::{Backend, PipelineRequest};

/// A simulated adapter.
#[derive(Debug, Clone)]
pub struct MemoryAdapter {
    pub name: String,
    pub power_class: wgpu::PowerPreference,
    pub is_fallback: bool,
    pub features: wgpu::Features,
    /// Formats surfaces can be configured with on this adapter.
    pub formats: Vec<wgpu::TextureFormat>,
}

impl Default for MemoryAdapter {
    fn default() -> Self {
        Self {
            name: "memory adapter".to_string(),
            power_class: wgpu::PowerPreference::LowPower,
            is_fallback: false,
            features: wgpu::Features::empty(),
            formats: vec![
                wgpu::TextureFormat::Bgra8Unorm,
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureFormat::Bgra8UnormSrgb,
                wgpu::TextureFormat::Rgba8UnormSrgb,
            ],
        }
    }
}

/// Platform without a GPU. Adapters are plain descriptions; devices keep
/// buffer contents in host memory and log every submitted pass.
#[derive(Debug, Clone)]
pub struct MemoryPlatform {
    enabled: bool,
    adapters: Vec<MemoryAdapter>,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::with_adapters(vec![MemoryAdapter::default()])
    }
}

impl MemoryPlatform {
    pub fn with_adapters(adapters: Vec<MemoryAdapter>) -> Self {
        Self {
            enabled: true,
            adapters,
        }
    }

    /// A platform with no graphics support at all.
    pub fn unsupported() -> Self {
        Self {
            enabled: false,
            adapters: Vec::new(),
        }
    }

    pub fn adapters(&self) -> &[MemoryAdapter] {
        &self.adapters
    }

    pub fn create_surface(&self, width: u32, height: u32) -> Surface<MemoryBackend> {
        Surface::new(MemoryTarget {
            width,
            height,
            format: None,
        })
    }

    /// Picks an adapter the way wgpu does: fallback adapters only when forced,
    /// the requested power class when available, otherwise the first candidate.
    pub async fn acquire_device(&self, options: &AcquireOptions) -> Result<Device<MemoryBackend>> {
        if !self.enabled {
            return Err(Error::PlatformUnsupported);
        }

        let candidates: Vec<&MemoryAdapter> = self
            .adapters
            .iter()
            .filter(|a| !options.force_fallback_adapter || a.is_fallback)
            .collect();
        let adapter = candidates
            .iter()
            .find(|a| a.power_class == options.power_preference)
            .or_else(|| candidates.first())
            .copied()
            .ok_or_else(|| {
                log::warn!("no memory adapter matches {options:?}");
                Error::NoSuitableAdapter {
                    preference: options.power_preference,
                }
            })?;

        if !adapter.features.contains(options.required_features) {
            log::warn!("adapter `{}` refused the device request", adapter.name);
            return Err(Error::DeviceRequestFailed(format!(
                "adapter `{}` does not offer {:?}",
                adapter.name, options.required_features
            )));
        }

        Ok(Device::new(
            options.label.clone(),
            options.required_limits.clone(),
            MemoryBackend {
                adapter: adapter.clone(),
                submissions: Mutex::new(Vec::new()),
            },
        ))
    }
}

/// Buffer contents shared between the buffer and any bind group holding it.
#[derive(Debug, Clone)]
pub struct MemoryBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl MemoryBuffer {
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
pub struct MemoryShader {
    label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MemoryPipeline {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub output_format: wgpu::TextureFormat,
}

#[derive(Debug, Clone)]
pub struct MemoryBindGroup {
    entries: Vec<(u32, MemoryBuffer)>,
}

impl MemoryBindGroup {
    /// Current contents of the buffer bound at `binding`.
    pub fn bound_bytes(&self, binding: u32) -> Option<Vec<u8>> {
        self.entries
            .iter()
            .find(|(b, _)| *b == binding)
            .map(|(_, buffer)| buffer.lock().clone())
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTarget {
    pub width: u32,
    pub height: u32,
    pub format: Option<wgpu::TextureFormat>,
}

#[derive(Debug, Clone)]
pub struct MemoryFrame {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
}

#[derive(Debug, Default)]
pub struct MemoryEncoder {
    label: Option<String>,
    passes: Vec<RecordedPass>,
}

/// One replayed pass command, with objects named by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCommand {
    SetPipeline { pipeline: ResourceId },
    SetVertexBuffer { slot: u32, buffer: ResourceId },
    SetBindGroup { index: u32, group: ResourceId },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPass {
    pub label: Option<String>,
    pub format: wgpu::TextureFormat,
    pub extent: (u32, u32),
    pub clear: wgpu::Color,
    pub commands: Vec<RecordedCommand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub label: Option<String>,
    pub passes: Vec<RecordedPass>,
    pub presented: bool,
}

#[derive(Debug)]
pub struct MemoryBackend {
    adapter: MemoryAdapter,
    submissions: Mutex<Vec<Submission>>,
}

impl MemoryBackend {
    pub fn adapter(&self) -> &MemoryAdapter {
        &self.adapter
    }

    /// Everything submitted so far, oldest first.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Backend for MemoryBackend {
    type Buffer = MemoryBuffer;
    type Shader = MemoryShader;
    type Pipeline = MemoryPipeline;
    type BindGroup = MemoryBindGroup;
    type Target = MemoryTarget;
    type Frame = MemoryFrame;
    type Encoder = MemoryEncoder;

    fn describe(&self) -> String {
        format!("{} ({:?}, in-memory)", self.adapter.name, self.adapter.power_class)
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<MemoryBuffer> {
        let unavailable = |reason: String| {
            Error::Configuration(format!(
                "cannot allocate {} bytes for buffer `{}`: {reason}",
                desc.size,
                desc.label.unwrap_or("unlabelled")
            ))
        };
        let len = usize::try_from(desc.size).map_err(|e| unavailable(e.to_string()))?;
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|e| unavailable(e.to_string()))?;
        bytes.resize(len, 0);

        Ok(MemoryBuffer {
            bytes: Arc::new(Mutex::new(bytes)),
        })
    }

    fn write_buffer(&self, buffer: &MemoryBuffer, offset: u64, data: &[u8]) {
        let mut bytes = buffer.lock();
        let start = offset as usize;
        bytes[start..start + data.len()].copy_from_slice(data);
    }

    fn read_buffer(&self, buffer: &MemoryBuffer) -> Option<Vec<u8>> {
        Some(buffer.lock().clone())
    }

    fn create_shader(&self, label: Option<&str>, _source: &str) -> MemoryShader {
        MemoryShader {
            label: label.map(str::to_string),
        }
    }

    fn create_pipeline(&self, request: &PipelineRequest<'_, Self>) -> Result<MemoryPipeline> {
        log::trace!(
            "memory pipeline from shader `{}`",
            request.shader.label.as_deref().unwrap_or("unlabelled")
        );
        Ok(MemoryPipeline {
            vertex_entry: request.vertex_entry.to_string(),
            fragment_entry: request.fragment_entry.to_string(),
            output_format: request.output_format,
        })
    }

    fn create_bind_group(
        &self,
        _label: Option<&str>,
        _pipeline: &MemoryPipeline,
        entries: &[(u32, &MemoryBuffer)],
    ) -> Result<MemoryBindGroup> {
        Ok(MemoryBindGroup {
            entries: entries
                .iter()
                .map(|(binding, buffer)| (*binding, (*buffer).clone()))
                .collect(),
        })
    }

    fn supported_formats(&self, _target: &MemoryTarget) -> Vec<wgpu::TextureFormat> {
        self.adapter.formats.clone()
    }

    fn configure_target(&self, target: &mut MemoryTarget, format: wgpu::TextureFormat) {
        target.format = Some(format);
    }

    fn acquire_frame(&self, target: &MemoryTarget) -> Result<MemoryFrame> {
        let Some(format) = target.format else {
            return Err(Error::FrameUnavailable(
                "memory target is not configured".to_string(),
            ));
        };
        Ok(MemoryFrame {
            width: target.width,
            height: target.height,
            format,
        })
    }

    fn create_encoder(&self, label: Option<&str>) -> MemoryEncoder {
        MemoryEncoder {
            label: label.map(str::to_string),
            passes: Vec::new(),
        }
    }

    fn encode_pass(
        &self,
        encoder: &mut MemoryEncoder,
        frame: &MemoryFrame,
        pass: &PassRecording<'_, Self>,
    ) {
        let commands = pass
            .commands
            .iter()
            .map(|command| match command {
                PassCommand::SetPipeline(pipeline) => RecordedCommand::SetPipeline {
                    pipeline: pipeline.id(),
                },
                PassCommand::SetVertexBuffer { slot, buffer } => RecordedCommand::SetVertexBuffer {
                    slot: *slot,
                    buffer: buffer.id(),
                },
                PassCommand::SetBindGroup { index, group } => RecordedCommand::SetBindGroup {
                    index: *index,
                    group: group.id(),
                },
                PassCommand::Draw {
                    vertices,
                    instances,
                } => RecordedCommand::Draw {
                    vertices: vertices.clone(),
                    instances: instances.clone(),
                },
            })
            .collect();

        encoder.passes.push(RecordedPass {
            label: pass.label.map(str::to_string),
            format: frame.format,
            extent: (frame.width, frame.height),
            clear: pass.clear,
            commands,
        });
    }

    fn submit(&self, encoder: MemoryEncoder, _frame: MemoryFrame) {
        let submission = Submission {
            label: encoder.label,
            passes: encoder.passes,
            presented: true,
        };
        log::debug!(
            "memory submission `{}`: {} pass(es)",
            submission.label.as_deref().unwrap_or("unlabelled"),
            submission.passes.len()
        );
        self.submissions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(submission);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        pollster::block_on(f)
    }

    #[test]
    fn disabled_platform_is_unsupported() {
        let err = block_on(MemoryPlatform::unsupported().acquire_device(&AcquireOptions::default()))
            .err();
        assert_eq!(err, Some(Error::PlatformUnsupported));
    }

    #[test]
    fn no_adapter_means_no_suitable_adapter() {
        let platform = MemoryPlatform::with_adapters(Vec::new());
        let err = block_on(platform.acquire_device(&AcquireOptions::default())).err();
        assert!(matches!(err, Some(Error::NoSuitableAdapter { .. })));
    }

    #[test]
    fn forced_fallback_skips_hardware_adapters() {
        let platform = MemoryPlatform::default();
        let options = AcquireOptions {
            force_fallback_adapter: true,
            ..AcquireOptions::default()
        };
        let err = block_on(platform.acquire_device(&options)).err();
        assert_eq!(
            err,
            Some(Error::NoSuitableAdapter {
                preference: wgpu::PowerPreference::LowPower
            })
        );
    }

    #[test]
    fn power_preference_picks_matching_adapter() {
        let platform = MemoryPlatform::with_adapters(vec![
            MemoryAdapter {
                name: "integrated".to_string(),
                ..MemoryAdapter::default()
            },
            MemoryAdapter {
                name: "discrete".to_string(),
                power_class: wgpu::PowerPreference::HighPerformance,
                ..MemoryAdapter::default()
            },
        ]);
        let options = AcquireOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..AcquireOptions::default()
        };
        let device = block_on(platform.acquire_device(&options)).unwrap();
        assert_eq!(device.backend().adapter().name, "discrete");
    }

    #[test]
    fn missing_features_fail_the_device_request() {
        let options = AcquireOptions {
            required_features: wgpu::Features::DEPTH_CLIP_CONTROL,
            ..AcquireOptions::default()
        };
        let err = block_on(MemoryPlatform::default().acquire_device(&options)).err();
        assert!(matches!(err, Some(Error::DeviceRequestFailed(_))));
    }

    #[test]
    fn unallocatable_buffer_is_an_error() {
        let device = block_on(MemoryPlatform::default().acquire_device(&AcquireOptions::default()))
            .unwrap();
        let result = device.backend().create_buffer(&BufferDescriptor {
            label: Some("huge"),
            size: u64::MAX,
            usage: wgpu::BufferUsages::STORAGE,
        });
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
