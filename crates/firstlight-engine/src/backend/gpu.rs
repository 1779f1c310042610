use crate::command::{PassCommand, PassRecording};
use crate::device::{AcquireOptions, Device, Surface, SurfaceOptions};
use crate::error::{Error, Result};
use crate::resource::BufferDescriptor;

use super::{Backend, PipelineRequest};

/// Formats an offscreen target can be configured with.
const OFFSCREEN_FORMATS: [wgpu::TextureFormat; 4] = [
    wgpu::TextureFormat::Bgra8Unorm,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Bgra8UnormSrgb,
    wgpu::TextureFormat::Rgba8UnormSrgb,
];

/// Entry point to wgpu: owns the instance that surfaces and adapters come from.
pub struct WgpuPlatform {
    instance: wgpu::Instance,
}

impl WgpuPlatform {
    /// Creates an instance over every backend compiled into wgpu, narrowed by
    /// `WGPU_BACKEND` when set.
    pub fn new() -> Result<Self> {
        let requested = wgpu::Backends::from_env().unwrap_or(wgpu::Backends::all());
        let backends = requested & wgpu::Instance::enabled_backend_features();
        if backends.is_empty() {
            return Err(Error::PlatformUnsupported);
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });
        log::debug!("wgpu instance created for {backends:?}");

        Ok(Self { instance })
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Wraps a window (or anything wgpu can present to) in an unconfigured surface.
    ///
    /// `width`/`height` are the drawable size in physical pixels.
    pub fn create_surface(
        &self,
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        options: &SurfaceOptions,
    ) -> Result<Surface<WgpuBackend>> {
        check_extent(width, height)?;

        let surface = self
            .instance
            .create_surface(target)
            .map_err(|e| Error::Configuration(format!("failed to create wgpu surface: {e}")))?;

        Ok(Surface::new(WgpuTarget::Window {
            surface,
            width,
            height,
            options: options.clone(),
        }))
    }

    /// A texture-backed surface, for rendering without a window.
    pub fn offscreen_surface(&self, width: u32, height: u32) -> Result<Surface<WgpuBackend>> {
        check_extent(width, height)?;
        Ok(Surface::new(WgpuTarget::Offscreen {
            texture: None,
            width,
            height,
        }))
    }

    /// Requests an adapter matching `options` and opens a logical device on it.
    ///
    /// When `compatible` is a window surface, only adapters able to present to
    /// it are considered.
    pub async fn acquire_device(
        &self,
        options: &AcquireOptions,
        compatible: Option<&Surface<WgpuBackend>>,
    ) -> Result<Device<WgpuBackend>> {
        let compatible_surface = compatible.and_then(|s| match s.target() {
            WgpuTarget::Window { surface, .. } => Some(surface),
            WgpuTarget::Offscreen { .. } => None,
        });

        let adapter = self
            .instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference,
                compatible_surface,
                force_fallback_adapter: options.force_fallback_adapter,
            })
            .await
            .map_err(|e| {
                log::warn!("adapter request failed: {e}");
                Error::NoSuitableAdapter {
                    preference: options.power_preference,
                }
            })?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: options.label.as_deref(),
                required_features: options.required_features,
                required_limits: options.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| {
                log::warn!("device request failed: {e}");
                Error::DeviceRequestFailed(e.to_string())
            })?;

        Ok(Device::new(
            options.label.clone(),
            options.required_limits.clone(),
            WgpuBackend {
                adapter,
                device,
                queue,
            },
        ))
    }
}

fn check_extent(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::Configuration(format!(
            "surface has zero size ({width}x{height})"
        )));
    }
    Ok(())
}

/// Adapter, logical device and queue of one acquired wgpu device.
pub struct WgpuBackend {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Runs `create` inside a validation error scope, so wgpu rejections come
    /// back as `Error`s instead of reaching the uncaptured-error handler.
    fn validated<T>(
        &self,
        what: &str,
        wrap: fn(String) -> Error,
        create: impl FnOnce() -> T,
    ) -> Result<T> {
        let scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create();
        match pollster::block_on(scope.pop()) {
            None => Ok(value),
            Some(e) => {
                log::warn!("wgpu rejected {what}: {e}");
                Err(wrap(format!("wgpu rejected {what}: {e}")))
            }
        }
    }
}

pub enum WgpuTarget {
    Window {
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
        options: SurfaceOptions,
    },
    /// The texture is created when the target is configured.
    Offscreen {
        texture: Option<wgpu::Texture>,
        width: u32,
        height: u32,
    },
}

/// The output image of one pass.
///
/// Holding the surface texture blocks acquisition of the next one; it is
/// presented right after submission.
pub struct WgpuFrame {
    surface_texture: Option<wgpu::SurfaceTexture>,
    view: wgpu::TextureView,
}

/// A pipeline plus the bind group layout it was created with, when explicit.
///
/// Derived layouts are fetched from the pipeline when a bind group is built.
pub struct WgpuPipeline {
    pipeline: wgpu::RenderPipeline,
    group_layout: Option<wgpu::BindGroupLayout>,
}

impl WgpuPipeline {
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

impl Backend for WgpuBackend {
    type Buffer = wgpu::Buffer;
    type Shader = wgpu::ShaderModule;
    type Pipeline = WgpuPipeline;
    type BindGroup = wgpu::BindGroup;
    type Target = WgpuTarget;
    type Frame = WgpuFrame;
    type Encoder = wgpu::CommandEncoder;

    fn describe(&self) -> String {
        let info = self.adapter.get_info();
        format!("{} ({:?}, {:?})", info.name, info.backend, info.device_type)
    }

    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<wgpu::Buffer> {
        self.validated("the buffer", Error::Configuration, || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: desc.label,
                size: desc.size,
                usage: desc.usage,
                mapped_at_creation: false,
            })
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, offset: u64, data: &[u8]) {
        self.queue.write_buffer(buffer, offset, data);
    }

    // Mapping needs a poll loop on the device; nothing in the one-shot
    // protocol waits on the GPU.
    fn read_buffer(&self, _buffer: &wgpu::Buffer) -> Option<Vec<u8>> {
        None
    }

    fn create_shader(&self, label: Option<&str>, source: &str) -> wgpu::ShaderModule {
        self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label,
            source: wgpu::ShaderSource::Wgsl(source.into()),
        })
    }

    fn create_pipeline(&self, request: &PipelineRequest<'_, Self>) -> Result<WgpuPipeline> {
        let explicit = if request.bindings.is_derived() {
            None
        } else {
            let entries: Vec<wgpu::BindGroupLayoutEntry> = request
                .bindings
                .slots()
                .iter()
                .map(|slot| wgpu::BindGroupLayoutEntry {
                    binding: slot.binding,
                    visibility: slot.visibility,
                    ty: wgpu::BindingType::Buffer {
                        ty: slot.kind.as_wgpu(),
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                })
                .collect();

            let layouts = self.validated("the binding layout", Error::IncompatibleLayout, || {
                let bgl = self
                    .device
                    .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                        label: request.label,
                        entries: &entries,
                    });
                let layout = self
                    .device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: request.label,
                        bind_group_layouts: &[&bgl],
                        immediate_size: 0,
                    });
                (bgl, layout)
            })?;
            Some(layouts)
        };

        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = request
            .vertex_layout
            .map(|layout| layout.as_wgpu())
            .into_iter()
            .collect();

        let descriptor = wgpu::RenderPipelineDescriptor {
            label: request.label,
            layout: explicit.as_ref().map(|(_, layout)| layout),
            vertex: wgpu::VertexState {
                module: request.shader,
                entry_point: Some(request.vertex_entry),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: request.shader,
                entry_point: Some(request.fragment_entry),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: request.output_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: request.topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        };
        let pipeline = self.validated("the render pipeline", Error::IncompatibleLayout, || {
            self.device.create_render_pipeline(&descriptor)
        })?;

        Ok(WgpuPipeline {
            pipeline,
            group_layout: explicit.map(|(bgl, _)| bgl),
        })
    }

    fn create_bind_group(
        &self,
        label: Option<&str>,
        pipeline: &WgpuPipeline,
        entries: &[(u32, &wgpu::Buffer)],
    ) -> Result<wgpu::BindGroup> {
        let derived;
        let layout = match &pipeline.group_layout {
            Some(layout) => layout,
            None => {
                derived = pipeline.pipeline.get_bind_group_layout(0);
                &derived
            }
        };

        let entries: Vec<wgpu::BindGroupEntry<'_>> = entries
            .iter()
            .map(|(binding, buffer)| wgpu::BindGroupEntry {
                binding: *binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();

        self.validated("the bind group", Error::LayoutMismatch, || {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label,
                layout,
                entries: &entries,
            })
        })
    }

    fn supported_formats(&self, target: &WgpuTarget) -> Vec<wgpu::TextureFormat> {
        match target {
            WgpuTarget::Window { surface, .. } => surface.get_capabilities(&self.adapter).formats,
            WgpuTarget::Offscreen { .. } => OFFSCREEN_FORMATS.to_vec(),
        }
    }

    fn configure_target(&self, target: &mut WgpuTarget, format: wgpu::TextureFormat) {
        match target {
            WgpuTarget::Window {
                surface,
                width,
                height,
                options,
            } => {
                let caps = surface.get_capabilities(&self.adapter);
                let alpha_mode = options
                    .alpha_mode
                    .filter(|m| caps.alpha_modes.contains(m))
                    .unwrap_or_else(|| {
                        caps.alpha_modes
                            .first()
                            .copied()
                            .unwrap_or(wgpu::CompositeAlphaMode::Auto)
                    });

                surface.configure(
                    &self.device,
                    &wgpu::SurfaceConfiguration {
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        format,
                        width: *width,
                        height: *height,
                        present_mode: options.present_mode,
                        alpha_mode,
                        view_formats: vec![],
                        desired_maximum_frame_latency: options.desired_maximum_frame_latency,
                    },
                );
            }
            WgpuTarget::Offscreen {
                texture,
                width,
                height,
            } => {
                *texture = Some(self.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("offscreen target"),
                    size: wgpu::Extent3d {
                        width: *width,
                        height: *height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                }));
            }
        }
    }

    fn acquire_frame(&self, target: &WgpuTarget) -> Result<WgpuFrame> {
        match target {
            WgpuTarget::Window { surface, .. } => {
                let surface_texture = surface
                    .get_current_texture()
                    .map_err(|e| Error::FrameUnavailable(e.to_string()))?;
                let view = surface_texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(WgpuFrame {
                    surface_texture: Some(surface_texture),
                    view,
                })
            }
            WgpuTarget::Offscreen { texture, .. } => {
                let Some(texture) = texture else {
                    return Err(Error::FrameUnavailable(
                        "offscreen target has no texture yet".to_string(),
                    ));
                };
                Ok(WgpuFrame {
                    surface_texture: None,
                    view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                })
            }
        }
    }

    fn create_encoder(&self, label: Option<&str>) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label })
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        frame: &WgpuFrame,
        pass: &PassRecording<'_, Self>,
    ) {
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: pass.label,
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &frame.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(pass.clear),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for command in &pass.commands {
            match command {
                PassCommand::SetPipeline(pipeline) => rpass.set_pipeline(&pipeline.raw().pipeline),
                PassCommand::SetVertexBuffer { slot, buffer } => {
                    rpass.set_vertex_buffer(*slot, buffer.raw().slice(..));
                }
                PassCommand::SetBindGroup { index, group } => {
                    rpass.set_bind_group(*index, group.raw(), &[]);
                }
                PassCommand::Draw {
                    vertices,
                    instances,
                } => rpass.draw(vertices.clone(), instances.clone()),
            }
        }
    }

    fn submit(&self, encoder: wgpu::CommandEncoder, frame: WgpuFrame) {
        self.queue.submit(std::iter::once(encoder.finish()));
        drop(frame.view);
        if let Some(surface_texture) = frame.surface_texture {
            surface_texture.present();
        }
    }
}
