use std::ops::Range;

use crate::backend::Backend;
use crate::bind_group::BindGroup;
use crate::device::{Device, Surface};
use crate::error::{Error, Result};
use crate::pipeline::RenderPipeline;
use crate::resource::Buffer;

/// Lifecycle of a command sequence. Transitions only move forward.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Recording,
    PassOpen,
    PassClosed,
    Submitted,
}

/// A command recorded inside the render pass, replayed by the backend when
/// the pass is closed.
pub enum PassCommand<'a, B: Backend> {
    SetPipeline(&'a RenderPipeline<B>),
    SetVertexBuffer { slot: u32, buffer: &'a Buffer<B> },
    SetBindGroup { index: u32, group: &'a BindGroup<B> },
    Draw { vertices: Range<u32>, instances: Range<u32> },
}

/// The single render pass of a sequence: one color attachment cleared to
/// `clear` and stored.
pub struct PassRecording<'a, B: Backend> {
    pub label: Option<&'a str>,
    pub clear: wgpu::Color,
    pub commands: Vec<PassCommand<'a, B>>,
}

/// Single-use recording of one render pass and its submission.
///
/// `Idle → Recording → PassOpen → PassClosed → Submitted`. Calling an operation
/// in any other state returns `Error::InvalidState`; a closed pass cannot be
/// reopened and a submitted sequence cannot be submitted again.
pub struct CommandSequence<'a, B: Backend> {
    device: &'a Device<B>,
    label: Option<&'a str>,
    state: SequenceState,

    encoder: Option<B::Encoder>,
    frame: Option<B::Frame>,
    target_format: Option<wgpu::TextureFormat>,
    pass: Option<PassRecording<'a, B>>,

    pipeline: Option<&'a RenderPipeline<B>>,
    vertex_buffer: Option<&'a Buffer<B>>,
    bind_group: Option<&'a BindGroup<B>>,
}

impl<B: Backend> Device<B> {
    /// Starts an empty command sequence in the `Idle` state.
    pub fn begin_commands<'a>(&'a self, label: Option<&'a str>) -> CommandSequence<'a, B> {
        CommandSequence {
            device: self,
            label,
            state: SequenceState::Idle,
            encoder: None,
            frame: None,
            target_format: None,
            pass: None,
            pipeline: None,
            vertex_buffer: None,
            bind_group: None,
        }
    }
}

impl<'a, B: Backend> CommandSequence<'a, B> {
    #[inline]
    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Opens the recording context.
    pub fn begin(&mut self) -> Result<()> {
        self.expect(SequenceState::Idle)?;
        self.encoder = Some(self.device.backend().create_encoder(self.label));
        self.advance(SequenceState::Recording);
        Ok(())
    }

    /// Acquires `surface`'s current output image and opens the render pass on it.
    pub fn begin_pass(&mut self, surface: &Surface<B>, clear: wgpu::Color) -> Result<()> {
        self.expect(SequenceState::Recording)?;
        let frame = surface.acquire_frame(self.device)?;

        self.frame = Some(frame);
        self.target_format = surface.format();
        self.pass = Some(PassRecording {
            label: self.label,
            clear,
            commands: Vec::new(),
        });
        self.advance(SequenceState::PassOpen);
        Ok(())
    }

    pub fn set_pipeline(&mut self, pipeline: &'a RenderPipeline<B>) -> Result<()> {
        self.expect(SequenceState::PassOpen)?;
        if self.target_format != Some(pipeline.output_format()) {
            return Err(Error::Configuration(format!(
                "pipeline {} renders {:?} but the surface is configured as {:?}",
                pipeline.id(),
                pipeline.output_format(),
                self.target_format
            )));
        }
        self.pipeline = Some(pipeline);
        self.record(PassCommand::SetPipeline(pipeline))
    }

    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: &'a Buffer<B>) -> Result<()> {
        self.expect(SequenceState::PassOpen)?;
        if slot != 0 {
            return Err(Error::IncompatibleLayout(format!(
                "vertex buffer slot {slot} requested; pipelines read only slot 0"
            )));
        }
        buffer.require_usage(wgpu::BufferUsages::VERTEX)?;
        self.vertex_buffer = Some(buffer);
        self.record(PassCommand::SetVertexBuffer { slot, buffer })
    }

    pub fn set_bind_group(&mut self, index: u32, group: &'a BindGroup<B>) -> Result<()> {
        self.expect(SequenceState::PassOpen)?;
        if index != 0 {
            return Err(Error::LayoutMismatch(format!(
                "bind group index {index} requested; only group 0 exists"
            )));
        }
        self.bind_group = Some(group);
        self.record(PassCommand::SetBindGroup { index, group })
    }

    /// Draws `vertices` as a single instance, without an index buffer.
    ///
    /// The bound state must satisfy the current pipeline: a vertex buffer large
    /// enough for the range when it has a vertex layout, and a bind group built
    /// for it when it declares binding slots.
    pub fn draw(&mut self, vertices: Range<u32>) -> Result<()> {
        self.expect(SequenceState::PassOpen)?;
        let Some(pipeline) = self.pipeline else {
            return Err(Error::IncompatibleLayout(
                "draw issued before a pipeline was set".to_string(),
            ));
        };

        if let Some(layout) = pipeline.vertex_layout() {
            let Some(buffer) = self.vertex_buffer else {
                return Err(Error::IncompatibleLayout(format!(
                    "pipeline {} reads vertex buffer 0 but none is bound",
                    pipeline.id()
                )));
            };
            let needed = u64::from(vertices.end) * layout.stride();
            if needed > buffer.size() {
                return Err(Error::OutOfBounds(format!(
                    "drawing vertices {vertices:?} reads {needed} bytes from `{}` ({} bytes)",
                    buffer.display_label(),
                    buffer.size()
                )));
            }
        }

        if !pipeline.binding_layout().is_empty() {
            match self.bind_group {
                None => {
                    return Err(Error::LayoutMismatch(format!(
                        "pipeline {} needs bind group 0 but none is bound",
                        pipeline.id()
                    )));
                }
                Some(group) if group.pipeline() != pipeline.id() => {
                    return Err(Error::LayoutMismatch(format!(
                        "bind group {} was built for pipeline {}, not {}",
                        group.id(),
                        group.pipeline(),
                        pipeline.id()
                    )));
                }
                Some(_) => {}
            }
        }

        self.record(PassCommand::Draw {
            vertices,
            instances: 0..1,
        })
    }

    /// Closes the pass and encodes it.
    pub fn end_pass(&mut self) -> Result<()> {
        self.expect(SequenceState::PassOpen)?;
        let (Some(encoder), Some(frame), Some(pass)) =
            (self.encoder.as_mut(), self.frame.as_ref(), self.pass.take())
        else {
            return Err(self.invalid(SequenceState::PassOpen));
        };

        self.device.backend().encode_pass(encoder, frame, &pass);
        self.advance(SequenceState::PassClosed);
        Ok(())
    }

    /// Finishes recording and submits to the device queue. Does not wait for
    /// the GPU.
    pub fn submit(&mut self) -> Result<()> {
        self.expect(SequenceState::PassClosed)?;
        let (Some(encoder), Some(frame)) = (self.encoder.take(), self.frame.take()) else {
            return Err(self.invalid(SequenceState::PassClosed));
        };

        self.device.backend().submit(encoder, frame);
        self.advance(SequenceState::Submitted);
        Ok(())
    }

    fn record(&mut self, command: PassCommand<'a, B>) -> Result<()> {
        match self.pass.as_mut() {
            Some(pass) => {
                pass.commands.push(command);
                Ok(())
            }
            None => Err(self.invalid(SequenceState::PassOpen)),
        }
    }

    fn expect(&self, expected: SequenceState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid(expected))
        }
    }

    fn invalid(&self, expected: SequenceState) -> Error {
        Error::InvalidState {
            expected,
            found: self.state,
        }
    }

    fn advance(&mut self, to: SequenceState) {
        log::debug!(
            "command sequence `{}`: {:?} -> {to:?}",
            self.label.unwrap_or("unlabelled"),
            self.state
        );
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, MemoryPlatform};
    use crate::device::AcquireOptions;

    fn device_and_surface() -> (Device<MemoryBackend>, Surface<MemoryBackend>) {
        let platform = MemoryPlatform::default();
        let device =
            pollster::block_on(platform.acquire_device(&AcquireOptions::default())).unwrap();
        let mut surface = platform.create_surface(64, 64);
        surface.configure(&device, wgpu::TextureFormat::Bgra8Unorm).unwrap();
        (device, surface)
    }

    #[test]
    fn operations_out_of_order_are_invalid_state() {
        let (device, surface) = device_and_surface();
        let mut seq = device.begin_commands(Some("out of order"));

        let err = seq.begin_pass(&surface, wgpu::Color::BLACK).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidState {
                expected: SequenceState::Recording,
                found: SequenceState::Idle
            }
        );
        assert!(matches!(seq.end_pass(), Err(Error::InvalidState { .. })));
        assert!(matches!(seq.submit(), Err(Error::InvalidState { .. })));
        assert_eq!(seq.state(), SequenceState::Idle);
    }

    #[test]
    fn closed_pass_cannot_reopen_and_submit_is_single_use() {
        let (device, surface) = device_and_surface();
        let mut seq = device.begin_commands(None);
        seq.begin().unwrap();
        seq.begin_pass(&surface, wgpu::Color::BLACK).unwrap();
        seq.end_pass().unwrap();

        assert!(matches!(
            seq.begin_pass(&surface, wgpu::Color::BLACK),
            Err(Error::InvalidState { found: SequenceState::PassClosed, .. })
        ));

        seq.submit().unwrap();
        assert_eq!(seq.state(), SequenceState::Submitted);
        assert_eq!(
            seq.submit(),
            Err(Error::InvalidState {
                expected: SequenceState::PassClosed,
                found: SequenceState::Submitted
            })
        );
        assert!(matches!(seq.begin(), Err(Error::InvalidState { .. })));
        assert_eq!(device.backend().submissions().len(), 1);
    }

    #[test]
    fn draw_without_pipeline_is_rejected() {
        let (device, surface) = device_and_surface();
        let mut seq = device.begin_commands(None);
        seq.begin().unwrap();
        seq.begin_pass(&surface, wgpu::Color::BLACK).unwrap();
        assert!(matches!(seq.draw(0..3), Err(Error::IncompatibleLayout(_))));
    }

    #[test]
    fn unconfigured_surface_cannot_open_a_pass() {
        let platform = MemoryPlatform::default();
        let device =
            pollster::block_on(platform.acquire_device(&AcquireOptions::default())).unwrap();
        let surface = platform.create_surface(8, 8);

        let mut seq = device.begin_commands(None);
        seq.begin().unwrap();
        assert!(matches!(
            seq.begin_pass(&surface, wgpu::Color::BLACK),
            Err(Error::Configuration(_))
        ));
        assert_eq!(seq.state(), SequenceState::Recording);
    }
}
