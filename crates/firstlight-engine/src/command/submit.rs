use crate::backend::Backend;
use crate::bind_group::BindGroup;
use crate::device::{Device, Surface};
use crate::error::Result;
use crate::pipeline::RenderPipeline;
use crate::resource::Buffer;

use super::SequenceState;

/// Inputs of a one-shot draw.
pub struct DrawRequest<'a, B: Backend> {
    pub pipeline: &'a RenderPipeline<B>,
    pub vertex_buffer: Option<&'a Buffer<B>>,
    pub bind_group: Option<&'a BindGroup<B>>,
    pub vertex_count: u32,
    pub clear_color: wgpu::Color,
}

impl<B: Backend> Device<B> {
    /// Records one render pass drawing `request.vertex_count` vertices into
    /// `surface`'s current image and submits it.
    ///
    /// Order: acquire image, open pass (clear + store), set pipeline, vertex
    /// buffer 0 if any, bind group 0 if any, draw, end pass, submit. Returns
    /// the final state (`Submitted`). Nothing waits for the GPU.
    pub fn record_and_submit(
        &self,
        surface: &Surface<B>,
        request: &DrawRequest<'_, B>,
    ) -> Result<SequenceState> {
        let mut seq = self.begin_commands(request.pipeline.label());
        seq.begin()?;
        seq.begin_pass(surface, request.clear_color)?;
        seq.set_pipeline(request.pipeline)?;
        if let Some(buffer) = request.vertex_buffer {
            seq.set_vertex_buffer(0, buffer)?;
        }
        if let Some(group) = request.bind_group {
            seq.set_bind_group(0, group)?;
        }
        seq.draw(0..request.vertex_count)?;
        seq.end_pass()?;
        seq.submit()?;
        Ok(seq.state())
    }
}
