//! The two demo scenes. Both draw the same unit square; they differ in how
//! the positions reach the vertex stage.

mod storage_buffer;
mod vertex_buffer;

pub use storage_buffer::StorageBufferScene;
pub use vertex_buffer::VertexBufferScene;

use anyhow::Result;
use firstlight_engine::{
    Backend, BindGroup, Buffer, Device, DrawRequest, RenderPipeline, SequenceState, Surface,
};

/// Builds everything one frame needs on a device.
pub trait Scene {
    fn name(&self) -> &'static str;

    /// Creates and uploads the scene's resources for a surface configured as
    /// `format`.
    fn prepare<B: Backend>(
        &self,
        device: &Device<B>,
        format: wgpu::TextureFormat,
    ) -> Result<Prepared<B>>;
}

/// GPU objects of a prepared scene, ready to be submitted.
pub struct Prepared<B: Backend> {
    pub pipeline: RenderPipeline<B>,
    pub vertex_buffer: Option<Buffer<B>>,
    pub storage_buffer: Option<Buffer<B>>,
    pub bind_group: Option<BindGroup<B>>,
    pub vertex_count: u32,
    pub clear_color: wgpu::Color,
}

impl<B: Backend> Prepared<B> {
    /// Records and submits the scene's single draw into `surface`.
    pub fn submit(
        &self,
        device: &Device<B>,
        surface: &Surface<B>,
    ) -> firstlight_engine::Result<SequenceState> {
        device.record_and_submit(
            surface,
            &DrawRequest {
                pipeline: &self.pipeline,
                vertex_buffer: self.vertex_buffer.as_ref(),
                bind_group: self.bind_group.as_ref(),
                vertex_count: self.vertex_count,
                clear_color: self.clear_color,
            },
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use firstlight_engine::backend::{MemoryBackend, MemoryPlatform};
    use firstlight_engine::logging::{init_logging, LoggingConfig};
    use firstlight_engine::{AcquireOptions, Device, Surface};

    pub(crate) const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

    pub(crate) fn memory_target() -> (Device<MemoryBackend>, Surface<MemoryBackend>) {
        init_logging(LoggingConfig::for_tests());
        let platform = MemoryPlatform::default();
        let device =
            pollster::block_on(platform.acquire_device(&AcquireOptions::default())).unwrap();
        let mut surface = platform.create_surface(512, 512);
        surface.configure(&device, FORMAT).unwrap();
        (device, surface)
    }
}
