//! Backend seam.
//!
//! Everything above this module validates and tracks state; a `Backend` only
//! turns already-validated requests into GPU work. Two implementations exist:
//! - `WgpuBackend`: real adapters through wgpu
//! - `MemoryBackend`: CPU-side buffers and a log of recorded passes, used by
//!   tests and anywhere no adapter is available

mod gpu;
mod memory;

pub use gpu::{WgpuBackend, WgpuFrame, WgpuPipeline, WgpuPlatform, WgpuTarget};
pub use memory::{
    MemoryAdapter, MemoryBackend, MemoryBindGroup, MemoryBuffer, MemoryEncoder, MemoryFrame,
    MemoryPipeline, MemoryPlatform, MemoryShader, MemoryTarget, RecordedCommand, RecordedPass,
    Submission,
};

use crate::command::PassRecording;
use crate::error::Result;
use crate::pipeline::BindingLayout;
use crate::resource::{BufferDescriptor, VertexLayout};

/// Validated pipeline parameters handed to `Backend::create_pipeline`.
pub struct PipelineRequest<'a, B: Backend> {
    pub label: Option<&'a str>,
    pub shader: &'a B::Shader,
    pub vertex_entry: &'a str,
    pub fragment_entry: &'a str,
    pub vertex_layout: Option<&'a VertexLayout>,
    pub output_format: wgpu::TextureFormat,
    pub topology: wgpu::PrimitiveTopology,
    pub bindings: &'a BindingLayout,
}

pub trait Backend: Sized {
    type Buffer;
    type Shader;
    type Pipeline;
    type BindGroup;
    /// Presentation target owned by a `Surface`.
    type Target;
    /// Output image acquired for one pass.
    type Frame;
    type Encoder;

    /// Human-readable adapter description for logs.
    fn describe(&self) -> String;

    /// Size is already checked against the device limits.
    fn create_buffer(&self, desc: &BufferDescriptor<'_>) -> Result<Self::Buffer>;

    /// Range and usage are already checked.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);

    /// Returns `None` when the backend cannot map buffers back to the host.
    fn read_buffer(&self, buffer: &Self::Buffer) -> Option<Vec<u8>>;

    /// `source` has already been validated as WGSL.
    fn create_shader(&self, label: Option<&str>, source: &str) -> Self::Shader;

    fn create_pipeline(&self, request: &PipelineRequest<'_, Self>) -> Result<Self::Pipeline>;

    fn create_bind_group(
        &self,
        label: Option<&str>,
        pipeline: &Self::Pipeline,
        entries: &[(u32, &Self::Buffer)],
    ) -> Result<Self::BindGroup>;

    fn supported_formats(&self, target: &Self::Target) -> Vec<wgpu::TextureFormat>;

    fn configure_target(&self, target: &mut Self::Target, format: wgpu::TextureFormat);

    fn acquire_frame(&self, target: &Self::Target) -> Result<Self::Frame>;

    fn create_encoder(&self, label: Option<&str>) -> Self::Encoder;

    /// Encodes one recorded pass into `encoder`, targeting `frame`.
    fn encode_pass(
        &self,
        encoder: &mut Self::Encoder,
        frame: &Self::Frame,
        pass: &PassRecording<'_, Self>,
    );

    /// Submits `encoder` and presents `frame`. Does not wait for completion.
    fn submit(&self, encoder: Self::Encoder, frame: Self::Frame);
}
