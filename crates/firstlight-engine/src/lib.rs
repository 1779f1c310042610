//! Firstlight engine crate.
//!
//! A minimal WebGPU-style rendering protocol: acquire a device, configure a
//! surface, create buffers, compile WGSL, link a render pipeline, bind
//! resources, then record and submit a single render pass.
//!
//! GPU work goes through a `Backend`. `WgpuBackend` drives real adapters;
//! `MemoryBackend` runs the same protocol without one.

pub mod backend;
pub mod bind_group;
pub mod command;
pub mod device;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod resource;

mod id;

pub use backend::{Backend, MemoryBackend, MemoryPlatform, WgpuBackend, WgpuPlatform};
pub use bind_group::{BindGroup, SlotBinding};
pub use command::{CommandSequence, DrawRequest, SequenceState};
pub use device::{AcquireOptions, Device, Surface, SurfaceOptions};
pub use error::{Error, Result};
pub use id::ResourceId;
pub use pipeline::{
    BindingLayoutMode, BindingSlot, PipelineDescriptor, RenderPipeline, ShaderProgram, SlotKind,
};
pub use resource::{Buffer, BufferDescriptor, StorageLayout, VertexLayout};
