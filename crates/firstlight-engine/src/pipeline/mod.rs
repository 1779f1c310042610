//! Shader compilation and render pipeline construction.
//!
//! Shaders are WGSL. `compile_shader` parses and validates them with naga (the
//! same front end wgpu uses) and keeps a reflection of each entry point's
//! interface; pipeline construction checks vertex inputs and binding layouts
//! against that reflection before anything reaches the backend.

mod binding;
mod reflect;
mod render;
mod shader;

pub use binding::{BindingLayout, BindingLayoutMode, BindingSlot, SlotKind};
pub use reflect::{
    EntryPointInfo, LocationValue, NumericKind, ResourceUse, ShaderReflection, Stage,
};
pub use render::{PipelineDescriptor, RenderPipeline};
pub use shader::ShaderProgram;
