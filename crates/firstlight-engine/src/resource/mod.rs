//! GPU buffers and the layouts that describe their records.
//!
//! Two layouts exist because the two upload paths disagree on who owns the
//! record structure:
//! - `VertexLayout`: explicit stride + attributes, consumed by vertex fetch
//! - `StorageLayout`: host mirror of a WGSL structure read from a storage buffer

mod buffer;
mod layout;
pub mod records;

pub use buffer::{Buffer, BufferDescriptor};
pub use layout::{StorageField, StorageLayout, VertexLayout};
