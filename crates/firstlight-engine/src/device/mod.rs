//! Device acquisition and surface configuration.
//!
//! This module is responsible for:
//! - the `Device` handle every other object is created from
//! - binding a presentation `Surface` to a device and a pixel format
//! - acquisition/presentation options
//!
//! Acquisition itself is backend specific and lives on the platforms
//! (`WgpuPlatform::acquire_device`, `MemoryPlatform::acquire_device`).

mod handle;
mod init;
mod surface;

pub use handle::Device;
pub use init::{AcquireOptions, SurfaceOptions};
pub use surface::Surface;
