use crate::backend::Backend;
use crate::id::ResourceId;

/// Exclusive handle to one adapter's execution and memory context.
///
/// Every buffer, shader, pipeline and bind group is created through a `Device`
/// and stays valid for the device's lifetime. The operations themselves live
/// next to the objects they build (`resource`, `pipeline`, `bind_group`,
/// `command`).
pub struct Device<B: Backend> {
    id: ResourceId,
    label: Option<String>,
    limits: wgpu::Limits,
    backend: B,
}

impl<B: Backend> Device<B> {
    pub(crate) fn new(label: Option<String>, limits: wgpu::Limits, backend: B) -> Self {
        let id = ResourceId::next();
        log::info!(
            "device {id} ({}) acquired on {}",
            label.as_deref().unwrap_or("unlabelled"),
            backend.describe()
        );
        Self {
            id,
            label,
            limits,
            backend,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Limits the device was requested with. Resources are checked against
    /// them before the backend sees them.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Returns the backend that performs the GPU work for this device.
    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
