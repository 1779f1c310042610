use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::id::ResourceId;

use super::Device;

/// Presentation target bound to at most one device and one pixel format.
///
/// The host supplies the underlying target (window surface, offscreen texture,
/// memory image); the surface only tracks which device it is bound to and hands
/// out the current output image once configured.
pub struct Surface<B: Backend> {
    id: ResourceId,
    target: B::Target,
    binding: Option<SurfaceBinding>,
}

#[derive(Debug, Copy, Clone)]
struct SurfaceBinding {
    device: ResourceId,
    format: wgpu::TextureFormat,
}

impl<B: Backend> Surface<B> {
    pub(crate) fn new(target: B::Target) -> Self {
        Self {
            id: ResourceId::next(),
            target,
            binding: None,
        }
    }

    #[inline]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn target(&self) -> &B::Target {
        &self.target
    }

    /// Returns the configured pixel format, if any.
    pub fn format(&self) -> Option<wgpu::TextureFormat> {
        self.binding.map(|b| b.format)
    }

    /// Returns the device this surface is bound to, if any.
    pub fn device(&self) -> Option<ResourceId> {
        self.binding.map(|b| b.device)
    }

    /// Picks the format this surface would like to be configured with on `device`.
    ///
    /// Returns `None` when the device reports no usable format for this target.
    pub fn preferred_format(
        &self,
        device: &Device<B>,
        prefer_srgb: bool,
    ) -> Option<wgpu::TextureFormat> {
        let formats = device.backend().supported_formats(&self.target);
        choose_surface_format(&formats, prefer_srgb)
    }

    /// Binds this surface to `device` with `format`.
    ///
    /// Reconfiguring with the same device is allowed; a surface already bound to
    /// another device is rejected, as is a format the device cannot present.
    pub fn configure(&mut self, device: &Device<B>, format: wgpu::TextureFormat) -> Result<()> {
        if let Some(bound) = self.binding
            && bound.device != device.id()
        {
            return Err(Error::Configuration(format!(
                "surface {} is already bound to device {}",
                self.id, bound.device
            )));
        }

        let supported = device.backend().supported_formats(&self.target);
        if !supported.contains(&format) {
            return Err(Error::Configuration(format!(
                "{format:?} is not supported by device {} (supported: {supported:?})",
                device.id()
            )));
        }

        device.backend().configure_target(&mut self.target, format);
        self.binding = Some(SurfaceBinding {
            device: device.id(),
            format,
        });

        log::debug!("surface {} configured for device {} as {format:?}", self.id, device.id());
        Ok(())
    }

    /// Acquires the current output image for a pass recorded on `device`.
    pub(crate) fn acquire_frame(&self, device: &Device<B>) -> Result<B::Frame> {
        let Some(bound) = self.binding else {
            return Err(Error::Configuration(format!(
                "surface {} has not been configured",
                self.id
            )));
        };
        if bound.device != device.id() {
            return Err(Error::Configuration(format!(
                "surface {} is bound to device {}, not {}",
                self.id,
                bound.device,
                device.id()
            )));
        }
        device.backend().acquire_frame(&self.target)
    }
}

pub(crate) fn choose_surface_format(
    formats: &[wgpu::TextureFormat],
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let preferred = if prefer_srgb {
        [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Rgba8UnormSrgb,
        ]
    } else {
        [wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
    };

    preferred
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::TextureFormat as F;

    #[test]
    fn prefers_srgb_when_asked() {
        let formats = [F::Rgba16Float, F::Bgra8Unorm, F::Bgra8UnormSrgb];
        assert_eq!(choose_surface_format(&formats, true), Some(F::Bgra8UnormSrgb));
        assert_eq!(choose_surface_format(&formats, false), Some(F::Bgra8Unorm));
    }

    #[test]
    fn falls_back_to_first_format() {
        assert_eq!(choose_surface_format(&[F::Rgba16Float], true), Some(F::Rgba16Float));
        assert_eq!(choose_surface_format(&[], false), None);
    }
}
