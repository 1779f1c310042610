/// Options for acquiring an adapter and a logical device.
///
/// Keep this structure small. Add fields only when a concrete backend
/// requirement exists.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Label given to the logical device; shows up in backend diagnostics.
    pub label: Option<String>,

    /// Which adapter to favour when more than one is available.
    ///
    /// Low power matches what the browser demos request.
    pub power_preference: wgpu::PowerPreference,

    /// Only accept a fallback (software) adapter.
    pub force_fallback_adapter: bool,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            label: Some("firstlight device".to_string()),
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Presentation parameters for window-backed surfaces.
#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    /// Prefer an sRGB format when asking the surface for its preferred format.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior). FIFO is supported everywhere.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Desired maximum frame latency. A hint; support depends on platform/backend.
    pub desired_maximum_frame_latency: u32,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            desired_maximum_frame_latency: 2,
        }
    }
}
