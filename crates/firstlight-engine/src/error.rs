use thiserror::Error;

use crate::command::SequenceState;

/// Failures raised by the initialize → configure → encode → submit protocol.
///
/// A one-shot render has no degraded mode, so every variant is meant to be
/// propagated to the top-level caller unchanged and reported there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// No graphics backend is compiled in or enabled on this platform.
    #[error("WebGPU is not supported: no graphics backend is available on this platform")]
    PlatformUnsupported,

    /// No adapter satisfied the requested options.
    #[error("couldn't find a suitable adapter (power preference: {preference:?})")]
    NoSuitableAdapter { preference: wgpu::PowerPreference },

    /// The adapter refused to create a logical device.
    #[error("failed to request device from adapter: {0}")]
    DeviceRequestFailed(String),

    /// Surface binding, format or descriptor problems.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A write or draw range falls outside the memory it addresses, or host data
    /// does not line up with the declared record stride.
    #[error("out of bounds: {0}")]
    OutOfBounds(String),

    /// Shader source failed to parse or validate. Carries the rendered diagnostics.
    #[error("shader compilation failed:\n{0}")]
    ShaderCompile(String),

    /// Vertex inputs, entry points or binding layouts do not fit together.
    #[error("incompatible layout: {0}")]
    IncompatibleLayout(String),

    /// A bind group does not match the binding layout it is used with.
    #[error("bind group does not match the pipeline layout: {0}")]
    LayoutMismatch(String),

    /// A buffer is used for something its usage flags do not allow.
    #[error("buffer `{label}` lacks {required:?} usage (has {actual:?})")]
    MissingUsage {
        label: String,
        required: wgpu::BufferUsages,
        actual: wgpu::BufferUsages,
    },

    /// The surface could not hand out its current output image.
    #[error("output image unavailable: {0}")]
    FrameUnavailable(String),

    /// A command sequence was driven out of order. This is a caller defect.
    #[error("command sequence is {found:?}, expected {expected:?}")]
    InvalidState {
        expected: SequenceState,
        found: SequenceState,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
