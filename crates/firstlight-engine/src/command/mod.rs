//! Command recording and submission.
//!
//! A `CommandSequence` records exactly one render pass and is submitted once.
//! `Device::record_and_submit` drives a sequence through the fixed one-draw
//! order used by both demos.

mod sequence;
mod submit;

pub use sequence::{CommandSequence, PassCommand, PassRecording, SequenceState};
pub use submit::DrawRequest;
