//! Backend implementations for the render module
//!
//! Hosts implement [`crate::render::RenderBackend`] themselves; the only
//! backend shipped here is the headless recorder.

/// Headless recording backend
pub mod recording;

pub use recording::{BackendCommand, RecordingBackend};
