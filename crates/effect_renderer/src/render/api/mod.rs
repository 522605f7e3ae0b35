//! Public rendering API
//!
//! This module contains the interfaces the renderer shares with the outside
//! world: the host backend trait, the renderer configuration and the
//! diagnostic/callback hooks.

pub mod render_backend;
pub mod renderer_config;
pub mod diagnostics;

// Re-export commonly used types
pub use diagnostics::{Diagnostic, Diagnostics, DistortingCallback, ProtocolViolation};
pub use render_backend::{
    BackendResult, BufferHandle, MaterialHandle, MeshHandle, MeshSubmission,
    ModelMaterialParameters, RenderBackend, ShaderProgramHandle, TextureHandle,
};
pub use renderer_config::RendererConfig;
