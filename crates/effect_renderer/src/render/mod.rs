//! # Rendering System
//!
//! Converts the per-frame output of a particle-effect simulation into host
//! engine draw submissions.
//!
//! ## Architecture
//!
//! - **Renderer**: Frame facade owning camera/light state, geometry buffers,
//!   render state, both shader variants and the registry of sub-renderers
//! - **StandardRenderer**: Batcher shared by sprites, ribbons, rings and tracks
//! - **ModelRenderer**: One host mesh submission per model instance
//! - **RenderBackend**: The host engine interface every GPU call goes through
//!
//! Data flow: simulation → [`Renderer`] group calls → sub-renderer →
//! geometry buffer + shader selector + render state → [`RenderBackend`].

pub mod api;
pub mod backends;
pub mod primitives;
pub mod resources;
pub mod systems;

mod renderer;

#[cfg(test)]
mod tests;

pub use api::{
    BackendResult, BufferHandle, Diagnostic, DistortingCallback, MaterialHandle, MeshHandle,
    MeshSubmission, ModelMaterialParameters, ProtocolViolation, RenderBackend, RendererConfig,
    ShaderProgramHandle, TextureHandle,
};
pub use backends::{BackendCommand, RecordingBackend};
pub use primitives::{CameraState, Vertex, VertexDistortion, VertexLayout};
pub use renderer::{DeviceState, Renderer, RendererKey};
pub use resources::{
    AlphaBlendMode, BufferError, CullingMode, MaterialKey, RenderMode, RenderState, ShaderKind,
    TextureFilter, TextureSet, TextureWrap, MAX_TEXTURE_SLOTS, MAX_VIEW_SLOTS,
};
pub use systems::{
    BillboardType, DrawStats, InstanceParameter, LightParameters, ModelInstanceParameter,
    ModelNodeParameter, NodeMaterial, NodeParameter, PrimitiveFamily, RibbonInstanceParameter,
    RibbonNodeParameter, RingInstanceParameter, RingNodeParameter, SpriteInstanceParameter,
    SpriteNodeParameter, TrackInstanceParameter, TrackNodeParameter,
};

use thiserror::Error;

/// Rendering errors
///
/// Every failing renderer call returns one of these; callers treat an error
/// from a frame-level call as "skip this frame".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A primitive needs more vertex memory than the whole geometry buffer holds
    #[error("Capacity exceeded: requested {requested} bytes, {available} available")]
    CapacityExceeded {
        /// Requested bytes
        requested: usize,
        /// Bytes the buffer can ever provide
        available: usize,
    },

    /// A texture set has more entries than the per-draw slot limit
    #[error("Texture set of {requested} textures exceeds the {limit}-slot limit")]
    TextureSlotOverflow {
        /// Number of textures requested
        requested: usize,
        /// Slot limit
        limit: usize,
    },

    /// The graphics device is lost; no rendering call is valid until reset
    #[error("Graphics device lost")]
    DeviceLost,

    /// A rendering call was made outside `begin_rendering` / `end_rendering`
    #[error("No frame is active")]
    FrameNotActive,

    /// View slot index out of range
    #[error("View index {0} out of range")]
    InvalidViewIndex(usize),

    /// The simulation side broke the call protocol
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    /// Geometry buffer mapping failed
    #[error("Buffer mapping failed: {0}")]
    BufferMapping(#[from] BufferError),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),

    /// A texture or model could not be loaded
    #[error("Asset error: {0}")]
    Asset(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
