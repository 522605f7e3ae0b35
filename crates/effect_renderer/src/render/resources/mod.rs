//! GPU-side resources owned by the renderer facade
//!
//! Geometry buffers, render state tracking, the two shader variants and the
//! model material cache.

pub mod buffer;
pub mod material_cache;
pub mod render_state;
pub mod shader;

pub use buffer::{BufferError, GeometryBuffer, MappedRegion, QuadIndexBuffer};
pub use material_cache::{MaterialCache, MaterialKey, MAX_VIEW_SLOTS};
pub use render_state::{
    AlphaBlendMode, CullingMode, RenderMode, RenderState, RenderStateTracker, StateChanges,
    TextureFilter, TextureSet, TextureWrap, MAX_TEXTURE_SLOTS,
};
pub use shader::{PixelConstants, Shader, ShaderKind, ShaderSelector, VertexConstants};
