//! Backend abstraction traits for the rendering system
//!
//! This module defines the trait a host engine implements so the renderer
//! can reach its GPU pipeline. The renderer never talks to a graphics API
//! directly; everything goes through [`RenderBackend`].

use crate::foundation::math::{Mat4, RectF, Vec3};
use crate::render::primitives::VertexLayout;
use crate::render::resources::{
    AlphaBlendMode, CullingMode, MaterialKey, RenderMode, ShaderKind, TextureFilter, TextureWrap,
};
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a GPU buffer owned by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a compiled shader program and its input layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderProgramHandle(pub u64);

/// Handle to a texture resource owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Handle to a host dynamic material instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Handle to a host mesh asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Per-instance parameters written into a model's material instance
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMaterialParameters {
    /// Local-to-world transform of this instance
    pub transform: Mat4,
    /// UV rectangle
    pub uv: RectF,
    /// Normalized RGBA tint
    pub color: [f32; 4],
    /// Animation time of the instance
    pub time: i32,
    /// Light direction, when lighting is enabled
    pub light_direction: Vec3,
    /// Normalized light color
    pub light_color: [f32; 4],
    /// Normalized ambient color
    pub light_ambient: [f32; 4],
    /// Distortion strength, when the material distorts
    pub distortion_intensity: f32,
}

/// A single mesh draw handed to the host mesh collector
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSubmission {
    /// Mesh to draw
    pub mesh: MeshHandle,
    /// Material instance to draw it with
    pub material: MaterialHandle,
    /// Local-to-world transform
    pub transform: Mat4,
    /// `(first_face, face_count)` for animated models, `None` for the whole mesh
    pub face_range: Option<(u32, u32)>,
    /// View slot the draw belongs to
    pub view_index: usize,
}

/// Host engine rendering interface
///
/// Implemented by the host (or by [`crate::render::RecordingBackend`] for
/// headless use). All calls happen on the render thread, in order.
pub trait RenderBackend {
    // === Buffers ===

    /// Create a dynamic vertex buffer of `size_bytes`
    fn create_vertex_buffer(&mut self, size_bytes: usize) -> BackendResult<BufferHandle>;

    /// Create an immutable index buffer
    fn create_index_buffer(&mut self, indices: &[u32]) -> BackendResult<BufferHandle>;

    /// Copy CPU staging bytes into a vertex buffer at `offset`
    ///
    /// `discard` tells the host the previous contents are no longer needed
    /// (the buffer was rewound), so it may rename the resource.
    fn upload_vertices(
        &mut self,
        buffer: BufferHandle,
        offset: usize,
        bytes: &[u8],
        discard: bool,
    ) -> BackendResult<()>;

    /// Release a buffer
    fn release_buffer(&mut self, buffer: BufferHandle);

    // === Shaders ===

    /// Create the program for one shader variant
    fn create_shader(
        &mut self,
        kind: ShaderKind,
        layout: &VertexLayout,
    ) -> BackendResult<ShaderProgramHandle>;

    /// Release a shader program
    fn release_shader(&mut self, program: ShaderProgramHandle);

    /// Bind a program and its vertex input layout
    fn bind_shader(&mut self, program: ShaderProgramHandle, layout: &VertexLayout);

    /// Unbind a program
    fn unbind_shader(&mut self, program: ShaderProgramHandle);

    /// Upload vertex-stage constants for the bound program
    fn set_vertex_constants(&mut self, program: ShaderProgramHandle, data: &[u8]);

    /// Upload pixel-stage constants for the bound program
    fn set_pixel_constants(&mut self, program: ShaderProgramHandle, data: &[u8]);

    // === Pipeline state ===

    /// Set the blend equation
    fn set_blend(&mut self, mode: AlphaBlendMode);

    /// Set depth test and depth write
    fn set_depth(&mut self, test: bool, write: bool);

    /// Set face culling
    fn set_cull(&mut self, mode: CullingMode);

    /// Set polygon fill mode
    fn set_render_mode(&mut self, mode: RenderMode);

    /// Set sampler state for one texture slot
    fn set_sampler(&mut self, slot: usize, filter: TextureFilter, wrap: TextureWrap);

    /// Bind textures to consecutive slots starting at 0
    fn set_textures(&mut self, textures: &[TextureHandle]);

    // === Draw ===

    /// Bind the vertex buffer (with its stride) and the quad index buffer
    fn bind_geometry(&mut self, vertex_buffer: BufferHandle, stride: usize, index_buffer: BufferHandle);

    /// Draw `sprite_count` quads starting at vertex `vertex_offset`
    fn draw_sprites(&mut self, sprite_count: usize, vertex_offset: usize) -> BackendResult<()>;

    // === Models ===

    /// Create a dynamic material instance for a model material key
    fn create_material_instance(
        &mut self,
        key: &MaterialKey,
        view_index: usize,
    ) -> BackendResult<MaterialHandle>;

    /// Write per-instance parameters into a material instance
    fn set_material_parameters(&mut self, material: MaterialHandle, params: &ModelMaterialParameters);

    /// Submit a mesh to the host mesh collector
    fn submit_mesh(&mut self, submission: &MeshSubmission) -> BackendResult<()>;

    // === Assets ===

    /// Create a texture from RGBA8 pixels
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle>;

    /// Create a host mesh from serialized model data
    fn create_model(&mut self, data: &[u8]) -> BackendResult<MeshHandle>;

    // === Host state and device lifecycle ===

    /// Snapshot the host pipeline state before the renderer touches it
    fn save_host_state(&mut self);

    /// Restore the snapshot taken by [`RenderBackend::save_host_state`]
    fn restore_host_state(&mut self);

    /// The device was lost; every GPU handle is now invalid
    fn on_lost_device(&mut self);

    /// The device is back; resources may be created again
    fn on_reset_device(&mut self) -> BackendResult<()>;

    /// Downcast to concrete backend type
    fn as_any(&self) -> &dyn std::any::Any;

    /// Downcast to mutable concrete backend type
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
