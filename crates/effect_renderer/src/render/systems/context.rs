//! Per-call view of the facade's resources
//!
//! Sub-renderers never hold a reference to the facade. For each call the
//! facade splits its own borrows into a [`FrameContext`] and passes it down,
//! so nothing a sub-renderer holds can outlive the facade.

use crate::foundation::math::{Color, Mat4, Vec3};
use crate::render::api::{Diagnostics, DistortingCallback, RenderBackend, TextureHandle};
use crate::render::primitives::CameraState;
use crate::render::resources::{
    GeometryBuffer, MaterialCache, QuadIndexBuffer, RenderMode, RenderStateTracker, ShaderSelector,
};

/// Directional light used by lit model materials
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightParameters {
    /// Direction the light travels in
    pub direction: Vec3,
    /// Light color
    pub color: Color,
    /// Ambient color
    pub ambient: Color,
}

impl Default for LightParameters {
    fn default() -> Self {
        Self {
            direction: Vec3::new(1.0, 1.0, 1.0),
            color: Color::WHITE,
            ambient: Color::new(40, 40, 40, 255),
        }
    }
}

/// Host-provided values that hold for the whole frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSettings {
    /// Polygon mode of every draw
    pub render_mode: RenderMode,
    /// Transform applied on top of every effect
    pub local_to_world: Mat4,
    /// View slot being rendered
    pub view_index: usize,
    /// Lighting enabled for model materials
    pub lighting: bool,
    /// Distortion enabled; when off, distortion primitives are skipped
    pub distorting: bool,
    /// Global distortion strength multiplier
    pub distortion_intensity: f32,
    /// Background texture bound after the color textures of distortion draws
    pub background: Option<TextureHandle>,
    /// Light parameters
    pub light: LightParameters,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::Normal,
            local_to_world: Mat4::identity(),
            view_index: 0,
            lighting: true,
            distorting: true,
            distortion_intensity: 1.0,
            background: None,
            light: LightParameters::default(),
        }
    }
}

/// Draw counters since the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Draw calls issued
    pub draw_calls: u64,
    /// Vertices drawn by batched draws
    pub vertices: u64,
    /// Model meshes submitted
    pub mesh_submissions: u64,
    /// Batches skipped by the distorting callback
    pub skipped_batches: u64,
}

/// Borrowed renderer resources for one sub-renderer call
pub struct FrameContext<'a> {
    /// Host backend
    pub backend: &'a mut dyn RenderBackend,
    /// Vertex ring
    pub geometry: &'a mut GeometryBuffer,
    /// Shared quad indices
    pub indices: &'a QuadIndexBuffer,
    /// Both shader variants
    pub shaders: &'a mut ShaderSelector,
    /// Last applied pipeline state
    pub state: &'a mut RenderStateTracker,
    /// Model material instances
    pub materials: &'a mut MaterialCache,
    /// Camera of this frame
    pub camera: &'a CameraState,
    /// Host values of this frame
    pub frame: &'a FrameSettings,
    /// Called before each distortion batch
    pub distorting: Option<&'a mut Box<dyn DistortingCallback>>,
    /// Diagnostic sink
    pub diagnostics: &'a mut Diagnostics,
    /// Draw counters
    pub stats: &'a mut DrawStats,
}
