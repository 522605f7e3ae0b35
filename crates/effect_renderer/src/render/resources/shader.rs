//! Shader variants and selection
//!
//! The renderer owns exactly two programs: standard and distortion. Which one
//! a batch uses is a pure function of its texture and distortion flags, and
//! binding is idempotent so repeated batches with the same shader cost no
//! extra backend calls.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Mat4, RectF};
use crate::render::api::{RenderBackend, ShaderProgramHandle};
use crate::render::primitives::{GpuVertex, Vertex, VertexDistortion, VertexLayout};
use crate::render::RenderResult;

/// The two shader variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Textured, vertex-colored
    Standard,
    /// Samples the background and warps it along the tangent frame
    Distortion,
}

impl ShaderKind {
    /// Pick the variant for a draw
    ///
    /// Distortion always wins: only that variant's layout carries tangent
    /// and binormal.
    pub const fn resolve(_use_texture: bool, use_distortion: bool) -> Self {
        if use_distortion {
            Self::Distortion
        } else {
            Self::Standard
        }
    }

    /// Vertex layout consumed by this variant
    pub const fn layout(self) -> VertexLayout {
        match self {
            Self::Standard => Vertex::LAYOUT,
            Self::Distortion => VertexDistortion::LAYOUT,
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Standard => 0,
            Self::Distortion => 1,
        }
    }
}

/// A created shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shader {
    /// Variant
    pub kind: ShaderKind,
    /// Host program
    pub program: ShaderProgramHandle,
    /// Vertex input layout
    pub layout: VertexLayout,
}

/// Vertex-stage constants shared by both variants
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexConstants {
    /// `projection * camera`, column-major
    pub camera_projection: [[f32; 4]; 4],
    /// UV offset and scale applied after the vertex UV
    pub uv_offset_scale: [f32; 4],
}

impl VertexConstants {
    /// Build from the camera-projection matrix
    pub fn new(camera_projection: &Mat4, uv: RectF) -> Self {
        Self {
            camera_projection: (*camera_projection).into(),
            uv_offset_scale: [uv.x, uv.y, uv.w, uv.h],
        }
    }
}

/// Pixel-stage constants of the distortion variant
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PixelConstants {
    /// Distortion strength, padded to 16 bytes
    pub distortion_intensity: [f32; 4],
}

impl PixelConstants {
    /// Build from an intensity
    pub fn new(intensity: f32) -> Self {
        Self {
            distortion_intensity: [intensity, 0.0, 0.0, 0.0],
        }
    }
}

/// Owns both shader programs and tracks which one is bound
#[derive(Debug)]
pub struct ShaderSelector {
    shaders: [Option<Shader>; 2],
    bound: Option<ShaderKind>,
    switches: u64,
}

impl ShaderSelector {
    /// Create both programs on the host
    pub fn create(backend: &mut dyn RenderBackend) -> RenderResult<Self> {
        let mut selector = Self {
            shaders: [None, None],
            bound: None,
            switches: 0,
        };
        selector.recreate(backend)?;
        Ok(selector)
    }

    /// Resolve and return the shader for a draw
    pub fn resolve(&self, use_texture: bool, use_distortion: bool) -> Option<&Shader> {
        self.get(ShaderKind::resolve(use_texture, use_distortion))
    }

    /// Shader of a variant, `None` after the device was lost
    pub fn get(&self, kind: ShaderKind) -> Option<&Shader> {
        self.shaders[kind.index()].as_ref()
    }

    /// Currently bound variant
    pub fn bound(&self) -> Option<ShaderKind> {
        self.bound
    }

    /// Number of times a program was actually bound
    pub fn switches(&self) -> u64 {
        self.switches
    }

    /// Bind a variant; no-op when it is already bound
    ///
    /// A different bound variant is ended first.
    pub fn begin(&mut self, kind: ShaderKind, backend: &mut dyn RenderBackend) -> Option<Shader> {
        let shader = *self.get(kind)?;
        if self.bound == Some(kind) {
            return Some(shader);
        }

        self.end_any(backend);
        backend.bind_shader(shader.program, &shader.layout);
        self.bound = Some(kind);
        self.switches += 1;
        log::trace!("Bound {:?} shader", kind);
        Some(shader)
    }

    /// Unbind a variant if it is the bound one
    pub fn end(&mut self, kind: ShaderKind, backend: &mut dyn RenderBackend) {
        if self.bound != Some(kind) {
            return;
        }
        if let Some(shader) = self.get(kind) {
            backend.unbind_shader(shader.program);
        }
        self.bound = None;
    }

    /// Unbind whatever is bound
    pub fn end_any(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(kind) = self.bound {
            self.end(kind, backend);
        }
    }

    /// Forget both programs after device loss
    pub fn invalidate(&mut self) {
        self.shaders = [None, None];
        self.bound = None;
    }

    /// (Re)create both programs
    pub fn recreate(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        for kind in [ShaderKind::Standard, ShaderKind::Distortion] {
            let layout = kind.layout();
            let program = backend.create_shader(kind, &layout)?;
            self.shaders[kind.index()] = Some(Shader { kind, program, layout });
        }
        self.bound = None;
        Ok(())
    }

    /// Release both programs
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        self.end_any(backend);
        for shader in self.shaders.iter_mut().filter_map(Option::take) {
            backend.release_shader(shader.program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backends::{BackendCommand, RecordingBackend};

    #[test]
    fn test_resolve_is_pure_and_distortion_wins() {
        assert_eq!(ShaderKind::resolve(false, false), ShaderKind::Standard);
        assert_eq!(ShaderKind::resolve(true, false), ShaderKind::Standard);
        assert_eq!(ShaderKind::resolve(false, true), ShaderKind::Distortion);
        assert_eq!(ShaderKind::resolve(true, true), ShaderKind::Distortion);
        for _ in 0..3 {
            assert_eq!(ShaderKind::resolve(true, true), ShaderKind::Distortion);
        }
    }

    #[test]
    fn test_begin_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let mut selector = ShaderSelector::create(&mut backend).unwrap();
        backend.clear();

        selector.begin(ShaderKind::Standard, &mut backend).unwrap();
        selector.begin(ShaderKind::Standard, &mut backend).unwrap();

        assert_eq!(backend.count(|c| matches!(c, BackendCommand::BindShader { .. })), 1);
        assert_eq!(selector.switches(), 1);
    }

    #[test]
    fn test_switch_ends_previous_shader() {
        let mut backend = RecordingBackend::new();
        let mut selector = ShaderSelector::create(&mut backend).unwrap();
        let standard = selector.get(ShaderKind::Standard).unwrap().program;
        backend.clear();

        selector.begin(ShaderKind::Standard, &mut backend).unwrap();
        selector.begin(ShaderKind::Distortion, &mut backend).unwrap();

        assert_eq!(backend.commands()[1], BackendCommand::UnbindShader(standard));
        assert_eq!(selector.bound(), Some(ShaderKind::Distortion));
    }

    #[test]
    fn test_invalidated_selector_binds_nothing() {
        let mut backend = RecordingBackend::new();
        let mut selector = ShaderSelector::create(&mut backend).unwrap();
        selector.invalidate();
        assert!(selector.begin(ShaderKind::Standard, &mut backend).is_none());

        selector.recreate(&mut backend).unwrap();
        assert!(selector.begin(ShaderKind::Standard, &mut backend).is_some());
    }

    #[test]
    fn test_constant_sizes() {
        assert_eq!(std::mem::size_of::<VertexConstants>(), 80);
        assert_eq!(std::mem::size_of::<PixelConstants>(), 16);
    }
}
