//! Sprite renderer: one quad per instance

use nalgebra::Point3;

use crate::foundation::math::utils;
use crate::render::primitives::VertexDistortion;
use crate::render::systems::billboard;
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::{SpriteInstanceParameter, SpriteNodeParameter};
use crate::render::systems::standard::{DrawState, StandardRenderer};
use crate::render::RenderResult;

/// UV corner of each vertex, lower-left, lower-right, upper-left, upper-right
const CORNER_UV: [(f32, f32); 4] = [(0.0, 1.0), (1.0, 1.0), (0.0, 0.0), (1.0, 0.0)];

/// Generates sprite quads
#[derive(Debug, Default)]
pub struct SpriteRenderer;

impl SpriteRenderer {
    /// Create a sprite renderer
    pub fn new() -> Self {
        Self
    }

    /// Vertices reserved per instance
    pub const VERTICES_PER_INSTANCE: usize = 4;

    /// Open a group of `count` sprites
    pub fn begin_group(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        _node: &SpriteNodeParameter,
        count: usize,
    ) -> RenderResult<()> {
        batcher.begin_group(ctx, count * Self::VERTICES_PER_INSTANCE)
    }

    /// Add one sprite
    pub fn render(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &SpriteNodeParameter,
        instance: &SpriteInstanceParameter<'_>,
    ) -> RenderResult<()> {
        let material = instance.material.unwrap_or(&node.material);
        let state = DrawState::from_material(material, ctx)?;
        let vertices = Self::vertices(node, instance, ctx);
        batcher.push(ctx, state, &vertices)
    }

    /// Close the group
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>, batcher: &mut StandardRenderer) -> RenderResult<()> {
        batcher.end_group(ctx)
    }

    fn vertices(
        node: &SpriteNodeParameter,
        instance: &SpriteInstanceParameter<'_>,
        ctx: &FrameContext<'_>,
    ) -> [VertexDistortion; 4] {
        let basis = billboard::basis(node.billboard, &instance.transform, ctx.camera);
        let tangent = utils::normalize_or(utils::axis(&basis, 0), ctx.camera.right());
        let binormal = utils::normalize_or(utils::axis(&basis, 1), ctx.camera.up());

        std::array::from_fn(|i| {
            let local = instance.positions[i];
            let position = basis.transform_point(&Point3::new(local.x, local.y, 0.0));
            let (u, v) = CORNER_UV[i];
            VertexDistortion::new(position.coords, instance.colors[i], instance.uv.lerp(u, v))
                .with_tangent_frame(tangent, binormal)
        })
    }
}
