//! Track renderer: camera-facing trails
//!
//! Each joint contributes a left, center and right vertex spread across the
//! joint's width, perpendicular to both the direction of travel and the view
//! direction. Two consecutive joints form two quads.

use crate::foundation::math::{utils, Vec3};
use crate::render::primitives::{CameraState, VertexDistortion};
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::{TrackInstanceParameter, TrackNodeParameter};
use crate::render::systems::ribbon::joint_v;
use crate::render::systems::standard::{DrawState, StandardRenderer};
use crate::render::RenderResult;

type Joint = [VertexDistortion; 3];

/// Generates trails
#[derive(Debug, Default)]
pub struct TrackRenderer {
    previous: Option<Joint>,
}

impl TrackRenderer {
    /// Create a track renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices reserved per joint
    pub const VERTICES_PER_INSTANCE: usize = 8;

    /// Open a group of `count` joints
    pub fn begin_group(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        _node: &TrackNodeParameter,
        count: usize,
    ) -> RenderResult<()> {
        self.previous = None;
        batcher.begin_group(ctx, count.saturating_sub(1) * Self::VERTICES_PER_INSTANCE)
    }

    /// Add one joint
    pub fn render(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &TrackNodeParameter,
        instance: &TrackInstanceParameter<'_>,
    ) -> RenderResult<()> {
        if instance.instance_index == 0 {
            self.previous = None;
        }

        let material = instance.material.unwrap_or(&node.material);
        let state = DrawState::from_material(material, ctx)?;
        let joint = Self::joint(instance, ctx.camera);

        let Some(p) = self.previous.replace(joint) else {
            return Ok(());
        };
        let quads = [p[0], p[1], joint[0], joint[1], p[1], p[2], joint[1], joint[2]];
        batcher.push(ctx, state, &quads)
    }

    /// Close the group
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>, batcher: &mut StandardRenderer) -> RenderResult<()> {
        self.previous = None;
        batcher.end_group(ctx)
    }

    fn joint(instance: &TrackInstanceParameter<'_>, camera: &CameraState) -> Joint {
        let center = utils::translation(&instance.transform);
        let direction = utils::normalize_or(utils::axis(&instance.transform, 1), Vec3::y());
        let across = utils::normalize_or(camera.front_direction().cross(&direction), camera.right());
        let half = instance.width * 0.5;

        let v = joint_v(instance.instance_index, instance.instance_count);
        let vertex = |i: usize, offset: f32, u: f32| {
            VertexDistortion::new(center + across * offset, instance.colors[i], instance.uv.lerp(u, v))
                .with_tangent_frame(across, direction)
        };

        [vertex(0, -half, 0.0), vertex(1, 0.0, 0.5), vertex(2, half, 1.0)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4;
    use approx::assert_relative_eq;

    #[test]
    fn test_joint_spreads_across_view() {
        // Default camera looks down -Z; a joint travelling along +Y spreads along X.
        let camera = CameraState::new();
        let instance = TrackInstanceParameter {
            width: 2.0,
            transform: Mat4::new_translation(&Vec3::new(0.0, 0.0, -3.0)),
            ..TrackInstanceParameter::default()
        };
        let joint = TrackRenderer::joint(&instance, &camera);

        let left = Vec3::from(joint[0].pos);
        let right = Vec3::from(joint[2].pos);
        assert_relative_eq!((right - left).norm(), 2.0, epsilon = 1e-5);
        assert_relative_eq!(Vec3::from(joint[1].pos), Vec3::new(0.0, 0.0, -3.0), epsilon = 1e-6);
        assert_relative_eq!(left.y, 0.0, epsilon = 1e-6);
    }
}
