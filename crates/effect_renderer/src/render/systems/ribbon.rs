//! Ribbon renderer: strips of quads between consecutive joints
//!
//! Each instance is one joint contributing a left and a right vertex. A
//! quad is emitted once the second joint of a pair arrives, so a ribbon of
//! `n` joints produces `n - 1` quads.

use crate::foundation::math::{utils, Color, Mat4, Vec3};
use crate::render::primitives::{CameraState, VertexDistortion};
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::{RibbonInstanceParameter, RibbonNodeParameter};
use crate::render::systems::standard::{DrawState, StandardRenderer};
use crate::render::RenderResult;

/// Left and right vertex of the previous joint
type Joint = [VertexDistortion; 2];

/// Generates ribbon strips
#[derive(Debug, Default)]
pub struct RibbonRenderer {
    previous: Option<Joint>,
}

impl RibbonRenderer {
    /// Create a ribbon renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices reserved per joint
    pub const VERTICES_PER_INSTANCE: usize = 4;

    /// Open a group of `count` joints
    pub fn begin_group(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        _node: &RibbonNodeParameter,
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
        node: &RibbonNodeParameter,
        instance: &RibbonInstanceParameter<'_>,
    ) -> RenderResult<()> {
        if instance.instance_index == 0 {
            self.previous = None;
        }

        let material = instance.material.unwrap_or(&node.material);
        let state = DrawState::from_material(material, ctx)?;
        let joint = Self::joint(node, instance, ctx.camera);

        let Some(previous) = self.previous.replace(joint) else {
            return Ok(());
        };
        let quad = [previous[0], previous[1], joint[0], joint[1]];
        batcher.push(ctx, state, &quad)
    }

    /// Close the group
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>, batcher: &mut StandardRenderer) -> RenderResult<()> {
        self.previous = None;
        batcher.end_group(ctx)
    }

    fn joint(node: &RibbonNodeParameter, instance: &RibbonInstanceParameter<'_>, camera: &CameraState) -> Joint {
        let transform: &Mat4 = &instance.transform;
        let center = utils::translation(transform);
        let axis_x = utils::axis(transform, 0);
        let direction = utils::normalize_or(utils::axis(transform, 1), Vec3::y());

        let offset_axis = if node.view_dependent {
            let facing = camera.front_direction().cross(&direction);
            utils::normalize_or(facing, camera.right()) * axis_x.norm()
        } else {
            axis_x
        };
        let tangent = utils::normalize_or(offset_axis, camera.right());

        let v = joint_v(instance.instance_index, instance.instance_count);
        let vertex = |side: usize, u: f32, color: Color| {
            let position = center + offset_axis * instance.positions[side];
            VertexDistortion::new(position, color, instance.uv.lerp(u, v)).with_tangent_frame(tangent, direction)
        };

        [vertex(0, 0.0, instance.colors[0]), vertex(1, 1.0, instance.colors[1])]
    }
}

/// Normalized position of a joint along its strip
pub(crate) fn joint_v(index: usize, count: usize) -> f32 {
    if count <= 1 {
        0.0
    } else {
        index as f32 / (count - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_offsets_along_local_x() {
        let camera = CameraState::new();
        let instance = RibbonInstanceParameter {
            transform: Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)),
            positions: [-1.0, 2.0],
            ..RibbonInstanceParameter::default()
        };
        let joint = RibbonRenderer::joint(&RibbonNodeParameter::default(), &instance, &camera);

        assert_eq!(joint[0].pos, [-1.0, 5.0, 0.0]);
        assert_eq!(joint[1].pos, [2.0, 5.0, 0.0]);
        assert_eq!(joint[0].binormal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_joint_v_spans_strip() {
        assert_eq!(joint_v(0, 5), 0.0);
        assert_eq!(joint_v(4, 5), 1.0);
        assert_eq!(joint_v(0, 1), 0.0);
    }
}
