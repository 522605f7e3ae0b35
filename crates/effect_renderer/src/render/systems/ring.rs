//! Ring renderer: segmented rings
//!
//! A ring is swept over `view_angle` degrees in `division` segments. Each
//! segment emits two quads, outer edge to center line and center line to
//! inner edge, for 8 vertices per segment.

use nalgebra::Point3;

use crate::foundation::math::{utils, Color, Mat4, Vec2, Vec3};
use crate::render::primitives::VertexDistortion;
use crate::render::systems::billboard;
use crate::render::systems::context::FrameContext;
use crate::render::systems::params::{RingInstanceParameter, RingNodeParameter};
use crate::render::systems::standard::{DrawState, StandardRenderer};
use crate::render::RenderResult;

/// Generates rings
#[derive(Debug, Default)]
pub struct RingRenderer {
    scratch: Vec<VertexDistortion>,
}

impl RingRenderer {
    /// Create a ring renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices emitted per segment
    pub const VERTICES_PER_SEGMENT: usize = 8;

    /// Open a group of `count` rings
    pub fn begin_group(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &RingNodeParameter,
        count: usize,
    ) -> RenderResult<()> {
        let per_ring = node.division as usize * Self::VERTICES_PER_SEGMENT;
        batcher.begin_group(ctx, count.saturating_mul(per_ring))
    }

    /// Add one ring
    pub fn render(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &RingNodeParameter,
        instance: &RingInstanceParameter<'_>,
    ) -> RenderResult<()> {
        if node.division == 0 {
            return Ok(());
        }

        let material = instance.material.unwrap_or(&node.material);
        let state = DrawState::from_material(material, ctx)?;
        let basis = billboard::basis(node.billboard, &instance.transform, ctx.camera);

        self.scratch.clear();
        Self::generate(&mut self.scratch, node.division, instance, &basis);
        batcher.push(ctx, state, &self.scratch)
    }

    /// Close the group
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>, batcher: &mut StandardRenderer) -> RenderResult<()> {
        batcher.end_group(ctx)
    }

    fn generate(out: &mut Vec<VertexDistortion>, division: u32, instance: &RingInstanceParameter<'_>, basis: &Mat4) {
        let step = utils::deg_to_rad(instance.view_angle) / division as f32;
        let ratio = instance.center_ratio.clamp(0.0, 1.0);
        let center_location = instance.inner_location.lerp(&instance.outer_location, ratio);

        // v runs from the outer edge (0) to the inner edge (1).
        let rows: [(Vec2, Color, f32); 3] = [
            (instance.outer_location, instance.outer_color, 0.0),
            (center_location, instance.center_color, 1.0 - ratio),
            (instance.inner_location, instance.inner_color, 1.0),
        ];

        let point = |location: Vec2, angle: f32| -> Vec3 {
            let (sin, cos) = angle.sin_cos();
            let local = Point3::new(cos * location.x, sin * location.x, location.y);
            basis.transform_point(&local).coords
        };

        for segment in 0..division {
            let a0 = step * segment as f32;
            let a1 = a0 + step;
            let u0 = segment as f32 / division as f32;
            let u1 = (segment + 1) as f32 / division as f32;

            // Tangent follows the sweep at the segment's midpoint, binormal points outward.
            let mid = (a0 + a1) * 0.5;
            let (sin, cos) = mid.sin_cos();
            let tangent = utils::normalize_or(basis.transform_vector(&Vec3::new(-sin, cos, 0.0)), Vec3::x());
            let binormal = utils::normalize_or(basis.transform_vector(&Vec3::new(cos, sin, 0.0)), Vec3::y());

            let vertex = |row: usize, angle: f32, u: f32| {
                let (location, color, v) = rows[row];
                VertexDistortion::new(point(location, angle), color, instance.uv.lerp(u, v))
                    .with_tangent_frame(tangent, binormal)
            };

            // Outer to center, then center to inner; lower edge is the inner one.
            for (upper, lower) in [(0, 1), (1, 2)] {
                out.extend_from_slice(&[
                    vertex(lower, a0, u0),
                    vertex(lower, a1, u1),
                    vertex(upper, a0, u0),
                    vertex(upper, a1, u1),
                ]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vertex_count_per_division() {
        let mut out = Vec::new();
        RingRenderer::generate(&mut out, 12, &RingInstanceParameter::default(), &Mat4::identity());
        assert_eq!(out.len(), 12 * RingRenderer::VERTICES_PER_SEGMENT);
    }

    #[test]
    fn test_radii_follow_locations() {
        let instance = RingInstanceParameter {
            outer_location: Vec2::new(2.0, 0.0),
            inner_location: Vec2::new(1.0, 0.0),
            center_ratio: 0.5,
            ..RingInstanceParameter::default()
        };
        let mut out = Vec::new();
        RingRenderer::generate(&mut out, 4, &instance, &Mat4::identity());

        // First quad: lower edge is the center line, upper edge the outer edge.
        assert_relative_eq!(Vec3::from(out[0].pos).norm(), 1.5, epsilon = 1e-5);
        assert_relative_eq!(Vec3::from(out[2].pos).norm(), 2.0, epsilon = 1e-5);
        // Second quad: lower edge is the inner edge.
        assert_relative_eq!(Vec3::from(out[4].pos).norm(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_partial_sweep_ends_at_view_angle() {
        let instance = RingInstanceParameter {
            view_angle: 90.0,
            ..RingInstanceParameter::default()
        };
        let mut out = Vec::new();
        RingRenderer::generate(&mut out, 3, &instance, &Mat4::identity());

        let last_outer = Vec3::from(out[out.len() - 5].pos);
        assert_relative_eq!(last_outer, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }
}
