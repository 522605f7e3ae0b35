//! Billboard orientation
//!
//! Builds the world-space basis `[right | up | normal | position]` a quad's
//! local corners are expanded with, from the instance transform and the
//! camera.

use crate::foundation::math::{utils, Mat4, Vec3};
use crate::render::primitives::CameraState;
use crate::render::systems::params::BillboardType;

/// Basis of a billboard, columns are scaled right, up, normal and the origin
pub fn basis(billboard: BillboardType, transform: &Mat4, camera: &CameraState) -> Mat4 {
    let position = utils::translation(transform);
    let axis_x = utils::axis(transform, 0);
    let axis_y = utils::axis(transform, 1);
    let scale_x = axis_x.norm();
    let scale_y = axis_y.norm();

    match billboard {
        BillboardType::Fixed => *transform,
        BillboardType::Billboard => {
            let right = camera.right();
            let up = camera.up();
            from_columns(right * scale_x, up * scale_y, -camera.front_direction(), position)
        }
        BillboardType::RotatedBillboard => {
            let camera_right = camera.right();
            let camera_up = camera.up();
            // In-plane rotation of the instance, measured in the camera plane.
            let angle = axis_x.dot(&camera_up).atan2(axis_x.dot(&camera_right));
            let (sin, cos) = angle.sin_cos();
            let right = camera_right * cos + camera_up * sin;
            let up = camera_up * cos - camera_right * sin;
            from_columns(right * scale_x, up * scale_y, -camera.front_direction(), position)
        }
        BillboardType::YAxisFixed => {
            let up = utils::normalize_or(axis_y, Vec3::y());
            let to_camera = camera.position() - position;
            let projected = to_camera - up * up.dot(&to_camera);
            let normal = projected
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(|| -camera.front_direction());
            let right = utils::normalize_or(up.cross(&normal), camera.right());
            from_columns(right * scale_x, up * scale_y, normal, position)
        }
    }
}

fn from_columns(right: Vec3, up: Vec3, normal: Vec3, position: Vec3) -> Mat4 {
    Mat4::new(
        right.x, up.x, normal.x, position.x,
        right.y, up.y, normal.y, position.y,
        right.z, up.z, normal.z, position.z,
        0.0, 0.0, 0.0, 1.0,
    )
}
