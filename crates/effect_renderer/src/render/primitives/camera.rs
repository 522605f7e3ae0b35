//! Per-frame camera state
//!
//! The host sets projection and view matrices once per frame. Camera position
//! and front direction are derived from the view matrix unless the host
//! overrides them, which some back-ends need because their matrix-derived
//! values are unreliable.

use crate::foundation::math::{utils, Mat4, Vec3};

/// Camera matrices and derived vectors held by the renderer facade
///
/// View space is right-handed: the camera looks down -Z, so rows 0, 1 and 2
/// of the view rotation are right, up and -front.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    projection: Mat4,
    camera: Mat4,
    camera_projection: Mat4,
    position: Vec3,
    front: Vec3,
    manual_override: bool,
}

impl CameraState {
    /// Create an identity camera at the origin looking down -Z
    pub fn new() -> Self {
        Self {
            projection: Mat4::identity(),
            camera: Mat4::identity(),
            camera_projection: Mat4::identity(),
            position: Vec3::zeros(),
            front: -Vec3::z(),
            manual_override: false,
        }
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Set the projection matrix
    pub fn set_projection_matrix(&mut self, projection: Mat4) {
        self.projection = projection;
        self.update_camera_projection();
    }

    /// View (camera) matrix
    pub fn camera_matrix(&self) -> &Mat4 {
        &self.camera
    }

    /// Set the view matrix
    ///
    /// Position and front are re-derived from the new matrix, and any manual
    /// override set through [`Self::set_camera_parameter`] is cleared.
    pub fn set_camera_matrix(&mut self, camera: Mat4) {
        self.camera = camera;
        self.manual_override = false;

        // A singular view matrix leaves position at the origin.
        self.position = camera
            .try_inverse()
            .map_or_else(Vec3::zeros, |inverse| utils::translation(&inverse));
        self.front = utils::normalize_or(-Self::row(&camera, 2), -Vec3::z());

        self.update_camera_projection();
        log::trace!("Camera matrix set, position {:?}, front {:?}", self.position, self.front);
    }

    /// `projection * camera`
    pub fn camera_projection_matrix(&self) -> &Mat4 {
        &self.camera_projection
    }

    /// Camera position in world space
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Direction the camera looks in, world space
    pub fn front_direction(&self) -> Vec3 {
        self.front
    }

    /// Override position and front direction until the next camera matrix
    pub fn set_camera_parameter(&mut self, front: Vec3, position: Vec3) {
        self.front = utils::normalize_or(front, -Vec3::z());
        self.position = position;
        self.manual_override = true;
    }

    /// Whether position and front come from [`Self::set_camera_parameter`]
    pub fn is_overridden(&self) -> bool {
        self.manual_override
    }

    /// Camera right axis in world space
    pub fn right(&self) -> Vec3 {
        utils::normalize_or(Self::row(&self.camera, 0), Vec3::x())
    }

    /// Camera up axis in world space
    pub fn up(&self) -> Vec3 {
        utils::normalize_or(Self::row(&self.camera, 1), Vec3::y())
    }

    fn row(matrix: &Mat4, index: usize) -> Vec3 {
        Vec3::new(matrix[(index, 0)], matrix[(index, 1)], matrix[(index, 2)])
    }

    fn update_camera_projection(&mut self) {
        self.camera_projection = self.projection * self.camera;
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn looking_at_origin() -> Mat4 {
        Mat4::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y())
    }

    #[test]
    fn test_position_and_front_derived_from_matrix() {
        let mut camera = CameraState::new();
        camera.set_camera_matrix(looking_at_origin());

        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-4);
        assert_relative_eq!(camera.front_direction(), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(camera.right(), Vec3::x(), epsilon = 1e-5);
        assert_relative_eq!(camera.up(), Vec3::y(), epsilon = 1e-5);
    }

    #[test]
    fn test_manual_override_cleared_by_next_matrix() {
        let mut camera = CameraState::new();
        camera.set_camera_parameter(Vec3::x(), Vec3::new(1.0, 2.0, 3.0));
        assert!(camera.is_overridden());
        assert_eq!(camera.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(camera.front_direction(), Vec3::x());

        camera.set_camera_matrix(looking_at_origin());
        assert!(!camera.is_overridden());
        assert_relative_eq!(camera.position(), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-4);
    }

    #[test]
    fn test_camera_projection_is_product() {
        let mut camera = CameraState::new();
        let projection = Mat4::perspective(1.0, 1.5, 0.1, 100.0);
        camera.set_projection_matrix(projection);
        camera.set_camera_matrix(looking_at_origin());

        assert_relative_eq!(
            *camera.camera_projection_matrix(),
            projection * looking_at_origin(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_singular_matrix_keeps_origin() {
        let mut camera = CameraState::new();
        camera.set_camera_matrix(Mat4::zeros());
        assert_eq!(camera.position(), Vec3::zeros());
        assert_eq!(camera.front_direction(), -Vec3::z());
    }
}
