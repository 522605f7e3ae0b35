//! Math utilities and types
//!
//! Provides the math types shared by the renderer and the simulation side:
//! nalgebra vector/matrix aliases, packed RGBA8 colors and UV rectangles.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix4, Point3, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type (column vectors, column-major storage)
pub type Mat4 = Matrix4<f32>;

/// Packed 8-bit RGBA color as laid out in vertex memory
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel
    pub a: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Transparent black
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Create a color from its channels
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channel-wise linear interpolation, `t` in `[0, 1]`
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let mix = |a: u8, b: u8| -> u8 {
            utils::lerp(f32::from(a), f32::from(b), t.clamp(0.0, 1.0)).round() as u8
        };
        Self::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Normalized `[r, g, b, a]` in `0.0..=1.0`
    pub fn to_normalized(self) -> [f32; 4] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
            f32::from(self.a) / 255.0,
        ]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Axis-aligned rectangle in texture space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectF {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub w: f32,
    /// Height
    pub h: f32,
}

impl RectF {
    /// The full `0..1` texture rectangle
    pub const UNIT: Self = Self::new(0.0, 0.0, 1.0, 1.0);

    /// Create a rectangle
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Map a normalized `(u, v)` inside the rectangle to texture coordinates
    pub fn lerp(&self, u: f32, v: f32) -> [f32; 2] {
        [self.x + self.w * u, self.y + self.h * v]
    }
}

impl Default for RectF {
    fn default() -> Self {
        Self::UNIT
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Translation column of an affine matrix
    pub fn translation(matrix: &Mat4) -> Vec3 {
        Vec3::new(matrix.m14, matrix.m24, matrix.m34)
    }

    /// Basis column `index` (0 = X, 1 = Y, 2 = Z) of an affine matrix, unnormalized
    pub fn axis(matrix: &Mat4, index: usize) -> Vec3 {
        Vec3::new(matrix[(0, index)], matrix[(1, index)], matrix[(2, index)])
    }

    /// Normalize `v`, returning `fallback` for zero-length input
    pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
        v.try_normalize(f32::EPSILON).unwrap_or(fallback)
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix (depth `0..1`)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let focal = 1.0 / (fov_y * 0.5).tan();
        let depth = far / (near - far);
        Mat4::new(
            focal / aspect, 0.0, 0.0, 0.0,
            0.0, focal, 0.0, 0.0,
            0.0, 0.0, depth, near * depth,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}
