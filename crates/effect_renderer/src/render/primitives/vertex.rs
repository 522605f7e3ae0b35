//! Vertex records and their GPU input layouts
//!
//! Both records are `#[repr(C)]` and `Pod`, so batches are copied into the
//! byte staging memory of the geometry buffer without any `unsafe`.

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::{Color, Vec3};

/// Format of one vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Two 32-bit floats
    Float2,
    /// Three 32-bit floats
    Float3,
    /// Four normalized unsigned bytes
    UNorm8x4,
}

impl VertexFormat {
    /// Size of the attribute in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::UNorm8x4 => 4,
        }
    }
}

/// One attribute of a vertex input layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Shader input location
    pub location: u32,
    /// Attribute format
    pub format: VertexFormat,
    /// Byte offset inside the vertex
    pub offset: usize,
}

/// Vertex input layout descriptor handed to the host when binding a shader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    /// Distance between consecutive vertices in bytes
    pub stride: usize,
    /// Attribute list in location order
    pub attributes: &'static [VertexAttribute],
}

/// Standard vertex: position, packed color and texture coordinate
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position
    pub pos: [f32; 3],
    /// Packed RGBA8 color
    pub col: Color,
    /// Texture coordinate
    pub uv: [f32; 2],
}

/// Distortion vertex: a standard vertex plus tangent and binormal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexDistortion {
    /// Position
    pub pos: [f32; 3],
    /// Packed RGBA8 color
    pub col: Color,
    /// Texture coordinate
    pub uv: [f32; 2],
    /// Tangent (texture U direction)
    pub tangent: [f32; 3],
    /// Binormal (texture V direction)
    pub binormal: [f32; 3],
}

impl VertexDistortion {
    /// Create a vertex with zero tangent frame
    pub fn new(pos: Vec3, col: Color, uv: [f32; 2]) -> Self {
        Self {
            pos: pos.into(),
            col,
            uv,
            tangent: [0.0; 3],
            binormal: [0.0; 3],
        }
    }

    /// Set the tangent frame
    pub fn with_tangent_frame(mut self, tangent: Vec3, binormal: Vec3) -> Self {
        self.tangent = tangent.into();
        self.binormal = binormal.into();
        self
    }
}

impl From<VertexDistortion> for Vertex {
    fn from(v: VertexDistortion) -> Self {
        Self {
            pos: v.pos,
            col: v.col,
            uv: v.uv,
        }
    }
}

/// Vertex types the geometry buffer can hold
///
/// Primitive generators always produce [`VertexDistortion`]; the batcher
/// narrows to the layout of the shader that draws the batch.
pub trait GpuVertex: Pod + From<VertexDistortion> {
    /// Input layout of this vertex type
    const LAYOUT: VertexLayout;
}

const STANDARD_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 },
    VertexAttribute { location: 1, format: VertexFormat::UNorm8x4, offset: 12 },
    VertexAttribute { location: 2, format: VertexFormat::Float2, offset: 16 },
];

const DISTORTION_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 },
    VertexAttribute { location: 1, format: VertexFormat::UNorm8x4, offset: 12 },
    VertexAttribute { location: 2, format: VertexFormat::Float2, offset: 16 },
    VertexAttribute { location: 3, format: VertexFormat::Float3, offset: 24 },
    VertexAttribute { location: 4, format: VertexFormat::Float3, offset: 36 },
];

impl GpuVertex for Vertex {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>(),
        attributes: &STANDARD_ATTRIBUTES,
    };
}

impl GpuVertex for VertexDistortion {
    const LAYOUT: VertexLayout = VertexLayout {
        stride: std::mem::size_of::<Self>(),
        attributes: &DISTORTION_ATTRIBUTES,
    };
}
