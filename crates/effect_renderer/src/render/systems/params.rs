//! Node and instance parameters handed over by the simulation
//!
//! Node parameters describe one effect layer and stay the same for a whole
//! group; instance parameters describe one primitive. Both are borrowed for
//! the duration of a single call and never retained.

use std::fmt;

use crate::assets::ModelAsset;
use crate::foundation::math::{Color, Mat4, RectF, Vec2};
use crate::render::api::TextureHandle;
use crate::render::resources::{AlphaBlendMode, CullingMode, TextureFilter, TextureWrap};

/// The five primitive families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveFamily {
    /// Camera-facing or fixed quads
    Sprite,
    /// Strips of quads between consecutive joints
    Ribbon,
    /// Segmented rings
    Ring,
    /// Camera-facing trails
    Track,
    /// Host mesh assets
    Model,
}

impl fmt::Display for PrimitiveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sprite => "sprite",
            Self::Ribbon => "ribbon",
            Self::Ring => "ring",
            Self::Track => "track",
            Self::Model => "model",
        };
        f.write_str(name)
    }
}

/// How a quad is oriented relative to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BillboardType {
    /// Faces the camera, upright in screen space
    #[default]
    Billboard,
    /// Faces the camera, keeps the instance's rotation around the view axis
    RotatedBillboard,
    /// Up axis locked to the instance's Y axis, turns around it toward the camera
    YAxisFixed,
    /// Uses the instance transform as is
    Fixed,
}

/// Material shared by every primitive of a layer
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMaterial {
    /// Textures in slot order; more than 16 is an error at draw time
    pub textures: Vec<TextureHandle>,
    /// Blend equation
    pub alpha_blend: AlphaBlendMode,
    /// Depth test
    pub depth_test: bool,
    /// Depth write
    pub depth_write: bool,
    /// Face culling
    pub culling: CullingMode,
    /// Sampler filter
    pub texture_filter: TextureFilter,
    /// Sampler wrap
    pub texture_wrap: TextureWrap,
    /// Draw with the distortion shader
    pub distortion: bool,
    /// Distortion strength
    pub distortion_intensity: f32,
}

impl NodeMaterial {
    /// Whether any texture is bound
    pub fn use_texture(&self) -> bool {
        !self.textures.is_empty()
    }
}

impl Default for NodeMaterial {
    fn default() -> Self {
        Self {
            textures: Vec::new(),
            alpha_blend: AlphaBlendMode::Blend,
            depth_test: true,
            depth_write: false,
            culling: CullingMode::Double,
            texture_filter: TextureFilter::Linear,
            texture_wrap: TextureWrap::Repeat,
            distortion: false,
            distortion_intensity: 1.0,
        }
    }
}

/// Sprite layer parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteNodeParameter {
    /// Layer material
    pub material: NodeMaterial,
    /// Orientation rule
    pub billboard: BillboardType,
}

/// One sprite
///
/// Corners are ordered lower-left, lower-right, upper-left, upper-right.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteInstanceParameter<'a> {
    /// Per-corner colors
    pub colors: [Color; 4],
    /// Per-corner local positions
    pub positions: [Vec2; 4],
    /// UV rectangle
    pub uv: RectF,
    /// Instance SRT matrix
    pub transform: Mat4,
    /// Replaces the layer material for this sprite
    pub material: Option<&'a NodeMaterial>,
}

impl Default for SpriteInstanceParameter<'_> {
    fn default() -> Self {
        Self {
            colors: [Color::WHITE; 4],
            positions: [
                Vec2::new(-0.5, -0.5),
                Vec2::new(0.5, -0.5),
                Vec2::new(-0.5, 0.5),
                Vec2::new(0.5, 0.5),
            ],
            uv: RectF::UNIT,
            transform: Mat4::identity(),
            material: None,
        }
    }
}

/// Ribbon layer parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RibbonNodeParameter {
    /// Layer material
    pub material: NodeMaterial,
    /// Turn the joint offsets toward the camera
    pub view_dependent: bool,
}

/// One ribbon joint
#[derive(Debug, Clone, PartialEq)]
pub struct RibbonInstanceParameter<'a> {
    /// Left and right colors
    pub colors: [Color; 2],
    /// Left and right offsets along the joint's local X axis
    pub positions: [f32; 2],
    /// UV rectangle of the whole ribbon
    pub uv: RectF,
    /// Joint SRT matrix; Y is the direction of travel
    pub transform: Mat4,
    /// Index of this joint in its ribbon; 0 starts a new ribbon
    pub instance_index: usize,
    /// Number of joints in the ribbon
    pub instance_count: usize,
    /// Replaces the layer material for this joint
    pub material: Option<&'a NodeMaterial>,
}

impl Default for RibbonInstanceParameter<'_> {
    fn default() -> Self {
        Self {
            colors: [Color::WHITE; 2],
            positions: [-0.5, 0.5],
            uv: RectF::UNIT,
            transform: Mat4::identity(),
            instance_index: 0,
            instance_count: 1,
            material: None,
        }
    }
}

/// Track layer parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackNodeParameter {
    /// Layer material
    pub material: NodeMaterial,
}

/// One track joint
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInstanceParameter<'a> {
    /// Left, center and right colors
    pub colors: [Color; 3],
    /// Full width of the trail at this joint
    pub width: f32,
    /// UV rectangle of the whole trail
    pub uv: RectF,
    /// Joint SRT matrix; Y is the direction of travel
    pub transform: Mat4,
    /// Index of this joint in its trail; 0 starts a new trail
    pub instance_index: usize,
    /// Number of joints in the trail
    pub instance_count: usize,
    /// Replaces the layer material for this joint
    pub material: Option<&'a NodeMaterial>,
}

impl Default for TrackInstanceParameter<'_> {
    fn default() -> Self {
        Self {
            colors: [Color::WHITE; 3],
            width: 1.0,
            uv: RectF::UNIT,
            transform: Mat4::identity(),
            instance_index: 0,
            instance_count: 1,
            material: None,
        }
    }
}

/// Ring layer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RingNodeParameter {
    /// Layer material
    pub material: NodeMaterial,
    /// Orientation rule
    pub billboard: BillboardType,
    /// Segments per ring
    pub division: u32,
}

impl Default for RingNodeParameter {
    fn default() -> Self {
        Self {
            material: NodeMaterial::default(),
            billboard: BillboardType::Billboard,
            division: 16,
        }
    }
}

/// One ring
///
/// Locations are `(radius, height)` pairs; height runs along the ring's
/// local Z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct RingInstanceParameter<'a> {
    /// Swept angle in degrees
    pub view_angle: f32,
    /// Outer edge
    pub outer_location: Vec2,
    /// Inner edge
    pub inner_location: Vec2,
    /// Position of the center line between inner (0) and outer (1)
    pub center_ratio: f32,
    /// Outer edge color
    pub outer_color: Color,
    /// Center line color
    pub center_color: Color,
    /// Inner edge color
    pub inner_color: Color,
    /// Instance SRT matrix
    pub transform: Mat4,
    /// UV rectangle
    pub uv: RectF,
    /// Replaces the layer material for this ring
    pub material: Option<&'a NodeMaterial>,
}

impl Default for RingInstanceParameter<'_> {
    fn default() -> Self {
        Self {
            view_angle: 360.0,
            outer_location: Vec2::new(1.0, 0.0),
            inner_location: Vec2::new(0.5, 0.0),
            center_ratio: 0.5,
            outer_color: Color::WHITE,
            center_color: Color::WHITE,
            inner_color: Color::WHITE,
            transform: Mat4::identity(),
            uv: RectF::UNIT,
            material: None,
        }
    }
}

/// Model layer parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelNodeParameter<'a> {
    /// Layer material
    pub material: NodeMaterial,
    /// Model to draw; layers without a model draw nothing
    pub model: Option<&'a ModelAsset>,
    /// Lit material
    pub lighting: bool,
}

/// One model instance
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstanceParameter {
    /// Instance SRT matrix
    pub transform: Mat4,
    /// UV rectangle
    pub uv: RectF,
    /// Tint
    pub color: Color,
    /// Animation time in frames
    pub time: i32,
}

impl Default for ModelInstanceParameter {
    fn default() -> Self {
        Self {
            transform: Mat4::identity(),
            uv: RectF::UNIT,
            color: Color::WHITE,
            time: 0,
        }
    }
}

/// Node parameters of any family
#[derive(Debug, Clone, Copy)]
pub enum NodeParameter<'a> {
    /// Sprite layer
    Sprite(&'a SpriteNodeParameter),
    /// Ribbon layer
    Ribbon(&'a RibbonNodeParameter),
    /// Ring layer
    Ring(&'a RingNodeParameter),
    /// Track layer
    Track(&'a TrackNodeParameter),
    /// Model layer
    Model(&'a ModelNodeParameter<'a>),
}

impl NodeParameter<'_> {
    /// Family of these parameters
    pub fn family(&self) -> PrimitiveFamily {
        match self {
            Self::Sprite(_) => PrimitiveFamily::Sprite,
            Self::Ribbon(_) => PrimitiveFamily::Ribbon,
            Self::Ring(_) => PrimitiveFamily::Ring,
            Self::Track(_) => PrimitiveFamily::Track,
            Self::Model(_) => PrimitiveFamily::Model,
        }
    }
}

/// Instance parameters of any family
#[derive(Debug, Clone, Copy)]
pub enum InstanceParameter<'a> {
    /// One sprite
    Sprite(&'a SpriteInstanceParameter<'a>),
    /// One ribbon joint
    Ribbon(&'a RibbonInstanceParameter<'a>),
    /// One ring
    Ring(&'a RingInstanceParameter<'a>),
    /// One track joint
    Track(&'a TrackInstanceParameter<'a>),
    /// One model instance
    Model(&'a ModelInstanceParameter),
}

impl InstanceParameter<'_> {
    /// Family of these parameters
    pub fn family(&self) -> PrimitiveFamily {
        match self {
            Self::Sprite(_) => PrimitiveFamily::Sprite,
            Self::Ribbon(_) => PrimitiveFamily::Ribbon,
            Self::Ring(_) => PrimitiveFamily::Ring,
            Self::Track(_) => PrimitiveFamily::Track,
            Self::Model(_) => PrimitiveFamily::Model,
        }
    }
}
