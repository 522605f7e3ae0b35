//! Primitive renderers
//!
//! Sprites, ribbons, rings and tracks generate vertices and share the
//! [`StandardRenderer`] batcher; models submit host meshes directly. The
//! facade stores one renderer per family in its registry as a
//! [`PrimitiveRenderer`] and dispatches the group protocol through it.

pub mod billboard;
pub mod context;
pub mod model;
pub mod params;
pub mod ribbon;
pub mod ring;
pub mod sprite;
pub mod standard;
pub mod track;

pub use context::{DrawStats, FrameContext, FrameSettings, LightParameters};
pub use model::ModelRenderer;
pub use params::{
    BillboardType, InstanceParameter, ModelInstanceParameter, ModelNodeParameter, NodeMaterial,
    NodeParameter, PrimitiveFamily, RibbonInstanceParameter, RibbonNodeParameter,
    RingInstanceParameter, RingNodeParameter, SpriteInstanceParameter, SpriteNodeParameter,
    TrackInstanceParameter, TrackNodeParameter,
};
pub use ribbon::RibbonRenderer;
pub use ring::RingRenderer;
pub use sprite::SpriteRenderer;
pub use standard::{DrawState, StandardRenderer};
pub use track::TrackRenderer;

use crate::render::api::ProtocolViolation;
use crate::render::RenderResult;

/// One sub-renderer of the closed set of primitive families
#[derive(Debug)]
pub enum PrimitiveRenderer {
    /// Sprite renderer
    Sprite(SpriteRenderer),
    /// Ribbon renderer
    Ribbon(RibbonRenderer),
    /// Ring renderer
    Ring(RingRenderer),
    /// Track renderer
    Track(TrackRenderer),
    /// Model renderer
    Model(ModelRenderer),
}

impl PrimitiveRenderer {
    /// Create the renderer of a family
    pub fn new(family: PrimitiveFamily) -> Self {
        match family {
            PrimitiveFamily::Sprite => Self::Sprite(SpriteRenderer::new()),
            PrimitiveFamily::Ribbon => Self::Ribbon(RibbonRenderer::new()),
            PrimitiveFamily::Ring => Self::Ring(RingRenderer::new()),
            PrimitiveFamily::Track => Self::Track(TrackRenderer::new()),
            PrimitiveFamily::Model => Self::Model(ModelRenderer::new()),
        }
    }

    /// Family this renderer draws
    pub fn family(&self) -> PrimitiveFamily {
        match self {
            Self::Sprite(_) => PrimitiveFamily::Sprite,
            Self::Ribbon(_) => PrimitiveFamily::Ribbon,
            Self::Ring(_) => PrimitiveFamily::Ring,
            Self::Track(_) => PrimitiveFamily::Track,
            Self::Model(_) => PrimitiveFamily::Model,
        }
    }

    /// `BeginRendering` for one group of `count` instances
    pub fn begin_group(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &NodeParameter<'_>,
        count: usize,
    ) -> RenderResult<()> {
        match (self, node) {
            (Self::Sprite(r), NodeParameter::Sprite(n)) => r.begin_group(ctx, batcher, n, count),
            (Self::Ribbon(r), NodeParameter::Ribbon(n)) => r.begin_group(ctx, batcher, n, count),
            (Self::Ring(r), NodeParameter::Ring(n)) => r.begin_group(ctx, batcher, n, count),
            (Self::Track(r), NodeParameter::Track(n)) => r.begin_group(ctx, batcher, n, count),
            (Self::Model(r), NodeParameter::Model(n)) => {
                r.begin_group(n, count);
                Ok(())
            }
            (renderer, node) => Err(mismatch(renderer.family(), node.family())),
        }
    }

    /// `Rendering` for one instance
    pub fn render(
        &mut self,
        ctx: &mut FrameContext<'_>,
        batcher: &mut StandardRenderer,
        node: &NodeParameter<'_>,
        instance: &InstanceParameter<'_>,
    ) -> RenderResult<()> {
        match (self, node, instance) {
            (Self::Sprite(r), NodeParameter::Sprite(n), InstanceParameter::Sprite(i)) => r.render(ctx, batcher, n, i),
            (Self::Ribbon(r), NodeParameter::Ribbon(n), InstanceParameter::Ribbon(i)) => r.render(ctx, batcher, n, i),
            (Self::Ring(r), NodeParameter::Ring(n), InstanceParameter::Ring(i)) => r.render(ctx, batcher, n, i),
            (Self::Track(r), NodeParameter::Track(n), InstanceParameter::Track(i)) => r.render(ctx, batcher, n, i),
            (Self::Model(r), NodeParameter::Model(n), InstanceParameter::Model(i)) => r.render(ctx, n, i),
            (renderer, node, instance) => {
                let family = renderer.family();
                let received = if node.family() == family { instance.family() } else { node.family() };
                Err(mismatch(family, received))
            }
        }
    }

    /// `EndRendering` for the open group
    pub fn end_group(&mut self, ctx: &mut FrameContext<'_>, batcher: &mut StandardRenderer) -> RenderResult<()> {
        match self {
            Self::Sprite(r) => r.end_group(ctx, batcher),
            Self::Ribbon(r) => r.end_group(ctx, batcher),
            Self::Ring(r) => r.end_group(ctx, batcher),
            Self::Track(r) => r.end_group(ctx, batcher),
            Self::Model(r) => {
                r.end_group();
                Ok(())
            }
        }
    }
}

fn mismatch(expected: PrimitiveFamily, received: PrimitiveFamily) -> crate::render::RenderError {
    ProtocolViolation::ParameterMismatch { expected, received }.into()
}
