//! # Effect Renderer
//!
//! A rendering backend that lets a particle-effect simulation draw its output
//! (sprites, ribbons, rings, tracks and models) through a host engine's
//! rendering interfaces.
//!
//! ## Features
//!
//! - **Batching**: Consecutive primitives that share shader, texture set and
//!   pipeline state are merged into a single draw call
//! - **Two Shader Variants**: Standard textured/colored and screen distortion
//! - **Minimal State Changes**: Render state is diffed before every draw
//! - **Host Agnostic**: All GPU work goes through the [`render::RenderBackend`] trait
//! - **Device Loss**: Explicit lost/reset lifecycle gating every operation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use effect_renderer::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = Box::new(RecordingBackend::new());
//!     let mut renderer = Renderer::new(backend, RendererConfig::default())?;
//!     let sprites = renderer.create_sprite_renderer();
//!
//!     renderer.begin_rendering()?;
//!     let node = SpriteNodeParameter::default();
//!     renderer.begin_group(sprites, &NodeParameter::Sprite(&node), 1)?;
//!     renderer.render_instance(
//!         sprites,
//!         &NodeParameter::Sprite(&node),
//!         &InstanceParameter::Sprite(&SpriteInstanceParameter::default()),
//!     )?;
//!     renderer.end_group(sprites, &NodeParameter::Sprite(&node))?;
//!     renderer.end_rendering()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod assets;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        assets::{FileInterface, ModelAsset, ModelLoader, StdFileInterface, TextureLoader},
        config::{Config, ConfigError},
        foundation::math::{Color, Mat4, RectF, Vec2, Vec3},
        render::{
            AlphaBlendMode, BillboardType, CullingMode, Diagnostic, DistortingCallback,
            InstanceParameter, ModelInstanceParameter, ModelNodeParameter, NodeParameter,
            RecordingBackend, RenderBackend, RenderError, RenderMode, RenderResult, Renderer,
            RendererConfig, RendererKey, RibbonInstanceParameter, RibbonNodeParameter,
            RingInstanceParameter, RingNodeParameter, SpriteInstanceParameter,
            SpriteNodeParameter, TrackInstanceParameter, TrackNodeParameter,
        },
    };
}
