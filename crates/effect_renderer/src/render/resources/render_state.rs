//! Pipeline render state and delta application
//!
//! [`RenderStateTracker`] remembers exactly what the backend was last told and
//! only forwards the fields that differ from the desired state.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::render::api::{RenderBackend, TextureHandle};
use crate::render::RenderError;

/// Maximum number of textures bound to one draw
pub const MAX_TEXTURE_SLOTS: usize = 16;

/// Blend equation of a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AlphaBlendMode {
    /// No blending
    Opacity,
    /// Standard alpha blending
    #[default]
    Blend,
    /// Additive
    Add,
    /// Subtractive
    Sub,
    /// Multiplicative
    Mul,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CullingMode {
    /// Cull front faces
    Front,
    /// Cull back faces
    Back,
    /// Draw both sides
    #[default]
    Double,
}

/// Texture sampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureFilter {
    /// Point sampling
    Nearest,
    /// Bilinear
    #[default]
    Linear,
}

/// Texture addressing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureWrap {
    /// Tile
    #[default]
    Repeat,
    /// Clamp to edge
    Clamp,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// Filled polygons
    #[default]
    Normal,
    /// Wireframe
    Wireframe,
}

/// Fixed-capacity, copyable set of textures bound to consecutive slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureSet {
    slots: [Option<TextureHandle>; MAX_TEXTURE_SLOTS],
    len: usize,
}

impl TextureSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self {
            slots: [None; MAX_TEXTURE_SLOTS],
            len: 0,
        }
    }

    /// Build a set from a slice, failing when it exceeds the slot limit
    pub fn from_slice(textures: &[TextureHandle]) -> Result<Self, RenderError> {
        if textures.len() > MAX_TEXTURE_SLOTS {
            return Err(RenderError::TextureSlotOverflow {
                requested: textures.len(),
                limit: MAX_TEXTURE_SLOTS,
            });
        }

        let mut set = Self::empty();
        for (slot, texture) in set.slots.iter_mut().zip(textures) {
            *slot = Some(*texture);
        }
        set.len = textures.len();
        Ok(set)
    }

    /// Append a texture in the next free slot
    pub fn push(&mut self, texture: TextureHandle) -> Result<(), RenderError> {
        if self.len == MAX_TEXTURE_SLOTS {
            return Err(RenderError::TextureSlotOverflow {
                requested: self.len + 1,
                limit: MAX_TEXTURE_SLOTS,
            });
        }
        self.slots[self.len] = Some(texture);
        self.len += 1;
        Ok(())
    }

    /// Number of bound textures
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no texture is bound
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Texture in slot 0
    pub fn first(&self) -> Option<TextureHandle> {
        self.slots[0]
    }

    /// Bound textures in slot order
    pub fn to_vec(&self) -> Vec<TextureHandle> {
        self.slots[..self.len].iter().flatten().copied().collect()
    }
}

/// Snapshot of the pipeline state a draw needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Blend equation
    pub alpha_blend: AlphaBlendMode,
    /// Depth test enabled
    pub depth_test: bool,
    /// Depth write enabled
    pub depth_write: bool,
    /// Face culling
    pub culling: CullingMode,
    /// Polygon fill mode
    pub render_mode: RenderMode,
    /// Sampler filter for every bound slot
    pub texture_filter: TextureFilter,
    /// Sampler wrap for every bound slot
    pub texture_wrap: TextureWrap,
    /// Bound textures
    pub textures: TextureSet,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            alpha_blend: AlphaBlendMode::Blend,
            depth_test: true,
            depth_write: false,
            culling: CullingMode::Double,
            render_mode: RenderMode::Normal,
            texture_filter: TextureFilter::Linear,
            texture_wrap: TextureWrap::Repeat,
            textures: TextureSet::empty(),
        }
    }
}

bitflags! {
    /// Fields emitted by one [`RenderStateTracker::apply`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateChanges: u32 {
        /// Blend equation
        const BLEND = 1 << 0;
        /// Depth test or write
        const DEPTH = 1 << 1;
        /// Culling
        const CULL = 1 << 2;
        /// Polygon mode
        const RENDER_MODE = 1 << 3;
        /// Sampler state
        const SAMPLERS = 1 << 4;
        /// Texture bindings
        const TEXTURES = 1 << 5;
    }
}

/// Tracks the last state applied to the backend
#[derive(Debug, Clone, Default)]
pub struct RenderStateTracker {
    current: Option<RenderState>,
    applied: u64,
}

impl RenderStateTracker {
    /// Create a tracker that emits everything on first apply
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the backend to `desired`, issuing only the calls for changed fields
    pub fn apply(&mut self, desired: &RenderState, backend: &mut dyn RenderBackend) -> StateChanges {
        let changes = self
            .current
            .as_ref()
            .map_or(StateChanges::all(), |current| Self::diff(current, desired));

        if changes.contains(StateChanges::BLEND) {
            backend.set_blend(desired.alpha_blend);
        }
        if changes.contains(StateChanges::DEPTH) {
            backend.set_depth(desired.depth_test, desired.depth_write);
        }
        if changes.contains(StateChanges::CULL) {
            backend.set_cull(desired.culling);
        }
        if changes.contains(StateChanges::RENDER_MODE) {
            backend.set_render_mode(desired.render_mode);
        }
        if changes.contains(StateChanges::SAMPLERS) {
            for slot in 0..desired.textures.len().max(1) {
                backend.set_sampler(slot, desired.texture_filter, desired.texture_wrap);
            }
        }
        if changes.contains(StateChanges::TEXTURES) {
            backend.set_textures(&desired.textures.to_vec());
        }

        if !changes.is_empty() {
            self.applied += 1;
            log::trace!("Render state applied: {:?}", changes);
        }
        self.current = Some(*desired);
        changes
    }

    /// Forget the current state so the next apply emits every field
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// State the backend was last told, if any
    pub fn current(&self) -> Option<&RenderState> {
        self.current.as_ref()
    }

    /// Number of applies that issued at least one call
    pub fn applied_count(&self) -> u64 {
        self.applied
    }

    fn diff(current: &RenderState, desired: &RenderState) -> StateChanges {
        let mut changes = StateChanges::empty();
        changes.set(StateChanges::BLEND, current.alpha_blend != desired.alpha_blend);
        changes.set(
            StateChanges::DEPTH,
            current.depth_test != desired.depth_test || current.depth_write != desired.depth_write,
        );
        changes.set(StateChanges::CULL, current.culling != desired.culling);
        changes.set(StateChanges::RENDER_MODE, current.render_mode != desired.render_mode);
        changes.set(
            StateChanges::SAMPLERS,
            current.texture_filter != desired.texture_filter
                || current.texture_wrap != desired.texture_wrap
                || current.textures.len() != desired.textures.len(),
        );
        changes.set(StateChanges::TEXTURES, current.textures != desired.textures);
        changes
    }
}
