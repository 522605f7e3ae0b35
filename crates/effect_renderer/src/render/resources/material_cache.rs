//! Per-view cache of host material instances for model rendering
//!
//! Creating a dynamic material instance is expensive on the host, so one
//! instance is created per distinct key and view slot and reused for every
//! later model instance. Entries are never evicted; the cache is cleared at
//! renderer teardown and when the device is reset.

use std::collections::HashMap;

use crate::render::api::{MaterialHandle, RenderBackend, TextureHandle};
use crate::render::resources::AlphaBlendMode;
use crate::render::{RenderError, RenderResult};

/// Number of concurrent view slots (multi-view / stereo)
pub const MAX_VIEW_SLOTS: usize = 6;

/// Identity of a model material instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialKey {
    /// Color texture, if any
    pub texture: Option<TextureHandle>,
    /// Blend equation
    pub alpha_blend: AlphaBlendMode,
    /// Lit material
    pub lighting: bool,
    /// Distorting material
    pub distortion: bool,
}

/// Lazily filled material table per view slot
#[derive(Debug, Default)]
pub struct MaterialCache {
    tables: [HashMap<MaterialKey, MaterialHandle>; MAX_VIEW_SLOTS],
    lookups: u64,
    created: u64,
}

impl MaterialCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `key`, creating it on first use
    pub fn get_or_create(
        &mut self,
        key: &MaterialKey,
        view_index: usize,
        backend: &mut dyn RenderBackend,
    ) -> RenderResult<MaterialHandle> {
        let table = self
            .tables
            .get_mut(view_index)
            .ok_or(RenderError::InvalidViewIndex(view_index))?;
        self.lookups += 1;

        if let Some(material) = table.get(key) {
            return Ok(*material);
        }

        let material = backend.create_material_instance(key, view_index)?;
        table.insert(*key, material);
        self.created += 1;
        log::debug!("Created material instance {:?} for {:?} in view {}", material, key, view_index);
        Ok(material)
    }

    /// Pre-seed a view slot with host-owned instances
    pub fn seed(
        &mut self,
        view_index: usize,
        materials: impl IntoIterator<Item = (MaterialKey, MaterialHandle)>,
    ) -> RenderResult<()> {
        let table = self
            .tables
            .get_mut(view_index)
            .ok_or(RenderError::InvalidViewIndex(view_index))?;
        table.extend(materials);
        Ok(())
    }

    /// Whether `key` has an instance in `view_index`
    pub fn is_cached(&self, key: &MaterialKey, view_index: usize) -> bool {
        self.tables
            .get(view_index)
            .is_some_and(|table| table.contains_key(key))
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        for table in &mut self.tables {
            table.clear();
        }
    }

    /// Number of cached instances across all view slots
    pub fn len(&self) -> usize {
        self.tables.iter().map(HashMap::len).sum()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups served
    pub fn lookups(&self) -> u64 {
        self.lookups
    }

    /// Number of instances created on the host
    pub fn created(&self) -> u64 {
        self.created
    }
}
