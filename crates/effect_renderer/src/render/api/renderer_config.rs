//! Renderer configuration
//!
//! Configuration structures that hosts use to size and tune the renderer
//! without hardcoding values in the rendering system itself.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::render::resources::RenderMode;

/// Configuration for the effect renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Maximum number of quads one draw call can cover; sizes the geometry buffers
    pub square_max_count: usize,
    /// Save and restore host pipeline state around each frame
    pub restore_host_state: bool,
    /// Initial polygon mode
    pub render_mode: RenderMode,
    /// Initial distortion strength for distorting models
    pub distortion_intensity: f32,
}

impl RendererConfig {
    /// Create a configuration sized for `square_max_count` quads
    pub fn new(square_max_count: usize) -> Self {
        Self {
            square_max_count: square_max_count.max(1),
            ..Self::default()
        }
    }

    /// Set the quad capacity
    pub fn with_square_max_count(mut self, square_max_count: usize) -> Self {
        self.square_max_count = square_max_count.max(1);
        self
    }

    /// Enable or disable host state restoration
    pub fn with_restore_host_state(mut self, restore: bool) -> Self {
        self.restore_host_state = restore;
        self
    }

    /// Set the initial render mode
    pub fn with_render_mode(mut self, mode: RenderMode) -> Self {
        self.render_mode = mode;
        self
    }

    /// Set the initial distortion intensity
    pub fn with_distortion_intensity(mut self, intensity: f32) -> Self {
        self.distortion_intensity = intensity;
        self
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            square_max_count: 8000,
            restore_host_state: false,
            render_mode: RenderMode::Normal,
            distortion_intensity: 1.0,
        }
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_max_count_is_clamped() {
        assert_eq!(RendererConfig::new(0).square_max_count, 1);
        assert_eq!(RendererConfig::default().with_square_max_count(0).square_max_count, 1);
    }

    #[test]
    fn test_toml_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.toml");

        let config = RendererConfig::new(256)
            .with_restore_host_state(true)
            .with_render_mode(RenderMode::Wireframe);
        config.save_to_file(&path).unwrap();

        let loaded = RendererConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.ron");
        std::fs::write(&path, "(square_max_count: 64)").unwrap();

        let loaded = RendererConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.square_max_count, 64);
        assert!(!loaded.restore_host_state);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(matches!(
            RendererConfig::load_from_file(&path),
            Err(crate::config::ConfigError::UnsupportedFormat(_))
        ));
    }
}
