//! Viewer configuration

use effect_renderer::config::Config;
use effect_renderer::foundation::logging::LoggingConfig;
use effect_renderer::render::RendererConfig;
use serde::{Deserialize, Serialize};

/// Viewer configuration, loadable from `.toml` or `.ron`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Frames to simulate
    pub frames: u32,
    /// Simulation step in seconds
    pub timestep: f32,
    /// RNG seed so runs are reproducible
    pub seed: u64,
    /// Scene contents
    pub scene: SceneConfig,
    /// Frame at which a device loss is simulated
    pub lose_device_at: Option<u32>,
    /// Logging
    pub logging: LoggingConfig,
    /// Renderer
    pub renderer: RendererConfig,
}

/// Scene contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Live sprite particles
    pub sprites: usize,
    /// Joints in the ribbon and track trails
    pub trail_joints: usize,
    /// Rings
    pub rings: usize,
    /// Segments per ring
    pub ring_division: u32,
    /// Heat-haze sprites drawn with the distortion shader
    pub distortion_sprites: usize,
    /// Animated model instances
    pub models: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            frames: 120,
            timestep: 1.0 / 60.0,
            seed: 7,
            scene: SceneConfig::default(),
            lose_device_at: None,
            logging: LoggingConfig::default(),
            renderer: RendererConfig::default(),
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            sprites: 500,
            trail_joints: 32,
            rings: 4,
            ring_division: 16,
            distortion_sprites: 16,
            models: 3,
        }
    }
}

impl Config for ViewerConfig {}
