//! Headless effect viewer
//!
//! Drives the effect renderer with a simulated particle scene against the
//! recording backend and logs what each frame asked the host to draw.
//!
//! Usage: `effect_viewer [config.toml|config.ron]`

mod config;
mod scene;

use effect_renderer::foundation::logging::init_logging;
use effect_renderer::foundation::math::{utils, Color, Mat4, Mat4Ext, RectF, Vec2, Vec3};
use effect_renderer::prelude::*;
use effect_renderer::render::{DrawStats, NodeMaterial, TextureHandle};

use crate::config::ViewerConfig;
use crate::scene::Scene;

/// Viewer errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The renderer failed outside a frame
    #[error("Renderer error: {0}")]
    Render(#[from] RenderError),
}

struct Keys {
    sprites: RendererKey,
    ribbons: RendererKey,
    tracks: RendererKey,
    rings: RendererKey,
    models: RendererKey,
}

struct Textures {
    particle: TextureHandle,
    haze: TextureHandle,
    background: TextureHandle,
}

struct Viewer {
    config: ViewerConfig,
    renderer: Renderer,
    scene: Scene,
    keys: Keys,
    textures: Textures,
    model: ModelAsset,
    totals: DrawStats,
    skipped_frames: u32,
}

impl Viewer {
    fn new(config: ViewerConfig) -> Result<Self, AppError> {
        let mut renderer = Renderer::new(Box::new(RecordingBackend::new()), config.renderer.clone())?;
        let keys = Keys {
            sprites: renderer.create_sprite_renderer(),
            ribbons: renderer.create_ribbon_renderer(),
            tracks: renderer.create_track_renderer(),
            rings: renderer.create_ring_renderer(),
            models: renderer.create_model_renderer(),
        };
        let textures = Self::create_textures(&mut renderer)?;
        let mesh = renderer.backend_mut().create_model(&[])?;
        let model = ModelAsset::new(mesh, &[(0, 12), (12, 12), (24, 12), (36, 12)]);

        renderer.set_projection_matrix(Mat4::perspective(utils::deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0));
        renderer.set_distorting_callback(Some(Box::new(|_backend: &mut dyn RenderBackend| {
            log::trace!("Copying color target into the distortion background");
            true
        })));
        renderer.set_diagnostic_callback(Some(Box::new(|diagnostic: &Diagnostic| {
            log::debug!("Renderer diagnostic: {:?}", diagnostic);
        })));

        let scene = Scene::new(&config.scene, config.seed);
        Ok(Self {
            config,
            renderer,
            scene,
            keys,
            textures,
            model,
            totals: DrawStats::default(),
            skipped_frames: 0,
        })
    }

    fn create_textures(renderer: &mut Renderer) -> Result<Textures, AppError> {
        let backend = renderer.backend_mut();
        let textures = Textures {
            particle: backend.create_texture(2, 2, &[255; 16])?,
            haze: backend.create_texture(2, 2, &[128; 16])?,
            background: backend.create_texture(1, 1, &[0, 0, 0, 255])?,
        };
        renderer.set_background(Some(textures.background));
        Ok(textures)
    }

    fn run(&mut self) -> Result<(), AppError> {
        let mut device_lost = false;

        for frame in 0..self.config.frames {
            self.scene.step(self.config.timestep);

            if self.config.lose_device_at == Some(frame) {
                log::warn!("Simulating device loss at frame {}", frame);
                self.renderer.on_lost_device();
                device_lost = true;
                continue;
            }
            if device_lost {
                self.renderer.on_reset_device()?;
                self.textures = Self::create_textures(&mut self.renderer)?;
                device_lost = false;
            }

            self.renderer.reset_draw_call_count();
            self.renderer.reset_draw_vertex_count();
            if let Err(err) = self.render_frame(frame) {
                log::error!("Frame {} skipped: {}", frame, err);
                self.skipped_frames += 1;
                continue;
            }

            let stats = self.renderer.stats();
            log::debug!(
                "Frame {}: {} draw calls, {} vertices, {} meshes",
                frame,
                stats.draw_calls,
                stats.vertices,
                stats.mesh_submissions
            );
            self.totals.draw_calls += stats.draw_calls;
            self.totals.vertices += stats.vertices;
        }

        let stats = self.renderer.stats();
        log::info!(
            "Rendered {} frames: {} draw calls, {} vertices, {} mesh submissions, {} skipped batches, {} skipped frames",
            self.config.frames,
            self.totals.draw_calls,
            self.totals.vertices,
            stats.mesh_submissions,
            stats.skipped_batches,
            self.skipped_frames
        );
        Ok(())
    }

    fn render_frame(&mut self, frame: u32) -> RenderResult<()> {
        let angle = self.scene.time() * 0.3;
        let eye = Vec3::new(angle.sin() * 8.0, 3.0, angle.cos() * 8.0);
        self.renderer.set_camera_matrix(Mat4::look_at(eye, Vec3::new(0.0, 1.0, 0.0), Vec3::y()));

        self.renderer.begin_rendering()?;
        self.draw_sprites()?;
        self.draw_trails()?;
        self.draw_rings()?;
        self.draw_models(frame)?;
        self.draw_haze()?;
        self.renderer.end_rendering()
    }

    fn draw_sprites(&mut self) -> RenderResult<()> {
        let node = SpriteNodeParameter {
            material: textured(self.textures.particle),
            billboard: BillboardType::Billboard,
        };
        let instances: Vec<SpriteInstanceParameter<'_>> = self
            .scene
            .sprites()
            .iter()
            .map(|p| SpriteInstanceParameter {
                colors: [p.color(); 4],
                transform: p.transform(),
                ..SpriteInstanceParameter::default()
            })
            .collect();

        let key = self.keys.sprites;
        let node = NodeParameter::Sprite(&node);
        self.renderer.begin_group(key, &node, instances.len())?;
        for instance in &instances {
            self.renderer.render_instance(key, &node, &InstanceParameter::Sprite(instance))?;
        }
        self.renderer.end_group(key, &node)
    }

    fn draw_trails(&mut self) -> RenderResult<()> {
        let ribbon_transforms = self.scene.trail_transforms(0.3);
        let count = ribbon_transforms.len();

        let ribbon = RibbonNodeParameter {
            material: textured(self.textures.particle),
            view_dependent: true,
        };
        let ribbons: Vec<RibbonInstanceParameter<'_>> = ribbon_transforms
            .iter()
            .enumerate()
            .map(|(i, transform)| RibbonInstanceParameter {
                colors: [Color::new(120, 200, 255, fade(i, count)); 2],
                positions: [-0.5, 0.5],
                transform: *transform,
                instance_index: i,
                instance_count: count,
                ..RibbonInstanceParameter::default()
            })
            .collect();

        let key = self.keys.ribbons;
        let node = NodeParameter::Ribbon(&ribbon);
        self.renderer.begin_group(key, &node, ribbons.len())?;
        for instance in &ribbons {
            self.renderer.render_instance(key, &node, &InstanceParameter::Ribbon(instance))?;
        }
        self.renderer.end_group(key, &node)?;

        let track = TrackNodeParameter {
            material: NodeMaterial {
                alpha_blend: AlphaBlendMode::Add,
                ..NodeMaterial::default()
            },
        };
        let tracks: Vec<TrackInstanceParameter<'_>> = ribbon_transforms
            .iter()
            .enumerate()
            .map(|(i, transform)| {
                let alpha = fade(i, count);
                TrackInstanceParameter {
                    colors: [
                        Color::new(255, 255, 255, 0),
                        Color::new(255, 240, 200, alpha),
                        Color::new(255, 255, 255, 0),
                    ],
                    width: 0.15,
                    transform: *transform,
                    instance_index: i,
                    instance_count: count,
                    ..TrackInstanceParameter::default()
                }
            })
            .collect();

        let key = self.keys.tracks;
        let node = NodeParameter::Track(&track);
        self.renderer.begin_group(key, &node, tracks.len())?;
        for instance in &tracks {
            self.renderer.render_instance(key, &node, &InstanceParameter::Track(instance))?;
        }
        self.renderer.end_group(key, &node)
    }

    fn draw_rings(&mut self) -> RenderResult<()> {
        let node = RingNodeParameter {
            material: textured(self.textures.particle),
            billboard: BillboardType::Fixed,
            division: self.config.scene.ring_division,
        };
        let instances: Vec<RingInstanceParameter<'_>> = self
            .scene
            .ring_transforms()
            .into_iter()
            .map(|transform| RingInstanceParameter {
                view_angle: 300.0,
                outer_location: Vec2::new(1.0, 0.0),
                inner_location: Vec2::new(0.7, 0.0),
                center_ratio: 0.5,
                outer_color: Color::new(255, 80, 40, 0),
                center_color: Color::new(255, 160, 60, 255),
                inner_color: Color::new(255, 80, 40, 0),
                transform,
                uv: RectF::UNIT,
                material: None,
            })
            .collect();

        let key = self.keys.rings;
        let node = NodeParameter::Ring(&node);
        self.renderer.begin_group(key, &node, instances.len())?;
        for instance in &instances {
            self.renderer.render_instance(key, &node, &InstanceParameter::Ring(instance))?;
        }
        self.renderer.end_group(key, &node)
    }

    fn draw_models(&mut self, frame: u32) -> RenderResult<()> {
        let node = ModelNodeParameter {
            material: textured(self.textures.particle),
            model: Some(&self.model),
            lighting: true,
        };
        let instances: Vec<ModelInstanceParameter> = (0..self.config.scene.models)
            .map(|i| ModelInstanceParameter {
                transform: Mat4::new_translation(&Vec3::new(i as f32 * 1.5 - 2.0, 0.0, -2.0)),
                time: frame as i32 + i as i32,
                ..ModelInstanceParameter::default()
            })
            .collect();

        let key = self.keys.models;
        let node = NodeParameter::Model(&node);
        self.renderer.begin_group(key, &node, instances.len())?;
        for instance in &instances {
            self.renderer.render_instance(key, &node, &InstanceParameter::Model(instance))?;
        }
        self.renderer.end_group(key, &node)
    }

    fn draw_haze(&mut self) -> RenderResult<()> {
        let node = SpriteNodeParameter {
            material: NodeMaterial {
                textures: vec![self.textures.haze],
                distortion: true,
                distortion_intensity: 0.4,
                depth_write: false,
                ..NodeMaterial::default()
            },
            billboard: BillboardType::Billboard,
        };
        let instances: Vec<SpriteInstanceParameter<'_>> = self
            .scene
            .haze()
            .iter()
            .map(|p| SpriteInstanceParameter {
                colors: [p.color(); 4],
                transform: p.transform(),
                ..SpriteInstanceParameter::default()
            })
            .collect();

        let key = self.keys.sprites;
        let node = NodeParameter::Sprite(&node);
        self.renderer.begin_group(key, &node, instances.len())?;
        for instance in &instances {
            self.renderer.render_instance(key, &node, &InstanceParameter::Sprite(instance))?;
        }
        self.renderer.end_group(key, &node)
    }
}

fn textured(texture: TextureHandle) -> NodeMaterial {
    NodeMaterial {
        textures: vec![texture],
        ..NodeMaterial::default()
    }
}

/// Alpha fading out towards the tail of a trail
fn fade(index: usize, count: usize) -> u8 {
    let t = index as f32 / count.max(1) as f32;
    (255.0 * (1.0 - t)) as u8
}

fn main() -> Result<(), AppError> {
    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load_from_file(&path)?,
        None => ViewerConfig::default(),
    };
    init_logging(&config.logging);

    log::info!("Starting effect viewer for {} frames", config.frames);
    let mut viewer = Viewer::new(config)?;

    match viewer.run() {
        Ok(()) => {
            log::info!("Effect viewer completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Effect viewer failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> ViewerConfig {
        let mut config = ViewerConfig::default();
        config.frames = 6;
        config.scene.sprites = 40;
        config.scene.trail_joints = 6;
        config.lose_device_at = Some(3);
        config
    }

    #[test]
    fn test_viewer_survives_device_loss() {
        let mut viewer = Viewer::new(small_config()).unwrap();
        viewer.run().unwrap();

        assert_eq!(viewer.skipped_frames, 0);
        assert!(viewer.totals.draw_calls > 0);
        assert_eq!(viewer.renderer.device_state(), effect_renderer::render::DeviceState::Active);
    }

    #[test]
    fn test_trail_fades_out() {
        assert_eq!(fade(0, 4), 255);
        assert!(fade(3, 4) < fade(1, 4));
    }
}
