//! Simulated particle scene
//!
//! Stands in for an effect simulation: a fountain of sprite particles, an
//! emitter sweeping a trail, a few spinning rings and a patch of heat haze.

use std::collections::VecDeque;

use effect_renderer::foundation::math::{utils, Color, Mat4, Vec3};
use nalgebra::Vector4;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SceneConfig;

const GRAVITY: f32 = 2.5;

/// One simulated particle
#[derive(Debug, Clone)]
pub struct Particle {
    /// World position
    pub position: Vec3,
    velocity: Vec3,
    age: f32,
    lifetime: f32,
    color: Color,
    size: f32,
}

impl Particle {
    fn spawn(rng: &mut StdRng, origin: Vec3) -> Self {
        Self {
            position: origin,
            velocity: Vec3::new(rng.gen_range(-0.6..0.6), rng.gen_range(2.0..4.0), rng.gen_range(-0.6..0.6)),
            age: 0.0,
            lifetime: rng.gen_range(0.8..2.5),
            color: Color::new(255, rng.gen_range(120..220), rng.gen_range(20..80), 255),
            size: rng.gen_range(0.05..0.25),
        }
    }

    fn step(&mut self, dt: f32) {
        self.velocity.y -= GRAVITY * dt;
        self.position += self.velocity * dt;
        self.age += dt;
    }

    fn expired(&self) -> bool {
        self.age >= self.lifetime
    }

    /// Instance transform
    pub fn transform(&self) -> Mat4 {
        Mat4::new_translation(&self.position) * Mat4::new_scaling(self.size)
    }

    /// Color faded by age
    pub fn color(&self) -> Color {
        let remaining = (1.0 - self.age / self.lifetime).clamp(0.0, 1.0);
        Color {
            a: (f32::from(self.color.a) * remaining) as u8,
            ..self.color
        }
    }
}

/// Scene state advanced once per frame
#[derive(Debug)]
pub struct Scene {
    rng: StdRng,
    time: f32,
    sprites: Vec<Particle>,
    haze: Vec<Particle>,
    trail: VecDeque<Vec3>,
    trail_joints: usize,
    rings: usize,
}

impl Scene {
    /// Spawn the scene
    pub fn new(config: &SceneConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let sprites = (0..config.sprites).map(|_| Particle::spawn(&mut rng, Vec3::zeros())).collect();
        let haze = (0..config.distortion_sprites)
            .map(|_| Particle::spawn(&mut rng, Vec3::new(0.0, 0.2, 0.0)))
            .collect();

        Self {
            rng,
            time: 0.0,
            sprites,
            haze,
            trail: VecDeque::with_capacity(config.trail_joints),
            trail_joints: config.trail_joints,
            rings: config.rings,
        }
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        self.time += dt;

        Self::advance(&mut self.sprites, &mut self.rng, Vec3::zeros(), dt);
        Self::advance(&mut self.haze, &mut self.rng, Vec3::new(0.0, 0.2, 0.0), dt);

        if self.trail_joints > 0 {
            self.trail.push_front(self.emitter());
            self.trail.truncate(self.trail_joints);
        }
    }

    /// Seconds simulated so far
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Sprite particles
    pub fn sprites(&self) -> &[Particle] {
        &self.sprites
    }

    /// Heat-haze particles
    pub fn haze(&self) -> &[Particle] {
        &self.haze
    }

    /// Trail joints, newest first
    ///
    /// Each transform sits on its joint with the Y axis pointing towards the
    /// next one and an X axis `width` long.
    pub fn trail_transforms(&self, width: f32) -> Vec<Mat4> {
        let joints: Vec<Vec3> = self.trail.iter().copied().collect();
        joints
            .iter()
            .enumerate()
            .map(|(i, &joint)| {
                let next = joints.get(i + 1).or_else(|| i.checked_sub(1).and_then(|p| joints.get(p)));
                let direction = next.map_or(Vec3::y(), |n| utils::normalize_or(joint - n, Vec3::y()));
                let across = utils::normalize_or(direction.cross(&Vec3::z()), Vec3::x()) * width;
                let normal = utils::normalize_or(across.cross(&direction), Vec3::z());

                Mat4::from_columns(&[
                    Vector4::new(across.x, across.y, across.z, 0.0),
                    Vector4::new(direction.x, direction.y, direction.z, 0.0),
                    Vector4::new(normal.x, normal.y, normal.z, 0.0),
                    Vector4::new(joint.x, joint.y, joint.z, 1.0),
                ])
            })
            .collect()
    }

    /// Ring transforms, spinning around the fountain
    pub fn ring_transforms(&self) -> Vec<Mat4> {
        (0..self.rings)
            .map(|i| {
                let phase = i as f32 / self.rings.max(1) as f32;
                let height = 0.5 + phase * 2.0;
                let spin = self.time * (1.0 + phase);
                Mat4::new_translation(&Vec3::new(0.0, height, 0.0))
                    * Mat4::from_axis_angle(&Vec3::y_axis(), spin)
                    * Mat4::new_scaling(0.5 + phase)
            })
            .collect()
    }

    fn advance(particles: &mut [Particle], rng: &mut StdRng, origin: Vec3, dt: f32) {
        for particle in particles {
            particle.step(dt);
            if particle.expired() {
                *particle = Particle::spawn(rng, origin);
            }
        }
    }

    fn emitter(&self) -> Vec3 {
        let t = self.time;
        Vec3::new((t * 1.3).sin() * 2.0, 1.0 + (t * 2.1).cos() * 0.5, (t * 0.9).cos() * 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SceneConfig {
        SceneConfig {
            sprites: 20,
            trail_joints: 5,
            rings: 2,
            ring_division: 8,
            distortion_sprites: 3,
            models: 1,
        }
    }

    #[test]
    fn test_particle_counts_stay_constant() {
        let mut scene = Scene::new(&config(), 1);
        for _ in 0..300 {
            scene.step(1.0 / 60.0);
        }
        assert_eq!(scene.sprites().len(), 20);
        assert_eq!(scene.haze().len(), 3);
    }

    #[test]
    fn test_trail_is_capped() {
        let mut scene = Scene::new(&config(), 1);
        for _ in 0..10 {
            scene.step(0.1);
        }
        assert_eq!(scene.trail_transforms(0.2).len(), 5);
        assert_eq!(scene.ring_transforms().len(), 2);
    }

    #[test]
    fn test_same_seed_same_scene() {
        let mut a = Scene::new(&config(), 9);
        let mut b = Scene::new(&config(), 9);
        for _ in 0..50 {
            a.step(0.02);
            b.step(0.02);
        }
        assert_eq!(a.sprites()[7].position, b.sprites()[7].position);
    }
}
