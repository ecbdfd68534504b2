//! Cosmetic burst particles
//!
//! Particles never affect gameplay. The pool is capped; when full the oldest
//! particle makes room for the new one.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

/// Default cap on live particles
pub const MAX_PARTICLES: usize = 256;

const PARTICLE_GRAVITY: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    Star,
    Fuel,
    Blood,
    Wind,
    BulletHit,
}

impl ParticleKind {
    /// Burst size and horizontal speed factor
    fn burst(self) -> (usize, f32) {
        match self {
            ParticleKind::Star | ParticleKind::Fuel => (15, 1.0),
            ParticleKind::Blood => (20, 1.0),
            ParticleKind::Wind => (10, 2.0),
            ParticleKind::BulletHit => (8, 1.5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub kind: ParticleKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// 1.0 at spawn, removed at or below zero
    pub life: f32,
    pub decay: f32,
    pub size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    cap: usize,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::with_cap(MAX_PARTICLES)
    }
}

impl ParticleSystem {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            particles: Vec::with_capacity(cap.min(MAX_PARTICLES)),
            cap,
        }
    }

    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        if self.particles.len() > cap {
            let excess = self.particles.len() - cap;
            self.particles.drain(..excess);
        }
    }

    /// Spawn the standard burst for `kind` at `origin`
    pub fn burst(&mut self, kind: ParticleKind, origin: Vec2, rng: &mut Pcg32) {
        if self.cap == 0 {
            return;
        }
        let (count, vx_factor) = kind.burst();
        for _ in 0..count {
            if self.particles.len() >= self.cap {
                self.particles.remove(0);
            }
            self.particles.push(Particle {
                kind,
                pos: origin,
                vel: Vec2::new(
                    (rng.random::<f32>() - 0.5) * 4.0 * vx_factor,
                    (rng.random::<f32>() - 0.5) * 4.0,
                ),
                life: 1.0,
                decay: 0.01 + rng.random::<f32>() * 0.02,
                size: 2.0 + rng.random::<f32>() * 5.0,
            });
        }
    }

    pub fn update(&mut self) {
        for p in &mut self.particles {
            p.pos += p.vel;
            p.life -= p.decay;
            p.vel.y += PARTICLE_GRAVITY;
        }
        self.particles.retain(|p| p.life > 0.0);
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}
