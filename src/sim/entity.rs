//! Drifting hazards and collectibles
//!
//! Every kind owns its own motion rule and bounding box. Removal is signalled
//! by `Entity::update` returning true (off-screen or expired) or by the entity
//! reporting itself consumed.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{CLOUD_DRAG, Contact, Rect};
use super::state::FailureCause;
use crate::Field;

/// World context handed to entities each tick
pub struct WorldCtx<'a> {
    pub field: Field,
    pub stage: u8,
    /// Balloon top-left, for entities that aim
    pub target: Vec2,
    pub rng: &'a mut Pcg32,
}

/// Capabilities shared by every simulated entity
pub trait Entity {
    /// Advance one tick; returns true once the entity should be removed
    fn update(&mut self, ctx: &mut WorldCtx) -> bool;

    /// Collision box in field coordinates
    fn bounds(&self) -> Rect;

    /// Consumed entities are skipped by collision and dropped on the next pass
    fn is_consumed(&self) -> bool {
        false
    }
}

fn uniform(rng: &mut Pcg32, min: f32, max: f32) -> f32 {
    min + rng.random::<f32>() * (max - min)
}

// ---------------------------------------------------------------------------
// Clouds and mountains
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Cloud,
    ThickCloud,
    TallMountain,
}

/// Obstacle drifting right-to-left at constant speed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
}

impl Obstacle {
    pub fn spawn(kind: ObstacleKind, field: Field, rng: &mut Pcg32) -> Self {
        let (size, y, speed) = match kind {
            ObstacleKind::Cloud => (
                Vec2::new(80.0, 40.0),
                uniform(rng, 100.0, field.height - 100.0),
                2.0,
            ),
            ObstacleKind::ThickCloud => (
                Vec2::new(120.0, 60.0),
                uniform(rng, 150.0, field.height - 150.0),
                2.0,
            ),
            ObstacleKind::TallMountain => (Vec2::new(120.0, 200.0), field.height - 200.0, 3.2),
        };
        Self {
            kind,
            pos: Vec2::new(field.width, y),
            size,
            speed,
        }
    }

    /// How a balloon overlap resolves under the current stage's drag rule
    pub fn contact(&self, clouds_drag: bool) -> Contact {
        match self.kind {
            ObstacleKind::Cloud | ObstacleKind::ThickCloud if clouds_drag => Contact::Drag,
            ObstacleKind::Cloud | ObstacleKind::ThickCloud => Contact::Pass,
            ObstacleKind::TallMountain => Contact::Lethal(FailureCause::Mountain),
        }
    }
}

impl Entity for Obstacle {
    fn update(&mut self, _ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;
        self.pos.x < -self.size.x
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

/// Vertical velocity after one tick inside a soft obstacle
pub fn damp_vertical(vy: f32) -> f32 {
    vy * CLOUD_DRAG
}

// ---------------------------------------------------------------------------
// Birds
// ---------------------------------------------------------------------------

/// Bird hovering on a sine around an anchor line while scrolling left
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bird {
    pub pos: Vec2,
    pub size: Vec2,
    pub anchor_y: f32,
    pub scroll_speed: f32,
    pub hover_amplitude: f32,
    pub hover_speed: f32,
    pub hover_angle: f32,
    pub wing_flap: f32,
    pub flap_speed: f32,
    pub age: u32,
    pub lifetime: u32,
}

impl Bird {
    pub fn spawn(field: Field, stage: u8, rng: &mut Pcg32) -> Self {
        let anchor_y = uniform(rng, 100.0, field.height - 220.0);
        let x = field.width + 80.0 + rng.random::<f32>() * 220.0;
        let scroll_speed = if stage >= 4 {
            uniform(rng, 2.8, 3.4)
        } else {
            uniform(rng, 2.2, 2.9)
        };
        Self {
            pos: Vec2::new(x, anchor_y),
            size: Vec2::new(50.0, 30.0),
            anchor_y,
            scroll_speed,
            hover_amplitude: uniform(rng, 10.0, 20.0),
            hover_speed: uniform(rng, 0.02, 0.04),
            hover_angle: rng.random::<f32>() * TAU,
            wing_flap: rng.random::<f32>() * TAU,
            flap_speed: uniform(rng, 0.2, 0.35),
            age: 0,
            lifetime: 900 + rng.random_range(0..600),
        }
    }
}

impl Entity for Bird {
    fn update(&mut self, _ctx: &mut WorldCtx) -> bool {
        self.age += 1;
        self.hover_angle += self.hover_speed;
        self.wing_flap += self.flap_speed;
        self.pos.y = self.anchor_y + self.hover_angle.sin() * self.hover_amplitude;
        self.pos.x -= self.scroll_speed;
        self.pos.x < -self.size.x - 80.0 || self.age > self.lifetime
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

/// Red bird cutting across left-to-right; always lethal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseBird {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub wing_flap: f32,
}

impl ReverseBird {
    pub fn spawn(field: Field, rng: &mut Pcg32) -> Self {
        let size = Vec2::new(50.0, 30.0);
        Self {
            pos: Vec2::new(-size.x, uniform(rng, 80.0, field.height - 140.0)),
            size,
            speed: uniform(rng, 3.0, 5.0),
            wing_flap: 0.0,
        }
    }
}

impl Entity for ReverseBird {
    fn update(&mut self, ctx: &mut WorldCtx) -> bool {
        self.wing_flap += 0.3;
        self.pos.x += self.speed;
        self.pos.x > ctx.field.width + self.size.x
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

// ---------------------------------------------------------------------------
// Thunder clouds
// ---------------------------------------------------------------------------

/// Ticks a lightning flash stays lethal
pub const LIGHTNING_FLASH_TICKS: u32 = 10;
const BOLT_POINTS: usize = 5;

/// Dark cloud that periodically drops a lightning bolt
///
/// The cloud body is harmless; only the bolt segments are lethal, and only
/// while the flash lasts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThunderCloud {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub lightning_timer: u32,
    pub lightning_interval: u32,
    pub flashing: bool,
    pub flash_counter: u32,
    pub bolt: Vec<Vec2>,
}

impl ThunderCloud {
    pub fn spawn(field: Field, rng: &mut Pcg32) -> Self {
        Self {
            pos: Vec2::new(field.width, uniform(rng, 100.0, field.height - 200.0)),
            size: Vec2::new(150.0, 80.0),
            speed: 1.5,
            lightning_timer: 0,
            lightning_interval: 120 + rng.random_range(0..120),
            flashing: false,
            flash_counter: 0,
            bolt: Vec::with_capacity(BOLT_POINTS),
        }
    }

    fn bolt_origin(&self) -> Vec2 {
        Vec2::new(self.pos.x + self.size.x / 2.0, self.pos.y + self.size.y)
    }

    fn generate_bolt(&mut self, rng: &mut Pcg32) {
        self.bolt.clear();
        let mut point = self.bolt_origin();
        for _ in 0..BOLT_POINTS {
            point.x += (rng.random::<f32>() - 0.5) * 30.0;
            point.y += 30.0 + rng.random::<f32>() * 20.0;
            self.bolt.push(point);
        }
    }

    /// Lethal boxes of the current bolt; empty when not flashing
    pub fn lightning_bounds(&self) -> Vec<Rect> {
        if !self.flashing {
            return Vec::new();
        }
        let origin = self.bolt_origin();
        let mut bounds = Vec::with_capacity(self.bolt.len());
        bounds.push(Rect::new(origin.x - 10.0, origin.y, 20.0, 30.0));
        for pair in self.bolt.windows(2) {
            let (prev, point) = (pair[0], pair[1]);
            bounds.push(Rect::new(
                prev.x.min(point.x) - 10.0,
                prev.y,
                (point.x - prev.x).abs() + 20.0,
                point.y - prev.y,
            ));
        }
        bounds
    }
}

impl Entity for ThunderCloud {
    fn update(&mut self, ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;

        self.lightning_timer += 1;
        if self.lightning_timer >= self.lightning_interval {
            self.flashing = true;
            self.lightning_timer = 0;
            self.flash_counter = 0;
            self.generate_bolt(ctx.rng);
        }

        if self.flashing {
            self.flash_counter += 1;
            if self.flash_counter >= LIGHTNING_FLASH_TICKS {
                self.flashing = false;
            }
        }

        self.pos.x < -self.size.x
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

// ---------------------------------------------------------------------------
// Ground enemies
// ---------------------------------------------------------------------------

/// Caped villain running along the ground
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundEnemy {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub step_phase: f32,
    pub cape_wave: f32,
}

impl GroundEnemy {
    pub fn spawn(field: Field, rng: &mut Pcg32) -> Self {
        let size = Vec2::new(50.0, 60.0);
        Self {
            pos: Vec2::new(field.width + 100.0, field.height - size.y - 10.0),
            size,
            speed: 2.4,
            step_phase: rng.random::<f32>() * TAU,
            cape_wave: rng.random::<f32>() * TAU,
        }
    }
}

impl Entity for GroundEnemy {
    fn update(&mut self, _ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;
        self.step_phase += 0.25;
        self.cape_wave += 0.18;
        self.pos.x < -self.size.x
    }

    /// Torso only; the cape and weapon don't count
    fn bounds(&self) -> Rect {
        Rect::new(
            self.pos.x + 8.0,
            self.pos.y + 14.0,
            self.size.x - 16.0,
            self.size.y - 18.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Collectibles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PickupKind {
    Star,
    FuelCan,
}

/// Collectible drifting left; consumed on first contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pickup {
    pub kind: PickupKind,
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub collected: bool,
    /// Spin (stars) or bob (fuel) phase, render only
    pub phase: f32,
}

impl Pickup {
    pub fn spawn(kind: PickupKind, field: Field, rng: &mut Pcg32) -> Self {
        let size = match kind {
            PickupKind::Star => Vec2::splat(20.0),
            PickupKind::FuelCan => Vec2::new(25.0, 35.0),
        };
        Self {
            kind,
            pos: Vec2::new(field.width, uniform(rng, 100.0, field.height - 100.0)),
            size,
            speed: 2.5,
            collected: false,
            phase: 0.0,
        }
    }

    /// Mark consumed. Returns false if it was already taken.
    pub fn collect(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        true
    }
}

impl Entity for Pickup {
    fn update(&mut self, _ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;
        self.phase += match self.kind {
            PickupKind::Star => 0.1,
            PickupKind::FuelCan => 0.15,
        };
        self.pos.x < -self.size.x || self.collected
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    fn is_consumed(&self) -> bool {
        self.collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ctx(rng: &mut Pcg32) -> WorldCtx<'_> {
        WorldCtx {
            field: Field::default(),
            stage: 2,
            target: Vec2::new(300.0, 300.0),
            rng,
        }
    }

    #[test]
    fn test_obstacle_drifts_and_leaves() {
        let mut rng = Pcg32::seed_from_u64(1);
        let field = Field::default();
        let mut cloud = Obstacle::spawn(ObstacleKind::Cloud, field, &mut rng);
        assert_eq!(cloud.pos.x, field.width);
        assert!(cloud.pos.y >= 100.0 && cloud.pos.y < field.height - 100.0);

        let mut ticks = 0;
        while !cloud.update(&mut ctx(&mut rng)) {
            ticks += 1;
            assert!(ticks < 10_000);
        }
        assert!(cloud.pos.x < -cloud.size.x);
        // 640 + 80 px at 2 px per tick
        assert_eq!(ticks, 360);
    }

    #[test]
    fn test_obstacle_contact_rules() {
        let mut rng = Pcg32::seed_from_u64(1);
        let field = Field::default();
        let cloud = Obstacle::spawn(ObstacleKind::ThickCloud, field, &mut rng);
        let mountain = Obstacle::spawn(ObstacleKind::TallMountain, field, &mut rng);
        assert_eq!(cloud.contact(true), Contact::Drag);
        assert_eq!(cloud.contact(false), Contact::Pass);
        assert_eq!(mountain.contact(false), Contact::Lethal(FailureCause::Mountain));
        assert_eq!(mountain.pos.y + mountain.size.y, field.height);
    }

    #[test]
    fn test_damp_vertical() {
        assert!((damp_vertical(2.0) - 1.8).abs() < 1e-6);
    }

    #[test]
    fn test_bird_expires_after_lifetime() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut bird = Bird::spawn(Field::default(), 2, &mut rng);
        bird.scroll_speed = 0.0;
        bird.lifetime = 5;
        for _ in 0..5 {
            assert!(!bird.update(&mut ctx(&mut rng)));
        }
        assert!(bird.update(&mut ctx(&mut rng)));
    }

    #[test]
    fn test_bird_hovers_around_anchor() {
        let mut rng = Pcg32::seed_from_u64(4);
        let mut bird = Bird::spawn(Field::default(), 4, &mut rng);
        assert!(bird.scroll_speed >= 2.8);
        for _ in 0..100 {
            bird.update(&mut ctx(&mut rng));
            assert!((bird.pos.y - bird.anchor_y).abs() <= bird.hover_amplitude + 1e-3);
        }
    }

    #[test]
    fn test_reverse_bird_crosses_left_to_right() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut bird = ReverseBird::spawn(Field::default(), &mut rng);
        assert!(bird.pos.x < 0.0);
        let x0 = bird.pos.x;
        assert!(!bird.update(&mut ctx(&mut rng)));
        assert!(bird.pos.x > x0);
    }

    #[test]
    fn test_thunder_cloud_flash_window() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut cloud = ThunderCloud::spawn(Field::default(), &mut rng);
        cloud.lightning_interval = 3;
        assert!(cloud.lightning_bounds().is_empty());

        cloud.update(&mut ctx(&mut rng));
        cloud.update(&mut ctx(&mut rng));
        assert!(!cloud.flashing);
        cloud.update(&mut ctx(&mut rng));
        assert!(cloud.flashing);
        assert_eq!(cloud.bolt.len(), BOLT_POINTS);
        assert_eq!(cloud.lightning_bounds().len(), BOLT_POINTS);

        // Keep the next strike out of the window
        cloud.lightning_interval = 1000;
        for _ in 1..LIGHTNING_FLASH_TICKS {
            assert!(cloud.flashing);
            cloud.update(&mut ctx(&mut rng));
        }
        assert!(!cloud.flashing);
        assert!(cloud.lightning_bounds().is_empty());
    }

    #[test]
    fn test_bolt_goes_downward() {
        let mut rng = Pcg32::seed_from_u64(8);
        let mut cloud = ThunderCloud::spawn(Field::default(), &mut rng);
        cloud.flashing = true;
        cloud.generate_bolt(&mut rng);
        let mut last_y = cloud.bolt_origin().y;
        for p in &cloud.bolt {
            assert!(p.y >= last_y + 30.0);
            last_y = p.y;
        }
        for r in cloud.lightning_bounds() {
            assert!(r.w >= 20.0 && r.h > 0.0);
        }
    }

    #[test]
    fn test_ground_enemy_inset_bounds() {
        let mut rng = Pcg32::seed_from_u64(9);
        let enemy = GroundEnemy::spawn(Field::default(), &mut rng);
        let b = enemy.bounds();
        assert_eq!(b.x, enemy.pos.x + 8.0);
        assert_eq!(b.w, 34.0);
        assert_eq!(b.h, 42.0);
    }

    #[test]
    fn test_pickup_consumed_once() {
        let mut rng = Pcg32::seed_from_u64(10);
        let mut fuel = Pickup::spawn(PickupKind::FuelCan, Field::default(), &mut rng);
        assert!(!fuel.is_consumed());
        assert!(fuel.collect());
        assert!(!fuel.collect());
        assert!(fuel.is_consumed());
        assert!(fuel.update(&mut ctx(&mut rng)));
    }
}
