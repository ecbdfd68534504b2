//! Composite stage objects: buildings with rooftop riders, shooters with
//! their bullets, and the stage 4 companion balloon.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::{Rect, RiderContact, bullet_hits, rider_contact};
use super::entity::{Entity, WorldCtx};
use crate::Field;
use crate::consts::FINAL_STRETCH_METERS;

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiderState {
    Standing,
    BlownAway,
    /// Left behind as a blood marker; never collides again
    Killed,
}

/// Spectator standing on a rooftop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub pos: Vec2,
    pub state: RiderState,
    pub can_blow_away: bool,
    pub wave_phase: f32,
    pub wave_speed: f32,
}

impl Rider {
    pub fn is_collidable(&self) -> bool {
        self.state == RiderState::Standing
    }
}

/// Outcome of sweeping the balloon past one building's riders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiderSweep {
    pub killed: u32,
    pub blown_away: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub riders: Vec<Rider>,
}

impl Building {
    pub fn spawn(field: Field, rng: &mut Pcg32) -> Self {
        let short = rng.random::<f32>() > 0.5;
        let width = 40.0 + rng.random::<f32>() * 60.0;
        let height = if short {
            80.0 + rng.random::<f32>() * 100.0
        } else {
            150.0 + rng.random::<f32>() * 200.0
        };
        let pos = Vec2::new(field.width + 100.0, field.height - height);

        let mut riders = Vec::new();
        if rng.random::<f32>() > 0.5 {
            let count = rng.random_range(1..=3);
            for _ in 0..count {
                riders.push(Rider {
                    pos: Vec2::new(pos.x + rng.random::<f32>() * width, pos.y - 30.0),
                    state: RiderState::Standing,
                    can_blow_away: rng.random::<f32>() > 0.5,
                    wave_phase: rng.random::<f32>() * TAU,
                    wave_speed: 0.12 + rng.random::<f32>() * 0.08,
                });
            }
        }

        Self {
            pos,
            size: Vec2::new(width, height),
            speed: 2.0,
            riders,
        }
    }

    /// Resolve every standing rider against the balloon hit point
    pub fn sweep_riders(&mut self, hit_point: Vec2) -> RiderSweep {
        let mut sweep = RiderSweep::default();
        for rider in self.riders.iter_mut().filter(|r| r.is_collidable()) {
            match rider_contact(hit_point, rider.pos, rider.can_blow_away) {
                RiderContact::Killed => {
                    rider.state = RiderState::Killed;
                    sweep.killed += 1;
                }
                RiderContact::BlownAway => {
                    rider.state = RiderState::BlownAway;
                    sweep.blown_away += 1;
                }
                RiderContact::None => {}
            }
        }
        sweep
    }
}

impl Entity for Building {
    fn update(&mut self, _ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;
        for rider in &mut self.riders {
            match rider.state {
                RiderState::Standing => {
                    rider.wave_phase += rider.wave_speed;
                    rider.pos.x -= self.speed;
                }
                RiderState::Killed => rider.pos.x -= self.speed,
                RiderState::BlownAway => {
                    rider.pos.x -= self.speed * 0.5;
                    rider.pos.y += 3.0;
                }
            }
        }
        self.pos.x < -self.size.x - 100.0
    }

    /// Body below the roof line; the rooftop itself is forgiving
    fn bounds(&self) -> Rect {
        Rect::new(
            self.pos.x + 5.0,
            self.pos.y + 20.0,
            self.size.x - 10.0,
            self.size.y - 20.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Shooters
// ---------------------------------------------------------------------------

pub const SHOOT_INTERVAL: u32 = 120;
const BULLET_SPEED: f32 = 5.0;
const BULLET_GRAVITY: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: Vec2,
    pub vy: f32,
}

/// Ground shooter; owns the bullets it fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shooter {
    pub pos: Vec2,
    pub size: Vec2,
    pub speed: f32,
    pub shoot_timer: u32,
    pub bullets: Vec<Bullet>,
}

impl Shooter {
    pub fn spawn(field: Field, rng: &mut Pcg32) -> Self {
        Self {
            pos: Vec2::new(
                field.width + 50.0,
                field.height - 100.0 - rng.random::<f32>() * 200.0,
            ),
            size: Vec2::new(20.0, 30.0),
            speed: 2.0,
            shoot_timer: 0,
            bullets: Vec::new(),
        }
    }

    /// Fire at `target`; only the vertical component of the aim is kept
    fn shoot(&mut self, target: Vec2) {
        let delta = target - self.pos;
        let angle = delta.y.atan2(delta.x);
        self.bullets.push(Bullet {
            pos: self.pos,
            vy: angle.sin() * BULLET_SPEED,
        });
    }

    /// Remove bullets within the hit radius of `hit_point`; returns how many
    pub fn take_hits(&mut self, hit_point: Vec2) -> u32 {
        let before = self.bullets.len();
        self.bullets.retain(|b| !bullet_hits(hit_point, b.pos));
        (before - self.bullets.len()) as u32
    }
}

impl Entity for Shooter {
    fn update(&mut self, ctx: &mut WorldCtx) -> bool {
        self.pos.x -= self.speed;
        self.shoot_timer += 1;
        if self.shoot_timer >= SHOOT_INTERVAL {
            self.shoot(ctx.target);
            self.shoot_timer = 0;
        }

        self.bullets.retain_mut(|b| {
            b.pos.x -= BULLET_SPEED;
            b.pos.y += b.vy;
            b.vy += BULLET_GRAVITY;
            b.pos.x > 0.0
        });

        self.pos.x < -self.size.x
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }
}

// ---------------------------------------------------------------------------
// Companion
// ---------------------------------------------------------------------------

pub const COMPANION_LINES: [&str; 7] = [
    "Kamiiii !!",
    "Kami !",
    "Come for me !",
    "Kami! I am here!",
    "Sami is holding me!",
    "Hurry up, your fuel is running out!",
    "Together we will fly to the sky!",
];

const DIALOGUE_INTERVAL: u32 = 150;
const DIALOGUE_TICKS: u32 = 110;
/// Screen pixels per meter of remaining lead
const LEAD_PX_PER_METER: f32 = 6.0;
const MAX_LEAD_PX: f32 = 180.0;

/// Captive balloon the player chases in stage 4
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Companion {
    pub pos: Vec2,
    pub size: Vec2,
    pub target_x: f32,
    /// True once the final stretch is reached; touching it then rescues
    pub allow_rescue: bool,
    pub float_phase: f32,
    pub captor_wave: f32,
    /// Index into `COMPANION_LINES` of the line being shown
    pub dialogue: Option<usize>,
    dialogue_timer: u32,
    dialogue_display: u32,
}

impl Companion {
    pub fn new(field: Field, rng: &mut Pcg32) -> Self {
        let x = field.width + 200.0;
        Self {
            pos: Vec2::new(x, field.height / 2.0),
            size: Vec2::new(70.0, 90.0),
            target_x: x,
            allow_rescue: false,
            float_phase: 0.0,
            captor_wave: rng.random::<f32>() * TAU,
            dialogue: None,
            dialogue_timer: 0,
            dialogue_display: 0,
        }
    }

    /// Keep the companion a lead ahead of the balloon that shrinks to zero
    /// over the final stretch
    pub fn follow(&mut self, field: Field, balloon_x: f32, remaining: f32) {
        let remaining = remaining.max(0.0);
        let final_stretch = remaining <= FINAL_STRETCH_METERS;
        let lead_meters = if final_stretch {
            remaining
        } else {
            FINAL_STRETCH_METERS
        };
        let lead = (lead_meters * LEAD_PX_PER_METER).clamp(0.0, MAX_LEAD_PX);
        let max_x = field.width - self.size.x - 40.0;
        self.target_x = max_x.min(balloon_x + lead);
        self.allow_rescue = final_stretch;
    }

    pub fn update(&mut self, field: Field, rng: &mut Pcg32) {
        self.float_phase += 0.042;
        self.pos.y = (self.pos.y + self.float_phase.sin() * 1.8).clamp(60.0, field.height - 120.0);
        self.pos.x += (self.target_x - self.pos.x) * 0.08;
        self.captor_wave += 0.12;

        self.dialogue_timer += 1;
        if self.dialogue_timer >= DIALOGUE_INTERVAL {
            self.dialogue_timer = 0;
            self.dialogue = Some(rng.random_range(0..COMPANION_LINES.len()));
            self.dialogue_display = DIALOGUE_TICKS;
        }
        if self.dialogue_display > 0 {
            self.dialogue_display -= 1;
        } else {
            self.dialogue = None;
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    /// Speech bubble text, if one is showing
    pub fn dialogue_line(&self) -> Option<&'static str> {
        self.dialogue.map(|i| COMPANION_LINES[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn ctx(rng: &mut Pcg32, target: Vec2) -> WorldCtx<'_> {
        WorldCtx {
            field: Field::default(),
            stage: 3,
            target,
            rng,
        }
    }

    fn building_with_rider(rider_pos: Vec2, can_blow_away: bool) -> Building {
        Building {
            pos: Vec2::new(300.0, 400.0),
            size: Vec2::new(80.0, 240.0),
            speed: 2.0,
            riders: vec![Rider {
                pos: rider_pos,
                state: RiderState::Standing,
                can_blow_away,
                wave_phase: 0.0,
                wave_speed: 0.15,
            }],
        }
    }

    #[test]
    fn test_building_spawn_shape() {
        let mut rng = Pcg32::seed_from_u64(11);
        let field = Field::default();
        for _ in 0..50 {
            let b = Building::spawn(field, &mut rng);
            assert!((40.0..100.0).contains(&b.size.x));
            assert!((80.0..350.0).contains(&b.size.y));
            assert_eq!(b.pos.y + b.size.y, field.height);
            assert!(b.riders.len() <= 3);
            for r in &b.riders {
                assert_eq!(r.pos.y, b.pos.y - 30.0);
                assert!(r.pos.x >= b.pos.x && r.pos.x <= b.pos.x + b.size.x);
            }
        }
    }

    #[test]
    fn test_killed_rider_is_not_collidable_again() {
        let mut building = building_with_rider(Vec2::new(340.0, 370.0), true);
        let hit = Vec2::new(300.0, 370.0);

        let sweep = building.sweep_riders(hit);
        assert_eq!(sweep.killed, 1);
        assert_eq!(building.riders[0].state, RiderState::Killed);

        let again = building.sweep_riders(hit);
        assert_eq!(again, RiderSweep::default());
    }

    #[test]
    fn test_killed_rider_stays_with_building() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut building = building_with_rider(Vec2::new(340.0, 370.0), false);
        building.riders[0].state = RiderState::Killed;
        let phase = building.riders[0].wave_phase;
        building.update(&mut ctx(&mut rng, Vec2::ZERO));
        assert_eq!(building.riders[0].pos, Vec2::new(338.0, 370.0));
        assert_eq!(building.riders[0].wave_phase, phase);
    }

    #[test]
    fn test_blown_rider_falls() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut building = building_with_rider(Vec2::new(360.0, 370.0), true);
        let sweep = building.sweep_riders(Vec2::new(300.0, 370.0));
        assert_eq!(sweep.blown_away, 1);
        building.update(&mut ctx(&mut rng, Vec2::ZERO));
        assert_eq!(building.riders[0].pos, Vec2::new(359.0, 373.0));
    }

    #[test]
    fn test_building_bounds_inset() {
        let b = building_with_rider(Vec2::ZERO, false);
        assert_eq!(b.bounds(), Rect::new(305.0, 420.0, 70.0, 220.0));
    }

    #[test]
    fn test_shooter_fires_on_interval() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut shooter = Shooter::spawn(Field::default(), &mut rng);
        shooter.pos = Vec2::new(600.0, 500.0);
        let target = Vec2::new(200.0, 200.0);
        for _ in 0..SHOOT_INTERVAL - 1 {
            shooter.update(&mut ctx(&mut rng, target));
        }
        assert!(shooter.bullets.is_empty());
        shooter.update(&mut ctx(&mut rng, target));
        assert_eq!(shooter.bullets.len(), 1);
        // Aimed upward
        assert!(shooter.bullets[0].vy < 0.0);
    }

    #[test]
    fn test_bullets_fall_and_expire() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut shooter = Shooter::spawn(Field::default(), &mut rng);
        shooter.speed = 0.0;
        shooter.bullets.push(Bullet {
            pos: Vec2::new(12.0, 100.0),
            vy: 0.0,
        });
        shooter.update(&mut ctx(&mut rng, Vec2::ZERO));
        assert_eq!(shooter.bullets[0].pos.x, 7.0);
        assert!((shooter.bullets[0].vy - 0.1).abs() < 1e-6);
        shooter.update(&mut ctx(&mut rng, Vec2::ZERO));
        shooter.update(&mut ctx(&mut rng, Vec2::ZERO));
        assert!(shooter.bullets.is_empty());
    }

    #[test]
    fn test_take_hits_consumes_bullets() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut shooter = Shooter::spawn(Field::default(), &mut rng);
        let hit = Vec2::new(200.0, 200.0);
        shooter.bullets = vec![
            Bullet { pos: Vec2::new(210.0, 200.0), vy: 0.0 },
            Bullet { pos: Vec2::new(200.0, 220.0), vy: 0.0 },
            Bullet { pos: Vec2::new(400.0, 200.0), vy: 0.0 },
        ];
        assert_eq!(shooter.take_hits(hit), 2);
        assert_eq!(shooter.bullets.len(), 1);
        assert_eq!(shooter.take_hits(hit), 0);
    }

    #[test]
    fn test_companion_lead_shrinks_in_final_stretch() {
        let mut rng = Pcg32::seed_from_u64(3);
        let field = Field::default();
        let mut companion = Companion::new(field, &mut rng);

        companion.follow(field, 100.0, 1000.0);
        assert!(!companion.allow_rescue);
        assert_eq!(companion.target_x, 220.0);

        companion.follow(field, 100.0, 10.0);
        assert!(companion.allow_rescue);
        assert_eq!(companion.target_x, 160.0);

        companion.follow(field, 100.0, 0.0);
        assert_eq!(companion.target_x, 100.0);

        // Never past the right edge
        companion.follow(field, 600.0, 1000.0);
        assert_eq!(companion.target_x, field.width - 110.0);
    }

    #[test]
    fn test_companion_stays_in_band() {
        let mut rng = Pcg32::seed_from_u64(4);
        let field = Field::default();
        let mut companion = Companion::new(field, &mut rng);
        companion.follow(field, 100.0, 1000.0);
        for _ in 0..2000 {
            companion.update(field, &mut rng);
            assert!(companion.pos.y >= 60.0 && companion.pos.y <= field.height - 120.0);
        }
        assert!((companion.pos.x - companion.target_x).abs() < 1.0);
    }

    #[test]
    fn test_companion_dialogue_timing() {
        let mut rng = Pcg32::seed_from_u64(5);
        let field = Field::default();
        let mut companion = Companion::new(field, &mut rng);
        for _ in 0..DIALOGUE_INTERVAL - 1 {
            companion.update(field, &mut rng);
            assert!(companion.dialogue_line().is_none());
        }
        companion.update(field, &mut rng);
        let line = companion.dialogue_line().expect("a line is showing");
        assert!(COMPANION_LINES.contains(&line));
        for _ in 0..DIALOGUE_TICKS {
            companion.update(field, &mut rng);
        }
        assert!(companion.dialogue_line().is_none());
    }
}
