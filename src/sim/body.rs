//! The balloon: flight model, fuel and pose
//!
//! One `update` per tick integrates gravity, burner lift and horizontal drag,
//! then clamps the balloon into the play field. Falling out of the bottom is
//! reported to the caller rather than clamped.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use crate::Field;
use crate::consts::*;

/// Pilot pose shown by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Pose {
    #[default]
    Neutral,
    Left,
    Right,
    Heat,
    Drink,
}

/// Ticks a drink lasts
pub const DRINK_TICKS: u32 = 90;
/// Base ticks between drinks (plus up to `DRINK_COOLDOWN_JITTER`)
pub const DRINK_COOLDOWN: u32 = 240;
pub const DRINK_COOLDOWN_JITTER: u32 = 180;

/// Periodic drink animation used by the night-city stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrinkCycle {
    /// Ticks until the next drink starts
    pub cooldown: u32,
    /// Ticks left in the current drink
    pub timer: u32,
    pub active: bool,
}

impl DrinkCycle {
    fn new(rng: &mut impl Rng) -> Self {
        Self {
            cooldown: DRINK_COOLDOWN + rng.random_range(0..DRINK_COOLDOWN_JITTER),
            timer: 0,
            active: false,
        }
    }

    /// Advance one tick; returns true on the tick a drink ends
    fn step(&mut self, rng: &mut impl Rng) -> bool {
        if self.timer > 0 {
            self.timer -= 1;
            self.active = true;
            return false;
        }

        let finished = self.active;
        self.active = false;
        if self.cooldown > 0 {
            self.cooldown -= 1;
        } else {
            self.timer = DRINK_TICKS;
            self.active = true;
            self.cooldown = DRINK_COOLDOWN + rng.random_range(0..DRINK_COOLDOWN_JITTER);
        }
        finished
    }

    fn reset(&mut self) {
        self.active = false;
        self.timer = 0;
        self.cooldown = DRINK_COOLDOWN;
    }
}

/// What happened during one physics step that the caller has to act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepReport {
    /// The balloon dropped below the bottom bound
    pub fallen: bool,
    /// x was clamped to a side bound this step
    pub clamped_x: bool,
}

/// The player-controlled balloon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balloon {
    /// Top-left corner of the envelope box
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    pub fuel: f32,
    pub max_fuel: f32,
    pub heating: bool,
    /// Requested pose (heat/drink take priority when shown)
    pub pose: Pose,
    /// Ticks the requested pose is held before decaying to neutral
    pub pose_timer: u32,
    pub drink: DrinkCycle,
    /// Burner flicker phase (render only)
    #[serde(skip)]
    pub flame_phase: f32,
}

impl Balloon {
    pub fn new(pos: Vec2, rng: &mut impl Rng) -> Self {
        Self {
            pos,
            vel: Vec2::ZERO,
            size: Vec2::new(BALLOON_WIDTH, BALLOON_HEIGHT),
            fuel: MAX_FUEL,
            max_fuel: MAX_FUEL,
            heating: false,
            pose: Pose::Neutral,
            pose_timer: 0,
            drink: DrinkCycle::new(rng),
            flame_phase: 0.0,
        }
    }

    /// Standard start position: centered, near the ground
    pub fn spawn_point(field: Field) -> Vec2 {
        Vec2::new(field.width / 2.0 - BALLOON_WIDTH / 2.0, field.height - 100.0)
    }

    /// Advance one tick. `drink_stage` enables the periodic drink pose.
    pub fn update(&mut self, field: Field, drink_stage: bool, rng: &mut impl Rng) -> StepReport {
        let mut report = StepReport::default();

        self.vel.y += GRAVITY;

        if self.heating && self.fuel > 0.0 {
            self.vel.y += LIFT;
            self.fuel = (self.fuel - FUEL_CONSUMPTION).max(0.0);
            self.flame_phase += 0.2;
        }

        self.vel.y = self.vel.y.clamp(-MAX_VY, MAX_VY);
        self.vel.x = self.vel.x.clamp(-MAX_VX, MAX_VX);
        self.vel.x *= HORIZONTAL_DRAG;

        self.pos += self.vel;

        let max_x = field.width - SIDE_MARGIN;
        if self.pos.x < SIDE_MARGIN {
            self.pos.x = SIDE_MARGIN;
            self.vel.x = 0.0;
            report.clamped_x = true;
        }
        if self.pos.x > max_x {
            self.pos.x = max_x;
            self.vel.x = 0.0;
            report.clamped_x = true;
        }

        if self.pos.y < TOP_LIMIT {
            self.pos.y = TOP_LIMIT;
            self.vel.y = 0.0;
        }

        report.fallen = self.pos.y > field.height - FALL_MARGIN;

        if self.pose_timer > 0 {
            self.pose_timer -= 1;
        } else if !self.heating && !self.drink.active {
            self.pose = Pose::Neutral;
        }

        if drink_stage {
            if self.drink.step(rng) {
                self.pose_timer = 0;
            }
        } else {
            self.drink.reset();
        }

        report
    }

    /// Altitude reading for the current position: `floor((height - y) / 2)`
    pub fn altitude_reading(&self, field: Field) -> f32 {
        ((field.height - self.pos.y) / 2.0).floor()
    }

    /// Light the burner. Returns true only on the off -> on transition.
    pub fn start_heating(&mut self) -> bool {
        let started = !self.heating;
        self.heating = true;
        if !self.drink.active {
            self.pose = Pose::Heat;
        }
        self.pose_timer = 0;
        started
    }

    /// Cut the burner; a no-op when it is already off
    pub fn stop_heating(&mut self) {
        if !self.heating {
            return;
        }
        self.heating = false;
        if !self.drink.active {
            self.pose = Pose::Neutral;
        }
        self.pose_timer = 0;
    }

    pub fn move_left(&mut self) {
        self.nudge(-MOVE_IMPULSE);
        self.request_pose(Pose::Left);
    }

    pub fn move_right(&mut self) {
        self.nudge(MOVE_IMPULSE);
        self.request_pose(Pose::Right);
    }

    fn nudge(&mut self, dx: f32) {
        self.vel.x = (self.vel.x + dx).clamp(-MAX_VX, MAX_VX);
    }

    /// Hold a left/right pose for a few ticks unless a higher-priority pose is showing
    fn request_pose(&mut self, pose: Pose) {
        if self.drink.active || self.heating {
            return;
        }
        self.pose = pose;
        self.pose_timer = POSE_HOLD_TICKS;
    }

    /// Pose the renderer should show: drink > heat > requested
    pub fn display_pose(&self) -> Pose {
        if self.drink.active {
            Pose::Drink
        } else if self.heating {
            Pose::Heat
        } else {
            self.pose
        }
    }

    pub fn add_fuel(&mut self, amount: f32) {
        self.fuel = (self.fuel + amount).clamp(0.0, self.max_fuel);
    }

    pub fn drain_fuel(&mut self, amount: f32) {
        self.fuel = (self.fuel - amount).clamp(0.0, self.max_fuel);
    }

    /// Fuel as a whole percentage of the tank
    pub fn fuel_percent(&self) -> u32 {
        if self.max_fuel <= 0.0 {
            return 0;
        }
        (self.fuel / self.max_fuel * 100.0).round() as u32
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(self.pos.x, self.pos.y, self.size.x, self.size.y)
    }

    /// Point used for radius checks against riders and projectiles
    pub fn hit_point(&self) -> Vec2 {
        self.pos + Vec2::splat(BALLOON_HIT_OFFSET)
    }

    /// Scripted flight: ease toward `target` by `rate` of the remaining gap
    pub fn ease_toward(&mut self, target: Vec2, rate: f32) {
        self.pos += (target - self.pos) * rate;
    }

    /// Scripted flight: burner off, tank full, velocity bleeding away
    pub fn hold_cinematic(&mut self) {
        self.vel *= 0.85;
        self.heating = false;
        self.fuel = self.max_fuel;
        self.pose = Pose::Neutral;
        self.pose_timer = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn balloon_at(x: f32, y: f32) -> (Balloon, Pcg32) {
        let mut rng = Pcg32::seed_from_u64(7);
        let b = Balloon::new(Vec2::new(x, y), &mut rng);
        (b, rng)
    }

    #[test]
    fn test_gravity_pulls_down() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 300.0);
        b.update(field, false, &mut rng);
        assert!((b.vel.y - GRAVITY).abs() < 1e-6);
        assert!(b.pos.y > 300.0);
    }

    #[test]
    fn test_heating_lifts_and_burns_fuel() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 300.0);
        b.start_heating();
        b.update(field, false, &mut rng);
        assert!(b.vel.y < 0.0);
        assert!((b.fuel - (MAX_FUEL - FUEL_CONSUMPTION)).abs() < 1e-4);
    }

    #[test]
    fn test_heating_without_fuel_gives_no_lift() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 300.0);
        b.fuel = 0.0;
        b.start_heating();
        b.update(field, false, &mut rng);
        assert!(b.vel.y > 0.0);
        assert_eq!(b.fuel, 0.0);
    }

    #[test]
    fn test_fuel_floors_at_zero() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 300.0);
        b.fuel = 0.1;
        b.start_heating();
        b.update(field, false, &mut rng);
        assert_eq!(b.fuel, 0.0);
    }

    #[test]
    fn test_side_clamp_zeroes_vx() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(SIDE_MARGIN + 1.0, 300.0);
        b.vel.x = -4.0;
        let report = b.update(field, false, &mut rng);
        assert!(report.clamped_x);
        assert_eq!(b.pos.x, SIDE_MARGIN);
        assert_eq!(b.vel.x, 0.0);
    }

    #[test]
    fn test_top_clamp_zeroes_vy() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, TOP_LIMIT + 1.0);
        b.vel.y = -5.0;
        b.update(field, false, &mut rng);
        assert_eq!(b.pos.y, TOP_LIMIT);
        assert_eq!(b.vel.y, 0.0);
    }

    #[test]
    fn test_fall_is_reported_not_clamped() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, field.height - FALL_MARGIN);
        b.vel.y = 3.0;
        let report = b.update(field, false, &mut rng);
        assert!(report.fallen);
        assert!(b.pos.y > field.height - FALL_MARGIN);
    }

    #[test]
    fn test_heating_cue_only_on_transition() {
        let (mut b, _) = balloon_at(300.0, 300.0);
        assert!(b.start_heating());
        assert!(!b.start_heating());
        b.stop_heating();
        assert!(b.start_heating());
    }

    #[test]
    fn test_stop_heating_when_idle_is_noop() {
        let (mut b, _) = balloon_at(300.0, 300.0);
        b.move_left();
        assert_eq!(b.pose, Pose::Left);
        let before_timer = b.pose_timer;
        b.stop_heating();
        assert_eq!(b.pose, Pose::Left);
        assert_eq!(b.pose_timer, before_timer);
        assert!(!b.heating);
    }

    #[test]
    fn test_move_pose_decays_to_neutral() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 300.0);
        b.move_right();
        assert_eq!(b.display_pose(), Pose::Right);
        for _ in 0..POSE_HOLD_TICKS {
            b.update(field, false, &mut rng);
            assert_eq!(b.display_pose(), Pose::Right);
        }
        b.update(field, false, &mut rng);
        assert_eq!(b.display_pose(), Pose::Neutral);
    }

    #[test]
    fn test_heat_overrides_move_pose() {
        let (mut b, _) = balloon_at(300.0, 300.0);
        b.start_heating();
        b.move_left();
        assert_eq!(b.display_pose(), Pose::Heat);
        assert!(b.vel.x < 0.0);
    }

    #[test]
    fn test_drink_cycle_only_in_drink_stage() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 200.0);
        b.drink.cooldown = 0;
        b.update(field, true, &mut rng);
        assert!(b.drink.active);
        assert_eq!(b.display_pose(), Pose::Drink);

        // Heating does not take over the pose while drinking
        b.start_heating();
        assert_eq!(b.display_pose(), Pose::Drink);
        assert!(b.heating);

        b.update(field, false, &mut rng);
        assert!(!b.drink.active);
        assert_eq!(b.drink.cooldown, DRINK_COOLDOWN);
    }

    #[test]
    fn test_drink_lasts_fixed_ticks() {
        let field = Field::default();
        let (mut b, mut rng) = balloon_at(300.0, 200.0);
        b.drink.cooldown = 0;
        b.update(field, true, &mut rng);
        for _ in 0..DRINK_TICKS {
            assert!(b.drink.active);
            b.vel = Vec2::ZERO;
            b.pos.y = 200.0;
            b.update(field, true, &mut rng);
        }
        // The tick after the timer runs out ends the drink
        let ended = b.update(field, true, &mut rng);
        assert!(!ended.fallen);
        assert!(!b.drink.active);
        assert!(b.drink.cooldown >= DRINK_COOLDOWN);
    }

    #[test]
    fn test_add_fuel_saturates() {
        let (mut b, _) = balloon_at(300.0, 300.0);
        b.fuel = 90.0;
        b.add_fuel(FUEL_CAN_AMOUNT);
        assert_eq!(b.fuel, MAX_FUEL);
        b.drain_fuel(500.0);
        assert_eq!(b.fuel, 0.0);
    }

    #[derive(Debug, Clone, Copy)]
    enum Intent {
        Left,
        Right,
        Heat,
        Cool,
        Tick,
    }

    fn arb_intent() -> impl Strategy<Value = Intent> {
        prop_oneof![
            Just(Intent::Left),
            Just(Intent::Right),
            Just(Intent::Heat),
            Just(Intent::Cool),
            Just(Intent::Tick),
        ]
    }

    proptest! {
        #[test]
        fn prop_body_invariants_hold(
            start_x in 0.0f32..640.0,
            start_y in 60.0f32..560.0,
            fuel in 0.0f32..100.0,
            intents in prop::collection::vec(arb_intent(), 1..300),
        ) {
            let field = Field::default();
            let (mut b, mut rng) = balloon_at(start_x, start_y);
            b.fuel = fuel;
            for intent in intents {
                match intent {
                    Intent::Left => b.move_left(),
                    Intent::Right => b.move_right(),
                    Intent::Heat => { b.start_heating(); }
                    Intent::Cool => b.stop_heating(),
                    Intent::Tick => {
                        let report = b.update(field, true, &mut rng);
                        prop_assert!(b.pos.x >= SIDE_MARGIN && b.pos.x <= field.width - SIDE_MARGIN);
                        prop_assert!(b.pos.y >= TOP_LIMIT);
                        if report.clamped_x {
                            prop_assert_eq!(b.vel.x, 0.0);
                        }
                    }
                }
                prop_assert!(b.fuel >= 0.0 && b.fuel <= b.max_fuel);
                prop_assert!(b.vel.x.abs() <= MAX_VX);
                prop_assert!(b.vel.y.abs() <= MAX_VY);
            }
        }
    }
}
