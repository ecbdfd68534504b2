//! Per-tick driver for a stage attempt

use rand::Rng;

use super::body::StepReport;
use super::collision::{Contact, overlaps, overlaps_any};
use super::entity::{
    Bird, Entity, GroundEnemy, Obstacle, ObstacleKind, Pickup, PickupKind, ReverseBird, ThunderCloud,
    WorldCtx, damp_vertical,
};
use super::epilogue::{ENDING_MESSAGE, EpilogueCue};
use super::particles::ParticleKind;
use super::spawner::Spawn;
use super::state::{FailureCause, GameEvent, GameState};
use super::stage_objects::{Building, Shooter};
use crate::audio::{SoundEffect, SoundOptions};
use crate::consts::*;
use crate::tuning::{Goal, SpawnKind};

/// Input intents for a single tick, sampled by the host (last state wins)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Left held (key or touch); applied every tick
    pub left_held: bool,
    /// Right held (key or touch); applied every tick
    pub right_held: bool,
    /// Burner pressed this tick
    pub start_heating: bool,
    /// Burner released this tick
    pub stop_heating: bool,
    /// One-shot left nudge
    pub move_left: bool,
    /// One-shot right nudge
    pub move_right: bool,
}

impl TickInput {
    /// Latch a keyboard key change; returns false for keys the game ignores
    pub fn apply_key(&mut self, key: &str, down: bool) -> bool {
        match key {
            "ArrowLeft" | "a" | "A" => self.left_held = down,
            "ArrowRight" | "d" | "D" => self.right_held = down,
            " " | "ArrowUp" | "w" | "W" => {
                if down {
                    self.start_heating = true;
                } else {
                    self.stop_heating = true;
                }
            }
            _ => return false,
        }
        true
    }

    /// Drop the one-shot intents once a tick has consumed them
    pub fn end_frame(&mut self) {
        self.start_heating = false;
        self.stop_heating = false;
        self.move_left = false;
        self.move_right = false;
    }
}

/// Advance the attempt by one tick. A finished run does not move.
pub fn tick(state: &mut GameState, input: &TickInput) {
    if state.is_over() {
        return;
    }

    state.time_ticks += 1;
    state.background_offset += state.config.scroll_speed;

    if state.config.is_epilogue() {
        tick_epilogue(state);
        return;
    }

    apply_intents(state, input);

    let field = state.field;
    let report = state
        .balloon
        .update(field, state.config.stage == 3, &mut state.rng);
    state.altitude = state.altitude.max(state.balloon.altitude_reading(field));

    if check_bottom(state, report) {
        return;
    }

    if !state.config.input_locked {
        if input.left_held {
            state.balloon.move_left();
        }
        if input.right_held {
            state.balloon.move_right();
        }
    }

    run_spawner(state);

    if advance_companion(state) {
        return;
    }
    if !stage_pass(state) {
        return;
    }

    state.particles.update();
    check_goal(state);

    state.grace_ticks = state.grace_ticks.saturating_sub(1);
    state.sync_fuel();
}

fn apply_intents(state: &mut GameState, input: &TickInput) {
    if state.config.input_locked {
        return;
    }
    if input.start_heating && state.balloon.start_heating() {
        let options = SoundOptions {
            volume: 0.6 + state.rng.random::<f32>() * 0.2,
            pitch: 0.95 + state.rng.random::<f32>() * 0.1,
        };
        state.sound(SoundEffect::Heat, options);
    }
    if input.stop_heating {
        state.balloon.stop_heating();
    }
    if input.move_left {
        state.balloon.move_left();
    }
    if input.move_right {
        state.balloon.move_right();
    }
}

/// Bottom-bound failures; returns true if the run ended
fn check_bottom(state: &mut GameState, report: StepReport) -> bool {
    if state.in_grace() {
        return false;
    }
    let crash_line = state.field.height - FUEL_CRASH_MARGIN;
    if state.stage() == 1 && state.balloon.fuel <= 0.0 && state.balloon.pos.y > crash_line {
        state.sound(SoundEffect::Fail, SoundOptions::volume(0.9));
        state.fail(FailureCause::OutOfFuel);
        return true;
    }
    if report.fallen {
        state.fail(FailureCause::Fallen);
        return true;
    }
    false
}

fn run_spawner(state: &mut GameState) {
    let spawns = state.spawner.step(&state.config, &mut state.rng);
    for spawn in spawns {
        spawn_entity(state, spawn);
    }
}

fn spawn_entity(state: &mut GameState, spawn: Spawn) {
    let field = state.field;
    let rng = &mut state.rng;
    log::debug!("spawn {:?} at tick {}", spawn, state.time_ticks);
    match spawn {
        Spawn::Shooter => state.shooters.push(Shooter::spawn(field, rng)),
        Spawn::Kind(kind) => match kind {
            SpawnKind::Cloud => state.obstacles.push(Obstacle::spawn(ObstacleKind::Cloud, field, rng)),
            SpawnKind::ThickCloud => state
                .obstacles
                .push(Obstacle::spawn(ObstacleKind::ThickCloud, field, rng)),
            SpawnKind::TallMountain => state
                .obstacles
                .push(Obstacle::spawn(ObstacleKind::TallMountain, field, rng)),
            SpawnKind::Bird => state.birds.push(Bird::spawn(field, state.config.stage, rng)),
            SpawnKind::ReverseBird => state.reverse_birds.push(ReverseBird::spawn(field, rng)),
            SpawnKind::ThunderCloud => state.thunder_clouds.push(ThunderCloud::spawn(field, rng)),
            SpawnKind::GroundEnemy => state.ground_enemies.push(GroundEnemy::spawn(field, rng)),
            SpawnKind::Building => state.buildings.push(Building::spawn(field, rng)),
            SpawnKind::Star => state.pickups.push(Pickup::spawn(PickupKind::Star, field, rng)),
            SpawnKind::FuelCan => state.pickups.push(Pickup::spawn(PickupKind::FuelCan, field, rng)),
        },
    }
}

/// Stage 4: move the companion and check the rescue. Returns true if the run ended.
fn advance_companion(state: &mut GameState) -> bool {
    let remaining = state.distance_remaining();
    let final_stretch = remaining <= FINAL_STRETCH_METERS;
    let field = state.field;
    let Some(companion) = state.companion.as_mut() else {
        return false;
    };

    companion.follow(field, state.balloon.pos.x, remaining);
    companion.update(field, &mut state.rng);

    if final_stretch && !state.rescued && overlaps(&state.balloon.bounds(), &companion.bounds()) {
        state.rescued = true;
        if let Some(target) = state.config.goal.target() {
            state.distance = target;
        }
        log::info!("companion rescued at tick {}", state.time_ticks);
        state.complete();
        return true;
    }
    false
}

/// Update every entity in one collection, resolving contacts while the run
/// is live. `resolve` returns whether to keep the entity.
fn sweep<E, F>(state: &mut GameState, list: fn(&mut GameState) -> &mut Vec<E>, mut resolve: F)
where
    E: Entity,
    F: FnMut(&mut GameState, &mut E) -> bool,
{
    let mut items = std::mem::take(list(state));
    let target = state.balloon.pos;
    items.retain_mut(|entity| {
        let mut ctx = WorldCtx {
            field: state.field,
            stage: state.config.stage,
            target,
            rng: &mut state.rng,
        };
        if entity.update(&mut ctx) {
            return false;
        }
        if state.is_over() || entity.is_consumed() {
            return true;
        }
        resolve(state, entity)
    });
    *list(state) = items;
}

/// All hazard and pickup passes. Returns false if the run ended.
fn stage_pass(state: &mut GameState) -> bool {
    sweep(state, |s| &mut s.buildings, resolve_building);
    if state.is_over() {
        return false;
    }

    sweep(state, |s| &mut s.shooters, resolve_shooter);
    if state.is_over() {
        return false;
    }

    let clouds_drag = state.config.clouds_drag;
    sweep(state, |s| &mut s.obstacles, |s, obstacle: &mut Obstacle| {
        if !overlaps(&s.balloon.bounds(), &obstacle.bounds()) {
            return true;
        }
        match obstacle.contact(clouds_drag) {
            Contact::Drag => {
                s.balloon.vel.y = damp_vertical(s.balloon.vel.y);
                true
            }
            Contact::Lethal(cause) => {
                s.sound(SoundEffect::Crash, SoundOptions::volume(0.9));
                s.fail(cause);
                false
            }
            Contact::Pass => true,
        }
    });
    if state.is_over() {
        return false;
    }

    sweep(state, |s| &mut s.thunder_clouds, |s, cloud: &mut ThunderCloud| {
        if cloud.flashing && overlaps_any(&s.balloon.bounds(), &cloud.lightning_bounds()) {
            s.sound(SoundEffect::Thunder, SoundOptions::volume(1.0));
            s.fail(FailureCause::Lightning);
            return false;
        }
        true
    });
    if state.is_over() {
        return false;
    }

    sweep(state, |s| &mut s.birds, |s, bird: &mut Bird| {
        if overlaps(&s.balloon.bounds(), &bird.bounds()) {
            let volume = 0.85 + s.rng.random::<f32>() * 0.1;
            s.sound(SoundEffect::Crow, SoundOptions::volume(volume));
            s.fail(FailureCause::Bird);
            return false;
        }
        true
    });
    if state.is_over() {
        return false;
    }

    let crash_volume = if state.stage() >= 3 { 0.85 } else { 0.8 };
    sweep(state, |s| &mut s.reverse_birds, |s, bird: &mut ReverseBird| {
        if overlaps(&s.balloon.bounds(), &bird.bounds()) {
            s.sound(SoundEffect::Crash, SoundOptions::volume(crash_volume));
            s.fail(FailureCause::DangerousBird);
            return false;
        }
        true
    });
    if state.is_over() {
        return false;
    }

    sweep(state, |s| &mut s.ground_enemies, |s, enemy: &mut GroundEnemy| {
        if overlaps(&s.balloon.bounds(), &enemy.bounds()) {
            s.sound(SoundEffect::Fail, SoundOptions::volume(0.9));
            s.fail(FailureCause::GroundEnemy);
            return false;
        }
        true
    });
    if state.is_over() {
        return false;
    }

    sweep(state, |s| &mut s.pickups, resolve_pickup);
    true
}

fn resolve_building(state: &mut GameState, building: &mut Building) -> bool {
    let hit_point = state.balloon.hit_point();
    let sweep = building.sweep_riders(hit_point);

    // One kill per building per tick, however many riders went down
    if sweep.killed > 0 {
        state.spectators_killed += 1;
        state.blood_level = (state.blood_level + 10.0).min(100.0);
        state.spawner.on_kills(1);
        state.particles.burst(ParticleKind::Blood, hit_point, &mut state.rng);
        state.events.push(GameEvent::SpectatorKilled {
            total: state.spectators_killed,
        });
    }
    if sweep.blown_away > 0 {
        state.particles.burst(ParticleKind::Wind, hit_point, &mut state.rng);
        state.events.push(GameEvent::RiderBlownAway);
    }

    if overlaps(&state.balloon.bounds(), &building.bounds()) {
        state.sound(SoundEffect::Crash, SoundOptions::volume(0.9));
        state.fail(FailureCause::Building);
        return false;
    }
    true
}

fn resolve_shooter(state: &mut GameState, shooter: &mut Shooter) -> bool {
    let hit_point = state.balloon.hit_point();
    let hits = shooter.take_hits(hit_point);
    if hits == 0 {
        return true;
    }

    state.balloon.drain_fuel(BULLET_FUEL_DAMAGE * hits as f32);
    for _ in 0..hits {
        state.particles.burst(ParticleKind::BulletHit, hit_point, &mut state.rng);
    }
    let volume = 0.6 + hits.min(3) as f32 * 0.1;
    state.sound(SoundEffect::Fail, SoundOptions::volume(volume));

    if state.balloon.fuel <= 0.0 {
        state.sound(SoundEffect::Fail, SoundOptions::volume(0.9));
        state.fail(FailureCause::ShotDown);
    }
    true
}

fn resolve_pickup(state: &mut GameState, pickup: &mut Pickup) -> bool {
    if !overlaps(&state.balloon.bounds(), &pickup.bounds()) || !pickup.collect() {
        return true;
    }
    match pickup.kind {
        PickupKind::Star => {
            state.stars_collected += 1;
            state.score += STAR_SCORE;
            state.sound(SoundEffect::CollectStar, SoundOptions::volume(0.8));
            state.particles.burst(ParticleKind::Star, pickup.pos, &mut state.rng);
            state.events.push(GameEvent::StarCollected {
                total: state.stars_collected,
                score: state.score,
            });
        }
        PickupKind::FuelCan => {
            state.balloon.add_fuel(FUEL_CAN_AMOUNT);
            state.sound(SoundEffect::CollectFuel, SoundOptions::volume(0.75));
            state.particles.burst(ParticleKind::Fuel, pickup.pos, &mut state.rng);
        }
    }
    true
}

fn check_goal(state: &mut GameState) {
    let h = state.field.height;
    match state.config.goal {
        Goal::Altitude { target, climb_divisor } => {
            state.altitude += (h - state.balloon.pos.y) / climb_divisor;
            if state.altitude >= target {
                state.complete();
            }
        }
        Goal::Distance { target, per_tick } => {
            state.distance += per_tick;
            if state.distance >= target {
                state.complete();
            }
        }
        Goal::Rescue { target, per_tick } => {
            if !state.rescued {
                state.distance = (state.distance + per_tick).min(target);
            }
        }
        Goal::Epilogue => {}
    }
}

fn tick_epilogue(state: &mut GameState) {
    let Some(epilogue) = state.epilogue.as_mut() else {
        return;
    };
    let before = epilogue.phase;
    let cue = epilogue.update(&mut state.balloon, state.field, &mut state.rng);
    let after = epilogue.phase;

    state.distance += 0.35;
    state.altitude = state
        .altitude
        .max((state.field.height - state.balloon.pos.y).floor());

    if before != after {
        state.events.push(GameEvent::EpiloguePhase(after));
    }
    match cue {
        Some(EpilogueCue::Jumped) => state.sound(SoundEffect::CollectStar, SoundOptions::volume(0.55)),
        Some(EpilogueCue::Ended) => {
            state.sound(SoundEffect::Victory, SoundOptions::volume(0.7));
            state.end_epilogue(ENDING_MESSAGE);
        }
        None => {}
    }
    state.sync_fuel();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;
    use crate::sim::body::Pose;
    use crate::sim::stage_objects::{Bullet, Rider, RiderState};
    use crate::tuning::StageConfig;
    use glam::Vec2;
    use proptest::prelude::*;

    fn state(stage: u8) -> GameState {
        let mut s = GameState::new(StageConfig::for_stage(stage).unwrap(), Field::default(), 99);
        s.drain_events();
        s
    }

    /// Stage state with spawning switched off
    fn quiet_state(stage: u8) -> GameState {
        let mut s = state(stage);
        s.config.spawns.clear();
        s
    }

    fn sounds(s: &mut GameState) -> Vec<SoundEffect> {
        s.drain_events()
            .into_iter()
            .filter_map(|e| match e {
                GameEvent::Sound { effect, .. } => Some(effect),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_key_latch_holds_and_one_shots() {
        let mut input = TickInput::default();
        assert!(input.apply_key("ArrowLeft", true));
        assert!(input.apply_key(" ", true));
        assert!(!input.apply_key("q", true));
        assert!(input.left_held && input.start_heating);

        input.end_frame();
        assert!(input.left_held);
        assert!(!input.start_heating);

        input.apply_key("ArrowLeft", false);
        input.apply_key(" ", false);
        assert!(!input.left_held);
        assert!(input.stop_heating);
        input.end_frame();
        assert_eq!(input, TickInput::default());
    }

    #[test]
    fn test_heat_cue_only_on_transition() {
        let mut s = quiet_state(1);
        let heat = TickInput {
            start_heating: true,
            ..Default::default()
        };
        tick(&mut s, &heat);
        assert_eq!(sounds(&mut s), vec![SoundEffect::Heat]);
        tick(&mut s, &heat);
        assert!(sounds(&mut s).is_empty());
        assert!(s.balloon.heating);
        assert_eq!(s.balloon.display_pose(), Pose::Heat);

        let stop = TickInput {
            stop_heating: true,
            ..Default::default()
        };
        tick(&mut s, &stop);
        tick(&mut s, &stop);
        assert!(!s.balloon.heating);
        assert!(sounds(&mut s).is_empty());
    }

    #[test]
    fn test_grace_window_suppresses_fall() {
        let mut s = quiet_state(2);
        s.balloon.pos.y = s.field.height - 10.0;
        tick(&mut s, &TickInput::default());
        assert!(!s.is_over());

        s.grace_ticks = 0;
        tick(&mut s, &TickInput::default());
        assert!(s.is_over());
        assert_eq!(s.outcome.as_ref().unwrap().cause, Some(FailureCause::Fallen));
    }

    #[test]
    fn test_out_of_fuel_takes_precedence() {
        let mut s = quiet_state(1);
        s.grace_ticks = 0;
        s.balloon.fuel = 0.0;
        s.balloon.pos.y = s.field.height - 20.0;
        tick(&mut s, &TickInput::default());
        let outcome = s.outcome.clone().unwrap();
        assert_eq!(outcome.cause, Some(FailureCause::OutOfFuel));
        assert!(sounds(&mut s).contains(&SoundEffect::Fail));
    }

    #[test]
    fn test_out_of_fuel_only_in_stage_one() {
        let mut s = quiet_state(2);
        s.grace_ticks = 0;
        s.balloon.fuel = 0.0;
        s.balloon.pos.y = s.field.height - 45.0;
        s.balloon.vel = Vec2::ZERO;
        tick(&mut s, &TickInput::default());
        assert!(!s.is_over());
    }

    #[test]
    fn test_finished_run_does_not_tick() {
        let mut s = quiet_state(1);
        s.fail(FailureCause::Fallen);
        let t = s.time_ticks;
        let y = s.balloon.pos.y;
        tick(&mut s, &TickInput::default());
        assert_eq!(s.time_ticks, t);
        assert_eq!(s.balloon.pos.y, y);
    }

    #[test]
    fn test_stage_one_completes_on_threshold_tick() {
        let mut s = quiet_state(1);
        s.balloon.pos.y = 340.0;
        s.balloon.vel = Vec2::ZERO;
        // This tick's climb: y ends at 340.15 so (640 - 340.15) / 3000 < 0.1
        s.altitude = 499.8;
        tick(&mut s, &TickInput::default());
        assert!(!s.is_over());
        assert!(s.altitude < 500.0);

        s.altitude = 499.95;
        tick(&mut s, &TickInput::default());
        let outcome = s.outcome.clone().unwrap();
        assert!(outcome.victory && outcome.completion);
        assert_eq!(outcome.next_stage, Some(2));
    }

    #[test]
    fn test_clouds_drag_only_where_enabled() {
        let mut s = quiet_state(2);
        s.balloon.vel = Vec2::new(0.0, 2.0);
        let mut cloud = Obstacle::spawn(ObstacleKind::Cloud, s.field, &mut s.rng);
        cloud.pos = s.balloon.pos + Vec2::new(2.0, 2.0);
        s.obstacles.push(cloud.clone());
        tick(&mut s, &TickInput::default());
        // gravity then drag
        assert!((s.balloon.vel.y - (2.0 + GRAVITY) * 0.9).abs() < 1e-5);

        let mut s1 = quiet_state(1);
        s1.balloon.vel = Vec2::new(0.0, 2.0);
        cloud.pos = s1.balloon.pos + Vec2::new(2.0, 2.0);
        s1.obstacles.push(cloud);
        tick(&mut s1, &TickInput::default());
        assert!((s1.balloon.vel.y - (2.0 + GRAVITY)).abs() < 1e-5);
    }

    #[test]
    fn test_mountain_is_lethal() {
        let mut s = quiet_state(2);
        let mut mountain = Obstacle::spawn(ObstacleKind::TallMountain, s.field, &mut s.rng);
        mountain.pos = s.balloon.pos;
        s.obstacles.push(mountain);
        tick(&mut s, &TickInput::default());
        assert_eq!(s.outcome.as_ref().unwrap().cause, Some(FailureCause::Mountain));
        assert!(sounds(&mut s).contains(&SoundEffect::Crash));
    }

    #[test]
    fn test_collected_pickup_is_removed_next_pass() {
        let mut s = quiet_state(2);
        let mut star = Pickup::spawn(PickupKind::Star, s.field, &mut s.rng);
        star.pos = s.balloon.pos + Vec2::new(10.0, 20.0);
        s.pickups.push(star);

        tick(&mut s, &TickInput::default());
        assert_eq!(s.score, STAR_SCORE);
        assert_eq!(s.stars_collected, 1);
        assert_eq!(s.pickups.len(), 1);
        assert!(s.pickups[0].is_consumed());

        tick(&mut s, &TickInput::default());
        assert!(s.pickups.is_empty());
        assert_eq!(s.score, STAR_SCORE);
    }

    #[test]
    fn test_fuel_can_refuels() {
        let mut s = quiet_state(1);
        s.balloon.fuel = 50.0;
        let mut can = Pickup::spawn(PickupKind::FuelCan, s.field, &mut s.rng);
        can.pos = s.balloon.pos + Vec2::new(10.0, 20.0);
        s.pickups.push(can);
        tick(&mut s, &TickInput::default());
        assert_eq!(s.balloon.fuel, 80.0);
        let events = s.drain_events();
        assert!(events.contains(&GameEvent::FuelChanged { percent: 80 }));
    }

    #[test]
    fn test_rider_kill_queues_shooters() {
        let mut s = quiet_state(3);
        let hit = s.balloon.hit_point();
        let building = Building {
            // Far below the balloon so the body box never touches it
            pos: Vec2::new(hit.x - 40.0, s.field.height - 10.0),
            size: Vec2::new(80.0, 10.0),
            speed: 0.0,
            riders: vec![Rider {
                pos: hit + Vec2::new(20.0, 0.0),
                state: RiderState::Standing,
                can_blow_away: false,
                wave_phase: 0.0,
                wave_speed: 0.1,
            }],
        };
        s.buildings.push(building);
        tick(&mut s, &TickInput::default());

        assert!(!s.is_over());
        assert_eq!(s.spectators_killed, 1);
        assert_eq!(s.spawner.pending_shooters, SHOOTERS_PER_KILL);
        assert_eq!(s.blood_level, 10.0);
        assert_eq!(s.buildings[0].riders[0].state, RiderState::Killed);
        assert_eq!(s.particles.len(), 20);

        tick(&mut s, &TickInput::default());
        assert_eq!(s.spectators_killed, 1);
    }

    #[test]
    fn test_riders_on_one_building_count_once_per_tick() {
        let mut s = quiet_state(3);
        let hit = s.balloon.hit_point();
        let rider = |offset: Vec2, can_blow_away: bool| Rider {
            pos: hit + offset,
            state: RiderState::Standing,
            can_blow_away,
            wave_phase: 0.0,
            wave_speed: 0.1,
        };
        s.buildings.push(Building {
            pos: Vec2::new(hit.x - 40.0, s.field.height - 10.0),
            size: Vec2::new(80.0, 10.0),
            speed: 0.0,
            riders: vec![
                rider(Vec2::new(15.0, 0.0), false),
                rider(Vec2::new(-15.0, 5.0), false),
                rider(Vec2::new(60.0, 0.0), true),
                rider(Vec2::new(-60.0, 0.0), true),
            ],
        });
        tick(&mut s, &TickInput::default());

        let states: Vec<_> = s.buildings[0].riders.iter().map(|r| r.state).collect();
        assert_eq!(
            states,
            vec![
                RiderState::Killed,
                RiderState::Killed,
                RiderState::BlownAway,
                RiderState::BlownAway
            ]
        );
        assert_eq!(s.spectators_killed, 1);
        assert_eq!(s.spawner.pending_shooters, SHOOTERS_PER_KILL);
        assert_eq!(s.blood_level, 10.0);
        // One blood burst and one wind burst
        assert_eq!(s.particles.len(), 30);
        let events = s.drain_events();
        let kills = events
            .iter()
            .filter(|e| matches!(e, GameEvent::SpectatorKilled { .. }))
            .count();
        let blown = events
            .iter()
            .filter(|e| matches!(e, GameEvent::RiderBlownAway))
            .count();
        assert_eq!((kills, blown), (1, 1));
    }

    #[test]
    fn test_bullets_drain_fuel_then_shoot_down() {
        let mut s = quiet_state(3);
        let hit = s.balloon.hit_point();
        let mut shooter = Shooter::spawn(s.field, &mut s.rng);
        shooter.bullets = vec![Bullet {
            pos: hit + Vec2::new(5.0, 0.0),
            vy: 0.0,
        }];
        s.shooters.push(shooter);
        tick(&mut s, &TickInput::default());
        assert!((s.balloon.fuel - (MAX_FUEL - BULLET_FUEL_DAMAGE)).abs() < 1e-4);
        assert!(!s.is_over());

        s.balloon.fuel = 10.0;
        let hit = s.balloon.hit_point();
        s.shooters[0].bullets.push(Bullet {
            pos: hit + Vec2::new(5.0, 0.0),
            vy: 0.0,
        });
        tick(&mut s, &TickInput::default());
        assert_eq!(s.outcome.as_ref().unwrap().cause, Some(FailureCause::ShotDown));
    }

    #[test]
    fn test_stage_three_distance_goal() {
        let mut s = quiet_state(3);
        s.distance = 3000.0 - 0.5;
        tick(&mut s, &TickInput::default());
        assert!(s.outcome.as_ref().unwrap().completion);
    }

    #[test]
    fn test_rescue_needs_final_stretch() {
        let mut s = quiet_state(4);
        s.distance = 1000.0;
        if let Some(c) = s.companion.as_mut() {
            c.pos = s.balloon.pos;
            c.target_x = c.pos.x;
        }
        tick(&mut s, &TickInput::default());
        assert!(!s.rescued);
        assert!(!s.is_over());
        assert_eq!(s.distance, 1002.0);
    }

    #[test]
    fn test_rescue_in_final_stretch() {
        let mut s = quiet_state(4);
        s.distance = 4990.0;
        if let Some(c) = s.companion.as_mut() {
            c.pos = s.balloon.pos;
        }
        tick(&mut s, &TickInput::default());
        assert!(s.rescued);
        assert_eq!(s.distance, 5000.0);
        let outcome = s.outcome.clone().unwrap();
        assert!(outcome.victory && outcome.completion);
        assert!(outcome.message.starts_with("💖 Kami rescued his love!"));
        let victories = sounds(&mut s)
            .into_iter()
            .filter(|e| *e == SoundEffect::Victory)
            .count();
        assert_eq!(victories, 1);
    }

    #[test]
    fn test_rescue_distance_caps_at_target() {
        let mut s = quiet_state(4);
        s.distance = 4999.5;
        tick(&mut s, &TickInput::default());
        assert_eq!(s.distance, 5000.0);
    }

    #[test]
    fn test_epilogue_ignores_input_and_ends_once() {
        let mut s = quiet_state(5);
        let press = TickInput {
            start_heating: true,
            left_held: true,
            ..Default::default()
        };
        let mut overs = 0;
        for _ in 0..5000 {
            tick(&mut s, &press);
            overs += s
                .drain_events()
                .iter()
                .filter(|e| matches!(e, GameEvent::GameOver(_)))
                .count();
        }
        assert!(!s.balloon.heating);
        assert_eq!(overs, 1);
        let outcome = s.outcome.unwrap();
        assert!(outcome.victory && !outcome.completion);
        assert_eq!(outcome.message, ENDING_MESSAGE);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_body_invariants_hold_every_tick(
            seed in any::<u64>(),
            stage in 1u8..=4,
            inputs in prop::collection::vec(
                (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()), 1..400),
        ) {
            let mut s = GameState::new(StageConfig::for_stage(stage).unwrap(), Field::default(), seed);
            for (left, right, heat, stop) in inputs {
                let input = TickInput {
                    left_held: left,
                    right_held: right,
                    start_heating: heat,
                    stop_heating: stop,
                    ..Default::default()
                };
                tick(&mut s, &input);
                let b = &s.balloon;
                prop_assert!(b.fuel >= 0.0 && b.fuel <= b.max_fuel);
                prop_assert!(b.vel.x.abs() <= MAX_VX);
                prop_assert!(b.vel.y.abs() <= MAX_VY);
                prop_assert!(b.pos.x >= SIDE_MARGIN && b.pos.x <= s.field.width - SIDE_MARGIN);
                if s.is_over() {
                    break;
                }
            }
        }
    }
}
