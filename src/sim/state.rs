//! Run state and core simulation types
//!
//! A `GameState` is one attempt at one stage. It is rebuilt from scratch on
//! every (re)start, so nothing here survives a restart.

use std::fmt;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::Balloon;
use super::entity::{Bird, GroundEnemy, Obstacle, Pickup, ReverseBird, ThunderCloud};
use super::epilogue::{Epilogue, EpiloguePhase};
use super::particles::ParticleSystem;
use super::spawner::Spawner;
use super::stage_objects::{Building, Companion, Shooter};
use crate::Field;
use crate::audio::{SoundEffect, SoundOptions};
use crate::consts::{GRACE_TICKS, LAST_STAGE, TICKS_PER_SECOND};
use crate::tuning::{Goal, StageConfig};
use glam::Vec2;

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Playing,
    /// Run ended; see `GameState::outcome`
    GameOver,
}

/// Why a run ended in failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureCause {
    Fallen,
    OutOfFuel,
    /// Red bird flying left to right
    DangerousBird,
    Bird,
    Mountain,
    Lightning,
    Building,
    ShotDown,
    GroundEnemy,
}

impl FailureCause {
    pub fn message(&self) -> &'static str {
        match self {
            FailureCause::Fallen => "Your balloon has fallen!",
            FailureCause::OutOfFuel => "Out of fuel, you crashed! 💥",
            FailureCause::DangerousBird => "Hit by a dangerous bird! 🦅💥",
            FailureCause::Bird => "Hit by a bird! 🐦💥",
            FailureCause::Mountain => "Crashed into a mountain! ⛰️",
            FailureCause::Lightning => "Struck by lightning! ⚡💥",
            FailureCause::Building => "Hit a building! 🏢",
            FailureCause::ShotDown => "Shot down! 🔫",
            FailureCause::GroundEnemy => "Caught by ground enemy! 🦹‍♂️",
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// End-of-run numbers shown on the game over screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub stage: u8,
    /// Altitude for the climbing stages, distance otherwise (whole meters)
    pub progress_meters: u32,
    pub score: u64,
    pub stars: u32,
    pub fuel_percent: u32,
    pub elapsed_ticks: u64,
    pub spectators_killed: u32,
    /// Shown for information only; shooters come from the kill counter
    pub shooter_spawn_chance: f32,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub victory: bool,
    /// Set for failures
    pub cause: Option<FailureCause>,
    pub message: String,
    /// The stage goal was met (the scripted ending is a victory but not a completion)
    pub completion: bool,
    pub next_stage: Option<u8>,
    pub stats: RunStats,
}

/// State-change notifications for presenters and collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    StageStarted { stage: u8 },
    /// Rounded fuel percentage changed
    FuelChanged { percent: u32 },
    Sound { effect: SoundEffect, options: SoundOptions },
    /// Looping track to play (emitted by the controller)
    Music { track: u8 },
    StarCollected { total: u32, score: u64 },
    SpectatorKilled { total: u32 },
    RiderBlownAway,
    EpiloguePhase(EpiloguePhase),
    /// Newly unlocked stage (emitted by the controller)
    StageUnlocked { stage: u8 },
    GameOver(Outcome),
}

/// Complete state of one stage attempt
#[derive(Debug, Clone)]
pub struct GameState {
    pub seed: u64,
    pub field: Field,
    pub config: StageConfig,
    pub phase: GamePhase,
    pub balloon: Balloon,

    pub obstacles: Vec<Obstacle>,
    pub birds: Vec<Bird>,
    pub reverse_birds: Vec<ReverseBird>,
    pub thunder_clouds: Vec<ThunderCloud>,
    pub ground_enemies: Vec<GroundEnemy>,
    pub pickups: Vec<Pickup>,
    pub buildings: Vec<Building>,
    pub shooters: Vec<Shooter>,
    pub companion: Option<Companion>,
    pub epilogue: Option<Epilogue>,
    pub particles: ParticleSystem,
    pub spawner: Spawner,

    /// Accumulated altitude metric (climbing goal)
    pub altitude: f32,
    /// Accumulated horizontal distance metric
    pub distance: f32,
    pub score: u64,
    pub stars_collected: u32,
    pub spectators_killed: u32,
    /// 0 - 100, render hint for the stained envelope
    pub blood_level: f32,
    pub rescued: bool,
    /// Ticks left in which the bottom-bound checks are skipped
    pub grace_ticks: u32,
    pub time_ticks: u64,
    pub background_offset: f32,
    pub outcome: Option<Outcome>,
    /// Pending notifications, drained by the controller after each tick
    pub events: Vec<GameEvent>,

    pub(crate) rng: Pcg32,
    last_fuel_percent: u32,
}

impl GameState {
    /// Fresh attempt at `config.stage`
    pub fn new(config: StageConfig, field: Field, seed: u64) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let start = if config.is_epilogue() {
            Vec2::new(field.width / 2.0 - crate::consts::BALLOON_WIDTH / 2.0, field.height / 2.0)
        } else {
            Balloon::spawn_point(field)
        };
        let balloon = Balloon::new(start, &mut rng);
        let companion = matches!(config.goal, Goal::Rescue { .. }).then(|| Companion::new(field, &mut rng));
        let epilogue = config.is_epilogue().then(|| Epilogue::new(field, &mut rng));
        let last_fuel_percent = balloon.fuel_percent();
        let stage = config.stage;

        Self {
            seed,
            field,
            config,
            phase: GamePhase::Playing,
            balloon,
            obstacles: Vec::new(),
            birds: Vec::new(),
            reverse_birds: Vec::new(),
            thunder_clouds: Vec::new(),
            ground_enemies: Vec::new(),
            pickups: Vec::new(),
            buildings: Vec::new(),
            shooters: Vec::new(),
            companion,
            epilogue,
            particles: ParticleSystem::default(),
            spawner: Spawner::default(),
            altitude: 0.0,
            distance: 0.0,
            score: 0,
            stars_collected: 0,
            spectators_killed: 0,
            blood_level: 0.0,
            rescued: false,
            grace_ticks: GRACE_TICKS,
            time_ticks: 0,
            background_offset: 0.0,
            outcome: None,
            events: vec![GameEvent::StageStarted { stage }],
            rng,
            last_fuel_percent,
        }
    }

    pub fn stage(&self) -> u8 {
        self.config.stage
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn in_grace(&self) -> bool {
        self.grace_ticks > 0
    }

    /// Distance left to the stage target, for distance goals
    pub fn distance_remaining(&self) -> f32 {
        self.config
            .goal
            .target()
            .map_or(0.0, |target| (target - self.distance).max(0.0))
    }

    /// Shooter spawn chance shown to the player (never drives spawning)
    pub fn shooter_spawn_chance(&self) -> f32 {
        0.0
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn sound(&mut self, effect: SoundEffect, options: SoundOptions) {
        self.events.push(GameEvent::Sound { effect, options });
    }

    /// Emit `FuelChanged` if the rounded percentage moved
    pub(crate) fn sync_fuel(&mut self) {
        let percent = self.balloon.fuel_percent();
        if percent != self.last_fuel_percent {
            self.last_fuel_percent = percent;
            self.events.push(GameEvent::FuelChanged { percent });
        }
    }

    fn stats(&self) -> RunStats {
        let progress = if self.config.goal.tracks_distance() {
            self.distance
        } else {
            self.altitude
        };
        RunStats {
            stage: self.stage(),
            progress_meters: progress.max(0.0).floor() as u32,
            score: self.score,
            stars: self.stars_collected,
            fuel_percent: self.balloon.fuel_percent(),
            elapsed_ticks: self.time_ticks,
            spectators_killed: self.spectators_killed,
            shooter_spawn_chance: self.shooter_spawn_chance(),
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        if self.is_over() {
            return;
        }
        log::info!(
            "stage {} over: victory={} {}",
            self.stage(),
            outcome.victory,
            outcome.message.lines().next().unwrap_or_default()
        );
        self.phase = GamePhase::GameOver;
        self.events.push(GameEvent::GameOver(outcome.clone()));
        self.outcome = Some(outcome);
    }

    /// End the run in failure. Later calls in the same tick are ignored.
    pub(crate) fn fail(&mut self, cause: FailureCause) {
        let outcome = Outcome {
            victory: false,
            cause: Some(cause),
            message: cause.message().to_string(),
            completion: false,
            next_stage: None,
            stats: self.stats(),
        };
        self.finish(outcome);
    }

    /// Stage goal met
    pub(crate) fn complete(&mut self) {
        let stage = self.stage();
        let next_stage = (stage < LAST_STAGE).then_some(stage + 1);
        let outcome = Outcome {
            victory: true,
            cause: None,
            message: self.completion_message(),
            completion: true,
            next_stage,
            stats: self.stats(),
        };
        self.sound(SoundEffect::Victory, SoundOptions::volume(0.85));
        self.finish(outcome);
    }

    /// Scripted ending finished
    pub(crate) fn end_epilogue(&mut self, message: &str) {
        let outcome = Outcome {
            victory: true,
            cause: None,
            message: message.to_string(),
            completion: false,
            next_stage: None,
            stats: self.stats(),
        };
        self.finish(outcome);
    }

    fn completion_message(&self) -> String {
        let stage = self.stage();
        let time = format_elapsed(self.time_ticks);
        if matches!(self.config.goal, Goal::Rescue { .. }) && self.rescued {
            return format!(
                "💖 Kami rescued his love!\n\n⏱️ Time: {time}\n🪄 Distance traveled: {} meters\n⭐ Total score: {}",
                self.distance.floor() as u32,
                self.score
            );
        }
        let mut message = format!("🎉 Congratulations! You completed Stage {stage}!\n\n⏱️ Time: {time}");
        if stage == 3 {
            message.push_str(&format!("\n💀 Spectators killed: {}", self.spectators_killed));
            message.push_str(&format!(
                "\n🎯 Shooter spawn rate: {}%",
                (self.shooter_spawn_chance() * 100.0).floor() as u32
            ));
        }
        message
    }
}

/// Ticks as `m:ss` at the nominal tick rate
pub fn format_elapsed(ticks: u64) -> String {
    let seconds = ticks / u64::from(TICKS_PER_SECOND);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
