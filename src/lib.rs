//! Sky Balloon - A side-scrolling hot-air balloon flight game
//!
//! Core modules:
//! - `sim`: Fixed-tick simulation (flight model, entities, collisions, stage rules)
//! - `controller`: Stage lifecycle state machine and collaborator fan-out
//! - `tuning`: Data-driven per-stage rule tables
//! - `audio`: Sound collaborator port
//! - `persistence`: Key-value storage port
//! - `progress`: Unlocked stage record
//! - `settings`: Player preferences
//! - `platform`: Frame scheduler port

pub mod audio;
pub mod controller;
pub mod persistence;
pub mod platform;
pub mod progress;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use controller::{ControllerPhase, StageController};
pub use progress::UnlockedStages;
pub use settings::{QualityPreset, Settings};

/// Game configuration constants
///
/// All rates are per tick; one tick runs per rendered frame at a nominal 60 Hz.
pub mod consts {
    /// Nominal ticks per second (used only for display/elapsed-time math)
    pub const TICKS_PER_SECOND: u32 = 60;

    /// Default play-field dimensions (the canvas is square, at most 640px)
    pub const FIELD_WIDTH: f32 = 640.0;
    pub const FIELD_HEIGHT: f32 = 640.0;

    /// Balloon box
    pub const BALLOON_WIDTH: f32 = 60.0;
    pub const BALLOON_HEIGHT: f32 = 80.0;
    /// Offset from the balloon's top-left to the point used for radius checks
    pub const BALLOON_HIT_OFFSET: f32 = 30.0;

    /// Flight model
    pub const GRAVITY: f32 = 0.15;
    pub const LIFT: f32 = -0.6;
    pub const FUEL_CONSUMPTION: f32 = 0.3;
    pub const MAX_FUEL: f32 = 100.0;
    pub const MAX_VX: f32 = 4.0;
    pub const MAX_VY: f32 = 5.0;
    pub const HORIZONTAL_DRAG: f32 = 0.92;
    /// Velocity nudge per move intent
    pub const MOVE_IMPULSE: f32 = 0.5;

    /// Bounds: x is clamped to [SIDE_MARGIN, width - SIDE_MARGIN], y to >= TOP_LIMIT
    pub const SIDE_MARGIN: f32 = 30.0;
    pub const TOP_LIMIT: f32 = 50.0;
    /// Falling past `height - FALL_MARGIN` ends the run
    pub const FALL_MARGIN: f32 = 30.0;
    /// Stage 1 "out of fuel" crash line is `height - FUEL_CRASH_MARGIN`
    pub const FUEL_CRASH_MARGIN: f32 = 50.0;

    /// Ticks after a stage (re)start during which the bottom-bound checks are skipped
    pub const GRACE_TICKS: u32 = 150;

    /// Ticks a left/right pose is held after a move intent
    pub const POSE_HOLD_TICKS: u32 = 8;

    /// Rider and projectile radii (against the balloon hit point)
    pub const RIDER_KILL_RADIUS: f32 = 45.0;
    pub const RIDER_BLOW_RADIUS: f32 = 80.0;
    pub const BULLET_HIT_RADIUS: f32 = 35.0;

    /// Fuel lost per projectile hit
    pub const BULLET_FUEL_DAMAGE: f32 = 15.0;
    /// Fuel restored by a fuel can
    pub const FUEL_CAN_AMOUNT: f32 = 30.0;
    /// Score per star
    pub const STAR_SCORE: u64 = 100;
    /// Pending shooters queued per killed rider
    pub const SHOOTERS_PER_KILL: u32 = 5;

    /// Stage 4: remaining distance (meters) at which the rescue becomes possible
    pub const FINAL_STRETCH_METERS: f32 = 20.0;

    /// Highest stage number
    pub const LAST_STAGE: u8 = 5;
}

/// Axis-aligned play-field extent
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Field {
    pub width: f32,
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: consts::FIELD_WIDTH,
            height: consts::FIELD_HEIGHT,
        }
    }
}

impl Field {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}
