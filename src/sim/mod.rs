//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One tick per frame, no wall-clock reads
//! - Seeded RNG only
//! - Stable iteration order (insertion order per collection)
//! - No rendering, audio or platform dependencies; side effects leave as `GameEvent`s

pub mod body;
pub mod collision;
pub mod entity;
pub mod epilogue;
pub mod particles;
pub mod spawner;
pub mod stage_objects;
pub mod state;
pub mod tick;

pub use body::{Balloon, Pose};
pub use collision::{Contact, Rect};
pub use entity::{Entity, PickupKind};
pub use epilogue::{CREDITS, EpiloguePhase};
pub use state::{FailureCause, GameEvent, GamePhase, GameState, Outcome, RunStats, format_elapsed};
pub use tick::{TickInput, tick};
