//! Collision tests and contact classification
//!
//! Two tests cover everything in the game: axis-aligned box overlap for the
//! balloon against entities and lightning segments, and a center-distance
//! check for the small sub-shapes (rooftop riders and projectiles).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::FailureCause;
use crate::consts::{BULLET_HIT_RADIUS, RIDER_BLOW_RADIUS, RIDER_KILL_RADIUS};

/// Axis-aligned bounding box (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict overlap; boxes that only share an edge do not touch
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        overlaps(self, other)
    }
}

/// Box overlap test: `a.x < b.x + b.w && a.x + a.w > b.x` and the same on y
#[inline]
pub fn overlaps(a: &Rect, b: &Rect) -> bool {
    a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
}

/// True if `body` overlaps any of `segments`
pub fn overlaps_any(body: &Rect, segments: &[Rect]) -> bool {
    segments.iter().any(|s| overlaps(body, s))
}

/// Strict distance test between two points
#[inline]
pub fn within_radius(a: Vec2, b: Vec2, radius: f32) -> bool {
    a.distance(b) < radius
}

/// What a pass by a rooftop rider does to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderContact {
    None,
    Killed,
    BlownAway,
}

/// Classify a rider against the balloon hit point
///
/// A direct hit kills; a near pass blows the rider off the roof, but only
/// riders flagged as displaceable can be blown away.
pub fn rider_contact(hit_point: Vec2, rider: Vec2, can_blow_away: bool) -> RiderContact {
    let distance = hit_point.distance(rider);
    if distance < RIDER_KILL_RADIUS {
        RiderContact::Killed
    } else if distance < RIDER_BLOW_RADIUS && can_blow_away {
        RiderContact::BlownAway
    } else {
        RiderContact::None
    }
}

/// Whether a projectile at `bullet` hits the balloon hit point
#[inline]
pub fn bullet_hits(hit_point: Vec2, bullet: Vec2) -> bool {
    within_radius(hit_point, bullet, BULLET_HIT_RADIUS)
}

/// Resolution of a balloon/entity overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    /// Soft obstacle: vertical velocity is damped
    Drag,
    /// The run ends
    Lethal(FailureCause),
    /// Harmless in this stage
    Pass,
}

/// Vertical velocity factor applied while inside a soft obstacle
pub const CLOUD_DRAG: f32 = 0.9;
