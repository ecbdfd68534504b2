//! Data-driven stage rules
//!
//! Each stage has a goal, a spawn check interval and an independent spawn
//! chance per entity kind. Everything here is plain data so the tables can be
//! dumped or tweaked without touching the simulation.

use serde::{Deserialize, Serialize};

use crate::consts::LAST_STAGE;

/// Entity kinds the spawner can create from a probability roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnKind {
    Cloud,
    ThickCloud,
    TallMountain,
    Bird,
    ReverseBird,
    ThunderCloud,
    GroundEnemy,
    Building,
    Star,
    FuelCan,
}

/// One independent Bernoulli roll per spawn check
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRule {
    pub kind: SpawnKind,
    /// Probability in [0, 1]
    pub chance: f32,
}

const fn rule(kind: SpawnKind, chance: f32) -> SpawnRule {
    SpawnRule { kind, chance }
}

/// What a stage asks of the player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    /// Reach an accumulated altitude. Each tick adds `(height - y) / climb_divisor`.
    Altitude { target: f32, climb_divisor: f32 },
    /// Travel a distance; the world scrolls `per_tick` meters every tick.
    Distance { target: f32, per_tick: f32 },
    /// Travel toward the companion and touch it once the final stretch is reached.
    Rescue { target: f32, per_tick: f32 },
    /// Scripted ending, no numeric goal
    Epilogue,
}

impl Goal {
    /// Numeric target, if the goal has one
    pub fn target(&self) -> Option<f32> {
        match *self {
            Goal::Altitude { target, .. }
            | Goal::Distance { target, .. }
            | Goal::Rescue { target, .. } => Some(target),
            Goal::Epilogue => None,
        }
    }

    /// True when progress is reported as horizontal distance rather than altitude
    pub fn tracks_distance(&self) -> bool {
        !matches!(self, Goal::Altitude { .. })
    }
}

/// Background theme id (render collaborator concern only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Theme {
    DaySky,
    NightCity,
    Sunset,
    Twilight,
}

/// Rules for a single stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub stage: u8,
    pub goal: Goal,
    /// The spawn check runs once the spawn timer exceeds this many ticks
    pub spawn_interval: u32,
    pub spawns: Vec<SpawnRule>,
    pub theme: Theme,
    /// Background music track to loop
    pub music_track: u8,
    /// Whether touching a cloud slows vertical velocity
    pub clouds_drag: bool,
    /// Player input is ignored for the whole stage
    pub input_locked: bool,
    /// Background scroll per tick (render hint)
    pub scroll_speed: f32,
}

impl StageConfig {
    /// Rule table for `stage` (1-based); `None` outside 1..=5
    pub fn for_stage(stage: u8) -> Option<Self> {
        use SpawnKind::*;

        let config = match stage {
            1 => Self {
                stage,
                goal: Goal::Altitude {
                    target: 500.0,
                    climb_divisor: 3000.0,
                },
                spawn_interval: 50,
                spawns: vec![
                    rule(Cloud, 0.5),
                    rule(FuelCan, 0.35),
                    rule(ReverseBird, 0.08),
                ],
                theme: Theme::DaySky,
                music_track: 1,
                clouds_drag: false,
                input_locked: false,
                scroll_speed: 0.5,
            },
            2 => Self {
                stage,
                goal: Goal::Altitude {
                    target: 1500.0,
                    climb_divisor: 1000.0,
                },
                spawn_interval: 45,
                spawns: vec![
                    rule(ThickCloud, 0.3),
                    rule(TallMountain, 0.25),
                    rule(Bird, 0.15),
                    rule(ThunderCloud, 0.12),
                    rule(ReverseBird, 0.1),
                    rule(Star, 0.2),
                    rule(FuelCan, 0.2),
                ],
                theme: Theme::DaySky,
                music_track: 2,
                clouds_drag: true,
                input_locked: false,
                scroll_speed: 0.5,
            },
            3 => Self {
                stage,
                goal: Goal::Distance {
                    target: 3000.0,
                    per_tick: 0.95,
                },
                spawn_interval: 35,
                // Shooters come from the pending-kill counter, not from this table
                spawns: vec![
                    rule(Building, 0.6),
                    rule(ReverseBird, 0.1),
                    rule(FuelCan, 0.15),
                ],
                theme: Theme::NightCity,
                music_track: 3,
                clouds_drag: true,
                input_locked: false,
                scroll_speed: 2.0,
            },
            4 => Self {
                stage,
                goal: Goal::Rescue {
                    target: 5000.0,
                    per_tick: 2.0,
                },
                spawn_interval: 50,
                spawns: vec![
                    rule(Cloud, 0.3),
                    rule(ThickCloud, 0.15),
                    rule(TallMountain, 0.12),
                    rule(ThunderCloud, 0.12),
                    rule(ReverseBird, 0.08),
                    rule(Bird, 0.1),
                    rule(GroundEnemy, 0.08),
                    rule(Star, 0.18),
                    rule(FuelCan, 0.36),
                ],
                theme: Theme::Sunset,
                music_track: 4,
                clouds_drag: true,
                input_locked: false,
                scroll_speed: 2.0,
            },
            5 => Self {
                stage,
                goal: Goal::Epilogue,
                spawn_interval: 0,
                spawns: Vec::new(),
                theme: Theme::Twilight,
                // The ending reuses the opening theme
                music_track: 1,
                clouds_drag: false,
                input_locked: true,
                scroll_speed: 0.22,
            },
            _ => return None,
        };
        Some(config)
    }

    /// Rule tables for every stage, in order
    pub fn all() -> Vec<Self> {
        (1..=LAST_STAGE).filter_map(Self::for_stage).collect()
    }

    /// Spawn chance for `kind`, or 0 if the stage never rolls for it
    pub fn chance_of(&self, kind: SpawnKind) -> f32 {
        self.spawns
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.chance)
            .unwrap_or(0.0)
    }

    /// Whether this stage runs the scripted ending instead of hazards
    pub fn is_epilogue(&self) -> bool {
        matches!(self.goal, Goal::Epilogue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_stage_has_config() {
        let all = StageConfig::all();
        assert_eq!(all.len(), 5);
        for (i, cfg) in all.iter().enumerate() {
            assert_eq!(cfg.stage as usize, i + 1);
        }
        assert!(StageConfig::for_stage(0).is_none());
        assert!(StageConfig::for_stage(6).is_none());
    }

    #[test]
    fn test_stage_one_table() {
        let cfg = StageConfig::for_stage(1).unwrap();
        assert_eq!(cfg.spawn_interval, 50);
        assert_eq!(cfg.chance_of(SpawnKind::Cloud), 0.5);
        assert_eq!(cfg.chance_of(SpawnKind::FuelCan), 0.35);
        assert_eq!(cfg.chance_of(SpawnKind::ReverseBird), 0.08);
        assert_eq!(cfg.chance_of(SpawnKind::Building), 0.0);
        assert_eq!(cfg.goal.target(), Some(500.0));
        assert!(!cfg.goal.tracks_distance());
    }

    #[test]
    fn test_chances_are_probabilities() {
        for cfg in StageConfig::all() {
            for r in &cfg.spawns {
                assert!((0.0..=1.0).contains(&r.chance), "{:?}", r);
            }
        }
    }

    #[test]
    fn test_epilogue_stage() {
        let cfg = StageConfig::for_stage(5).unwrap();
        assert!(cfg.is_epilogue());
        assert!(cfg.input_locked);
        assert!(cfg.spawns.is_empty());
        assert_eq!(cfg.goal.target(), None);
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = StageConfig::for_stage(4).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: StageConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
