//! Timed spawn checks driven by the stage rule table

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::SHOOTERS_PER_KILL;
use crate::tuning::{SpawnKind, StageConfig};

/// Something the spawner asks the world to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spawn {
    Kind(SpawnKind),
    /// Drained from the pending-shooter counter, not rolled
    Shooter,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spawner {
    pub timer: u32,
    pub pending_shooters: u32,
}

impl Spawner {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Queue shooters for `kills` rooftop kills
    pub fn on_kills(&mut self, kills: u32) {
        self.pending_shooters += kills * SHOOTERS_PER_KILL;
    }

    /// Advance the timer; once it exceeds the stage interval, roll every rule
    /// independently and drain one pending shooter.
    pub fn step(&mut self, config: &StageConfig, rng: &mut Pcg32) -> Vec<Spawn> {
        if config.is_epilogue() {
            return Vec::new();
        }
        self.timer += 1;
        if self.timer <= config.spawn_interval {
            return Vec::new();
        }
        self.timer = 0;

        let mut spawns: Vec<Spawn> = config
            .spawns
            .iter()
            .filter(|rule| rng.random::<f32>() < rule.chance)
            .map(|rule| Spawn::Kind(rule.kind))
            .collect();

        if self.pending_shooters > 0 {
            self.pending_shooters -= 1;
            spawns.push(Spawn::Shooter);
        }
        spawns
    }
}
