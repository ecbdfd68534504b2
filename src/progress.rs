//! Unlocked stage record
//!
//! Persisted as a JSON array of stage numbers under a single key.

use serde::{Deserialize, Serialize};

use crate::consts::LAST_STAGE;
use crate::persistence::{KeyValueStore, StoreError};

/// Set of stages the player may start; always contains stage 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<u8>", into = "Vec<u8>")]
pub struct UnlockedStages {
    stages: Vec<u8>,
}

impl Default for UnlockedStages {
    fn default() -> Self {
        Self { stages: vec![1] }
    }
}

impl From<Vec<u8>> for UnlockedStages {
    /// Keeps valid stage numbers in first-seen order and adds stage 1 if missing
    fn from(raw: Vec<u8>) -> Self {
        let mut unlocked = Self::default();
        for stage in raw {
            unlocked.unlock(stage);
        }
        unlocked
    }
}

impl From<UnlockedStages> for Vec<u8> {
    fn from(unlocked: UnlockedStages) -> Self {
        unlocked.stages
    }
}

impl UnlockedStages {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "unlockedLevels";

    /// Load from `store`. Absent, unreadable or malformed data yields `[1]`.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let json = match store.get(Self::STORAGE_KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return Self::default(),
            Err(e) => {
                log::warn!("could not read unlocked stages: {e}");
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&json) {
            Ok(unlocked) => {
                log::info!("loaded unlocked stages {:?}", unlocked.stages);
                unlocked
            }
            Err(e) => {
                log::warn!("unlocked stages record is corrupt ({e}), resetting to [1]");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let json = serde_json::to_string(self)?;
        store.set(Self::STORAGE_KEY, &json)
    }

    /// Add `stage`. Returns true if it was newly unlocked.
    pub fn unlock(&mut self, stage: u8) -> bool {
        if !(1..=LAST_STAGE).contains(&stage) || self.contains(stage) {
            return false;
        }
        self.stages.push(stage);
        true
    }

    pub fn contains(&self, stage: u8) -> bool {
        self.stages.contains(&stage)
    }

    pub fn stages(&self) -> &[u8] {
        &self.stages
    }

    /// Highest unlocked stage
    pub fn highest(&self) -> u8 {
        self.stages.iter().copied().max().unwrap_or(1)
    }
}
