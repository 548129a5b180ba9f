use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::milestone::DEFAULT_DAILY_GOAL;

pub const SETTINGS_FILE: &str = "settings.json";

/// Optional `settings.json` in the data directory. Every field has a default,
/// so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub refresh_interval_secs: u64,
    pub milestone_interval_secs: u64,
    pub daily_goal: usize,
    pub sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            milestone_interval_secs: 60,
            daily_goal: DEFAULT_DAILY_GOAL,
            sound: true,
        }
    }
}

impl Settings {
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(SETTINGS_FILE);
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Settings>(&raw).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    // Zero intervals would spin the timer threads
    fn sanitized(mut self) -> Self {
        self.refresh_interval_secs = self.refresh_interval_secs.max(1);
        self.milestone_interval_secs = self.milestone_interval_secs.max(1);
        self.daily_goal = self.daily_goal.max(1);
        self
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn milestone_interval(&self) -> Duration {
        Duration::from_secs(self.milestone_interval_secs)
    }
}
