use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;

/// Streak state for one run.
///
/// The run begins standing on platform 0, which counts as already visited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComboState {
    pub combo: u32,
    pub max_combo: u32,
    pub perfect_landings: u32,
    pub last_landed_platform_id: u64,
    /// Highest platform id landed on this run.
    pub highest_platform_id: u64,
    /// Highest platform surface landed on this run.
    pub peak_landed_y: f32,
}

/// What a single landing did to the streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LandingOutcome {
    pub new_platform: bool,
    pub perfect: bool,
    /// Combo that was cleared by this landing, if any.
    pub reset_from: Option<u32>,
}

impl ComboState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_landing(
        &mut self,
        platform_id: u64,
        platform_y: f32,
        center_offset: f32,
        config: &ScoringConfig,
    ) -> LandingOutcome {
        let mut outcome = LandingOutcome {
            perfect: center_offset.abs() <= config.perfect_tolerance,
            ..Default::default()
        };
        if outcome.perfect {
            self.perfect_landings += 1;
        }

        if platform_id > self.highest_platform_id {
            outcome.new_platform = true;
            self.combo += 1;
            self.max_combo = self.max_combo.max(self.combo);
            self.highest_platform_id = platform_id;
            self.peak_landed_y = self.peak_landed_y.max(platform_y);
        } else if self.combo > 0 && self.peak_landed_y - platform_y > config.combo_reset_margin {
            outcome.reset_from = Some(self.combo);
            self.combo = 0;
        }

        self.last_landed_platform_id = platform_id;
        outcome
    }
}
