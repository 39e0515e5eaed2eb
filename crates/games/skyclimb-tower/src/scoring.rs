use serde::{Deserialize, Serialize};
use skyclimb_core::points::PointsInput;

use crate::combo::ComboState;
use crate::config::{Difficulty, ScoringConfig};

/// Height-derived score, accrued only when the player sets a new peak.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTracker {
    pub peak_height: f32,
    score: f64,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Multiplier applied to new height at the given combo.
    pub fn combo_factor(combo: u32, config: &ScoringConfig) -> f32 {
        (1.0 + config.combo_score_factor * combo as f32).min(config.max_combo_multiplier)
    }

    /// Record the player's height; returns points gained this call.
    pub fn observe_height(&mut self, y: f32, combo: u32, config: &ScoringConfig) -> f64 {
        if y <= self.peak_height {
            return 0.0;
        }
        let climbed = y - self.peak_height;
        self.peak_height = y;
        let gained = f64::from(climbed)
            * f64::from(config.height_points_per_unit)
            * f64::from(Self::combo_factor(combo, config));
        self.score += gained;
        gained
    }

    pub fn base_score(&self) -> u64 {
        self.score.floor() as u64
    }
}

/// Bonus for climbing faster than the target rate; zero when slower.
pub fn time_bonus(peak_height: f32, elapsed_secs: f32, config: &ScoringConfig) -> u64 {
    if config.target_climb_rate <= 0.0 {
        return 0;
    }
    let par_secs = peak_height / config.target_climb_rate;
    let ahead = (par_secs - elapsed_secs).max(0.0);
    (ahead * config.time_bonus_per_second).floor() as u64
}

/// Counters handed to the points service at game over.
pub fn points_input(
    score: &ScoreTracker,
    combo: &ComboState,
    elapsed_secs: f32,
    difficulty: Difficulty,
    config: &ScoringConfig,
) -> PointsInput {
    PointsInput {
        base_score: score.base_score(),
        combo: combo.max_combo,
        perfect_hits: combo.perfect_landings,
        time_bonus: time_bonus(score.peak_height, elapsed_secs, config),
        difficulty_multiplier: difficulty.multiplier(),
    }
}
