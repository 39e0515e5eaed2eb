//! Points service: turns a finished run's counters into awarded points.
//!
//! This is a pure function boundary. Games hand it a plain summary and get
//! back a total, a breakdown, and any badges earned by that run; nothing here
//! knows about level curves or cross-run progression.

use serde::{Deserialize, Serialize};

/// Unique identifier for a game type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Points awarded per unit of max combo.
pub const COMBO_POINTS: u64 = 10;
/// Points awarded per perfect landing.
pub const PERFECT_POINTS: u64 = 25;
/// Allowed range for the difficulty multiplier.
const MULTIPLIER_RANGE: (f32, f32) = (0.5, 3.0);

/// Counters a game reports at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointsInput {
    pub base_score: u64,
    pub combo: u32,
    pub perfect_hits: u32,
    pub time_bonus: u64,
    pub difficulty_multiplier: f32,
}

/// Per-category contribution before the multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsBreakdown {
    pub base: u64,
    pub combo: u64,
    pub perfect: u64,
    pub time: u64,
    pub subtotal: u64,
}

/// Achievements a single run can unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    FirstSteps,
    Mountaineer,
    ComboStarter,
    ComboMaster,
    Sharpshooter,
    Speedrunner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsResult {
    pub total: u64,
    pub breakdown: PointsBreakdown,
    pub multiplier: f32,
    pub badges: Vec<Badge>,
}

/// Signature of a points service, so games can take it as a plain function.
pub type PointsService = fn(&PointsInput, &GameId) -> PointsResult;

/// Compute awarded points for a finished run.
pub fn calculate_game_points(input: &PointsInput, game_id: &GameId) -> PointsResult {
    let combo = u64::from(input.combo) * COMBO_POINTS;
    let perfect = u64::from(input.perfect_hits) * PERFECT_POINTS;
    let subtotal = input
        .base_score
        .saturating_add(combo)
        .saturating_add(perfect)
        .saturating_add(input.time_bonus);

    let multiplier = if input.difficulty_multiplier.is_finite() {
        input
            .difficulty_multiplier
            .clamp(MULTIPLIER_RANGE.0, MULTIPLIER_RANGE.1)
    } else {
        1.0
    };
    let total = (subtotal as f64 * f64::from(multiplier)).round() as u64;

    let badges = earned_badges(input);
    tracing::debug!(
        game = %game_id,
        subtotal,
        total,
        badges = badges.len(),
        "Calculated game points"
    );

    PointsResult {
        total,
        breakdown: PointsBreakdown {
            base: input.base_score,
            combo,
            perfect,
            time: input.time_bonus,
            subtotal,
        },
        multiplier,
        badges,
    }
}

fn earned_badges(input: &PointsInput) -> Vec<Badge> {
    let rules: [(Badge, bool); 6] = [
        (Badge::FirstSteps, input.base_score >= 1),
        (Badge::Mountaineer, input.base_score >= 1000),
        (Badge::ComboStarter, input.combo >= 10),
        (Badge::ComboMaster, input.combo >= 25),
        (Badge::Sharpshooter, input.perfect_hits >= 10),
        (Badge::Speedrunner, input.time_bonus >= 100),
    ];
    rules
        .into_iter()
        .filter_map(|(badge, earned)| earned.then_some(badge))
        .collect()
}
