use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{Difficulty, LevelConfig};

/// Platform behavior on contact.
///
/// `Slippery` lowers ground friction. `Moving` is declared for level variety
/// and currently behaves like `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformKind {
    Normal,
    Bounce,
    Slippery,
    Moving,
}

impl PlatformKind {
    /// Index into the platform palette.
    pub fn palette_index(self) -> usize {
        match self {
            PlatformKind::Normal => 0,
            PlatformKind::Bounce => 1,
            PlatformKind::Slippery => 2,
            PlatformKind::Moving => 3,
        }
    }
}

/// A horizontal platform. `x` is the left edge, `y` the walkable top surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub kind: PlatformKind,
    /// Full-width floor placed at the checkpoint interval.
    pub checkpoint: bool,
}

impl Platform {
    pub fn new(id: u64, x: f32, y: f32, width: f32, kind: PlatformKind) -> Self {
        Self {
            id,
            x,
            y,
            width,
            kind,
            checkpoint: false,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Lazily extends an upward sequence of platforms from a seed.
///
/// Platform 0 is a full-width floor at `y = 0`. Every later platform sits a
/// random gap above its predecessor, so ids and heights increase together.
pub struct LevelGenerator {
    rng: StdRng,
    config: LevelConfig,
    canvas_width: f32,
    narrowing: f32,
    platforms: Vec<Platform>,
    next_id: u64,
    top_y: f32,
}

impl LevelGenerator {
    pub fn new(seed: u64, canvas_width: f32, config: &LevelConfig, difficulty: Difficulty) -> Self {
        let mut floor = Platform::new(0, 0.0, 0.0, canvas_width, PlatformKind::Normal);
        floor.checkpoint = true;
        Self {
            rng: StdRng::seed_from_u64(seed),
            config: config.clone(),
            canvas_width,
            narrowing: config.narrowing_per_platform * difficulty.narrowing_scale(),
            platforms: vec![floor],
            next_id: 1,
            top_y: 0.0,
        }
    }

    /// Append platforms until the topmost one is above `target_top_y`.
    /// Returns how many were added; a no-op when already extended.
    pub fn extend_to(&mut self, target_top_y: f32) -> usize {
        let mut added = 0;
        while self.top_y <= target_top_y {
            let platform = self.generate_next();
            self.top_y = platform.y;
            self.platforms.push(platform);
            added += 1;
        }
        if added > 0 {
            tracing::debug!(added, top_y = self.top_y, "Extended level");
        }
        added
    }

    /// Drop platforms whose surface is below `y`. Returns how many were removed.
    pub fn prune_below(&mut self, y: f32) -> usize {
        let before = self.platforms.len();
        self.platforms.retain(|p| p.y >= y);
        before - self.platforms.len()
    }

    /// Live platforms in increasing id (and height) order.
    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn get(&self, id: u64) -> Option<&Platform> {
        self.platforms
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.platforms[i])
    }

    /// Height of the highest platform generated so far, pruned or not.
    pub fn top_y(&self) -> f32 {
        self.top_y
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    fn generate_next(&mut self) -> Platform {
        let id = self.next_id;
        self.next_id += 1;

        let gap = uniform(&mut self.rng, self.config.min_gap, self.config.max_gap);
        let y = self.top_y + gap;

        if id % u64::from(self.config.checkpoint_interval.max(1)) == 0 {
            let mut floor = Platform::new(id, 0.0, y, self.canvas_width, PlatformKind::Normal);
            floor.checkpoint = true;
            return floor;
        }

        let drawn = uniform(&mut self.rng, self.config.min_width, self.config.max_width);
        let width = (drawn - self.narrowing * id as f32)
            .max(self.config.min_playable_width)
            .min(self.canvas_width);
        let x = uniform(&mut self.rng, 0.0, self.canvas_width - width);

        let total = self.config.weights.total();
        let kind = if total == 0 {
            PlatformKind::Normal
        } else {
            self.config.weights.pick(self.rng.random_range(0..total))
        };

        Platform::new(id, x, y, width, kind)
    }
}

/// Uniform draw in `[lo, hi]` that tolerates a degenerate range.
fn uniform(rng: &mut StdRng, lo: f32, hi: f32) -> f32 {
    if hi > lo {
        rng.random_range(lo..=hi)
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClimbConfig;

    fn generator(seed: u64) -> LevelGenerator {
        let cfg = ClimbConfig::default();
        LevelGenerator::new(seed, cfg.canvas.width, &cfg.level, Difficulty::Normal)
    }

    #[test]
    fn starts_with_full_width_floor() {
        let level = generator(1);
        let floor = &level.platforms()[0];
        assert_eq!(floor.id, 0);
        assert_eq!(floor.y, 0.0);
        assert_eq!(floor.x, 0.0);
        assert_eq!(floor.width, 400.0);
        assert!(floor.checkpoint);
    }

    #[test]
    fn deterministic_generation() {
        let mut a = generator(42);
        let mut b = generator(42);
        a.extend_to(5000.0);
        b.extend_to(5000.0);
        assert_eq!(a.platforms(), b.platforms(), "Same seed must produce same level");
    }

    #[test]
    fn different_seeds_different_levels() {
        let mut a = generator(42);
        let mut b = generator(123);
        a.extend_to(2000.0);
        b.extend_to(2000.0);
        assert_ne!(a.platforms(), b.platforms());
    }

    #[test]
    fn extends_past_target() {
        let mut level = generator(7);
        let added = level.extend_to(1000.0);
        assert!(added > 0);
        assert!(level.top_y() > 1000.0);
        let top = level.platforms().last().unwrap();
        assert_eq!(top.y, level.top_y());
    }

    #[test]
    fn gaps_within_bounds() {
        let cfg = ClimbConfig::default();
        let mut level = generator(9);
        level.extend_to(20_000.0);
        for pair in level.platforms().windows(2) {
            let gap = pair[1].y - pair[0].y;
            assert!(
                gap >= cfg.level.min_gap && gap <= cfg.level.max_gap,
                "gap {gap} between {} and {}",
                pair[0].id,
                pair[1].id
            );
            assert_eq!(pair[1].id, pair[0].id + 1);
        }
    }

    #[test]
    fn width_never_below_playable_minimum() {
        let cfg = ClimbConfig::default();
        let mut level =
            LevelGenerator::new(3, cfg.canvas.width, &cfg.level, Difficulty::Hard);
        level.extend_to(200_000.0);
        for p in level.platforms() {
            assert!(p.width >= cfg.level.min_playable_width, "platform {} too narrow", p.id);
            assert!(p.x >= 0.0 && p.right() <= cfg.canvas.width + 1e-3);
        }
    }

    #[test]
    fn prune_removes_only_low_platforms() {
        let mut level = generator(5);
        level.extend_to(1500.0);
        let top = level.top_y();
        let removed = level.prune_below(500.0);
        assert!(removed > 0);
        assert!(level.platforms().iter().all(|p| p.y >= 500.0));
        assert_eq!(level.top_y(), top);
        assert!(level.get(0).is_none());
    }

    #[test]
    fn get_by_id() {
        let mut level = generator(5);
        level.extend_to(800.0);
        let third = level.platforms()[3].clone();
        assert_eq!(level.get(third.id), Some(&third));
        assert!(level.get(10_000).is_none());
    }

    #[test]
    fn every_kind_appears_eventually() {
        let mut level = generator(11);
        level.extend_to(100_000.0);
        for kind in [
            PlatformKind::Normal,
            PlatformKind::Bounce,
            PlatformKind::Slippery,
            PlatformKind::Moving,
        ] {
            assert!(
                level.platforms().iter().any(|p| p.kind == kind),
                "no {kind:?} platform generated"
            );
        }
    }

    #[test]
    fn degenerate_ranges_are_fixed_values() {
        let mut cfg = ClimbConfig::default();
        cfg.level.min_gap = 80.0;
        cfg.level.max_gap = 80.0;
        cfg.level.min_width = 100.0;
        cfg.level.max_width = 100.0;
        cfg.level.narrowing_per_platform = 0.0;
        let mut level = LevelGenerator::new(1, 400.0, &cfg.level, Difficulty::Normal);
        level.extend_to(500.0);
        for p in level.platforms().iter().skip(1) {
            assert_eq!(p.y, 80.0 * p.id as f32);
            assert_eq!(p.width, 100.0);
        }
    }

    // ================================================================
    // Property-based tests
    // ================================================================

    mod proptests {
        use super::*;
        use crate::reach::JumpEnvelope;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn checkpoints_are_full_width(seed in 0u64..500) {
                let cfg = ClimbConfig::default();
                let mut level = generator(seed);
                level.extend_to(12_000.0);
                let interval = u64::from(cfg.level.checkpoint_interval);
                for p in level.platforms().iter().filter(|p| p.id % interval == 0) {
                    prop_assert_eq!(p.x, 0.0);
                    prop_assert_eq!(p.width, cfg.canvas.width);
                    prop_assert!(p.checkpoint);
                }
            }

            #[test]
            fn extension_is_idempotent(seed in 0u64..500, target in 0.0f32..20_000.0) {
                let mut level = generator(seed);
                level.extend_to(target);
                let len = level.platforms().len();
                prop_assert_eq!(level.extend_to(target), 0);
                prop_assert_eq!(level.platforms().len(), len);
            }

            #[test]
            fn consecutive_platforms_are_reachable(seed in 0u64..300) {
                let cfg = ClimbConfig::default();
                let envelope = JumpEnvelope::simulate(&cfg.physics);
                let mut level = LevelGenerator::new(
                    seed,
                    cfg.canvas.width,
                    &cfg.level,
                    Difficulty::Hard,
                );
                level.extend_to(30_000.0);
                for pair in level.platforms().windows(2) {
                    prop_assert!(
                        envelope.can_reach(&pair[0], &pair[1], cfg.canvas.width),
                        "platform {} unreachable from {}",
                        pair[1].id,
                        pair[0].id
                    );
                }
            }
        }
    }
}
