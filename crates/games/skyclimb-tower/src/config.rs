use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::level_gen::{Platform, PlatformKind};
use crate::reach::JumpEnvelope;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SKYCLIMB_CONFIG";
/// Config file read when `SKYCLIMB_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/skyclimb.toml";

/// Logical drawing surface size in world units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 600.0,
        }
    }
}

/// Per-tick physics constants. Velocities are units/tick, accelerations
/// units/tick^2, and y grows upward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_impulse: f32,
    /// Extra upward velocity per tick while jump is held inside the hold window.
    pub hold_boost: f32,
    pub hold_window_ticks: u32,
    pub ground_accel: f32,
    pub air_accel: f32,
    pub max_speed: f32,
    /// Combo at or above which speed and jump boosts apply.
    pub combo_boost_threshold: u32,
    pub combo_speed_boost: f32,
    pub combo_jump_boost: f32,
    pub friction: f32,
    pub slippery_friction: f32,
    /// Horizontal speed below which friction snaps velocity to zero.
    pub stop_threshold: f32,
    pub bounce_impulse: f32,
    pub player_width: f32,
    pub player_height: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: 0.5,
            max_fall_speed: 14.0,
            jump_impulse: 9.5,
            hold_boost: 0.35,
            hold_window_ticks: 10,
            ground_accel: 0.8,
            air_accel: 0.45,
            max_speed: 6.0,
            combo_boost_threshold: 5,
            combo_speed_boost: 1.2,
            combo_jump_boost: 1.1,
            friction: 0.8,
            slippery_friction: 0.97,
            stop_threshold: 0.05,
            bounce_impulse: 15.0,
            player_width: 30.0,
            player_height: 40.0,
        }
    }
}

/// Relative draw weights for platform kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KindWeights {
    pub normal: u32,
    pub bounce: u32,
    pub slippery: u32,
    pub moving: u32,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            normal: 80,
            bounce: 10,
            slippery: 7,
            moving: 3,
        }
    }
}

impl KindWeights {
    pub fn total(&self) -> u32 {
        self.normal + self.bounce + self.slippery + self.moving
    }

    /// Kind for a roll in `0..total()`.
    pub fn pick(&self, roll: u32) -> PlatformKind {
        let mut roll = roll;
        for (kind, weight) in [
            (PlatformKind::Normal, self.normal),
            (PlatformKind::Bounce, self.bounce),
            (PlatformKind::Slippery, self.slippery),
            (PlatformKind::Moving, self.moving),
        ] {
            if roll < weight {
                return kind;
            }
            roll -= weight;
        }
        PlatformKind::Normal
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LevelConfig {
    pub min_gap: f32,
    pub max_gap: f32,
    pub min_width: f32,
    pub max_width: f32,
    /// Width lost per platform id (difficulty ramp).
    pub narrowing_per_platform: f32,
    pub min_playable_width: f32,
    pub checkpoint_interval: u32,
    /// Drawn thickness; collision only uses the top surface.
    pub platform_thickness: f32,
    pub weights: KindWeights,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            min_gap: 40.0,
            max_gap: 110.0,
            min_width: 70.0,
            max_width: 120.0,
            narrowing_per_platform: 0.05,
            min_playable_width: 60.0,
            checkpoint_interval: 50,
            platform_thickness: 12.0,
            weights: KindWeights::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Fraction of viewport height above which a rising player scrolls the
    /// camera up. The camera never scrolls down, so the band below it is
    /// bounded only by the fall-off margin.
    pub scroll_band: f32,
    /// Fraction of the remaining distance covered per tick.
    pub easing: f32,
    pub snap_threshold: f32,
    /// How far above the viewport top platforms are generated.
    pub lookahead: f32,
    /// How far below the viewport bottom platforms are kept.
    pub prune_margin: f32,
    /// How far below the viewport bottom the player may drop before the run ends.
    pub fall_margin: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            scroll_band: 2.0 / 3.0,
            easing: 0.12,
            snap_threshold: 0.5,
            lookahead: 300.0,
            prune_margin: 100.0,
            fall_margin: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    /// Max horizontal distance from a platform's center for a perfect landing.
    pub perfect_tolerance: f32,
    /// Drop below the peak landed height that clears the combo.
    pub combo_reset_margin: f32,
    pub height_points_per_unit: f32,
    /// Score multiplier gained per combo step.
    pub combo_score_factor: f32,
    pub max_combo_multiplier: f32,
    /// Climb rate (units/second) that earns no time bonus.
    pub target_climb_rate: f32,
    pub time_bonus_per_second: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            perfect_tolerance: 5.0,
            combo_reset_margin: 150.0,
            height_points_per_unit: 0.1,
            combo_score_factor: 0.05,
            max_combo_multiplier: 3.0,
            target_climb_rate: 60.0,
            time_bonus_per_second: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    /// Ask the host to suppress default handling of mapped keys.
    pub prevent_default: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            prevent_default: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn multiplier(self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.5,
        }
    }

    /// Scale applied to the width narrowing rate.
    pub fn narrowing_scale(self) -> f32 {
        match self {
            Difficulty::Hard => 2.0,
            Difficulty::Easy | Difficulty::Normal => 1.0,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClimbConfig {
    pub canvas: CanvasConfig,
    pub physics: PhysicsConfig,
    pub level: LevelConfig,
    pub camera: CameraConfig,
    pub scoring: ScoringConfig,
    pub input: InputConfig,
    pub tick_rate_hz: f32,
    /// Session seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    pub difficulty: Difficulty,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            physics: PhysicsConfig::default(),
            level: LevelConfig::default(),
            camera: CameraConfig::default(),
            scoring: ScoringConfig::default(),
            input: InputConfig::default(),
            tick_rate_hz: 60.0,
            seed: None,
            difficulty: Difficulty::Normal,
        }
    }
}

impl ClimbConfig {
    /// Load config from the file named by `SKYCLIMB_CONFIG` (or the default
    /// path), then apply environment overrides. Falls back to defaults if the
    /// file is unparseable or invalid.
    pub fn load() -> Self {
        let path =
            std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = match Self::from_path(&path) {
            Ok(Some(cfg)) => {
                tracing::info!(path = %path, "Loaded configuration");
                cfg
            },
            Ok(None) => ClimbConfig::default(),
            Err(e) => {
                tracing::warn!("Failed to load {path}: {e}, using defaults");
                ClimbConfig::default()
            },
        };
        config.apply_overrides(
            std::env::var("SKYCLIMB_SEED").ok(),
            std::env::var("SKYCLIMB_DIFFICULTY").ok(),
        );
        config
    }

    /// Read and validate a config file. `Ok(None)` means the file does not exist.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(content) => Self::from_toml_str(&content).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Read(e.to_string())),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: ClimbConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `SKYCLIMB_SEED` / `SKYCLIMB_DIFFICULTY` style overrides.
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, seed: Option<String>, difficulty: Option<String>) {
        if let Some(raw) = seed.filter(|s| !s.is_empty()) {
            match raw.parse::<u64>() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => tracing::warn!(value = %raw, "Ignoring unparseable seed override"),
            }
        }
        if let Some(raw) = difficulty.filter(|s| !s.is_empty()) {
            match Difficulty::parse(&raw) {
                Some(d) => self.difficulty = d,
                None => tracing::warn!(value = %raw, "Ignoring unknown difficulty override"),
            }
        }
    }

    /// Check value ranges and the jump/gap coupling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        let l = &self.level;
        let c = &self.camera;
        let checks: [(bool, &str); 16] = [
            (self.canvas.width > 0.0 && self.canvas.height > 0.0, "canvas dimensions must be > 0"),
            (self.tick_rate_hz > 0.0, "tick_rate_hz must be > 0"),
            (p.gravity > 0.0, "physics.gravity must be > 0"),
            (p.max_fall_speed > 0.0, "physics.max_fall_speed must be > 0"),
            (p.jump_impulse > 0.0, "physics.jump_impulse must be > 0"),
            (p.max_speed > 0.0, "physics.max_speed must be > 0"),
            (
                (0.0..1.0).contains(&p.friction) && (0.0..1.0).contains(&p.slippery_friction),
                "physics friction factors must be in [0, 1)",
            ),
            (
                p.player_width > 0.0 && p.player_height > 0.0,
                "physics player dimensions must be > 0",
            ),
            (l.min_gap > 0.0 && l.min_gap <= l.max_gap, "level gap range must satisfy 0 < min_gap <= max_gap"),
            (l.min_width <= l.max_width, "level.min_width must be <= level.max_width"),
            (
                l.min_playable_width > 0.0 && l.min_playable_width <= l.min_width,
                "level.min_playable_width must be in (0, min_width]",
            ),
            (l.max_width <= self.canvas.width, "level.max_width must fit the canvas"),
            (l.checkpoint_interval > 0, "level.checkpoint_interval must be > 0"),
            (l.weights.total() > 0, "level.weights must not all be zero"),
            (
                c.scroll_band > 0.0 && c.scroll_band <= 1.0,
                "camera.scroll_band must be in (0, 1]",
            ),
            (c.easing > 0.0 && c.easing <= 1.0, "camera.easing must be in (0, 1]"),
        ];
        if let Some((_, msg)) = checks.iter().find(|(ok, _)| !ok) {
            return Err(ConfigError::Invalid((*msg).to_string()));
        }

        // Worst case: two minimum-width platforms half a canvas apart at the max gap.
        let envelope = JumpEnvelope::simulate(p);
        let from = Platform::new(0, 0.0, 0.0, l.min_playable_width, PlatformKind::Normal);
        let to = Platform::new(
            1,
            self.canvas.width / 2.0,
            l.max_gap,
            l.min_playable_width,
            PlatformKind::Normal,
        );
        if !envelope.can_reach(&from, &to, self.canvas.width) {
            return Err(ConfigError::Invalid(format!(
                "a full jump (apex {:.1}) cannot cover max_gap {:.1} with platforms {:.1} wide",
                envelope.apex(),
                l.max_gap,
                l.min_playable_width
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ClimbConfig::default()
            .validate()
            .expect("defaults must satisfy every invariant");
    }

    #[test]
    fn parse_partial_toml_keeps_defaults() {
        let toml_str = r#"
tick_rate_hz = 30.0
seed = 7

[physics]
gravity = 0.45
"#;
        let cfg = ClimbConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.tick_rate_hz, 30.0);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.physics.gravity, 0.45);
        assert_eq!(cfg.physics.jump_impulse, PhysicsConfig::default().jump_impulse);
        assert_eq!(cfg.level, LevelConfig::default());
    }

    #[test]
    fn parse_difficulty_lowercase() {
        let cfg = ClimbConfig::from_toml_str("difficulty = \"hard\"").unwrap();
        assert_eq!(cfg.difficulty, Difficulty::Hard);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = ClimbConfig::from_toml_str("tick_rate_hz = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inverted_gap_range_rejected() {
        let toml_str = r#"
[level]
min_gap = 120.0
max_gap = 80.0
"#;
        let err = ClimbConfig::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("gap")));
    }

    #[test]
    fn zero_checkpoint_interval_rejected() {
        let mut cfg = ClimbConfig::default();
        cfg.level.checkpoint_interval = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unreachable_gap_rejected() {
        let mut cfg = ClimbConfig::default();
        cfg.level.max_gap = 400.0;
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid(ref m) if m.contains("cannot cover")),
            "got {err}"
        );
    }

    #[test]
    fn weak_jump_rejected() {
        let mut cfg = ClimbConfig::default();
        cfg.physics.jump_impulse = 4.0;
        cfg.physics.hold_boost = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_none() {
        let result = ClimbConfig::from_path("definitely/not/here.toml").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn overrides_apply_and_ignore_garbage() {
        let mut cfg = ClimbConfig::default();
        cfg.apply_overrides(Some("99".to_string()), Some("Easy".to_string()));
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.difficulty, Difficulty::Easy);

        cfg.apply_overrides(Some("not-a-number".to_string()), Some("brutal".to_string()));
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.difficulty, Difficulty::Easy);
    }

    #[test]
    fn kind_weights_partition_rolls() {
        let w = KindWeights::default();
        assert_eq!(w.pick(0), PlatformKind::Normal);
        assert_eq!(w.pick(79), PlatformKind::Normal);
        assert_eq!(w.pick(80), PlatformKind::Bounce);
        assert_eq!(w.pick(90), PlatformKind::Slippery);
        assert_eq!(w.pick(97), PlatformKind::Moving);
        assert_eq!(w.pick(99), PlatformKind::Moving);
    }

    #[test]
    fn difficulty_multipliers() {
        assert_eq!(Difficulty::Easy.multiplier(), 0.75);
        assert_eq!(Difficulty::Normal.multiplier(), 1.0);
        assert_eq!(Difficulty::Hard.multiplier(), 1.5);
        assert_eq!(Difficulty::parse(" HARD "), Some(Difficulty::Hard));
    }

    #[test]
    fn shipped_config_file_parses() {
        let content = include_str!("../../../../config/skyclimb.toml");
        let cfg = ClimbConfig::from_toml_str(content).unwrap();
        assert_eq!(cfg.level.checkpoint_interval, 50);
    }
}
