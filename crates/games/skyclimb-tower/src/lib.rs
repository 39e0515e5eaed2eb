pub mod camera;
pub mod collision;
pub mod combo;
pub mod config;
pub mod error;
pub mod input;
pub mod level_gen;
pub mod physics;
pub mod reach;
pub mod render;
pub mod scheduler;
pub mod scoring;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use skyclimb_core::host::GameHost;
use skyclimb_core::points::{Badge, GameId, PointsService, calculate_game_points};
use skyclimb_core::surface::Surface;

use camera::Camera;
use combo::ComboState;
use config::ClimbConfig;
use error::EngineError;
use input::{InputSampler, KeyDisposition};
use level_gen::{LevelGenerator, Platform};
use physics::Player;
use render::FrameView;
use scoring::ScoreTracker;

/// Identifier reported to the points service.
pub const GAME_ID: &str = "skyclimb-tower";

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Instructions,
    Ready,
    Playing,
    GameOver,
}

/// Final numbers for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub peak_height: f32,
    pub base_score: u64,
    pub max_combo: u32,
    pub perfect_landings: u32,
    pub elapsed_secs: f32,
    pub time_bonus: u64,
    pub difficulty_multiplier: f32,
    /// Breakdown subtotal before the difficulty multiplier.
    pub final_score: u64,
    pub awarded_points: u64,
    pub badges: Vec<Badge>,
}

/// Something observable that happened during an engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum ClimbEvent {
    StateChanged {
        from: RunState,
        to: RunState,
    },
    Landed {
        platform_id: u64,
        new_platform: bool,
        perfect: bool,
    },
    Bounced {
        platform_id: u64,
    },
    ComboReset {
        lost: u32,
    },
    Extended {
        count: usize,
        top_y: f32,
    },
    RunComplete {
        summary: RunSummary,
    },
}

/// Read-only copy of the engine state for external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbSnapshot {
    pub state: RunState,
    pub tick: u64,
    pub player: Player,
    /// Platforms intersecting the viewport.
    pub platforms: Vec<Platform>,
    pub camera: Camera,
    pub combo: ComboState,
    pub score: u64,
    pub peak_height: f32,
    pub summary: Option<RunSummary>,
}

/// The climbing game engine: owns one run at a time and the session RNG
/// that seeds each run.
pub struct ClimbEngine {
    config: ClimbConfig,
    host: Box<dyn GameHost>,
    points_service: PointsService,
    game_id: GameId,
    session_rng: StdRng,
    run_seed: u64,
    state: RunState,
    exited: bool,
    input: InputSampler,
    level: LevelGenerator,
    player: Player,
    camera: Camera,
    combo: ComboState,
    score: ScoreTracker,
    tick: u64,
    elapsed_secs: f32,
    summary: Option<RunSummary>,
    pending: Vec<ClimbEvent>,
}

impl ClimbEngine {
    pub fn new(config: ClimbConfig, host: Box<dyn GameHost>) -> Result<Self, EngineError> {
        config.validate()?;
        let session_seed = config.seed.unwrap_or_else(|| rand::rng().random());
        tracing::info!(session_seed, difficulty = ?config.difficulty, "Engine created");

        let level = LevelGenerator::new(0, config.canvas.width, &config.level, config.difficulty);
        let player = Player::standing(config.canvas.width / 2.0, 0.0);
        let input = InputSampler::new(config.input.prevent_default);
        Ok(Self {
            host,
            points_service: calculate_game_points,
            game_id: GameId::new(GAME_ID),
            session_rng: StdRng::seed_from_u64(session_seed),
            run_seed: 0,
            state: RunState::Instructions,
            exited: false,
            input,
            level,
            player,
            camera: Camera::new(),
            combo: ComboState::new(),
            score: ScoreTracker::new(),
            tick: 0,
            elapsed_secs: 0.0,
            summary: None,
            pending: Vec::new(),
            config,
        })
    }

    /// Replace the scoring function used at game over.
    pub fn with_points_service(mut self, service: PointsService) -> Self {
        self.points_service = service;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> &ClimbConfig {
        &self.config
    }

    pub fn run_seed(&self) -> u64 {
        self.run_seed
    }

    pub fn summary(&self) -> Option<&RunSummary> {
        self.summary.as_ref()
    }

    /// Acknowledge the instructions: generate a level and wait to play.
    /// Returns false outside `Instructions`.
    pub fn start(&mut self) -> bool {
        if self.exited || self.state != RunState::Instructions {
            return false;
        }
        self.reset_run();
        self.input.set_enabled(true);
        self.transition(RunState::Ready);
        true
    }

    /// Start a fresh run from `GameOver`. Returns false in any other state.
    pub fn restart(&mut self) -> bool {
        if self.exited || self.state != RunState::GameOver {
            return false;
        }
        self.reset_run();
        self.input.set_enabled(true);
        self.transition(RunState::Ready);
        true
    }

    /// Hand control back to the host. Safe in any state; the engine ignores
    /// further updates afterwards.
    pub fn exit(&mut self) {
        self.input.set_enabled(false);
        self.exited = true;
        tracing::info!(state = ?self.state, "Exit requested");
        self.host.exit_requested();
    }

    pub fn key_down(&mut self, code: &str) -> KeyDisposition {
        let disposition = self.input.key_down(code);
        if self.state == RunState::Instructions && code == "Enter" {
            self.start();
        }
        disposition
    }

    pub fn key_up(&mut self, code: &str) -> KeyDisposition {
        self.input.key_up(code)
    }

    /// Advance one tick. `dt` is the wall time the tick represents, used
    /// only for the time bonus; physics runs in fixed per-tick units.
    pub fn update(&mut self, dt: f32) -> Vec<ClimbEvent> {
        if self.exited {
            return Vec::new();
        }
        if self.state == RunState::Ready {
            self.transition(RunState::Playing);
        }
        if self.state == RunState::Playing {
            self.step(if dt.is_finite() { dt.max(0.0) } else { 0.0 });
        }
        std::mem::take(&mut self.pending)
    }

    /// Update then draw, as one uninterrupted unit.
    pub fn frame(
        &mut self,
        dt: f32,
        surface: &mut dyn Surface,
    ) -> Result<Vec<ClimbEvent>, EngineError> {
        let events = self.update(dt);
        self.render(surface)?;
        Ok(events)
    }

    pub fn render(&self, surface: &mut dyn Surface) -> Result<(), EngineError> {
        let view = FrameView {
            state: self.state,
            tick: self.tick,
            player: &self.player,
            platforms: self.level.platforms(),
            camera: &self.camera,
            combo: &self.combo,
            score: self.score.base_score(),
            summary: self.summary.as_ref(),
        };
        render::render_frame(&view, &self.config, surface)?;
        Ok(())
    }

    pub fn snapshot(&self) -> ClimbSnapshot {
        let bottom = self.camera.bottom() - self.config.level.platform_thickness;
        let top = self.camera.top(self.config.canvas.height);
        ClimbSnapshot {
            state: self.state,
            tick: self.tick,
            player: self.player.clone(),
            platforms: self
                .level
                .platforms()
                .iter()
                .filter(|p| p.y >= bottom && p.y <= top)
                .cloned()
                .collect(),
            camera: self.camera,
            combo: self.combo.clone(),
            score: self.score.base_score(),
            peak_height: self.score.peak_height,
            summary: self.summary.clone(),
        }
    }

    /// MessagePack encoding of `snapshot()`.
    pub fn encode_snapshot(&self) -> Result<Vec<u8>, EngineError> {
        rmp_serde::to_vec(&self.snapshot()).map_err(|e| EngineError::Snapshot(e.to_string()))
    }

    fn transition(&mut self, to: RunState) {
        let from = self.state;
        self.state = to;
        tracing::info!(?from, ?to, "Run state changed");
        self.pending.push(ClimbEvent::StateChanged { from, to });
    }

    fn reset_run(&mut self) {
        self.run_seed = self.session_rng.random();
        let canvas = &self.config.canvas;
        self.level = LevelGenerator::new(
            self.run_seed,
            canvas.width,
            &self.config.level,
            self.config.difficulty,
        );
        self.player = Player::standing(canvas.width / 2.0, 0.0);
        self.camera = Camera::new();
        self.combo = ComboState::new();
        self.score = ScoreTracker::new();
        self.tick = 0;
        self.elapsed_secs = 0.0;
        self.summary = None;
        let target = self.camera.generation_target(canvas.height, &self.config.camera);
        self.level.extend_to(target);
        tracing::info!(run_seed = self.run_seed, "Run reset");
    }

    fn step(&mut self, dt: f32) {
        self.tick += 1;
        self.elapsed_secs += dt;
        let canvas_w = self.config.canvas.width;
        let canvas_h = self.config.canvas.height;

        let actions = self.input.sample();
        let step = physics::integrate(
            &mut self.player,
            &actions,
            &self.config.physics,
            canvas_w,
            self.combo.combo,
        );

        if let Some(contact) = collision::resolve(
            &mut self.player,
            step,
            self.level.platforms(),
            &self.config.physics,
            canvas_w,
        ) && contact.landed
        {
            let outcome = self.combo.on_landing(
                contact.platform_id,
                contact.platform_y,
                contact.center_offset,
                &self.config.scoring,
            );
            tracing::debug!(
                platform_id = contact.platform_id,
                new_platform = outcome.new_platform,
                perfect = outcome.perfect,
                combo = self.combo.combo,
                "Landed"
            );
            self.pending.push(ClimbEvent::Landed {
                platform_id: contact.platform_id,
                new_platform: outcome.new_platform,
                perfect: outcome.perfect,
            });
            if contact.bounced() {
                self.pending.push(ClimbEvent::Bounced {
                    platform_id: contact.platform_id,
                });
            }
            if let Some(lost) = outcome.reset_from {
                tracing::debug!(lost, "Combo reset");
                self.pending.push(ClimbEvent::ComboReset { lost });
            }
        }

        self.score
            .observe_height(self.player.y, self.combo.combo, &self.config.scoring);

        self.camera
            .follow(self.player.y, canvas_h, &self.config.camera);
        let target = self.camera.generation_target(canvas_h, &self.config.camera);
        let added = self.level.extend_to(target);
        if added > 0 {
            self.pending.push(ClimbEvent::Extended {
                count: added,
                top_y: self.level.top_y(),
            });
        }
        self.level
            .prune_below(self.camera.prune_line(&self.config.camera));

        if self
            .camera
            .has_fallen_off(self.player.y, &self.config.camera)
        {
            self.finish_run();
        }
    }

    fn finish_run(&mut self) {
        let input = scoring::points_input(
            &self.score,
            &self.combo,
            self.elapsed_secs,
            self.config.difficulty,
            &self.config.scoring,
        );
        let result = (self.points_service)(&input, &self.game_id);
        let summary = RunSummary {
            peak_height: self.score.peak_height,
            base_score: input.base_score,
            max_combo: self.combo.max_combo,
            perfect_landings: self.combo.perfect_landings,
            elapsed_secs: self.elapsed_secs,
            time_bonus: input.time_bonus,
            difficulty_multiplier: result.multiplier,
            final_score: result.breakdown.subtotal,
            awarded_points: result.total,
            badges: result.badges,
        };

        self.input.set_enabled(false);
        self.transition(RunState::GameOver);
        tracing::info!(
            final_score = summary.final_score,
            awarded_points = summary.awarded_points,
            max_combo = summary.max_combo,
            "Run complete"
        );
        self.host
            .run_complete(summary.final_score, summary.awarded_points);
        self.pending.push(ClimbEvent::RunComplete {
            summary: summary.clone(),
        });
        self.summary = Some(summary);
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    #[cfg(test)]
    pub(crate) fn level(&self) -> &LevelGenerator {
        &self.level
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use skyclimb_core::test_helpers::RecordingHost;

    pub fn seeded_config(seed: u64) -> ClimbConfig {
        ClimbConfig {
            seed: Some(seed),
            ..ClimbConfig::default()
        }
    }

    pub fn engine(seed: u64) -> (ClimbEngine, RecordingHost) {
        let host = RecordingHost::new();
        let engine = ClimbEngine::new(seeded_config(seed), Box::new(host.clone())).unwrap();
        (engine, host)
    }

    /// Drop the player below the fall-off line with nothing underneath.
    pub fn push_off_the_bottom(engine: &mut ClimbEngine) {
        let player = engine.player_mut();
        player.y = -500.0;
        player.vy = 0.0;
        player.on_ground = false;
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use skyclimb_core::points::PointsResult;
    use skyclimb_core::test_helpers::{RecordingHost, RecordingSurface};

    const DT: f32 = 1.0 / 60.0;

    fn playing(seed: u64) -> (ClimbEngine, RecordingHost) {
        let (mut engine, host) = engine(seed);
        assert!(engine.start());
        engine.update(DT);
        assert_eq!(engine.state(), RunState::Playing);
        (engine, host)
    }

    // ================================================================
    // State machine
    // ================================================================

    #[test]
    fn begins_in_instructions_with_input_disabled() {
        let (mut engine, _) = engine(1);
        assert_eq!(engine.state(), RunState::Instructions);
        engine.key_down("ArrowRight");
        let events = engine.update(DT);
        assert!(events.is_empty());
        assert_eq!(engine.snapshot().player.x, 200.0);
    }

    #[test]
    fn start_then_first_tick_plays() {
        let (mut engine, _) = engine(1);
        assert!(engine.start());
        assert_eq!(engine.state(), RunState::Ready);
        assert!(!engine.start(), "start is only valid from instructions");

        let events = engine.update(DT);
        assert_eq!(
            events[..2],
            [
                ClimbEvent::StateChanged {
                    from: RunState::Instructions,
                    to: RunState::Ready,
                },
                ClimbEvent::StateChanged {
                    from: RunState::Ready,
                    to: RunState::Playing,
                },
            ]
        );
        assert_eq!(engine.state(), RunState::Playing);
    }

    #[test]
    fn enter_acknowledges_instructions() {
        let (mut engine, _) = engine(1);
        assert_eq!(engine.key_down("Enter"), KeyDisposition::Consumed);
        assert_eq!(engine.state(), RunState::Ready);
        engine.update(DT);
        // The acknowledging press must not also count as a jump.
        assert!(engine.snapshot().player.on_ground);
    }

    #[test]
    fn start_generates_level_above_viewport() {
        let (mut engine, _) = engine(3);
        engine.start();
        let snapshot = engine.snapshot();
        assert!(engine.level().top_y() > 600.0 + 300.0);
        assert_eq!(snapshot.platforms[0].id, 0);
    }

    #[test]
    fn standing_still_never_ends_the_run() {
        let (mut engine, host) = playing(4);
        for _ in 0..600 {
            engine.update(DT);
        }
        assert_eq!(engine.state(), RunState::Playing);
        assert!(host.log().completed_runs.is_empty());
    }

    // ================================================================
    // Scenarios
    // ================================================================

    #[test]
    fn minimal_climb_dead_center_landing() {
        let (mut engine, _) = playing(5);
        let target = engine.level().get(1).unwrap().clone();
        {
            let player = engine.player_mut();
            player.x = target.center_x();
            player.y = target.y + 1.0;
            player.vy = -1.0;
            player.on_ground = false;
        }
        let events = engine.update(DT);
        assert!(events.contains(&ClimbEvent::Landed {
            platform_id: 1,
            new_platform: true,
            perfect: true,
        }));
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.combo.combo, 1);
        assert_eq!(snapshot.combo.max_combo, 1);
        assert_eq!(snapshot.combo.perfect_landings, 1);
        assert_eq!(snapshot.player.y, target.y);
    }

    #[test]
    fn fall_off_ends_run_exactly_once() {
        let (mut engine, host) = playing(6);
        push_off_the_bottom(&mut engine);
        let events = engine.update(DT);
        assert_eq!(engine.state(), RunState::GameOver);
        assert!(events.iter().any(|e| matches!(e, ClimbEvent::RunComplete { .. })));

        for _ in 0..30 {
            assert!(engine.update(DT).is_empty());
        }
        let log = host.log();
        assert_eq!(log.completed_runs.len(), 1);
        let summary = engine.summary().unwrap();
        assert_eq!(log.completed_runs[0], (summary.final_score, summary.awarded_points));
    }

    #[test]
    fn climbing_scores_and_reports() {
        let (mut engine, host) = playing(7);
        // Land on the first three platforms in order.
        for id in 1..=3 {
            let target = engine.level().get(id).unwrap().clone();
            let player = engine.player_mut();
            player.x = target.center_x() + 20.0;
            player.y = target.y + 1.0;
            player.vy = -1.0;
            player.on_ground = false;
            engine.update(DT);
        }
        assert_eq!(engine.snapshot().combo.combo, 3);
        push_off_the_bottom(&mut engine);
        engine.update(DT);

        let summary = engine.summary().unwrap().clone();
        assert_eq!(summary.max_combo, 3);
        assert_eq!(summary.perfect_landings, 0);
        assert!(summary.base_score > 0);
        // subtotal = base + combo*10 + time bonus
        assert_eq!(
            summary.final_score,
            summary.base_score + 30 + summary.time_bonus
        );
        assert_eq!(host.log().completed_runs, vec![(summary.final_score, summary.awarded_points)]);
    }

    #[test]
    fn restart_resets_everything() {
        let (mut engine, _) = playing(8);
        let first_run_platforms = engine.snapshot().platforms;
        let target = engine.level().get(1).unwrap().clone();
        {
            let player = engine.player_mut();
            player.x = target.center_x();
            player.y = target.y + 1.0;
            player.vy = -1.0;
            player.on_ground = false;
        }
        engine.update(DT);
        push_off_the_bottom(&mut engine);
        engine.update(DT);
        assert!(!engine.start(), "start is not a restart");
        let first_seed = engine.run_seed();

        assert!(engine.restart());
        assert_eq!(engine.state(), RunState::Ready);
        assert_ne!(engine.run_seed(), first_seed);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.player, Player::standing(200.0, 0.0));
        assert_eq!(snapshot.combo, ComboState::default());
        assert_eq!(snapshot.score, 0);
        assert!(snapshot.summary.is_none());
        assert_ne!(snapshot.platforms, first_run_platforms);

        let events = engine.update(DT);
        assert!(events.contains(&ClimbEvent::StateChanged {
            from: RunState::GameOver,
            to: RunState::Ready,
        }));
    }

    #[test]
    fn restart_only_from_game_over() {
        let (mut engine, _) = playing(9);
        assert!(!engine.restart());
        assert_eq!(engine.state(), RunState::Playing);
    }

    #[test]
    fn exit_is_safe_in_every_state() {
        for stage in 0..4 {
            let (mut engine, host) = engine(10);
            if stage >= 1 {
                engine.start();
            }
            if stage >= 2 {
                engine.update(DT);
            }
            if stage >= 3 {
                push_off_the_bottom(&mut engine);
                engine.update(DT);
            }
            engine.exit();
            assert_eq!(host.log().exits, 1);
            assert!(engine.update(DT).is_empty(), "no ticks after exit");
            assert!(!engine.start());
            assert!(!engine.restart());
        }
    }

    // ================================================================
    // Determinism and snapshots
    // ================================================================

    #[test]
    fn same_seed_same_run() {
        let script = |engine: &mut ClimbEngine| {
            engine.start();
            for i in 0..240 {
                if i % 40 == 0 {
                    engine.key_down("Space");
                }
                if i % 40 == 20 {
                    engine.key_up("Space");
                }
                if i == 10 {
                    engine.key_down("ArrowRight");
                }
                engine.update(DT);
            }
            engine.snapshot()
        };
        let (mut a, _) = engine(77);
        let (mut b, _) = engine(77);
        assert_eq!(script(&mut a), script(&mut b));
    }

    #[test]
    fn snapshot_encodes_as_msgpack() {
        let (engine, _) = playing(11);
        let bytes = engine.encode_snapshot().unwrap();
        let decoded: ClimbSnapshot = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded, engine.snapshot());
    }

    #[test]
    fn frame_renders_after_update() {
        let (mut engine, _) = engine(12);
        let mut surface = RecordingSurface::new(400.0, 600.0);
        engine.frame(DT, &mut surface).unwrap();
        assert!(surface.has_text_containing("Press Enter to start"));
        engine.start();
        engine.frame(DT, &mut surface).unwrap();
        assert_eq!(engine.state(), RunState::Playing);
        assert!(!surface.has_text_containing("Press Enter"));
        assert_eq!(surface.frames_presented, 2);
    }

    #[test]
    fn custom_points_service_is_used() {
        fn flat(_: &skyclimb_core::points::PointsInput, _: &GameId) -> PointsResult {
            PointsResult {
                total: 999,
                breakdown: Default::default(),
                multiplier: 1.0,
                badges: Vec::new(),
            }
        }
        let (engine, host) = engine(13);
        let mut engine = engine.with_points_service(flat);
        engine.start();
        engine.update(DT);
        push_off_the_bottom(&mut engine);
        engine.update(DT);
        assert_eq!(host.log().completed_runs, vec![(0, 999)]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = ClimbConfig::default();
        config.level.min_gap = 500.0;
        let result = ClimbEngine::new(config, Box::new(RecordingHost::new()));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
