use skyclimb_core::host::HostError;
use skyclimb_core::surface::{Color, Surface};

use crate::camera::Camera;
use crate::combo::ComboState;
use crate::config::ClimbConfig;
use crate::level_gen::Platform;
use crate::physics::Player;
use crate::{RunState, RunSummary};

/// Approximate glyph advance in canvas units, for centering text.
const GLYPH_WIDTH: f32 = 10.0;
const LINE_HEIGHT: f32 = 28.0;
/// Ticks per combo highlight pulse.
const PULSE_TICKS: u64 = 30;

/// Borrowed view of everything a frame needs.
pub struct FrameView<'a> {
    pub state: RunState,
    pub tick: u64,
    pub player: &'a Player,
    pub platforms: &'a [Platform],
    pub camera: &'a Camera,
    pub combo: &'a ComboState,
    pub score: u64,
    pub summary: Option<&'a RunSummary>,
}

/// Draw one frame and present it.
pub fn render_frame(
    view: &FrameView<'_>,
    config: &ClimbConfig,
    surface: &mut dyn Surface,
) -> Result<(), HostError> {
    let canvas_w = config.canvas.width;
    let canvas_h = config.canvas.height;
    let (surface_w, surface_h) = surface.size();
    let sx = if canvas_w > 0.0 { surface_w / canvas_w } else { 1.0 };
    let sy = if canvas_h > 0.0 { surface_h / canvas_h } else { 1.0 };
    let mut pen = Pen { surface, sx, sy };

    pen.surface.clear(Color::SKY);

    let thickness = config.level.platform_thickness;
    let bottom = view.camera.bottom();
    let top = view.camera.top(canvas_h);
    for p in view
        .platforms
        .iter()
        .filter(|p| p.y >= bottom - thickness && p.y <= top)
    {
        let color = if p.checkpoint {
            Color::PLATFORMS[4]
        } else {
            Color::PLATFORMS[p.kind.palette_index()]
        };
        let y = view.camera.to_screen(p.y, canvas_h);
        pen.rect(p.x, y, p.width, thickness, color);
    }

    // Player, drawn twice while straddling the wrap seam.
    let pw = config.physics.player_width;
    let ph = config.physics.player_height;
    let left = view.player.x - pw / 2.0;
    let y = view.camera.to_screen(view.player.y + ph, canvas_h);
    pen.rect(left, y, pw, ph, Color::PLAYER);
    if left < 0.0 {
        pen.rect(left + canvas_w, y, pw, ph, Color::PLAYER);
    } else if left + pw > canvas_w {
        pen.rect(left - canvas_w, y, pw, ph, Color::PLAYER);
    }

    let height = (view.player.y.max(0.0) / 10.0).floor() as u64;
    let hud = format!(
        "SCORE {}  COMBO {}  HEIGHT {}m",
        view.score, view.combo.combo, height
    );
    let hud_color = if view.combo.combo >= config.physics.combo_boost_threshold {
        let phase = (view.tick % PULSE_TICKS) as f32 / PULSE_TICKS as f32;
        Color::TEXT.lerp(Color::ACCENT, 1.0 - (phase * 2.0 - 1.0).abs())
    } else {
        Color::TEXT
    };
    pen.text(8.0, 8.0, &hud, hud_color);

    match view.state {
        RunState::Instructions => {
            let lines = [
                "SKYCLIMB",
                "Left / Right or A / D to move",
                "Space, Up or W to jump",
                "Hold jump to jump higher",
                "Press Enter to start",
            ];
            pen.centered_block(&lines, canvas_w, canvas_h, Color::TEXT);
        },
        RunState::Ready => {
            pen.centered_block(&["GET READY"], canvas_w, canvas_h, Color::ACCENT);
        },
        RunState::Playing => {},
        RunState::GameOver => {
            let (final_score, awarded) = view
                .summary
                .map_or((0, 0), |s| (s.final_score, s.awarded_points));
            let score_line = format!("FINAL SCORE {final_score}");
            let points_line = format!("POINTS {awarded}");
            let lines = [
                "GAME OVER",
                score_line.as_str(),
                points_line.as_str(),
                "R to restart / Q to quit",
            ];
            pen.centered_block(&lines, canvas_w, canvas_h, Color::TEXT);
        },
    }

    pen.surface.present()
}

/// Scales canvas coordinates to the surface.
struct Pen<'s> {
    surface: &'s mut dyn Surface,
    sx: f32,
    sy: f32,
}

impl Pen<'_> {
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        self.surface
            .fill_rect(x * self.sx, y * self.sy, w * self.sx, h * self.sy, color);
    }

    fn text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        self.surface.draw_text(x * self.sx, y * self.sy, text, color);
    }

    fn centered_block(&mut self, lines: &[&str], canvas_w: f32, canvas_h: f32, color: Color) {
        let start = canvas_h / 2.0 - LINE_HEIGHT * lines.len() as f32 / 2.0;
        for (i, line) in lines.iter().enumerate() {
            let x = ((canvas_w - line.len() as f32 * GLYPH_WIDTH) / 2.0).max(0.0);
            self.text(x, start + LINE_HEIGHT * i as f32, line, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level_gen::PlatformKind;
    use skyclimb_core::test_helpers::{DrawCommand, RecordingSurface};

    fn draw(state: RunState, platforms: &[Platform], summary: Option<&RunSummary>) -> RecordingSurface {
        let config = ClimbConfig::default();
        let player = Player::standing(200.0, 0.0);
        let camera = Camera::new();
        let combo = ComboState::default();
        let view = FrameView {
            state,
            tick: 0,
            player: &player,
            platforms,
            camera: &camera,
            combo: &combo,
            score: 42,
            summary,
        };
        let mut surface = RecordingSurface::new(400.0, 600.0);
        render_frame(&view, &config, &mut surface).unwrap();
        surface
    }

    fn floor() -> Platform {
        let mut p = Platform::new(0, 0.0, 0.0, 400.0, PlatformKind::Normal);
        p.checkpoint = true;
        p
    }

    #[test]
    fn frame_starts_with_clear_and_presents() {
        let surface = draw(RunState::Playing, &[floor()], None);
        assert_eq!(surface.commands[0], DrawCommand::Clear(Color::SKY));
        assert_eq!(surface.frames_presented, 1);
        assert!(surface.has_text_containing("SCORE 42"));
    }

    #[test]
    fn platforms_colored_by_kind() {
        let bounce = Platform::new(1, 50.0, 100.0, 80.0, PlatformKind::Bounce);
        let surface = draw(RunState::Playing, &[floor(), bounce], None);
        let colors: Vec<Color> = surface
            .rects()
            .filter_map(|c| match c {
                DrawCommand::Rect { color, .. } => Some(*color),
                _ => None,
            })
            .collect();
        assert!(colors.contains(&Color::PLATFORMS[4]), "checkpoint color");
        assert!(colors.contains(&Color::PLATFORMS[1]), "bounce color");
        assert!(colors.contains(&Color::PLAYER));
    }

    #[test]
    fn world_y_maps_to_screen() {
        let raised = Platform::new(1, 50.0, 100.0, 80.0, PlatformKind::Normal);
        let surface = draw(RunState::Playing, &[raised], None);
        let found = surface.rects().any(|c| {
            matches!(c, DrawCommand::Rect { x, y, .. } if *x == 50.0 && *y == 500.0)
        });
        assert!(found, "platform at height 100 should be drawn 100 above the bottom");
    }

    #[test]
    fn offscreen_platforms_skipped() {
        let far = Platform::new(9, 10.0, 5_000.0, 80.0, PlatformKind::Normal);
        let surface = draw(RunState::Playing, &[far], None);
        // Only the player.
        assert_eq!(surface.rects().count(), 1);
    }

    #[test]
    fn overlays_follow_state() {
        let s = draw(RunState::Instructions, &[], None);
        assert!(s.has_text_containing("Press Enter to start"));

        let s = draw(RunState::Ready, &[], None);
        assert!(s.has_text_containing("GET READY"));

        let s = draw(RunState::Playing, &[], None);
        assert!(!s.has_text_containing("GET READY"));
        assert!(!s.has_text_containing("GAME OVER"));
    }

    #[test]
    fn game_over_shows_final_score() {
        let summary = RunSummary {
            final_score: 321,
            awarded_points: 400,
            ..RunSummary::default()
        };
        let s = draw(RunState::GameOver, &[], Some(&summary));
        assert!(s.has_text_containing("GAME OVER"));
        assert!(s.has_text_containing("FINAL SCORE 321"));
        assert!(s.has_text_containing("POINTS 400"));
        assert!(s.has_text_containing("R to restart"));
    }

    #[test]
    fn player_wraps_across_seam() {
        let config = ClimbConfig::default();
        let player = Player::standing(395.0, 0.0);
        let camera = Camera::new();
        let combo = ComboState::default();
        let view = FrameView {
            state: RunState::Playing,
            tick: 0,
            player: &player,
            platforms: &[],
            camera: &camera,
            combo: &combo,
            score: 0,
            summary: None,
        };
        let mut surface = RecordingSurface::new(400.0, 600.0);
        render_frame(&view, &config, &mut surface).unwrap();
        assert_eq!(surface.rects().count(), 2);
    }

    #[test]
    fn scales_to_surface_size() {
        let raised = Platform::new(1, 100.0, 100.0, 80.0, PlatformKind::Normal);
        let config = ClimbConfig::default();
        let player = Player::standing(200.0, 0.0);
        let camera = Camera::new();
        let combo = ComboState::default();
        let view = FrameView {
            state: RunState::Playing,
            tick: 0,
            player: &player,
            platforms: std::slice::from_ref(&raised),
            camera: &camera,
            combo: &combo,
            score: 0,
            summary: None,
        };
        let mut surface = RecordingSurface::new(200.0, 300.0);
        render_frame(&view, &config, &mut surface).unwrap();
        let found = surface.rects().any(|c| {
            matches!(c, DrawCommand::Rect { x, y, w, .. } if *x == 50.0 && *y == 250.0 && *w == 40.0)
        });
        assert!(found);
    }
}
