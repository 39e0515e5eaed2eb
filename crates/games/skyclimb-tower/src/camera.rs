use serde::{Deserialize, Serialize};

use crate::config::CameraConfig;

/// Vertical viewport offset. `offset` is the world height shown at the bottom
/// edge of the canvas.
///
/// The camera only moves up: it eases toward a target that is raised
/// whenever the player climbs above the scroll band, and a falling player is
/// left to drop out of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub offset: f32,
    pub target: f32,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick toward the player's height.
    pub fn follow(&mut self, player_y: f32, viewport_height: f32, config: &CameraConfig) {
        let band_top = viewport_height * config.scroll_band;
        self.target = self.target.max(player_y - band_top);

        let remaining = self.target - self.offset;
        if remaining.abs() <= config.snap_threshold {
            self.offset = self.target;
        } else {
            self.offset += remaining * config.easing;
        }
    }

    pub fn bottom(&self) -> f32 {
        self.offset
    }

    pub fn top(&self, viewport_height: f32) -> f32 {
        self.offset + viewport_height
    }

    /// Height the level should be generated up to.
    pub fn generation_target(&self, viewport_height: f32, config: &CameraConfig) -> f32 {
        self.top(viewport_height) + config.lookahead
    }

    /// Height below which platforms can be discarded.
    pub fn prune_line(&self, config: &CameraConfig) -> f32 {
        self.bottom() - config.prune_margin
    }

    /// Whether a player at `player_y` has fallen out of the run.
    pub fn has_fallen_off(&self, player_y: f32, config: &CameraConfig) -> bool {
        player_y < self.bottom() - config.fall_margin
    }

    /// Canvas y (down from the top edge) for a world height.
    pub fn to_screen(&self, world_y: f32, viewport_height: f32) -> f32 {
        viewport_height - (world_y - self.offset)
    }
}
