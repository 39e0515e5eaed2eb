//! Reachability envelope of a single full jump.
//!
//! The envelope is traced by running the real integrator, so it stays in
//! step with whatever physics constants are configured. It is consulted by
//! config validation and tests only; level generation never asks it.

use crate::config::PhysicsConfig;
use crate::input::ActionFrame;
use crate::level_gen::Platform;
use crate::physics::{Player, integrate};

/// Safety cap on simulated ticks.
const MAX_TICKS: usize = 2_000;

/// Per-tick `(dx, dy)` of a full-hold jump with right held from a standstill.
#[derive(Debug, Clone)]
pub struct JumpEnvelope {
    samples: Vec<(f32, f32)>,
    player_width: f32,
}

impl JumpEnvelope {
    pub fn simulate(physics: &PhysicsConfig) -> Self {
        let mut player = Player::standing(0.0, 0.0);
        let mut samples = Vec::new();
        let mut input = ActionFrame {
            right: true,
            jump: true,
            jump_pressed: true,
            ..Default::default()
        };
        for _ in 0..MAX_TICKS {
            // Unbounded canvas, so x is raw distance.
            integrate(&mut player, &input, physics, f32::INFINITY, 0);
            input.jump_pressed = false;
            if player.y < 0.0 {
                break;
            }
            samples.push((player.x, player.y));
        }
        Self {
            samples,
            player_width: physics.player_width,
        }
    }

    pub fn apex(&self) -> f32 {
        self.samples
            .iter()
            .map(|&(_, dy)| dy)
            .fold(0.0, f32::max)
    }

    /// Horizontal distance at the last tick still at or above `dy`.
    pub fn max_dx_at_height(&self, dy: f32) -> Option<f32> {
        self.samples
            .iter()
            .rev()
            .find(|&&(_, y)| y >= dy)
            .map(|&(dx, _)| dx)
    }

    /// Whether a player standing on `from` can land on `to`.
    ///
    /// The player only needs to overlap the target by a sliver, so the
    /// required travel is the wrapped gap between the two spans minus the
    /// player's own width.
    pub fn can_reach(&self, from: &Platform, to: &Platform, canvas_width: f32) -> bool {
        let needed = (span_gap(from, to, canvas_width) - self.player_width).max(0.0);
        self.max_dx_at_height(to.y - from.y)
            .is_some_and(|dx| dx >= needed)
    }
}

/// Horizontal gap between two platform spans on a wrapping canvas;
/// zero when they overlap.
pub fn span_gap(a: &Platform, b: &Platform, canvas_width: f32) -> f32 {
    [-canvas_width, 0.0, canvas_width]
        .into_iter()
        .map(|shift| {
            let (bl, br) = (b.x + shift, b.right() + shift);
            if br < a.x {
                a.x - br
            } else if bl > a.right() {
                bl - a.right()
            } else {
                0.0
            }
        })
        .fold(f32::INFINITY, f32::min)
}
