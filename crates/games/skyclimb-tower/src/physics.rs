use serde::{Deserialize, Serialize};

use crate::config::PhysicsConfig;
use crate::input::ActionFrame;
use crate::level_gen::PlatformKind;

/// Player kinematic state. `x` is the horizontal center, `y` the feet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub on_ground: bool,
    /// A jump is active and may still be extended by holding.
    pub jumping: bool,
    /// Ticks since the current jump began.
    pub up_time: u32,
    /// Ticks since the last ground contact.
    pub air_time: u32,
    /// Kind of the platform under the player while grounded.
    pub ground_kind: Option<PlatformKind>,
}

impl Player {
    /// A player standing at rest on a surface at `y`.
    pub fn standing(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            on_ground: true,
            jumping: false,
            up_time: 0,
            air_time: 0,
            ground_kind: Some(PlatformKind::Normal),
        }
    }
}

/// What the resolver needs to know about the tick that just moved the player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub prev_y: f32,
    pub was_grounded: bool,
}

/// Advance the player by one tick. Leaves `on_ground` cleared; the collision
/// resolver sets it again if the player is still supported.
///
/// Horizontal input is evaluated left then right, so right wins when both are
/// held. Position wraps around the canvas horizontally.
pub fn integrate(
    player: &mut Player,
    input: &ActionFrame,
    physics: &PhysicsConfig,
    canvas_width: f32,
    combo: u32,
) -> Step {
    let step = Step {
        prev_y: player.y,
        was_grounded: player.on_ground,
    };

    let boosted = combo >= physics.combo_boost_threshold;
    let max_speed = physics.max_speed * if boosted { physics.combo_speed_boost } else { 1.0 };
    let impulse = physics.jump_impulse * if boosted { physics.combo_jump_boost } else { 1.0 };

    // Horizontal
    let mut dir = 0.0;
    if input.left {
        dir = -1.0;
    }
    if input.right {
        dir = 1.0;
    }
    if dir != 0.0 {
        let accel = if player.on_ground {
            physics.ground_accel
        } else {
            physics.air_accel
        };
        player.vx += dir * accel;
    } else if player.on_ground && !player.jumping {
        let friction = match player.ground_kind {
            Some(PlatformKind::Slippery) => physics.slippery_friction,
            _ => physics.friction,
        };
        player.vx *= friction;
        if player.vx.abs() < physics.stop_threshold {
            player.vx = 0.0;
        }
    }
    player.vx = player.vx.clamp(-max_speed, max_speed);

    // Jump start / hold extension
    if input.jump_pressed && player.on_ground && !player.jumping {
        player.vy = impulse;
        player.jumping = true;
        player.up_time = 0;
    } else if player.jumping {
        if input.jump && player.up_time < physics.hold_window_ticks && player.vy > 0.0 {
            player.vy += physics.hold_boost;
        } else {
            player.jumping = false;
        }
    }

    // Gravity
    player.vy = (player.vy - physics.gravity).max(-physics.max_fall_speed);

    player.x = wrap(player.x + player.vx, canvas_width);
    player.y += player.vy;

    player.on_ground = false;
    player.ground_kind = None;
    if player.jumping {
        player.up_time += 1;
    }
    player.air_time = player.air_time.saturating_add(1);

    step
}

/// Wrap `x` into `[0, width)`.
pub fn wrap(x: f32, width: f32) -> f32 {
    if width <= 0.0 || !width.is_finite() {
        return x;
    }
    let wrapped = x.rem_euclid(width);
    // rem_euclid can round up to `width` for tiny negative inputs.
    if wrapped >= width { 0.0 } else { wrapped }
}

/// Signed distance from `from` to `to` on a circle of circumference `width`,
/// in `[-width / 2, width / 2]`.
pub fn wrapped_delta(from: f32, to: f32, width: f32) -> f32 {
    if width <= 0.0 {
        return to - from;
    }
    let d = (to - from).rem_euclid(width);
    if d > width / 2.0 { d - width } else { d }
}
