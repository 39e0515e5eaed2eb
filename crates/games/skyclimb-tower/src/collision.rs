use crate::config::PhysicsConfig;
use crate::level_gen::{Platform, PlatformKind};
use crate::physics::{Player, Step, wrapped_delta};

/// A resolved contact between the player's feet and a platform top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub platform_id: u64,
    pub kind: PlatformKind,
    pub platform_y: f32,
    /// The player arrived from the air this tick (as opposed to standing).
    pub landed: bool,
    /// Player center minus platform center, shortest way around the canvas.
    pub center_offset: f32,
}

impl Contact {
    pub fn bounced(&self) -> bool {
        self.kind == PlatformKind::Bounce
    }
}

fn overlaps(player_x: f32, half_width: f32, platform: &Platform, canvas_width: f32) -> bool {
    [0.0, -canvas_width, canvas_width].into_iter().any(|shift| {
        let x = player_x + shift;
        x - half_width < platform.right() && x + half_width > platform.x
    })
}

/// Detect and apply a landing for the tick described by `step`.
///
/// Only downward crossings of a platform top count, so jumping up through a
/// platform never snaps. When several platforms qualify, the highest wins
/// (lowest id on a tie). Returns `None` when nothing supports the player,
/// which leaves it falling.
pub fn resolve(
    player: &mut Player,
    step: Step,
    platforms: &[Platform],
    physics: &PhysicsConfig,
    canvas_width: f32,
) -> Option<Contact> {
    if player.vy > 0.0 {
        return None;
    }
    let half_width = physics.player_width / 2.0;

    let platform = platforms
        .iter()
        .filter(|p| step.prev_y >= p.y && p.y >= player.y)
        .filter(|p| overlaps(player.x, half_width, p, canvas_width))
        .fold(None::<&Platform>, |best, p| match best {
            Some(b) if b.y > p.y || (b.y == p.y && b.id <= p.id) => Some(b),
            _ => Some(p),
        })?;

    player.y = platform.y;
    player.jumping = false;
    player.air_time = 0;
    match platform.kind {
        PlatformKind::Bounce => {
            player.vy = physics.bounce_impulse;
            player.on_ground = false;
            player.ground_kind = None;
        },
        PlatformKind::Normal | PlatformKind::Slippery | PlatformKind::Moving => {
            player.vy = 0.0;
            player.on_ground = true;
            player.ground_kind = Some(platform.kind);
        },
    }

    Some(Contact {
        platform_id: platform.id,
        kind: platform.kind,
        platform_y: platform.y,
        landed: !step.was_grounded,
        center_offset: wrapped_delta(platform.center_x(), player.x, canvas_width),
    })
}
