use serde::{Deserialize, Serialize};

use crate::host::HostError;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear blend toward `other`; `t` is clamped to `[0, 1]`.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }

    pub const SKY: Color = Color::rgb(24, 32, 56);
    pub const PLAYER: Color = Color::rgb(255, 195, 18);
    pub const TEXT: Color = Color::rgb(236, 240, 241);
    pub const ACCENT: Color = Color::rgb(255, 107, 175);

    /// Platform colors, indexed the same way as the engine's platform kinds:
    /// normal, bounce, slippery, moving, checkpoint.
    pub const PLATFORMS: &[Color] = &[
        Color::rgb(46, 213, 115),  // Green
        Color::rgb(255, 148, 77),  // Orange
        Color::rgb(83, 152, 255),  // Blue
        Color::rgb(130, 88, 255),  // Purple
        Color::rgb(78, 205, 196),  // Teal
    ];
}

impl Default for Color {
    fn default() -> Self {
        Self::TEXT
    }
}

/// A fixed-size 2D drawing target.
///
/// Coordinates are logical canvas pixels with the origin at the top-left and
/// y growing downward. The engine issues a full set of commands once per tick
/// and ends the frame with `present`; it never creates or destroys surfaces.
pub trait Surface {
    /// Logical (width, height) of the canvas.
    fn size(&self) -> (f32, f32);

    fn clear(&mut self, color: Color);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color);

    /// Flush the frame. Hosts that draw immediately can keep the default.
    fn present(&mut self) -> Result<(), HostError> {
        Ok(())
    }
}
