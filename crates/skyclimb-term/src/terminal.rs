use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::style::{self, Color as TermColor};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};

use skyclimb_core::host::{HostError, KeySource};
use skyclimb_core::surface::{Color, Surface};

/// Raw mode, alternate screen and hidden cursor for as long as this lives.
pub struct TerminalSession {
    release_events: bool,
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        // Constructed first so a failure below still restores the terminal.
        let mut session = Self {
            release_events: false,
        };
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;
        session.release_events = terminal::supports_keyboard_enhancement().unwrap_or(false);
        tracing::debug!(release_events = session.release_events, "Terminal session entered");
        Ok(session)
    }

    /// Whether the terminal can report key releases.
    pub fn release_events(&self) -> bool {
        self.release_events
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), cursor::Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Key delivery for one tick loop. While attached, the host forwards game
/// keys; terminals with enhancement support also report releases.
pub struct TerminalKeys {
    delivering: Arc<AtomicBool>,
    enhanced: bool,
}

impl TerminalKeys {
    pub fn new(enhanced: bool) -> Self {
        Self {
            delivering: Arc::new(AtomicBool::new(false)),
            enhanced,
        }
    }

    pub fn delivering(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.delivering)
    }
}

impl KeySource for TerminalKeys {
    fn attach(&mut self) -> Result<(), HostError> {
        if self.enhanced {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .map_err(|e| HostError::AttachFailed(e.to_string()))?;
        }
        self.delivering.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&mut self) {
        self.delivering.store(false, Ordering::SeqCst);
        if self.enhanced {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
    }
}

struct Label {
    col: usize,
    row: usize,
    text: String,
    color: Color,
}

/// A `Surface` backed by the terminal's character grid.
///
/// Each cell holds two vertically stacked pixels drawn with a half block, so
/// the pixel grid is `width x rows * 2`. The drawn area keeps the canvas
/// aspect ratio and is centered horizontally.
pub struct TerminalSurface<W: Write> {
    out: W,
    origin: usize,
    width: usize,
    height: usize,
    pixels: Vec<Color>,
    labels: Vec<Label>,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, cols: u16, rows: u16, aspect: f32) -> Self {
        let cols = usize::from(cols.max(1));
        let height = usize::from(rows.max(1)) * 2;
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        let width = ((height as f32 * aspect).round() as usize).clamp(1, cols);
        Self {
            out,
            origin: (cols - width) / 2,
            width,
            height,
            pixels: vec![Color::SKY; width * height],
            labels: Vec::new(),
        }
    }

    fn pixel(&self, x: usize, y: usize) -> Color {
        self.pixels[y * self.width + x]
    }

    /// Pixel span covered by `[start, start + len)`, clipped to `limit`.
    fn span(start: f32, len: f32, limit: usize) -> (usize, usize) {
        let lo = start.round().max(0.0);
        let hi = (start + len).round().max(lo + 1.0);
        let limit = limit as f32;
        (lo.min(limit) as usize, hi.min(limit) as usize)
    }
}

fn term_color(c: Color) -> TermColor {
    TermColor::Rgb {
        r: c.r,
        g: c.g,
        b: c.b,
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    fn clear(&mut self, color: Color) {
        self.pixels.fill(color);
        self.labels.clear();
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        if !(x.is_finite() && y.is_finite() && w > 0.0 && h > 0.0) {
            return;
        }
        let (x0, x1) = Self::span(x, w, self.width);
        let (y0, y1) = Self::span(y, h, self.height);
        for row in y0..y1 {
            self.pixels[row * self.width + x0..row * self.width + x1].fill(color);
        }
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
        if !(x.is_finite() && y.is_finite()) || x < 0.0 || y < 0.0 {
            return;
        }
        let col = x.round() as usize;
        let row = y.round() as usize / 2;
        if col < self.width && row < self.height / 2 {
            self.labels.push(Label {
                col,
                row,
                text: text.to_string(),
                color,
            });
        }
    }

    fn present(&mut self) -> Result<(), HostError> {
        for row in 0..self.height / 2 {
            queue!(self.out, cursor::MoveTo(self.origin as u16, row as u16))?;
            let mut last: Option<(Color, Color)> = None;
            for col in 0..self.width {
                let top = self.pixel(col, row * 2);
                let bottom = self.pixel(col, row * 2 + 1);
                if last != Some((top, bottom)) {
                    queue!(
                        self.out,
                        style::SetForegroundColor(term_color(top)),
                        style::SetBackgroundColor(term_color(bottom))
                    )?;
                    last = Some((top, bottom));
                }
                queue!(self.out, style::Print('\u{2580}'))?;
            }
        }

        for label in &self.labels {
            let room = self.width - label.col;
            let text: String = label.text.chars().take(room).collect();
            let behind = self.pixel(label.col, label.row * 2 + 1);
            queue!(
                self.out,
                cursor::MoveTo((self.origin + label.col) as u16, label.row as u16),
                style::SetForegroundColor(term_color(label.color)),
                style::SetBackgroundColor(term_color(behind)),
                style::Print(text)
            )?;
        }

        queue!(self.out, style::ResetColor)?;
        self.out.flush()?;
        Ok(())
    }
}
