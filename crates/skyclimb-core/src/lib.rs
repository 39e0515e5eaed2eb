pub mod host;
pub mod points;
pub mod surface;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::host::{GameHost, HostError, KeySource};
    use crate::surface::{Color, Surface};

    /// Everything a `RecordingHost` has been told.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    pub struct HostLog {
        pub completed_runs: Vec<(u64, u64)>,
        pub exits: usize,
    }

    /// A `GameHost` that records callbacks into a shared log, so tests can
    /// inspect them after handing the host to an engine.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingHost {
        log: Arc<Mutex<HostLog>>,
    }

    impl RecordingHost {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of the log so far.
        pub fn log(&self) -> HostLog {
            self.log.lock().map(|l| l.clone()).unwrap_or_default()
        }
    }

    impl GameHost for RecordingHost {
        fn run_complete(&mut self, final_score: u64, awarded_points: u64) {
            if let Ok(mut log) = self.log.lock() {
                log.completed_runs.push((final_score, awarded_points));
            }
        }

        fn exit_requested(&mut self) {
            if let Ok(mut log) = self.log.lock() {
                log.exits += 1;
            }
        }
    }

    /// A single recorded drawing command.
    #[derive(Debug, Clone, PartialEq)]
    pub enum DrawCommand {
        Clear(Color),
        Rect {
            x: f32,
            y: f32,
            w: f32,
            h: f32,
            color: Color,
        },
        Text {
            x: f32,
            y: f32,
            text: String,
            color: Color,
        },
    }

    /// A `Surface` that keeps the commands of the most recent frame.
    #[derive(Debug, Clone)]
    pub struct RecordingSurface {
        pub width: f32,
        pub height: f32,
        pub commands: Vec<DrawCommand>,
        pub frames_presented: usize,
    }

    impl RecordingSurface {
        pub fn new(width: f32, height: f32) -> Self {
            Self {
                width,
                height,
                commands: Vec::new(),
                frames_presented: 0,
            }
        }

        pub fn rects(&self) -> impl Iterator<Item = &DrawCommand> {
            self.commands
                .iter()
                .filter(|c| matches!(c, DrawCommand::Rect { .. }))
        }

        pub fn texts(&self) -> Vec<&str> {
            self.commands
                .iter()
                .filter_map(|c| match c {
                    DrawCommand::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect()
        }

        pub fn has_text_containing(&self, needle: &str) -> bool {
            self.texts().iter().any(|t| t.contains(needle))
        }
    }

    impl Surface for RecordingSurface {
        fn size(&self) -> (f32, f32) {
            (self.width, self.height)
        }

        fn clear(&mut self, color: Color) {
            self.commands.clear();
            self.commands.push(DrawCommand::Clear(color));
        }

        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
            self.commands.push(DrawCommand::Rect { x, y, w, h, color });
        }

        fn draw_text(&mut self, x: f32, y: f32, text: &str, color: Color) {
            self.commands.push(DrawCommand::Text {
                x,
                y,
                text: text.to_string(),
                color,
            });
        }

        fn present(&mut self) -> Result<(), HostError> {
            self.frames_presented += 1;
            Ok(())
        }
    }

    /// A `KeySource` that counts attach/detach calls through shared counters.
    #[derive(Debug, Default, Clone)]
    pub struct CountingKeySource {
        pub attached: Arc<AtomicUsize>,
        pub detached: Arc<AtomicUsize>,
        pub fail_attach: bool,
    }

    impl CountingKeySource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                fail_attach: true,
                ..Self::default()
            }
        }

        pub fn attach_count(&self) -> usize {
            self.attached.load(Ordering::SeqCst)
        }

        pub fn detach_count(&self) -> usize {
            self.detached.load(Ordering::SeqCst)
        }

        /// Listeners currently installed (attaches not yet matched by a detach).
        pub fn live(&self) -> usize {
            self.attach_count().saturating_sub(self.detach_count())
        }
    }

    impl KeySource for CountingKeySource {
        fn attach(&mut self) -> Result<(), HostError> {
            if self.fail_attach {
                return Err(HostError::AttachFailed("refused by test".to_string()));
            }
            self.attached.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn detach(&mut self) {
            self.detached.fetch_add(1, Ordering::SeqCst);
        }
    }
}
