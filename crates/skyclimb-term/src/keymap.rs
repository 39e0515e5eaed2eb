use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use skyclimb_tower::scheduler::LoopCommand;

/// Hold assumed after a lone press, long enough to cover the OS repeat delay.
const RELEASE_AFTER_PRESS: Duration = Duration::from_millis(550);
/// Hold assumed between auto-repeats.
const RELEASE_AFTER_REPEAT: Duration = Duration::from_millis(120);

/// What a terminal key means to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKey {
    /// Forwarded to the engine under this key code.
    Game(&'static str),
    Restart,
    Quit,
    Other,
}

pub fn classify(key: &KeyEvent) -> HostKey {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return HostKey::Quit;
    }
    match key.code {
        KeyCode::Left => HostKey::Game("ArrowLeft"),
        KeyCode::Right => HostKey::Game("ArrowRight"),
        KeyCode::Up => HostKey::Game("ArrowUp"),
        KeyCode::Enter => HostKey::Game("Enter"),
        KeyCode::Char(' ') => HostKey::Game("Space"),
        KeyCode::Char('a' | 'A') => HostKey::Game("KeyA"),
        KeyCode::Char('d' | 'D') => HostKey::Game("KeyD"),
        KeyCode::Char('w' | 'W') => HostKey::Game("KeyW"),
        KeyCode::Char('r' | 'R') => HostKey::Restart,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => HostKey::Quit,
        _ => HostKey::Other,
    }
}

struct Held {
    last_seen: Instant,
    repeating: bool,
}

/// Turns terminal key events into engine key down/up commands.
///
/// Terminals without release reporting only send presses (auto-repeat
/// included), so releases are synthesized once a key stops repeating.
pub struct KeyTracker {
    reports_release: bool,
    held: HashMap<&'static str, Held>,
}

impl KeyTracker {
    pub fn new(reports_release: bool) -> Self {
        Self {
            reports_release,
            held: HashMap::new(),
        }
    }

    pub fn on_key(
        &mut self,
        code: &'static str,
        kind: KeyEventKind,
        now: Instant,
    ) -> Option<LoopCommand> {
        match kind {
            KeyEventKind::Release => self
                .held
                .remove(code)
                .map(|_| LoopCommand::KeyUp(code.to_string())),
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if let Some(held) = self.held.get_mut(code) {
                    held.last_seen = now;
                    held.repeating = true;
                    return None;
                }
                self.held.insert(
                    code,
                    Held {
                        last_seen: now,
                        repeating: false,
                    },
                );
                Some(LoopCommand::KeyDown(code.to_string()))
            },
        }
    }

    /// Synthesized releases for keys that went quiet. Empty when the
    /// terminal reports releases itself.
    pub fn expire(&mut self, now: Instant) -> Vec<LoopCommand> {
        if self.reports_release {
            return Vec::new();
        }
        let mut expired: Vec<&'static str> = self
            .held
            .iter()
            .filter(|(_, held)| {
                let hold = if held.repeating {
                    RELEASE_AFTER_REPEAT
                } else {
                    RELEASE_AFTER_PRESS
                };
                now.saturating_duration_since(held.last_seen) > hold
            })
            .map(|(code, _)| *code)
            .collect();
        expired.sort_unstable();
        for code in &expired {
            self.held.remove(code);
        }
        expired
            .into_iter()
            .map(|code| LoopCommand::KeyUp(code.to_string()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}
