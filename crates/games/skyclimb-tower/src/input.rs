use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use skyclimb_core::host::{HostError, KeySource};

/// Semantic actions the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Jump,
}

impl Action {
    /// Map a raw key code to an action. Several physical keys alias each action.
    pub fn from_key(code: &str) -> Option<Action> {
        match code {
            "ArrowLeft" | "KeyA" => Some(Action::Left),
            "ArrowRight" | "KeyD" => Some(Action::Right),
            "Space" | "Enter" | "ArrowUp" | "KeyW" => Some(Action::Jump),
            _ => None,
        }
    }
}

/// The sampled actions for a single tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFrame {
    pub left: bool,
    pub right: bool,
    /// Jump is held (level-triggered).
    pub jump: bool,
    /// Jump went down since the previous sample (edge-triggered).
    pub jump_pressed: bool,
}

/// What the host should do with the native key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Mapped key; suppress the host's default handling.
    Consumed,
    Passthrough,
}

/// Tracks held keys between ticks and reduces them to an `ActionFrame`.
#[derive(Debug)]
pub struct InputSampler {
    keys_down: HashSet<String>,
    jump_edge: bool,
    enabled: bool,
    prevent_default: bool,
}

impl InputSampler {
    pub fn new(prevent_default: bool) -> Self {
        Self {
            keys_down: HashSet::new(),
            jump_edge: false,
            enabled: false,
            prevent_default,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable gameplay input. Held keys are forgotten on every
    /// toggle, so a key pressed while disabled never shows up as held later.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            tracing::debug!(enabled, "Input sampler toggled");
        }
        self.enabled = enabled;
        self.keys_down.clear();
        self.jump_edge = false;
    }

    pub fn key_down(&mut self, code: &str) -> KeyDisposition {
        let Some(action) = Action::from_key(code) else {
            return KeyDisposition::Passthrough;
        };
        if self.enabled && self.keys_down.insert(code.to_string()) && action == Action::Jump {
            self.jump_edge = true;
        }
        self.disposition()
    }

    /// Releases are honored even while disabled.
    pub fn key_up(&mut self, code: &str) -> KeyDisposition {
        if Action::from_key(code).is_none() {
            return KeyDisposition::Passthrough;
        }
        self.keys_down.remove(code);
        self.disposition()
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.keys_down
            .iter()
            .any(|code| Action::from_key(code) == Some(action))
    }

    /// Read the current action set and consume the jump edge.
    pub fn sample(&mut self) -> ActionFrame {
        let frame = ActionFrame {
            left: self.is_held(Action::Left),
            right: self.is_held(Action::Right),
            jump: self.is_held(Action::Jump),
            jump_pressed: self.jump_edge,
        };
        self.jump_edge = false;
        frame
    }

    fn disposition(&self) -> KeyDisposition {
        if self.prevent_default {
            KeyDisposition::Consumed
        } else {
            KeyDisposition::Passthrough
        }
    }
}

/// Holds a key source's listeners for as long as the guard lives.
///
/// Listeners are attached in `acquire` and detached in `Drop`, which also
/// covers early returns and aborted tasks.
pub struct ListenerGuard<K: KeySource> {
    source: Option<K>,
}

impl<K: KeySource> ListenerGuard<K> {
    pub fn acquire(mut source: K) -> Result<Self, (K, HostError)> {
        match source.attach() {
            Ok(()) => {
                tracing::debug!("Key listeners attached");
                Ok(Self {
                    source: Some(source),
                })
            },
            Err(e) => Err((source, e)),
        }
    }

    /// Detach now and hand the source back.
    pub fn into_inner(mut self) -> Option<K> {
        let mut source = self.source.take()?;
        source.detach();
        tracing::debug!("Key listeners detached");
        Some(source)
    }
}

impl<K: KeySource> Drop for ListenerGuard<K> {
    fn drop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.detach();
            tracing::debug!("Key listeners detached");
        }
    }
}
