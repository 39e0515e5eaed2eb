/// Callbacks the surrounding application provides to a running game.
///
/// The engine reports results through this trait and never persists or
/// transmits them itself.
pub trait GameHost: Send {
    /// Called exactly once per completed run.
    fn run_complete(&mut self, final_score: u64, awarded_points: u64);

    /// Called when the player asks to leave the game (e.g. "back to menu").
    /// Must be safe to invoke in any run state.
    fn exit_requested(&mut self);
}

/// A host that ignores every callback.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl GameHost for NullHost {
    fn run_complete(&mut self, _final_score: u64, _awarded_points: u64) {}

    fn exit_requested(&mut self) {}
}

/// Registration point for raw keyboard listeners.
///
/// `attach` installs whatever the platform needs to start delivering key
/// events; `detach` removes it. Callers pair the two through a scoped guard
/// rather than calling them by hand.
pub trait KeySource: Send {
    fn attach(&mut self) -> Result<(), HostError>;

    fn detach(&mut self);
}

#[derive(Debug)]
pub enum HostError {
    /// Keyboard listeners could not be installed.
    AttachFailed(String),
    /// The drawing surface failed to flush.
    Surface(String),
}

impl std::fmt::Display for HostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AttachFailed(e) => write!(f, "failed to attach key listeners: {e}"),
            Self::Surface(e) => write!(f, "surface error: {e}"),
        }
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        Self::Surface(e.to_string())
    }
}
