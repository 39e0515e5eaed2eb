use skyclimb_core::host::HostError;

#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Read(String),
    /// The TOML did not match the expected shape.
    Parse(String),
    /// The values parsed but break an engine invariant.
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read error: {e}"),
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum EngineError {
    Config(ConfigError),
    Host(HostError),
    Snapshot(String),
    /// The tick loop task panicked or was cancelled before reporting back.
    Loop(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Host(e) => write!(f, "host: {e}"),
            Self::Snapshot(e) => write!(f, "snapshot encode error: {e}"),
            Self::Loop(e) => write!(f, "tick loop: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Host(e) => Some(e),
            Self::Snapshot(_) | Self::Loop(_) => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<HostError> for EngineError {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_layer() {
        let e: EngineError = ConfigError::Invalid("min_gap > max_gap".to_string()).into();
        assert_eq!(e.to_string(), "config: invalid config: min_gap > max_gap");
    }

    #[test]
    fn source_chains_to_host_error() {
        use std::error::Error;
        let e: EngineError = HostError::AttachFailed("busy".to_string()).into();
        let source = e.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("failed to attach key listeners: busy"));
    }
}
