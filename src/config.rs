//! Server configuration
//!
//! Read from `CHATROOM_*` environment variables, falling back to defaults.

use std::time::Duration;

use thiserror::Error;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Channels created at startup
pub const DEFAULT_CHANNELS: [&str; 3] = ["main", "off-topic", "new-members"];

/// Configuration errors (fatal at startup)
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Variable is set but cannot be parsed
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    /// A capacity that must be positive was zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Chatroom server configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Address to listen on
    pub addr: String,
    /// Upper bound on registered sessions
    pub max_sessions: usize,
    /// Upper bound on channel count
    pub max_channels: usize,
    /// Channels created at startup
    pub default_channels: Vec<String>,
    /// Per-channel log bound (None = unbounded)
    pub history_limit: Option<usize>,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
    /// Upper bound on a single WebSocket frame write
    pub write_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            max_sessions: 10,
            max_channels: 10,
            default_channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            history_limit: None,
            outbound_buffer: 32,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ChatConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("CHATROOM_ADDR") {
            config.addr = addr;
        }
        if let Some(value) = lookup("CHATROOM_MAX_SESSIONS") {
            config.max_sessions = parse_positive("CHATROOM_MAX_SESSIONS", &value)?;
        }
        if let Some(value) = lookup("CHATROOM_MAX_CHANNELS") {
            config.max_channels = parse_positive("CHATROOM_MAX_CHANNELS", &value)?;
        }
        if let Some(value) = lookup("CHATROOM_CHANNELS") {
            config.default_channels = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("CHATROOM_HISTORY_LIMIT") {
            config.history_limit = Some(parse_positive("CHATROOM_HISTORY_LIMIT", &value)?);
        }
        if let Some(value) = lookup("CHATROOM_OUTBOUND_BUFFER") {
            config.outbound_buffer = parse_positive("CHATROOM_OUTBOUND_BUFFER", &value)?;
        }
        if let Some(value) = lookup("CHATROOM_WRITE_TIMEOUT_SECS") {
            let secs = parse_positive("CHATROOM_WRITE_TIMEOUT_SECS", &value)?;
            config.write_timeout = Duration::from_secs(secs as u64);
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<usize, ConfigError> {
    let parsed: usize = value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })?;
    if parsed == 0 {
        return Err(ConfigError::Zero(key));
    }
    Ok(parsed)
}
