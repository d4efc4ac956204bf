//! Server settings read from the environment.

use std::time::Duration;

use tagrush_room::RoomConfig;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// An environment variable was set to something unparsable.
#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Everything the `tagrush-server` binary needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `PORT` and the `TAGRUSH_*` variables. Unset variables keep
    /// their defaults; set but malformed ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(port) = parse(&lookup, "PORT")? {
            config.port = port;
        }
        if let Some(secs) = parse::<u64>(&lookup, "TAGRUSH_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(score) = parse(&lookup, "TAGRUSH_WIN_SCORE")? {
            config.room.win_score = score;
        }
        if let Some(secs) = parse::<u64>(&lookup, "TAGRUSH_ROUND_TIMEOUT_SECS")? {
            config.room.round_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64>(&lookup, "TAGRUSH_START_DELAY_SECS")? {
            config.room.start_delay = Duration::from_secs(secs);
        }

        config.room = config.room.validated();
        Ok(config)
    }

    /// Listen on every interface.
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError { key, value: raw })
}
