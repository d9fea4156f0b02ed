//! Application configuration, loaded once at startup.

use std::env;
use std::time::Duration;

use hint_channel::client::{Backoff, ReconnectPolicy};
use tracing::Level;

/// Default silence window. The widest of the deployed configurations; short
/// demo setups override it down to a few seconds.
const DEFAULT_SILENCE_MS: u64 = 12_000;
/// Trimmed transcript length a dispatch must exceed.
const DEFAULT_MIN_TRANSCRIPT_CHARS: usize = 5;
/// Cadence of the silence scheduler.
const DEFAULT_TICK_MS: u64 = 1_000;

const DEFAULT_RECONNECT_INITIAL_MS: u64 = 500;
const DEFAULT_RECONNECT_MAX_MS: u64 = 30_000;
const DEFAULT_RECONNECT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration for the coaching client.
#[derive(Debug, Clone)]
pub struct Config {
    /// Websocket base URL of the hint service; the session id is appended
    /// as a path segment.
    pub socket_url: String,
    /// Base URL of the code executor.
    pub runner_url: String,
    pub silence_threshold: Duration,
    pub min_transcript_chars: usize,
    pub tick_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables (a `.env` file is
    /// honored if present).
    ///
    /// *   `COACH_SOCKET_URL`: hint-service websocket base URL. Required.
    /// *   `COACH_RUNNER_URL`: code-executor base URL. Required.
    /// *   `COACH_SILENCE_MS`: (Optional) silence window in milliseconds.
    ///     Defaults to 12000.
    /// *   `COACH_MIN_TRANSCRIPT_CHARS`: (Optional) transcript length a
    ///     dispatch must exceed. Defaults to 5.
    /// *   `COACH_TICK_MS`: (Optional) scheduler cadence in milliseconds.
    ///     Defaults to 1000.
    /// *   `COACH_RECONNECT`: (Optional) `off` or `backoff`. Defaults to
    ///     `off`.
    /// *   `COACH_RECONNECT_INITIAL_MS`, `COACH_RECONNECT_MAX_MS`,
    ///     `COACH_RECONNECT_MAX_ATTEMPTS`: (Optional) backoff shape.
    ///     Defaults: 500, 30000, 10.
    /// *   `RUST_LOG`: (Optional) logging level. Defaults to `INFO`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let socket_url = env::var("COACH_SOCKET_URL")
            .map_err(|_| ConfigError::MissingVar("COACH_SOCKET_URL".to_string()))?;
        let runner_url = env::var("COACH_RUNNER_URL")
            .map_err(|_| ConfigError::MissingVar("COACH_RUNNER_URL".to_string()))?;

        let silence_threshold =
            Duration::from_millis(parse_var("COACH_SILENCE_MS", DEFAULT_SILENCE_MS)?);
        let min_transcript_chars =
            parse_var("COACH_MIN_TRANSCRIPT_CHARS", DEFAULT_MIN_TRANSCRIPT_CHARS)?;
        let tick_interval = Duration::from_millis(parse_var("COACH_TICK_MS", DEFAULT_TICK_MS)?);

        let reconnect_raw = env::var("COACH_RECONNECT").unwrap_or_else(|_| "off".to_string());
        let reconnect = match reconnect_raw.to_lowercase().as_str() {
            "off" => ReconnectPolicy::None,
            "backoff" => ReconnectPolicy::Backoff(Backoff {
                initial: Duration::from_millis(parse_var(
                    "COACH_RECONNECT_INITIAL_MS",
                    DEFAULT_RECONNECT_INITIAL_MS,
                )?),
                max: Duration::from_millis(parse_var(
                    "COACH_RECONNECT_MAX_MS",
                    DEFAULT_RECONNECT_MAX_MS,
                )?),
                max_attempts: parse_var(
                    "COACH_RECONNECT_MAX_ATTEMPTS",
                    DEFAULT_RECONNECT_MAX_ATTEMPTS,
                )?,
            }),
            _ => {
                return Err(ConfigError::InvalidValue(
                    "COACH_RECONNECT".to_string(),
                    format!("'{reconnect_raw}' is not 'off' or 'backoff'"),
                ));
            }
        };

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{log_level_str}' is not a valid log level"),
            )
        })?;

        Ok(Self {
            socket_url,
            runner_url,
            silence_threshold,
            min_transcript_chars,
            tick_interval,
            reconnect,
            log_level,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw)),
        Err(_) => Ok(default),
    }
}
