//! Desk runtime configuration.
//!
//! Resolved once at startup and passed into the desk. Components never read the environment
//! themselves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

pub const ENV_API_URL: &str = "CLINIC_API_URL";
pub const ENV_API_TOKEN: &str = "CLINIC_API_TOKEN";
pub const ENV_PUSH_URL: &str = "CLINIC_PUSH_URL";
pub const ENV_POLL_SECS: &str = "CLINIC_POLL_SECS";
pub const ENV_TOAST_SECS: &str = "CLINIC_TOAST_SECS";
pub const ENV_STATS_ATTEMPTS: &str = "CLINIC_STATS_ATTEMPTS";
pub const ENV_TIMEOUT_SECS: &str = "CLINIC_TIMEOUT_SECS";
pub const ENV_LOCAL_DB: &str = "CLINIC_LOCAL_DB";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/";
const DEFAULT_POLL: Duration = Duration::from_secs(4);
const DEFAULT_NOTICE: Duration = Duration::from_secs(4);
const DEFAULT_MIN_LOADING: Duration = Duration::from_millis(500);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_STATS_ATTEMPTS: u32 = 2;

/// Configuration errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} cannot be empty")]
    Empty { name: &'static str },

    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Desk configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct DeskConfig {
    api_url: String,
    api_token: Option<String>,
    push_url: Option<String>,
    local_db: Option<PathBuf>,
    poll_interval: Duration,
    notice_lifetime: Duration,
    min_loading: Duration,
    request_timeout: Duration,
    stats_attempts: u32,
}

impl DeskConfig {
    /// Create a configuration with default timings.
    pub fn new(api_url: impl Into<String>) -> ConfigResult<Self> {
        let api_url = api_url.into();
        if api_url.trim().is_empty() {
            return Err(ConfigError::Empty { name: ENV_API_URL });
        }

        Ok(Self {
            api_url,
            api_token: None,
            push_url: None,
            local_db: None,
            poll_interval: DEFAULT_POLL,
            notice_lifetime: DEFAULT_NOTICE,
            min_loading: DEFAULT_MIN_LOADING,
            request_timeout: DEFAULT_TIMEOUT,
            stats_attempts: DEFAULT_STATS_ATTEMPTS,
        })
    }

    /// Resolve from process environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary key lookup. Unset or blank keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.into()))?;
        config.api_token = get(ENV_API_TOKEN);
        config.push_url = get(ENV_PUSH_URL);
        config.local_db = get(ENV_LOCAL_DB).map(PathBuf::from);

        if let Some(raw) = get(ENV_POLL_SECS) {
            config.poll_interval = Duration::from_secs(positive(ENV_POLL_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_TOAST_SECS) {
            config.notice_lifetime = Duration::from_secs(positive(ENV_TOAST_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            config.request_timeout = Duration::from_secs(positive(ENV_TIMEOUT_SECS, &raw)?);
        }
        if let Some(raw) = get(ENV_STATS_ATTEMPTS) {
            let attempts = positive(ENV_STATS_ATTEMPTS, &raw)?;
            config.stats_attempts = u32::try_from(attempts).map_err(|_| ConfigError::InvalidNumber {
                name: ENV_STATS_ATTEMPTS,
                value: raw.clone(),
            })?;
        }

        Ok(config)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_push_url(mut self, url: impl Into<String>) -> Self {
        self.push_url = Some(url.into());
        self
    }

    pub fn with_local_db(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_db = Some(path.into());
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> ConfigResult<Self> {
        self.poll_interval = nonzero(ENV_POLL_SECS, interval)?;
        Ok(self)
    }

    pub fn with_notice_lifetime(mut self, lifetime: Duration) -> ConfigResult<Self> {
        self.notice_lifetime = nonzero(ENV_TOAST_SECS, lifetime)?;
        Ok(self)
    }

    /// Minimum time a user-visible loading indicator stays up. Zero disables it.
    pub fn with_min_loading(mut self, duration: Duration) -> Self {
        self.min_loading = duration;
        self
    }

    pub fn with_stats_attempts(mut self, attempts: u32) -> ConfigResult<Self> {
        if attempts == 0 {
            return Err(ConfigError::Zero {
                name: ENV_STATS_ATTEMPTS,
            });
        }
        self.stats_attempts = attempts;
        Ok(self)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn push_url(&self) -> Option<&str> {
        self.push_url.as_deref()
    }

    pub fn local_db(&self) -> Option<&Path> {
        self.local_db.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn notice_lifetime(&self) -> Duration {
        self.notice_lifetime
    }

    pub fn min_loading(&self) -> Duration {
        self.min_loading
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn stats_attempts(&self) -> u32 {
        self.stats_attempts
    }
}

fn positive(name: &'static str, raw: &str) -> ConfigResult<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        })?;
    if value == 0 {
        return Err(ConfigError::Zero { name });
    }
    Ok(value)
}

fn nonzero(name: &'static str, duration: Duration) -> ConfigResult<Duration> {
    if duration.is_zero() {
        return Err(ConfigError::Zero { name });
    }
    Ok(duration)
}
