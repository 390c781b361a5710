//! Process configuration.
//!
//! Loaded once at startup. A `.env` file in the working directory, if present,
//! fills in environment variables that are not already set. An optional TOML
//! file (named by `STOREFRONT_CONFIG`) provides the base, environment
//! variables override individual keys. The result is immutable for the life of
//! the process.
//!
//! ```toml
//! bind = "0.0.0.0:8000"
//! jwt_key = "change-me"
//! token_ttl_secs = 3600
//! webroot = "/srv/storefront"
//! max_in_flight = 1024
//! max_body_bytes = 8388608
//! request_timeout_secs = 30
//! log_format = "json"
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::dispatch::Limits;

/// One year.
const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Why configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("parsing {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },

    #[error("loading {path}: {source}")]
    Dotenv { path: PathBuf, source: dotenvy::Error },

    #[error("{name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("{key} {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("jwt_key must be set, in the config file or through JWT_KEY")]
    MissingKey,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format `{other}`, expected `pretty` or `json`")),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind: SocketAddr,
    /// HS256 key shared by token issuing and the guard.
    pub jwt_key: String,
    pub token_ttl_secs: u64,
    /// Directory holding `uploads/`.
    pub webroot: PathBuf,
    pub max_in_flight: usize,
    pub max_body_bytes: usize,
    /// `0` disables the per-request timeout.
    pub request_timeout_secs: u64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8000)),
            jwt_key: String::new(),
            token_ttl_secs: 3600,
            webroot: PathBuf::from("."),
            max_in_flight: 1024,
            max_body_bytes: 8 * 1024 * 1024,
            request_timeout_secs: 30,
            log_format: LogFormat::Pretty,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind", &self.bind)
            .field("jwt_key", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("webroot", &self.webroot)
            .field("max_in_flight", &self.max_in_flight)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    /// Loads the process configuration from `.env`, `STOREFRONT_CONFIG` (if
    /// set) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv(Path::new(".env"))?;
        let mut config = match std::env::var_os("STOREFRONT_CONFIG") {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_owned(), source })
    }

    /// Overrides keys from variables found through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = lookup("STOREFRONT_BIND") {
            self.bind = parse("STOREFRONT_BIND", &v)?;
        }
        if let Some(v) = lookup("JWT_KEY") {
            self.jwt_key = v;
        }
        if let Some(v) = lookup("STOREFRONT_TOKEN_TTL_SECS") {
            self.token_ttl_secs = parse("STOREFRONT_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = lookup("STOREFRONT_WEBROOT") {
            self.webroot = PathBuf::from(v);
        }
        if let Some(v) = lookup("STOREFRONT_MAX_IN_FLIGHT") {
            self.max_in_flight = parse("STOREFRONT_MAX_IN_FLIGHT", &v)?;
        }
        if let Some(v) = lookup("STOREFRONT_MAX_BODY_BYTES") {
            self.max_body_bytes = parse("STOREFRONT_MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("STOREFRONT_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse("STOREFRONT_REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("STOREFRONT_LOG_FORMAT") {
            self.log_format = parse("STOREFRONT_LOG_FORMAT", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_key.is_empty() {
            return Err(ConfigError::MissingKey);
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::Invalid { key: "max_in_flight", reason: "must be at least 1".into() });
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid { key: "max_body_bytes", reason: "must be at least 1".into() });
        }
        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.token_ttl_secs) {
            return Err(ConfigError::Invalid {
                key: "token_ttl_secs",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS}"),
            });
        }
        Ok(())
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_in_flight: self.max_in_flight,
            max_body_bytes: self.max_body_bytes,
            request_timeout: (self.request_timeout_secs > 0)
                .then(|| Duration::from_secs(self.request_timeout_secs)),
        }
    }
}

/// Loads `path` into the process environment without overriding variables
/// that are already set. A missing file is not an error.
pub fn load_dotenv(path: &Path) -> Result<(), ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(source) => Err(ConfigError::Dotenv { path: path.to_owned(), source }),
    }
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Env { name, reason: e.to_string() })
}
