//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_PORT=9090  TALLY_DB_PATH=/var/lib/tally/tally.db             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, else $TALLY_CONFIG, else                          │
//! │     ~/.config/tally/tally.toml (Linux)                                 │
//! │     ~/Library/Application Support/com.tally.pos/tally.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [database]
//! path = "./tally.db"
//! max_connections = 5
//!
//! [auth]
//! session_secret = "change-me"
//! session_lifetime_secs = 28800
//! cookie_name = "tally_session"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Development secret used when none is configured. A warning is logged
/// whenever it is in effect.
const DEV_SESSION_SECRET: &str = "tally-dev-secret-change-me";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    InvalidEnv { name: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    /// Returns `bind_addr:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "pos")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// HMAC key for session tokens.
    #[serde(default = "default_session_secret")]
    pub session_secret: String,

    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: i64,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
}

fn default_session_secret() -> String {
    DEV_SESSION_SECRET.to_string()
}

fn default_session_lifetime() -> i64 {
    8 * 60 * 60
}

fn default_cookie_name() -> String {
    "tally_session".to_string()
}

impl Default for AuthSettings {
    fn default() -> Self {
        AuthSettings {
            session_secret: default_session_secret(),
            session_lifetime_secs: default_session_lifetime(),
            cookie_name: default_cookie_name(),
        }
    }
}

// =============================================================================
// ServerConfig
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub auth: AuthSettings,
}

impl ServerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, `TALLY_CONFIG`, platform config dir)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let explicit = config_path
            .or_else(|| std::env::var_os("TALLY_CONFIG").map(PathBuf::from));

        let mut config = match explicit {
            // An explicitly named file must exist.
            Some(path) => Self::from_file(&path)?,
            None => match Self::default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                Some(path) => {
                    debug!(?path, "Config file not found, using defaults");
                    Self::default()
                }
                None => Self::default(),
            },
        };

        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;

        if config.auth.session_secret == DEV_SESSION_SECRET {
            warn!("Using the built-in development session secret; set TALLY_SESSION_SECRET");
        }

        Ok(config)
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!(?path, "Loading config from file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.auth.session_secret.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.session_secret must not be empty".into()));
        }
        if self.auth.session_lifetime_secs <= 0 {
            return Err(ConfigError::Invalid(
                "auth.session_lifetime_secs must be positive".into(),
            ));
        }
        if self.auth.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("auth.cookie_name must not be empty".into()));
        }
        Ok(())
    }

    /// Applies environment variable overrides read through `lookup`.
    ///
    /// Unparseable numbers are errors rather than silently ignored.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(addr) = lookup("TALLY_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = lookup("TALLY_PORT") {
            self.server.port = parse_env("TALLY_PORT", &port)?;
            debug!(port = self.server.port, "Overriding port from environment");
        }
        if let Some(path) = lookup("TALLY_DB_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = lookup("TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("TALLY_DB_MAX_CONNECTIONS", &max)?;
        }
        if let Some(secret) = lookup("TALLY_SESSION_SECRET") {
            self.auth.session_secret = secret;
        }
        if let Some(lifetime) = lookup("TALLY_SESSION_LIFETIME_SECS") {
            self.auth.session_lifetime_secs = parse_env("TALLY_SESSION_LIFETIME_SECS", &lifetime)?;
        }
        Ok(())
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "pos")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
