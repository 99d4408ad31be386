// ============================
// userauth-backend/src/config/mod.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `USERAUTH_`-prefixed environment variables (`__` separates nested keys,
//! e.g. `USERAUTH_AUTH__TOKEN_SECRET`). There is no default token secret:
//! [`Settings::validate`] refuses to start without one.
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::google::GOOGLE_CERTS_URL;
use crate::auth::token::MIN_SECRET_LENGTH;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "USERAUTH_";

/// Config file read when no explicit path is given
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("auth.token_secret is required and must be at least {} characters", MIN_SECRET_LENGTH)]
    MissingTokenSecret,

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("invalid server address {0}")]
    InvalidAddress(String),

    #[error("auth.google_client_id must not be blank when set")]
    BlankGoogleClientId,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Listener settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Where the user directory lives
    #[serde(default)]
    pub storage: StorageSettings,
    /// Default tracing filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Secrets and auth knobs
    #[serde(default)]
    pub auth: AuthSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory holding `users.json`
    pub path: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Secret the login-token key is derived from
    #[serde(default)]
    pub token_secret: String,
    /// OAuth client id; Google sign-in is disabled when unset
    #[serde(default)]
    pub google_client_id: Option<String>,
    /// JWKS endpoint for Google ID tokens
    #[serde(default = "default_certs_url")]
    pub google_certs_url: String,
    /// Mark the login cookie `Secure`
    #[serde(default)]
    pub cookie_secure: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_certs_url() -> String {
    GOOGLE_CERTS_URL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            log_level: default_log_level(),
            auth: AuthSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            google_client_id: None,
            google_certs_url: default_certs_url(),
            cookie_secure: false,
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("token_secret", &"<redacted>")
            .field("google_client_id", &self.google_client_id)
            .field("google_certs_url", &self.google_certs_url)
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

impl ServerSettings {
    /// Socket address to bind
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific file and the environment, then validate
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Reject settings the service must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.chars().count() < MIN_SECRET_LENGTH {
            return Err(ConfigError::MissingTokenSecret);
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.log_level.clone()));
        }
        if self.server.port == 0 {
            return Err(ConfigError::InvalidAddress(format!(
                "{}:{}",
                self.server.host, self.server.port
            )));
        }
        self.server.bind_addr()?;
        if matches!(self.auth.google_client_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(ConfigError::BlankGoogleClientId);
        }
        Ok(())
    }
}
