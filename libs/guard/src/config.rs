//! Configuration for the login guard
//!
//! Settings are assembled from an optional TOML file and `AUTH__*`
//! environment variables, the latter taking precedence.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{GuardError, GuardResult};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config/auth.toml";

/// Longest accepted ban (100 years)
const MAX_BAN_DURATION: u64 = 100 * 365 * 24 * 60 * 60;

/// Brute-force protection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Number of failed attempts before an IP is banned
    pub ban_after: u32,
    /// Ban duration in seconds
    pub ban_duration: u64,
    /// Proxies allowed to supply an `X-Forwarded-For` value
    pub trusted_proxies: Vec<String>,
    /// Seconds between two expiry sweeps, 0 disables the sweep
    pub sweep_interval: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            ban_after: 4,
            ban_duration: 1800, // 30 minutes
            trusted_proxies: Vec::new(),
            sweep_interval: 0,
        }
    }
}

impl SecurityConfig {
    /// Check that the values can drive a ban guard
    pub fn validate(&self) -> GuardResult<()> {
        if self.ban_after == 0 {
            return Err(GuardError::Configuration(
                "security.ban_after must be at least 1".to_string(),
            ));
        }

        if self.ban_duration > MAX_BAN_DURATION {
            return Err(GuardError::Configuration(format!(
                "security.ban_duration must be at most {} seconds",
                MAX_BAN_DURATION
            )));
        }

        Ok(())
    }
}

/// File locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Where the ban state is persisted
    pub ban_file: PathBuf,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            ban_file: PathBuf::from("data/ipbans.json"),
        }
    }
}

/// Login credentials checked by the login service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub login: String,
    /// Argon2 PHC string
    pub hash: String,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Complete settings tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub security: SecurityConfig,
    pub resource: ResourceConfig,
    pub credentials: CredentialsConfig,
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from `path` (if it exists) and the environment
    ///
    /// # Environment Variables
    /// - `AUTH__SECURITY__BAN_AFTER`: failures before a ban (default: 4)
    /// - `AUTH__SECURITY__BAN_DURATION`: ban duration in seconds (default: 1800)
    /// - `AUTH__SECURITY__TRUSTED_PROXIES`: comma separated proxy addresses
    /// - `AUTH__SECURITY__SWEEP_INTERVAL`: expiry sweep period in seconds (default: 0)
    /// - `AUTH__RESOURCE__BAN_FILE`: ban file path (default: "data/ipbans.json")
    /// - `AUTH__CREDENTIALS__LOGIN` / `AUTH__CREDENTIALS__HASH`
    /// - `AUTH__SERVER__BIND_ADDR`: listen address (default: "0.0.0.0:3000")
    pub fn load(path: impl AsRef<Path>) -> GuardResult<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("AUTH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.trusted_proxies")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the file named by `AUTH_CONFIG`, falling back to
    /// [`DEFAULT_CONFIG_PATH`]
    pub fn from_env() -> GuardResult<Self> {
        let path =
            std::env::var("AUTH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    pub fn validate(&self) -> GuardResult<()> {
        self.security.validate()
    }
}
