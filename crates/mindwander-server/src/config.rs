//! Server configuration.

use anyhow::Result;
use mindwander_core::SessionConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Secret used when no configuration provides one.
pub const DEFAULT_ADMIN_SECRET: &str = "1234";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_admin_secret")]
    pub admin_secret: String,
    /// Milliseconds a connection may stay unclassified before counting as a participant.
    #[serde(default = "default_classification_grace_ms")]
    pub classification_grace_ms: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_admin_secret() -> String {
    DEFAULT_ADMIN_SECRET.to_string()
}

fn default_classification_grace_ms() -> u64 {
    5000
}

fn default_broadcast_capacity() -> usize {
    64
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            admin_secret: default_admin_secret(),
            classification_grace_ms: default_classification_grace_ms(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from `config/default.toml`, then the user config dir, or fall back to defaults.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from("config/default.toml");
        if local.exists() {
            return Self::load_from(&local);
        }

        if let Some(user) = dirs::config_dir().map(|d| d.join("mindwander").join("config.toml")) {
            if user.exists() {
                return Self::load_from(&user);
            }
        }

        Ok(Config::default())
    }

    pub fn uses_default_secret(&self) -> bool {
        self.admin_secret == DEFAULT_ADMIN_SECRET
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            admin_secret: self.admin_secret.clone(),
            classification_grace: Duration::from_millis(self.classification_grace_ms),
            broadcast_capacity: self.broadcast_capacity,
        }
    }
}
