//! Configuration system for WebCall.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WEBCALL_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/webcall/config.toml
//!   3. ~/.config/webcall/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebcallConfig {
    pub network: NetworkConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// HTTP port. TLS is terminated in front of this listener.
    pub http_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Cookie name for ordinary callees.
    pub cookie_name: String,
    /// urlID prefix of the always-on account class that gets one cookie per id.
    pub reserved_prefix: String,
    /// Credential store bucket holding `PwIdCombo` records.
    pub credential_bucket: String,
    /// Bucket holding registered accounts, keyed by callee id.
    pub account_bucket: String,
    /// JSON file backing the credential store. Empty = in-memory only.
    pub credential_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Answer `/mode` with `maintenance`.
    pub maintenance_mode: bool,
    /// Addresses besides loopback allowed to call the dump endpoints.
    pub admin_addrs: Vec<String>,
    /// Peers whose `X-Real-IP` header is believed for admin checks.
    pub trusted_proxies: Vec<String>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            http_port: 8067,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "webcallid".to_string(),
            reserved_prefix: "answie".to_string(),
            credential_bucket: "hashedpwbucket".to_string(),
            account_bucket: "userbucket".to_string(),
            credential_path: PathBuf::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            admin_addrs: Vec::new(),
            trusted_proxies: vec!["127.0.0.1".to_string()],
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
        .join("webcall")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local").join("share"))
        .join("webcall")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WebcallConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load from an explicit path, falling back to defaults if it is absent.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            WebcallConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("WEBCALL_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&WebcallConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply WEBCALL_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEBCALL_NETWORK__BIND_ADDR") {
            self.network.bind_addr = v;
        }
        if let Ok(v) = std::env::var("WEBCALL_NETWORK__HTTP_PORT") {
            if let Ok(p) = v.parse() {
                self.network.http_port = p;
            }
        }
        if let Ok(v) = std::env::var("WEBCALL_SERVER__MAINTENANCE_MODE") {
            self.server.maintenance_mode = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("WEBCALL_SESSION__CREDENTIAL_PATH") {
            self.session.credential_path = PathBuf::from(v);
        }
    }
}
