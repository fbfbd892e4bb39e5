//! Service configuration.
//!
//! Defaults work out of the box; a YAML file (explicit `--config` path or
//! `~/.tarefas/config.yaml`) overrides them, and CLI flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8787;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the SQLite database file.
    pub database: PathBuf,
    /// Port the HTTP server binds on (loopback).
    pub port: u16,
    /// How long issued sessions stay valid.
    pub session_ttl_hours: i64,
    pub mail: MailConfig,
}

/// Where comment notifications go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub from: String,
    pub to: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("tarefas.db"),
            port: DEFAULT_PORT,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            mail: MailConfig::default(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: "admin@example.com".to_string(),
            to: vec!["admin@example.com".to_string()],
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist and parse. Without one, the
    /// user-level file is used when present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config = serde_yaml::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            return Ok(config);
        }

        if let Some(path) = Self::user_config_path() {
            if path.exists() {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                let config = serde_yaml::from_str(&text)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?;
                return Ok(config);
            }
        }

        Ok(Self::default())
    }

    /// User-level config location (`~/.tarefas/config.yaml`).
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".tarefas").join("config.yaml"))
    }
}
