//! Configuration management for promptcode
//!
//! The server is configured from the environment (optionally seeded from a
//! `.env` file); the chat client reads a TOML file from the platform config
//! directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ui_backend::GenerationTiming;

/// Default listen port of the generation server
pub const DEFAULT_PORT: u16 = 3000;

/// Model used when a request does not name one
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment variable holding the upstream credential
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Generation server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub default_model: String,
}

impl ServerConfig {
    /// Read `PORT`, `HOST`, `GEMINI_API_KEY` and `DEFAULT_MODEL` from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup.
    ///
    /// Fails when the API key is missing or blank, or `PORT` is not a number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .with_context(|| format!("{} is not set; export it or add it to .env", API_KEY_VAR))?;

        let port = match lookup("PORT").filter(|p| !p.trim().is_empty()) {
            Some(p) => p
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", p))?,
            None => DEFAULT_PORT,
        };

        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let default_model = lookup("DEFAULT_MODEL")
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            host,
            port,
            api_key,
            default_model,
        })
    }
}

/// Main configuration structure (chat client)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the generation server
    pub backend_url: String,
    /// Model identifier passed through to the server
    pub model: Option<String>,
    pub status_interval_ms: u64,
    pub reveal_interval_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: format!("http://localhost:{}", DEFAULT_PORT),
            model: None,
            status_interval_ms: 3000,
            reveal_interval_ms: 50,
        }
    }
}

impl ClientConfig {
    /// Animation periods; zero is raised to one millisecond
    pub fn timing(&self) -> GenerationTiming {
        GenerationTiming {
            status_interval: Duration::from_millis(self.status_interval_ms.max(1)),
            reveal_interval: Duration::from_millis(self.reveal_interval_ms.max(1)),
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "promptcode") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }
}
