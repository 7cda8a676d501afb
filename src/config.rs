use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_resolve_metadata")]
    pub resolve_metadata: bool,

    #[serde(default = "default_oembed_endpoint")]
    pub oembed_endpoint: String,

    #[serde(default = "default_resolver_timeout")]
    pub resolver_timeout_secs: u64,

    /// Hint handed to polling clients in list responses.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("muzily");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("queue.db").to_string_lossy().to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_resolve_metadata() -> bool {
    true
}

fn default_oembed_endpoint() -> String {
    "https://www.youtube.com/oembed".to_string()
}

fn default_resolver_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind_addr: default_bind_addr(),
            resolve_metadata: default_resolve_metadata(),
            oembed_endpoint: default_oembed_endpoint(),
            resolver_timeout_secs: default_resolver_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Config>(&content)?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        if let Ok(port) = std::env::var("PORT") {
            config.bind_addr = config.with_port(&port)?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("muzily")
            .join("config.toml")
    }

    /// Replace the port of `bind_addr`, keeping its host.
    fn with_port(&self, port: &str) -> Result<String> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid PORT: {}", port)))?;
        let host = self
            .bind_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(&self.bind_addr);
        Ok(format!("{}:{}", host, port))
    }
}
