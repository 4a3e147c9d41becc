//! Application configuration management.
//!
//! Holds the backend base URL, the last-used login email, and the
//! offline-mode flag. Stored at `~/.config/orarcache/config.json`;
//! cached data lives under `~/.cache/orarcache/`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "orarcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default backend during development
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Path of the live-update endpoint on the backend
const WS_PATH: &str = "/ws/schedule";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub last_email: Option<String>,
    #[serde(default)]
    pub offline_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            last_email: None,
            offline_mode: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Live-update endpoint derived from the API base URL:
    /// http becomes ws, https becomes wss, path is `/ws/schedule`.
    pub fn ws_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.api_base_url)?;
        let scheme = match url.scheme() {
            "https" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("Cannot derive WebSocket scheme from {}", self.api_base_url))?;
        url.set_path(WS_PATH);
        Ok(url.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_url_from_http() {
        let config = Config::default();
        assert_eq!(config.ws_url().unwrap(), "ws://127.0.0.1:8000/ws/schedule");
    }

    #[test]
    fn test_ws_url_from_https() {
        let config = Config {
            api_base_url: "https://orar.example.edu".to_string(),
            ..Config::default()
        };
        assert_eq!(
            config.ws_url().unwrap(),
            "wss://orar.example.edu/ws/schedule"
        );
    }
}
