use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Remote song catalog (JioSaavn-compatible REST API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Queries picked at random for the trending fallback.
    #[serde(default = "default_trending_queries")]
    pub trending_queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,
    #[serde(default)]
    pub repeat: bool,
    /// 0–100.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Upper bound for downloading and sampling one cover image.
    #[serde(default = "default_palette_timeout_secs")]
    pub palette_timeout_secs: u64,
}

/// User-configurable paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON file holding the liked songs.
    /// Defaults to `~/.local/share/vinyl/liked.json`.
    #[serde(default = "default_liked_file")]
    pub liked_file: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            trending_queries: default_trending_queries(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            repeat: false,
            default_volume: default_volume(),
        }
    }
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            palette_timeout_secs: default_palette_timeout_secs(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            liked_file: default_liked_file(),
        }
    }
}

fn default_base_url() -> String {
    "https://jiosavan-api2.vercel.app/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_trending_queries() -> Vec<String> {
    ["trending", "popular", "latest", "bollywood", "hindi"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_autoplay() -> bool {
    true
}

fn default_volume() -> u8 {
    70
}

fn default_palette_timeout_secs() -> u64 {
    5
}

fn default_liked_file() -> PathBuf {
    platform::data_dir().join("liked.json")
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: CatalogConfig::default(),
            playback: PlaybackConfig::default(),
            theme: ThemeConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.playback.autoplay);
        assert!(!config.playback.repeat);
        assert_eq!(config.playback.default_volume, 70);
        assert!(config.catalog.base_url.starts_with("https://"));
        assert_eq!(config.catalog.trending_queries.len(), 5);
        assert!(config.paths.liked_file.ends_with("vinyl/liked.json"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [playback]
            autoplay = false

            [catalog]
            base_url = "http://127.0.0.1:9000/api"
            "#,
        )
        .unwrap();
        assert!(!config.playback.autoplay);
        assert_eq!(config.playback.default_volume, 70);
        assert_eq!(config.catalog.base_url, "http://127.0.0.1:9000/api");
        assert_eq!(config.catalog.request_timeout_secs, 10);
        assert_eq!(config.theme.palette_timeout_secs, 5);
    }
}
