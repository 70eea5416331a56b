//! Application configuration loaded from a TOML file

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE_ENV: &str = "FRACTAL_PLAYER_CONFIG";
const ORIGIN_ENV: &str = "FRACTAL_ORIGIN";
const DEFAULT_CONFIG_FILE: &str = "fractal-player.toml";

pub const DEFAULT_ORIGIN: &str = "http://dxdcg26c5b400.cloudfront.net/fractal";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Distribution origin serving `list.json` and per-track folders
    pub origin: String,
    pub request_timeout_secs: u64,
    pub initial_volume: u8,
    /// Fatal network/media errors tolerated per binding before giving up
    pub max_recovery_attempts: u32,
    /// Select HLS renditions in-process; when off, mpv opens the master
    /// playlist itself
    pub adaptive_streaming: bool,
    pub mpv_path: PathBuf,
    pub log_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            request_timeout_secs: 15,
            initial_volume: 50,
            max_recovery_attempts: 3,
            adaptive_streaming: true,
            mpv_path: PathBuf::from("mpv"),
            log_dir: PathBuf::from(".logs"),
        }
    }
}

impl Config {
    /// Load from `$FRACTAL_PLAYER_CONFIG` (or `fractal-player.toml`), then
    /// apply environment overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var(CONFIG_FILE_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = Self::from_file(Path::new(&config_file))?;
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config.normalized())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(origin) = lookup(ORIGIN_ENV).filter(|o| !o.trim().is_empty()) {
            self.origin = origin;
        }
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        self.origin = self.origin.trim().trim_end_matches('/').to_string();
        self.initial_volume = self.initial_volume.min(100);
        self
    }
}
