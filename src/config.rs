use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://movieapi.giftedtech.co.ke/api";
const CONFIG_FILE: &str = "maxmovies.toml";

/// Playback preferences. Carried for embedders; the library itself does not act on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub default_quality: String,
    pub subtitle_lang: String,
    pub data_saver: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { default_quality: "auto".into(), subtitle_lang: "en".into(), data_saver: false }
    }
}

/// Runtime configuration: `maxmovies.toml`, then `MAXMOVIES_*` environment variables,
/// then whatever the CLI overrides on top.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Answer every request from the bundled fixtures.
    pub mock_mode: bool,
    pub mock_latency_ms: u64,
    pub fixtures_dir: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    /// SQLite URL; defaults to a file in the user's data directory.
    pub database_url: Option<String>,
    pub history_limit: usize,
    pub prefs: Preferences,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 6000,
            mock_mode: false,
            mock_latency_ms: 220,
            fixtures_dir: None,
            download_dir: None,
            database_url: None,
            history_limit: 50,
            prefs: Preferences::default(),
        }
    }
}

impl Config {
    /// Load from `path` (must exist) or from the default location (optional), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        debug!(path = %path.display(), "loaded config file");
        Self::from_toml_str(&text).with_context(|| format!("parsing config: {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config TOML")
    }

    /// Apply `MAXMOVIES_*` overrides. Unparseable values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MAXMOVIES_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = v;
        }
        if let Some(v) = lookup("MAXMOVIES_TIMEOUT_MS") {
            match v.parse() {
                Ok(ms) => self.timeout_ms = ms,
                Err(_) => warn!(value = %v, "ignoring invalid MAXMOVIES_TIMEOUT_MS"),
            }
        }
        if let Some(v) = lookup("MAXMOVIES_MOCK") {
            self.mock_mode = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = lookup("MAXMOVIES_FIXTURES_DIR") {
            self.fixtures_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MAXMOVIES_DOWNLOAD_DIR") {
            self.download_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MAXMOVIES_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = Some(v);
        }
    }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    pub fn mock_latency(&self) -> Duration { Duration::from_millis(self.mock_latency_ms) }

    /// Configured download directory, or `downloads/` under the user's data directory.
    pub fn resolved_download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        let proj = project_dirs().context("unable to determine data directory for downloads")?;
        Ok(proj.data_dir().join("downloads"))
    }
}

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "maxmovies", "maxmovies")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|p| p.config_dir().join(CONFIG_FILE))
}
