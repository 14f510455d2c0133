use crate::core::models::Resource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

const APP_DIR: &str = "smart-refresh";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub refresh: RefreshSettings,
    pub notifications: NotificationSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Applies to every resource without its own entry in `intervals`.
    pub interval_ms: Option<u64>,
    pub silent: bool,
    /// Per-resource overrides keyed by resource name, e.g. `orders = 2000`.
    pub intervals: HashMap<String, u64>,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval_ms: None,
            silent: false,
            intervals: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub enabled: bool,
    pub desktop: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            desktop: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub session_file: Option<PathBuf>,
    pub pause_file: Option<PathBuf>,
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let path = Self::config_path().context("Could not determine config directory")?;

        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings.validate()?;
        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.refresh.interval_ms == Some(0) {
            anyhow::bail!("refresh.interval_ms must be a positive number of milliseconds");
        }
        if let Some((name, _)) = self.refresh.intervals.iter().find(|(_, ms)| **ms == 0) {
            anyhow::bail!("refresh.intervals.{name} must be a positive number of milliseconds");
        }
        Ok(())
    }

    /// Polling period for a resource: its own override, then the global
    /// interval, then the resource's dashboard default.
    pub fn interval_for(&self, resource: Resource) -> Duration {
        self.refresh
            .intervals
            .get(resource.name())
            .copied()
            .or(self.refresh.interval_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| resource.default_interval())
    }

    pub fn session_file(&self) -> Option<PathBuf> {
        self.session
            .session_file
            .clone()
            .or_else(|| dirs::config_dir().map(|p| p.join(APP_DIR).join("session.json")))
    }

    pub fn pause_file(&self) -> Option<PathBuf> {
        self.session
            .pause_file
            .clone()
            .or_else(|| dirs::cache_dir().map(|p| p.join(APP_DIR).join("paused")))
    }
}
