use anyhow::{bail, Context};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::xpath::ScanMode;

/// One monitored bearerbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceConfig {
    /// Admin HTTP interface, e.g. `http://kannel.example.com:13000`.
    pub base_url: String,
    #[serde(default)]
    pub status_password: String,
    #[serde(default)]
    pub admin_password: String,
    pub name: String,
}

impl InstanceConfig {
    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Status URL shown on the page. The password is left out.
    pub fn display_url(&self) -> String {
        format!("{}/status.xml", self.base())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Default page refresh in seconds when no `refresh` query is given.
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    /// Queued totals above this are highlighted.
    #[serde(default = "default_queue_alert_threshold")]
    pub queue_alert_threshold: i64,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub scan_mode: ScanMode,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

fn default_refresh_secs() -> u64 {
    60
}

fn default_queue_alert_threshold() -> i64 {
    100
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            queue_alert_threshold: default_queue_alert_threshold(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            scan_mode: ScanMode::default(),
            instances: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Load a TOML (or any format `config` understands) file, with
    /// `KANNEL_MONITOR__*` environment overrides on top.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path))
            .add_source(Environment::with_prefix("KANNEL_MONITOR").separator("__"))
            .build()
            .with_context(|| format!("reading config {}", path.display()))?;

        let config: MonitorConfig = settings
            .try_deserialize()
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.instances.is_empty() {
            bail!("no instances configured");
        }
        for (i, instance) in self.instances.iter().enumerate() {
            if instance.base_url.trim().is_empty() {
                bail!("instance {} ({}) has an empty base_url", i, instance.name);
            }
        }
        if self.refresh_secs == 0 {
            bail!("refresh_secs must be positive");
        }
        Ok(())
    }
}
