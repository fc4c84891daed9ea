use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::group::GroupConfig;
use crate::retry::RetryPolicy;

/// Settings for one service group ([servers] / [peers] in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSection {
    /// Coordination-store key listing the group's members.
    pub key: String,
    /// Seconds to wait before reopening a failed watch.
    pub watch_retry_delay_secs: f64,
    /// Refresh attempts per membership notification (including the first).
    pub update_retry: u32,
    /// Seconds between refresh attempts.
    pub update_retry_delay_secs: f64,
}

impl GroupSection {
    fn with_key(key: &str) -> Self {
        Self {
            key: key.to_string(),
            watch_retry_delay_secs: 5.0,
            update_retry: 3,
            update_retry_delay_secs: 1.0,
        }
    }

    /// Convert to the runtime group configuration.
    pub fn group_config(&self) -> GroupConfig {
        GroupConfig {
            key: self.key.clone(),
            watch_retry_delay: Duration::from_secs_f64(self.watch_retry_delay_secs.max(0.0)),
            update_retry: RetryPolicy {
                max_attempts: self.update_retry,
                delay: Duration::from_secs_f64(self.update_retry_delay_secs.max(0.0)),
            },
        }
    }
}

/// Global configuration loaded from `~/.config/dds/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdsConfig {
    pub servers: GroupSection,
    pub peers: GroupSection,
}

impl Default for DdsConfig {
    fn default() -> Self {
        Self {
            servers: GroupSection::with_key("/dds/servers"),
            peers: GroupSection::with_key("/dds/peers"),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("dds")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<DdsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = DdsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: DdsConfig = toml::from_str(&data)?;
    Ok(cfg)
}
