//! Driver configuration
//!
//! Read from a TOML file. Every section is optional and falls back to the
//! pad's defaults, so an empty file is a valid configuration:
//!
//! ```toml
//! [bus]
//! number = 3
//! address = 0x67
//!
//! [poll]
//! interval_ms = 16
//!
//! [axis]
//! min = 0
//! max = 1023
//! fuzz = 8
//! flat = 32
//!
//! [device]
//! calibrate_on_attach = false
//! ```

use color_eyre::eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::device::DeviceSettings;
use crate::sink::{AxisParams, PollInterval};

const CONFIG_DIR: &str = "ospad";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "OSPAD_CONFIG";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct BusConfig {
    /// `/dev/i2c-<number>`
    pub number: u8,
    /// 7-bit slave address of the pad
    pub address: u16,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            number: 3,
            address: 0x67,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: PollInterval::DEFAULT_MS,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceConfig {
    /// Send the calibration request right after discovery
    pub calibrate_on_attach: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DriverConfig {
    pub bus: BusConfig,
    pub poll: PollConfig,
    pub axis: AxisParams,
    pub device: DeviceConfig,
}

impl DriverConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| eyre!("Failed to parse driver config: {}", e))
    }

    /// Settings for [`crate::device::attach`]. An out-of-range poll interval
    /// is clamped rather than refused.
    pub fn device_settings(&self) -> DeviceSettings {
        let poll_interval = PollInterval::clamped(self.poll.interval_ms);
        if poll_interval.as_millis() != self.poll.interval_ms {
            warn!(
                "Poll interval {}ms out of range, using {}ms",
                self.poll.interval_ms,
                poll_interval.as_millis()
            );
        }
        DeviceSettings {
            poll_interval,
            axis: self.axis,
        }
    }

    /// Explicit path, then `$OSPAD_CONFIG`, then the user config directory.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let mut path =
            dirs::config_dir().ok_or_else(|| eyre!("No config directory for this user"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Writes the default configuration if nothing exists at `path` yet.
    pub async fn ensure_default_config(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }
        let content = toml::to_string_pretty(&DriverConfig::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config: {}", e))?;
        info!("Wrote default config to {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }
}
