//! Configuration loading and validation

use anyhow::Result;
use genicam_core::{DeviceAttribute, DeviceDescriptor, StaticDevice};
use genicam_plugin::PluginConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Devices served in place of a hardware enumeration backend
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Stats sampling interval in seconds (0 to disable)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            stats_interval_secs: default_stats_interval(),
        }
    }
}

fn default_stats_interval() -> u64 {
    0
}

/// One device of the configured inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub serial_number: String,
    pub model: String,
    pub address: String,
    /// Enumeration id, defaults to "<vendor>-<serial_number>"
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub physical_id: String,
    #[serde(default = "default_vendor")]
    pub vendor: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Simulate a device whose attribute cannot be read
    #[serde(default)]
    pub failing_attribute: Option<DeviceAttribute>,
}

fn default_vendor() -> String {
    "The Imaging Source Europe GmbH".to_string()
}

fn default_protocol() -> String {
    "GigEVision".to_string()
}

impl DeviceConfig {
    pub fn to_static_device(&self) -> StaticDevice {
        StaticDevice {
            descriptor: DeviceDescriptor {
                device_id: self
                    .device_id
                    .clone()
                    .unwrap_or_else(|| format!("{}-{}", self.vendor, self.serial_number)),
                physical_id: self.physical_id.clone(),
                model: self.model.clone(),
                serial_number: self.serial_number.clone(),
                vendor: self.vendor.clone(),
                address: self.address.clone(),
                protocol: self.protocol.clone(),
            },
            failing_attribute: self.failing_attribute,
        }
    }
}

impl Config {
    /// Inventory for the static enumeration backend
    pub fn static_devices(&self) -> Vec<StaticDevice> {
        self.devices.iter().map(DeviceConfig::to_static_device).collect()
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), devices = config.devices.len(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert!(config.plugin.enabled);
        assert_eq!(config.plugin.fingerprint_period, "5s");
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_load_inventory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[plugin]
enabled = false
fingerprint_period = "1m"

[daemon]
stats_interval_secs = 10

[[device]]
serial_number = "41910001"
model = "DMK 33GX264"
address = "192.168.1.10"

[[device]]
serial_number = "41910002"
model = "DMK 33GX264"
address = "192.168.1.11"
device_id = "cam-2"
protocol = "USB3Vision"
failing_attribute = "address"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(!config.plugin.enabled);
        assert_eq!(config.plugin.fingerprint_period, "1m");
        assert_eq!(config.daemon.stats_interval_secs, 10);

        let devices = config.static_devices();
        assert_eq!(devices.len(), 2);
        assert_eq!(
            devices[0].descriptor.device_id,
            "The Imaging Source Europe GmbH-41910001"
        );
        assert_eq!(devices[0].failing_attribute, None);
        assert_eq!(devices[1].descriptor.device_id, "cam-2");
        assert_eq!(devices[1].descriptor.protocol, "USB3Vision");
        assert_eq!(devices[1].failing_attribute, Some(DeviceAttribute::Address));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[plugin\nenabled = ").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
