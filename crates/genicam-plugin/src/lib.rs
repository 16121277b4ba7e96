//! GenICam Plugin - Device plugin for GenICam cameras
//!
//! This crate implements the orchestrator-facing side of the plugin:
//! - Configuration parsing and validation
//! - The discovery poller that streams fingerprint events
//! - The (empty) statistics stream
//! - Reservation validation against the latest fingerprinted devices

pub mod config;
pub mod fingerprint;
pub mod plugin;
pub mod reserve;
pub mod stats;

pub use config::{config_schema, parse_duration, ConfigError, ConfigOption, PluginConfig, PluginSettings};
pub use fingerprint::{discover_devices, DiscoveryPoller, FINGERPRINT_CHANNEL_CAPACITY};
pub use plugin::{GenicamDevicePlugin, PluginInfo, PLUGIN_NAME, PLUGIN_VERSION};
pub use reserve::{
    container_reservation, ReservationValidator, ReserveError, ENV_DEVICE_ADDRESS,
    ENV_DEVICE_SERIAL_NBR, ENV_VISIBLE_DEVICES,
};
pub use stats::run_stats;

pub use tokio_util::sync::CancellationToken;
