//! Device plugin entry points exposed to the orchestrator

use genicam_core::{ContainerReservation, DeviceCache, DeviceEnumerator, FingerprintEvent, StatsEvent};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{config_schema, ConfigError, ConfigOption, PluginConfig, PluginSettings};
use crate::fingerprint::{DiscoveryPoller, FINGERPRINT_CHANNEL_CAPACITY};
use crate::reserve::{ReservationValidator, ReserveError};
use crate::stats::{run_stats, STATS_CHANNEL_CAPACITY};

/// Name used to identify the plugin binary to the orchestrator
pub const PLUGIN_NAME: &str = "genicam-device";

pub const PLUGIN_VERSION: &str = "v0.0.1";

/// Device plugin API versions this plugin speaks
pub const PLUGIN_API_VERSIONS: &[&str] = &["v0.1.0"];

/// Identity reported to the orchestrator during plugin discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub plugin_type: &'static str,
    pub api_versions: Vec<&'static str>,
}

/// GenICam device plugin
///
/// Owns the device cache shared by the discovery poller (writer) and
/// reservation checks (readers).
pub struct GenicamDevicePlugin<E: DeviceEnumerator> {
    settings: Arc<RwLock<PluginSettings>>,
    cache: DeviceCache,
    poller: Arc<DiscoveryPoller<E>>,
    validator: ReservationValidator,
}

impl<E: DeviceEnumerator> GenicamDevicePlugin<E> {
    /// Create a plugin with default settings
    ///
    /// The host is expected to call [`set_config`](Self::set_config) before
    /// streaming fingerprints.
    pub fn new(enumerator: Arc<E>) -> Self {
        let settings = Arc::new(RwLock::new(PluginSettings::default()));
        let cache = DeviceCache::new();
        let poller = Arc::new(DiscoveryPoller::new(enumerator, cache.clone(), Arc::clone(&settings)));
        let validator = ReservationValidator::new(cache.clone(), Arc::clone(&settings));

        Self {
            settings,
            cache,
            poller,
            validator,
        }
    }

    pub fn plugin_info(&self) -> PluginInfo {
        PluginInfo {
            name: PLUGIN_NAME,
            version: PLUGIN_VERSION,
            plugin_type: "device",
            api_versions: PLUGIN_API_VERSIONS.to_vec(),
        }
    }

    pub fn config_schema(&self) -> Vec<ConfigOption> {
        config_schema()
    }

    /// Apply configuration from the host
    ///
    /// Takes effect on the next fingerprint tick if fingerprinting is running.
    pub async fn set_config(&self, config: &PluginConfig) -> Result<(), ConfigError> {
        let settings = config.to_settings()?;
        *self.settings.write().await = settings;
        info!(
            enabled = settings.enabled,
            fingerprint_period = ?settings.fingerprint_period,
            merge_policy = ?settings.merge_policy,
            "Configured plugin"
        );
        Ok(())
    }

    pub async fn settings(&self) -> PluginSettings {
        *self.settings.read().await
    }

    /// Start the fingerprint loop in the background
    ///
    /// Returns immediately. The stream closes once `cancel` fires.
    pub fn start_fingerprinting(&self, cancel: CancellationToken) -> mpsc::Receiver<FingerprintEvent> {
        let (tx, rx) = mpsc::channel(FINGERPRINT_CHANNEL_CAPACITY);
        tokio::spawn(Arc::clone(&self.poller).run(cancel, tx));
        rx
    }

    /// Start the statistics stream in the background
    pub fn start_stats(
        &self,
        cancel: CancellationToken,
        interval: Duration,
    ) -> Result<mpsc::Receiver<StatsEvent>, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::InvalidStatsInterval);
        }
        let (tx, rx) = mpsc::channel(STATS_CHANNEL_CAPACITY);
        tokio::spawn(run_stats(interval, cancel, tx));
        Ok(rx)
    }

    /// Check the requested devices and describe how the task reaches them
    pub async fn reserve<S: AsRef<str>>(&self, device_ids: &[S]) -> Result<ContainerReservation, ReserveError> {
        self.validator.reserve(device_ids).await
    }

    /// Run one fingerprint cycle outside of the background loop
    pub async fn fingerprint_once(&self) -> FingerprintEvent {
        self.poller.poll_once().await
    }

    pub fn cache(&self) -> &DeviceCache {
        &self.cache
    }
}
