//! Discovery poller that fingerprints devices on a fixed period

use genicam_core::{
    group_devices, non_empty_groups, DeviceCache, DeviceDescriptor, DeviceEnumerator,
    DeviceHandle, FingerprintEvent,
};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::PluginSettings;

/// Capacity of the fingerprint event channel
///
/// A single slot keeps the hand-off close to unbuffered: a consumer that stops
/// reading stalls the poller instead of piling up stale snapshots.
pub const FINGERPRINT_CHANNEL_CAPACITY: usize = 1;

/// Periodic device discovery
pub struct DiscoveryPoller<E: DeviceEnumerator> {
    enumerator: Arc<E>,
    cache: DeviceCache,
    settings: Arc<RwLock<PluginSettings>>,
}

impl<E: DeviceEnumerator> DiscoveryPoller<E> {
    pub fn new(enumerator: Arc<E>, cache: DeviceCache, settings: Arc<RwLock<PluginSettings>>) -> Self {
        Self {
            enumerator,
            cache,
            settings,
        }
    }

    /// Run a single fingerprint cycle
    ///
    /// Enumeration runs on the blocking pool with no lock held; only the
    /// cache merge takes exclusive access.
    pub async fn poll_once(&self) -> FingerprintEvent {
        let enumerator = Arc::clone(&self.enumerator);
        let devices = match tokio::task::spawn_blocking(move || discover_devices(enumerator.as_ref())).await {
            Ok(devices) => devices,
            Err(e) => {
                error!(error = %e, "Device enumeration task failed");
                Vec::new()
            }
        };

        let policy = self.settings.read().await.merge_policy;
        self.cache.merge(&devices, policy).await;

        let groups = non_empty_groups(group_devices(&devices));
        info!(
            devices = devices.len(),
            groups = groups.len(),
            "Fingerprint cycle complete"
        );

        FingerprintEvent::new(groups)
    }

    /// Poll until cancelled or until the receiver is dropped
    ///
    /// The first cycle runs immediately. Each following cycle is scheduled one
    /// period after the previous cycle started, so a slow cycle never queues
    /// up extra ticks. Dropping `events` on return closes the stream.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken, events: mpsc::Sender<FingerprintEvent>) {
        info!("Fingerprinting started");
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep_until(next_tick) => {}
            }

            let period = self.settings.read().await.fingerprint_period;
            next_tick = Instant::now() + period;

            let event = self.poll_once().await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = events.send(event) => {
                    if sent.is_err() {
                        debug!("Fingerprint receiver dropped");
                        break;
                    }
                }
            }
        }

        info!("Fingerprinting stopped");
    }
}

/// Refresh the enumeration backend and read every device that answers
///
/// A device whose attributes cannot all be read is skipped; it never aborts
/// the rest of the listing.
pub fn discover_devices<E: DeviceEnumerator + ?Sized>(enumerator: &E) -> Vec<DeviceDescriptor> {
    enumerator.refresh_device_list();

    let handles = match enumerator.list_devices() {
        Ok(handles) => handles,
        Err(e) => {
            warn!(error = %e, "Failed to list devices");
            return Vec::new();
        }
    };

    let mut devices = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.describe() {
            Ok(device) => {
                debug!(
                    device_id = %device.device_id,
                    serial = %device.serial_number,
                    model = %device.model,
                    address = %device.address,
                    "Found device"
                );
                devices.push(device);
            }
            Err(e) => {
                warn!(index = handle.index(), error = %e, "Skipping device");
            }
        }
    }

    devices
}
