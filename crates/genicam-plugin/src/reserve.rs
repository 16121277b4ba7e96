//! Reservation validation against the device cache

use genicam_core::{ContainerReservation, DeviceCache, ReservedDevice};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::PluginSettings;

/// Serial number of the first reserved device
pub const ENV_DEVICE_SERIAL_NBR: &str = "GENICAM_DEVICE_SERIAL_NBR";
/// Address of the first reserved device
pub const ENV_DEVICE_ADDRESS: &str = "GENICAM_DEVICE_ADDRESS";
/// Comma-separated serial numbers of all reserved devices
pub const ENV_VISIBLE_DEVICES: &str = "GENICAM_VISIBLE_DEVICES";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReserveError {
    #[error("genicam device is not enabled")]
    Disabled,
    #[error("unknown device IDs: {}", .0.join(","))]
    UnknownDevices(Vec<String>),
}

/// Checks reservation requests against the latest fingerprinted devices
#[derive(Debug, Clone)]
pub struct ReservationValidator {
    cache: DeviceCache,
    settings: Arc<RwLock<PluginSettings>>,
}

impl ReservationValidator {
    pub fn new(cache: DeviceCache, settings: Arc<RwLock<PluginSettings>>) -> Self {
        Self { cache, settings }
    }

    /// Resolve the requested devices to their addresses
    ///
    /// A device can disappear after the scheduler placed a task but before the
    /// scheduler sees the next fingerprint, so every id is checked here.
    /// Duplicate ids are reserved once.
    pub async fn validate<S: AsRef<str>>(&self, device_ids: &[S]) -> Result<Vec<ReservedDevice>, ReserveError> {
        if device_ids.is_empty() {
            return Ok(Vec::new());
        }

        if !self.settings.read().await.enabled {
            return Err(ReserveError::Disabled);
        }

        let mut seen = HashSet::new();
        let requested: Vec<&str> = device_ids
            .iter()
            .map(|id| AsRef::<str>::as_ref(id))
            .filter(|id| seen.insert(*id))
            .collect();

        info!(device_ids = ?requested, "Reserving devices");

        match self.cache.lookup_all(requested.as_slice()).await {
            Ok(reserved) => {
                for (index, device) in reserved.iter().enumerate() {
                    debug!(
                        index,
                        serial = %device.serial_number,
                        address = %device.address,
                        "Reserved device"
                    );
                }
                Ok(reserved)
            }
            Err(missing) => {
                warn!(missing = ?missing, "Reservation requested unknown devices");
                Err(ReserveError::UnknownDevices(missing))
            }
        }
    }

    /// Validate and build the reservation handed to the task driver
    pub async fn reserve<S: AsRef<str>>(&self, device_ids: &[S]) -> Result<ContainerReservation, ReserveError> {
        let reserved = self.validate(device_ids).await?;
        Ok(container_reservation(&reserved))
    }
}

/// Environment for the task using the reserved devices
///
/// The first device is exposed through the unindexed variables; every device
/// is also exposed with its position as a suffix.
pub fn container_reservation(reserved: &[ReservedDevice]) -> ContainerReservation {
    let mut reservation = ContainerReservation::default();
    let Some(first) = reserved.first() else {
        return reservation;
    };

    let envs = &mut reservation.envs;
    envs.insert(ENV_DEVICE_SERIAL_NBR.to_string(), first.serial_number.clone());
    envs.insert(ENV_DEVICE_ADDRESS.to_string(), first.address.clone());
    for (index, device) in reserved.iter().enumerate() {
        envs.insert(format!("{}_{}", ENV_DEVICE_SERIAL_NBR, index), device.serial_number.clone());
        envs.insert(format!("{}_{}", ENV_DEVICE_ADDRESS, index), device.address.clone());
    }
    let visible: Vec<&str> = reserved.iter().map(|d| d.serial_number.as_str()).collect();
    envs.insert(ENV_VISIBLE_DEVICES.to_string(), visible.join(","));

    reservation
}
