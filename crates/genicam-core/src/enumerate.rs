//! Device enumeration interface
//!
//! The vendor SDK (Aravis for GenICam cameras) is accessed through the
//! [`DeviceEnumerator`] and [`DeviceHandle`] traits. Calls are blocking and may
//! be slow, so callers must keep them off async worker threads and outside of
//! any lock they share with readers.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;

use crate::device::DeviceDescriptor;

/// String attributes readable from an enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAttribute {
    Id,
    PhysicalId,
    Model,
    SerialNumber,
    Vendor,
    Address,
    Protocol,
}

impl DeviceAttribute {
    pub const ALL: [DeviceAttribute; 7] = [
        DeviceAttribute::Id,
        DeviceAttribute::PhysicalId,
        DeviceAttribute::Model,
        DeviceAttribute::SerialNumber,
        DeviceAttribute::Vendor,
        DeviceAttribute::Address,
        DeviceAttribute::Protocol,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceAttribute::Id => "id",
            DeviceAttribute::PhysicalId => "physical id",
            DeviceAttribute::Model => "model",
            DeviceAttribute::SerialNumber => "serial number",
            DeviceAttribute::Vendor => "vendor",
            DeviceAttribute::Address => "address",
            DeviceAttribute::Protocol => "protocol",
        }
    }
}

impl std::fmt::Display for DeviceAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnumerationError {
    #[error("failed to list devices: {0}")]
    ListFailed(String),
    #[error("failed to read device {attribute} at index {index}: {reason}")]
    AttributeRead {
        index: usize,
        attribute: DeviceAttribute,
        reason: String,
    },
}

/// A device handle valid for the current enumeration session
pub trait DeviceHandle: Send {
    /// Position of the device in the current listing
    fn index(&self) -> usize;

    /// Read one string attribute of the device
    fn attribute(&self, attribute: DeviceAttribute) -> Result<String, EnumerationError>;

    /// Read every identity attribute into a descriptor, failing on the first
    /// unreadable attribute
    fn describe(&self) -> Result<DeviceDescriptor, EnumerationError> {
        Ok(DeviceDescriptor {
            device_id: self.attribute(DeviceAttribute::Id)?,
            physical_id: self.attribute(DeviceAttribute::PhysicalId)?,
            model: self.attribute(DeviceAttribute::Model)?,
            serial_number: self.attribute(DeviceAttribute::SerialNumber)?,
            vendor: self.attribute(DeviceAttribute::Vendor)?,
            address: self.attribute(DeviceAttribute::Address)?,
            protocol: self.attribute(DeviceAttribute::Protocol)?,
        })
    }
}

/// Access to the hardware enumeration backend
pub trait DeviceEnumerator: Send + Sync + 'static {
    type Handle: DeviceHandle;

    /// Rescan the buses for devices. Best effort.
    fn refresh_device_list(&self);

    /// Handles for the devices found by the last refresh
    fn list_devices(&self) -> Result<Vec<Self::Handle>, EnumerationError>;
}

/// A device entry served by [`StaticEnumerator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticDevice {
    pub descriptor: DeviceDescriptor,
    /// Attribute whose read fails, simulating a device that disappears or
    /// stops answering mid-enumeration
    #[serde(default)]
    pub failing_attribute: Option<DeviceAttribute>,
}

impl StaticDevice {
    pub fn new(descriptor: DeviceDescriptor) -> Self {
        Self {
            descriptor,
            failing_attribute: None,
        }
    }

    pub fn failing_on(mut self, attribute: DeviceAttribute) -> Self {
        self.failing_attribute = Some(attribute);
        self
    }
}

/// Handle into a [`StaticEnumerator`] listing
#[derive(Debug, Clone)]
pub struct StaticHandle {
    index: usize,
    device: StaticDevice,
}

impl DeviceHandle for StaticHandle {
    fn index(&self) -> usize {
        self.index
    }

    fn attribute(&self, attribute: DeviceAttribute) -> Result<String, EnumerationError> {
        if self.device.failing_attribute == Some(attribute) {
            return Err(EnumerationError::AttributeRead {
                index: self.index,
                attribute,
                reason: "device did not respond".to_string(),
            });
        }

        let d = &self.device.descriptor;
        let value = match attribute {
            DeviceAttribute::Id => &d.device_id,
            DeviceAttribute::PhysicalId => &d.physical_id,
            DeviceAttribute::Model => &d.model,
            DeviceAttribute::SerialNumber => &d.serial_number,
            DeviceAttribute::Vendor => &d.vendor,
            DeviceAttribute::Address => &d.address,
            DeviceAttribute::Protocol => &d.protocol,
        };
        Ok(value.clone())
    }
}

#[derive(Debug, Default)]
struct StaticState {
    devices: Vec<StaticDevice>,
    list_error: Option<String>,
    refresh_count: usize,
}

/// In-memory enumeration backend
///
/// Serves a fixed (but replaceable) device inventory. Used when no vendor SDK
/// is available and for exercising the poller.
#[derive(Debug, Default)]
pub struct StaticEnumerator {
    state: Mutex<StaticState>,
}

impl StaticEnumerator {
    pub fn new(devices: Vec<StaticDevice>) -> Self {
        Self {
            state: Mutex::new(StaticState {
                devices,
                ..StaticState::default()
            }),
        }
    }

    /// Replace the inventory seen by subsequent listings
    pub fn set_devices(&self, devices: Vec<StaticDevice>) {
        self.lock().devices = devices;
    }

    /// Make subsequent listings fail with the given reason, or succeed again
    /// with `None`
    pub fn set_list_error(&self, reason: Option<String>) {
        self.lock().list_error = reason;
    }

    /// Number of times the device list has been refreshed
    pub fn refresh_count(&self) -> usize {
        self.lock().refresh_count
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StaticState> {
        // The state stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DeviceEnumerator for StaticEnumerator {
    type Handle = StaticHandle;

    fn refresh_device_list(&self) {
        self.lock().refresh_count += 1;
    }

    fn list_devices(&self) -> Result<Vec<StaticHandle>, EnumerationError> {
        let state = self.lock();
        if let Some(reason) = &state.list_error {
            return Err(EnumerationError::ListFailed(reason.clone()));
        }

        Ok(state
            .devices
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, device)| StaticHandle { index, device })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(serial: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: format!("TIS-{}", serial),
            physical_id: "00:07:48:00:00:01".to_string(),
            model: "DMK 33GX264".to_string(),
            serial_number: serial.to_string(),
            vendor: "The Imaging Source Europe GmbH".to_string(),
            address: "192.168.1.10".to_string(),
            protocol: "GigEVision".to_string(),
        }
    }

    #[test]
    fn test_describe_reads_every_attribute() {
        let enumerator = StaticEnumerator::new(vec![StaticDevice::new(camera("41910001"))]);
        let handles = enumerator.list_devices().unwrap();
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].describe().unwrap(), camera("41910001"));
    }

    #[test]
    fn test_describe_fails_on_unreadable_attribute() {
        let enumerator = StaticEnumerator::new(vec![
            StaticDevice::new(camera("41910001")),
            StaticDevice::new(camera("41910002")).failing_on(DeviceAttribute::Address),
        ]);
        let handles = enumerator.list_devices().unwrap();

        let err = handles[1].describe().unwrap_err();
        assert_eq!(
            err,
            EnumerationError::AttributeRead {
                index: 1,
                attribute: DeviceAttribute::Address,
                reason: "device did not respond".to_string(),
            }
        );
        assert!(err.to_string().contains("address"));
    }

    #[test]
    fn test_any_unreadable_attribute_fails_describe() {
        for attribute in DeviceAttribute::ALL {
            let enumerator = StaticEnumerator::new(vec![
                StaticDevice::new(camera("41910001")).failing_on(attribute),
            ]);
            let handles = enumerator.list_devices().unwrap();
            match handles[0].describe() {
                Err(EnumerationError::AttributeRead { attribute: failed, .. }) => {
                    assert_eq!(failed, attribute)
                }
                other => panic!("{} read should fail, got {:?}", attribute, other),
            }
        }
    }

    #[test]
    fn test_list_error_and_recovery() {
        let enumerator = StaticEnumerator::new(vec![StaticDevice::new(camera("41910001"))]);
        enumerator.set_list_error(Some("bus reset".to_string()));
        assert!(matches!(
            enumerator.list_devices(),
            Err(EnumerationError::ListFailed(_))
        ));

        enumerator.set_list_error(None);
        assert_eq!(enumerator.list_devices().unwrap().len(), 1);
    }

    #[test]
    fn test_refresh_is_counted() {
        let enumerator = StaticEnumerator::default();
        enumerator.refresh_device_list();
        enumerator.refresh_device_list();
        assert_eq!(enumerator.refresh_count(), 2);
    }
}
