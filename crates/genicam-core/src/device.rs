//! Device types for fingerprinting and reservation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Vendor label attached to every device group
///
/// Along with `type` and `name` this is what a job uses to request devices.
pub const VENDOR: &str = "tis";

/// Device type attached to every device group
pub const DEVICE_TYPE: &str = "genicam";

/// Identity attributes of one discovered device
///
/// Built fresh from the enumeration interface on every fingerprint cycle and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Enumeration-session identifier (not stable across restarts)
    pub device_id: String,
    /// Physical identifier reported by the transport layer
    pub physical_id: String,
    /// Model name, used as the grouping key
    pub model: String,
    /// Stable identifier, exposed as the device ID to the scheduler
    pub serial_number: String,
    /// Manufacturer reported by the device
    pub vendor: String,
    /// Connection endpoint (e.g. IP address for GigE Vision)
    pub address: String,
    /// Transport protocol (e.g. "GigEVision", "USB3Vision")
    pub protocol: String,
}

/// A device as reported to the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDevice {
    /// Serial number of the device
    pub id: String,
    pub healthy: bool,
}

/// A named bucket of interchangeable devices sharing a model
///
/// Devices in the same group are assumed to have identical attributes; devices
/// that differ must be split into groups with different names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: String,
    /// Group name (the device model)
    pub name: String,
    pub devices: Vec<GroupDevice>,
    pub attributes: BTreeMap<String, String>,
}

impl DeviceGroup {
    /// Serial numbers of the group members, in member order
    pub fn device_ids(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.id.as_str()).collect()
    }
}

/// Result of one fingerprint cycle
///
/// An event with no groups is meaningful: it tells the consumer that no
/// devices are currently available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintEvent {
    pub groups: Vec<DeviceGroup>,
    pub observed_at: DateTime<Utc>,
}

impl FingerprintEvent {
    pub fn new(groups: Vec<DeviceGroup>) -> Self {
        Self {
            groups,
            observed_at: Utc::now(),
        }
    }

    /// Total number of devices across all groups
    pub fn device_count(&self) -> usize {
        self.groups.iter().map(|g| g.devices.len()).sum()
    }

    /// Find a group by name
    pub fn group(&self, name: &str) -> Option<&DeviceGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Per-group statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGroupStats {
    pub vendor: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub name: String,
    pub instance_stats: BTreeMap<String, BTreeMap<String, String>>,
}

/// One sample of the statistics stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEvent {
    pub groups: Vec<DeviceGroupStats>,
    pub timestamp: DateTime<Utc>,
}

impl StatsEvent {
    /// A sample carrying no device statistics
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// A device that passed reservation, with its resolved address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedDevice {
    pub serial_number: String,
    pub address: String,
}

/// Host path mounted into the task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    pub task_path: String,
    pub host_path: String,
    pub read_only: bool,
}

/// Device node exposed to the task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub task_path: String,
    pub host_path: String,
    pub cgroup_permissions: String,
}

/// What a task needs to use its reserved devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerReservation {
    /// Environment variables to set for the task
    pub envs: BTreeMap<String, String>,
    pub mounts: Vec<Mount>,
    pub devices: Vec<DeviceSpec>,
}

impl ContainerReservation {
    pub fn is_empty(&self) -> bool {
        self.envs.is_empty() && self.mounts.is_empty() && self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(name: &str, ids: &[&str]) -> DeviceGroup {
        DeviceGroup {
            vendor: VENDOR.to_string(),
            device_type: DEVICE_TYPE.to_string(),
            name: name.to_string(),
            devices: ids
                .iter()
                .map(|id| GroupDevice {
                    id: id.to_string(),
                    healthy: true,
                })
                .collect(),
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn test_fingerprint_event_device_count() {
        let event = FingerprintEvent::new(vec![group("camX", &["A1", "A2"]), group("camY", &["B1"])]);
        assert_eq!(event.device_count(), 3);
        assert_eq!(event.group("camY").unwrap().device_ids(), vec!["B1"]);
        assert!(event.group("camZ").is_none());
    }

    #[test]
    fn test_device_group_serializes_type_field() {
        let json = serde_json::to_value(group("camX", &["A1"])).unwrap();
        assert_eq!(json["type"], "genicam");
        assert_eq!(json["vendor"], "tis");
        assert_eq!(json["devices"][0]["id"], "A1");
    }

    #[test]
    fn test_default_reservation_is_empty() {
        assert!(ContainerReservation::default().is_empty());
    }
}
