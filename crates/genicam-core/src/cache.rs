//! Concurrent device cache
//!
//! Maps device serial numbers to their connection address. The discovery
//! poller is the only writer; reservation checks read concurrently. Every
//! merge is applied under one exclusive lock acquisition, so readers observe
//! either the previous snapshot or the new one, never a mix.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::device::{DeviceDescriptor, ReservedDevice};

/// How a merge treats cached devices absent from the new snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Drop devices that were not seen in the latest cycle
    #[default]
    Replace,
    /// Keep every device ever seen, updating addresses of those seen again
    Retain,
}

/// Shared serial number to address map
#[derive(Debug, Clone, Default)]
pub struct DeviceCache {
    devices: Arc<RwLock<HashMap<String, String>>>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one cycle's devices to the cache
    pub async fn merge<'a, I>(&self, entries: I, policy: MergePolicy)
    where
        I: IntoIterator<Item = &'a DeviceDescriptor>,
    {
        let mut devices = self.devices.write().await;
        if policy == MergePolicy::Replace {
            devices.clear();
        }
        for entry in entries {
            devices.insert(entry.serial_number.clone(), entry.address.clone());
        }
        debug!(total = devices.len(), ?policy, "Device cache updated");
    }

    /// Address of a single device
    pub async fn lookup(&self, serial_number: &str) -> Option<String> {
        self.devices.read().await.get(serial_number).cloned()
    }

    /// Resolve every requested serial number against one consistent snapshot
    ///
    /// Returns one entry per requested id on success, or every id that is not
    /// cached.
    pub async fn lookup_all<S>(&self, serial_numbers: &[S]) -> Result<Vec<ReservedDevice>, Vec<String>>
    where
        S: AsRef<str>,
    {
        let devices = self.devices.read().await;

        let missing: Vec<String> = serial_numbers
            .iter()
            .map(|id| AsRef::<str>::as_ref(id))
            .filter(|id| !devices.contains_key(*id))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(serial_numbers
            .iter()
            .filter_map(|id| {
                let id: &str = id.as_ref();
                devices.get(id).map(|address| ReservedDevice {
                    serial_number: id.to_string(),
                    address: address.clone(),
                })
            })
            .collect())
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Sorted copy of the cache contents
    pub async fn snapshot(&self) -> BTreeMap<String, String> {
        self.devices
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
