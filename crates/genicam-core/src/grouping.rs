//! Partitioning of discovered devices into scheduler device groups
//!
//! Devices in the same group must share vendor, type and name, so devices are
//! bucketed by model. Member order within a group follows discovery order.

use std::collections::{BTreeMap, HashMap};

use crate::device::{DeviceDescriptor, DeviceGroup, GroupDevice, DEVICE_TYPE, VENDOR};

/// Group devices by model
///
/// Groups are returned in the order their model was first seen.
pub fn group_devices(devices: &[DeviceDescriptor]) -> Vec<DeviceGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_model: HashMap<&str, Vec<&DeviceDescriptor>> = HashMap::new();

    for device in devices {
        let model = device.model.as_str();
        by_model
            .entry(model)
            .or_insert_with(|| {
                order.push(model);
                Vec::new()
            })
            .push(device);
    }

    order
        .into_iter()
        .filter_map(|model| device_group(model, by_model.get(model).map(Vec::as_slice).unwrap_or(&[])))
        .collect()
}

/// Build one device group, or `None` when there are no members
pub fn device_group(name: &str, members: &[&DeviceDescriptor]) -> Option<DeviceGroup> {
    if members.is_empty() {
        return None;
    }

    let devices = members
        .iter()
        .map(|d| GroupDevice {
            id: d.serial_number.clone(),
            healthy: true,
        })
        .collect();

    Some(DeviceGroup {
        vendor: VENDOR.to_string(),
        device_type: DEVICE_TYPE.to_string(),
        name: name.to_string(),
        devices,
        attributes: BTreeMap::new(),
    })
}

/// Drop groups that ended up without members
pub fn non_empty_groups(groups: Vec<DeviceGroup>) -> Vec<DeviceGroup> {
    groups.into_iter().filter(|g| !g.devices.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn device(serial: &str, model: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            device_id: format!("dev-{}", serial),
            physical_id: String::new(),
            model: model.to_string(),
            serial_number: serial.to_string(),
            vendor: "The Imaging Source Europe GmbH".to_string(),
            address: "10.0.0.1".to_string(),
            protocol: "GigEVision".to_string(),
        }
    }

    #[test]
    fn test_same_model_shares_group() {
        let groups = group_devices(&[device("A1", "camX"), device("A2", "camX")]);
        assert_eq!(groups.len(), 1);

        let group = &groups[0];
        assert_eq!(group.name, "camX");
        assert_eq!(group.vendor, "tis");
        assert_eq!(group.device_type, "genicam");
        assert_eq!(group.device_ids(), vec!["A1", "A2"]);
        assert!(group.devices.iter().all(|d| d.healthy));
        assert!(group.attributes.is_empty());
    }

    #[test]
    fn test_distinct_models_never_share_group() {
        let devices = vec![
            device("A1", "camX"),
            device("B1", "camY"),
            device("A2", "camX"),
            device("C1", "camZ"),
            device("B2", "camY"),
        ];
        let groups = group_devices(&devices);

        assert_eq!(groups.len(), 3);
        for group in &groups {
            for id in group.device_ids() {
                let model = &devices.iter().find(|d| d.serial_number == id).unwrap().model;
                assert_eq!(model, &group.name);
            }
        }

        let names: HashSet<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names.len(), groups.len());
    }

    #[test]
    fn test_members_cover_every_device_in_order() {
        let devices = vec![
            device("A3", "camX"),
            device("B1", "camY"),
            device("A1", "camX"),
            device("A2", "camX"),
        ];
        let groups = group_devices(&devices);

        let camx = groups.iter().find(|g| g.name == "camX").unwrap();
        assert_eq!(camx.device_ids(), vec!["A3", "A1", "A2"]);

        let members: usize = groups.iter().map(|g| g.devices.len()).sum();
        assert_eq!(members, devices.len());
        assert!(groups.iter().all(|g| !g.devices.is_empty()));
    }

    #[test]
    fn test_no_devices_no_groups() {
        assert!(group_devices(&[]).is_empty());
    }

    #[test]
    fn test_empty_group_is_suppressed() {
        assert!(device_group("camX", &[]).is_none());

        let mut empty = device_group("camY", &[&device("B1", "camY")]).unwrap();
        empty.devices.clear();
        let kept = device_group("camX", &[&device("A1", "camX")]).unwrap();

        let groups = non_empty_groups(vec![empty, kept]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "camX");
    }
}
