//! GenICam Core - Device types, enumeration, cache, and grouping
//!
//! This crate provides the foundational pieces of the GenICam device plugin:
//! - Device descriptors, device groups, and the events streamed to the host
//! - The enumeration traits a vendor SDK binding implements
//! - The concurrent serial-number to address cache used for reservations
//! - Grouping of discovered devices by model for the scheduler

pub mod cache;
pub mod device;
pub mod enumerate;
pub mod grouping;

pub use cache::{DeviceCache, MergePolicy};
pub use device::{
    ContainerReservation, DeviceDescriptor, DeviceGroup, DeviceGroupStats, DeviceSpec,
    FingerprintEvent, GroupDevice, Mount, ReservedDevice, StatsEvent, DEVICE_TYPE, VENDOR,
};
pub use enumerate::{
    DeviceAttribute, DeviceEnumerator, DeviceHandle, EnumerationError, StaticDevice,
    StaticEnumerator, StaticHandle,
};
pub use grouping::{device_group, group_devices, non_empty_groups};
