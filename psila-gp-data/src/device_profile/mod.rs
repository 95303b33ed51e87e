//! # Zigbee Device Profile
//!
//! The sink announces the alias of a commissioned GPD so that other nodes
//! can resolve address conflicts with it.

mod device_announce;

pub use device_announce::DeviceAnnounce;

/// Cluster identifier for the device announce command
pub const DEVICE_ANNOUNCE: u16 = 0x0013;
