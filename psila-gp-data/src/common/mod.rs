//! # Common structs and functions
//!
//! Addresses and security key data shared by the Green Power frames.

pub mod address;
pub mod key;

/// Home automation profile identifier
pub const PROFILE_HOME_AUTOMATION: u16 = 0x0104;
/// Green Power profile identifier
pub const PROFILE_GREEN_POWER: u16 = 0xa1e0;
/// Zigbee device profile identifier
pub const PROFILE_DEVICE: u16 = 0x0000;
