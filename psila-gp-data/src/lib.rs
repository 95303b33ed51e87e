//! # Psila Green Power data
//!
//! Reading and writing of the frames used by a Zigbee Green Power sink. The
//! Green Power cluster commands exchanged with proxies and commissioning
//! tools, the frames sent by Green Power devices (GPD) and the records of the
//! sink table.

#![warn(missing_docs)]
#![cfg_attr(feature = "core", no_std)]

#[macro_use]
extern crate bitflags;

#[macro_use]
mod utils;

pub mod cluster_library; // ZCL
pub mod common;
pub mod device_profile; // ZDP
pub mod error;
pub mod green_power; // GP
pub mod pack;

pub use common::address::{
    ApplicationIdentifier, ExtendedAddress, GpdAddress, GroupIdentifier, PanIdentifier,
    ShortAddress,
};
pub use common::key::{Key, SecurityKeyType, SecurityLevel, DEFAULT_LINK_KEY};
pub use error::Error;
