//! # Zigbee Cluster Library
//!
//! The parts of the ZCL used by a Green Power sink. The frame header and the
//! identifiers needed to build the commands a sink forwards to its
//! application endpoints.

mod frame;

pub use frame::{ClusterLibraryHeader, Direction, FrameControl, FrameType};

/// Global command, report attributes
pub const GENERAL_REPORT_ATTRIBUTES: u8 = 0x0a;

/// Status code, success
pub const STATUS_SUCCESS: u8 = 0x00;
/// Status code, not found
pub const STATUS_NOT_FOUND: u8 = 0x8b;

/// Cluster identifiers
pub mod cluster {
    /// Basic
    pub const BASIC: u16 = 0x0000;
    /// Identify
    pub const IDENTIFY: u16 = 0x0003;
    /// Groups
    pub const GROUPS: u16 = 0x0004;
    /// Scenes
    pub const SCENES: u16 = 0x0005;
    /// On/off
    pub const ON_OFF: u16 = 0x0006;
    /// Level control
    pub const LEVEL_CONTROL: u16 = 0x0008;
    /// Green Power
    pub const GREEN_POWER: u16 = 0x0021;
    /// Door lock
    pub const DOOR_LOCK: u16 = 0x0101;
    /// Color control
    pub const COLOR_CONTROL: u16 = 0x0300;
    /// Illuminance measurement
    pub const ILLUMINANCE_MEASUREMENT: u16 = 0x0400;
    /// Temperature measurement
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    /// Pressure measurement
    pub const PRESSURE_MEASUREMENT: u16 = 0x0403;
    /// Flow measurement
    pub const FLOW_MEASUREMENT: u16 = 0x0404;
    /// Relative humidity measurement
    pub const RELATIVE_HUMIDITY_MEASUREMENT: u16 = 0x0405;
    /// Occupancy sensing
    pub const OCCUPANCY_SENSING: u16 = 0x0406;
    /// Reserved cluster identifier, "look elsewhere"
    pub const RESERVED: u16 = 0xffff;
}

/// Number of octets used by a value of the ZCL data type `data_type`
///
/// `None` for the variable length types (strings and collections) and for
/// unknown types.
pub fn attribute_size(data_type: u8) -> Option<usize> {
    match data_type {
        // no data
        0x00 => Some(0),
        // data8 .. data64
        0x08..=0x0f => Some((data_type - 0x07) as usize),
        // boolean
        0x10 => Some(1),
        // bitmap8 .. bitmap64
        0x18..=0x1f => Some((data_type - 0x17) as usize),
        // unsigned 8 .. 64
        0x20..=0x27 => Some((data_type - 0x1f) as usize),
        // signed 8 .. 64
        0x28..=0x2f => Some((data_type - 0x27) as usize),
        // enumeration 8, 16
        0x30 => Some(1),
        0x31 => Some(2),
        // semi, single and double precision
        0x38 => Some(2),
        0x39 => Some(4),
        0x3a => Some(8),
        // time of day, date, UTC time
        0xe0..=0xe2 => Some(4),
        // cluster and attribute identifiers
        0xe8 | 0xe9 => Some(2),
        // BACnet OID
        0xea => Some(4),
        // IEEE address
        0xf0 => Some(8),
        // 128-bit security key
        0xf1 => Some(16),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_sizes() {
        assert_eq!(attribute_size(0x08), Some(1));
        assert_eq!(attribute_size(0x0f), Some(8));
        assert_eq!(attribute_size(0x10), Some(1));
        assert_eq!(attribute_size(0x19), Some(2));
        assert_eq!(attribute_size(0x21), Some(2));
        assert_eq!(attribute_size(0x22), Some(3));
        assert_eq!(attribute_size(0x29), Some(2));
        assert_eq!(attribute_size(0x39), Some(4));
        assert_eq!(attribute_size(0xf0), Some(8));
        assert_eq!(attribute_size(0x42), None);
        assert_eq!(attribute_size(0xff), None);
    }
}
