use core::convert::TryFrom;

use crate::green_power::CommunicationMode;
use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::utils::{field, flag};
use crate::{
    ApplicationIdentifier, Error, ExtendedAddress, GpdAddress, GroupIdentifier, Key,
    SecurityKeyType, SecurityLevel, ShortAddress,
};

use super::application_id;

const ADD_SINK: u32 = 0x00_0008;
const REMOVE_GPD: u32 = 0x00_0010;
const COMMUNICATION_MODE_MASK: u32 = 0x00_0060;
const COMMUNICATION_MODE_OFFSET: u32 = 5;
const GPD_FIXED: u32 = 0x00_0080;
const MAC_SEQUENCE_CAPABILITY: u32 = 0x00_0100;
const SECURITY_LEVEL_MASK: u32 = 0x00_0600;
const SECURITY_LEVEL_OFFSET: u32 = 9;
const KEY_TYPE_MASK: u32 = 0x00_3800;
const KEY_TYPE_OFFSET: u32 = 11;
const FRAME_COUNTER_PRESENT: u32 = 0x00_4000;
const KEY_PRESENT: u32 = 0x00_8000;
const ALIAS_PRESENT: u32 = 0x01_0000;
const RADIUS_PRESENT: u32 = 0x02_0000;

/// GP Pairing options, the presence bits are given by the optional fields
/// of `Pairing`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PairingOptions {
    /// GPD addressing mode, packed from the address of the pairing
    pub application_id: ApplicationIdentifier,
    /// Add the sink to the pairing, remove it otherwise
    pub add_sink: bool,
    /// Remove the GPD from the proxies
    pub remove_gpd: bool,
    /// Forwarding communication mode
    pub communication_mode: CommunicationMode,
    /// The GPD does not move
    pub gpd_fixed: bool,
    /// The GPD uses incremental MAC sequence numbers
    pub mac_sequence_number_capability: bool,
    /// GPD security level
    pub security_level: SecurityLevel,
    /// GPD key type
    pub key_type: SecurityKeyType,
}

/// Destination the proxies forward GPD commands to
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum PairingTarget {
    /// Unicast to the sink
    Sink(ExtendedAddress, ShortAddress),
    /// Groupcast to a group
    Group(GroupIdentifier),
}

/// GP Pairing
///
/// Sent by the sink to tell the proxies how to forward commands of a GPD
#[derive(Clone, Debug, PartialEq)]
pub struct Pairing {
    /// Options
    pub options: PairingOptions,
    /// GPD address
    pub address: GpdAddress,
    /// Forwarding target, not included when the GPD is removed
    pub target: Option<PairingTarget>,
    /// GPD device identifier, included when a sink is added
    pub device_id: u8,
    /// GPD security frame counter
    pub frame_counter: Option<u32>,
    /// GPD security key
    pub key: Option<Key>,
    /// Assigned alias
    pub alias: Option<ShortAddress>,
    /// Groupcast radius
    pub radius: Option<u8>,
}

impl Pairing {
    fn options_value(&self) -> u32 {
        let options = &self.options;
        let mut value = u8::from(self.address.application_id()) as u32;
        value |= (u8::from(options.communication_mode) as u32) << COMMUNICATION_MODE_OFFSET;
        value |= (u8::from(options.security_level) as u32) << SECURITY_LEVEL_OFFSET;
        value |= (u8::from(options.key_type) as u32) << KEY_TYPE_OFFSET;
        for (set, bit) in [
            (options.add_sink, ADD_SINK),
            (options.remove_gpd, REMOVE_GPD),
            (options.gpd_fixed, GPD_FIXED),
            (options.mac_sequence_number_capability, MAC_SEQUENCE_CAPABILITY),
            (self.frame_counter.is_some(), FRAME_COUNTER_PRESENT),
            (self.key.is_some(), KEY_PRESENT),
            (self.alias.is_some(), ALIAS_PRESENT),
            (self.radius.is_some(), RADIUS_PRESENT),
        ] {
            if set {
                value |= bit;
            }
        }
        value
    }
}

impl Pack<Pairing, Error> for Pairing {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u24(self.options_value())?;
        self.address.write(&mut writer)?;
        if !self.options.remove_gpd {
            match (self.options.communication_mode.is_groupcast(), self.target) {
                (false, Some(PairingTarget::Sink(extended, short))) => {
                    writer.write_u64(u64::from(extended))?;
                    writer.write_u16(u16::from(short))?;
                }
                (true, Some(PairingTarget::Group(group))) => {
                    writer.write_u16(u16::from(group))?;
                }
                _ => return Err(Error::InvalidValue),
            }
        }
        if self.options.add_sink {
            writer.write_u8(self.device_id)?;
        }
        if let Some(frame_counter) = self.frame_counter {
            writer.write_u32(frame_counter)?;
        }
        if let Some(key) = self.key {
            writer.write_slice(key.as_bytes())?;
        }
        if let Some(alias) = self.alias {
            writer.write_u16(u16::from(alias))?;
        }
        if let Some(radius) = self.radius {
            writer.write_u8(radius)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let value = reader.read_u24()?;
        let options = PairingOptions {
            application_id: application_id(value)?,
            add_sink: flag(value, ADD_SINK),
            remove_gpd: flag(value, REMOVE_GPD),
            communication_mode: CommunicationMode::try_from(field(
                value,
                COMMUNICATION_MODE_MASK,
                COMMUNICATION_MODE_OFFSET,
            ))?,
            gpd_fixed: flag(value, GPD_FIXED),
            mac_sequence_number_capability: flag(value, MAC_SEQUENCE_CAPABILITY),
            security_level: SecurityLevel::try_from(field(
                value,
                SECURITY_LEVEL_MASK,
                SECURITY_LEVEL_OFFSET,
            ))?,
            key_type: SecurityKeyType::try_from(field(value, KEY_TYPE_MASK, KEY_TYPE_OFFSET))?,
        };
        let address = GpdAddress::read(&mut reader, options.application_id)?;
        let target = if options.remove_gpd {
            None
        } else if options.communication_mode.is_groupcast() {
            Some(PairingTarget::Group(ShortAddress::new(reader.read_u16()?)))
        } else {
            let extended = ExtendedAddress::new(reader.read_u64()?);
            let short = ShortAddress::new(reader.read_u16()?);
            Some(PairingTarget::Sink(extended, short))
        };
        let device_id = if options.add_sink {
            reader.read_u8()?
        } else {
            0xff
        };
        let frame_counter = if flag(value, FRAME_COUNTER_PRESENT) {
            Some(reader.read_u32()?)
        } else {
            None
        };
        let key = if flag(value, KEY_PRESENT) {
            Some(Key::unpack(reader.read_slice(16)?)?)
        } else {
            None
        };
        let alias = if flag(value, ALIAS_PRESENT) {
            Some(ShortAddress::new(reader.read_u16()?))
        } else {
            None
        };
        let radius = if flag(value, RADIUS_PRESENT) {
            Some(reader.read_u8()?)
        } else {
            None
        };
        Ok((
            Self {
                options,
                address,
                target,
                device_id,
                frame_counter,
                key,
                alias,
                radius,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(mode: CommunicationMode) -> PairingOptions {
        PairingOptions {
            application_id: ApplicationIdentifier::SourceId,
            add_sink: true,
            remove_gpd: false,
            communication_mode: mode,
            gpd_fixed: false,
            mac_sequence_number_capability: true,
            security_level: SecurityLevel::None,
            key_type: SecurityKeyType::NoKey,
        }
    }

    #[test]
    fn pack_derived_groupcast_pairing() {
        let pairing = Pairing {
            options: options(CommunicationMode::DerivedGroupcast),
            address: GpdAddress::SourceId(0x1234_5678),
            target: Some(PairingTarget::Group(ShortAddress::new(0x5678))),
            device_id: 0x02,
            frame_counter: Some(0x10),
            key: None,
            alias: None,
            radius: None,
        };
        let mut data = [0u8; 64];
        let used = pairing.pack(&mut data).unwrap();
        assert_eq!(
            data[..used],
            [
                0x28, 0x41, 0x00, 0x78, 0x56, 0x34, 0x12, 0x78, 0x56, 0x02, 0x10, 0x00, 0x00,
                0x00
            ]
        );
        let (unpacked, used) = Pairing::unpack(&data[..used]).unwrap();
        assert_eq!(used, 14);
        assert_eq!(unpacked, pairing);
    }

    #[test]
    fn unicast_pairing_with_key() {
        let mut options = options(CommunicationMode::FullUnicast);
        options.application_id = ApplicationIdentifier::Ieee;
        options.security_level = SecurityLevel::Encryption;
        options.key_type = SecurityKeyType::IndividualKey;
        let pairing = Pairing {
            options,
            address: GpdAddress::Ieee(ExtendedAddress::new(0x0102_0304_0506_0708), 1),
            target: Some(PairingTarget::Sink(
                ExtendedAddress::new(0x1111_2222_3333_4444),
                ShortAddress::new(0x0000),
            )),
            device_id: 0x07,
            frame_counter: Some(0x0400),
            key: Some(Key::from([0xcc; 16])),
            alias: Some(ShortAddress::new(0x0708)),
            radius: Some(0x0a),
        };
        let mut data = [0u8; 64];
        let used = pairing.pack(&mut data).unwrap();
        assert_eq!(used, 3 + 9 + 10 + 1 + 4 + 16 + 2 + 1);
        assert_eq!(data[..3], [0x0a, 0xe7, 0x03]);
        let (unpacked, _) = Pairing::unpack(&data[..used]).unwrap();
        assert_eq!(unpacked, pairing);
    }

    #[test]
    fn application_id_from_address() {
        let pairing = Pairing {
            options: options(CommunicationMode::FullUnicast),
            address: GpdAddress::Ieee(ExtendedAddress::new(0x0102_0304_0506_0708), 2),
            target: Some(PairingTarget::Sink(
                ExtendedAddress::new(0x1111_2222_3333_4444),
                ShortAddress::new(0x0001),
            )),
            device_id: 0x02,
            frame_counter: None,
            key: None,
            alias: None,
            radius: None,
        };
        let mut data = [0u8; 64];
        let used = pairing.pack(&mut data).unwrap();
        assert_eq!(data[0] & 0x07, 0x02);
        let (unpacked, _) = Pairing::unpack(&data[..used]).unwrap();
        assert_eq!(unpacked.options.application_id, ApplicationIdentifier::Ieee);
        assert_eq!(unpacked.address, pairing.address);
    }

    #[test]
    fn remove_gpd_pairing() {
        let mut options = options(CommunicationMode::DerivedGroupcast);
        options.add_sink = false;
        options.remove_gpd = true;
        options.mac_sequence_number_capability = false;
        let pairing = Pairing {
            options,
            address: GpdAddress::SourceId(0x0000_abcd),
            target: None,
            device_id: 0xff,
            frame_counter: None,
            key: None,
            alias: None,
            radius: None,
        };
        let mut data = [0u8; 16];
        let used = pairing.pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x30, 0x00, 0x00, 0xcd, 0xab, 0x00, 0x00]);
        let (unpacked, _) = Pairing::unpack(&data[..used]).unwrap();
        assert_eq!(unpacked, pairing);
    }

    #[test]
    fn target_must_match_mode() {
        let pairing = Pairing {
            options: options(CommunicationMode::FullUnicast),
            address: GpdAddress::SourceId(1),
            target: Some(PairingTarget::Group(ShortAddress::new(1))),
            device_id: 0x02,
            frame_counter: None,
            key: None,
            alias: None,
            radius: None,
        };
        let mut data = [0u8; 32];
        assert_eq!(pairing.pack(&mut data), Err(Error::InvalidValue));
    }
}
