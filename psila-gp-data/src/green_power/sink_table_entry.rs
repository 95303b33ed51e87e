//! # Sink table entry
//!
//! A sink table entry in the layout of the GP Sink Table Response and in a
//! fixed size record used for persistent storage.

use core::convert::TryFrom;

use crate::green_power::{
    read_group_list, write_group_list, CommunicationMode, GroupList, SecurityOptions, SinkGroup,
};
use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::utils::{field, flag};
use crate::{Error, ExtendedAddress, GpdAddress, Key, SecurityLevel, ShortAddress};

use super::commands::application_id;

const COMMUNICATION_MODE_MASK: u32 = 0x0018;
const COMMUNICATION_MODE_OFFSET: u32 = 3;
const SEQUENCE_NUMBER_CAPABILITY: u32 = 0x0020;
const RX_ON_CAPABILITY: u32 = 0x0040;
const GPD_FIXED: u32 = 0x0080;
const ASSIGNED_ALIAS: u32 = 0x0100;
const SECURITY_USE: u32 = 0x0200;

const RECORD_ACTIVE: u8 = 0x01;
const RECORD_UNUSED: u8 = 0xff;

/// Size of a persistent sink table record
pub const SINK_TABLE_RECORD_SIZE: usize = 46;

/// Sink table entry options, the application identifier, assigned alias
/// and security use bits follow the fields of `SinkTableEntry`
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SinkTableOptions {
    /// Forwarding communication mode
    pub communication_mode: CommunicationMode,
    /// The GPD uses incremental MAC sequence numbers
    pub sequence_number_capability: bool,
    /// The GPD receiver is on
    pub rx_on_capability: bool,
    /// The GPD does not move
    pub gpd_fixed: bool,
}

impl Default for SinkTableOptions {
    fn default() -> Self {
        Self {
            communication_mode: CommunicationMode::FullUnicast,
            sequence_number_capability: false,
            rx_on_capability: false,
            gpd_fixed: false,
        }
    }
}

/// Sink table entry
#[derive(Clone, Debug, PartialEq)]
pub struct SinkTableEntry {
    /// Options
    pub options: SinkTableOptions,
    /// GPD address
    pub address: GpdAddress,
    /// GPD device identifier
    pub device_id: u8,
    /// Groups for groupcast forwarding
    pub groups: GroupList,
    /// Assigned alias
    pub alias: Option<ShortAddress>,
    /// Groupcast radius
    pub radius: u8,
    /// Security options, `None` when security is not used
    pub security: Option<SecurityOptions>,
    /// GPD security frame counter
    pub frame_counter: u32,
    /// GPD security key
    pub key: Key,
}

impl SinkTableEntry {
    /// Create a entry for `address` without security
    pub fn new(address: GpdAddress, device_id: u8) -> Self {
        Self {
            options: SinkTableOptions::default(),
            address,
            device_id,
            groups: GroupList::new(),
            alias: None,
            radius: 0xff,
            security: None,
            frame_counter: 0,
            key: Key::default(),
        }
    }

    /// Communication mode
    pub fn communication_mode(&self) -> CommunicationMode {
        self.options.communication_mode
    }

    /// Security level, `SecurityLevel::None` when security is not used
    pub fn security_level(&self) -> SecurityLevel {
        self.security
            .map(|s| s.level)
            .unwrap_or(SecurityLevel::None)
    }

    /// Add a group, a group that is already listed is not added again
    pub fn add_group(&mut self, group: SinkGroup) -> Result<(), Error> {
        if self.groups.iter().any(|g| g.group == group.group) {
            return Ok(());
        }
        self.groups.push(group).map_err(|_| Error::TooManyItems)
    }

    /// The options field
    pub fn options_value(&self) -> u16 {
        let options = &self.options;
        let mut value = u8::from(self.address.application_id()) as u32;
        value |= (u8::from(options.communication_mode) as u32) << COMMUNICATION_MODE_OFFSET;
        for (set, bit) in [
            (options.sequence_number_capability, SEQUENCE_NUMBER_CAPABILITY),
            (options.rx_on_capability, RX_ON_CAPABILITY),
            (options.gpd_fixed, GPD_FIXED),
            (self.alias.is_some(), ASSIGNED_ALIAS),
            (self.security.is_some(), SECURITY_USE),
        ] {
            if set {
                value |= bit;
            }
        }
        value as u16
    }

    fn options_from_value(value: u32) -> Result<SinkTableOptions, Error> {
        Ok(SinkTableOptions {
            communication_mode: CommunicationMode::try_from(field(
                value,
                COMMUNICATION_MODE_MASK,
                COMMUNICATION_MODE_OFFSET,
            ))?,
            sequence_number_capability: flag(value, SEQUENCE_NUMBER_CAPABILITY),
            rx_on_capability: flag(value, RX_ON_CAPABILITY),
            gpd_fixed: flag(value, GPD_FIXED),
        })
    }

    /// Write the entry as a fixed size persistent record
    pub fn write_record(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != SINK_TABLE_RECORD_SIZE {
            return Err(Error::WrongNumberOfBytes);
        }
        for b in data.iter_mut() {
            *b = 0;
        }
        let mut writer = Writer::new(data);
        writer.write_u8(RECORD_ACTIVE)?;
        writer.write_u16(self.options_value())?;
        match self.address {
            GpdAddress::SourceId(id) => {
                writer.write_u64(id as u64)?;
                writer.write_u8(0)?;
            }
            GpdAddress::Ieee(address, endpoint) => {
                writer.write_u64(u64::from(address))?;
                writer.write_u8(endpoint)?;
            }
        }
        writer.write_u8(self.device_id)?;
        writer.write_u8(self.groups.len() as u8)?;
        for index in 0..crate::green_power::MAX_SINK_GROUPS {
            let group = self.groups.get(index).copied().unwrap_or(SinkGroup {
                group: ShortAddress::new(0),
                alias: ShortAddress::new(0),
            });
            writer.write_u16(u16::from(group.group))?;
            writer.write_u16(u16::from(group.alias))?;
        }
        writer.write_u16(self.alias.map(u16::from).unwrap_or(0xffff))?;
        writer.write_u8(self.radius)?;
        writer.write_u8(self.security.map(u8::from).unwrap_or(0))?;
        writer.write_u32(self.frame_counter)?;
        writer.write_slice(self.key.as_bytes())?;
        Ok(())
    }

    /// Mark a persistent record as unused
    pub fn clear_record(data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = RECORD_UNUSED;
        }
    }

    /// Read a persistent record, `None` for a unused record
    pub fn read_record(data: &[u8]) -> Result<Option<Self>, Error> {
        if data.len() != SINK_TABLE_RECORD_SIZE {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut reader = Reader::new(data);
        match reader.read_u8()? {
            RECORD_ACTIVE => (),
            RECORD_UNUSED => return Ok(None),
            _ => return Err(Error::InvalidValue),
        }
        let value = reader.read_u16()? as u32;
        let options = Self::options_from_value(value)?;
        let raw_address = reader.read_u64()?;
        let endpoint = reader.read_u8()?;
        let address = match application_id(value)? {
            crate::ApplicationIdentifier::SourceId => GpdAddress::SourceId(raw_address as u32),
            crate::ApplicationIdentifier::Ieee => {
                GpdAddress::Ieee(ExtendedAddress::new(raw_address), endpoint)
            }
        };
        let device_id = reader.read_u8()?;
        let count = reader.read_u8()? as usize;
        let mut groups = GroupList::new();
        for index in 0..crate::green_power::MAX_SINK_GROUPS {
            let group = ShortAddress::new(reader.read_u16()?);
            let alias = ShortAddress::new(reader.read_u16()?);
            if index < count {
                groups
                    .push(SinkGroup { group, alias })
                    .map_err(|_| Error::TooManyItems)?;
            }
        }
        let alias = ShortAddress::new(reader.read_u16()?);
        let radius = reader.read_u8()?;
        let security_options = SecurityOptions::try_from(reader.read_u8()?)?;
        let frame_counter = reader.read_u32()?;
        let key = Key::unpack(reader.read_slice(16)?)?;
        Ok(Some(Self {
            options,
            address,
            device_id,
            groups,
            alias: if flag(value, ASSIGNED_ALIAS) {
                Some(alias)
            } else {
                None
            },
            radius,
            security: if flag(value, SECURITY_USE) {
                Some(security_options)
            } else {
                None
            },
            frame_counter,
            key,
        }))
    }
}

/// Packed in the GP Sink Table Response layout
impl Pack<SinkTableEntry, Error> for SinkTableEntry {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u16(self.options_value())?;
        self.address.write(&mut writer)?;
        writer.write_u8(self.device_id)?;
        if self.options.communication_mode == CommunicationMode::Groupcast {
            write_group_list(&mut writer, &self.groups)?;
        }
        if let Some(alias) = self.alias {
            writer.write_u16(u16::from(alias))?;
        }
        writer.write_u8(self.radius)?;
        if let Some(security) = self.security {
            writer.write_u8(u8::from(security))?;
            if security.level != SecurityLevel::None || self.options.sequence_number_capability {
                writer.write_u32(self.frame_counter)?;
                if security.level != SecurityLevel::None {
                    writer.write_slice(self.key.as_bytes())?;
                }
            }
        } else if self.options.sequence_number_capability {
            writer.write_u32(self.frame_counter)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let value = reader.read_u16()? as u32;
        let options = Self::options_from_value(value)?;
        let address = GpdAddress::read(&mut reader, application_id(value)?)?;
        let device_id = reader.read_u8()?;
        let groups = if options.communication_mode == CommunicationMode::Groupcast {
            read_group_list(&mut reader)?
        } else {
            GroupList::new()
        };
        let alias = if flag(value, ASSIGNED_ALIAS) {
            Some(ShortAddress::new(reader.read_u16()?))
        } else {
            None
        };
        let radius = reader.read_u8()?;
        let mut frame_counter = 0;
        let mut key = Key::default();
        let security = if flag(value, SECURITY_USE) {
            let security = SecurityOptions::try_from(reader.read_u8()?)?;
            if security.level != SecurityLevel::None || options.sequence_number_capability {
                frame_counter = reader.read_u32()?;
                if security.level != SecurityLevel::None {
                    key = Key::unpack(reader.read_slice(16)?)?;
                }
            }
            Some(security)
        } else {
            if options.sequence_number_capability {
                frame_counter = reader.read_u32()?;
            }
            None
        };
        Ok((
            Self {
                options,
                address,
                device_id,
                groups,
                alias,
                radius,
                security,
                frame_counter,
                key,
            },
            reader.offset(),
        ))
    }
}
