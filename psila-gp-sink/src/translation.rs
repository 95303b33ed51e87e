//! # Translation table
//!
//! Maps the commands of paired GPDs to ZCL commands on the application
//! endpoints. Each entry names the GPD and GPD command it applies to, the
//! endpoint, cluster and ZCL command to send and a payload template.
//!
//! The payload template is stored as a length octet on the wire and in the
//! persisted record, with three reserved lengths:
//!
//!  * `0x00`, the ZCL command has no payload
//!  * `0xff`, the GPD payload is copied as is
//!  * `0xfe`, the ZCL payload is derived from the GPD payload
//!
//! Any other length is a fixed payload stored with the entry. Fixed payloads
//! take a slot in the customized table, which is much smaller than the
//! translation table itself. Commands without a entry can still be forwarded
//! through the static default table.

use psila_gp_data::cluster_library::{cluster, GENERAL_REPORT_ATTRIBUTES};
use psila_gp_data::common::address::ExtendedAddress;
use psila_gp_data::green_power::{gpd_command, HOME_AUTOMATION_PROFILE};
use psila_gp_data::pack::{Reader, Writer};
use psila_gp_data::GpdAddress;

use crate::config::MAX_TRANSLATION_ENTRIES;
use crate::storage::{PersistentStorage, TableId};
use crate::Error;

/// No payload
pub const PAYLOAD_NONE: u8 = 0x00;
/// Derive the payload from the GPD payload
pub const PAYLOAD_PARSE: u8 = 0xfe;
/// Copy the GPD payload
pub const PAYLOAD_COPY: u8 = 0xff;

/// Longest fixed payload of a customized entry
pub const MAX_FIXED_PAYLOAD: usize = 16;

/// Size of a persisted translation table record
pub const TRANSLATION_RECORD_SIZE: usize = 45;

const RECORD_UNUSED: u8 = 0x00;
const RECORD_ACTIVE: u8 = 0x01;

const INFO_NONE: u8 = 0x00;
const INFO_COMPACT_ATTRIBUTE_REPORT: u8 = 0x01;
const INFO_GENERIC_SWITCH: u8 = 0x02;
const INFO_SIZE: usize = 9;

const DEFAULT_IDENTIFY_TIME: u16 = 60;

/// Fixed payload octets
pub type FixedPayload = heapless::Vec<u8, MAX_FIXED_PAYLOAD>;

/// Payload of the ZCL command sent for a GPD command
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadTemplate {
    /// No payload
    None,
    /// The GPD payload as is
    Copy,
    /// Derived from the GPD payload
    Parse,
    /// A fixed payload
    Fixed(FixedPayload),
}

impl PayloadTemplate {
    /// Template from a length octet and the octets that follow it
    pub fn from_length(length: u8, data: &[u8]) -> Result<Self, Error> {
        match length {
            PAYLOAD_NONE => Ok(PayloadTemplate::None),
            PAYLOAD_COPY => Ok(PayloadTemplate::Copy),
            PAYLOAD_PARSE => Ok(PayloadTemplate::Parse),
            _ => {
                let length = length as usize;
                if length > data.len() {
                    return Err(Error::MalformedPacket);
                }
                FixedPayload::from_slice(&data[..length])
                    .map(PayloadTemplate::Fixed)
                    .map_err(|_| Error::NotEnoughSpace)
            }
        }
    }

    /// The length octet
    pub fn length(&self) -> u8 {
        match self {
            PayloadTemplate::None => PAYLOAD_NONE,
            PayloadTemplate::Copy => PAYLOAD_COPY,
            PayloadTemplate::Parse => PAYLOAD_PARSE,
            PayloadTemplate::Fixed(data) => data.len() as u8,
        }
    }

    /// True if the template needs a slot in the customized table
    pub fn is_customized(&self) -> bool {
        matches!(self, PayloadTemplate::Fixed(_))
    }
}

/// Command specific data that tells entries for the same GPD command apart
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AdditionalInfo {
    /// No additional information
    None,
    /// One attribute of a compact attribute report
    CompactAttributeReport {
        /// Report identifier
        report_id: u8,
        /// Offset of the value in the report, after the report identifier
        offset: u8,
        /// Cluster identifier
        cluster: u16,
        /// Attribute identifier
        attribute: u16,
        /// ZCL data type
        data_type: u8,
        /// The attribute is a server attribute
        server: bool,
    },
    /// Contacts of a generic switch
    GenericSwitch {
        /// Contact status that selects the entry
        contacts: u8,
        /// Contacts that are compared
        mask: u8,
    },
}

impl AdditionalInfo {
    /// True if `payload` of the GPD command selects the entry
    pub fn accepts(&self, payload: &[u8]) -> bool {
        match *self {
            AdditionalInfo::None => true,
            AdditionalInfo::CompactAttributeReport { report_id, .. } => {
                payload.first() == Some(&report_id)
            }
            AdditionalInfo::GenericSwitch { contacts, mask } => match payload.first() {
                Some(value) => value & mask == contacts & mask,
                None => false,
            },
        }
    }

    fn write(&self, writer: &mut Writer) -> Result<(), Error> {
        let mut block = [0u8; INFO_SIZE];
        match *self {
            AdditionalInfo::None => (),
            AdditionalInfo::CompactAttributeReport {
                report_id,
                offset,
                cluster,
                attribute,
                data_type,
                server,
            } => {
                let mut info = Writer::new(&mut block);
                info.write_u8(INFO_COMPACT_ATTRIBUTE_REPORT)?;
                info.write_u8(report_id)?;
                info.write_u8(offset)?;
                info.write_u16(cluster)?;
                info.write_u16(attribute)?;
                info.write_u8(data_type)?;
                info.write_u8(server as u8)?;
            }
            AdditionalInfo::GenericSwitch { contacts, mask } => {
                block[0] = INFO_GENERIC_SWITCH;
                block[1] = contacts;
                block[2] = mask;
            }
        }
        writer.write_slice(&block)?;
        Ok(())
    }

    fn read(reader: &mut Reader) -> Result<Self, Error> {
        let mut info = Reader::new(reader.read_slice(INFO_SIZE)?);
        match info.read_u8()? {
            INFO_NONE => Ok(AdditionalInfo::None),
            INFO_COMPACT_ATTRIBUTE_REPORT => Ok(AdditionalInfo::CompactAttributeReport {
                report_id: info.read_u8()?,
                offset: info.read_u8()?,
                cluster: info.read_u16()?,
                attribute: info.read_u16()?,
                data_type: info.read_u8()?,
                server: info.read_u8()? != 0,
            }),
            INFO_GENERIC_SWITCH => Ok(AdditionalInfo::GenericSwitch {
                contacts: info.read_u8()?,
                mask: info.read_u8()?,
            }),
            _ => Err(Error::MalformedPacket),
        }
    }
}

/// Translation of one GPD command to a ZCL command
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationEntry {
    /// GPD address
    pub address: GpdAddress,
    /// GPD command identifier
    pub gpd_command: u8,
    /// Application endpoint
    pub endpoint: u8,
    /// Profile identifier
    pub profile: u16,
    /// Cluster identifier
    pub cluster: u16,
    /// ZCL command identifier
    pub zcl_command: u8,
    /// The command is sent to the server side of the cluster
    pub server: bool,
    /// Payload template
    pub payload: PayloadTemplate,
    /// Additional information
    pub info: AdditionalInfo,
}

impl TranslationEntry {
    /// Entry for `gpd_command` on `endpoint` using the default translation,
    /// `None` if there is no default translation for the command
    pub fn from_default(address: GpdAddress, gpd_command: u8, endpoint: u8) -> Option<Self> {
        default_translation(gpd_command).map(|translation| Self {
            address,
            gpd_command,
            endpoint,
            profile: HOME_AUTOMATION_PROFILE,
            cluster: translation.cluster,
            zcl_command: translation.zcl_command,
            server: true,
            payload: translation.template(),
            info: AdditionalInfo::None,
        })
    }

    fn same_key(&self, other: &TranslationEntry) -> bool {
        self.address.matches(&other.address)
            && self.gpd_command == other.gpd_command
            && self.endpoint == other.endpoint
            && self.cluster == other.cluster
            && self.info == other.info
    }

    /// Write the persisted record
    pub fn write_record(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() < TRANSLATION_RECORD_SIZE {
            return Err(Error::NotEnoughSpace);
        }
        let mut writer = Writer::new(&mut data[..TRANSLATION_RECORD_SIZE]);
        writer.write_u8(RECORD_ACTIVE)?;
        writer.write_u8(u8::from(self.address.application_id()))?;
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
        writer.write_u8(self.gpd_command)?;
        writer.write_u8(self.endpoint)?;
        writer.write_u16(self.profile)?;
        writer.write_u16(self.cluster)?;
        writer.write_u8(self.zcl_command)?;
        writer.write_u8(self.server as u8)?;
        writer.write_u8(self.payload.length())?;
        let mut fixed = [0u8; MAX_FIXED_PAYLOAD];
        if let PayloadTemplate::Fixed(payload) = &self.payload {
            fixed[..payload.len()].copy_from_slice(payload);
        }
        writer.write_slice(&fixed)?;
        self.info.write(&mut writer)?;
        Ok(())
    }

    /// Read a persisted record, `None` for a unused record
    pub fn read_record(data: &[u8]) -> Result<Option<Self>, Error> {
        let mut reader = Reader::new(data);
        match reader.read_u8()? {
            RECORD_ACTIVE => (),
            RECORD_UNUSED => return Ok(None),
            _ => return Err(Error::MalformedPacket),
        }
        let application_id = reader.read_u8()?;
        let raw_address = reader.read_u64()?;
        let gpd_endpoint = reader.read_u8()?;
        let address = match application_id {
            0 => GpdAddress::SourceId(raw_address as u32),
            2 => GpdAddress::Ieee(ExtendedAddress::new(raw_address), gpd_endpoint),
            _ => return Err(Error::MalformedPacket),
        };
        let gpd_command = reader.read_u8()?;
        let endpoint = reader.read_u8()?;
        let profile = reader.read_u16()?;
        let cluster = reader.read_u16()?;
        let zcl_command = reader.read_u8()?;
        let server = reader.read_u8()? != 0;
        let length = reader.read_u8()?;
        let fixed = reader.read_slice(MAX_FIXED_PAYLOAD)?;
        let payload = PayloadTemplate::from_length(length, fixed)?;
        let info = AdditionalInfo::read(&mut reader)?;
        Ok(Some(Self {
            address,
            gpd_command,
            endpoint,
            profile,
            cluster,
            zcl_command,
            server,
            payload,
            info,
        }))
    }
}

bitflags! {
    /// What `TranslationTable::find` compares
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ScanLevel: u8 {
        /// GPD address
        const GPD_ID = 0x01;
        /// GPD command
        const COMMAND = 0x02;
        /// Fixed payload
        const PAYLOAD = 0x04;
        /// Endpoint
        const ENDPOINT = 0x08;
        /// Additional information
        const ADDITIONAL_INFO = 0x10;
    }
}

/// Values compared by `TranslationTable::find`
#[derive(Clone, Debug, PartialEq)]
pub struct ScanKey<'b> {
    /// GPD address
    pub address: GpdAddress,
    /// GPD command
    pub command: u8,
    /// Endpoint
    pub endpoint: u8,
    /// Fixed payload
    pub payload: &'b [u8],
    /// Additional information
    pub info: AdditionalInfo,
}

impl<'b> ScanKey<'b> {
    /// Key for all entries of `address`
    pub fn address(address: GpdAddress) -> Self {
        Self {
            address,
            command: 0,
            endpoint: 0,
            payload: &[],
            info: AdditionalInfo::None,
        }
    }

    /// Key for the entries of one GPD command
    pub fn command(address: GpdAddress, command: u8) -> Self {
        Self {
            command,
            ..Self::address(address)
        }
    }

    fn accepts(&self, level: ScanLevel, entry: &TranslationEntry) -> bool {
        if level.contains(ScanLevel::GPD_ID) && !entry.address.matches(&self.address) {
            return false;
        }
        if level.contains(ScanLevel::COMMAND) && entry.gpd_command != self.command {
            return false;
        }
        if level.contains(ScanLevel::ENDPOINT) && entry.endpoint != self.endpoint {
            return false;
        }
        if level.contains(ScanLevel::PAYLOAD) {
            match &entry.payload {
                PayloadTemplate::Fixed(data) => {
                    if &data[..] != self.payload {
                        return false;
                    }
                }
                _ => {
                    if !self.payload.is_empty() {
                        return false;
                    }
                }
            }
        }
        if level.contains(ScanLevel::ADDITIONAL_INFO) && entry.info != self.info {
            return false;
        }
        true
    }
}

/// Translation table
#[derive(Clone, Debug)]
pub struct TranslationTable {
    entries: heapless::Vec<Option<TranslationEntry>, MAX_TRANSLATION_ENTRIES>,
    customized_capacity: usize,
}

impl TranslationTable {
    /// Create a table with `capacity` entries, at most
    /// `MAX_TRANSLATION_ENTRIES`, of which at most `customized_capacity`
    /// hold a fixed payload
    pub fn new(capacity: usize, customized_capacity: usize) -> Self {
        Self {
            entries: (0..capacity.min(MAX_TRANSLATION_ENTRIES)).map(|_| None).collect(),
            customized_capacity,
        }
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if there are no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries with a fixed payload
    pub fn customized_len(&self) -> usize {
        self.iter().filter(|(_, e)| e.payload.is_customized()).count()
    }

    /// Entry in slot `index`
    pub fn get(&self, index: usize) -> Option<&TranslationEntry> {
        self.entries.get(index).and_then(|e| e.as_ref())
    }

    /// Iterate over the used slots
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TranslationEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|e| (index, e)))
    }

    /// Add `entry`, or replace the entry for the same GPD, command, endpoint,
    /// cluster and additional information. Returns the slot used.
    pub fn add(&mut self, entry: TranslationEntry) -> Result<usize, Error> {
        let existing = self
            .entries
            .iter()
            .position(|e| e.as_ref().map(|e| e.same_key(&entry)).unwrap_or(false));
        match existing {
            Some(index) => {
                self.replace(index, entry)?;
                Ok(index)
            }
            None => {
                let index = self
                    .entries
                    .iter()
                    .position(|e| e.is_none())
                    .ok_or(Error::TranslationTableFull)?;
                self.replace(index, entry)?;
                Ok(index)
            }
        }
    }

    /// Store `entry` in slot `index`
    pub fn replace(&mut self, index: usize, entry: TranslationEntry) -> Result<(), Error> {
        let previous = match self.entries.get(index) {
            Some(previous) => previous,
            None => return Err(Error::NotFound),
        };
        if entry.payload.is_customized() {
            let replaces_customized = previous
                .as_ref()
                .map(|p| p.payload.is_customized())
                .unwrap_or(false);
            let used = self.customized_len() - replaces_customized as usize;
            if used >= self.customized_capacity {
                log::warn!("Customized translation table full, {} entries", used);
                return Err(Error::TranslationTableFull);
            }
        }
        self.entries[index] = Some(entry);
        Ok(())
    }

    /// Remove the entries of `command` from `address`, on `endpoint` or on
    /// all endpoints. Returns the removed entries.
    pub fn remove(
        &mut self,
        address: &GpdAddress,
        command: u8,
        endpoint: Option<u8>,
    ) -> Vec<TranslationEntry> {
        self.remove_where(|e| {
            e.address.matches(address)
                && e.gpd_command == command
                && endpoint.map(|ep| ep == e.endpoint).unwrap_or(true)
        })
    }

    /// Remove every entry of `address`
    pub fn remove_address(&mut self, address: &GpdAddress) -> Vec<TranslationEntry> {
        self.remove_where(|e| e.address.matches(address))
    }

    fn remove_where<F>(&mut self, predicate: F) -> Vec<TranslationEntry>
    where
        F: Fn(&TranslationEntry) -> bool,
    {
        let mut removed = Vec::new();
        for slot in self.entries.iter_mut() {
            let matching = slot.as_ref().map(&predicate).unwrap_or(false);
            if matching {
                if let Some(entry) = slot.take() {
                    removed.push(entry);
                }
            }
        }
        removed
    }

    /// Index of the first entry from slot `start` on that matches `key` at
    /// the scan `level`
    pub fn find(&self, level: ScanLevel, key: &ScanKey, start: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .skip(start)
            .find_map(|(index, entry)| match entry {
                Some(entry) if key.accepts(level, entry) => Some(index),
                _ => None,
            })
    }

    /// All entries matching `key` at the scan `level`
    pub fn find_all<'t>(
        &'t self,
        level: ScanLevel,
        key: &'t ScanKey<'t>,
    ) -> impl Iterator<Item = &'t TranslationEntry> + 't {
        self.iter()
            .map(|(_, e)| e)
            .filter(move |e| key.accepts(level, e))
    }

    /// Remove all entries
    pub fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
    }

    /// Write every slot to `storage`
    pub fn save<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        let mut record = [0u8; TRANSLATION_RECORD_SIZE];
        for (index, entry) in self.entries.iter().enumerate() {
            match entry {
                Some(entry) => {
                    entry.write_record(&mut record)?;
                    storage.write(TableId::TranslationTable, index, &record)?;
                }
                None => storage.erase(TableId::TranslationTable, index)?,
            }
        }
        Ok(())
    }

    /// Load every slot from `storage`, returns the number of entries read
    pub fn restore<S: PersistentStorage>(&mut self, storage: &mut S) -> Result<usize, Error> {
        let mut record = [0u8; TRANSLATION_RECORD_SIZE];
        let mut count = 0;
        for index in 0..self.entries.len() {
            self.entries[index] = if storage.read(TableId::TranslationTable, index, &mut record)? {
                TranslationEntry::read_record(&record)?
            } else {
                None
            };
            if self.entries[index].is_some() {
                count += 1;
            }
        }
        log::info!("Restored {} translation table entries", count);
        Ok(count)
    }
}

/// A row of the default translation table
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DefaultTranslation {
    /// GPD command identifier
    pub gpd_command: u8,
    /// Cluster identifier
    pub cluster: u16,
    /// ZCL command identifier
    pub zcl_command: u8,
    /// Payload length octet, one of the reserved lengths
    pub payload: u8,
}

impl DefaultTranslation {
    /// The payload template
    pub fn template(&self) -> PayloadTemplate {
        match self.payload {
            PAYLOAD_COPY => PayloadTemplate::Copy,
            PAYLOAD_PARSE => PayloadTemplate::Parse,
            _ => PayloadTemplate::None,
        }
    }
}

const fn row(gpd_command: u8, cluster: u16, zcl_command: u8, payload: u8) -> DefaultTranslation {
    DefaultTranslation {
        gpd_command,
        cluster,
        zcl_command,
        payload,
    }
}

mod zcl {
    pub const IDENTIFY: u8 = 0x00;
    pub const STORE_SCENE: u8 = 0x04;
    pub const RECALL_SCENE: u8 = 0x05;
    pub const OFF: u8 = 0x00;
    pub const ON: u8 = 0x01;
    pub const TOGGLE: u8 = 0x02;
    pub const MOVE: u8 = 0x01;
    pub const STEP: u8 = 0x02;
    pub const STOP: u8 = 0x03;
    pub const MOVE_WITH_ON_OFF: u8 = 0x05;
    pub const STEP_WITH_ON_OFF: u8 = 0x06;
    pub const MOVE_HUE: u8 = 0x01;
    pub const STEP_HUE: u8 = 0x02;
    pub const MOVE_SATURATION: u8 = 0x04;
    pub const STEP_SATURATION: u8 = 0x05;
    pub const MOVE_COLOR: u8 = 0x08;
    pub const STEP_COLOR: u8 = 0x09;
    pub const LOCK_DOOR: u8 = 0x00;
    pub const UNLOCK_DOOR: u8 = 0x01;
}

/// The default translation table
pub const DEFAULT_TRANSLATIONS: &[DefaultTranslation] = &[
    row(gpd_command::IDENTIFY, cluster::IDENTIFY, zcl::IDENTIFY, PAYLOAD_PARSE),
    row(0x10, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x11, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x12, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x13, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x14, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x15, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x16, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x17, cluster::SCENES, zcl::RECALL_SCENE, PAYLOAD_PARSE),
    row(0x18, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x19, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1a, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1b, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1c, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1d, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1e, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(0x1f, cluster::SCENES, zcl::STORE_SCENE, PAYLOAD_PARSE),
    row(gpd_command::OFF, cluster::ON_OFF, zcl::OFF, PAYLOAD_NONE),
    row(gpd_command::ON, cluster::ON_OFF, zcl::ON, PAYLOAD_NONE),
    row(gpd_command::TOGGLE, cluster::ON_OFF, zcl::TOGGLE, PAYLOAD_NONE),
    row(gpd_command::MOVE_UP, cluster::LEVEL_CONTROL, zcl::MOVE, PAYLOAD_PARSE),
    row(gpd_command::MOVE_DOWN, cluster::LEVEL_CONTROL, zcl::MOVE, PAYLOAD_PARSE),
    row(gpd_command::STEP_UP, cluster::LEVEL_CONTROL, zcl::STEP, PAYLOAD_PARSE),
    row(gpd_command::STEP_DOWN, cluster::LEVEL_CONTROL, zcl::STEP, PAYLOAD_PARSE),
    row(gpd_command::LEVEL_CONTROL_STOP, cluster::LEVEL_CONTROL, zcl::STOP, PAYLOAD_NONE),
    row(gpd_command::MOVE_UP_WITH_ON_OFF, cluster::LEVEL_CONTROL, zcl::MOVE_WITH_ON_OFF, PAYLOAD_PARSE),
    row(gpd_command::MOVE_DOWN_WITH_ON_OFF, cluster::LEVEL_CONTROL, zcl::MOVE_WITH_ON_OFF, PAYLOAD_PARSE),
    row(gpd_command::STEP_UP_WITH_ON_OFF, cluster::LEVEL_CONTROL, zcl::STEP_WITH_ON_OFF, PAYLOAD_PARSE),
    row(gpd_command::STEP_DOWN_WITH_ON_OFF, cluster::LEVEL_CONTROL, zcl::STEP_WITH_ON_OFF, PAYLOAD_PARSE),
    row(gpd_command::MOVE_HUE_STOP, cluster::COLOR_CONTROL, zcl::MOVE_HUE, PAYLOAD_PARSE),
    row(gpd_command::MOVE_HUE_UP, cluster::COLOR_CONTROL, zcl::MOVE_HUE, PAYLOAD_PARSE),
    row(gpd_command::MOVE_HUE_DOWN, cluster::COLOR_CONTROL, zcl::MOVE_HUE, PAYLOAD_PARSE),
    row(gpd_command::STEP_HUE_UP, cluster::COLOR_CONTROL, zcl::STEP_HUE, PAYLOAD_PARSE),
    row(gpd_command::STEP_HUE_DOWN, cluster::COLOR_CONTROL, zcl::STEP_HUE, PAYLOAD_PARSE),
    row(gpd_command::MOVE_SATURATION_STOP, cluster::COLOR_CONTROL, zcl::MOVE_SATURATION, PAYLOAD_PARSE),
    row(gpd_command::MOVE_SATURATION_UP, cluster::COLOR_CONTROL, zcl::MOVE_SATURATION, PAYLOAD_PARSE),
    row(gpd_command::MOVE_SATURATION_DOWN, cluster::COLOR_CONTROL, zcl::MOVE_SATURATION, PAYLOAD_PARSE),
    row(gpd_command::STEP_SATURATION_UP, cluster::COLOR_CONTROL, zcl::STEP_SATURATION, PAYLOAD_PARSE),
    row(gpd_command::STEP_SATURATION_DOWN, cluster::COLOR_CONTROL, zcl::STEP_SATURATION, PAYLOAD_PARSE),
    row(gpd_command::MOVE_COLOR, cluster::COLOR_CONTROL, zcl::MOVE_COLOR, PAYLOAD_COPY),
    row(gpd_command::STEP_COLOR, cluster::COLOR_CONTROL, zcl::STEP_COLOR, PAYLOAD_COPY),
    row(gpd_command::LOCK_DOOR, cluster::DOOR_LOCK, zcl::LOCK_DOOR, PAYLOAD_NONE),
    row(gpd_command::UNLOCK_DOOR, cluster::DOOR_LOCK, zcl::UNLOCK_DOOR, PAYLOAD_NONE),
    row(gpd_command::PRESS_1_OF_1, cluster::ON_OFF, zcl::TOGGLE, PAYLOAD_NONE),
    row(gpd_command::PRESS_1_OF_2, cluster::ON_OFF, zcl::ON, PAYLOAD_NONE),
    row(gpd_command::PRESS_2_OF_2, cluster::ON_OFF, zcl::OFF, PAYLOAD_NONE),
    row(gpd_command::SHORT_PRESS_1_OF_1, cluster::ON_OFF, zcl::TOGGLE, PAYLOAD_NONE),
    row(gpd_command::SHORT_PRESS_1_OF_2, cluster::ON_OFF, zcl::ON, PAYLOAD_NONE),
    row(gpd_command::SHORT_PRESS_2_OF_2, cluster::ON_OFF, zcl::OFF, PAYLOAD_NONE),
    row(gpd_command::GENERIC_SWITCH_PRESS, cluster::ON_OFF, zcl::TOGGLE, PAYLOAD_NONE),
    row(gpd_command::ATTRIBUTE_REPORTING, cluster::RESERVED, GENERAL_REPORT_ATTRIBUTES, PAYLOAD_PARSE),
    row(gpd_command::MANUFACTURER_ATTRIBUTE_REPORTING, cluster::RESERVED, GENERAL_REPORT_ATTRIBUTES, PAYLOAD_PARSE),
];

/// Default translation of `gpd_command`
pub fn default_translation(gpd_command: u8) -> Option<&'static DefaultTranslation> {
    DEFAULT_TRANSLATIONS
        .iter()
        .find(|t| t.gpd_command == gpd_command)
}

fn optional_u8(payload: &[u8], index: usize, default: u8) -> u8 {
    payload.get(index).copied().unwrap_or(default)
}

/// Derive the ZCL payload for `gpd_command` from the GPD payload
pub fn parse_payload(gpd_command: u8, payload: &[u8], output: &mut [u8]) -> Result<usize, Error> {
    use gpd_command::*;
    let mut writer = Writer::new(output);
    match gpd_command {
        IDENTIFY => writer.write_u16(DEFAULT_IDENTIFY_TIME)?,
        RECALL_SCENE_0..=RECALL_SCENE_7 => {
            writer.write_u16(0x0000)?;
            writer.write_u8(gpd_command - RECALL_SCENE_0)?;
        }
        STORE_SCENE_0..=STORE_SCENE_7 => {
            writer.write_u16(0x0000)?;
            writer.write_u8(gpd_command - STORE_SCENE_0)?;
        }
        MOVE_UP | MOVE_DOWN | MOVE_UP_WITH_ON_OFF | MOVE_DOWN_WITH_ON_OFF => {
            let down = gpd_command == MOVE_DOWN || gpd_command == MOVE_DOWN_WITH_ON_OFF;
            writer.write_u8(down as u8)?;
            writer.write_u8(optional_u8(payload, 0, 0xff))?;
        }
        STEP_UP | STEP_DOWN | STEP_UP_WITH_ON_OFF | STEP_DOWN_WITH_ON_OFF => {
            let down = gpd_command == STEP_DOWN || gpd_command == STEP_DOWN_WITH_ON_OFF;
            let mut reader = Reader::new(payload);
            let step = reader.read_u8().map_err(|_| Error::MalformedPacket)?;
            let transition = reader.read_u16().unwrap_or(0xffff);
            writer.write_u8(down as u8)?;
            writer.write_u8(step)?;
            writer.write_u16(transition)?;
        }
        MOVE_HUE_STOP | MOVE_SATURATION_STOP => {
            writer.write_u8(0x00)?;
            writer.write_u8(0x00)?;
        }
        MOVE_HUE_UP | MOVE_HUE_DOWN | MOVE_SATURATION_UP | MOVE_SATURATION_DOWN => {
            let mode = if gpd_command == MOVE_HUE_UP || gpd_command == MOVE_SATURATION_UP {
                0x01
            } else {
                0x03
            };
            writer.write_u8(mode)?;
            writer.write_u8(optional_u8(payload, 0, 0xff))?;
        }
        STEP_HUE_UP | STEP_HUE_DOWN | STEP_SATURATION_UP | STEP_SATURATION_DOWN => {
            let mode = if gpd_command == STEP_HUE_UP || gpd_command == STEP_SATURATION_UP {
                0x01
            } else {
                0x03
            };
            let step = payload.first().copied().ok_or(Error::MalformedPacket)?;
            writer.write_u8(mode)?;
            writer.write_u8(step)?;
            writer.write_u8(optional_u8(payload, 1, 0xff))?;
        }
        ATTRIBUTE_REPORTING => {
            // cluster identifier, then the attribute records
            if payload.len() < 2 {
                return Err(Error::MalformedPacket);
            }
            writer.write_slice(&payload[2..])?;
        }
        MANUFACTURER_ATTRIBUTE_REPORTING => {
            // manufacturer and cluster identifier, then the attribute records
            if payload.len() < 4 {
                return Err(Error::MalformedPacket);
            }
            writer.write_slice(&payload[4..])?;
        }
        _ => writer.write_slice(payload)?,
    }
    Ok(writer.offset())
}

/// Build the ZCL payload for a GPD command according to `template`
pub fn build_payload(
    template: &PayloadTemplate,
    gpd_command: u8,
    payload: &[u8],
    output: &mut [u8],
) -> Result<usize, Error> {
    let source: &[u8] = match template {
        PayloadTemplate::None => &[],
        PayloadTemplate::Copy => payload,
        PayloadTemplate::Fixed(data) => data,
        PayloadTemplate::Parse => return parse_payload(gpd_command, payload, output),
    };
    if source.len() > output.len() {
        return Err(Error::NotEnoughSpace);
    }
    output[..source.len()].copy_from_slice(source);
    Ok(source.len())
}
