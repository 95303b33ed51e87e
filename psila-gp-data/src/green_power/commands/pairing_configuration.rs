use core::convert::TryFrom;

use crate::green_power::{
    read_group_list, write_group_list, ApplicationInformation, CommunicationMode, GroupList,
    SecurityOptions, MAX_PAIRED_ENDPOINTS,
};
use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::utils::{field, flag};
use crate::{ApplicationIdentifier, Error, GpdAddress, Key, ShortAddress};

use super::application_id;

const ACTION_MASK: u32 = 0x07;
const SEND_PAIRING: u32 = 0x08;

const COMMUNICATION_MODE_MASK: u32 = 0x0018;
const COMMUNICATION_MODE_OFFSET: u32 = 3;
const SEQUENCE_NUMBER_CAPABILITY: u32 = 0x0020;
const RX_ON_CAPABILITY: u32 = 0x0040;
const GPD_FIXED: u32 = 0x0080;
const ASSIGNED_ALIAS: u32 = 0x0100;
const SECURITY_USE: u32 = 0x0200;
const APPLICATION_INFORMATION_PRESENT: u32 = 0x0400;

/// Paired endpoints value for "the endpoints being commissioned"
pub const PAIRED_ENDPOINTS_COMMISSIONING: u8 = 0xfd;
/// Paired endpoints value for "all matching sink endpoints"
pub const PAIRED_ENDPOINTS_ALL: u8 = 0xfe;

/// Maximum size of the report descriptors carried by a application
/// description action
pub const MAX_REPORT_DATA_SIZE: usize = 128;

extended_enum!(
    /// GP Pairing Configuration action
    PairingConfigurationAction, u8,
    /// No action
    NoAction => 0b000,
    /// Extend the sink table entry
    ExtendSinkTable => 0b001,
    /// Replace the sink table entry
    ReplaceSinkTable => 0b010,
    /// Remove a pairing
    RemovePairing => 0b011,
    /// Remove the GPD
    RemoveGpd => 0b100,
    /// Application description
    ApplicationDescription => 0b101,
);

/// GP Pairing Configuration options
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PairingConfigurationOptions {
    /// GPD addressing mode
    pub application_id: ApplicationIdentifier,
    /// Forwarding communication mode
    pub communication_mode: CommunicationMode,
    /// The GPD uses incremental MAC sequence numbers
    pub sequence_number_capability: bool,
    /// The GPD receiver is on
    pub rx_on_capability: bool,
    /// The GPD does not move
    pub gpd_fixed: bool,
}

/// Sink endpoints paired with the GPD
#[derive(Clone, Debug, PartialEq)]
pub enum PairedEndpoints {
    /// The endpoints being commissioned, 0x00 or 0xfd
    Commissioning,
    /// All sink endpoints that match, 0xfe or 0xff
    All,
    /// Explicit list of endpoints
    List(heapless::Vec<u8, MAX_PAIRED_ENDPOINTS>),
}

impl PairedEndpoints {
    fn read(reader: &mut Reader) -> Result<Self, Error> {
        let count = reader.read_u8()?;
        match count {
            0x00 | PAIRED_ENDPOINTS_COMMISSIONING => Ok(PairedEndpoints::Commissioning),
            PAIRED_ENDPOINTS_ALL | 0xff => Ok(PairedEndpoints::All),
            _ => Ok(PairedEndpoints::List(
                heapless::Vec::from_slice(reader.read_slice(count as usize)?)
                    .map_err(|_| Error::TooManyItems)?,
            )),
        }
    }

    fn write(&self, writer: &mut Writer) -> Result<(), Error> {
        match self {
            PairedEndpoints::Commissioning => writer.write_u8(PAIRED_ENDPOINTS_COMMISSIONING),
            PairedEndpoints::All => writer.write_u8(PAIRED_ENDPOINTS_ALL),
            PairedEndpoints::List(endpoints) => writer.write_octet_string(endpoints),
        }
    }
}

/// Report descriptors carried by a application description action
#[derive(Clone, Debug, PartialEq)]
pub struct ReportBlock {
    /// Total number of reports of the GPD
    pub total: u8,
    /// Number of reports in `data`
    pub count: u8,
    /// Report descriptors, see `frame::ReportDescriptors`
    pub data: heapless::Vec<u8, MAX_REPORT_DATA_SIZE>,
}

/// GP Pairing Configuration
///
/// Sent by a commissioning tool to configure a pairing on the sink, or by
/// the sink to tell other devices about a groupcast pairing
#[derive(Clone, Debug, PartialEq)]
pub struct PairingConfiguration {
    /// Action
    pub action: PairingConfigurationAction,
    /// Send a GP Pairing after the action
    pub send_pairing: bool,
    /// Options
    pub options: PairingConfigurationOptions,
    /// GPD address
    pub address: GpdAddress,
    /// GPD device identifier
    pub device_id: u8,
    /// Groups, used with pre-commissioned groupcast
    pub groups: GroupList,
    /// Assigned alias
    pub alias: Option<ShortAddress>,
    /// Groupcast radius
    pub radius: u8,
    /// Security, `None` when the GPD does not use security
    pub security: Option<(SecurityOptions, Key)>,
    /// GPD security frame counter
    pub frame_counter: u32,
    /// Paired sink endpoints
    pub endpoints: PairedEndpoints,
    /// Application information
    pub application_information: Option<ApplicationInformation>,
    /// Report descriptors for the application description action
    pub reports: Option<ReportBlock>,
}

impl PairingConfiguration {
    fn options_value(&self) -> u16 {
        let options = &self.options;
        let mut value = u8::from(self.address.application_id()) as u32;
        value |= (u8::from(options.communication_mode) as u32) << COMMUNICATION_MODE_OFFSET;
        for (set, bit) in [
            (options.sequence_number_capability, SEQUENCE_NUMBER_CAPABILITY),
            (options.rx_on_capability, RX_ON_CAPABILITY),
            (options.gpd_fixed, GPD_FIXED),
            (self.alias.is_some(), ASSIGNED_ALIAS),
            (self.security.is_some(), SECURITY_USE),
            (
                self.application_information.is_some(),
                APPLICATION_INFORMATION_PRESENT,
            ),
        ] {
            if set {
                value |= bit;
            }
        }
        value as u16
    }
}

impl Pack<PairingConfiguration, Error> for PairingConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        let mut actions = u8::from(self.action);
        if self.send_pairing {
            actions |= SEND_PAIRING as u8;
        }
        writer.write_u8(actions)?;
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
        if let Some((options, _)) = self.security {
            writer.write_u8(u8::from(options))?;
        }
        if self.options.sequence_number_capability || self.security.is_some() {
            writer.write_u32(self.frame_counter)?;
        }
        if let Some((_, key)) = self.security {
            writer.write_slice(key.as_bytes())?;
        }
        self.endpoints.write(&mut writer)?;
        if let Some(information) = &self.application_information {
            information.write(&mut writer)?;
        }
        if self.action == PairingConfigurationAction::ApplicationDescription {
            let reports = self.reports.as_ref().ok_or(Error::InvalidValue)?;
            writer.write_u8(reports.total)?;
            writer.write_u8(reports.count)?;
            writer.write_slice(&reports.data)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let actions = reader.read_u8()? as u32;
        let action = PairingConfigurationAction::try_from(field(actions, ACTION_MASK, 0))?;
        let value = reader.read_u16()? as u32;
        let options = PairingConfigurationOptions {
            application_id: application_id(value)?,
            communication_mode: CommunicationMode::try_from(field(
                value,
                COMMUNICATION_MODE_MASK,
                COMMUNICATION_MODE_OFFSET,
            ))?,
            sequence_number_capability: flag(value, SEQUENCE_NUMBER_CAPABILITY),
            rx_on_capability: flag(value, RX_ON_CAPABILITY),
            gpd_fixed: flag(value, GPD_FIXED),
        };
        let address = GpdAddress::read(&mut reader, options.application_id)?;
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
        let security_use = flag(value, SECURITY_USE);
        let security_options = if security_use {
            Some(SecurityOptions::try_from(reader.read_u8()?)?)
        } else {
            None
        };
        let frame_counter = if options.sequence_number_capability || security_use {
            reader.read_u32()?
        } else {
            0
        };
        let security = match security_options {
            Some(security_options) => Some((security_options, Key::unpack(reader.read_slice(16)?)?)),
            None => None,
        };
        let endpoints = PairedEndpoints::read(&mut reader)?;
        let application_information = if flag(value, APPLICATION_INFORMATION_PRESENT) {
            Some(ApplicationInformation::read(&mut reader)?)
        } else {
            None
        };
        let reports = if action == PairingConfigurationAction::ApplicationDescription {
            let total = reader.read_u8()?;
            let count = reader.read_u8()?;
            let data = heapless::Vec::from_slice(reader.read_rest())
                .map_err(|_| Error::TooManyItems)?;
            Some(ReportBlock { total, count, data })
        } else {
            None
        };
        Ok((
            Self {
                action,
                send_pairing: flag(actions, SEND_PAIRING),
                options,
                address,
                device_id,
                groups,
                alias,
                radius,
                security,
                frame_counter,
                endpoints,
                application_information,
                reports,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::green_power::SinkGroup;
    use crate::{SecurityKeyType, SecurityLevel};

    #[test]
    fn unpack_extend_with_application_information() {
        let data = [
            0x01, // extend
            0x28, 0x04, // derived groupcast, sequence numbers, application information
            0x78, 0x56, 0x34, 0x12, // source id
            0x02, // on/off switch
            0xff, // radius
            0x20, 0x00, 0x00, 0x00, // frame counter
            0x02, 0x01, 0x0a, // endpoints
            0x04, 0x01, 0x22, // commands
        ];
        let (configuration, used) = PairingConfiguration::unpack(&data[..]).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(
            configuration.action,
            PairingConfigurationAction::ExtendSinkTable
        );
        assert!(!configuration.send_pairing);
        assert_eq!(
            configuration.options.communication_mode,
            CommunicationMode::DerivedGroupcast
        );
        assert!(configuration.options.sequence_number_capability);
        assert_eq!(configuration.address, GpdAddress::SourceId(0x1234_5678));
        assert_eq!(configuration.device_id, 0x02);
        assert_eq!(configuration.radius, 0xff);
        assert_eq!(configuration.security, None);
        assert_eq!(configuration.frame_counter, 0x20);
        match &configuration.endpoints {
            PairedEndpoints::List(endpoints) => assert_eq!(endpoints[..], [0x01, 0x0a]),
            _ => panic!("Expected endpoint list"),
        }
        let information = configuration.application_information.as_ref().unwrap();
        assert_eq!(information.commands.as_ref().unwrap()[..], [0x22]);

        let mut buffer = [0u8; 64];
        let used = configuration.pack(&mut buffer).unwrap();
        assert_eq!(buffer[..used], data);
    }

    #[test]
    fn groupcast_with_security() {
        let mut groups = GroupList::new();
        groups
            .push(SinkGroup {
                group: ShortAddress::new(0x0101),
                alias: ShortAddress::new(0xffff),
            })
            .unwrap();
        let configuration = PairingConfiguration {
            action: PairingConfigurationAction::ReplaceSinkTable,
            send_pairing: true,
            options: PairingConfigurationOptions {
                application_id: ApplicationIdentifier::SourceId,
                communication_mode: CommunicationMode::Groupcast,
                sequence_number_capability: true,
                rx_on_capability: false,
                gpd_fixed: false,
            },
            address: GpdAddress::SourceId(0x0000_1111),
            device_id: 0x07,
            groups,
            alias: Some(ShortAddress::new(0x1111)),
            radius: 5,
            security: Some((
                SecurityOptions {
                    level: SecurityLevel::Encryption,
                    key_type: SecurityKeyType::IndividualKey,
                },
                Key::from([0x11; 16]),
            )),
            frame_counter: 0x100,
            endpoints: PairedEndpoints::All,
            application_information: None,
            reports: None,
        };
        let mut buffer = [0u8; 80];
        let used = configuration.pack(&mut buffer).unwrap();
        assert_eq!(buffer[0], 0x0a);
        assert_eq!(buffer[1..3], [0x30, 0x03]);
        assert_eq!(used, 1 + 2 + 4 + 1 + 5 + 2 + 1 + 1 + 4 + 16 + 1);
        assert_eq!(buffer[used - 1], PAIRED_ENDPOINTS_ALL);
        let (unpacked, _) = PairingConfiguration::unpack(&buffer[..used]).unwrap();
        assert_eq!(unpacked, configuration);
    }

    #[test]
    fn application_description_action() {
        let data = [
            0x05, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12, 0xfe, 0xff, 0xfd, 0x01, 0x01, 0xaa, 0xbb,
        ];
        let (configuration, _) = PairingConfiguration::unpack(&data[..]).unwrap();
        assert_eq!(
            configuration.action,
            PairingConfigurationAction::ApplicationDescription
        );
        assert_eq!(configuration.endpoints, PairedEndpoints::Commissioning);
        let reports = configuration.reports.unwrap();
        assert_eq!(reports.total, 1);
        assert_eq!(reports.count, 1);
        assert_eq!(reports.data[..], [0xaa, 0xbb]);
    }

    #[test]
    fn remove_pairing_wildcard() {
        let data = [
            0x03, 0x08, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
        ];
        let (configuration, used) = PairingConfiguration::unpack(&data[..]).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(configuration.action, PairingConfigurationAction::RemovePairing);
        assert!(configuration.address.is_wildcard());
        assert_eq!(configuration.endpoints, PairedEndpoints::All);
        let data = [0x06, 0x08, 0x00];
        assert_eq!(
            PairingConfiguration::unpack(&data[..]),
            Err(Error::InvalidValue)
        );
    }
}
