//! # Zigbee Green Power
//!
//! Commands of the Green Power cluster, the frames sent to and from Green
//! Power devices and the sink table record.

use core::convert::TryFrom;

use crate::pack::{Reader, Writer};
use crate::utils::field;
use crate::{Error, GroupIdentifier, SecurityKeyType, SecurityLevel, ShortAddress};

mod application_information;
pub mod commands;
pub mod frame;
mod sink_table_entry;

pub use application_information::{
    ApplicationInformation, ClusterList, ClusterLists, CommandList, SwitchInformation,
};
pub use sink_table_entry::{SinkTableEntry, SinkTableOptions, SINK_TABLE_RECORD_SIZE};

/// Green Power endpoint
pub const GREEN_POWER_ENDPOINT: u8 = 242;
/// Green Power profile identifier
pub const GREEN_POWER_PROFILE: u16 = 0xa1e0;
/// Home automation profile identifier, used for forwarded commands
pub const HOME_AUTOMATION_PROFILE: u16 = 0x0104;
/// Zigbee device profile identifier
pub const DEVICE_PROFILE: u16 = 0x0000;
/// Default radius for groupcast forwarding, 0xff means unspecified
pub const DEFAULT_GROUPCAST_RADIUS: u8 = 0xff;
/// Maximum size of a GPD commissioning payload
pub const MAX_COMMISSIONING_PAYLOAD_SIZE: usize = 53;
/// Maximum number of groups in a sink group list
pub const MAX_SINK_GROUPS: usize = 2;
/// Maximum number of commands in the application information
pub const MAX_COMMANDS: usize = 50;
/// Maximum number of server or client clusters in the application
/// information, the counts are stored in a nibble each
pub const MAX_CLUSTERS: usize = 15;
/// Maximum number of paired endpoints
pub const MAX_PAIRED_ENDPOINTS: usize = 16;

/// Green Power cluster command identifiers, client to server
pub mod client_command {
    /// GP Notification
    pub const NOTIFICATION: u8 = 0x00;
    /// GP Pairing Search
    pub const PAIRING_SEARCH: u8 = 0x01;
    /// GP Tunneling Stop
    pub const TUNNELING_STOP: u8 = 0x03;
    /// GP Commissioning Notification
    pub const COMMISSIONING_NOTIFICATION: u8 = 0x04;
    /// GP Sink Commissioning Mode
    pub const SINK_COMMISSIONING_MODE: u8 = 0x05;
    /// GP Translation Table Update
    pub const TRANSLATION_TABLE_UPDATE: u8 = 0x07;
    /// GP Translation Table Request
    pub const TRANSLATION_TABLE_REQUEST: u8 = 0x08;
    /// GP Pairing Configuration
    pub const PAIRING_CONFIGURATION: u8 = 0x09;
    /// GP Sink Table Request
    pub const SINK_TABLE_REQUEST: u8 = 0x0a;
    /// GP Proxy Table Response
    pub const PROXY_TABLE_RESPONSE: u8 = 0x0b;
}

/// Green Power cluster command identifiers, server to client
pub mod server_command {
    /// GP Notification Response
    pub const NOTIFICATION_RESPONSE: u8 = 0x00;
    /// GP Pairing
    pub const PAIRING: u8 = 0x01;
    /// GP Proxy Commissioning Mode
    pub const PROXY_COMMISSIONING_MODE: u8 = 0x02;
    /// GP Response
    pub const RESPONSE: u8 = 0x06;
    /// GP Translation Table Response
    pub const TRANSLATION_TABLE_RESPONSE: u8 = 0x08;
    /// GP Sink Table Response
    pub const SINK_TABLE_RESPONSE: u8 = 0x0a;
    /// GP Proxy Table Request
    pub const PROXY_TABLE_REQUEST: u8 = 0x0b;
}

/// GPD command identifiers
pub mod gpd_command {
    /// Identify
    pub const IDENTIFY: u8 = 0x00;
    /// Recall scene 0, scenes 1 to 7 follow
    pub const RECALL_SCENE_0: u8 = 0x10;
    /// Recall scene 7
    pub const RECALL_SCENE_7: u8 = 0x17;
    /// Store scene 0, scenes 1 to 7 follow
    pub const STORE_SCENE_0: u8 = 0x18;
    /// Store scene 7
    pub const STORE_SCENE_7: u8 = 0x1f;
    /// Off
    pub const OFF: u8 = 0x20;
    /// On
    pub const ON: u8 = 0x21;
    /// Toggle
    pub const TOGGLE: u8 = 0x22;
    /// Release
    pub const RELEASE: u8 = 0x23;
    /// Move up
    pub const MOVE_UP: u8 = 0x30;
    /// Move down
    pub const MOVE_DOWN: u8 = 0x31;
    /// Step up
    pub const STEP_UP: u8 = 0x32;
    /// Step down
    pub const STEP_DOWN: u8 = 0x33;
    /// Level control stop
    pub const LEVEL_CONTROL_STOP: u8 = 0x34;
    /// Move up with on/off
    pub const MOVE_UP_WITH_ON_OFF: u8 = 0x35;
    /// Move down with on/off
    pub const MOVE_DOWN_WITH_ON_OFF: u8 = 0x36;
    /// Step up with on/off
    pub const STEP_UP_WITH_ON_OFF: u8 = 0x37;
    /// Step down with on/off
    pub const STEP_DOWN_WITH_ON_OFF: u8 = 0x38;
    /// Move hue stop
    pub const MOVE_HUE_STOP: u8 = 0x40;
    /// Move hue up
    pub const MOVE_HUE_UP: u8 = 0x41;
    /// Move hue down
    pub const MOVE_HUE_DOWN: u8 = 0x42;
    /// Step hue up
    pub const STEP_HUE_UP: u8 = 0x43;
    /// Step hue down
    pub const STEP_HUE_DOWN: u8 = 0x44;
    /// Move saturation stop
    pub const MOVE_SATURATION_STOP: u8 = 0x45;
    /// Move saturation up
    pub const MOVE_SATURATION_UP: u8 = 0x46;
    /// Move saturation down
    pub const MOVE_SATURATION_DOWN: u8 = 0x47;
    /// Step saturation up
    pub const STEP_SATURATION_UP: u8 = 0x48;
    /// Step saturation down
    pub const STEP_SATURATION_DOWN: u8 = 0x49;
    /// Move color
    pub const MOVE_COLOR: u8 = 0x4a;
    /// Step color
    pub const STEP_COLOR: u8 = 0x4b;
    /// Lock door
    pub const LOCK_DOOR: u8 = 0x50;
    /// Unlock door
    pub const UNLOCK_DOOR: u8 = 0x51;
    /// Press 1 of 1
    pub const PRESS_1_OF_1: u8 = 0x60;
    /// Release 1 of 1
    pub const RELEASE_1_OF_1: u8 = 0x61;
    /// Press 1 of 2
    pub const PRESS_1_OF_2: u8 = 0x62;
    /// Release 1 of 2
    pub const RELEASE_1_OF_2: u8 = 0x63;
    /// Press 2 of 2
    pub const PRESS_2_OF_2: u8 = 0x64;
    /// Release 2 of 2
    pub const RELEASE_2_OF_2: u8 = 0x65;
    /// Short press 1 of 1
    pub const SHORT_PRESS_1_OF_1: u8 = 0x66;
    /// Short press 1 of 2
    pub const SHORT_PRESS_1_OF_2: u8 = 0x67;
    /// Short press 2 of 2
    pub const SHORT_PRESS_2_OF_2: u8 = 0x68;
    /// 8-bit vector press, generic switch
    pub const GENERIC_SWITCH_PRESS: u8 = 0x69;
    /// 8-bit vector release, generic switch
    pub const GENERIC_SWITCH_RELEASE: u8 = 0x6a;
    /// Attribute reporting
    pub const ATTRIBUTE_REPORTING: u8 = 0xa0;
    /// Manufacturer specific attribute reporting
    pub const MANUFACTURER_ATTRIBUTE_REPORTING: u8 = 0xa1;
    /// Multi-cluster reporting
    pub const MULTI_CLUSTER_REPORTING: u8 = 0xa2;
    /// Manufacturer specific multi-cluster reporting
    pub const MANUFACTURER_MULTI_CLUSTER_REPORTING: u8 = 0xa3;
    /// Request attributes
    pub const REQUEST_ATTRIBUTES: u8 = 0xa4;
    /// Read attributes response
    pub const READ_ATTRIBUTES_RESPONSE: u8 = 0xa5;
    /// ZCL tunneling with payload
    pub const ZCL_TUNNELING: u8 = 0xa6;
    /// Compact attribute reporting
    pub const COMPACT_ATTRIBUTE_REPORTING: u8 = 0xa8;
    /// Any of the sensor reporting commands 0xa0 to 0xa3
    pub const ANY_SENSOR_COMMAND: u8 = 0xaf;
    /// Commissioning
    pub const COMMISSIONING: u8 = 0xe0;
    /// Decommissioning
    pub const DECOMMISSIONING: u8 = 0xe1;
    /// Success
    pub const SUCCESS: u8 = 0xe2;
    /// Channel request
    pub const CHANNEL_REQUEST: u8 = 0xe3;
    /// Application description
    pub const APPLICATION_DESCRIPTION: u8 = 0xe4;
    /// Commissioning reply, sent to the GPD
    pub const COMMISSIONING_REPLY: u8 = 0xf0;
    /// Channel configuration, sent to the GPD
    pub const CHANNEL_CONFIGURATION: u8 = 0xf3;

    /// True for the attribute reporting commands that can be collapsed into
    /// `ANY_SENSOR_COMMAND`
    pub fn is_sensor_report(command: u8) -> bool {
        (ATTRIBUTE_REPORTING..=MANUFACTURER_MULTI_CLUSTER_REPORTING).contains(&command)
    }

    /// True for the commands that use the generic switch information
    pub fn is_generic_switch(command: u8) -> bool {
        command == GENERIC_SWITCH_PRESS || command == GENERIC_SWITCH_RELEASE
    }
}

/// GPD device identifiers
pub mod device_id {
    /// Simple generic 1-state switch
    pub const SIMPLE_GENERIC_ONE_STATE_SWITCH: u8 = 0x00;
    /// Simple generic 2-state switch
    pub const SIMPLE_GENERIC_TWO_STATE_SWITCH: u8 = 0x01;
    /// On/off switch
    pub const ON_OFF_SWITCH: u8 = 0x02;
    /// Level control switch
    pub const LEVEL_CONTROL_SWITCH: u8 = 0x03;
    /// Simple sensor
    pub const SIMPLE_SENSOR: u8 = 0x04;
    /// Advanced generic 1-state switch
    pub const ADVANCED_GENERIC_ONE_STATE_SWITCH: u8 = 0x05;
    /// Advanced generic 2-state switch
    pub const ADVANCED_GENERIC_TWO_STATE_SWITCH: u8 = 0x06;
    /// Generic switch
    pub const GENERIC_SWITCH: u8 = 0x07;
    /// Color dimmer switch
    pub const COLOR_DIMMER_SWITCH: u8 = 0x08;
    /// Light sensor
    pub const LIGHT_SENSOR: u8 = 0x10;
    /// Occupancy sensor
    pub const OCCUPANCY_SENSOR: u8 = 0x11;
    /// Door lock controller
    pub const DOOR_LOCK_CONTROLLER: u8 = 0x20;
    /// Temperature sensor
    pub const TEMPERATURE_SENSOR: u8 = 0x30;
    /// Pressure sensor
    pub const PRESSURE_SENSOR: u8 = 0x31;
    /// Flow sensor
    pub const FLOW_SENSOR: u8 = 0x32;
    /// Indoor environment sensor, temperature and humidity
    pub const ENVIRONMENT_SENSOR: u8 = 0x33;
    /// Manufacturer specific device, use the application information
    pub const MANUFACTURER_SPECIFIC: u8 = 0xfe;
    /// Undefined device
    pub const UNDEFINED: u8 = 0xff;
}

extended_enum!(
    /// Communication mode used for forwarding a GPD command
    CommunicationMode, u8,
    /// Full unicast forwarding
    FullUnicast => 0b00,
    /// Groupcast forwarding to the derived group
    DerivedGroupcast => 0b01,
    /// Groupcast forwarding to a pre-commissioned group
    Groupcast => 0b10,
    /// Lightweight unicast forwarding
    LightweightUnicast => 0b11,
);

impl CommunicationMode {
    /// True for the two groupcast modes
    pub fn is_groupcast(self) -> bool {
        matches!(
            self,
            CommunicationMode::DerivedGroupcast | CommunicationMode::Groupcast
        )
    }

    /// True for the two unicast modes
    pub fn is_unicast(self) -> bool {
        !self.is_groupcast()
    }

    /// Functionality bit required to use this mode
    pub fn functionality(self) -> Functionality {
        match self {
            CommunicationMode::FullUnicast => Functionality::FULL_UNICAST,
            CommunicationMode::DerivedGroupcast => Functionality::DERIVED_GROUPCAST,
            CommunicationMode::Groupcast => Functionality::PRECOMMISSIONED_GROUPCAST,
            CommunicationMode::LightweightUnicast => Functionality::LIGHTWEIGHT_UNICAST,
        }
    }
}

bitflags! {
    /// GP functionality bitmap, 24 bits
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Functionality: u32 {
        /// GP feature
        const GREEN_POWER = 0x00_0001;
        /// Direct communication
        const DIRECT = 0x00_0002;
        /// Derived groupcast
        const DERIVED_GROUPCAST = 0x00_0004;
        /// Pre-commissioned groupcast
        const PRECOMMISSIONED_GROUPCAST = 0x00_0008;
        /// Full unicast
        const FULL_UNICAST = 0x00_0010;
        /// Lightweight unicast
        const LIGHTWEIGHT_UNICAST = 0x00_0020;
        /// Bidirectional operation
        const BIDIRECTIONAL = 0x00_0080;
        /// Proxy table maintenance
        const PROXY_TABLE_MAINTENANCE = 0x00_0200;
        /// Commissioning tool based commissioning
        const CT_BASED_COMMISSIONING = 0x00_0800;
        /// Maintenance GPDF
        const MAINTENANCE_GPDF = 0x00_1000;
        /// Security level 0
        const SECURITY_LEVEL_0 = 0x00_8000;
        /// Security level 2
        const SECURITY_LEVEL_2 = 0x02_0000;
        /// Security level 3
        const SECURITY_LEVEL_3 = 0x04_0000;
        /// Sink table based groupcast forwarding
        const SINK_TABLE_GROUPCAST_FORWARDING = 0x10_0000;
        /// Translation table
        const TRANSLATION_TABLE = 0x20_0000;
        /// GPD IEEE address
        const IEEE_ADDRESS = 0x40_0000;
    }
}

impl Default for Functionality {
    fn default() -> Self {
        Functionality::GREEN_POWER
            | Functionality::DIRECT
            | Functionality::DERIVED_GROUPCAST
            | Functionality::PRECOMMISSIONED_GROUPCAST
            | Functionality::FULL_UNICAST
            | Functionality::LIGHTWEIGHT_UNICAST
            | Functionality::BIDIRECTIONAL
            | Functionality::PROXY_TABLE_MAINTENANCE
            | Functionality::CT_BASED_COMMISSIONING
            | Functionality::MAINTENANCE_GPDF
            | Functionality::SECURITY_LEVEL_0
            | Functionality::SECURITY_LEVEL_2
            | Functionality::SECURITY_LEVEL_3
            | Functionality::SINK_TABLE_GROUPCAST_FORWARDING
            | Functionality::TRANSLATION_TABLE
            | Functionality::IEEE_ADDRESS
    }
}

/// Security level and key type, packed in one octet
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SecurityOptions {
    /// Security level
    pub level: SecurityLevel,
    /// Key type
    pub key_type: SecurityKeyType,
}

impl SecurityOptions {
    /// No security
    pub fn none() -> Self {
        Self {
            level: SecurityLevel::None,
            key_type: SecurityKeyType::NoKey,
        }
    }
}

impl TryFrom<u8> for SecurityOptions {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Error> {
        Ok(Self {
            level: SecurityLevel::try_from(field(value as u32, 0b0000_0011, 0))?,
            key_type: SecurityKeyType::try_from(field(value as u32, 0b0001_1100, 2))?,
        })
    }
}

impl From<SecurityOptions> for u8 {
    fn from(options: SecurityOptions) -> u8 {
        u8::from(options.level) | (u8::from(options.key_type) << 2)
    }
}

/// Group a sink is member of, with the alias used when forwarding to it
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SinkGroup {
    /// Group identifier
    pub group: GroupIdentifier,
    /// Alias, 0xffff when unused
    pub alias: ShortAddress,
}

/// Bounded list of sink groups
pub type GroupList = heapless::Vec<SinkGroup, MAX_SINK_GROUPS>;

pub(crate) fn read_group_list(reader: &mut Reader) -> Result<GroupList, Error> {
    let count = reader.read_u8()?;
    let mut groups = GroupList::new();
    for _ in 0..count {
        let group = ShortAddress::new(reader.read_u16()?);
        let alias = ShortAddress::new(reader.read_u16()?);
        groups
            .push(SinkGroup { group, alias })
            .map_err(|_| Error::TooManyItems)?;
    }
    Ok(groups)
}

pub(crate) fn write_group_list(writer: &mut Writer, groups: &[SinkGroup]) -> Result<(), Error> {
    writer.write_u8(groups.len() as u8)?;
    for entry in groups {
        writer.write_u16(u16::from(entry.group))?;
        writer.write_u16(u16::from(entry.alias))?;
    }
    Ok(())
}
