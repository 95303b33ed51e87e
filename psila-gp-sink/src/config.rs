//! # Sink configuration
//!
//! The Green Power sink attributes, table capacities, timeouts and the
//! application endpoints the sink forwards GPD commands to. Read from TOML.

use core::convert::TryFrom;

use serde::de;
use serde_derive::Deserialize;

use psila_gp_data::green_power::commands::ExitMode;
use psila_gp_data::green_power::{CommunicationMode, Functionality};
use psila_gp_data::{Key, SecurityKeyType, SecurityLevel};

use crate::Error;

const SECURITY_LEVEL_MASK: u8 = 0x03;
const PROTECTION_WITH_LINK_KEY: u8 = 0x04;
const INVOLVE_TRUST_CENTER: u8 = 0x08;

/// Largest `session_capacity`
pub const MAX_SESSIONS: usize = 4;
/// Largest `sink_table_capacity`
pub const MAX_SINK_TABLE_ENTRIES: usize = 64;
/// Largest `translation_table_capacity`
pub const MAX_TRANSLATION_ENTRIES: usize = 128;
/// Largest `group_table_capacity`
pub const MAX_GROUP_MEMBERSHIPS: usize = 64;
/// Largest `report_buffer_size`
pub const MAX_REPORT_BUFFER: usize = 256;

fn deserialize_key<'de, D>(deserializer: D) -> Result<Option<Key>, D::Error>
where
    D: de::Deserializer<'de>,
{
    let value = <Option<String> as serde::Deserialize>::deserialize(deserializer)?;
    match value {
        Some(text) => text
            .parse::<Key>()
            .map(Some)
            .map_err(|_| de::Error::custom("invalid key")),
        None => Ok(None),
    }
}

/// An application endpoint served by the sink
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Endpoint number
    pub endpoint: u8,
    /// Server clusters implemented on the endpoint
    pub server_clusters: Vec<u16>,
    /// Client clusters implemented on the endpoint
    pub client_clusters: Vec<u16>,
    /// Groups the endpoint is member of, used for pre-commissioned groupcast
    pub groups: Vec<u16>,
}

impl EndpointConfig {
    /// True if the endpoint implements `cluster` on the given side
    pub fn contains(&self, cluster: u16, server: bool) -> bool {
        if server {
            self.server_clusters.contains(&cluster)
        } else {
            self.client_clusters.contains(&cluster)
        }
    }
}

/// Sink configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SinkConfig {
    /// Number of concurrent commissioning sessions
    pub session_capacity: usize,
    /// Number of sink table slots
    pub sink_table_capacity: usize,
    /// Number of translation table slots
    pub translation_table_capacity: usize,
    /// Number of customized payload templates
    pub customized_table_capacity: usize,
    /// Number of APS group memberships
    pub group_table_capacity: usize,
    /// Generic switch commissioning timeout in seconds
    pub generic_switch_timeout: u16,
    /// Multi-sensor commissioning timeout in seconds
    pub multi_sensor_timeout: u16,
    /// Commissioning window in seconds
    pub commissioning_window: u16,
    /// Size of the report descriptor buffer of a session
    pub report_buffer_size: usize,
    /// Maximum number of GPD commands kept for a session
    pub command_list_capacity: usize,
    /// Maximum number of clusters kept for a session, per side
    pub cluster_list_capacity: usize,
    /// Security level attribute, minimum level in bits 0-1, protection with
    /// the GPD link key in bit 2 and trust center involvement in bit 3
    pub security_level: u8,
    /// Supported functionality
    pub functionality: u32,
    /// Active functionality
    pub active_functionality: u32,
    /// Communication mode for new pairings
    pub communication_mode: u8,
    /// Commissioning exit mode
    pub commissioning_exit_mode: u8,
    /// Proxies unicast commissioning notifications to the sink
    pub commissioning_window_unicast: bool,
    /// Send GP Pairing as unicast to the proxy for lightweight unicast
    pub pairing_unicast: bool,
    /// Shared key type
    pub shared_key_type: u8,
    /// Shared key
    #[serde(deserialize_with = "deserialize_key")]
    pub shared_key: Option<Key>,
    /// Application endpoints
    pub endpoints: Vec<EndpointConfig>,
    /// Operational channel
    pub channel: u8,
    /// PAN identifier
    pub pan_id: u16,
    /// Network key
    #[serde(deserialize_with = "deserialize_key")]
    pub network_key: Option<Key>,
    /// Short address of the sink
    pub node_address: u16,
    /// Extended address of the sink
    pub extended_address: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            session_capacity: 1,
            sink_table_capacity: 24,
            translation_table_capacity: 30,
            customized_table_capacity: 1,
            group_table_capacity: 16,
            generic_switch_timeout: 60,
            multi_sensor_timeout: 20,
            commissioning_window: 180,
            report_buffer_size: 82,
            command_list_capacity: 50,
            cluster_list_capacity: 15,
            security_level: 0,
            functionality: Functionality::default().bits(),
            active_functionality: Functionality::default().bits(),
            communication_mode: u8::from(CommunicationMode::DerivedGroupcast),
            commissioning_exit_mode: ExitMode::ON_FIRST_PAIRING_SUCCESS.bits(),
            commissioning_window_unicast: false,
            pairing_unicast: false,
            shared_key_type: u8::from(SecurityKeyType::NoKey),
            shared_key: None,
            endpoints: vec![EndpointConfig {
                endpoint: 1,
                server_clusters: vec![0x0000, 0x0003, 0x0004, 0x0005, 0x0006, 0x0008],
                client_clusters: Vec::new(),
                groups: Vec::new(),
            }],
            channel: 11,
            pan_id: 0,
            network_key: None,
            node_address: 0x0000,
            extended_address: 0,
        }
    }
}

impl SinkConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config = toml::from_str::<SinkConfig>(text).map_err(|err| {
            log::error!("Failed to parse configuration, {}", err);
            Error::ConfigurationError
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the attribute values and that the keys the configuration
    /// refers to are present
    pub fn validate(&self) -> Result<(), Error> {
        if CommunicationMode::try_from(self.communication_mode).is_err() {
            log::error!("Invalid communication mode {}", self.communication_mode);
            return Err(Error::ConfigurationError);
        }
        if self.security_level & SECURITY_LEVEL_MASK == u8::from(SecurityLevel::Reserved) {
            log::error!("Reserved minimum security level");
            return Err(Error::ConfigurationError);
        }
        if self.session_capacity == 0 {
            log::error!("At least one commissioning session is required");
            return Err(Error::ConfigurationError);
        }
        for (name, value, max) in [
            ("session_capacity", self.session_capacity, MAX_SESSIONS),
            ("sink_table_capacity", self.sink_table_capacity, MAX_SINK_TABLE_ENTRIES),
            ("translation_table_capacity", self.translation_table_capacity, MAX_TRANSLATION_ENTRIES),
            ("customized_table_capacity", self.customized_table_capacity, self.translation_table_capacity),
            ("group_table_capacity", self.group_table_capacity, MAX_GROUP_MEMBERSHIPS),
            ("report_buffer_size", self.report_buffer_size, MAX_REPORT_BUFFER),
        ] {
            if value > max {
                log::error!("{} {} above {}", name, value, max);
                return Err(Error::ConfigurationError);
            }
        }
        let key_type = SecurityKeyType::try_from(self.shared_key_type).map_err(|_| {
            log::error!("Invalid shared key type {}", self.shared_key_type);
            Error::ConfigurationError
        })?;
        match key_type {
            SecurityKeyType::GroupKey
            | SecurityKeyType::IndividualKey
            | SecurityKeyType::DerivedIndividualKey => {
                if self.shared_key.is_none() {
                    log::error!("Shared key type {:?} requires a shared key", key_type);
                    return Err(Error::ConfigurationError);
                }
            }
            SecurityKeyType::NetworkKey | SecurityKeyType::NetworkDerivedGroupKey => {
                if self.network_key.is_none() {
                    log::error!("Shared key type {:?} requires the network key", key_type);
                    return Err(Error::ConfigurationError);
                }
            }
            SecurityKeyType::NoKey => (),
        }
        Ok(())
    }

    /// Functionality that is both supported and active
    pub fn functionality(&self) -> Functionality {
        Functionality::from_bits_truncate(self.functionality & self.active_functionality)
    }

    /// Communication mode for new pairings
    pub fn communication_mode(&self) -> CommunicationMode {
        CommunicationMode::try_from(self.communication_mode)
            .unwrap_or(CommunicationMode::DerivedGroupcast)
    }

    /// Commissioning exit mode
    pub fn exit_mode(&self) -> ExitMode {
        ExitMode::from_bits_truncate(self.commissioning_exit_mode)
    }

    /// Lowest security level accepted from a GPD
    pub fn minimum_security_level(&self) -> SecurityLevel {
        SecurityLevel::try_from(self.security_level & SECURITY_LEVEL_MASK)
            .unwrap_or(SecurityLevel::None)
    }

    /// GPD keys must be protected with the link key
    pub fn requires_key_encryption(&self) -> bool {
        self.security_level & PROTECTION_WITH_LINK_KEY == PROTECTION_WITH_LINK_KEY
    }

    /// Commissioning involves the trust center
    pub fn involve_trust_center(&self) -> bool {
        self.security_level & INVOLVE_TRUST_CENTER == INVOLVE_TRUST_CENTER
    }

    /// Shared key type
    pub fn shared_key_type(&self) -> SecurityKeyType {
        SecurityKeyType::try_from(self.shared_key_type).unwrap_or(SecurityKeyType::NoKey)
    }

    /// Configuration of `endpoint`
    pub fn endpoint(&self, endpoint: u8) -> Option<&EndpointConfig> {
        self.endpoints.iter().find(|e| e.endpoint == endpoint)
    }

    /// True if `endpoint` implements `cluster` on the given side
    pub fn endpoint_contains_cluster(&self, endpoint: u8, cluster: u16, server: bool) -> bool {
        self.endpoint(endpoint)
            .map(|e| e.contains(cluster, server))
            .unwrap_or(false)
    }

    /// All application endpoints
    pub fn sink_endpoints(&self) -> impl Iterator<Item = u8> + '_ {
        self.endpoints.iter().map(|e| e.endpoint)
    }

    /// True if `endpoint` is a application endpoint
    pub fn is_sink_endpoint(&self, endpoint: u8) -> bool {
        self.endpoint(endpoint).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration() {
        let config = SinkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.communication_mode(), CommunicationMode::DerivedGroupcast);
        assert_eq!(config.exit_mode(), ExitMode::ON_FIRST_PAIRING_SUCCESS);
        assert_eq!(config.minimum_security_level(), SecurityLevel::None);
        assert!(config.functionality().contains(Functionality::TRANSLATION_TABLE));
        assert!(config.endpoint_contains_cluster(1, 0x0006, true));
        assert!(!config.endpoint_contains_cluster(1, 0x0006, false));
        assert!(!config.endpoint_contains_cluster(2, 0x0006, true));
    }

    #[test]
    fn parse_configuration() {
        let text = r#"
session_capacity = 2
security_level = 0x06
communication_mode = 0
commissioning_exit_mode = 0x01
commissioning_window = 60
shared_key_type = 4
shared_key = "c0:c1:c2:c3:c4:c5:c6:c7:c8:c9:ca:cb:cc:cd:ce:cf"
channel = 15

[[endpoints]]
endpoint = 1
server_clusters = [0x0006]

[[endpoints]]
endpoint = 2
client_clusters = [0x0402]
groups = [0x1234]
"#;
        let config = SinkConfig::from_toml(text).unwrap();
        assert_eq!(config.session_capacity, 2);
        assert_eq!(config.sink_table_capacity, 24);
        assert_eq!(config.communication_mode(), CommunicationMode::FullUnicast);
        assert_eq!(config.exit_mode(), ExitMode::ON_WINDOW_EXPIRATION);
        assert_eq!(config.minimum_security_level(), SecurityLevel::FrameCounterMic);
        assert!(config.requires_key_encryption());
        assert!(!config.involve_trust_center());
        assert_eq!(config.shared_key_type(), SecurityKeyType::IndividualKey);
        assert_eq!(config.shared_key.unwrap().as_bytes()[0], 0xc0);
        assert_eq!(config.channel, 15);
        assert_eq!(config.sink_endpoints().collect::<Vec<_>>(), vec![1, 2]);
        assert!(config.endpoint_contains_cluster(2, 0x0402, false));
        assert_eq!(config.endpoint(2).unwrap().groups, vec![0x1234]);
    }

    #[test]
    fn configuration_errors() {
        assert_eq!(
            SinkConfig::from_toml("shared_key = \"0011\""),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("shared_key_type = 2"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("shared_key_type = 1"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("shared_key_type = 5"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("security_level = 1"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("communication_mode = 4"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("session_capacity = 0"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("sink_table_capacity = 65"),
            Err(Error::ConfigurationError)
        );
        assert_eq!(
            SinkConfig::from_toml("report_buffer_size = 1024"),
            Err(Error::ConfigurationError)
        );
        assert!(SinkConfig::from_toml("translation_table_capacity = 128").is_ok());
    }
}
