//! # Functionality matching
//!
//! Decides which of the commands a GPD can send are served by the sink
//! endpoints, and on which endpoints. The result drives the translation
//! table rows written when the pairing is finalised.

use psila_gp_data::cluster_library::{cluster, GENERAL_REPORT_ATTRIBUTES};
use psila_gp_data::green_power::commands::PairedEndpoints;
use psila_gp_data::green_power::{device_id, gpd_command, HOME_AUTOMATION_PROFILE};
use psila_gp_data::GpdAddress;

use crate::config::SinkConfig;
use crate::lookup::{command_cluster, device_clusters, device_commands, ClusterSide};
use crate::session::CommissioningSession;
use crate::translation::{default_translation, AdditionalInfo, PayloadTemplate, TranslationEntry};

/// Endpoint number meaning every sink endpoint
pub const ALL_ENDPOINTS: u8 = 0xff;

/// Commands the GPD sends, from its command list or its device type.
/// The attribute reporting commands collapse into the any sensor command.
pub fn command_list(session: &CommissioningSession, capacity: usize) -> Vec<u8> {
    let information = &session.information;
    let mut commands: Vec<u8> = Vec::new();
    let push = |command: u8, commands: &mut Vec<u8>| {
        let command = if gpd_command::is_sensor_report(command) {
            gpd_command::ANY_SENSOR_COMMAND
        } else {
            command
        };
        if !commands.contains(&command) && commands.len() < capacity {
            commands.push(command);
        }
    };
    match &information.commands {
        Some(list) => {
            for command in list.iter() {
                push(*command, &mut commands);
            }
        }
        None => {
            for command in device_commands(session.device_id) {
                push(*command, &mut commands);
            }
        }
    }
    if commands.is_empty() && session.device_id == device_id::MANUFACTURER_SPECIFIC {
        if information.clusters.is_some() {
            push(gpd_command::ANY_SENSOR_COMMAND, &mut commands);
            push(gpd_command::ZCL_TUNNELING, &mut commands);
        }
    }
    if (information.application_description || !session.reports.is_empty())
        && !commands.contains(&gpd_command::COMPACT_ATTRIBUTE_REPORTING)
    {
        push(gpd_command::COMPACT_ATTRIBUTE_REPORTING, &mut commands);
    }
    commands
}

/// Sink side clusters `command` needs
pub fn command_clusters(session: &CommissioningSession, command: u8) -> Vec<ClusterSide> {
    if gpd_command::is_generic_switch(command) {
        return vec![(cluster::ON_OFF, true)];
    }
    if command == gpd_command::COMPACT_ATTRIBUTE_REPORTING {
        // A server attribute of the GPD is reported to a client cluster
        let mut clusters = Vec::new();
        for report in session.reports.descriptors().flatten() {
            for point in report.data_points().flatten() {
                let side = (point.cluster, !point.server);
                if !clusters.contains(&side) {
                    clusters.push(side);
                }
            }
        }
        return clusters;
    }
    match command_cluster(command) {
        Some((cluster::RESERVED, _)) => match &session.information.clusters {
            Some(lists) => {
                let server = lists.server.iter().map(|c| (*c, false));
                let client = lists.client.iter().map(|c| (*c, true));
                server.chain(client).collect()
            }
            None => device_clusters(session.device_id).to_vec(),
        },
        Some(side) => vec![side],
        None => Vec::new(),
    }
}

/// Sink endpoints to match against
pub fn candidate_endpoints(
    config: &SinkConfig,
    endpoints: &PairedEndpoints,
    commissioning_endpoint: u8,
) -> Vec<u8> {
    match endpoints {
        PairedEndpoints::List(list) => list
            .iter()
            .copied()
            .filter(|e| config.is_sink_endpoint(*e))
            .collect(),
        PairedEndpoints::Commissioning if commissioning_endpoint != ALL_ENDPOINTS => {
            if config.is_sink_endpoint(commissioning_endpoint) {
                vec![commissioning_endpoint]
            } else {
                Vec::new()
            }
        }
        _ => config.sink_endpoints().collect(),
    }
}

/// Endpoints and clusters serving one GPD command
#[derive(Clone, Debug, PartialEq)]
pub struct CommandMatch {
    /// GPD command
    pub command: u8,
    /// Endpoint and sink side cluster pairs
    pub endpoints: Vec<(u8, ClusterSide)>,
}

/// Result of matching a GPD against the sink endpoints
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FunctionalityMatch {
    /// Matched commands
    pub commands: Vec<CommandMatch>,
}

impl FunctionalityMatch {
    /// Match the commands of the GPD in `session`
    pub fn new(config: &SinkConfig, session: &CommissioningSession, commissioning_endpoint: u8) -> Self {
        let endpoints = candidate_endpoints(config, &session.endpoints, commissioning_endpoint);
        let mut commands = Vec::new();
        for command in command_list(session, config.command_list_capacity) {
            if gpd_command::is_generic_switch(command) && default_translation(command).is_none() {
                log::debug!("No translation for switch command {:02x}", command);
                continue;
            }
            let clusters = command_clusters(session, command);
            let mut matched = Vec::new();
            for endpoint in endpoints.iter() {
                for (cluster, server) in clusters.iter() {
                    if config.endpoint_contains_cluster(*endpoint, *cluster, *server) {
                        matched.push((*endpoint, (*cluster, *server)));
                    }
                }
            }
            if matched.is_empty() {
                log::debug!("No endpoint for GPD command {:02x}", command);
            } else {
                commands.push(CommandMatch {
                    command,
                    endpoints: matched,
                });
            }
        }
        Self { commands }
    }

    /// Number of matched commands
    pub fn matched_count(&self) -> usize {
        self.commands.len()
    }

    /// The distinct endpoints of the match
    pub fn endpoints(&self) -> Vec<u8> {
        let mut endpoints: Vec<u8> = Vec::new();
        for command in self.commands.iter() {
            for (endpoint, _) in command.endpoints.iter() {
                if !endpoints.contains(endpoint) {
                    endpoints.push(*endpoint);
                }
            }
        }
        endpoints
    }

    /// Translation table rows for the match
    pub fn translations(&self, session: &CommissioningSession) -> Vec<TranslationEntry> {
        let address = session.address;
        let mut entries = Vec::new();
        for command in self.commands.iter() {
            for (endpoint, (cluster, server)) in command.endpoints.iter() {
                match command.command {
                    gpd_command::COMPACT_ATTRIBUTE_REPORTING => {
                        compact_report_rows(&address, session, *endpoint, *cluster, *server, &mut entries);
                    }
                    gpd_command::ANY_SENSOR_COMMAND | gpd_command::ZCL_TUNNELING => {
                        entries.push(TranslationEntry {
                            address,
                            gpd_command: command.command,
                            endpoint: *endpoint,
                            profile: HOME_AUTOMATION_PROFILE,
                            cluster: *cluster,
                            zcl_command: GENERAL_REPORT_ATTRIBUTES,
                            server: *server,
                            payload: PayloadTemplate::Parse,
                            info: AdditionalInfo::None,
                        });
                    }
                    gpd_command::GENERIC_SWITCH_PRESS | gpd_command::GENERIC_SWITCH_RELEASE => {
                        let info = match session.information.switch_information {
                            Some(switch) => AdditionalInfo::GenericSwitch {
                                contacts: switch.current_contact_status,
                                mask: contact_mask(switch.number_of_contacts()),
                            },
                            None => AdditionalInfo::None,
                        };
                        if let Some(entry) =
                            TranslationEntry::from_default(address, command.command, *endpoint)
                        {
                            entries.push(TranslationEntry { info, ..entry });
                        }
                    }
                    other => {
                        if let Some(entry) = TranslationEntry::from_default(address, other, *endpoint) {
                            if entry.cluster == *cluster {
                                entries.push(entry);
                            }
                        }
                    }
                }
            }
        }
        entries
    }
}

fn contact_mask(contacts: u8) -> u8 {
    match contacts {
        0 => 0xff,
        1..=7 => (1u8 << contacts) - 1,
        _ => 0xff,
    }
}

fn compact_report_rows(
    address: &GpdAddress,
    session: &CommissioningSession,
    endpoint: u8,
    cluster: u16,
    server: bool,
    entries: &mut Vec<TranslationEntry>,
) {
    for report in session.reports.descriptors().flatten() {
        for point in report.data_points().flatten() {
            if point.cluster != cluster || point.server == server {
                continue;
            }
            for attribute in point.attributes() {
                if let Some(offset) = attribute.offset {
                    entries.push(TranslationEntry {
                        address: *address,
                        gpd_command: gpd_command::COMPACT_ATTRIBUTE_REPORTING,
                        endpoint,
                        profile: HOME_AUTOMATION_PROFILE,
                        cluster,
                        zcl_command: GENERAL_REPORT_ATTRIBUTES,
                        server,
                        payload: PayloadTemplate::Parse,
                        info: AdditionalInfo::CompactAttributeReport {
                            report_id: report.id,
                            offset,
                            cluster,
                            attribute: attribute.attribute,
                            data_type: attribute.data_type,
                            server: point.server,
                        },
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use psila_gp_data::green_power::{ClusterLists, CommandList, SwitchInformation};

    const REPORTS: [u8; 24] = [
        0x00, 0x00, 0x08, 0x08, 0x02, 0x04, 0x00, 0x00, 0x29, 0x10, 0x00, 0x01, 0x01, 0x2c,
        0x01, 0x08, 0x08, 0x05, 0x04, 0x00, 0x00, 0x21, 0x10, 0x00,
    ];

    fn session(device: u8) -> CommissioningSession {
        let mut session = CommissioningSession::new(GpdAddress::SourceId(0x1234_5678), 82);
        session.device_id = device;
        session
    }

    fn sensor_config() -> SinkConfig {
        let mut config = SinkConfig::default();
        config.endpoints.push(EndpointConfig {
            endpoint: 2,
            server_clusters: Vec::new(),
            client_clusters: vec![
                cluster::TEMPERATURE_MEASUREMENT,
                cluster::RELATIVE_HUMIDITY_MEASUREMENT,
            ],
            groups: Vec::new(),
        });
        config
    }

    #[test]
    fn on_off_switch_from_device_type() {
        let config = SinkConfig::default();
        let session = session(device_id::ON_OFF_SWITCH);
        assert_eq!(command_list(&session, 50), vec![0x20, 0x21, 0x22]);
        let matched = FunctionalityMatch::new(&config, &session, ALL_ENDPOINTS);
        assert_eq!(matched.matched_count(), 3);
        assert_eq!(matched.endpoints(), vec![1]);
        let rows = matched.translations(&session);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.iter().map(|r| r.zcl_command).collect::<Vec<_>>(),
            vec![0x00, 0x01, 0x02]
        );
        assert!(rows.iter().all(|r| r.cluster == cluster::ON_OFF && r.endpoint == 1));
    }

    #[test]
    fn explicit_command_list() {
        let mut session = session(device_id::MANUFACTURER_SPECIFIC);
        let mut commands = CommandList::new();
        for command in [0x22, 0xa0, 0xa2, 0x22, 0xe0] {
            commands.push(command).unwrap();
        }
        session.information.commands = Some(commands);
        assert_eq!(command_list(&session, 50), vec![0x22, 0xaf, 0xe0]);
        assert_eq!(command_list(&session, 2), vec![0x22, 0xaf]);
        let matched = FunctionalityMatch::new(&SinkConfig::default(), &session, ALL_ENDPOINTS);
        // Only toggle has a cluster on endpoint 1
        assert_eq!(matched.matched_count(), 1);
        assert_eq!(matched.commands[0].command, 0x22);
    }

    #[test]
    fn manufacturer_device_with_clusters() {
        let mut session = session(device_id::MANUFACTURER_SPECIFIC);
        let mut lists = ClusterLists::default();
        lists.server.push(cluster::TEMPERATURE_MEASUREMENT).unwrap();
        session.information.clusters = Some(lists);
        assert_eq!(command_list(&session, 50), vec![0xaf, 0xa6]);
        assert_eq!(
            command_clusters(&session, 0xaf),
            vec![(cluster::TEMPERATURE_MEASUREMENT, false)]
        );
        let matched = FunctionalityMatch::new(&sensor_config(), &session, ALL_ENDPOINTS);
        assert_eq!(matched.endpoints(), vec![2]);
    }

    #[test]
    fn compact_attribute_reports() {
        let mut session = session(device_id::MANUFACTURER_SPECIFIC);
        session.information.application_description = true;
        session.reports.set_total(2);
        session.reports.save(&REPORTS).unwrap();
        assert_eq!(command_list(&session, 50), vec![0xa8]);
        assert_eq!(
            command_clusters(&session, 0xa8),
            vec![
                (cluster::TEMPERATURE_MEASUREMENT, false),
                (cluster::RELATIVE_HUMIDITY_MEASUREMENT, false)
            ]
        );
        let config = sensor_config();
        assert!(FunctionalityMatch::new(&SinkConfig::default(), &session, ALL_ENDPOINTS)
            .commands
            .is_empty());
        let matched = FunctionalityMatch::new(&config, &session, ALL_ENDPOINTS);
        let rows = matched.translations(&session);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].endpoint, 2);
        assert_eq!(
            rows[1].info,
            AdditionalInfo::CompactAttributeReport {
                report_id: 1,
                offset: 0,
                cluster: cluster::RELATIVE_HUMIDITY_MEASUREMENT,
                attribute: 0,
                data_type: 0x21,
                server: true,
            }
        );
    }

    #[test]
    fn generic_switch_rows() {
        let mut session = session(device_id::GENERIC_SWITCH);
        session.information.switch_information = Some(SwitchInformation {
            configuration: 0x02,
            current_contact_status: 0x01,
        });
        let matched = FunctionalityMatch::new(&SinkConfig::default(), &session, ALL_ENDPOINTS);
        // Release has no default translation and is not counted
        assert_eq!(matched.matched_count(), 1);
        assert_eq!(matched.commands[0].command, gpd_command::GENERIC_SWITCH_PRESS);
        let rows = matched.translations(&session);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].info,
            AdditionalInfo::GenericSwitch {
                contacts: 0x01,
                mask: 0x03
            }
        );
    }

    #[test]
    fn switch_release_only() {
        let mut session = session(device_id::MANUFACTURER_SPECIFIC);
        let mut commands = CommandList::new();
        commands.push(gpd_command::GENERIC_SWITCH_RELEASE).unwrap();
        session.information.commands = Some(commands);
        let matched = FunctionalityMatch::new(&SinkConfig::default(), &session, ALL_ENDPOINTS);
        assert_eq!(matched.matched_count(), 0);
        assert!(matched.translations(&session).is_empty());
    }

    #[test]
    fn endpoint_selection() {
        let config = sensor_config();
        assert_eq!(
            candidate_endpoints(&config, &PairedEndpoints::All, 1),
            vec![1, 2]
        );
        assert_eq!(
            candidate_endpoints(&config, &PairedEndpoints::Commissioning, 2),
            vec![2]
        );
        assert_eq!(
            candidate_endpoints(&config, &PairedEndpoints::Commissioning, ALL_ENDPOINTS),
            vec![1, 2]
        );
        let list = PairedEndpoints::List(heapless::Vec::from_slice(&[2, 7]).unwrap());
        assert_eq!(candidate_endpoints(&config, &list, ALL_ENDPOINTS), vec![2]);
        let mut session = session(device_id::ON_OFF_SWITCH);
        session.endpoints = PairedEndpoints::List(heapless::Vec::from_slice(&[2]).unwrap());
        assert_eq!(
            FunctionalityMatch::new(&config, &session, ALL_ENDPOINTS).matched_count(),
            0
        );
    }
}
