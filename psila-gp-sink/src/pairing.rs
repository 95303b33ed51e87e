//! # Pairing
//!
//! Commits a commissioned GPD to the sink and translation tables and tells
//! the proxies about it. Also handles the inverse, removal of a paired GPD,
//! and the pairing related commands from commissioning tools.

use bbqueue::ArrayLength;

use psila_crypto::CryptoBackend;
use psila_gp_data::cluster_library::{Direction, STATUS_NOT_FOUND, STATUS_SUCCESS};
use psila_gp_data::green_power::commands::{
    ExitMode, Pairing, PairingConfiguration, PairingConfigurationAction,
    PairingConfigurationOptions, PairingOptions, PairingTarget, PairedEndpoints, ProxyInfo,
    ReportBlock, SinkTableRequest, SinkTableResponse, MAX_RESPONSE_ENTRIES,
};
use psila_gp_data::green_power::frame::CommissioningOptions;
use psila_gp_data::green_power::{
    client_command, server_command, CommunicationMode, Functionality, SinkGroup, SinkTableEntry,
    SinkTableOptions,
};
use psila_gp_data::pack::Pack;
use psila_gp_data::{
    ExtendedAddress, GpdAddress, GroupIdentifier, SecurityKeyType, SecurityLevel, ShortAddress,
};

use crate::hooks::{SinkHooks, SinkTableAction};
use crate::matcher::{candidate_endpoints, FunctionalityMatch, ALL_ENDPOINTS};
use crate::message::Destination;
use crate::session::{CommissioningSession, CommissioningState};
use crate::timer::TimeoutKind;
use crate::{Error, GreenPowerSink};

const NO_ALIAS: ShortAddress = ShortAddress::new(0xffff);

impl<'a, N: ArrayLength<u8>, CB, H> GreenPowerSink<'a, N, CB, H>
where
    CB: CryptoBackend,
    H: SinkHooks,
{
    /// Commit the pairing of the session at `index`
    ///
    /// Without a single matching command the session is left for the
    /// timeout. Resource failures drop the attempt and free the session.
    pub(crate) fn finalise_pairing(&mut self, index: usize) -> Result<(), Error> {
        let session = match self.sessions.get(index) {
            Some(session) if session.state == CommissioningState::FinalisePairing => {
                session.clone()
            }
            _ => return Ok(()),
        };
        let address = session.address;

        let functionality =
            FunctionalityMatch::new(&self.config, &session, self.commissioning_endpoint);
        let overridden =
            self.hooks
                .gpd_commissioning(&address, session.device_id, &session.information);
        let matched = overridden.unwrap_or_else(|| functionality.matched_count());
        if matched == 0 {
            log::warn!("No sink endpoint serves {:?}", address);
            return Ok(());
        }
        let endpoints = if overridden.is_some() {
            candidate_endpoints(&self.config, &session.endpoints, self.commissioning_endpoint)
        } else {
            functionality.endpoints()
        };

        let slot = match self.sink_table.find_or_allocate(&address) {
            Ok(slot) => slot,
            Err(error) => {
                log::warn!("Pairing of {:?} dropped, {:?}", address, error);
                self.sessions.free(index);
                return Ok(());
            }
        };

        let mut entry = self.sink_table_entry(&session)?;
        let groups = match self.entry_groups(&mut entry, &session, &endpoints) {
            Ok(groups) => groups,
            Err(error) => {
                log::warn!("Group list for {:?} failed, {:?}", address, error);
                self.sessions.free(index);
                return Ok(());
            }
        };
        if !self.hooks.sink_table_access(SinkTableAction::AddGpd, &entry) {
            log::info!("Pairing of {:?} vetoed", address);
            self.sessions.free(index);
            return Ok(());
        }
        let previous = self.sink_table.get(slot).cloned();
        if let Err(error) = self.sink_table.set(slot, entry.clone()) {
            log::warn!("Sink table write failed, {:?}", error);
            self.sessions.free(index);
            return Ok(());
        }
        if let Err(error) = self.join_groups(&groups, &endpoints) {
            log::warn!("Group registration for {:?} failed, {:?}", address, error);
            match previous {
                Some(previous) => self.sink_table.set(slot, previous)?,
                None => {
                    self.sink_table.remove(slot);
                }
            }
            self.leave_groups(&entry);
            self.sessions.free(index);
            return Ok(());
        }

        if overridden.is_none() && self.config.functionality().contains(Functionality::TRANSLATION_TABLE)
        {
            for row in functionality.translations(&session) {
                match self.translations.add(row.clone()) {
                    Ok(_) => self.hooks.translation_table_update(&row, true),
                    Err(error) => log::warn!(
                        "Translation of {:02x} on endpoint {} dropped, {:?}",
                        row.gpd_command,
                        row.endpoint,
                        error
                    ),
                }
            }
        }
        log::info!(
            "Paired {:?} device {:02x} with endpoints {:?}",
            address,
            entry.device_id,
            endpoints
        );

        let mode = entry.communication_mode();
        if !session.suppress_pairing {
            self.send_pairing(&entry, session.proxy)?;
            if mode == CommunicationMode::Groupcast {
                self.send_groupcast_configuration(&entry, &session, &endpoints)?;
            }
        }
        if mode != CommunicationMode::LightweightUnicast {
            self.send_device_announce(entry.alias.unwrap_or_else(|| address.alias()))?;
        }

        if let Some(session) = self.sessions.get_mut(index) {
            session.state = CommissioningState::PairingDone;
        }
        self.hooks.pairing_complete(&address, &endpoints);
        self.sessions.free(index);

        if self.in_commissioning_mode
            && self
                .config
                .exit_mode()
                .contains(ExitMode::ON_FIRST_PAIRING_SUCCESS)
        {
            let endpoints = self.commissioning_endpoints();
            self.exit_commissioning_mode()?;
            self.hooks
                .commissioning_timeout(TimeoutKind::CommissioningWindow, &endpoints);
        }
        Ok(())
    }

    /// Sink table entry for a commissioned GPD
    fn sink_table_entry(&mut self, session: &CommissioningSession) -> Result<SinkTableEntry, Error> {
        let mut entry = SinkTableEntry::new(session.address, session.device_id);
        entry.options = SinkTableOptions {
            communication_mode: session.communication_mode,
            sequence_number_capability: session.options.mac_sequence_number_capability,
            rx_on_capability: session.options.rx_on_capability,
            gpd_fixed: session.options.gpd_fixed,
        };
        entry.alias = session.alias;
        entry.radius = session.radius;
        entry.frame_counter = session.outgoing_counter;
        if session.security.level != SecurityLevel::None {
            entry.security = Some(session.security);
            entry.key = match session.key {
                Some(key) => key,
                None => self
                    .security
                    .shared_key(&self.config, &session.address)?
                    .unwrap_or_default(),
            };
        }
        Ok(entry)
    }

    /// Fill the group list of `entry`, returns the groups the proxies will
    /// forward to
    fn entry_groups(
        &self,
        entry: &mut SinkTableEntry,
        session: &CommissioningSession,
        endpoints: &[u8],
    ) -> Result<Vec<GroupIdentifier>, Error> {
        let groups = match entry.communication_mode() {
            CommunicationMode::DerivedGroupcast => vec![entry.address.alias()],
            CommunicationMode::Groupcast => {
                for group in session.groups.iter() {
                    entry.add_group(*group)?;
                }
                for endpoint in endpoints {
                    let configured = self
                        .config
                        .endpoint(*endpoint)
                        .map(|config| config.groups.clone())
                        .unwrap_or_default();
                    for group in configured {
                        let group = SinkGroup {
                            group: ShortAddress::new(group),
                            alias: NO_ALIAS,
                        };
                        if entry.add_group(group).is_err() {
                            log::warn!("Group {:04x} not listed, group list full", u16::from(group.group));
                        }
                    }
                }
                if entry.groups.is_empty() {
                    entry.add_group(SinkGroup {
                        group: entry.address.alias(),
                        alias: NO_ALIAS,
                    })?;
                }
                entry.groups.iter().map(|group| group.group).collect()
            }
            _ => Vec::new(),
        };
        Ok(groups)
    }

    /// Register `endpoints` in `groups`, a membership that exists already
    /// counts as success
    fn join_groups(&mut self, groups: &[GroupIdentifier], endpoints: &[u8]) -> Result<(), Error> {
        for group in groups {
            for endpoint in endpoints {
                if self.groups.add(*endpoint, *group)? {
                    log::info!("Endpoint {} joined group {:04x}", endpoint, u16::from(*group));
                }
            }
        }
        Ok(())
    }

    fn pairing_destination(&self, proxy: Option<ProxyInfo>) -> Destination {
        match proxy {
            Some(proxy) if self.config.pairing_unicast => Destination::Short(proxy.short_address),
            _ => Destination::Short(ShortAddress::rx_on_when_idle()),
        }
    }

    /// GP Pairing adding the sink for `entry`, one per group for
    /// pre-commissioned groupcast
    fn send_pairing(&mut self, entry: &SinkTableEntry, proxy: Option<ProxyInfo>) -> Result<(), Error> {
        let mode = entry.communication_mode();
        let targets: Vec<PairingTarget> = match mode {
            CommunicationMode::DerivedGroupcast => {
                vec![PairingTarget::Group(entry.address.alias())]
            }
            CommunicationMode::Groupcast => entry
                .groups
                .iter()
                .map(|group| PairingTarget::Group(group.group))
                .collect(),
            _ => vec![PairingTarget::Sink(
                ExtendedAddress::new(self.config.extended_address),
                ShortAddress::new(self.config.node_address),
            )],
        };
        let secured = entry.security.is_some();
        let destination = self.pairing_destination(proxy);
        for target in targets {
            let pairing = Pairing {
                options: PairingOptions {
                    application_id: entry.address.application_id(),
                    add_sink: true,
                    remove_gpd: false,
                    communication_mode: mode,
                    gpd_fixed: entry.options.gpd_fixed,
                    mac_sequence_number_capability: entry.options.sequence_number_capability,
                    security_level: entry.security_level(),
                    key_type: entry
                        .security
                        .map(|security| security.key_type)
                        .unwrap_or(SecurityKeyType::NoKey),
                },
                address: entry.address,
                target: Some(target),
                device_id: entry.device_id,
                frame_counter: if secured || entry.options.sequence_number_capability {
                    Some(entry.frame_counter)
                } else {
                    None
                },
                key: if secured { Some(entry.key) } else { None },
                alias: entry.alias,
                radius: if mode.is_groupcast() {
                    Some(entry.radius)
                } else {
                    None
                },
            };
            self.send_gp_command(destination, None, server_command::PAIRING, &pairing)?;
        }
        Ok(())
    }

    /// GP Pairing Configuration describing a groupcast pairing to the other
    /// sinks
    fn pairing_configuration(
        entry: &SinkTableEntry,
        action: PairingConfigurationAction,
        endpoints: PairedEndpoints,
    ) -> PairingConfiguration {
        PairingConfiguration {
            action,
            send_pairing: false,
            options: PairingConfigurationOptions {
                application_id: entry.address.application_id(),
                communication_mode: entry.communication_mode(),
                sequence_number_capability: entry.options.sequence_number_capability,
                rx_on_capability: entry.options.rx_on_capability,
                gpd_fixed: entry.options.gpd_fixed,
            },
            address: entry.address,
            device_id: entry.device_id,
            groups: entry.groups.clone(),
            alias: entry.alias,
            radius: entry.radius,
            security: entry.security.map(|security| (security, entry.key)),
            frame_counter: entry.frame_counter,
            endpoints,
            application_information: None,
            reports: None,
        }
    }

    fn send_groupcast_configuration(
        &mut self,
        entry: &SinkTableEntry,
        session: &CommissioningSession,
        endpoints: &[u8],
    ) -> Result<(), Error> {
        let paired = match heapless::Vec::from_slice(endpoints) {
            Ok(list) => PairedEndpoints::List(list),
            Err(_) => PairedEndpoints::All,
        };
        let destination = Destination::Short(ShortAddress::rx_on_when_idle());
        let mut command = Self::pairing_configuration(
            entry,
            PairingConfigurationAction::ExtendSinkTable,
            paired.clone(),
        );
        if !session.information.is_empty() {
            command.application_information = Some(session.information.clone());
        }
        if let Err(error) = self.send_gp_frame(
            Direction::ClientToServer,
            destination,
            None,
            client_command::PAIRING_CONFIGURATION,
            &command,
        ) {
            log::warn!("GP Pairing configuration not sent, {:?}", error);
        }
        if session.reports.is_empty() {
            return Ok(());
        }
        let data = match heapless::Vec::from_slice(session.reports.data()) {
            Ok(data) => data,
            Err(_) => {
                log::warn!("Report descriptors too long to pass on");
                return Ok(());
            }
        };
        let mut command = Self::pairing_configuration(
            entry,
            PairingConfigurationAction::ApplicationDescription,
            paired,
        );
        command.reports = Some(ReportBlock {
            total: session.reports.total(),
            count: session.reports.count(),
            data,
        });
        self.send_gp_frame(
            Direction::ClientToServer,
            destination,
            None,
            client_command::PAIRING_CONFIGURATION,
            &command,
        )
    }

    /// Remove a paired GPD, a GPD without a sink table entry only loses its
    /// commissioning session
    pub(crate) fn decommission(&mut self, address: &GpdAddress) -> Result<(), Error> {
        let (slot, entry) = match self.sink_table.lookup(address) {
            Some(slot) => match self.sink_table.get(slot) {
                Some(entry) => (slot, entry.clone()),
                None => return Ok(()),
            },
            None => {
                log::debug!("Decommissioning of unknown {:?}", address);
                self.sessions.free_address(address);
                return Ok(());
            }
        };
        if !self.hooks.sink_table_access(SinkTableAction::RemoveGpd, &entry) {
            log::info!("Removal of {:?} vetoed", address);
            return Ok(());
        }
        for row in self.translations.remove_address(&entry.address) {
            self.hooks.translation_table_update(&row, false);
        }
        self.sink_table.remove(slot);
        self.sessions.free_address(&entry.address);
        self.leave_groups(&entry);
        log::info!("Removed {:?}", entry.address);

        let mode = entry.communication_mode();
        let pairing = Pairing {
            options: PairingOptions {
                application_id: entry.address.application_id(),
                add_sink: false,
                remove_gpd: true,
                communication_mode: mode,
                gpd_fixed: entry.options.gpd_fixed,
                mac_sequence_number_capability: entry.options.sequence_number_capability,
                security_level: SecurityLevel::None,
                key_type: SecurityKeyType::NoKey,
            },
            address: entry.address,
            target: None,
            device_id: entry.device_id,
            frame_counter: None,
            key: None,
            alias: None,
            radius: None,
        };
        let destination = Destination::Short(ShortAddress::rx_on_when_idle());
        self.send_gp_command(destination, None, server_command::PAIRING, &pairing)?;
        if mode == CommunicationMode::Groupcast {
            let command = Self::pairing_configuration(
                &entry,
                PairingConfigurationAction::RemoveGpd,
                PairedEndpoints::All,
            );
            self.send_gp_frame(
                Direction::ClientToServer,
                destination,
                None,
                client_command::PAIRING_CONFIGURATION,
                &command,
            )?;
        }
        Ok(())
    }

    /// Drop the group memberships no other paired GPD uses
    fn leave_groups(&mut self, entry: &SinkTableEntry) {
        let groups: Vec<GroupIdentifier> = match entry.communication_mode() {
            CommunicationMode::DerivedGroupcast => vec![entry.address.alias()],
            CommunicationMode::Groupcast => entry.groups.iter().map(|g| g.group).collect(),
            _ => return,
        };
        for group in groups {
            let in_use = self.sink_table.iter().any(|(_, other)| match other.communication_mode() {
                CommunicationMode::DerivedGroupcast => other.address.alias() == group,
                CommunicationMode::Groupcast => other.groups.iter().any(|g| g.group == group),
                _ => false,
            });
            if in_use {
                continue;
            }
            let endpoints: Vec<u8> = self.config.sink_endpoints().collect();
            for endpoint in endpoints {
                if self.groups.remove(endpoint, group) {
                    log::info!("Endpoint {} left group {:04x}", endpoint, u16::from(group));
                }
            }
        }
    }

    /// GP Pairing Configuration from a commissioning tool
    pub(crate) fn handle_pairing_configuration(
        &mut self,
        source: ShortAddress,
        payload: &[u8],
    ) -> Result<(), Error> {
        let command = match PairingConfiguration::unpack(payload) {
            Ok((command, _)) => command,
            Err(error) => {
                log::warn!("> Malformed GP Pairing configuration, {:?}", error);
                return Ok(());
            }
        };
        log::info!(
            "> GP Pairing configuration {:?} for {:?}",
            command.action,
            command.address
        );
        if u16::from(source) == self.config.node_address {
            log::debug!("Own pairing configuration");
            return Ok(());
        }
        if command.address.is_zero() {
            log::warn!("Pairing configuration for the zero address");
            return Ok(());
        }
        if let Some((security, _)) = command.security {
            if security.level == SecurityLevel::Reserved {
                log::warn!("Pairing configuration with reserved security level");
                return Ok(());
            }
        }
        match command.action {
            PairingConfigurationAction::NoAction => {
                if command.send_pairing {
                    if let Some(entry) = self.sink_table.get_by_address(&command.address).cloned() {
                        self.send_pairing(&entry, None)?;
                    }
                }
                Ok(())
            }
            PairingConfigurationAction::RemoveGpd => self.decommission(&command.address),
            PairingConfigurationAction::RemovePairing => {
                if command.address.is_wildcard() {
                    log::info!("Remove pairing for all GPDs is not supported");
                    return Ok(());
                }
                if self.sink_table.lookup(&command.address).is_some() {
                    self.decommission(&command.address)
                } else {
                    Ok(())
                }
            }
            PairingConfigurationAction::ApplicationDescription => {
                self.configured_application_description(&command)
            }
            PairingConfigurationAction::ExtendSinkTable
            | PairingConfigurationAction::ReplaceSinkTable => self.configure_pairing(command),
        }
    }

    /// Extend or replace a pairing as told by a commissioning tool
    fn configure_pairing(&mut self, command: PairingConfiguration) -> Result<(), Error> {
        let address = command.address;
        let mode = command.options.communication_mode;
        if !self.config.functionality().contains(mode.functionality()) {
            log::warn!("Communication mode {:?} not supported", mode);
            return Ok(());
        }
        let level = command
            .security
            .map(|(security, _)| security.level)
            .unwrap_or(SecurityLevel::None);
        if u8::from(level) < u8::from(self.config.minimum_security_level()) {
            log::warn!("Security level {:?} below the minimum", level);
            return Ok(());
        }

        let mut groups = command.groups.clone();
        match command.action {
            PairingConfigurationAction::ReplaceSinkTable => {
                if let Some(slot) = self.sink_table.lookup(&address) {
                    for row in self.translations.remove_address(&address) {
                        self.hooks.translation_table_update(&row, false);
                    }
                    if let Some(previous) = self.sink_table.remove(slot) {
                        self.leave_groups(&previous);
                    }
                }
            }
            _ => {
                if let Some(existing) = self.sink_table.get_by_address(&address) {
                    if existing.communication_mode() == mode {
                        for group in existing.groups.iter() {
                            if !groups.iter().any(|g| g.group == group.group)
                                && groups.push(*group).is_err()
                            {
                                log::warn!(
                                    "Group {:04x} of {:?} dropped, group list full",
                                    u16::from(group.group),
                                    address
                                );
                            }
                        }
                    }
                }
            }
        }

        let available = self.available_slots(&address);
        let index = match self.sessions.allocate(&address, available) {
            Ok(index) => index,
            Err(_) => return Ok(()),
        };
        let now = self.timestamp;
        let report_timeout = self.config.multi_sensor_timeout;
        let session = self.sessions.get_mut(index).ok_or(Error::NotFound)?;
        session.device_id = command.device_id;
        session.options = CommissioningOptions {
            mac_sequence_number_capability: command.options.sequence_number_capability,
            rx_on_capability: command.options.rx_on_capability,
            gpd_fixed: command.options.gpd_fixed,
            ..Default::default()
        };
        if let Some(information) = command.application_information {
            session.information = information;
        }
        session.endpoints = command.endpoints;
        if let Some((security, key)) = command.security {
            session.security = security;
            session.key = Some(key);
        }
        session.outgoing_counter = command.frame_counter;
        session.communication_mode = mode;
        session.alias = command.alias;
        session.groups = groups;
        session.radius = command.radius;
        session.suppress_pairing = !command.send_pairing;
        if !self.in_commissioning_mode {
            self.commissioning_endpoint = ALL_ENDPOINTS;
        }
        if session.information.application_description {
            session.reports.reset();
            session.report_timer.arm_seconds(now, report_timeout);
            session.state = CommissioningState::CollectReports;
            log::info!("Wait for the application description of {:?}", address);
            return Ok(());
        }
        session.state = CommissioningState::FinalisePairing;
        self.finalise_pairing(index)
    }

    /// Report descriptors from a commissioning tool, completing a pairing
    /// that is waiting for them
    fn configured_application_description(
        &mut self,
        command: &PairingConfiguration,
    ) -> Result<(), Error> {
        let reports = match &command.reports {
            Some(reports) => reports,
            None => return Ok(()),
        };
        let index = match self.sessions.find(&command.address) {
            Some(index) => index,
            None => {
                log::warn!("Application description without a pairing configuration");
                return Ok(());
            }
        };
        let now = self.timestamp;
        let report_timeout = self.config.multi_sensor_timeout;
        let session = self.sessions.get_mut(index).ok_or(Error::NotFound)?;
        if session.state != CommissioningState::CollectReports {
            log::warn!("Application description in state {:?}", session.state);
            return Ok(());
        }
        if session.reports.total() == 0 {
            session.reports.set_total(reports.total);
        }
        if let Err(error) = session.reports.save(&reports.data) {
            log::warn!("Reports for {:?} dropped, {:?}", command.address, error);
            return Ok(());
        }
        session.report_timer.arm_seconds(now, report_timeout);
        if !session.reports.is_complete() {
            return Ok(());
        }
        session.report_timer.cancel();
        session.state = CommissioningState::FinalisePairing;
        self.finalise_pairing(index)
    }

    /// GP Sink Table Request, only unicast requests are answered
    pub(crate) fn handle_sink_table_request(
        &mut self,
        source: ShortAddress,
        unicast: bool,
        sequence: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        if !unicast {
            log::debug!("> Broadcast GP Sink table request ignored");
            return Ok(());
        }
        let request = match SinkTableRequest::unpack(payload) {
            Ok((request, _)) => request,
            Err(error) => {
                log::warn!("> Malformed GP Sink table request, {:?}", error);
                return Ok(());
            }
        };
        log::info!("> GP Sink table request {:?}", request);
        let total = self.sink_table.len() as u8;
        let mut response = SinkTableResponse {
            status: STATUS_NOT_FOUND,
            total,
            start_index: 0xff,
            entries: heapless::Vec::new(),
        };
        match request {
            SinkTableRequest::ByGpdId(address) => {
                if let Some(entry) = self.sink_table.get_by_address(&address) {
                    response.status = STATUS_SUCCESS;
                    let _ = response.entries.push(entry.clone());
                }
            }
            SinkTableRequest::ByIndex(index) => {
                response.start_index = index;
                if index < total {
                    response.status = STATUS_SUCCESS;
                    for (_, entry) in self
                        .sink_table
                        .iter()
                        .skip(index as usize)
                        .take(MAX_RESPONSE_ENTRIES)
                    {
                        let _ = response.entries.push(entry.clone());
                    }
                }
            }
        }
        self.send_gp_command(
            Destination::Short(source),
            Some(sequence),
            server_command::SINK_TABLE_RESPONSE,
            &response,
        )
    }
}

#[cfg(test)]
mod tests {
    use bbqueue::{consts::*, BBBuffer};

    use psila_gp_data::cluster_library::{ClusterLibraryHeader, Direction};
    use psila_gp_data::device_profile::DEVICE_ANNOUNCE;
    use psila_gp_data::green_power::commands::{
        Pairing, PairingConfiguration, PairingConfigurationAction, PairingConfigurationOptions,
        PairedEndpoints, PairingTarget,
    };
    use psila_gp_data::green_power::{
        client_command, gpd_command, server_command, CommunicationMode, SinkGroup,
        GREEN_POWER_PROFILE,
    };
    use psila_gp_data::pack::Pack;
    use psila_gp_data::{ApplicationIdentifier, ExtendedAddress, GpdAddress, ShortAddress};

    use psila_gp_data::cluster_library::cluster;
    use psila_gp_data::green_power::{device_id, ClusterLists};

    use crate::message::MessageHeader;
    use crate::session::CommissioningState;
    use crate::timer::TimeoutKind;
    use crate::tests::{
        commissioning_notification, drain, enter_commissioning, gp_command, gp_frame, sink,
        ON_OFF_SWITCH, PROXY,
    };
    use crate::SinkConfig;

    const TOOL: ShortAddress = ShortAddress::new(0x0002);
    const SWITCH: GpdAddress = GpdAddress::SourceId(0x1234_5678);

    /// Command identifiers of the queued messages, GP commands for the GP
    /// profile and the cluster otherwise
    fn commands(messages: &[(MessageHeader, Vec<u8>)]) -> Vec<u16> {
        messages
            .iter()
            .map(|(header, payload)| {
                if header.profile == GREEN_POWER_PROFILE {
                    let (header, _) = ClusterLibraryHeader::unpack(payload).unwrap();
                    header.command as u16
                } else {
                    header.cluster
                }
            })
            .collect()
    }

    fn client_frame(payload: &[u8]) -> (u8, &[u8]) {
        let (header, used) = ClusterLibraryHeader::unpack(payload).unwrap();
        assert_eq!(header.control.direction, Direction::ClientToServer);
        (header.command, &payload[used..])
    }

    fn configuration(
        action: PairingConfigurationAction,
        mode: CommunicationMode,
    ) -> PairingConfiguration {
        PairingConfiguration {
            action,
            send_pairing: true,
            options: PairingConfigurationOptions {
                application_id: ApplicationIdentifier::SourceId,
                communication_mode: mode,
                sequence_number_capability: true,
                rx_on_capability: false,
                gpd_fixed: false,
            },
            address: SWITCH,
            device_id: 0x02,
            groups: Default::default(),
            alias: None,
            radius: 0x05,
            security: None,
            frame_counter: 7,
            endpoints: PairedEndpoints::All,
            application_information: None,
            reports: None,
        }
    }

    fn configuration_frame(command: &PairingConfiguration) -> Vec<u8> {
        let mut data = [0u8; 128];
        let used = command.pack(&mut data).unwrap();
        gp_frame(client_command::PAIRING_CONFIGURATION, &data[..used])
    }

    fn groupcast_config() -> SinkConfig {
        SinkConfig::from_toml(
            r#"
communication_mode = 2

[[endpoints]]
endpoint = 1
server_clusters = [0x0006]
groups = [0x4321]
"#,
        )
        .unwrap()
    }

    #[test]
    fn groupcast_pairing() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(groupcast_config(), &bb);
        enter_commissioning(&mut sink);
        drain(&mut consumer);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();

        let entry = sink.sink_table().get_by_address(&SWITCH).unwrap();
        assert_eq!(entry.communication_mode(), CommunicationMode::Groupcast);
        assert_eq!(
            entry.groups[..],
            [SinkGroup {
                group: ShortAddress::new(0x4321),
                alias: ShortAddress::new(0xffff)
            }]
        );
        assert!(sink.group_table().contains(1, ShortAddress::new(0x4321)));

        let messages = drain(&mut consumer);
        assert_eq!(
            commands(&messages),
            vec![
                server_command::PAIRING as u16,
                client_command::PAIRING_CONFIGURATION as u16,
                DEVICE_ANNOUNCE,
                server_command::PROXY_COMMISSIONING_MODE as u16,
            ]
        );
        let (_, frame) = gp_command(&messages[0].1);
        let (pairing, _) = Pairing::unpack(frame).unwrap();
        assert_eq!(pairing.target, Some(PairingTarget::Group(ShortAddress::new(0x4321))));
        assert_eq!(pairing.radius, Some(0xff));
        let (_, frame) = client_frame(&messages[1].1);
        let (command, _) = PairingConfiguration::unpack(frame).unwrap();
        assert_eq!(command.action, PairingConfigurationAction::ExtendSinkTable);
        assert_eq!(command.address, SWITCH);
        assert_eq!(command.groups.len(), 1);
    }

    #[test]
    fn vetoed_pairing_leaves_no_state() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        sink.hooks.veto_pairing = true;
        enter_commissioning(&mut sink);
        drain(&mut consumer);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();

        assert!(sink.sink_table().is_empty());
        assert!(sink.translation_table().is_empty());
        assert!(sink.group_table().iter().next().is_none());
        assert!(sink.hooks().paired.is_empty());
        assert_eq!(sink.session_count(), 0);
        assert!(sink.in_commissioning_mode());
        assert!(drain(&mut consumer).is_empty());
    }

    #[test]
    fn first_pairing_closes_window() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        enter_commissioning(&mut sink);
        drain(&mut consumer);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();
        assert!(!sink.in_commissioning_mode());
        assert_eq!(sink.hooks().timeouts, vec![TimeoutKind::CommissioningWindow]);
        assert_eq!(sink.hooks().paired.len(), 1);
    }

    #[test]
    fn sensor_pairing_keeps_every_cluster() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let config = SinkConfig::from_toml(
            r#"
[[endpoints]]
endpoint = 2
client_clusters = [0x0402, 0x0405]
"#,
        )
        .unwrap();
        let (mut sink, mut consumer) = sink(config, &bb);
        let address = GpdAddress::SourceId(0x42);
        let index = sink.sessions.allocate(&address, 1).unwrap();
        {
            let session = sink.sessions.get_mut(index).unwrap();
            session.device_id = device_id::MANUFACTURER_SPECIFIC;
            session.endpoints = PairedEndpoints::All;
            let mut lists = ClusterLists::default();
            lists.server.push(cluster::TEMPERATURE_MEASUREMENT).unwrap();
            lists.server.push(cluster::RELATIVE_HUMIDITY_MEASUREMENT).unwrap();
            session.information.clusters = Some(lists);
            session.state = CommissioningState::FinalisePairing;
        }
        sink.finalise_pairing(index).unwrap();

        let rows: Vec<_> = sink
            .translation_table()
            .iter()
            .filter(|(_, row)| row.gpd_command == gpd_command::ANY_SENSOR_COMMAND)
            .map(|(_, row)| (row.endpoint, row.cluster))
            .collect();
        assert_eq!(
            rows,
            vec![
                (2, cluster::TEMPERATURE_MEASUREMENT),
                (2, cluster::RELATIVE_HUMIDITY_MEASUREMENT),
            ]
        );
        assert_eq!(sink.hooks().paired, vec![(address, vec![2])]);
        drain(&mut consumer);
    }

    #[test]
    fn full_unicast_pairing() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let mut config = SinkConfig::default();
        config.communication_mode = 0;
        config.node_address = 0x0000;
        config.extended_address = 0x0011_2233_4455_6677;
        config.pairing_unicast = true;
        let (mut sink, mut consumer) = sink(config, &bb);
        enter_commissioning(&mut sink);
        drain(&mut consumer);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();
        assert!(sink.group_table().iter().next().is_none());

        let messages = drain(&mut consumer);
        assert_eq!(messages[0].0.destination, crate::Destination::Short(PROXY));
        let (command, frame) = gp_command(&messages[0].1);
        assert_eq!(command, server_command::PAIRING);
        let (pairing, _) = Pairing::unpack(frame).unwrap();
        assert_eq!(
            pairing.target,
            Some(PairingTarget::Sink(
                ExtendedAddress::new(0x0011_2233_4455_6677),
                ShortAddress::new(0x0000)
            ))
        );
        assert_eq!(pairing.frame_counter, Some(0));
        assert_eq!(pairing.radius, None);
        assert_eq!(messages[1].0.cluster, DEVICE_ANNOUNCE);
    }

    #[test]
    fn lightweight_unicast_without_announce() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let mut config = SinkConfig::default();
        config.communication_mode = 3;
        let (mut sink, mut consumer) = sink(config, &bb);
        enter_commissioning(&mut sink);
        drain(&mut consumer);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();
        assert!(sink.sink_table().get_by_address(&SWITCH).is_some());
        let messages = drain(&mut consumer);
        assert_eq!(
            commands(&messages),
            vec![
                server_command::PAIRING as u16,
                server_command::PROXY_COMMISSIONING_MODE as u16,
            ]
        );
    }

    #[test]
    fn configured_pairing() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        let mut command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::DerivedGroupcast,
        );
        command.alias = Some(ShortAddress::new(0x7777));
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();

        let entry = sink.sink_table().get_by_address(&SWITCH).unwrap();
        assert_eq!(entry.frame_counter, 7);
        assert_eq!(entry.radius, 0x05);
        assert_eq!(entry.alias, Some(ShortAddress::new(0x7777)));
        assert_eq!(sink.translation_table().len(), 3);
        assert_eq!(sink.hooks().paired, vec![(SWITCH, vec![1])]);
        assert_eq!(sink.session_count(), 0);

        let messages = drain(&mut consumer);
        assert_eq!(
            commands(&messages),
            vec![server_command::PAIRING as u16, DEVICE_ANNOUNCE]
        );
        assert_eq!(messages[1].0.alias, Some(ShortAddress::new(0x7777)));
    }

    #[test]
    fn extend_with_full_group_list() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        let group = |id: u16| SinkGroup {
            group: ShortAddress::new(id),
            alias: ShortAddress::new(0xffff),
        };
        let mut command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::Groupcast,
        );
        command.groups = heapless::Vec::from_slice(&[group(0x0101)]).unwrap();
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert_eq!(
            sink.sink_table().get_by_address(&SWITCH).unwrap().groups[..],
            [group(0x0101)]
        );

        // The list is full with the new groups, the stored one is dropped
        command.groups = heapless::Vec::from_slice(&[group(0x0202), group(0x0303)]).unwrap();
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert_eq!(
            sink.sink_table().get_by_address(&SWITCH).unwrap().groups[..],
            [group(0x0202), group(0x0303)]
        );
        assert_eq!(sink.hooks().paired.len(), 2);
        drain(&mut consumer);
    }

    #[test]
    fn configured_pairing_without_pairing_send() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        let mut command = configuration(
            PairingConfigurationAction::ReplaceSinkTable,
            CommunicationMode::DerivedGroupcast,
        );
        command.send_pairing = false;
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert!(sink.sink_table().get_by_address(&SWITCH).is_some());
        assert_eq!(commands(&drain(&mut consumer)), vec![DEVICE_ANNOUNCE]);
    }

    #[test]
    fn configured_pairing_without_matching_endpoint() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(SinkConfig::default(), &bb);
        let mut command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::DerivedGroupcast,
        );
        command.endpoints = PairedEndpoints::List(heapless::Vec::from_slice(&[9]).unwrap());
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert!(sink.sink_table().is_empty());
        assert!(sink.translation_table().is_empty());
        assert!(drain(&mut consumer).is_empty());
    }

    #[test]
    fn configuration_checks() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let mut config = SinkConfig::default();
        // Derived groupcast only
        config.functionality = 0x00_0005;
        let (mut sink, mut consumer) = sink(config, &bb);
        let command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::FullUnicast,
        );
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert!(sink.sink_table().is_empty());
        // Own command
        let command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::DerivedGroupcast,
        );
        let own = ShortAddress::new(sink.config().node_address);
        sink.receive(own, true, &configuration_frame(&command), 0).unwrap();
        assert!(sink.sink_table().is_empty());
        assert_eq!(sink.session_count(), 0);
        assert!(drain(&mut consumer).is_empty());
    }

    #[test]
    fn configured_application_description() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let config = SinkConfig::from_toml(
            r#"
[[endpoints]]
endpoint = 2
client_clusters = [0x0402]
"#,
        )
        .unwrap();
        let (mut sink, mut consumer) = sink(config, &bb);
        let sensor = GpdAddress::SourceId(0x42);
        let mut command = configuration(
            PairingConfigurationAction::ExtendSinkTable,
            CommunicationMode::DerivedGroupcast,
        );
        command.address = sensor;
        command.device_id = 0x30;
        command.send_pairing = false;
        command.application_information = Some(psila_gp_data::green_power::ApplicationInformation {
            application_description: true,
            ..Default::default()
        });
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert_eq!(
            sink.session(&sensor).unwrap().state,
            crate::CommissioningState::CollectReports
        );

        let mut description = configuration(
            PairingConfigurationAction::ApplicationDescription,
            CommunicationMode::DerivedGroupcast,
        );
        description.address = sensor;
        description.device_id = 0x30;
        description.reports = Some(psila_gp_data::green_power::commands::ReportBlock {
            total: 1,
            count: 1,
            data: heapless::Vec::from_slice(&[
                0x00, 0x00, 0x08, 0x08, 0x02, 0x04, 0x00, 0x00, 0x29, 0x10, 0x00,
            ])
            .unwrap(),
        });
        sink.receive(TOOL, true, &configuration_frame(&description), 0).unwrap();
        assert!(sink.session(&sensor).is_none());
        assert!(sink.sink_table().get_by_address(&sensor).is_some());
        assert_eq!(sink.hooks().paired, vec![(sensor, vec![2])]);
        assert!(!sink.translation_table().is_empty());
        drain(&mut consumer);
    }

    #[test]
    fn groupcast_decommission() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let (mut sink, mut consumer) = sink(groupcast_config(), &bb);
        enter_commissioning(&mut sink);
        let frame =
            commissioning_notification(0x1234_5678, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
        sink.receive(PROXY, false, &frame, 0).unwrap();
        drain(&mut consumer);

        let command = configuration(
            PairingConfigurationAction::RemoveGpd,
            CommunicationMode::Groupcast,
        );
        sink.receive(TOOL, true, &configuration_frame(&command), 0).unwrap();
        assert!(sink.sink_table().is_empty());
        assert!(sink.translation_table().is_empty());
        assert!(!sink.group_table().contains(1, ShortAddress::new(0x4321)));
        let messages = drain(&mut consumer);
        assert_eq!(
            commands(&messages),
            vec![
                server_command::PAIRING as u16,
                client_command::PAIRING_CONFIGURATION as u16,
            ]
        );
        let (_, frame) = client_frame(&messages[1].1);
        let (command, _) = PairingConfiguration::unpack(frame).unwrap();
        assert_eq!(command.action, PairingConfigurationAction::RemoveGpd);
    }

    #[test]
    fn sink_table_request_by_index() {
        let bb: BBBuffer<U2048> = BBBuffer::new();
        let mut config = SinkConfig::default();
        config.commissioning_exit_mode = 0x04;
        let (mut sink, mut consumer) = sink(config, &bb);
        enter_commissioning(&mut sink);
        for address in [0x1111_1111u32, 0x2222_2222] {
            let frame =
                commissioning_notification(address, false, gpd_command::COMMISSIONING, &ON_OFF_SWITCH);
            sink.receive(PROXY, false, &frame, 0).unwrap();
        }
        drain(&mut consumer);
        let request = gp_frame(client_command::SINK_TABLE_REQUEST, &[0x08, 0x01]);
        sink.receive(PROXY, true, &request, 0).unwrap();
        let messages = drain(&mut consumer);
        let (_, frame) = gp_command(&messages[0].1);
        let (response, _) =
            psila_gp_data::green_power::commands::SinkTableResponse::unpack(frame).unwrap();
        assert_eq!(response.status, psila_gp_data::cluster_library::STATUS_SUCCESS);
        assert_eq!(response.total, 2);
        assert_eq!(response.start_index, 1);
        assert_eq!(response.entries.len(), 1);
        assert_eq!(response.entries[0].address, GpdAddress::SourceId(0x2222_2222));
    }
}
