//! # Commissioning
//!
//! Commissioning notifications and the sink commissioning mode. A GPD is
//! commissioned in one session, the commissioning frame fills it and moves
//! it through report collection and the commissioning reply until the
//! pairing is finalised.

use bbqueue::ArrayLength;

use psila_crypto::CryptoBackend;
use psila_gp_data::green_power::commands::{
    gpd_payload, CommissioningNotification, ExitMode, GpdPayload, ProxyCommissioningMode,
    ProxyInfo, Response, SinkCommissioningMode, MAX_GPD_PAYLOAD_SIZE,
};
use psila_gp_data::green_power::frame::{
    ApplicationDescription, ChannelConfiguration, ChannelRequest, CommissioningFrame,
    CommissioningReply, CommissioningSecurity,
};
use psila_gp_data::green_power::{
    device_id, gpd_command, server_command, SecurityOptions, MAX_COMMISSIONING_PAYLOAD_SIZE,
};
use psila_gp_data::pack::Pack;
use psila_gp_data::{GpdAddress, SecurityLevel, ShortAddress};

use crate::hooks::SinkHooks;
use crate::matcher::{FunctionalityMatch, ALL_ENDPOINTS};
use crate::message::Destination;
use crate::security::FrameSecurity;
use crate::session::CommissioningState;
use crate::{Error, GreenPowerSink, DEFAULT_COMMISSIONING_WINDOW};

impl<'a, N: ArrayLength<u8>, CB, H> GreenPowerSink<'a, N, CB, H>
where
    CB: CryptoBackend,
    H: SinkHooks,
{
    /// GP Sink Commissioning Mode from a commissioning tool
    pub(crate) fn handle_sink_commissioning_mode(&mut self, payload: &[u8]) -> Result<(), Error> {
        let command = match SinkCommissioningMode::unpack(payload) {
            Ok((command, _)) => command,
            Err(error) => {
                log::warn!("> Malformed GP Sink commissioning mode, {:?}", error);
                return Ok(());
            }
        };
        log::info!(
            "> GP Sink commissioning mode, enter {} endpoint {}",
            command.options.enter,
            command.endpoint
        );
        if command.endpoint != ALL_ENDPOINTS && !self.config.is_sink_endpoint(command.endpoint) {
            log::warn!("Commissioning mode for unknown endpoint {}", command.endpoint);
            return Ok(());
        }
        if command.options.involve_gpm_security || command.options.involve_gpm_pairing {
            log::warn!("Commissioning through a GP commissioning manager is not supported");
            return Ok(());
        }
        if self.config.involve_trust_center() {
            log::warn!("Commissioning involving the trust center is not supported");
            return Ok(());
        }
        if command.options.enter {
            self.enter_commissioning_mode(command.endpoint, command.options.involve_proxies)
        } else {
            self.exit_commissioning_mode()
        }
    }

    /// Commissioning window in seconds
    pub(crate) fn commissioning_window(&self) -> u16 {
        if self.config.exit_mode().contains(ExitMode::ON_WINDOW_EXPIRATION) {
            self.config.commissioning_window
        } else {
            DEFAULT_COMMISSIONING_WINDOW
        }
    }

    pub(crate) fn enter_commissioning_mode(
        &mut self,
        endpoint: u8,
        involve_proxies: bool,
    ) -> Result<(), Error> {
        self.sessions.reset_all();
        self.in_commissioning_mode = true;
        self.commissioning_endpoint = endpoint;
        self.proxies_involved = involve_proxies;
        let window = self.commissioning_window();
        self.window_timer.arm_seconds(self.timestamp, window);
        log::info!("Enter commissioning mode, endpoint {}, {} s", endpoint, window);
        if involve_proxies {
            self.send_proxy_commissioning_mode(true)?;
        }
        Ok(())
    }

    pub(crate) fn exit_commissioning_mode(&mut self) -> Result<(), Error> {
        let involved = self.proxies_involved;
        self.sessions.reset_all();
        self.window_timer.cancel();
        self.in_commissioning_mode = false;
        self.proxies_involved = false;
        self.commissioning_endpoint = ALL_ENDPOINTS;
        log::info!("Exit commissioning mode");
        if involved {
            self.send_proxy_commissioning_mode(false)?;
        }
        Ok(())
    }

    pub(crate) fn send_proxy_commissioning_mode(&mut self, enter: bool) -> Result<(), Error> {
        let command = if enter {
            ProxyCommissioningMode {
                enter: true,
                exit_mode: self.config.exit_mode(),
                window: Some(self.commissioning_window()),
                channel: None,
                unicast: self.config.commissioning_window_unicast,
            }
        } else {
            ProxyCommissioningMode::exit()
        };
        self.send_gp_command(
            Destination::Short(ShortAddress::rx_on_when_idle()),
            None,
            server_command::PROXY_COMMISSIONING_MODE,
            &command,
        )
    }

    /// GP Commissioning Notification from a proxy
    pub(crate) fn handle_commissioning_notification(&mut self, payload: &[u8]) -> Result<(), Error> {
        let mut notification = match CommissioningNotification::unpack(payload) {
            Ok((notification, _)) => notification,
            Err(error) => {
                log::warn!("> Malformed GP Commissioning notification, {:?}", error);
                return Ok(());
            }
        };
        log::info!(
            "> GP Commissioning notification {:?} command {:02x}",
            notification.address,
            notification.command
        );
        if self.hooks.commissioning_notification(&notification) {
            return Ok(());
        }
        if notification.address.is_zero() {
            log::warn!("Commissioning notification from the zero address");
            return Ok(());
        }
        if notification.command == gpd_command::DECOMMISSIONING {
            return self.decommission(&notification.address);
        }
        if !self.in_commissioning_mode {
            log::debug!("Not in commissioning mode");
            return Ok(());
        }
        if let Some(mic) = notification.mic {
            match self.unsecure_notification(&notification, mic) {
                Some(payload) => notification.payload = payload,
                None => {
                    self.hooks.security_failure(&notification.address);
                    return Ok(());
                }
            }
        }
        match notification.command {
            gpd_command::COMMISSIONING => self.gpd_commissioning(&notification),
            gpd_command::APPLICATION_DESCRIPTION => self.application_description(&notification),
            gpd_command::SUCCESS => self.gpd_success(&notification),
            gpd_command::CHANNEL_REQUEST => self.channel_request(
                &notification.address,
                notification.options.rx_after_tx,
                notification.proxy,
                &notification.payload,
            ),
            command => {
                log::debug!("Command {:02x} while commissioning", command);
                Ok(())
            }
        }
    }

    /// Authenticate a GPDF the proxy could not process, for level 3 the
    /// decrypted payload is returned
    fn unsecure_notification(
        &mut self,
        notification: &CommissioningNotification,
        mic: u32,
    ) -> Option<GpdPayload> {
        let address = notification.address;
        let key = self
            .session(&address)
            .and_then(|session| session.key)
            .or_else(|| {
                self.sink_table
                    .get_by_address(&address)
                    .filter(|entry| entry.security.is_some())
                    .map(|entry| entry.key)
            });
        let key = match key {
            Some(key) => key,
            None => match self.security.shared_key(&self.config, &address) {
                Ok(Some(key)) => key,
                _ => {
                    log::warn!("No key to authenticate {:?}", address);
                    return None;
                }
            },
        };
        let frame = FrameSecurity {
            address,
            level: notification.options.security_level,
            key_type: notification.options.key_type,
            rx_after_tx: notification.options.rx_after_tx,
            frame_counter: notification.frame_counter,
        };
        let mut data = [0u8; MAX_GPD_PAYLOAD_SIZE + 1];
        if notification.payload.len() + 1 > data.len() {
            return None;
        }
        data[0] = notification.command;
        data[1..=notification.payload.len()].copy_from_slice(&notification.payload);
        let length = notification.payload.len() + 1;
        let mut output = [0u8; MAX_GPD_PAYLOAD_SIZE + 1];
        match self
            .security
            .unsecure_frame(&frame, &key, &data[..length], mic, &mut output)
        {
            Ok(used) if used > 0 => gpd_payload(&output[1..used]).ok(),
            Ok(_) => None,
            Err(error) => {
                log::warn!("Security check failed for {:?}, {:?}", address, error);
                None
            }
        }
    }

    /// Commissioning GPDF
    fn gpd_commissioning(&mut self, notification: &CommissioningNotification) -> Result<(), Error> {
        let address = notification.address;
        let frame = match CommissioningFrame::unpack(&notification.payload) {
            Ok((frame, _)) => frame,
            Err(error) => {
                log::warn!("Malformed commissioning frame from {:?}, {:?}", address, error);
                return Ok(());
            }
        };
        let description_follows = frame.application_description_follows();
        let rx_after_tx = notification.options.rx_after_tx;
        if description_follows && rx_after_tx {
            log::warn!("Reply requested before the application description of {:?}", address);
            return Ok(());
        }
        if rx_after_tx
            && self.session(&address).map(|session| session.state)
                == Some(CommissioningState::CollectReports)
        {
            log::warn!("Reply requested while collecting reports from {:?}", address);
            return Ok(());
        }
        let security = frame.security.unwrap_or_else(CommissioningSecurity::none);
        let level = security.level;
        if level == SecurityLevel::Reserved {
            log::warn!("Reserved security level from {:?}", address);
            return Ok(());
        }
        if u8::from(level) < u8::from(self.config.minimum_security_level()) {
            log::warn!("Security level {:?} below the minimum", level);
            return Ok(());
        }
        if security.key.is_some() && !security.key_encryption && self.config.requires_key_encryption() {
            log::warn!("Unprotected key from {:?}", address);
            return Ok(());
        }
        let key = match (security.key, security.key_mic) {
            (Some(key), Some(mic)) if security.key_encryption => {
                match self.security.decrypt_key(&address, &key, mic) {
                    Ok(key) => Some(key),
                    Err(error) => {
                        log::warn!("Key MIC check failed for {:?}, {:?}", address, error);
                        self.hooks.security_failure(&address);
                        return Ok(());
                    }
                }
            }
            (key, _) => key,
        };
        let known_key = self.session(&address).and_then(|session| session.key).is_some();
        let key_requested = rx_after_tx && frame.options.key_request;
        if level != SecurityLevel::None && key.is_none() && !known_key && !key_requested {
            log::warn!("No key for {:?}", address);
            return Ok(());
        }

        let available = self.available_slots(&address);
        let index = match self.sessions.allocate(&address, available) {
            Ok(index) => index,
            Err(_) => return Ok(()),
        };
        let now = self.timestamp;
        let switch_timeout = self.config.generic_switch_timeout;
        let report_timeout = self.config.multi_sensor_timeout;
        let communication_mode = self.config.communication_mode();
        let session = self.sessions.get_mut(index).ok_or(Error::NotFound)?;
        session.device_id = frame.device_id;
        session.options = frame.options;
        if let Some(information) = frame.application_information {
            session.information = information;
        }
        session.security = SecurityOptions {
            level,
            key_type: security.key_type,
        };
        if key.is_some() {
            session.key = key;
        }
        session.key_encryption = security.key_encryption;
        session.outgoing_counter = security
            .outgoing_counter
            .unwrap_or(notification.frame_counter);
        session.proxy = notification.proxy;
        session.rx_after_tx = rx_after_tx;
        session.communication_mode = communication_mode;
        let vector_commands = session
            .information
            .commands
            .as_ref()
            .map_or(false, |list| list.iter().any(|c| gpd_command::is_generic_switch(*c)));
        if frame.device_id == device_id::GENERIC_SWITCH || vector_commands {
            session.switch_timer.arm_seconds(now, switch_timeout);
        }
        if description_follows && !rx_after_tx {
            if !session.report_timer.is_active() {
                session.reports.reset();
            }
            session.report_timer.arm_seconds(now, report_timeout);
            session.state = CommissioningState::CollectReports;
            log::info!("Collect reports from {:?}", address);
            return Ok(());
        }
        if rx_after_tx {
            return self.reply_if_served(index);
        }
        session.state = CommissioningState::FinalisePairing;
        self.finalise_pairing(index)
    }

    /// Application description GPDF
    fn application_description(
        &mut self,
        notification: &CommissioningNotification,
    ) -> Result<(), Error> {
        let address = notification.address;
        let index = match self.sessions.find(&address) {
            Some(index) => index,
            None => {
                log::warn!("Application description without a session");
                return Ok(());
            }
        };
        let description = match ApplicationDescription::parse(&notification.payload) {
            Ok(description) => description,
            Err(error) => {
                log::warn!("Malformed application description, {:?}", error);
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
            session.reports.set_total(description.total);
        }
        if let Err(error) = session.reports.save(description.reports) {
            log::warn!("Reports from {:?} dropped, {:?}", address, error);
            return Ok(());
        }
        session.report_timer.arm_seconds(now, report_timeout);
        log::info!(
            "Reports {} of {} from {:?}",
            session.reports.count(),
            session.reports.total(),
            address
        );
        if !session.reports.is_complete() {
            return Ok(());
        }
        session.report_timer.cancel();
        if notification.options.rx_after_tx {
            session.rx_after_tx = true;
            session.proxy = notification.proxy;
            self.reply_if_served(index)
        } else {
            session.state = CommissioningState::FinalisePairing;
            self.finalise_pairing(index)
        }
    }

    /// Success GPDF, the GPD has received the commissioning reply
    fn gpd_success(&mut self, notification: &CommissioningNotification) -> Result<(), Error> {
        let index = match self.sessions.find(&notification.address) {
            Some(index) => index,
            None => {
                log::warn!("Success without a session");
                return Ok(());
            }
        };
        let session = self.sessions.get_mut(index).ok_or(Error::NotFound)?;
        if session.state != CommissioningState::WaitForSuccess {
            log::warn!("Success in state {:?}", session.state);
            return Ok(());
        }
        if notification.options.security_level != session.security.level {
            log::warn!(
                "Success with level {:?}, expected {:?}",
                notification.options.security_level,
                session.security.level
            );
            return Ok(());
        }
        if notification.frame_counter < session.outgoing_counter {
            log::warn!(
                "Success with counter {} below {}",
                notification.frame_counter,
                session.outgoing_counter
            );
            return Ok(());
        }
        session.outgoing_counter = notification.frame_counter;
        session.state = CommissioningState::FinalisePairing;
        self.finalise_pairing(index)
    }

    /// Answer a channel request of a bidirectional GPD with the operational
    /// channel
    pub(crate) fn channel_request(
        &mut self,
        address: &GpdAddress,
        rx_after_tx: bool,
        proxy: Option<ProxyInfo>,
        payload: &[u8],
    ) -> Result<(), Error> {
        if !rx_after_tx {
            log::debug!("Channel request from {:?} without rx after tx", address);
            return Ok(());
        }
        let request = match ChannelRequest::unpack(payload) {
            Ok((request, _)) => request,
            Err(error) => {
                log::warn!("Malformed channel request, {:?}", error);
                return Ok(());
            }
        };
        let configuration = ChannelConfiguration {
            channel: self.config.channel,
        };
        let mut data = [0u8; 1];
        let used = configuration.pack(&mut data)?;
        let response = Response {
            transmit_on_endpoint_match: false,
            temporary_master: self.temporary_master(proxy),
            channel: request.next_channel,
            address: *address,
            command: gpd_command::CHANNEL_CONFIGURATION,
            payload: gpd_payload(&data[..used])?,
        };
        log::info!(
            "Channel request from {:?}, answer on {}",
            address,
            request.next_channel
        );
        self.send_gp_command(
            Destination::Short(ShortAddress::rx_on_when_idle()),
            None,
            server_command::RESPONSE,
            &response,
        )
    }

    fn temporary_master(&self, proxy: Option<ProxyInfo>) -> ShortAddress {
        proxy
            .map(|proxy| proxy.short_address)
            .unwrap_or_else(|| ShortAddress::new(self.config.node_address))
    }

    /// Reply to the session at `index` only if a sink endpoint serves the
    /// GPD, otherwise the session is dropped
    fn reply_if_served(&mut self, index: usize) -> Result<(), Error> {
        let session = self.sessions.get(index).ok_or(Error::NotFound)?;
        let matched = self
            .hooks
            .gpd_commissioning(&session.address, session.device_id, &session.information)
            .unwrap_or_else(|| {
                FunctionalityMatch::new(&self.config, session, self.commissioning_endpoint)
                    .matched_count()
            });
        if matched == 0 {
            log::warn!("No sink endpoint serves {:?}, no reply", session.address);
            self.sessions.free(index);
            return Ok(());
        }
        if let Some(session) = self.sessions.get_mut(index) {
            session.state = CommissioningState::SendCommissioningReply;
        }
        self.send_commissioning_reply(index)
    }

    /// Send the commissioning reply of the session at `index` and wait for
    /// the success GPDF
    fn send_commissioning_reply(&mut self, index: usize) -> Result<(), Error> {
        let session = self.sessions.get(index).ok_or(Error::NotFound)?;
        if session.state != CommissioningState::SendCommissioningReply {
            return Ok(());
        }
        let address = session.address;
        let proxy = session.proxy;
        let security = session.security;
        let options = session.options;
        let key_encryption = session.key_encryption;
        let counter = session.outgoing_counter;
        let (key, key_type) = match session.key {
            Some(key) => (Some(key), security.key_type),
            None => (
                self.security.shared_key(&self.config, &address)?,
                self.config.shared_key_type(),
            ),
        };
        let mut reply = CommissioningReply {
            pan_id: if options.pan_id_request {
                Some(self.config.pan_id)
            } else {
                None
            },
            level: security.level,
            key_type,
            key: None,
            key_mic: None,
            frame_counter: None,
        };
        if let Some(key) = key {
            if self.config.requires_key_encryption() || key_encryption {
                let frame_counter = counter.wrapping_add(1);
                let (encrypted, mic) = self.security.encrypt_key(&address, &key, frame_counter)?;
                reply.key = Some(encrypted);
                reply.key_mic = Some(mic);
                reply.frame_counter = Some(frame_counter);
            } else {
                reply.key = Some(key);
            }
        } else if options.key_request {
            log::warn!("No key to give {:?}", address);
        }
        let mut data = [0u8; MAX_COMMISSIONING_PAYLOAD_SIZE];
        let used = reply.pack(&mut data)?;
        let response = Response {
            transmit_on_endpoint_match: false,
            temporary_master: self.temporary_master(proxy),
            channel: self.config.channel,
            address,
            command: gpd_command::COMMISSIONING_REPLY,
            payload: gpd_payload(&data[..used])?,
        };
        if let Some(session) = self.sessions.get_mut(index) {
            session.key = key;
            session.security.key_type = key_type;
            session.state = CommissioningState::WaitForSuccess;
        }
        log::info!("Commissioning reply to {:?}", address);
        self.send_gp_command(
            Destination::Short(ShortAddress::rx_on_when_idle()),
            None,
            server_command::RESPONSE,
            &response,
        )
    }
}
