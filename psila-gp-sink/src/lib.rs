//! # Psila Green Power Sink
//!
//! A Zigbee Green Power sink. GP cluster commands from proxies and
//! commissioning tools are passed to `GreenPowerSink::receive`, the sink
//! commissions GPDs, keeps the sink and translation tables and forwards
//! GPD commands to the application endpoints as ZCL commands.
//!
//! Outgoing messages are written to a `bbqueue` transmit queue. Each record
//! is a little endian length, a packed `MessageHeader` and the ZCL or ZDP
//! payload, see `Message::from_record`.

#[macro_use]
extern crate bitflags;

use bbqueue::{ArrayLength, Producer};
use byteorder::{ByteOrder, LittleEndian};

use psila_crypto::CryptoBackend;
use psila_gp_data::cluster_library::{cluster, ClusterLibraryHeader, Direction, FrameType};
use psila_gp_data::device_profile::{DeviceAnnounce, DEVICE_ANNOUNCE};
use psila_gp_data::green_power::{
    client_command, DEVICE_PROFILE, GREEN_POWER_ENDPOINT, GREEN_POWER_PROFILE,
};
use psila_gp_data::pack::Pack;
use psila_gp_data::{GpdAddress, ShortAddress, DEFAULT_LINK_KEY};

mod commissioning;
pub mod config;
mod error;
mod forwarding;
pub mod groups;
pub mod hooks;
pub mod lookup;
pub mod matcher;
pub mod message;
mod pairing;
pub mod security;
pub mod session;
pub mod sink_table;
pub mod storage;
pub mod timer;
pub mod translation;

pub use config::{EndpointConfig, SinkConfig};
pub use error::Error;
pub use hooks::{NoHooks, SinkHooks, SinkTableAction};
pub use message::{Destination, Message, MessageHeader};
pub use session::{CommissioningSession, CommissioningState};
pub use storage::{MemoryStorage, PersistentStorage, TableId};
pub use timer::TimeoutKind;

use groups::GroupTable;
use matcher::ALL_ENDPOINTS;
use message::RECORD_LENGTH_SIZE;
use security::SinkSecurity;
use session::SessionPool;
use sink_table::SinkTable;
use timer::Timer;
use translation::TranslationTable;

/// Max buffer size
pub const PACKET_BUFFER_MAX: usize = 256;

/// Commissioning window used when the exit mode does not include window
/// expiration, in seconds
pub const DEFAULT_COMMISSIONING_WINDOW: u16 = 180;

/// The Green Power sink
pub struct GreenPowerSink<'a, N: ArrayLength<u8>, CB, H> {
    config: SinkConfig,
    sessions: SessionPool,
    sink_table: SinkTable,
    translations: TranslationTable,
    groups: GroupTable,
    security: SinkSecurity<CB>,
    hooks: H,
    tx_queue: Producer<'a, N>,
    window_timer: Timer,
    in_commissioning_mode: bool,
    proxies_involved: bool,
    commissioning_endpoint: u8,
    zcl_sequence: u8,
    zdp_sequence: u8,
    timestamp: u32,
}

impl<'a, N: ArrayLength<u8>, CB, H> GreenPowerSink<'a, N, CB, H>
where
    CB: CryptoBackend,
    H: SinkHooks,
{
    /// Create a sink, the configuration is validated
    pub fn new(
        config: SinkConfig,
        crypto: CB,
        tx_queue: Producer<'a, N>,
        hooks: H,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            sessions: SessionPool::new(config.session_capacity, config.report_buffer_size),
            sink_table: SinkTable::new(config.sink_table_capacity),
            translations: TranslationTable::new(
                config.translation_table_capacity,
                config.customized_table_capacity,
            ),
            groups: GroupTable::new(config.group_table_capacity),
            security: SinkSecurity::new(crypto, DEFAULT_LINK_KEY),
            hooks,
            tx_queue,
            window_timer: Timer::default(),
            in_commissioning_mode: false,
            proxies_involved: false,
            commissioning_endpoint: ALL_ENDPOINTS,
            zcl_sequence: 0,
            zdp_sequence: 0,
            timestamp: 0,
            config,
        })
    }

    /// The configuration
    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// The sink table
    pub fn sink_table(&self) -> &SinkTable {
        &self.sink_table
    }

    /// The translation table
    pub fn translation_table(&self) -> &TranslationTable {
        &self.translations
    }

    /// Groups the application endpoints have joined for GPD groupcast
    pub fn group_table(&self) -> &GroupTable {
        &self.groups
    }

    /// The application hooks
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// The application hooks
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// The commissioning session of `address`
    pub fn session(&self, address: &GpdAddress) -> Option<&CommissioningSession> {
        self.sessions
            .find(address)
            .and_then(|index| self.sessions.get(index))
    }

    /// Number of allocated commissioning sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// True while the sink is in commissioning mode
    pub fn in_commissioning_mode(&self) -> bool {
        self.in_commissioning_mode
    }

    /// Receive, call this method with the ZCL frame of every Green Power
    /// cluster command addressed to the sink
    /// ### Parameters
    /// `source` is the network address of the sender, `unicast` is true if
    /// the command was addressed to this device only
    /// ### Return
    /// A new timeout value that the timer shall be configured with, a timeout
    /// value of zero (0) shall be ignored
    pub fn receive(
        &mut self,
        source: ShortAddress,
        unicast: bool,
        data: &[u8],
        timestamp: u32,
    ) -> Result<u32, Error> {
        self.timestamp = timestamp;
        let (header, used) = match ClusterLibraryHeader::unpack(data) {
            Ok(result) => result,
            Err(_) => return Err(Error::MalformedPacket),
        };
        if header.control.frame_type != FrameType::Local
            || header.control.direction != Direction::ClientToServer
            || header.manufacturer.is_some()
        {
            log::debug!("> Ignore GP frame, command {:02x}", header.command);
            return Ok(self.next_timeout());
        }
        let payload = &data[used..];
        match header.command {
            client_command::NOTIFICATION => self.handle_notification(payload)?,
            client_command::COMMISSIONING_NOTIFICATION => {
                self.handle_commissioning_notification(payload)?
            }
            client_command::SINK_COMMISSIONING_MODE => {
                self.handle_sink_commissioning_mode(payload)?
            }
            client_command::PAIRING_CONFIGURATION => {
                self.handle_pairing_configuration(source, payload)?
            }
            client_command::SINK_TABLE_REQUEST => {
                self.handle_sink_table_request(source, unicast, header.transaction_sequence, payload)?
            }
            command => {
                log::debug!("> Unsupported GP command {:02x}", command);
            }
        }
        Ok(self.next_timeout())
    }

    /// Update, call this method when the timer has triggered or at regular
    /// intervals
    /// ### Return
    /// A new timeout value that the timer shall be configured with, a timeout
    /// value of zero (0) shall be ignored
    pub fn update(&mut self, timestamp: u32) -> Result<u32, Error> {
        self.timestamp = timestamp;
        let mut index = 0;
        while let Some(session) = self.sessions.get(index) {
            let kind = if session.switch_timer.expired(timestamp) {
                TimeoutKind::GenericSwitch
            } else if session.report_timer.expired(timestamp) {
                TimeoutKind::MultiSensor
            } else {
                index += 1;
                continue;
            };
            let address = session.address;
            log::info!("Commissioning timeout {:?} for {:?}", kind, address);
            if let Some(session) = self.sessions.get_mut(index) {
                session.partial_reset();
            }
            let endpoints = self.commissioning_endpoints();
            self.hooks.commissioning_timeout(kind, &endpoints);
            self.sessions.free(index);
        }
        if self.window_timer.expired(timestamp) {
            log::info!("Commissioning window expired");
            let endpoints = self.commissioning_endpoints();
            self.exit_commissioning_mode()?;
            self.hooks
                .commissioning_timeout(TimeoutKind::CommissioningWindow, &endpoints);
        }
        Ok(self.next_timeout())
    }

    /// Enter or leave commissioning mode on request of the application
    /// ### Parameters
    /// `endpoint` is the application endpoint to commission, 0xff for all
    pub fn commissioning_mode(
        &mut self,
        enter: bool,
        endpoint: u8,
        involve_proxies: bool,
        timestamp: u32,
    ) -> Result<u32, Error> {
        self.timestamp = timestamp;
        if endpoint != ALL_ENDPOINTS && !self.config.is_sink_endpoint(endpoint) {
            log::warn!("Commissioning mode for unknown endpoint {}", endpoint);
            return Err(Error::NotFound);
        }
        if enter {
            self.enter_commissioning_mode(endpoint, involve_proxies)?;
        } else {
            self.exit_commissioning_mode()?;
        }
        Ok(self.next_timeout())
    }

    /// Restart the commissioning window while in commissioning mode
    pub fn extend_commissioning_window(&mut self, timestamp: u32) -> Result<u32, Error> {
        self.timestamp = timestamp;
        if self.in_commissioning_mode {
            let window = self.commissioning_window();
            log::info!("Extend commissioning window, {} s", window);
            self.window_timer.arm_seconds(timestamp, window);
            if self.proxies_involved {
                self.send_proxy_commissioning_mode(true)?;
            }
        }
        Ok(self.next_timeout())
    }

    /// Remove a paired GPD, as if it had sent a decommissioning command
    pub fn remove_gpd(&mut self, address: &GpdAddress, timestamp: u32) -> Result<u32, Error> {
        self.timestamp = timestamp;
        self.decommission(address)?;
        Ok(self.next_timeout())
    }

    /// Write the sink and translation tables to `storage`
    pub fn save_tables<S: PersistentStorage>(&self, storage: &mut S) -> Result<(), Error> {
        self.sink_table.save(storage)?;
        self.translations.save(storage)
    }

    /// Read the sink and translation tables from `storage`, returns the
    /// number of restored sink table entries
    pub fn restore_tables<S: PersistentStorage>(&mut self, storage: &mut S) -> Result<usize, Error> {
        let paired = self.sink_table.restore(storage)?;
        let rows = self.translations.restore(storage)?;
        log::info!("Restored {} GPDs and {} translations", paired, rows);
        Ok(paired)
    }

    /// Forget every pairing
    pub fn clear_tables(&mut self) {
        self.sink_table.clear_all();
        self.translations.clear();
        self.sessions.reset_all();
    }

    fn next_timeout(&self) -> u32 {
        timer::next_timeout([
            self.sessions.remaining(self.timestamp),
            self.window_timer.remaining(self.timestamp),
        ])
    }

    /// Sink table slots a new session may claim, a GPD that is already
    /// paired reuses its own slot
    fn available_slots(&self, address: &GpdAddress) -> usize {
        self.sink_table.free_slots() + self.sink_table.lookup(address).is_some() as usize
    }

    /// The endpoints being commissioned
    fn commissioning_endpoints(&self) -> Vec<u8> {
        if self.commissioning_endpoint == ALL_ENDPOINTS {
            self.config.sink_endpoints().collect()
        } else {
            vec![self.commissioning_endpoint]
        }
    }

    fn next_zcl_sequence(&mut self) -> u8 {
        let sequence = self.zcl_sequence;
        self.zcl_sequence = sequence.wrapping_add(1);
        sequence
    }

    fn next_zdp_sequence(&mut self) -> u8 {
        let sequence = self.zdp_sequence;
        self.zdp_sequence = sequence.wrapping_add(1);
        sequence
    }

    /// Push a message onto the queue
    fn queue_message(&mut self, header: &MessageHeader, payload: &[u8]) -> Result<(), Error> {
        let mut buffer = [0u8; PACKET_BUFFER_MAX];
        let header_length = header.pack(&mut buffer[RECORD_LENGTH_SIZE..])?;
        let length = header_length + payload.len();
        if RECORD_LENGTH_SIZE + length > PACKET_BUFFER_MAX {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut buffer[..RECORD_LENGTH_SIZE], length as u16);
        let start = RECORD_LENGTH_SIZE + header_length;
        buffer[start..start + payload.len()].copy_from_slice(payload);
        let grant_size = RECORD_LENGTH_SIZE + length;
        match self.tx_queue.grant_exact(grant_size) {
            Ok(mut grant) => {
                grant.copy_from_slice(&buffer[..grant_size]);
                grant.commit(grant_size);
                Ok(())
            }
            Err(_) => Err(Error::NotEnoughSpace),
        }
    }

    /// Queue a Green Power cluster command from the sink
    fn send_gp_command<T>(
        &mut self,
        destination: Destination,
        sequence: Option<u8>,
        command: u8,
        frame: &T,
    ) -> Result<(), Error>
    where
        T: Pack<T, psila_gp_data::Error>,
    {
        self.send_gp_frame(Direction::ServerToClient, destination, sequence, command, frame)
    }

    /// Queue a Green Power cluster frame, client commands are used when the
    /// sink informs other sinks
    fn send_gp_frame<T>(
        &mut self,
        direction: Direction,
        destination: Destination,
        sequence: Option<u8>,
        command: u8,
        frame: &T,
    ) -> Result<(), Error>
    where
        T: Pack<T, psila_gp_data::Error>,
    {
        let sequence = match sequence {
            Some(sequence) => sequence,
            None => self.next_zcl_sequence(),
        };
        let header = ClusterLibraryHeader::cluster_specific(direction, sequence, command);
        let mut payload = [0u8; PACKET_BUFFER_MAX];
        let mut used = header.pack(&mut payload)?;
        used += frame.pack(&mut payload[used..])?;
        let message = MessageHeader {
            destination,
            profile: GREEN_POWER_PROFILE,
            cluster: cluster::GREEN_POWER,
            source_endpoint: GREEN_POWER_ENDPOINT,
            destination_endpoint: GREEN_POWER_ENDPOINT,
            alias: None,
            radius: 0,
        };
        self.queue_message(&message, &payload[..used])?;
        log::info!("< Queued GP command {:02x} to {:?}, {} octets", command, destination, used);
        Ok(())
    }

    /// Announce the alias of a GPD
    fn send_device_announce(&mut self, alias: ShortAddress) -> Result<(), Error> {
        let sequence = self.next_zdp_sequence();
        let announce = DeviceAnnounce::for_alias(sequence, alias);
        let mut payload = [0u8; PACKET_BUFFER_MAX];
        let used = announce.pack(&mut payload)?;
        let message = MessageHeader {
            destination: Destination::Short(ShortAddress::rx_on_when_idle()),
            profile: DEVICE_PROFILE,
            cluster: DEVICE_ANNOUNCE,
            source_endpoint: 0,
            destination_endpoint: 0,
            alias: Some(alias),
            radius: 0,
        };
        self.queue_message(&message, &payload[..used])?;
        log::info!("< Queued device announce for {:04x}", u16::from(alias));
        Ok(())
    }
}
