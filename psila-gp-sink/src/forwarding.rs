//! # Forwarding
//!
//! GP Notifications from the GPDs. For a paired GPD the security frame
//! counter is checked against the sink table before the GPD command is
//! translated into ZCL commands for the application endpoints.

use bbqueue::ArrayLength;
use byteorder::{ByteOrder, LittleEndian};

use psila_crypto::CryptoBackend;
use psila_gp_data::cluster_library::{
    attribute_size, cluster, ClusterLibraryHeader, Direction, GENERAL_REPORT_ATTRIBUTES,
};
use psila_gp_data::green_power::commands::Notification;
use psila_gp_data::green_power::{gpd_command, Functionality, GREEN_POWER_ENDPOINT};
use psila_gp_data::pack::Pack;
use psila_gp_data::{GpdAddress, SecurityLevel, ShortAddress};

use crate::hooks::SinkHooks;
use crate::message::{Destination, MessageHeader};
use crate::translation::{build_payload, AdditionalInfo, ScanKey, ScanLevel, TranslationEntry};
use crate::{Error, GreenPowerSink, PACKET_BUFFER_MAX};

// Cluster, attribute identifier and data type of a multi-cluster record
const RECORD_HEADER_SIZE: usize = 5;

impl<'a, N: ArrayLength<u8>, CB, H> GreenPowerSink<'a, N, CB, H>
where
    CB: CryptoBackend,
    H: SinkHooks,
{
    /// GP Notification from a proxy
    pub(crate) fn handle_notification(&mut self, payload: &[u8]) -> Result<(), Error> {
        let notification = match Notification::unpack(payload) {
            Ok((notification, _)) => notification,
            Err(error) => {
                log::warn!("Failed to parse GP Notification, {:?}", error);
                return Ok(());
            }
        };
        let address = notification.address;
        log::info!(
            "> GP Notification {:?} command {:02x} counter {}",
            address,
            notification.command,
            notification.frame_counter
        );
        match self.sink_table.lookup(&address) {
            Some(slot) => {
                if !self.check_security(slot, &notification)? {
                    self.hooks.security_failure(&address);
                    return Ok(());
                }
            }
            None => log::debug!("Notification from unpaired {:?}", address),
        }
        match notification.command {
            gpd_command::DECOMMISSIONING => self.decommission(&address),
            gpd_command::CHANNEL_REQUEST => self.channel_request(
                &address,
                notification.options.rx_after_tx,
                notification.proxy,
                &notification.payload,
            ),
            _ => {
                if self.hooks.forward_notification(&notification) {
                    return Ok(());
                }
                if self
                    .config
                    .functionality()
                    .contains(Functionality::TRANSLATION_TABLE)
                {
                    self.forward(&address, notification.command, &notification.payload)
                } else {
                    self.forward_default(&address, notification.command, &notification.payload)
                }
            }
        }
    }

    /// Compare the frame security with the sink table entry, the stored
    /// frame counter is updated when the frame is accepted
    fn check_security(&mut self, slot: usize, notification: &Notification) -> Result<bool, Error> {
        let entry = match self.sink_table.get(slot) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        let security = match entry.security {
            Some(security) if security.level != SecurityLevel::None => security,
            _ => return Ok(true),
        };
        let options = &notification.options;
        if u8::from(options.security_level) < u8::from(security.level) {
            log::warn!(
                "Security level {:?} below {:?} for {:?}",
                options.security_level,
                security.level,
                notification.address
            );
            return Ok(false);
        }
        if options.key_type != security.key_type {
            log::warn!(
                "Key type {:?} instead of {:?} for {:?}",
                options.key_type,
                security.key_type,
                notification.address
            );
            return Ok(false);
        }
        if notification.frame_counter <= entry.frame_counter {
            log::warn!(
                "Frame counter {} not above {} for {:?}",
                notification.frame_counter,
                entry.frame_counter,
                notification.address
            );
            return Ok(false);
        }
        self.sink_table
            .set_security_frame_counter(slot, notification.frame_counter)?;
        Ok(true)
    }

    /// Forward through the translation table
    fn forward(&mut self, address: &GpdAddress, command: u8, payload: &[u8]) -> Result<(), Error> {
        match command {
            gpd_command::ATTRIBUTE_REPORTING | gpd_command::MANUFACTURER_ATTRIBUTE_REPORTING => {
                self.forward_attribute_report(address, command, payload)
            }
            gpd_command::MULTI_CLUSTER_REPORTING
            | gpd_command::MANUFACTURER_MULTI_CLUSTER_REPORTING => {
                self.forward_multi_cluster_report(address, command, payload)
            }
            gpd_command::COMPACT_ATTRIBUTE_REPORTING => {
                self.forward_compact_report(address, payload)
            }
            _ => {
                let key = ScanKey::command(*address, command);
                let rows: Vec<TranslationEntry> = self
                    .translations
                    .find_all(ScanLevel::GPD_ID | ScanLevel::COMMAND, &key)
                    .filter(|row| row.info.accepts(payload))
                    .cloned()
                    .collect();
                if rows.is_empty() {
                    log::debug!("No translation for {:02x} from {:?}", command, address);
                }
                for row in rows.iter() {
                    self.forward_command(row, command, payload)?;
                }
                Ok(())
            }
        }
    }

    /// Forward using the default translations to every endpoint with the
    /// server cluster
    fn forward_default(
        &mut self,
        address: &GpdAddress,
        command: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let rows: Vec<TranslationEntry> = self
            .config
            .endpoints
            .iter()
            .filter_map(|endpoint| TranslationEntry::from_default(*address, command, endpoint.endpoint))
            .filter(|row| row.cluster != cluster::RESERVED)
            .filter(|row| {
                self.config
                    .endpoint_contains_cluster(row.endpoint, row.cluster, true)
            })
            .collect();
        if rows.is_empty() {
            log::debug!("No default translation for {:02x}", command);
        }
        for row in rows.iter() {
            self.forward_command(row, command, payload)?;
        }
        Ok(())
    }

    fn forward_command(
        &mut self,
        row: &TranslationEntry,
        command: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let mut data = [0u8; PACKET_BUFFER_MAX];
        let used = match build_payload(&row.payload, command, payload, &mut data) {
            Ok(used) => used,
            Err(error) => {
                log::warn!("Failed to translate {:02x}, {:?}", command, error);
                return Ok(());
            }
        };
        let direction = row_direction(row);
        let header = if row.zcl_command == GENERAL_REPORT_ATTRIBUTES {
            ClusterLibraryHeader::global(direction, None, self.next_zcl_sequence(), row.zcl_command)
        } else {
            ClusterLibraryHeader::cluster_specific(direction, self.next_zcl_sequence(), row.zcl_command)
        };
        self.send_translated(row, row.cluster, &header, &data[..used])
    }

    /// Attribute reporting, the records follow the optional manufacturer code
    /// and the cluster identifier
    fn forward_attribute_report(
        &mut self,
        address: &GpdAddress,
        command: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let manufacturer = command == gpd_command::MANUFACTURER_ATTRIBUTE_REPORTING;
        let offset = if manufacturer { 2 } else { 0 };
        if payload.len() < offset + 2 {
            log::warn!("Short attribute report from {:?}", address);
            return Ok(());
        }
        let manufacturer = if manufacturer {
            Some(LittleEndian::read_u16(&payload[..2]))
        } else {
            None
        };
        let cluster = LittleEndian::read_u16(&payload[offset..offset + 2]);
        let records = &payload[offset + 2..];
        for row in self.report_rows(address, command, cluster).iter() {
            self.send_report(row, cluster, manufacturer, records)?;
        }
        Ok(())
    }

    /// Multi-cluster reporting, each record carries its own cluster and is
    /// forwarded separately
    fn forward_multi_cluster_report(
        &mut self,
        address: &GpdAddress,
        command: u8,
        payload: &[u8],
    ) -> Result<(), Error> {
        let mut offset = 0;
        let manufacturer = if command == gpd_command::MANUFACTURER_MULTI_CLUSTER_REPORTING {
            if payload.len() < 2 {
                log::warn!("Short multi-cluster report from {:?}", address);
                return Ok(());
            }
            offset = 2;
            Some(LittleEndian::read_u16(&payload[..2]))
        } else {
            None
        };
        while offset < payload.len() {
            if payload.len() < offset + RECORD_HEADER_SIZE {
                log::warn!("Truncated report record from {:?}", address);
                break;
            }
            let cluster = LittleEndian::read_u16(&payload[offset..offset + 2]);
            let data_type = payload[offset + 4];
            let size = match attribute_size(data_type) {
                Some(size) => size,
                None => {
                    log::warn!("Unsupported data type {:02x} from {:?}", data_type, address);
                    break;
                }
            };
            let end = offset + RECORD_HEADER_SIZE + size;
            if end > payload.len() {
                log::warn!("Truncated report record from {:?}", address);
                break;
            }
            let record = &payload[offset + 2..end];
            for row in self.report_rows(address, command, cluster).iter() {
                self.send_report(row, cluster, manufacturer, record)?;
            }
            offset = end;
        }
        Ok(())
    }

    /// Compact attribute reporting, the values are located by the report
    /// descriptors collected during commissioning
    fn forward_compact_report(&mut self, address: &GpdAddress, payload: &[u8]) -> Result<(), Error> {
        let key = ScanKey::command(*address, gpd_command::COMPACT_ATTRIBUTE_REPORTING);
        let rows: Vec<TranslationEntry> = self
            .translations
            .find_all(ScanLevel::GPD_ID | ScanLevel::COMMAND, &key)
            .filter(|row| row.info.accepts(payload))
            .cloned()
            .collect();
        if rows.is_empty() {
            log::debug!("No report descriptor for {:?} in {:02x?}", address, payload.first());
        }
        for row in rows.iter() {
            if let AdditionalInfo::CompactAttributeReport {
                offset,
                cluster,
                attribute,
                data_type,
                ..
            } = row.info
            {
                let size = match attribute_size(data_type) {
                    Some(size) => size,
                    None => continue,
                };
                // Offsets count from the octet after the report identifier
                let start = 1 + offset as usize;
                if start + size > payload.len() {
                    log::warn!("Compact report from {:?} too short", address);
                    continue;
                }
                let mut record = [0u8; 3 + 16];
                if size > record.len() - 3 {
                    continue;
                }
                LittleEndian::write_u16(&mut record[..2], attribute);
                record[2] = data_type;
                record[3..3 + size].copy_from_slice(&payload[start..start + size]);
                self.send_report(row, cluster, None, &record[..3 + size])?;
            }
        }
        Ok(())
    }

    /// Rows for reports of `cluster`, sensor rows cover all the reporting
    /// commands
    fn report_rows(&self, address: &GpdAddress, command: u8, cluster: u16) -> Vec<TranslationEntry> {
        let mut rows = Vec::new();
        for scan in [command, gpd_command::ANY_SENSOR_COMMAND].iter() {
            let key = ScanKey::command(*address, *scan);
            rows.extend(
                self.translations
                    .find_all(ScanLevel::GPD_ID | ScanLevel::COMMAND, &key)
                    .filter(|row| row.cluster == cluster || row.cluster == cluster::RESERVED)
                    .cloned(),
            );
        }
        if rows.is_empty() {
            log::debug!("No translation for cluster {:04x} from {:?}", cluster, address);
        }
        rows
    }

    fn send_report(
        &mut self,
        row: &TranslationEntry,
        cluster: u16,
        manufacturer: Option<u16>,
        records: &[u8],
    ) -> Result<(), Error> {
        let header = ClusterLibraryHeader::global(
            row_direction(row),
            manufacturer,
            self.next_zcl_sequence(),
            GENERAL_REPORT_ATTRIBUTES,
        );
        self.send_translated(row, cluster, &header, records)
    }

    fn send_translated(
        &mut self,
        row: &TranslationEntry,
        cluster: u16,
        header: &ClusterLibraryHeader,
        payload: &[u8],
    ) -> Result<(), Error> {
        let mut data = [0u8; PACKET_BUFFER_MAX];
        let used = header.pack(&mut data)?;
        let length = used + payload.len();
        if length > data.len() {
            return Err(Error::NotEnoughSpace);
        }
        data[used..length].copy_from_slice(payload);
        let message = MessageHeader {
            destination: Destination::Short(ShortAddress::new(self.config.node_address)),
            profile: row.profile,
            cluster,
            source_endpoint: GREEN_POWER_ENDPOINT,
            destination_endpoint: row.endpoint,
            alias: None,
            radius: 0,
        };
        log::info!(
            "< Forward {:02x} as {:04x}/{:02x} to endpoint {}",
            row.gpd_command,
            cluster,
            header.command,
            row.endpoint
        );
        self.queue_message(&message, &data[..length])
    }
}

/// Commands for a server cluster of the sink are client to server, reports
/// to a client cluster are server to client
fn row_direction(row: &TranslationEntry) -> Direction {
    if row.server {
        Direction::ClientToServer
    } else {
        Direction::ServerToClient
    }
}
