//! # Green Power cluster commands
//!
//! The commands a sink receives from proxies and commissioning tools and the
//! commands it sends back. Every command is packed without the ZCL header.

use core::convert::TryFrom;

use crate::pack::{Reader, Writer};
use crate::utils::field;
use crate::{ApplicationIdentifier, Error, ShortAddress};

mod commissioning_notification;
mod notification;
mod pairing;
mod pairing_configuration;
mod proxy_commissioning_mode;
mod response;
mod sink_commissioning_mode;
mod sink_table;

pub use commissioning_notification::{CommissioningNotification, CommissioningNotificationOptions};
pub use notification::{Notification, NotificationOptions};
pub use pairing::{Pairing, PairingOptions, PairingTarget};
pub use pairing_configuration::{
    PairingConfiguration, PairingConfigurationAction, PairingConfigurationOptions,
    PairedEndpoints, ReportBlock, MAX_REPORT_DATA_SIZE, PAIRED_ENDPOINTS_ALL,
    PAIRED_ENDPOINTS_COMMISSIONING,
};
pub use proxy_commissioning_mode::{ExitMode, ProxyCommissioningMode};
pub use response::Response;
pub use sink_commissioning_mode::{SinkCommissioningMode, SinkCommissioningModeOptions};
pub use sink_table::{
    SinkTableRequest, SinkTableRequestType, SinkTableResponse, MAX_RESPONSE_ENTRIES,
};

/// Maximum size of a GPD command payload carried in a cluster command
pub const MAX_GPD_PAYLOAD_SIZE: usize = 96;

/// GPD command payload
pub type GpdPayload = heapless::Vec<u8, MAX_GPD_PAYLOAD_SIZE>;

/// Copy a GPD payload into a bounded buffer
pub fn gpd_payload(data: &[u8]) -> Result<GpdPayload, Error> {
    GpdPayload::from_slice(data).map_err(|_| Error::TooManyItems)
}

/// Decode the 3-bit application identifier in the low bits of a options
/// field
pub(crate) fn application_id(options: u32) -> Result<ApplicationIdentifier, Error> {
    ApplicationIdentifier::try_from(field(options, 0b111, 0))
        .map_err(|_| Error::UnknownApplicationIdentifier)
}

/// Information about the proxy that received a GPDF
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProxyInfo {
    /// Short address of the proxy
    pub short_address: ShortAddress,
    /// Link quality and RSSI as received by the proxy
    pub link: u8,
}

impl ProxyInfo {
    /// Received signal strength in dBm
    pub fn rssi(&self) -> i8 {
        let value = (self.link & 0x3f) as i16;
        let rssi = if value < 55 {
            -109 + 2 * value
        } else {
            (value - 55) * 2
        };
        rssi as i8
    }

    /// Link quality, 0 poor to 3 excellent
    pub fn lqi(&self) -> u8 {
        (self.link >> 6) & 0b11
    }

    pub(crate) fn read(reader: &mut Reader) -> Result<Self, Error> {
        let short_address = ShortAddress::new(reader.read_u16()?);
        let link = reader.read_u8()?;
        Ok(Self {
            short_address,
            link,
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) -> Result<(), Error> {
        writer.write_u16(u16::from(self.short_address))?;
        writer.write_u8(self.link)
    }
}
