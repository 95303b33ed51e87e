use core::convert::TryFrom;

use crate::pack::{Pack, Reader, Writer};
use crate::utils::{field, flag};
use crate::{ApplicationIdentifier, Error, GpdAddress, SecurityKeyType, SecurityLevel};

use super::{application_id, gpd_payload, GpdPayload, ProxyInfo};

const RX_AFTER_TX: u32 = 0x0008;
const SECURITY_LEVEL_MASK: u32 = 0x0030;
const SECURITY_LEVEL_OFFSET: u32 = 4;
const KEY_TYPE_MASK: u32 = 0x01c0;
const KEY_TYPE_OFFSET: u32 = 6;
const SECURITY_PROCESSING_FAILED: u32 = 0x0200;
const BIDIRECTIONAL_CAPABILITY: u32 = 0x0400;
const PROXY_INFO_PRESENT: u32 = 0x0800;

/// GP Commissioning Notification options
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommissioningNotificationOptions {
    /// GPD addressing mode
    pub application_id: ApplicationIdentifier,
    /// The GPD will receive after transmission
    pub rx_after_tx: bool,
    /// Security level of the GPDF
    pub security_level: SecurityLevel,
    /// Key type used for the GPDF
    pub key_type: SecurityKeyType,
    /// The proxy could not verify the GPDF, the MIC is appended
    pub security_processing_failed: bool,
    /// The proxy is capable of bidirectional operation
    pub bidirectional_capability: bool,
    /// Proxy information is included
    pub proxy_info_present: bool,
}

impl TryFrom<u16> for CommissioningNotificationOptions {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Error> {
        let value = value as u32;
        Ok(Self {
            application_id: application_id(value)?,
            rx_after_tx: flag(value, RX_AFTER_TX),
            security_level: SecurityLevel::try_from(field(
                value,
                SECURITY_LEVEL_MASK,
                SECURITY_LEVEL_OFFSET,
            ))?,
            key_type: SecurityKeyType::try_from(field(value, KEY_TYPE_MASK, KEY_TYPE_OFFSET))?,
            security_processing_failed: flag(value, SECURITY_PROCESSING_FAILED),
            bidirectional_capability: flag(value, BIDIRECTIONAL_CAPABILITY),
            proxy_info_present: flag(value, PROXY_INFO_PRESENT),
        })
    }
}

impl From<CommissioningNotificationOptions> for u16 {
    fn from(options: CommissioningNotificationOptions) -> u16 {
        let mut value = u8::from(options.application_id) as u32;
        value |= (u8::from(options.security_level) as u32) << SECURITY_LEVEL_OFFSET;
        value |= (u8::from(options.key_type) as u32) << KEY_TYPE_OFFSET;
        for (set, bit) in [
            (options.rx_after_tx, RX_AFTER_TX),
            (options.security_processing_failed, SECURITY_PROCESSING_FAILED),
            (options.bidirectional_capability, BIDIRECTIONAL_CAPABILITY),
            (options.proxy_info_present, PROXY_INFO_PRESENT),
        ] {
            if set {
                value |= bit;
            }
        }
        value as u16
    }
}

/// GP Commissioning Notification
///
/// A GPDF received by a proxy in commissioning mode. Carries commissioning,
/// application description, success and channel request frames as well as
/// operational commands sent while commissioning.
#[derive(Clone, Debug, PartialEq)]
pub struct CommissioningNotification {
    /// Options
    pub options: CommissioningNotificationOptions,
    /// GPD address
    pub address: GpdAddress,
    /// GPD security frame counter
    pub frame_counter: u32,
    /// GPD command identifier
    pub command: u8,
    /// GPD command payload, encrypted when security processing failed for
    /// a encrypted GPDF
    pub payload: GpdPayload,
    /// Proxy that received the GPDF
    pub proxy: Option<ProxyInfo>,
    /// GPDF message integrity code, present when security processing failed
    pub mic: Option<u32>,
}

impl Pack<CommissioningNotification, Error> for CommissioningNotification {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut options = self.options;
        options.application_id = self.address.application_id();
        options.proxy_info_present = self.proxy.is_some();
        options.security_processing_failed = self.mic.is_some();
        let mut writer = Writer::new(data);
        writer.write_u16(u16::from(options))?;
        self.address.write(&mut writer)?;
        writer.write_u32(self.frame_counter)?;
        writer.write_u8(self.command)?;
        writer.write_octet_string(&self.payload)?;
        if let Some(proxy) = self.proxy {
            proxy.write(&mut writer)?;
        }
        if let Some(mic) = self.mic {
            writer.write_u32(mic)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = CommissioningNotificationOptions::try_from(reader.read_u16()?)?;
        let address = GpdAddress::read(&mut reader, options.application_id)?;
        let frame_counter = reader.read_u32()?;
        let command = reader.read_u8()?;
        let payload = gpd_payload(reader.read_octet_string()?)?;
        let proxy = if options.proxy_info_present {
            Some(ProxyInfo::read(&mut reader)?)
        } else {
            None
        };
        let mic = if options.security_processing_failed {
            Some(reader.read_u32()?)
        } else {
            None
        };
        Ok((
            Self {
                options,
                address,
                frame_counter,
                command,
                payload,
                proxy,
                mic,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_commissioning_notification() {
        // Commissioning GPDF for a on/off switch, no security, rx after tx
        let data = [
            0x08, 0x08, 0x78, 0x56, 0x34, 0x12, 0x00, 0x00, 0x00, 0x00, 0xe0, 0x02, 0x02, 0x81,
            0x00, 0x00, 0xfc,
        ];
        let (notification, used) = CommissioningNotification::unpack(&data[..]).unwrap();
        assert_eq!(used, data.len());
        assert!(notification.options.rx_after_tx);
        assert!(notification.options.proxy_info_present);
        assert!(!notification.options.security_processing_failed);
        assert_eq!(notification.options.security_level, SecurityLevel::None);
        assert_eq!(notification.address, GpdAddress::SourceId(0x1234_5678));
        assert_eq!(notification.command, 0xe0);
        assert_eq!(notification.payload[..], [0x02, 0x81]);
        assert_eq!(notification.proxy.unwrap().short_address, 0x0000);
        assert_eq!(notification.mic, None);
    }

    #[test]
    fn security_processing_failed() {
        let notification = CommissioningNotification {
            options: CommissioningNotificationOptions::try_from(0x0120).unwrap(),
            address: GpdAddress::SourceId(0xaabb_ccdd),
            frame_counter: 5,
            command: 0x20,
            payload: GpdPayload::new(),
            proxy: None,
            mic: Some(0x1122_3344),
        };
        assert_eq!(
            notification.options.security_level,
            SecurityLevel::FrameCounterMic
        );
        assert_eq!(notification.options.key_type, SecurityKeyType::IndividualKey);
        let mut data = [0u8; 32];
        let used = notification.pack(&mut data).unwrap();
        assert_eq!(
            data[..used],
            [
                0x20, 0x03, 0xdd, 0xcc, 0xbb, 0xaa, 0x05, 0x00, 0x00, 0x00, 0x20, 0x00, 0x44,
                0x33, 0x22, 0x11
            ]
        );
        let (unpacked, used) = CommissioningNotification::unpack(&data[..used]).unwrap();
        assert_eq!(used, 16);
        assert!(unpacked.options.security_processing_failed);
        assert_eq!(unpacked.mic, Some(0x1122_3344));
        assert_eq!(
            CommissioningNotification::unpack(&data[..used - 1]),
            Err(Error::WrongNumberOfBytes)
        );
    }
}
