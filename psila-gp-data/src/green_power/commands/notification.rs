use core::convert::TryFrom;

use crate::pack::{Pack, Reader, Writer};
use crate::utils::{field, flag};
use crate::{ApplicationIdentifier, Error, GpdAddress, SecurityKeyType, SecurityLevel};

use super::{application_id, gpd_payload, GpdPayload, ProxyInfo};

const ALSO_UNICAST: u32 = 0x0008;
const ALSO_DERIVED_GROUP: u32 = 0x0010;
const ALSO_COMMISSIONED_GROUP: u32 = 0x0020;
const SECURITY_LEVEL_MASK: u32 = 0x00c0;
const SECURITY_LEVEL_OFFSET: u32 = 6;
const KEY_TYPE_MASK: u32 = 0x0700;
const KEY_TYPE_OFFSET: u32 = 8;
const RX_AFTER_TX: u32 = 0x0800;
const TX_QUEUE_FULL: u32 = 0x1000;
const BIDIRECTIONAL_CAPABILITY: u32 = 0x2000;
const PROXY_INFO_PRESENT: u32 = 0x4000;

/// GP Notification options
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NotificationOptions {
    /// GPD addressing mode
    pub application_id: ApplicationIdentifier,
    /// Also forwarded as unicast
    pub also_unicast: bool,
    /// Also forwarded to the derived group
    pub also_derived_group: bool,
    /// Also forwarded to the commissioned group
    pub also_commissioned_group: bool,
    /// Security level of the GPDF
    pub security_level: SecurityLevel,
    /// Key type used for the GPDF
    pub key_type: SecurityKeyType,
    /// The GPD will receive after transmission
    pub rx_after_tx: bool,
    /// The proxy transmit queue for the GPD is full
    pub tx_queue_full: bool,
    /// The proxy is capable of bidirectional operation
    pub bidirectional_capability: bool,
    /// Proxy information is included
    pub proxy_info_present: bool,
}

impl TryFrom<u16> for NotificationOptions {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self, Error> {
        let value = value as u32;
        Ok(Self {
            application_id: application_id(value)?,
            also_unicast: flag(value, ALSO_UNICAST),
            also_derived_group: flag(value, ALSO_DERIVED_GROUP),
            also_commissioned_group: flag(value, ALSO_COMMISSIONED_GROUP),
            security_level: SecurityLevel::try_from(field(
                value,
                SECURITY_LEVEL_MASK,
                SECURITY_LEVEL_OFFSET,
            ))?,
            key_type: SecurityKeyType::try_from(field(value, KEY_TYPE_MASK, KEY_TYPE_OFFSET))?,
            rx_after_tx: flag(value, RX_AFTER_TX),
            tx_queue_full: flag(value, TX_QUEUE_FULL),
            bidirectional_capability: flag(value, BIDIRECTIONAL_CAPABILITY),
            proxy_info_present: flag(value, PROXY_INFO_PRESENT),
        })
    }
}

impl From<NotificationOptions> for u16 {
    fn from(options: NotificationOptions) -> u16 {
        let mut value = u8::from(options.application_id) as u32;
        value |= (u8::from(options.security_level) as u32) << SECURITY_LEVEL_OFFSET;
        value |= (u8::from(options.key_type) as u32) << KEY_TYPE_OFFSET;
        for (set, bit) in [
            (options.also_unicast, ALSO_UNICAST),
            (options.also_derived_group, ALSO_DERIVED_GROUP),
            (options.also_commissioned_group, ALSO_COMMISSIONED_GROUP),
            (options.rx_after_tx, RX_AFTER_TX),
            (options.tx_queue_full, TX_QUEUE_FULL),
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

/// GP Notification
///
/// A operational GPD command forwarded by a proxy
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    /// Options
    pub options: NotificationOptions,
    /// GPD address
    pub address: GpdAddress,
    /// GPD security frame counter
    pub frame_counter: u32,
    /// GPD command identifier
    pub command: u8,
    /// GPD command payload
    pub payload: GpdPayload,
    /// Proxy that received the GPDF
    pub proxy: Option<ProxyInfo>,
}

impl Pack<Notification, Error> for Notification {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut options = self.options;
        options.application_id = self.address.application_id();
        options.proxy_info_present = self.proxy.is_some();
        let mut writer = Writer::new(data);
        writer.write_u16(u16::from(options))?;
        self.address.write(&mut writer)?;
        writer.write_u32(self.frame_counter)?;
        writer.write_u8(self.command)?;
        writer.write_octet_string(&self.payload)?;
        if let Some(proxy) = self.proxy {
            proxy.write(&mut writer)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = NotificationOptions::try_from(reader.read_u16()?)?;
        let address = GpdAddress::read(&mut reader, options.application_id)?;
        let frame_counter = reader.read_u32()?;
        let command = reader.read_u8()?;
        let payload = gpd_payload(reader.read_octet_string()?)?;
        let proxy = if options.proxy_info_present {
            Some(ProxyInfo::read(&mut reader)?)
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
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtendedAddress;

    #[test]
    fn unpack_notification() {
        // Toggle from source id 0x0155f47a, security level 2 with a
        // individual key, proxy 0x1234
        let data = [
            0x80, 0x44, 0x7a, 0xf4, 0x55, 0x01, 0x12, 0x00, 0x00, 0x00, 0x22, 0x00, 0x34, 0x12,
            0xd5,
        ];
        let (notification, used) = Notification::unpack(&data[..]).unwrap();
        assert_eq!(used, data.len());
        assert_eq!(
            notification.options.application_id,
            ApplicationIdentifier::SourceId
        );
        assert_eq!(
            notification.options.security_level,
            SecurityLevel::FrameCounterMic
        );
        assert_eq!(notification.options.key_type, SecurityKeyType::IndividualKey);
        assert!(notification.options.proxy_info_present);
        assert!(!notification.options.rx_after_tx);
        assert_eq!(notification.address, GpdAddress::SourceId(0x0155_f47a));
        assert_eq!(notification.frame_counter, 0x12);
        assert_eq!(notification.command, 0x22);
        assert!(notification.payload.is_empty());
        let proxy = notification.proxy.unwrap();
        assert_eq!(proxy.short_address, 0x1234);
        assert_eq!(proxy.lqi(), 3);
    }

    #[test]
    fn pack_ieee_notification() {
        let notification = Notification {
            options: NotificationOptions::try_from(0x0002).unwrap(),
            address: GpdAddress::Ieee(ExtendedAddress::new(0x0011_2233_4455_6677), 0x01),
            frame_counter: 0x0102_0304,
            command: 0xa0,
            payload: gpd_payload(&[0x02, 0x04, 0x00, 0x00, 0x29, 0x34, 0x12]).unwrap(),
            proxy: None,
        };
        let mut data = [0u8; 64];
        let used = notification.pack(&mut data).unwrap();
        assert_eq!(
            data[..used],
            [
                0x02, 0x00, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11, 0x00, 0x01, 0x04, 0x03, 0x02,
                0x01, 0xa0, 0x07, 0x02, 0x04, 0x00, 0x00, 0x29, 0x34, 0x12
            ]
        );
        let (unpacked, _) = Notification::unpack(&data[..used]).unwrap();
        assert_eq!(unpacked, notification);
    }

    #[test]
    fn truncated_notification() {
        let data = [0x00, 0x00, 0x7a, 0xf4, 0x55, 0x01, 0x12, 0x00, 0x00, 0x00, 0x22, 0x02, 0x01];
        assert_eq!(
            Notification::unpack(&data[..]),
            Err(Error::WrongNumberOfBytes)
        );
        let data = [0x01, 0x00, 0x7a, 0xf4, 0x55, 0x01];
        assert_eq!(
            Notification::unpack(&data[..]),
            Err(Error::UnknownApplicationIdentifier)
        );
    }
}
