//! # Addresses used by the sink
//!
//! Network short and extended addresses and the address of a Green Power
//! device, which is either a 32-bit source identifier or an extended
//! address combined with an endpoint.

use core::convert::TryFrom;
use core::default::Default;
use core::fmt;

use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Short address size
pub const SHORT_ADDRESS_SIZE: usize = 2;
/// Short address, broadcast address
pub const SHORT_ADDRESS_BROADCAST: u16 = 0xffff;
/// Short address, broadcast to all devices with receiver on when idle
pub const SHORT_ADDRESS_RX_ON_WHEN_IDLE: u16 = 0xfffd;

/// 16-bit short address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortAddress(u16);

impl ShortAddress {
    /// Create a address from the raw value
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Broadcast address
    pub const fn broadcast() -> Self {
        Self(SHORT_ADDRESS_BROADCAST)
    }

    /// Broadcast address for devices with the receiver on when idle
    pub const fn rx_on_when_idle() -> Self {
        Self(SHORT_ADDRESS_RX_ON_WHEN_IDLE)
    }

    /// True for the broadcast range 0xfff8 - 0xffff
    pub fn is_broadcast(self) -> bool {
        self.0 >= 0xfff8
    }
}

impl PackFixed<ShortAddress, Error> for ShortAddress {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            LittleEndian::write_u16(data, self.0);
            Ok(())
        } else {
            Err(Error::NotEnoughSpace)
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            Ok(ShortAddress(LittleEndian::read_u16(data)))
        } else {
            Err(Error::WrongNumberOfBytes)
        }
    }
}

impl From<u16> for ShortAddress {
    fn from(value: u16) -> Self {
        ShortAddress(value)
    }
}

impl From<ShortAddress> for u16 {
    fn from(value: ShortAddress) -> Self {
        value.0
    }
}

impl PartialEq<u16> for ShortAddress {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl Default for ShortAddress {
    fn default() -> Self {
        Self::broadcast()
    }
}

impl fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// 16-bit personal area network (PAN) identifier
pub type PanIdentifier = ShortAddress;
/// 16-bit group identifier
pub type GroupIdentifier = ShortAddress;

/// Extended IEEE address size
pub const EXTENDED_ADDRESS_SIZE: usize = 8;
/// Extended IEEE address, broadcast address
pub const EXTENDED_ADDRESS_BROADCAST: u64 = 0xffff_ffff_ffff_ffffu64;

/// 64-bit extended IEEE address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct ExtendedAddress(u64);

impl ExtendedAddress {
    /// Create a address from the raw value
    pub const fn new(address: u64) -> Self {
        Self(address)
    }

    /// Broadcast address, all bits set
    pub const fn broadcast() -> Self {
        Self(EXTENDED_ADDRESS_BROADCAST)
    }

    /// True if all bits are set
    pub fn is_broadcast(self) -> bool {
        self.0 == EXTENDED_ADDRESS_BROADCAST
    }
}

impl PackFixed<ExtendedAddress, Error> for ExtendedAddress {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() == EXTENDED_ADDRESS_SIZE {
            LittleEndian::write_u64(data, self.0);
            Ok(())
        } else {
            Err(Error::NotEnoughSpace)
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() == EXTENDED_ADDRESS_SIZE {
            Ok(ExtendedAddress(LittleEndian::read_u64(data)))
        } else {
            Err(Error::WrongNumberOfBytes)
        }
    }
}

impl From<u64> for ExtendedAddress {
    fn from(value: u64) -> Self {
        ExtendedAddress(value)
    }
}

impl From<ExtendedAddress> for u64 {
    fn from(value: ExtendedAddress) -> Self {
        value.0
    }
}

impl PartialEq<u64> for ExtendedAddress {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ExtendedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bytes = [0u8; EXTENDED_ADDRESS_SIZE];
        LittleEndian::write_u64(&mut bytes, self.0);
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            bytes[7], bytes[6], bytes[5], bytes[4], bytes[3], bytes[2], bytes[1], bytes[0]
        )
    }
}

extended_enum!(
    /// GPD application identifier, selects the GPD addressing mode
    ApplicationIdentifier, u8,
    /// 32-bit source identifier
    SourceId => 0b000,
    /// Extended IEEE address and endpoint
    Ieee => 0b010,
);

/// Source identifier used as wildcard, "all GPDs"
pub const SOURCE_ID_WILDCARD: u32 = 0xffff_ffff;
/// Endpoint values matching any endpoint of a IEEE addressed GPD
pub const ENDPOINT_WILDCARD: [u8; 2] = [0x00, 0xff];

/// Green Power device address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GpdAddress {
    /// Source identifier addressing
    SourceId(u32),
    /// IEEE addressing with a endpoint
    Ieee(ExtendedAddress, u8),
}

impl GpdAddress {
    /// Application identifier for this address
    pub fn application_id(&self) -> ApplicationIdentifier {
        match self {
            GpdAddress::SourceId(_) => ApplicationIdentifier::SourceId,
            GpdAddress::Ieee(_, _) => ApplicationIdentifier::Ieee,
        }
    }

    /// Compare addresses, IEEE addresses with endpoint 0x00 or 0xff match
    /// any endpoint
    pub fn matches(&self, other: &GpdAddress) -> bool {
        match (self, other) {
            (GpdAddress::SourceId(a), GpdAddress::SourceId(b)) => a == b,
            (GpdAddress::Ieee(a, ea), GpdAddress::Ieee(b, eb)) => {
                a == b
                    && (ea == eb
                        || ENDPOINT_WILDCARD.contains(ea)
                        || ENDPOINT_WILDCARD.contains(eb))
            }
            _ => false,
        }
    }

    /// The zero address is not a valid GPD address
    pub fn is_zero(&self) -> bool {
        match self {
            GpdAddress::SourceId(id) => *id == 0,
            GpdAddress::Ieee(address, _) => *address == 0,
        }
    }

    /// Address used to select all GPDs of a application identifier
    pub fn is_wildcard(&self) -> bool {
        match self {
            GpdAddress::SourceId(id) => *id == SOURCE_ID_WILDCARD,
            GpdAddress::Ieee(address, _) => address.is_broadcast(),
        }
    }

    /// Alias derived from the GPD address
    ///
    /// The two least significant octets of the address. Values in the
    /// reserved ranges 0x0000 and 0xfff8 - 0xffff are moved out of them.
    pub fn alias(&self) -> ShortAddress {
        let (low, high) = match self {
            GpdAddress::SourceId(id) => (*id as u16, (*id >> 16) as u16),
            GpdAddress::Ieee(address, _) => {
                let value = u64::from(*address);
                (value as u16, (value >> 16) as u16)
            }
        };
        let mut alias = low;
        if alias == 0x0000 || alias >= 0xfff8 {
            alias ^= high;
        }
        if alias == 0x0000 {
            alias = 0x0007;
        } else if alias >= 0xfff8 {
            alias -= 0x0008;
        }
        ShortAddress::new(alias)
    }

    /// Read a address with the layout given by `application_id`
    pub fn read(reader: &mut Reader, application_id: ApplicationIdentifier) -> Result<Self, Error> {
        match application_id {
            ApplicationIdentifier::SourceId => Ok(GpdAddress::SourceId(reader.read_u32()?)),
            ApplicationIdentifier::Ieee => {
                let address = ExtendedAddress::new(reader.read_u64()?);
                let endpoint = reader.read_u8()?;
                Ok(GpdAddress::Ieee(address, endpoint))
            }
        }
    }

    /// Read a address where the IEEE form carries no endpoint
    pub fn read_without_endpoint(
        reader: &mut Reader,
        application_id: ApplicationIdentifier,
    ) -> Result<Self, Error> {
        match application_id {
            ApplicationIdentifier::SourceId => Ok(GpdAddress::SourceId(reader.read_u32()?)),
            ApplicationIdentifier::Ieee => Ok(GpdAddress::Ieee(
                ExtendedAddress::new(reader.read_u64()?),
                0,
            )),
        }
    }

    /// Write the address
    pub fn write(&self, writer: &mut Writer) -> Result<(), Error> {
        match self {
            GpdAddress::SourceId(id) => writer.write_u32(*id),
            GpdAddress::Ieee(address, endpoint) => {
                writer.write_u64(u64::from(*address))?;
                writer.write_u8(*endpoint)
            }
        }
    }

    /// Raw octets used as input for key derivation, the source identifier as
    /// four octets or the IEEE address as eight octets
    pub fn key_material(&self, output: &mut [u8; EXTENDED_ADDRESS_SIZE]) -> usize {
        match self {
            GpdAddress::SourceId(id) => {
                LittleEndian::write_u32(&mut output[..4], *id);
                4
            }
            GpdAddress::Ieee(address, _) => {
                LittleEndian::write_u64(&mut output[..], u64::from(*address));
                8
            }
        }
    }
}

impl Default for GpdAddress {
    fn default() -> Self {
        GpdAddress::SourceId(0)
    }
}

/// Packed as application identifier followed by the address
impl Pack<GpdAddress, Error> for GpdAddress {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.application_id()))?;
        self.write(&mut writer)?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let application_id = ApplicationIdentifier::try_from(reader.read_u8()? & 0x07)
            .map_err(|_| Error::UnknownApplicationIdentifier)?;
        let address = GpdAddress::read(&mut reader, application_id)?;
        Ok((address, reader.offset()))
    }
}

impl fmt::Display for GpdAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpdAddress::SourceId(id) => write!(f, "{:08x}", id),
            GpdAddress::Ieee(address, endpoint) => write!(f, "{}/{}", address, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address() {
        let a = ShortAddress::unpack(&[0x81, 0x45]).unwrap();
        assert_eq!(a, 0x4581);
        assert_eq!(format!("{}", a), "4581");
        let mut buf = [0; 2];
        a.pack(&mut buf).unwrap();
        assert_eq!(buf, [0x81, 0x45]);
        assert!(ShortAddress::rx_on_when_idle().is_broadcast());
        assert!(!a.is_broadcast());
    }

    #[test]
    fn extended_address() {
        let a = ExtendedAddress::unpack(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]).unwrap();
        assert_eq!(a, 0x0807_0605_0403_0201);
        assert_eq!(format!("{}", a), "08:07:06:05:04:03:02:01");
    }

    #[test]
    fn gpd_address_matching() {
        let ieee = ExtendedAddress::new(0x0011_2233_4455_6677);
        let a = GpdAddress::Ieee(ieee, 1);
        assert!(a.matches(&GpdAddress::Ieee(ieee, 1)));
        assert!(!a.matches(&GpdAddress::Ieee(ieee, 2)));
        assert!(a.matches(&GpdAddress::Ieee(ieee, 0x00)));
        assert!(a.matches(&GpdAddress::Ieee(ieee, 0xff)));
        assert!(GpdAddress::Ieee(ieee, 0xff).matches(&a));
        assert!(!a.matches(&GpdAddress::Ieee(ExtendedAddress::new(1), 1)));
        assert!(!a.matches(&GpdAddress::SourceId(0x4455_6677)));
        assert!(GpdAddress::SourceId(0x1234_5678).matches(&GpdAddress::SourceId(0x1234_5678)));
        assert!(!GpdAddress::SourceId(0x1234_5678).matches(&GpdAddress::SourceId(0x1234_5679)));
    }

    #[test]
    fn gpd_address_special_values() {
        assert!(GpdAddress::SourceId(0).is_zero());
        assert!(GpdAddress::Ieee(ExtendedAddress::new(0), 3).is_zero());
        assert!(GpdAddress::SourceId(0xffff_ffff).is_wildcard());
        assert!(GpdAddress::Ieee(ExtendedAddress::broadcast(), 0).is_wildcard());
        assert!(!GpdAddress::SourceId(0x1234).is_wildcard());
    }

    #[test]
    fn gpd_alias() {
        assert_eq!(GpdAddress::SourceId(0x1234_5678).alias(), 0x5678);
        assert_eq!(GpdAddress::SourceId(0x1234_0000).alias(), 0x1234);
        assert_eq!(GpdAddress::SourceId(0x0000_0000).alias(), 0x0007);
        assert_eq!(GpdAddress::SourceId(0xffff_fffa).alias(), 0x0005);
        assert_eq!(
            GpdAddress::Ieee(ExtendedAddress::new(0x0011_2233_4455_6677), 1).alias(),
            0x6677
        );
    }

    #[test]
    fn gpd_address_pack() {
        let mut buf = [0u8; 16];
        let used = GpdAddress::SourceId(0x1234_5678).pack(&mut buf).unwrap();
        assert_eq!(&buf[..used], [0x00, 0x78, 0x56, 0x34, 0x12]);
        let address = GpdAddress::Ieee(ExtendedAddress::new(0x0102_0304_0506_0708), 0x0a);
        let used = address.pack(&mut buf).unwrap();
        assert_eq!(used, 10);
        assert_eq!(
            &buf[..used],
            [0x02, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0x0a]
        );
        let (unpacked, used) = GpdAddress::unpack(&buf[..used]).unwrap();
        assert_eq!(used, 10);
        assert_eq!(unpacked, address);
        assert_eq!(
            GpdAddress::unpack(&[0x01, 0x00, 0x00, 0x00, 0x00]),
            Err(Error::UnknownApplicationIdentifier)
        );
    }
}
