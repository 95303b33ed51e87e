//! # Outgoing messages
//!
//! Every message the sink queues is a transmit record, a two octet length
//! followed by a `MessageHeader` and the ZCL or ZDP payload. The header
//! carries what the network layer needs to deliver the payload.

use byteorder::{ByteOrder, LittleEndian};

use psila_gp_data::pack::{Pack, Reader, Writer};
use psila_gp_data::{GroupIdentifier, ShortAddress};

use crate::Error;

const GROUP_DESTINATION: u8 = 0x01;
const ALIAS_PRESENT: u8 = 0x02;

/// Size of the record length field
pub const RECORD_LENGTH_SIZE: usize = 2;

/// Destination of a message
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Destination {
    /// Unicast or broadcast to a short address
    Short(ShortAddress),
    /// Groupcast
    Group(GroupIdentifier),
}

/// Delivery information for a queued message
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MessageHeader {
    /// Destination
    pub destination: Destination,
    /// Profile identifier
    pub profile: u16,
    /// Cluster identifier
    pub cluster: u16,
    /// Source endpoint
    pub source_endpoint: u8,
    /// Destination endpoint
    pub destination_endpoint: u8,
    /// Source address to use instead of the sink address
    pub alias: Option<ShortAddress>,
    /// Radius, zero for the network default
    pub radius: u8,
}

impl Pack<MessageHeader, psila_gp_data::Error> for MessageHeader {
    fn pack(&self, data: &mut [u8]) -> Result<usize, psila_gp_data::Error> {
        let mut writer = Writer::new(data);
        let mut control = if self.alias.is_some() { ALIAS_PRESENT } else { 0 };
        let destination = match self.destination {
            Destination::Short(address) => address,
            Destination::Group(group) => {
                control |= GROUP_DESTINATION;
                group
            }
        };
        writer.write_u8(control)?;
        writer.write_u16(u16::from(destination))?;
        writer.write_u16(self.profile)?;
        writer.write_u16(self.cluster)?;
        writer.write_u8(self.source_endpoint)?;
        writer.write_u8(self.destination_endpoint)?;
        if let Some(alias) = self.alias {
            writer.write_u16(u16::from(alias))?;
        }
        writer.write_u8(self.radius)?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), psila_gp_data::Error> {
        let mut reader = Reader::new(data);
        let control = reader.read_u8()?;
        let address = ShortAddress::new(reader.read_u16()?);
        let destination = if control & GROUP_DESTINATION == GROUP_DESTINATION {
            Destination::Group(address)
        } else {
            Destination::Short(address)
        };
        let profile = reader.read_u16()?;
        let cluster = reader.read_u16()?;
        let source_endpoint = reader.read_u8()?;
        let destination_endpoint = reader.read_u8()?;
        let alias = if control & ALIAS_PRESENT == ALIAS_PRESENT {
            Some(ShortAddress::new(reader.read_u16()?))
        } else {
            None
        };
        let radius = reader.read_u8()?;
        Ok((
            Self {
                destination,
                profile,
                cluster,
                source_endpoint,
                destination_endpoint,
                alias,
                radius,
            },
            reader.offset(),
        ))
    }
}

/// A message read back from a transmit record
#[derive(Clone, Debug, PartialEq)]
pub struct Message<'a> {
    /// Delivery information
    pub header: MessageHeader,
    /// ZCL or ZDP payload
    pub payload: &'a [u8],
}

impl<'a> Message<'a> {
    /// Decode the transmit record at the start of `record`, returns the
    /// message and the size of the record
    pub fn from_record(record: &'a [u8]) -> Result<(Self, usize), Error> {
        if record.len() < RECORD_LENGTH_SIZE {
            return Err(Error::MalformedPacket);
        }
        let length = LittleEndian::read_u16(&record[..RECORD_LENGTH_SIZE]) as usize;
        let end = RECORD_LENGTH_SIZE + length;
        if record.len() < end {
            return Err(Error::MalformedPacket);
        }
        let data = &record[RECORD_LENGTH_SIZE..end];
        let (header, used) = MessageHeader::unpack(data)?;
        Ok((
            Self {
                header,
                payload: &data[used..],
            },
            end,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_broadcast_header() {
        let header = MessageHeader {
            destination: Destination::Short(ShortAddress::rx_on_when_idle()),
            profile: 0xa1e0,
            cluster: 0x0021,
            source_endpoint: 242,
            destination_endpoint: 242,
            alias: None,
            radius: 0,
        };
        let mut data = [0u8; 16];
        let used = header.pack(&mut data).unwrap();
        assert_eq!(used, 10);
        assert_eq!(
            data[..used],
            [0x00, 0xfd, 0xff, 0xe0, 0xa1, 0x21, 0x00, 0xf2, 0xf2, 0x00]
        );
        let (unpacked, used) = MessageHeader::unpack(&data[..used]).unwrap();
        assert_eq!(used, 10);
        assert_eq!(unpacked, header);
    }

    #[test]
    fn group_header_with_alias() {
        let header = MessageHeader {
            destination: Destination::Group(ShortAddress::new(0x5678)),
            profile: 0x0104,
            cluster: 0x0006,
            source_endpoint: 242,
            destination_endpoint: 0xff,
            alias: Some(ShortAddress::new(0x5678)),
            radius: 5,
        };
        let mut data = [0u8; 12];
        assert_eq!(header.pack(&mut data).unwrap(), 12);
        assert_eq!(data[0], 0x03);
        assert_eq!(&data[9..], [0x78, 0x56, 0x05]);
        let mut short = [0u8; 11];
        assert_eq!(
            header.pack(&mut short),
            Err(psila_gp_data::Error::NotEnoughSpace)
        );
    }

    #[test]
    fn read_record() {
        let record = [
            0x0d, 0x00, 0x00, 0x34, 0x12, 0x04, 0x01, 0x06, 0x00, 0xf2, 0x01, 0x00, 0x11, 0x2a,
            0x02, 0xff,
        ];
        let (message, used) = Message::from_record(&record).unwrap();
        assert_eq!(used, 15);
        assert_eq!(
            message.header.destination,
            Destination::Short(ShortAddress::new(0x1234))
        );
        assert_eq!(message.header.cluster, 0x0006);
        assert_eq!(message.payload, [0x11, 0x2a, 0x02]);
        assert_eq!(
            Message::from_record(&record[..10]),
            Err(Error::MalformedPacket)
        );
    }
}
