use core::convert::TryFrom;

use crate::green_power::SinkTableEntry;
use crate::pack::{Pack, Reader, Writer};
use crate::utils::field;
use crate::{Error, GpdAddress};

use super::application_id;

const REQUEST_TYPE_MASK: u32 = 0x18;
const REQUEST_TYPE_OFFSET: u32 = 3;

/// Maximum number of entries in a sink table response
pub const MAX_RESPONSE_ENTRIES: usize = 4;

extended_enum!(
    /// Sink table request type
    SinkTableRequestType, u8,
    /// Request the entry of a GPD
    ByGpdId => 0b00,
    /// Request the entries starting at a index
    ByIndex => 0b01,
);

/// GP Sink Table Request
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SinkTableRequest {
    /// Request the entry of a GPD
    ByGpdId(GpdAddress),
    /// Request the entries starting at a index
    ByIndex(u8),
}

impl Pack<SinkTableRequest, Error> for SinkTableRequest {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        match self {
            SinkTableRequest::ByGpdId(address) => {
                writer.write_u8(u8::from(address.application_id()))?;
                address.write(&mut writer)?;
            }
            SinkTableRequest::ByIndex(index) => {
                writer.write_u8(u8::from(SinkTableRequestType::ByIndex) << REQUEST_TYPE_OFFSET)?;
                writer.write_u8(*index)?;
            }
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = reader.read_u8()? as u32;
        let request_type = SinkTableRequestType::try_from(field(
            options,
            REQUEST_TYPE_MASK,
            REQUEST_TYPE_OFFSET,
        ))?;
        let request = match request_type {
            SinkTableRequestType::ByGpdId => {
                SinkTableRequest::ByGpdId(GpdAddress::read(&mut reader, application_id(options)?)?)
            }
            SinkTableRequestType::ByIndex => SinkTableRequest::ByIndex(reader.read_u8()?),
        };
        Ok((request, reader.offset()))
    }
}

/// GP Sink Table Response
#[derive(Clone, Debug, PartialEq)]
pub struct SinkTableResponse {
    /// Status, success or not found
    pub status: u8,
    /// Number of active sink table entries
    pub total: u8,
    /// Index of the first entry, 0xff for a request by GPD identifier
    pub start_index: u8,
    /// Entries
    pub entries: heapless::Vec<SinkTableEntry, MAX_RESPONSE_ENTRIES>,
}

impl Pack<SinkTableResponse, Error> for SinkTableResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(self.status)?;
        writer.write_u8(self.total)?;
        writer.write_u8(self.start_index)?;
        writer.write_u8(self.entries.len() as u8)?;
        for entry in self.entries.iter() {
            writer.write(entry)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let status = reader.read_u8()?;
        let total = reader.read_u8()?;
        let start_index = reader.read_u8()?;
        let count = reader.read_u8()?;
        let mut offset = reader.offset();
        let mut entries = heapless::Vec::new();
        for _ in 0..count {
            let (entry, used) = SinkTableEntry::unpack(&data[offset..])?;
            entries.push(entry).map_err(|_| Error::TooManyItems)?;
            offset += used;
        }
        Ok((
            Self {
                status,
                total,
                start_index,
                entries,
            },
            offset,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster_library::STATUS_NOT_FOUND;
    use crate::ExtendedAddress;

    #[test]
    fn sink_table_requests() {
        let (request, used) = SinkTableRequest::unpack(&[0x00, 0x78, 0x56, 0x34, 0x12]).unwrap();
        assert_eq!(used, 5);
        assert_eq!(request, SinkTableRequest::ByGpdId(GpdAddress::SourceId(0x1234_5678)));
        let (request, used) = SinkTableRequest::unpack(&[0x08, 0x03]).unwrap();
        assert_eq!(used, 2);
        assert_eq!(request, SinkTableRequest::ByIndex(3));
        let request = SinkTableRequest::ByGpdId(GpdAddress::Ieee(ExtendedAddress::new(1), 4));
        let mut data = [0u8; 16];
        let used = request.pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x02, 0x01, 0, 0, 0, 0, 0, 0, 0, 0x04]);
        assert_eq!(
            SinkTableRequest::unpack(&[0x10, 0x00]),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn sink_table_responses() {
        let response = SinkTableResponse {
            status: STATUS_NOT_FOUND,
            total: 0,
            start_index: 0xff,
            entries: heapless::Vec::new(),
        };
        let mut data = [0u8; 64];
        let used = response.pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x8b, 0x00, 0xff, 0x00]);

        let mut entries = heapless::Vec::new();
        entries
            .push(SinkTableEntry::new(GpdAddress::SourceId(0x0000_0042), 0x02))
            .unwrap();
        let response = SinkTableResponse {
            status: 0,
            total: 1,
            start_index: 0xff,
            entries,
        };
        let used = response.pack(&mut data).unwrap();
        assert_eq!(
            data[..used],
            [0x00, 0x01, 0xff, 0x01, 0x00, 0x00, 0x42, 0x00, 0x00, 0x00, 0x02, 0xff]
        );
        let (unpacked, _) = SinkTableResponse::unpack(&data[..used]).unwrap();
        assert_eq!(unpacked, response);
    }
}
