use crate::pack::{Pack, Reader, Writer};
use crate::utils::flag;
use crate::{Error, GpdAddress, ShortAddress};

use super::{application_id, gpd_payload, GpdPayload};

const TRANSMIT_ON_ENDPOINT_MATCH: u32 = 0x08;
const FIRST_CHANNEL: u8 = 11;

/// GP Response
///
/// Sent by the sink to have a proxy, the temporary master, transmit a GPD
/// command to a bidirectional GPD
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    /// Only transmit when the endpoint matches
    pub transmit_on_endpoint_match: bool,
    /// Short address of the proxy that transmits the command
    pub temporary_master: ShortAddress,
    /// Channel to transmit on, 11 to 26
    pub channel: u8,
    /// GPD address
    pub address: GpdAddress,
    /// GPD command identifier
    pub command: u8,
    /// GPD command payload
    pub payload: GpdPayload,
}

impl Pack<Response, Error> for Response {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if !(FIRST_CHANNEL..=FIRST_CHANNEL + 15).contains(&self.channel) {
            return Err(Error::InvalidValue);
        }
        let mut options = u8::from(self.address.application_id());
        if self.transmit_on_endpoint_match {
            options |= TRANSMIT_ON_ENDPOINT_MATCH as u8;
        }
        let mut writer = Writer::new(data);
        writer.write_u8(options)?;
        writer.write_u16(u16::from(self.temporary_master))?;
        writer.write_u8(self.channel - FIRST_CHANNEL)?;
        self.address.write(&mut writer)?;
        writer.write_u8(self.command)?;
        writer.write_octet_string(&self.payload)?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = reader.read_u8()? as u32;
        let application_id = application_id(options)?;
        let temporary_master = ShortAddress::new(reader.read_u16()?);
        let channel = (reader.read_u8()? & 0x0f) + FIRST_CHANNEL;
        let address = GpdAddress::read(&mut reader, application_id)?;
        let command = reader.read_u8()?;
        let payload = gpd_payload(reader.read_octet_string()?)?;
        Ok((
            Self {
                transmit_on_endpoint_match: flag(options, TRANSMIT_ON_ENDPOINT_MATCH),
                temporary_master,
                channel,
                address,
                command,
                payload,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_configuration_response() {
        let response = Response {
            transmit_on_endpoint_match: false,
            temporary_master: ShortAddress::new(0x1a2b),
            channel: 15,
            address: GpdAddress::SourceId(0x0102_0304),
            command: 0xf3,
            payload: gpd_payload(&[0x1b]).unwrap(),
        };
        let mut data = [0u8; 32];
        let used = response.pack(&mut data).unwrap();
        assert_eq!(
            data[..used],
            [0x00, 0x2b, 0x1a, 0x04, 0x04, 0x03, 0x02, 0x01, 0xf3, 0x01, 0x1b]
        );
        let (unpacked, used) = Response::unpack(&data[..used]).unwrap();
        assert_eq!(used, 11);
        assert_eq!(unpacked, response);
    }

    #[test]
    fn invalid_channel() {
        let response = Response {
            transmit_on_endpoint_match: true,
            temporary_master: ShortAddress::new(0),
            channel: 10,
            address: GpdAddress::SourceId(1),
            command: 0xf0,
            payload: GpdPayload::new(),
        };
        let mut data = [0u8; 32];
        assert_eq!(response.pack(&mut data), Err(Error::InvalidValue));
    }
}
