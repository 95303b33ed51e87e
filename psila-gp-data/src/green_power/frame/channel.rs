use crate::pack::{Pack, Reader, Writer};
use crate::Error;

const FIRST_CHANNEL: u8 = 11;
const LAST_CHANNEL: u8 = 26;
const CHANNEL_MASK: u8 = 0x0f;
const OPERATIONAL_CHANNEL: u8 = 0x10;

fn check_channel(channel: u8) -> Result<u8, Error> {
    if (FIRST_CHANNEL..=LAST_CHANNEL).contains(&channel) {
        Ok(channel - FIRST_CHANNEL)
    } else {
        Err(Error::InvalidValue)
    }
}

/// GPD Channel Request
///
/// Sent by a GPD searching for the operational channel of the network.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChannelRequest {
    /// Channel the GPD will listen on for the reply
    pub next_channel: u8,
    /// Channel the GPD listens on after that
    pub second_next_channel: u8,
}

impl Pack<ChannelRequest, Error> for ChannelRequest {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let next = check_channel(self.next_channel)?;
        let second = check_channel(self.second_next_channel)?;
        let mut writer = Writer::new(data);
        writer.write_u8(next | (second << 4))?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let value = reader.read_u8()?;
        Ok((
            Self {
                next_channel: (value & CHANNEL_MASK) + FIRST_CHANNEL,
                second_next_channel: (value >> 4) + FIRST_CHANNEL,
            },
            reader.offset(),
        ))
    }
}

/// GPD Channel Configuration
///
/// Tells the GPD the operational channel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChannelConfiguration {
    /// Operational channel
    pub channel: u8,
}

impl Pack<ChannelConfiguration, Error> for ChannelConfiguration {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let channel = check_channel(self.channel)?;
        let mut writer = Writer::new(data);
        writer.write_u8(channel | OPERATIONAL_CHANNEL)?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let value = reader.read_u8()?;
        Ok((
            Self {
                channel: (value & CHANNEL_MASK) + FIRST_CHANNEL,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_request() {
        let (request, used) = ChannelRequest::unpack(&[0x40]).unwrap();
        assert_eq!(used, 1);
        assert_eq!(request.next_channel, 11);
        assert_eq!(request.second_next_channel, 15);
        assert_eq!(ChannelRequest::unpack(&[]), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn channel_configuration() {
        let mut data = [0u8; 1];
        let configuration = ChannelConfiguration { channel: 25 };
        assert_eq!(configuration.pack(&mut data), Ok(1));
        assert_eq!(data, [0x1e]);
        let configuration = ChannelConfiguration { channel: 27 };
        assert_eq!(configuration.pack(&mut data), Err(Error::InvalidValue));
    }
}
