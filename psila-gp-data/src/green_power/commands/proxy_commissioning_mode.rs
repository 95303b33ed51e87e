use crate::pack::{Pack, Reader, Writer};
use crate::utils::flag;
use crate::Error;

const ACTION: u32 = 0x01;
const EXIT_MODE_MASK: u8 = 0x0e;
const CHANNEL_PRESENT: u32 = 0x10;
const UNICAST_COMMUNICATION: u32 = 0x20;

bitflags! {
    /// Conditions for leaving commissioning mode
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct ExitMode: u8 {
        /// On expiration of the commissioning window
        const ON_WINDOW_EXPIRATION = 0x01;
        /// On the first successful pairing
        const ON_FIRST_PAIRING_SUCCESS = 0x02;
        /// On a GP Proxy Commissioning Mode with the exit action
        const ON_EXIT_COMMAND = 0x04;
    }
}

/// GP Proxy Commissioning Mode
///
/// Sent by the sink to put the proxies into, or take them out of,
/// commissioning mode
#[derive(Clone, Debug, PartialEq)]
pub struct ProxyCommissioningMode {
    /// Enter commissioning mode when set, exit otherwise
    pub enter: bool,
    /// Exit conditions
    pub exit_mode: ExitMode,
    /// Commissioning window in seconds, included with window expiration
    pub window: Option<u16>,
    /// Channel to commission on
    pub channel: Option<u8>,
    /// Forward commissioning notifications as unicast to the sink
    pub unicast: bool,
}

impl ProxyCommissioningMode {
    /// Exit commissioning mode
    pub fn exit() -> Self {
        Self {
            enter: false,
            exit_mode: ExitMode::empty(),
            window: None,
            channel: None,
            unicast: false,
        }
    }
}

impl Pack<ProxyCommissioningMode, Error> for ProxyCommissioningMode {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut exit_mode = self.exit_mode;
        exit_mode.set(ExitMode::ON_WINDOW_EXPIRATION, self.window.is_some());
        let mut options = exit_mode.bits() << 1;
        for (set, bit) in [
            (self.enter, ACTION),
            (self.channel.is_some(), CHANNEL_PRESENT),
            (self.unicast, UNICAST_COMMUNICATION),
        ] {
            if set {
                options |= bit as u8;
            }
        }
        let mut writer = Writer::new(data);
        writer.write_u8(options)?;
        if let Some(window) = self.window {
            writer.write_u16(window)?;
        }
        if let Some(channel) = self.channel {
            writer.write_u8(channel)?;
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = reader.read_u8()?;
        let exit_mode = ExitMode::from_bits_truncate((options & EXIT_MODE_MASK) >> 1);
        let window = if exit_mode.contains(ExitMode::ON_WINDOW_EXPIRATION) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let channel = if flag(options as u32, CHANNEL_PRESENT) {
            Some(reader.read_u8()?)
        } else {
            None
        };
        Ok((
            Self {
                enter: flag(options as u32, ACTION),
                exit_mode,
                window,
                channel,
                unicast: flag(options as u32, UNICAST_COMMUNICATION),
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_with_window() {
        let mode = ProxyCommissioningMode {
            enter: true,
            exit_mode: ExitMode::ON_FIRST_PAIRING_SUCCESS,
            window: Some(180),
            channel: None,
            unicast: false,
        };
        let mut data = [0u8; 8];
        let used = mode.pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x07, 0xb4, 0x00]);
        let (unpacked, used) = ProxyCommissioningMode::unpack(&data[..used]).unwrap();
        assert_eq!(used, 3);
        assert!(unpacked.enter);
        assert_eq!(
            unpacked.exit_mode,
            ExitMode::ON_WINDOW_EXPIRATION | ExitMode::ON_FIRST_PAIRING_SUCCESS
        );
        assert_eq!(unpacked.window, Some(180));
    }

    #[test]
    fn exit() {
        let mut data = [0u8; 8];
        let used = ProxyCommissioningMode::exit().pack(&mut data).unwrap();
        assert_eq!(data[..used], [0x00]);
        let data = [0x31, 0x0b];
        let (mode, _) = ProxyCommissioningMode::unpack(&data[..]).unwrap();
        assert!(mode.enter);
        assert!(mode.unicast);
        assert_eq!(mode.channel, Some(0x0b));
        assert_eq!(mode.window, None);
    }
}
