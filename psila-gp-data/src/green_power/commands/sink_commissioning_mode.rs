use crate::pack::{Pack, Reader, Writer};
use crate::utils::flag;
use crate::{Error, ShortAddress};

const ACTION: u32 = 0x01;
const INVOLVE_GPM_SECURITY: u32 = 0x02;
const INVOLVE_GPM_PAIRING: u32 = 0x04;
const INVOLVE_PROXIES: u32 = 0x08;

/// GP Sink Commissioning Mode options
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SinkCommissioningModeOptions {
    /// Enter commissioning mode when set, exit otherwise
    pub enter: bool,
    /// Involve the GP manager in security
    pub involve_gpm_security: bool,
    /// Involve the GP manager in pairing
    pub involve_gpm_pairing: bool,
    /// Put the proxies in commissioning mode
    pub involve_proxies: bool,
}

impl From<u8> for SinkCommissioningModeOptions {
    fn from(value: u8) -> Self {
        let value = value as u32;
        Self {
            enter: flag(value, ACTION),
            involve_gpm_security: flag(value, INVOLVE_GPM_SECURITY),
            involve_gpm_pairing: flag(value, INVOLVE_GPM_PAIRING),
            involve_proxies: flag(value, INVOLVE_PROXIES),
        }
    }
}

impl From<SinkCommissioningModeOptions> for u8 {
    fn from(options: SinkCommissioningModeOptions) -> u8 {
        let mut value = 0;
        for (set, bit) in [
            (options.enter, ACTION),
            (options.involve_gpm_security, INVOLVE_GPM_SECURITY),
            (options.involve_gpm_pairing, INVOLVE_GPM_PAIRING),
            (options.involve_proxies, INVOLVE_PROXIES),
        ] {
            if set {
                value |= bit;
            }
        }
        value as u8
    }
}

/// GP Sink Commissioning Mode
///
/// Sent by a commissioning tool to put the sink into, or take it out of,
/// commissioning mode
#[derive(Clone, Debug, PartialEq)]
pub struct SinkCommissioningMode {
    /// Options
    pub options: SinkCommissioningModeOptions,
    /// GP manager address for security, 0xffff when unused
    pub gpm_security_address: ShortAddress,
    /// GP manager address for pairing, 0xffff when unused
    pub gpm_pairing_address: ShortAddress,
    /// Sink endpoint to commission, 0xff for all endpoints
    pub endpoint: u8,
}

impl Pack<SinkCommissioningMode, Error> for SinkCommissioningMode {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        writer.write_u8(u8::from(self.options))?;
        writer.write_u16(u16::from(self.gpm_security_address))?;
        writer.write_u16(u16::from(self.gpm_pairing_address))?;
        writer.write_u8(self.endpoint)?;
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = SinkCommissioningModeOptions::from(reader.read_u8()?);
        let gpm_security_address = ShortAddress::new(reader.read_u16()?);
        let gpm_pairing_address = ShortAddress::new(reader.read_u16()?);
        let endpoint = reader.read_u8()?;
        Ok((
            Self {
                options,
                gpm_security_address,
                gpm_pairing_address,
                endpoint,
            },
            reader.offset(),
        ))
    }
}
