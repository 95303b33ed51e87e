use core::convert::TryFrom;

use crate::green_power::ApplicationInformation;
use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::utils::{field, flag};
use crate::{Error, Key, SecurityKeyType, SecurityLevel};

const MAC_SEQUENCE_NUMBER_CAPABILITY: u32 = 0x01;
const RX_ON_CAPABILITY: u32 = 0x02;
const APPLICATION_INFORMATION_PRESENT: u32 = 0x04;
const PAN_ID_REQUEST: u32 = 0x10;
const KEY_REQUEST: u32 = 0x20;
const GPD_FIXED: u32 = 0x40;
const EXTENDED_OPTIONS_PRESENT: u32 = 0x80;

const SECURITY_LEVEL_MASK: u32 = 0x03;
const KEY_TYPE_MASK: u32 = 0x1c;
const KEY_TYPE_OFFSET: u32 = 2;
const KEY_PRESENT: u32 = 0x20;
const KEY_ENCRYPTION: u32 = 0x40;
const OUTGOING_COUNTER_PRESENT: u32 = 0x80;

/// Commissioning options
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct CommissioningOptions {
    /// The GPD uses incremental MAC sequence numbers
    pub mac_sequence_number_capability: bool,
    /// The GPD receiver is on, it expects a commissioning reply
    pub rx_on_capability: bool,
    /// The GPD requests the PAN identifier
    pub pan_id_request: bool,
    /// The GPD requests a security key
    pub key_request: bool,
    /// The GPD does not move
    pub gpd_fixed: bool,
}

/// Security part of the commissioning frame, the extended options and the
/// fields they declare
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommissioningSecurity {
    /// Security level the GPD will use
    pub level: SecurityLevel,
    /// Key type the GPD will use
    pub key_type: SecurityKeyType,
    /// GPD key, encrypted when `key_encryption` is set
    pub key: Option<Key>,
    /// The key is encrypted
    pub key_encryption: bool,
    /// MIC of the encrypted key
    pub key_mic: Option<u32>,
    /// GPD outgoing frame counter
    pub outgoing_counter: Option<u32>,
}

impl CommissioningSecurity {
    /// No security
    pub fn none() -> Self {
        Self {
            level: SecurityLevel::None,
            key_type: SecurityKeyType::NoKey,
            key: None,
            key_encryption: false,
            key_mic: None,
            outgoing_counter: None,
        }
    }
}

/// GPD Commissioning frame
#[derive(Clone, Debug, PartialEq)]
pub struct CommissioningFrame {
    /// GPD device identifier
    pub device_id: u8,
    /// Options
    pub options: CommissioningOptions,
    /// Security, `None` when the extended options are absent
    pub security: Option<CommissioningSecurity>,
    /// Application information
    pub application_information: Option<ApplicationInformation>,
}

impl CommissioningFrame {
    /// The security level, `None` without extended options
    pub fn security_level(&self) -> SecurityLevel {
        self.security
            .map(|s| s.level)
            .unwrap_or(SecurityLevel::None)
    }

    /// True if application description frames follow
    pub fn application_description_follows(&self) -> bool {
        self.application_information
            .as_ref()
            .map(|info| info.application_description)
            .unwrap_or(false)
    }
}

impl Pack<CommissioningFrame, Error> for CommissioningFrame {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut options = 0u32;
        for (set, bit) in [
            (
                self.options.mac_sequence_number_capability,
                MAC_SEQUENCE_NUMBER_CAPABILITY,
            ),
            (self.options.rx_on_capability, RX_ON_CAPABILITY),
            (
                self.application_information.is_some(),
                APPLICATION_INFORMATION_PRESENT,
            ),
            (self.options.pan_id_request, PAN_ID_REQUEST),
            (self.options.key_request, KEY_REQUEST),
            (self.options.gpd_fixed, GPD_FIXED),
            (self.security.is_some(), EXTENDED_OPTIONS_PRESENT),
        ] {
            if set {
                options |= bit;
            }
        }
        let mut writer = Writer::new(data);
        writer.write_u8(self.device_id)?;
        writer.write_u8(options as u8)?;
        if let Some(security) = self.security {
            let mut extended = u8::from(security.level) as u32;
            extended |= (u8::from(security.key_type) as u32) << KEY_TYPE_OFFSET;
            for (set, bit) in [
                (security.key.is_some(), KEY_PRESENT),
                (security.key_encryption, KEY_ENCRYPTION),
                (security.outgoing_counter.is_some(), OUTGOING_COUNTER_PRESENT),
            ] {
                if set {
                    extended |= bit;
                }
            }
            writer.write_u8(extended as u8)?;
            if let Some(key) = security.key {
                writer.write_slice(key.as_bytes())?;
                if security.key_encryption {
                    writer.write_u32(security.key_mic.ok_or(Error::InvalidValue)?)?;
                }
            }
            if let Some(counter) = security.outgoing_counter {
                writer.write_u32(counter)?;
            }
        }
        if let Some(information) = &self.application_information {
            information.write(&mut writer)?;
        }
        Ok(writer.offset())
    }

    /// Parse a commissioning frame, every field must be within `data`
    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let device_id = reader.read_u8()?;
        let value = reader.read_u8()? as u32;
        let options = CommissioningOptions {
            mac_sequence_number_capability: flag(value, MAC_SEQUENCE_NUMBER_CAPABILITY),
            rx_on_capability: flag(value, RX_ON_CAPABILITY),
            pan_id_request: flag(value, PAN_ID_REQUEST),
            key_request: flag(value, KEY_REQUEST),
            gpd_fixed: flag(value, GPD_FIXED),
        };
        let security = if flag(value, EXTENDED_OPTIONS_PRESENT) {
            let extended = reader.read_u8()? as u32;
            let key_encryption = flag(extended, KEY_ENCRYPTION);
            let (key, key_mic) = if flag(extended, KEY_PRESENT) {
                let key = Key::unpack(reader.read_slice(16)?)?;
                let mic = if key_encryption {
                    Some(reader.read_u32()?)
                } else {
                    None
                };
                (Some(key), mic)
            } else {
                (None, None)
            };
            let outgoing_counter = if flag(extended, OUTGOING_COUNTER_PRESENT) {
                Some(reader.read_u32()?)
            } else {
                None
            };
            Some(CommissioningSecurity {
                level: SecurityLevel::try_from(field(extended, SECURITY_LEVEL_MASK, 0))?,
                key_type: SecurityKeyType::try_from(field(
                    extended,
                    KEY_TYPE_MASK,
                    KEY_TYPE_OFFSET,
                ))?,
                key,
                key_encryption,
                key_mic,
                outgoing_counter,
            })
        } else {
            None
        };
        let application_information = if flag(value, APPLICATION_INFORMATION_PRESENT) {
            Some(ApplicationInformation::read(&mut reader)?)
        } else {
            None
        };
        Ok((
            Self {
                device_id,
                options,
                security,
                application_information,
            },
            reader.offset(),
        ))
    }
}
