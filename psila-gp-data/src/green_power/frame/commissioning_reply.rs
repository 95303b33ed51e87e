use core::convert::TryFrom;

use crate::pack::{Pack, PackFixed, Reader, Writer};
use crate::utils::{field, flag};
use crate::{Error, Key, SecurityKeyType, SecurityLevel};

const PAN_ID_PRESENT: u32 = 0x01;
const KEY_PRESENT: u32 = 0x02;
const KEY_ENCRYPTION: u32 = 0x04;
const SECURITY_LEVEL_MASK: u32 = 0x18;
const SECURITY_LEVEL_OFFSET: u32 = 3;
const KEY_TYPE_MASK: u32 = 0xe0;
const KEY_TYPE_OFFSET: u32 = 5;

/// GPD Commissioning Reply
///
/// Sent through a proxy to a bidirectional GPD, carrying the PAN identifier
/// and key it requested.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommissioningReply {
    /// PAN identifier, when requested
    pub pan_id: Option<u16>,
    /// Security level the GPD shall use
    pub level: SecurityLevel,
    /// Key type the GPD shall use
    pub key_type: SecurityKeyType,
    /// Key, encrypted when `key_mic` is set
    pub key: Option<Key>,
    /// MIC of the encrypted key
    pub key_mic: Option<u32>,
    /// Frame counter used for encrypting the key
    pub frame_counter: Option<u32>,
}

impl CommissioningReply {
    /// The key is encrypted
    pub fn key_encryption(&self) -> bool {
        self.key.is_some() && self.key_mic.is_some()
    }
}

impl Pack<CommissioningReply, Error> for CommissioningReply {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let mut writer = Writer::new(data);
        let mut options = (u8::from(self.level) << SECURITY_LEVEL_OFFSET)
            | (u8::from(self.key_type) << KEY_TYPE_OFFSET);
        for (set, bit) in [
            (self.pan_id.is_some(), PAN_ID_PRESENT),
            (self.key.is_some(), KEY_PRESENT),
            (self.key_encryption(), KEY_ENCRYPTION),
        ] {
            if set {
                options |= bit as u8;
            }
        }
        writer.write_u8(options)?;
        if let Some(pan_id) = self.pan_id {
            writer.write_u16(pan_id)?;
        }
        if let Some(key) = self.key {
            let mut octets = [0u8; 16];
            key.pack(&mut octets)?;
            writer.write_slice(&octets)?;
            if let Some(mic) = self.key_mic {
                writer.write_u32(mic)?;
                writer.write_u32(self.frame_counter.unwrap_or_default())?;
            }
        }
        Ok(writer.offset())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        let mut reader = Reader::new(data);
        let options = reader.read_u8()? as u32;
        let level = SecurityLevel::try_from(field(
            options,
            SECURITY_LEVEL_MASK,
            SECURITY_LEVEL_OFFSET,
        ))?;
        let key_type = SecurityKeyType::try_from(field(options, KEY_TYPE_MASK, KEY_TYPE_OFFSET))?;
        let pan_id = if flag(options, PAN_ID_PRESENT) {
            Some(reader.read_u16()?)
        } else {
            None
        };
        let (key, key_mic, frame_counter) = if flag(options, KEY_PRESENT) {
            let key = Key::unpack(reader.read_slice(16)?)?;
            if flag(options, KEY_ENCRYPTION) {
                (Some(key), Some(reader.read_u32()?), Some(reader.read_u32()?))
            } else {
                (Some(key), None, None)
            }
        } else {
            (None, None, None)
        };
        Ok((
            Self {
                pan_id,
                level,
                key_type,
                key,
                key_mic,
                frame_counter,
            },
            reader.offset(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_with_pan_id_only() {
        let reply = CommissioningReply {
            pan_id: Some(0x1a62),
            level: SecurityLevel::None,
            key_type: SecurityKeyType::NoKey,
            key: None,
            key_mic: None,
            frame_counter: None,
        };
        let mut data = [0u8; 8];
        assert_eq!(reply.pack(&mut data), Ok(3));
        assert_eq!(data[..3], [0x01, 0x62, 0x1a]);
    }

    #[test]
    fn reply_with_encrypted_key() {
        let reply = CommissioningReply {
            pan_id: None,
            level: SecurityLevel::Encryption,
            key_type: SecurityKeyType::IndividualKey,
            key: Some(Key::from([0x5a; 16])),
            key_mic: Some(0xdead_beef),
            frame_counter: Some(0x0000_0011),
        };
        let mut data = [0u8; 32];
        assert_eq!(reply.pack(&mut data), Ok(25));
        assert_eq!(data[0], 0x9e);
        assert_eq!(data[17..21], [0xef, 0xbe, 0xad, 0xde]);
        let (unpacked, used) = CommissioningReply::unpack(&data[..25]).unwrap();
        assert_eq!(used, 25);
        assert_eq!(unpacked, reply);
        assert_eq!(
            CommissioningReply::unpack(&data[..21]),
            Err(Error::WrongNumberOfBytes)
        );
    }
}
