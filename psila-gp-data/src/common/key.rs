use core::convert::TryFrom;
use core::fmt;
use core::str;

use crate::pack::PackFixed;
use crate::Error;

extended_enum!(
    /// Green Power security key type
    SecurityKeyType, u8,
    /// No key
    NoKey => 0b000,
    /// Zigbee network key
    NetworkKey => 0b001,
    /// GPD group key
    GroupKey => 0b010,
    /// Network derived group key
    NetworkDerivedGroupKey => 0b011,
    /// Out of the box individual GPD key
    IndividualKey => 0b100,
    /// Derived individual GPD key
    DerivedIndividualKey => 0b111,
);

extended_enum!(
    /// Green Power security level
    SecurityLevel, u8,
    /// No security
    None => 0b00,
    /// Reserved value, frames using it are rejected
    Reserved => 0b01,
    /// 4 octet frame counter and 4 octet MIC
    FrameCounterMic => 0b10,
    /// Encryption with 4 octet frame counter and 4 octet MIC
    Encryption => 0b11,
);

/// Key length
pub const KEY_SIZE: usize = 16;

/// Default trust center link key, "ZigBeeAlliance09"
pub const DEFAULT_LINK_KEY: Key = Key([
    0x5a, 0x69, 0x67, 0x42, 0x65, 0x65, 0x41, 0x6c, 0x6c, 0x69, 0x61, 0x6e, 0x63, 0x65, 0x30,
    0x39,
]);

/// Key
///
/// 128-bit key used for security operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Key([u8; KEY_SIZE]);

impl Key {
    /// Key octets
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// True if all octets are zero
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl PackFixed<Key, Error> for Key {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != KEY_SIZE {
            return Err(Error::NotEnoughSpace);
        }
        data.copy_from_slice(&self.0);
        Ok(())
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != KEY_SIZE {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut key = Key([0; KEY_SIZE]);
        key.0.copy_from_slice(data);
        Ok(key)
    }
}

impl PartialEq<[u8; KEY_SIZE]> for Key {
    fn eq(&self, other: &[u8; KEY_SIZE]) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.iter() {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl From<[u8; KEY_SIZE]> for Key {
    fn from(value: [u8; KEY_SIZE]) -> Self {
        Key(value)
    }
}

impl From<Key> for [u8; KEY_SIZE] {
    fn from(value: Key) -> Self {
        value.0
    }
}

impl str::FromStr for Key {
    type Err = Error;

    /// Parse a key from 32 hexadecimal digits, `:` separators are skipped
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut key = [0u8; KEY_SIZE];
        let mut count = 0;
        let mut digits = s.chars().filter(|c| *c != ':');
        loop {
            let high = match digits.next() {
                Some(c) => c,
                None => break,
            };
            let low = digits.next().ok_or(Error::InvalidValue)?;
            if count >= KEY_SIZE {
                return Err(Error::InvalidValue);
            }
            let high = high.to_digit(16).ok_or(Error::InvalidValue)?;
            let low = low.to_digit(16).ok_or(Error::InvalidValue)?;
            key[count] = u8::try_from((high << 4) | low).map_err(|_| Error::InvalidValue)?;
            count += 1;
        }
        if count != KEY_SIZE {
            return Err(Error::InvalidValue);
        }
        Ok(Key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_link_key() {
        assert_eq!(DEFAULT_LINK_KEY.as_bytes(), b"ZigBeeAlliance09");
    }

    #[test]
    fn parse_key() {
        let key: Key = "000102030405060708090a0b0c0d0e0f".parse().unwrap();
        assert_eq!(
            key,
            [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f]
        );
        assert_eq!(format!("{}", key), "000102030405060708090a0b0c0d0e0f");
        let key: Key = "C0:C1:C2:C3:C4:C5:C6:C7:C8:C9:CA:CB:CC:CD:CE:CF".parse().unwrap();
        assert_eq!(key.as_bytes()[15], 0xcf);
        assert_eq!("0001".parse::<Key>(), Err(Error::InvalidValue));
        assert_eq!(
            "000102030405060708090a0b0c0d0e0g".parse::<Key>(),
            Err(Error::InvalidValue)
        );
        assert_eq!(
            "000102030405060708090a0b0c0d0e0f00".parse::<Key>(),
            Err(Error::InvalidValue)
        );
    }

    #[test]
    fn security_enums() {
        assert_eq!(SecurityLevel::try_from(3), Ok(SecurityLevel::Encryption));
        assert_eq!(SecurityKeyType::try_from(7), Ok(SecurityKeyType::DerivedIndividualKey));
        assert_eq!(SecurityKeyType::try_from(5), Err(Error::InvalidValue));
        assert_eq!(u8::from(SecurityKeyType::GroupKey), 2);
    }
}
