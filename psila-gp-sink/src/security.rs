//! # Green Power security
//!
//! Key selection and derivation, protection of the GPD key exchanged while
//! commissioning and the CCM* processing of GPD frames the proxies could not
//! handle themselves.

use byteorder::{ByteOrder, LittleEndian};

use psila_crypto::{hash, CryptoBackend, NONCE_SIZE};
use psila_gp_data::common::address::EXTENDED_ADDRESS_SIZE;
use psila_gp_data::{GpdAddress, Key, SecurityKeyType, SecurityLevel};

use crate::config::SinkConfig;
use crate::Error;

/// Size of the message integrity code used by Green Power
pub const MIC_SIZE: usize = 4;

const SECURITY_CONTROL_FROM_GPD: u8 = 0x05;
const SECURITY_CONTROL_TO_GPD: u8 = 0xc5;
const NETWORK_FRAME_CONTROL: u8 = 0x8c;
const EXTENDED_SECURITY_LEVEL_OFFSET: u8 = 3;
const EXTENDED_INDIVIDUAL_KEY: u8 = 0x20;
const EXTENDED_RX_AFTER_TX: u8 = 0x40;
const MAX_HEADER_SIZE: usize = 10;
const DERIVED_GROUP_KEY_SEED: &[u8] = b"ZGP";

/// The fields of a GPD frame that are covered by the frame security
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameSecurity {
    /// GPD address
    pub address: GpdAddress,
    /// Security level
    pub level: SecurityLevel,
    /// Key type
    pub key_type: SecurityKeyType,
    /// The GPD receives after transmitting
    pub rx_after_tx: bool,
    /// Security frame counter
    pub frame_counter: u32,
}

impl FrameSecurity {
    fn header(&self, output: &mut [u8; MAX_HEADER_SIZE]) -> usize {
        let individual = matches!(
            self.key_type,
            SecurityKeyType::IndividualKey | SecurityKeyType::DerivedIndividualKey
        );
        let mut extended = u8::from(self.address.application_id());
        extended |= u8::from(self.level) << EXTENDED_SECURITY_LEVEL_OFFSET;
        if individual {
            extended |= EXTENDED_INDIVIDUAL_KEY;
        }
        if self.rx_after_tx {
            extended |= EXTENDED_RX_AFTER_TX;
        }
        output[0] = NETWORK_FRAME_CONTROL;
        output[1] = extended;
        let offset = match self.address {
            GpdAddress::SourceId(id) => {
                LittleEndian::write_u32(&mut output[2..6], id);
                6
            }
            GpdAddress::Ieee(_, endpoint) => {
                output[2] = endpoint;
                3
            }
        };
        LittleEndian::write_u32(&mut output[offset..offset + 4], self.frame_counter);
        offset + 4
    }
}

fn nonce(address: &GpdAddress, frame_counter: u32, to_gpd: bool) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    match address {
        GpdAddress::SourceId(id) => {
            if !to_gpd {
                LittleEndian::write_u32(&mut nonce[0..4], *id);
            }
            LittleEndian::write_u32(&mut nonce[4..8], *id);
        }
        GpdAddress::Ieee(ieee, _) => {
            LittleEndian::write_u64(&mut nonce[0..8], u64::from(*ieee));
        }
    }
    LittleEndian::write_u32(&mut nonce[8..12], frame_counter);
    nonce[12] = if to_gpd {
        SECURITY_CONTROL_TO_GPD
    } else {
        SECURITY_CONTROL_FROM_GPD
    };
    nonce
}

/// Frame counter used when protecting the key of a commissioning frame
fn key_frame_counter(address: &GpdAddress) -> u32 {
    match address {
        GpdAddress::SourceId(id) => *id,
        GpdAddress::Ieee(ieee, _) => u64::from(*ieee) as u32,
    }
}

/// Security processing of the sink
pub struct SinkSecurity<CB> {
    backend: CB,
    link_key: Key,
}

impl<CB> SinkSecurity<CB>
where
    CB: CryptoBackend,
{
    /// Create with the key used for protecting GPD keys
    pub fn new(backend: CB, link_key: Key) -> Self {
        Self { backend, link_key }
    }

    /// The key a GPD shall use according to the configured shared key type
    pub fn shared_key(
        &mut self,
        config: &SinkConfig,
        address: &GpdAddress,
    ) -> Result<Option<Key>, Error> {
        match config.shared_key_type() {
            SecurityKeyType::NoKey => Ok(None),
            SecurityKeyType::NetworkKey => {
                log::debug!("Network key");
                Ok(config.network_key)
            }
            SecurityKeyType::NetworkDerivedGroupKey => match config.network_key {
                Some(network_key) => {
                    log::debug!("Network derived group key");
                    let key = hash::hmac_aes_mmo(
                        &mut self.backend,
                        network_key.as_bytes(),
                        DERIVED_GROUP_KEY_SEED,
                    )?;
                    Ok(Some(Key::from(key)))
                }
                None => Ok(None),
            },
            SecurityKeyType::GroupKey | SecurityKeyType::IndividualKey => {
                log::debug!("Shared key");
                Ok(config.shared_key)
            }
            SecurityKeyType::DerivedIndividualKey => match config.shared_key {
                Some(group_key) => {
                    log::debug!("Derived individual key");
                    let mut material = [0u8; EXTENDED_ADDRESS_SIZE];
                    let length = address.key_material(&mut material);
                    let key = hash::hmac_aes_mmo(
                        &mut self.backend,
                        group_key.as_bytes(),
                        &material[..length],
                    )?;
                    Ok(Some(Key::from(key)))
                }
                None => Ok(None),
            },
        }
    }

    /// Decrypt the key carried by a commissioning frame
    pub fn decrypt_key(&mut self, address: &GpdAddress, key: &Key, mic: u32) -> Result<Key, Error> {
        let nonce = nonce(address, key_frame_counter(address), false);
        let mut material = [0u8; EXTENDED_ADDRESS_SIZE];
        let length = address.key_material(&mut material);
        let mut mic_octets = [0u8; MIC_SIZE];
        LittleEndian::write_u32(&mut mic_octets, mic);
        let mut output = [0u8; 16];
        self.backend.ccmstar_decrypt(
            self.link_key.as_bytes(),
            &nonce,
            key.as_bytes(),
            &mic_octets,
            &material[..length],
            &mut output,
        )?;
        Ok(Key::from(output))
    }

    /// Encrypt a key for the commissioning reply, returns the encrypted key
    /// and the MIC
    pub fn encrypt_key(
        &mut self,
        address: &GpdAddress,
        key: &Key,
        frame_counter: u32,
    ) -> Result<(Key, u32), Error> {
        let nonce = nonce(address, frame_counter, true);
        let mut material = [0u8; EXTENDED_ADDRESS_SIZE];
        let length = address.key_material(&mut material);
        let mut mic = [0u8; MIC_SIZE];
        let mut output = [0u8; 16];
        self.backend.ccmstar_encrypt(
            self.link_key.as_bytes(),
            &nonce,
            key.as_bytes(),
            &mut mic,
            &material[..length],
            &mut output,
        )?;
        Ok((Key::from(output), LittleEndian::read_u32(&mic)))
    }

    /// Verify, and for level 3 decrypt, the command identifier and payload
    /// of a GPD frame. The plain text is written to `output`.
    pub fn unsecure_frame(
        &mut self,
        frame: &FrameSecurity,
        key: &Key,
        data: &[u8],
        mic: u32,
        output: &mut [u8],
    ) -> Result<usize, Error> {
        if output.len() < data.len() {
            return Err(Error::NotEnoughSpace);
        }
        let mut header = [0u8; MAX_HEADER_SIZE];
        let header_length = frame.header(&mut header);
        let nonce = nonce(&frame.address, frame.frame_counter, false);
        let mut mic_octets = [0u8; MIC_SIZE];
        LittleEndian::write_u32(&mut mic_octets, mic);
        match frame.level {
            SecurityLevel::FrameCounterMic => {
                let mut aad = Vec::with_capacity(header_length + data.len());
                aad.extend_from_slice(&header[..header_length]);
                aad.extend_from_slice(data);
                self.backend.ccmstar_decrypt(
                    key.as_bytes(),
                    &nonce,
                    &[],
                    &mic_octets,
                    &aad,
                    &mut [],
                )?;
                output[..data.len()].copy_from_slice(data);
                Ok(data.len())
            }
            SecurityLevel::Encryption => Ok(self.backend.ccmstar_decrypt(
                key.as_bytes(),
                &nonce,
                data,
                &mic_octets,
                &header[..header_length],
                output,
            )?),
            _ => Err(Error::DataError(psila_gp_data::Error::InvalidValue)),
        }
    }

    /// Protect the command identifier and payload of a GPD frame, the
    /// counterpart of `unsecure_frame`. Returns the length written to
    /// `output` and the MIC.
    pub fn secure_frame(
        &mut self,
        frame: &FrameSecurity,
        key: &Key,
        data: &[u8],
        output: &mut [u8],
    ) -> Result<(usize, u32), Error> {
        if output.len() < data.len() {
            return Err(Error::NotEnoughSpace);
        }
        let mut header = [0u8; MAX_HEADER_SIZE];
        let header_length = frame.header(&mut header);
        let nonce = nonce(&frame.address, frame.frame_counter, false);
        let mut mic = [0u8; MIC_SIZE];
        let length = match frame.level {
            SecurityLevel::FrameCounterMic => {
                let mut aad = Vec::with_capacity(header_length + data.len());
                aad.extend_from_slice(&header[..header_length]);
                aad.extend_from_slice(data);
                self.backend
                    .ccmstar_encrypt(key.as_bytes(), &nonce, &[], &mut mic, &aad, &mut [])?;
                output[..data.len()].copy_from_slice(data);
                data.len()
            }
            SecurityLevel::Encryption => self.backend.ccmstar_encrypt(
                key.as_bytes(),
                &nonce,
                data,
                &mut mic,
                &header[..header_length],
                output,
            )?,
            _ => return Err(Error::DataError(psila_gp_data::Error::InvalidValue)),
        };
        Ok((length, LittleEndian::read_u32(&mic)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psila_crypto_rust_crypto::RustCryptoBackend;
    use psila_gp_data::{ExtendedAddress, DEFAULT_LINK_KEY};

    const GPD_KEY: [u8; 16] = [
        0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xcb, 0xcc, 0xcd, 0xce,
        0xcf,
    ];

    fn security() -> SinkSecurity<RustCryptoBackend> {
        SinkSecurity::new(RustCryptoBackend::default(), DEFAULT_LINK_KEY)
    }

    #[test]
    fn key_protection() {
        let mut security = security();
        let address = GpdAddress::SourceId(0x8765_4321);
        let key = Key::from(GPD_KEY);
        // A key encrypted for the reply does not decrypt as a commissioning key
        let (encrypted, mic) = security.encrypt_key(&address, &key, 0x8765_4321).unwrap();
        assert_ne!(encrypted, key);
        assert!(security.decrypt_key(&address, &encrypted, mic).is_err());
        assert_eq!(
            security.decrypt_key(&address, &encrypted, mic ^ 1),
            Err(Error::CryptoError(psila_crypto::Error::IntegrityCheckFailed))
        );
    }

    #[test]
    fn commissioning_key_round_trip() {
        let mut security = security();
        let address = GpdAddress::Ieee(ExtendedAddress::new(0x0011_2233_4455_6677), 1);
        let key = Key::from(GPD_KEY);
        let nonce = nonce(&address, key_frame_counter(&address), false);
        let mut material = [0u8; EXTENDED_ADDRESS_SIZE];
        let length = address.key_material(&mut material);
        let mut mic = [0u8; MIC_SIZE];
        let mut encrypted = [0u8; 16];
        security
            .backend
            .ccmstar_encrypt(
                DEFAULT_LINK_KEY.as_bytes(),
                &nonce,
                key.as_bytes(),
                &mut mic,
                &material[..length],
                &mut encrypted,
            )
            .unwrap();
        let decrypted = security
            .decrypt_key(&address, &Key::from(encrypted), LittleEndian::read_u32(&mic))
            .unwrap();
        assert_eq!(decrypted, key);
    }

    #[test]
    fn frame_protection() {
        let mut security = security();
        let key = Key::from(GPD_KEY);
        let data = [0x22u8];
        for level in [SecurityLevel::FrameCounterMic, SecurityLevel::Encryption] {
            let frame = FrameSecurity {
                address: GpdAddress::SourceId(0x1234_5678),
                level,
                key_type: SecurityKeyType::IndividualKey,
                rx_after_tx: false,
                frame_counter: 7,
            };
            let mut protected = [0u8; 8];
            let (length, mic) = security
                .secure_frame(&frame, &key, &data, &mut protected)
                .unwrap();
            assert_eq!(length, 1);
            if level == SecurityLevel::FrameCounterMic {
                assert_eq!(protected[0], 0x22);
            }
            let mut plain = [0u8; 8];
            let length = security
                .unsecure_frame(&frame, &key, &protected[..length], mic, &mut plain)
                .unwrap();
            assert_eq!(plain[..length], data);
            let replayed = FrameSecurity {
                frame_counter: 8,
                ..frame
            };
            assert!(security
                .unsecure_frame(&replayed, &key, &protected[..1], mic, &mut plain)
                .is_err());
        }
    }

    #[test]
    fn derived_keys() {
        let mut security = security();
        let address = GpdAddress::SourceId(0x1234_5678);
        let mut config = SinkConfig::default();
        assert_eq!(security.shared_key(&config, &address), Ok(None));
        config.shared_key_type = u8::from(SecurityKeyType::GroupKey);
        config.shared_key = Some(Key::from(GPD_KEY));
        assert_eq!(
            security.shared_key(&config, &address),
            Ok(Some(Key::from(GPD_KEY)))
        );
        config.shared_key_type = u8::from(SecurityKeyType::DerivedIndividualKey);
        let derived = security.shared_key(&config, &address).unwrap().unwrap();
        assert_ne!(derived, Key::from(GPD_KEY));
        let other = security
            .shared_key(&config, &GpdAddress::SourceId(0x1234_5679))
            .unwrap()
            .unwrap();
        assert_ne!(derived, other);
        config.shared_key_type = u8::from(SecurityKeyType::NetworkDerivedGroupKey);
        assert_eq!(security.shared_key(&config, &address), Ok(None));
        config.network_key = Some(Key::from([0x11; 16]));
        let group = security.shared_key(&config, &address).unwrap().unwrap();
        assert_ne!(group, Key::from([0x11; 16]));
    }
}
