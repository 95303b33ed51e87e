#![no_std]

//! Psila crypto backend built on the RustCrypto `aes` and `ccm` crates

use psila_crypto::{CryptoBackend, Error, BLOCK_SIZE, KEY_SIZE, NONCE_SIZE};

use aes::{
    cipher::{BlockEncrypt, KeyInit},
    Aes128,
};
use ccm::{
    aead::{generic_array::GenericArray, AeadInPlace},
    consts::{U13, U16, U4, U8},
    Ccm,
};

type AesCcmMic4 = Ccm<Aes128, U4, U13>;
type AesCcmMic8 = Ccm<Aes128, U8, U13>;
type AesCcmMic16 = Ccm<Aes128, U16, U13>;

fn seal<C>(
    key: &[u8],
    nonce: &[u8],
    additional_data: &[u8],
    buffer: &mut [u8],
    mic: &mut [u8],
) -> Result<(), Error>
where
    C: KeyInit + AeadInPlace,
{
    let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidKeySize)?;
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), additional_data, buffer)
        .map_err(|_| Error::BackendError)?;
    mic.copy_from_slice(tag.as_slice());
    Ok(())
}

fn open<C>(
    key: &[u8],
    nonce: &[u8],
    additional_data: &[u8],
    buffer: &mut [u8],
    mic: &[u8],
) -> Result<(), Error>
where
    C: KeyInit + AeadInPlace,
{
    let cipher = C::new_from_slice(key).map_err(|_| Error::InvalidKeySize)?;
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            additional_data,
            buffer,
            GenericArray::from_slice(mic),
        )
        .map_err(|_| Error::IntegrityCheckFailed)
}

/// Crypto backend using RustCrypto
#[derive(Default)]
pub struct RustCryptoBackend {}

impl RustCryptoBackend {
    fn check_parameters(key: &[u8], nonce: &[u8]) -> Result<(), Error> {
        if key.len() != KEY_SIZE {
            return Err(Error::InvalidKeySize);
        }
        if nonce.len() != NONCE_SIZE {
            return Err(Error::InvalidNonceSize);
        }
        Ok(())
    }
}

impl CryptoBackend for RustCryptoBackend {
    fn ccmstar_encrypt(
        &mut self,
        key: &[u8],
        nonce: &[u8],
        message: &[u8],
        mic: &mut [u8],
        additional_data: &[u8],
        message_output: &mut [u8],
    ) -> Result<usize, Error> {
        Self::check_parameters(key, nonce)?;
        let length = message.len();
        if message_output.len() < length {
            return Err(Error::NotEnoughSpace);
        }
        let buffer = &mut message_output[..length];
        buffer.copy_from_slice(message);
        match mic.len() {
            4 => seal::<AesCcmMic4>(key, nonce, additional_data, buffer, mic)?,
            8 => seal::<AesCcmMic8>(key, nonce, additional_data, buffer, mic)?,
            16 => seal::<AesCcmMic16>(key, nonce, additional_data, buffer, mic)?,
            _ => return Err(Error::InvalidIntegrityCodeSize),
        }
        Ok(length)
    }

    fn ccmstar_decrypt(
        &mut self,
        key: &[u8],
        nonce: &[u8],
        message: &[u8],
        mic: &[u8],
        additional_data: &[u8],
        message_output: &mut [u8],
    ) -> Result<usize, Error> {
        Self::check_parameters(key, nonce)?;
        let length = message.len();
        if message_output.len() < length {
            return Err(Error::NotEnoughSpace);
        }
        let buffer = &mut message_output[..length];
        buffer.copy_from_slice(message);
        match mic.len() {
            4 => open::<AesCcmMic4>(key, nonce, additional_data, buffer, mic)?,
            8 => open::<AesCcmMic8>(key, nonce, additional_data, buffer, mic)?,
            16 => open::<AesCcmMic16>(key, nonce, additional_data, buffer, mic)?,
            _ => return Err(Error::InvalidIntegrityCodeSize),
        }
        Ok(length)
    }

    fn aes128_encrypt_block(
        &mut self,
        key: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(), Error> {
        if input.len() != BLOCK_SIZE || output.len() != BLOCK_SIZE {
            return Err(Error::InvalidDataSize);
        }
        let cipher = Aes128::new_from_slice(key).map_err(|_| Error::InvalidKeySize)?;
        output.copy_from_slice(input);
        cipher.encrypt_block(GenericArray::from_mut_slice(output));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psila_crypto::hash::hmac_aes_mmo;

    // Zigbee specification C.2.2.2
    const CCM_KEY: [u8; 16] = [
        0xC0, 0xC1, 0xC2, 0xC3, 0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xCB, 0xCC, 0xCD, 0xCE,
        0xCF,
    ];
    const CCM_NONCE: [u8; 13] = [
        0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7, 0x03, 0x02, 0x01, 0x00, 0x06,
    ];
    const CCM_AAD: [u8; 8] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
    const CCM_CIPHER: [u8; 31] = [
        0x1A, 0x55, 0xA3, 0x6A, 0xBB, 0x6C, 0x61, 0x0D, 0x06, 0x6B, 0x33, 0x75, 0x64, 0x9C, 0xEF,
        0x10, 0xD4, 0x66, 0x4E, 0xCA, 0xD8, 0x54, 0xA8, 0x0A, 0x89, 0x5C, 0xC1, 0xD8, 0xFF, 0x94,
        0x69,
    ];
    const CCM_CLEAR: [u8; 23] = [
        0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16,
        0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E,
    ];

    #[test]
    fn aes128_block() {
        // FIPS-197 C.1
        let key = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ];
        let input = [
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ];
        let mut output = [0u8; 16];
        let mut backend = RustCryptoBackend::default();
        backend
            .aes128_encrypt_block(&key, &input, &mut output)
            .unwrap();
        assert_eq!(
            output,
            [
                0x69, 0xc4, 0xe0, 0xd8, 0x6a, 0x7b, 0x04, 0x30, 0xd8, 0xcd, 0xb7, 0x80, 0x70, 0xb4,
                0xc5, 0x5a
            ]
        );
    }

    #[test]
    fn ccmstar_decrypt_vector() {
        let mut backend = RustCryptoBackend::default();
        let mut clear = [0u8; 23];
        let size = backend
            .ccmstar_decrypt(
                &CCM_KEY,
                &CCM_NONCE,
                &CCM_CIPHER[..23],
                &CCM_CIPHER[23..],
                &CCM_AAD,
                &mut clear,
            )
            .unwrap();
        assert_eq!(size, 23);
        assert_eq!(clear, CCM_CLEAR);
    }

    #[test]
    fn ccmstar_encrypt_vector() {
        let mut backend = RustCryptoBackend::default();
        let mut cipher = [0u8; 23];
        let mut mic = [0u8; 8];
        let size = backend
            .ccmstar_encrypt(
                &CCM_KEY,
                &CCM_NONCE,
                &CCM_CLEAR,
                &mut mic,
                &CCM_AAD,
                &mut cipher,
            )
            .unwrap();
        assert_eq!(size, 23);
        assert_eq!(cipher, CCM_CIPHER[..23]);
        assert_eq!(mic, CCM_CIPHER[23..]);
    }

    #[test]
    fn ccmstar_tampered_mic() {
        let mut backend = RustCryptoBackend::default();
        let mut clear = [0u8; 23];
        let mut mic = [0u8; 8];
        mic.copy_from_slice(&CCM_CIPHER[23..]);
        mic[0] ^= 0x01;
        let result = backend.ccmstar_decrypt(
            &CCM_KEY,
            &CCM_NONCE,
            &CCM_CIPHER[..23],
            &mic,
            &CCM_AAD,
            &mut clear,
        );
        assert_eq!(result, Err(Error::IntegrityCheckFailed));
    }

    #[test]
    fn ccmstar_authentication_only() {
        let mut backend = RustCryptoBackend::default();
        let mut mic = [0u8; 4];
        let mut output = [0u8; 0];
        let size = backend
            .ccmstar_encrypt(&CCM_KEY, &CCM_NONCE, &[], &mut mic, &CCM_AAD, &mut output)
            .unwrap();
        assert_eq!(size, 0);
        let size = backend
            .ccmstar_decrypt(&CCM_KEY, &CCM_NONCE, &[], &mic, &CCM_AAD, &mut output)
            .unwrap();
        assert_eq!(size, 0);
    }

    #[test]
    fn ccmstar_bad_parameters() {
        let mut backend = RustCryptoBackend::default();
        let mut mic = [0u8; 5];
        let mut output = [0u8; 4];
        assert_eq!(
            backend.ccmstar_encrypt(&CCM_KEY[..8], &CCM_NONCE, &[0; 4], &mut mic, &[], &mut output),
            Err(Error::InvalidKeySize)
        );
        assert_eq!(
            backend.ccmstar_encrypt(&CCM_KEY, &CCM_NONCE[..12], &[0; 4], &mut mic, &[], &mut output),
            Err(Error::InvalidNonceSize)
        );
        assert_eq!(
            backend.ccmstar_encrypt(&CCM_KEY, &CCM_NONCE, &[0; 4], &mut mic, &[], &mut output),
            Err(Error::InvalidIntegrityCodeSize)
        );
    }

    #[test]
    fn keyed_hash() {
        // Zigbee specification C.6.1 Test Vector Set 1
        let key = [
            0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D,
            0x4E, 0x4F,
        ];
        let mut backend = RustCryptoBackend::default();
        let calculated = hmac_aes_mmo(&mut backend, &key, &[0xc0]).unwrap();
        assert_eq!(
            calculated,
            [
                0x45, 0x12, 0x80, 0x7B, 0xF9, 0x4C, 0xB3, 0x40, 0x0F, 0x0E, 0x2C, 0x25, 0xFB, 0x76,
                0xE9, 0x99
            ]
        );
    }
}
