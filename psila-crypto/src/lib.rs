#![no_std]
#![warn(missing_docs)]

//! Crypto backend abstraction used by the Psila Green Power crates
//!
//! The backend provides CCM* and single block AES-128. The Zigbee
//! Matyas-Meyer-Oseas hash and the HMAC built upon it are implemented on top
//! of the backend in [`hash`].

mod error;
pub mod hash;

pub use error::Error;

/// Length of the message length field (L) in octets. Always 2 for Zigbee
pub const LENGTH_FIELD_LENGTH: usize = 2;
/// Cipher block length
pub const BLOCK_SIZE: usize = 16;
/// Key length,
///
/// 128-bit keys are used
pub const KEY_SIZE: usize = 16;
/// CCM* nonce length, 15 - L octets
pub const NONCE_SIZE: usize = 15 - LENGTH_FIELD_LENGTH;

/// Trait for implementing a crypto backend
pub trait CryptoBackend {
    /// Encrypt and authenticate using CCM*
    ///
    /// An empty `message` produces an authentication only MIC over the
    /// additional data. Returns the number of bytes written to
    /// `message_output`.
    fn ccmstar_encrypt(
        &mut self,
        key: &[u8],
        nonce: &[u8],
        message: &[u8],
        mic: &mut [u8],
        additional_data: &[u8],
        message_output: &mut [u8],
    ) -> Result<usize, Error>;

    /// Decrypt and verify using CCM*
    ///
    /// Fails with `Error::IntegrityCheckFailed` if the MIC does not match.
    fn ccmstar_decrypt(
        &mut self,
        key: &[u8],
        nonce: &[u8],
        message: &[u8],
        mic: &[u8],
        additional_data: &[u8],
        message_output: &mut [u8],
    ) -> Result<usize, Error>;

    /// Encrypt a single block using AES-128
    fn aes128_encrypt_block(
        &mut self,
        key: &[u8],
        input: &[u8],
        output: &mut [u8],
    ) -> Result<(), Error>;
}
