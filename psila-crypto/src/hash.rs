//! # Block-cipher based hash
//!
//! Zigbee specification B.6, Matyas-Meyer-Oseas hash using AES-128, and the
//! keyed hash (FIPS Pub 198 HMAC) built from it.

use crate::{CryptoBackend, Error, BLOCK_SIZE, KEY_SIZE};

const HASH_INNER_PAD: u8 = 0x36;
const HASH_OUTER_PAD: u8 = 0x5c;

/// The bit length is stored in 16 bits
const MAX_MESSAGE_SIZE: usize = 0xffff / 8;

/// Incremental Matyas-Meyer-Oseas hash
pub struct MmoHash {
    hash: [u8; BLOCK_SIZE],
    block: [u8; BLOCK_SIZE],
    fill: usize,
    length: usize,
}

impl Default for MmoHash {
    fn default() -> Self {
        Self::new()
    }
}

impl MmoHash {
    /// Create a hash with a cleared state
    pub fn new() -> Self {
        Self {
            hash: [0u8; BLOCK_SIZE],
            block: [0u8; BLOCK_SIZE],
            fill: 0,
            length: 0,
        }
    }

    fn process_block<B: CryptoBackend>(&mut self, backend: &mut B) -> Result<(), Error> {
        let mut output = [0u8; BLOCK_SIZE];
        // The previous hash value is used as key
        backend.aes128_encrypt_block(&self.hash, &self.block, &mut output)?;
        for (h, (o, b)) in self
            .hash
            .iter_mut()
            .zip(output.iter().zip(self.block.iter()))
        {
            *h = o ^ b;
        }
        self.fill = 0;
        Ok(())
    }

    /// Feed data into the hash
    pub fn update<B: CryptoBackend>(&mut self, backend: &mut B, data: &[u8]) -> Result<(), Error> {
        if self.length + data.len() > MAX_MESSAGE_SIZE {
            return Err(Error::InvalidDataSize);
        }
        self.length += data.len();
        for byte in data {
            self.block[self.fill] = *byte;
            self.fill += 1;
            if self.fill == BLOCK_SIZE {
                self.process_block(backend)?;
            }
        }
        Ok(())
    }

    /// Pad the message and return the hash value
    pub fn finalize<B: CryptoBackend>(mut self, backend: &mut B) -> Result<[u8; BLOCK_SIZE], Error> {
        // Right-concatenate the bit '1' followed by '0' bits until the
        // length is 14 (mod 16) octets
        self.block[self.fill] = 0x80;
        self.fill += 1;
        if self.fill > BLOCK_SIZE - 2 {
            for b in self.block[self.fill..].iter_mut() {
                *b = 0;
            }
            self.process_block(backend)?;
        }
        for b in self.block[self.fill..BLOCK_SIZE - 2].iter_mut() {
            *b = 0;
        }
        let bits = (self.length * 8) as u16;
        self.block[BLOCK_SIZE - 2..].copy_from_slice(&bits.to_be_bytes());
        self.process_block(backend)?;
        Ok(self.hash)
    }
}

/// Hash a complete message
pub fn aes_mmo_hash<B: CryptoBackend>(
    backend: &mut B,
    message: &[u8],
) -> Result<[u8; BLOCK_SIZE], Error> {
    let mut hash = MmoHash::new();
    hash.update(backend, message)?;
    hash.finalize(backend)
}

/// Keyed hash message authentication code
///
/// MacTag = H((Key XOR opad) || H((Key XOR ipad) || message))
pub fn hmac_aes_mmo<B: CryptoBackend>(
    backend: &mut B,
    key: &[u8],
    message: &[u8],
) -> Result<[u8; KEY_SIZE], Error> {
    if key.len() != KEY_SIZE {
        return Err(Error::InvalidKeySize);
    }
    let mut pad = [0u8; KEY_SIZE];
    for (p, k) in pad.iter_mut().zip(key.iter()) {
        *p = k ^ HASH_INNER_PAD;
    }
    let mut inner = MmoHash::new();
    inner.update(backend, &pad)?;
    inner.update(backend, message)?;
    let inner = inner.finalize(backend)?;

    for (p, k) in pad.iter_mut().zip(key.iter()) {
        *p = k ^ HASH_OUTER_PAD;
    }
    let mut outer = MmoHash::new();
    outer.update(backend, &pad)?;
    outer.update(backend, &inner)?;
    outer.finalize(backend)
}
