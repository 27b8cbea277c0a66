//! # Frame Cipher
//!
//! AES-128-CTR payload encryption with a per-frame nonce.
//!
//! The nonce is the frame's source address followed by its big-endian
//! message id, 8 bytes total, reconstructed identically at decrypt time from
//! the frame header. It is never a per-session IV: with a counter-mode
//! stream cipher a fixed IV would reuse the keystream on every frame
//! after the first, which lets anyone XOR two ciphertexts together.
//! Random message ids make nonce collisions birthday-rare.
//!
//! Stream-cipher semantics throughout: encrypt and decrypt are the same
//! transform, ciphertext length equals plaintext length, and there is no
//! integrity tag. A wrong key therefore fails silently; the packet
//! codec choking on the garbage downstream is the only detection path,
//! and that failure is routine on a shared band.

use crate::config::{KEY_LEN, NONCE_LEN};
use crate::core::address::Address;
use crate::error::{ProtocolError, Result};
use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};

/// AES-128 in counter mode with a 64-bit big-endian block counter in the
/// low half of the IV; the per-frame nonce occupies the high half.
type Aes128Ctr64 = ctr::Ctr64BE<Aes128>;

/// Whether payloads are encrypted. Plaintext is an explicit capability
/// chosen at construction from the device config, never a silent
/// fallback taken at frame time.
#[derive(Clone)]
pub enum CipherMode {
    /// No channel key configured; payloads pass through untouched.
    Plaintext,
    /// Payloads are transformed with the pre-shared channel key.
    Keyed(FrameCipher),
}

impl CipherMode {
    /// Build from an optional pre-shared key.
    pub fn from_key(key: Option<&[u8]>) -> Result<Self> {
        match key {
            None => Ok(CipherMode::Plaintext),
            Some(key) => Ok(CipherMode::Keyed(FrameCipher::new(key)?)),
        }
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, CipherMode::Keyed(_))
    }

    /// Apply the stream transform in place. No-op in plaintext mode.
    pub fn apply(&self, src: Address, msg_id: u32, data: &mut [u8]) {
        if let CipherMode::Keyed(cipher) = self {
            cipher.apply(src, msg_id, data);
        }
    }
}

impl std::fmt::Debug for CipherMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print key material
        match self {
            CipherMode::Plaintext => f.write_str("CipherMode::Plaintext"),
            CipherMode::Keyed(_) => f.write_str("CipherMode::Keyed"),
        }
    }
}

/// The keyed stream transform shared by send and receive paths.
#[derive(Clone)]
pub struct FrameCipher {
    key: [u8; KEY_LEN],
}

impl FrameCipher {
    /// Wrap a 16-byte pre-shared key, rejecting any other length.
    pub fn new(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| ProtocolError::KeyLength {
            expected: KEY_LEN,
            got: key.len(),
        })?;
        Ok(FrameCipher { key })
    }

    /// The 8-byte per-frame nonce: `src ++ msg_id` (big-endian id).
    pub fn nonce(src: Address, msg_id: u32) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        nonce[..4].copy_from_slice(src.as_bytes());
        nonce[4..].copy_from_slice(&msg_id.to_be_bytes());
        nonce
    }

    /// Encrypt or decrypt `data` in place (one transform, stream cipher).
    pub fn apply(&self, src: Address, msg_id: u32, data: &mut [u8]) {
        let mut iv = [0u8; 16];
        iv[..NONCE_LEN].copy_from_slice(&Self::nonce(src, msg_id));
        // low 8 bytes stay zero: the counter starts at block 0

        let mut cipher = Aes128Ctr64::new(&self.key.into(), &iv.into());
        cipher.apply_keystream(data);
    }
}
