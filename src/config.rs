//! # Configuration Management
//!
//! Protocol constants and the persisted device configuration.
//!
//! The device record is small on purpose: a handheld node needs its own
//! address, a nickname, and optionally a pre-shared channel key and radio
//! parameters. Everything is TOML; a device without a config file gets a
//! freshly generated identity via [`DeviceConfig::generate`].
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - TOML strings via `from_toml()`
//! - Generated identities for first boot
//!
//! ## Security Considerations
//! - The channel key is a 16-byte pre-shared secret, stored hex-encoded
//! - A missing key means plaintext operation, an explicit capability
//!   validated up front, never a silent fallback at frame time

use crate::core::address::AddressMode;
use crate::error::{ProtocolError, Result};
use crate::transport::RadioParams;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frame header length in bytes: dest(4) src(4) msg_id(4) flags(4)
pub const HEADER_LEN: usize = 16;

/// Port number carrying a plain UTF-8 text message
pub const PORT_TEXT: u32 = 1;

/// Port number carrying a node-info announcement
pub const PORT_NODEINFO: u32 = 4;

/// Hop count written into outbound frames
pub const DEFAULT_HOPS: u8 = 3;

/// Highest encodable hop count (3 flag bits)
pub const MAX_HOPS: u8 = 7;

/// Ack-requested flag bit in the frame flags word
pub const FLAG_ACK_REQUESTED: u32 = 0b1000;

/// Mask of the hop-count bits in the frame flags word
pub const HOPS_MASK: u32 = 0b0111;

/// Pre-shared channel key length in bytes (AES-128)
pub const KEY_LEN: usize = 16;

/// Per-frame cipher nonce length in bytes: src(4) ++ msg_id(4)
pub const NONCE_LEN: usize = 8;

/// Idle polls before the engine re-announces itself
pub const IDLE_ANNOUNCE_TICKS: u32 = 1000;

/// Received-message log capacity. The log has drain-on-read semantics
/// (the UI clears it after rendering); the cap only guards against a
/// consumer that never drains. Oldest messages are evicted first.
pub const MESSAGE_LOG_CAPACITY: usize = 512;

/// Node directory capacity; oldest binding evicted first.
pub const DIRECTORY_CAPACITY: usize = 256;

/// Persisted device configuration record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Own node address, in the textual form selected by `mode`
    pub address: String,

    /// Display nickname announced to the mesh
    pub nickname: String,

    /// Address text form: `hex` (mesh) or `dotted` (point-to-point)
    #[serde(default)]
    pub mode: AddressMode,

    /// Pre-shared channel key, 32 hex digits. Absent = plaintext mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Fixed remote peer address (point-to-point deployments only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,

    /// Radio parameters. Absent = simulation mode, no hardware configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radio: Option<RadioParams>,
}

impl DeviceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::Config(format!("failed to parse TOML: {e}")))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::Config(format!("failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::Config(format!("failed to write config file: {e}")))?;

        Ok(())
    }

    /// Generate a fresh identity for a device with no stored config:
    /// a random 4-byte address and a `user{N}` nickname.
    pub fn generate(mode: AddressMode) -> Self {
        let mut rng = rand::rng();
        let bytes: [u8; 4] = rng.random();
        DeviceConfig {
            address: mode.format(crate::core::address::Address::new(bytes)),
            nickname: format!("user{}", rng.random_range(1..=1000)),
            mode,
            key: None,
            peer: None,
            radio: None,
        }
    }

    /// Validate the configuration for common issues.
    ///
    /// Returns a list of validation errors. Empty list means the
    /// configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Err(e) = self.mode.parse(&self.address) {
            errors.push(format!("address: {e}"));
        }

        if self.nickname.is_empty() {
            errors.push("nickname must not be empty".to_string());
        }

        if let Some(key) = &self.key {
            match hex::decode(key) {
                Ok(bytes) if bytes.len() == KEY_LEN => {}
                Ok(bytes) => errors.push(format!(
                    "key: expected {KEY_LEN} bytes, got {}",
                    bytes.len()
                )),
                Err(e) => errors.push(format!("key: not valid hex: {e}")),
            }
        }

        if let Some(peer) = &self.peer {
            if let Err(e) = self.mode.parse(peer) {
                errors.push(format!("peer: {e}"));
            }
        }

        errors
    }

    /// Decode the channel key, if one is configured.
    pub fn key_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.key {
            None => Ok(None),
            Some(key) => {
                let bytes = hex::decode(key)
                    .map_err(|e| ProtocolError::Config(format!("key is not valid hex: {e}")))?;
                if bytes.len() != KEY_LEN {
                    return Err(ProtocolError::KeyLength {
                        expected: KEY_LEN,
                        got: bytes.len(),
                    });
                }
                Ok(Some(bytes))
            }
        }
    }
}
