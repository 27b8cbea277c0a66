//! # Node Addresses
//!
//! The 4-byte node address used throughout the protocol, plus the two
//! textual forms it is written in.
//!
//! Radio-mesh deployments write addresses as 8 hex digits (`a1b2c3d4`);
//! simple point-to-point deployments write them dotted-decimal
//! (`1.2.3.4`). [`AddressMode`] selects which form `parse`/`format`
//! speak, so the rest of the protocol never cares about text.
//!
//! Addresses are unauthenticated; destination filtering on receive is
//! traffic hygiene, not a security boundary.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw 4-byte node address. Equality is byte-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 4]);

impl Address {
    /// Address length in bytes on the wire
    pub const LEN: usize = 4;

    /// The broadcast address: all bits set. Frames sent here are
    /// admitted by every node on the channel.
    pub const BROADCAST: Address = Address([0xFF; 4]);

    pub const fn new(bytes: [u8; 4]) -> Self {
        Address(bytes)
    }

    /// Build an address from a byte slice, rejecting wrong lengths.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 4] = bytes
            .try_into()
            .map_err(|_| ProtocolError::InvalidAddress(format!("{} bytes", bytes.len())))?;
        Ok(Address(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// True iff all 4 bytes equal `0xFF`.
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 4]
    }

    /// The address as a node number (little-endian), as carried in the
    /// `num` field of a node-info announcement.
    pub fn node_num(&self) -> u64 {
        u32::from_le_bytes(self.0) as u64
    }
}

impl fmt::Display for Address {
    /// Hex form; logs and diagnostics use this regardless of deployment mode.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Which textual form addresses are parsed from and formatted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    /// 8 hex digits, zero-padded, lowercase on output (`00a1ff03`)
    #[default]
    Hex,
    /// 4 dot-separated decimal octets (`1.2.3.4`)
    Dotted,
}

impl AddressMode {
    /// Parse address text under this mode.
    ///
    /// Fails with [`ProtocolError::InvalidAddress`] on wrong token count,
    /// out-of-range octets, or non-hex digits.
    pub fn parse(&self, text: &str) -> Result<Address> {
        match self {
            AddressMode::Hex => {
                if text.len() != 8 {
                    return Err(ProtocolError::InvalidAddress(format!(
                        "expected 8 hex digits, got {:?}",
                        text
                    )));
                }
                let bytes = hex::decode(text)
                    .map_err(|e| ProtocolError::InvalidAddress(format!("{text:?}: {e}")))?;
                Address::from_slice(&bytes)
            }
            AddressMode::Dotted => {
                let octets: Vec<&str> = text.split('.').collect();
                if octets.len() != 4 {
                    return Err(ProtocolError::InvalidAddress(format!(
                        "expected 4 octets, got {} in {:?}",
                        octets.len(),
                        text
                    )));
                }
                let mut bytes = [0u8; 4];
                for (slot, octet) in bytes.iter_mut().zip(&octets) {
                    *slot = octet.parse::<u8>().map_err(|_| {
                        ProtocolError::InvalidAddress(format!("bad octet {octet:?} in {text:?}"))
                    })?;
                }
                Ok(Address(bytes))
            }
        }
    }

    /// Format an address under this mode. Deterministic and zero-padded;
    /// `parse(format(a)) == a` for every address.
    pub fn format(&self, address: Address) -> String {
        match self {
            AddressMode::Hex => hex::encode(address.0),
            AddressMode::Dotted => {
                let [a, b, c, d] = address.0;
                format!("{a}.{b}.{c}.{d}")
            }
        }
    }
}
