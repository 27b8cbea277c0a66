//! # Error Types
//!
//! Error handling for the mesh chat protocol.
//!
//! The taxonomy mirrors how errors are consumed: address parsing failures
//! surface to the caller, transmit failures surface from `send_text`, and
//! everything that can go wrong while receiving is non-fatal: the
//! engine logs a diagnostic, drops the frame, and keeps polling. A
//! shared radio band is full of noise and foreign traffic, so decode
//! failures on receive are an expected steady-state condition, not a bug.
//!
//! ## Error Categories
//! - **Caller errors**: bad address text, bad key length, bad configuration
//! - **Transmit errors**: the transceiver rejected a send
//! - **Receive errors**: short frames, foreign destinations, undecodable
//!   payloads; always dropped, never fatal
//!
//! All errors implement `std::error::Error` for interoperability.

use std::io;
use thiserror::Error;

/// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Address text did not parse under the configured mode.
    /// Surfaced to the caller, never silent.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The radio reported a receive failure or returned nothing after
    /// signalling rx-ready. Logged and dropped.
    #[error("receiver error: {0}")]
    Receiver(String),

    /// Received frame shorter than the 16-byte header. Dropped.
    #[error("short frame: {0} bytes")]
    ShortFrame(usize),

    /// Frame destination is neither our address nor broadcast. Expected
    /// at high frequency on a shared medium; silently dropped.
    #[error("frame not addressed to us")]
    AddressMismatch,

    /// Payload codec failure, before or after decryption. The expected
    /// outcome of receiving noise or a foreign protocol on-frequency.
    #[error("decode error: {0}")]
    Decode(String),

    /// The transceiver rejected a transmission. Surfaced from `send_text`
    /// as a failed result; no automatic retry (at-most-once).
    #[error("send error: {0}")]
    Send(String),

    /// Pre-shared key has the wrong length for the stream cipher.
    #[error("key must be {expected} bytes, got {got}")]
    KeyLength { expected: usize, got: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ProtocolError {
    /// True for errors the receive path swallows: the poll loop logs them
    /// and keeps running. Everything else propagates to the caller.
    pub fn is_droppable(&self) -> bool {
        matches!(
            self,
            ProtocolError::Receiver(_)
                | ProtocolError::ShortFrame(_)
                | ProtocolError::AddressMismatch
                | ProtocolError::Decode(_)
        )
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_path_errors_are_droppable() {
        assert!(ProtocolError::Receiver("radio returned None".into()).is_droppable());
        assert!(ProtocolError::ShortFrame(3).is_droppable());
        assert!(ProtocolError::AddressMismatch.is_droppable());
        assert!(ProtocolError::Decode("truncated varint".into()).is_droppable());
    }

    #[test]
    fn test_caller_errors_are_not_droppable() {
        assert!(!ProtocolError::InvalidAddress("1.2.3".into()).is_droppable());
        assert!(!ProtocolError::Send("tx busy".into()).is_droppable());
        assert!(!ProtocolError::Config("missing address".into()).is_droppable());
        assert!(!ProtocolError::KeyLength {
            expected: 16,
            got: 7
        }
        .is_droppable());
    }
}
