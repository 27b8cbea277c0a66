//! # Frame Wire Layout
//!
//! The raw radio frame: a fixed 16-byte header followed by the payload.
//!
//! ## Wire Format
//! ```text
//! [dest(4)] [src(4)] [msg_id(4, BE)] [flags(4, BE)] [payload(N)]
//! ```
//!
//! Payload length is implied by the transport: the radio hands us a
//! whole frame, so nothing on the wire carries a length field. The
//! `msg_id` is a random 32-bit value, collision-tolerant rather than
//! sequential; frames carry no ordering guarantee.
//!
//! `flags` uses the low 3 bits for the hop count (0–7) and bit 3 for
//! ack-requested. The upper bits are reserved and written as zero.

use crate::config::{FLAG_ACK_REQUESTED, HEADER_LEN, HOPS_MASK, MAX_HOPS};
use crate::core::address::Address;
use crate::error::{ProtocolError, Result};
use bytes::{BufMut, BytesMut};

/// Decoded frame flags word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFlags {
    /// Hop count, 0–7
    pub hops: u8,
    /// Whether the sender asked for an acknowledgement
    pub ack_requested: bool,
}

impl FrameFlags {
    /// Build a flags word, clamping the hop count into its 3 bits.
    pub fn new(hops: u8, ack_requested: bool) -> Self {
        FrameFlags {
            hops: hops.min(MAX_HOPS),
            ack_requested,
        }
    }

    /// Encode to the wire word: `hops | 0b1000` when ack requested,
    /// `hops & 0b0111` otherwise.
    pub fn encode(self) -> u32 {
        let hops = u32::from(self.hops) & HOPS_MASK;
        if self.ack_requested {
            hops | FLAG_ACK_REQUESTED
        } else {
            hops
        }
    }

    /// Decode from the wire word, ignoring reserved upper bits.
    pub fn decode(raw: u32) -> Self {
        FrameFlags {
            hops: (raw & HOPS_MASK) as u8,
            ack_requested: raw & FLAG_ACK_REQUESTED != 0,
        }
    }
}

/// The fixed 16-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub dest: Address,
    pub src: Address,
    pub msg_id: u32,
    pub flags: FrameFlags,
}

impl FrameHeader {
    /// Append the 16 header bytes to `buf`.
    pub fn write(&self, buf: &mut BytesMut) {
        buf.put_slice(self.dest.as_bytes());
        buf.put_slice(self.src.as_bytes());
        buf.put_u32(self.msg_id);
        buf.put_u32(self.flags.encode());
    }

    /// Split a received frame into header and payload.
    ///
    /// Fails with [`ProtocolError::ShortFrame`] when fewer than 16 bytes
    /// arrived; truncated frames carry nothing usable.
    pub fn parse(frame: &[u8]) -> Result<(FrameHeader, &[u8])> {
        if frame.len() < HEADER_LEN {
            return Err(ProtocolError::ShortFrame(frame.len()));
        }

        let dest = Address::from_slice(&frame[0..4])?;
        let src = Address::from_slice(&frame[4..8])?;
        let msg_id = u32::from_be_bytes([frame[8], frame[9], frame[10], frame[11]]);
        let raw_flags = u32::from_be_bytes([frame[12], frame[13], frame[14], frame[15]]);

        let header = FrameHeader {
            dest,
            src,
            msg_id,
            flags: FrameFlags::decode(raw_flags),
        };
        Ok((header, &frame[HEADER_LEN..]))
    }
}

/// Compose a complete frame: header followed by (already encrypted) payload.
pub fn build_frame(header: &FrameHeader, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    header.write(&mut buf);
    buf.put_slice(payload);
    buf.to_vec()
}
