//! Engine-level message records handed to the UI.
//!
//! Outbound and inbound traffic land in the same log with the same shape,
//! so the UI renders a conversation without caring who sent what. The
//! point-to-point link probe is its own variant rather than a string
//! prefix: user-typed text that happens to start with `!|` must never be
//! mistaken for a probe reply.

use crate::core::address::Address;
use crate::core::frame::FrameFlags;
use crate::core::packet::Packet;
use std::time::SystemTime;

/// Reserved wire prefix of a point-to-point link probe reply.
const PROBE_PREFIX: &str = "!|";

/// What a message carries.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// Plain chat text
    Text(String),
    /// A decoded rich packet with a port number we do not interpret
    Packet(Packet),
    /// Synthetic system notice (joins); never sent on the wire
    Notice(String),
    /// Point-to-point reachability reply carrying the peer's view of our
    /// signal quality
    LinkProbe { rssi: i32, snr: f32 },
}

impl MessageBody {
    /// Interpret a point-to-point payload: a probe reply if it carries
    /// the reserved prefix and parses, literal text otherwise.
    ///
    /// A payload that starts with `!|` but does not parse as a probe is
    /// deliberately classified as text, so it still counts as ordinary
    /// traffic and still earns a reachability reply. Only a well-formed
    /// probe suppresses the auto-reply; the prefix alone proves nothing
    /// about intent.
    pub fn from_p2p_payload(payload: &[u8]) -> MessageBody {
        let text = String::from_utf8_lossy(payload);
        if let Some(rest) = text.strip_prefix(PROBE_PREFIX) {
            let mut parts = rest.splitn(2, '|');
            if let (Some(rssi), Some(snr)) = (parts.next(), parts.next()) {
                if let (Ok(rssi), Ok(snr)) = (rssi.parse::<i32>(), snr.parse::<f32>()) {
                    return MessageBody::LinkProbe { rssi, snr };
                }
            }
        }
        MessageBody::Text(text.into_owned())
    }

    /// Wire form of a probe reply. Kept prefix-compatible with peers
    /// that still parse the reply as text.
    pub fn probe_wire(rssi: i32, snr: f32) -> Vec<u8> {
        format!("{PROBE_PREFIX}{rssi}|{snr}").into_bytes()
    }

    pub fn is_probe(&self) -> bool {
        matches!(self, MessageBody::LinkProbe { .. })
    }
}

/// One entry in the engine's message log.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub dst: Address,
    pub src: Address,
    pub id: u32,
    pub flags: FrameFlags,
    /// Signal metrics of the reception this message arrived on (or the
    /// radio's last-known values for outbound messages)
    pub snr: f32,
    pub rssi: i32,
    pub timestamp: SystemTime,
    pub body: MessageBody,
}
