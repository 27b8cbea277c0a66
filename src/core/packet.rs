//! # Packet Codec
//!
//! The structured application payload carried inside a frame, and its
//! compact tagged binary form.
//!
//! The wire form is a minimal schema-driven serializer, protobuf-compatible
//! at the byte level for the fields we define: varint keys
//! (`field_number << 3 | wire_type`), varint scalars, length-delimited
//! bytes/strings/submessages, and fixed32 floats. It is deliberately not a
//! generic format: only the three record shapes below exist.
//!
//! Decoding is forward-compatible: unknown field numbers are skipped, and
//! unknown port numbers decode to a packet with an opaque payload. Absent
//! optional fields are omitted from the wire entirely, never written as
//! zero sentinels.
//!
//! ## Records
//! - **Packet**: the tagged envelope; `portnum` selects interpretation
//! - **NodeInfo**: a node-info announcement (`portnum` 4)
//! - **User**: identity block nested inside NodeInfo

use crate::config::{PORT_NODEINFO, PORT_TEXT};
use crate::error::{ProtocolError, Result};

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Decoded application payload. `portnum` selects interpretation:
/// 1 = plain UTF-8 text, 4 = node-info announcement, anything else is
/// carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub portnum: u32,
    pub payload: Vec<u8>,
    pub want_response: Option<bool>,
    pub dest: Option<u32>,
    pub source: Option<u32>,
    pub request_id: Option<u32>,
    pub reply_id: Option<u32>,
    pub emoji: Option<u32>,
}

impl Packet {
    /// A plain text packet: UTF-8 bytes tagged `portnum` 1.
    pub fn text(text: &str) -> Self {
        Packet {
            portnum: PORT_TEXT,
            payload: text.as_bytes().to_vec(),
            ..Packet::default()
        }
    }

    /// A node-info announcement packet: encoded NodeInfo tagged `portnum` 4.
    pub fn node_info(info: &NodeInfo) -> Self {
        Packet {
            portnum: PORT_NODEINFO,
            payload: info.encode(),
            ..Packet::default()
        }
    }

    /// Encode to the tagged wire form. Optional fields set to `None` are
    /// omitted from the output.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.payload.len() + 16);
        put_varint_field(&mut buf, 1, u64::from(self.portnum));
        put_len_field(&mut buf, 2, &self.payload);
        if let Some(v) = self.want_response {
            put_varint_field(&mut buf, 3, u64::from(v));
        }
        if let Some(v) = self.dest {
            put_varint_field(&mut buf, 4, u64::from(v));
        }
        if let Some(v) = self.source {
            put_varint_field(&mut buf, 5, u64::from(v));
        }
        if let Some(v) = self.request_id {
            put_varint_field(&mut buf, 6, u64::from(v));
        }
        if let Some(v) = self.reply_id {
            put_varint_field(&mut buf, 7, u64::from(v));
        }
        if let Some(v) = self.emoji {
            put_varint_field(&mut buf, 8, u64::from(v));
        }
        buf
    }

    /// Decode from the tagged wire form.
    ///
    /// Fails with [`ProtocolError::Decode`] on truncated or malformed
    /// input. Never fails for merely-unexpected port numbers.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let mut packet = Packet::default();

        while !reader.is_empty() {
            let (field, wire) = reader.key()?;
            match (field, wire) {
                (1, WIRE_VARINT) => packet.portnum = reader.varint_u32()?,
                (2, WIRE_LEN) => packet.payload = reader.bytes()?.to_vec(),
                (3, WIRE_VARINT) => packet.want_response = Some(reader.varint()? != 0),
                (4, WIRE_VARINT) => packet.dest = Some(reader.varint_u32()?),
                (5, WIRE_VARINT) => packet.source = Some(reader.varint_u32()?),
                (6, WIRE_VARINT) => packet.request_id = Some(reader.varint_u32()?),
                (7, WIRE_VARINT) => packet.reply_id = Some(reader.varint_u32()?),
                (8, WIRE_VARINT) => packet.emoji = Some(reader.varint_u32()?),
                _ => reader.skip(wire)?,
            }
        }

        Ok(packet)
    }
}

/// Identity block nested inside a node-info announcement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct User {
    /// Display identifier; what the mesh shows as the nickname
    pub id: String,
    pub long_name: String,
    /// Two-character short form, upper-cased by convention
    pub short_name: String,
    /// The announcing node's 4-byte address
    pub macaddr: Vec<u8>,
    /// Hardware model blob; carried opaquely
    pub hw_model: Option<Vec<u8>>,
    pub is_licensed: bool,
}

impl User {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        put_len_field(buf, 1, self.id.as_bytes());
        put_len_field(buf, 2, self.long_name.as_bytes());
        put_len_field(buf, 3, self.short_name.as_bytes());
        put_len_field(buf, 4, &self.macaddr);
        if let Some(hw) = &self.hw_model {
            put_len_field(buf, 5, hw);
        }
        put_varint_field(buf, 6, u64::from(self.is_licensed));
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let mut user = User::default();

        while !reader.is_empty() {
            let (field, wire) = reader.key()?;
            match (field, wire) {
                (1, WIRE_LEN) => user.id = reader.string()?,
                (2, WIRE_LEN) => user.long_name = reader.string()?,
                (3, WIRE_LEN) => user.short_name = reader.string()?,
                (4, WIRE_LEN) => user.macaddr = reader.bytes()?.to_vec(),
                (5, WIRE_LEN) => user.hw_model = Some(reader.bytes()?.to_vec()),
                (6, WIRE_VARINT) => user.is_licensed = reader.varint()? != 0,
                _ => reader.skip(wire)?,
            }
        }

        Ok(user)
    }
}

/// A node-info announcement: who a node is and how it was heard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeInfo {
    /// Node number: the address interpreted as a little-endian integer
    pub num: u64,
    pub user: User,
    /// Position blob; carried opaquely
    pub position: Option<Vec<u8>>,
    /// Signal-to-noise ratio of the announcing node's last reception
    pub snr: f32,
    pub last_heard: Option<u32>,
    /// Device metrics blob; carried opaquely
    pub device_metrics: Option<Vec<u8>>,
}

impl NodeInfo {
    /// Encode to the tagged wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        put_varint_field(&mut buf, 1, self.num);

        let mut user = Vec::with_capacity(48);
        self.user.encode_into(&mut user);
        put_len_field(&mut buf, 2, &user);

        if let Some(pos) = &self.position {
            put_len_field(&mut buf, 3, pos);
        }
        put_fixed32_field(&mut buf, 4, self.snr.to_le_bytes());
        if let Some(heard) = self.last_heard {
            put_varint_field(&mut buf, 5, u64::from(heard));
        }
        if let Some(metrics) = &self.device_metrics {
            put_len_field(&mut buf, 6, metrics);
        }
        buf
    }

    /// Decode from the tagged wire form.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let mut info = NodeInfo::default();

        while !reader.is_empty() {
            let (field, wire) = reader.key()?;
            match (field, wire) {
                (1, WIRE_VARINT) => info.num = reader.varint()?,
                (2, WIRE_LEN) => info.user = User::decode(reader.bytes()?)?,
                (3, WIRE_LEN) => info.position = Some(reader.bytes()?.to_vec()),
                (4, WIRE_FIXED32) => info.snr = f32::from_le_bytes(reader.fixed32()?),
                (5, WIRE_VARINT) => info.last_heard = Some(reader.varint_u32()?),
                (6, WIRE_LEN) => info.device_metrics = Some(reader.bytes()?.to_vec()),
                _ => reader.skip(wire)?,
            }
        }

        Ok(info)
    }
}

// ---- wire primitives ----

fn put_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

fn put_key(buf: &mut Vec<u8>, field: u32, wire: u8) {
    put_varint(buf, (u64::from(field) << 3) | u64::from(wire));
}

fn put_varint_field(buf: &mut Vec<u8>, field: u32, value: u64) {
    put_key(buf, field, WIRE_VARINT);
    put_varint(buf, value);
}

fn put_len_field(buf: &mut Vec<u8>, field: u32, bytes: &[u8]) {
    put_key(buf, field, WIRE_LEN);
    put_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn put_fixed32_field(buf: &mut Vec<u8>, field: u32, bytes: [u8; 4]) {
    put_key(buf, field, WIRE_FIXED32);
    buf.extend_from_slice(&bytes);
}

/// Bounds-checked cursor over the wire bytes. Every failure maps to
/// [`ProtocolError::Decode`] so callers can drop the frame uniformly.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| ProtocolError::Decode("truncated varint".into()))?;
            self.pos += 1;

            if shift >= 64 {
                return Err(ProtocolError::Decode("varint overflow".into()));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    fn varint_u32(&mut self) -> Result<u32> {
        u32::try_from(self.varint()?)
            .map_err(|_| ProtocolError::Decode("varint exceeds u32 field".into()))
    }

    fn key(&mut self) -> Result<(u32, u8)> {
        let key = self.varint()?;
        let field = u32::try_from(key >> 3)
            .map_err(|_| ProtocolError::Decode("field number overflow".into()))?;
        Ok((field, (key & 0x07) as u8))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                ProtocolError::Decode(format!(
                    "length {len} exceeds remaining {}",
                    self.buf.len() - self.pos
                ))
            })?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.varint()?;
        let len = usize::try_from(len)
            .map_err(|_| ProtocolError::Decode("length overflow".into()))?;
        self.take(len)
    }

    fn string(&mut self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ProtocolError::Decode(format!("invalid UTF-8: {e}")))
    }

    fn fixed32(&mut self) -> Result<[u8; 4]> {
        let slice = self.take(4)?;
        Ok([slice[0], slice[1], slice[2], slice[3]])
    }

    fn skip(&mut self, wire: u8) -> Result<()> {
        match wire {
            WIRE_VARINT => {
                self.varint()?;
            }
            WIRE_FIXED64 => {
                self.take(8)?;
            }
            WIRE_LEN => {
                self.bytes()?;
            }
            WIRE_FIXED32 => {
                self.take(4)?;
            }
            other => {
                return Err(ProtocolError::Decode(format!("unknown wire type {other}")));
            }
        }
        Ok(())
    }
}
