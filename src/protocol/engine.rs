//! # Protocol Engine
//!
//! Orchestrates sending, receiving, acknowledgement handling, and
//! periodic self-announcement, and owns the message log the UI consumes.
//!
//! The engine is single-threaded and poll-driven: the UI calls [`poll`]
//! every scheduler tick and [`send_text`] on user action, both on the
//! same logical thread of control, so no locking exists anywhere. A
//! multi-threaded embedding must wrap the engine in a single mutex or
//! give it to one task and talk over a channel.
//!
//! Delivery is single-hop, best-effort, at-most-once: no retransmission,
//! no ack-wait state, no routing. The ack-requested flag only asks the
//! point-to-point peer for a one-shot reachability reply.
//!
//! [`poll`]: ProtocolEngine::poll
//! [`send_text`]: ProtocolEngine::send_text

use crate::config::{
    DeviceConfig, DEFAULT_HOPS, IDLE_ANNOUNCE_TICKS, MESSAGE_LOG_CAPACITY, PORT_NODEINFO,
    PORT_TEXT,
};
use crate::core::address::{Address, AddressMode};
use crate::core::cipher::CipherMode;
use crate::core::frame::{build_frame, FrameFlags, FrameHeader};
use crate::core::packet::{NodeInfo, Packet, User};
use crate::error::{ProtocolError, Result};
use crate::protocol::directory::NodeDirectory;
use crate::protocol::message::{Message, MessageBody};
use crate::transport::{RadioParams, Transceiver};
use rand::Rng;
use std::collections::VecDeque;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// Which protocol variant the engine speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolMode {
    /// Broadcast-capable mesh with rich packets and node-info discovery
    Mesh,
    /// Single fixed remote peer, plain-text payloads, link-probe replies
    PointToPoint { peer: Address },
}

/// The message-exchange engine. One instance per device session owns
/// all mutable protocol state; nothing lives in globals.
pub struct ProtocolEngine<T: Transceiver> {
    radio: T,
    address: Address,
    nickname: String,
    address_mode: AddressMode,
    mode: ProtocolMode,
    cipher: CipherMode,
    radio_params: Option<RadioParams>,
    simulation: bool,
    messages: VecDeque<Message>,
    idle_ticks: u32,
    directory: NodeDirectory,
}

impl<T: Transceiver> ProtocolEngine<T> {
    /// A mesh-mode, plaintext, hex-addressed engine. Adjust with the
    /// `with_*` builders before calling [`initialize`].
    ///
    /// [`initialize`]: ProtocolEngine::initialize
    pub fn new(radio: T, address: Address, nickname: impl Into<String>) -> Self {
        ProtocolEngine {
            radio,
            address,
            nickname: nickname.into(),
            address_mode: AddressMode::Hex,
            mode: ProtocolMode::Mesh,
            cipher: CipherMode::Plaintext,
            radio_params: None,
            simulation: false,
            messages: VecDeque::new(),
            idle_ticks: 0,
            directory: NodeDirectory::new(),
        }
    }

    /// Build an engine from a persisted device config.
    pub fn from_config(radio: T, config: &DeviceConfig) -> Result<Self> {
        let address = config.mode.parse(&config.address)?;
        let cipher = CipherMode::from_key(config.key_bytes()?.as_deref())?;
        let mode = match &config.peer {
            Some(peer) => ProtocolMode::PointToPoint {
                peer: config.mode.parse(peer)?,
            },
            None => ProtocolMode::Mesh,
        };

        let mut engine = Self::new(radio, address, config.nickname.clone())
            .with_address_mode(config.mode)
            .with_mode(mode)
            .with_cipher(cipher);
        engine.radio_params = config.radio.clone();
        Ok(engine)
    }

    pub fn with_mode(mut self, mode: ProtocolMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cipher(mut self, cipher: CipherMode) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn with_address_mode(mut self, mode: AddressMode) -> Self {
        self.address_mode = mode;
        self
    }

    pub fn with_radio_params(mut self, params: RadioParams) -> Self {
        self.radio_params = Some(params);
        self
    }

    /// Configure the radio and, in mesh mode, announce ourselves.
    ///
    /// Without radio parameters the engine marks itself as running in
    /// simulation mode and skips hardware configuration. Configuration
    /// failures here are the only fatal errors in the engine; everything
    /// on the receive path is drop-and-continue.
    pub fn initialize(&mut self) -> Result<()> {
        match self.radio_params.clone() {
            Some(params) => {
                self.radio.configure(&params)?;
            }
            None => {
                self.simulation = true;
                info!("no radio parameters configured, running in simulation mode");
            }
        }
        self.radio.listen()?;

        if self.mode == ProtocolMode::Mesh {
            if let Err(e) = self.announce() {
                warn!(error = %e, "initial announcement failed");
            }
        }
        Ok(())
    }

    /// Send a text message.
    ///
    /// Builds a frame with a fresh random message id, the ack-requested
    /// flag, and hop count 3, encrypts it if a key is configured, and
    /// hands it to the radio. The sent message is appended to the log so
    /// the UI renders outbound and inbound traffic identically.
    ///
    /// At-most-once: a transceiver failure surfaces as an error and the
    /// frame is not retried.
    pub fn send_text(&mut self, dest: Address, text: &str) -> Result<Message> {
        let msg_id: u32 = rand::rng().random();
        let flags = FrameFlags::new(DEFAULT_HOPS, true);

        let payload = match self.mode {
            ProtocolMode::Mesh => Packet::text(text).encode(),
            ProtocolMode::PointToPoint { .. } => text.as_bytes().to_vec(),
        };

        self.transmit(dest, msg_id, flags, payload)?;
        debug!(dest = %dest, msg_id, bytes = text.len(), "text message sent");

        let message = Message {
            dst: dest,
            src: self.address,
            id: msg_id,
            flags,
            snr: self.radio.last_snr(),
            rssi: self.radio.last_rssi(),
            timestamp: SystemTime::now(),
            body: MessageBody::Text(text.to_string()),
        };
        self.push_message(message.clone());
        Ok(message)
    }

    /// One scheduler tick: process at most one pending frame, or count
    /// an idle tick and re-announce after enough of them.
    ///
    /// Returns true iff UI-visible state changed (new message or join
    /// notice). Never fails: receive-path errors are logged and the
    /// frame dropped.
    pub fn poll(&mut self) -> bool {
        if self.radio.rx_ready() {
            return match self.process_frame() {
                Ok(changed) => changed,
                Err(e) => {
                    self.report_drop(&e);
                    false
                }
            };
        }

        self.idle_ticks += 1;
        if self.idle_ticks > IDLE_ANNOUNCE_TICKS {
            self.idle_ticks = 0;
            if self.mode == ProtocolMode::Mesh {
                debug!("idle threshold reached, re-announcing");
                if let Err(e) = self.announce() {
                    warn!(error = %e, "periodic announcement failed");
                }
            }
        }
        false
    }

    /// The accumulated message log. Messages pile up until the consumer
    /// calls [`clear_messages`]; the log is only capacity-bounded as a
    /// backstop against a consumer that never drains it.
    ///
    /// [`clear_messages`]: ProtocolEngine::clear_messages
    pub fn messages(&self) -> &VecDeque<Message> {
        &self.messages
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Format an address in this deployment's textual form.
    pub fn format_address(&self, address: Address) -> String {
        self.address_mode.format(address)
    }

    /// Parse address text in this deployment's textual form.
    pub fn parse_address(&self, text: &str) -> Result<Address> {
        self.address_mode.parse(text)
    }

    /// Display name for an address: our nickname for ourselves, the
    /// directory binding for known nodes, the formatted address otherwise.
    pub fn display_name(&self, address: Address) -> String {
        if address == self.address {
            return self.nickname.clone();
        }
        self.directory.display(address, self.address_mode)
    }

    /// Adopt a new nickname and, in mesh mode, announce it immediately.
    pub fn set_nickname(&mut self, nickname: impl Into<String>) {
        self.nickname = nickname.into();
        if self.mode == ProtocolMode::Mesh {
            if let Err(e) = self.announce() {
                warn!(error = %e, "nickname announcement failed");
            }
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn mode(&self) -> ProtocolMode {
        self.mode
    }

    pub fn directory(&self) -> &NodeDirectory {
        &self.directory
    }

    /// True when `initialize` found no radio parameters.
    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    // ---- internals ----

    /// Broadcast a node-info announcement for ourselves.
    fn announce(&mut self) -> Result<()> {
        let short_name: String = self
            .nickname
            .chars()
            .take(2)
            .collect::<String>()
            .to_uppercase();

        let info = NodeInfo {
            num: self.address.node_num(),
            user: User {
                id: self.nickname.clone(),
                long_name: self.nickname.clone(),
                short_name,
                macaddr: self.address.as_bytes().to_vec(),
                hw_model: None,
                is_licensed: false,
            },
            position: None,
            snr: self.radio.last_snr(),
            last_heard: None,
            device_metrics: None,
        };

        let msg_id: u32 = rand::rng().random();
        debug!(msg_id, "broadcasting node info");
        self.transmit(
            Address::BROADCAST,
            msg_id,
            FrameFlags::new(DEFAULT_HOPS, false),
            Packet::node_info(&info).encode(),
        )
    }

    /// Encrypt (if keyed), frame, and hand one payload to the radio.
    fn transmit(
        &mut self,
        dest: Address,
        msg_id: u32,
        flags: FrameFlags,
        mut payload: Vec<u8>,
    ) -> Result<()> {
        self.cipher.apply(self.address, msg_id, &mut payload);
        let header = FrameHeader {
            dest,
            src: self.address,
            msg_id,
            flags,
        };
        self.radio.send(&build_frame(&header, &payload))
    }

    /// Receive pipeline, one pass: pull, admit, decrypt, decode, dispatch.
    fn process_frame(&mut self) -> Result<bool> {
        let raw = self.radio.receive()?.ok_or_else(|| {
            ProtocolError::Receiver("radio signalled rx-ready but returned no frame".into())
        })?;

        let (header, payload) = FrameHeader::parse(&raw)?;

        // Admission filter: our address or broadcast only. Addresses are
        // unauthenticated, so this is traffic hygiene, not security.
        if header.dest != self.address && !header.dest.is_broadcast() {
            return Err(ProtocolError::AddressMismatch);
        }

        let mut payload = payload.to_vec();
        self.cipher.apply(header.src, header.msg_id, &mut payload);

        match self.mode {
            ProtocolMode::Mesh => self.dispatch_mesh(header, payload),
            ProtocolMode::PointToPoint { .. } => self.dispatch_p2p(header, payload),
        }
    }

    fn dispatch_mesh(&mut self, header: FrameHeader, payload: Vec<u8>) -> Result<bool> {
        let packet = Packet::decode(&payload)?;

        match packet.portnum {
            PORT_TEXT => {
                let text = String::from_utf8_lossy(&packet.payload).into_owned();
                debug!(src = %header.src, msg_id = header.msg_id, "text message received");
                self.push_received(&header, MessageBody::Text(text));
                Ok(true)
            }
            PORT_NODEINFO => {
                let info = NodeInfo::decode(&packet.payload)?;
                let changed = self.record_node(&header, &info);
                // reciprocal discovery: let whoever announced learn us too
                if let Err(e) = self.announce() {
                    warn!(error = %e, "reciprocal announcement failed");
                }
                Ok(changed)
            }
            other => {
                debug!(portnum = other, src = %header.src, "packet with unhandled portnum");
                self.push_received(&header, MessageBody::Packet(packet));
                Ok(true)
            }
        }
    }

    /// Record a node-info sighting; returns true when the directory
    /// binding changed and a join notice was emitted.
    fn record_node(&mut self, header: &FrameHeader, info: &NodeInfo) -> bool {
        let address = match Address::from_slice(&info.user.macaddr) {
            Ok(address) => address,
            Err(_) => {
                debug!(
                    len = info.user.macaddr.len(),
                    "node info with malformed address, ignored"
                );
                return false;
            }
        };

        let registration = self.directory.register(address, &info.user.id);
        if !registration.is_change() {
            return false;
        }

        info!(%address, nickname = %info.user.id, "node joined");
        let notice = format!(
            "-!- {} [{}@{}] has joined.",
            info.user.id,
            info.user.short_name,
            hex::encode(&info.user.macaddr)
        );
        self.push_received(&FrameHeader { src: address, ..*header }, MessageBody::Notice(notice));
        true
    }

    fn dispatch_p2p(&mut self, header: FrameHeader, payload: Vec<u8>) -> Result<bool> {
        let body = MessageBody::from_p2p_payload(&payload);
        let wants_reply = header.flags.ack_requested && !body.is_probe();
        self.push_received(&header, body);

        if wants_reply {
            // One-shot reachability reply with our view of the link.
            // Marked ack-not-requested so the peer cannot reply to the
            // reply and start a storm.
            let reply = MessageBody::probe_wire(self.radio.last_rssi(), self.radio.last_snr());
            let msg_id: u32 = rand::rng().random();
            if let Err(e) = self.transmit(
                header.src,
                msg_id,
                FrameFlags::new(DEFAULT_HOPS, false),
                reply,
            ) {
                warn!(error = %e, "link probe reply failed");
            }
        }
        Ok(true)
    }

    fn push_received(&mut self, header: &FrameHeader, body: MessageBody) {
        let message = Message {
            dst: header.dest,
            src: header.src,
            id: header.msg_id,
            flags: header.flags,
            snr: self.radio.last_snr(),
            rssi: self.radio.last_rssi(),
            timestamp: SystemTime::now(),
            body,
        };
        self.push_message(message);
    }

    fn push_message(&mut self, message: Message) {
        if self.messages.len() >= MESSAGE_LOG_CAPACITY {
            warn!("message log full, evicting oldest message");
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    fn report_drop(&self, err: &ProtocolError) {
        match err {
            ProtocolError::AddressMismatch => trace!("dropped frame for another node"),
            ProtocolError::Decode(reason) => debug!(reason, "dropped undecodable frame"),
            ProtocolError::Receiver(_) | ProtocolError::ShortFrame(_) => {
                warn!(error = %err, "receiver error, frame dropped");
            }
            other => warn!(error = %other, "unexpected receive failure, frame dropped"),
        }
    }
}
