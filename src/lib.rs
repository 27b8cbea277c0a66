//! # meshchat-protocol
//!
//! Frame protocol and message-exchange engine for handheld, radio-linked
//! mesh chat devices.
//!
//! The crate turns short text or structured messages into addressed,
//! optionally encrypted radio frames and back, and keeps the minimal
//! node bookkeeping a mesh chat needs: periodic self-announcement,
//! nickname resolution, and duplicate-join suppression. The physical
//! radio and the terminal UI live outside; the engine talks to the radio
//! through the [`transport::Transceiver`] trait and hands the UI plain
//! [`protocol::message::Message`] records.
//!
//! ## Layers
//! - **[`core`]**: addresses, the 16-byte frame header, the tagged
//!   payload codec, and AES-128-CTR frame encryption
//! - **[`protocol`]**: the poll-driven engine, the node directory, and
//!   the message log
//! - **[`transport`]**: the transceiver contract plus an in-memory
//!   loopback medium for tests and simulation
//! - **[`config`]**: protocol constants and the persisted device record
//!
//! ## Example
//! ```
//! use meshchat_protocol::core::address::Address;
//! use meshchat_protocol::protocol::engine::ProtocolEngine;
//! use meshchat_protocol::transport::LoopbackMedium;
//!
//! let medium = LoopbackMedium::new();
//! let mut alice = ProtocolEngine::new(medium.attach(), Address::new([1, 1, 1, 1]), "alice");
//! let mut bob = ProtocolEngine::new(medium.attach(), Address::new([2, 2, 2, 2]), "bob");
//!
//! alice.send_text(Address::BROADCAST, "hello mesh")?;
//! assert!(bob.poll());
//! assert_eq!(bob.messages().len(), 1);
//! # Ok::<(), meshchat_protocol::error::ProtocolError>(())
//! ```
//!
//! ## Concurrency
//! Single-threaded and cooperative: `poll` and `send_text` run on one
//! logical thread of control, so the engine holds no locks. Embeddings
//! with separate UI and radio threads must serialize access themselves.

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;

pub use crate::core::address::{Address, AddressMode};
pub use crate::core::cipher::{CipherMode, FrameCipher};
pub use crate::core::frame::{FrameFlags, FrameHeader};
pub use crate::core::packet::{NodeInfo, Packet, User};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::directory::{NodeDirectory, Registration};
pub use crate::protocol::engine::{ProtocolEngine, ProtocolMode};
pub use crate::protocol::message::{Message, MessageBody};
pub use crate::transport::{RadioParams, Transceiver};
