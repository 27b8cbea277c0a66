//! # Protocol Layer
//!
//! The message-exchange engine and its supporting state.
//!
//! ## Components
//! - **Engine**: poll-driven send/receive orchestration and the message log
//! - **Directory**: address-to-nickname bindings with join-event dedup
//! - **Message**: the engine-level records handed to the UI

pub mod directory;
pub mod engine;
pub mod message;

#[cfg(test)]
mod tests;
