//! # Transport Layer
//!
//! The transceiver contract the engine drives, and an in-memory
//! implementation for tests and radio-less simulation.
//!
//! The physical radio is an external collaborator: the engine only needs
//! a non-blocking receive probe, a synchronous send, and the signal
//! metrics of the last reception. `send` may block for the duration of a
//! radio transmission, so the engine only calls it in direct response to
//! a user action or a bounded periodic tick, never in a hot loop.

pub mod loopback;

pub use loopback::{LoopbackMedium, LoopbackRadio};

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Radio configuration handed to the transceiver at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioParams {
    pub frequency_hz: u32,
    pub bandwidth_hz: u32,
    /// LoRa coding rate denominator (5 means 4/5)
    pub coding_rate: u8,
    pub spreading_factor: u8,
    pub preamble_len: u16,
    pub tx_power_dbm: i8,
    pub low_data_rate_optimize: bool,
}

impl Default for RadioParams {
    fn default() -> Self {
        RadioParams {
            frequency_hz: 868_000_000,
            bandwidth_hz: 125_000,
            coding_rate: 5,
            spreading_factor: 7,
            preamble_len: 8,
            tx_power_dbm: 17,
            low_data_rate_optimize: false,
        }
    }
}

/// The radio contract.
///
/// `rx_ready` is the only suspension-free probe; `receive` is called
/// once a frame is known to be pending and returns `Ok(None)` when the
/// radio had nothing after all (reported upstream as a receiver error,
/// non-fatal). `last_snr`/`last_rssi` describe the most recent reception.
pub trait Transceiver {
    fn configure(&mut self, params: &RadioParams) -> Result<()>;

    /// Enter continuous receive mode.
    fn listen(&mut self) -> Result<()>;

    /// Non-blocking: is a received frame waiting?
    fn rx_ready(&self) -> bool;

    /// Pull the pending frame, if any.
    fn receive(&mut self) -> Result<Option<Vec<u8>>>;

    /// Transmit one frame. Synchronous; may block for the airtime.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Signal-to-noise ratio of the last reception, in dB.
    fn last_snr(&self) -> f32;

    /// Received signal strength of the last reception, in dBm.
    fn last_rssi(&self) -> i32;
}
