//! In-memory shared-medium transceiver.
//!
//! Every frame sent by one attached radio is delivered to the inbox of
//! every *other* attached radio, like a perfectly quiet radio channel.
//! The whole medium lives on one logical thread (`Rc<RefCell<..>>`),
//! matching the engine's single-threaded, poll-driven model, so tests
//! can drive several engines in lockstep without any locking.

use crate::error::Result;
use crate::transport::{RadioParams, Transceiver};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::debug;

type Inbox = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// The shared channel radios attach to.
#[derive(Default, Clone)]
pub struct LoopbackMedium {
    stations: Rc<RefCell<Vec<Inbox>>>,
}

impl LoopbackMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new radio to the medium with the given simulated signal
    /// metrics.
    pub fn attach_with_signal(&self, snr: f32, rssi: i32) -> LoopbackRadio {
        let inbox: Inbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut stations = self.stations.borrow_mut();
        stations.push(inbox.clone());
        LoopbackRadio {
            stations: self.stations.clone(),
            inbox,
            station: stations.len() - 1,
            snr,
            rssi,
            configured: None,
            listening: false,
        }
    }

    /// Attach a new radio with nominal signal metrics.
    pub fn attach(&self) -> LoopbackRadio {
        self.attach_with_signal(7.5, -91)
    }
}

/// One station on a [`LoopbackMedium`].
pub struct LoopbackRadio {
    stations: Rc<RefCell<Vec<Inbox>>>,
    inbox: Inbox,
    station: usize,
    snr: f32,
    rssi: i32,
    configured: Option<RadioParams>,
    listening: bool,
}

impl LoopbackRadio {
    /// Radio parameters from the last `configure` call, if any.
    pub fn configured(&self) -> Option<&RadioParams> {
        self.configured.as_ref()
    }

    /// Number of frames waiting in the inbox.
    pub fn pending(&self) -> usize {
        self.inbox.borrow().len()
    }

    /// Whether `listen` has been called.
    pub fn is_listening(&self) -> bool {
        self.listening
    }
}

impl Transceiver for LoopbackRadio {
    fn configure(&mut self, params: &RadioParams) -> Result<()> {
        self.configured = Some(params.clone());
        Ok(())
    }

    fn listen(&mut self) -> Result<()> {
        self.listening = true;
        Ok(())
    }

    fn rx_ready(&self) -> bool {
        !self.inbox.borrow().is_empty()
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.inbox.borrow_mut().pop_front())
    }

    fn send(&mut self, frame: &[u8]) -> Result<()> {
        let stations = self.stations.borrow();
        debug!(
            station = self.station,
            bytes = frame.len(),
            peers = stations.len() - 1,
            "loopback transmit"
        );
        for (idx, inbox) in stations.iter().enumerate() {
            if idx != self.station {
                inbox.borrow_mut().push_back(frame.to_vec());
            }
        }
        Ok(())
    }

    fn last_snr(&self) -> f32 {
        self.snr
    }

    fn last_rssi(&self) -> i32 {
        self.rssi
    }
}
