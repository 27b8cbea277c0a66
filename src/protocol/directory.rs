//! Node directory: raw addresses to display nicknames.
//!
//! Bindings come from node-info announcements. Registration reports
//! whether anything changed so the engine can emit a join notice exactly
//! once; a node re-announcing the same name must not re-notify.
//!
//! Capacity is bounded with FIFO eviction of the oldest binding; on a
//! long-lived handheld the directory must not grow without limit.

use crate::config::DIRECTORY_CAPACITY;
use crate::core::address::{Address, AddressMode};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Outcome of a nickname registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// First sighting of this address
    New,
    /// Known address announcing a different nickname
    Renamed,
    /// Known address re-announcing its current nickname
    Unchanged,
}

impl Registration {
    /// True when the binding changed and the UI should be told.
    pub fn is_change(self) -> bool {
        !matches!(self, Registration::Unchanged)
    }
}

/// Bounded address-to-nickname map with FIFO eviction.
#[derive(Debug)]
pub struct NodeDirectory {
    entries: HashMap<Address, String>,
    insertion_order: VecDeque<Address>,
    capacity: usize,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::with_capacity(DIRECTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        NodeDirectory {
            entries: HashMap::new(),
            insertion_order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a nickname sighting for an address.
    pub fn register(&mut self, address: Address, nickname: &str) -> Registration {
        if let Some(existing) = self.entries.get_mut(&address) {
            if existing == nickname {
                return Registration::Unchanged;
            }
            debug!(%address, from = %existing, to = nickname, "node renamed");
            *existing = nickname.to_string();
            return Registration::Renamed;
        }

        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
                debug!(%oldest, "directory full, evicted oldest binding");
            }
        }

        self.entries.insert(address, nickname.to_string());
        self.insertion_order.push_back(address);
        debug!(%address, nickname, "node joined");
        Registration::New
    }

    /// Nickname for an address, if one is known.
    pub fn resolve(&self, address: Address) -> Option<&str> {
        self.entries.get(&address).map(String::as_str)
    }

    /// Nickname for an address, falling back to the formatted address
    /// for unknown nodes.
    pub fn display(&self, address: Address, mode: AddressMode) -> String {
        self.resolve(address)
            .map(str::to_string)
            .unwrap_or_else(|| mode.format(address))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NodeDirectory {
    fn default() -> Self {
        Self::new()
    }
}
