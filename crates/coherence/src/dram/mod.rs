//! Backing store behind the directory controllers.
//!
//! This module implements the memory that serves line data on directory
//! misses. It provides:
//! 1. **BackingStore:** The synchronous fetch/store interface a controller consumes.
//! 2. **DramCntlr:** Sparse, zero-filled line storage plus latency and contention modeling.
//! 3. **Controller:** Latency models (fixed or row-buffer).

/// DRAM latency models.
pub mod controller;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::common::PhysAddr;
use crate::config::Config;
use crate::timing::queue_model::{self, QueueModel};

use self::controller::MemoryController;

/// Line-granular data store.
///
/// Fetches and stores always succeed. `access_latency` is a timing hook;
/// stores that do not model time keep the default of zero.
pub trait BackingStore: Send {
    /// Returns the contents of the line at `address`.
    fn fetch(&mut self, address: PhysAddr) -> Vec<u8>;

    /// Overwrites the line at `address`.
    fn store(&mut self, address: PhysAddr, data: &[u8]);

    /// Cycles spent serving an access to `address` arriving at `time`.
    fn access_latency(&mut self, _address: PhysAddr, _time: u64) -> u64 {
        0
    }
}

/// Access counters of one backing-store controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DramStats {
    /// Line fetches.
    pub reads: u64,
    /// Line stores.
    pub writes: u64,
    /// Sum of access latencies, excluding queueing.
    pub total_access_latency: u64,
    /// Sum of queueing delays.
    pub total_queue_delay: u64,
}

/// In-model DRAM controller of one home tile.
pub struct DramCntlr {
    line_size: u64,
    lines: HashMap<PhysAddr, Vec<u8>>,
    latency: Box<dyn MemoryController>,
    queue_model: Option<Box<dyn QueueModel>>,
    stats: DramStats,
}

impl DramCntlr {
    /// Creates an empty controller.
    ///
    /// # Arguments
    ///
    /// * `line_size` - Bytes per line; fetched lines are zero-filled to this size.
    /// * `latency` - Access latency model.
    /// * `queue_model` - Optional contention model.
    pub fn new(
        line_size: u64,
        latency: Box<dyn MemoryController>,
        queue_model: Option<Box<dyn QueueModel>>,
    ) -> Self {
        Self {
            line_size,
            lines: HashMap::new(),
            latency,
            queue_model,
            stats: DramStats::default(),
        }
    }

    /// Builds the controller described by a configuration.
    pub fn from_config(config: &Config) -> Self {
        let latency = controller::create(&config.dram);
        let queue_model = queue_model::create(&config.dram.queue_model, latency.min_latency());
        Self::new(config.general.cache_line_size, latency, queue_model)
    }

    /// Current contents of a line without counting an access; `None` if never written.
    pub fn peek(&self, address: PhysAddr) -> Option<&[u8]> {
        self.lines.get(&address).map(Vec::as_slice)
    }

    /// Access counters.
    pub const fn stats(&self) -> &DramStats {
        &self.stats
    }
}

impl fmt::Debug for DramCntlr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DramCntlr")
            .field("line_size", &self.line_size)
            .field("lines", &self.lines.len())
            .field("latency", &self.latency)
            .field("queue_model", &self.queue_model)
            .field("stats", &self.stats)
            .finish()
    }
}

impl BackingStore for DramCntlr {
    fn fetch(&mut self, address: PhysAddr) -> Vec<u8> {
        self.stats.reads += 1;
        self.lines
            .get(&address)
            .cloned()
            .unwrap_or_else(|| vec![0; self.line_size as usize])
    }

    fn store(&mut self, address: PhysAddr, data: &[u8]) {
        self.stats.writes += 1;
        let _ = self.lines.insert(address, data.to_vec());
    }

    fn access_latency(&mut self, address: PhysAddr, time: u64) -> u64 {
        let service = self.latency.access_latency(address);
        let delay = self
            .queue_model
            .as_mut()
            .map_or(0, |q| q.compute_queue_delay(time, service));
        self.stats.total_access_latency += service;
        self.stats.total_queue_delay += delay;
        service + delay
    }
}
