//! DRAM latency models.
//!
//! This module provides:
//! 1. **SimpleController:** Fixed latency per access.
//! 2. **RowBufferController:** Row-buffer-aware latency (CAS, RAS, precharge).
//!
//! Models are `Send + Sync` so a `DramCntlr` can live on any thread driving a tile.

use crate::common::PhysAddr;
use crate::config::{DramConfig, MemoryControllerKind};

/// Bytes covered by one open DRAM row.
const ROW_SIZE: u64 = 2048;

/// A memory controller that reports access latency in cycles.
pub trait MemoryController: Send + Sync + std::fmt::Debug {
    /// Returns the number of cycles required for an access to the given line.
    ///
    /// # Arguments
    ///
    /// * `addr` - Line address being accessed (used for row-buffer modeling).
    ///
    /// # Returns
    ///
    /// Latency in simulation cycles.
    fn access_latency(&mut self, addr: PhysAddr) -> u64;

    /// Smallest latency the model can return.
    fn min_latency(&self) -> u64;
}

/// Builds the configured latency model.
pub fn create(config: &DramConfig) -> Box<dyn MemoryController> {
    match config.controller {
        MemoryControllerKind::Simple => Box::new(SimpleController::new(config.latency)),
        MemoryControllerKind::RowBuffer => Box::new(RowBufferController::new(
            config.t_cas,
            config.t_ras,
            config.t_pre,
        )),
    }
}

/// Fixed-latency controller; every access takes the same number of cycles.
#[derive(Debug, Clone, Copy)]
pub struct SimpleController {
    latency: u64,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency in cycles.
    pub const fn new(latency: u64) -> Self {
        Self { latency }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: PhysAddr) -> u64 {
        self.latency
    }

    fn min_latency(&self) -> u64 {
        self.latency
    }
}

/// Controller with a single open row.
///
/// A row hit costs `t_cas`; the first access costs `t_ras + t_cas`; a row
/// conflict additionally pays `t_pre` to close the open row.
#[derive(Debug, Clone, Copy)]
pub struct RowBufferController {
    open_row: Option<u64>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
}

impl RowBufferController {
    /// Creates a controller with no row open.
    ///
    /// # Arguments
    ///
    /// * `t_cas` - Column access strobe latency.
    /// * `t_ras` - Row access strobe latency.
    /// * `t_pre` - Precharge latency.
    pub const fn new(t_cas: u64, t_ras: u64, t_pre: u64) -> Self {
        Self {
            open_row: None,
            t_cas,
            t_ras,
            t_pre,
        }
    }
}

impl MemoryController for RowBufferController {
    fn access_latency(&mut self, addr: PhysAddr) -> u64 {
        let row = addr.val() / ROW_SIZE;
        let latency = match self.open_row {
            Some(open) if open == row => self.t_cas,
            Some(_) => self.t_pre + self.t_ras + self.t_cas,
            None => self.t_ras + self.t_cas,
        };
        self.open_row = Some(row);
        latency
    }

    fn min_latency(&self) -> u64 {
        self.t_cas
    }
}
