//! Timing annotations.
//!
//! Nothing here affects which messages are sent or in what order; these types
//! only accumulate cycle counts that are reported alongside the results.
//! 1. **Queue models:** Contention delay at a shared server (`queue_model`).
//! 2. **Perf model:** Per-controller cycle counter (`ShmemPerfModel`).
//! 3. **Latency model:** Cost of directory accesses (`LatencyModel`).

/// Contention models.
pub mod queue_model;

/// Kind of access a controller charges time for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// Tag lookup of the directory cache.
    DirectoryLookup,
    /// Search of a set for a replacement victim.
    ReplacementLookup,
}

/// Cycles charged per directory access.
pub trait LatencyModel: Send + Sync + std::fmt::Debug {
    /// Latency of one access of `kind`.
    fn latency(&self, kind: AccessKind) -> u64;
}

/// Every access costs the same configured number of cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLatencyModel {
    access_cycles: u64,
}

impl FixedLatencyModel {
    /// Creates a model charging `access_cycles` per access.
    pub const fn new(access_cycles: u64) -> Self {
        Self { access_cycles }
    }
}

impl LatencyModel for FixedLatencyModel {
    fn latency(&self, _kind: AccessKind) -> u64 {
        self.access_cycles
    }
}

/// Cycle counter of one controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShmemPerfModel {
    cycle: u64,
}

impl ShmemPerfModel {
    /// Starts at cycle 0.
    pub const fn new() -> Self {
        Self { cycle: 0 }
    }

    /// Current cycle.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Moves forward to `time`; never moves backwards.
    pub fn advance_to(&mut self, time: u64) {
        self.cycle = self.cycle.max(time);
    }

    /// Adds `cycles`.
    pub fn incr(&mut self, cycles: u64) {
        self.cycle = self.cycle.saturating_add(cycles);
    }
}
