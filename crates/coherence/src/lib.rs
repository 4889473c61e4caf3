//! Directory-based cache coherence engine for tiled multicore simulation.
//!
//! This crate implements the home side of an MSI directory protocol with the following:
//! 1. **Directory:** Sharer-tracking schemes, directory entries, and the set-associative directory cache.
//! 2. **Protocol:** The per-home controller state machine, its messages, and per-address request queues.
//! 3. **Memory:** Address-to-home interleaving and a DRAM backing store with latency models.
//! 4. **Timing:** Cycle counters and queueing-delay models (M/G/1, history list).
//! 5. **Simulation:** An in-process multi-tile driver, trace replay, and statistics.

/// Common types (addresses, tile ids, bit vectors, errors).
pub mod common;
/// Engine configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Directory entries, sharer schemes, and the directory cache.
pub mod directory;
/// DRAM backing store and latency models.
pub mod dram;
/// Address-to-home mapping.
pub mod home;
/// Coherence messages, request queues, transport, and the directory controller.
pub mod protocol;
/// In-process multi-tile driver.
pub mod sim;
/// Directory statistics collection and reporting.
pub mod stats;
/// Cycle counters and queueing models.
pub mod timing;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Home directory controller; construct with `DirectoryCntlr::from_config`.
pub use crate::protocol::DirectoryCntlr;
/// Multi-tile machine; construct with `System::new`.
pub use crate::sim::System;
