//! In-process driver.
//!
//! Wires `CacheAgent`s and `DirectoryCntlr`s together through a single FIFO
//! event queue so the protocol can be exercised end to end.

/// Private cache stand-in.
pub mod cache_agent;

/// Multi-tile machine and event queue.
pub mod system;

/// Trace records and replay.
pub mod trace;

pub use cache_agent::{CacheAgent, CacheState, CachedLine, RequestKind};
pub use system::{EventQueue, System};
pub use trace::{TraceOp, TraceRecord};
