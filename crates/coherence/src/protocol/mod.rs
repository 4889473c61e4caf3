//! Directory-based MSI coherence protocol.
//!
//! 1. **Messages:** Wire messages and pending-request records (`msg`).
//! 2. **Serialization:** Per-address FIFO admission (`req_queue`).
//! 3. **Transport:** The network interface the controller sends through (`network`).
//! 4. **Controller:** The home directory state machine (`controller`).

/// Home directory controller.
pub mod controller;

/// Messages and request records.
pub mod msg;

/// Transport interface.
pub mod network;

/// Per-address request queues.
pub mod req_queue;

pub use controller::DirectoryCntlr;
pub use msg::{MsgType, ShmemMsg, ShmemReq, Wait, Writeback};
pub use network::{MemComponent, Network, Packet, RecordingNetwork};
pub use req_queue::{Admission, ReqQueueList};
