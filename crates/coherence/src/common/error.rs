//! Error definitions.
//!
//! This module defines the three failure classes of the coherence engine:
//! 1. **Configuration Errors:** Raised while building controllers from a `Config`; fatal at startup.
//! 2. **Protocol Violations:** A message inconsistent with the directory state; fatal defects.
//! 3. **Simulation Errors:** Driver-level failures of the in-process `System`, wrapping the other two.
//!
//! Capacity refusals and directory-cache exhaustion are not errors; they are
//! resolved inside the controller by broadcast fallback and eviction.

use thiserror::Error;

use super::addr::{PhysAddr, TileId};
use crate::directory::DirectoryState;
use crate::protocol::msg::MsgType;

/// Invalid or inconsistent configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The directory scheme name is not one of the supported schemes.
    #[error(
        "unknown directory type `{0}` (expected one of: full_map, limited_no_broadcast, limited_broadcast, ackwise, limitless)"
    )]
    UnknownDirectoryType(String),

    /// A parameter that must be non-zero was zero.
    #[error("{field} must be non-zero")]
    Zero {
        /// Dotted path of the offending parameter.
        field: &'static str,
    },

    /// A parameter that must be a power of two was not.
    #[error("{field} ({value}) must be a power of two")]
    NotPowerOfTwo {
        /// Dotted path of the offending parameter.
        field: &'static str,
        /// The rejected value.
        value: u64,
    },

    /// Two parameters contradict each other.
    #[error("inconsistent configuration: {0}")]
    Inconsistent(String),

    /// A tile id names a tile that does not exist.
    #[error("tile {tile} out of range (num_tiles = {num_tiles})")]
    TileOutOfRange {
        /// The rejected tile id.
        tile: u32,
        /// Number of tiles in the machine.
        num_tiles: u32,
    },

    /// The configuration text could not be deserialized.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {reason}")]
    Io {
        /// Path that was opened.
        path: String,
        /// Underlying I/O error text.
        reason: String,
    },
}

/// A message that the coherence protocol cannot legally accept.
///
/// Any of these means the simulated machine has already diverged from a
/// coherent state; callers must stop the run rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The message type is not legal for the entry's current state.
    #[error("{msg_type} for {address} from {sender} is illegal in directory state {state}")]
    UnexpectedMessage {
        /// Type of the offending message.
        msg_type: MsgType,
        /// Line address the message refers to.
        address: PhysAddr,
        /// Tile that sent it.
        sender: TileId,
        /// Directory state at the time of delivery.
        state: DirectoryState,
    },

    /// A reply or eviction came from a tile the directory does not track.
    #[error("{sender} is not a sharer of {address}")]
    NotASharer {
        /// Tile that sent the reply.
        sender: TileId,
        /// Line address the reply refers to.
        address: PhysAddr,
    },

    /// A reply marked as expected arrived while no sub-transaction was outstanding.
    #[error("{msg_type} for {address} from {sender} answers no outstanding request")]
    NoOutstandingRequest {
        /// Type of the offending reply.
        msg_type: MsgType,
        /// Line address the reply refers to.
        address: PhysAddr,
        /// Tile that sent it.
        sender: TileId,
    },

    /// The address is owned by a different home controller.
    #[error("{address} is homed at {home}, not at {tile}")]
    WrongHome {
        /// Line address of the request.
        address: PhysAddr,
        /// Home tile computed by the address lookup.
        home: TileId,
        /// Tile whose controller received the message.
        tile: TileId,
    },

    /// The message type is never addressed to a directory controller.
    #[error("{msg_type} cannot be delivered to a directory controller")]
    UnsupportedMessage {
        /// Type of the offending message.
        msg_type: MsgType,
    },

    /// A reply referenced an address with no bound directory entry.
    #[error("no directory entry is bound to {address} (reply {msg_type} from {sender})")]
    MissingEntry {
        /// Type of the offending reply.
        msg_type: MsgType,
        /// Line address the reply refers to.
        address: PhysAddr,
        /// Tile that sent it.
        sender: TileId,
    },

    /// A private cache received a directory message that contradicts its own line state.
    #[error("{tile} cannot accept {msg_type} for {address} in its current line state")]
    CacheStateConflict {
        /// Type of the offending message.
        msg_type: MsgType,
        /// Line address the message refers to.
        address: PhysAddr,
        /// Tile whose cache received it.
        tile: TileId,
    },

    /// A reply that must carry line data carried none, or the wrong amount.
    #[error("{msg_type} for {address} from {sender} carries no line data")]
    MissingData {
        /// Type of the offending reply.
        msg_type: MsgType,
        /// Line address the reply refers to.
        address: PhysAddr,
        /// Tile that sent it.
        sender: TileId,
    },
}

/// Failure of the in-process multi-tile driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Machine could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The coherence protocol detected a violation; the run is aborted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An operation named a tile that does not exist.
    #[error("{0} does not exist")]
    UnknownTile(TileId),

    /// A packet was routed to a tile that hosts no directory controller.
    #[error("{0} hosts no directory controller")]
    NoController(TileId),

    /// A request never completed even though the network drained.
    #[error("{tile} was never granted {address}")]
    Starved {
        /// Requesting tile.
        tile: TileId,
        /// Requested line.
        address: PhysAddr,
    },

    /// A trace file could not be read or parsed.
    #[error("invalid trace: {0}")]
    Trace(String),

    /// A cross-component invariant check failed.
    #[error("coherence invariant violated: {0}")]
    Invariant(String),
}
