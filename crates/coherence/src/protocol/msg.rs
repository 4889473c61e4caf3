//! Coherence messages and pending-request records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{PhysAddr, TileId};

/// Wire message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsgType {
    /// Request for a writable copy.
    ExReq,
    /// Request for a read-only copy.
    ShReq,
    /// Directory asks a sharer to drop its copy.
    InvReq,
    /// Sharer dropped its copy (solicited or voluntary).
    InvRep,
    /// Directory asks the owner to return and drop its copy.
    FlushReq,
    /// Owner returned and dropped its copy (solicited or voluntary).
    FlushRep,
    /// Directory asks the owner to return its data and downgrade to shared.
    WbReq,
    /// Owner returned its data and kept a shared copy.
    WbRep,
    /// Directory-internal: reclaim the entry of an address.
    NullifyReq,
    /// Grant of a writable copy.
    ExRep,
    /// Grant of a read-only copy.
    ShRep,
}

impl MsgType {
    /// Whether this message is a request sent by a private cache.
    pub const fn is_cache_request(self) -> bool {
        matches!(self, Self::ExReq | Self::ShReq)
    }

    /// Whether this message expects the receiver to reply.
    pub const fn solicits_reply(self) -> bool {
        matches!(self, Self::InvReq | Self::FlushReq | Self::WbReq)
    }
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExReq => "EX_REQ",
            Self::ShReq => "SH_REQ",
            Self::InvReq => "INV_REQ",
            Self::InvRep => "INV_REP",
            Self::FlushReq => "FLUSH_REQ",
            Self::FlushRep => "FLUSH_REP",
            Self::WbReq => "WB_REQ",
            Self::WbRep => "WB_REP",
            Self::NullifyReq => "NULLIFY_REQ",
            Self::ExRep => "EX_REP",
            Self::ShRep => "SH_REP",
        })
    }
}

/// Dirty line carried on a request by a cache that evicted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writeback {
    /// Line address of the evicted line.
    pub address: PhysAddr,
    /// Its dirty contents.
    pub data: Vec<u8>,
}

/// A coherence message between a private cache and a directory controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShmemMsg {
    /// Message type.
    pub msg_type: MsgType,
    /// Tile whose request this message belongs to.
    pub requester: TileId,
    /// Line address.
    pub address: PhysAddr,
    /// Line contents, for data-carrying messages.
    pub data: Option<Vec<u8>>,
    /// Set on directory sub-requests and echoed on the matching reply; clear on
    /// voluntary eviction notices.
    pub reply_expected: bool,
    /// Piggybacked eviction of another line (requests only).
    pub writeback: Option<Writeback>,
    /// Sender's cycle count when the message left.
    pub time: u64,
}

impl ShmemMsg {
    /// Creates a data-less message.
    pub const fn new(msg_type: MsgType, requester: TileId, address: PhysAddr) -> Self {
        Self {
            msg_type,
            requester,
            address,
            data: None,
            reply_expected: msg_type.solicits_reply(),
            writeback: None,
            time: 0,
        }
    }

    /// Attaches line data.
    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    /// Sets the send time.
    #[must_use]
    pub fn at(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    /// Sets the `reply_expected` flag.
    #[must_use]
    pub fn expecting_reply(mut self, reply_expected: bool) -> Self {
        self.reply_expected = reply_expected;
        self
    }

    /// Attaches a piggybacked writeback.
    #[must_use]
    pub fn with_writeback(mut self, writeback: Writeback) -> Self {
        self.writeback = Some(writeback);
        self
    }
}

/// What the active transaction on an address is suspended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Invalidations sent; `outstanding` acknowledgements still owed.
    Invalidations {
        /// Replies still expected.
        outstanding: usize,
    },
    /// `FLUSH_REQ` sent to the owner.
    Flush {
        /// Current owner.
        owner: TileId,
    },
    /// `WB_REQ` sent to the owner.
    Writeback {
        /// Current owner.
        owner: TileId,
    },
    /// `INV_REQ` sent to free a sharer pointer for a shared request.
    Room {
        /// Sharer being invalidated.
        victim: TileId,
    },
    /// Another address is being nullified to free a directory slot.
    Eviction {
        /// Address whose entry is being reclaimed.
        victim: PhysAddr,
    },
    /// Every way of the set is busy; retried when a transaction in the set completes.
    Slot,
}

/// A request admitted into the per-address queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShmemReq {
    /// The request message (`EX_REQ`, `SH_REQ`, or `NULLIFY_REQ`).
    pub msg: ShmemMsg,
    /// Arrival time at the controller.
    pub time: u64,
    /// Continuation of the active transaction; `None` while runnable.
    pub wait: Option<Wait>,
    /// Line data forwarded by a prior owner, reused instead of a backing-store fetch.
    pub data: Option<Vec<u8>>,
}

impl ShmemReq {
    /// Wraps an arriving message.
    pub const fn new(msg: ShmemMsg, time: u64) -> Self {
        Self {
            msg,
            time,
            wait: None,
            data: None,
        }
    }

    /// Message type of the request.
    pub const fn msg_type(&self) -> MsgType {
        self.msg.msg_type
    }

    /// Requesting tile.
    pub const fn requester(&self) -> TileId {
        self.msg.requester
    }
}
