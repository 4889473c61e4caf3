//! Sharer-tracking schemes.
//!
//! Each scheme trades storage for precision differently:
//!
//! - `FullMap`: one bit per tile; always exact.
//! - `Limited` (no broadcast): at most K exact sharers; further adds are refused.
//! - `LimitedBroadcast`: K exact sharers, then a count of untracked ones; invalidations broadcast.
//! - `Ackwise`: K exact sharers plus an untracked count; freed slots are reused for new sharers.
//! - `Limitless`: K sharers in hardware, then every sharer moves to a software bit vector
//!   and each access pays a trap penalty.
//!
//! Callers must never assume a concrete sharer set without checking
//! [`SharersList::exact`].

/// Ackwise scheme.
pub mod ackwise;

/// Full bit-map scheme.
pub mod full_map;

/// Limited pointer schemes (no-broadcast and broadcast).
pub mod limited;

/// Limitless (software-extended) scheme.
pub mod limitless;

pub use ackwise::Ackwise;
pub use full_map::FullMap;
pub use limited::{Limited, LimitedBroadcast};
pub use limitless::Limitless;

use crate::common::TileId;
use crate::config::{Config, OverflowPolicy};

use super::DirectoryType;

/// Snapshot of an entry's sharers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharersList {
    /// `false` when the true sharer set exceeds what is tracked; any operation
    /// that must reach every sharer has to broadcast.
    pub exact: bool,
    /// Tracked sharers in ascending id order.
    pub tiles: Vec<TileId>,
}

/// Capability interface shared by every scheme.
pub trait SharerTracking {
    /// Whether `id` is a tracked sharer. Untracked sharers report `false`.
    fn has_sharer(&self, id: TileId) -> bool;

    /// Adds a sharer. Returns `false` only when the scheme refuses (limited, no broadcast, full).
    fn add_sharer(&mut self, id: TileId) -> bool;

    /// Removes a sharer.
    ///
    /// `ack_expected` is `true` when the removal acknowledges an invalidation the
    /// directory sent, and `false` for a voluntary eviction notice. Returns `false`
    /// when `id` cannot be a sharer (not tracked and no untracked sharers remain).
    fn remove_sharer(&mut self, id: TileId, ack_expected: bool) -> bool;

    /// Number of sharers, tracked and untracked.
    fn num_sharers(&self) -> usize;

    /// A deterministic invalidation target: the lowest tracked id.
    fn one_sharer(&self) -> Option<TileId>;

    /// Current sharers; see [`SharersList`].
    fn sharers_list(&self) -> SharersList;

    /// Extra cycles charged per access in the current tracking mode.
    fn latency(&self) -> u64 {
        0
    }

    /// Drops every sharer and returns to the initial tracking mode.
    fn clear(&mut self);
}

/// Parameters needed to instantiate any scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeParams {
    /// Which scheme to build.
    pub directory_type: DirectoryType,
    /// Sharers tracked exactly in hardware (K).
    pub max_hw_sharers: u32,
    /// Logical sharer capacity (width of bit vectors).
    pub max_num_sharers: u32,
    /// Limited-broadcast overflow behaviour.
    pub overflow: OverflowPolicy,
    /// Limitless software-trap penalty in cycles.
    pub software_trap_penalty: u64,
}

impl SchemeParams {
    /// Extracts the scheme parameters from a validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            directory_type: config.directory.directory_type,
            max_hw_sharers: config.directory.max_hw_sharers,
            max_num_sharers: config.max_num_sharers(),
            overflow: config.directory.limited_broadcast.overflow,
            software_trap_penalty: config.directory.limitless.software_trap_penalty,
        }
    }

    /// Hardware storage of one entry's sharer field, in bits.
    pub const fn entry_size_bits(&self) -> u64 {
        let id_bits = crate::common::ceil_log2(self.max_num_sharers as u64) as u64;
        let k = self.max_hw_sharers as u64;
        match self.directory_type {
            DirectoryType::FullMap => self.max_num_sharers as u64,
            DirectoryType::LimitedNoBroadcast | DirectoryType::Limitless => k * id_bits,
            DirectoryType::LimitedBroadcast => k * id_bits + 1,
            DirectoryType::Ackwise => k * id_bits + 1 + id_bits,
        }
    }
}

/// Enum dispatch over the concrete schemes.
#[derive(Debug, Clone)]
pub enum Sharers {
    /// Full bit map.
    FullMap(FullMap),
    /// Limited pointers, refuse on overflow.
    LimitedNoBroadcast(Limited),
    /// Limited pointers, count and broadcast on overflow.
    LimitedBroadcast(LimitedBroadcast),
    /// Ackwise.
    Ackwise(Ackwise),
    /// Limitless.
    Limitless(Limitless),
}

impl Sharers {
    /// Builds an empty sharer structure for the configured scheme.
    pub fn new(params: &SchemeParams) -> Self {
        let k = params.max_hw_sharers as usize;
        let n = params.max_num_sharers as usize;
        match params.directory_type {
            DirectoryType::FullMap => Self::FullMap(FullMap::new(n)),
            DirectoryType::LimitedNoBroadcast => Self::LimitedNoBroadcast(Limited::new(k)),
            DirectoryType::LimitedBroadcast => {
                Self::LimitedBroadcast(LimitedBroadcast::new(k, params.overflow))
            }
            DirectoryType::Ackwise => Self::Ackwise(Ackwise::new(k)),
            DirectoryType::Limitless => {
                Self::Limitless(Limitless::new(k, n, params.software_trap_penalty))
            }
        }
    }

    fn inner(&self) -> &dyn SharerTracking {
        match self {
            Self::FullMap(s) => s,
            Self::LimitedNoBroadcast(s) => s,
            Self::LimitedBroadcast(s) => s,
            Self::Ackwise(s) => s,
            Self::Limitless(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SharerTracking {
        match self {
            Self::FullMap(s) => s,
            Self::LimitedNoBroadcast(s) => s,
            Self::LimitedBroadcast(s) => s,
            Self::Ackwise(s) => s,
            Self::Limitless(s) => s,
        }
    }
}

impl SharerTracking for Sharers {
    fn has_sharer(&self, id: TileId) -> bool {
        self.inner().has_sharer(id)
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        self.inner_mut().add_sharer(id)
    }

    fn remove_sharer(&mut self, id: TileId, ack_expected: bool) -> bool {
        self.inner_mut().remove_sharer(id, ack_expected)
    }

    fn num_sharers(&self) -> usize {
        self.inner().num_sharers()
    }

    fn one_sharer(&self) -> Option<TileId> {
        self.inner().one_sharer()
    }

    fn sharers_list(&self) -> SharersList {
        self.inner().sharers_list()
    }

    fn latency(&self) -> u64 {
        self.inner().latency()
    }

    fn clear(&mut self) {
        self.inner_mut().clear();
    }
}

/// Tracked-pointer helpers shared by the limited, ackwise, and limitless schemes.
pub(crate) mod pointers {
    use crate::common::TileId;

    /// Inserts `id` keeping the list sorted; returns `false` if already present.
    pub fn insert(list: &mut Vec<TileId>, id: TileId) -> bool {
        match list.binary_search(&id) {
            Ok(_) => false,
            Err(pos) => {
                list.insert(pos, id);
                true
            }
        }
    }

    /// Removes `id`; returns whether it was present.
    pub fn remove(list: &mut Vec<TileId>, id: TileId) -> bool {
        match list.binary_search(&id) {
            Ok(pos) => {
                let _ = list.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    /// Whether `id` is present.
    pub fn contains(list: &[TileId], id: TileId) -> bool {
        list.binary_search(&id).is_ok()
    }
}
