use crate::common::TileId;
use crate::config::OverflowPolicy;

use super::{SharerTracking, SharersList, pointers};

/// Up to K exact pointers; adding a (K+1)th sharer is refused.
///
/// The controller answers a refusal by invalidating one existing sharer and
/// retrying the request.
#[derive(Debug, Clone)]
pub struct Limited {
    tiles: Vec<TileId>,
    capacity: usize,
}

impl Limited {
    /// Creates an empty pointer set with room for `capacity` sharers.
    pub fn new(capacity: usize) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Whether every pointer is in use.
    pub fn is_full(&self) -> bool {
        self.tiles.len() >= self.capacity
    }
}

impl SharerTracking for Limited {
    fn has_sharer(&self, id: TileId) -> bool {
        pointers::contains(&self.tiles, id)
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        if self.has_sharer(id) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        pointers::insert(&mut self.tiles, id)
    }

    fn remove_sharer(&mut self, id: TileId, _ack_expected: bool) -> bool {
        pointers::remove(&mut self.tiles, id)
    }

    fn num_sharers(&self) -> usize {
        self.tiles.len()
    }

    fn one_sharer(&self) -> Option<TileId> {
        self.tiles.first().copied()
    }

    fn sharers_list(&self) -> SharersList {
        SharersList {
            exact: true,
            tiles: self.tiles.clone(),
        }
    }

    fn clear(&mut self) {
        self.tiles.clear();
    }
}

/// Up to K exact pointers, then an untracked-sharer count.
///
/// While overflowed the sharer list is inexact and invalidations must be
/// broadcast. Under [`OverflowPolicy::Sticky`] the entry stays in broadcast
/// mode until it has no sharers at all; under [`OverflowPolicy::Reversible`]
/// it returns to exact mode as soon as the untracked count reaches zero.
#[derive(Debug, Clone)]
pub struct LimitedBroadcast {
    tiles: Vec<TileId>,
    untracked: usize,
    overflowed: bool,
    capacity: usize,
    policy: OverflowPolicy,
}

impl LimitedBroadcast {
    /// Creates an empty entry with `capacity` exact pointers.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
            untracked: 0,
            overflowed: false,
            capacity,
            policy,
        }
    }

    /// Whether the entry is in broadcast mode.
    pub const fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Sharers counted but not identified.
    pub const fn num_untracked(&self) -> usize {
        self.untracked
    }

    fn settle(&mut self) {
        let empty = self.tiles.is_empty() && self.untracked == 0;
        if empty || (self.policy == OverflowPolicy::Reversible && self.untracked == 0) {
            self.overflowed = false;
        }
    }
}

impl SharerTracking for LimitedBroadcast {
    fn has_sharer(&self, id: TileId) -> bool {
        pointers::contains(&self.tiles, id)
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        if self.has_sharer(id) {
            return true;
        }
        if !self.overflowed && self.tiles.len() < self.capacity {
            return pointers::insert(&mut self.tiles, id);
        }
        self.overflowed = true;
        self.untracked += 1;
        true
    }

    fn remove_sharer(&mut self, id: TileId, _ack_expected: bool) -> bool {
        let removed = if pointers::remove(&mut self.tiles, id) {
            true
        } else if self.untracked > 0 {
            self.untracked -= 1;
            true
        } else {
            false
        };
        self.settle();
        removed
    }

    fn num_sharers(&self) -> usize {
        self.tiles.len() + self.untracked
    }

    fn one_sharer(&self) -> Option<TileId> {
        self.tiles.first().copied()
    }

    fn sharers_list(&self) -> SharersList {
        SharersList {
            exact: !self.overflowed,
            tiles: self.tiles.clone(),
        }
    }

    fn clear(&mut self) {
        self.tiles.clear();
        self.untracked = 0;
        self.overflowed = false;
    }
}
