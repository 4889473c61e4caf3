use crate::common::TileId;

use super::{SharerTracking, SharersList, pointers};

/// K exact pointers plus a count of sharers beyond them.
///
/// The count is what makes acknowledgement counting correct after a
/// broadcast: the directory knows how many replies to wait for even when it
/// does not know who will send them. Pointers freed by departing sharers are
/// reused for new ones.
#[derive(Debug, Clone)]
pub struct Ackwise {
    tiles: Vec<TileId>,
    untracked: usize,
    capacity: usize,
}

impl Ackwise {
    /// Creates an empty entry with `capacity` exact pointers.
    pub fn new(capacity: usize) -> Self {
        Self {
            tiles: Vec::with_capacity(capacity),
            untracked: 0,
            capacity,
        }
    }

    /// Whether sharers exist that are not identified.
    pub const fn has_untracked(&self) -> bool {
        self.untracked > 0
    }

    /// Sharers counted but not identified.
    pub const fn num_untracked(&self) -> usize {
        self.untracked
    }
}

impl SharerTracking for Ackwise {
    fn has_sharer(&self, id: TileId) -> bool {
        pointers::contains(&self.tiles, id)
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        if self.has_sharer(id) {
            return true;
        }
        if self.tiles.len() < self.capacity {
            return pointers::insert(&mut self.tiles, id);
        }
        self.untracked += 1;
        true
    }

    fn remove_sharer(&mut self, id: TileId, _ack_expected: bool) -> bool {
        if pointers::remove(&mut self.tiles, id) {
            return true;
        }
        if self.untracked > 0 {
            self.untracked -= 1;
            return true;
        }
        false
    }

    fn num_sharers(&self) -> usize {
        self.tiles.len() + self.untracked
    }

    fn one_sharer(&self) -> Option<TileId> {
        self.tiles.first().copied()
    }

    fn sharers_list(&self) -> SharersList {
        SharersList {
            exact: self.untracked == 0,
            tiles: self.tiles.clone(),
        }
    }

    fn clear(&mut self) {
        self.tiles.clear();
        self.untracked = 0;
    }
}
