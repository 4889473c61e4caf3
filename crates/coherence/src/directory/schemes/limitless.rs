use crate::common::{BitVector, TileId};

use super::{SharerTracking, SharersList, pointers};

/// K hardware pointers; past that, every sharer is kept in a software bit vector.
///
/// While the software vector is in use each access costs the trap penalty.
/// The entry falls back to hardware mode once all sharers are gone.
#[derive(Debug, Clone)]
pub struct Limitless {
    hardware: Vec<TileId>,
    software: Option<BitVector>,
    capacity: usize,
    max_num_sharers: usize,
    trap_penalty: u64,
}

impl Limitless {
    /// Creates an empty entry.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Hardware pointers (K).
    /// * `max_num_sharers` - Width of the software vector.
    /// * `trap_penalty` - Cycles charged per access in software mode.
    pub fn new(capacity: usize, max_num_sharers: usize, trap_penalty: u64) -> Self {
        Self {
            hardware: Vec::with_capacity(capacity),
            software: None,
            capacity,
            max_num_sharers,
            trap_penalty,
        }
    }

    /// Whether sharers currently live in the software vector.
    pub const fn in_software(&self) -> bool {
        self.software.is_some()
    }

    fn trap_to_software(&mut self, id: TileId) -> bool {
        let mut bits = BitVector::new(self.max_num_sharers);
        for t in self.hardware.drain(..) {
            let _ = bits.set(t.index());
        }
        let added = bits.set(id.index());
        self.software = Some(bits);
        added
    }
}

impl SharerTracking for Limitless {
    fn has_sharer(&self, id: TileId) -> bool {
        match &self.software {
            Some(bits) => bits.at(id.index()),
            None => pointers::contains(&self.hardware, id),
        }
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        if let Some(bits) = &mut self.software {
            return bits.set(id.index());
        }
        if pointers::contains(&self.hardware, id) {
            return true;
        }
        if self.hardware.len() < self.capacity {
            return pointers::insert(&mut self.hardware, id);
        }
        self.trap_to_software(id)
    }

    fn remove_sharer(&mut self, id: TileId, _ack_expected: bool) -> bool {
        let Some(bits) = &mut self.software else {
            return pointers::remove(&mut self.hardware, id);
        };
        let removed = bits.clear(id.index());
        if bits.is_empty() {
            self.software = None;
        }
        removed
    }

    fn num_sharers(&self) -> usize {
        self.software
            .as_ref()
            .map_or(self.hardware.len(), BitVector::count)
    }

    fn one_sharer(&self) -> Option<TileId> {
        match &self.software {
            Some(bits) => bits.first().map(|i| TileId::new(i as u32)),
            None => self.hardware.first().copied(),
        }
    }

    fn sharers_list(&self) -> SharersList {
        let tiles = match &self.software {
            Some(bits) => bits.iter().map(|i| TileId::new(i as u32)).collect(),
            None => self.hardware.clone(),
        };
        SharersList { exact: true, tiles }
    }

    fn latency(&self) -> u64 {
        if self.in_software() {
            self.trap_penalty
        } else {
            0
        }
    }

    fn clear(&mut self) {
        self.hardware.clear();
        self.software = None;
    }
}
