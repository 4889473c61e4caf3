use crate::common::{BitVector, TileId};

use super::{SharerTracking, SharersList};

/// One presence bit per tile. Never overflows, always exact.
#[derive(Debug, Clone)]
pub struct FullMap {
    bits: BitVector,
}

impl FullMap {
    /// Creates an empty map able to hold `max_num_sharers` tiles.
    pub fn new(max_num_sharers: usize) -> Self {
        Self {
            bits: BitVector::new(max_num_sharers),
        }
    }
}

impl SharerTracking for FullMap {
    fn has_sharer(&self, id: TileId) -> bool {
        self.bits.at(id.index())
    }

    fn add_sharer(&mut self, id: TileId) -> bool {
        self.bits.set(id.index())
    }

    fn remove_sharer(&mut self, id: TileId, _ack_expected: bool) -> bool {
        self.bits.clear(id.index())
    }

    fn num_sharers(&self) -> usize {
        self.bits.count()
    }

    fn one_sharer(&self) -> Option<TileId> {
        self.bits.first().map(|i| TileId::new(i as u32))
    }

    fn sharers_list(&self) -> SharersList {
        SharersList {
            exact: true,
            tiles: self.bits.iter().map(|i| TileId::new(i as u32)).collect(),
        }
    }

    fn clear(&mut self) {
        self.bits.reset();
    }
}
