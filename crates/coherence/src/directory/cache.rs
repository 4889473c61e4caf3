//! Set-associative directory cache.
//!
//! A home controller can only track a bounded number of lines. The cache
//! maps line addresses onto `total_entries / associativity` sets; a line can
//! only occupy a way of its own set. When a set is full, the controller picks
//! a victim with [`DirectoryCache::select_victim`], nullifies it, and reuses
//! its slot via [`DirectoryCache::rebind`].
//!
//! Victim order: bound `UNCACHED` entries first, then the entry with the
//! fewest sharers, ties broken by the lowest way. Entries whose address has a
//! transaction in flight are never chosen.

use std::collections::HashMap;

use crate::common::{PhysAddr, ceil_log2, floor_log2};
use crate::config::Config;

use super::{Directory, DirectoryEntry, DirectoryState, SchemeParams};

/// Outcome of [`DirectoryCache::lookup_or_allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// The address already had an entry in this slot.
    Hit(usize),
    /// A free way was bound to the address.
    Allocated(usize),
    /// Every way of the set is bound to another address.
    Full,
}

/// A replacement victim chosen by [`DirectoryCache::select_victim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Victim {
    /// Slot holding the victim entry.
    pub slot: usize,
    /// Address the victim entry is bound to.
    pub address: PhysAddr,
    /// Directory state of the victim.
    pub state: DirectoryState,
}

/// Bounded, set-associative store of directory entries.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    directory: Directory,
    num_sets: usize,
    associativity: usize,
    set_shift: u32,
    bound: HashMap<PhysAddr, usize>,
}

impl DirectoryCache {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `total_entries` - Slots in this controller's slice; a multiple of `associativity`.
    /// * `associativity` - Ways per set.
    /// * `line_size` - Cache line size in bytes.
    /// * `num_slices` - Number of home controllers sharing the address space.
    /// * `params` - Scheme parameters for every entry.
    pub fn new(
        total_entries: usize,
        associativity: usize,
        line_size: u64,
        num_slices: usize,
        params: SchemeParams,
    ) -> Self {
        let associativity = associativity.max(1);
        Self {
            directory: Directory::new(total_entries, params),
            num_sets: (total_entries / associativity).max(1),
            associativity,
            set_shift: floor_log2(line_size) + ceil_log2(num_slices as u64),
            bound: HashMap::new(),
        }
    }

    /// Builds the cache for one home slice of a validated configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.directory.total_entries,
            config.directory.associativity,
            config.general.cache_line_size,
            config.home_tiles().len(),
            SchemeParams::from_config(config),
        )
    }

    /// Number of sets.
    pub const fn num_sets(&self) -> usize {
        self.num_sets
    }

    /// Ways per set.
    pub const fn associativity(&self) -> usize {
        self.associativity
    }

    /// Total slots.
    pub fn capacity(&self) -> usize {
        self.directory.len()
    }

    /// Number of bound entries.
    pub fn num_bound(&self) -> usize {
        self.bound.len()
    }

    /// Scheme parameters of every entry.
    pub const fn params(&self) -> &SchemeParams {
        self.directory.params()
    }

    /// Set an address maps to.
    pub const fn set_index(&self, address: PhysAddr) -> usize {
        ((address.val() >> self.set_shift) % self.num_sets as u64) as usize
    }

    /// Slot bound to `address`, if any.
    pub fn lookup(&self, address: PhysAddr) -> Option<usize> {
        self.bound.get(&address).copied()
    }

    /// Entry bound to `address`, if any.
    pub fn find(&self, address: PhysAddr) -> Option<&DirectoryEntry> {
        self.lookup(address)
            .and_then(|slot| self.directory.get_directory_entry(slot))
    }

    /// Mutable entry bound to `address`, if any.
    pub fn find_mut(&mut self, address: PhysAddr) -> Option<&mut DirectoryEntry> {
        let slot = self.lookup(address)?;
        self.directory.get_directory_entry_mut(slot)
    }

    /// Entry in `slot`.
    pub fn entry(&self, slot: usize) -> Option<&DirectoryEntry> {
        self.directory.get_directory_entry(slot)
    }

    /// Mutable entry in `slot`.
    pub fn entry_mut(&mut self, slot: usize) -> Option<&mut DirectoryEntry> {
        self.directory.get_directory_entry_mut(slot)
    }

    /// Returns the slot of `address`, binding a free way of its set on a miss.
    pub fn lookup_or_allocate(&mut self, address: PhysAddr) -> Lookup {
        if let Some(slot) = self.lookup(address) {
            return Lookup::Hit(slot);
        }
        let free = self
            .replacement_candidates(address)
            .find(|&slot| self.entry(slot).is_some_and(|e| !e.is_bound()));
        match free {
            Some(slot) => {
                self.bind_slot(slot, address);
                Lookup::Allocated(slot)
            }
            None => Lookup::Full,
        }
    }

    /// Slots of the set `address` maps to, in way order.
    pub fn replacement_candidates(&self, address: PhysAddr) -> impl Iterator<Item = usize> + use<> {
        let base = self.set_index(address) * self.associativity;
        base..base + self.associativity
    }

    /// Chooses the entry to evict for `address`, skipping busy entries.
    ///
    /// # Arguments
    ///
    /// * `address` - The line that needs a slot.
    /// * `is_busy` - Whether a bound address has a transaction in flight.
    ///
    /// # Returns
    ///
    /// The victim, or `None` when every way is busy.
    pub fn select_victim(
        &self,
        address: PhysAddr,
        is_busy: impl Fn(PhysAddr) -> bool,
    ) -> Option<Victim> {
        self.replacement_candidates(address)
            .filter_map(|slot| {
                let entry = self.entry(slot)?;
                let bound_to = entry.address()?;
                if is_busy(bound_to) {
                    return None;
                }
                let victim = Victim {
                    slot,
                    address: bound_to,
                    state: entry.state(),
                };
                let uncached = victim.state == DirectoryState::Uncached;
                Some(((!uncached, entry.num_sharers(), slot), victim))
            })
            .min_by_key(|(key, _)| *key)
            .map(|(_, victim)| victim)
    }

    /// Replaces the entry in `slot` with a fresh one bound to `address`.
    ///
    /// The previous entry must be `UNCACHED`. Returns the address it was bound to.
    pub fn rebind(&mut self, slot: usize, address: PhysAddr) -> Option<PhysAddr> {
        let fresh = self.directory.create_directory_entry();
        let old = self.directory.set_directory_entry(slot, fresh)?;
        debug_assert_eq!(old.state(), DirectoryState::Uncached);
        let previous = old.address();
        if let Some(prev) = previous {
            let _ = self.bound.remove(&prev);
        }
        self.bind_slot(slot, address);
        previous
    }

    /// Releases the entry bound to `address`. Returns whether one was bound.
    pub fn unbind(&mut self, address: PhysAddr) -> bool {
        let Some(slot) = self.bound.remove(&address) else {
            return false;
        };
        if let Some(entry) = self.directory.get_directory_entry_mut(slot) {
            entry.unbind();
        }
        true
    }

    /// Iterates bound entries in slot order.
    pub fn bound_entries(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.directory.iter().filter(|e| e.is_bound())
    }

    fn bind_slot(&mut self, slot: usize, address: PhysAddr) {
        if let Some(entry) = self.directory.get_directory_entry_mut(slot) {
            entry.bind(address);
            let _ = self.bound.insert(address, slot);
        }
    }
}
