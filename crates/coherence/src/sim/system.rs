//! In-process multi-tile machine.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace};

use crate::common::{PhysAddr, SimError, TileId};
use crate::config::Config;
use crate::directory::DirectoryState;
use crate::home::AddressHomeLookup;
use crate::protocol::{DirectoryCntlr, MemComponent, Network, Packet};
use crate::stats::DirectoryStats;

use super::cache_agent::{CacheAgent, CacheState, RequestKind};

/// Single FIFO of packets in flight.
///
/// One global queue gives a deterministic, totally ordered delivery, which in
/// particular preserves order between every pair of tiles.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    num_tiles: u32,
    queue: VecDeque<Packet>,
    delivered: u64,
}

impl EventQueue {
    /// Creates an empty queue for `num_tiles` tiles.
    pub const fn new(num_tiles: u32) -> Self {
        Self {
            num_tiles,
            queue: VecDeque::new(),
            delivered: 0,
        }
    }

    /// Packets not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Packets delivered so far.
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Packets not yet delivered, in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &Packet> {
        self.queue.iter()
    }

    fn pop(&mut self) -> Option<Packet> {
        let packet = self.queue.pop_front()?;
        self.delivered += 1;
        Some(packet)
    }
}

impl Network for EventQueue {
    fn num_tiles(&self) -> u32 {
        self.num_tiles
    }

    fn send(&mut self, packet: Packet) {
        self.queue.push_back(packet);
    }
}

/// A machine of private caches and home directory controllers.
#[derive(Debug)]
pub struct System {
    config: Config,
    line_size: u64,
    home_lookup: AddressHomeLookup,
    caches: Vec<CacheAgent>,
    directories: BTreeMap<TileId, DirectoryCntlr>,
    network: EventQueue,
}

impl System {
    /// Builds every tile described by `config`.
    pub fn new(config: Config) -> Result<Self, SimError> {
        config.validate()?;
        let line_size = config.general.cache_line_size;
        let home_lookup = AddressHomeLookup::from_config(&config)?;
        let caches = (0..config.general.num_tiles)
            .map(|t| CacheAgent::new(TileId::new(t), line_size, home_lookup.clone()))
            .collect();
        let mut directories = BTreeMap::new();
        for &tile in home_lookup.tiles() {
            let _ = directories.insert(tile, DirectoryCntlr::from_config(tile, &config)?);
        }
        debug!(
            tiles = config.general.num_tiles,
            homes = directories.len(),
            scheme = %config.directory.directory_type,
            "system built"
        );
        Ok(Self {
            network: EventQueue::new(config.general.num_tiles),
            config,
            line_size,
            home_lookup,
            caches,
            directories,
        })
    }

    /// Configuration the machine was built from.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Number of tiles.
    pub fn num_tiles(&self) -> usize {
        self.caches.len()
    }

    /// Packets in flight.
    pub const fn network(&self) -> &EventQueue {
        &self.network
    }

    /// Private cache of `tile`.
    pub fn cache(&self, tile: TileId) -> Result<&CacheAgent, SimError> {
        self.caches
            .get(tile.index())
            .ok_or(SimError::UnknownTile(tile))
    }

    /// Directory controller hosted by `tile`, if it is a home tile.
    pub fn directory(&self, tile: TileId) -> Option<&DirectoryCntlr> {
        self.directories.get(&tile)
    }

    /// Home tile of `address`.
    pub fn home_of(&self, address: PhysAddr) -> TileId {
        self.home_lookup.get_home(address)
    }

    /// Directory state of the line containing `address`.
    pub fn entry_state(&self, address: PhysAddr) -> DirectoryState {
        self.directories
            .get(&self.home_of(address))
            .map_or(DirectoryState::Uncached, |d| d.entry_state(address))
    }

    /// Issues a request without delivering anything.
    ///
    /// Returns whether a message was sent (`false` if already satisfied or in flight).
    pub fn request(&mut self, tile: TileId, kind: RequestKind, address: PhysAddr) -> Result<bool, SimError> {
        let cache = self
            .caches
            .get_mut(tile.index())
            .ok_or(SimError::UnknownTile(tile))?;
        Ok(cache.request(kind, address, &mut self.network))
    }

    /// Voluntarily evicts a line, writing dirty data back immediately.
    pub fn evict(&mut self, tile: TileId, address: PhysAddr) -> Result<bool, SimError> {
        self.evict_with(tile, address, false)
    }

    /// Voluntarily evicts a line; dirty data rides on the tile's next request to the same home.
    pub fn evict_deferred(&mut self, tile: TileId, address: PhysAddr) -> Result<bool, SimError> {
        self.evict_with(tile, address, true)
    }

    fn evict_with(&mut self, tile: TileId, address: PhysAddr, piggyback: bool) -> Result<bool, SimError> {
        let cache = self
            .caches
            .get_mut(tile.index())
            .ok_or(SimError::UnknownTile(tile))?;
        Ok(cache.evict(address, piggyback, &mut self.network))
    }

    /// Writes back every deferred dirty line of every tile.
    pub fn flush_deferred(&mut self) {
        for cache in &mut self.caches {
            cache.flush_deferred(&mut self.network);
        }
    }

    /// Delivers one packet. Returns `false` if none was in flight.
    pub fn step(&mut self) -> Result<bool, SimError> {
        let Some(packet) = self.network.pop() else {
            return Ok(false);
        };
        trace!(
            from = %packet.sender,
            to = %packet.receiver,
            msg_type = %packet.msg.msg_type,
            address = %packet.msg.address,
            "deliver"
        );
        match packet.component {
            MemComponent::DramDirectory => {
                let directory = self
                    .directories
                    .get_mut(&packet.receiver)
                    .ok_or(SimError::NoController(packet.receiver))?;
                directory.handle_msg_from_l2_cache(packet.sender, packet.msg, &mut self.network)?;
            }
            MemComponent::L2Cache => {
                let cache = self
                    .caches
                    .get_mut(packet.receiver.index())
                    .ok_or(SimError::UnknownTile(packet.receiver))?;
                cache.handle_msg_from_dram_directory(packet.sender, packet.msg, &mut self.network)?;
            }
        }
        Ok(true)
    }

    /// Delivers packets until none is in flight. Returns how many were delivered.
    pub fn run_until_idle(&mut self) -> Result<u64, SimError> {
        let mut delivered = 0;
        while self.step()? {
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Reads one byte from `tile`, acquiring a shared copy first if needed.
    pub fn read(&mut self, tile: TileId, address: PhysAddr) -> Result<u8, SimError> {
        if let Some(value) = self.cache(tile)?.read_byte(address) {
            return Ok(value);
        }
        let _ = self.request(tile, RequestKind::Shared, address)?;
        let _ = self.run_until_idle()?;
        self.cache(tile)?
            .read_byte(address)
            .ok_or(SimError::Starved {
                tile,
                address: address.line(self.line_size),
            })
    }

    /// Writes one byte from `tile`, acquiring exclusive ownership first if needed.
    pub fn write(&mut self, tile: TileId, address: PhysAddr, value: u8) -> Result<(), SimError> {
        if !self.cache(tile)?.holds(address, RequestKind::Exclusive) {
            let _ = self.request(tile, RequestKind::Exclusive, address)?;
            let _ = self.run_until_idle()?;
        }
        let cache = self
            .caches
            .get_mut(tile.index())
            .ok_or(SimError::UnknownTile(tile))?;
        if cache.write_byte(address, value) {
            Ok(())
        } else {
            Err(SimError::Starved {
                tile,
                address: address.line(self.line_size),
            })
        }
    }

    /// Sums the counters of every directory controller.
    pub fn stats(&self) -> DirectoryStats {
        let mut total = DirectoryStats::default();
        for directory in self.directories.values() {
            total += directory.stats_with_dram();
        }
        total
    }

    /// Checks the coherence invariants across every cache and directory.
    ///
    /// Always checked: each bound entry's state/owner/sharer relation, and that
    /// no line has a writer alongside any other holder. When nothing is in
    /// flight, additionally checks that every directory entry agrees with the
    /// caches and that every read-only copy matches the backing store.
    pub fn check_invariants(&self) -> Result<(), SimError> {
        for directory in self.directories.values() {
            for entry in directory.directory_cache().bound_entries() {
                entry.check_invariants().map_err(SimError::Invariant)?;
            }
        }

        let mut holders: BTreeMap<PhysAddr, (Vec<TileId>, Vec<TileId>)> = BTreeMap::new();
        for cache in &self.caches {
            for (address, line) in cache.lines() {
                let (shared, modified) = holders.entry(address).or_default();
                match line.state {
                    CacheState::Shared => shared.push(cache.tile()),
                    CacheState::Modified => modified.push(cache.tile()),
                }
            }
            for wb in cache.deferred_writebacks() {
                holders.entry(wb.address).or_default().1.push(cache.tile());
            }
        }
        for (address, (shared, modified)) in &holders {
            if modified.len() > 1 || (!modified.is_empty() && !shared.is_empty()) {
                return Err(SimError::Invariant(format!(
                    "{address} has writers {modified:?} and readers {shared:?}"
                )));
            }
        }

        let quiescent =
            self.network.pending() == 0 && self.directories.values().all(DirectoryCntlr::is_idle);
        if quiescent {
            self.check_directory_agreement(&holders)?;
        }
        Ok(())
    }

    fn check_directory_agreement(
        &self,
        holders: &BTreeMap<PhysAddr, (Vec<TileId>, Vec<TileId>)>,
    ) -> Result<(), SimError> {
        for (&address, (shared, modified)) in holders {
            let home = self.home_of(address);
            let directory = self
                .directories
                .get(&home)
                .ok_or(SimError::NoController(home))?;
            let entry = directory.entry(address).ok_or_else(|| {
                SimError::Invariant(format!("{address} is cached but has no directory entry"))
            })?;
            if let Some(&owner) = modified.first() {
                if entry.state() != DirectoryState::Exclusive || entry.owner() != Some(owner) {
                    return Err(SimError::Invariant(format!(
                        "{address} is modified at {owner} but the directory has {} owned by {:?}",
                        entry.state(),
                        entry.owner()
                    )));
                }
                continue;
            }
            if entry.state() != DirectoryState::Shared || entry.num_sharers() != shared.len() {
                return Err(SimError::Invariant(format!(
                    "{address} is shared by {shared:?} but the directory has {} with {} sharers",
                    entry.state(),
                    entry.num_sharers()
                )));
            }
            let list = entry.sharers_list();
            if list.exact && list.tiles != *shared {
                return Err(SimError::Invariant(format!(
                    "{address} is shared by {shared:?} but the directory tracks {:?}",
                    list.tiles
                )));
            }
            let stored = directory.dram().peek(address);
            for &tile in shared {
                let data = self.cache(tile)?.line(address).map(|l| l.data.as_slice());
                let matches = match (data, stored) {
                    (Some(d), Some(s)) => d == s,
                    (Some(d), None) => d.iter().all(|&b| b == 0),
                    (None, _) => false,
                };
                if !matches {
                    return Err(SimError::Invariant(format!(
                        "read-only copy of {address} at {tile} differs from memory"
                    )));
                }
            }
        }

        for directory in self.directories.values() {
            for entry in directory.directory_cache().bound_entries() {
                let Some(address) = entry.address() else {
                    continue;
                };
                if entry.num_sharers() > 0 && !holders.contains_key(&address) {
                    return Err(SimError::Invariant(format!(
                        "directory lists {} sharers of {address} but no cache holds it",
                        entry.num_sharers()
                    )));
                }
            }
        }
        Ok(())
    }
}
