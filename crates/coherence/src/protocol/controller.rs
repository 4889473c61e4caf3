//! Home directory controller.
//!
//! A `DirectoryCntlr` serializes all coherence traffic for the lines homed at
//! its tile. Every transaction follows the same shape:
//! 1. **Admission:** A request joins the FIFO of its address; only the front request runs.
//! 2. **Entry acquisition:** The directory cache is searched; a miss in a full set
//!    reclaims another address's entry through a `NULLIFY_REQ` transaction first.
//! 3. **Sub-transactions:** Invalidations, flushes, or writebacks are sent and the
//!    request is parked with an explicit [`Wait`] continuation.
//! 4. **Replies:** Each reply updates the entry unconditionally; when the parked
//!    request's condition is met it is re-run against the new state.
//! 5. **Completion:** The grant is sent, the request leaves the queue, and the next
//!    request for the address (plus any request waiting for a slot in the set) runs.
//!
//! Messages that contradict the directory state are returned as
//! [`ProtocolError`]; the caller must stop the run.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::{debug, trace, warn};

use crate::common::{ConfigError, PhysAddr, ProtocolError, TileId};
use crate::config::Config;
use crate::directory::{DirectoryCache, DirectoryEntry, DirectoryState, DirectoryType, Lookup};
use crate::dram::{BackingStore, DramCntlr};
use crate::home::AddressHomeLookup;
use crate::stats::DirectoryStats;
use crate::timing::{AccessKind, FixedLatencyModel, LatencyModel, ShmemPerfModel};

use super::msg::{MsgType, ShmemMsg, ShmemReq, Wait, Writeback};
use super::network::{MemComponent, Network, Packet};
use super::req_queue::{Admission, ReqQueueList};

/// Directory controller of one home tile.
pub struct DirectoryCntlr<B = DramCntlr> {
    tile: TileId,
    line_size: u64,
    home_lookup: AddressHomeLookup,
    dir_cache: DirectoryCache,
    req_queues: ReqQueueList,
    dram: B,
    latency: Box<dyn LatencyModel>,
    perf: ShmemPerfModel,
    /// Victim address -> address waiting for its slot.
    evictions: HashMap<PhysAddr, PhysAddr>,
    /// Set index -> addresses whose request found every way busy.
    slot_waiters: HashMap<usize, VecDeque<PhysAddr>>,
    stats: DirectoryStats,
}

impl DirectoryCntlr<DramCntlr> {
    /// Builds the controller of `tile` with its own DRAM controller.
    pub fn from_config(tile: TileId, config: &Config) -> Result<Self, ConfigError> {
        Self::with_backing_store(tile, config, DramCntlr::from_config(config))
    }

    /// Counters including the backing store's.
    pub fn stats_with_dram(&self) -> DirectoryStats {
        let mut stats = self.stats();
        stats.record_dram(self.dram.stats());
        stats
    }
}

impl<B: BackingStore> DirectoryCntlr<B> {
    /// Builds the controller of `tile` on top of an arbitrary backing store.
    ///
    /// # Arguments
    ///
    /// * `tile` - Home tile hosting this controller.
    /// * `config` - Machine configuration; validated here.
    /// * `dram` - Store serving line data.
    ///
    /// # Returns
    ///
    /// The controller, or a configuration error if `config` is invalid or `tile`
    /// is not one of the configured home tiles.
    pub fn with_backing_store(tile: TileId, config: &Config, dram: B) -> Result<Self, ConfigError> {
        config.validate()?;
        let home_lookup = AddressHomeLookup::from_config(config)?;
        if !home_lookup.tiles().contains(&tile) {
            return Err(ConfigError::Inconsistent(format!(
                "{tile} is not a home tile"
            )));
        }
        let dir_cache = DirectoryCache::from_config(config);
        if config.directory.directory_type == DirectoryType::LimitedNoBroadcast
            && config.directory.max_hw_sharers < config.max_num_sharers()
        {
            warn!(
                tile = %tile,
                max_hw_sharers = config.directory.max_hw_sharers,
                "limited_no_broadcast caps every line at max_hw_sharers readers"
            );
        }
        debug!(
            tile = %tile,
            scheme = %config.directory.directory_type,
            sets = dir_cache.num_sets(),
            ways = dir_cache.associativity(),
            entry_bits = dir_cache.params().entry_size_bits(),
            "directory controller ready"
        );
        Ok(Self {
            tile,
            line_size: config.general.cache_line_size,
            home_lookup,
            dir_cache,
            req_queues: ReqQueueList::new(),
            dram,
            latency: Box::new(FixedLatencyModel::new(config.directory.access_cycles)),
            perf: ShmemPerfModel::new(),
            evictions: HashMap::new(),
            slot_waiters: HashMap::new(),
            stats: DirectoryStats::default(),
        })
    }

    /// Replaces the directory access latency model.
    #[must_use]
    pub fn with_latency_model(mut self, latency: Box<dyn LatencyModel>) -> Self {
        self.latency = latency;
        self
    }

    /// Tile hosting this controller.
    pub const fn tile(&self) -> TileId {
        self.tile
    }

    /// Current cycle of this controller.
    pub const fn cycle(&self) -> u64 {
        self.perf.cycle()
    }

    /// Controller counters.
    pub fn stats(&self) -> DirectoryStats {
        DirectoryStats {
            cycles: self.perf.cycle(),
            ..self.stats
        }
    }

    /// Backing store.
    pub const fn dram(&self) -> &B {
        &self.dram
    }

    /// Directory cache.
    pub const fn directory_cache(&self) -> &DirectoryCache {
        &self.dir_cache
    }

    /// Entry bound to the line containing `address`.
    pub fn entry(&self, address: PhysAddr) -> Option<&DirectoryEntry> {
        self.dir_cache.find(address.line(self.line_size))
    }

    /// Directory state of the line containing `address`; unbound lines are `UNCACHED`.
    pub fn entry_state(&self, address: PhysAddr) -> DirectoryState {
        self.entry(address)
            .map_or(DirectoryState::Uncached, DirectoryEntry::state)
    }

    /// Requests queued across all lines, including active ones.
    pub fn pending_requests(&self) -> usize {
        self.req_queues.total_pending()
    }

    /// Whether no transaction is in flight.
    pub fn is_idle(&self) -> bool {
        self.req_queues.is_empty()
    }

    /// Handles one message from a private cache.
    ///
    /// # Arguments
    ///
    /// * `sender` - Tile whose cache sent the message.
    /// * `msg` - `EX_REQ`, `SH_REQ`, `INV_REP`, `FLUSH_REP`, or `WB_REP`.
    /// * `net` - Transport for the messages this step produces.
    ///
    /// # Returns
    ///
    /// An error if the message violates the protocol; the controller state is
    /// then undefined and the run must stop.
    pub fn handle_msg_from_l2_cache(
        &mut self,
        sender: TileId,
        mut msg: ShmemMsg,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let address = msg.address.line(self.line_size);
        msg.address = address;
        self.check_home(address)?;
        self.perf.advance_to(msg.time);
        trace!(
            tile = %self.tile,
            sender = %sender,
            address = %address,
            msg_type = %msg.msg_type,
            "directory received"
        );

        match msg.msg_type {
            MsgType::ExReq | MsgType::ShReq => {
                if let Some(writeback) = msg.writeback.take() {
                    self.apply_writeback(sender, writeback, net)?;
                }
                if msg.msg_type == MsgType::ExReq {
                    self.stats.ex_reqs += 1;
                } else {
                    self.stats.sh_reqs += 1;
                }
                msg.requester = sender;
                let req = ShmemReq::new(msg, self.perf.cycle());
                match self.req_queues.enqueue(address, req) {
                    Admission::Admitted => self.process_active(address, net),
                    Admission::Deferred => {
                        trace!(tile = %self.tile, address = %address, "request deferred");
                        Ok(())
                    }
                }
            }
            MsgType::InvRep => self.process_inv_rep(sender, &msg, net),
            MsgType::FlushRep => self.process_flush_rep(sender, msg, net),
            MsgType::WbRep => self.process_wb_rep(sender, msg, net),
            other => Err(ProtocolError::UnsupportedMessage { msg_type: other }),
        }
    }

    // ══════════════════════════════════════════════════════════
    // Request processing
    // ══════════════════════════════════════════════════════════

    fn process_active(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        let Some(req) = self.req_queues.front(address) else {
            return Ok(());
        };
        let msg_type = req.msg_type();
        self.perf.advance_to(req.time);
        match msg_type {
            MsgType::NullifyReq => self.process_nullify_req(address, net),
            MsgType::ExReq => self.process_ex_req(address, net),
            MsgType::ShReq => self.process_sh_req(address, net),
            other => Err(ProtocolError::UnsupportedMessage { msg_type: other }),
        }
    }

    fn process_ex_req(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        if !self.acquire_entry(address, net)? {
            return Ok(());
        }
        let requester = self.requester_of(address);
        let entry = self.bound_entry_mut(address, MsgType::ExReq, requester)?;
        let state = entry.state();
        match state {
            DirectoryState::Exclusive => {
                let owner = entry.owner().filter(|&o| o != requester).ok_or(
                    ProtocolError::UnexpectedMessage {
                        msg_type: MsgType::ExReq,
                        address,
                        sender: requester,
                        state,
                    },
                )?;
                self.send_to_cache(owner, MsgType::FlushReq, requester, address, None, net);
                self.stats.flush_reqs_sent += 1;
                self.set_wait(address, Wait::Flush { owner });
                Ok(())
            }
            DirectoryState::Shared => {
                let upgraded = entry.has_sharer(requester) && entry.remove_sharer(requester, false);
                if entry.num_sharers() == 0 {
                    entry.set_state(DirectoryState::Uncached);
                    return self.grant_exclusive(address, requester, net);
                }
                let exclude = upgraded.then_some(requester);
                let outstanding = self.send_invalidations(address, requester, exclude, net)?;
                self.set_wait(address, Wait::Invalidations { outstanding });
                Ok(())
            }
            DirectoryState::Uncached => self.grant_exclusive(address, requester, net),
        }
    }

    fn process_sh_req(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        if !self.acquire_entry(address, net)? {
            return Ok(());
        }
        let requester = self.requester_of(address);
        let entry = self.bound_entry_mut(address, MsgType::ShReq, requester)?;
        let state = entry.state();
        let unexpected = ProtocolError::UnexpectedMessage {
            msg_type: MsgType::ShReq,
            address,
            sender: requester,
            state,
        };
        match state {
            DirectoryState::Exclusive => {
                let owner = entry
                    .owner()
                    .filter(|&o| o != requester)
                    .ok_or(unexpected)?;
                self.send_to_cache(owner, MsgType::WbReq, requester, address, None, net);
                self.stats.wb_reqs_sent += 1;
                self.set_wait(address, Wait::Writeback { owner });
                Ok(())
            }
            DirectoryState::Shared => {
                if entry.has_sharer(requester) {
                    return Err(unexpected);
                }
                if entry.add_sharer(requester) {
                    return self.grant_shared(address, requester, net);
                }
                let victim = entry.one_sharer().ok_or(unexpected)?;
                self.stats.sharer_capacity_fallbacks += 1;
                debug!(
                    tile = %self.tile,
                    address = %address,
                    victim = %victim,
                    "sharer pointers exhausted, invalidating one sharer"
                );
                self.send_to_cache(victim, MsgType::InvReq, requester, address, None, net);
                self.stats.inv_reqs_sent += 1;
                self.set_wait(address, Wait::Room { victim });
                Ok(())
            }
            DirectoryState::Uncached => {
                if !entry.add_sharer(requester) {
                    return Err(unexpected);
                }
                entry.set_state(DirectoryState::Shared);
                self.grant_shared(address, requester, net)
            }
        }
    }

    fn process_nullify_req(&mut self, victim: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        let tile = self.tile;
        let entry = self.bound_entry_mut(victim, MsgType::NullifyReq, tile)?;
        let state = entry.state();
        debug!(tile = %tile, address = %victim, state = %state, "nullifying entry");
        match state {
            DirectoryState::Exclusive => {
                let owner = entry.owner().ok_or(ProtocolError::UnexpectedMessage {
                    msg_type: MsgType::NullifyReq,
                    address: victim,
                    sender: tile,
                    state,
                })?;
                self.send_to_cache(owner, MsgType::FlushReq, tile, victim, None, net);
                self.stats.flush_reqs_sent += 1;
                self.set_wait(victim, Wait::Flush { owner });
                Ok(())
            }
            DirectoryState::Shared => {
                let outstanding = self.send_invalidations(victim, tile, None, net)?;
                self.set_wait(victim, Wait::Invalidations { outstanding });
                Ok(())
            }
            DirectoryState::Uncached => self.complete_nullify(victim, net),
        }
    }

    // ══════════════════════════════════════════════════════════
    // Reply processing
    // ══════════════════════════════════════════════════════════

    fn process_inv_rep(
        &mut self,
        sender: TileId,
        msg: &ShmemMsg,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let address = msg.address;
        let entry = self.bound_entry_mut(address, MsgType::InvRep, sender)?;
        let state = entry.state();
        if state != DirectoryState::Shared {
            return Err(ProtocolError::UnexpectedMessage {
                msg_type: MsgType::InvRep,
                address,
                sender,
                state,
            });
        }
        if !entry.remove_sharer(sender, msg.reply_expected) {
            return Err(ProtocolError::NotASharer { sender, address });
        }
        if entry.num_sharers() == 0 {
            entry.set_state(DirectoryState::Uncached);
        }

        match self.wait_of(address) {
            Some(Wait::Invalidations { outstanding }) => {
                let remaining = outstanding.saturating_sub(1);
                if remaining == 0 {
                    self.resume(address, net)
                } else {
                    self.set_wait(address, Wait::Invalidations { outstanding: remaining });
                    Ok(())
                }
            }
            Some(Wait::Room { victim }) if victim == sender => self.resume(address, net),
            _ if msg.reply_expected => Err(ProtocolError::NoOutstandingRequest {
                msg_type: MsgType::InvRep,
                address,
                sender,
            }),
            _ => {
                self.stats.voluntary_evictions += 1;
                self.release_if_idle(address, net)
            }
        }
    }

    fn process_flush_rep(
        &mut self,
        sender: TileId,
        msg: ShmemMsg,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let address = msg.address;
        let line_size = self.line_size;
        let entry = self.bound_entry_mut(address, MsgType::FlushRep, sender)?;
        let state = entry.state();
        if state != DirectoryState::Exclusive {
            return Err(ProtocolError::UnexpectedMessage {
                msg_type: MsgType::FlushRep,
                address,
                sender,
                state,
            });
        }
        if entry.owner() != Some(sender) {
            return Err(ProtocolError::NotASharer { sender, address });
        }
        let data = msg
            .data
            .filter(|d| d.len() as u64 == line_size)
            .ok_or(ProtocolError::MissingData {
                msg_type: MsgType::FlushRep,
                address,
                sender,
            })?;
        let _ = entry.remove_sharer(sender, msg.reply_expected);
        entry.set_owner(None);
        entry.set_state(DirectoryState::Uncached);
        self.store_line(address, &data);

        match self.wait_of(address) {
            Some(Wait::Flush { owner } | Wait::Writeback { owner }) if owner == sender => {
                if let Some(req) = self.req_queues.front_mut(address) {
                    req.data = Some(data);
                }
                self.resume(address, net)
            }
            _ if msg.reply_expected => Err(ProtocolError::NoOutstandingRequest {
                msg_type: MsgType::FlushRep,
                address,
                sender,
            }),
            _ => {
                self.stats.voluntary_evictions += 1;
                self.release_if_idle(address, net)
            }
        }
    }

    fn process_wb_rep(
        &mut self,
        sender: TileId,
        msg: ShmemMsg,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let address = msg.address;
        let line_size = self.line_size;
        let waiting = matches!(
            self.wait_of(address),
            Some(Wait::Writeback { owner }) if owner == sender
        );
        let entry = self.bound_entry_mut(address, MsgType::WbRep, sender)?;
        let state = entry.state();
        if state != DirectoryState::Exclusive {
            return Err(ProtocolError::UnexpectedMessage {
                msg_type: MsgType::WbRep,
                address,
                sender,
                state,
            });
        }
        if entry.owner() != Some(sender) {
            return Err(ProtocolError::NotASharer { sender, address });
        }
        if !waiting {
            return Err(ProtocolError::NoOutstandingRequest {
                msg_type: MsgType::WbRep,
                address,
                sender,
            });
        }
        let data = msg
            .data
            .filter(|d| d.len() as u64 == line_size)
            .ok_or(ProtocolError::MissingData {
                msg_type: MsgType::WbRep,
                address,
                sender,
            })?;
        // The prior owner keeps a read-only copy.
        entry.set_owner(None);
        entry.set_state(DirectoryState::Shared);
        self.store_line(address, &data);
        if let Some(req) = self.req_queues.front_mut(address) {
            req.data = Some(data);
        }
        self.resume(address, net)
    }

    // ══════════════════════════════════════════════════════════
    // Grants and completion
    // ══════════════════════════════════════════════════════════

    fn grant_exclusive(
        &mut self,
        address: PhysAddr,
        requester: TileId,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let entry = self.bound_entry_mut(address, MsgType::ExReq, requester)?;
        let state = entry.state();
        if state != DirectoryState::Uncached || !entry.add_sharer(requester) {
            return Err(ProtocolError::UnexpectedMessage {
                msg_type: MsgType::ExReq,
                address,
                sender: requester,
                state,
            });
        }
        entry.set_owner(Some(requester));
        entry.set_state(DirectoryState::Exclusive);
        let data = self.line_data(address);
        debug!(tile = %self.tile, address = %address, owner = %requester, "granted exclusive");
        self.send_to_cache(requester, MsgType::ExRep, requester, address, Some(data), net);
        self.finish_request(address, net)
    }

    fn grant_shared(
        &mut self,
        address: PhysAddr,
        requester: TileId,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let data = self.line_data(address);
        debug!(tile = %self.tile, address = %address, sharer = %requester, "granted shared");
        self.send_to_cache(requester, MsgType::ShRep, requester, address, Some(data), net);
        self.finish_request(address, net)
    }

    /// Clears the continuation of the active request and re-runs it.
    fn resume(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        if let Some(req) = self.req_queues.front_mut(address) {
            req.wait = None;
        }
        self.process_active(address, net)
    }

    fn finish_request(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        let _ = self.req_queues.dequeue(address);
        if self.req_queues.is_busy(address) {
            self.process_active(address, net)?;
        }
        self.release_if_idle(address, net)
    }

    /// Unbinds an `UNCACHED` entry with nothing queued, then lets waiters of
    /// its set retry.
    fn release_if_idle(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        if !self.req_queues.is_busy(address)
            && self.entry_state(address) == DirectoryState::Uncached
            && self.dir_cache.unbind(address)
        {
            trace!(tile = %self.tile, address = %address, "entry released");
        }
        self.wake_slot_waiters(self.dir_cache.set_index(address), net)
    }

    fn wake_slot_waiters(&mut self, set: usize, net: &mut dyn Network) -> Result<(), ProtocolError> {
        let Some(waiters) = self.slot_waiters.remove(&set) else {
            return Ok(());
        };
        for address in waiters {
            if self.wait_of(address) == Some(Wait::Slot) {
                self.resume(address, net)?;
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════
    // Directory-cache capacity
    // ══════════════════════════════════════════════════════════

    /// Makes sure `address` has a bound entry.
    ///
    /// Returns `false` when the active request had to be parked until a slot frees.
    fn acquire_entry(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<bool, ProtocolError> {
        self.stats.directory_accesses += 1;
        self.perf.incr(self.latency.latency(AccessKind::DirectoryLookup));
        let bound = match self.dir_cache.lookup_or_allocate(address) {
            Lookup::Hit(_) | Lookup::Allocated(_) => true,
            Lookup::Full => self.start_eviction(address, net)?,
        };
        if bound {
            let trap = self.dir_cache.find(address).map_or(0, DirectoryEntry::latency);
            if trap > 0 {
                self.stats.software_trap_accesses += 1;
                self.perf.incr(trap);
            }
        }
        Ok(bound)
    }

    fn start_eviction(&mut self, address: PhysAddr, net: &mut dyn Network) -> Result<bool, ProtocolError> {
        self.perf.incr(self.latency.latency(AccessKind::ReplacementLookup));
        let queues = &self.req_queues;
        let Some(victim) = self.dir_cache.select_victim(address, |a| queues.is_busy(a)) else {
            self.stats.slot_waits += 1;
            let set = self.dir_cache.set_index(address);
            let waiters = self.slot_waiters.entry(set).or_default();
            if !waiters.contains(&address) {
                waiters.push_back(address);
            }
            self.set_wait(address, Wait::Slot);
            debug!(tile = %self.tile, address = %address, set, "every way busy, waiting for a slot");
            return Ok(false);
        };

        self.stats.evictions += 1;
        if victim.state == DirectoryState::Uncached {
            let _ = self.dir_cache.rebind(victim.slot, address);
            return Ok(true);
        }

        self.stats.back_invalidations += 1;
        debug!(
            tile = %self.tile,
            address = %address,
            victim = %victim.address,
            state = %victim.state,
            "evicting directory entry"
        );
        let _ = self.evictions.insert(victim.address, address);
        self.set_wait(address, Wait::Eviction { victim: victim.address });
        let cycle = self.perf.cycle();
        let nullify = ShmemReq::new(
            ShmemMsg::new(MsgType::NullifyReq, self.tile, victim.address).at(cycle),
            cycle,
        );
        if self.req_queues.enqueue(victim.address, nullify) == Admission::Admitted {
            self.process_active(victim.address, net)?;
        }
        Ok(false)
    }

    fn complete_nullify(&mut self, victim: PhysAddr, net: &mut dyn Network) -> Result<(), ProtocolError> {
        let _ = self.req_queues.dequeue(victim);
        let beneficiary = self.evictions.remove(&victim);
        match (beneficiary, self.dir_cache.lookup(victim)) {
            (Some(next), Some(slot)) => {
                let _ = self.dir_cache.rebind(slot, next);
                debug!(tile = %self.tile, victim = %victim, address = %next, "slot reassigned");
                self.resume(next, net)?;
            }
            _ => {
                let _ = self.dir_cache.unbind(victim);
            }
        }
        if self.req_queues.is_busy(victim) {
            self.process_active(victim, net)?;
        }
        self.wake_slot_waiters(self.dir_cache.set_index(victim), net)
    }

    // ══════════════════════════════════════════════════════════
    // Helpers
    // ══════════════════════════════════════════════════════════

    fn check_home(&self, address: PhysAddr) -> Result<(), ProtocolError> {
        let home = self.home_lookup.get_home(address);
        if home == self.tile {
            Ok(())
        } else {
            Err(ProtocolError::WrongHome {
                address,
                home,
                tile: self.tile,
            })
        }
    }

    fn apply_writeback(
        &mut self,
        sender: TileId,
        writeback: Writeback,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        let address = writeback.address.line(self.line_size);
        self.check_home(address)?;
        let msg = ShmemMsg::new(MsgType::FlushRep, sender, address)
            .with_data(writeback.data)
            .expecting_reply(false)
            .at(self.perf.cycle());
        self.process_flush_rep(sender, msg, net)
    }

    fn bound_entry_mut(
        &mut self,
        address: PhysAddr,
        msg_type: MsgType,
        sender: TileId,
    ) -> Result<&mut DirectoryEntry, ProtocolError> {
        self.dir_cache
            .find_mut(address)
            .ok_or(ProtocolError::MissingEntry {
                msg_type,
                address,
                sender,
            })
    }

    fn requester_of(&self, address: PhysAddr) -> TileId {
        self.req_queues
            .front(address)
            .map_or(self.tile, ShmemReq::requester)
    }

    fn wait_of(&self, address: PhysAddr) -> Option<Wait> {
        self.req_queues.front(address).and_then(|r| r.wait)
    }

    fn set_wait(&mut self, address: PhysAddr, wait: Wait) {
        if let Some(req) = self.req_queues.front_mut(address) {
            req.wait = Some(wait);
        }
    }

    /// Data for a grant: forwarded by the prior owner if available, else fetched.
    fn line_data(&mut self, address: PhysAddr) -> Vec<u8> {
        if let Some(data) = self
            .req_queues
            .front_mut(address)
            .and_then(|r| r.data.take())
        {
            return data;
        }
        let latency = self.dram.access_latency(address, self.perf.cycle());
        self.perf.incr(latency);
        self.dram.fetch(address)
    }

    fn store_line(&mut self, address: PhysAddr, data: &[u8]) {
        let latency = self.dram.access_latency(address, self.perf.cycle());
        self.perf.incr(latency);
        self.dram.store(address, data);
    }

    /// Invalidates every sharer except `exclude`; returns the number of replies owed.
    fn send_invalidations(
        &mut self,
        address: PhysAddr,
        requester: TileId,
        exclude: Option<TileId>,
        net: &mut dyn Network,
    ) -> Result<usize, ProtocolError> {
        let entry = self.bound_entry_mut(address, MsgType::InvReq, requester)?;
        let outstanding = entry.num_sharers();
        let list = entry.sharers_list();
        if list.exact {
            for sharer in list.tiles.into_iter().filter(|&t| Some(t) != exclude) {
                self.send_to_cache(sharer, MsgType::InvReq, requester, address, None, net);
                self.stats.inv_reqs_sent += 1;
            }
        } else {
            let msg = ShmemMsg::new(MsgType::InvReq, requester, address).at(self.perf.cycle());
            net.broadcast(self.tile, &msg, exclude);
            self.stats.broadcasts += 1;
        }
        trace!(tile = %self.tile, address = %address, outstanding, exact = list.exact, "invalidations sent");
        Ok(outstanding)
    }

    fn send_to_cache(
        &self,
        receiver: TileId,
        msg_type: MsgType,
        requester: TileId,
        address: PhysAddr,
        data: Option<Vec<u8>>,
        net: &mut dyn Network,
    ) {
        let mut msg = ShmemMsg::new(msg_type, requester, address).at(self.perf.cycle());
        msg.data = data;
        net.send(Packet {
            sender: self.tile,
            receiver,
            component: MemComponent::L2Cache,
            msg,
        });
    }
}

impl<B> fmt::Debug for DirectoryCntlr<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryCntlr")
            .field("tile", &self.tile)
            .field("cycle", &self.perf.cycle())
            .field("bound_entries", &self.dir_cache.num_bound())
            .field("pending_requests", &self.req_queues.total_pending())
            .field("evictions_in_flight", &self.evictions.len())
            .finish_non_exhaustive()
    }
}
