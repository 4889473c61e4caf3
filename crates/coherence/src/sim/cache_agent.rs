//! Private-cache stand-in.
//!
//! A `CacheAgent` holds whole lines in `Shared` or `Modified` state, issues
//! requests to the home directory, answers invalidation, flush, and writeback
//! requests, and evicts lines when told to. It has unbounded capacity; every
//! eviction is explicit.

use std::collections::BTreeMap;

use crate::common::{PhysAddr, ProtocolError, TileId};
use crate::home::AddressHomeLookup;
use crate::protocol::{MemComponent, MsgType, Network, Packet, ShmemMsg, Writeback};

/// State of a line in a private cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Read-only copy.
    Shared,
    /// Writable, possibly dirty copy.
    Modified,
}

/// Permission a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Read permission (`SH_REQ`).
    Shared,
    /// Write permission (`EX_REQ`).
    Exclusive,
}

/// A line held by a private cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLine {
    /// Coherence state.
    pub state: CacheState,
    /// Line contents.
    pub data: Vec<u8>,
}

/// Private cache of one tile.
#[derive(Debug, Clone)]
pub struct CacheAgent {
    tile: TileId,
    line_size: u64,
    home_lookup: AddressHomeLookup,
    lines: BTreeMap<PhysAddr, CachedLine>,
    outstanding: BTreeMap<PhysAddr, RequestKind>,
    /// Dirty lines evicted but not yet written back; ride on the next request to their home.
    deferred: Vec<Writeback>,
    clock: u64,
}

impl CacheAgent {
    /// Creates an empty cache for `tile`.
    pub const fn new(tile: TileId, line_size: u64, home_lookup: AddressHomeLookup) -> Self {
        Self {
            tile,
            line_size,
            home_lookup,
            lines: BTreeMap::new(),
            outstanding: BTreeMap::new(),
            deferred: Vec::new(),
            clock: 0,
        }
    }

    /// Tile this cache belongs to.
    pub const fn tile(&self) -> TileId {
        self.tile
    }

    /// Line containing `address`, if held.
    pub fn line(&self, address: PhysAddr) -> Option<&CachedLine> {
        self.lines.get(&address.line(self.line_size))
    }

    /// Every held line.
    pub fn lines(&self) -> impl Iterator<Item = (PhysAddr, &CachedLine)> {
        self.lines.iter().map(|(&a, l)| (a, l))
    }

    /// Dirty lines waiting to be piggybacked.
    pub fn deferred_writebacks(&self) -> &[Writeback] {
        &self.deferred
    }

    /// Whether a request for the line containing `address` is in flight.
    pub fn is_outstanding(&self, address: PhysAddr) -> bool {
        self.outstanding.contains_key(&address.line(self.line_size))
    }

    /// Whether the cache already has the permission `kind` asks for.
    pub fn holds(&self, address: PhysAddr, kind: RequestKind) -> bool {
        match (self.line(address).map(|l| l.state), kind) {
            (Some(CacheState::Modified), _) | (Some(CacheState::Shared), RequestKind::Shared) => true,
            _ => false,
        }
    }

    /// Reads one byte if the line is held.
    pub fn read_byte(&self, address: PhysAddr) -> Option<u8> {
        let offset = address.line_offset(self.line_size);
        self.line(address).and_then(|l| l.data.get(offset).copied())
    }

    /// Writes one byte if the line is held in `Modified`. Returns whether it was written.
    pub fn write_byte(&mut self, address: PhysAddr, value: u8) -> bool {
        let offset = address.line_offset(self.line_size);
        match self.lines.get_mut(&address.line(self.line_size)) {
            Some(line) if line.state == CacheState::Modified => line
                .data
                .get_mut(offset)
                .map(|b| *b = value)
                .is_some(),
            _ => false,
        }
    }

    /// Sends a request for `address` unless it is already satisfied or in flight.
    ///
    /// A deferred writeback homed at the same tile is piggybacked on the request,
    /// preferring the requested line's own.
    /// Returns whether a request was sent.
    pub fn request(&mut self, kind: RequestKind, address: PhysAddr, net: &mut dyn Network) -> bool {
        let address = address.line(self.line_size);
        if self.holds(address, kind) || self.outstanding.contains_key(&address) {
            return false;
        }
        let home = self.home_lookup.get_home(address);
        let msg_type = match kind {
            RequestKind::Shared => MsgType::ShReq,
            RequestKind::Exclusive => MsgType::ExReq,
        };
        let mut msg = ShmemMsg::new(msg_type, self.tile, address).at(self.clock);
        // The line's own deferred copy goes first; the directory still lists us as its owner.
        let own = self.deferred.iter().position(|wb| wb.address == address);
        if let Some(pos) = own.or_else(|| {
            self.deferred
                .iter()
                .position(|wb| self.home_lookup.get_home(wb.address) == home)
        }) {
            msg = msg.with_writeback(self.deferred.swap_remove(pos));
        }
        self.send_to_directory(home, msg, net);
        let _ = self.outstanding.insert(address, kind);
        true
    }

    /// Drops the line containing `address` and notifies its home.
    ///
    /// With `piggyback`, a dirty line is kept aside and written back on the next
    /// request to the same home instead of immediately. Lines with a request in
    /// flight are never evicted. Returns whether a line was evicted.
    pub fn evict(&mut self, address: PhysAddr, piggyback: bool, net: &mut dyn Network) -> bool {
        let address = address.line(self.line_size);
        if self.outstanding.contains_key(&address) {
            return false;
        }
        let Some(line) = self.lines.remove(&address) else {
            return false;
        };
        let home = self.home_lookup.get_home(address);
        match line.state {
            CacheState::Shared => {
                let msg = ShmemMsg::new(MsgType::InvRep, self.tile, address)
                    .expecting_reply(false)
                    .at(self.clock);
                self.send_to_directory(home, msg, net);
            }
            CacheState::Modified if piggyback => self.deferred.push(Writeback {
                address,
                data: line.data,
            }),
            CacheState::Modified => {
                let msg = ShmemMsg::new(MsgType::FlushRep, self.tile, address)
                    .with_data(line.data)
                    .expecting_reply(false)
                    .at(self.clock);
                self.send_to_directory(home, msg, net);
            }
        }
        true
    }

    /// Writes back every deferred dirty line as a voluntary flush.
    pub fn flush_deferred(&mut self, net: &mut dyn Network) {
        for wb in std::mem::take(&mut self.deferred) {
            let home = self.home_lookup.get_home(wb.address);
            let msg = ShmemMsg::new(MsgType::FlushRep, self.tile, wb.address)
                .with_data(wb.data)
                .expecting_reply(false)
                .at(self.clock);
            self.send_to_directory(home, msg, net);
        }
    }

    /// Handles one message from a directory controller.
    pub fn handle_msg_from_dram_directory(
        &mut self,
        sender: TileId,
        msg: ShmemMsg,
        net: &mut dyn Network,
    ) -> Result<(), ProtocolError> {
        self.clock = self.clock.max(msg.time);
        let address = msg.address;
        let conflict = ProtocolError::CacheStateConflict {
            msg_type: msg.msg_type,
            address,
            tile: self.tile,
        };
        match msg.msg_type {
            MsgType::ExRep | MsgType::ShRep => {
                let data = msg.data.ok_or(ProtocolError::MissingData {
                    msg_type: msg.msg_type,
                    address,
                    sender,
                })?;
                let state = if msg.msg_type == MsgType::ExRep {
                    CacheState::Modified
                } else {
                    CacheState::Shared
                };
                let _ = self.outstanding.remove(&address);
                let _ = self.lines.insert(address, CachedLine { state, data });
                Ok(())
            }
            MsgType::InvReq => match self.lines.get(&address).map(|l| l.state) {
                Some(CacheState::Shared) => {
                    let _ = self.lines.remove(&address);
                    let reply = ShmemMsg::new(MsgType::InvRep, msg.requester, address)
                        .expecting_reply(msg.reply_expected)
                        .at(self.clock);
                    self.send_to_directory(sender, reply, net);
                    Ok(())
                }
                Some(CacheState::Modified) => Err(conflict),
                None => Ok(()),
            },
            MsgType::FlushReq | MsgType::WbReq => {
                let downgrade = msg.msg_type == MsgType::WbReq;
                let reply = match self.lines.get_mut(&address) {
                    Some(line) if line.state == CacheState::Modified => {
                        if downgrade {
                            line.state = CacheState::Shared;
                            Some((MsgType::WbRep, line.data.clone()))
                        } else {
                            self.lines
                                .remove(&address)
                                .map(|l| (MsgType::FlushRep, l.data))
                        }
                    }
                    Some(_) => return Err(conflict),
                    None => self
                        .deferred
                        .iter()
                        .position(|wb| wb.address == address)
                        .map(|pos| (MsgType::FlushRep, self.deferred.swap_remove(pos).data)),
                };
                if let Some((reply_type, data)) = reply {
                    let reply = ShmemMsg::new(reply_type, msg.requester, address)
                        .with_data(data)
                        .expecting_reply(msg.reply_expected)
                        .at(self.clock);
                    self.send_to_directory(sender, reply, net);
                }
                Ok(())
            }
            other => Err(ProtocolError::UnsupportedMessage { msg_type: other }),
        }
    }

    fn send_to_directory(&self, home: TileId, msg: ShmemMsg, net: &mut dyn Network) {
        net.send(Packet {
            sender: self.tile,
            receiver: home,
            component: MemComponent::DramDirectory,
            msg,
        });
    }
}
