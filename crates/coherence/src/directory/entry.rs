//! Per-line directory entry.

use crate::common::{PhysAddr, TileId};

use super::DirectoryState;
use super::schemes::{SchemeParams, SharerTracking, Sharers, SharersList};

/// Directory record for one line: state, owner, and sharers.
///
/// An entry is *bound* while it tracks an address. The owner is only
/// meaningful in `Exclusive`, where it is also the single sharer.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    address: Option<PhysAddr>,
    state: DirectoryState,
    owner: Option<TileId>,
    sharers: Sharers,
}

impl DirectoryEntry {
    /// Creates an unbound, uncached entry of the configured scheme.
    pub fn new(params: &SchemeParams) -> Self {
        Self {
            address: None,
            state: DirectoryState::Uncached,
            owner: None,
            sharers: Sharers::new(params),
        }
    }

    /// Address this entry tracks, if bound.
    pub const fn address(&self) -> Option<PhysAddr> {
        self.address
    }

    /// Whether the entry tracks an address.
    pub const fn is_bound(&self) -> bool {
        self.address.is_some()
    }

    /// Binds the entry to `address`.
    pub fn bind(&mut self, address: PhysAddr) {
        self.address = Some(address);
    }

    /// Clears the binding and every piece of coherence state.
    pub fn unbind(&mut self) {
        self.address = None;
        self.state = DirectoryState::Uncached;
        self.owner = None;
        self.sharers.clear();
    }

    /// Directory state.
    pub const fn state(&self) -> DirectoryState {
        self.state
    }

    /// Sets the directory state.
    pub fn set_state(&mut self, state: DirectoryState) {
        self.state = state;
    }

    /// Exclusive owner, if any.
    pub const fn owner(&self) -> Option<TileId> {
        self.owner
    }

    /// Sets or clears the exclusive owner.
    pub fn set_owner(&mut self, owner: Option<TileId>) {
        self.owner = owner;
    }

    /// Whether `id` is a tracked sharer.
    pub fn has_sharer(&self, id: TileId) -> bool {
        self.sharers.has_sharer(id)
    }

    /// Adds a sharer; `false` means the scheme refused.
    pub fn add_sharer(&mut self, id: TileId) -> bool {
        self.sharers.add_sharer(id)
    }

    /// Removes a sharer; `false` means `id` cannot be a sharer.
    pub fn remove_sharer(&mut self, id: TileId, ack_expected: bool) -> bool {
        self.sharers.remove_sharer(id, ack_expected)
    }

    /// Total sharers, including untracked ones.
    pub fn num_sharers(&self) -> usize {
        self.sharers.num_sharers()
    }

    /// Lowest tracked sharer.
    pub fn one_sharer(&self) -> Option<TileId> {
        self.sharers.one_sharer()
    }

    /// Tracked sharers and whether the list is exact.
    pub fn sharers_list(&self) -> SharersList {
        self.sharers.sharers_list()
    }

    /// Underlying scheme state.
    pub const fn sharers(&self) -> &Sharers {
        &self.sharers
    }

    /// Extra access latency imposed by the scheme's current mode.
    pub fn latency(&self) -> u64 {
        self.sharers.latency()
    }

    /// Checks the state/owner/sharer-count relation.
    ///
    /// Holds between message deliveries; transient states inside a single
    /// handler are not observable.
    pub fn check_invariants(&self) -> Result<(), String> {
        let n = self.num_sharers();
        let ok = match self.state {
            DirectoryState::Uncached => n == 0 && self.owner.is_none(),
            DirectoryState::Shared => n >= 1 && self.owner.is_none(),
            DirectoryState::Exclusive => {
                n == 1 && self.owner.is_some_and(|owner| self.has_sharer(owner))
            }
        };
        if ok {
            Ok(())
        } else {
            Err(format!(
                "entry {} in {} has {n} sharers and owner {:?}",
                self.address
                    .map_or_else(|| "<unbound>".to_string(), |a| a.to_string()),
                self.state,
                self.owner
            ))
        }
    }
}
