//! Directory storage.
//!
//! This module holds everything a home controller knows about the lines it
//! owns:
//! 1. **States:** The MSI-style directory state of a line (`DirectoryState`).
//! 2. **Schemes:** Interchangeable sharer-tracking structures (`schemes`).
//! 3. **Entries:** One state + owner + sharer record per tracked line (`entry`).
//! 4. **Storage:** A flat arena of entries (`Directory`) and the set-associative
//!    cache of bound entries on top of it (`cache`).

/// Set-associative directory cache.
pub mod cache;

/// Per-line directory entry.
pub mod entry;

/// Sharer-tracking schemes.
pub mod schemes;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use cache::{DirectoryCache, Lookup, Victim};
pub use entry::DirectoryEntry;
pub use schemes::{SchemeParams, SharerTracking, Sharers, SharersList};

use crate::common::ConfigError;

/// Directory state of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectoryState {
    /// No private cache holds the line.
    #[default]
    Uncached,
    /// One or more caches hold a read-only copy.
    Shared,
    /// Exactly one cache (the owner) holds a writable copy.
    Exclusive,
}

impl fmt::Display for DirectoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uncached => "UNCACHED",
            Self::Shared => "SHARED",
            Self::Exclusive => "EXCLUSIVE",
        })
    }
}

/// Sharer-tracking scheme selected at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum DirectoryType {
    /// One presence bit per tile.
    #[default]
    FullMap,
    /// K pointers, refuse on overflow.
    LimitedNoBroadcast,
    /// K pointers, broadcast on overflow.
    LimitedBroadcast,
    /// K pointers plus an untracked-sharer count.
    Ackwise,
    /// K hardware pointers, software-extended past K.
    Limitless,
}

impl DirectoryType {
    /// Every scheme, in configuration-name order.
    pub const ALL: [Self; 5] = [
        Self::FullMap,
        Self::LimitedNoBroadcast,
        Self::LimitedBroadcast,
        Self::Ackwise,
        Self::Limitless,
    ];

    /// Configuration name of the scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Self::FullMap => "full_map",
            Self::LimitedNoBroadcast => "limited_no_broadcast",
            Self::LimitedBroadcast => "limited_broadcast",
            Self::Ackwise => "ackwise",
            Self::Limitless => "limitless",
        }
    }

    /// Whether a sharer list of this scheme can become inexact.
    pub const fn may_broadcast(self) -> bool {
        matches!(self, Self::LimitedBroadcast | Self::Ackwise)
    }
}

impl fmt::Display for DirectoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DirectoryType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ConfigError::UnknownDirectoryType(s.to_string()))
    }
}

impl TryFrom<String> for DirectoryType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Flat arena of directory entries addressed by slot index.
///
/// The arena owns the storage; `DirectoryCache` decides which slot holds which
/// address.
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Vec<DirectoryEntry>,
    params: SchemeParams,
}

impl Directory {
    /// Allocates `total_entries` unbound entries of the configured scheme.
    pub fn new(total_entries: usize, params: SchemeParams) -> Self {
        Self {
            entries: (0..total_entries)
                .map(|_| DirectoryEntry::new(&params))
                .collect(),
            params,
        }
    }

    /// Scheme parameters every entry is built with.
    pub const fn params(&self) -> &SchemeParams {
        &self.params
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the arena has no slots.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds a fresh, unbound entry of the configured scheme.
    pub fn create_directory_entry(&self) -> DirectoryEntry {
        DirectoryEntry::new(&self.params)
    }

    /// Entry in `index`, or `None` if out of range.
    pub fn get_directory_entry(&self, index: usize) -> Option<&DirectoryEntry> {
        self.entries.get(index)
    }

    /// Mutable entry in `index`, or `None` if out of range.
    pub fn get_directory_entry_mut(&mut self, index: usize) -> Option<&mut DirectoryEntry> {
        self.entries.get_mut(index)
    }

    /// Replaces the entry in `index`, returning the previous one.
    ///
    /// Returns `None` (and drops `entry`) if `index` is out of range.
    pub fn set_directory_entry(
        &mut self,
        index: usize,
        entry: DirectoryEntry,
    ) -> Option<DirectoryEntry> {
        self.entries
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, entry))
    }

    /// Iterates all slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &DirectoryEntry> {
        self.entries.iter()
    }
}
