//! Physical address and tile identifier types.
//!
//! This module defines strong types for the two identifiers every coherence
//! message carries. It provides the following:
//! 1. **Type Safety:** Addresses and tile ids cannot be mixed up at call sites.
//! 2. **Line Arithmetic:** Helpers for aligning an address to its cache line.
//! 3. **Ordering:** Both types are `Ord` so they can key deterministic maps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical address in the simulated machine.
///
/// The unit of coherence is one cache line; directory lookups and request
/// queues are always keyed by the line-aligned form (see [`PhysAddr::line`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw 64-bit address value.
    ///
    /// # Returns
    ///
    /// A new `PhysAddr` instance wrapping the provided address.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Aligns the address down to the start of its cache line.
    ///
    /// # Arguments
    ///
    /// * `line_size` - Cache line size in bytes; must be a power of two.
    ///
    /// # Returns
    ///
    /// The address of the first byte of the line containing `self`.
    #[inline]
    pub const fn line(&self, line_size: u64) -> Self {
        Self(self.0 & !(line_size - 1))
    }

    /// Byte offset of the address within its cache line.
    #[inline]
    pub const fn line_offset(&self, line_size: u64) -> usize {
        (self.0 & (line_size - 1)) as usize
    }

    /// Whether the address is the first byte of a cache line.
    #[inline]
    pub const fn is_line_aligned(&self, line_size: u64) -> bool {
        self.0 & (line_size - 1) == 0
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Identifier of a tile (core + private caches + optional directory slice).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl TileId {
    /// Creates a tile id from its raw index.
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the tile id as a vector index.
    #[inline(always)]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile{}", self.0)
    }
}
