//! Common utilities and types used throughout the coherence engine.
//!
//! This module provides the building blocks shared by every component:
//! 1. **Identifier Types:** Strong types for physical addresses and tile ids.
//! 2. **Sharer Storage:** A fixed-width bit vector used by the exact sharer schemes.
//! 3. **Error Handling:** Configuration, protocol, and simulation error enums.
//! 4. **Arithmetic:** Small integer log helpers used for address splitting.

/// Address and tile identifier types.
pub mod addr;

/// Fixed-width bit vector.
pub mod bitvec;

/// Error types.
pub mod error;

pub use addr::{PhysAddr, TileId};
pub use bitvec::BitVector;
pub use error::{ConfigError, ProtocolError, SimError};

/// Floor of log2 for a non-zero value; returns 0 for 0.
#[inline]
pub const fn floor_log2(n: u64) -> u32 {
    if n == 0 { 0 } else { 63 - n.leading_zeros() }
}

/// Ceiling of log2; returns 0 for 0 and 1.
#[inline]
pub const fn ceil_log2(n: u64) -> u32 {
    if n <= 1 { 0 } else { 64 - (n - 1).leading_zeros() }
}
