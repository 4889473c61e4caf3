//! Address-to-home mapping.
//!
//! Every line has exactly one home tile, whose directory controller
//! serializes all coherence traffic for it. Addresses are interleaved across
//! the home tiles in blocks of `2^ahl_param` bytes:
//!
//! `home = tiles[(address >> ahl_param) % tiles.len()]`
//!
//! `ahl_param` is never smaller than log2 of the line size, so a line never
//! straddles two homes.

use crate::common::{ConfigError, PhysAddr, TileId, floor_log2};
use crate::config::Config;

/// Deterministic map from a physical address to its home tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressHomeLookup {
    ahl_param: u32,
    tiles: Vec<TileId>,
}

impl AddressHomeLookup {
    /// Creates a lookup over `tiles`.
    ///
    /// # Arguments
    ///
    /// * `ahl_param` - log2 of the interleaving granularity in bytes.
    /// * `tiles` - Home tiles, in interleaving order.
    /// * `line_size` - Cache line size in bytes.
    ///
    /// # Returns
    ///
    /// The lookup, or an error if `tiles` is empty or a line would span two homes.
    pub fn new(ahl_param: u32, tiles: Vec<TileId>, line_size: u64) -> Result<Self, ConfigError> {
        if tiles.is_empty() {
            return Err(ConfigError::Zero { field: "home.tiles" });
        }
        let line_bits = floor_log2(line_size);
        if ahl_param < line_bits || ahl_param >= 64 {
            return Err(ConfigError::Inconsistent(format!(
                "home.ahl_param ({ahl_param}) must be in [{line_bits}, 64)"
            )));
        }
        Ok(Self { ahl_param, tiles })
    }

    /// Builds the lookup described by a configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.home.ahl_param,
            config.home_tiles(),
            config.general.cache_line_size,
        )
    }

    /// Home tile of `address`.
    #[inline]
    pub fn get_home(&self, address: PhysAddr) -> TileId {
        let idx = (address.val() >> self.ahl_param) % self.tiles.len() as u64;
        self.tiles[idx as usize]
    }

    /// Home tiles in interleaving order.
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Interleaving granularity exponent.
    pub const fn ahl_param(&self) -> u32 {
        self.ahl_param
    }
}
