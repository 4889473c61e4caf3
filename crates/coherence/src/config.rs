//! Configuration system for the coherence engine.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the directory controllers and the in-process machine. It provides:
//! 1. **Defaults:** Baseline machine constants (tile count, line size, directory geometry).
//! 2. **Structures:** Hierarchical config for general, directory, home lookup, and DRAM.
//! 3. **Enums:** Overflow policy, DRAM latency model, and queue model types.
//! 4. **Validation:** Cross-field checks; every constructor that consumes a config calls `validate`.
//!
//! Configuration is supplied as JSON (`Config::from_json` / `Config::from_file`) or
//! built from `Config::default()`.

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;

use crate::common::{ConfigError, TileId, floor_log2};
use crate::directory::DirectoryType;

/// Default configuration constants.
mod defaults {
    /// Number of tiles in the simulated machine.
    pub const NUM_TILES: u32 = 16;

    /// Cache line size in bytes; the unit of coherence.
    pub const CACHE_LINE_SIZE: u64 = 64;

    /// Directory entries per home controller.
    pub const DIRECTORY_TOTAL_ENTRIES: usize = 1024;

    /// Directory cache associativity.
    pub const DIRECTORY_ASSOCIATIVITY: usize = 16;

    /// Sharers tracked exactly by the limited, ackwise, and limitless schemes.
    pub const MAX_HW_SHARERS: u32 = 4;

    /// Directory lookup latency in cycles.
    pub const DIRECTORY_ACCESS_CYCLES: u64 = 10;

    /// Extra cycles charged per access while a limitless entry is trapped to software.
    pub const SOFTWARE_TRAP_PENALTY: u64 = 200;

    /// Home interleaving granularity: log2 of the bytes mapped to one home before moving on.
    pub const AHL_PARAM: u32 = 6;

    /// Fixed DRAM access latency in cycles.
    pub const DRAM_LATENCY: u64 = 100;

    /// CAS latency in DRAM cycles.
    pub const T_CAS: u64 = 14;

    /// RAS latency in DRAM cycles.
    pub const T_RAS: u64 = 14;

    /// Precharge latency in DRAM cycles.
    pub const T_PRE: u64 = 14;

    /// Free intervals kept by the history queue models.
    pub const HISTORY_MAX_SIZE: usize = 100;
}

/// Behaviour of a limited-broadcast entry after it exceeds its hardware capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// The entry stays in broadcast mode until its sharer count returns to zero.
    #[default]
    Sticky,
    /// The entry returns to exact mode once every untracked sharer has left.
    Reversible,
}

/// DRAM latency model used by the backing-store controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MemoryControllerKind {
    /// Every access takes `dram.latency` cycles.
    #[default]
    Simple,
    /// Row-buffer model driven by `t_cas`, `t_ras`, and `t_pre`.
    #[serde(alias = "DRAM", alias = "Dram")]
    RowBuffer,
}

/// Contention model applied on top of the DRAM access latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueModelType {
    /// Analytical M/G/1 estimator.
    #[default]
    #[serde(alias = "MG1", alias = "m_g_1")]
    Mg1,
    /// Free-interval history list with M/G/1 fallback for stale packets.
    HistoryList,
    /// Free intervals ordered by start cycle; same fallback as the list.
    HistoryTree,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use tilesim_coherence::config::Config;
/// use tilesim_coherence::directory::DirectoryType;
///
/// let config = Config::from_json(r#"{
///     "general": { "num_tiles": 4, "cache_line_size": 64 },
///     "directory": { "directory_type": "ackwise", "total_entries": 16, "associativity": 4,
///                    "max_hw_sharers": 2 }
/// }"#).unwrap();
/// assert_eq!(config.directory.directory_type, DirectoryType::Ackwise);
/// assert_eq!(config.max_num_sharers(), 4);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Machine-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Directory cache and sharer-scheme settings.
    #[serde(default)]
    pub directory: DirectoryConfig,
    /// Address-to-home mapping.
    #[serde(default)]
    pub home: HomeConfig,
    /// Backing-store controller settings.
    #[serde(default)]
    pub dram: DramConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Number of logical sharers an entry may track (resolves the `0 = all tiles` default).
    pub const fn max_num_sharers(&self) -> u32 {
        if self.directory.max_num_sharers == 0 {
            self.general.num_tiles
        } else {
            self.directory.max_num_sharers
        }
    }

    /// Number of backing-store controllers (resolves the `0 = one per tile` default).
    pub const fn num_dram_controllers(&self) -> u32 {
        if self.dram.num_controllers == 0 {
            self.general.num_tiles
        } else {
            self.dram.num_controllers
        }
    }

    /// Tiles that host a directory slice and a backing-store controller.
    ///
    /// Uses `home.tiles` when given; otherwise spreads `dram.num_controllers`
    /// controllers evenly across the machine.
    pub fn home_tiles(&self) -> Vec<TileId> {
        if let Some(tiles) = &self.home.tiles {
            return tiles.iter().copied().map(TileId::new).collect();
        }
        let n = self.num_dram_controllers().max(1);
        let stride = (self.general.num_tiles / n).max(1);
        (0..n).map(|i| TileId::new(i * stride)).collect()
    }

    /// Checks every cross-field constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.general;
        let d = &self.directory;

        if g.num_tiles == 0 {
            return Err(ConfigError::Zero {
                field: "general.num_tiles",
            });
        }
        if g.cache_line_size == 0 {
            return Err(ConfigError::Zero {
                field: "general.cache_line_size",
            });
        }
        if !g.cache_line_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "general.cache_line_size",
                value: g.cache_line_size,
            });
        }

        if d.total_entries == 0 {
            return Err(ConfigError::Zero {
                field: "directory.total_entries",
            });
        }
        if d.associativity == 0 {
            return Err(ConfigError::Zero {
                field: "directory.associativity",
            });
        }
        if d.total_entries % d.associativity != 0 {
            return Err(ConfigError::Inconsistent(format!(
                "directory.total_entries ({}) is not a multiple of directory.associativity ({})",
                d.total_entries, d.associativity
            )));
        }
        if d.max_hw_sharers == 0 {
            return Err(ConfigError::Zero {
                field: "directory.max_hw_sharers",
            });
        }
        // Sharer ids are tile ids, so every tile must fit in a bit vector or pointer.
        let max_num_sharers = self.max_num_sharers();
        if max_num_sharers != g.num_tiles {
            return Err(ConfigError::Inconsistent(format!(
                "directory.max_num_sharers ({max_num_sharers}) must equal general.num_tiles ({})",
                g.num_tiles
            )));
        }
        if d.max_hw_sharers > max_num_sharers {
            return Err(ConfigError::Inconsistent(format!(
                "directory.max_hw_sharers ({}) exceeds directory.max_num_sharers ({max_num_sharers})",
                d.max_hw_sharers
            )));
        }

        let line_bits = floor_log2(g.cache_line_size);
        if self.home.ahl_param < line_bits || self.home.ahl_param >= 64 {
            return Err(ConfigError::Inconsistent(format!(
                "home.ahl_param ({}) must be in [{line_bits}, 64) so a cache line never spans two homes",
                self.home.ahl_param
            )));
        }

        if self.dram.num_controllers > g.num_tiles {
            return Err(ConfigError::Inconsistent(format!(
                "dram.num_controllers ({}) exceeds general.num_tiles ({})",
                self.dram.num_controllers, g.num_tiles
            )));
        }

        let homes = self.home_tiles();
        if homes.is_empty() {
            return Err(ConfigError::Zero { field: "home.tiles" });
        }
        let mut seen = BTreeSet::new();
        for tile in &homes {
            if tile.0 >= g.num_tiles {
                return Err(ConfigError::TileOutOfRange {
                    tile: tile.0,
                    num_tiles: g.num_tiles,
                });
            }
            if !seen.insert(*tile) {
                return Err(ConfigError::Inconsistent(format!(
                    "home.tiles lists {tile} more than once"
                )));
            }
        }

        let q = &self.dram.queue_model;
        if q.enabled {
            match q.kind {
                QueueModelType::HistoryList if q.history_list.max_list_size == 0 => {
                    return Err(ConfigError::Zero {
                        field: "dram.queue_model.history_list.max_list_size",
                    });
                }
                QueueModelType::HistoryTree if q.history_tree.max_list_size == 0 => {
                    return Err(ConfigError::Zero {
                        field: "dram.queue_model.history_tree.max_list_size",
                    });
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Machine-wide settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// Number of tiles (each with a private cache).
    #[serde(default = "GeneralConfig::default_num_tiles")]
    pub num_tiles: u32,

    /// Cache line size in bytes.
    #[serde(default = "GeneralConfig::default_cache_line_size")]
    pub cache_line_size: u64,
}

impl GeneralConfig {
    const fn default_num_tiles() -> u32 {
        defaults::NUM_TILES
    }

    const fn default_cache_line_size() -> u64 {
        defaults::CACHE_LINE_SIZE
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            num_tiles: defaults::NUM_TILES,
            cache_line_size: defaults::CACHE_LINE_SIZE,
        }
    }
}

/// Directory cache geometry and sharer-tracking scheme.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    /// Sharer-tracking scheme.
    #[serde(default)]
    pub directory_type: DirectoryType,

    /// Entries per home controller.
    #[serde(default = "DirectoryConfig::default_total_entries")]
    pub total_entries: usize,

    /// Ways per directory-cache set.
    #[serde(default = "DirectoryConfig::default_associativity")]
    pub associativity: usize,

    /// Sharers tracked exactly in hardware.
    #[serde(default = "DirectoryConfig::default_max_hw_sharers")]
    pub max_hw_sharers: u32,

    /// Logical sharer capacity; `0` means every tile. Any other value must
    /// equal `general.num_tiles`.
    #[serde(default)]
    pub max_num_sharers: u32,

    /// Lookup latency in cycles.
    #[serde(default = "DirectoryConfig::default_access_cycles")]
    pub access_cycles: u64,

    /// Limitless scheme parameters.
    #[serde(default)]
    pub limitless: LimitlessConfig,

    /// Limited-broadcast scheme parameters.
    #[serde(default)]
    pub limited_broadcast: LimitedBroadcastConfig,
}

impl DirectoryConfig {
    const fn default_total_entries() -> usize {
        defaults::DIRECTORY_TOTAL_ENTRIES
    }

    const fn default_associativity() -> usize {
        defaults::DIRECTORY_ASSOCIATIVITY
    }

    const fn default_max_hw_sharers() -> u32 {
        defaults::MAX_HW_SHARERS
    }

    const fn default_access_cycles() -> u64 {
        defaults::DIRECTORY_ACCESS_CYCLES
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            directory_type: DirectoryType::default(),
            total_entries: defaults::DIRECTORY_TOTAL_ENTRIES,
            associativity: defaults::DIRECTORY_ASSOCIATIVITY,
            max_hw_sharers: defaults::MAX_HW_SHARERS,
            max_num_sharers: 0,
            access_cycles: defaults::DIRECTORY_ACCESS_CYCLES,
            limitless: LimitlessConfig::default(),
            limited_broadcast: LimitedBroadcastConfig::default(),
        }
    }
}

/// Limitless scheme parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitlessConfig {
    /// Cycles charged per access while sharers are tracked in software.
    #[serde(default = "LimitlessConfig::default_penalty")]
    pub software_trap_penalty: u64,
}

impl LimitlessConfig {
    const fn default_penalty() -> u64 {
        defaults::SOFTWARE_TRAP_PENALTY
    }
}

impl Default for LimitlessConfig {
    fn default() -> Self {
        Self {
            software_trap_penalty: defaults::SOFTWARE_TRAP_PENALTY,
        }
    }
}

/// Limited-broadcast scheme parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitedBroadcastConfig {
    /// What happens once the hardware capacity is exceeded.
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

/// Address-to-home mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeConfig {
    /// log2 of the interleaving granularity in bytes.
    #[serde(default = "HomeConfig::default_ahl_param")]
    pub ahl_param: u32,

    /// Explicit list of home tiles; defaults to evenly spaced DRAM controller tiles.
    #[serde(default)]
    pub tiles: Option<Vec<u32>>,
}

impl HomeConfig {
    const fn default_ahl_param() -> u32 {
        defaults::AHL_PARAM
    }
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            ahl_param: defaults::AHL_PARAM,
            tiles: None,
        }
    }
}

/// Backing-store controller settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DramConfig {
    /// Number of controllers; `0` means one per tile.
    #[serde(default)]
    pub num_controllers: u32,

    /// Latency model.
    #[serde(default)]
    pub controller: MemoryControllerKind,

    /// Fixed latency for the simple model.
    #[serde(default = "DramConfig::default_latency")]
    pub latency: u64,

    /// CAS latency for the row-buffer model.
    #[serde(default = "DramConfig::default_t_cas")]
    pub t_cas: u64,

    /// RAS latency for the row-buffer model.
    #[serde(default = "DramConfig::default_t_ras")]
    pub t_ras: u64,

    /// Precharge latency for the row-buffer model.
    #[serde(default = "DramConfig::default_t_pre")]
    pub t_pre: u64,

    /// Contention model.
    #[serde(default)]
    pub queue_model: QueueModelConfig,
}

impl DramConfig {
    const fn default_latency() -> u64 {
        defaults::DRAM_LATENCY
    }

    const fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    const fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    const fn default_t_pre() -> u64 {
        defaults::T_PRE
    }
}

impl Default for DramConfig {
    fn default() -> Self {
        Self {
            num_controllers: 0,
            controller: MemoryControllerKind::default(),
            latency: defaults::DRAM_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
            queue_model: QueueModelConfig::default(),
        }
    }
}

/// Contention model settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueModelConfig {
    /// Whether queueing delay is added to DRAM accesses.
    #[serde(default)]
    pub enabled: bool,

    /// Which model to use.
    #[serde(default)]
    pub kind: QueueModelType,

    /// History-list parameters.
    #[serde(default)]
    pub history_list: HistoryConfig,

    /// History-tree parameters.
    #[serde(default)]
    pub history_tree: HistoryConfig,
}

/// Parameters shared by the free-interval queue models.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Maximum free intervals retained.
    #[serde(default = "HistoryConfig::default_max_list_size")]
    pub max_list_size: usize,

    /// Use the M/G/1 estimate for packets older than the oldest interval.
    #[serde(default = "HistoryConfig::default_analytical")]
    pub analytical_model_enabled: bool,
}

impl HistoryConfig {
    const fn default_max_list_size() -> usize {
        defaults::HISTORY_MAX_SIZE
    }

    const fn default_analytical() -> bool {
        true
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_list_size: defaults::HISTORY_MAX_SIZE,
            analytical_model_enabled: true,
        }
    }
}
