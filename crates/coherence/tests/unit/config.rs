//! # Configuration Tests
//!
//! Defaults, JSON deserialization, file loading, and cross-field validation.

use std::io::Write;

use pretty_assertions::assert_eq;
use rstest::rstest;
use tilesim_coherence::common::{ConfigError, TileId};
use tilesim_coherence::config::*;
use tilesim_coherence::directory::DirectoryType;

#[test]
fn config_default() {
    let config = Config::default();
    assert_eq!(config.general.num_tiles, 16);
    assert_eq!(config.general.cache_line_size, 64);
    assert_eq!(config.directory.directory_type, DirectoryType::FullMap);
    assert_eq!(config.directory.total_entries, 1024);
    assert_eq!(config.directory.associativity, 16);
    assert_eq!(config.directory.max_hw_sharers, 4);
    assert_eq!(config.directory.access_cycles, 10);
    assert_eq!(config.directory.limitless.software_trap_penalty, 200);
    assert_eq!(config.directory.limited_broadcast.overflow, OverflowPolicy::Sticky);
    assert_eq!(config.home.ahl_param, 6);
    assert_eq!(config.dram.controller, MemoryControllerKind::Simple);
    assert!(!config.dram.queue_model.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn zero_means_every_tile() {
    let config = Config::default();
    assert_eq!(config.max_num_sharers(), 16);
    assert_eq!(config.num_dram_controllers(), 16);
    assert_eq!(config.home_tiles().len(), 16);
}

#[test]
fn home_tiles_spread_evenly() {
    let mut config = Config::default();
    config.dram.num_controllers = 4;
    let homes: Vec<u32> = config.home_tiles().into_iter().map(|t| t.0).collect();
    assert_eq!(homes, vec![0, 4, 8, 12]);
}

#[test]
fn from_json_partial_sections() {
    let config = Config::from_json(
        r#"{
            "general": { "num_tiles": 8 },
            "directory": {
                "directory_type": "limited_broadcast",
                "max_hw_sharers": 2,
                "limited_broadcast": { "overflow": "reversible" }
            },
            "home": { "tiles": [0, 4] },
            "dram": {
                "controller": "RowBuffer",
                "queue_model": { "enabled": true, "kind": "history_list" }
            }
        }"#,
    )
    .unwrap();
    assert_eq!(config.general.num_tiles, 8);
    assert_eq!(config.general.cache_line_size, 64);
    assert_eq!(config.directory.directory_type, DirectoryType::LimitedBroadcast);
    assert_eq!(config.directory.limited_broadcast.overflow, OverflowPolicy::Reversible);
    assert_eq!(config.home_tiles(), vec![TileId::new(0), TileId::new(4)]);
    assert_eq!(config.dram.controller, MemoryControllerKind::RowBuffer);
    assert_eq!(config.dram.queue_model.kind, QueueModelType::HistoryList);
    assert_eq!(config.dram.queue_model.history_list.max_list_size, 100);
    assert!(config.dram.queue_model.history_list.analytical_model_enabled);
}

#[test]
fn unknown_scheme_rejected() {
    let err = Config::from_json(r#"{ "directory": { "directory_type": "snoopy" } }"#).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(msg) if msg.contains("snoopy")));
    assert_eq!(
        "snoopy".parse::<DirectoryType>(),
        Err(ConfigError::UnknownDirectoryType("snoopy".to_string()))
    );
}

#[test]
fn scheme_names_round_trip() {
    for scheme in DirectoryType::ALL {
        assert_eq!(scheme.name().parse::<DirectoryType>(), Ok(scheme));
        assert_eq!(scheme.to_string(), scheme.name());
    }
}

#[test]
fn line_size_must_be_power_of_two() {
    let mut config = Config::default();
    config.general.cache_line_size = 48;
    assert_eq!(
        config.validate(),
        Err(ConfigError::NotPowerOfTwo {
            field: "general.cache_line_size",
            value: 48
        })
    );
}

#[test]
fn entries_multiple_of_associativity() {
    let mut config = Config::default();
    config.directory.total_entries = 100;
    config.directory.associativity = 16;
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));
}

#[test]
fn hw_sharers_bounded_by_logical_capacity() {
    let mut config = Config::default();
    config.general.num_tiles = 4;
    config.directory.max_hw_sharers = 8;
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));
}

#[rstest]
fn sharer_capacity_must_cover_every_tile(
    #[values(
        DirectoryType::FullMap,
        DirectoryType::LimitedNoBroadcast,
        DirectoryType::LimitedBroadcast,
        DirectoryType::Ackwise,
        DirectoryType::Limitless
    )]
    scheme: DirectoryType,
) {
    let mut config = Config::default();
    config.general.num_tiles = 8;
    config.directory.directory_type = scheme;
    config.directory.max_hw_sharers = 2;
    config.directory.max_num_sharers = 4;
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(msg)) if msg.contains("max_num_sharers")));

    config.directory.max_num_sharers = 8;
    assert!(config.validate().is_ok());
    config.directory.max_num_sharers = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn history_queue_models_need_room() {
    let config = Config::from_json(
        r#"{ "dram": { "queue_model": { "enabled": true, "kind": "history_tree",
                                        "history_tree": { "max_list_size": 0 } } } }"#,
    );
    assert_eq!(
        config.unwrap_err(),
        ConfigError::Zero {
            field: "dram.queue_model.history_tree.max_list_size"
        }
    );

    let mut config = Config::default();
    config.dram.queue_model.enabled = true;
    config.dram.queue_model.kind = QueueModelType::HistoryList;
    config.dram.queue_model.history_list.max_list_size = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Zero { .. })));
    config.dram.queue_model.kind = QueueModelType::HistoryTree;
    assert!(config.validate().is_ok());
}

#[test]
fn home_tiles_in_range_and_unique() {
    let mut config = Config::default();
    config.home.tiles = Some(vec![0, 16]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::TileOutOfRange {
            tile: 16,
            num_tiles: 16
        })
    );
    config.home.tiles = Some(vec![3, 3]);
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));
}

#[test]
fn interleaving_not_finer_than_a_line() {
    let mut config = Config::default();
    config.home.ahl_param = 5;
    assert!(matches!(config.validate(), Err(ConfigError::Inconsistent(_))));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "general": {{ "num_tiles": 4 }}, "directory": {{ "directory_type": "ackwise", "max_hw_sharers": 1 }} }}"#
    )
    .unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.general.num_tiles, 4);
    assert_eq!(config.directory.directory_type, DirectoryType::Ackwise);
}

#[test]
fn from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
