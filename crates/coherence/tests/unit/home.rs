//! # Home Lookup Tests

use rstest::rstest;
use tilesim_coherence::common::{ConfigError, PhysAddr, TileId};
use tilesim_coherence::config::Config;
use tilesim_coherence::home::AddressHomeLookup;

fn tiles(ids: &[u32]) -> Vec<TileId> {
    ids.iter().copied().map(TileId::new).collect()
}

#[rstest]
#[case(0x0000, 0)]
#[case(0x003f, 0)]
#[case(0x0040, 4)]
#[case(0x0080, 8)]
#[case(0x00c0, 12)]
#[case(0x0100, 0)]
fn line_interleaving(#[case] addr: u64, #[case] home: u32) {
    let ahl = AddressHomeLookup::new(6, tiles(&[0, 4, 8, 12]), 64).unwrap();
    assert_eq!(ahl.get_home(PhysAddr::new(addr)), TileId::new(home));
}

#[test]
fn page_interleaving_keeps_lines_together() {
    let ahl = AddressHomeLookup::new(12, tiles(&[1, 2]), 64).unwrap();
    let first = ahl.get_home(PhysAddr::new(0x1000));
    for offset in (0..0x1000).step_by(64) {
        assert_eq!(ahl.get_home(PhysAddr::new(0x1000 + offset)), first);
    }
    assert_ne!(ahl.get_home(PhysAddr::new(0x2000)), first);
}

#[test]
fn every_byte_of_a_line_has_one_home() {
    let ahl = AddressHomeLookup::new(6, tiles(&[0, 1, 2]), 64).unwrap();
    for base in (0..0x1000u64).step_by(64) {
        let home = ahl.get_home(PhysAddr::new(base));
        assert!((base..base + 64).all(|a| ahl.get_home(PhysAddr::new(a)) == home));
    }
}

#[test]
fn rejects_sub_line_granularity() {
    assert!(matches!(
        AddressHomeLookup::new(5, tiles(&[0]), 64),
        Err(ConfigError::Inconsistent(_))
    ));
    assert_eq!(
        AddressHomeLookup::new(6, Vec::new(), 64),
        Err(ConfigError::Zero { field: "home.tiles" })
    );
}

#[test]
fn from_config_uses_home_tiles() {
    let mut config = Config::default();
    config.dram.num_controllers = 2;
    let ahl = AddressHomeLookup::from_config(&config).unwrap();
    assert_eq!(ahl.tiles(), &tiles(&[0, 8])[..]);
    assert_eq!(ahl.ahl_param(), 6);
}
