//! # Directory Cache Tests

use tilesim_coherence::common::{PhysAddr, TileId};
use tilesim_coherence::config::OverflowPolicy;
use tilesim_coherence::directory::{
    Directory, DirectoryCache, DirectoryState, DirectoryType, Lookup, SchemeParams,
};

fn params() -> SchemeParams {
    SchemeParams {
        directory_type: DirectoryType::FullMap,
        max_hw_sharers: 4,
        max_num_sharers: 8,
        overflow: OverflowPolicy::Sticky,
        software_trap_penalty: 0,
    }
}

fn allocate(dc: &mut DirectoryCache, address: PhysAddr) -> usize {
    match dc.lookup_or_allocate(address) {
        Lookup::Allocated(slot) => slot,
        other => panic!("expected allocation for {address}, got {other:?}"),
    }
}

fn share(dc: &mut DirectoryCache, slot: usize, tiles: &[u32]) {
    let entry = dc.entry_mut(slot).unwrap();
    for &id in tiles {
        assert!(entry.add_sharer(TileId::new(id)));
    }
    entry.set_state(DirectoryState::Shared);
}

#[test]
fn directory_arena() {
    let mut dir = Directory::new(4, params());
    assert_eq!(dir.len(), 4);
    assert!(!dir.is_empty());
    assert!(dir.iter().all(|e| !e.is_bound()));

    let mut fresh = dir.create_directory_entry();
    fresh.bind(PhysAddr::new(0x40));
    let old = dir.set_directory_entry(2, fresh).unwrap();
    assert!(!old.is_bound());
    assert_eq!(
        dir.get_directory_entry(2).and_then(|e| e.address()),
        Some(PhysAddr::new(0x40))
    );
    assert!(dir.set_directory_entry(9, dir.create_directory_entry()).is_none());
}

#[test]
fn geometry() {
    let dc = DirectoryCache::new(16, 4, 64, 1, params());
    assert_eq!(dc.num_sets(), 4);
    assert_eq!(dc.associativity(), 4);
    assert_eq!(dc.capacity(), 16);
    assert_eq!(dc.set_index(PhysAddr::new(0x00)), 0);
    assert_eq!(dc.set_index(PhysAddr::new(0x40)), 1);
    assert_eq!(dc.set_index(PhysAddr::new(0x100)), 0);
}

#[test]
fn set_index_skips_home_bits() {
    // Two slices: bit 6 selects the home, so sets start at bit 7.
    let dc = DirectoryCache::new(16, 4, 64, 2, params());
    assert_eq!(dc.set_index(PhysAddr::new(0x00)), dc.set_index(PhysAddr::new(0x40)));
    assert_eq!(dc.set_index(PhysAddr::new(0x80)), 1);
}

#[test]
fn lines_only_compete_within_their_set() {
    let mut dc = DirectoryCache::new(4, 2, 64, 1, params());
    let _ = allocate(&mut dc, PhysAddr::new(0x000));
    let _ = allocate(&mut dc, PhysAddr::new(0x080));
    assert_eq!(dc.lookup_or_allocate(PhysAddr::new(0x100)), Lookup::Full);
    let _ = allocate(&mut dc, PhysAddr::new(0x040));
    assert_eq!(dc.num_bound(), 3);
}

#[test]
fn victim_prefers_uncached_then_fewest_sharers() {
    let mut dc = DirectoryCache::new(3, 3, 64, 1, params());
    let (a, b, c, d) = (
        PhysAddr::new(0x000),
        PhysAddr::new(0x040),
        PhysAddr::new(0x080),
        PhysAddr::new(0x0c0),
    );
    let sa = allocate(&mut dc, a);
    let sb = allocate(&mut dc, b);
    let sc = allocate(&mut dc, c);
    share(&mut dc, sa, &[1, 2]);
    share(&mut dc, sb, &[3]);
    share(&mut dc, sc, &[4, 5, 6]);

    let victim = dc.select_victim(d, |_| false).unwrap();
    assert_eq!((victim.slot, victim.address), (sb, b));
    assert_eq!(victim.state, DirectoryState::Shared);

    let victim = dc.select_victim(d, |addr| addr == b).unwrap();
    assert_eq!(victim.slot, sa);

    let entry = dc.entry_mut(sc).unwrap();
    for id in 4..7 {
        assert!(entry.remove_sharer(TileId::new(id), true));
    }
    entry.set_state(DirectoryState::Uncached);
    let victim = dc.select_victim(d, |_| false).unwrap();
    assert_eq!((victim.slot, victim.state), (sc, DirectoryState::Uncached));
}

#[test]
fn rebind_and_unbind() {
    let mut dc = DirectoryCache::new(1, 1, 64, 1, params());
    let (a, b) = (PhysAddr::new(0x000), PhysAddr::new(0x040));
    let slot = allocate(&mut dc, a);
    assert_eq!(dc.rebind(slot, b), Some(a));
    assert!(dc.find(a).is_none());
    assert_eq!(dc.find(b).and_then(|e| e.address()), Some(b));

    assert!(dc.unbind(b));
    assert!(!dc.unbind(b));
    assert_eq!(dc.num_bound(), 0);
    assert_eq!(dc.bound_entries().count(), 0);
    assert_eq!(dc.lookup_or_allocate(a), Lookup::Allocated(slot));
}
