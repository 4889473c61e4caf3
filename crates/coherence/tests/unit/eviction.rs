//! # Directory Eviction Tests
//!
//! A one-entry directory forces every new line to reclaim the entry of the
//! previous one through a nullify transaction.

use pretty_assertions::assert_eq;
use tilesim_coherence::directory::{DirectoryState, DirectoryType};
use tilesim_coherence::protocol::MsgType;

use crate::common::harness::{ConfigBuilder, ControllerContext, LINE, TestContext, line, t};

fn one_entry() -> ControllerContext {
    ControllerContext::new(
        &ConfigBuilder::new(DirectoryType::FullMap, 4)
            .directory(1, 1)
            .build(),
    )
}

#[test]
fn shared_victim_is_invalidated() {
    let mut ctx = one_entry();
    let (a, b) = (line(0), line(1));
    ctx.sh_req(1, a);
    ctx.sh_req(2, b);

    let inv = ctx.net.of_type(MsgType::InvReq).next().unwrap();
    assert_eq!((inv.receiver, inv.msg.requester, inv.msg.address), (t(1), t(0), a));
    assert!(inv.msg.reply_expected);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1]);
    assert_eq!(ctx.dir.pending_requests(), 2);

    ctx.inv_rep(1, 0, a);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1, 2]);
    assert!(ctx.dir.entry(a).is_none());
    assert_eq!(ctx.dir.entry_state(b), DirectoryState::Shared);

    let stats = ctx.dir.stats();
    assert_eq!(stats.evictions, 1);
    assert_eq!(stats.back_invalidations, 1);
    assert!(ctx.dir.is_idle());
}

#[test]
fn exclusive_victim_is_flushed_to_memory() {
    let mut ctx = one_entry();
    let (a, b) = (line(0), line(1));
    ctx.ex_req(1, a);
    ctx.sh_req(2, b);
    assert_eq!(ctx.receivers(MsgType::FlushReq), vec![1]);

    ctx.flush_rep(1, 0, a, 0x5a);
    assert_eq!(ctx.dir.dram().peek(a), Some(&[0x5a; LINE as usize][..]));
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![2]);
    assert!(ctx.dir.entry(a).is_none());
}

#[test]
fn busy_set_waits_for_a_slot() {
    let mut ctx = one_entry();
    let (a, b) = (line(0), line(1));
    ctx.ex_req(1, a);
    ctx.sh_req(2, a);
    ctx.sh_req(3, b);
    assert_eq!(ctx.dir.stats().slot_waits, 1);
    assert_eq!(ctx.dir.stats().evictions, 0);
    assert_eq!(ctx.net.count(MsgType::InvReq), 0);

    // Finishing the read of `a` frees the set; `b` then evicts it.
    ctx.wb_rep(1, 2, a, 4);
    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1, 2]);
    assert_eq!(ctx.dir.stats().evictions, 1);

    ctx.inv_rep(1, 0, a);
    ctx.inv_rep(2, 0, a);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![2, 3]);
    assert_eq!(ctx.dir.dram().peek(a), Some(&[4; LINE as usize][..]));
    assert!(ctx.dir.is_idle());
}

#[test]
fn request_for_victim_waits_behind_nullify() {
    let mut ctx = one_entry();
    let (a, b) = (line(0), line(1));
    ctx.sh_req(1, a);
    ctx.sh_req(2, b);
    ctx.sh_req(3, a);
    assert_eq!(ctx.dir.pending_requests(), 3);

    ctx.inv_rep(1, 0, a);
    // `b` got the slot; the queued read of `a` now evicts `b` in turn.
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1, 2]);
    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1, 2]);

    ctx.inv_rep(2, 0, b);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1, 2, 3]);
    assert_eq!(ctx.dir.stats().evictions, 2);
    assert!(ctx.dir.is_idle());
}

#[test]
fn eviction_end_to_end() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4)
        .directory(1, 1)
        .build();
    let mut ctx = TestContext::new(config);
    let (a, b) = (line(0), line(1));
    ctx.write(1, a, 11);
    assert_eq!(ctx.read(2, b), 0);

    let cache = ctx.system.cache(t(1)).unwrap();
    assert!(cache.line(a).is_none());
    assert_eq!(ctx.read(3, a), 11);
    assert_eq!(ctx.system.stats().evictions, 2);
}

#[test]
fn voluntary_eviction_frees_the_slot() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4)
        .directory(1, 1)
        .build();
    let mut ctx = TestContext::new(config);
    let (a, b) = (line(0), line(1));
    let _ = ctx.read(1, a);
    ctx.evict(1, a);
    let directory = ctx.system.directory(t(0)).unwrap();
    assert_eq!(directory.directory_cache().num_bound(), 0);

    let _ = ctx.read(2, b);
    assert_eq!(ctx.system.stats().evictions, 0);
}
