//! # Directory Controller Tests
//!
//! Each test plays the private caches by hand: requests and replies are fed
//! to one controller and the packets it emits are inspected.

use pretty_assertions::assert_eq;
use tilesim_coherence::common::{ConfigError, PhysAddr, ProtocolError};
use tilesim_coherence::directory::{DirectoryState, DirectoryType};
use tilesim_coherence::protocol::{
    DirectoryCntlr, MemComponent, MsgType, RecordingNetwork, ShmemMsg, Writeback,
};
use tilesim_coherence::timing::{AccessKind, LatencyModel};

use crate::common::harness::{ConfigBuilder, ControllerContext, LINE, line, t};

fn full_map(num_tiles: u32) -> ControllerContext {
    ControllerContext::new(&ConfigBuilder::new(DirectoryType::FullMap, num_tiles).build())
}

fn sharers(ctx: &ControllerContext, address: PhysAddr) -> Vec<u32> {
    ctx.dir
        .entry(address)
        .map(|e| e.sharers_list().tiles.iter().map(|t| t.0).collect())
        .unwrap_or_default()
}

#[test]
fn shared_grant_from_uncached() {
    let mut ctx = full_map(4);
    let a = line(3);
    ctx.sh_req(1, a);

    let grant = ctx.net.of_type(MsgType::ShRep).next().unwrap();
    assert_eq!(grant.receiver, t(1));
    assert_eq!(grant.component, MemComponent::L2Cache);
    assert_eq!(grant.msg.data.as_deref(), Some(&[0u8; LINE as usize][..]));
    assert_eq!(ctx.dir.entry_state(a), DirectoryState::Shared);
    assert_eq!(sharers(&ctx, a), vec![1]);
    assert!(ctx.dir.is_idle());
}

#[test]
fn upgrade_of_sole_sharer_needs_no_invalidation() {
    let mut ctx = full_map(4);
    let a = line(0);
    ctx.sh_req(1, a);
    ctx.ex_req(1, a);

    assert_eq!(ctx.net.count(MsgType::InvReq), 0);
    assert_eq!(ctx.receivers(MsgType::ExRep), vec![1]);
    let entry = ctx.dir.entry(a).unwrap();
    assert_eq!(entry.state(), DirectoryState::Exclusive);
    assert_eq!(entry.owner(), Some(t(1)));
}

#[test]
fn exclusive_request_invalidates_every_sharer() {
    let mut ctx = full_map(4);
    let a = line(0);
    ctx.sh_req(1, a);
    ctx.sh_req(2, a);
    ctx.ex_req(3, a);

    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1, 2]);
    assert!(ctx.net.of_type(MsgType::InvReq).all(|p| p.msg.requester == t(3) && p.msg.reply_expected));
    assert_eq!(ctx.net.count(MsgType::ExRep), 0);
    assert_eq!(ctx.dir.pending_requests(), 1);

    ctx.inv_rep(1, 3, a);
    assert_eq!(ctx.net.count(MsgType::ExRep), 0);
    ctx.inv_rep(2, 3, a);
    assert_eq!(ctx.receivers(MsgType::ExRep), vec![3]);
    assert_eq!(ctx.dir.entry(a).unwrap().owner(), Some(t(3)));
    assert_eq!(ctx.dir.stats().inv_reqs_sent, 2);
    assert!(ctx.dir.is_idle());
}

#[test]
fn upgrade_skips_requester() {
    let mut ctx = full_map(4);
    let a = line(0);
    ctx.sh_req(1, a);
    ctx.sh_req(2, a);
    ctx.ex_req(1, a);

    assert_eq!(ctx.receivers(MsgType::InvReq), vec![2]);
    ctx.inv_rep(2, 1, a);
    assert_eq!(ctx.receivers(MsgType::ExRep), vec![1]);
}

#[test]
fn exclusive_transfer_forwards_flushed_data() {
    let mut ctx = full_map(4);
    let a = line(5);
    ctx.ex_req(1, a);
    ctx.ex_req(2, a);

    let flush = ctx.net.of_type(MsgType::FlushReq).next().unwrap();
    assert_eq!((flush.receiver, flush.msg.requester), (t(1), t(2)));

    ctx.flush_rep(1, 2, a, 0xab);
    let grant = ctx.net.of_type(MsgType::ExRep).nth(1).unwrap();
    assert_eq!(grant.receiver, t(2));
    assert_eq!(grant.msg.data.as_deref(), Some(&[0xab; LINE as usize][..]));
    assert_eq!(ctx.dir.dram().peek(a), Some(&[0xab; LINE as usize][..]));

    let stats = ctx.dir.stats_with_dram();
    assert_eq!(stats.dram_reads, 1);
    assert_eq!(stats.dram_writes, 1);
    assert_eq!(stats.flush_reqs_sent, 1);
}

#[test]
fn shared_request_downgrades_owner() {
    let mut ctx = full_map(4);
    let a = line(5);
    ctx.ex_req(1, a);
    ctx.sh_req(2, a);
    assert_eq!(ctx.receivers(MsgType::WbReq), vec![1]);

    ctx.wb_rep(1, 2, a, 7);
    let grant = ctx.net.of_type(MsgType::ShRep).next().unwrap();
    assert_eq!(grant.receiver, t(2));
    assert_eq!(grant.msg.data.as_deref(), Some(&[7; LINE as usize][..]));
    assert_eq!(ctx.dir.entry_state(a), DirectoryState::Shared);
    assert_eq!(ctx.dir.entry(a).unwrap().owner(), None);
    assert_eq!(sharers(&ctx, a), vec![1, 2]);
}

#[test]
fn requests_for_one_line_run_in_arrival_order() {
    let mut ctx = full_map(4);
    let a = line(2);
    ctx.ex_req(1, a);
    ctx.sh_req(2, a);
    ctx.ex_req(3, a);

    assert_eq!(ctx.dir.pending_requests(), 2);
    assert_eq!(ctx.net.count(MsgType::InvReq), 0);

    ctx.wb_rep(1, 2, a, 5);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![2]);
    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1, 2]);

    ctx.inv_rep(1, 3, a);
    ctx.inv_rep(2, 3, a);
    let grant = ctx.net.of_type(MsgType::ExRep).last().unwrap();
    assert_eq!(grant.receiver, t(3));
    assert_eq!(grant.msg.data.as_deref(), Some(&[5; LINE as usize][..]));
    assert!(ctx.dir.is_idle());
}

#[test]
fn other_lines_are_not_blocked() {
    let mut ctx = full_map(4);
    ctx.ex_req(1, line(0));
    ctx.sh_req(2, line(0));
    ctx.sh_req(3, line(1));
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![3]);
    assert_eq!(ctx.dir.pending_requests(), 1);
}

#[test]
fn voluntary_evictions_release_the_entry() {
    let mut ctx = full_map(4);
    let (a, b) = (line(0), line(1));
    ctx.sh_req(1, a);
    ctx.send(1, ShmemMsg::new(MsgType::InvRep, t(1), a));
    assert!(ctx.dir.entry(a).is_none());
    assert_eq!(ctx.dir.entry_state(a), DirectoryState::Uncached);

    ctx.ex_req(2, b);
    let flush = ShmemMsg::new(MsgType::FlushRep, t(2), b).with_data(vec![3; LINE as usize]);
    ctx.send(2, flush);
    assert!(ctx.dir.entry(b).is_none());
    assert_eq!(ctx.dir.dram().peek(b), Some(&[3; LINE as usize][..]));
    assert_eq!(ctx.dir.stats().voluntary_evictions, 2);
    assert_eq!(ctx.dir.directory_cache().num_bound(), 0);
}

#[test]
fn eviction_crossing_an_invalidation_counts_as_its_ack() {
    let mut ctx = full_map(4);
    let a = line(0);
    ctx.sh_req(1, a);
    ctx.ex_req(2, a);
    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1]);
    ctx.send(1, ShmemMsg::new(MsgType::InvRep, t(1), a));
    assert_eq!(ctx.receivers(MsgType::ExRep), vec![2]);
}

#[test]
fn piggybacked_writeback_is_stored_first() {
    let mut ctx = full_map(4);
    let (victim, next) = (line(0), line(1));
    ctx.ex_req(1, victim);
    let req = ShmemMsg::new(MsgType::ShReq, t(1), next).with_writeback(Writeback {
        address: victim,
        data: vec![9; LINE as usize],
    });
    ctx.send(1, req);

    assert_eq!(ctx.dir.dram().peek(victim), Some(&[9; LINE as usize][..]));
    assert!(ctx.dir.entry(victim).is_none());
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1]);
    assert_eq!(ctx.dir.entry_state(next), DirectoryState::Shared);
}

#[test]
fn limited_no_broadcast_invalidates_one_sharer_for_room() {
    let config = ConfigBuilder::new(DirectoryType::LimitedNoBroadcast, 4)
        .hw_sharers(2)
        .build();
    let mut ctx = ControllerContext::new(&config);
    let a = line(0);
    ctx.sh_req(1, a);
    ctx.sh_req(2, a);
    ctx.sh_req(3, a);

    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1, 2]);
    assert_eq!(ctx.receivers(MsgType::InvReq), vec![1]);
    assert_eq!(ctx.dir.stats().sharer_capacity_fallbacks, 1);

    ctx.inv_rep(1, 3, a);
    assert_eq!(ctx.receivers(MsgType::ShRep), vec![1, 2, 3]);
    assert_eq!(sharers(&ctx, a), vec![2, 3]);
}

#[test]
fn ackwise_broadcasts_when_inexact() {
    let config = ConfigBuilder::new(DirectoryType::Ackwise, 8).hw_sharers(2).build();
    let mut ctx = ControllerContext::new(&config);
    let a = line(0);
    for tile in [1, 2, 3] {
        ctx.sh_req(tile, a);
    }
    assert!(!ctx.dir.entry(a).unwrap().sharers_list().exact);

    ctx.ex_req(4, a);
    assert_eq!(ctx.net.count(MsgType::InvReq), 8);
    assert_eq!(ctx.dir.stats().broadcasts, 1);
    assert_eq!(ctx.dir.stats().inv_reqs_sent, 0);

    ctx.inv_rep(1, 4, a);
    ctx.inv_rep(3, 4, a);
    assert_eq!(ctx.net.count(MsgType::ExRep), 0);
    ctx.inv_rep(2, 4, a);
    assert_eq!(ctx.receivers(MsgType::ExRep), vec![4]);
}

#[test]
fn ackwise_upgrade_broadcast_excludes_tracked_requester() {
    let config = ConfigBuilder::new(DirectoryType::Ackwise, 8).hw_sharers(2).build();
    let mut ctx = ControllerContext::new(&config);
    let a = line(0);
    for tile in [1, 2, 3] {
        ctx.sh_req(tile, a);
    }
    ctx.ex_req(1, a);
    assert_eq!(ctx.net.count(MsgType::InvReq), 7);
    assert!(ctx.net.of_type(MsgType::InvReq).all(|p| p.receiver != t(1)));
}

#[test]
fn limitless_charges_software_trap() {
    let config = ConfigBuilder::new(DirectoryType::Limitless, 8).hw_sharers(2).build();
    let mut ctx = ControllerContext::new(&config);
    let a = line(0);
    for tile in [1, 2, 3] {
        ctx.sh_req(tile, a);
    }
    assert_eq!(ctx.dir.stats().software_trap_accesses, 0);
    let before = ctx.dir.cycle();
    ctx.sh_req(4, a);
    assert_eq!(ctx.dir.stats().software_trap_accesses, 1);
    assert!(ctx.dir.cycle() >= before + 200);
    assert_eq!(sharers(&ctx, a), vec![1, 2, 3, 4]);
}

#[test]
fn cycle_accounting() {
    let mut ctx = full_map(4);
    ctx.sh_req(1, line(0));
    // Directory lookup plus one DRAM fetch.
    assert_eq!(ctx.dir.cycle(), 10 + 100);

    ctx.send(2, ShmemMsg::new(MsgType::ShReq, t(2), line(0)).at(1000));
    assert_eq!(ctx.dir.cycle(), 1000 + 10 + 100);
    assert!(ctx.net.of_type(MsgType::ShRep).all(|p| p.msg.time <= ctx.dir.cycle()));
    assert_eq!(ctx.dir.stats().cycles, ctx.dir.cycle());
}

/// Cheap tag lookups, expensive replacement searches.
#[derive(Debug)]
struct SplitLatency;

impl LatencyModel for SplitLatency {
    fn latency(&self, kind: AccessKind) -> u64 {
        match kind {
            AccessKind::DirectoryLookup => 1,
            AccessKind::ReplacementLookup => 50,
        }
    }
}

#[test]
fn custom_latency_model() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4)
        .directory(1, 1)
        .build();
    let dir = DirectoryCntlr::from_config(t(0), &config)
        .unwrap()
        .with_latency_model(Box::new(SplitLatency));
    let mut ctx = ControllerContext {
        dir,
        net: RecordingNetwork::new(4),
    };
    ctx.sh_req(1, line(0));
    assert_eq!(ctx.dir.cycle(), 1 + 100);
    ctx.sh_req(2, line(1));
    assert_eq!(ctx.dir.cycle(), 1 + 100 + 1 + 50);
}

#[test]
fn protocol_violations() {
    let mut ctx = full_map(4);
    let (a, b, c) = (line(0), line(1), line(2));
    for address in [a, b, c] {
        ctx.sh_req(1, address);
    }

    let stranger = ShmemMsg::new(MsgType::InvRep, t(2), a);
    assert_eq!(
        ctx.dir.handle_msg_from_l2_cache(t(2), stranger, &mut ctx.net),
        Err(ProtocolError::NotASharer {
            sender: t(2),
            address: a
        })
    );

    let unsolicited = ShmemMsg::new(MsgType::InvRep, t(1), b).expecting_reply(true);
    assert_eq!(
        ctx.dir.handle_msg_from_l2_cache(t(1), unsolicited, &mut ctx.net),
        Err(ProtocolError::NoOutstandingRequest {
            msg_type: MsgType::InvRep,
            address: b,
            sender: t(1)
        })
    );

    let again = ShmemMsg::new(MsgType::ShReq, t(1), c);
    assert!(matches!(
        ctx.dir.handle_msg_from_l2_cache(t(1), again, &mut ctx.net),
        Err(ProtocolError::UnexpectedMessage { msg_type: MsgType::ShReq, .. })
    ));

    let grant = ShmemMsg::new(MsgType::ExRep, t(1), a);
    assert_eq!(
        ctx.dir.handle_msg_from_l2_cache(t(1), grant, &mut ctx.net),
        Err(ProtocolError::UnsupportedMessage {
            msg_type: MsgType::ExRep
        })
    );

    let orphan = ShmemMsg::new(MsgType::FlushRep, t(3), line(9)).with_data(vec![0; LINE as usize]);
    assert!(matches!(
        ctx.dir.handle_msg_from_l2_cache(t(3), orphan, &mut ctx.net),
        Err(ProtocolError::MissingEntry { .. })
    ));
}

#[test]
fn wrong_home_rejected() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4).homes(&[0, 1]).build();
    let mut ctx = ControllerContext::new(&config);
    let remote = line(1);
    let msg = ShmemMsg::new(MsgType::ShReq, t(2), remote);
    assert_eq!(
        ctx.dir.handle_msg_from_l2_cache(t(2), msg, &mut ctx.net),
        Err(ProtocolError::WrongHome {
            address: remote,
            home: t(1),
            tile: t(0)
        })
    );

    ctx.ex_req(2, line(0));
    let req = ShmemMsg::new(MsgType::ShReq, t(2), line(2)).with_writeback(Writeback {
        address: remote,
        data: vec![0; LINE as usize],
    });
    assert!(matches!(
        ctx.dir.handle_msg_from_l2_cache(t(2), req, &mut ctx.net),
        Err(ProtocolError::WrongHome { .. })
    ));
}

#[test]
fn controller_only_on_home_tiles() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4).build();
    assert!(matches!(
        DirectoryCntlr::from_config(t(2), &config),
        Err(ConfigError::Inconsistent(_))
    ));
}
