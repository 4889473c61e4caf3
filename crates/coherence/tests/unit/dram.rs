//! # Backing Store Tests
//!
//! Latency models, contention, and when a directory controller touches its store.

use pretty_assertions::assert_eq;
use tilesim_coherence::common::PhysAddr;
use tilesim_coherence::config::{Config, MemoryControllerKind};
use tilesim_coherence::directory::DirectoryType;
use tilesim_coherence::dram::controller::{self, MemoryController, RowBufferController, SimpleController};
use tilesim_coherence::dram::{BackingStore, DramCntlr};
use tilesim_coherence::protocol::{DirectoryCntlr, MsgType, RecordingNetwork, ShmemMsg};
use tilesim_coherence::timing::queue_model::QueueModelHistoryList;

use crate::common::harness::{ConfigBuilder, LINE, line, t};
use crate::common::mocks::store_with_latency;

#[test]
fn simple_controller_is_flat() {
    let mut mc = SimpleController::new(100);
    assert_eq!(mc.access_latency(PhysAddr::new(0)), 100);
    assert_eq!(mc.access_latency(PhysAddr::new(0x10_0000)), 100);
    assert_eq!(mc.min_latency(), 100);
}

#[test]
fn row_buffer_hits_and_conflicts() {
    let mut mc = RowBufferController::new(5, 20, 7);
    assert_eq!(mc.access_latency(PhysAddr::new(0)), 25);
    assert_eq!(mc.access_latency(PhysAddr::new(0x40)), 5);
    assert_eq!(mc.access_latency(PhysAddr::new(2048)), 32);
    assert_eq!(mc.access_latency(PhysAddr::new(2048 + 0x40)), 5);
    assert_eq!(mc.min_latency(), 5);
}

#[test]
fn create_from_config() {
    let mut config = Config::default();
    config.dram.controller = MemoryControllerKind::RowBuffer;
    let mut mc = controller::create(&config.dram);
    assert_eq!(mc.access_latency(PhysAddr::new(0)), 28);
    assert_eq!(mc.access_latency(PhysAddr::new(0)), 14);
}

#[test]
fn queueing_delay_added_to_service() {
    let queue = QueueModelHistoryList::new(100, 16, false);
    let mut dram = DramCntlr::new(LINE, Box::new(SimpleController::new(100)), Some(Box::new(queue)));
    assert_eq!(dram.access_latency(line(0), 0), 100);
    assert_eq!(dram.access_latency(line(1), 50), 150);
    assert_eq!(dram.stats().total_access_latency, 200);
    assert_eq!(dram.stats().total_queue_delay, 50);
}

#[test]
fn lines_are_zero_filled_and_sparse() {
    let mut dram = DramCntlr::from_config(&Config::default());
    assert_eq!(dram.peek(line(4)), None);
    assert_eq!(dram.fetch(line(4)), vec![0; LINE as usize]);
    dram.store(line(4), &[1; LINE as usize]);
    assert_eq!(dram.peek(line(4)), Some(&[1; LINE as usize][..]));
    assert_eq!(dram.stats().reads, 1);
    assert_eq!(dram.stats().writes, 1);
}

#[test]
fn forwarded_data_skips_fetch() {
    let config = ConfigBuilder::new(DirectoryType::FullMap, 4).build();
    let mut store = store_with_latency(3);
    let _ = store
        .expect_fetch()
        .times(1)
        .returning(|_| vec![0; LINE as usize]);
    let _ = store
        .expect_store()
        .withf(|address, data| *address == line(0) && data.iter().all(|&b| b == 7))
        .times(1)
        .return_const(());

    let mut dir = DirectoryCntlr::with_backing_store(t(0), &config, store).unwrap();
    let mut net = RecordingNetwork::new(4);
    let a = line(0);
    dir.handle_msg_from_l2_cache(t(1), ShmemMsg::new(MsgType::ExReq, t(1), a), &mut net)
        .unwrap();
    dir.handle_msg_from_l2_cache(t(2), ShmemMsg::new(MsgType::ShReq, t(2), a), &mut net)
        .unwrap();
    let reply = ShmemMsg::new(MsgType::WbRep, t(2), a)
        .with_data(vec![7; LINE as usize])
        .expecting_reply(true);
    dir.handle_msg_from_l2_cache(t(1), reply, &mut net).unwrap();

    let grant = net.of_type(MsgType::ShRep).next().unwrap();
    assert_eq!(grant.msg.data.as_deref(), Some(&[7; LINE as usize][..]));
    // Three lookups, one fetch, one store.
    assert_eq!(dir.cycle(), 10 + 3 + 10 + 3 + 10);
}
