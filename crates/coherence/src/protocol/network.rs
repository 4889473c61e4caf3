//! Transport between private caches and directory controllers.
//!
//! The protocol only needs to hand a message to a destination component on a
//! destination tile. It provides:
//! 1. **Packet:** Sender, receiver, destination component, and the message.
//! 2. **Network trait:** Unicast `send` plus a `broadcast` built on top of it.
//! 3. **Recording network:** A `Vec`-backed implementation for inspecting traffic.

use crate::common::TileId;

use super::msg::{MsgType, ShmemMsg};

/// Memory component a packet is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemComponent {
    /// The private (last-level) cache of a tile.
    L2Cache,
    /// The directory controller of a home tile.
    DramDirectory,
}

/// One message in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Sending tile.
    pub sender: TileId,
    /// Receiving tile.
    pub receiver: TileId,
    /// Component on the receiving tile.
    pub component: MemComponent,
    /// Payload.
    pub msg: ShmemMsg,
}

/// A message transport.
///
/// Delivery order between a pair of tiles must be preserved; nothing else is assumed.
pub trait Network {
    /// Number of tiles reachable by `broadcast`.
    fn num_tiles(&self) -> u32;

    /// Queues a packet for delivery.
    fn send(&mut self, packet: Packet);

    /// Sends a copy of `msg` to the cache of every tile except `exclude`.
    fn broadcast(&mut self, sender: TileId, msg: &ShmemMsg, exclude: Option<TileId>) {
        for id in (0..self.num_tiles()).map(TileId::new) {
            if Some(id) == exclude {
                continue;
            }
            self.send(Packet {
                sender,
                receiver: id,
                component: MemComponent::L2Cache,
                msg: msg.clone(),
            });
        }
    }
}

/// Network that keeps every packet it is given.
#[derive(Debug, Clone, Default)]
pub struct RecordingNetwork {
    num_tiles: u32,
    /// Packets in send order.
    pub packets: Vec<Packet>,
}

impl RecordingNetwork {
    /// Creates an empty recorder for a machine of `num_tiles` tiles.
    pub const fn new(num_tiles: u32) -> Self {
        Self {
            num_tiles,
            packets: Vec::new(),
        }
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.packets)
    }

    /// Recorded packets of type `msg_type`.
    pub fn of_type(&self, msg_type: MsgType) -> impl Iterator<Item = &Packet> {
        self.packets
            .iter()
            .filter(move |p| p.msg.msg_type == msg_type)
    }

    /// Number of recorded packets of type `msg_type`.
    pub fn count(&self, msg_type: MsgType) -> usize {
        self.of_type(msg_type).count()
    }
}

impl Network for RecordingNetwork {
    fn num_tiles(&self) -> u32 {
        self.num_tiles
    }

    fn send(&mut self, packet: Packet) {
        self.packets.push(packet);
    }
}
