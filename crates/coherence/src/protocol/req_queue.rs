//! Per-address request serialization.
//!
//! Only the request at the front of an address's queue is active; the rest
//! wait in arrival order. Queues of different addresses are independent.

use std::collections::{HashMap, VecDeque};

use crate::common::PhysAddr;

use super::msg::ShmemReq;

/// Result of [`ReqQueueList::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The queue was empty; the caller must start the request now.
    Admitted,
    /// Another request is active; this one waits its turn.
    Deferred,
}

/// FIFO queues of pending requests keyed by line address.
#[derive(Debug, Default, Clone)]
pub struct ReqQueueList {
    queues: HashMap<PhysAddr, VecDeque<ShmemReq>>,
}

impl ReqQueueList {
    /// Creates an empty queue list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `req` to the queue of `address`.
    pub fn enqueue(&mut self, address: PhysAddr, req: ShmemReq) -> Admission {
        let queue = self.queues.entry(address).or_default();
        queue.push_back(req);
        if queue.len() == 1 {
            Admission::Admitted
        } else {
            Admission::Deferred
        }
    }

    /// Active request of `address`.
    pub fn front(&self, address: PhysAddr) -> Option<&ShmemReq> {
        self.queues.get(&address).and_then(VecDeque::front)
    }

    /// Mutable active request of `address`.
    pub fn front_mut(&mut self, address: PhysAddr) -> Option<&mut ShmemReq> {
        self.queues.get_mut(&address).and_then(VecDeque::front_mut)
    }

    /// Removes the completed active request and returns it.
    pub fn dequeue(&mut self, address: PhysAddr) -> Option<ShmemReq> {
        let queue = self.queues.get_mut(&address)?;
        let done = queue.pop_front();
        if queue.is_empty() {
            let _ = self.queues.remove(&address);
        }
        done
    }

    /// Removes the completed active request and returns the next one, now active.
    pub fn dequeue_next(&mut self, address: PhysAddr) -> Option<&ShmemReq> {
        let _ = self.dequeue(address);
        self.front(address)
    }

    /// Requests queued for `address`, including the active one.
    pub fn size(&self, address: PhysAddr) -> usize {
        self.queues.get(&address).map_or(0, VecDeque::len)
    }

    /// Whether `address` has an active transaction.
    pub fn is_busy(&self, address: PhysAddr) -> bool {
        self.queues.contains_key(&address)
    }

    /// Requests queued across all addresses.
    pub fn total_pending(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Whether no address has pending requests.
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
