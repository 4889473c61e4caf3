use std::collections::VecDeque;

use super::{QueueModel, QueueModelMG1};

/// Contention model that remembers when the server was idle.
///
/// The server's future is kept as a list of free intervals. A packet is
/// placed in the first interval that can hold it, at or after its arrival;
/// the gap between arrival and start is its delay. The list is capped, so the
/// oldest free intervals are forgotten; packets older than everything
/// remembered fall back to the M/G/1 estimate when the analytical model is
/// enabled.
#[derive(Debug, Clone)]
pub struct QueueModelHistoryList {
    free_intervals: VecDeque<(u64, u64)>,
    max_list_size: usize,
    min_processing_time: u64,
    analytical_model_enabled: bool,
    analytical: QueueModelMG1,
    total_requests: u64,
    analytical_requests: u64,
}

impl QueueModelHistoryList {
    /// Creates a model whose server is idle forever.
    ///
    /// # Arguments
    ///
    /// * `min_processing_time` - Free intervals shorter than this are dropped.
    /// * `max_list_size` - Maximum remembered free intervals.
    /// * `analytical_model_enabled` - Use M/G/1 for packets older than the history.
    pub fn new(
        min_processing_time: u64,
        max_list_size: usize,
        analytical_model_enabled: bool,
    ) -> Self {
        let mut free_intervals = VecDeque::with_capacity(max_list_size + 1);
        free_intervals.push_back((0, u64::MAX));
        Self {
            free_intervals,
            max_list_size: max_list_size.max(1),
            min_processing_time,
            analytical_model_enabled,
            analytical: QueueModelMG1::new(),
            total_requests: 0,
            analytical_requests: 0,
        }
    }

    /// Requests answered by the M/G/1 fallback.
    pub const fn analytical_requests(&self) -> u64 {
        self.analytical_requests
    }

    /// Requests seen.
    pub const fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Remembered free intervals, oldest first.
    pub fn free_intervals(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.free_intervals.iter().copied()
    }

    fn place(&mut self, pkt_time: u64, processing_time: u64) -> u64 {
        let pkt_end = pkt_time.saturating_add(processing_time);
        let mut delay = 0;
        let slot = self.free_intervals.iter().position(|&(start, end)| {
            (pkt_time >= start && pkt_end <= end)
                || (pkt_time < start && start.saturating_add(processing_time) <= end)
        });
        if let Some(i) = slot {
            let (start, end) = self.free_intervals[i];
            let _ = self.free_intervals.remove(i);
            let (busy_from, busy_to) = if pkt_time >= start {
                (pkt_time, pkt_end)
            } else {
                delay = start - pkt_time;
                (start, start.saturating_add(processing_time))
            };
            let mut at = i;
            if busy_from - start >= self.min_processing_time && busy_from > start {
                self.free_intervals.insert(at, (start, busy_from));
                at += 1;
            }
            if end - busy_to >= self.min_processing_time && end > busy_to {
                self.free_intervals.insert(at, (busy_to, end));
            }
        }
        if self.free_intervals.len() > self.max_list_size {
            let _ = self.free_intervals.pop_front();
        }
        delay
    }
}

impl QueueModel for QueueModelHistoryList {
    fn compute_queue_delay(&mut self, pkt_time: u64, processing_time: u64) -> u64 {
        self.total_requests += 1;
        let oldest = self.free_intervals.front().map_or(0, |&(start, _)| start);
        let delay = if self.analytical_model_enabled
            && pkt_time.saturating_add(processing_time) <= oldest
        {
            self.analytical_requests += 1;
            self.analytical.estimate(pkt_time)
        } else {
            self.place(pkt_time, processing_time)
        };
        self.analytical.update_queue(pkt_time, processing_time, delay);
        delay
    }
}
