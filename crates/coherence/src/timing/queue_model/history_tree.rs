use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use super::{QueueModel, QueueModelMG1};

/// Contention model over free intervals indexed by start cycle.
///
/// Same placement rule as the history list, but lookups are logarithmic:
/// the interval that may contain the arrival is the last one starting at or
/// before it, otherwise the packet takes the first later interval long enough
/// to serve it. When the index is full the earliest interval is forgotten
/// before placing the next packet.
#[derive(Debug, Clone)]
pub struct QueueModelHistoryTree {
    /// start -> end of every free interval.
    free_intervals: BTreeMap<u64, u64>,
    max_size: usize,
    min_processing_time: u64,
    analytical_model_enabled: bool,
    analytical: QueueModelMG1,
    total_requests: u64,
    analytical_requests: u64,
}

impl QueueModelHistoryTree {
    /// Creates a model whose server is idle forever.
    ///
    /// # Arguments
    ///
    /// * `min_processing_time` - Free intervals shorter than this are dropped.
    /// * `max_size` - Maximum remembered free intervals.
    /// * `analytical_model_enabled` - Use M/G/1 for packets older than the history.
    pub fn new(min_processing_time: u64, max_size: usize, analytical_model_enabled: bool) -> Self {
        Self {
            free_intervals: BTreeMap::from([(0, u64::MAX)]),
            max_size: max_size.max(1),
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

    /// Remembered free intervals in start order.
    pub fn free_intervals(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.free_intervals.iter().map(|(&start, &end)| (start, end))
    }

    fn find(&self, pkt_time: u64, processing_time: u64) -> Option<(u64, u64)> {
        let pkt_end = pkt_time.saturating_add(processing_time);
        let covering = self
            .free_intervals
            .range(..=pkt_time)
            .next_back()
            .filter(|&(_, &end)| pkt_end <= end);
        covering
            .or_else(|| {
                self.free_intervals
                    .range((Excluded(pkt_time), Unbounded))
                    .find(|&(&start, &end)| end - start >= processing_time)
            })
            .map(|(&start, &end)| (start, end))
    }

    fn keep(&mut self, start: u64, end: u64) {
        if end > start && end - start >= self.min_processing_time {
            let _ = self.free_intervals.insert(start, end);
        }
    }

    fn place(&mut self, pkt_time: u64, processing_time: u64) -> u64 {
        let Some((start, end)) = self.find(pkt_time, processing_time) else {
            return 0;
        };
        let _ = self.free_intervals.remove(&start);
        let (delay, busy_from) = if pkt_time >= start {
            (0, pkt_time)
        } else {
            (start - pkt_time, start)
        };
        let busy_to = busy_from.saturating_add(processing_time);
        self.keep(start, busy_from);
        self.keep(busy_to, end);
        delay
    }
}

impl QueueModel for QueueModelHistoryTree {
    fn compute_queue_delay(&mut self, pkt_time: u64, processing_time: u64) -> u64 {
        self.total_requests += 1;
        if self.free_intervals.len() >= self.max_size {
            let _ = self.free_intervals.pop_first();
        }
        let oldest = self.free_intervals.first_key_value().map_or(0, |(&start, _)| start);
        let delay = if self.analytical_model_enabled
            && pkt_time.saturating_add(processing_time) < oldest
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
