//! Contention (queueing delay) models.
//!
//! A queue model is a timing oracle: given when a packet arrives at a server
//! and how long the server needs for it, it returns how long the packet waits
//! first. It never influences protocol ordering.
//!
//! 1. **M/G/1:** Closed-form estimate from running service-time moments.
//! 2. **History list:** Explicit free-interval bookkeeping with an M/G/1 fallback.
//! 3. **History tree:** The same bookkeeping indexed by interval start.

/// Free-interval history model.
pub mod history_list;

/// Start-indexed free-interval model.
pub mod history_tree;

/// Analytical M/G/1 model.
pub mod mg1;

pub use history_list::QueueModelHistoryList;
pub use history_tree::QueueModelHistoryTree;
pub use mg1::QueueModelMG1;

use crate::config::{QueueModelConfig, QueueModelType};

/// A server contention model.
pub trait QueueModel: Send + Sync + std::fmt::Debug {
    /// Delay charged to a packet, recording it in the model's history.
    ///
    /// # Arguments
    ///
    /// * `pkt_time` - Arrival cycle.
    /// * `processing_time` - Service cycles the packet needs.
    ///
    /// # Returns
    ///
    /// Cycles the packet waits before service starts.
    fn compute_queue_delay(&mut self, pkt_time: u64, processing_time: u64) -> u64;
}

/// Builds the configured model, or `None` when queueing is disabled.
pub fn create(config: &QueueModelConfig, min_processing_time: u64) -> Option<Box<dyn QueueModel>> {
    if !config.enabled {
        return None;
    }
    Some(match config.kind {
        QueueModelType::Mg1 => Box::new(QueueModelMG1::new()),
        QueueModelType::HistoryList => Box::new(QueueModelHistoryList::new(
            min_processing_time,
            config.history_list.max_list_size,
            config.history_list.analytical_model_enabled,
        )),
        QueueModelType::HistoryTree => Box::new(QueueModelHistoryTree::new(
            min_processing_time,
            config.history_tree.max_list_size,
            config.history_tree.analytical_model_enabled,
        )),
    })
}
