use super::QueueModel;

/// Utilization is clamped below 1 so the estimate stays finite under overload.
const MAX_UTILIZATION: f64 = 0.9999;

/// Analytical M/G/1 contention estimator.
///
/// Keeps running moments of the service time (Welford's method) and the span
/// of observed arrivals, and estimates the mean wait with the
/// Pollaczek–Khinchine formula:
///
/// `W = λ · E[S²] / (2 · (1 − ρ))`, with `ρ = λ · E[S]`.
#[derive(Debug, Clone, Default)]
pub struct QueueModelMG1 {
    num_arrivals: u64,
    mean_service: f64,
    m2_service: f64,
    oldest_arrival: Option<u64>,
    newest_arrival: u64,
    total_wait: u64,
}

impl QueueModelMG1 {
    /// Creates an estimator with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed access.
    ///
    /// # Arguments
    ///
    /// * `arrival_time` - Cycle at which the access arrived.
    /// * `service_time` - Cycles the server spent on it.
    /// * `observed_wait` - Queueing delay charged to it.
    pub fn update_queue(&mut self, arrival_time: u64, service_time: u64, observed_wait: u64) {
        self.num_arrivals += 1;
        let x = service_time as f64;
        let delta = x - self.mean_service;
        self.mean_service += delta / self.num_arrivals as f64;
        self.m2_service += delta * (x - self.mean_service);

        self.oldest_arrival = Some(
            self.oldest_arrival
                .map_or(arrival_time, |t| t.min(arrival_time)),
        );
        self.newest_arrival = self.newest_arrival.max(arrival_time);
        self.total_wait += observed_wait;
    }

    /// Estimated queueing delay for an access arriving at `arrival_time`.
    ///
    /// Returns 0 until at least two arrivals spanning a non-zero interval have
    /// been recorded.
    pub fn estimate(&self, arrival_time: u64) -> u64 {
        let Some(oldest) = self.oldest_arrival else {
            return 0;
        };
        if self.num_arrivals <= 1 {
            return 0;
        }
        let span = self.newest_arrival.max(arrival_time).saturating_sub(oldest);
        if span == 0 {
            return 0;
        }
        let n = self.num_arrivals as f64;
        let lambda = n / span as f64;
        let variance = self.m2_service / n;
        let second_moment = variance + self.mean_service * self.mean_service;
        let rho = (lambda * self.mean_service).min(MAX_UTILIZATION);
        let wait = lambda * second_moment / (2.0 * (1.0 - rho));
        wait.floor() as u64
    }

    /// Mean service time observed so far.
    pub const fn mean_service_time(&self) -> f64 {
        self.mean_service
    }

    /// Population variance of the observed service times.
    pub fn service_time_variance(&self) -> f64 {
        if self.num_arrivals == 0 {
            0.0
        } else {
            self.m2_service / self.num_arrivals as f64
        }
    }

    /// Number of recorded arrivals.
    pub const fn num_arrivals(&self) -> u64 {
        self.num_arrivals
    }

    /// Sum of the delays charged so far.
    pub const fn total_wait(&self) -> u64 {
        self.total_wait
    }
}

impl QueueModel for QueueModelMG1 {
    fn compute_queue_delay(&mut self, pkt_time: u64, processing_time: u64) -> u64 {
        let delay = self.estimate(pkt_time);
        self.update_queue(pkt_time, processing_time, delay);
        delay
    }
}
