//! Configuration for the content search pool.

use std::thread;
use std::time::Duration;

use derive_builder::Builder;

/// Lower bound on the automatically chosen worker count.
const MIN_AUTO_WORKERS: usize = 4;

/// Configuration for [`ContentSearchPool`](crate::ContentSearchPool) and
/// its shutdown sequence.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct PoolConfig {
    /// Number of worker threads (0 = `max(available_parallelism, 4)`).
    #[builder(default = "0")]
    pub workers: usize,

    /// How long an idle worker blocks on the queue before re-checking
    /// for a stop request.
    #[builder(default = "Duration::from_millis(100)")]
    pub recv_timeout: Duration,

    /// Interval at which the queue is polled for emptiness while draining.
    #[builder(default = "Duration::from_millis(50)")]
    pub drain_poll_interval: Duration,

    /// Time granted to workers to finish their current file after an
    /// orderly stop is requested.
    #[builder(default = "Duration::from_secs(5)")]
    pub orderly_timeout: Duration,

    /// Time granted to workers after a forced stop before they are abandoned.
    #[builder(default = "Duration::from_secs(5)")]
    pub forced_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            recv_timeout: Duration::from_millis(100),
            drain_poll_interval: Duration::from_millis(50),
            orderly_timeout: Duration::from_secs(5),
            forced_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolConfig {
    /// Create a new config builder.
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::default()
    }

    /// Resolve the number of workers to start.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let available = thread::available_parallelism().map_or(1, |n| n.get());
        available.max(MIN_AUTO_WORKERS)
    }
}
