//! Drain-then-stop sequencing for the content search pool.

use std::thread;

use strum::Display;
use tracing::{info, warn};

use crate::pool::ContentSearchPool;

/// Lifecycle of a search from the coordinator's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ShutdownState {
    /// The walker is producing candidates; workers are consuming them.
    Walking,
    /// All roots are walked; waiting for the queue to empty.
    Draining,
    /// Stop requests have been issued; waiting for workers to exit.
    Stopping,
    /// Nothing left to wait for.
    Terminated,
}

/// How the pool ended up stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker exited after the orderly stop.
    Clean,
    /// A forced stop was needed, after which every worker exited.
    Forced,
    /// Workers were still running after the forced stop and were left behind.
    Abandoned { still_running: usize },
}

impl ShutdownOutcome {
    /// True when every worker exited during the orderly phase.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }
}

/// Drives a [`ContentSearchPool`] from `Walking` to `Terminated`.
///
/// Once the walk is over, [`run`](Self::run) polls the queue until it is
/// empty, then requests an orderly stop and waits up to the orderly timeout.
/// Workers still busy after that are force-stopped and given the forced
/// timeout. Anything still running after the second wait is abandoned.
pub struct ShutdownCoordinator<'a> {
    pool: &'a ContentSearchPool,
    state: ShutdownState,
}

impl<'a> ShutdownCoordinator<'a> {
    /// Creates a coordinator in the `Walking` state for `pool`.
    pub fn new(pool: &'a ContentSearchPool) -> Self {
        Self {
            pool,
            state: ShutdownState::Walking,
        }
    }

    /// Current phase of the shutdown sequence.
    pub fn state(&self) -> ShutdownState {
        self.state
    }

    /// Drain the queue, then stop the workers.
    pub fn run(&mut self) -> ShutdownOutcome {
        self.drain();
        self.stop()
    }

    /// Wait until the queue is empty.
    ///
    /// Returns early if the pool was cancelled or every worker has exited,
    /// since nothing would empty the queue in either case.
    pub fn drain(&mut self) {
        if self.state != ShutdownState::Walking {
            return;
        }
        self.transition(ShutdownState::Draining);

        let pool = self.pool;
        let interval = pool.config().drain_poll_interval;
        while !pool.queue().is_empty() {
            if pool.is_cancelled() {
                info!(pending = pool.queue().len(), "drain interrupted by cancellation");
                break;
            }
            if pool.running() == 0 {
                warn!(pending = pool.queue().len(), "no workers left to drain the queue");
                break;
            }
            thread::sleep(interval);
        }
    }

    /// Stop the workers, escalating from orderly to forced.
    pub fn stop(&mut self) -> ShutdownOutcome {
        if self.state == ShutdownState::Walking {
            self.transition(ShutdownState::Draining);
        }
        self.transition(ShutdownState::Stopping);
        let pool = self.pool;
        let config = pool.config();

        pool.request_orderly_stop();
        let outcome = if pool.wait_for_workers(config.orderly_timeout) {
            ShutdownOutcome::Clean
        } else {
            warn!(
                still_running = pool.running(),
                timeout = ?config.orderly_timeout,
                "orderly stop timed out, forcing workers to stop"
            );
            pool.request_forced_stop();
            if pool.wait_for_workers(config.forced_timeout) {
                ShutdownOutcome::Forced
            } else {
                ShutdownOutcome::Abandoned {
                    still_running: pool.running(),
                }
            }
        };

        self.transition(ShutdownState::Terminated);
        outcome
    }

    fn transition(&mut self, next: ShutdownState) {
        info!(from = %self.state, to = %next, "shutdown state change");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    fn pool(workers: usize) -> ContentSearchPool {
        let config = PoolConfig::builder()
            .workers(workers)
            .recv_timeout(Duration::from_millis(10))
            .drain_poll_interval(Duration::from_millis(5))
            .build()
            .unwrap();
        let (tx, _rx) = unbounded();
        ContentSearchPool::start(config, &["x".to_string()], tx).unwrap()
    }

    #[test]
    fn test_idle_pool_stops_cleanly() {
        let pool = pool(2);
        let mut coordinator = ShutdownCoordinator::new(&pool);
        assert_eq!(coordinator.state(), ShutdownState::Walking);

        let outcome = coordinator.run();
        assert_eq!(outcome, ShutdownOutcome::Clean);
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
        assert_eq!(pool.running(), 0);
    }

    #[test]
    fn test_stop_without_drain_still_terminates() {
        let pool = pool(1);
        let mut coordinator = ShutdownCoordinator::new(&pool);

        assert!(coordinator.stop().is_clean());
        assert_eq!(coordinator.state(), ShutdownState::Terminated);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ShutdownState::Draining.to_string(), "draining");
        assert_eq!(ShutdownState::Terminated.to_string(), "terminated");
    }
}
