//! Worker pool that scans queued files for content words.

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use fastsearch_core::{FileCandidate, MatchEvent, SearchError, SearchWarning};

use crate::config::PoolConfig;
use crate::matcher::WordMatcher;
use crate::queue::WorkQueue;

/// Content statistics at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentStats {
    /// Files read to the end or until cancelled.
    pub files_scanned: u64,
    /// Bytes read across all files.
    pub bytes_scanned: u64,
    /// Content match events emitted.
    pub content_matches: u64,
    /// Files abandoned because they could not be read.
    pub read_errors: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    files_scanned: AtomicU64,
    bytes_scanned: AtomicU64,
    content_matches: AtomicU64,
    read_errors: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self) -> ContentStats {
        ContentStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            content_matches: self.content_matches.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Fixed-size pool of content search workers.
///
/// Workers are started immediately and pull candidates from the pool's
/// [`WorkQueue`] until stopped. Two cancellation tokens control them:
///
/// - the *orderly* token makes a worker exit once its current file is done
///   and before it takes another one from the queue;
/// - the *forced* token additionally interrupts the current file between
///   lines. The orderly token is a child of the forced one, so a forced
///   stop implies an orderly stop.
///
/// Every worker owns a clone of a completion sender that is dropped when
/// the worker exits (normally or by panicking). [`wait_for_workers`]
/// observes the channel disconnecting once the last worker is gone.
///
/// [`wait_for_workers`]: Self::wait_for_workers
pub struct ContentSearchPool {
    config: PoolConfig,
    workers: usize,
    queue: WorkQueue,
    forced: CancellationToken,
    orderly: CancellationToken,
    done_rx: Receiver<()>,
    warnings_rx: Receiver<SearchWarning>,
    running: Arc<AtomicUsize>,
    counters: Arc<PoolCounters>,
    // Dropping a rayon pool does not wait for its jobs, so abandoned
    // workers never block the caller.
    _threads: ThreadPool,
}

impl ContentSearchPool {
    /// Start the workers. Matches are sent on `events` as they are found.
    pub fn start(
        config: PoolConfig,
        words: &[String],
        events: Sender<MatchEvent>,
    ) -> Result<Self, SearchError> {
        let workers = config.worker_count();
        let threads = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("fast-search-{}", index + 1))
            .panic_handler(log_worker_panic)
            .build()
            .map_err(|err| SearchError::ThreadPool {
                message: err.to_string(),
            })?;

        let queue = WorkQueue::new();
        let forced = CancellationToken::new();
        let orderly = forced.child_token();
        let (done_tx, done_rx) = unbounded();
        let (warnings_tx, warnings_rx) = unbounded();
        let running = Arc::new(AtomicUsize::new(0));
        let counters = Arc::new(PoolCounters::default());
        let matcher = Arc::new(WordMatcher::new(words.iter().cloned()));

        for id in 1..=workers {
            let worker = Worker {
                id,
                queue: queue.receiver(),
                matcher: Arc::clone(&matcher),
                events: events.clone(),
                warnings: warnings_tx.clone(),
                orderly: orderly.clone(),
                forced: forced.clone(),
                recv_timeout: config.recv_timeout,
                counters: Arc::clone(&counters),
                _running: RunningGuard::new(&running),
                _done: done_tx.clone(),
            };
            threads.spawn(move || worker.run());
        }

        debug!(workers, "content search pool started");

        Ok(Self {
            config,
            workers,
            queue,
            forced,
            orderly,
            done_rx,
            warnings_rx,
            running,
            counters,
            _threads: threads,
        })
    }

    /// The queue feeding this pool.
    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    /// Configuration the pool was started with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of workers started.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of workers that have not exited yet.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of the scan counters so far.
    pub fn stats(&self) -> ContentStats {
        self.counters.snapshot()
    }

    /// A handle to the forced stop token. Cancelling it interrupts all
    /// workers between lines.
    pub fn cancel_token(&self) -> CancellationToken {
        self.forced.clone()
    }

    /// Whether a forced stop has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.forced.is_cancelled()
    }

    /// Ask workers to exit after their current file.
    pub fn request_orderly_stop(&self) {
        self.orderly.cancel();
    }

    /// Ask workers to abandon their current file and exit.
    pub fn request_forced_stop(&self) {
        self.forced.cancel();
    }

    /// Block until every worker has exited or `timeout` elapses.
    /// Returns `true` if all workers exited.
    pub fn wait_for_workers(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.done_rx.recv_deadline(deadline) {
                Ok(()) => continue,
                Err(RecvTimeoutError::Disconnected) => return true,
                Err(RecvTimeoutError::Timeout) => return false,
            }
        }
    }

    /// Take the warnings reported by workers so far.
    pub fn take_warnings(&self) -> Vec<SearchWarning> {
        self.warnings_rx.try_iter().collect()
    }
}

/// Decrements the running count when a worker goes away.
struct RunningGuard {
    running: Arc<AtomicUsize>,
}

impl RunningGuard {
    fn new(running: &Arc<AtomicUsize>) -> Self {
        running.fetch_add(1, Ordering::AcqRel);
        Self {
            running: Arc::clone(running),
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }
}

struct Worker {
    id: usize,
    queue: Receiver<FileCandidate>,
    matcher: Arc<WordMatcher>,
    events: Sender<MatchEvent>,
    warnings: Sender<SearchWarning>,
    orderly: CancellationToken,
    forced: CancellationToken,
    recv_timeout: Duration,
    counters: Arc<PoolCounters>,
    // Field order matters: the running count drops before the completion
    // sender, so it reads zero once waiters see the channel disconnect.
    _running: RunningGuard,
    _done: Sender<()>,
}

impl Worker {
    fn run(self) {
        loop {
            if self.orderly.is_cancelled() {
                break;
            }
            match self.queue.recv_timeout(self.recv_timeout) {
                Ok(candidate) => self.scan(candidate.path),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(worker = self.id, "worker stopped");
    }

    fn scan(&self, path: PathBuf) {
        let result = self.matcher.scan_file(&path, &self.forced, |line_number, line| {
            let _ = self.events.send(MatchEvent::ContentMatch {
                path: path.clone(),
                line_number,
                line,
            });
        });

        match result {
            Ok(outcome) => {
                self.counters.files_scanned.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .bytes_scanned
                    .fetch_add(outcome.bytes, Ordering::Relaxed);
                self.counters
                    .content_matches
                    .fetch_add(outcome.matches, Ordering::Relaxed);

                if outcome.matches > 0 {
                    debug!(
                        worker = self.id,
                        path = %path.display(),
                        matches = outcome.matches,
                        "content matched"
                    );
                }
                if outcome.cancelled {
                    debug!(worker = self.id, path = %path.display(), "scan interrupted");
                }
            }
            Err(err) => {
                self.counters.read_errors.fetch_add(1, Ordering::Relaxed);
                let warning = SearchWarning::content_read(&path, &err);
                warn!(worker = self.id, path = %path.display(), "{}", warning.message);
                let _ = self.warnings.send(warning);
            }
        }
    }
}

fn log_worker_panic(payload: Box<dyn Any + Send>) {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!(%message, "content search worker panicked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn quick_config(workers: usize) -> PoolConfig {
        PoolConfig::builder()
            .workers(workers)
            .recv_timeout(Duration::from_millis(10))
            .build()
            .unwrap()
    }

    #[test]
    fn test_workers_stop_on_orderly_request() {
        let (tx, _rx) = unbounded();
        let pool = ContentSearchPool::start(quick_config(3), &["x".to_string()], tx).unwrap();

        assert_eq!(pool.workers(), 3);
        pool.request_orderly_stop();
        assert!(pool.wait_for_workers(Duration::from_secs(5)));
        assert_eq!(pool.running(), 0);
        assert!(!pool.is_cancelled());
    }

    #[test]
    fn test_scans_queued_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "alpha\nbeta\nalphabet\n").unwrap();

        let (tx, rx) = unbounded();
        let pool = ContentSearchPool::start(quick_config(2), &["alpha".to_string()], tx).unwrap();
        pool.queue().push(FileCandidate::new(&path, 0, 0));

        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        pool.request_orderly_stop();
        assert!(pool.wait_for_workers(Duration::from_secs(5)));

        let mut lines: Vec<u64> = [first, second]
            .into_iter()
            .map(|event| match event {
                MatchEvent::ContentMatch { line_number, .. } => line_number,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        lines.sort_unstable();
        assert_eq!(lines, vec![1, 3]);
        assert_eq!(pool.stats().files_scanned, 1);
        assert_eq!(pool.stats().content_matches, 2);
    }

    #[test]
    fn test_unreadable_file_becomes_warning() {
        let temp = TempDir::new().unwrap();
        let (tx, _rx) = unbounded();
        let pool = ContentSearchPool::start(quick_config(1), &["a".to_string()], tx).unwrap();

        pool.queue().push(FileCandidate::new(temp.path().join("gone.txt"), 0, 0));
        while pool.stats().read_errors == 0 {
            std::thread::sleep(Duration::from_millis(5));
        }
        pool.request_orderly_stop();
        assert!(pool.wait_for_workers(Duration::from_secs(5)));

        let warnings = pool.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, fastsearch_core::WarningKind::ContentRead);
    }
}
