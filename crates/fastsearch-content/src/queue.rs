//! Work queue between the walker and the content search workers.

use crossbeam_channel::{Receiver, Sender, unbounded};

use fastsearch_core::FileCandidate;

/// Unbounded multi-consumer queue of candidates awaiting a content scan.
///
/// The walker is the only producer and never blocks on [`push`](Self::push).
/// Workers block on a cloned receiver with a timeout. Emptiness of the queue
/// is what the shutdown coordinator waits for; no sentinel is ever enqueued.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: Sender<FileCandidate>,
    rx: Receiver<FileCandidate>,
}

impl WorkQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Enqueue a candidate.
    pub fn push(&self, candidate: FileCandidate) {
        // The queue holds its own receiver, so the channel never disconnects.
        let _ = self.tx.send(candidate);
    }

    /// A receiving handle for a worker.
    pub(crate) fn receiver(&self) -> Receiver<FileCandidate> {
        self.rx.clone()
    }

    /// Number of candidates waiting.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no candidates are waiting.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
