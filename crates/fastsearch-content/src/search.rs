//! End-to-end search: walk, content scan, shutdown.

use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, unbounded};
use tracing::{debug, warn};

use fastsearch_core::{FileCandidate, MatchEvent, SearchCriteria, SearchError, SearchWarning};
use fastsearch_scan::{DirectoryWalker, WalkOptions, WalkSink, WalkStats};

use crate::config::PoolConfig;
use crate::pool::{ContentSearchPool, ContentStats};
use crate::queue::WorkQueue;
use crate::shutdown::{ShutdownCoordinator, ShutdownOutcome};

/// Summary of a completed search.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Walk statistics. Walk warnings are moved into [`warnings`](Self::warnings).
    pub walk: WalkStats,
    /// Content scan statistics.
    pub content: ContentStats,
    /// Every non-fatal problem, walk warnings first.
    pub warnings: Vec<SearchWarning>,
    /// Time spent walking.
    pub walk_duration: Duration,
    /// Time from start until the pool terminated.
    pub total_duration: Duration,
    /// How the worker pool stopped.
    pub shutdown: ShutdownOutcome,
}

impl SearchReport {
    /// Number of attribute match events emitted.
    pub fn attribute_matches(&self) -> u64 {
        self.walk.accepted
    }

    /// Number of content match events emitted.
    pub fn content_matches(&self) -> u64 {
        self.content.content_matches
    }

    /// Total events emitted.
    pub fn total_matches(&self) -> u64 {
        self.attribute_matches() + self.content_matches()
    }
}

/// Runs one search over a validated [`SearchCriteria`].
///
/// The worker pool is started before the walk so deferred files are
/// scanned while the walk is still in progress. Attribute matches are sent
/// from the calling thread in walk order; content matches are sent from
/// worker threads as they are found.
#[derive(Debug, Clone)]
pub struct Searcher {
    criteria: SearchCriteria,
    pool_config: PoolConfig,
    walk_options: WalkOptions,
}

impl Searcher {
    pub fn new(criteria: SearchCriteria) -> Self {
        Self {
            criteria,
            pool_config: PoolConfig::default(),
            walk_options: WalkOptions::default(),
        }
    }

    pub fn with_pool_config(mut self, config: PoolConfig) -> Self {
        self.pool_config = config;
        self
    }

    pub fn with_walk_options(mut self, options: WalkOptions) -> Self {
        self.walk_options = options;
        self
    }

    pub fn criteria(&self) -> &SearchCriteria {
        &self.criteria
    }

    /// Run the search, sending every match on `events`.
    ///
    /// Fails only for configuration problems found before the walk starts.
    /// Events already sent are not retracted if a worker is later abandoned.
    pub fn run(&self, events: Sender<MatchEvent>) -> Result<SearchReport, SearchError> {
        let start = Instant::now();
        let roots = self.criteria.verify_roots()?;

        let pool = ContentSearchPool::start(
            self.pool_config.clone(),
            &self.criteria.content_words,
            events.clone(),
        )?;
        let mut coordinator = ShutdownCoordinator::new(&pool);

        let walker = DirectoryWalker::with_options(&self.criteria, self.walk_options.clone());
        let mut sink = EventSink {
            events: &events,
            queue: pool.queue(),
        };
        let mut walk = walker.walk_roots(&roots, &mut sink);
        debug!(
            files = walk.files_visited,
            accepted = walk.accepted,
            deferred = walk.deferred,
            "walk finished"
        );

        let shutdown = coordinator.run();

        let mut warnings = std::mem::take(&mut walk.warnings);
        warnings.extend(pool.take_warnings());
        if let ShutdownOutcome::Abandoned { still_running } = shutdown {
            let warning = SearchWarning::shutdown_timeout(still_running);
            warn!("{}", warning.message);
            warnings.push(warning);
        }

        Ok(SearchReport {
            walk_duration: walk.duration,
            walk,
            content: pool.stats(),
            warnings,
            total_duration: start.elapsed(),
            shutdown,
        })
    }

    /// Run the search and gather every event.
    pub fn collect(&self) -> Result<(Vec<MatchEvent>, SearchReport), SearchError> {
        let (tx, rx) = unbounded();
        let report = self.run(tx)?;
        // Abandoned workers may keep a sender alive, so take what is there
        // instead of waiting for the channel to close.
        let events = rx.try_iter().collect();
        Ok((events, report))
    }
}

/// Forwards walker output: accepted files become events, deferred files
/// go to the content search queue.
struct EventSink<'a> {
    events: &'a Sender<MatchEvent>,
    queue: &'a WorkQueue,
}

impl WalkSink for EventSink<'_> {
    fn accept(&mut self, candidate: FileCandidate) {
        let _ = self.events.send(MatchEvent::AttributeMatch {
            path: candidate.path,
        });
    }

    fn defer(&mut self, candidate: FileCandidate) {
        self.queue.push(candidate);
    }
}
