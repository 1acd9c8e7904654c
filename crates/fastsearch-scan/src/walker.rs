//! JWalk-based directory walker.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use jwalk::{DirEntry, Parallelism, WalkDirGeneric};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use fastsearch_core::{FileCandidate, SearchCriteria, SearchError, SearchWarning, WarningKind};

use crate::filter::{Decision, FilterPipeline};
use crate::progress::WalkProgress;
use crate::visited::VisitedFiles;

/// How often (in files) a progress snapshot is published.
const PROGRESS_INTERVAL: u64 = 1000;

/// jwalk client state: the per-entry flag marks a symlinked directory that
/// was not descended because it points back to one of its ancestors.
type LoopState = ((), bool);

/// Receives the candidates that survive attribute filtering.
pub trait WalkSink {
    /// A file passed every attribute group and no content words are configured.
    fn accept(&mut self, candidate: FileCandidate);

    /// A file passed every attribute group and still needs a content scan.
    fn defer(&mut self, candidate: FileCandidate);
}

/// Walk tuning options.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Number of threads reading directories (0 = library default).
    pub threads: usize,
    /// Include hidden files (starting with `.`).
    pub include_hidden: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            include_hidden: true,
        }
    }
}

/// Statistics for a completed walk.
#[derive(Debug, Clone, Default)]
pub struct WalkStats {
    /// Regular files visited.
    pub files_visited: u64,
    /// Directories visited (roots included).
    pub dirs_visited: u64,
    /// Files reported as attribute matches.
    pub accepted: u64,
    /// Files handed to the content search.
    pub deferred: u64,
    /// Files rejected by the filter pipeline.
    pub rejected: u64,
    /// Files skipped because they were already reached through another path.
    pub duplicates_skipped: u64,
    /// Non-fatal problems encountered.
    pub warnings: Vec<SearchWarning>,
    /// Wall-clock duration of the walk.
    pub duration: Duration,
}

/// Recursive walker that filters every regular file under a set of roots.
///
/// Symbolic links are followed. Directory reads run in parallel, but entries
/// are yielded depth-first and sorted by name, so the order of
/// [`WalkSink::accept`] calls is the same on every run over an unchanged tree.
pub struct DirectoryWalker<'a> {
    pipeline: FilterPipeline<'a>,
    options: WalkOptions,
    progress_tx: broadcast::Sender<WalkProgress>,
}

impl<'a> DirectoryWalker<'a> {
    /// Create a walker with default options.
    pub fn new(criteria: &'a SearchCriteria) -> Self {
        Self::with_options(criteria, WalkOptions::default())
    }

    /// Create a walker with custom options.
    pub fn with_options(criteria: &'a SearchCriteria, options: WalkOptions) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            pipeline: FilterPipeline::new(criteria),
            options,
            progress_tx,
        }
    }

    /// Subscribe to walk progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<WalkProgress> {
        self.progress_tx.subscribe()
    }

    /// Verify the configured roots, then walk them.
    pub fn walk(&self, sink: &mut dyn WalkSink) -> Result<WalkStats, SearchError> {
        let roots = self.pipeline.criteria().verify_roots()?;
        Ok(self.walk_roots(&roots, sink))
    }

    /// Walk already-verified roots in order.
    pub fn walk_roots(&self, roots: &[PathBuf], sink: &mut dyn WalkSink) -> WalkStats {
        let start = Instant::now();
        let visited = VisitedFiles::new();
        let mut stats = WalkStats::default();

        for root in roots {
            self.walk_root(root, &visited, sink, &mut stats, start);
        }

        stats.duration = start.elapsed();
        stats
    }

    fn walk_root(
        &self,
        root: &Path,
        visited: &VisitedFiles,
        sink: &mut dyn WalkSink,
        stats: &mut WalkStats,
        start: Instant,
    ) {
        debug!(root = %root.display(), "walking root");

        let parallelism = match self.options.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDirGeneric::<LoopState>::new(root)
            .parallelism(parallelism)
            .skip_hidden(!self.options.include_hidden)
            .follow_links(true)
            .sort(true)
            .process_read_dir(|_depth, dir_path, _state, children| {
                mark_symlink_loops(dir_path, children);
            });

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    let warning = match (err.loop_ancestor(), err.io_error()) {
                        (Some(ancestor), _) => SearchWarning::symlink_loop(&path, ancestor),
                        (None, Some(io_err)) => SearchWarning::read_error(&path, io_err),
                        (None, None) => {
                            SearchWarning::new(&path, err.to_string(), WarningKind::ReadError)
                        }
                    };
                    self.record_warning(stats, warning);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.dirs_visited += 1;
                if entry.client_state {
                    let path = entry.path();
                    let target = path.canonicalize().unwrap_or_default();
                    self.record_warning(stats, SearchWarning::symlink_loop(path, target));
                }
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            stats.files_visited += 1;
            self.visit_file(&entry, visited, sink, stats);

            if stats.files_visited % PROGRESS_INTERVAL == 0 {
                self.publish_progress(root, &entry.path(), stats, start);
            }
        }

        self.publish_progress(root, root, stats, start);
    }

    fn visit_file(
        &self,
        entry: &DirEntry<LoopState>,
        visited: &VisitedFiles,
        sink: &mut dyn WalkSink,
        stats: &mut WalkStats,
    ) {
        let path = entry.path();

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                self.record_warning(
                    stats,
                    SearchWarning::new(&path, err.to_string(), WarningKind::MetadataError),
                );
                return;
            }
        };

        let canonical = match path.canonicalize() {
            Ok(p) => p,
            Err(err) => {
                self.record_warning(
                    stats,
                    SearchWarning::new(&path, err.to_string(), WarningKind::MetadataError),
                );
                return;
            }
        };

        if !visited.insert(&canonical) {
            stats.duplicates_skipped += 1;
            return;
        }

        let candidate = match FileCandidate::from_metadata(&canonical, &metadata) {
            Ok(c) => c,
            Err(err) => {
                self.record_warning(
                    stats,
                    SearchWarning::new(&canonical, err.to_string(), WarningKind::MetadataError),
                );
                return;
            }
        };
        match self.pipeline.evaluate(&candidate) {
            Decision::Reject => stats.rejected += 1,
            Decision::Accept => {
                stats.accepted += 1;
                sink.accept(candidate);
            }
            Decision::DeferToContentSearch => {
                stats.deferred += 1;
                sink.defer(candidate);
            }
        }
    }

    fn record_warning(&self, stats: &mut WalkStats, warning: SearchWarning) {
        warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
        stats.warnings.push(warning);
    }

    fn publish_progress(&self, root: &Path, current: &Path, stats: &WalkStats, start: Instant) {
        let _ = self.progress_tx.send(WalkProgress {
            files_visited: stats.files_visited,
            dirs_visited: stats.dirs_visited,
            accepted: stats.accepted,
            deferred: stats.deferred,
            current_root: root.to_path_buf(),
            current_path: current.to_path_buf(),
            warnings_count: stats.warnings.len() as u64,
            elapsed: start.elapsed(),
        });
    }
}

/// Stop jwalk from descending into symlinked directories that resolve to
/// an ancestor of the directory being read.
fn mark_symlink_loops(
    dir_path: &Path,
    children: &mut [Result<DirEntry<LoopState>, jwalk::Error>],
) {
    for child in children.iter_mut().flatten() {
        if !child.file_type().is_dir() || !child.path_is_symlink() {
            continue;
        }
        let Ok(target) = child.path().canonicalize() else {
            continue;
        };
        if leads_to_ancestor(dir_path, &target) {
            child.read_children_path = None;
            child.client_state = true;
        }
    }
}

/// Whether `target` is `dir_path` itself or one of the directories on the
/// way to it, comparing canonical forms.
fn leads_to_ancestor(dir_path: &Path, target: &Path) -> bool {
    dir_path.ancestors().any(|ancestor| {
        ancestor == target || ancestor.canonicalize().is_ok_and(|c| c == target)
    })
}
