//! Directory walking and attribute filtering for fastsearch.
//!
//! This crate turns a [`SearchCriteria`] into a stream of candidates:
//!
//! - **[`FilterPipeline`]** evaluates one file's metadata against the
//!   criteria and decides whether it is rejected, accepted outright, or
//!   deferred to a content scan.
//! - **[`DirectoryWalker`]** walks every root with jwalk (following
//!   symbolic links, skipping loops and files already seen through another
//!   path) and hands accepted and deferred candidates to a [`WalkSink`].
//!
//! # Example
//!
//! ```rust,no_run
//! use fastsearch_scan::{DirectoryWalker, FileCandidate, SearchCriteria, WalkSink};
//!
//! struct Print;
//!
//! impl WalkSink for Print {
//!     fn accept(&mut self, candidate: FileCandidate) {
//!         println!("{}", candidate.path.display());
//!     }
//!
//!     fn defer(&mut self, _candidate: FileCandidate) {}
//! }
//!
//! let criteria = SearchCriteria::builder()
//!     .roots(vec!["/var/log".into()])
//!     .name_suffixes(vec![".log".to_string()])
//!     .build()
//!     .unwrap();
//!
//! let stats = DirectoryWalker::new(&criteria).walk(&mut Print).unwrap();
//! println!("{} files visited", stats.files_visited);
//! ```

mod filter;
mod progress;
mod visited;
mod walker;

pub use filter::{Decision, FilterPipeline};
pub use progress::WalkProgress;
pub use visited::VisitedFiles;
pub use walker::{DirectoryWalker, WalkOptions, WalkSink, WalkStats};

// Re-export core types for convenience
pub use fastsearch_core::{
    AccessRight, FileCandidate, MatchEvent, ModifiedRange, SearchCriteria, SearchError,
    SearchWarning, SizeRange, WarningKind,
};
