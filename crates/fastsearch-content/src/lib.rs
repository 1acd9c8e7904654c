//! Concurrent content search for fastsearch.
//!
//! Files that pass every attribute filter but still need their contents
//! checked are pushed onto a [`WorkQueue`] and scanned line by line by a
//! [`ContentSearchPool`]. When the walk is over, a [`ShutdownCoordinator`]
//! drains the queue and stops the workers, escalating from an orderly stop
//! to a forced one, and finally abandoning workers that do not respond.
//!
//! [`Searcher`] ties the walker and the pool together:
//!
//! ```rust,no_run
//! use fastsearch_content::{MatchEvent, SearchCriteria, Searcher};
//!
//! let criteria = SearchCriteria::builder()
//!     .roots(vec!["/etc".into()])
//!     .name_suffixes(vec![".conf".to_string()])
//!     .content_words(vec!["listen".to_string()])
//!     .build()
//!     .unwrap();
//!
//! let (events, report) = Searcher::new(criteria).collect().unwrap();
//! for event in &events {
//!     if let MatchEvent::ContentMatch { path, line_number, line } = event {
//!         println!("{}:{}: {}", path.display(), line_number, line);
//!     }
//! }
//! println!("{} files scanned", report.content.files_scanned);
//! ```

mod config;
mod matcher;
mod pool;
mod queue;
mod search;
mod shutdown;

pub use config::{PoolConfig, PoolConfigBuilder, PoolConfigBuilderError};
pub use matcher::{ScanOutcome, WordMatcher};
pub use pool::{ContentSearchPool, ContentStats};
pub use queue::WorkQueue;
pub use search::{SearchReport, Searcher};
pub use shutdown::{ShutdownCoordinator, ShutdownOutcome, ShutdownState};

// Re-export the types callers need to build and consume a search
pub use fastsearch_core::{
    AccessRight, FileCandidate, MatchEvent, ModifiedRange, SearchCriteria, SearchError,
    SearchWarning, SizeRange, WarningKind,
};
pub use fastsearch_scan::{WalkOptions, WalkProgress, WalkStats};
