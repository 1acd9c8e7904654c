//! Core types for fastsearch.
//!
//! This crate provides the data structures shared by the walker, the
//! content search pool and the command-line front end: the validated
//! [`SearchCriteria`], per-file [`FileCandidate`] snapshots, the
//! [`MatchEvent`]s a search produces, and the error and warning types.

mod candidate;
mod criteria;
mod error;
mod event;

pub use candidate::FileCandidate;
pub use criteria::{AccessRight, ModifiedRange, SearchCriteria, SearchCriteriaBuilder, SizeRange};
pub use error::{SearchError, SearchWarning, WarningKind};
pub use event::MatchEvent;
