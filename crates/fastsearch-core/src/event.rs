//! Match events produced by a search.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    /// A file satisfied every attribute constraint and no content words
    /// were requested.
    AttributeMatch {
        /// Canonical path of the file.
        path: PathBuf,
    },
    /// A line of a file contains at least one content word.
    ContentMatch {
        /// Canonical path of the file.
        path: PathBuf,
        /// 1-based line number.
        line_number: u64,
        /// The line, without its terminator.
        line: String,
    },
}

impl MatchEvent {
    /// Path of the matched file.
    pub fn path(&self) -> &Path {
        match self {
            Self::AttributeMatch { path } | Self::ContentMatch { path, .. } => path,
        }
    }

    /// Check if this is an attribute match.
    pub fn is_attribute_match(&self) -> bool {
        matches!(self, Self::AttributeMatch { .. })
    }

    /// Check if this is a content match.
    pub fn is_content_match(&self) -> bool {
        matches!(self, Self::ContentMatch { .. })
    }
}
