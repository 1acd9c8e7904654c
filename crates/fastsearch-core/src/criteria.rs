//! Search criteria types.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::error::SearchError;

/// An access right a file must grant to the current process.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum AccessRight {
    /// The file can be opened for reading.
    #[strum(to_string = "read", serialize = "readable")]
    Readable,
    /// The file can be opened for writing.
    #[strum(to_string = "write", serialize = "writable")]
    Writable,
    /// The file can be executed.
    #[strum(to_string = "execute", serialize = "executable")]
    Executable,
}

/// Inclusive file size range in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    /// Smallest accepted size.
    pub min: u64,
    /// Largest accepted size.
    pub max: u64,
}

impl SizeRange {
    /// Create a new size range.
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Check whether `size` lies within the range (both ends inclusive).
    pub fn contains(&self, size: u64) -> bool {
        size >= self.min && size <= self.max
    }
}

/// Inclusive last-modified range in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifiedRange {
    /// Earliest accepted modification time.
    pub min_millis: i64,
    /// Latest accepted modification time.
    pub max_millis: i64,
}

impl ModifiedRange {
    /// Create a new modification time range.
    pub fn new(min_millis: i64, max_millis: i64) -> Self {
        Self {
            min_millis,
            max_millis,
        }
    }

    /// Check whether `millis` lies within the range (both ends inclusive).
    pub fn contains(&self, millis: i64) -> bool {
        millis >= self.min_millis && millis <= self.max_millis
    }
}

/// What a search should match.
///
/// Every non-empty group is a constraint a file must satisfy. Name groups
/// pass when any one of their entries matches; the access group passes only
/// when every requested right holds. When `content_words` is non-empty, a
/// file that passes all attribute groups must additionally contain at least
/// one of the words on some line.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(
    setter(into),
    build_fn(private, name = "build_unchecked", error = "SearchError")
)]
pub struct SearchCriteria {
    /// Directories to search.
    pub roots: Vec<PathBuf>,

    /// File name must start with one of these.
    #[builder(default)]
    #[serde(default)]
    pub name_prefixes: Vec<String>,

    /// File name must end with one of these.
    #[builder(default)]
    #[serde(default)]
    pub name_suffixes: Vec<String>,

    /// File name must contain one of these.
    #[builder(default)]
    #[serde(default)]
    pub name_substrings: Vec<String>,

    /// Accepted file sizes.
    #[builder(default)]
    #[serde(default)]
    pub size_range: Option<SizeRange>,

    /// Accepted modification times.
    #[builder(default)]
    #[serde(default)]
    pub modified_range: Option<ModifiedRange>,

    /// Rights the file must grant.
    #[builder(default)]
    #[serde(default)]
    pub access: BTreeSet<AccessRight>,

    /// Literal, case-sensitive words searched for in file content.
    #[builder(default)]
    #[serde(default)]
    pub content_words: Vec<String>,
}

impl SearchCriteriaBuilder {
    /// Build and validate the criteria.
    pub fn build(&self) -> Result<SearchCriteria, SearchError> {
        let criteria = self.build_unchecked()?;
        criteria.validate()?;
        Ok(criteria)
    }
}

impl SearchCriteria {
    /// Create a new criteria builder.
    pub fn builder() -> SearchCriteriaBuilder {
        SearchCriteriaBuilder::default()
    }

    /// Check the structural invariants of the criteria.
    ///
    /// This does not touch the filesystem; see [`SearchCriteria::verify_roots`].
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.roots.is_empty() {
            return Err(SearchError::invalid_config("at least one root directory is required"));
        }
        if self.roots.iter().any(|r| r.as_os_str().is_empty()) {
            return Err(SearchError::invalid_config("root path cannot be empty"));
        }

        for (label, entries) in [
            ("name prefix", &self.name_prefixes),
            ("name suffix", &self.name_suffixes),
            ("name substring", &self.name_substrings),
            ("content word", &self.content_words),
        ] {
            if entries.iter().any(String::is_empty) {
                return Err(SearchError::invalid_config(format!("{label} cannot be empty")));
            }
        }

        if let Some(range) = self.size_range {
            if range.min > range.max {
                return Err(SearchError::invalid_config(format!(
                    "size range minimum {} exceeds maximum {}",
                    range.min, range.max
                )));
            }
        }

        if let Some(range) = self.modified_range {
            if range.min_millis <= 0 || range.max_millis <= 0 {
                return Err(SearchError::invalid_config(
                    "modified time range bounds must be after the Unix epoch",
                ));
            }
            if range.min_millis > range.max_millis {
                return Err(SearchError::invalid_config(format!(
                    "modified time range minimum {} exceeds maximum {}",
                    range.min_millis, range.max_millis
                )));
            }
        }

        if !self.has_constraints() {
            return Err(SearchError::invalid_config("no search condition given"));
        }

        Ok(())
    }

    /// Whether any of the seven constraint groups is configured.
    pub fn has_constraints(&self) -> bool {
        !self.name_prefixes.is_empty()
            || !self.name_suffixes.is_empty()
            || !self.name_substrings.is_empty()
            || self.size_range.is_some()
            || self.modified_range.is_some()
            || !self.access.is_empty()
            || !self.content_words.is_empty()
    }

    /// Whether matching files still need a content scan.
    pub fn needs_content_search(&self) -> bool {
        !self.content_words.is_empty()
    }

    /// Resolve every root to its canonical path, failing if a root is
    /// missing or is not a directory.
    pub fn verify_roots(&self) -> Result<Vec<PathBuf>, SearchError> {
        self.roots.iter().map(|root| verify_root(root)).collect()
    }
}

fn verify_root(root: &Path) -> Result<PathBuf, SearchError> {
    let canonical = root.canonicalize().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SearchError::RootNotFound {
            path: root.to_path_buf(),
        },
        _ => SearchError::io(root, e),
    })?;
    if !canonical.is_dir() {
        return Err(SearchError::NotADirectory { path: canonical });
    }
    Ok(canonical)
}
