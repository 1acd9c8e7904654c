//! Tracking of already-visited files.

use std::path::{Path, PathBuf};

use dashmap::DashSet;

/// Tracks canonical paths of files already visited.
///
/// Following symbolic links can reach the same file through several paths
/// (two links to one directory, or a link to a file next to the file
/// itself). Each canonical path is only reported the first time it is seen.
#[derive(Debug, Default)]
pub struct VisitedFiles {
    seen: DashSet<PathBuf>,
}

impl VisitedFiles {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            seen: DashSet::new(),
        }
    }

    /// Mark a path as visited. Returns `true` the first time a path is seen.
    pub fn insert(&self, canonical: &Path) -> bool {
        if self.seen.contains(canonical) {
            return false;
        }
        self.seen.insert(canonical.to_path_buf())
    }

    /// Check if a path has been visited (without marking it).
    pub fn contains(&self, canonical: &Path) -> bool {
        self.seen.contains(canonical)
    }

    /// Number of distinct files visited.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing has been visited.
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_once() {
        let visited = VisitedFiles::new();
        let path = Path::new("/data/a.txt");

        assert!(visited.insert(path));
        assert!(!visited.insert(path));
        assert!(visited.contains(path));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_distinct_paths() {
        let visited = VisitedFiles::new();

        assert!(visited.is_empty());
        assert!(visited.insert(Path::new("/data/a.txt")));
        assert!(visited.insert(Path::new("/data/b.txt")));
        assert_eq!(visited.len(), 2);
    }
}
