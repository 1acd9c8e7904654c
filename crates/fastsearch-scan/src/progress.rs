//! Walk progress reporting.

use std::path::PathBuf;
use std::time::Duration;

/// Progress information during a walk.
#[derive(Debug, Clone, Default)]
pub struct WalkProgress {
    /// Number of files visited so far.
    pub files_visited: u64,
    /// Number of directories visited so far.
    pub dirs_visited: u64,
    /// Files reported as attribute matches so far.
    pub accepted: u64,
    /// Files handed to the content search so far.
    pub deferred: u64,
    /// Root currently being walked.
    pub current_root: PathBuf,
    /// Path most recently visited.
    pub current_path: PathBuf,
    /// Number of warnings encountered.
    pub warnings_count: u64,
    /// Time elapsed since the walk started.
    pub elapsed: Duration,
}

impl WalkProgress {
    /// Calculate walk rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_visited as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Total entries visited (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_visited + self.dirs_visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_zero_elapsed() {
        let progress = WalkProgress {
            files_visited: 10,
            ..Default::default()
        };
        assert_eq!(progress.files_per_second(), 0.0);
    }

    #[test]
    fn test_totals() {
        let progress = WalkProgress {
            files_visited: 10,
            dirs_visited: 3,
            elapsed: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(progress.total_items(), 13);
        assert_eq!(progress.files_per_second(), 5.0);
    }
}
