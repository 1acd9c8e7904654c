//! Per-file metadata snapshots.

use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::criteria::AccessRight;

/// Metadata of one visited file, captured once and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCandidate {
    /// Canonical path of the file.
    pub path: PathBuf,
    /// File name (final path component).
    pub name: CompactString,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time in milliseconds since the Unix epoch.
    pub modified_millis: i64,
    /// Whether the file is readable.
    pub readable: bool,
    /// Whether the file is writable.
    pub writable: bool,
    /// Whether the file is executable.
    pub executable: bool,
}

impl FileCandidate {
    /// Create a candidate with explicit values and all access rights set.
    pub fn new(path: impl Into<PathBuf>, size: u64, modified_millis: i64) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            size,
            modified_millis,
            readable: true,
            writable: true,
            executable: true,
        }
    }

    /// Snapshot a file from its metadata.
    ///
    /// Access flags reflect what the current process may do with `path`,
    /// so `path` must name the file `metadata` was read from. Fails if the
    /// modification time is unavailable or cannot be represented.
    pub fn from_metadata(path: impl Into<PathBuf>, metadata: &Metadata) -> io::Result<Self> {
        let path = path.into();
        let modified = metadata.modified()?;
        let modified_millis = epoch_millis(modified).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("modification time of {} is out of range", path.display()),
            )
        })?;
        let (readable, writable, executable) = access_flags(&path, metadata);
        Ok(Self {
            name: file_name(&path),
            path,
            size: metadata.len(),
            modified_millis,
            readable,
            writable,
            executable,
        })
    }

    /// Override the access flags.
    pub fn with_access(mut self, readable: bool, writable: bool, executable: bool) -> Self {
        self.readable = readable;
        self.writable = writable;
        self.executable = executable;
        self
    }

    /// Check whether the file grants the given right.
    pub fn grants(&self, right: AccessRight) -> bool {
        match right {
            AccessRight::Readable => self.readable,
            AccessRight::Writable => self.writable,
            AccessRight::Executable => self.executable,
        }
    }
}

/// Convert a system time to milliseconds since the Unix epoch, or `None`
/// if it lies outside the representable range.
pub(crate) fn epoch_millis(time: SystemTime) -> Option<i64> {
    let (secs, nanos) = match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(after) => (i64::try_from(after.as_secs()).ok()?, after.subsec_nanos()),
        Err(err) => {
            let before = err.duration();
            let secs = -i64::try_from(before.as_secs()).ok()?;
            match before.subsec_nanos() {
                0 => (secs, 0),
                nanos => (secs.checked_sub(1)?, 1_000_000_000 - nanos),
            }
        }
    };
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|t| t.timestamp_millis())
}

fn file_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_default()
}

/// Ask the kernel which of (read, write, execute) the current process may
/// perform on `path`.
#[cfg(unix)]
fn access_flags(path: &Path, _metadata: &Metadata) -> (bool, bool, bool) {
    use nix::unistd::{AccessFlags, access};
    let allowed = |mode: AccessFlags| access(path, mode).is_ok();
    (
        allowed(AccessFlags::R_OK),
        allowed(AccessFlags::W_OK),
        allowed(AccessFlags::X_OK),
    )
}

#[cfg(not(unix))]
fn access_flags(_path: &Path, metadata: &Metadata) -> (bool, bool, bool) {
    (true, !metadata.permissions().readonly(), false)
}
