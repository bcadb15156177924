/// A single direct child of a directory, as seen by the maintenance operations.
///
/// Only regular files (or links resolving to one) are ever turned into a
/// `DirectoryEntry`. For a link, `path` is the link itself while size and
/// modification time describe the target.
use compact_str::CompactString;
use std::fs::Metadata;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    /// Full path of the file.
    pub path: PathBuf,
    /// File name only, lossily decoded for labels and logging.
    /// The on-disk name is always taken from `path`.
    pub name: CompactString,
    /// Logical size in bytes.
    pub size: u64,
    /// Last modification time. `None` when the platform cannot report it.
    pub modified: Option<SystemTime>,
}

impl DirectoryEntry {
    pub fn from_metadata(path: PathBuf, meta: &Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_default();
        Self {
            path,
            name,
            size: meta.len(),
            modified: meta.modified().ok(),
        }
    }

    /// Characters after the last `.` of the file name.
    ///
    /// `None` when the name has no dot or ends with one (`"notes."`).
    /// A leading dot counts like any other, so `.bashrc` yields `bashrc`.
    pub fn extension(&self) -> Option<&str> {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Age relative to `now`. Timestamps in the future count as age zero,
    /// and a missing timestamp is treated the same way so the file is never
    /// considered stale on a guess.
    pub fn age_at(&self, now: SystemTime) -> Duration {
        self.modified
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or(Duration::ZERO)
    }

    /// The on-disk file name, falling back to the lossy name.
    pub fn file_name(&self) -> &std::ffi::OsStr {
        self.path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new(self.name.as_str()))
    }
}
