/// Error types shared by every TidySleuth operation.
///
/// Two layers:
/// - [`TidyError`] — aborts a whole operation (bad root path, snapshot label
///   already taken, unreadable config).
/// - [`ItemFailure`] — one file in a batch could not be processed. These are
///   collected in the operation's report and never abort the batch.
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TidyError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("destination already exists: {}", .0.display())]
    Conflict(PathBuf),

    #[error("permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("{operation} finished with {} failure(s) ({succeeded} succeeded)", .failures.len())]
    PartialFailure {
        operation: &'static str,
        succeeded: usize,
        failures: Vec<ItemFailure>,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task worker failed: {0}")]
    Worker(String),
}

impl TidyError {
    /// Map an `io::Error` raised while touching `path` onto the matching kind.
    ///
    /// Missing, unreadable and already-occupied paths get their own variants;
    /// everything else is wrapped as [`TidyError::Io`].
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::AlreadyExists => Self::Conflict(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// Why a single item in a batch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file disappeared between enumeration and action.
    NotFound,
    /// The destination slot is already occupied.
    Conflict,
    PermissionDenied,
    /// Any other I/O error.
    Io,
}

impl FailureKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::NotFound => "not found",
            Self::Conflict => "conflict",
            Self::PermissionDenied => "permission denied",
            Self::Io => "i/o error",
        }
    }

    fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::AlreadyExists => Self::Conflict,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io,
        }
    }
}

/// A per-item failure recorded during a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub kind: FailureKind,
    pub message: String,
}

impl ItemFailure {
    pub fn new(path: impl Into<PathBuf>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_io(path: impl Into<PathBuf>, err: &io::Error) -> Self {
        Self::new(path, FailureKind::from_io_kind(err.kind()), err.to_string())
    }

    pub fn conflict(path: impl Into<PathBuf>, occupied: &Path) -> Self {
        Self::new(
            path,
            FailureKind::Conflict,
            format!("{} already exists", occupied.display()),
        )
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.path.display(),
            self.kind.label(),
            self.message
        )
    }
}
