/// Snapshotter — copy the top-level files of a directory into a fresh
/// `backup_YYYY-MM-DD_HH-MM-SS` directory under a backup root.
///
/// The copy is shallow: subdirectories of the source are never entered.
/// An existing snapshot directory is never reused; two snapshots in the same
/// second make the second one fail with [`TidyError::Conflict`].
///
/// Population is not transactional. When enabled, a manifest file is written
/// as the very last step, so a snapshot directory without one was
/// interrupted, and a manifest with `status: partial` lists the files that
/// could not be copied.
use crate::error::{FailureKind, ItemFailure, TidyError};
use crate::task::progress::{TaskContext, TaskProgress};
use crate::walk;
use chrono::{DateTime, Local, NaiveDateTime};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// Prefix of every snapshot directory name.
pub const SNAPSHOT_PREFIX: &str = "backup_";

/// `chrono` format for the timestamp part of the label (second resolution).
pub const LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Completion marker written into each finished snapshot.
pub const MANIFEST_FILE_NAME: &str = ".tidysleuth-snapshot.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub write_manifest: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            write_manifest: true,
        }
    }
}

/// `backup_<timestamp>` for the given local time.
pub fn snapshot_label(timestamp: NaiveDateTime) -> String {
    format!("{SNAPSHOT_PREFIX}{}", timestamp.format(LABEL_FORMAT))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotStatus {
    Complete,
    Partial,
}

/// One file recorded in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub size: u64,
}

/// Failure entry as stored in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFailure {
    pub name: String,
    pub reason: String,
}

/// Description of one snapshot instance, persisted as [`MANIFEST_FILE_NAME`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub label: String,
    pub source: PathBuf,
    pub backup_root: PathBuf,
    pub created_at: DateTime<Local>,
    pub status: SnapshotStatus,
    pub files: Vec<ManifestFile>,
    pub failures: Vec<ManifestFailure>,
}

impl SnapshotManifest {
    /// Read the manifest of an existing snapshot directory.
    ///
    /// `Ok(None)` means the directory has no manifest, i.e. the snapshot was
    /// interrupted or taken with manifests disabled.
    pub fn load(snapshot_dir: &Path) -> Result<Option<Self>, TidyError> {
        let path = snapshot_dir.join(MANIFEST_FILE_NAME);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(TidyError::from_io(&path, e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| TidyError::Config(format!("{}: {e}", path.display())))
    }

    pub fn is_complete(&self) -> bool {
        self.status == SnapshotStatus::Complete
    }

    fn write(&self, snapshot_dir: &Path) -> Result<PathBuf, TidyError> {
        let path = snapshot_dir.join(MANIFEST_FILE_NAME);
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| TidyError::Config(format!("manifest encoding failed: {e}")))?;
        fs::write(&path, json).map_err(|e| TidyError::from_io(&path, e))?;
        Ok(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    pub from: PathBuf,
    pub to: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotReport {
    pub source: PathBuf,
    /// The `backup_<timestamp>` directory that was created.
    pub destination: PathBuf,
    pub label: String,
    pub copied: Vec<CopiedFile>,
    pub failures: Vec<ItemFailure>,
    /// Path of the manifest, if one was written.
    pub manifest: Option<PathBuf>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl SnapshotReport {
    pub fn bytes_copied(&self) -> u64 {
        self.copied.iter().map(|c| c.size).sum()
    }
}

/// Snapshot `source` into `backup_root` labelled with the current local time.
pub fn snapshot(
    source: &Path,
    backup_root: &Path,
    options: &SnapshotOptions,
    ctx: &TaskContext,
) -> Result<SnapshotReport, TidyError> {
    snapshot_at(source, backup_root, Local::now().naive_local(), options, ctx)
}

/// Snapshot `source` into `backup_root` with a label derived from `timestamp`.
pub fn snapshot_at(
    source: &Path,
    backup_root: &Path,
    timestamp: NaiveDateTime,
    options: &SnapshotOptions,
    ctx: &TaskContext,
) -> Result<SnapshotReport, TidyError> {
    let start = Instant::now();
    let files = walk::top_level_files(source)?;

    if backup_root.exists() && !backup_root.is_dir() {
        return Err(TidyError::NotADirectory(backup_root.to_path_buf()));
    }
    fs::create_dir_all(backup_root).map_err(|e| TidyError::from_io(backup_root, e))?;

    let label = snapshot_label(timestamp);
    let destination = backup_root.join(&label);
    // `create_dir` (not `_all`) so an existing snapshot is a hard error.
    fs::create_dir(&destination).map_err(|e| TidyError::from_io(&destination, e))?;
    info!(
        "Snapshotting {} into {}",
        source.display(),
        destination.display()
    );
    ctx.report(TaskProgress::Started {
        operation: "snapshot",
        root: source.to_path_buf(),
    });

    let mut report = SnapshotReport {
        source: source.to_path_buf(),
        destination: destination.clone(),
        label: label.clone(),
        ..SnapshotReport::default()
    };

    for item in files {
        if ctx.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let entry = match item {
            Ok(entry) => entry,
            Err(failure) => {
                record_failure(&mut report.failures, ctx, failure);
                continue;
            }
        };

        if options.write_manifest && entry.file_name() == MANIFEST_FILE_NAME {
            let occupied = destination.join(MANIFEST_FILE_NAME);
            record_failure(
                &mut report.failures,
                ctx,
                ItemFailure::conflict(&entry.path, &occupied),
            );
            continue;
        }

        let target = destination.join(entry.file_name());
        match fs::copy(&entry.path, &target) {
            Ok(size) => {
                preserve_mtime(entry.modified, &target);
                debug!("Copied {} ({size} bytes)", entry.path.display());
                report.copied.push(CopiedFile {
                    from: entry.path.clone(),
                    to: target,
                    size,
                });
                ctx.report(TaskProgress::Item {
                    path: entry.path,
                    processed: report.copied.len(),
                });
            }
            Err(err) => {
                record_failure(
                    &mut report.failures,
                    ctx,
                    ItemFailure::from_io(&entry.path, &err),
                );
            }
        }
    }

    // A cancelled snapshot gets no manifest: it must not look finished.
    if options.write_manifest && !report.cancelled {
        match build_manifest(&report, backup_root).write(&destination) {
            Ok(path) => report.manifest = Some(path),
            // Without a manifest the snapshot reads as interrupted, which is accurate.
            Err(e) => record_failure(
                &mut report.failures,
                ctx,
                ItemFailure::new(
                    destination.join(MANIFEST_FILE_NAME),
                    FailureKind::Io,
                    e.to_string(),
                ),
            ),
        }
    }

    report.duration = start.elapsed();
    if report.cancelled {
        info!(
            "Snapshot cancelled after {} file(s); {} left incomplete",
            report.copied.len(),
            destination.display()
        );
        ctx.report(TaskProgress::Cancelled {
            processed: report.copied.len(),
        });
    } else {
        info!(
            "Snapshot {} holds {} file(s), {} failure(s) in {:?}",
            label,
            report.copied.len(),
            report.failures.len(),
            report.duration
        );
        ctx.report(TaskProgress::Complete {
            duration: report.duration,
            processed: report.copied.len(),
            failed: report.failures.len(),
        });
    }
    Ok(report)
}

fn build_manifest(report: &SnapshotReport, backup_root: &Path) -> SnapshotManifest {
    let name_of = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    SnapshotManifest {
        label: report.label.clone(),
        source: report.source.clone(),
        backup_root: backup_root.to_path_buf(),
        created_at: Local::now(),
        status: if report.failures.is_empty() {
            SnapshotStatus::Complete
        } else {
            SnapshotStatus::Partial
        },
        files: report
            .copied
            .iter()
            .map(|c| ManifestFile {
                name: name_of(&c.to),
                size: c.size,
            })
            .collect(),
        failures: report
            .failures
            .iter()
            .map(|f| ManifestFailure {
                name: name_of(&f.path),
                reason: f.message.clone(),
            })
            .collect(),
    }
}

/// `fs::copy` keeps permissions but not timestamps; carry the mtime over.
fn preserve_mtime(modified: Option<SystemTime>, target: &Path) {
    if let Some(modified) = modified {
        if let Err(e) = filetime::set_file_mtime(target, FileTime::from_system_time(modified)) {
            debug!("Could not preserve mtime on {}: {e}", target.display());
        }
    }
}

fn record_failure(failures: &mut Vec<ItemFailure>, ctx: &TaskContext, failure: ItemFailure) {
    warn!("{failure}");
    ctx.report(TaskProgress::Failed {
        path: failure.path.clone(),
        message: failure.message.clone(),
    });
    failures.push(failure);
}
