/// Classifier — sort the top-level files of a directory into
/// extension-named subdirectories (`txt/a.txt`, `csv/report.csv`, ...).
///
/// Work happens in two steps:
/// 1. [`ClassificationPlan::build`] walks the directory once and assigns
///    every regular file a label and a bucket directory. Nothing on disk
///    changes, so the plan doubles as a preview.
/// 2. [`classify`] executes the plan file by file. Buckets are created on
///    demand, collisions are resolved per [`CollisionPolicy`], and per-file
///    failures are collected instead of aborting the run.
///
/// Buckets are directories, so a second run skips them and only picks up
/// files that arrived since; re-running is a no-op on an already sorted
/// directory.
use crate::error::{FailureKind, ItemFailure, TidyError};
use crate::model::DirectoryEntry;
use crate::task::progress::{TaskContext, TaskProgress};
use crate::walk;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default bucket for files whose name carries no extension.
pub const DEFAULT_EXTENSIONLESS_BUCKET: &str = "no_extension";

/// Upper bound on `_<n>` suffixes tried by [`CollisionPolicy::Rename`].
const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// What to do when the destination bucket already holds a file of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Leave the file where it is and record a conflict failure.
    #[default]
    Fail,
    /// Append `_1`, `_2`, ... before the extension until the name is free.
    Rename,
}

/// How files without an extension are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionlessPolicy {
    /// All extensionless files share one bucket with this name.
    SharedBucket(String),
    /// The whole file name becomes the label, giving one bucket per file.
    /// A file cannot be moved into a directory that has its own path, so
    /// under this policy such files always end up as conflicts.
    FileName,
}

impl Default for ExtensionlessPolicy {
    fn default() -> Self {
        Self::SharedBucket(DEFAULT_EXTENSIONLESS_BUCKET.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub collision: CollisionPolicy,
    pub extensionless: ExtensionlessPolicy,
    /// Fold labels to lowercase so `a.JPG` and `b.jpg` share a bucket.
    pub lowercase_labels: bool,
}

/// Derive the bucket label for one file.
pub fn label_for(entry: &DirectoryEntry, options: &ClassifyOptions) -> CompactString {
    let raw = match (entry.extension(), &options.extensionless) {
        (Some(ext), _) => ext,
        (None, ExtensionlessPolicy::SharedBucket(bucket)) => bucket.as_str(),
        (None, ExtensionlessPolicy::FileName) => entry.name.as_str(),
    };
    if options.lowercase_labels {
        CompactString::new(raw.to_lowercase())
    } else {
        CompactString::new(raw)
    }
}

/// One file and where it is meant to go.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    pub entry: DirectoryEntry,
    pub label: CompactString,
    /// Bucket directory, always `source/label`.
    pub bucket: PathBuf,
}

/// Label → bucket mapping plus the moves needed to realise it.
#[derive(Debug, Clone, Default)]
pub struct ClassificationPlan {
    pub source: PathBuf,
    pub buckets: BTreeMap<CompactString, PathBuf>,
    pub moves: Vec<PlannedMove>,
    /// Children that could not be inspected while planning.
    pub failures: Vec<ItemFailure>,
}

impl ClassificationPlan {
    /// Walk `source` and assign every regular file exactly one bucket.
    pub fn build(source: &Path, options: &ClassifyOptions) -> Result<Self, TidyError> {
        let mut plan = Self {
            source: source.to_path_buf(),
            ..Self::default()
        };

        for item in walk::top_level_files(source)? {
            match item {
                Ok(entry) => {
                    let label = label_for(&entry, options);
                    let bucket = source.join(label.as_str());
                    plan.buckets
                        .entry(label.clone())
                        .or_insert_with(|| bucket.clone());
                    plan.moves.push(PlannedMove {
                        entry,
                        label,
                        bucket,
                    });
                }
                Err(failure) => plan.failures.push(failure),
            }
        }

        debug!(
            "Planned {} move(s) into {} bucket(s) under {}",
            plan.moves.len(),
            plan.buckets.len(),
            source.display()
        );
        Ok(plan)
    }
}

/// A completed move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMove {
    pub from: PathBuf,
    pub to: PathBuf,
    pub label: CompactString,
}

#[derive(Debug, Clone, Default)]
pub struct ClassifyReport {
    pub source: PathBuf,
    pub moves: Vec<FileMove>,
    /// Buckets that did not exist before this run.
    pub buckets_created: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
    pub duration: Duration,
}

impl ClassifyReport {
    pub fn moved_count(&self) -> usize {
        self.moves.len()
    }
}

/// Move every regular top-level file of `source` into `source/<label>/`.
///
/// Fails outright only if `source` is missing or not a directory. Everything
/// after that is per-file and lands in [`ClassifyReport::failures`].
pub fn classify(
    source: &Path,
    options: &ClassifyOptions,
    ctx: &TaskContext,
) -> Result<ClassifyReport, TidyError> {
    let start = Instant::now();
    let plan = ClassificationPlan::build(source, options)?;
    info!(
        "Classifying {} file(s) in {}",
        plan.moves.len(),
        source.display()
    );
    ctx.report(TaskProgress::Started {
        operation: "classify",
        root: source.to_path_buf(),
    });

    let mut report = ClassifyReport {
        source: source.to_path_buf(),
        failures: plan.failures,
        ..ClassifyReport::default()
    };
    for failure in &report.failures {
        warn!("Skipping unreadable entry: {failure}");
    }

    for planned in plan.moves {
        if ctx.is_cancelled() {
            report.cancelled = true;
            break;
        }

        match ensure_bucket(&planned.bucket) {
            Ok(true) => {
                debug!("Created bucket {}", planned.bucket.display());
                report.buckets_created.push(planned.bucket.clone());
            }
            Ok(false) => {}
            Err(failure) => {
                // Report against the file that stayed behind, not the bucket.
                let failure = ItemFailure {
                    path: planned.entry.path.clone(),
                    ..failure
                };
                record_failure(&mut report.failures, ctx, failure);
                continue;
            }
        }

        let from = planned.entry.path.clone();
        let to = match free_target(&planned.bucket, planned.entry.file_name(), options.collision)
        {
            Ok(to) => to,
            Err(occupied) => {
                record_failure(
                    &mut report.failures,
                    ctx,
                    ItemFailure::conflict(&from, &occupied),
                );
                continue;
            }
        };

        match move_file(&from, &to) {
            Ok(()) => {
                debug!("Moved {} -> {}", from.display(), to.display());
                report.moves.push(FileMove {
                    from: from.clone(),
                    to,
                    label: planned.label,
                });
                ctx.report(TaskProgress::Item {
                    path: from,
                    processed: report.moves.len(),
                });
            }
            Err(err) => record_failure(&mut report.failures, ctx, ItemFailure::from_io(&from, &err)),
        }
    }

    report.duration = start.elapsed();
    if report.cancelled {
        info!("Classification cancelled after {} move(s)", report.moves.len());
        ctx.report(TaskProgress::Cancelled {
            processed: report.moves.len(),
        });
    } else {
        info!(
            "Classified {} file(s) into {} new bucket(s), {} failure(s) in {:?}",
            report.moves.len(),
            report.buckets_created.len(),
            report.failures.len(),
            report.duration
        );
        ctx.report(TaskProgress::Complete {
            duration: report.duration,
            processed: report.moves.len(),
            failed: report.failures.len(),
        });
    }
    Ok(report)
}

fn record_failure(failures: &mut Vec<ItemFailure>, ctx: &TaskContext, failure: ItemFailure) {
    warn!("{failure}");
    ctx.report(TaskProgress::Failed {
        path: failure.path.clone(),
        message: failure.message.clone(),
    });
    failures.push(failure);
}

/// Make sure `bucket` is a directory. Returns `true` if it was created now.
///
/// A bucket path occupied by a file or symlink is a conflict: the file being
/// classified is left in place.
fn ensure_bucket(bucket: &Path) -> Result<bool, ItemFailure> {
    match fs::symlink_metadata(bucket) {
        Ok(meta) if meta.is_dir() => Ok(false),
        Ok(_) => Err(ItemFailure::new(
            bucket,
            FailureKind::Conflict,
            format!("{} exists and is not a directory", bucket.display()),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => match fs::create_dir(bucket) {
            Ok(()) => Ok(true),
            // Lost a race with another creator; fine as long as it is a directory.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && bucket.is_dir() => Ok(false),
            Err(e) => Err(ItemFailure::from_io(bucket, &e)),
        },
        Err(err) => Err(ItemFailure::from_io(bucket, &err)),
    }
}

/// Pick the destination path inside `bucket`, or return the occupied path.
fn free_target(bucket: &Path, name: &OsStr, policy: CollisionPolicy) -> Result<PathBuf, PathBuf> {
    let direct = bucket.join(name);
    if !occupied(&direct) {
        return Ok(direct);
    }
    match policy {
        CollisionPolicy::Fail => Err(direct),
        CollisionPolicy::Rename => (1..=MAX_RENAME_ATTEMPTS)
            .map(|n| bucket.join(numbered_name(name, n)))
            .find(|candidate| !occupied(candidate))
            .ok_or(direct),
    }
}

fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// `report.csv` → `report_<n>.csv`, `README` → `README_<n>`, `.bashrc` → `.bashrc_<n>`.
fn numbered_name(name: &OsStr, n: u32) -> OsString {
    match name.to_str() {
        Some(s) => match s.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                OsString::from(format!("{stem}_{n}.{ext}"))
            }
            _ => OsString::from(format!("{s}_{n}")),
        },
        None => {
            let mut renamed = name.to_os_string();
            renamed.push(format!("_{n}"));
            renamed
        }
    }
}

/// Rename, falling back to copy + remove when the rename itself is refused
/// (e.g. the bucket is a mount point on another device).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    let rename_err = match fs::rename(from, to) {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    if !from.exists() {
        return Err(rename_err);
    }
    if let Err(e) = fs::copy(from, to) {
        debug!("Copy fallback failed for {}: {e}", from.display());
        discard_copy(from, to);
        return Err(rename_err);
    }
    if let Err(e) = fs::remove_file(from) {
        // Never leave the same file in two places.
        discard_copy(from, to);
        return Err(e);
    }
    Ok(())
}

/// Remove a half-finished fallback copy. If even that fails the file now
/// exists twice, which only the log can tell the operator.
fn discard_copy(from: &Path, to: &Path) {
    match fs::remove_file(to) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "{} is now duplicated at {}: cannot remove the copy: {e}",
            from.display(),
            to.display()
        ),
    }
}
