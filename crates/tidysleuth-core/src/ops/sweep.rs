/// Retention sweeper — delete top-level files whose last modification is
/// older than a threshold.
///
/// Deletion is permanent (no trash). `SweepOptions::dry_run` walks the same
/// path and reports what would go without touching anything. Files that
/// cannot be removed are recorded and the sweep carries on; they are still
/// on disk, so the next sweep retries them.
use crate::error::{ItemFailure, TidyError};
use crate::task::progress::{TaskContext, TaskProgress};
use crate::walk;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Maximum age a file may reach before it becomes eligible for deletion.
///
/// Backed by `Duration`, so it can never be negative. Zero makes every file
/// with a past modification time eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RetentionThreshold(Duration);

impl RetentionThreshold {
    pub const fn new(max_age: Duration) -> Self {
        Self(max_age)
    }

    pub const fn from_days(days: u64) -> Self {
        Self(Duration::from_secs(days.saturating_mul(SECS_PER_DAY)))
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self(Duration::from_secs(hours.saturating_mul(SECS_PER_HOUR)))
    }

    pub fn max_age(self) -> Duration {
        self.0
    }

    /// Strictly older than the threshold. A file exactly at the limit survives.
    pub fn is_expired(self, age: Duration) -> bool {
        age > self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOptions {
    /// Report eligible files without deleting them.
    pub dry_run: bool,
}

/// A file removed by the sweep (or flagged, in a dry run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweptFile {
    pub path: PathBuf,
    pub size: u64,
    pub age: Duration,
}

impl SweptFile {
    pub fn age_days(&self) -> u64 {
        self.age.as_secs() / SECS_PER_DAY
    }
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub directory: PathBuf,
    pub threshold: Duration,
    /// Deleted files, or eligible files when `dry_run` is set.
    pub removed: Vec<SweptFile>,
    /// Files within the threshold.
    pub retained: usize,
    pub failures: Vec<ItemFailure>,
    pub dry_run: bool,
    pub cancelled: bool,
    pub duration: Duration,
}

impl SweepReport {
    pub fn deleted_count(&self) -> usize {
        self.removed.len()
    }

    pub fn bytes_reclaimed(&self) -> u64 {
        self.removed.iter().map(|f| f.size).sum()
    }
}

/// Sweep `directory` using the current wall-clock time as the reference.
pub fn sweep(
    directory: &Path,
    threshold: RetentionThreshold,
    options: &SweepOptions,
    ctx: &TaskContext,
) -> Result<SweepReport, TidyError> {
    sweep_at(directory, threshold, options, ctx, SystemTime::now())
}

/// Sweep `directory` measuring every file's age against `now`.
pub fn sweep_at(
    directory: &Path,
    threshold: RetentionThreshold,
    options: &SweepOptions,
    ctx: &TaskContext,
    now: SystemTime,
) -> Result<SweepReport, TidyError> {
    let start = Instant::now();
    let files = walk::top_level_files(directory)?;
    info!(
        "Sweeping {} for files older than {:?}{}",
        directory.display(),
        threshold.max_age(),
        if options.dry_run { " (dry run)" } else { "" }
    );
    ctx.report(TaskProgress::Started {
        operation: "sweep",
        root: directory.to_path_buf(),
    });

    let mut report = SweepReport {
        directory: directory.to_path_buf(),
        threshold: threshold.max_age(),
        dry_run: options.dry_run,
        ..SweepReport::default()
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

        let age = entry.age_at(now);
        if !threshold.is_expired(age) {
            report.retained += 1;
            continue;
        }

        if !options.dry_run {
            if let Err(err) = fs::remove_file(&entry.path) {
                record_failure(
                    &mut report.failures,
                    ctx,
                    ItemFailure::from_io(&entry.path, &err),
                );
                continue;
            }
        }

        debug!(
            "{} {} ({} days old)",
            if options.dry_run { "Eligible" } else { "Deleted" },
            entry.path.display(),
            age.as_secs() / SECS_PER_DAY
        );
        report.removed.push(SweptFile {
            path: entry.path.clone(),
            size: entry.size,
            age,
        });
        ctx.report(TaskProgress::Item {
            path: entry.path,
            processed: report.removed.len(),
        });
    }

    report.duration = start.elapsed();
    if report.cancelled {
        info!("Sweep cancelled after {} file(s)", report.removed.len());
        ctx.report(TaskProgress::Cancelled {
            processed: report.removed.len(),
        });
    } else {
        info!(
            "Sweep {} {} file(s), kept {}, {} failure(s) in {:?}",
            if report.dry_run { "flagged" } else { "deleted" },
            report.removed.len(),
            report.retained,
            report.failures.len(),
            report.duration
        );
        ctx.report(TaskProgress::Complete {
            duration: report.duration,
            processed: report.removed.len(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    /// Write a file whose mtime lies `age` before `now`.
    fn aged_file(dir: &Path, name: &str, now: SystemTime, age: Duration) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        filetime::set_file_mtime(&path, FileTime::from_system_time(now - age)).unwrap();
        path
    }

    fn days(n: u64) -> Duration {
        Duration::from_secs(n * SECS_PER_DAY)
    }

    #[test]
    fn threshold_is_strict() {
        let t = RetentionThreshold::from_days(5);
        assert!(!t.is_expired(days(5)));
        assert!(t.is_expired(days(5) + Duration::from_secs(1)));
        assert!(!t.is_expired(days(1)));
    }

    #[test]
    fn zero_threshold_expires_any_positive_age() {
        let t = RetentionThreshold::from_days(0);
        assert!(t.is_expired(Duration::from_secs(1)));
        assert!(!t.is_expired(Duration::ZERO));
    }

    #[test]
    fn hours_and_days_agree() {
        assert_eq!(
            RetentionThreshold::from_hours(48),
            RetentionThreshold::from_days(2)
        );
    }

    #[test]
    fn old_file_is_deleted_new_file_survives() {
        let tmp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let old = aged_file(tmp.path(), "old.log", now, days(10));
        let fresh = aged_file(tmp.path(), "fresh.log", now, days(1));

        let report = sweep_at(
            tmp.path(),
            RetentionThreshold::from_days(5),
            &SweepOptions::default(),
            &TaskContext::default(),
            now,
        )
        .unwrap();

        assert_eq!(report.deleted_count(), 1);
        assert_eq!(report.retained, 1);
        assert!(!old.exists());
        assert!(fresh.exists());
        assert_eq!(report.removed[0].age_days(), 10);
    }

    #[test]
    fn dry_run_reports_without_deleting() {
        let tmp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let old = aged_file(tmp.path(), "old.log", now, days(10));

        let report = sweep_at(
            tmp.path(),
            RetentionThreshold::from_days(5),
            &SweepOptions { dry_run: true },
            &TaskContext::default(),
            now,
        )
        .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.deleted_count(), 1);
        assert!(old.exists(), "dry run must not delete");
        assert_eq!(report.bytes_reclaimed(), "old.log".len() as u64);
    }

    #[test]
    fn subdirectories_are_never_swept() {
        let tmp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let sub = tmp.path().join("archive");
        fs::create_dir(&sub).unwrap();
        aged_file(&sub, "nested.log", now, days(100));

        let report = sweep_at(
            tmp.path(),
            RetentionThreshold::from_days(0),
            &SweepOptions::default(),
            &TaskContext::default(),
            now,
        )
        .unwrap();

        assert_eq!(report.deleted_count(), 0);
        assert!(sub.join("nested.log").exists());
    }

    #[test]
    fn future_mtime_is_kept() {
        let tmp = TempDir::new().unwrap();
        let now = SystemTime::now();
        let path = tmp.path().join("future.txt");
        fs::write(&path, "x").unwrap();
        filetime::set_file_mtime(&path, FileTime::from_system_time(now + days(1))).unwrap();

        let report = sweep_at(
            tmp.path(),
            RetentionThreshold::from_days(0),
            &SweepOptions::default(),
            &TaskContext::default(),
            now,
        )
        .unwrap();
        assert_eq!(report.deleted_count(), 0);
        assert!(path.exists());
    }

    #[test]
    fn not_a_directory_aborts() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, "x").unwrap();
        let err = sweep(
            &file,
            RetentionThreshold::from_days(1),
            &SweepOptions::default(),
            &TaskContext::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TidyError::NotADirectory(_)));
    }
}
