/// CSV export of a task outcome — one row per file touched or failed.
use crate::error::TidyError;
use crate::task::TaskOutcome;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReportRow {
    pub operation: &'static str,
    pub status: &'static str,
    pub path: String,
    pub destination: String,
    pub detail: String,
}

/// Flatten an outcome into report rows: successes first, then failures.
pub fn rows(outcome: &TaskOutcome) -> Vec<ReportRow> {
    let operation = outcome.name();
    let mut rows = Vec::new();

    match outcome {
        TaskOutcome::Classified(r) => {
            rows.extend(r.moves.iter().map(|m| ReportRow {
                operation,
                status: "moved",
                path: m.from.display().to_string(),
                destination: m.to.display().to_string(),
                detail: m.label.to_string(),
            }));
        }
        TaskOutcome::Swept(r) => {
            let status = if r.dry_run { "eligible" } else { "deleted" };
            rows.extend(r.removed.iter().map(|f| ReportRow {
                operation,
                status,
                path: f.path.display().to_string(),
                destination: String::new(),
                detail: format!("{} days old, {} bytes", f.age_days(), f.size),
            }));
        }
        TaskOutcome::Snapshotted(r) => {
            rows.extend(r.copied.iter().map(|c| ReportRow {
                operation,
                status: "copied",
                path: c.from.display().to_string(),
                destination: c.to.display().to_string(),
                detail: format!("{} bytes", c.size),
            }));
        }
    }

    rows.extend(outcome.failures().iter().map(|f| ReportRow {
        operation,
        status: "failed",
        path: f.path.display().to_string(),
        destination: String::new(),
        detail: format!("{}: {}", f.kind.label(), f.message),
    }));
    rows
}

/// Write the CSV report to any writer (header included).
pub fn write_csv<W: Write>(outcome: &TaskOutcome, writer: W) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows(outcome) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the CSV report to `path`, replacing any existing file.
pub fn export_csv(outcome: &TaskOutcome, path: &Path) -> Result<(), TidyError> {
    let file = std::fs::File::create(path).map_err(|e| TidyError::from_io(path, e))?;
    write_csv(outcome, file).map_err(|e| TidyError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    })
}
