/// The CLI frontend — load config, run one task, report the result.
///
/// The task runs on the core's background worker; this thread drains the
/// progress channel, logs what it sees, then prints a summary once the
/// worker has finished.
use crate::args::{Cli, Command, DEFAULT_CONFIG_FILE};
use crate::interrupt::{self, INTERRUPTED_EXIT_CODE};
use anyhow::Context;
use std::path::Path;
use std::process::ExitCode;
use tidysleuth_core::model::size::{format_bytes, plural};
use tidysleuth_core::ops::ClassificationPlan;
use tidysleuth_core::report::export_csv;
use tidysleuth_core::{start_task, TaskOutcome, TaskProgress, TidyConfig};
use tracing::{debug, info, warn};

/// How a completed run ended, mapped onto the process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// The task finished but some files failed.
    PartialFailure,
    /// The task stopped early after Ctrl-C.
    Cancelled,
}

impl RunStatus {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::PartialFailure => ExitCode::from(2),
            Self::Cancelled => ExitCode::from(INTERRUPTED_EXIT_CODE),
        }
    }
}

/// Run the command described by `cli`.
///
/// Precondition failures (missing directory, taken snapshot label, bad
/// config) come back as `Err`; per-file failures are printed and turn into
/// [`RunStatus::PartialFailure`].
pub fn run(cli: &Cli) -> anyhow::Result<RunStatus> {
    let config = load_config(cli.config.as_deref())?;

    if let Command::Classify {
        directory,
        dry_run: true,
        ..
    } = &cli.command
    {
        let options = cli
            .command
            .classify_options(&config)
            .unwrap_or_else(|| config.classify_options());
        let plan = ClassificationPlan::build(directory, &options)
            .with_context(|| format!("cannot plan classification of {}", directory.display()))?;
        print_plan(&plan);
        return Ok(RunStatus::Success);
    }

    let request = cli.command.to_request(&config);
    let root = request.root().to_path_buf();
    let handle = start_task(request)?;
    let _interrupt = interrupt::forward_to(handle.cancel_flag());

    for msg in handle.progress_rx.iter() {
        match msg {
            TaskProgress::Started { operation, root } => {
                info!("{operation}: {}", root.display());
            }
            TaskProgress::Item { path, processed } => {
                debug!("[{processed}] {}", path.display());
            }
            TaskProgress::Failed { path, message } => {
                warn!("{}: {message}", path.display());
            }
            TaskProgress::Complete { duration, .. } => {
                debug!("Finished in {duration:?}");
            }
            TaskProgress::Cancelled { processed } => {
                warn!("Cancelled after {processed} file(s)");
            }
        }
    }

    let outcome = handle
        .join()
        .with_context(|| format!("task on {} failed", root.display()))?;

    print_summary(&outcome);

    if let Some(report_path) = &cli.report {
        export_csv(&outcome, report_path)
            .with_context(|| format!("cannot write report {}", report_path.display()))?;
        info!("Report written to {}", report_path.display());
    }

    Ok(if outcome.cancelled() {
        RunStatus::Cancelled
    } else if outcome.failures().is_empty() {
        RunStatus::Success
    } else {
        RunStatus::PartialFailure
    })
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<TidyConfig> {
    let config = match explicit {
        Some(path) => TidyConfig::load(path),
        None => TidyConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
    };
    config.context("cannot load configuration")
}

fn print_plan(plan: &ClassificationPlan) {
    println!(
        "Would move {} into {} under {}",
        plural(plan.moves.len(), "file"),
        plural(plan.buckets.len(), "bucket"),
        plan.source.display()
    );
    for planned in &plan.moves {
        println!("  {} -> {}/", planned.entry.name, planned.label);
    }
    for failure in &plan.failures {
        println!("  ! {failure}");
    }
}

/// One-line summary plus the failure list.
pub fn summary_line(outcome: &TaskOutcome) -> String {
    match outcome {
        TaskOutcome::Classified(r) => format!(
            "Moved {} into {} ({} new)",
            plural(r.moved_count(), "file"),
            plural(
                r.moves
                    .iter()
                    .map(|m| m.label.as_str())
                    .collect::<std::collections::BTreeSet<_>>()
                    .len(),
                "bucket"
            ),
            r.buckets_created.len()
        ),
        TaskOutcome::Swept(r) => format!(
            "{} {} ({}), kept {}",
            if r.dry_run { "Would delete" } else { "Deleted" },
            plural(r.deleted_count(), "file"),
            format_bytes(r.bytes_reclaimed()),
            r.retained
        ),
        TaskOutcome::Snapshotted(r) => format!(
            "Copied {} ({}) into {}",
            plural(r.copied.len(), "file"),
            format_bytes(r.bytes_copied()),
            r.destination.display()
        ),
    }
}

fn print_summary(outcome: &TaskOutcome) {
    println!("{}", summary_line(outcome));
    if let TaskOutcome::Swept(r) = outcome {
        if r.dry_run {
            for f in &r.removed {
                println!("  {} ({} days)", f.path.display(), f.age_days());
            }
        }
    }
    let failures = outcome.failures();
    if !failures.is_empty() {
        println!("{} failed:", plural(failures.len(), "file"));
        for failure in failures {
            println!("  {failure}");
        }
    }
}
