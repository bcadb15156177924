/// Command-line arguments and their translation into a [`TaskRequest`].
///
/// Flags given on the command line win over the config file, which wins
/// over the built-in defaults.
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tidysleuth_core::ops::{
    classify::DEFAULT_EXTENSIONLESS_BUCKET, ClassifyOptions, CollisionPolicy, ExtensionlessPolicy,
    RetentionThreshold,
};
use tidysleuth_core::{TaskRequest, TidyConfig};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "tidysleuth.json";

#[derive(Debug, Parser)]
#[command(
    name = "tidysleuth",
    version,
    about = "Sort files by extension, purge old files, and take timestamped snapshots"
)]
pub struct Cli {
    /// JSON config file (defaults to ./tidysleuth.json when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write a CSV report of every file touched or failed.
    #[arg(long, global = true)]
    pub report: Option<PathBuf>,

    /// Log every file, not just the summary.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move top-level files into subdirectories named after their extension.
    Classify {
        directory: PathBuf,

        /// What to do when the bucket already holds a file with the same name.
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictArg>,

        /// Where files without an extension go.
        #[arg(long, value_enum)]
        extensionless: Option<ExtensionlessArg>,

        /// Fold extension labels to lowercase.
        #[arg(long)]
        lowercase: bool,

        /// Print the plan without moving anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete top-level files last modified more than N days ago.
    Sweep {
        directory: PathBuf,

        /// Retention in days (config default otherwise).
        #[arg(long)]
        days: Option<u64>,

        /// List the files that would be deleted without deleting them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy top-level files into a new backup_<timestamp> directory.
    Snapshot {
        source: PathBuf,
        backup_root: PathBuf,

        /// Skip writing the completion manifest.
        #[arg(long)]
        no_manifest: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictArg {
    Fail,
    Rename,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtensionlessArg {
    /// One shared bucket for all extensionless files.
    Bucket,
    /// Use the full file name as the bucket.
    Filename,
}

impl Command {
    /// Classify options after applying flags over `config`.
    pub fn classify_options(&self, config: &TidyConfig) -> Option<ClassifyOptions> {
        let Command::Classify {
            on_conflict,
            extensionless,
            lowercase,
            ..
        } = self
        else {
            return None;
        };

        let mut options = config.classify_options();
        if let Some(arg) = on_conflict {
            options.collision = match arg {
                ConflictArg::Fail => CollisionPolicy::Fail,
                ConflictArg::Rename => CollisionPolicy::Rename,
            };
        }
        match extensionless {
            Some(ExtensionlessArg::Filename) => {
                options.extensionless = ExtensionlessPolicy::FileName;
            }
            // Keep a configured bucket name; only replace the file-name policy.
            Some(ExtensionlessArg::Bucket)
                if options.extensionless == ExtensionlessPolicy::FileName =>
            {
                options.extensionless =
                    ExtensionlessPolicy::SharedBucket(DEFAULT_EXTENSIONLESS_BUCKET.to_string());
            }
            _ => {}
        }
        options.lowercase_labels |= *lowercase;
        Some(options)
    }

    /// Build the request the core will run.
    pub fn to_request(&self, config: &TidyConfig) -> TaskRequest {
        match self {
            Command::Classify { directory, .. } => TaskRequest::Classify {
                directory: directory.clone(),
                options: self
                    .classify_options(config)
                    .unwrap_or_else(|| config.classify_options()),
            },
            Command::Sweep {
                directory,
                days,
                dry_run,
            } => {
                let mut options = config.sweep_options();
                options.dry_run |= *dry_run;
                TaskRequest::Sweep {
                    directory: directory.clone(),
                    threshold: days.map_or_else(|| config.retention(), RetentionThreshold::from_days),
                    options,
                }
            }
            Command::Snapshot {
                source,
                backup_root,
                no_manifest,
            } => {
                let mut options = config.snapshot_options();
                if *no_manifest {
                    options.write_manifest = false;
                }
                TaskRequest::Snapshot {
                    source: source.clone(),
                    backup_root: backup_root.clone(),
                    options,
                }
            }
        }
    }
}
