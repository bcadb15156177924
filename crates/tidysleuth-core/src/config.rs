/// User configuration — defaults for each operation, loaded from a JSON file.
///
/// Every field has a default, so an empty object (or no file at all) is a
/// valid configuration. Frontends apply their own overrides on top.
///
/// ```json
/// {
///   "classify": { "collision": "rename", "extensionless": "file_name" },
///   "sweep": { "retention_days": 30, "dry_run": true },
///   "snapshot": { "write_manifest": true }
/// }
/// ```
use crate::error::TidyError;
use crate::ops::{
    ClassifyOptions, CollisionPolicy, ExtensionlessPolicy, RetentionThreshold, SnapshotOptions,
    SweepOptions,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Retention used when neither the config nor the caller names one.
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidyConfig {
    pub classify: ClassifyConfig,
    pub sweep: SweepConfig,
    pub snapshot: SnapshotConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub collision: CollisionPolicy,
    pub extensionless: ExtensionlessPolicy,
    pub lowercase_labels: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub retention_days: u64,
    pub dry_run: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub write_manifest: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            write_manifest: true,
        }
    }
}

impl TidyConfig {
    /// Parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, TidyError> {
        let data = fs::read_to_string(path).map_err(|e| TidyError::from_io(path, e))?;
        let config = Self::from_json(&data)
            .map_err(|e| TidyError::Config(format!("{}: {e}", path.display())))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, TidyError> {
        match fs::metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            _ => Self::load(path),
        }
    }

    pub fn from_json(data: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(data).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Bucket names become directory names; reject anything that would
    /// escape the source directory or collapse onto it.
    fn validate(&self) -> Result<(), String> {
        if let ExtensionlessPolicy::SharedBucket(name) = &self.classify.extensionless {
            let bad = name.is_empty()
                || name == "."
                || name == ".."
                || name.contains(['/', '\\']);
            if bad {
                return Err(format!("invalid extensionless bucket name {name:?}"));
            }
        }
        Ok(())
    }

    pub fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            collision: self.classify.collision,
            extensionless: self.classify.extensionless.clone(),
            lowercase_labels: self.classify.lowercase_labels,
        }
    }

    pub fn retention(&self) -> RetentionThreshold {
        RetentionThreshold::from_days(self.sweep.retention_days)
    }

    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            dry_run: self.sweep.dry_run,
        }
    }

    pub fn snapshot_options(&self) -> SnapshotOptions {
        SnapshotOptions {
            write_manifest: self.snapshot.write_manifest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_object_gives_defaults() {
        let config = TidyConfig::from_json("{}").unwrap();
        assert_eq!(config, TidyConfig::default());
        assert_eq!(config.sweep.retention_days, DEFAULT_RETENTION_DAYS);
        assert!(config.snapshot.write_manifest);
        assert_eq!(config.classify.collision, CollisionPolicy::Fail);
    }

    #[test]
    fn parses_all_sections() {
        let config = TidyConfig::from_json(
            r#"{
                "classify": { "collision": "rename", "extensionless": "file_name", "lowercase_labels": true },
                "sweep": { "retention_days": 30, "dry_run": true },
                "snapshot": { "write_manifest": false }
            }"#,
        )
        .unwrap();
        let classify = config.classify_options();
        assert_eq!(classify.collision, CollisionPolicy::Rename);
        assert_eq!(classify.extensionless, ExtensionlessPolicy::FileName);
        assert!(classify.lowercase_labels);
        assert_eq!(config.retention(), RetentionThreshold::from_days(30));
        assert!(config.sweep_options().dry_run);
        assert!(!config.snapshot_options().write_manifest);
    }

    #[test]
    fn custom_shared_bucket() {
        let config =
            TidyConfig::from_json(r#"{ "classify": { "extensionless": { "shared_bucket": "misc" } } }"#)
                .unwrap();
        assert_eq!(
            config.classify.extensionless,
            ExtensionlessPolicy::SharedBucket("misc".into())
        );
    }

    #[test]
    fn rejects_bucket_that_escapes_source() {
        for name in ["", ".", "..", "a/b"] {
            let json = format!(r#"{{ "classify": {{ "extensionless": {{ "shared_bucket": "{name}" }} }} }}"#);
            assert!(TidyConfig::from_json(&json).is_err(), "{name:?} must be rejected");
        }
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = TidyConfig::load_or_default(&tmp.path().join("tidysleuth.json")).unwrap();
        assert_eq!(config, TidyConfig::default());
    }

    #[test]
    fn malformed_file_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tidysleuth.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(TidyConfig::load(&path), Err(TidyError::Config(_))));
    }
}
