//! Settings for bucket and object operations
//!
//! Settings are an explicit value passed to every operation. They are
//! assembled from built-in defaults, an optional TOML file and finally
//! command-line / environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BucketSyncError, Result};

/// File name looked up under the user config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Region used when neither settings nor the environment provide one
pub const FALLBACK_REGION: &str = "us-east-1";

/// Configuration for bucketsync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Main bucket name
    pub primary_bucket: Option<String>,
    /// Backup bucket name (target of directory sync)
    pub backup_bucket: Option<String>,
    /// Region for the client and for new buckets
    pub region: Option<String>,
    /// Single file uploaded by `upload`
    pub local_file_path: Option<String>,
    /// Key override for `upload` (defaults to the file's base name)
    pub object_name: Option<String>,
    /// Directory mirrored by `sync`
    pub sync_dir: Option<String>,
    /// Custom endpoint (R2, MinIO, localstack)
    pub endpoint_url: Option<String>,
    /// Address buckets as path segments instead of subdomains
    pub force_path_style: bool,
    /// Per-operation timeout in seconds; SDK default when unset
    pub timeout_secs: Option<u64>,
    /// `head_bucket` calls issued while waiting for a new bucket to appear
    #[serde(default = "default_wait_attempts")]
    pub wait_attempts: u32,
    /// Delay between bucket checks in seconds
    #[serde(default = "default_wait_delay_secs")]
    pub wait_delay_secs: u64,
}

fn default_wait_attempts() -> u32 {
    20
}

fn default_wait_delay_secs() -> u64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            primary_bucket: None,
            backup_bucket: None,
            region: None,
            local_file_path: None,
            object_name: None,
            sync_dir: None,
            endpoint_url: None,
            force_path_style: false,
            timeout_secs: None,
            wait_attempts: default_wait_attempts(),
            wait_delay_secs: default_wait_delay_secs(),
        }
    }
}

/// Values supplied on the command line or through the environment.
/// `None` leaves the file/default value untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub primary_bucket: Option<String>,
    pub backup_bucket: Option<String>,
    pub region: Option<String>,
    pub local_file_path: Option<String>,
    pub object_name: Option<String>,
    pub sync_dir: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: Option<bool>,
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load settings from `path`, or from the default location when it exists.
    ///
    /// An explicit path that cannot be read is an error; a missing default
    /// file just yields built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => expand_path(&p.to_string_lossy()),
            None => match default_config_path() {
                Some(p) if p.is_file() => p,
                _ => return Ok(Self::default()),
            },
        };

        let text = std::fs::read_to_string(&path).map_err(|e| {
            BucketSyncError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Apply command-line / environment overrides on top of these settings
    pub fn apply(&mut self, overrides: SettingsOverrides) {
        fn set<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut self.primary_bucket, overrides.primary_bucket);
        set(&mut self.backup_bucket, overrides.backup_bucket);
        set(&mut self.region, overrides.region);
        set(&mut self.local_file_path, overrides.local_file_path);
        set(&mut self.object_name, overrides.object_name);
        set(&mut self.sync_dir, overrides.sync_dir);
        set(&mut self.endpoint_url, overrides.endpoint_url);
        set(&mut self.timeout_secs, overrides.timeout_secs);
        if let Some(force) = overrides.force_path_style {
            self.force_path_style = force;
        }
    }

    /// Reject values that can never work
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("primary_bucket", &self.primary_bucket),
            ("backup_bucket", &self.backup_bucket),
            ("region", &self.region),
        ] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(BucketSyncError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(BucketSyncError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn primary_bucket(&self) -> Result<&str> {
        required(&self.primary_bucket, "primary_bucket")
    }

    pub fn backup_bucket(&self) -> Result<&str> {
        required(&self.backup_bucket, "backup_bucket")
    }

    /// Directory mirrored by `sync`, tilde-expanded
    pub fn sync_dir(&self) -> Result<PathBuf> {
        required(&self.sync_dir, "sync_dir").map(expand_path)
    }

    /// File uploaded by `upload`, tilde-expanded
    pub fn local_file_path(&self) -> Result<PathBuf> {
        required(&self.local_file_path, "local_file_path").map(expand_path)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn wait_delay(&self) -> Duration {
        Duration::from_secs(self.wait_delay_secs)
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| BucketSyncError::Config(format!("{} is not set", name)))
}

/// `<config_dir>/bucketsync/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bucketsync").join(CONFIG_FILE_NAME))
}

/// Expand a leading `~` in a path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_toml() {
        let settings = Settings::from_toml_str(
            r#"
            primary_bucket = "docs-main"
            backup_bucket = "docs-backup"
            region = "eu-central-1"
            sync_dir = "/srv/daily"
            timeout_secs = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.primary_bucket().unwrap(), "docs-main");
        assert_eq!(settings.backup_bucket().unwrap(), "docs-backup");
        assert_eq!(settings.region.as_deref(), Some("eu-central-1"));
        assert_eq!(settings.sync_dir().unwrap(), PathBuf::from("/srv/daily"));
        assert_eq!(settings.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(settings.wait_attempts, 20);
        assert!(!settings.force_path_style);
    }

    #[test]
    fn test_unknown_field_types_rejected() {
        let err = Settings::from_toml_str("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, BucketSyncError::ConfigFile(_)));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings {
            primary_bucket: Some("from-file".into()),
            region: Some("eu-west-1".into()),
            ..Default::default()
        };
        settings.apply(SettingsOverrides {
            primary_bucket: Some("from-cli".into()),
            force_path_style: Some(true),
            ..Default::default()
        });

        assert_eq!(settings.primary_bucket.as_deref(), Some("from-cli"));
        assert_eq!(settings.region.as_deref(), Some("eu-west-1"));
        assert!(settings.force_path_style);
    }

    #[test]
    fn test_validate() {
        assert!(Settings::default().validate().is_ok());

        let blank = Settings {
            backup_bucket: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let zero = Settings {
            timeout_secs: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_missing_values_are_config_errors() {
        let settings = Settings::default();
        assert!(matches!(
            settings.primary_bucket(),
            Err(BucketSyncError::Config(_))
        ));
        assert!(settings.sync_dir().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backup_bucket = \"nightly\"").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.backup_bucket().unwrap(), "nightly");

        let missing = Settings::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(missing, Err(BucketSyncError::Config(_))));
    }

    #[test]
    fn test_expand_tilde() {
        assert!(expand_path("~/docs").ends_with("docs"));
        assert_eq!(expand_path("/abs/docs"), PathBuf::from("/abs/docs"));
    }
}
