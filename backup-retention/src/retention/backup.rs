//! Backup records as returned by a remote storage listing.

use crate::utils::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Seconds from the Unix epoch back to `0001-01-01T00:00:00Z`.
const PENDING_UPLOAD_TIMESTAMP: i64 = -62_135_596_800;

/// Upload date carried by a backup whose upload has not been committed yet.
///
/// Listings written while a multi-shard upload is still running report the
/// zero timestamp `0001-01-01T00:00:00Z` instead of a real completion time.
pub fn pending_upload_date() -> DateTime<Utc> {
    DateTime::from_timestamp(PENDING_UPLOAD_TIMESTAMP, 0).unwrap_or_default()
}

/// One backup snapshot stored in the remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backup {
    pub backup_name: String,

    /// Completion time; [`pending_upload_date`] while the upload is in flight.
    #[serde(default = "pending_upload_date")]
    pub upload_date: DateTime<Utc>,

    /// Name of the backup this one is an increment on top of.
    #[serde(
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub required_backup: Option<String>,

    /// Archive format token the backup was packaged with (`tar`, `zstd`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_format: Option<String>,

    #[serde(default)]
    pub data_size: u64,

    #[serde(default)]
    pub compressed_size: u64,
}

impl Backup {
    /// Create a full backup record.
    pub fn new(backup_name: impl Into<String>, upload_date: DateTime<Utc>) -> Self {
        Self {
            backup_name: backup_name.into(),
            upload_date,
            required_backup: None,
            data_format: None,
            data_size: 0,
            compressed_size: 0,
        }
    }

    /// Mark this backup as an increment on top of `required`.
    pub fn with_required(mut self, required: impl Into<String>) -> Self {
        let required = required.into();
        self.required_backup = if required.is_empty() { None } else { Some(required) };
        self
    }

    pub fn is_incremental(&self) -> bool {
        self.required_backup.is_some()
    }

    /// True while the upload date has not been committed.
    pub fn is_upload_pending(&self) -> bool {
        self.upload_date == pending_upload_date()
    }
}

/// Load a JSON array of backups written by the remote storage listing.
pub fn read_listing(path: &Path) -> Result<Vec<Backup>> {
    let content = std::fs::read_to_string(path)?;
    let backups: Vec<Backup> = serde_json::from_str(&content)?;
    Ok(backups)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::RetentionToolError;
    use chrono::TimeZone;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_pending_upload_date_is_year_one() {
        let expected = Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(pending_upload_date(), expected);
    }

    #[test]
    fn test_deserialize_listing_entry() {
        let json = r#"{
            "backup_name": "shard1-2024-03-02",
            "upload_date": "2024-03-02T10:00:00Z",
            "required_backup": "shard1-2024-03-01",
            "data_format": "zstd",
            "data_size": 4096,
            "compressed_size": 1024
        }"#;

        let backup: Backup = serde_json::from_str(json).unwrap();
        assert_eq!(backup.backup_name, "shard1-2024-03-02");
        assert_eq!(backup.required_backup.as_deref(), Some("shard1-2024-03-01"));
        assert_eq!(backup.data_format.as_deref(), Some("zstd"));
        assert!(backup.is_incremental());
        assert!(!backup.is_upload_pending());
    }

    #[test]
    fn test_empty_required_backup_is_full_backup() {
        let json = r#"{"backup_name": "full", "upload_date": "2024-03-02T10:00:00Z", "required_backup": ""}"#;
        let backup: Backup = serde_json::from_str(json).unwrap();
        assert_eq!(backup.required_backup, None);
        assert!(!backup.is_incremental());
    }

    #[test]
    fn test_missing_upload_date_is_pending() {
        let backup: Backup = serde_json::from_str(r#"{"backup_name": "uploading"}"#).unwrap();
        assert!(backup.is_upload_pending());
    }

    #[test]
    fn test_zero_time_upload_date_is_pending() {
        let json = r#"{"backup_name": "uploading", "upload_date": "0001-01-01T00:00:00Z"}"#;
        let backup: Backup = serde_json::from_str(json).unwrap();
        assert!(backup.is_upload_pending());
    }

    #[test]
    fn test_with_required_ignores_empty_name() {
        let backup = Backup::new("b", Utc::now()).with_required("");
        assert!(!backup.is_incremental());
    }

    #[test]
    fn test_read_listing() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"[
                {{"backup_name": "full", "upload_date": "2024-03-01T00:00:00Z"}},
                {{"backup_name": "inc", "upload_date": "2024-03-02T00:00:00Z", "required_backup": "full"}}
            ]"#
        )?;
        file.flush()?;

        let backups = read_listing(file.path())?;
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[1].required_backup.as_deref(), Some("full"));
        Ok(())
    }

    #[test]
    fn test_read_listing_rejects_malformed_json() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, r#"[{{"upload_date": "2024-03-01T00:00:00Z"}}]"#)?;
        file.flush()?;

        let err = read_listing(file.path()).unwrap_err();
        assert!(matches!(err, RetentionToolError::Serialization(_)));
        Ok(())
    }
}
