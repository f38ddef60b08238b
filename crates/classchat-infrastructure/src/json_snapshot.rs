//! JSON snapshot of a workbook.
//!
//! Stores every worksheet as a list of rows in a single JSON file.
//! Writes use the tmp file + fsync + atomic rename pattern and run on the
//! blocking pool.

use chrono::{DateTime, Utc};
use classchat_core::error::{ClassChatError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized form of a workbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookSnapshot {
    pub version: u32,
    pub saved_at: Option<DateTime<Utc>>,
    /// Worksheet title to rows.
    pub sheets: BTreeMap<String, Vec<Vec<String>>>,
}

impl WorkbookSnapshot {
    pub fn new(sheets: BTreeMap<String, Vec<Vec<String>>>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Some(Utc::now()),
            sheets,
        }
    }
}

/// Loads a snapshot. Returns `None` when the file does not exist yet.
pub async fn load_snapshot(path: &Path) -> Result<Option<WorkbookSnapshot>> {
    let path = path.to_path_buf();
    task::spawn_blocking(move || load_snapshot_sync(&path))
        .await
        .map_err(|e| ClassChatError::internal(format!("Snapshot load task failed: {e}")))?
}

/// Writes `snapshot` to `path`, creating parent directories as needed.
pub async fn save_snapshot(path: &Path, snapshot: WorkbookSnapshot) -> Result<()> {
    let path = path.to_path_buf();
    task::spawn_blocking(move || save_snapshot_sync(&path, &snapshot))
        .await
        .map_err(|e| ClassChatError::internal(format!("Snapshot save task failed: {e}")))?
}

fn load_snapshot_sync(path: &Path) -> Result<Option<WorkbookSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let snapshot: WorkbookSnapshot = serde_json::from_str(&content)?;
    if snapshot.version > SNAPSHOT_VERSION {
        return Err(ClassChatError::config(format!(
            "Workbook snapshot '{}' has unsupported version {}",
            path.display(),
            snapshot.version
        )));
    }
    tracing::debug!(path = %path.display(), sheets = snapshot.sheets.len(), "loaded workbook snapshot");
    Ok(Some(snapshot))
}

fn save_snapshot_sync(path: &Path, snapshot: &WorkbookSnapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(snapshot)?;

    let tmp_path = tmp_path_for(path);
    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(json.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path).map_err(|e| ClassChatError::Io {
        message: format!(
            "Failed to rename temp file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ),
    })?;
    tracing::debug!(path = %path.display(), "saved workbook snapshot");
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorkbookSnapshot {
        let mut sheets = BTreeMap::new();
        sheets.insert("summary".to_string(), vec![vec!["mina".to_string()]]);
        sheets.insert(
            "mina".to_string(),
            vec![vec!["09:00".into(), "USER".into(), "hi".into()]],
        );
        WorkbookSnapshot::new(sheets)
    }

    #[tokio::test]
    async fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_snapshot(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_creates_directories_and_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("workbook.json");
        let snapshot = sample();

        save_snapshot(&path, snapshot.clone()).await.unwrap();

        assert!(path.exists());
        assert!(!tmp_path_for(&path).exists());
        let loaded = load_snapshot(&path).await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbook.json");
        fs::write(&path, r#"{"version": 99, "saved_at": null, "sheets": {}}"#).unwrap();
        let err = load_snapshot(&path).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workbook.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load_snapshot(&path).await.unwrap_err();
        assert!(matches!(err, ClassChatError::Serialization { .. }));
    }
}
