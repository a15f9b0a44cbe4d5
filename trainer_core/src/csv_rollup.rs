//! CSV rollup functionality for archiving WAL sessions.
//!
//! This module implements atomic WAL-to-CSV conversion with proper error handling
//! to prevent data loss.

use crate::{Result, TrainingSession};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    id: String,
    module_id: String,
    started_at: String,
    completed_at: Option<String>,
    progress: f64,
}

impl From<&TrainingSession> for CsvRow {
    fn from(session: &TrainingSession) -> Self {
        CsvRow {
            id: session.id.to_string(),
            module_id: session.module_id.clone(),
            started_at: session.started_at.to_rfc3339(),
            completed_at: session.completed_at.map(|t| t.to_rfc3339()),
            progress: session.progress_fraction,
        }
    }
}

/// Roll up WAL sessions into CSV and archive the WAL atomically
///
/// This function:
/// 1. Reads all sessions from the WAL
/// 2. Appends them to the CSV file (creates with headers if needed)
/// 3. Syncs the CSV to disk
/// 4. Renames the WAL to .processed
/// 5. Returns the number of sessions processed
///
/// The WAL is renamed rather than deleted so it can be recovered by hand.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let sessions = crate::wal::read_sessions(wal_path)?;

    if sessions.is_empty() {
        tracing::info!("No sessions in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let write_headers = !csv_path.exists() || std::fs::metadata(csv_path)?.len() == 0;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_headers)
            .from_writer(&file);

        for session in &sessions {
            writer.serialize(CsvRow::from(session))?;
        }
        writer.flush()?;
    }

    file.sync_all()?;

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!(
        "Rolled up {} sessions to {:?}, archived WAL to {:?}",
        sessions.len(),
        csv_path,
        processed_path
    );

    Ok(sessions.len())
}

/// Remove archived `.wal.processed` files from a directory
///
/// Returns the number of files removed.
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    let mut count = 0;

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_processed = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".wal.processed"));

        if is_processed {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL {:?}", path);
            count += 1;
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::SessionSink;
    use chrono::{Duration, Utc};
    use std::fs::File;

    fn create_test_session(module_id: &str) -> TrainingSession {
        let start = Utc::now() - Duration::hours(1);
        TrainingSession {
            completed_at: Some(start + Duration::minutes(40)),
            progress_fraction: 1.0,
            ..TrainingSession::start(module_id, start)
        }
    }

    #[test]
    fn test_wal_to_csv_creates_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        for i in 0..3 {
            sink.append(&create_test_session(&format!("module-{}", i))).unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("wal.processed").exists());
    }

    #[test]
    fn test_wal_to_csv_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_session("icd11-basics")).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_session("code-mapping")).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        // One header row, two records
        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        File::create(&wal_path).unwrap();

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("s1.wal.processed")).unwrap();
        File::create(temp_dir.path().join("s2.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        let count = cleanup_processed_wals(temp_dir.path()).unwrap();
        assert_eq!(count, 2);

        assert!(!temp_dir.path().join("s1.wal.processed").exists());
        assert!(!temp_dir.path().join("s2.wal.processed").exists());
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
