//! Write-Ahead Log (WAL) for closed training sessions.
//!
//! Sessions are appended to a JSONL (JSON Lines) file with file locking
//! to ensure safe concurrent access.

use crate::{Result, TrainingSession};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Session sink trait for persisting sessions
pub trait SessionSink {
    fn append(&mut self, session: &TrainingSession) -> Result<()>;
}

/// JSONL-based session sink with file locking
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    /// Create a new JSONL sink for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl SessionSink for JsonlSink {
    fn append(&mut self, session: &TrainingSession) -> Result<()> {
        self.ensure_parent_dir()?;

        // Open file for appending
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Acquire exclusive lock
        file.lock_exclusive()?;

        // Write session as JSON line
        let mut writer = std::io::BufWriter::new(&file);
        let line = serde_json::to_string(session)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        file.unlock()?;

        tracing::debug!("Appended session {} ({}) to WAL", session.id, session.module_id);
        Ok(())
    }
}

/// Read all sessions from a WAL file
///
/// Lines that fail to parse, or that hold a session breaking the history
/// invariants, are skipped with a warning.
pub fn read_sessions(path: &Path) -> Result<Vec<TrainingSession>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;

    // Acquire shared lock for reading
    file.lock_shared()?;

    let reader = BufReader::new(&file);
    let mut sessions = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<TrainingSession>(&line) {
            Ok(session) => match session.validate() {
                Ok(()) => sessions.push(session),
                Err(e) => {
                    tracing::warn!("Skipping session at line {}: {}", line_num + 1, e);
                }
            },
            Err(e) => {
                // Continue reading, don't fail completely
                tracing::warn!("Failed to parse session at line {}: {}", line_num + 1, e);
            }
        }
    }

    file.unlock()?;
    tracing::debug!("Read {} sessions from WAL", sessions.len());
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn create_test_session() -> TrainingSession {
        let start = Utc::now() - Duration::minutes(30);
        TrainingSession {
            completed_at: Some(start + Duration::minutes(25)),
            progress_fraction: 1.0,
            ..TrainingSession::start("icd11-basics", start)
        }
    }

    #[test]
    fn test_append_and_read_single_session() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let session = create_test_session();

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&session).unwrap();

        let sessions = read_sessions(&wal_path).unwrap();
        assert_eq!(sessions, vec![session]);
    }

    #[test]
    fn test_append_creates_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("wal").join("nested.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_session()).unwrap();
        assert!(wal_path.exists());
    }

    #[test]
    fn test_append_multiple_sessions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        for _ in 0..5 {
            sink.append(&create_test_session()).unwrap();
        }

        let sessions = read_sessions(&wal_path).unwrap();
        assert_eq!(sessions.len(), 5);
    }

    #[test]
    fn test_read_nonexistent_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let sessions = read_sessions(&temp_dir.path().join("missing.wal")).unwrap();
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_corrupt_lines_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let mut sink = JsonlSink::new(&wal_path);
        sink.append(&create_test_session()).unwrap();

        let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
        writeln!(file, "{{ not json").unwrap();
        writeln!(file).unwrap();
        drop(file);

        sink.append(&create_test_session()).unwrap();

        let sessions = read_sessions(&wal_path).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_invalid_sessions_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("test.wal");

        let good = create_test_session();
        let out_of_range = TrainingSession {
            progress_fraction: 5.0,
            ..create_test_session()
        };
        let ends_before_start = TrainingSession {
            completed_at: Some(good.started_at - Duration::hours(1)),
            ..create_test_session()
        };

        // Written raw, since these never come from a real progress update
        let mut file = File::create(&wal_path).unwrap();
        for session in [&out_of_range, &good, &ends_before_start] {
            writeln!(file, "{}", serde_json::to_string(session).unwrap()).unwrap();
        }
        drop(file);

        let sessions = read_sessions(&wal_path).unwrap();
        assert_eq!(sessions, vec![good]);
    }
}
