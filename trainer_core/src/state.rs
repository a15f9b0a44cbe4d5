//! Progress state persistence with file locking.
//!
//! This module handles saving and loading per-module progress and the
//! sessions still in progress, with proper file locking to prevent
//! concurrent access issues.

use crate::{Error, Result, TrainingSession};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// User's persistent training progress
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ProgressState {
    /// Current completion fraction per module id
    #[serde(default)]
    pub progress: HashMap<String, f64>,

    /// Sessions opened but not yet completed, keyed by module id
    #[serde(default)]
    pub open_sessions: HashMap<String, TrainingSession>,
}

/// Exclusive hold on the state for a whole load, update and save cycle
///
/// The lock lives in a `.lock` file beside the state file, since `save`
/// replaces the state file itself. Released when dropped.
#[derive(Debug)]
pub struct StateLock {
    file: File,
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!("Failed to release state lock: {}", e);
        }
    }
}

impl ProgressState {
    /// Block until no other writer holds the state at `path`
    pub fn lock(path: &Path) -> Result<StateLock> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;
        file.lock_exclusive()?;

        tracing::debug!("Acquired state lock {:?}", lock_path);
        Ok(StateLock { file })
    }

    /// Closed history plus the sessions still in progress
    ///
    /// This is the complete snapshot the analyzer should see.
    pub fn history_snapshot(&self, closed: &[TrainingSession]) -> Vec<TrainingSession> {
        let mut open: Vec<_> = self.open_sessions.values().cloned().collect();
        open.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let mut snapshot = closed.to_vec();
        snapshot.extend(open);
        snapshot
    }

    /// Load progress state from a file with shared locking
    ///
    /// Returns default state if file doesn't exist.
    /// If file is corrupted, logs a warning and returns default state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No state file found, using default state");
            return Ok(Self::default());
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    "Unable to open state file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                return Ok(Self::default());
            }
        };

        // Acquire shared lock for reading
        if let Err(e) = file.lock_shared() {
            tracing::warn!(
                "Unable to lock state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!(
                "Failed to read state file {:?}: {}. Using defaults.",
                path,
                e
            );
            return Ok(Self::default());
        }

        file.unlock()?;

        match serde_json::from_str::<ProgressState>(&contents) {
            Ok(state) => {
                tracing::debug!("Loaded progress state from {:?}", path);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to parse state file {:?}: {}. Using defaults.",
                    path,
                    e
                );
                Ok(Self::default())
            }
        }
    }

    /// Save progress state to a file with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("state path {:?} has no parent", path)))?;
        // Ensure parent directory exists
        std::fs::create_dir_all(parent)?;

        // Create unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        // Atomically replace old state file
        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved progress state to {:?}", path);
        Ok(())
    }
}
