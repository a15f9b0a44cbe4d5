//! Session history loading and aggregation.
//!
//! This module loads closed sessions from both the WAL and the CSV archive
//! to provide the analyzer with a complete history snapshot, and derives the
//! weekly study-time view from it.

use crate::{DailyStudyTime, Result, TrainingSession};
use chrono::{DateTime, Duration, NaiveDate, TimeDelta, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// CSV row format for reading archived sessions
#[derive(Debug, Deserialize)]
struct CsvRow {
    id: String,
    module_id: String,
    started_at: String,
    completed_at: Option<String>,
    progress: f64,
}

impl TryFrom<CsvRow> for TrainingSession {
    type Error = crate::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let started_at = DateTime::parse_from_rfc3339(&row.started_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        let completed_at = match row.completed_at.as_deref().filter(|s| !s.is_empty()) {
            Some(s) => Some(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| crate::Error::Other(format!("Invalid completion date: {}", e)))?
                    .with_timezone(&Utc),
            ),
            None => None,
        };

        let session = TrainingSession {
            id,
            module_id: row.module_id,
            started_at,
            completed_at,
            progress_fraction: row.progress,
        };
        session.validate()?;
        Ok(session)
    }
}

/// Load closed sessions from both WAL and CSV
///
/// With `window_days`, only sessions started within that many days of now
/// are kept. Returns sessions sorted by started_at (newest first), with
/// sessions present in both sources counted once.
pub fn load_history(
    wal_path: &Path,
    csv_path: &Path,
    window_days: Option<i64>,
) -> Result<Vec<TrainingSession>> {
    let cutoff = window_days.and_then(window_start);
    let in_window = |s: &TrainingSession| cutoff.map_or(true, |c| s.started_at >= c);
    let mut sessions = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for session in crate::wal::read_sessions(wal_path)? {
            if in_window(&session) && seen_ids.insert(session.id) {
                sessions.push(session);
            }
        }
        tracing::debug!("Loaded {} sessions from WAL", sessions.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for session in load_sessions_from_csv(csv_path)? {
            if in_window(&session) && seen_ids.insert(session.id) {
                sessions.push(session);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} sessions from CSV", csv_count);
    }

    sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    match window_days {
        Some(days) => tracing::info!(
            "Loaded {} sessions from last {} days",
            sessions.len(),
            days
        ),
        None => tracing::info!("Loaded {} sessions", sessions.len()),
    }

    Ok(sessions)
}

/// Earliest start time kept by a window of `days`
///
/// A window reaching past the representable range has no cutoff.
fn window_start(days: i64) -> Option<DateTime<Utc>> {
    let cutoff = TimeDelta::try_days(days).and_then(|span| Utc::now().checked_sub_signed(span));
    if cutoff.is_none() {
        tracing::debug!("History window of {} days is unbounded", days);
    }
    cutoff
}

/// Load all sessions from a CSV file
fn load_sessions_from_csv(path: &Path) -> Result<Vec<TrainingSession>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut sessions = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result {
            Ok(row) => match TrainingSession::try_from(row) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!("Failed to parse CSV row: {}", e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row: {}", e);
            }
        }
    }

    Ok(sessions)
}

/// Hours studied on each of the seven days ending at `today`, oldest first
///
/// A session counts toward the local day on which it started.
pub fn weekly_progress<Tz: TimeZone>(
    history: &[TrainingSession],
    today: NaiveDate,
    tz: &Tz,
) -> Vec<DailyStudyTime> {
    let mut hours_by_day: HashMap<NaiveDate, f64> = HashMap::new();
    for session in history {
        if let Some(seconds) = session.duration_seconds() {
            let day = session.started_at.with_timezone(tz).date_naive();
            *hours_by_day.entry(day).or_insert(0.0) += seconds / 3600.0;
        }
    }

    (0..7)
        .rev()
        .map(|days_ago| {
            let date = today - Duration::days(days_ago);
            DailyStudyTime {
                date,
                label: date.format("%a").to_string(),
                hours: hours_by_day.get(&date).copied().unwrap_or(0.0),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::SessionSink;
    use chrono::FixedOffset;

    fn create_test_session(module_id: &str, days_ago: i64) -> TrainingSession {
        let start = Utc::now() - Duration::days(days_ago);
        TrainingSession {
            completed_at: Some(start + Duration::minutes(20)),
            progress_fraction: 1.0,
            ..TrainingSession::start(module_id, start)
        }
    }

    #[test]
    fn test_load_history_window() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_session("icd11-basics", 1)).unwrap();
        sink.append(&create_test_session("code-mapping", 3)).unwrap();
        sink.append(&create_test_session("best-practices", 10)).unwrap();

        assert_eq!(load_history(&wal_path, &csv_path, Some(7)).unwrap().len(), 2);
        assert_eq!(load_history(&wal_path, &csv_path, None).unwrap().len(), 3);
    }

    #[test]
    fn test_deduplication_across_wal_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let session = create_test_session("icd11-basics", 1);
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&session).unwrap();

        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        // Same session written to the WAL again after archiving
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&session).unwrap();

        let sessions = load_history(&wal_path, &csv_path, None).unwrap();
        let count = sessions.iter().filter(|s| s.id == session.id).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_csv_roundtrip_preserves_fields() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut open = TrainingSession::start("code-mapping", Utc::now());
        open.progress_fraction = 0.25;
        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&open).unwrap();
        crate::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();

        let sessions = load_history(&wal_path, &csv_path, None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, open.id);
        assert_eq!(sessions[0].module_id, "code-mapping");
        assert_eq!(sessions[0].completed_at, None);
        assert_eq!(sessions[0].progress_fraction, 0.25);
    }

    #[test]
    fn test_sessions_sorted_newest_first() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_session("old", 5)).unwrap();
        sink.append(&create_test_session("new", 1)).unwrap();

        let sessions = load_history(&wal_path, &csv_path, None).unwrap();
        assert_eq!(sessions[0].module_id, "new");
        assert_eq!(sessions[1].module_id, "old");
    }

    #[test]
    fn test_bad_csv_rows_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("sessions.csv");
        std::fs::write(
            &csv_path,
            "id,module_id,started_at,completed_at,progress\n\
             not-a-uuid,icd11-basics,2024-03-04T08:00:00+00:00,,0.5\n\
             00000000-0000-0000-0000-000000000001,icd11-basics,2024-03-04T08:00:00+00:00,2024-03-04T08:30:00+00:00,1.0\n\
             00000000-0000-0000-0000-000000000002,icd11-basics,2024-03-04T08:00:00+00:00,,7.5\n",
        )
        .unwrap();

        let sessions =
            load_history(&temp_dir.path().join("none.wal"), &csv_path, None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_seconds(), Some(1800.0));
    }

    #[test]
    fn test_inconsistent_csv_rows_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("sessions.csv");
        std::fs::write(
            &csv_path,
            "id,module_id,started_at,completed_at,progress\n\
             00000000-0000-0000-0000-000000000001,icd11-basics,2024-03-04T08:00:00+00:00,2024-03-04T07:00:00+00:00,1.0\n\
             00000000-0000-0000-0000-000000000002,code-mapping,2024-03-04T08:00:00+00:00,yesterday,1.0\n\
             00000000-0000-0000-0000-000000000003,best-practices,2024-03-04T08:00:00+00:00,,0.5\n",
        )
        .unwrap();

        // A garbled completion time must not turn a closed session into an open one
        let sessions =
            load_history(&temp_dir.path().join("none.wal"), &csv_path, None).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].module_id, "best-practices");
        assert!(!sessions[0].is_completed());
    }

    #[test]
    fn test_huge_window_keeps_everything() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("sessions.wal");
        let csv_path = temp_dir.path().join("sessions.csv");

        let mut sink = crate::wal::JsonlSink::new(&wal_path);
        sink.append(&create_test_session("icd11-basics", 1)).unwrap();
        sink.append(&create_test_session("code-mapping", 400)).unwrap();

        for days in [100_000_000, i64::MAX] {
            let sessions = load_history(&wal_path, &csv_path, Some(days)).unwrap();
            assert_eq!(sessions.len(), 2, "window of {} days", days);
        }
    }

    #[test]
    fn test_weekly_progress() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let day = |d: u32, h: u32| Utc.with_ymd_and_hms(2024, 3, d, h, 0, 0).unwrap();

        let mut history = Vec::new();
        for (d, minutes) in [(10, 90), (10, 30), (8, 60), (1, 120)] {
            let start = day(d, 9);
            history.push(TrainingSession {
                completed_at: Some(start + Duration::minutes(minutes)),
                ..TrainingSession::start("icd11-basics", start)
            });
        }
        // Still open, contributes nothing
        history.push(TrainingSession::start("code-mapping", day(9, 9)));

        let week = weekly_progress(&history, today, &tz);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(week[6].date, today);
        assert_eq!(week[6].label, "Sun");
        assert_eq!(week[6].hours, 2.0);
        assert_eq!(week[4].hours, 1.0);
        assert_eq!(week[5].hours, 0.0);
        assert_eq!(week.iter().map(|d| d.hours).sum::<f64>(), 3.0);
    }
}
