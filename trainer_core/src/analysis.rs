//! Training pattern analysis.
//!
//! Derives a [`TrainingPattern`] from a snapshot of session history:
//! - Preferred time of day (modal completion hour)
//! - Average session duration
//! - Completion rate
//! - Learning style (from average duration)
//! - Strength and weakness categories (from per-category mean progress)
//!
//! Every function here is total. Empty or degenerate history falls back to
//! fixed defaults instead of failing.

use crate::{Catalog, CategorySource, LearningStyle, TrainingPattern, TrainingSession};
use chrono::{NaiveTime, TimeZone, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet};

/// Hour reported when no session has been completed
pub const DEFAULT_PREFERRED_HOUR: u32 = 9;

/// Average session length assumed when no session has both timestamps
pub const DEFAULT_SESSION_SECONDS: f64 = 1800.0;

/// Category mean above which a category is a strength
pub const STRENGTH_THRESHOLD: f64 = 0.7;

/// Category mean below which a category is a weakness
pub const WEAKNESS_THRESHOLD: f64 = 0.4;

/// Analyze history with hours taken in UTC
pub fn analyze(history: &[TrainingSession]) -> TrainingPattern {
    analyze_in(history, &Utc)
}

/// Analyze history with hours taken in the given time zone
///
/// Categories come from the module id prefix (text before the first `-`).
pub fn analyze_in<Tz: TimeZone>(history: &[TrainingSession], tz: &Tz) -> TrainingPattern {
    analyze_with(history, tz, |s| s.category_key().to_string())
}

/// Analyze history, resolving categories through the catalog
///
/// Sessions for modules the catalog does not know fall back to the module id
/// prefix.
pub fn analyze_with_catalog<Tz: TimeZone>(
    history: &[TrainingSession],
    tz: &Tz,
    catalog: &Catalog,
) -> TrainingPattern {
    analyze_with(history, tz, |s| {
        catalog
            .get(&s.module_id)
            .map(|m| m.category.clone())
            .unwrap_or_else(|| s.category_key().to_string())
    })
}

/// Analyze history using the configured category source
pub fn analyze_with_source<Tz: TimeZone>(
    history: &[TrainingSession],
    tz: &Tz,
    catalog: &Catalog,
    source: CategorySource,
) -> TrainingPattern {
    match source {
        CategorySource::ModulePrefix => analyze_in(history, tz),
        CategorySource::Catalog => analyze_with_catalog(history, tz, catalog),
    }
}

fn analyze_with<Tz, F>(history: &[TrainingSession], tz: &Tz, category_of: F) -> TrainingPattern
where
    Tz: TimeZone,
    F: Fn(&TrainingSession) -> String,
{
    let preferred_time_of_day = preferred_time_of_day(history, tz);
    let average_session_seconds = average_session_seconds(history);
    let completion_rate = completion_rate(history);
    let learning_style = LearningStyle::from_average_duration(average_session_seconds);
    let (strengths, weaknesses) = performance_areas(history, category_of);

    tracing::debug!(
        sessions = history.len(),
        preferred_hour = preferred_time_of_day.hour(),
        average_session_seconds,
        completion_rate,
        %learning_style,
        "Analyzed training pattern"
    );

    TrainingPattern {
        preferred_time_of_day,
        average_session_seconds,
        completion_rate,
        learning_style,
        strengths,
        weaknesses,
    }
}

/// Modal completion hour, lowest hour winning ties
pub fn preferred_time_of_day<Tz: TimeZone>(history: &[TrainingSession], tz: &Tz) -> NaiveTime {
    let mut counts = [0usize; 24];
    for completed in history.iter().filter_map(|s| s.completed_at) {
        counts[completed.with_timezone(tz).hour() as usize] += 1;
    }

    // Strict `>` keeps the earliest hour among equal counts.
    let mut best: Option<(u32, usize)> = None;
    for (hour, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((hour as u32, count));
        }
    }

    let hour = best.map_or(DEFAULT_PREFERRED_HOUR, |(hour, _)| hour);
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Mean length of sessions that have both timestamps
pub fn average_session_seconds(history: &[TrainingSession]) -> f64 {
    let durations: Vec<f64> = history
        .iter()
        .filter_map(TrainingSession::duration_seconds)
        .collect();

    if durations.is_empty() {
        DEFAULT_SESSION_SECONDS
    } else {
        durations.iter().sum::<f64>() / durations.len() as f64
    }
}

/// Fraction of sessions that reached completion; 0 for empty history
pub fn completion_rate(history: &[TrainingSession]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let completed = history.iter().filter(|s| s.is_completed()).count();
    completed as f64 / history.len() as f64
}

fn performance_areas<F>(
    history: &[TrainingSession],
    category_of: F,
) -> (BTreeSet<String>, BTreeSet<String>)
where
    F: Fn(&TrainingSession) -> String,
{
    let mut totals: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for session in history {
        let entry = totals.entry(category_of(session)).or_insert((0.0, 0));
        entry.0 += session.progress_fraction;
        entry.1 += 1;
    }

    let mut strengths = BTreeSet::new();
    let mut weaknesses = BTreeSet::new();
    for (category, (sum, count)) in totals {
        let mean = sum / count as f64;
        if mean > STRENGTH_THRESHOLD {
            strengths.insert(category);
        } else if mean < WEAKNESS_THRESHOLD {
            weaknesses.insert(category);
        }
    }

    (strengths, weaknesses)
}
