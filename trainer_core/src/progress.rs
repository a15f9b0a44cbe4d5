//! Progress recording for training modules.
//!
//! A module's first progress update opens a session for it. Further updates
//! move the session's fraction, and reaching 1.0 closes the session so it can
//! be appended to the session log.

use crate::{Error, ProgressState, Result, TrainingSession};
use chrono::{DateTime, Utc};

/// Record a progress update for `module_id`
///
/// Returns the closed session when `fraction` reaches 1.0, otherwise `None`.
/// Fractions outside [0, 1] (or NaN) are rejected and leave the state
/// untouched. Completing a module that is already complete, with no session
/// open for it, changes nothing.
pub fn record_progress(
    state: &mut ProgressState,
    module_id: &str,
    fraction: f64,
    now: DateTime<Utc>,
) -> Result<Option<TrainingSession>> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::Progress(format!(
            "fraction for {} must be within [0, 1], got {}",
            module_id, fraction
        )));
    }

    let already_complete = state.progress.get(module_id).is_some_and(|p| *p >= 1.0);
    if fraction >= 1.0 && already_complete && !state.open_sessions.contains_key(module_id) {
        tracing::info!("{} is already complete", module_id);
        return Ok(None);
    }

    state.progress.insert(module_id.to_string(), fraction);

    let session = state
        .open_sessions
        .entry(module_id.to_string())
        .or_insert_with(|| {
            tracing::info!("Starting training module {}", module_id);
            TrainingSession::start(module_id, now)
        });
    session.progress_fraction = fraction;

    if fraction < 1.0 {
        tracing::info!("Progress on {}: {:.0}%", module_id, fraction * 100.0);
        return Ok(None);
    }

    let mut closed = state
        .open_sessions
        .remove(module_id)
        .ok_or_else(|| Error::State(format!("open session for {} vanished", module_id)))?;
    closed.completed_at = Some(now.max(closed.started_at));

    tracing::info!(
        "Completed {} after {:.0} minutes",
        module_id,
        closed.duration_seconds().unwrap_or(0.0) / 60.0
    );

    Ok(Some(closed))
}
