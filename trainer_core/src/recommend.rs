//! Recommendation scoring for incomplete training modules.
//!
//! Each candidate starts at a base score of 1.0 and is multiplied by:
//! - 1.5 when its type matches the user's learning style
//! - 1.3 when its category is one of the user's weaknesses
//! - (1 + completion rate)
//!
//! Candidates are ranked by score, highest first, with input order
//! breaking ties.

use crate::{Catalog, TrainingModule, TrainingPattern};

pub const BASE_SCORE: f64 = 1.0;
pub const STYLE_MATCH_MULTIPLIER: f64 = 1.5;
pub const WEAKNESS_MULTIPLIER: f64 = 1.3;

/// Score a single module against a pattern
pub fn score_module(module: &TrainingModule, pattern: &TrainingPattern) -> f64 {
    let mut score = BASE_SCORE;

    if module.kind == pattern.learning_style {
        score *= STYLE_MATCH_MULTIPLIER;
    }

    if pattern.weaknesses.contains(&module.category) {
        score *= WEAKNESS_MULTIPLIER;
    }

    score * (1.0 + pattern.completion_rate)
}

/// Rank candidates and return up to `top_n` module ids
///
/// Candidates are expected to be incomplete already (`progress < 1.0`);
/// completed modules passed in are scored like any other.
pub fn recommend(
    candidates: &[TrainingModule],
    pattern: &TrainingPattern,
    top_n: usize,
) -> Vec<String> {
    let mut scored: Vec<(&TrainingModule, f64)> = candidates
        .iter()
        .map(|m| (m, score_module(m, pattern)))
        .collect();

    // sort_by is stable, so equal scores keep their input order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (module, score) in &scored {
        tracing::debug!("Scored {}: {:.3}", module.id, score);
    }

    scored
        .into_iter()
        .take(top_n)
        .map(|(m, _)| m.id.clone())
        .collect()
}

/// Recommend incomplete catalog modules, in rank order
pub fn recommend_from_catalog(
    catalog: &Catalog,
    pattern: &TrainingPattern,
    top_n: usize,
) -> Vec<TrainingModule> {
    let candidates = catalog.incomplete_modules();
    let ids = recommend(&candidates, pattern, top_n);

    tracing::info!(
        "Recommending {} of {} incomplete modules for {} learner",
        ids.len(),
        candidates.len(),
        pattern.learning_style
    );

    ids.iter()
        .filter_map(|id| catalog.get(id).cloned())
        .collect()
}

/// First recommended module that is still incomplete
pub fn next_recommended(recommended: &[TrainingModule]) -> Option<&TrainingModule> {
    recommended.iter().find(|m| !m.is_complete())
}
