//! Default catalog of ICD-11 transition training modules.
//!
//! This module provides the built-in curriculum and catalog lookups.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog_internal);

/// Get a reference to the cached default catalog
///
/// The cached copy carries no user progress; overlay it with
/// [`Catalog::with_progress`].
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalog creation.
pub fn build_default_catalog() -> Catalog {
    build_default_catalog_internal()
}

#[allow(clippy::too_many_arguments)]
fn module(
    id: &str,
    title: &str,
    duration_label: &str,
    kind: LearningStyle,
    category: &str,
    difficulty: u8,
    prerequisites: &[&str],
    estimated_completion_seconds: u32,
    skills: &[&str],
) -> TrainingModule {
    TrainingModule {
        id: id.into(),
        title: title.into(),
        duration_label: duration_label.into(),
        kind,
        category: category.into(),
        difficulty,
        prerequisites: prerequisites.iter().map(|s| s.to_string()).collect(),
        estimated_completion_seconds,
        skills: skills.iter().map(|s| s.to_string()).collect(),
        progress: 0.0,
    }
}

fn build_default_catalog_internal() -> Catalog {
    let modules = vec![
        module(
            "icd11-basics",
            "ICD-11 Basics",
            "45 min",
            LearningStyle::Theoretical,
            "fundamentals",
            1,
            &[],
            2700,
            &["ICD-11", "Medical Coding", "Healthcare Standards"],
        ),
        module(
            "transition-guidelines",
            "Transition Guidelines",
            "30 min",
            LearningStyle::Practical,
            "implementation",
            2,
            &["icd11-basics"],
            1800,
            &["Migration", "Process Management", "Documentation"],
        ),
        module(
            "code-mapping",
            "Code Mapping",
            "60 min",
            LearningStyle::Interactive,
            "coding",
            3,
            &["icd11-basics", "transition-guidelines"],
            3600,
            &["Code Mapping", "Clinical Terms", "Medical Terminology"],
        ),
        module(
            "best-practices",
            "Best Practices",
            "40 min",
            LearningStyle::Visual,
            "advanced",
            4,
            &["code-mapping"],
            2400,
            &["Quality Assurance", "Workflow Optimization", "Compliance"],
        ),
    ];

    Catalog { modules }
}

impl Catalog {
    /// Look up a module by id
    pub fn get(&self, id: &str) -> Option<&TrainingModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Modules not yet fully completed, in catalog order
    pub fn incomplete_modules(&self) -> Vec<TrainingModule> {
        self.modules
            .iter()
            .filter(|m| !m.is_complete())
            .cloned()
            .collect()
    }

    /// Copy of the catalog with stored progress applied
    ///
    /// Modules without a stored value keep their current progress. Ids in
    /// `progress` that the catalog does not know are ignored.
    pub fn with_progress(&self, progress: &HashMap<String, f64>) -> Catalog {
        let modules = self
            .modules
            .iter()
            .map(|m| {
                let mut m = m.clone();
                if let Some(&p) = progress.get(&m.id) {
                    m.progress = p.clamp(0.0, 1.0);
                }
                m
            })
            .collect();
        Catalog { modules }
    }

    /// Validate catalog consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let ids: HashSet<&str> = self.modules.iter().map(|m| m.id.as_str()).collect();

        for m in &self.modules {
            if !seen.insert(m.id.as_str()) {
                errors.push(format!("Duplicate module id '{}'", m.id));
            }

            if m.title.trim().is_empty() {
                errors.push(format!("Module '{}': empty title", m.id));
            }

            if !(1..=5).contains(&m.difficulty) {
                errors.push(format!(
                    "Module '{}': difficulty {} outside 1-5",
                    m.id, m.difficulty
                ));
            }

            if !(0.0..=1.0).contains(&m.progress) {
                errors.push(format!(
                    "Module '{}': progress {} outside [0, 1]",
                    m.id, m.progress
                ));
            }

            for prereq in &m.prerequisites {
                if prereq == &m.id {
                    errors.push(format!("Module '{}': lists itself as a prerequisite", m.id));
                } else if !ids.contains(prereq.as_str()) {
                    errors.push(format!(
                        "Module '{}': unknown prerequisite '{}'",
                        m.id, prereq
                    ));
                }
            }
        }

        if self.modules.is_empty() {
            errors.push("Catalog has no modules".to_string());
        }

        errors
    }
}
