//! Prerequisite gating for training modules.

use crate::TrainingModule;

/// Whether every prerequisite of `module` is fully completed in `catalog`
///
/// A prerequisite id that does not resolve to a catalog entry makes the
/// module inaccessible.
pub fn is_accessible(module: &TrainingModule, catalog: &[TrainingModule]) -> bool {
    module.prerequisites.iter().all(|prereq_id| {
        let satisfied = catalog
            .iter()
            .find(|m| &m.id == prereq_id)
            .is_some_and(TrainingModule::is_complete);

        if !satisfied {
            tracing::debug!(
                "Module {} locked: prerequisite {} not complete",
                module.id,
                prereq_id
            );
        }
        satisfied
    })
}

/// Prerequisites of `module` that are not yet satisfied, in listed order
pub fn missing_prerequisites<'a>(
    module: &'a TrainingModule,
    catalog: &[TrainingModule],
) -> Vec<&'a str> {
    module
        .prerequisites
        .iter()
        .filter(|prereq_id| {
            !catalog
                .iter()
                .find(|m| &m.id == *prereq_id)
                .is_some_and(TrainingModule::is_complete)
        })
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;
    use std::collections::HashMap;

    #[test]
    fn test_no_prerequisites_is_accessible() {
        let catalog = build_default_catalog();
        let basics = catalog.get("icd11-basics").unwrap();
        assert!(is_accessible(basics, &[]));
        assert!(is_accessible(basics, &catalog.modules));
    }

    #[test]
    fn test_unknown_prerequisite_fails_closed() {
        let catalog = build_default_catalog();
        let mut orphan = catalog.get("icd11-basics").unwrap().clone();
        orphan.prerequisites = vec!["not-in-catalog".into()];

        assert!(!is_accessible(&orphan, &catalog.modules));
        assert_eq!(missing_prerequisites(&orphan, &catalog.modules), vec!["not-in-catalog"]);
    }

    #[test]
    fn test_partial_progress_does_not_unlock() {
        let mut progress = HashMap::new();
        progress.insert("icd11-basics".to_string(), 0.99);
        let catalog = build_default_catalog().with_progress(&progress);

        let guidelines = catalog.get("transition-guidelines").unwrap();
        assert!(!is_accessible(guidelines, &catalog.modules));
    }

    #[test]
    fn test_chain_unlocks_in_order() {
        let mut progress = HashMap::new();
        progress.insert("icd11-basics".to_string(), 1.0);
        let catalog = build_default_catalog().with_progress(&progress);

        assert!(is_accessible(catalog.get("transition-guidelines").unwrap(), &catalog.modules));

        let mapping = catalog.get("code-mapping").unwrap();
        assert!(!is_accessible(mapping, &catalog.modules));
        assert_eq!(
            missing_prerequisites(mapping, &catalog.modules),
            vec!["transition-guidelines"]
        );

        progress.insert("transition-guidelines".to_string(), 1.0);
        let catalog = build_default_catalog().with_progress(&progress);
        assert!(is_accessible(catalog.get("code-mapping").unwrap(), &catalog.modules));
        assert!(!is_accessible(catalog.get("best-practices").unwrap(), &catalog.modules));
    }
}
