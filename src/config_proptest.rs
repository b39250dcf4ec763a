//! Property-based tests for workspace configuration merging.
//!
//! These tests use proptest to generate random sequences of declarations and
//! verify that the configuration invariants hold after every step.

#[cfg(test)]
mod proptest_tests {
    use std::collections::HashSet;

    use crate::config::{MergeAction, MergeStrategy, WorkspaceConfig};
    use crate::error::Error;
    use crate::spec::{ScmType, VersionedPathSpec};
    use crate::test_support::mock_backends;
    use proptest::prelude::*;

    fn spec_strategy() -> impl Strategy<Value = VersionedPathSpec> {
        // small alphabets force plenty of name and path collisions; the
        // dotted paths resolve to the root or above it
        let path = prop::option::of(r"[a-f]|\.|\.\.|[a-f]/\.\./\.\.");
        ("[a-d]", path, "u[0-3]").prop_map(|(name, path, uri)| {
            let spec = VersionedPathSpec::vcs(name, ScmType::Git, uri);
            match path {
                Some(path) => spec.with_path(path),
                None => spec,
            }
        })
    }

    fn snapshot(config: &WorkspaceConfig) -> Vec<(String, String)> {
        config
            .elements()
            .iter()
            .map(|e| (e.local_name().to_string(), e.abs_path().display().to_string()))
            .collect()
    }

    fn assert_invariants(config: &WorkspaceConfig) -> Result<(), TestCaseError> {
        let names: HashSet<_> = config.elements().iter().map(|e| e.local_name()).collect();
        let paths: HashSet<_> = config.elements().iter().map(|e| e.abs_path()).collect();
        prop_assert_eq!(names.len(), config.len(), "local names must be unique");
        prop_assert_eq!(paths.len(), config.len(), "paths must be unique");
        for element in config.elements() {
            prop_assert!(
                element.abs_path().starts_with(config.base_path())
                    && element.abs_path() != config.base_path(),
                "{} escapes the workspace",
                element.abs_path().display()
            );
        }
        Ok(())
    }

    proptest! {
        /// Property: every add_or_override either keeps the uniqueness and
        /// containment invariants or fails with a config error and changes nothing
        #[test]
        fn add_or_override_preserves_invariants(specs in prop::collection::vec(spec_strategy(), 0..24)) {
            let mut config = WorkspaceConfig::new("/ws", mock_backends().0);
            for spec in specs {
                let before = snapshot(&config);
                match config.add_or_override(spec) {
                    Ok(_) => assert_invariants(&config)?,
                    Err(e) => {
                        prop_assert!(
                            matches!(e, Error::Config { .. }),
                            "expected a config error, got {}",
                            e
                        );
                        prop_assert_eq!(snapshot(&config), before);
                    }
                }
            }
        }

        /// Property: overriding an existing name at the same path keeps its
        /// position
        #[test]
        fn override_at_same_path_keeps_position(
            specs in prop::collection::vec(spec_strategy(), 1..16),
            pick in any::<prop::sample::Index>(),
            uri in "v[0-9]",
        ) {
            let mut config = WorkspaceConfig::new("/ws", mock_backends().0);
            for spec in specs {
                let _ = config.add_or_override(spec);
            }
            prop_assume!(!config.is_empty());
            let index = pick.index(config.len());
            let existing = config.elements()[index].spec().clone();
            let replacement = existing.clone().with_uri(uri.clone());

            let action = config.add_or_override(replacement).unwrap();
            prop_assert_eq!(action, MergeAction::Replaced);
            prop_assert_eq!(config.elements()[index].local_name(), existing.local_name());
            prop_assert_eq!(config.elements()[index].spec().uri(), Some(uri.as_str()));
        }

        /// Property: merge with any strategy is all-or-nothing and keeps the
        /// invariants
        #[test]
        fn merge_is_atomic(
            base in prop::collection::vec(spec_strategy(), 0..8),
            incoming in prop::collection::vec(spec_strategy(), 0..8),
            strategy in prop_oneof![
                Just(MergeStrategy::Replace),
                Just(MergeStrategy::KeepExisting),
                Just(MergeStrategy::KillAppend),
            ],
        ) {
            let mut config = WorkspaceConfig::new("/ws", mock_backends().0);
            for spec in base {
                let _ = config.add_or_override(spec);
            }
            let before = snapshot(&config);
            match config.merge(incoming, strategy) {
                Ok(_) => assert_invariants(&config)?,
                Err(_) => prop_assert_eq!(snapshot(&config), before),
            }
        }
    }
}
