//! Project validation
//!
//! Everything that can be checked before a build starts: target names and
//! dependencies, dependency cycles, and the shape of every declared element.

use crate::binder::check_element;
use crate::error::{ConfigError, RantError, Result};
use crate::project::{BuildContext, Target};
use crate::runner::execution_order;
use std::collections::HashSet;

/// Validate targets and declared elements
pub fn validate_project(
    context: &BuildContext,
    targets: &[Target],
    implicit: &[crate::config::Element],
) -> Result<()> {
    validate_targets(targets)?;

    for element in implicit {
        check_element(context, element)?;
    }
    for target in targets {
        for task in &target.tasks {
            check_element(context, task)?;
        }
    }
    Ok(())
}

/// Target names are unique, dependencies exist, no cycles
pub fn validate_targets(targets: &[Target]) -> Result<()> {
    let mut seen = HashSet::new();
    for target in targets {
        if !seen.insert(target.name.as_str()) {
            return Err(
                RantError::from(ConfigError::DuplicateTarget(target.name.clone()))
                    .at(&target.location),
            );
        }
    }

    for target in targets {
        for dependency in &target.depends {
            if !seen.contains(dependency.as_str()) {
                return Err(RantError::from(ConfigError::TargetNotFound(dependency.clone()))
                    .at(&target.location));
            }
        }
    }

    let all: Vec<String> = targets.iter().map(|t| t.name.clone()).collect();
    execution_order(targets, &all)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_target() {
        let targets = vec![Target::new("a"), Target::new("a")];
        let err = validate_targets(&targets).unwrap_err();
        assert!(matches!(err.as_config(), Some(ConfigError::DuplicateTarget(_))));
    }

    #[test]
    fn test_missing_dependency() {
        let targets = vec![Target::new("a").depends_on("b")];
        let err = validate_targets(&targets).unwrap_err();
        assert!(matches!(err.as_config(), Some(ConfigError::TargetNotFound(_))));
        assert!(err.to_string().contains("target[a]"));
    }

    #[test]
    fn test_unreachable_cycle_is_found() {
        let targets = vec![
            Target::new("main"),
            Target::new("x").depends_on("y"),
            Target::new("y").depends_on("x"),
        ];
        let err = validate_targets(&targets).unwrap_err();
        assert!(matches!(
            err.as_config(),
            Some(ConfigError::CircularDependency(_))
        ));
    }

    #[test]
    fn test_valid_graph() {
        let targets = vec![Target::new("a"), Target::new("b").depends_on("a")];
        assert!(validate_targets(&targets).is_ok());
    }
}
