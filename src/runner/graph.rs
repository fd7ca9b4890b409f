//! Target dependency ordering

use crate::error::{ConfigError, ConfigResult};
use crate::project::Target;
use std::collections::{HashMap, HashSet};

/// Stable execution order for the requested targets
///
/// Dependencies come before their dependents and are visited in declaration
/// order; a target reached from several requests runs once. Any cycle in the
/// reachable graph is reported before anything is ordered.
pub fn execution_order(targets: &[Target], requested: &[String]) -> ConfigResult<Vec<String>> {
    let by_name: HashMap<&str, &Target> = targets.iter().map(|t| (t.name.as_str(), t)).collect();
    let mut visited = HashSet::new();
    let mut stack = Vec::new();
    let mut order = Vec::new();

    for name in requested {
        visit(&by_name, name, &mut visited, &mut stack, &mut order)?;
    }
    Ok(order)
}

fn visit(
    targets: &HashMap<&str, &Target>,
    name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> ConfigResult<()> {
    if let Some(start) = stack.iter().position(|entry| entry == name) {
        let mut cycle = stack[start..].to_vec();
        cycle.push(name.to_string());
        return Err(ConfigError::CircularDependency(cycle.join(" -> ")));
    }

    if visited.contains(name) {
        return Ok(());
    }

    let target = targets
        .get(name)
        .ok_or_else(|| ConfigError::TargetNotFound(name.to_string()))?;

    stack.push(name.to_string());
    for dependency in &target.depends {
        visit(targets, dependency, visited, stack, order)?;
    }
    stack.pop();

    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}
