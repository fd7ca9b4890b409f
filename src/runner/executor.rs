//! Target execution
//!
//! The executor orders the requested targets and their dependencies, runs
//! the project's top-level tasks once, then walks the order: each target's
//! guard is checked when it is reached and its tasks are configured and run
//! one at a time, in declaration order.

use crate::binder::{parse_boolean, Configurator};
use crate::config::Element;
use crate::error::{ConfigError, RantError, Result};
use crate::project::{Project, Target, TypeKind};
use crate::runner::context::{TaskContext, Verbosity};
use crate::runner::graph::execution_order;
use std::collections::HashMap;
use tracing::{debug, info};

/// Per-target state during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Pending,
    Skipped,
    Ready,
    Running,
    Done,
    Aborted,
}

/// What a successful run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Targets whose tasks ran, in order
    pub executed: Vec<String>,
    /// Targets whose guard kept them from running
    pub skipped: Vec<String>,
}

/// Final result of a build
#[derive(Debug)]
pub enum BuildOutcome {
    Success {
        report: BuildReport,
    },
    Failed {
        reason: String,
        target: Option<String>,
        task: Option<String>,
        error: RantError,
    },
    Aborted {
        cycle: String,
    },
}

impl BuildOutcome {
    /// Classify a build error
    pub fn from_error(error: RantError) -> Self {
        if let Some(ConfigError::CircularDependency(cycle)) = error.as_config() {
            return BuildOutcome::Aborted {
                cycle: cycle.clone(),
            };
        }
        let (target, task) = match failure_site(&error) {
            Some((target, task)) => (target.map(str::to_string), Some(task.to_string())),
            None => (None, None),
        };
        BuildOutcome::Failed {
            reason: error.to_string(),
            target,
            task,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }
}

/// The innermost target and task a failure happened in
fn failure_site(error: &RantError) -> Option<(Option<&str>, &str)> {
    match error {
        RantError::TaskFailed {
            target,
            task,
            source,
            ..
        } => failure_site(source).or(Some((target.as_deref(), task.as_str()))),
        RantError::SubBuild { source, .. } | RantError::Located { source, .. } => {
            failure_site(source)
        }
        _ => None,
    }
}

/// Drives the targets of one project
pub struct Executor<'p> {
    project: &'p mut Project,
    states: HashMap<String, TargetState>,
}

impl<'p> Executor<'p> {
    pub fn new(project: &'p mut Project) -> Self {
        Executor {
            project,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, target: &str) -> Option<TargetState> {
        self.states.get(target).copied()
    }

    /// Run the requested targets and everything they depend on
    pub fn run(&mut self, requested: &[String]) -> Result<BuildReport> {
        let targets = self.project.targets();
        let order = execution_order(&targets, requested)?;
        debug!(order = ?order, "Computed execution order");
        for name in &order {
            self.states.insert(name.clone(), TargetState::Pending);
        }

        run_implicit(self.project)?;

        let mut report = BuildReport::default();
        for name in &order {
            let target = targets
                .iter()
                .find(|t| &t.name == name)
                .ok_or_else(|| ConfigError::TargetNotFound(name.clone()))?;

            if !guard_allows(self.project, target) {
                info!(target = %name, "Skipping target (guard not met)");
                self.states.insert(name.clone(), TargetState::Skipped);
                report.skipped.push(name.clone());
                continue;
            }
            self.states.insert(name.clone(), TargetState::Ready);

            let dependencies_finished = target.depends.iter().all(|dep| {
                matches!(
                    self.state(dep),
                    Some(TargetState::Done) | Some(TargetState::Skipped)
                )
            });
            if !dependencies_finished {
                self.states.insert(name.clone(), TargetState::Aborted);
                return Err(ConfigError::Invalid(format!(
                    "Target '{}' reached before its dependencies finished",
                    name
                ))
                .into());
            }

            self.states.insert(name.clone(), TargetState::Running);
            if self.project.verbosity() >= Verbosity::Normal {
                println!("\n{}:", name);
            }
            info!(target = %name, "Running target");

            for task in &target.tasks {
                if let Err(err) = perform(self.project, Some(name), task) {
                    self.states.insert(name.clone(), TargetState::Aborted);
                    return Err(err);
                }
            }

            self.states.insert(name.clone(), TargetState::Done);
            report.executed.push(name.clone());
        }

        Ok(report)
    }
}

/// Run the top-level tasks unless this project already has
pub fn run_implicit(project: &mut Project) -> Result<()> {
    if !project.take_implicit() {
        return Ok(());
    }
    let implicit = project.implicit_tasks();
    for element in implicit.iter() {
        perform(project, None, element)?;
    }
    Ok(())
}

/// Whether a target's `if` / `unless` guards allow it to run
pub fn guard_allows(project: &Project, target: &Target) -> bool {
    if let Some(condition) = &target.if_condition {
        if !condition_holds(project, condition) {
            return false;
        }
    }
    if let Some(condition) = &target.unless_condition {
        if condition_holds(project, condition) {
            return false;
        }
    }
    true
}

/// A guard holds if it resolves to a true token or names a set property
pub fn condition_holds(project: &Project, condition: &str) -> bool {
    let resolved = project.properties.resolve(condition);
    match parse_boolean(&resolved) {
        Some(value) => value,
        None => !resolved.is_empty() && project.properties.contains(&resolved),
    }
}

/// Configure and perform one declared element
///
/// Tasks are executed. Data types are configured; one carrying an `id` is
/// registered for reference unless that id is already configured.
pub fn perform(project: &mut Project, target: Option<&str>, element: &Element) -> Result<()> {
    perform_element(project, target, element).map_err(|err| task_failed(err, target, element))
}

fn perform_element(project: &mut Project, target: Option<&str>, element: &Element) -> Result<()> {
    let context = project.context();
    let definition = context
        .types
        .get(&element.tag)
        .ok_or_else(|| ConfigError::UnknownElement(element.tag.clone()))?;

    match definition.kind {
        TypeKind::Task => {
            let mut object = Configurator::new(project).configure(element)?;
            let task = (definition.as_task)(object.as_mut())
                .ok_or_else(|| ConfigError::Unconstructible(definition.type_name.to_string()))?;
            debug!(task = %element.tag, target = ?target, "Executing task");
            let mut ctx = TaskContext::new(project, target, element);
            task.execute(&mut ctx).map_err(|err| err.at(&element.location))
        }
        TypeKind::DataType => match element.attribute("id") {
            Some(id) => {
                if project.references.ready(id).is_some() {
                    debug!(id, "Reference already configured");
                    return Ok(());
                }
                if !project.references.contains(id) {
                    project.references.declare(id, element.clone());
                }
                Configurator::new(project).resolve_reference(id)?;
                Ok(())
            }
            None => Configurator::new(project).configure(element).map(|_| ()),
        },
    }
}

fn task_failed(err: RantError, target: Option<&str>, element: &Element) -> RantError {
    let source = match err {
        failed @ RantError::TaskFailed { .. } => return failed,
        RantError::Located { location, source } if location == element.location => *source,
        other => other,
    };
    RantError::TaskFailed {
        target: target.map(str::to_string),
        task: element.tag.clone(),
        location: element.location.clone(),
        source: Box::new(source),
    }
}

/// Load-and-run convenience returning a classified outcome
pub fn run_build(project: &mut Project, requested: &[String]) -> BuildOutcome {
    let requested: Vec<String> = if requested.is_empty() {
        project.default_target().map(str::to_string).into_iter().collect()
    } else {
        requested.to_vec()
    };

    let mut executor = Executor::new(project);
    match executor.run(&requested) {
        Ok(report) => BuildOutcome::Success { report },
        Err(err) => BuildOutcome::from_error(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_project;
    use crate::fs::{FileSystem, MemoryFs};
    use crate::project::{BuildContext, BuildOptions, TypeTable};
    use std::path::Path;
    use std::rc::Rc;

    fn load(yaml: &str, fs: Rc<MemoryFs>) -> Project {
        let context = Rc::new(BuildContext::new(
            TypeTable::with_builtins(),
            fs,
            BuildOptions {
                verbosity: Verbosity::Silent,
                ..Default::default()
            },
        ));
        let root = parse_project(yaml, None).unwrap();
        Project::load(context, root, Path::new("/work")).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dependency_sets_guard_property() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - target:
        name: B
        children:
          - property: { name: p, value: "1" }
    - target:
        name: A
        depends: B
        if: p
        children:
          - echo: { message: "p is ${p}", file: out.txt }
"#,
            Rc::clone(&fs),
        );

        let report = Executor::new(&mut project).run(&names(&["A"])).unwrap();
        assert_eq!(report.executed, names(&["B", "A"]));
        assert!(report.skipped.is_empty());
        assert_eq!(project.properties.get("p"), Some("1"));
        assert_eq!(
            fs.read_to_string(Path::new("/work/out.txt")).unwrap(),
            "p is 1\n"
        );
    }

    #[test]
    fn test_guards() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - property: { name: flag, value: "off" }
    - target: { name: needs-missing, if: missing }
    - target: { name: flag-false, if: "${flag}" }
    - target: { name: unless-set, unless: flag }
    - target: { name: unless-missing, unless: missing }
"#,
            fs,
        );

        let report = Executor::new(&mut project)
            .run(&names(&[
                "needs-missing",
                "flag-false",
                "unless-set",
                "unless-missing",
            ]))
            .unwrap();
        assert_eq!(report.executed, names(&["unless-missing"]));
        assert_eq!(
            report.skipped,
            names(&["needs-missing", "flag-false", "unless-set"])
        );
    }

    #[test]
    fn test_skipped_dependency_does_not_block_dependent() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - target: { name: optional, if: never }
    - target: { name: main, depends: optional }
"#,
            fs,
        );
        let mut executor = Executor::new(&mut project);
        let report = executor.run(&names(&["main"])).unwrap();
        assert_eq!(report.executed, names(&["main"]));
        assert_eq!(executor.state("optional"), Some(TargetState::Skipped));
        assert_eq!(executor.state("main"), Some(TargetState::Done));
    }

    #[test]
    fn test_failure_aborts_remaining_targets() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - target:
        name: first
        children:
          - fail: { message: boom }
          - touch: { file: never.txt }
    - target:
        name: second
        depends: first
        children:
          - touch: { file: second.txt }
"#,
            Rc::clone(&fs),
        );

        let mut executor = Executor::new(&mut project);
        let err = executor.run(&names(&["second"])).unwrap_err();
        assert_eq!(executor.state("first"), Some(TargetState::Aborted));
        assert_eq!(executor.state("second"), Some(TargetState::Pending));
        assert!(err.to_string().contains("boom"));
        assert!(!fs.exists(Path::new("/work/never.txt")));
        assert!(!fs.exists(Path::new("/work/second.txt")));
    }

    #[test]
    fn test_outcome_names_failing_target_and_task() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  default: build
  children:
    - target:
        name: build
        children:
          - fail: { message: broken }
"#,
            fs,
        );

        match run_build(&mut project, &[]) {
            BuildOutcome::Failed {
                reason,
                target,
                task,
                ..
            } => {
                assert_eq!(target.as_deref(), Some("build"));
                assert_eq!(task.as_deref(), Some("fail"));
                assert!(reason.contains("broken"));
                assert!(reason.contains("project/target[build]/fail[0]"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_implicit_tasks_run_once_before_targets() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - echo: { message: setup, file: log.txt, append: true }
    - target:
        name: a
        children:
          - echo: { message: a, file: log.txt, append: true }
    - target:
        name: b
        children:
          - echo: { message: b, file: log.txt, append: true }
"#,
            Rc::clone(&fs),
        );

        Executor::new(&mut project).run(&names(&["a"])).unwrap();
        Executor::new(&mut project).run(&names(&["b"])).unwrap();
        assert_eq!(
            fs.read_to_string(Path::new("/work/log.txt")).unwrap(),
            "setup\na\nb\n"
        );
    }

    #[test]
    fn test_tasks_configured_when_they_run() {
        let fs = Rc::new(MemoryFs::new());
        let mut project = load(
            r#"
project:
  children:
    - target:
        name: build
        children:
          - property: { name: out, value: result.txt }
          - touch: { file: "${out}" }
"#,
            Rc::clone(&fs),
        );

        Executor::new(&mut project).run(&names(&["build"])).unwrap();
        assert!(fs.exists(Path::new("/work/result.txt")));
    }

    #[test]
    fn test_outcome_for_cycle_is_aborted() {
        let err: RantError = ConfigError::CircularDependency("a -> b -> a".to_string()).into();
        match BuildOutcome::from_error(err) {
            BuildOutcome::Aborted { cycle } => assert_eq!(cycle, "a -> b -> a"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
