//! External process execution

use crate::error::{ExecutionError, ExecutionResult};
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// Interpreter used for `command` lines
pub const SHELL: &[&str] = &["sh", "-c"];

/// A process to start
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        CommandLine {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// A line run through the shell interpreter
    pub fn shell(line: &str) -> Self {
        CommandLine {
            program: SHELL[0].to_string(),
            args: SHELL[1..]
                .iter()
                .map(|s| s.to_string())
                .chain(std::iter::once(line.to_string()))
                .collect(),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a process to completion, returning its exit code
///
/// Output is inherited unless `quiet`.
pub fn run_command(
    cmd: &CommandLine,
    working_dir: &Path,
    env: &[(String, String)],
    quiet: bool,
) -> ExecutionResult<Option<i32>> {
    debug!(command = %cmd.display(), dir = %working_dir.display(), "Running command");

    let mut command = StdCommand::new(&cmd.program);
    command.args(&cmd.args);
    command.current_dir(working_dir);

    command.stdin(Stdio::inherit());
    if quiet {
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
    } else {
        command.stdout(Stdio::inherit());
        command.stderr(Stdio::inherit());
    }

    for (key, value) in env {
        command.env(key, value);
    }

    let status = command.status().map_err(|e| ExecutionError::Spawn {
        program: cmd.program.clone(),
        error: e.to_string(),
    })?;
    Ok(status.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_simple_command() {
        let temp_dir = TempDir::new().unwrap();
        let code = run_command(&CommandLine::shell("exit 0"), temp_dir.path(), &[], true).unwrap();
        assert_eq!(code, Some(0));
    }

    #[test]
    fn test_failing_command_reports_code() {
        let temp_dir = TempDir::new().unwrap();
        let code = run_command(&CommandLine::shell("exit 3"), temp_dir.path(), &[], true).unwrap();
        assert_eq!(code, Some(3));
    }

    #[test]
    fn test_environment_is_passed() {
        let temp_dir = TempDir::new().unwrap();
        let env = vec![("RANT_TEST_VAR".to_string(), "yes".to_string())];
        let code = run_command(
            &CommandLine::shell("test \"$RANT_TEST_VAR\" = yes"),
            temp_dir.path(),
            &env,
            true,
        )
        .unwrap();
        assert_eq!(code, Some(0));
    }

    #[test]
    fn test_missing_program() {
        let temp_dir = TempDir::new().unwrap();
        let result = run_command(
            &CommandLine::new("rant-no-such-program"),
            temp_dir.path(),
            &[],
            true,
        );
        assert!(matches!(result, Err(ExecutionError::Spawn { .. })));
    }

    #[test]
    fn test_display() {
        let mut cmd = CommandLine::new("cargo");
        cmd.args.push("build".to_string());
        assert_eq!(cmd.display(), "cargo build");
    }
}
