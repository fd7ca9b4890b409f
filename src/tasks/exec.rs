//! The `exec` task

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, ExecutionError, RantError, Result};
use crate::runner::{run_command, CommandLine, ErrorPolicy, Task, TaskContext};
use std::path::PathBuf;

/// A command-line argument
#[derive(Debug, Clone, Default)]
pub struct Arg {
    value: Option<String>,
    line: Option<String>,
}

impl Arg {
    fn parts(&self) -> Vec<String> {
        match (&self.value, &self.line) {
            (Some(value), _) => vec![value.clone()],
            (None, Some(line)) => line.split_whitespace().map(str::to_string).collect(),
            (None, None) => Vec::new(),
        }
    }
}

impl Configurable for Arg {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("value", |a, v| a.value = Some(v))
            .string("line", |a, v| a.line = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// An environment variable for the started process
#[derive(Debug, Clone, Default)]
pub struct EnvVar {
    key: String,
    value: String,
}

impl Configurable for EnvVar {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("key", |e, v| e.key = v)
            .string("value", |e, v| e.value = v)
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// Runs an external program
#[derive(Debug, Default)]
pub struct Exec {
    executable: Option<String>,
    command: Option<String>,
    args: Vec<Arg>,
    env: Vec<EnvVar>,
    dir: Option<PathBuf>,
    result_property: Option<String>,
    policy: ErrorPolicy,
}

impl Exec {
    fn command_line(&self) -> Result<CommandLine> {
        let extra = self.args.iter().flat_map(Arg::parts);
        match (&self.executable, &self.command) {
            (Some(_), Some(_)) => Err(ConfigError::Invalid(
                "<exec> takes either \"executable\" or \"command\", not both".to_string(),
            )
            .into()),
            (Some(program), None) => {
                let mut cmd = CommandLine::new(program.clone());
                cmd.args.extend(extra);
                Ok(cmd)
            }
            (None, Some(line)) => {
                let mut line = line.clone();
                for arg in extra {
                    line.push(' ');
                    line.push_str(&arg);
                }
                Ok(CommandLine::shell(&line))
            }
            (None, None) => Err(ConfigError::MissingAttribute {
                element: "exec".to_string(),
                attribute: "executable".to_string(),
            }
            .into()),
        }
    }
}

impl Task for Exec {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let cmd = self.command_line()?;
        let dir = self
            .dir
            .clone()
            .unwrap_or_else(|| ctx.project.base_dir().to_path_buf());
        let env: Vec<(String, String)> = self
            .env
            .iter()
            .map(|var| (var.key.clone(), var.value.clone()))
            .collect();

        let result = run_command(&cmd, &dir, &env, self.policy.quiet)
            .map_err(RantError::from)
            .and_then(|code| {
                if let Some(property) = &self.result_property {
                    let value = code.map(|c| c.to_string()).unwrap_or_default();
                    ctx.project.properties.set_new(property.clone(), value);
                }
                match code {
                    Some(0) => Ok(()),
                    code => Err(RantError::from(ExecutionError::CommandFailed(code))),
                }
            });
        self.policy.handle(ctx, result)
    }
}

impl Configurable for Exec {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("executable", |e, v| e.executable = Some(v))
            .string("command", |e, v| e.command = Some(v))
            .path("dir", |e, v| e.dir = Some(v))
            .boolean("failonerror", |e, v| e.policy.fail_on_error = v)
            .boolean("quiet", |e, v| e.policy.quiet = v)
            .string("errorproperty", |e, v| e.policy.error_property = Some(v))
            .string("resultproperty", |e, v| e.result_property = Some(v))
            .creator("arg", |e| {
                e.args.push(Arg::default());
                let index = e.args.len() - 1;
                &mut e.args[index]
            })
            .adder("env", |e, var: EnvVar| e.env.push(var))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
