//! Main CLI application

use crate::config::find_project_file;
use crate::error::ConfigError;
use crate::project::{BuildContext, BuildOptions, Project};
use crate::runner::{run_build, BuildOutcome, Verbosity};
use anyhow::bail;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("rant")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A declarative, target-based build engine driven by YAML project files")
        .arg(
            Arg::new("targets")
                .value_name("TARGET")
                .help("Targets to run (default: the project's default target)")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to the project file (default: search for build.yml)"),
        )
        .arg(
            Arg::new("define")
                .short('D')
                .long("define")
                .value_name("NAME=VALUE")
                .help("Set a user property")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("property-file")
                .long("property-file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Load user properties from a KEY=VALUE file")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("list")
                .short('p')
                .long("list")
                .help("List the project's targets and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("legacy-booleans")
                .long("legacy-booleans")
                .help("Treat boolean-looking string attributes as true/false")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print task output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script and exit"),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Install the log subscriber; `RUST_LOG` overrides the verbosity flags
fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

/// Split a `NAME=VALUE` definition
fn parse_define(define: &str) -> anyhow::Result<(String, String)> {
    match define.split_once('=') {
        Some((name, _)) if name.trim().is_empty() => {
            bail!("invalid property definition '{}': empty name", define)
        }
        Some((name, value)) => Ok((name.trim().to_string(), value.to_string())),
        None => Ok((define.trim().to_string(), String::new())),
    }
}

/// User properties from a property file
fn load_property_file(path: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let entries = dotenvy::from_path_iter(path).map_err(|e| ConfigError::PropertyFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut properties = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::PropertyFile {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        properties.push(entry);
    }
    Ok(properties)
}

/// Print targets with their descriptions
fn print_targets(project: &Project) {
    if let Some(description) = project.description() {
        println!("{}\n", description);
    }
    if let Some(default) = project.default_target() {
        println!("Default target: {}\n", default.bold());
    }

    let targets = project.targets();
    let mut documented: Vec<_> = targets.iter().filter(|t| t.description.is_some()).collect();
    documented.sort_by(|a, b| a.name.cmp(&b.name));
    let mut other: Vec<_> = targets.iter().filter(|t| t.description.is_none()).collect();
    other.sort_by(|a, b| a.name.cmp(&b.name));

    let width = targets.iter().map(|t| t.name.len()).max().unwrap_or(0);
    if !documented.is_empty() {
        println!("Main targets:");
        for target in documented {
            let name = format!("{:width$}", target.name, width = width);
            println!(
                "  {}  {}",
                name.cyan(),
                target.description.as_deref().unwrap_or_default()
            );
        }
    }
    if !other.is_empty() {
        println!("Other targets:");
        for target in other {
            println!("  {}", target.name);
        }
    }
}

/// Print the build summary, returning whether the build succeeded
fn report(outcome: &BuildOutcome, verbosity: Verbosity) -> bool {
    match outcome {
        BuildOutcome::Success { .. } => {
            if verbosity >= Verbosity::Quiet {
                println!("\n{}", "BUILD SUCCESSFUL".green().bold());
            }
            true
        }
        BuildOutcome::Failed {
            reason,
            target,
            task,
            ..
        } => {
            eprintln!("\n{}", "BUILD FAILED".red().bold());
            eprintln!("{}", reason);
            if verbosity >= Verbosity::Verbose {
                if let (Some(target), Some(task)) = (target, task) {
                    eprintln!("(failed in <{}> of target '{}')", task, target);
                }
            }
            false
        }
        BuildOutcome::Aborted { cycle } => {
            eprintln!("\n{}", "BUILD FAILED".red().bold());
            eprintln!("Circular dependency: {}", cycle);
            false
        }
    }
}

/// Run the CLI with the process arguments
///
/// Returns `Ok(false)` when the build ran and failed.
pub fn run() -> anyhow::Result<bool> {
    run_from(std::env::args_os())
}

/// Run the CLI with explicit arguments
pub fn run_from<I, T>(args: I) -> anyhow::Result<bool>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let mut command = build_command();
    let matches = command.clone().get_matches_from(args);

    if let Some(shell) = matches.get_one::<Shell>("completions") {
        generate(*shell, &mut command, "rant", &mut io::stdout());
        return Ok(true);
    }

    let verbosity = get_verbosity(&matches);
    init_logging(verbosity);

    let path = match matches.get_one::<PathBuf>("file") {
        Some(path) => path.clone(),
        None => find_project_file()?,
    };
    let options = BuildOptions {
        legacy_booleans: matches.get_flag("legacy-booleans"),
        verbosity,
    };
    let context = Rc::new(BuildContext::local(options));
    let mut project = match Project::load_file(context, &path) {
        Ok(project) => project,
        Err(err) if matches!(err.as_config(), Some(ConfigError::CircularDependency(_))) => {
            return Ok(report(&BuildOutcome::from_error(err), verbosity));
        }
        Err(err) => {
            return Err(anyhow::Error::new(err).context(format!("failed to load {}", path.display())))
        }
    };

    if let Some(files) = matches.get_many::<PathBuf>("property-file") {
        for file in files {
            for (name, value) in load_property_file(file)? {
                project.properties.set_user(name, value);
            }
        }
    }
    if let Some(defines) = matches.get_many::<String>("define") {
        for define in defines {
            let (name, value) = parse_define(define)?;
            project.properties.set_user(name, value);
        }
    }

    if matches.get_flag("list") {
        print_targets(&project);
        return Ok(true);
    }

    let targets: Vec<String> = matches
        .get_many::<String>("targets")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    if targets.is_empty() && project.default_target().is_none() {
        print_targets(&project);
        return Ok(true);
    }

    if verbosity >= Verbosity::Normal {
        println!("Buildfile: {}", path.display());
    }
    let outcome = run_build(&mut project, &targets);
    Ok(report(&outcome, verbosity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_verbosity_normal() {
        let matches = build_command().get_matches_from(vec!["rant"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Normal);
    }

    #[test]
    fn test_get_verbosity_silent_wins() {
        let matches = build_command().get_matches_from(vec!["rant", "-s", "-v"]);
        assert_eq!(get_verbosity(&matches), Verbosity::Silent);
    }

    #[test]
    fn test_targets_and_defines() {
        let matches =
            build_command().get_matches_from(vec!["rant", "-Dx=1", "-D", "y=a=b", "build", "test"]);
        let targets: Vec<&String> = matches.get_many("targets").unwrap().collect();
        assert_eq!(targets, vec!["build", "test"]);
        let defines: Vec<&String> = matches.get_many("define").unwrap().collect();
        assert_eq!(defines, vec!["x=1", "y=a=b"]);
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("x=1").unwrap(),
            ("x".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_define("y=a=b").unwrap(),
            ("y".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_define("flag").unwrap(), ("flag".to_string(), String::new()));
        assert!(parse_define("=v").is_err());
    }

    #[test]
    fn test_file_arg() {
        let matches = build_command().get_matches_from(vec!["rant", "-f", "other.yml"]);
        assert_eq!(
            matches.get_one::<PathBuf>("file"),
            Some(&PathBuf::from("other.yml"))
        );
    }
}
