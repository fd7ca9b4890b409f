//! Common test utilities
#![allow(dead_code)]

use rant::config::parse_project;
use rant::fs::{FileSystem, MemoryFs};
use rant::project::{BuildContext, BuildOptions, Project, TypeTable};
use rant::runner::Verbosity;
use rant::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Base directory of in-memory projects
pub const BASE: &str = "/work";

/// Create a temporary directory with a build.yml file
pub fn create_test_project(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let project_path = temp_dir.path().join("build.yml");
    fs::write(&project_path, content).unwrap();
    (temp_dir, project_path)
}

pub fn silent() -> BuildOptions {
    BuildOptions {
        verbosity: Verbosity::Silent,
        ..Default::default()
    }
}

/// Load a project from YAML against an in-memory filesystem rooted at `/work`
pub fn try_load_with(
    yaml: &str,
    fs: Rc<MemoryFs>,
    types: TypeTable,
    options: BuildOptions,
) -> Result<Project> {
    let context = Rc::new(BuildContext::new(types, fs, options));
    let root = parse_project(yaml, None)?;
    Project::load(context, root, Path::new(BASE))
}

pub fn try_load(yaml: &str, fs: Rc<MemoryFs>) -> Result<Project> {
    try_load_with(yaml, fs, TypeTable::with_builtins(), silent())
}

pub fn load(yaml: &str, fs: Rc<MemoryFs>) -> Project {
    try_load(yaml, fs).unwrap()
}

/// Contents of a file below `/work`
pub fn read(fs: &MemoryFs, name: &str) -> String {
    fs.read_to_string(&Path::new(BASE).join(name)).unwrap()
}

pub fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
