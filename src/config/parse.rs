//! Project file parsing and discovery
//!
//! The YAML encoding of an element is a single-key mapping `tag: body`. A body
//! is null, a scalar (the element's text) or a mapping. Scalar values inside a
//! mapping are attributes; the reserved keys `children` and `text` carry the
//! nested elements and the text content.

use crate::config::element::{Element, Location};
use crate::error::{ConfigError, ConfigResult, RantError};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default project file names to search for
const PROJECT_FILE_NAMES: &[&str] = &["build.yml", "build.yaml"];

/// Key holding nested elements
const CHILDREN_KEY: &str = "children";

/// Key holding text content
const TEXT_KEY: &str = "text";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectFile {
    project: Value,
}

/// Find the project file by searching current and parent directories
pub fn find_project_file() -> ConfigResult<PathBuf> {
    find_project_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the project file starting from a specific directory
pub fn find_project_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in PROJECT_FILE_NAMES {
            let project_path = current_dir.join(file_name);
            searched_paths.push(project_path.display().to_string());

            if project_path.is_file() {
                return Ok(project_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a project file from a path
pub fn parse_project_file(path: &Path) -> Result<Element, RantError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)))?;

    parse_project(&contents, Some(path))
}

/// Parse a project tree from a YAML string
pub fn parse_project(yaml: &str, project_path: Option<&Path>) -> Result<Element, RantError> {
    let file: ProjectFile = serde_yaml::from_str(yaml)?;
    let file_name = project_path
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    let root = element_from_value("project", file.project, Location::new(file_name, "project"))?;
    Ok(root)
}

/// Convert a YAML body into an element
pub fn element_from_value(tag: &str, body: Value, location: Location) -> ConfigResult<Element> {
    let mut element = Element {
        tag: tag.to_string(),
        location,
        ..Default::default()
    };

    match body {
        Value::Null => {}
        Value::Mapping(map) => fill_from_mapping(&mut element, map)?,
        Value::Tagged(_) | Value::Sequence(_) => {
            return Err(ConfigError::Invalid(format!(
                "{}: element body must be a mapping or a scalar",
                element.location
            )))
        }
        scalar => element.text = scalar_to_string(&scalar),
    }

    Ok(element)
}

fn fill_from_mapping(element: &mut Element, map: Mapping) -> ConfigResult<()> {
    for (key, value) in map {
        let key = scalar_to_string(&key).ok_or_else(|| {
            ConfigError::Invalid(format!("{}: keys must be scalars", element.location))
        })?;

        if key == CHILDREN_KEY {
            element.children = children_from_value(value, &element.location)?;
        } else if key == TEXT_KEY {
            element.text = scalar_to_string(&value);
        } else {
            let value = scalar_to_string(&value).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "{}: attribute '{}' must be a scalar (nested elements go under '{}')",
                    element.location, key, CHILDREN_KEY
                ))
            })?;
            element.attributes.push((key, value));
        }
    }
    Ok(())
}

fn children_from_value(value: Value, parent: &Location) -> ConfigResult<Vec<Element>> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Sequence(items) => items,
        _ => {
            return Err(ConfigError::Invalid(format!(
                "{}: '{}' must be a list of elements",
                parent, CHILDREN_KEY
            )))
        }
    };

    let mut children = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let (tag, body) = match item {
            Value::Mapping(map) if map.len() == 1 => {
                let (key, body) = map.into_iter().next().ok_or_else(|| {
                    ConfigError::Invalid(format!("{}: empty element", parent))
                })?;
                let tag = scalar_to_string(&key).ok_or_else(|| {
                    ConfigError::Invalid(format!("{}: element names must be strings", parent))
                })?;
                (tag, body)
            }
            // A bare string is an element without attributes
            Value::String(tag) => (tag, Value::Null),
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "{}: child #{} must be a single-key mapping `tag: body`",
                    parent, index
                )))
            }
        };

        let segment = match body.get("name").or_else(|| body.get("id")) {
            Some(Value::String(name)) if tag == "target" => format!("{}[{}]", tag, name),
            _ => format!("{}[{}]", tag, index),
        };
        let location = parent.child(&segment);
        children.push(element_from_value(&tag, body, location)?);
    }

    Ok(children)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a project with automatic file discovery
pub fn parse_project_auto() -> Result<(Element, PathBuf), RantError> {
    let project_path = find_project_file()?;
    let root = parse_project_file(&project_path)?;
    Ok((root, project_path))
}
