//! The `property` task

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, ExecutionError, Result};
use crate::fs::FileSystem;
use crate::project::Reference;
use crate::runner::{Task, TaskContext};
use crate::types::PathList;
use std::env;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Sets properties that are not set yet
#[derive(Debug, Default)]
pub struct PropertyTask {
    name: Option<String>,
    value: Option<String>,
    location: Option<PathBuf>,
    path: Option<Reference>,
    file: Option<PathBuf>,
    environment: Option<String>,
    prefix: Option<String>,
}

impl PropertyTask {
    fn prefixed(&self, name: &str) -> String {
        match &self.prefix {
            Some(prefix) if prefix.ends_with('.') => format!("{}{}", prefix, name),
            Some(prefix) => format!("{}.{}", prefix, name),
            None => name.to_string(),
        }
    }

    fn single_value(&self, ctx: &TaskContext<'_>) -> Result<Option<String>> {
        if let Some(value) = &self.value {
            return Ok(Some(value.clone()));
        }
        if let Some(location) = &self.location {
            return Ok(Some(location.display().to_string()));
        }
        if let Some(reference) = &self.path {
            let path = reference.downcast_ref::<PathList>().ok_or_else(|| {
                ConfigError::ReferenceTypeMismatch {
                    id: reference.id.clone(),
                    expected: "PathList".to_string(),
                    actual: reference.object.type_name().to_string(),
                }
            })?;
            return Ok(Some(path.render(ctx.fs().as_ref())?));
        }
        Ok(None)
    }

    fn load_file(&self, ctx: &mut TaskContext<'_>, file: &Path) -> Result<()> {
        let fs = ctx.fs();
        let contents = fs.read_to_string(file).map_err(|e| ConfigError::PropertyFile {
            path: file.to_path_buf(),
            error: e.to_string(),
        })?;

        // Project properties expand before dotenvy substitutes the rest
        let contents = ctx.project.properties.resolve(&contents);
        let entries = dotenvy::from_read_iter(Cursor::new(contents.into_bytes()));
        for entry in entries {
            let (key, value) = entry.map_err(|e| ConfigError::PropertyFile {
                path: file.to_path_buf(),
                error: e.to_string(),
            })?;
            ctx.project.properties.set_new(self.prefixed(&key), value);
        }
        Ok(())
    }
}

impl Task for PropertyTask {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        if let Some(name) = &self.name {
            let value = self.single_value(ctx)?.ok_or_else(|| ConfigError::MissingAttribute {
                element: "property".to_string(),
                attribute: "value".to_string(),
            })?;
            ctx.project.properties.set_new(name.clone(), value);
            return Ok(());
        }

        if self.file.is_none() && self.environment.is_none() {
            return Err(ConfigError::MissingAttribute {
                element: "property".to_string(),
                attribute: "name".to_string(),
            }
            .into());
        }

        if let Some(file) = self.file.clone() {
            if !ctx.fs().exists(&file) {
                return Err(ExecutionError::File {
                    path: file,
                    error: "property file not found".to_string(),
                }
                .into());
            }
            self.load_file(ctx, &file)?;
        }

        if let Some(prefix) = &self.environment {
            let prefix = prefix.trim_end_matches('.');
            let mut vars: Vec<(String, String)> = env::vars().collect();
            vars.sort();
            for (key, value) in vars {
                ctx.project
                    .properties
                    .set_new(format!("{}.{}", prefix, key), value);
            }
        }
        Ok(())
    }
}

impl Configurable for PropertyTask {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("name", |p, v| p.name = Some(v))
            .string("value", |p, v| p.value = Some(v))
            .path("location", |p, v| p.location = Some(v))
            .reference::<PathList>("pathref", |p, v| p.path = Some(v))
            .path("file", |p, v| p.file = Some(v))
            .string("environment", |p, v| p.environment = Some(v))
            .string("prefix", |p, v| p.prefix = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
