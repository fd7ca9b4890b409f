//! The `uptodate` task

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, Result};
use crate::project::Reference;
use crate::runner::{is_up_to_date, NameMapper, SourceFile, Task, TaskContext};
use crate::types::{FileSet, Mapper};
use std::path::PathBuf;
use tracing::debug;

/// Sets a property when derived files are newer than their sources
#[derive(Debug, Default)]
pub struct UpToDate {
    property: Option<String>,
    value: Option<String>,
    target_file: Option<PathBuf>,
    source_file: Option<PathBuf>,
    source_sets: Vec<FileSet>,
    source_refs: Vec<Reference>,
    mapper: Option<Mapper>,
}

impl UpToDate {
    fn sources(&self, ctx: &TaskContext<'_>) -> Result<Vec<SourceFile>> {
        let fs = ctx.fs();
        let mut sources = Vec::new();

        if let Some(file) = &self.source_file {
            let base = file.parent().map(PathBuf::from).unwrap_or_default();
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            sources.push(SourceFile::new(base, name));
        }
        for set in &self.source_sets {
            sources.extend(set.files(fs.as_ref())?);
        }
        for reference in &self.source_refs {
            let set = reference.downcast_ref::<FileSet>().ok_or_else(|| {
                ConfigError::ReferenceTypeMismatch {
                    id: reference.id.clone(),
                    expected: "FileSet".to_string(),
                    actual: reference.object.type_name().to_string(),
                }
            })?;
            sources.extend(set.files(fs.as_ref())?);
        }
        Ok(sources)
    }

    fn evaluate(&self, ctx: &TaskContext<'_>) -> Result<bool> {
        if self.source_file.is_none() && self.source_sets.is_empty() && self.source_refs.is_empty()
        {
            return Err(ConfigError::MissingAttribute {
                element: "uptodate".to_string(),
                attribute: "srcfile".to_string(),
            }
            .into());
        }
        let sources = self.sources(ctx)?;
        let fs = ctx.fs();

        match &self.mapper {
            Some(mapper) => {
                let compiled = mapper.compile()?;
                let root = self
                    .target_file
                    .clone()
                    .unwrap_or_else(|| ctx.project.base_dir().to_path_buf());
                Ok(is_up_to_date(
                    fs.as_ref(),
                    &root,
                    &sources,
                    Some(&compiled as &dyn NameMapper),
                )?)
            }
            None => {
                let target = self.target_file.as_ref().ok_or_else(|| {
                    ConfigError::MissingAttribute {
                        element: "uptodate".to_string(),
                        attribute: "targetfile".to_string(),
                    }
                })?;
                Ok(is_up_to_date(fs.as_ref(), target, &sources, None)?)
            }
        }
    }
}

impl Task for UpToDate {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let property = self
            .property
            .clone()
            .ok_or_else(|| ConfigError::MissingAttribute {
                element: "uptodate".to_string(),
                attribute: "property".to_string(),
            })?;

        if self.evaluate(ctx)? {
            let value = self.value.clone().unwrap_or_else(|| "true".to_string());
            debug!(property = %property, "Files are up to date");
            ctx.project.properties.set_new(property, value);
        } else {
            debug!(property = %property, "Files are out of date");
        }
        Ok(())
    }
}

impl Configurable for UpToDate {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("property", |u, v| u.property = Some(v))
            .string("value", |u, v| u.value = Some(v))
            .path("targetfile", |u, v| u.target_file = Some(v))
            .path("srcfile", |u, v| u.source_file = Some(v))
            .reference::<FileSet>("srcfilesref", |u, v| u.source_refs.push(v))
            .adder("srcfiles", |u, set: FileSet| u.source_sets.push(set))
            .creator("mapper", |u| u.mapper.get_or_insert_with(Mapper::default))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
