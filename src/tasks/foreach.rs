//! The `foreach` task
//!
//! Runs its nested tasks once per value. The current value lives in a slot
//! that nested attributes read with `@{name}`.

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::config::Element;
use crate::error::{ConfigError, Result};
use crate::project::Slot;
use crate::runner::{Task, TaskContext};
use crate::types::FileSet;
use tracing::debug;

#[derive(Debug)]
pub struct ForEach {
    slot: Option<String>,
    list: Option<String>,
    delimiter: String,
    filesets: Vec<FileSet>,
    tasks: Vec<Element>,
}

impl Default for ForEach {
    fn default() -> Self {
        ForEach {
            slot: None,
            list: None,
            delimiter: ",".to_string(),
            filesets: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

impl ForEach {
    fn values(&self, ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        let mut values = Vec::new();
        if let Some(list) = &self.list {
            values.extend(
                list.split(self.delimiter.as_str())
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
        }
        let fs = ctx.fs();
        for set in &self.filesets {
            for file in set.files(fs.as_ref())? {
                values.push(file.path().display().to_string());
            }
        }
        Ok(values)
    }

    fn run_all(&self, ctx: &mut TaskContext<'_>, slot: &Slot, values: Vec<String>) -> Result<()> {
        for value in values {
            debug!(value = %value, "foreach iteration");
            slot.set(Some(value));
            for task in &self.tasks {
                ctx.perform(task)?;
            }
        }
        Ok(())
    }
}

impl Task for ForEach {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let name = self.slot.clone().ok_or_else(|| ConfigError::MissingAttribute {
            element: "foreach".to_string(),
            attribute: "slot".to_string(),
        })?;
        let values = self.values(ctx)?;

        let slot = Slot::new();
        let previous = ctx.project.references.define_slot(name.clone(), slot.clone());
        let result = self.run_all(ctx, &slot, values);
        ctx.project.references.restore_slot(&name, previous);
        result
    }
}

impl Configurable for ForEach {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("slot", |f, v| f.slot = Some(v))
            .string("list", |f, v| f.list = Some(v))
            .string("delimiter", |f, v| f.delimiter = v)
            .adder("fileset", |f, set: FileSet| f.filesets.push(set))
            .container(|f, task| f.tasks.push(task))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
