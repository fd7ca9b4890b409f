//! The `call` task: run another target of this project as a sub-build

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, Result};
use crate::runner::{invoke, SubBuild, Task, TaskContext};
use std::path::PathBuf;

/// A property passed to the called target
#[derive(Debug, Clone, Default)]
pub struct Param {
    name: Option<String>,
    value: Option<String>,
    location: Option<PathBuf>,
}

impl Configurable for Param {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("name", |p, v| p.name = Some(v))
            .string("value", |p, v| p.value = Some(v))
            .path("location", |p, v| p.location = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// A reference forwarded to the called target, optionally renamed
#[derive(Debug, Clone, Default)]
pub struct ForwardedRef {
    id: Option<String>,
    to_id: Option<String>,
}

impl Configurable for ForwardedRef {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("ref", |r, v| r.id = Some(v))
            .string("toref", |r, v| r.to_id = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

#[derive(Debug)]
pub struct Call {
    target: Option<String>,
    inherit_all: bool,
    inherit_refs: bool,
    params: Vec<Param>,
    references: Vec<ForwardedRef>,
}

impl Default for Call {
    fn default() -> Self {
        Call {
            target: None,
            inherit_all: true,
            inherit_refs: false,
            params: Vec::new(),
            references: Vec::new(),
        }
    }
}

fn missing(element: &str, attribute: &str) -> ConfigError {
    ConfigError::MissingAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
    }
}

impl Call {
    fn request(&self) -> Result<SubBuild> {
        let target = self.target.clone().ok_or_else(|| missing("call", "target"))?;
        let mut request = SubBuild::new(target);
        request.inherit_all = self.inherit_all;
        request.inherit_refs = self.inherit_refs;

        for param in &self.params {
            let name = param.name.clone().ok_or_else(|| missing("param", "name"))?;
            let value = match (&param.value, &param.location) {
                (Some(value), _) => value.clone(),
                (None, Some(location)) => location.display().to_string(),
                (None, None) => return Err(missing("param", "value").into()),
            };
            request = request.param(name, value);
        }
        for reference in &self.references {
            let id = reference.id.clone().ok_or_else(|| missing("reference", "ref"))?;
            let to_id = reference.to_id.clone().unwrap_or_else(|| id.clone());
            request.references.push((id, to_id));
        }
        Ok(request)
    }
}

impl Task for Call {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let request = self.request()?;
        invoke(ctx, &request)
    }
}

impl Configurable for Call {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("target", |c, v| c.target = Some(v))
            .boolean("inheritall", |c, v| c.inherit_all = v)
            .boolean("inheritrefs", |c, v| c.inherit_refs = v)
            .adder("param", |c, p: Param| c.params.push(p))
            .adder("reference", |c, r: ForwardedRef| c.references.push(r))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
