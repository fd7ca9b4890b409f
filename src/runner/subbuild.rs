//! Sub-build delegation
//!
//! Runs a target of the current project inside a derived project, with
//! controlled property and reference inheritance.

use crate::binder::Configurator;
use crate::error::{RantError, Result};
use crate::runner::context::TaskContext;
use crate::runner::executor::Executor;
use tracing::{info, warn};

/// A request to run a target in a derived project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBuild {
    pub target: String,

    /// Copy every property of the caller
    pub inherit_all: bool,

    /// Share every reference of the caller
    pub inherit_refs: bool,

    /// Call-time property overrides
    pub params: Vec<(String, String)>,

    /// References forwarded individually, as `(id, id in the sub-build)`
    pub references: Vec<(String, String)>,
}

impl SubBuild {
    pub fn new(target: impl Into<String>) -> Self {
        SubBuild {
            target: target.into(),
            inherit_all: true,
            inherit_refs: false,
            params: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// Run the requested target in a project derived from the caller's
///
/// Without an owning target this only warns. Any failure inside the
/// sub-build fails the caller.
pub fn invoke(ctx: &mut TaskContext<'_>, request: &SubBuild) -> Result<()> {
    if ctx.target().is_none() {
        warn!(
            target = %request.target,
            location = %ctx.element().location,
            "Sub-build requested outside of a target, ignoring"
        );
        return Ok(());
    }

    let mut child = ctx
        .project
        .derive(request.inherit_all, request.inherit_refs);
    for (name, value) in &request.params {
        child.properties.set_user(name.clone(), value.clone());
    }
    for (id, to_id) in &request.references {
        let object = Configurator::new(ctx.project).resolve_reference(id)?;
        child.references.insert(to_id.clone(), object);
    }

    info!(target = %request.target, inherit_all = request.inherit_all, "Entering sub-build");
    Executor::new(&mut child)
        .run(std::slice::from_ref(&request.target))
        .map(|_| ())
        .map_err(|err| RantError::SubBuild {
            target: request.target.clone(),
            source: Box::new(err),
        })
}
