//! Task failure policy

use crate::error::Result;
use crate::runner::context::TaskContext;
use tracing::{debug, warn};

/// How a task reports its own runtime failures
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// Swallow failures without a warning or property side effect
    pub quiet: bool,
    /// Abort the build on failure
    pub fail_on_error: bool,
    /// Property set to `true` when a failure is reported and the build continues
    pub error_property: Option<String>,
}

impl ErrorPolicy {
    /// A policy that aborts on any failure
    pub fn fail_fast() -> Self {
        ErrorPolicy {
            fail_on_error: true,
            ..Default::default()
        }
    }

    /// Apply the policy to a task result
    ///
    /// Projects running a sub-build always propagate. Otherwise `quiet`
    /// takes precedence over `fail_on_error`.
    pub fn handle(&self, ctx: &mut TaskContext<'_>, result: Result<()>) -> Result<()> {
        let err = match result {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        if ctx.project.halts_on_failure() {
            return Err(err);
        }

        let task = &ctx.element().tag;
        if self.quiet {
            debug!(task = %task, error = %err, "Ignoring task failure");
            return Ok(());
        }
        if self.fail_on_error {
            return Err(err);
        }

        warn!(task = %task, location = %ctx.element().location, error = %err, "Task failed, continuing");
        if let Some(property) = &self.error_property {
            ctx.project.properties.set_new(property.clone(), "true");
        }
        Ok(())
    }
}
