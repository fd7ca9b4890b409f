//! Task execution context
//!
//! A [`TaskContext`] is what a running task sees: its project, the target it
//! belongs to (if any) and the element it was declared by.

use crate::config::Element;
use crate::error::Result;
use crate::fs::FileSystem;
use crate::project::Project;
use std::any::Any;
use std::rc::Rc;

/// A configured build action
pub trait Task: Any {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()>;
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    #[default]
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Default `tracing` filter directive for this level
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Silent => "off",
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "debug",
        }
    }
}

/// State a task can reach while executing
pub struct TaskContext<'a> {
    pub project: &'a mut Project,
    target: Option<&'a str>,
    element: &'a Element,
}

impl<'a> TaskContext<'a> {
    pub fn new(project: &'a mut Project, target: Option<&'a str>, element: &'a Element) -> Self {
        TaskContext {
            project,
            target,
            element,
        }
    }

    /// Name of the owning target, `None` for top-level tasks
    pub fn target(&self) -> Option<&'a str> {
        self.target
    }

    /// The element that declared the running task
    pub fn element(&self) -> &'a Element {
        self.element
    }

    pub fn fs(&self) -> Rc<dyn FileSystem> {
        Rc::clone(&self.project.context().fs)
    }

    /// Configure and perform a nested element within the same target
    pub fn perform(&mut self, element: &Element) -> Result<()> {
        crate::runner::perform(self.project, self.target, element)
    }

    /// Print user-facing task output
    pub fn print(&self, message: &str) {
        if self.project.verbosity() >= Verbosity::Quiet {
            for line in message.lines() {
                println!("     [{}] {}", self.element.tag, line);
            }
            if message.is_empty() {
                println!("     [{}] ", self.element.tag);
            }
        }
    }
}
