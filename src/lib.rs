//! Rant - a declarative, target-based build engine
//!
//! A project file declares properties, shared data types and named targets
//! made of tasks. Rant binds each declared element to a typed object, orders
//! targets by their dependencies and runs them, and can delegate a target to
//! a sub-build with controlled inheritance.

// Public modules
pub mod binder;
pub mod cli;
pub mod config;
pub mod error;
pub mod fs;
pub mod project;
pub mod runner;
pub mod tasks;
pub mod types;

// Re-export commonly used types
pub use error::{RantError, Result};
pub use project::{BuildContext, BuildOptions, Project};
pub use runner::{run_build, BuildOutcome};

/// Current version of Rant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
