//! Build execution
//!
//! This module orders targets, runs their tasks, and provides the primitives
//! tasks build on: failure policies, freshness checks, sub-builds and
//! process execution.

pub mod command;
pub mod context;
pub mod executor;
pub mod graph;
pub mod policy;
pub mod subbuild;
pub mod uptodate;

// Re-export main types
pub use command::*;
pub use context::*;
pub use executor::*;
pub use graph::*;
pub use policy::*;
pub use subbuild::*;
pub use uptodate::*;
