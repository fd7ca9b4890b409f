//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, logging setup, shell
//! completion and the build summary.

pub mod app;

// Re-export main types
pub use app::*;
