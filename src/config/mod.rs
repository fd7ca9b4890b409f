//! Project file parsing and validation
//!
//! This module loads `build.yml` files into the generic element tree and
//! checks a loaded project before anything runs.

pub mod element;
pub mod parse;
pub mod validate;

// Re-export main types
pub use element::*;
pub use parse::*;
pub use validate::*;
