//! Built-in data types
//!
//! Data types are configured like tasks but never executed. Declared with an
//! `id` they can be shared through `refid` and reference attributes.

pub mod fileset;
pub mod mapper;
pub mod path;

pub use fileset::*;
pub use mapper::*;
pub use path::*;

use crate::project::{type_definition, TypeDefinition};

pub(crate) fn builtin_definitions() -> Vec<TypeDefinition> {
    vec![
        type_definition::<FileSet>("fileset"),
        type_definition::<PathList>("path"),
        type_definition::<Mapper>("mapper"),
    ]
}
