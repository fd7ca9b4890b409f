//! Task and type registrations
//!
//! Maps element tags to the concrete types the configurator instantiates.

use crate::binder::{construct, discover_schema, short_type_name, Binder, Configurable, Schema};
use crate::error::{ConfigError, ConfigResult};
use crate::project::references::clone_any;
use crate::project::Project;
use crate::runner::Task;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

/// What a registered element does when it is performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Executed by the target that declares it
    Task,
    /// Configured and, when it carries an `id`, registered for reference
    DataType,
}

/// A registered element type
#[derive(Clone)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub construct: fn(&Project) -> Option<Box<dyn Any>>,
    pub discover: fn(&Binder) -> ConfigResult<Rc<Schema>>,
    pub as_task: fn(&mut dyn Any) -> Option<&mut dyn Task>,
    pub clone_fn: Option<fn(&dyn Any) -> Option<Box<dyn Any>>>,
}

fn task_of<T: Task>(object: &mut dyn Any) -> Option<&mut dyn Task> {
    object.downcast_mut::<T>().map(|task| task as &mut dyn Task)
}

fn not_a_task(_object: &mut dyn Any) -> Option<&mut dyn Task> {
    None
}

/// Definition of a task type
pub fn task_definition<T: Task + Configurable>(name: &str) -> TypeDefinition {
    TypeDefinition {
        name: name.to_string(),
        kind: TypeKind::Task,
        type_id: TypeId::of::<T>(),
        type_name: short_type_name::<T>(),
        construct: construct::<T>,
        discover: discover_schema::<T>,
        as_task: task_of::<T>,
        clone_fn: None,
    }
}

/// Definition of a data type; data types can be shared through references
pub fn type_definition<T: Configurable + Clone>(name: &str) -> TypeDefinition {
    TypeDefinition {
        name: name.to_string(),
        kind: TypeKind::DataType,
        type_id: TypeId::of::<T>(),
        type_name: short_type_name::<T>(),
        construct: construct::<T>,
        discover: discover_schema::<T>,
        as_task: not_a_task,
        clone_fn: Some(clone_any::<T>),
    }
}

#[derive(Clone, Default)]
pub struct TypeTable {
    definitions: HashMap<String, TypeDefinition>,
}

impl TypeTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// A table holding the built-in tasks and types
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        let builtins = crate::tasks::builtin_definitions()
            .into_iter()
            .chain(crate::types::builtin_definitions());
        for definition in builtins {
            table
                .definitions
                .insert(definition.name.to_ascii_lowercase(), definition);
        }
        table
    }

    /// Add a definition; names are unique regardless of case
    pub fn register(&mut self, definition: TypeDefinition) -> ConfigResult<()> {
        let key = definition.name.to_ascii_lowercase();
        if self.definitions.contains_key(&key) {
            return Err(ConfigError::DuplicateType(definition.name));
        }
        self.definitions.insert(key, definition);
        Ok(())
    }

    pub fn register_task<T: Task + Configurable>(&mut self, name: &str) -> ConfigResult<()> {
        self.register(task_definition::<T>(name))
    }

    pub fn register_type<T: Configurable + Clone>(&mut self, name: &str) -> ConfigResult<()> {
        self.register(type_definition::<T>(name))
    }

    /// Look up a tag (case-insensitive)
    pub fn get(&self, tag: &str) -> Option<&TypeDefinition> {
        self.definitions.get(&tag.to_ascii_lowercase())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    /// Registered names of one kind, sorted
    pub fn names(&self, kind: TypeKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .definitions
            .values()
            .filter(|d| d.kind == kind)
            .map(|d| d.name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}
