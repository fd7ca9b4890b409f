//! Error types for Rant

use crate::config::Location;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Rant operations
pub type Result<T> = std::result::Result<T, RantError>;

/// Main error type for Rant
#[derive(Error, Debug)]
pub enum RantError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An error raised while handling a declared element
    #[error("{location}: {source}")]
    Located {
        location: Location,
        #[source]
        source: Box<RantError>,
    },

    /// A task failed inside a target
    #[error("{location}: task <{task}> failed{suffix}: {source}", suffix = target_suffix(.target))]
    TaskFailed {
        target: Option<String>,
        task: String,
        location: Location,
        #[source]
        source: Box<RantError>,
    },

    /// A delegated sub-build failed
    #[error("Sub-build of target '{target}' failed: {source}")]
    SubBuild {
        target: String,
        #[source]
        source: Box<RantError>,
    },
}

fn target_suffix(target: &Option<String>) -> String {
    match target {
        Some(name) => format!(" in target '{}'", name),
        None => String::new(),
    }
}

/// Configuration, binding and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find project file (searched: {0})")]
    NotFound(String),

    #[error("Invalid project file: {0}")]
    Invalid(String),

    #[error("Failed to read property file '{path}': {error}")]
    PropertyFile { path: PathBuf, error: String },

    #[error("Element <{0}> is not a registered task or type")]
    UnknownElement(String),

    #[error("Type '{0}' is already registered")]
    DuplicateType(String),

    #[error("<{element}> doesn't support the \"{attribute}\" attribute")]
    UnsupportedAttribute { element: String, attribute: String },

    #[error("<{element}> doesn't support the nested \"{child}\" element")]
    UnsupportedElement { element: String, child: String },

    #[error("<{0}> doesn't support nested text data")]
    UnsupportedText(String),

    #[error("<{element}> attribute \"{attribute}\": '{value}' is not a valid boolean (expected true/false, yes/no, on/off)")]
    InvalidBoolean {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("<{element}> attribute \"{attribute}\": '{value}' is not a valid integer")]
    InvalidInteger {
        element: String,
        attribute: String,
        value: String,
    },

    #[error("<{element}> attribute \"{attribute}\": {error}")]
    InvalidValue {
        element: String,
        attribute: String,
        error: String,
    },

    #[error("<{element}> attribute \"{attribute}\" is not supported as dynamic")]
    NotDynamic { element: String, attribute: String },

    #[error("Slot '{0}' is not defined")]
    UnknownSlot(String),

    #[error("Type '{type_name}' declares \"{name}\" more than once")]
    AmbiguousBinding { type_name: String, name: String },

    #[error("Type '{type_name}' adds nested \"{child}\" of type '{child_type}', which cannot be constructed")]
    UnconstructibleAdder {
        type_name: String,
        child: String,
        child_type: String,
    },

    #[error("Type '{0}' cannot be constructed")]
    Unconstructible(String),

    #[error("<{0}> has too many attributes: refid must be used on its own")]
    TooManyAttributes(String),

    #[error("Reference '{0}' not found")]
    ReferenceNotFound(String),

    #[error("Reference '{id}' is a {actual}, expected {expected}")]
    ReferenceTypeMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Circular reference detected: {0}")]
    CircularReference(String),

    #[error("<{element}> requires the \"{attribute}\" attribute")]
    MissingAttribute { element: String, attribute: String },

    #[error("Target '{0}' does not exist in the project")]
    TargetNotFound(String),

    #[error("Duplicate target '{0}'")]
    DuplicateTarget(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Source file '{0}' does not exist")]
    MissingSource(PathBuf),
}

/// Runtime task errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {0:?}")]
    CommandFailed(Option<i32>),

    #[error("Failed to start '{program}': {error}")]
    Spawn { program: String, error: String },

    #[error("{0}")]
    Failed(String),

    #[error("Unable to delete '{path}': {error}")]
    Delete { path: PathBuf, error: String },

    #[error("{path}: {error}")]
    File { path: PathBuf, error: String },
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

impl RantError {
    /// Attach a source location, unless the error already carries one
    pub fn at(self, location: &Location) -> RantError {
        match self {
            err @ (RantError::Located { .. } | RantError::TaskFailed { .. }) => err,
            err => RantError::Located {
                location: location.clone(),
                source: Box::new(err),
            },
        }
    }

    /// Strip location, task and sub-build wrappers
    pub fn root(&self) -> &RantError {
        match self {
            RantError::Located { source, .. }
            | RantError::TaskFailed { source, .. }
            | RantError::SubBuild { source, .. } => source.root(),
            err => err,
        }
    }

    /// Configuration error at the root of this error, if any
    pub fn as_config(&self) -> Option<&ConfigError> {
        match self.root() {
            RantError::Config(err) => Some(err),
            _ => None,
        }
    }
}
