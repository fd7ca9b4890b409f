//! File tasks: `delete`, `touch` and `mkdir`

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ConfigError, ExecutionError, Result};
use crate::fs::FileSystem;
use crate::runner::{ErrorPolicy, Task, TaskContext};
use crate::types::FileSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Deletes files, directories and file set contents
#[derive(Debug)]
pub struct Delete {
    file: Option<PathBuf>,
    dir: Option<PathBuf>,
    filesets: Vec<FileSet>,
    policy: ErrorPolicy,
}

impl Default for Delete {
    fn default() -> Self {
        Delete {
            file: None,
            dir: None,
            filesets: Vec::new(),
            policy: ErrorPolicy::fail_fast(),
        }
    }
}

impl Delete {
    fn delete_all(&self, fs: &dyn FileSystem) -> Result<usize> {
        let mut deleted = 0;

        if let Some(file) = &self.file {
            if fs.exists(file) {
                if fs.is_dir(file) {
                    return Err(delete_error(file, "is a directory, use dir"));
                }
                fs.remove_file(file)
                    .map_err(|e| delete_error(file, &e.to_string()))?;
                deleted += 1;
            } else {
                debug!(file = %file.display(), "Nothing to delete");
            }
        }

        for set in &self.filesets {
            for source in set.files(fs)? {
                let path = source.path();
                fs.remove_file(&path)
                    .map_err(|e| delete_error(&path, &e.to_string()))?;
                deleted += 1;
            }
        }

        if let Some(dir) = &self.dir {
            if fs.is_dir(dir) {
                fs.remove_dir_all(dir)
                    .map_err(|e| delete_error(dir, &e.to_string()))?;
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

fn delete_error(path: &Path, error: &str) -> crate::error::RantError {
    ExecutionError::Delete {
        path: path.to_path_buf(),
        error: error.to_string(),
    }
    .into()
}

impl Task for Delete {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        if self.file.is_none() && self.dir.is_none() && self.filesets.is_empty() {
            return Err(ConfigError::MissingAttribute {
                element: "delete".to_string(),
                attribute: "file".to_string(),
            }
            .into());
        }

        let fs = ctx.fs();
        let result = self.delete_all(fs.as_ref()).map(|deleted| {
            debug!(deleted, "Deleted files");
        });
        self.policy.handle(ctx, result)
    }
}

impl Configurable for Delete {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .path("file", |d, v| d.file = Some(v))
            .path("dir", |d, v| d.dir = Some(v))
            .boolean("failonerror", |d, v| d.policy.fail_on_error = v)
            .boolean("quiet", |d, v| d.policy.quiet = v)
            .string("errorproperty", |d, v| d.policy.error_property = Some(v))
            .adder("fileset", |d, set: FileSet| d.filesets.push(set))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// Timestamp for an explicit `millis` value
fn stamp(millis: i64) -> Result<SystemTime> {
    let invalid = |error: String| ConfigError::InvalidValue {
        element: "touch".to_string(),
        attribute: "millis".to_string(),
        error,
    };
    let offset = u64::try_from(millis)
        .map_err(|_| invalid(format!("{} is before the epoch", millis)))?;
    SystemTime::UNIX_EPOCH
        .checked_add(Duration::from_millis(offset))
        .ok_or_else(|| invalid(format!("{} is out of range", millis)).into())
}

/// Creates a file or updates its modification time
#[derive(Debug, Default)]
pub struct Touch {
    file: Option<PathBuf>,
    millis: Option<i64>,
}

impl Task for Touch {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let file = self.file.as_ref().ok_or_else(|| ConfigError::MissingAttribute {
            element: "touch".to_string(),
            attribute: "file".to_string(),
        })?;

        let fs = ctx.fs();
        let time = match self.millis {
            Some(millis) => stamp(millis)?,
            None => fs.now(),
        };

        if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs.create_dir_all(parent).map_err(|e| ExecutionError::File {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }
        fs.touch(file, time).map_err(|e| {
            ExecutionError::File {
                path: file.clone(),
                error: e.to_string(),
            }
            .into()
        })
    }
}

impl Configurable for Touch {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .path("file", |t, v| t.file = Some(v))
            .integer("millis", |t, v| t.millis = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// Creates a directory and its parents
#[derive(Debug, Default)]
pub struct Mkdir {
    dir: Option<PathBuf>,
}

impl Task for Mkdir {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let dir = self.dir.as_ref().ok_or_else(|| ConfigError::MissingAttribute {
            element: "mkdir".to_string(),
            attribute: "dir".to_string(),
        })?;

        let fs = ctx.fs();
        if fs.exists(dir) && !fs.is_dir(dir) {
            return Err(ExecutionError::File {
                path: dir.clone(),
                error: "exists and is not a directory".to_string(),
            }
            .into());
        }
        fs.create_dir_all(dir).map_err(|e| {
            ExecutionError::File {
                path: dir.clone(),
                error: e.to_string(),
            }
            .into()
        })
    }
}

impl Configurable for Mkdir {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema.path("dir", |m, v| m.dir = Some(v))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
