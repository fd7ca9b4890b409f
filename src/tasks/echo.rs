//! The `echo` and `fail` tasks

use crate::binder::{Configurable, Constructor, SchemaBuilder};
use crate::error::{ExecutionError, Result};
use crate::fs::FileSystem;
use crate::project::Slot;
use crate::runner::{condition_holds, Task, TaskContext};
use std::path::PathBuf;

/// Where a message comes from
#[derive(Debug, Clone)]
enum Message {
    Literal(String),
    /// Read when the task runs
    Live(Slot),
}

impl Message {
    fn render(&self) -> String {
        match self {
            Message::Literal(text) => text.clone(),
            Message::Live(slot) => slot.get().unwrap_or_default(),
        }
    }
}

/// Prints a message or writes it to a file
#[derive(Debug, Default)]
pub struct Echo {
    message: Option<Message>,
    text: String,
    file: Option<PathBuf>,
    append: bool,
}

impl Echo {
    fn message(&self) -> String {
        match &self.message {
            Some(message) => message.render(),
            None => self.text.clone(),
        }
    }
}

impl Task for Echo {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        let message = self.message();
        let Some(file) = &self.file else {
            ctx.print(&message);
            return Ok(());
        };

        let fs = ctx.fs();
        let line = format!("{}\n", message);
        let result = if self.append {
            fs.append(file, &line)
        } else {
            fs.write(file, &line)
        };
        result.map_err(|e| {
            ExecutionError::File {
                path: file.clone(),
                error: e.to_string(),
            }
            .into()
        })
    }
}

impl Configurable for Echo {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("message", |e, v| e.message = Some(Message::Literal(v)))
            .slot("message", |e, slot| e.message = Some(Message::Live(slot)))
            .path("file", |e, v| e.file = Some(v))
            .boolean("append", |e, v| e.append = v)
            .text(|e, text| e.text.push_str(&text))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}

/// Stops the build with a message
#[derive(Debug, Default)]
pub struct Fail {
    message: Option<String>,
    text: String,
    if_condition: Option<String>,
    unless_condition: Option<String>,
}

impl Task for Fail {
    fn execute(&mut self, ctx: &mut TaskContext<'_>) -> Result<()> {
        if let Some(condition) = &self.if_condition {
            if !condition_holds(ctx.project, condition) {
                return Ok(());
            }
        }
        if let Some(condition) = &self.unless_condition {
            if condition_holds(ctx.project, condition) {
                return Ok(());
            }
        }

        let message = match &self.message {
            Some(message) => message.clone(),
            None if !self.text.trim().is_empty() => self.text.trim().to_string(),
            None => "No message".to_string(),
        };
        Err(ExecutionError::Failed(message).into())
    }
}

impl Configurable for Fail {
    fn describe(schema: SchemaBuilder<Self>) -> SchemaBuilder<Self> {
        schema
            .string("message", |f, v| f.message = Some(v))
            .string("if", |f, v| f.if_condition = Some(v))
            .string("unless", |f, v| f.unless_condition = Some(v))
            .text(|f, text| f.text.push_str(&text))
    }

    fn constructor() -> Constructor<Self> {
        Constructor::Default(Self::default)
    }
}
