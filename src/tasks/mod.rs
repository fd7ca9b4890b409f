//! Built-in tasks
//!
//! Every task is an ordinary [`Configurable`](crate::binder::Configurable)
//! type that also implements [`Task`](crate::runner::Task). Further tasks are
//! registered the same way through
//! [`TypeTable::register_task`](crate::project::TypeTable::register_task).

pub mod call;
pub mod echo;
pub mod exec;
pub mod files;
pub mod foreach;
pub mod property;
pub mod uptodate;

pub use call::*;
pub use echo::*;
pub use exec::*;
pub use files::*;
pub use foreach::*;
pub use property::*;
pub use uptodate::*;

use crate::project::{task_definition, TypeDefinition};

pub(crate) fn builtin_definitions() -> Vec<TypeDefinition> {
    vec![
        task_definition::<PropertyTask>("property"),
        task_definition::<Echo>("echo"),
        task_definition::<Fail>("fail"),
        task_definition::<Exec>("exec"),
        task_definition::<Delete>("delete"),
        task_definition::<Touch>("touch"),
        task_definition::<Mkdir>("mkdir"),
        task_definition::<UpToDate>("uptodate"),
        task_definition::<Call>("call"),
        task_definition::<ForEach>("foreach"),
    ]
}
