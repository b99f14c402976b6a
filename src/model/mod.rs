//! Domain types for tasks and profiles.
//!
//! These mirror the rows of the `tasks` and `profiles` relations and are
//! serialized directly as request and response bodies by the adapters.

mod profile;
mod status;
mod task;

pub use profile::{initials, Profile};
pub use status::{ParseEnumError, Priority, TaskStatus};
pub use task::{NewTask, Task, TaskChanges, TaskId};
