//! Task list synchronization, filtering and editing.

pub mod due;
pub mod editor;
pub mod filter;
pub mod notice;
pub mod store;

pub use editor::{TaskEditor, TaskForm};
pub use filter::{DateFilter, FilterChange, FilterState};
pub use notice::{Action, Notice, Variant};
pub use store::{FetchOutcome, MountedList, TaskStore};
