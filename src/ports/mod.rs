//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the task list core and an
//! external system (time, the hosted row-store, its auth service, the local
//! filesystem). Implementations live in `src/adapters/`.

pub mod auth;
pub mod clock;
pub mod filesystem;
pub mod row_store;

pub use auth::{AuthFuture, AuthService, AuthUser, Session, SignUpOutcome};
pub use clock::{Clock, DayBounds, LocalZone};
pub use filesystem::FileSystem;
pub use row_store::{
    ChangeEvent, ChangeFeed, ChangeKind, DueOrder, RowStore, StoreFuture, TaskQuery,
};
