//! In-memory adapters.
//!
//! They honor the same contracts as the live adapters, including change
//! notification, and let tests script clock readings and backend failures.

pub mod auth;
pub mod clock;
pub mod filesystem;
pub mod row_store;

pub use auth::MemoryAuthService;
pub use clock::ManualClock;
pub use filesystem::MemoryFileSystem;
pub use row_store::{MemoryRowStore, WriteGate};
