//! Adapters talking to the real backend, disk and clock.

pub mod auth;
pub mod clock;
pub mod filesystem;
pub mod poller;
pub mod rest;
pub mod row_store;

pub use auth::LiveAuthService;
pub use clock::SystemClock;
pub use filesystem::LiveFileSystem;
pub use rest::RestClient;
pub use row_store::LiveRowStore;
