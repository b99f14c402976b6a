//! Port implementations.
//!
//! - [`live`]: the hosted backend over HTTP, the real disk and clock.
//! - [`memory`]: in-process stand-ins with the same contracts.
//! - [`recording`]: wrappers that write every call to a cassette.
//! - [`replaying`]: adapters that answer from a cassette.

pub mod live;
pub mod memory;
pub mod recording;
pub mod replaying;
