//! Cassettes: YAML recordings of port interactions, replayed in tests.

pub mod config;
pub mod format;
pub mod recorder;
pub mod replayer;
pub mod session;
