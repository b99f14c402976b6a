//! Tracing subscriber setup for the CLI.

use std::io::IsTerminal;

use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a log filter; `RUST_LOG` is consulted after it.
pub const LOG_ENV: &str = "TASKDECK_LOG";

/// Default filter directive for the given `-v` / `-q` counts.
#[must_use]
pub fn default_level(verbose: u8, quiet: u8) -> &'static str {
    match (verbose, quiet) {
        (_, q) if q >= 2 => "error",
        (_, 1) | (0, _) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    }
}

/// Installs a stderr `fmt` subscriber.
///
/// The filter comes from `TASKDECK_LOG`, then `RUST_LOG`, then the level
/// implied by `verbose` and `quiet`. Installing twice is harmless.
///
/// # Errors
///
/// Returns an error if the fallback filter directive is invalid.
pub fn init_tracing(verbose: u8, quiet: u8) -> Result<(), String> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new(default_level(verbose, quiet)))
        .map_err(|e| format!("invalid log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_levels() {
        assert_eq!(default_level(0, 0), "warn");
        assert_eq!(default_level(1, 0), "info");
        assert_eq!(default_level(2, 0), "debug");
        assert_eq!(default_level(5, 0), "trace");
        assert_eq!(default_level(3, 1), "warn");
        assert_eq!(default_level(0, 2), "error");
    }

    #[test]
    fn init_twice_is_ok() {
        assert!(init_tracing(0, 0).is_ok());
        assert!(init_tracing(2, 0).is_ok());
    }
}
