//! Cassette configuration for composable per-port replay.

use std::path::{Path, PathBuf};

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// File name of the clock cassette inside a recording directory.
pub const CLOCK_CASSETTE: &str = "clock.cassette.yaml";
/// File name of the row-store cassette inside a recording directory.
pub const ROWS_CASSETTE: &str = "rows.cassette.yaml";

/// Per-port cassette file paths. Ports without a cassette fall back to
/// an adapter that panics when called during replay.
#[derive(Debug, Clone, Default)]
pub struct CassetteConfig {
    /// Path to the clock port cassette file.
    pub clock: Option<PathBuf>,
    /// Path to the row-store port cassette file.
    pub rows: Option<PathBuf>,
}

/// Per-port replayers, each with its own interaction stream.
pub struct PortReplayers {
    /// Replayer for the clock port.
    pub clock: Option<CassetteReplayer>,
    /// Replayer for the row-store port.
    pub rows: Option<CassetteReplayer>,
}

impl CassetteConfig {
    /// Picks up whichever per-port cassettes a recording session left in `dir`.
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        let existing = |name: &str| Some(dir.join(name)).filter(|path| path.exists());
        Self { clock: existing(CLOCK_CASSETTE), rows: existing(ROWS_CASSETTE) }
    }

    /// Load one cassette file and create a replayer over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<CassetteReplayer, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette = Cassette::from_yaml(&content)
            .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))?;
        Ok(CassetteReplayer::new(&cassette))
    }

    /// Load all configured per-port cassette files and create replayers.
    ///
    /// # Errors
    ///
    /// Returns an error if any configured cassette file cannot be read or parsed.
    pub fn load_all(&self) -> Result<PortReplayers, String> {
        Ok(PortReplayers {
            clock: self.clock.as_deref().map(Self::load).transpose()?,
            rows: self.rows.as_deref().map(Self::load).transpose()?,
        })
    }
}
