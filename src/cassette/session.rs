//! Recording session managing per-port cassette recorders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;

use super::config::{CLOCK_CASSETTE, ROWS_CASSETTE};
use super::recorder::CassetteRecorder;

/// Per-port recorders writing into one directory.
///
/// Each port gets its own cassette file so a replay can mix recorded ports
/// with fresh adapters.
pub struct RecordingSession {
    /// Recorder for clock interactions.
    pub clock: Arc<Mutex<CassetteRecorder>>,
    /// Recorder for row-store interactions.
    pub rows: Arc<Mutex<CassetteRecorder>>,
    output_dir: PathBuf,
}

impl RecordingSession {
    /// Starts a session writing into `dir`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn start(dir: &Path, endpoint: &str) -> Result<Self, String> {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create cassette directory {}: {e}", dir.display()))?;

        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let recorder = |file: &str, port: &str| {
            Arc::new(Mutex::new(CassetteRecorder::new(
                dir.join(file),
                format!("{stamp}-{port}"),
                endpoint,
            )))
        };

        Ok(Self {
            clock: recorder(CLOCK_CASSETTE, "clock"),
            rows: recorder(ROWS_CASSETTE, "rows"),
            output_dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the cassette files.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Writes every port's cassette with what has been recorded so far.
    ///
    /// # Errors
    ///
    /// Returns an error if any cassette file cannot be written.
    pub fn finish(&self) -> Result<&Path, String> {
        for (port, recorder) in [("clock", &self.clock), ("rows", &self.rows)] {
            recorder
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .write()
                .map_err(|e| format!("Failed to write {port} cassette: {e}"))?;
        }
        Ok(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_writes_one_cassette_per_port() {
        let dir = std::env::temp_dir().join("taskdeck_recording_session_test");
        let _ = std::fs::remove_dir_all(&dir);

        let session = RecordingSession::start(&dir, "memory").unwrap();
        session.rows.lock().unwrap().record("rows", "delete_task", json!({}), json!({"Ok": null}));
        assert_eq!(session.finish().unwrap(), dir);

        assert!(dir.join(CLOCK_CASSETTE).exists());
        assert!(dir.join(ROWS_CASSETTE).exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
