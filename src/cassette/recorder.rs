//! Records interactions into a cassette file.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Collects interactions and writes them as a YAML cassette file.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    endpoint: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Create a new recorder that will write to the given path.
    pub fn new(
        path: impl Into<PathBuf>,
        name: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            endpoint: endpoint.into(),
            interactions: Vec::new(),
        }
    }

    /// Record an interaction. The `seq` field is assigned automatically.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Number of interactions recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Writes everything recorded so far, replacing the file on disk.
    ///
    /// Recording may continue afterwards; a later call rewrites the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self) -> Result<&Path, std::io::Error> {
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            endpoint: self.endpoint.clone(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;
        std::fs::write(&self.path, yaml)?;
        Ok(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_and_write() {
        let dir = std::env::temp_dir().join("taskdeck_cassette_recorder_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rows.cassette.yaml");

        let mut recorder = CassetteRecorder::new(&path, "rows", "memory");
        recorder.record("rows", "delete_task", json!({"id": "t-1"}), json!({"Ok": null}));
        recorder.record("rows", "delete_task", json!({"id": "t-2"}), json!({"Err": "gone"}));
        assert_eq!(recorder.write().unwrap(), path);

        recorder.record("clock", "now", json!(null), json!("2025-03-01T09:00:00Z"));
        recorder.write().unwrap();

        let cassette = Cassette::from_yaml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(cassette.endpoint, "memory");
        let seqs: Vec<u64> = cassette.interactions.iter().map(|i| i.seq).collect();
        assert_eq!(seqs, [0, 1, 2]);
        assert_eq!(cassette.interactions[2].port, "clock");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
