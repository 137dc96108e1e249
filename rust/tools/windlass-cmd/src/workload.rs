//! Workload file model for windlass-cmd.
//!
//! A workload is a JSON document describing synthetic tasks: each entry
//! carries an identifier, an amount of simulated work, and whether the
//! entry should fail when executed.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use windlass::codec::{Codec, JsonCodec};

/// One synthetic task in a workload file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadEntry {
    pub id: u64,

    /// Microseconds of simulated work performed when the entry runs.
    #[serde(default)]
    pub busy_us: u64,

    /// The entry fails with an error when executed.
    #[serde(default)]
    pub fail: bool,
}

/// A parsed workload file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub entries: Vec<WorkloadEntry>,
}

impl Workload {
    /// Reads and parses a workload file.
    pub fn load(path: impl AsRef<Path>) -> Result<Workload> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read workload file: {}", path.display()))?;
        let workload: Workload = JsonCodec
            .decode(&bytes)
            .with_context(|| format!("Failed to parse workload file: {}", path.display()))?;
        Ok(workload)
    }

    pub fn failing_count(&self) -> usize {
        self.entries.iter().filter(|e| e.fail).count()
    }

    /// Total simulated work across all entries.
    pub fn total_busy(&self) -> Duration {
        Duration::from_micros(self.entries.iter().map(|e| e.busy_us).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_defaults_apply_to_sparse_json() {
        let workload: Workload =
            serde_json::from_str(r#"{"entries": [{"id": 1}, {"id": 2, "fail": true}]}"#).unwrap();
        assert_eq!(workload.entries.len(), 2);
        assert_eq!(workload.entries[0].busy_us, 0);
        assert!(!workload.entries[0].fail);
        assert!(workload.entries[1].fail);
        assert_eq!(workload.failing_count(), 1);
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workload.json");

        let workload = Workload {
            entries: vec![
                WorkloadEntry {
                    id: 0,
                    busy_us: 150,
                    fail: false,
                },
                WorkloadEntry {
                    id: 1,
                    busy_us: 250,
                    fail: true,
                },
            ],
        };
        fs::write(&path, serde_json::to_string_pretty(&workload).unwrap()).unwrap();

        let loaded = Workload::load(&path).unwrap();
        assert_eq!(loaded, workload);
        assert_eq!(loaded.total_busy(), Duration::from_micros(400));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "not a workload").unwrap();

        let err = Workload::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse workload file"));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workload::load(dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read workload file"));
    }
}
