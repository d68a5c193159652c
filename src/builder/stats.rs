//! Generation telemetry.
//!
//! The caller injects a [`StatsRecorder`]; the generator appends records to
//! it from any thread. Records serialize to a stable JSON shape, one object
//! per line for [`JsonLinesStats`].
//!
//! # Record Types
//!
//! - `tool-version`: CMake version detected for a variant
//! - `strategy-chosen`: strategy picked for a variant
//! - `abi-outcome`: result of generating one ABI

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::strategy::GenerationStrategy;

/// One telemetry record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StatsRecord {
    /// The tool version used for a variant.
    ToolVersion { variant: String, version: String },

    /// The strategy selected for a variant.
    StrategyChosen {
        variant: String,
        strategy: GenerationStrategy,
    },

    /// Outcome of generating one ABI.
    AbiOutcome {
        variant: String,
        abi: String,
        success: bool,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        error: Option<String>,
    },
}

impl StatsRecord {
    /// Serialize this record to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Append-only sink for telemetry records.
pub trait StatsRecorder: Send + Sync {
    fn record(&self, record: StatsRecord);
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryStats {
    records: Mutex<Vec<StatsRecord>>,
}

impl MemoryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<StatsRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Outcomes recorded for `abi`.
    pub fn outcomes_for(&self, abi: &str) -> Vec<StatsRecord> {
        self.records()
            .into_iter()
            .filter(|r| matches!(r, StatsRecord::AbiOutcome { abi: a, .. } if a == abi))
            .collect()
    }
}

impl StatsRecorder for MemoryStats {
    fn record(&self, record: StatsRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesStats {
    file: Mutex<File>,
}

impl JsonLinesStats {
    /// Open `path` for appending, creating it and its parent if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            crate::util::fs::ensure_dir(parent).with_context(|| {
                format!("failed to create directory: {}", parent.display())
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open stats file: {}", path.display()))?;

        Ok(JsonLinesStats {
            file: Mutex::new(file),
        })
    }
}

impl StatsRecorder for JsonLinesStats {
    fn record(&self, record: StatsRecord) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(file, "{}", record.to_json()) {
            tracing::warn!("failed to write stats record: {}", e);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStats;

impl StatsRecorder for NoopStats {
    fn record(&self, _record: StatsRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_outcome_serialization() {
        let record = StatsRecord::AbiOutcome {
            variant: "debug".to_string(),
            abi: "arm64-v8a".to_string(),
            success: false,
            duration_ms: 1520,
            error: Some("CMake exited with code 1".to_string()),
        };
        let json = record.to_json();
        assert!(json.contains("\"kind\":\"abi-outcome\""));
        assert!(json.contains("\"abi\":\"arm64-v8a\""));
        assert!(json.contains("\"duration_ms\":1520"));
        assert!(json.contains("exited with code 1"));
    }

    #[test]
    fn test_success_omits_error() {
        let record = StatsRecord::AbiOutcome {
            variant: "debug".to_string(),
            abi: "x86".to_string(),
            success: true,
            duration_ms: 3,
            error: None,
        };
        assert!(!record.to_json().contains("error"));
    }

    #[test]
    fn test_strategy_serialization() {
        let record = StatsRecord::StrategyChosen {
            variant: "debug".to_string(),
            strategy: GenerationStrategy::LegacyDirect,
        };
        let json = record.to_json();
        assert!(json.contains("\"kind\":\"strategy-chosen\""));
        assert!(json.contains("\"strategy\":\"legacy-direct\""));
    }

    #[test]
    fn test_json_lines_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stats").join("jsongen.jsonl");

        let stats = JsonLinesStats::open(&path).unwrap();
        stats.record(StatsRecord::ToolVersion {
            variant: "debug".to_string(),
            version: "3.10.2".to_string(),
        });
        stats.record(StatsRecord::ToolVersion {
            variant: "release".to_string(),
            version: "3.10.2".to_string(),
        });
        drop(stats);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: StatsRecord = serde_json::from_str(lines[0]).unwrap();
        assert!(matches!(first, StatsRecord::ToolVersion { ref variant, .. } if variant == "debug"));
    }

    #[test]
    fn test_memory_stats_concurrent_writers() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(MemoryStats::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    stats.record(StatsRecord::AbiOutcome {
                        variant: "debug".to_string(),
                        abi: format!("abi-{i}"),
                        success: true,
                        duration_ms: 0,
                        error: None,
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.records().len(), 8);
        assert_eq!(stats.outcomes_for("abi-3").len(), 1);
    }

    #[test]
    fn test_memory_stats_survives_poisoned_lock() {
        let stats = MemoryStats::new();

        let _ = std::thread::scope(|s| {
            s.spawn(|| {
                let _guard = stats.records.lock().unwrap();
                panic!("recorder panicked while holding the lock");
            })
            .join()
        });
        assert!(stats.records.is_poisoned());

        stats.record(StatsRecord::ToolVersion {
            variant: "debug".to_string(),
            version: "3.10.2".to_string(),
        });
        assert_eq!(stats.records().len(), 1);
    }
}
