use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::runner::{RunResult, TerminationReason};

#[derive(Debug, Default, Serialize, Clone)]
pub struct RunSnapshot {
    pub stages: Vec<StageRecord>,
    pub total_duration_ms: f64,
}

#[derive(Debug, Serialize, Clone)]
pub struct StageRecord {
    pub name: String,
    pub command: String,
    pub report: PathBuf,
    pub exit_status: i32,
    pub reason: TerminationReason,
    pub duration_ms: f64,
    pub digest: Option<String>,
}

impl StageRecord {
    pub fn new(name: &str, command: String, report: PathBuf, result: RunResult) -> Self {
        Self {
            name: name.to_string(),
            command,
            report,
            exit_status: result.exit_status,
            reason: result.reason,
            duration_ms: 0.0,
            digest: None,
        }
    }
}

/// Shared per-run metrics. Cloning hands out another handle onto the same
/// snapshot, so the executor and the CLI observe one run.
#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    inner: Arc<Mutex<RunSnapshot>>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stage(&self, record: StageRecord) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.stages.push(record);
        }
    }

    pub fn record_total_duration(&self, duration: Duration) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.total_duration_ms = duration.as_secs_f64() * 1_000.0;
        }
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.inner
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = RunSnapshot::default();
        }
    }
}

/// Persist the snapshot as pretty JSON inside the run directory.
pub fn write_summary(path: &Path, snapshot: &RunSnapshot) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
    serde_json::to_writer_pretty(file, snapshot)
        .with_context(|| format!("Failed to write summary JSON: {}", path.display()))?;
    Ok(())
}

pub fn log_snapshot(snapshot: &RunSnapshot) {
    info!(
        total_duration_ms = snapshot.total_duration_ms,
        stage_count = snapshot.stages.len(),
        "Pipeline summary"
    );
    for record in &snapshot.stages {
        info!(
            stage = record.name.as_str(),
            exit_status = record.exit_status,
            reason = ?record.reason,
            duration_ms = record.duration_ms,
            report = %record.report.display(),
            "Stage summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{RunResult, TerminationReason};
    use tempfile::tempdir;

    fn sample_snapshot() -> RunSnapshot {
        let result = RunResult {
            exit_status: 0,
            reason: TerminationReason::Completed,
        };
        RunSnapshot {
            stages: vec![StageRecord::new(
                "Nmap",
                "nmap host".to_string(),
                PathBuf::from("nmap.txt"),
                result,
            )],
            total_duration_ms: 12.5,
        }
    }

    #[test]
    fn write_summary_produces_readable_json() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("summary.json");

        write_summary(&path, &sample_snapshot()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"Nmap\""));
        assert!(content.contains("\"completed\""));
    }

    #[test]
    fn write_summary_surfaces_errors_instead_of_panicking() {
        let temp = tempdir().unwrap();

        // A directory path cannot be created as a file.
        assert!(write_summary(temp.path(), &sample_snapshot()).is_err());
    }
}
