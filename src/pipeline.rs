use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::observability::{RunMetrics, StageRecord};
use crate::report;
use crate::runner::{self, RunResult};

/// One external tool invocation within the fixed pipeline. Immutable once
/// built; consumed in order, exactly once.
#[derive(Debug, Clone)]
pub struct ScanStage {
    pub name: &'static str,
    pub argv: Vec<String>,
    pub report: PathBuf,
}

impl ScanStage {
    pub fn new(name: &'static str, argv: Vec<String>, report: PathBuf) -> Self {
        Self { name, argv, report }
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: String,
    pub command: String,
    pub report: PathBuf,
    pub result: RunResult,
    pub duration: Duration,
}

/// Strictly sequential executor: one stage runs to completion (or is killed)
/// before the next starts. A failed stage never aborts the run on its own;
/// only the gate closure stops the pipeline early.
pub struct PipelineExecutor {
    stages: Vec<ScanStage>,
    timeout: Option<Duration>,
    metrics: RunMetrics,
}

impl PipelineExecutor {
    pub fn new(stages: Vec<ScanStage>, timeout: Option<Duration>) -> Self {
        Self {
            stages,
            timeout,
            metrics: RunMetrics::new(),
        }
    }

    pub fn metrics(&self) -> RunMetrics {
        self.metrics.clone()
    }

    /// Run the stages in order. After every stage except the last, `gate` is
    /// consulted with the fresh outcome; returning `false` stops the run.
    pub fn execute<G>(&self, mut gate: G) -> Vec<StageOutcome>
    where
        G: FnMut(&StageOutcome) -> bool,
    {
        self.metrics.reset();
        let total_start = Instant::now();
        let mut outcomes = Vec::new();
        let last = self.stages.len().saturating_sub(1);

        for (idx, stage) in self.stages.iter().enumerate() {
            let span = tracing::span!(tracing::Level::DEBUG, "stage", stage = stage.name);
            let _span_guard = span.enter();

            println!("\n{}", "=".repeat(40));
            println!("Starting step: {}", stage.name);
            println!("Command -> {}", stage.command_line());

            let started = Instant::now();
            let result = runner::run(&stage.argv, &stage.report, self.timeout);
            let duration = started.elapsed();

            println!(
                "Step {} finished with return code {}. Output saved to: {}",
                stage.name,
                result.exit_status,
                stage.report.display()
            );
            info!(
                stage = stage.name,
                exit_status = result.exit_status,
                reason = ?result.reason,
                "Stage finished"
            );

            let mut record = StageRecord::new(
                stage.name,
                stage.command_line(),
                stage.report.clone(),
                result,
            );
            record.duration_ms = duration.as_secs_f64() * 1_000.0;
            match report::write_digest(&stage.report) {
                Ok(digest) => record.digest = Some(digest),
                Err(err) => {
                    warn!(report = %stage.report.display(), "Failed to write report digest: {err}");
                }
            }
            self.metrics.record_stage(record);

            let outcome = StageOutcome {
                stage: stage.name.to_string(),
                command: stage.command_line(),
                report: stage.report.clone(),
                result,
                duration,
            };
            let stop = idx != last && !gate(&outcome);
            outcomes.push(outcome);
            if stop {
                info!("Execution stopped by operator");
                break;
            }
        }

        self.metrics.record_total_duration(total_start.elapsed());
        outcomes
    }
}
