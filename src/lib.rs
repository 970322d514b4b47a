pub mod commands;
pub mod config;
pub mod observability;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod runner;
pub mod target;
pub mod tools;

pub use pipeline::{PipelineExecutor, ScanStage, StageOutcome};
pub use runner::{RunResult, TerminationReason};
