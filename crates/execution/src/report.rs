//! Execution records and report sinks.

use confmig_core::{MigrationError, TaskName, TaskResult, TaskStatus, Time};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// Record of one executed task and its subtasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecution {
    /// Task name with its attributes
    pub name: TaskName,
    /// Returned result
    pub result: TaskResult,
    /// When the task started
    pub started_at: Time,
    /// When the task finished
    pub finished_at: Time,
    /// Subtasks in execution order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<TaskExecution>,
}

impl TaskExecution {
    /// Count the records with a status in this tree, this one included.
    pub fn count(&self, status: TaskStatus) -> usize {
        let own = usize::from(self.result.status() == status);
        own + self.subtasks.iter().map(|s| s.count(status)).sum::<usize>()
    }

    /// Walk the tree depth first, with the depth of each record.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(usize, &'a TaskExecution)) {
        fn walk_at<'a>(execution: &'a TaskExecution, depth: usize, visit: &mut dyn FnMut(usize, &'a TaskExecution)) {
            visit(depth, execution);
            for subtask in &execution.subtasks {
                walk_at(subtask, depth + 1, visit);
            }
        }
        walk_at(self, 0, visit);
    }
}

/// Receives the outcome of every configuration unit.
pub trait ReportSink {
    /// A unit ran to completion.
    fn completed(&mut self, unit: &str, execution: &TaskExecution);

    /// A unit was aborted by an error.
    fn aborted(&mut self, unit: &str, error: &MigrationError);
}

/// Report sink that logs a summary through `tracing`.
#[derive(Debug, Default)]
pub struct TracingReportSink {
    completed: usize,
    aborted: usize,
}

impl TracingReportSink {
    /// Create a sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed units seen.
    pub fn completed_units(&self) -> usize {
        self.completed
    }

    /// Number of aborted units seen.
    pub fn aborted_units(&self) -> usize {
        self.aborted
    }
}

impl ReportSink for TracingReportSink {
    fn completed(&mut self, unit: &str, execution: &TaskExecution) {
        self.completed += 1;
        info!(
            unit,
            status = %execution.result.status(),
            succeeded = execution.count(TaskStatus::Success),
            skipped = execution.count(TaskStatus::Skipped),
            failed = execution.count(TaskStatus::Failed),
            "configuration unit completed"
        );
        execution.walk(&mut |depth, record| {
            debug!(
                unit,
                depth,
                task = %record.name,
                status = %record.result.status(),
                "task outcome"
            );
        });
    }

    fn aborted(&mut self, unit: &str, error: &MigrationError) {
        self.aborted += 1;
        error!(unit, "configuration unit aborted: {}", error);
    }
}
