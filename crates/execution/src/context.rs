//! Task execution context.

use crate::{Task, TaskExecution};
use chrono::Utc;
use confmig_core::{Environment, Result, TaskResult};
use tracing::{debug, info_span};

/// Context handed to a running task.
///
/// Each task gets its own context. Executing a subtask through it records
/// the subtask's outcome and tracks whether any direct subtask succeeded,
/// which is what a composite reports as its own result.
pub struct TaskContext<'a> {
    environment: &'a mut Environment,
    any_subtask_succeeded: bool,
    executions: Vec<TaskExecution>,
}

impl<'a> TaskContext<'a> {
    /// Create a top-level context.
    pub fn new(environment: &'a mut Environment) -> Self {
        Self {
            environment,
            any_subtask_succeeded: false,
            executions: Vec::new(),
        }
    }

    /// Get the environment.
    pub fn environment(&self) -> &Environment {
        self.environment
    }

    /// Get the environment for writing.
    ///
    /// Properties set here are seen by every task that runs afterwards.
    pub fn environment_mut(&mut self) -> &mut Environment {
        self.environment
    }

    /// Execute a subtask.
    ///
    /// Errors are returned unchanged and nothing is recorded for the failed
    /// subtask.
    pub fn execute(&mut self, task: &dyn Task) -> Result<TaskResult> {
        let execution = self.run_recorded(task)?;
        let result = execution.result.clone();
        if result.is_success() {
            self.any_subtask_succeeded = true;
        }
        self.executions.push(execution);
        Ok(result)
    }

    pub(crate) fn run_recorded(&mut self, task: &dyn Task) -> Result<TaskExecution> {
        let name = task.name().clone();
        let span = info_span!("task", task = %name);
        let _enter = span.enter();

        let started_at = Utc::now();
        let mut child = TaskContext::new(&mut *self.environment);
        let result = task.run(&mut child)?;
        let subtasks = child.into_executions();
        debug!(status = %result.status(), subtasks = subtasks.len(), "task finished");

        Ok(TaskExecution {
            name,
            result,
            started_at,
            finished_at: Utc::now(),
            subtasks,
        })
    }

    /// Whether any subtask executed so far returned SUCCESS.
    pub fn any_subtask_succeeded(&self) -> bool {
        self.any_subtask_succeeded
    }

    /// The result a composite reports: SUCCESS if any subtask succeeded,
    /// otherwise SKIPPED.
    pub fn result(&self) -> TaskResult {
        TaskResult::from_subtasks(self.any_subtask_succeeded)
    }

    /// Records of the subtasks executed so far.
    pub fn executions(&self) -> &[TaskExecution] {
        &self.executions
    }

    /// Consume the context, returning its records.
    pub fn into_executions(self) -> Vec<TaskExecution> {
        self.executions
    }
}
