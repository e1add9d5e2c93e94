//! The task abstraction.

use crate::{BuildParameters, TaskContext};
use confmig_core::{Result, TaskName, TaskResult};

/// One step of a migration.
///
/// A task is stateless and built fresh for every run. It returns SKIPPED when
/// there is nothing to do, FAILED for an understood problem that leaves the
/// siblings safe to run, and an error only when continuing is unsafe.
pub trait Task {
    /// Name used as report key and audit label.
    fn name(&self) -> &TaskName;

    /// Run the task.
    fn run(&self, context: &mut TaskContext<'_>) -> Result<TaskResult>;
}

/// A task backed by a closure.
pub struct TaskFn<F> {
    name: TaskName,
    run: F,
}

impl<F> TaskFn<F>
where
    F: Fn(&mut TaskContext<'_>) -> Result<TaskResult>,
{
    /// Create a task from a closure.
    pub fn new(name: impl Into<TaskName>, run: F) -> Self {
        Self { name: name.into(), run }
    }
}

impl<F> Task for TaskFn<F>
where
    F: Fn(&mut TaskContext<'_>) -> Result<TaskResult>,
{
    fn name(&self) -> &TaskName {
        &self.name
    }

    fn run(&self, context: &mut TaskContext<'_>) -> Result<TaskResult> {
        (self.run)(context)
    }
}

/// An immutable task plan.
///
/// Building has no side effects; the same plan may be built any number of
/// times, against any parameters.
pub trait TaskBuilder<S> {
    /// Materialize the plan for one set of parameters.
    fn build(&self, params: &BuildParameters<S>) -> Box<dyn Task>;
}
