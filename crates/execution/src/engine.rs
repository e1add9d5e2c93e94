//! The migration runner - drives configuration units one after another.

use crate::{ReportSink, Task, TaskContext, TaskExecution, TracingReportSink};
use chrono::Utc;
use confmig_core::{Environment, Result, RunId, Time};
use confmig_management::ManageableServer;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{info, warn};

/// Configuration for the runner.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Stop at the first aborted unit instead of moving to the next one
    pub stop_on_failure: bool,
}

/// One independently migratable document or session.
pub struct ConfigurationUnit {
    name: String,
    task: Box<dyn Task>,
    server: Option<Rc<ManageableServer>>,
}

impl ConfigurationUnit {
    /// Create a unit running `task`.
    pub fn new(name: impl Into<String>, task: Box<dyn Task>) -> Self {
        Self {
            name: name.into(),
            task,
            server: None,
        }
    }

    /// Keep `server` started while the unit runs.
    pub fn with_server(mut self, server: Rc<ManageableServer>) -> Self {
        self.server = Some(server);
        self
    }

    /// Get the unit name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What happened to one configuration unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnitOutcome {
    /// The task tree ran to completion
    Completed {
        /// Unit name
        unit: String,
        /// Record of the root task
        execution: TaskExecution,
    },
    /// An error unwound the task tree
    Aborted {
        /// Unit name
        unit: String,
        /// The error, rendered
        error: String,
    },
}

impl UnitOutcome {
    /// Get the unit name.
    pub fn unit(&self) -> &str {
        match self {
            UnitOutcome::Completed { unit, .. } | UnitOutcome::Aborted { unit, .. } => unit,
        }
    }

    /// Whether the unit was aborted.
    pub fn is_aborted(&self) -> bool {
        matches!(self, UnitOutcome::Aborted { .. })
    }
}

/// Report of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// When the run started
    pub started_at: Time,
    /// When the run finished
    pub finished_at: Time,
    /// Outcomes of the units that were attempted, in order
    pub units: Vec<UnitOutcome>,
}

impl RunReport {
    /// Number of aborted units.
    pub fn aborted(&self) -> usize {
        self.units.iter().filter(|u| u.is_aborted()).count()
    }
}

/// Runs configuration units sequentially.
///
/// An error aborts only the unit it was raised in; the runner then moves on
/// to the next unit unless configured to stop.
pub struct MigrationRunner {
    config: RunnerConfig,
    sink: Box<dyn ReportSink>,
}

impl MigrationRunner {
    /// Create a runner reporting through `tracing`.
    pub fn new() -> Self {
        Self {
            config: RunnerConfig::default(),
            sink: Box::new(TracingReportSink::new()),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the report sink.
    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Run every unit against the shared environment.
    pub fn run(&mut self, units: &[ConfigurationUnit], environment: &mut Environment) -> RunReport {
        let run_id = RunId::new();
        let started_at = Utc::now();
        info!(%run_id, units = units.len(), "starting migration run");

        let mut outcomes = Vec::with_capacity(units.len());
        for unit in units {
            match self.run_unit(unit, environment) {
                Ok(execution) => {
                    self.sink.completed(&unit.name, &execution);
                    outcomes.push(UnitOutcome::Completed {
                        unit: unit.name.clone(),
                        execution,
                    });
                }
                Err(e) => {
                    self.sink.aborted(&unit.name, &e);
                    outcomes.push(UnitOutcome::Aborted {
                        unit: unit.name.clone(),
                        error: e.to_string(),
                    });
                    if self.config.stop_on_failure {
                        warn!(unit = %unit.name, "stopping after aborted unit");
                        break;
                    }
                }
            }
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            units: outcomes,
        };
        info!(%run_id, attempted = report.units.len(), aborted = report.aborted(), "migration run finished");
        report
    }

    fn run_unit(&mut self, unit: &ConfigurationUnit, environment: &mut Environment) -> Result<TaskExecution> {
        info!(unit = %unit.name, task = %unit.task.name(), "running configuration unit");
        let mut context = TaskContext::new(environment);
        match &unit.server {
            Some(server) => server.run_started(|_| context.run_recorded(unit.task.as_ref())),
            None => context.run_recorded(unit.task.as_ref()),
        }
    }
}

impl Default for MigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}
