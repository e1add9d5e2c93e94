//! Execution layer - tasks, skip policies, builders and the unit runner.
//!
//! A migration is assembled from immutable [`CompositeTaskBuilder`] and
//! [`LeafTaskBuilder`] plans. Building a plan only captures
//! [`BuildParameters`]; resources are discovered and subtasks materialized
//! while the tree runs, depth first, on one thread.

#![warn(missing_docs)]

pub mod task;
pub mod context;
pub mod report;
pub mod params;
pub mod skip;
mod plan;
pub mod composite;
pub mod leaf;
pub mod engine;
pub mod registry;

pub use task::{Task, TaskBuilder, TaskFn};
pub use context::TaskContext;
pub use report::{ReportSink, TaskExecution, TracingReportSink};
pub use params::{BuildParameters, Confirm};
pub use skip::{SkipIf, SkipIfPropertyTrue, SkipPolicies, SkipPolicy, SkipUnlessConfirmed};
pub use composite::{CompositeTask, CompositeTaskBuilder};
pub use leaf::{LeafTask, LeafTaskBuilder, Runnable};
pub use engine::{ConfigurationUnit, MigrationRunner, RunReport, RunnerConfig, UnitOutcome};
pub use registry::{ProviderRegistry, SourceDescriptor};

#[cfg(test)]
mod testing;
