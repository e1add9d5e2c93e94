//! confmig core data models.
//!
//! This crate defines the values every other layer of the migration engine
//! passes around: task names, task results, the environment property bag and
//! the error taxonomy.

#![warn(missing_docs)]

// Identities
mod id;
mod name;

// Outcomes
mod result;
mod error;

// Overrides
mod environment;

// Re-exports
pub use id::RunId;
pub use name::TaskName;
pub use result::{TaskResult, TaskResultBuilder, TaskStatus};
pub use error::{EnvironmentError, ManagementOperationError, MigrationError, Result};
pub use environment::Environment;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
