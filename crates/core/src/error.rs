//! Error taxonomy of the migration engine.
//!
//! Only unrecoverable conditions are errors. Non-applicable work is a SKIPPED
//! result and well-understood problems are FAILED results; see
//! [`crate::TaskResult`].

use std::path::PathBuf;

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrationError>;

/// Errors raised while reading the environment property bag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironmentError {
    /// A required property is not set
    #[error("required property '{key}' is not set")]
    MissingProperty {
        /// Property key
        key: String,
    },

    /// A required property is set to the empty string
    #[error("required property '{key}' is empty")]
    EmptyProperty {
        /// Property key
        key: String,
    },

    /// A property value cannot be parsed
    #[error("property '{key}' has malformed value '{value}', expected {expected}")]
    Malformed {
        /// Property key
        key: String,
        /// Raw value
        value: String,
        /// What the value should have looked like
        expected: &'static str,
    },
}

/// Errors raised by a configuration connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManagementOperationError {
    /// The connection was used before `start()`
    #[error("configuration connection is not started")]
    NotStarted,

    /// The server rejected an operation
    #[error("operation '{operation}' on '{address}' failed: {reason}")]
    Failed {
        /// Operation name
        operation: String,
        /// Target address
        address: String,
        /// Failure description
        reason: String,
    },

    /// The connection went away
    #[error("configuration connection lost: {0}")]
    ConnectionLost(String),
}

/// Unrecoverable migration failures.
///
/// Raising one of these aborts the whole task tree of the current
/// configuration unit.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Required property missing or malformed
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    /// Management operation failed
    #[error(transparent)]
    Management(#[from] ManagementOperationError),

    /// A configuration document could not be read, parsed or written
    #[error("failed to process document {}: {source}", path.display())]
    Document {
        /// Document path
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An engine invariant does not hold
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl MigrationError {
    /// Wrap a document processing failure.
    pub fn document(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Document {
            path: path.into(),
            source: source.into(),
        }
    }
}
