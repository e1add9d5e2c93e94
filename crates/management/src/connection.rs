//! Configuration connection abstraction.

use crate::ManagementOperation;
use confmig_core::ManagementOperationError;

/// A connection to a configuration session.
///
/// Opening a connection to a real server is done elsewhere; the engine only
/// drives it through this trait. A connection must be started before any
/// resource is queried or mutated and may be shared by every task of one
/// configuration unit. It is not safe for concurrent use.
pub trait ConfigurationConnection {
    /// Start the session.
    fn start(&self) -> Result<(), ManagementOperationError>;

    /// Stop the session.
    fn stop(&self) -> Result<(), ManagementOperationError>;

    /// Whether the session is started.
    fn is_started(&self) -> bool;

    /// Execute one operation and return its result value.
    fn execute_management_operation(
        &self,
        operation: &ManagementOperation,
    ) -> Result<serde_json::Value, ManagementOperationError>;
}
