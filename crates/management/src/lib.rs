//! Management resource layer.
//!
//! A live configuration is a tree of typed, named resources reached through a
//! [`ConfigurationConnection`]. Resources are discovered on demand and never
//! cached, and [`ManageableResourceSelector`]s walk the tree without assuming
//! how deep it is.

#![warn(missing_docs)]

pub mod address;
pub mod operation;
pub mod connection;
pub mod model;
pub mod resource;
pub mod selector;
pub mod server;

pub use address::ResourceAddress;
pub use operation::ManagementOperation;
pub use connection::ConfigurationConnection;
pub use model::{InMemoryConnection, ModelNode};
pub use resource::{ManageableResource, ResourceType};
pub use selector::ManageableResourceSelector;
pub use server::{ManageableServer, ServerMode};
