//! Manageable servers - a connection plus the root of its resource tree.

use crate::{ConfigurationConnection, ManageableResource, ManageableResourceSelector, ResourceAddress, ResourceType};
use confmig_core::{ManagementOperationError, MigrationError};
use std::rc::Rc;
use tracing::{debug, warn};

/// How the configuration being migrated is managed.
///
/// The mode decides where the root of the resource tree sits and therefore
/// how deep a given resource type is nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMode {
    /// Single server, resources under `/`
    Standalone,
    /// Managed domain, subsystems under `/profile=*`
    Domain,
    /// One host of a managed domain, resources under `/host=<name>`
    Host {
        /// Host name
        name: String,
    },
}

/// A configuration session: the live connection and its resource tree.
pub struct ManageableServer {
    mode: ServerMode,
    connection: Rc<dyn ConfigurationConnection>,
}

impl ManageableServer {
    /// Create a server over a connection.
    pub fn new(mode: ServerMode, connection: Rc<dyn ConfigurationConnection>) -> Self {
        Self { mode, connection }
    }

    /// Get the mode.
    pub fn mode(&self) -> &ServerMode {
        &self.mode
    }

    /// Get the connection.
    pub fn connection(&self) -> &Rc<dyn ConfigurationConnection> {
        &self.connection
    }

    /// Start the connection.
    pub fn start(&self) -> Result<(), ManagementOperationError> {
        debug!(mode = ?self.mode, "starting configuration connection");
        self.connection.start()
    }

    /// Stop the connection.
    pub fn stop(&self) -> Result<(), ManagementOperationError> {
        debug!(mode = ?self.mode, "stopping configuration connection");
        self.connection.stop()
    }

    /// Whether the connection is started.
    pub fn is_started(&self) -> bool {
        self.connection.is_started()
    }

    /// Build the root resource of the tree.
    ///
    /// A fresh root is built on every call; nothing below it is cached.
    pub fn root_resource(&self) -> Rc<ManageableResource> {
        let connection = Rc::clone(&self.connection);
        match &self.mode {
            ServerMode::Standalone => ManageableResource::root(
                ResourceType::STANDALONE_SERVER,
                "",
                ResourceAddress::root(),
                connection,
            ),
            ServerMode::Domain => {
                ManageableResource::root(ResourceType::DOMAIN, "", ResourceAddress::root(), connection)
            }
            ServerMode::Host { name } => ManageableResource::root(
                ResourceType::HOST,
                name.as_str(),
                ResourceAddress::root().child(ResourceType::HOST.as_str(), name.as_str()),
                connection,
            ),
        }
    }

    /// Selects, from the root, every resource that directly holds subsystems.
    pub fn subsystem_holders(&self) -> ManageableResourceSelector {
        match self.mode {
            ServerMode::Standalone | ServerMode::Host { .. } => ManageableResourceSelector::current(),
            ServerMode::Domain => ManageableResourceSelector::children(ResourceType::PROFILE),
        }
    }

    /// Run `f` with the connection started, stopping it afterwards.
    ///
    /// The connection is stopped even if `f` fails; the error of `f` wins
    /// over a failure to stop.
    pub fn run_started<T, F>(&self, f: F) -> Result<T, MigrationError>
    where
        F: FnOnce(&ManageableServer) -> Result<T, MigrationError>,
    {
        self.start()?;
        let result = f(self);
        if let Err(e) = self.stop() {
            if result.is_ok() {
                return Err(e.into());
            }
            warn!("failed to stop configuration connection: {}", e);
        }
        result
    }
}

impl std::fmt::Debug for ManageableServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManageableServer")
            .field("mode", &self.mode)
            .field("started", &self.is_started())
            .finish()
    }
}
