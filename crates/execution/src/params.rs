//! Build parameters.

use confmig_management::{ManageableResource, ManageableServer};
use std::rc::Rc;

/// Answers yes/no questions put to whoever drives the migration.
pub trait Confirm {
    /// Ask a question; `true` means confirmed.
    fn confirm(&self, question: &str) -> bool;
}

/// Everything a plan is built against.
///
/// `S` is the migration input (the description of the source installation).
/// Parameters are immutable; fanning out over resources derives new
/// parameters with [`BuildParameters::with_resource`].
pub struct BuildParameters<S> {
    source: Rc<S>,
    server: Rc<ManageableServer>,
    resource: Rc<ManageableResource>,
    confirm: Option<Rc<dyn Confirm>>,
}

impl<S> BuildParameters<S> {
    /// Create parameters rooted at the server's root resource.
    pub fn new(source: Rc<S>, server: Rc<ManageableServer>) -> Self {
        let resource = server.root_resource();
        Self {
            source,
            server,
            resource,
            confirm: None,
        }
    }

    /// Attach a confirmation capability.
    pub fn with_confirm(mut self, confirm: Rc<dyn Confirm>) -> Self {
        self.confirm = Some(confirm);
        self
    }

    /// Same parameters, resolved to another resource.
    pub fn with_resource(&self, resource: Rc<ManageableResource>) -> Self {
        Self {
            source: Rc::clone(&self.source),
            server: Rc::clone(&self.server),
            resource,
            confirm: self.confirm.clone(),
        }
    }

    /// Get the migration input.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Get the server.
    pub fn server(&self) -> &Rc<ManageableServer> {
        &self.server
    }

    /// Get the resolved resource.
    pub fn resource(&self) -> &Rc<ManageableResource> {
        &self.resource
    }

    /// Get the confirmation capability, if any.
    pub fn confirm(&self) -> Option<&dyn Confirm> {
        self.confirm.as_deref()
    }
}

impl<S> Clone for BuildParameters<S> {
    fn clone(&self) -> Self {
        self.with_resource(Rc::clone(&self.resource))
    }
}

impl<S> std::fmt::Debug for BuildParameters<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildParameters")
            .field("server", &self.server)
            .field("resource", &self.resource.address().to_string())
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}
