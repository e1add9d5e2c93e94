//! Fixtures shared by the unit tests.

use crate::BuildParameters;
use confmig_management::{ConfigurationConnection, InMemoryConnection, ManageableServer, ModelNode, ServerMode};
use std::rc::Rc;

/// Migration input used by the tests.
#[derive(Debug, Default)]
pub struct Source {
    pub product: String,
}

/// A domain with two profiles holding a few subsystems.
pub fn domain_model() -> ModelNode {
    let profile = |subsystems: &[&str]| {
        subsystems.iter().fold(ModelNode::new(), |node, name| {
            node.with_child("subsystem", *name, ModelNode::new())
        })
    };
    ModelNode::new()
        .with_child("profile", "default", profile(&["jmx", "transactions"]))
        .with_child("profile", "full", profile(&["jacorb", "jmx", "messaging", "transactions"]))
}

/// Started domain server over `model`, and the connection behind it.
pub fn domain(model: ModelNode) -> (Rc<ManageableServer>, Rc<InMemoryConnection>) {
    let connection = Rc::new(InMemoryConnection::new(model));
    connection.start().unwrap();
    let server = Rc::new(ManageableServer::new(ServerMode::Domain, connection.clone()));
    (server, connection)
}

/// Parameters rooted at an empty started standalone server.
pub fn params() -> BuildParameters<Source> {
    let connection = Rc::new(InMemoryConnection::default());
    connection.start().unwrap();
    let server = Rc::new(ManageableServer::new(ServerMode::Standalone, connection));
    BuildParameters::new(Rc::new(Source::default()), server)
}
