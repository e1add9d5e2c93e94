//! Manageable resources.
//!
//! A resource is a typed, named node of the live configuration tree. There is
//! one resource type rather than a type per concrete kind: every resource
//! answers the same child query keyed by [`ResourceType`], which keeps
//! selectors independent of how the tree is nested.

use crate::{ConfigurationConnection, ManagementOperation, ResourceAddress};
use confmig_core::ManagementOperationError;
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::rc::{Rc, Weak};
use tracing::debug;

/// Type of a resource; also the address key of its children of that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceType(Cow<'static, str>);

impl ResourceType {
    /// Root of a standalone server
    pub const STANDALONE_SERVER: ResourceType = ResourceType(Cow::Borrowed("standalone-server"));
    /// Root of a managed domain
    pub const DOMAIN: ResourceType = ResourceType(Cow::Borrowed("domain"));
    /// A host of a managed domain
    pub const HOST: ResourceType = ResourceType(Cow::Borrowed("host"));
    /// `profile=*`
    pub const PROFILE: ResourceType = ResourceType(Cow::Borrowed("profile"));
    /// `server-group=*`
    pub const SERVER_GROUP: ResourceType = ResourceType(Cow::Borrowed("server-group"));
    /// `subsystem=*`
    pub const SUBSYSTEM: ResourceType = ResourceType(Cow::Borrowed("subsystem"));
    /// `socket-binding-group=*`
    pub const SOCKET_BINDING_GROUP: ResourceType = ResourceType(Cow::Borrowed("socket-binding-group"));
    /// `interface=*`
    pub const INTERFACE: ResourceType = ResourceType(Cow::Borrowed("interface"));

    /// Create a resource type from its address key.
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    /// The address key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node of the live configuration tree.
///
/// Holds only its identity: the configuration and the children are fetched
/// from the connection on every call, so a query made after a mutation sees
/// the mutation. The parent link is weak and serves navigation only.
pub struct ManageableResource {
    resource_type: ResourceType,
    name: String,
    address: ResourceAddress,
    parent: Weak<ManageableResource>,
    connection: Rc<dyn ConfigurationConnection>,
}

impl ManageableResource {
    /// Create a root resource.
    pub fn root(
        resource_type: ResourceType,
        name: impl Into<String>,
        address: ResourceAddress,
        connection: Rc<dyn ConfigurationConnection>,
    ) -> Rc<Self> {
        Rc::new(Self {
            resource_type,
            name: name.into(),
            address,
            parent: Weak::new(),
            connection,
        })
    }

    /// Get the resource type.
    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    /// Get the name, unique among siblings of the same type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the address.
    pub fn address(&self) -> &ResourceAddress {
        &self.address
    }

    /// Get the parent, if it is still alive.
    pub fn parent(&self) -> Option<Rc<ManageableResource>> {
        self.parent.upgrade()
    }

    /// Get the connection.
    pub fn connection(&self) -> &Rc<dyn ConfigurationConnection> {
        &self.connection
    }

    /// Execute an operation over this resource's connection.
    pub fn execute(&self, operation: &ManagementOperation) -> Result<Value, ManagementOperationError> {
        debug!(operation = %operation, "executing management operation");
        self.connection.execute_management_operation(operation)
    }

    /// Fetch the current configuration of this resource.
    pub fn get_resource_configuration(&self) -> Result<Value, ManagementOperationError> {
        self.execute(&ManagementOperation::read_resource(self.address.clone()))
    }

    /// Get the types of children this resource currently has.
    pub fn get_child_resource_types(&self) -> Result<Vec<ResourceType>, ManagementOperationError> {
        let types = self.execute(&ManagementOperation::read_children_types(self.address.clone()))?;
        Ok(string_array(types)
            .into_iter()
            .map(ResourceType::new)
            .collect())
    }

    /// Get the names of the children of one type.
    pub fn get_child_resource_names(&self, resource_type: &ResourceType) -> Result<Vec<String>, ManagementOperationError> {
        let names = self.execute(&ManagementOperation::read_children_names(
            self.address.clone(),
            resource_type.as_str(),
        ))?;
        Ok(string_array(names))
    }

    /// Get the children of one type.
    pub fn get_child_resources(self: &Rc<Self>, resource_type: &ResourceType) -> Result<Vec<Rc<ManageableResource>>, ManagementOperationError> {
        Ok(self
            .get_child_resource_names(resource_type)?
            .into_iter()
            .map(|name| self.child(resource_type.clone(), name))
            .collect())
    }

    /// Get one child, `None` if it does not exist.
    pub fn get_child_resource(self: &Rc<Self>, resource_type: &ResourceType, name: &str) -> Result<Option<Rc<ManageableResource>>, ManagementOperationError> {
        if !self.has_child_resource(resource_type, name)? {
            return Ok(None);
        }
        Ok(Some(self.child(resource_type.clone(), name.to_string())))
    }

    /// Whether a child exists.
    pub fn has_child_resource(&self, resource_type: &ResourceType, name: &str) -> Result<bool, ManagementOperationError> {
        Ok(self
            .get_child_resource_names(resource_type)?
            .iter()
            .any(|n| n == name))
    }

    /// Add a child with its initial attributes.
    pub fn add_child_resource(&self, resource_type: &ResourceType, name: &str, attributes: Map<String, Value>) -> Result<(), ManagementOperationError> {
        let address = self.address.child(resource_type.as_str(), name);
        self.execute(&ManagementOperation::add(address, attributes))?;
        Ok(())
    }

    /// Remove a child and everything beneath it.
    pub fn remove_child_resource(&self, resource_type: &ResourceType, name: &str) -> Result<(), ManagementOperationError> {
        let address = self.address.child(resource_type.as_str(), name);
        self.execute(&ManagementOperation::remove(address))?;
        Ok(())
    }

    /// Remove this resource and everything beneath it.
    ///
    /// Works through the resource's own address, so the parent handle may
    /// already be gone.
    pub fn remove(&self) -> Result<(), ManagementOperationError> {
        self.execute(&ManagementOperation::remove(self.address.clone()))?;
        Ok(())
    }

    /// Read an attribute; undefined attributes are `Value::Null`.
    pub fn read_attribute(&self, name: &str) -> Result<Value, ManagementOperationError> {
        self.execute(&ManagementOperation::read_attribute(self.address.clone(), name))
    }

    /// Write an attribute.
    pub fn write_attribute(&self, name: &str, value: impl Into<Value>) -> Result<(), ManagementOperationError> {
        self.execute(&ManagementOperation::write_attribute(self.address.clone(), name, value))?;
        Ok(())
    }

    /// Undefine an attribute.
    pub fn undefine_attribute(&self, name: &str) -> Result<(), ManagementOperationError> {
        self.execute(&ManagementOperation::undefine_attribute(self.address.clone(), name))?;
        Ok(())
    }

    fn child(self: &Rc<Self>, resource_type: ResourceType, name: String) -> Rc<ManageableResource> {
        Rc::new(Self {
            address: self.address.child(resource_type.as_str(), name.as_str()),
            resource_type,
            name,
            parent: Rc::downgrade(self),
            connection: Rc::clone(&self.connection),
        })
    }
}

impl std::fmt::Debug for ManageableResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManageableResource")
            .field("resource_type", &self.resource_type)
            .field("name", &self.name)
            .field("address", &self.address)
            .finish()
    }
}

impl std::fmt::Display for ManageableResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' ({})", self.resource_type, self.name, self.address)
    }
}

fn string_array(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
