//! Management operations.

use crate::ResourceAddress;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `read-resource`
pub const READ_RESOURCE: &str = "read-resource";
/// `read-children-names`
pub const READ_CHILDREN_NAMES: &str = "read-children-names";
/// `read-children-types`
pub const READ_CHILDREN_TYPES: &str = "read-children-types";
/// `read-attribute`
pub const READ_ATTRIBUTE: &str = "read-attribute";
/// `write-attribute`
pub const WRITE_ATTRIBUTE: &str = "write-attribute";
/// `undefine-attribute`
pub const UNDEFINE_ATTRIBUTE: &str = "undefine-attribute";
/// `add`
pub const ADD: &str = "add";
/// `remove`
pub const REMOVE: &str = "remove";
/// `composite`
pub const COMPOSITE: &str = "composite";

/// A request sent over a configuration connection.
///
/// Serializes to the flat JSON shape management clients exchange:
/// `{"operation": "...", "address": [...], <params>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementOperation {
    /// Operation name
    pub operation: String,

    /// Target resource
    #[serde(default)]
    pub address: ResourceAddress,

    /// Operation parameters
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl ManagementOperation {
    /// Create an operation without parameters.
    pub fn new(operation: impl Into<String>, address: ResourceAddress) -> Self {
        Self {
            operation: operation.into(),
            address,
            params: Map::new(),
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Get a parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// `read-resource` of a single level.
    pub fn read_resource(address: ResourceAddress) -> Self {
        Self::new(READ_RESOURCE, address)
    }

    /// `read-children-names` for one child type.
    pub fn read_children_names(address: ResourceAddress, child_type: &str) -> Self {
        Self::new(READ_CHILDREN_NAMES, address).with_param("child-type", child_type)
    }

    /// `read-children-types`.
    pub fn read_children_types(address: ResourceAddress) -> Self {
        Self::new(READ_CHILDREN_TYPES, address)
    }

    /// `read-attribute`.
    pub fn read_attribute(address: ResourceAddress, name: &str) -> Self {
        Self::new(READ_ATTRIBUTE, address).with_param("name", name)
    }

    /// `write-attribute`.
    pub fn write_attribute(address: ResourceAddress, name: &str, value: impl Into<Value>) -> Self {
        Self::new(WRITE_ATTRIBUTE, address)
            .with_param("name", name)
            .with_param("value", value)
    }

    /// `undefine-attribute`.
    pub fn undefine_attribute(address: ResourceAddress, name: &str) -> Self {
        Self::new(UNDEFINE_ATTRIBUTE, address).with_param("name", name)
    }

    /// `add`, with the initial attributes as parameters.
    pub fn add(address: ResourceAddress, attributes: Map<String, Value>) -> Self {
        Self {
            operation: ADD.to_string(),
            address,
            params: attributes,
        }
    }

    /// `remove`.
    pub fn remove(address: ResourceAddress) -> Self {
        Self::new(REMOVE, address)
    }

    /// `composite`, applied atomically.
    pub fn composite(steps: Vec<ManagementOperation>) -> Self {
        let steps: Vec<Value> = steps.into_iter().map(Value::from).collect();
        Self::new(COMPOSITE, ResourceAddress::root()).with_param("steps", steps)
    }
}

impl From<ManagementOperation> for Value {
    fn from(operation: ManagementOperation) -> Self {
        let mut object = operation.params;
        object.insert("operation".to_string(), Value::String(operation.operation));
        object.insert("address".to_string(), operation.address.into());
        Value::Object(object)
    }
}

impl std::fmt::Display for ManagementOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.operation)
    }
}
