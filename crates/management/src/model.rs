//! In-memory configuration model.
//!
//! [`InMemoryConnection`] is the reference [`ConfigurationConnection`]: it
//! keeps the whole resource tree as a [`ModelNode`] and applies operations to
//! it directly. It backs offline migrations (the model is loaded from and
//! saved to JSON) and the tests of every layer above.

use crate::operation::{
    ADD, COMPOSITE, READ_ATTRIBUTE, READ_CHILDREN_NAMES, READ_CHILDREN_TYPES, READ_RESOURCE,
    REMOVE, UNDEFINE_ATTRIBUTE, WRITE_ATTRIBUTE,
};
use crate::{ConfigurationConnection, ManagementOperation, ResourceAddress};
use confmig_core::ManagementOperationError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

/// One resource of the model: its attributes and its children by type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelNode {
    /// Attribute values
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,

    /// child type -> child name -> child
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<String, BTreeMap<String, ModelNode>>,
}

impl ModelNode {
    /// Create an empty node.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Add a child.
    pub fn with_child(mut self, child_type: impl Into<String>, name: impl Into<String>, child: ModelNode) -> Self {
        self.children
            .entry(child_type.into())
            .or_default()
            .insert(name.into(), child);
        self
    }

    /// Get a direct child.
    pub fn child(&self, child_type: &str, name: &str) -> Option<&ModelNode> {
        self.children.get(child_type)?.get(name)
    }

    /// Get the node at an address relative to this one.
    pub fn node_at(&self, address: &ResourceAddress) -> Option<&ModelNode> {
        address
            .elements()
            .iter()
            .try_fold(self, |node, (t, n)| node.child(t, n))
    }

    fn node_at_mut(&mut self, address: &ResourceAddress) -> Option<&mut ModelNode> {
        let mut node = self;
        for (t, n) in address.elements() {
            node = node.children.get_mut(t)?.get_mut(n)?;
        }
        Some(node)
    }
}

/// Configuration connection backed by an in-memory [`ModelNode`].
#[derive(Debug, Default)]
pub struct InMemoryConnection {
    model: RefCell<ModelNode>,
    started: Cell<bool>,
    operations: Cell<usize>,
}

impl InMemoryConnection {
    /// Create a connection over a model.
    pub fn new(model: ModelNode) -> Self {
        Self {
            model: RefCell::new(model),
            started: Cell::new(false),
            operations: Cell::new(0),
        }
    }

    /// Load the model from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Save the model as JSON.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&*self.model.borrow())
    }

    /// Copy of the current model.
    pub fn snapshot(&self) -> ModelNode {
        self.model.borrow().clone()
    }

    /// Number of operations executed so far.
    pub fn operation_count(&self) -> usize {
        self.operations.get()
    }
}

impl ConfigurationConnection for InMemoryConnection {
    fn start(&self) -> Result<(), ManagementOperationError> {
        self.started.set(true);
        Ok(())
    }

    fn stop(&self) -> Result<(), ManagementOperationError> {
        self.started.set(false);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.started.get()
    }

    fn execute_management_operation(
        &self,
        operation: &ManagementOperation,
    ) -> Result<Value, ManagementOperationError> {
        if !self.started.get() {
            return Err(ManagementOperationError::NotStarted);
        }
        self.operations.set(self.operations.get() + 1);
        apply(&mut self.model.borrow_mut(), operation)
    }
}

fn failure(operation: &ManagementOperation, reason: impl Into<String>) -> ManagementOperationError {
    ManagementOperationError::Failed {
        operation: operation.operation.clone(),
        address: operation.address.to_string(),
        reason: reason.into(),
    }
}

fn string_param<'a>(operation: &'a ManagementOperation, name: &str) -> Result<&'a str, ManagementOperationError> {
    operation
        .param(name)
        .and_then(Value::as_str)
        .ok_or_else(|| failure(operation, format!("missing parameter '{}'", name)))
}

fn apply(model: &mut ModelNode, operation: &ManagementOperation) -> Result<Value, ManagementOperationError> {
    let op = operation.operation.as_str();

    if op == COMPOSITE {
        return apply_composite(model, operation);
    }

    if op == ADD {
        let Some((child_type, name)) = operation.address.last() else {
            return Err(failure(operation, "cannot add the root resource"));
        };
        let parent_address = operation.address.parent().unwrap_or_default();
        let parent = model
            .node_at_mut(&parent_address)
            .ok_or_else(|| failure(operation, "parent resource not found"))?;
        let siblings = parent.children.entry(child_type.to_string()).or_default();
        if siblings.contains_key(name) {
            return Err(failure(operation, "resource already exists"));
        }
        let node = ModelNode {
            attributes: operation.params.clone(),
            children: BTreeMap::new(),
        };
        siblings.insert(name.to_string(), node);
        return Ok(Value::Null);
    }

    if op == REMOVE {
        let Some((child_type, name)) = operation.address.last() else {
            return Err(failure(operation, "cannot remove the root resource"));
        };
        let parent_address = operation.address.parent().unwrap_or_default();
        let parent = model
            .node_at_mut(&parent_address)
            .ok_or_else(|| failure(operation, "resource not found"))?;
        let siblings = parent
            .children
            .get_mut(child_type)
            .ok_or_else(|| failure(operation, "resource not found"))?;
        siblings
            .remove(name)
            .ok_or_else(|| failure(operation, "resource not found"))?;
        if siblings.is_empty() {
            parent.children.remove(child_type);
        }
        return Ok(Value::Null);
    }

    let node = model
        .node_at_mut(&operation.address)
        .ok_or_else(|| failure(operation, "resource not found"))?;

    match op {
        READ_RESOURCE => {
            let mut result = node.attributes.clone();
            for (child_type, children) in &node.children {
                let names: Map<String, Value> = children
                    .keys()
                    .map(|name| (name.clone(), Value::Null))
                    .collect();
                result.insert(child_type.clone(), Value::Object(names));
            }
            Ok(Value::Object(result))
        }
        READ_CHILDREN_NAMES => {
            let child_type = string_param(operation, "child-type")?;
            let names: Vec<Value> = node
                .children
                .get(child_type)
                .map(|children| children.keys().cloned().map(Value::String).collect())
                .unwrap_or_default();
            Ok(Value::Array(names))
        }
        READ_CHILDREN_TYPES => Ok(Value::Array(
            node.children.keys().cloned().map(Value::String).collect(),
        )),
        READ_ATTRIBUTE => {
            let name = string_param(operation, "name")?;
            Ok(node.attributes.get(name).cloned().unwrap_or(Value::Null))
        }
        WRITE_ATTRIBUTE => {
            let name = string_param(operation, "name")?.to_string();
            let value = operation.param("value").cloned().unwrap_or(Value::Null);
            node.attributes.insert(name, value);
            Ok(Value::Null)
        }
        UNDEFINE_ATTRIBUTE => {
            let name = string_param(operation, "name")?;
            node.attributes.remove(name);
            Ok(Value::Null)
        }
        other => Err(failure(operation, format!("unsupported operation '{}'", other))),
    }
}

fn apply_composite(model: &mut ModelNode, operation: &ManagementOperation) -> Result<Value, ManagementOperationError> {
    let steps = operation
        .param("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| failure(operation, "missing parameter 'steps'"))?;

    // Work on a copy so a failing step leaves the model untouched.
    let mut working = model.clone();
    let mut results = Vec::with_capacity(steps.len());
    for step in steps {
        let step: ManagementOperation = serde_json::from_value(step.clone())
            .map_err(|e| failure(operation, format!("malformed step: {}", e)))?;
        results.push(apply(&mut working, &step)?);
    }
    *model = working;
    Ok(Value::Array(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection() -> InMemoryConnection {
        let model = ModelNode::new()
            .with_attribute("name", "standalone")
            .with_child(
                "subsystem",
                "transactions",
                ModelNode::new().with_attribute("node-identifier", "1"),
            )
            .with_child("subsystem", "jmx", ModelNode::new());
        let connection = InMemoryConnection::new(model);
        connection.start().unwrap();
        connection
    }

    fn subsystem(name: &str) -> ResourceAddress {
        ResourceAddress::root().child("subsystem", name)
    }

    #[test]
    fn test_requires_start() {
        let connection = InMemoryConnection::new(ModelNode::new());
        let result = connection
            .execute_management_operation(&ManagementOperation::read_resource(ResourceAddress::root()));
        assert_eq!(result, Err(ManagementOperationError::NotStarted));
    }

    #[test]
    fn test_read_children_names_is_sorted() {
        let c = connection();
        let names = c
            .execute_management_operation(&ManagementOperation::read_children_names(
                ResourceAddress::root(),
                "subsystem",
            ))
            .unwrap();
        assert_eq!(names, json!(["jmx", "transactions"]));

        let none = c
            .execute_management_operation(&ManagementOperation::read_children_names(
                ResourceAddress::root(),
                "profile",
            ))
            .unwrap();
        assert_eq!(none, json!([]));
    }

    #[test]
    fn test_read_resource_lists_children() {
        let c = connection();
        let value = c
            .execute_management_operation(&ManagementOperation::read_resource(ResourceAddress::root()))
            .unwrap();
        assert_eq!(
            value,
            json!({"name": "standalone", "subsystem": {"jmx": null, "transactions": null}})
        );
    }

    #[test]
    fn test_attribute_operations() {
        let c = connection();
        let address = subsystem("transactions");
        c.execute_management_operation(&ManagementOperation::write_attribute(address.clone(), "timeout", 300))
            .unwrap();
        let value = c
            .execute_management_operation(&ManagementOperation::read_attribute(address.clone(), "timeout"))
            .unwrap();
        assert_eq!(value, json!(300));

        c.execute_management_operation(&ManagementOperation::undefine_attribute(address.clone(), "timeout"))
            .unwrap();
        let value = c
            .execute_management_operation(&ManagementOperation::read_attribute(address, "timeout"))
            .unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_add_and_remove() {
        let c = connection();
        let mut attributes = Map::new();
        attributes.insert("enabled".into(), json!(true));
        c.execute_management_operation(&ManagementOperation::add(subsystem("ee"), attributes))
            .unwrap();
        assert_eq!(
            c.snapshot().child("subsystem", "ee").unwrap().attributes.get("enabled"),
            Some(&json!(true))
        );

        let again = c.execute_management_operation(&ManagementOperation::add(subsystem("ee"), Map::new()));
        assert!(matches!(again, Err(ManagementOperationError::Failed { .. })));

        c.execute_management_operation(&ManagementOperation::remove(subsystem("ee")))
            .unwrap();
        assert!(c.snapshot().child("subsystem", "ee").is_none());

        let missing = c.execute_management_operation(&ManagementOperation::remove(subsystem("ee")));
        assert!(matches!(missing, Err(ManagementOperationError::Failed { .. })));
    }

    #[test]
    fn test_composite_is_atomic() {
        let c = connection();
        let before = c.snapshot();
        let result = c.execute_management_operation(&ManagementOperation::composite(vec![
            ManagementOperation::remove(subsystem("jmx")),
            ManagementOperation::remove(subsystem("does-not-exist")),
        ]));
        assert!(result.is_err());
        assert_eq!(c.snapshot(), before);

        c.execute_management_operation(&ManagementOperation::composite(vec![
            ManagementOperation::remove(subsystem("jmx")),
            ManagementOperation::write_attribute(subsystem("transactions"), "node-identifier", "2"),
        ]))
        .unwrap();
        let model = c.snapshot();
        assert!(model.child("subsystem", "jmx").is_none());
        assert_eq!(
            model.child("subsystem", "transactions").unwrap().attributes["node-identifier"],
            json!("2")
        );
    }

    #[test]
    fn test_json_round_trip() {
        let c = connection();
        let json = c.to_json_pretty().unwrap();
        let loaded = InMemoryConnection::from_json(&json).unwrap();
        assert_eq!(loaded.snapshot(), c.snapshot());
    }
}
