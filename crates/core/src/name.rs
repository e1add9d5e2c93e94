//! Task names - the report key and audit label of every executed task.

use serde::{Deserialize, Serialize};

/// The name of a task: a base name plus an ordered set of attributes.
///
/// The base name identifies the logical step (`subsystem.transactions.migrate-object-store`),
/// the attributes distinguish repeated instantiations of that step, e.g. one
/// per resource the step fanned out over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskName {
    /// Base name
    name: String,

    /// Attributes, in insertion order, keys unique
    attributes: Vec<(String, String)>,
}

impl TaskName {
    /// Create a name without attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Return a copy of this name with an attribute set.
    ///
    /// Setting a key that is already present replaces its value in place.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.attributes.push((key, value)),
        }
        self
    }

    /// Get the base name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over the attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if self.attributes.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, (k, v)) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        f.write_str(")")
    }
}

impl From<&str> for TaskName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TaskName {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
