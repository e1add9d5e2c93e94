//! Resource addresses.

use serde::{Deserialize, Serialize};

/// Path from the management root to a resource, as `(type, name)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceAddress(Vec<(String, String)>);

impl ResourceAddress {
    /// The root address.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create an address from its elements.
    pub fn new<I, K, V>(elements: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(elements.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Address of a child of this resource.
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut elements = self.0.clone();
        elements.push((resource_type.into(), name.into()));
        Self(elements)
    }

    /// Address of the parent, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(Self(parent.to_vec()))
    }

    /// Last element.
    pub fn last(&self) -> Option<(&str, &str)> {
        self.0.last().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Address elements.
    pub fn elements(&self) -> &[(String, String)] {
        &self.0
    }

    /// Whether this is the root address.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<ResourceAddress> for serde_json::Value {
    fn from(address: ResourceAddress) -> Self {
        address
            .0
            .into_iter()
            .map(|(resource_type, name)| serde_json::Value::Array(vec![resource_type.into(), name.into()]))
            .collect()
    }
}

impl std::fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (k, v) in &self.0 {
            write!(f, "/{}={}", k, v)?;
        }
        Ok(())
    }
}
