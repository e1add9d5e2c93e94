//! Provider registry.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifies the installation being migrated from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Product name
    pub product: String,
    /// Product version; `None` stands for every version
    pub version: Option<String>,
}

impl SourceDescriptor {
    /// Describe one version of a product.
    pub fn new(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: Some(version.into()),
        }
    }

    /// Describe every version of a product.
    pub fn any_version(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: None,
        }
    }
}

impl std::fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{} {}", self.product, version),
            None => write!(f, "{} (any version)", self.product),
        }
    }
}

/// Registry mapping source installations to providers.
///
/// Lookup tries the exact product and version first, then the product-wide
/// entry.
pub struct ProviderRegistry<P> {
    providers: BTreeMap<SourceDescriptor, P>,
}

impl<P> ProviderRegistry<P> {
    /// Create a new registry.
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider, returning the one it replaces.
    pub fn register(&mut self, source: SourceDescriptor, provider: P) -> Option<P> {
        self.providers.insert(source, provider)
    }

    /// Unregister a provider.
    pub fn unregister(&mut self, source: &SourceDescriptor) -> Option<P> {
        self.providers.remove(source)
    }

    /// Find the provider for a source.
    pub fn lookup(&self, source: &SourceDescriptor) -> Option<&P> {
        self.providers.get(source).or_else(|| {
            source
                .version
                .as_ref()
                .and_then(|_| self.providers.get(&SourceDescriptor::any_version(source.product.as_str())))
        })
    }

    /// List the registered sources.
    pub fn sources(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.providers.keys()
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<P> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}
