//! Resource selectors.
//!
//! A selector maps a starting resource to an ordered list of resources. They
//! compose as "select type T [named N] under parent P" and walk the tree one
//! level at a time, so the same selector works whatever the server mode puts
//! above the resources it looks for.

use crate::{ManageableResource, ResourceType};
use confmig_core::ManagementOperationError;
use std::rc::Rc;

type SelectFn = dyn Fn(&Rc<ManageableResource>) -> Result<Vec<Rc<ManageableResource>>, ManagementOperationError>;

/// Pure function from a resource to an ordered sequence of resources.
///
/// Evaluation order is deterministic and is the order in which fanned-out
/// subtasks execute.
#[derive(Clone)]
pub struct ManageableResourceSelector {
    description: String,
    select: Rc<SelectFn>,
}

impl ManageableResourceSelector {
    /// Create a selector from a function.
    pub fn from_fn<F>(description: impl Into<String>, select: F) -> Self
    where
        F: Fn(&Rc<ManageableResource>) -> Result<Vec<Rc<ManageableResource>>, ManagementOperationError> + 'static,
    {
        Self {
            description: description.into(),
            select: Rc::new(select),
        }
    }

    /// Select the starting resource itself.
    pub fn current() -> Self {
        Self::from_fn(".", |resource| Ok(vec![Rc::clone(resource)]))
    }

    /// Select every child of a type.
    pub fn children(resource_type: ResourceType) -> Self {
        Self::from_fn(format!("{}=*", resource_type), move |resource| {
            resource.get_child_resources(&resource_type)
        })
    }

    /// Select the child of a type with a name; empty if it does not exist.
    pub fn child(resource_type: ResourceType, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::from_fn(format!("{}={}", resource_type, name), move |resource| {
            Ok(resource
                .get_child_resource(&resource_type, &name)?
                .into_iter()
                .collect())
        })
    }

    /// Select the children of a type whose name is in `names`, in child order.
    pub fn children_named<I, S>(resource_type: ResourceType, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self::from_fn(format!("{}={}", resource_type, names.join("|")), move |resource| {
            Ok(resource
                .get_child_resources(&resource_type)?
                .into_iter()
                .filter(|child| names.iter().any(|n| n == child.name()))
                .collect())
        })
    }

    /// Select every resource of a type at any depth below the starting
    /// resource, depth first, children in type then name order.
    pub fn descendants(resource_type: ResourceType) -> Self {
        Self::from_fn(format!("**/{}=*", resource_type), move |resource| {
            let mut found = Vec::new();
            collect_descendants(resource, &resource_type, &mut found)?;
            Ok(found)
        })
    }

    /// Evaluate `next` from every resource this selector yields.
    pub fn then(self, next: ManageableResourceSelector) -> Self {
        let description = format!("{}/{}", self.description, next.description);
        Self::from_fn(description, move |resource| {
            let mut selected = Vec::new();
            for parent in self.select(resource)? {
                selected.extend(next.select(&parent)?);
            }
            Ok(selected)
        })
    }

    /// Evaluate this selector under every resource `parent` yields.
    pub fn under(self, parent: ManageableResourceSelector) -> Self {
        parent.then(self)
    }

    /// Concatenate the results of two selectors.
    pub fn or(self, other: ManageableResourceSelector) -> Self {
        let description = format!("({} | {})", self.description, other.description);
        Self::from_fn(description, move |resource| {
            let mut selected = self.select(resource)?;
            selected.extend(other.select(resource)?);
            Ok(selected)
        })
    }

    /// Keep only the resources matching a predicate.
    pub fn filter<P>(self, predicate: P) -> Self
    where
        P: Fn(&ManageableResource) -> bool + 'static,
    {
        let description = format!("{}[?]", self.description);
        Self::from_fn(description, move |resource| {
            Ok(self
                .select(resource)?
                .into_iter()
                .filter(|r| predicate(r.as_ref()))
                .collect())
        })
    }

    /// Evaluate the selector.
    pub fn select(&self, from: &Rc<ManageableResource>) -> Result<Vec<Rc<ManageableResource>>, ManagementOperationError> {
        (self.select)(from)
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for ManageableResourceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ManageableResourceSelector")
            .field(&self.description)
            .finish()
    }
}

fn collect_descendants(
    resource: &Rc<ManageableResource>,
    resource_type: &ResourceType,
    found: &mut Vec<Rc<ManageableResource>>,
) -> Result<(), ManagementOperationError> {
    for child_type in resource.get_child_resource_types()? {
        for child in resource.get_child_resources(&child_type)? {
            if child.resource_type() == resource_type {
                found.push(Rc::clone(&child));
            }
            collect_descendants(&child, resource_type, found)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigurationConnection, InMemoryConnection, ModelNode, ResourceAddress};

    fn domain() -> Rc<ManageableResource> {
        let profile = |subsystems: &[&str]| {
            subsystems.iter().fold(ModelNode::new(), |node, name| {
                node.with_child("subsystem", *name, ModelNode::new())
            })
        };
        let model = ModelNode::new()
            .with_child("profile", "default", profile(&["jmx", "transactions"]))
            .with_child("profile", "full", profile(&["jacorb", "jmx", "transactions"]))
            .with_child(
                "host",
                "primary",
                ModelNode::new().with_child("subsystem", "jmx", ModelNode::new()),
            );
        let connection = Rc::new(InMemoryConnection::new(model));
        connection.start().unwrap();
        ManageableResource::root(ResourceType::DOMAIN, "domain", ResourceAddress::root(), connection)
    }

    fn addresses(resources: &[Rc<ManageableResource>]) -> Vec<String> {
        resources.iter().map(|r| r.address().to_string()).collect()
    }

    #[test]
    fn test_child_under_parent() {
        let root = domain();
        let selector = ManageableResourceSelector::child(ResourceType::SUBSYSTEM, "transactions")
            .under(ManageableResourceSelector::children(ResourceType::PROFILE));
        assert_eq!(
            addresses(&selector.select(&root).unwrap()),
            vec![
                "/profile=default/subsystem=transactions",
                "/profile=full/subsystem=transactions",
            ]
        );
    }

    #[test]
    fn test_missing_named_resource_selects_nothing() {
        let root = domain();
        let selector = ManageableResourceSelector::child(ResourceType::SUBSYSTEM, "messaging")
            .under(ManageableResourceSelector::children(ResourceType::PROFILE));
        assert!(selector.select(&root).unwrap().is_empty());

        let no_parent = ManageableResourceSelector::children(ResourceType::SUBSYSTEM)
            .under(ManageableResourceSelector::child(ResourceType::PROFILE, "ha"));
        assert!(no_parent.select(&root).unwrap().is_empty());
    }

    #[test]
    fn test_descendants_ignore_depth() {
        let root = domain();
        let selector = ManageableResourceSelector::descendants(ResourceType::new("subsystem"))
            .filter(|r| r.name() == "jmx");
        assert_eq!(
            addresses(&selector.select(&root).unwrap()),
            vec![
                "/host=primary/subsystem=jmx",
                "/profile=default/subsystem=jmx",
                "/profile=full/subsystem=jmx",
            ]
        );
    }

    #[test]
    fn test_children_named_keeps_child_order() {
        let root = domain();
        let selector = ManageableResourceSelector::children_named(ResourceType::SUBSYSTEM, ["transactions", "jacorb"])
            .under(ManageableResourceSelector::child(ResourceType::PROFILE, "full"));
        assert_eq!(
            addresses(&selector.select(&root).unwrap()),
            vec!["/profile=full/subsystem=jacorb", "/profile=full/subsystem=transactions"]
        );
    }

    #[test]
    fn test_or_and_current() {
        let root = domain();
        let selector = ManageableResourceSelector::current()
            .or(ManageableResourceSelector::child(ResourceType::HOST, "primary"));
        assert_eq!(addresses(&selector.select(&root).unwrap()), vec!["/", "/host=primary"]);
        assert_eq!(selector.description(), "(. | host=primary)");
    }
}
