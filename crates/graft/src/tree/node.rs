//! Immutable tree nodes.

use indexmap::IndexMap;
use std::sync::Arc;

use crate::location::Step;
use crate::name::QualifiedTypeName;

/// A single node of a syntax tree.
///
/// Nodes are never mutated once built. Children are held behind [`Arc`] so
/// that edited trees can share every subtree that was not on the edited path
/// with the tree they were derived from.
///
/// Properties and child groups keep their insertion order. Equality ignores
/// that order, it compares names, values and children only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: QualifiedTypeName,
    properties: IndexMap<String, String>,
    children: IndexMap<String, Vec<Arc<Node>>>,
}

impl Node {
    /// Creates a node of the given type without properties or children.
    #[must_use]
    pub fn new(name: QualifiedTypeName) -> Self {
        Self {
            name,
            properties: IndexMap::new(),
            children: IndexMap::new(),
        }
    }

    /// Adds a property, replacing an earlier value for the same key.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Appends a child to `group`, creating the group if needed.
    #[must_use]
    pub fn with_child(mut self, group: impl Into<String>, child: Node) -> Self {
        self.children
            .entry(group.into())
            .or_default()
            .push(Arc::new(child));
        self
    }

    /// Declares an empty child group if it is not present yet.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.children.entry(group.into()).or_default();
        self
    }

    /// The qualified type name this node claims to be.
    #[must_use]
    pub fn name(&self) -> &QualifiedTypeName {
        &self.name
    }

    /// All properties in insertion order.
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, String> {
        &self.properties
    }

    /// The value of a single property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// All child groups in insertion order.
    #[must_use]
    pub fn children(&self) -> &IndexMap<String, Vec<Arc<Node>>> {
        &self.children
    }

    /// The children of one group. Absent and empty groups both yield `&[]`.
    #[must_use]
    pub fn children_in(&self, group: &str) -> &[Arc<Node>] {
        self.children.get(group).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if the node has a (possibly empty) group of this name.
    #[must_use]
    pub fn has_group(&self, group: &str) -> bool {
        self.children.contains_key(group)
    }

    /// The direct child addressed by a single step.
    #[must_use]
    pub fn child(&self, step: &Step) -> Option<&Arc<Node>> {
        self.children.get(&step.group)?.get(step.index)
    }

    /// Number of nodes in this subtree, including this one.
    #[must_use]
    pub fn subtree_size(&self) -> usize {
        1 + self
            .children
            .values()
            .flatten()
            .map(|child| child.subtree_size())
            .sum::<usize>()
    }

    pub(crate) fn properties_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.properties
    }

    pub(crate) fn children_mut(&mut self) -> &mut IndexMap<String, Vec<Arc<Node>>> {
        &mut self.children
    }
}
