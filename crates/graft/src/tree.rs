//! Persistent syntax trees.
//!
//! A [`Tree`] owns an optional root [`Node`]. All edit operations are pure:
//! they take `&self` and return a new tree in which only the nodes on the
//! path from the root to the edited node have been rebuilt. Everything else
//! is shared by reference with the original, so keeping old trees around for
//! undo or comparison is cheap.
//!
//! Edits are pure mechanism. None of them consults a grammar; deciding
//! whether an edit is acceptable is the job of [`crate::validate`] and
//! [`crate::legality`].

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::location::{DropTarget, Location, Step};

mod description;
mod node;

pub use description::NodeDescription;
pub use node::Node;

/// An immutable syntax tree, possibly without any node at all.
///
/// The empty tree stands for "no program yet" and is different from a tree
/// holding a single empty node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    root: Option<Arc<Node>>,
}

impl Tree {
    /// The tree without a root.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A tree with the given root node.
    #[must_use]
    pub fn new(root: Node) -> Self {
        Self {
            root: Some(Arc::new(root)),
        }
    }

    /// Builds a tree from its wire description.
    #[must_use]
    pub fn from_description(description: &NodeDescription) -> Self {
        Self::new(description.to_node())
    }

    /// Parse a tree from a JSON node description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParse`] if the JSON is not a node description.
    pub fn from_json(json: &str) -> Result<Self> {
        NodeDescription::from_json(json).map(|d| Self::from_description(&d))
    }

    /// Serializes the tree back into its wire description.
    ///
    /// Returns `None` for the empty tree.
    #[must_use]
    pub fn to_description(&self) -> Option<NodeDescription> {
        self.root.as_deref().map(NodeDescription::from)
    }

    /// Returns `true` if the tree has no root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The root node, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Arc<Node>> {
        self.root.as_ref()
    }

    /// Total number of nodes in the tree.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.subtree_size())
    }

    /// Resolves a location to the node it addresses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if the tree is empty or any step
    /// names a missing group or an out-of-range index.
    pub fn locate(&self, location: &Location) -> Result<&Arc<Node>> {
        self.locate_or_none(location)
            .ok_or_else(|| Error::LocationNotFound(location.clone()))
    }

    /// Resolves a location, returning `None` instead of failing.
    #[must_use]
    pub fn locate_or_none(&self, location: &Location) -> Option<&Arc<Node>> {
        let mut current = self.root.as_ref()?;
        for step in location.steps() {
            current = current.child(step)?;
        }
        Some(current)
    }

    /// Inserts a new node at `location`.
    ///
    /// The node currently at that index and all later siblings move one index
    /// up. The group is created if the parent does not have it yet. Inserting
    /// at the root location of an empty tree creates the root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if the parent cannot be resolved or
    /// the index lies past the end of the group, and [`Error::RootOccupied`]
    /// when inserting a root into a non-empty tree.
    pub fn insert_node(&self, location: &Location, node: &NodeDescription) -> Result<Tree> {
        let Some((parent, step)) = location.split_last() else {
            if self.is_empty() {
                return Ok(Tree::from_description(node));
            }
            return Err(Error::RootOccupied);
        };

        let new_child = Arc::new(node.to_node());
        self.edit_at(&parent, location, |target| {
            let mut edited = target.clone();
            let group = edited.children_mut().entry(step.group.clone()).or_default();
            if step.index > group.len() {
                return Err(Error::LocationNotFound(location.clone()));
            }
            group.insert(step.index, new_child);
            Ok(edited)
        })
    }

    /// Replaces the node at `location` (and its subtree) with a new node.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve.
    pub fn replace_node(&self, location: &Location, node: &NodeDescription) -> Result<Tree> {
        let replacement = node.to_node();
        self.edit_at(location, location, |_| Ok(replacement))
    }

    /// Removes the node at `location`; later siblings move one index down.
    ///
    /// Deleting the root leaves the empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve.
    pub fn delete_node(&self, location: &Location) -> Result<Tree> {
        let Some((parent, step)) = location.split_last() else {
            self.locate(location)?;
            return Ok(Tree::empty());
        };

        self.edit_at(&parent, location, |target| {
            let mut edited = target.clone();
            let group = edited
                .children_mut()
                .get_mut(&step.group)
                .filter(|group| step.index < group.len())
                .ok_or_else(|| Error::LocationNotFound(location.clone()))?;
            group.remove(step.index);
            Ok(edited)
        })
    }

    /// Moves the node at `from` so that it ends up at `to`.
    ///
    /// `to` is read against the current tree. If removing the node shifts
    /// the destination (a later sibling in the same group, or something below
    /// one), the shift is accounted for.
    ///
    /// # Errors
    ///
    /// Moving a node onto its own slot leaves the tree as it is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMove`] when `to` lies strictly below `from`,
    /// and [`Error::LocationNotFound`] when either location does not resolve.
    pub fn move_node(&self, from: &Location, to: &Location) -> Result<Tree> {
        let moved = NodeDescription::from(self.locate(from)?.as_ref());
        if to == from {
            return Ok(self.clone());
        }
        let Some(adjusted) = to.adjusted_for_removal(from) else {
            return Err(Error::InvalidMove {
                from: from.clone(),
                to: to.clone(),
            });
        };
        self.delete_node(from)?.insert_node(&adjusted, &moved)
    }

    /// Sets a property on the node at `location`, overwriting any old value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve.
    pub fn set_property(&self, location: &Location, key: &str, value: &str) -> Result<Tree> {
        self.edit_at(location, location, |target| {
            let mut edited = target.clone();
            edited
                .properties_mut()
                .insert(key.to_string(), value.to_string());
            Ok(edited)
        })
    }

    /// Renames a property, keeping its value and position.
    ///
    /// An existing property called `new_key` is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve and
    /// [`Error::PropertyNotFound`] if the node has no property `old_key`.
    pub fn rename_property(&self, location: &Location, old_key: &str, new_key: &str) -> Result<Tree> {
        self.edit_at(location, location, |target| {
            if !target.properties().contains_key(old_key) {
                return Err(Error::PropertyNotFound {
                    location: location.clone(),
                    key: old_key.to_string(),
                });
            }
            let renamed: IndexMap<String, String> = target
                .properties()
                .iter()
                .filter(|(key, _)| key.as_str() != new_key || old_key == new_key)
                .map(|(key, value)| {
                    let key = if key == old_key { new_key } else { key.as_str() };
                    (key.to_string(), value.clone())
                })
                .collect();
            let mut edited = target.clone();
            *edited.properties_mut() = renamed;
            Ok(edited)
        })
    }

    /// Removes a property. Removing an absent property changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve.
    pub fn delete_property(&self, location: &Location, key: &str) -> Result<Tree> {
        self.edit_at(location, location, |target| {
            let mut edited = target.clone();
            edited.properties_mut().shift_remove(key);
            Ok(edited)
        })
    }

    /// Adds an empty child group to the node at `location`.
    ///
    /// If the group already exists the tree is returned unchanged, sharing
    /// its root with `self`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if `location` does not resolve.
    pub fn add_child_group(&self, location: &Location, group: &str) -> Result<Tree> {
        if self.locate(location)?.has_group(group) {
            return Ok(self.clone());
        }
        self.edit_at(location, location, |target| {
            Ok(target.clone().with_group(group))
        })
    }

    /// Resolves a drop target into the location a new node would occupy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LocationNotFound`] if the anchor (for `Before` and
    /// `After`) or the parent (for `FirstIn` and `LastIn`) does not resolve.
    /// The root has no siblings, so it cannot anchor `Before` or `After`.
    pub fn drop_location(&self, target: &DropTarget) -> Result<Location> {
        match target {
            DropTarget::Before(anchor) => {
                self.locate(anchor)?;
                if anchor.is_root() {
                    return Err(Error::LocationNotFound(anchor.clone()));
                }
                Ok(anchor.clone())
            }
            DropTarget::After(anchor) => {
                self.locate(anchor)?;
                let index = anchor.last().map(|step| step.index + 1);
                index
                    .and_then(|index| anchor.with_index(index))
                    .ok_or_else(|| Error::LocationNotFound(anchor.clone()))
            }
            DropTarget::FirstIn { parent, group } => {
                self.locate(parent)?;
                Ok(parent.child(group.clone(), 0))
            }
            DropTarget::LastIn { parent, group } => {
                let count = self.locate(parent)?.children_in(group).len();
                Ok(parent.child(group.clone(), count))
            }
        }
    }

    /// Rebuilds the path to `target`, replacing that node with `edit`'s result.
    ///
    /// `reported` is the location named in errors, which for group edits is
    /// the child location the caller asked about rather than its parent.
    fn edit_at<F>(&self, target: &Location, reported: &Location, edit: F) -> Result<Tree>
    where
        F: FnOnce(&Node) -> Result<Node>,
    {
        let root = self
            .root
            .as_ref()
            .ok_or_else(|| Error::LocationNotFound(reported.clone()))?;
        let rebuilt = rebuild(root, target.steps(), reported, edit)?;
        Ok(Tree {
            root: Some(Arc::new(rebuilt)),
        })
    }
}

fn rebuild<F>(node: &Node, steps: &[Step], reported: &Location, edit: F) -> Result<Node>
where
    F: FnOnce(&Node) -> Result<Node>,
{
    let Some((step, rest)) = steps.split_first() else {
        return edit(node);
    };
    let child = node
        .child(step)
        .ok_or_else(|| Error::LocationNotFound(reported.clone()))?;
    let new_child = rebuild(child, rest, reported, edit)?;

    let mut edited = node.clone();
    if let Some(slot) = edited
        .children_mut()
        .get_mut(&step.group)
        .and_then(|group| group.get_mut(step.index))
    {
        *slot = Arc::new(new_child);
    }
    Ok(edited)
}
