//! Addressing nodes by path.
//!
//! A [`Location`] is an ordered sequence of [`Step`]s, each naming a child
//! group and an index into it. The empty sequence denotes the root. Locations
//! never reference nodes, so they stay valid values across edits even when
//! they no longer resolve.

use std::fmt;

/// One step of a [`Location`]: the `index`-th child in group `group`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Step {
    /// Name of the child group to descend into.
    pub group: String,

    /// Position within that group.
    pub index: usize,
}

impl Step {
    /// Creates a step into `group` at `index`.
    #[must_use]
    pub fn new(group: impl Into<String>, index: usize) -> Self {
        Self {
            group: group.into(),
            index,
        }
    }
}

/// A path from the tree root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    steps: Vec<Step>,
}

impl Location {
    /// The location of the root node.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a location from its steps.
    #[must_use]
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// The steps making up this location, root first.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Returns `true` if this location addresses the root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps, i.e. the depth of the addressed node.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// The final step, or `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// The location of the parent node, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Location> {
        self.split_last().map(|(parent, _)| parent)
    }

    /// Splits into the parent location and the final step.
    #[must_use]
    pub fn split_last(&self) -> Option<(Location, &Step)> {
        let (last, init) = self.steps.split_last()?;
        Some((Location::from_steps(init.to_vec()), last))
    }

    /// The location of the `index`-th child in `group` below this node.
    #[must_use]
    pub fn child(&self, group: impl Into<String>, index: usize) -> Location {
        let mut steps = self.steps.clone();
        steps.push(Step::new(group, index));
        Location { steps }
    }

    /// The same location with the final index replaced.
    ///
    /// Returns `None` for the root, which has no index to replace.
    #[must_use]
    pub fn with_index(&self, index: usize) -> Option<Location> {
        let (parent, last) = self.split_last()?;
        Some(parent.child(last.group.clone(), index))
    }

    /// A location next to this one: same parent, different group.
    ///
    /// Returns `None` for the root, which has no siblings.
    #[must_use]
    pub fn in_sibling_group(&self, group: impl Into<String>, index: usize) -> Option<Location> {
        self.parent().map(|parent| parent.child(group, index))
    }

    /// Returns `true` if `self` equals `other` or is one of its ancestors.
    #[must_use]
    pub fn contains(&self, other: &Location) -> bool {
        other.steps.starts_with(&self.steps)
    }

    /// Rewrites this location as it would read after removing `removed`.
    ///
    /// Later siblings of the removed node (and everything below them) move
    /// one index down. Returns `None` if this location lies inside the
    /// removed subtree and therefore no longer exists.
    #[must_use]
    pub fn adjusted_for_removal(&self, removed: &Location) -> Option<Location> {
        if removed.contains(self) {
            return None;
        }
        let Some((parent, last)) = removed.split_last() else {
            return Some(self.clone());
        };
        if !parent.contains(self) || self.depth() <= parent.depth() {
            return Some(self.clone());
        }

        let mut steps = self.steps.clone();
        let step = &mut steps[parent.depth()];
        if step.group == last.group && step.index > last.index {
            step.index -= 1;
        }
        Some(Location { steps })
    }
}

impl FromIterator<Step> for Location {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self::from_steps(iter.into_iter().collect())
    }
}

impl<S: Into<String>, const N: usize> From<[(S, usize); N]> for Location {
    fn from(steps: [(S, usize); N]) -> Self {
        steps
            .into_iter()
            .map(|(group, index)| Step::new(group, index))
            .collect()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for step in &self.steps {
            write!(f, "/{}[{}]", step.group, step.index)?;
        }
        Ok(())
    }
}

/// Where a dragged node should land, relative to what is already there.
///
/// Resolved into a concrete insertion [`Location`] by
/// [`Tree::drop_location`](crate::tree::Tree::drop_location).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Directly in front of the node at this location.
    Before(Location),

    /// Directly behind the node at this location.
    After(Location),

    /// At the start of `group` below `parent`.
    FirstIn {
        /// The node owning the group.
        parent: Location,
        /// The group to insert into.
        group: String,
    },

    /// At the end of `group` below `parent`.
    LastIn {
        /// The node owning the group.
        parent: Location,
        /// The group to insert into.
        group: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_display() {
        assert_eq!(Location::root().to_string(), "/");
        assert_eq!(
            Location::from([("lhs", 0), ("rhs", 2)]).to_string(),
            "/lhs[0]/rhs[2]"
        );
    }

    #[test]
    fn test_parent_and_child() {
        let loc = Location::from([("a", 1), ("b", 0)]);
        assert_eq!(loc.parent(), Some(Location::from([("a", 1)])));
        assert_eq!(Location::from([("a", 1)]).child("b", 0), loc);
        assert_eq!(Location::root().parent(), None);
    }

    #[test]
    fn test_sibling_group() {
        let loc = Location::from([("c0", 0)]);
        assert_eq!(
            loc.in_sibling_group("c1", 0),
            Some(Location::from([("c1", 0)]))
        );
        assert_eq!(Location::root().in_sibling_group("c1", 0), None);
    }

    #[test]
    fn test_contains() {
        let outer = Location::from([("a", 1)]);
        assert!(Location::root().contains(&outer));
        assert!(outer.contains(&outer));
        assert!(outer.contains(&outer.child("b", 3)));
        assert!(!outer.contains(&Location::from([("a", 2)])));
    }

    #[test]
    fn test_adjusted_for_removal_shifts_later_siblings() {
        let removed = Location::from([("a", 1)]);
        assert_eq!(
            Location::from([("a", 3), ("b", 0)]).adjusted_for_removal(&removed),
            Some(Location::from([("a", 2), ("b", 0)]))
        );
        assert_eq!(
            Location::from([("a", 0)]).adjusted_for_removal(&removed),
            Some(Location::from([("a", 0)]))
        );
        assert_eq!(
            Location::from([("x", 5)]).adjusted_for_removal(&removed),
            Some(Location::from([("x", 5)]))
        );
    }

    #[test]
    fn test_adjusted_for_removal_inside_removed_subtree() {
        let removed = Location::from([("a", 1)]);
        assert_eq!(
            Location::from([("a", 1), ("b", 0)]).adjusted_for_removal(&removed),
            None
        );
        assert_eq!(removed.adjusted_for_removal(&removed), None);
    }
}
