//! Deciding where a dragged node may be dropped.
//!
//! While something is being dragged, every potential drop location is asked
//! for its [`TargetState`] on each pointer move. The answer comes from a
//! per-location visibility [`Expression`] evaluated over a handful of
//! [`Signal`]s. Some signals are a length check; `ifLegalChild` inserts the
//! candidate into a copy of the tree and validates the whole result. All
//! signals are bound lazily, so the expensive ones only run when the
//! expression really needs them.
//!
//! The predicates behind the signals are also exported as free functions for
//! callers that want to ask "what is missing in this tree" without a drag.

use log::{debug, trace};
use std::cell::Cell;

use crate::expr::{evaluate, Expression, Variables};
use crate::grammar::{ChildGroup, Grammar};
use crate::location::Location;
use crate::tree::{Node, NodeDescription, Tree};
use crate::validate::validate_from_root;

/// The named inputs available to visibility expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The addressed group currently has no children.
    IfEmpty,
    /// The candidate's type fits the addressed group and the group has room.
    IfLegalDrag,
    /// Dropping the candidate yields a tree without validation errors.
    IfLegalChild,
    /// The addressed group is below its minimum and wants a child.
    IfChildrenRequired,
    /// Some drag is in progress.
    IfAnyDrag,
}

impl Signal {
    /// Every signal, in a fixed order.
    pub const ALL: [Signal; 5] = [
        Signal::IfEmpty,
        Signal::IfLegalDrag,
        Signal::IfLegalChild,
        Signal::IfChildrenRequired,
        Signal::IfAnyDrag,
    ];

    /// The variable name this signal is bound to.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Signal::IfEmpty => "ifEmpty",
            Signal::IfLegalDrag => "ifLegalDrag",
            Signal::IfLegalChild => "ifLegalChild",
            Signal::IfChildrenRequired => "ifChildrenRequired",
            Signal::IfAnyDrag => "ifAnyDrag",
        }
    }
}

/// The thing being dragged.
///
/// A single palette entry may materialize as one of several node shapes; a
/// drop is acceptable if any one of them fits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropCandidate {
    alternatives: Vec<NodeDescription>,
}

impl DropCandidate {
    /// A candidate with several possible shapes.
    #[must_use]
    pub fn new(alternatives: Vec<NodeDescription>) -> Self {
        Self { alternatives }
    }

    /// A candidate with exactly one shape.
    #[must_use]
    pub fn single(node: NodeDescription) -> Self {
        Self::new(vec![node])
    }

    /// The possible shapes, in preference order.
    #[must_use]
    pub fn alternatives(&self) -> &[NodeDescription] {
        &self.alternatives
    }
}

/// The current drag, as reported by the user interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragState {
    /// What is being dragged, `None` when no drag is in progress.
    pub candidate: Option<DropCandidate>,
    /// The drop location the pointer is over, if any.
    pub hovered: Option<Location>,
}

impl DragState {
    /// No drag in progress.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// A drag that is not over any drop location.
    #[must_use]
    pub fn dragging(candidate: DropCandidate) -> Self {
        Self {
            candidate: Some(candidate),
            hovered: None,
        }
    }

    /// The same drag, now hovering over `location`.
    #[must_use]
    pub fn hovering(mut self, location: Location) -> Self {
        self.hovered = Some(location);
        self
    }

    /// Returns `true` if a drag is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.candidate.is_some()
    }
}

/// How a drop location should present itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No drag in progress, nothing to say.
    Unknown,
    /// The pointer is right over this location.
    Targeted,
    /// The location accepts the current drag.
    ValidTarget,
    /// The location rejects the current drag.
    InvalidTarget,
}

/// Legality questions about one tree under one grammar.
#[derive(Debug, Clone)]
pub struct DropLegality<'a> {
    tree: &'a Tree,
    grammar: &'a Grammar,
    embraces: Cell<usize>,
}

impl<'a> DropLegality<'a> {
    /// Binds the engine to a tree snapshot and its grammar.
    #[must_use]
    pub fn new(tree: &'a Tree, grammar: &'a Grammar) -> Self {
        Self {
            tree,
            grammar,
            embraces: Cell::new(0),
        }
    }

    /// How many times this engine has run the `ifLegalChild` check.
    #[must_use]
    pub fn embrace_checks(&self) -> usize {
        self.embraces.get()
    }

    /// The visibility expression used when a location configures none.
    #[must_use]
    pub fn default_visibility() -> Expression {
        Expression::var(Signal::IfLegalDrag.name())
    }

    /// Binds every [`Signal`] for `location` and `candidate`.
    ///
    /// Only `ifAnyDrag` is a plain value; everything else is computed when an
    /// expression first reaches it.
    #[must_use]
    pub fn signals<'s>(
        &'s self,
        location: &'s Location,
        candidate: &'s DropCandidate,
        drag_active: bool,
    ) -> Variables<'s> {
        let (tree, grammar, embraces) = (self.tree, self.grammar, &self.embraces);
        Variables::new()
            .with_value(Signal::IfAnyDrag.name(), drag_active)
            .with_lazy(Signal::IfEmpty.name(), move || is_empty_slot(tree, location))
            .with_lazy(Signal::IfLegalDrag.name(), move || {
                is_legal_immediate_child(tree, grammar, location, candidate)
            })
            .with_lazy(Signal::IfLegalChild.name(), move || {
                embraces.set(embraces.get() + 1);
                is_legal_child(tree, grammar, location, candidate)
            })
            .with_lazy(Signal::IfChildrenRequired.name(), move || {
                is_child_required(tree, grammar, location)
            })
    }

    /// Decides how `location` should present itself during `drag`.
    ///
    /// The hovered location is always [`TargetState::Targeted`]. Without a
    /// drag the state is [`TargetState::Unknown`]. Otherwise `visibility`
    /// (or [`DropLegality::default_visibility`]) decides between valid and
    /// invalid.
    #[must_use]
    pub fn target_state(
        &self,
        location: &Location,
        drag: &DragState,
        visibility: Option<&Expression>,
    ) -> TargetState {
        let Some(candidate) = &drag.candidate else {
            return TargetState::Unknown;
        };
        if drag.hovered.as_ref() == Some(location) {
            return TargetState::Targeted;
        }

        let default = Self::default_visibility();
        let expression = visibility.unwrap_or(&default);
        let variables = self.signals(location, candidate, true);
        let state = if evaluate(expression, &variables) {
            TargetState::ValidTarget
        } else {
            TargetState::InvalidTarget
        };

        debug!(location:? = location, state:? = state; "Computed drop target state");
        state
    }

    /// Returns `true` if some alternative of `candidate` could replace the
    /// node at `location` and leave a tree without validation errors.
    #[must_use]
    pub fn is_legal_replacement(&self, location: &Location, candidate: &DropCandidate) -> bool {
        candidate.alternatives().iter().any(|alt| {
            self.tree
                .replace_node(location, alt)
                .is_ok_and(|replaced| validate_from_root(&replaced, self.grammar).is_valid())
        })
    }
}

/// Returns `true` if the group addressed by `location` has no children.
///
/// For the root location this asks whether the tree is empty. A location
/// whose parent does not resolve has no group and is not empty.
#[must_use]
pub fn is_empty_slot(tree: &Tree, location: &Location) -> bool {
    let Some((parent, step)) = location.split_last() else {
        return tree.is_empty();
    };
    tree.locate_or_none(&parent)
        .is_some_and(|node| node.children_in(&step.group).is_empty())
}

/// Returns `true` if the group addressed by `location` is below its minimum.
///
/// The root location is required exactly when the tree is empty. Locations
/// whose parent does not resolve, or whose group the parent's type does not
/// declare, are never required.
#[must_use]
pub fn is_child_required(tree: &Tree, grammar: &Grammar, location: &Location) -> bool {
    let Some((parent, step)) = location.split_last() else {
        return tree.is_empty();
    };
    let Some(node) = tree.locate_or_none(&parent) else {
        return false;
    };
    declared_group(grammar, node, &step.group)
        .is_some_and(|group| group.cardinality.missing(node.children_in(&step.group).len()) > 0)
}

/// Returns `true` if some alternative of `candidate` may be inserted at
/// `location` judging by the parent's type alone.
///
/// The parent's group must accept the alternative's type and have room for
/// one more child. Nothing beyond the parent is checked. An empty tree has no
/// parent to ask, so this is always `false` there, as it is for the root.
#[must_use]
pub fn is_legal_immediate_child(
    tree: &Tree,
    grammar: &Grammar,
    location: &Location,
    candidate: &DropCandidate,
) -> bool {
    let Some((parent, step)) = location.split_last() else {
        return false;
    };
    let Some(node) = tree.locate_or_none(&parent) else {
        return false;
    };
    let Some(group) = declared_group(grammar, node, &step.group) else {
        return false;
    };
    if !group.cardinality.allows_one_more(node.children_in(&step.group).len()) {
        return false;
    }
    candidate
        .alternatives()
        .iter()
        .any(|alt| grammar.group_accepts(group, &alt.qualified_name()))
}

/// The group `name` as declared by the concrete type `node` resolves to.
///
/// Nodes typed as an alternative resolve the same way the validator resolves
/// them, so both agree on which groups a node has.
fn declared_group<'g>(grammar: &'g Grammar, node: &Node, name: &str) -> Option<&'g ChildGroup> {
    grammar.concrete_type_of(node)?.child_group(name)
}

/// Returns `true` if inserting some alternative of `candidate` at `location`
/// yields a tree without any validation errors.
///
/// Each attempt inserts into a throwaway copy and validates the whole tree.
/// An insertion that cannot even be performed counts as illegal.
#[must_use]
pub fn is_legal_child(
    tree: &Tree,
    grammar: &Grammar,
    location: &Location,
    candidate: &DropCandidate,
) -> bool {
    trace!(location:? = location, alternatives = candidate.alternatives().len(); "Validating hypothetical drop");
    candidate.alternatives().iter().any(|alt| {
        tree.insert_node(location, alt)
            .is_ok_and(|embraced| validate_from_root(&embraced, grammar).is_valid())
    })
}
