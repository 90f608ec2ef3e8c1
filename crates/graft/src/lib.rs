//! Grammar-guarded structural syntax trees.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::multiple_crate_versions)]

/// Crate-wide error type for contract violations.
///
/// Only malformed requests end up here: locations that do not resolve,
/// references to undeclared types or groups, unreadable descriptions.
/// A tree that merely disagrees with its grammar is never an error, it is
/// a [`ValidationResult`].
pub mod error;

/// Global identity of a node shape.
pub mod name;

/// Path values addressing nodes from the tree root.
///
/// Locations are plain data. They never borrow from a tree, so they can be
/// kept across edits and compared cheaply.
pub mod location;

/// Persistent syntax trees and their copy-on-write edit operations.
///
/// Every edit returns a brand new [`Tree`] that shares all untouched
/// subtrees with its predecessor.
pub mod tree;

/// Declarative descriptions of node types and the resolved type model.
///
/// This module defines what a language is allowed to look like. Both the
/// validator and the drop legality engine only ever ask questions of a
/// [`Grammar`].
pub mod grammar;

/// Validation of trees against a grammar.
///
/// Validation never fails. It walks the whole tree and collects precise,
/// location-tagged errors for everything that does not conform.
pub mod validate;

/// A tiny lazily evaluated boolean language.
pub mod expr;

/// Drag-and-drop legality decisions.
///
/// Combines cheap and expensive signals about a prospective insertion
/// through the [`expr`] evaluator so that the expensive ones only run
/// when a visibility expression actually needs them.
pub mod legality;

pub use error::{Error, Result};
pub use expr::{evaluate, Binding, Expression, ExpressionDescription, Variables};
pub use grammar::{
    Attribute, Cardinality, ChildGroup, ConcreteType, Grammar, GrammarDescription, GroupKind,
    NodeType, Property, PropertyBase,
};
pub use legality::{
    is_child_required, is_empty_slot, is_legal_child, is_legal_immediate_child, DragState,
    DropCandidate, DropLegality, Signal, TargetState,
};
pub use location::{DropTarget, Location, Step};
pub use name::QualifiedTypeName;
pub use tree::{Node, NodeDescription, Tree};
pub use validate::{
    validate_from_root, validate_subtree, ErrorCode, ErrorContext, ValidationError,
    ValidationResult,
};
