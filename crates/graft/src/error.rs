//! Contract errors raised by tree edits, grammar lookups and description parsing.

use thiserror::Error;

use crate::location::Location;
use crate::name::QualifiedTypeName;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that are fatal to the call that raised them.
///
/// None of these describe a tree that disagrees with its grammar. Those are
/// reported as [`ValidationError`](crate::validate::ValidationError)s and
/// never abort anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A location could not be resolved against the tree.
    #[error("location {0} does not resolve")]
    LocationNotFound(Location),

    /// A qualified type name is not defined by any grammar in the set.
    #[error("unknown type {0}")]
    UnknownType(QualifiedTypeName),

    /// A type was asked about a child group it does not declare.
    #[error("type {type_name} declares no child group '{group}'")]
    UnknownGroup {
        /// The type that was queried.
        type_name: QualifiedTypeName,
        /// The group that is missing from its declaration.
        group: String,
    },

    /// A grammar references a type that no grammar in the set defines.
    #[error("type {from} references undefined type {missing}")]
    UnresolvedReference {
        /// The type holding the dangling reference.
        from: QualifiedTypeName,
        /// The referenced, undefined type.
        missing: QualifiedTypeName,
    },

    /// Tried to insert a root into a tree that already has one.
    #[error("tree already has a root node")]
    RootOccupied,

    /// A property to be renamed does not exist on the node.
    #[error("node at {location} has no property '{key}'")]
    PropertyNotFound {
        /// The node that was edited.
        location: Location,
        /// The missing property key.
        key: String,
    },

    /// A node cannot be moved below itself.
    #[error("cannot move {from} into its own subtree at {to}")]
    InvalidMove {
        /// The node being moved.
        from: Location,
        /// The requested destination.
        to: Location,
    },

    /// The input JSON was syntactically invalid or structurally mismatched.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// A description parsed fine but does not make sense.
    #[error("invalid description: {0}")]
    InvalidDescription(String),
}
