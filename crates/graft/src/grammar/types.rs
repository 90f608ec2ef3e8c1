//! Serialized grammar descriptions.
//!
//! These types mirror the JSON handed over by the grammar authoring side. They
//! are deliberately loose (most fields optional) and are checked and turned
//! into the resolved model by [`Grammar::new`](crate::grammar::Grammar::new).

use facet::Facet;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::name::QualifiedTypeName;

/// A complete grammar as stored by the authoring side.
///
/// A grammar may define types for several languages, and several grammars may
/// be combined so that one language can reference types defined by another.
#[derive(Debug, Clone, Facet)]
pub struct GrammarDescription {
    /// Human readable name of the grammar.
    pub name: String,

    /// The type every tree of this grammar is expected to start with.
    #[facet(default)]
    pub root: Option<QualifiedTypeName>,

    /// Type definitions keyed by language name, then type name.
    pub types: HashMap<String, HashMap<String, NodeTypeDescription>>,
}

impl GrammarDescription {
    /// Parse a JSON grammar description.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParse`] if the provided string is not valid JSON
    /// or fails schema deserialization.
    pub fn from_json(json: &str) -> Result<Self> {
        facet_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))
    }
}

/// A single type definition.
///
/// Depending on [`NodeTypeKind`], either `attributes` (concrete types) or
/// `one_of` (alternative types) carries the payload.
#[derive(Debug, Clone, Facet)]
pub struct NodeTypeDescription {
    /// Whether this is a concrete type or an alternative.
    #[facet(rename = "type")]
    pub kind: NodeTypeKind,

    /// Properties, child groups and terminals of a concrete type.
    #[facet(default)]
    pub attributes: Vec<AttributeDescription>,

    /// Member types of an alternative.
    #[facet(default)]
    #[facet(rename = "oneOf")]
    pub one_of: Vec<QualifiedTypeName>,
}

/// Discriminant of a [`NodeTypeDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum NodeTypeKind {
    /// A type with directly declared attributes.
    #[facet(rename = "concrete")]
    Concrete,
    /// A type standing for any one of several other types.
    #[facet(rename = "oneOf")]
    OneOf,
}

/// A single attribute of a concrete type.
#[derive(Debug, Clone, Facet)]
pub struct AttributeDescription {
    /// What kind of attribute this is.
    #[facet(rename = "type")]
    pub kind: AttributeKind,

    /// Property or group name. Required for everything but terminals.
    #[facet(default)]
    pub name: Option<String>,

    /// Value type of a property. Defaults to `string`.
    #[facet(default)]
    pub base: Option<PropertyBase>,

    /// Whether a property may be omitted. Defaults to `false`.
    #[facet(default)]
    pub optional: Option<bool>,

    /// Types a child group accepts.
    #[facet(default)]
    pub types: Vec<QualifiedTypeName>,

    /// Lower bound of a child group's element count.
    #[facet(default)]
    #[facet(rename = "minOccurs")]
    pub min_occurs: Option<usize>,

    /// Upper bound of a child group's element count. Absent means unbounded.
    #[facet(default)]
    #[facet(rename = "maxOccurs")]
    pub max_occurs: Option<usize>,

    /// Concrete syntax shown for a terminal.
    #[facet(default)]
    pub symbol: Option<String>,
}

/// Discriminant of an [`AttributeDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum AttributeKind {
    /// A named scalar value.
    #[facet(rename = "property")]
    Property,
    /// An ordered group of children.
    #[facet(rename = "sequence")]
    Sequence,
    /// A group of children of any of the allowed types, in any order.
    #[facet(rename = "allowed")]
    Allowed,
    /// A group holding one child picked from the allowed types.
    #[facet(rename = "choice")]
    Choice,
    /// Pure concrete syntax without runtime data.
    #[facet(rename = "terminal")]
    Terminal,
}

/// The value type of a property. Property values are always stored as
/// strings; the base type says how they must parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum PropertyBase {
    /// `true` or `false`.
    #[facet(rename = "boolean")]
    Boolean,
    /// A signed 64 bit integer.
    #[facet(rename = "integer")]
    Integer,
    /// Any string.
    #[facet(rename = "string")]
    String,
}

impl PropertyBase {
    /// Returns `true` if `value` is a valid literal of this base type.
    #[must_use]
    pub fn accepts(self, value: &str) -> bool {
        match self {
            PropertyBase::Boolean => matches!(value, "true" | "false"),
            PropertyBase::Integer => value.parse::<i64>().is_ok(),
            PropertyBase::String => true,
        }
    }

    /// Returns the canonical name of this base type.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            PropertyBase::Boolean => "boolean",
            PropertyBase::Integer => "integer",
            PropertyBase::String => "string",
        }
    }
}
