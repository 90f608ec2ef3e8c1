//! Qualified type names shared by trees and grammars.

use facet::Facet;
use std::fmt;

/// The global identity of a node shape: a type name within a language.
///
/// Equality is by value. Two grammars that both define `("sql", "select")`
/// talk about the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Facet)]
pub struct QualifiedTypeName {
    /// The language the type belongs to (e.g. `"dxml"` or `"sql"`).
    #[facet(rename = "languageName")]
    pub language_name: String,

    /// The type name within that language.
    #[facet(rename = "typeName")]
    pub type_name: String,
}

impl QualifiedTypeName {
    /// Builds a qualified name from its two parts.
    #[must_use]
    pub fn new(language_name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            language_name: language_name.into(),
            type_name: type_name.into(),
        }
    }
}

impl fmt::Display for QualifiedTypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.language_name, self.type_name)
    }
}
