//! Validation routines for syntax trees.
//!
//! This module checks a [`Tree`] against a [`Grammar`] and reports every place
//! where the tree does not conform. The walk is a pre-order traversal: a
//! node's own errors come first, then its declared child groups in declaration
//! order (each group's cardinality error before its children, children in
//! index order), then any undeclared groups. Error display and several tests
//! rely on that order.
//!
//! Validation is total. It never fails and never stops early; any addressable
//! tree, however malformed, yields a [`ValidationResult`].

use log::trace;
use std::fmt;

use crate::error::Result;
use crate::grammar::{Cardinality, ConcreteType, Grammar, PropertyBase};
use crate::location::Location;
use crate::name::QualifiedTypeName;
use crate::tree::{Node, Tree};

/// Stable identifiers for the kinds of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A child group holds fewer children than its minimum.
    MissingChild,
    /// A child's type is not accepted by its group.
    IllegalChildType,
    /// The node carries a property its type does not declare.
    UnexpectedProperty,
    /// The node has a child group its type does not declare.
    UnexpectedChildGroup,
    /// A mandatory property is absent.
    MissingProperty,
    /// A child group holds more children than its maximum.
    TooManyChildren,
    /// The node's type is not defined by any grammar.
    UnknownType,
    /// The node's type is an alternative and no member fits the node.
    NoMatchingAlternative,
    /// A property value does not parse as its declared base type.
    IllegalPropertyType,
    /// The root node is not of the grammar's root type.
    UnexpectedRoot,
}

impl ErrorCode {
    /// Returns the stable string form of this code.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingChild => "MissingChild",
            ErrorCode::IllegalChildType => "IllegalChildType",
            ErrorCode::UnexpectedProperty => "UnexpectedProperty",
            ErrorCode::UnexpectedChildGroup => "UnexpectedChildGroup",
            ErrorCode::MissingProperty => "MissingProperty",
            ErrorCode::TooManyChildren => "TooManyChildren",
            ErrorCode::UnknownType => "UnknownType",
            ErrorCode::NoMatchingAlternative => "NoMatchingAlternative",
            ErrorCode::IllegalPropertyType => "IllegalPropertyType",
            ErrorCode::UnexpectedRoot => "UnexpectedRoot",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Details attached to a [`ValidationError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorContext {
    /// How many children `group` lacks.
    MissingChild {
        /// The under-filled group.
        group: String,
        /// Number of children missing to reach the minimum.
        missing: usize,
    },
    /// How far `group` overshoots its maximum.
    TooManyChildren {
        /// The over-filled group.
        group: String,
        /// Declared maximum.
        max: usize,
        /// Actual number of children.
        present: usize,
    },
    /// A child of type `present` sits in `group` which does not accept it.
    IllegalChildType {
        /// The group holding the child.
        group: String,
        /// The child's type.
        present: QualifiedTypeName,
    },
    /// The property involved in a missing or unexpected property error.
    Property {
        /// Property key.
        name: String,
    },
    /// A property value that does not parse.
    IllegalPropertyType {
        /// Property key.
        name: String,
        /// Declared base type.
        expected: PropertyBase,
        /// The offending value.
        value: String,
    },
    /// The group involved in an unexpected group error.
    Group {
        /// Group name.
        group: String,
    },
    /// The type that could not be resolved.
    Type {
        /// The unresolved name.
        name: QualifiedTypeName,
    },
    /// The alternatives that were tried and did not fit.
    NoMatchingAlternative {
        /// The alternative type named by the node.
        name: QualifiedTypeName,
        /// Its concrete members.
        alternatives: Vec<QualifiedTypeName>,
    },
    /// The expected and actual root types.
    UnexpectedRoot {
        /// The grammar's root type.
        expected: QualifiedTypeName,
        /// The type of the tree's root.
        present: QualifiedTypeName,
    },
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorContext::MissingChild { group, missing } => {
                write!(f, "group '{group}' needs {missing} more")
            }
            ErrorContext::TooManyChildren {
                group,
                max,
                present,
            } => write!(f, "group '{group}' allows {max}, has {present}"),
            ErrorContext::IllegalChildType { group, present } => {
                write!(f, "{present} is not allowed in group '{group}'")
            }
            ErrorContext::Property { name } => write!(f, "property '{name}'"),
            ErrorContext::IllegalPropertyType {
                name,
                expected,
                value,
            } => write!(
                f,
                "property '{name}' expects {}, got '{value}'",
                expected.type_name()
            ),
            ErrorContext::Group { group } => write!(f, "group '{group}'"),
            ErrorContext::Type { name } => write!(f, "{name}"),
            ErrorContext::NoMatchingAlternative { name, alternatives } => {
                let alternatives: Vec<_> = alternatives.iter().map(ToString::to_string).collect();
                write!(f, "{name} tried [{}]", alternatives.join(", "))
            }
            ErrorContext::UnexpectedRoot { expected, present } => {
                write!(f, "expected {expected}, found {present}")
            }
        }
    }
}

/// A single place where the tree disagrees with the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The node the error is reported on.
    pub location: Location,
    /// What went wrong.
    pub code: ErrorCode,
    /// Details, if any.
    pub context: Option<ErrorContext>,
}

impl ValidationError {
    fn new(location: &Location, code: ErrorCode, context: ErrorContext) -> Self {
        Self {
            location: location.clone(),
            code,
            context: Some(context),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.code, self.location)?;
        if let Some(context) = &self.context {
            write!(f, ": {context}")?;
        }
        Ok(())
    }
}

/// All errors found in one validation run, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Every error, in traversal order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Returns `true` if there are no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns `true` if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The errors reported exactly on `location`.
    pub fn errors_on<'a>(
        &'a self,
        location: &'a Location,
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| &e.location == location)
    }

    /// The errors reported on `location` or anywhere below it.
    pub fn errors_within<'a>(
        &'a self,
        location: &'a Location,
    ) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors
            .iter()
            .filter(move |e| location.contains(&e.location))
    }

    /// The codes of all errors, in order.
    #[must_use]
    pub fn codes(&self) -> Vec<ErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }

    /// Consumes the result, returning its errors.
    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

/// Validates a whole tree.
///
/// The empty tree has nothing to check and validates without errors. When the
/// grammar declares a root type, a root node of any other type is reported as
/// [`ErrorCode::UnexpectedRoot`] and still validated against its own type.
#[must_use]
pub fn validate_from_root(tree: &Tree, grammar: &Grammar) -> ValidationResult {
    let mut walker = Walker::new(grammar);

    if let Some(root) = tree.root() {
        let location = Location::root();
        if let Some(expected) = grammar.root() {
            if !grammar.type_matches(expected, root.name()) {
                walker.report(
                    &location,
                    ErrorCode::UnexpectedRoot,
                    ErrorContext::UnexpectedRoot {
                        expected: expected.clone(),
                        present: root.name().clone(),
                    },
                );
            }
        }
        walker.visit(root, &location);
    }

    trace!(errors = walker.errors.len(); "Validated tree");
    walker.finish()
}

/// Validates the subtree at `location`, reporting absolute locations.
///
/// # Errors
///
/// Returns [`Error::LocationNotFound`](crate::error::Error::LocationNotFound)
/// if `location` does not resolve.
pub fn validate_subtree(tree: &Tree, grammar: &Grammar, location: &Location) -> Result<ValidationResult> {
    let node = tree.locate(location)?;
    let mut walker = Walker::new(grammar);
    walker.visit(node, location);

    trace!(errors = walker.errors.len(), depth = location.depth(); "Validated subtree");
    Ok(walker.finish())
}

struct Walker<'g> {
    grammar: &'g Grammar,
    errors: Vec<ValidationError>,
}

impl<'g> Walker<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            errors: Vec::new(),
        }
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            errors: self.errors,
        }
    }

    fn report(&mut self, location: &Location, code: ErrorCode, context: ErrorContext) {
        self.errors
            .push(ValidationError::new(location, code, context));
    }

    fn visit(&mut self, node: &Node, location: &Location) {
        let grammar = self.grammar;
        if grammar.get(node.name()).is_none() {
            self.report(
                location,
                ErrorCode::UnknownType,
                ErrorContext::Type {
                    name: node.name().clone(),
                },
            );
            return;
        }

        match grammar.concrete_type_of(node) {
            Some(concrete) => self.check(node, concrete, location),
            None => {
                let alternatives = grammar
                    .concrete_alternatives(node.name())
                    .into_iter()
                    .cloned()
                    .collect();
                self.report(
                    location,
                    ErrorCode::NoMatchingAlternative,
                    ErrorContext::NoMatchingAlternative {
                        name: node.name().clone(),
                        alternatives,
                    },
                );
            }
        }
    }

    /// Checks a node against a concrete type and descends into its children.
    fn check(&mut self, node: &Node, concrete: &ConcreteType, location: &Location) {
        self.check_properties(node, concrete, location);

        for group in concrete.child_groups() {
            let children = node.children_in(&group.name);
            self.check_count(location, &group.name, group.cardinality, children.len());

            for (index, child) in children.iter().enumerate() {
                if self.grammar.group_accepts(group, child.name()) {
                    self.visit(child, &location.child(group.name.clone(), index));
                } else {
                    self.report(
                        &location.child(group.name.clone(), index),
                        ErrorCode::IllegalChildType,
                        ErrorContext::IllegalChildType {
                            group: group.name.clone(),
                            present: child.name().clone(),
                        },
                    );
                }
            }
        }

        for (group, children) in node.children() {
            if concrete.child_group(group).is_some() {
                continue;
            }
            self.report(
                location,
                ErrorCode::UnexpectedChildGroup,
                ErrorContext::Group {
                    group: group.clone(),
                },
            );
            for (index, child) in children.iter().enumerate() {
                self.visit(child, &location.child(group.clone(), index));
            }
        }
    }

    fn check_properties(&mut self, node: &Node, concrete: &ConcreteType, location: &Location) {
        for property in concrete.properties() {
            match node.property(&property.name) {
                None if !property.optional => self.report(
                    location,
                    ErrorCode::MissingProperty,
                    ErrorContext::Property {
                        name: property.name.clone(),
                    },
                ),
                Some(value) if !property.base.accepts(value) => self.report(
                    location,
                    ErrorCode::IllegalPropertyType,
                    ErrorContext::IllegalPropertyType {
                        name: property.name.clone(),
                        expected: property.base,
                        value: value.to_string(),
                    },
                ),
                _ => {}
            }
        }

        for name in node.properties().keys() {
            if concrete.property(name).is_none() {
                self.report(
                    location,
                    ErrorCode::UnexpectedProperty,
                    ErrorContext::Property { name: name.clone() },
                );
            }
        }
    }

    fn check_count(&mut self, location: &Location, group: &str, cardinality: Cardinality, count: usize) {
        let missing = cardinality.missing(count);
        if missing > 0 {
            self.report(
                location,
                ErrorCode::MissingChild,
                ErrorContext::MissingChild {
                    group: group.to_string(),
                    missing,
                },
            );
        }
        if let Some(max) = cardinality.max_occurs.filter(|&max| count > max) {
            self.report(
                location,
                ErrorCode::TooManyChildren,
                ErrorContext::TooManyChildren {
                    group: group.to_string(),
                    max,
                    present: count,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeDescription;

    const EXPR: &str = r#"{
        "name": "expr",
        "root": { "languageName": "expr", "typeName": "expression" },
        "types": {
            "expr": {
                "expression": {
                    "type": "oneOf",
                    "oneOf": [
                        { "languageName": "expr", "typeName": "booleanConstant" },
                        { "languageName": "expr", "typeName": "booleanBinary" }
                    ]
                },
                "booleanConstant": {
                    "type": "concrete",
                    "attributes": [ { "type": "property", "name": "value", "base": "boolean" } ]
                },
                "booleanBinary": {
                    "type": "concrete",
                    "attributes": [
                        { "type": "property", "name": "operator" },
                        { "type": "terminal", "symbol": "(" },
                        { "type": "sequence", "name": "lhs", "minOccurs": 1, "maxOccurs": 1,
                          "types": [ { "languageName": "expr", "typeName": "expression" } ] },
                        { "type": "sequence", "name": "rhs", "minOccurs": 1, "maxOccurs": 1,
                          "types": [ { "languageName": "expr", "typeName": "expression" } ] },
                        { "type": "terminal", "symbol": ")" }
                    ]
                },
                "stray": { "type": "concrete" }
            }
        }
    }"#;

    fn grammar() -> Grammar {
        Grammar::from_json(EXPR).unwrap()
    }

    fn tree(json: &str) -> Tree {
        Tree::from_json(json).unwrap()
    }

    fn constant(value: &str) -> String {
        format!(
            r#"{{ "language": "expr", "name": "booleanConstant", "properties": {{ "value": "{value}" }} }}"#
        )
    }

    fn binary(lhs: &[String], rhs: &[String]) -> String {
        format!(
            r#"{{ "language": "expr", "name": "booleanBinary", "properties": {{ "operator": "AND" }},
                 "children": {{ "lhs": [{}], "rhs": [{}] }} }}"#,
            lhs.join(","),
            rhs.join(",")
        )
    }

    #[test]
    fn test_empty_tree_is_valid() {
        assert!(validate_from_root(&Tree::empty(), &grammar()).is_valid());
    }

    #[test]
    fn test_conforming_tree_is_valid() {
        let t = tree(&binary(&[constant("true")], &[constant("false")]));
        let result = validate_from_root(&t, &grammar());
        assert!(result.is_valid(), "{:?}", result.errors());
    }

    #[test]
    fn test_missing_child_reported_once_on_parent() {
        let t = tree(&binary(&[constant("true")], &[]));
        let result = validate_from_root(&t, &grammar());
        assert_eq!(
            result.errors(),
            [ValidationError {
                location: Location::root(),
                code: ErrorCode::MissingChild,
                context: Some(ErrorContext::MissingChild {
                    group: "rhs".to_string(),
                    missing: 1,
                }),
            }]
        );
    }

    #[test]
    fn test_absent_group_counts_as_empty() {
        let t = tree(
            r#"{ "language": "expr", "name": "booleanBinary", "properties": { "operator": "OR" } }"#,
        );
        let result = validate_from_root(&t, &grammar());
        assert_eq!(result.codes(), [ErrorCode::MissingChild, ErrorCode::MissingChild]);
    }

    #[test]
    fn test_too_many_children() {
        let t = tree(&binary(
            &[constant("true"), constant("false")],
            &[constant("true")],
        ));
        let result = validate_from_root(&t, &grammar());
        assert_eq!(result.codes(), [ErrorCode::TooManyChildren]);
        assert_eq!(
            result.errors()[0].context,
            Some(ErrorContext::TooManyChildren {
                group: "lhs".to_string(),
                max: 1,
                present: 2,
            })
        );
    }

    #[test]
    fn test_illegal_child_type_is_not_descended() {
        let stray = r#"{ "language": "expr", "name": "stray", "properties": { "junk": "1" } }"#;
        let t = tree(&binary(&[stray.to_string()], &[constant("true")]));
        let result = validate_from_root(&t, &grammar());
        assert_eq!(result.codes(), [ErrorCode::IllegalChildType]);
        assert_eq!(result.errors()[0].location, Location::from([("lhs", 0)]));
    }

    #[test]
    fn test_property_errors() {
        let t = tree(
            r#"{ "language": "expr", "name": "booleanConstant", "properties": { "value": "maybe", "extra": "x" } }"#,
        );
        let result = validate_from_root(&t, &grammar());
        assert_eq!(
            result.codes(),
            [ErrorCode::IllegalPropertyType, ErrorCode::UnexpectedProperty]
        );

        let t = tree(r#"{ "language": "expr", "name": "booleanConstant" }"#);
        assert_eq!(
            validate_from_root(&t, &grammar()).codes(),
            [ErrorCode::MissingProperty]
        );
    }

    #[test]
    fn test_unknown_type_stops_descent() {
        let unknown = r#"{ "language": "expr", "name": "mystery",
            "children": { "x": [ { "language": "nope", "name": "deeper" } ] } }"#;
        let t = tree(unknown);
        let result = validate_from_root(&t, &grammar());
        assert_eq!(result.codes(), [ErrorCode::UnexpectedRoot, ErrorCode::UnknownType]);
        assert!(result.errors().iter().all(|e| e.location.is_root()));
    }

    #[test]
    fn test_unexpected_group_still_descends() {
        let json = format!(
            r#"{{ "language": "expr", "name": "booleanConstant", "properties": {{ "value": "true" }},
                 "children": {{ "extra": [ {{ "language": "nope", "name": "x" }}, {} ] }} }}"#,
            constant("yes")
        );
        let result = validate_from_root(&tree(&json), &grammar());
        assert_eq!(
            result.codes(),
            [
                ErrorCode::UnexpectedChildGroup,
                ErrorCode::UnknownType,
                ErrorCode::IllegalPropertyType
            ]
        );
        assert_eq!(result.errors()[1].location, Location::from([("extra", 0)]));
        assert_eq!(result.errors()[2].location, Location::from([("extra", 1)]));
    }

    #[test]
    fn test_errors_follow_traversal_order() {
        let inner = binary(&[], &[constant("true")]);
        let t = tree(&binary(&[inner], &[constant("nope")]));
        let result = validate_from_root(&t, &grammar());
        let locations: Vec<_> = result.errors().iter().map(|e| e.location.clone()).collect();
        assert_eq!(
            locations,
            [Location::from([("lhs", 0)]), Location::from([("rhs", 0)])]
        );
        assert_eq!(
            result.codes(),
            [ErrorCode::MissingChild, ErrorCode::IllegalPropertyType]
        );
    }

    #[test]
    fn test_one_of_node_matches_by_shape() {
        let grammar = grammar();
        let t = Tree::from_description(
            &NodeDescription::from_json(
                r#"{ "language": "expr", "name": "expression", "properties": { "value": "true" } }"#,
            )
            .unwrap(),
        );
        assert!(validate_from_root(&t, &grammar).is_valid());

        let t = tree(r#"{ "language": "expr", "name": "expression", "properties": { "bogus": "1" } }"#);
        let result = validate_from_root(&t, &grammar);
        assert_eq!(result.codes(), [ErrorCode::NoMatchingAlternative]);
    }

    #[test]
    fn test_incomplete_one_of_node_reports_missing_child() {
        let t = tree(&format!(
            r#"{{ "language": "expr", "name": "expression", "properties": {{ "operator": "AND" }},
                 "children": {{ "lhs": [{}] }} }}"#,
            constant("true")
        ));
        let result = validate_from_root(&t, &grammar());
        assert_eq!(result.codes(), [ErrorCode::MissingChild]);
        assert_eq!(
            result.errors()[0].context,
            Some(ErrorContext::MissingChild {
                group: "rhs".to_string(),
                missing: 1,
            })
        );
    }

    #[test]
    fn test_unexpected_root() {
        let grammar = grammar();
        let t = tree(r#"{ "language": "expr", "name": "stray" }"#);
        let result = validate_from_root(&t, &grammar);
        assert_eq!(result.codes(), [ErrorCode::UnexpectedRoot]);
    }

    #[test]
    fn test_errors_on_and_within() {
        let inner = binary(&[], &[constant("true")]);
        let t = tree(&binary(&[inner], &[]));
        let result = validate_from_root(&t, &grammar());
        let root = Location::root();
        let lhs = Location::from([("lhs", 0)]);
        assert_eq!(result.errors_on(&root).count(), 1);
        assert_eq!(result.errors_on(&lhs).count(), 1);
        assert_eq!(result.errors_within(&root).count(), 2);
        assert_eq!(result.errors_within(&lhs).count(), 1);
    }

    #[test]
    fn test_validate_subtree() {
        let inner = binary(&[], &[constant("true")]);
        let t = tree(&binary(&[inner], &[]));
        let lhs = Location::from([("lhs", 0)]);
        let result = validate_subtree(&t, &grammar(), &lhs).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.errors()[0].location, lhs);
        assert!(validate_subtree(&t, &grammar(), &Location::from([("rhs", 0)])).is_err());
    }

    #[test]
    fn test_display() {
        let error = ValidationError::new(
            &Location::from([("lhs", 0)]),
            ErrorCode::MissingChild,
            ErrorContext::MissingChild {
                group: "rhs".to_string(),
                missing: 1,
            },
        );
        assert_eq!(
            error.to_string(),
            "MissingChild at /lhs[0]: group 'rhs' needs 1 more"
        );
    }
}
