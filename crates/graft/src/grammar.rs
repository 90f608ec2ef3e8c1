//! The resolved type model of one or more combined grammars.
//!
//! Descriptions from [`types`] are checked once, when a [`Grammar`] is built.
//! Every type referenced from a child group or an alternative must be defined
//! by some grammar in the set; a dangling reference is a configuration error
//! and is reported right there, never during validation.
//!
//! Alternative (`oneOf`) types may reference further alternatives. Chains
//! that loop back onto themselves are tolerated at construction (and logged),
//! lookups through them fail closed.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::name::QualifiedTypeName;
use crate::tree::Node;

mod types;

pub use types::{
    AttributeDescription, AttributeKind, GrammarDescription, NodeTypeDescription, NodeTypeKind,
    PropertyBase,
};

/// A resolved type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeType {
    /// A type with directly declared attributes.
    Concrete(ConcreteType),

    /// A type matching any one of its alternatives.
    OneOf(Vec<QualifiedTypeName>),
}

/// The attributes of a concrete type, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConcreteType {
    /// Declared attributes. Their order is the order validation reports in.
    pub attributes: Vec<Attribute>,
}

impl ConcreteType {
    /// All declared properties.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.attributes.iter().filter_map(|attr| match attr {
            Attribute::Property(p) => Some(p),
            _ => None,
        })
    }

    /// All declared child groups.
    pub fn child_groups(&self) -> impl Iterator<Item = &ChildGroup> {
        self.attributes.iter().filter_map(|attr| match attr {
            Attribute::ChildGroup(g) => Some(g),
            _ => None,
        })
    }

    /// The declared property called `name`.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties().find(|p| p.name == name)
    }

    /// The declared child group called `name`.
    #[must_use]
    pub fn child_group(&self, name: &str) -> Option<&ChildGroup> {
        self.child_groups().find(|g| g.name == name)
    }
}

/// One attribute of a concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// A named scalar value.
    Property(Property),

    /// A named group of children.
    ChildGroup(ChildGroup),

    /// A concrete syntax marker, optionally with its display symbol.
    Terminal(Option<String>),
}

/// A declared property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property key.
    pub name: String,
    /// How the value must parse.
    pub base: PropertyBase,
    /// Whether nodes may omit it.
    pub optional: bool,
}

/// How a child group arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// An ordered group.
    Sequence,
    /// An unordered group of allowed types.
    Allowed,
    /// A group holding one pick out of the allowed types.
    Choice,
}

/// A declared child group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildGroup {
    /// Group name, as used in [`Step::group`](crate::location::Step).
    pub name: String,
    /// Arrangement of the group.
    pub kind: GroupKind,
    /// Types a child may have, possibly `oneOf` types.
    pub allowed_types: Vec<QualifiedTypeName>,
    /// Bounds of the element count.
    pub cardinality: Cardinality,
}

/// Allowed element count of a child group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cardinality {
    /// Minimum number of children.
    pub min_occurs: usize,
    /// Maximum number of children, `None` if unbounded.
    pub max_occurs: Option<usize>,
}

impl Cardinality {
    /// Any number of children, including none.
    #[must_use]
    pub fn any() -> Self {
        Self {
            min_occurs: 0,
            max_occurs: None,
        }
    }

    /// Exactly one child.
    #[must_use]
    pub fn exactly_one() -> Self {
        Self {
            min_occurs: 1,
            max_occurs: Some(1),
        }
    }

    /// How many children are missing to reach the minimum.
    #[must_use]
    pub fn missing(self, count: usize) -> usize {
        self.min_occurs.saturating_sub(count)
    }

    /// Returns `true` if `count` exceeds a bounded maximum.
    #[must_use]
    pub fn exceeded_by(self, count: usize) -> bool {
        self.max_occurs.is_some_and(|max| count > max)
    }

    /// Returns `true` if `count` lies within the bounds.
    #[must_use]
    pub fn contains(self, count: usize) -> bool {
        self.missing(count) == 0 && !self.exceeded_by(count)
    }

    /// Returns `true` if a group holding `count` children may take another.
    #[must_use]
    pub fn allows_one_more(self, count: usize) -> bool {
        !self.exceeded_by(count + 1)
    }
}

/// The combined type set of an ordered list of grammars.
///
/// Built once and immutable afterwards. Earlier grammars take precedence: if
/// two grammars define the same qualified name, the first definition wins.
#[derive(Debug, Clone)]
pub struct Grammar {
    types: HashMap<QualifiedTypeName, NodeType>,
    root: Option<QualifiedTypeName>,
}

impl Grammar {
    /// Combines and checks an ordered list of grammar descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDescription`] for malformed type definitions
    /// and [`Error::UnresolvedReference`] if any referenced type is not
    /// defined by the combined set.
    pub fn new(descriptions: &[GrammarDescription]) -> Result<Self> {
        let mut types: HashMap<QualifiedTypeName, NodeType> = HashMap::new();
        let mut root: Option<QualifiedTypeName> = None;

        for (position, description) in descriptions.iter().enumerate() {
            for (name, node_type) in sorted_types(description) {
                if types.contains_key(&name) {
                    warn!(
                        grammar = description.name.as_str(),
                        type_name = name.to_string();
                        "Type already defined by an earlier grammar, ignoring"
                    );
                    continue;
                }
                let resolved = resolve_description(&name, node_type)?;
                types.insert(name, resolved);
            }
            if position == 0 {
                root.clone_from(&description.root);
            }
        }

        let grammar = Self { types, root };
        grammar.check_references()?;
        grammar.warn_about_cycles();

        debug!(
            grammars = descriptions.len(),
            types = grammar.types.len();
            "Built grammar"
        );
        Ok(grammar)
    }

    /// Parse a single JSON grammar description and build a grammar from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParse`] for unreadable JSON and otherwise the same
    /// errors as [`Grammar::new`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(&[GrammarDescription::from_json(json)?])
    }

    /// The expected root type, as declared by the first grammar.
    #[must_use]
    pub fn root(&self) -> Option<&QualifiedTypeName> {
        self.root.as_ref()
    }

    /// Number of types in the combined set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no grammar defined any type.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Looks a type up without failing.
    #[must_use]
    pub fn get(&self, name: &QualifiedTypeName) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// Looks a type up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if no grammar defines `name`.
    pub fn resolve_type(&self, name: &QualifiedTypeName) -> Result<&NodeType> {
        self.get(name)
            .ok_or_else(|| Error::UnknownType(name.clone()))
    }

    /// The declared child group `group` of the concrete type `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownType`] if `parent` is undefined and
    /// [`Error::UnknownGroup`] if it is an alternative or has no such group.
    pub fn child_group(&self, parent: &QualifiedTypeName, group: &str) -> Result<&ChildGroup> {
        let unknown_group = || Error::UnknownGroup {
            type_name: parent.clone(),
            group: group.to_string(),
        };
        match self.resolve_type(parent)? {
            NodeType::Concrete(concrete) => concrete.child_group(group).ok_or_else(unknown_group),
            NodeType::OneOf(_) => Err(unknown_group()),
        }
    }

    /// The cardinality of `group` on the concrete type `parent`.
    ///
    /// # Errors
    ///
    /// Same as [`Grammar::child_group`].
    pub fn cardinality(&self, parent: &QualifiedTypeName, group: &str) -> Result<Cardinality> {
        self.child_group(parent, group).map(|g| g.cardinality)
    }

    /// Returns `true` if the concrete type `parent` accepts a child of type
    /// `candidate` in `group`.
    ///
    /// `candidate` may be listed directly or reached through `oneOf`
    /// alternatives of a listed type. Unknown parents, undeclared groups and
    /// cyclic alternative chains all answer `false`.
    #[must_use]
    pub fn allows_child_type(
        &self,
        parent: &QualifiedTypeName,
        candidate: &QualifiedTypeName,
        group: &str,
    ) -> bool {
        self.child_group(parent, group)
            .is_ok_and(|g| self.group_accepts(g, candidate))
    }

    /// Returns `true` if `group` lists `candidate`, directly or via `oneOf`.
    #[must_use]
    pub fn group_accepts(&self, group: &ChildGroup, candidate: &QualifiedTypeName) -> bool {
        group
            .allowed_types
            .iter()
            .any(|allowed| self.type_matches(allowed, candidate))
    }

    /// Returns `true` if `candidate` is `expected` or one of its alternatives.
    #[must_use]
    pub fn type_matches(&self, expected: &QualifiedTypeName, candidate: &QualifiedTypeName) -> bool {
        self.type_matches_inner(expected, candidate, &mut HashSet::new())
    }

    fn type_matches_inner<'a>(
        &'a self,
        expected: &'a QualifiedTypeName,
        candidate: &QualifiedTypeName,
        visited: &mut HashSet<&'a QualifiedTypeName>,
    ) -> bool {
        if expected == candidate {
            return true;
        }
        let Some(NodeType::OneOf(alternatives)) = self.get(expected) else {
            return false;
        };
        if !visited.insert(expected) {
            return false;
        }
        alternatives
            .iter()
            .any(|alt| self.type_matches_inner(alt, candidate, visited))
    }

    /// Flattens `name` into the concrete types it may stand for.
    ///
    /// A concrete type yields itself. Alternatives are expanded depth first in
    /// declaration order, each concrete type appearing once. Unknown names
    /// yield nothing.
    #[must_use]
    pub fn concrete_alternatives(&self, name: &QualifiedTypeName) -> Vec<&QualifiedTypeName> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_concrete(name, &mut visited, &mut out);
        out
    }

    /// The concrete type `node` is checked against.
    ///
    /// A concrete node type is its own answer. For an alternative, the
    /// concrete members are tried in [`Grammar::concrete_alternatives`] order
    /// and only their declared shape counts: every property and child group
    /// on the node must be declared by the member. A member whose mandatory
    /// properties are all present is preferred over one that merely fits.
    /// Children and counts play no part, so an incomplete node still resolves
    /// and its gaps can be reported against the member it belongs to.
    #[must_use]
    pub fn concrete_type_of(&self, node: &Node) -> Option<&ConcreteType> {
        match self.get(node.name())? {
            NodeType::Concrete(concrete) => Some(concrete),
            NodeType::OneOf(_) => {
                let fitting: Vec<&ConcreteType> = self
                    .concrete_alternatives(node.name())
                    .into_iter()
                    .filter_map(|name| match self.get(name) {
                        Some(NodeType::Concrete(concrete)) => Some(concrete),
                        _ => None,
                    })
                    .filter(|concrete| declares_shape_of(concrete, node))
                    .collect();
                fitting
                    .iter()
                    .find(|concrete| {
                        concrete
                            .properties()
                            .all(|p| p.optional || node.property(&p.name).is_some())
                    })
                    .or_else(|| fitting.first())
                    .copied()
            }
        }
    }

    fn collect_concrete<'a>(
        &'a self,
        name: &QualifiedTypeName,
        visited: &mut HashSet<&'a QualifiedTypeName>,
        out: &mut Vec<&'a QualifiedTypeName>,
    ) {
        let Some((key, node_type)) = self.types.get_key_value(name) else {
            return;
        };
        if !visited.insert(key) {
            return;
        }
        match node_type {
            NodeType::Concrete(_) => out.push(key),
            NodeType::OneOf(alternatives) => {
                for alt in alternatives {
                    self.collect_concrete(alt, visited, out);
                }
            }
        }
    }

    fn check_references(&self) -> Result<()> {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();

        for from in names {
            let referenced: Vec<&QualifiedTypeName> = match &self.types[from] {
                NodeType::Concrete(concrete) => concrete
                    .child_groups()
                    .flat_map(|g| g.allowed_types.iter())
                    .collect(),
                NodeType::OneOf(alternatives) => alternatives.iter().collect(),
            };
            if let Some(missing) = referenced.into_iter().find(|r| !self.types.contains_key(*r)) {
                return Err(Error::UnresolvedReference {
                    from: from.clone(),
                    missing: missing.clone(),
                });
            }
        }

        if let Some(root) = &self.root {
            if !self.types.contains_key(root) {
                return Err(Error::UnknownType(root.clone()));
            }
        }
        Ok(())
    }

    fn warn_about_cycles(&self) {
        let mut names: Vec<_> = self
            .types
            .iter()
            .filter(|(_, t)| matches!(t, NodeType::OneOf(_)))
            .map(|(name, _)| name)
            .collect();
        names.sort();

        for name in names {
            if self.one_of_reaches(name, name, &mut HashSet::new()) {
                warn!(
                    type_name = name.to_string();
                    "Alternative chain loops back onto itself, lookups through it fail closed"
                );
            }
        }
    }

    fn one_of_reaches<'a>(
        &'a self,
        from: &'a QualifiedTypeName,
        target: &QualifiedTypeName,
        visited: &mut HashSet<&'a QualifiedTypeName>,
    ) -> bool {
        let Some(NodeType::OneOf(alternatives)) = self.get(from) else {
            return false;
        };
        if !visited.insert(from) {
            return false;
        }
        alternatives
            .iter()
            .any(|alt| alt == target || self.one_of_reaches(alt, target, visited))
    }
}

fn declares_shape_of(concrete: &ConcreteType, node: &Node) -> bool {
    node.properties()
        .keys()
        .all(|key| concrete.property(key).is_some())
        && node
            .children()
            .keys()
            .all(|group| concrete.child_group(group).is_some())
}

/// Type definitions of one description, ordered by qualified name.
fn sorted_types(description: &GrammarDescription) -> Vec<(QualifiedTypeName, &NodeTypeDescription)> {
    let mut out: Vec<_> = description
        .types
        .iter()
        .flat_map(|(language, types)| {
            types
                .iter()
                .map(move |(type_name, t)| (QualifiedTypeName::new(language, type_name), t))
        })
        .collect();
    out.sort_by(|a, b| a.0.cmp(&b.0));
    out
}

fn resolve_description(name: &QualifiedTypeName, desc: &NodeTypeDescription) -> Result<NodeType> {
    match desc.kind {
        NodeTypeKind::OneOf => {
            if desc.one_of.is_empty() {
                return Err(Error::InvalidDescription(format!(
                    "alternative type {name} lists no alternatives"
                )));
            }
            Ok(NodeType::OneOf(desc.one_of.clone()))
        }
        NodeTypeKind::Concrete => {
            let attributes = desc
                .attributes
                .iter()
                .map(|attr| resolve_attribute(name, attr))
                .collect::<Result<Vec<_>>>()?;
            Ok(NodeType::Concrete(ConcreteType { attributes }))
        }
    }
}

fn resolve_attribute(owner: &QualifiedTypeName, desc: &AttributeDescription) -> Result<Attribute> {
    let group_kind = match desc.kind {
        AttributeKind::Terminal => return Ok(Attribute::Terminal(desc.symbol.clone())),
        AttributeKind::Property => {
            let name = attribute_name(owner, desc)?;
            return Ok(Attribute::Property(Property {
                name,
                base: desc.base.unwrap_or(PropertyBase::String),
                optional: desc.optional.unwrap_or(false),
            }));
        }
        AttributeKind::Sequence => GroupKind::Sequence,
        AttributeKind::Allowed => GroupKind::Allowed,
        AttributeKind::Choice => GroupKind::Choice,
    };

    let name = attribute_name(owner, desc)?;
    let default = if group_kind == GroupKind::Choice {
        Cardinality::exactly_one()
    } else {
        Cardinality::any()
    };
    let cardinality = Cardinality {
        min_occurs: desc.min_occurs.unwrap_or(default.min_occurs),
        max_occurs: desc.max_occurs.or(default.max_occurs),
    };
    if cardinality.exceeded_by(cardinality.min_occurs) {
        return Err(Error::InvalidDescription(format!(
            "group '{name}' of {owner} has minOccurs above maxOccurs"
        )));
    }

    Ok(Attribute::ChildGroup(ChildGroup {
        name,
        kind: group_kind,
        allowed_types: desc.types.clone(),
        cardinality,
    }))
}

fn attribute_name(owner: &QualifiedTypeName, desc: &AttributeDescription) -> Result<String> {
    desc.name.clone().ok_or_else(|| {
        Error::InvalidDescription(format!("unnamed {:?} attribute on {owner}", desc.kind))
    })
}
