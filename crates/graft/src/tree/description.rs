//! The wire form of a tree node.
//!
//! Collaborators hand trees to the core and receive them back as nested
//! [`NodeDescription`] values. The JSON shape is
//! `{ "language", "name", "properties"?, "children"? }`, recursively.

use facet::Facet;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::name::QualifiedTypeName;
use crate::tree::Node;

/// Serialized description of a node and its whole subtree.
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct NodeDescription {
    /// Language of the node's type.
    pub language: String,

    /// Type name of the node within its language.
    pub name: String,

    /// Property values keyed by property name.
    #[facet(default)]
    pub properties: Option<HashMap<String, String>>,

    /// Child nodes keyed by group name.
    #[facet(default)]
    pub children: Option<HashMap<String, Vec<NodeDescription>>>,
}

impl NodeDescription {
    /// A bare description without properties or children.
    #[must_use]
    pub fn new(language: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            name: name.into(),
            properties: None,
            children: None,
        }
    }

    /// Parse a node description from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JsonParse`] if the input is not valid JSON or does not
    /// have the shape of a node description.
    pub fn from_json(json: &str) -> Result<Self> {
        facet_json::from_str(json).map_err(|e| Error::JsonParse(e.to_string()))
    }

    /// Serialize this description to JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        facet_json::to_string(self)
    }

    /// The qualified type name this description asks for.
    #[must_use]
    pub fn qualified_name(&self) -> QualifiedTypeName {
        QualifiedTypeName::new(&self.language, &self.name)
    }

    /// Materializes the description into a node.
    ///
    /// Hash maps carry no order, so properties and groups are inserted sorted
    /// by key to keep traversal (and thus error order) deterministic.
    #[must_use]
    pub fn to_node(&self) -> Node {
        let mut node = Node::new(self.qualified_name());

        if let Some(properties) = &self.properties {
            let mut keys: Vec<_> = properties.keys().collect();
            keys.sort();
            for key in keys {
                node.properties_mut()
                    .insert(key.clone(), properties[key].clone());
            }
        }

        if let Some(children) = &self.children {
            let mut groups: Vec<_> = children.keys().collect();
            groups.sort();
            for group in groups {
                let nodes = children[group]
                    .iter()
                    .map(|child| Arc::new(child.to_node()))
                    .collect();
                node.children_mut().insert(group.clone(), nodes);
            }
        }

        node
    }
}

impl From<&Node> for NodeDescription {
    fn from(node: &Node) -> Self {
        let properties = (!node.properties().is_empty()).then(|| {
            node.properties()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        });
        let children = (!node.children().is_empty()).then(|| {
            node.children()
                .iter()
                .map(|(group, nodes)| {
                    let nodes = nodes.iter().map(|n| Self::from(n.as_ref())).collect();
                    (group.clone(), nodes)
                })
                .collect()
        });

        Self {
            language: node.name().language_name.clone(),
            name: node.name().type_name.clone(),
            properties,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_description() {
        let json = r#"{
            "language": "expr",
            "name": "booleanBinary",
            "properties": { "operator": "AND" },
            "children": {
                "lhs": [ { "language": "expr", "name": "booleanConstant", "properties": { "value": "true" } } ],
                "rhs": []
            }
        }"#;

        let desc = NodeDescription::from_json(json).unwrap();
        let node = desc.to_node();
        assert_eq!(node.name(), &QualifiedTypeName::new("expr", "booleanBinary"));
        assert_eq!(node.property("operator"), Some("AND"));
        assert_eq!(node.children_in("lhs").len(), 1);
        assert!(node.has_group("rhs"));
        assert!(node.children_in("rhs").is_empty());
    }

    #[test]
    fn test_minimal_description_has_no_maps() {
        let desc = NodeDescription::from_json(r#"{ "language": "a", "name": "b" }"#).unwrap();
        assert_eq!(desc, NodeDescription::new("a", "b"));
        assert_eq!(NodeDescription::from(&desc.to_node()), desc);
    }

    #[test]
    fn test_json_round_trip() {
        let mut desc = NodeDescription::new("a", "b");
        desc.properties = Some(HashMap::from([("k".to_string(), "v".to_string())]));
        desc.children = Some(HashMap::from([(
            "items".to_string(),
            vec![NodeDescription::new("a", "c")],
        )]));

        let parsed = NodeDescription::from_json(&desc.to_json()).unwrap();
        assert_eq!(parsed, desc);
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            NodeDescription::from_json(r#"{ "language": "a" "#),
            Err(Error::JsonParse(_))
        ));
    }
}
