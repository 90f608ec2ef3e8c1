//! Property tests for tree persistence and validation counting.

use std::collections::HashMap;
use std::sync::Arc;

use graft::{validate_from_root, ErrorCode, Grammar, Location, Node, NodeDescription, Tree};
use proptest::prelude::*;

const LIST_GRAMMAR: &str = r#"{
    "name": "list",
    "types": {
        "gen": {
            "list": { "type": "concrete", "attributes": [
                { "type": "sequence", "name": "items", "minOccurs": 1, "maxOccurs": 3,
                  "types": [ { "languageName": "gen", "typeName": "item" } ] }
            ] },
            "item": { "type": "concrete" }
        }
    }
}"#;

fn properties() -> impl Strategy<Value = Option<HashMap<String, String>>> {
    prop::collection::hash_map("[a-d]", "[a-z0-9]{0,4}", 0..3)
        .prop_map(|props| (!props.is_empty()).then_some(props))
}

fn description() -> impl Strategy<Value = NodeDescription> {
    let leaf = ("[a-c]", properties()).prop_map(|(name, properties)| NodeDescription {
        properties,
        ..NodeDescription::new("gen", name)
    });
    leaf.prop_recursive(4, 32, 3, |inner| {
        (
            "[a-c]",
            properties(),
            prop::collection::hash_map("[a-c]", prop::collection::vec(inner, 0..3), 1..3),
        )
            .prop_map(|(name, properties, children)| NodeDescription {
                properties,
                children: Some(children),
                ..NodeDescription::new("gen", name)
            })
    })
}

fn locations(node: &Node, at: &Location, out: &mut Vec<Location>) {
    out.push(at.clone());
    for (group, children) in node.children() {
        for (index, child) in children.iter().enumerate() {
            locations(child, &at.child(group.clone(), index), out);
        }
    }
}

fn all_locations(tree: &Tree) -> Vec<Location> {
    let mut out = Vec::new();
    if let Some(root) = tree.root() {
        locations(root, &Location::root(), &mut out);
    }
    out
}

proptest! {
    #[test]
    fn description_survives_tree_round_trip(desc in description()) {
        let tree = Tree::from_description(&desc);
        prop_assert_eq!(tree.to_description(), Some(desc.clone()));

        let reparsed = NodeDescription::from_json(&desc.to_json()).unwrap();
        prop_assert_eq!(reparsed, desc);
    }

    #[test]
    fn last_set_property_wins(
        desc in description(),
        pick in any::<prop::sample::Index>(),
        key in "[a-e]",
        first in "[a-z]{0,3}",
        second in "[a-z]{0,3}",
    ) {
        let tree = Tree::from_description(&desc);
        let all = all_locations(&tree);
        let at = pick.get(&all);

        let direct = tree.set_property(at, &key, &second).unwrap();
        let overwritten = tree
            .set_property(at, &key, &first)
            .unwrap()
            .set_property(at, &key, &second)
            .unwrap();
        prop_assert_eq!(overwritten.to_description(), direct.to_description());
        prop_assert_eq!(direct.locate(at).unwrap().property(&key), Some(second.as_str()));

        let again = direct.set_property(at, &key, &second).unwrap();
        prop_assert_eq!(again.to_description(), direct.to_description());
    }

    #[test]
    fn edits_share_everything_off_the_path(
        desc in description(),
        pick in any::<prop::sample::Index>(),
    ) {
        let tree = Tree::from_description(&desc);
        let all = all_locations(&tree);
        let at = pick.get(&all);

        let edited = tree.set_property(at, "touched", "yes").unwrap();
        for other in &all {
            let before = tree.locate(other).unwrap();
            let after = edited.locate(other).unwrap();
            if other.contains(at) {
                prop_assert!(!Arc::ptr_eq(before, after));
            } else {
                prop_assert!(Arc::ptr_eq(before, after));
            }
        }
        prop_assert_eq!(tree.node_count(), edited.node_count());
    }

    #[test]
    fn delete_removes_exactly_the_subtree(
        desc in description(),
        pick in any::<prop::sample::Index>(),
    ) {
        let tree = Tree::from_description(&desc);
        let all = all_locations(&tree);
        let at = pick.get(&all);
        let removed = tree.locate(at).unwrap().subtree_size();

        let pruned = tree.delete_node(at).unwrap();
        prop_assert_eq!(pruned.node_count() + removed, tree.node_count());
    }

    #[test]
    fn item_count_decides_cardinality_errors(count in 0usize..6) {
        let grammar = Grammar::from_json(LIST_GRAMMAR).unwrap();
        let items = vec![NodeDescription::new("gen", "item"); count];
        let tree = Tree::from_description(&NodeDescription {
            children: Some(HashMap::from([("items".to_string(), items)])),
            ..NodeDescription::new("gen", "list")
        });

        let codes = validate_from_root(&tree, &grammar).codes();
        prop_assert_eq!(codes.contains(&ErrorCode::MissingChild), count < 1);
        prop_assert_eq!(codes.contains(&ErrorCode::TooManyChildren), count > 3);
        prop_assert_eq!(codes.is_empty(), (1..=3).contains(&count));
    }
}
