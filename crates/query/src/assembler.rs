//! Builds the nested result tree from ordered `(selection, values)` pairs.
//!
//! Merge rules at a selection's final segment:
//! - empty slot: one value becomes a scalar, several become a list;
//! - scalar: becomes `[existing, new...]`;
//! - list: new values are appended;
//! - branch: the rules apply to the branch's own `"/"` slot instead.
//!
//! When a later selection must descend through a segment that already holds
//! a scalar or list, that segment becomes a branch and its leaf value moves
//! into the `"/"` slot. `{A A{B}}` and `{A{B} A}` therefore build the same tree.

use std::collections::btree_map::Entry;

use arbor_store::path;

use crate::tree::SELF_KEY;
use crate::{Node, QueryError, ResultTree, Selection};

/// Fold every pair into one tree, in order.
///
/// Fails without a partial result if any selection path is malformed. Pairs
/// with no values leave the tree untouched.
pub fn assemble<'a, I>(pairs: I) -> Result<ResultTree, QueryError>
where
    I: IntoIterator<Item = (&'a Selection, Vec<String>)>,
{
    let mut tree = ResultTree::new();
    for (selection, values) in pairs {
        merge_selection(&mut tree, &selection.path, values)?;
    }
    Ok(tree)
}

/// Check a selection path before any lookup is made for it.
pub fn validate_path(selection_path: &str) -> Result<(), QueryError> {
    if path::is_valid(selection_path) {
        Ok(())
    } else {
        Err(QueryError::InvalidPath {
            path: selection_path.to_string(),
        })
    }
}

/// Merge one lookup result into `tree` at `selection_path`.
pub fn merge_selection(
    tree: &mut ResultTree,
    selection_path: &str,
    values: Vec<String>,
) -> Result<(), QueryError> {
    validate_path(selection_path)?;
    if values.is_empty() {
        return Ok(());
    }
    let segments = path::segments(selection_path).map_err(|_| QueryError::InvalidPath {
        path: selection_path.to_string(),
    })?;
    merge_at(tree, &segments, values);
    Ok(())
}

/// Walk `segments` below `tree`, creating branches or promoting a leaf into
/// one, and merge `values` at the final segment.
fn merge_at(tree: &mut ResultTree, segments: &[&str], values: Vec<String>) {
    match segments {
        [] => {}
        [last] => merge_leaf(tree, last, values),
        [segment, rest @ ..] => {
            let node = tree
                .entry(segment)
                .or_insert_with(|| Node::Branch(ResultTree::new()));
            match node {
                Node::Branch(branch) => merge_at(branch, rest, values),
                leaf => {
                    let mut branch = ResultTree::new();
                    branch.insert(SELF_KEY, std::mem::replace(leaf, Node::List(Vec::new())));
                    merge_at(&mut branch, rest, values);
                    *leaf = Node::Branch(branch);
                }
            }
        }
    }
}

fn merge_leaf(tree: &mut ResultTree, key: &str, values: Vec<String>) {
    match tree.entry(key) {
        Entry::Vacant(slot) => {
            if let Some(node) = Node::from_values(values) {
                slot.insert(node);
            }
        }
        Entry::Occupied(slot) => {
            let node = slot.into_mut();
            match node {
                Node::Branch(branch) => merge_leaf(branch, SELF_KEY, values),
                Node::List(existing) => existing.extend(values),
                Node::Scalar(existing) => {
                    let mut merged = Vec::with_capacity(values.len() + 1);
                    merged.push(std::mem::take(existing));
                    merged.extend(values);
                    *node = Node::List(merged);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vals(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn to_json(tree: &ResultTree) -> serde_json::Value {
        serde_json::to_value(tree).unwrap()
    }

    #[test]
    fn builds_branch_with_self_slot() {
        let selections = [
            Selection::new("/A/B/C", 1),
            Selection::new("/A/B/D", 2),
            Selection::current("/A/B"),
        ];
        let results = [vals(&["1", "2"]), vals(&["3"]), vals(&["C", "D"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(
            to_json(&tree),
            json!({"A": {"B": {"/": ["C", "D"], "C": ["1", "2"], "D": "3"}}})
        );
    }

    #[test]
    fn invalid_path_fails_whole_operation() {
        let selections = [Selection::current("/ok"), Selection::new("A/B/C", 1)];
        let results = [vals(&["1"]), vals(&["2"])];
        let err = assemble(selections.iter().zip(results)).unwrap_err();
        assert!(matches!(err, QueryError::InvalidPath { path } if path == "A/B/C"));
    }

    #[test]
    fn invalid_path_fails_even_without_values() {
        let selections = [Selection::current("nope")];
        assert!(assemble(selections.iter().zip([vec![]])).is_err());
    }

    #[test]
    fn empty_values_create_nothing() {
        let selections = [Selection::current("/A/B"), Selection::current("/E")];
        let results = [vec![], vals(&["3"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(to_json(&tree), json!({"E": "3"}));
    }

    #[test]
    fn scalar_then_values_becomes_list_existing_first() {
        let selections = [Selection::current("/A"), Selection::new("/A", 2)];
        let results = [vals(&["old"]), vals(&["new1", "new2"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(to_json(&tree), json!({"A": ["old", "new1", "new2"]}));
    }

    #[test]
    fn list_then_values_appends() {
        let selections = [Selection::current("/A"), Selection::current("/A")];
        let results = [vals(&["a", "b"]), vals(&["c"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(to_json(&tree), json!({"A": ["a", "b", "c"]}));
    }

    #[test]
    fn self_slot_merges_repeated_leaf_on_branch() {
        let selections = [
            Selection::current("/A/B"),
            Selection::current("/A"),
            Selection::new("/A", 1),
        ];
        let results = [vals(&["b"]), vals(&["x"]), vals(&["y"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(to_json(&tree), json!({"A": {"B": "b", "/": ["x", "y"]}}));
    }

    #[test]
    fn leaf_then_child_promotes_leaf_into_self_slot() {
        let leaf_first = [Selection::current("/A"), Selection::current("/A/B")];
        let child_first = [Selection::current("/A/B"), Selection::current("/A")];
        let results = || [vals(&["a"]), vals(&["b"])];

        let tree = assemble(leaf_first.iter().zip(results())).unwrap();
        assert_eq!(to_json(&tree), json!({"A": {"/": "a", "B": "b"}}));

        let swapped = [vals(&["b"]), vals(&["a"])];
        let other = assemble(child_first.iter().zip(swapped)).unwrap();
        assert_eq!(tree, other);
    }

    #[test]
    fn list_leaf_promoted_through_several_levels() {
        let selections = [Selection::current("/A"), Selection::current("/A/B/C")];
        let results = [vals(&["1", "2"]), vals(&["deep"])];
        let tree = assemble(selections.iter().zip(results)).unwrap();
        assert_eq!(
            to_json(&tree),
            json!({"A": {"/": ["1", "2"], "B": {"C": "deep"}}})
        );
    }
}
