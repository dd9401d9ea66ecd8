use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Key under which a branch keeps its own leaf value.
pub const SELF_KEY: &str = "/";

/// One node of a query result.
///
/// Serializes as a plain JSON string, array or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Scalar(String),
    List(Vec<String>),
    Branch(ResultTree),
}

impl Node {
    /// A scalar for one value, a list for several.
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Node::Scalar),
            _ => Some(Node::List(values)),
        }
    }

    pub fn as_branch(&self) -> Option<&ResultTree> {
        match self {
            Node::Branch(tree) => Some(tree),
            _ => None,
        }
    }
}

/// Mapping from path segment to node. Keys iterate in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTree {
    children: BTreeMap<String, Node>,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.children.get(key)
    }

    pub(crate) fn entry(&mut self, key: &str) -> std::collections::btree_map::Entry<'_, String, Node> {
        self.children.entry(key.to_string())
    }

    pub fn insert(&mut self, key: impl Into<String>, node: Node) -> Option<Node> {
        self.children.insert(key.into(), node)
    }

    /// Follow a sequence of segments through nested branches.
    pub fn lookup(&self, segments: &[&str]) -> Option<&Node> {
        let (last, parents) = segments.split_last()?;
        let mut tree = self;
        for segment in parents {
            tree = tree.get(segment)?.as_branch()?;
        }
        tree.get(last)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.children.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_values_picks_shape() {
        assert_eq!(Node::from_values(vec![]), None);
        assert_eq!(
            Node::from_values(vec!["a".into()]),
            Some(Node::Scalar("a".into()))
        );
        assert_eq!(
            Node::from_values(vec!["a".into(), "b".into()]),
            Some(Node::List(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn serializes_as_plain_json() {
        let mut inner = ResultTree::new();
        inner.insert("C", Node::Scalar("1".into()));
        inner.insert(SELF_KEY, Node::List(vec!["C".into(), "D".into()]));
        let mut tree = ResultTree::new();
        tree.insert("B", Node::Branch(inner));

        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json, serde_json::json!({"B": {"C": "1", "/": ["C", "D"]}}));

        let back: ResultTree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn lookup_walks_branches() {
        let mut inner = ResultTree::new();
        inner.insert("C", Node::Scalar("1".into()));
        let mut tree = ResultTree::new();
        tree.insert("B", Node::Branch(inner));
        tree.insert("E", Node::Scalar("3".into()));

        assert_eq!(tree.lookup(&["B", "C"]), Some(&Node::Scalar("1".into())));
        assert_eq!(tree.lookup(&["E", "C"]), None);
        assert_eq!(tree.lookup(&[]), None);
    }
}
