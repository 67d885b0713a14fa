//! Depth-first tree traversal with value substitution.
//!
//! The walker visits the root first and then every descendant, handing each
//! node to a [`Visitor`] which returns the node's replacement and whether to
//! descend into it. A new tree is built from the replacements; the input is
//! never touched.
//!
//! The path given to the visitor is the path of the node's *parent*; the
//! node's own key comes separately. The root call gets an empty path and
//! `None` as its key, which keeps it distinct from a map key that happens
//! to be the empty string.

use veil_types::{FieldPath, Result, Segment, Tree, TreeMap, VeilError, DEFAULT_MAX_DEPTH};

/// Whether the walker descends into the value a visitor returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Walk the returned value's children
    Descend,
    /// Use the returned value verbatim as the final subtree
    Stop,
}

/// A visitor's decision for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    /// The value that replaces the visited node
    pub value: Tree,
    /// Whether to continue into `value`'s children
    pub flow: Flow,
}

impl Visit {
    /// Replace the node with `value` and walk its children.
    pub fn descend(value: Tree) -> Self {
        Self { value, flow: Flow::Descend }
    }

    /// Replace the node with `value` and do not walk below it.
    pub fn stop(value: Tree) -> Self {
        Self { value, flow: Flow::Stop }
    }
}

/// Per-node callback driven by [`Walker`].
pub trait Visitor {
    /// Visit one node.
    ///
    /// `parent` is the path of the enclosing container and `key` the node's
    /// own segment, or `None` for the root. Returning an error aborts the
    /// walk.
    fn visit(&mut self, parent: &FieldPath, key: Option<&Segment>, value: Tree) -> Result<Visit>;
}

impl<F> Visitor for F
where
    F: FnMut(&FieldPath, Option<&Segment>, Tree) -> Result<Visit>,
{
    fn visit(&mut self, parent: &FieldPath, key: Option<&Segment>, value: Tree) -> Result<Visit> {
        self(parent, key, value)
    }
}

/// Recursive walker with a nesting limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walker {
    max_depth: usize,
}

impl Default for Walker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl Walker {
    /// Walker that rejects nodes nested deeper than `max_depth` (root is 0).
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// The configured depth limit.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Walk `tree`, returning the rebuilt tree.
    ///
    /// # Errors
    ///
    /// [`VeilError::DepthExceeded`] for documents nested past the limit, or
    /// the first error a visitor returns.
    pub fn walk<V: Visitor + ?Sized>(&self, tree: &Tree, visitor: &mut V) -> Result<Tree> {
        let mut path = FieldPath::root();
        self.walk_node(&mut path, None, tree.clone(), 0, visitor)
    }

    fn walk_node<V: Visitor + ?Sized>(
        &self,
        path: &mut FieldPath,
        key: Option<Segment>,
        value: Tree,
        depth: usize,
        visitor: &mut V,
    ) -> Result<Tree> {
        if depth > self.max_depth {
            return Err(VeilError::DepthExceeded { limit: self.max_depth });
        }

        let Visit { value, flow } = visitor.visit(path, key.as_ref(), value)?;
        if flow == Flow::Stop {
            return Ok(value);
        }

        // Children see this node's full path; the buffer is left dirty on
        // error since the walk is abandoned anyway.
        match value {
            Tree::Object(map) => {
                let own = key.is_some();
                if let Some(segment) = key {
                    path.push(segment);
                }
                let mut rebuilt = TreeMap::new();
                for (name, child) in map {
                    let child = self.walk_node(path, Some(Segment::Key(name.clone())), child, depth + 1, visitor)?;
                    rebuilt.insert(name, child);
                }
                if own {
                    path.pop();
                }
                Ok(Tree::Object(rebuilt))
            }
            Tree::Array(items) => {
                let own = key.is_some();
                if let Some(segment) = key {
                    path.push(segment);
                }
                let mut rebuilt = Vec::with_capacity(items.len());
                for (index, child) in items.into_iter().enumerate() {
                    rebuilt.push(self.walk_node(path, Some(Segment::Index(index)), child, depth + 1, visitor)?);
                }
                if own {
                    path.pop();
                }
                Ok(Tree::Array(rebuilt))
            }
            scalar => Ok(scalar),
        }
    }
}

/// Walk `tree` with the default depth limit.
pub fn walk<V: Visitor + ?Sized>(tree: &Tree, visitor: &mut V) -> Result<Tree> {
    Walker::default().walk(tree, visitor)
}

/// A node found by [`find_fields`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    /// Full path of the node, including its own key
    pub path: FieldPath,
    /// The node's own segment
    pub key: Segment,
    /// The node's value
    pub value: Tree,
}

/// Collect every non-root node for which `predicate(parent, key, value)` holds.
///
/// Matching containers are still descended into, so nested matches are
/// reported too.
pub fn find_fields<P>(tree: &Tree, mut predicate: P) -> Result<Vec<FieldInfo>>
where
    P: FnMut(&FieldPath, &Segment, &Tree) -> bool,
{
    let mut found = Vec::new();
    walk(tree, &mut |parent: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
        if let Some(key) = key {
            if predicate(parent, key, &value) {
                found.push(FieldInfo {
                    path: parent.child(key.clone()),
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
        Ok(Visit::descend(value))
    })?;
    Ok(found)
}

/// Full paths of every scalar leaf, in walk order.
pub fn leaf_paths(tree: &Tree) -> Result<Vec<FieldPath>> {
    Ok(find_fields(tree, |_, _, value| veil_types::is_scalar(value))?
        .into_iter()
        .map(|field| field.path)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::get;
    use crate::testing::arb_tree;
    use proptest::prelude::*;
    use serde_json::json;

    fn sample() -> Tree {
        json!({
            "name": "app",
            "servers": [
                {"host": "a", "private_token": "t1"},
                {"host": "b"}
            ],
            "db": {"port": 5432, "private_password": "pw"}
        })
    }

    #[test]
    fn test_identity_walk_preserves_tree() {
        let tree = sample();
        let mut identity = |_: &FieldPath, _: Option<&Segment>, value: Tree| -> Result<Visit> { Ok(Visit::descend(value)) };
        assert_eq!(walk(&tree, &mut identity).unwrap(), tree);
    }

    #[test]
    fn test_visit_order_and_paths() {
        let tree = json!({"b": [1, {"c": 2}], "a": 0});
        let mut seen = Vec::new();
        walk(&tree, &mut |parent: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
            let key = key.map(|k| k.to_string()).unwrap_or_else(|| "<root>".to_string());
            seen.push(format!("{}|{}", parent, key));
            Ok(Visit::descend(value))
        })
        .unwrap();

        assert_eq!(seen, vec!["|<root>", "|a", "|b", "b|[0]", "b|[1]", "b[1]|c"]);
    }

    #[test]
    fn test_root_key_is_distinct_from_empty_key() {
        let tree = json!({"": "empty"});
        let mut keys = Vec::new();
        walk(&tree, &mut |_: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
            keys.push(key.cloned());
            Ok(Visit::descend(value))
        })
        .unwrap();

        assert_eq!(keys, vec![None, Some(Segment::Key(String::new()))]);
    }

    #[test]
    fn test_substitution_is_descended() {
        let tree = json!({"slot": "placeholder"});
        let mut visited = Vec::new();
        let out = walk(&tree, &mut |parent: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
            if let Some(key) = key {
                visited.push(parent.child(key.clone()).to_string());
            }
            if key == Some(&Segment::from("slot")) {
                return Ok(Visit::descend(json!({"inner": 1})));
            }
            Ok(Visit::descend(value))
        })
        .unwrap();

        assert_eq!(out, json!({"slot": {"inner": 1}}));
        assert_eq!(visited, vec!["slot", "slot.inner"]);
    }

    #[test]
    fn test_stop_keeps_value_verbatim() {
        let tree = json!({"keep": {"x": 1}, "other": {"y": 2}});
        let mut visited = Vec::new();
        let out = walk(&tree, &mut |parent: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
            if let Some(key) = key {
                visited.push(parent.child(key.clone()).to_string());
            }
            if key == Some(&Segment::from("keep")) {
                return Ok(Visit::stop(json!("sealed")));
            }
            Ok(Visit::descend(value))
        })
        .unwrap();

        assert_eq!(out, json!({"keep": "sealed", "other": {"y": 2}}));
        assert_eq!(visited, vec!["keep", "other", "other.y"]);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let tree = sample();
        let before = tree.clone();
        let out = walk(&tree, &mut |_: &FieldPath, _: Option<&Segment>, value: Tree| -> Result<Visit> {
            Ok(Visit::descend(match value {
                Tree::String(_) => json!("changed"),
                other => other,
            }))
        })
        .unwrap();

        assert_eq!(tree, before);
        assert_ne!(out, tree);
    }

    #[test]
    fn test_visitor_error_aborts() {
        let tree = sample();
        let result = walk(&tree, &mut |_: &FieldPath, key: Option<&Segment>, value: Tree| -> Result<Visit> {
            if key == Some(&Segment::from("port")) {
                return Err(VeilError::Other("boom".to_string()));
            }
            Ok(Visit::descend(value))
        });
        assert!(matches!(result, Err(VeilError::Other(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut tree = json!("leaf");
        for _ in 0..5 {
            tree = json!({ "n": tree });
        }
        let mut identity = |_: &FieldPath, _: Option<&Segment>, value: Tree| -> Result<Visit> { Ok(Visit::descend(value)) };

        assert!(Walker::new(5).walk(&tree, &mut identity).is_ok());
        assert!(matches!(
            Walker::new(4).walk(&tree, &mut identity),
            Err(VeilError::DepthExceeded { limit: 4 })
        ));
    }

    #[test]
    fn test_find_fields() {
        let fields = find_fields(&sample(), |_, key, _| {
            key.as_key().map_or(false, |k| k.starts_with("private_"))
        })
        .unwrap();

        let paths: Vec<String> = fields.iter().map(|f| f.path.to_string()).collect();
        assert_eq!(paths, vec!["db.private_password", "servers[0].private_token"]);
        assert_eq!(fields[0].value, json!("pw"));
        assert_eq!(fields[1].key, Segment::from("private_token"));
    }

    #[test]
    fn test_leaf_paths() {
        let paths: Vec<String> = leaf_paths(&json!({"a": [1, {"b": null}], "c": {}}))
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["a[0]", "a[1].b"]);
    }

    proptest! {
        #[test]
        fn test_identity_walk_is_deep_equal(tree in arb_tree()) {
            let mut identity = |_: &FieldPath, _: Option<&Segment>, value: Tree| -> Result<Visit> { Ok(Visit::descend(value)) };
            prop_assert_eq!(walk(&tree, &mut identity).unwrap(), tree);
        }

        #[test]
        fn test_every_leaf_path_resolves(tree in arb_tree()) {
            let leaves = find_fields(&tree, |_, _, value| veil_types::is_scalar(value)).unwrap();
            for leaf in leaves {
                prop_assert_eq!(get(&tree, &leaf.path), Some(&leaf.value));
            }
        }
    }
}
