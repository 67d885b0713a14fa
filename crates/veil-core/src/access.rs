//! Point lookups and edits by [`FieldPath`].

use veil_types::{bail, FieldPath, Result, Segment, Tree, VeilError};

/// Look up the node at `path`. The empty path returns the whole tree.
pub fn get<'a>(tree: &'a Tree, path: &FieldPath) -> Option<&'a Tree> {
    path.segments()
        .iter()
        .try_fold(tree, |node, segment| match (node, segment) {
            (Tree::Object(map), Segment::Key(key)) => map.get(key),
            (Tree::Array(items), Segment::Index(index)) => items.get(*index),
            _ => None,
        })
}

/// Mutable form of [`get`].
pub fn get_mut<'a>(tree: &'a mut Tree, path: &FieldPath) -> Option<&'a mut Tree> {
    let mut node = tree;
    for segment in path {
        node = match (node, segment) {
            (Tree::Object(map), Segment::Key(key)) => map.get_mut(key)?,
            (Tree::Array(items), Segment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Set the node at `path` to `value`, in place.
///
/// The parent container must exist. A map parent gains or overwrites the
/// key; a sequence parent only accepts an in-bounds index. The root itself
/// cannot be replaced.
///
/// # Errors
///
/// [`VeilError::Path`] when the path is empty, the parent is missing or is
/// not a container of the matching kind, or the index is out of bounds.
pub fn set(tree: &mut Tree, path: &FieldPath, value: Tree) -> Result<()> {
    let (parent_path, last) = path
        .split_last()
        .ok_or_else(|| VeilError::Path("Cannot replace the document root".to_string()))?;

    if parent_path.is_empty() && !tree.is_object() {
        bail!(Path, "The document root is not a map");
    }

    let parent = get_mut(tree, &parent_path)
        .ok_or_else(|| VeilError::Path(format!("No node at '{}'", parent_path)))?;

    match (parent, last) {
        (Tree::Object(map), Segment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Tree::Array(items), Segment::Index(index)) => {
            let len = items.len();
            let slot = items.get_mut(*index).ok_or_else(|| {
                VeilError::Path(format!("Index {} out of bounds at '{}' (length {})", index, parent_path, len))
            })?;
            *slot = value;
            Ok(())
        }
        (node, _) => Err(VeilError::Path(format!(
            "Cannot set '{}' on a {} at '{}'",
            last,
            kind(node),
            parent_path
        ))),
    }
}

/// Short name of a node's kind, for messages.
pub fn kind(node: &Tree) -> &'static str {
    match node {
        Tree::Object(_) => "map",
        Tree::Array(_) => "sequence",
        Tree::String(_) => "string",
        Tree::Number(_) => "number",
        Tree::Bool(_) => "boolean",
        Tree::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    fn sample() -> Tree {
        json!({
            "db": {"host": "localhost", "ports": [5432, 5433]},
            "users": [{"name": "alice"}]
        })
    }

    #[test]
    fn test_get() {
        let tree = sample();
        assert_eq!(get(&tree, &FieldPath::root()), Some(&tree));
        assert_eq!(get(&tree, &path("db.host")), Some(&json!("localhost")));
        assert_eq!(get(&tree, &path("db.ports[1]")), Some(&json!(5433)));
        assert_eq!(get(&tree, &path("users[0].name")), Some(&json!("alice")));
    }

    #[test]
    fn test_get_misses() {
        let tree = sample();
        assert_eq!(get(&tree, &path("db.missing")), None);
        assert_eq!(get(&tree, &path("db.ports[2]")), None);
        assert_eq!(get(&tree, &path("db.host.deeper")), None);
        assert_eq!(get(&tree, &path("db[0]")), None);
        assert_eq!(get(&tree, &path("users.name")), None);
    }

    #[test]
    fn test_set_overwrites_and_adds() {
        let mut tree = sample();
        set(&mut tree, &path("db.host"), json!("db.internal")).unwrap();
        set(&mut tree, &path("db.user"), json!("admin")).unwrap();
        set(&mut tree, &path("db.ports[0]"), json!(6432)).unwrap();
        set(&mut tree, &path("top"), json!(true)).unwrap();

        assert_eq!(tree["db"]["host"], json!("db.internal"));
        assert_eq!(tree["db"]["user"], json!("admin"));
        assert_eq!(tree["db"]["ports"], json!([6432, 5433]));
        assert_eq!(tree["top"], json!(true));
    }

    #[test]
    fn test_set_failures() {
        let mut tree = sample();
        let before = tree.clone();

        assert!(matches!(set(&mut tree, &FieldPath::root(), json!(1)), Err(VeilError::Path(_))));
        assert!(set(&mut tree, &path("missing.key"), json!(1)).is_err());
        assert!(set(&mut tree, &path("db.ports[2]"), json!(1)).is_err());
        assert!(set(&mut tree, &path("db.host.x"), json!(1)).is_err());
        assert!(set(&mut tree, &path("db.ports.x"), json!(1)).is_err());
        assert!(set(&mut tree, &path("db[0]"), json!(1)).is_err());
        assert_eq!(tree, before);
    }

    #[test]
    fn test_set_requires_map_root() {
        let mut tree = json!(["a", "b"]);
        assert!(set(&mut tree, &path("[0]"), json!("c")).is_err());
        assert!(set(&mut tree, &path("key"), json!("c")).is_err());

        let mut scalar = json!("text");
        assert!(set(&mut scalar, &path("key"), json!(1)).is_err());
    }
}
