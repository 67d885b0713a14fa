//! Shared proptest strategies.

use proptest::prelude::*;
use veil_types::Tree;

/// Arbitrary documents. Some keys carry the default `private_` prefix so
/// engine passes have fields to seal.
pub(crate) fn arb_tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Null),
        any::<bool>().prop_map(Tree::from),
        any::<i64>().prop_map(Tree::from),
        "[a-z0-9 ]{0,8}".prop_map(Tree::from),
    ];
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Tree::Array),
            prop::collection::btree_map("(private_)?[a-z_]{0,6}", inner, 0..5)
                .prop_map(|map| Tree::Object(map.into_iter().collect())),
        ]
    })
}
