use std::collections::HashMap;

use uuid::Uuid;

use crate::features::picker::state::{CategoryItem, TreeState};
use crate::shared::constants::DEFAULT_MAX_DEPTH;

#[derive(Debug, Clone)]
pub struct TreeBuildOptions {
    /// Annotate nodes from the session's expanded set; otherwise every node
    /// gets `default_expanded`
    pub preserve_expanded: bool,
    pub default_expanded: bool,
    /// Defensive recursion bound. Cycle prevention is the server's job;
    /// this only stops runaway recursion on malformed input and must not be
    /// read as a correctness guarantee.
    pub max_depth: u32,
}

impl Default for TreeBuildOptions {
    fn default() -> Self {
        Self {
            preserve_expanded: true,
            default_expanded: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// One node of the presentation tree; a fresh tree is produced per build
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub item: CategoryItem,
    pub is_expanded: bool,
    /// Whether this node's children are known: either previously fetched
    /// (per session state) or present in the input list
    pub is_loaded: bool,
    pub children: Vec<TreeNode>,
}

/// Assemble a flat, possibly partially loaded category list into a nested
/// presentation tree. Roots are the entries with `parent_id == None`;
/// sibling order follows input order. The input is never mutated.
pub fn build_tree(
    items: &[CategoryItem],
    state: &TreeState,
    options: &TreeBuildOptions,
) -> Vec<TreeNode> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<&CategoryItem>> = HashMap::new();
    for item in items {
        by_parent.entry(item.parent_id).or_default().push(item);
    }

    by_parent
        .get(&None)
        .map(|roots| {
            roots
                .iter()
                .map(|root| build_node(root, &by_parent, state, options, 0))
                .collect()
        })
        .unwrap_or_default()
}

fn build_node(
    item: &CategoryItem,
    by_parent: &HashMap<Option<Uuid>, Vec<&CategoryItem>>,
    state: &TreeState,
    options: &TreeBuildOptions,
    depth: u32,
) -> TreeNode {
    let known_children = by_parent.get(&Some(item.id));

    let children = if depth + 1 < options.max_depth {
        known_children
            .map(|kids| {
                kids.iter()
                    .map(|kid| build_node(kid, by_parent, state, options, depth + 1))
                    .collect()
            })
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let is_expanded = if options.preserve_expanded {
        state.is_expanded(item.id)
    } else {
        options.default_expanded
    };

    TreeNode {
        item: item.clone(),
        is_expanded,
        is_loaded: state.is_loaded(item.id) || known_children.is_some(),
        children,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: Uuid, parent_id: Option<Uuid>, name: &str, level: i32) -> CategoryItem {
        CategoryItem {
            id,
            name: name.to_string(),
            parent_id,
            level,
            product_count: None,
        }
    }

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn test_three_level_chain_nests_under_single_root() {
        let id = ids(3);
        let items = vec![
            item(id[0], None, "Vehicles", 0),
            item(id[1], Some(id[0]), "Cars", 1),
            item(id[2], Some(id[1]), "Sedans", 2),
        ];

        let tree = build_tree(&items, &TreeState::new(), &TreeBuildOptions::default());

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].item.id, id[0]);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].item.id, id[1]);
        assert_eq!(tree[0].children[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].item.id, id[2]);
        assert!(tree[0].children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_expansion_comes_from_session_state() {
        let id = ids(2);
        let items = vec![item(id[0], None, "A", 0), item(id[1], Some(id[0]), "B", 1)];

        let mut state = TreeState::new();
        state.set_expanded(id[0], true);

        let tree = build_tree(&items, &state, &TreeBuildOptions::default());
        assert!(tree[0].is_expanded);
        assert!(!tree[0].children[0].is_expanded);
    }

    #[test]
    fn test_default_expanded_when_state_not_preserved() {
        let id = ids(2);
        let items = vec![item(id[0], None, "A", 0), item(id[1], Some(id[0]), "B", 1)];

        let options = TreeBuildOptions {
            preserve_expanded: false,
            default_expanded: true,
            ..TreeBuildOptions::default()
        };

        let tree = build_tree(&items, &TreeState::new(), &options);
        assert!(tree[0].is_expanded);
        assert!(tree[0].children[0].is_expanded);
    }

    #[test]
    fn test_is_loaded_from_input_or_state() {
        let id = ids(3);
        let items = vec![
            item(id[0], None, "A", 0),
            item(id[1], Some(id[0]), "B", 1),
            item(id[2], None, "C", 0),
        ];

        let mut state = TreeState::new();
        state.mark_loaded(id[2]);

        let tree = build_tree(&items, &state, &TreeBuildOptions::default());
        // A has a child in the list, C was marked loaded, B is unknown
        assert!(tree[0].is_loaded);
        assert!(tree[1].is_loaded);
        assert!(!tree[0].children[0].is_loaded);
    }

    #[test]
    fn test_cyclic_input_produces_no_roots_and_no_hang() {
        // Malformed input: two nodes claiming each other as parent. There is
        // no root, so the tree is empty; the point is that building
        // terminates.
        let id = ids(2);
        let items = vec![
            item(id[0], Some(id[1]), "A", 1),
            item(id[1], Some(id[0]), "B", 1),
        ];

        let tree = build_tree(&items, &TreeState::new(), &TreeBuildOptions::default());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_deep_chain_is_cut_at_max_depth() {
        let id = ids(6);
        let mut items = vec![item(id[0], None, "n0", 0)];
        for i in 1..6 {
            items.push(item(id[i], Some(id[i - 1]), &format!("n{}", i), i as i32));
        }

        let options = TreeBuildOptions {
            max_depth: 3,
            ..TreeBuildOptions::default()
        };
        let tree = build_tree(&items, &TreeState::new(), &options);

        let mut depth = 0;
        let mut cursor = &tree[0];
        while let Some(child) = cursor.children.first() {
            cursor = child;
            depth += 1;
        }
        // Levels 0..3 are rendered, everything deeper is cut
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_output_is_fresh_every_call() {
        let id = ids(2);
        let items = vec![item(id[0], None, "A", 0), item(id[1], Some(id[0]), "B", 1)];
        let state = TreeState::new();
        let options = TreeBuildOptions::default();

        let first = build_tree(&items, &state, &options);
        let second = build_tree(&items, &state, &options);
        assert_eq!(first, second);
    }
}
