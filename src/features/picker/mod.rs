//! Client-side category picker.
//!
//! Headless building blocks for an interactive category dropdown: a tree
//! builder over flat category lists, a fuzzy search index with breadcrumb
//! annotations, and a stateful selector driven by actions and answering
//! with effects. The picker performs no I/O of its own; data fetching and
//! rendering belong to the embedding UI.
//!
//! Per-session flags (expanded, loaded) live in [`state::TreeState`], keyed
//! by category id, and are never merged back into the authoritative
//! category records.

pub mod position;
pub mod search;
pub mod selector;
pub mod state;
pub mod tree;

pub use search::{SearchConfig, SearchIndex, SearchMatch};
pub use selector::{
    Key, SelectorAction, SelectorConfig, SelectorEffect, SelectorView, TreeSelector,
};
pub use state::{CategoryItem, TreeState};
pub use tree::{build_tree, TreeBuildOptions, TreeNode};
