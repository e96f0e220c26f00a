//! Inventory backend core: the category hierarchy engine.
//!
//! Server side, [`features::categories`] owns the authoritative tree:
//! materialized levels/paths, cycle-safe moves with cascading rewrites, and
//! the flat/nested/search query surface, persisted through a transactional
//! [`features::categories::stores::CategoryStore`].
//!
//! Client side, [`features::picker`] consumes flat category lists and
//! provides the headless dropdown machinery (tree building, fuzzy search,
//! selection state machine) that UIs embed.

pub mod core;
pub mod features;
pub mod shared;
