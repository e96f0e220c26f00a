mod memory;
mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::categories::models::{Category, NewCategory, SubtreeRewrite};

pub use memory::InMemoryCategoryStore;
pub use postgres::PgCategoryStore;

/// Transactional CRUD boundary over category rows.
///
/// The service layer computes every level/path value; the store only
/// persists. The two cascade primitives (`rename`, `apply_move`) must be
/// atomic: either the whole rewrite slice lands or none of it does.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn insert(&self, new: NewCategory) -> Result<Category>;

    async fn find(&self, id: Uuid) -> Result<Option<Category>>;

    /// All categories, ordered by path (depth-first reading order)
    async fn list(&self) -> Result<Vec<Category>>;

    /// Direct children; `None` selects the roots. Name-ordered.
    async fn children_of(&self, parent: Option<Uuid>) -> Result<Vec<Category>>;

    async fn child_count(&self, id: Uuid) -> Result<i64>;

    async fn child_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>>;

    /// The node itself plus all transitive descendants
    async fn subtree(&self, id: Uuid) -> Result<Vec<Category>>;

    /// Update name/description and apply the accompanying path rewrites in
    /// one transaction. `rewrites` covers the renamed node and its
    /// descendants; it is empty when the name did not change.
    async fn rename(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        rewrites: &[SubtreeRewrite],
    ) -> Result<Category>;

    /// Apply a re-parenting cascade in one transaction, locking the affected
    /// rows so concurrent moves over overlapping subtrees serialize.
    async fn apply_move(&self, rewrites: &[SubtreeRewrite]) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
