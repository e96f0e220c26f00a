use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a product category.
///
/// `level` and `path` are materializations of the `parent_id` chain and are
/// always re-derivable from it; `parent_id` is the invariant of record.
#[derive(Debug, Clone, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; id and timestamps are assigned by the store
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub path: String,
}

/// One row of a cascading structural rewrite (move or rename).
///
/// A slice of these is applied atomically by the store; a partially applied
/// cascade would leave level/path inconsistent with parent_id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtreeRewrite {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    pub path: String,
}

/// Read-only composition of a category and its nested children, assembled
/// per hierarchy query and never persisted.
#[derive(Debug, Clone)]
pub struct CategoryNode {
    pub category: Category,
    /// True direct-child count, independent of any depth bound applied to
    /// `children`
    pub children_count: i64,
    pub children: Vec<CategoryNode>,
}
