use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, NewCategory, SubtreeRewrite};
use crate::features::categories::stores::CategoryStore;

const CATEGORY_COLUMNS: &str =
    "id, parent_id, name, description, level, path, created_at, updated_at";

/// Postgres-backed category store
pub struct PgCategoryStore {
    pool: PgPool,
}

impl PgCategoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CategoryStore for PgCategoryStore {
    async fn insert(&self, new: NewCategory) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            INSERT INTO categories (parent_id, name, description, level, path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(new.parent_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.level)
        .bind(&new.path)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert category: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(category)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch category {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        Ok(category)
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY path ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list categories: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(categories)
    }

    async fn children_of(&self, parent: Option<Uuid>) -> Result<Vec<Category>> {
        let children = match parent {
            Some(pid) => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories WHERE parent_id = $1 ORDER BY name ASC"
                ))
                .bind(pid)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Category>(&format!(
                    "SELECT {CATEGORY_COLUMNS} FROM categories WHERE parent_id IS NULL ORDER BY name ASC"
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| {
            tracing::error!("Failed to fetch children of {:?}: {:?}", parent, e);
            AppError::Database(e)
        })?;

        Ok(children)
    }

    async fn child_count(&self, id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE parent_id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count children of {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        Ok(count)
    }

    async fn child_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT parent_id, COUNT(*)
            FROM categories
            WHERE parent_id = ANY($1)
            GROUP BY parent_id
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count children: {:?}", e);
            AppError::Database(e)
        })?;

        let mut counts: HashMap<Uuid, i64> = ids.iter().map(|id| (*id, 0)).collect();
        counts.extend(rows);
        Ok(counts)
    }

    async fn subtree(&self, id: Uuid) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(&format!(
            r#"
            WITH RECURSIVE subtree AS (
                SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1
                UNION ALL
                SELECT c.id, c.parent_id, c.name, c.description, c.level, c.path,
                       c.created_at, c.updated_at
                FROM categories c
                JOIN subtree s ON c.parent_id = s.id
            )
            SELECT {CATEGORY_COLUMNS} FROM subtree
            "#
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch subtree of {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        Ok(rows)
    }

    async fn rename(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        rewrites: &[SubtreeRewrite],
    ) -> Result<Category> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Paths first: the node's own rewrite already carries the new name.
        for rw in rewrites {
            sqlx::query("UPDATE categories SET level = $2, path = $3, updated_at = NOW() WHERE id = $1")
                .bind(rw.id)
                .bind(rw.level)
                .bind(&rw.path)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to rewrite path for {}: {:?}", rw.id, e);
                    AppError::Database(e)
                })?;
        }

        let category = sqlx::query_as::<_, Category>(&format!(
            r#"
            UPDATE categories
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update category {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(category)
    }

    async fn apply_move(&self, rewrites: &[SubtreeRewrite]) -> Result<()> {
        if rewrites.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Lock the whole affected subtree up front, in id order, so two
        // concurrent moves over overlapping subtrees serialize instead of
        // interleaving their level/path updates.
        let ids: Vec<Uuid> = rewrites.iter().map(|rw| rw.id).collect();
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM categories WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to lock subtree rows: {:?}", e);
            AppError::Database(e)
        })?;

        for rw in rewrites {
            sqlx::query(
                r#"
                UPDATE categories
                SET parent_id = $2, level = $3, path = $4, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(rw.id)
            .bind(rw.parent_id)
            .bind(rw.level)
            .bind(&rw.path)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to apply move rewrite for {}: {:?}", rw.id, e);
                AppError::Database(e)
            })?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete category {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::CategoryNotFound(id));
        }

        Ok(())
    }
}
