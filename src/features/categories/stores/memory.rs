use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, NewCategory, SubtreeRewrite};
use crate::features::categories::stores::CategoryStore;

/// In-memory category store.
///
/// Backs the hierarchy service tests and is handy for demos; mirrors the
/// transactional semantics of [`super::PgCategoryStore`] by applying each
/// rewrite slice under a single lock, all-or-nothing.
#[derive(Default)]
pub struct InMemoryCategoryStore {
    rows: Mutex<HashMap<Uuid, Category>>,
}

impl InMemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Category>> {
        // Mutex poisoning only happens if a holder panicked; propagating the
        // panic is the right behavior in tests.
        self.rows.lock().expect("category store lock poisoned")
    }
}

#[async_trait]
impl CategoryStore for InMemoryCategoryStore {
    async fn insert(&self, new: NewCategory) -> Result<Category> {
        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            parent_id: new.parent_id,
            name: new.name,
            description: new.description,
            level: new.level,
            path: new.path,
            created_at: now,
            updated_at: now,
        };

        self.lock().insert(category.id, category.clone());
        Ok(category)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.lock().get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Category>> {
        let mut rows: Vec<Category> = self.lock().values().cloned().collect();
        rows.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(rows)
    }

    async fn children_of(&self, parent: Option<Uuid>) -> Result<Vec<Category>> {
        let mut children: Vec<Category> = self
            .lock()
            .values()
            .filter(|c| c.parent_id == parent)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(children)
    }

    async fn child_count(&self, id: Uuid) -> Result<i64> {
        let count = self
            .lock()
            .values()
            .filter(|c| c.parent_id == Some(id))
            .count();
        Ok(count as i64)
    }

    async fn child_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        let rows = self.lock();
        let mut counts: HashMap<Uuid, i64> = ids.iter().map(|id| (*id, 0)).collect();
        for row in rows.values() {
            if let Some(pid) = row.parent_id {
                if let Some(n) = counts.get_mut(&pid) {
                    *n += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn subtree(&self, id: Uuid) -> Result<Vec<Category>> {
        let rows = self.lock();
        let Some(root) = rows.get(&id) else {
            return Ok(Vec::new());
        };

        // Breadth-first over parent_id
        let mut result = vec![root.clone()];
        let mut queue: VecDeque<Uuid> = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for row in rows.values() {
                if row.parent_id == Some(current) {
                    result.push(row.clone());
                    queue.push_back(row.id);
                }
            }
        }

        Ok(result)
    }

    async fn rename(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        rewrites: &[SubtreeRewrite],
    ) -> Result<Category> {
        let mut rows = self.lock();

        if !rows.contains_key(&id) {
            return Err(AppError::CategoryNotFound(id));
        }
        if let Some(rw) = rewrites.iter().find(|rw| !rows.contains_key(&rw.id)) {
            return Err(AppError::CategoryNotFound(rw.id));
        }

        let now = Utc::now();
        for rw in rewrites {
            if let Some(row) = rows.get_mut(&rw.id) {
                row.level = rw.level;
                row.path = rw.path.clone();
                row.updated_at = now;
            }
        }

        let row = rows
            .get_mut(&id)
            .ok_or(AppError::CategoryNotFound(id))?;
        row.name = name.to_string();
        row.description = description.map(|d| d.to_string());
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn apply_move(&self, rewrites: &[SubtreeRewrite]) -> Result<()> {
        let mut rows = self.lock();

        // All-or-nothing: verify every target exists before touching any row
        if let Some(rw) = rewrites.iter().find(|rw| !rows.contains_key(&rw.id)) {
            return Err(AppError::CategoryNotFound(rw.id));
        }

        let now = Utc::now();
        for rw in rewrites {
            if let Some(row) = rows.get_mut(&rw.id) {
                row.parent_id = rw.parent_id;
                row.level = rw.level;
                row.path = rw.path.clone();
                row.updated_at = now;
            }
        }

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        match self.lock().remove(&id) {
            Some(_) => Ok(()),
            None => Err(AppError::CategoryNotFound(id)),
        }
    }
}
