use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use uuid::Uuid;

use crate::core::config::HierarchyConfig;
use crate::core::error::{AppError, Result};
use crate::features::categories::models::{Category, CategoryNode, NewCategory, SubtreeRewrite};
use crate::features::categories::resolver::PathResolver;
use crate::features::categories::stores::CategoryStore;
use crate::features::picker::search::{SearchConfig, SearchIndex, SearchMatch};
use crate::shared::validation::{validate_description, validate_name};

/// Authoritative category tree service.
///
/// Every structural invariant is enforced here: levels and paths are
/// computed through [`PathResolver`] on create, rename and move; cycles and
/// the depth bound are rejected before anything is written; cascades reach
/// the store as a single atomic rewrite slice.
pub struct HierarchyService {
    store: Arc<dyn CategoryStore>,
    resolver: PathResolver,
    config: HierarchyConfig,
    index: SearchIndex,
}

impl HierarchyService {
    pub fn new(store: Arc<dyn CategoryStore>, config: HierarchyConfig) -> Self {
        let resolver = PathResolver::new(&config);
        Self {
            store,
            resolver,
            config,
            index: SearchIndex::new(SearchConfig::default()),
        }
    }

    pub fn with_search_config(mut self, config: SearchConfig) -> Self {
        self.index = SearchIndex::new(config);
        self
    }

    /// Create a category under the given parent (or as a root)
    pub async fn create(
        &self,
        parent_id: Option<Uuid>,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category> {
        let name = name.trim();
        validate_name(name)?;
        validate_description(description)?;

        let parent = self.fetch_parent(parent_id).await?;

        let level = self.resolver.level_of(parent.as_ref());
        if level >= self.config.max_depth as i32 {
            return Err(AppError::MaxDepthExceeded {
                level,
                max: self.config.max_depth,
            });
        }
        let path = self.resolver.path_of(parent.as_ref(), name);

        let category = self
            .store
            .insert(NewCategory {
                parent_id,
                name: name.to_string(),
                description: description.map(str::to_string),
                level,
                path,
            })
            .await?;

        tracing::info!("Category created: id={}, path={:?}", category.id, category.path);
        Ok(category)
    }

    /// Update name/description. Never structural, but a rename flows into
    /// the materialized paths of the node and all its descendants.
    pub async fn update(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Category> {
        let name = name.trim();
        validate_name(name)?;
        validate_description(description)?;

        let current = self.get(id).await?;

        let rewrites = if current.name == name {
            Vec::new()
        } else {
            let parent = self.fetch_parent(current.parent_id).await?;
            let new_path = self.resolver.path_of(parent.as_ref(), name);
            let subtree = self.store.subtree(id).await?;
            self.plan_rewrites(id, current.parent_id, current.level, new_path, &subtree)
        };

        let updated = self.store.rename(id, name, description, &rewrites).await?;
        tracing::info!("Category updated: id={}, path={:?}", id, updated.path);
        Ok(updated)
    }

    /// Re-parent a category, cascading level/path recomputation over its
    /// whole subtree in one atomic store call.
    pub async fn move_to(&self, id: Uuid, new_parent: Option<Uuid>) -> Result<()> {
        if new_parent == Some(id) {
            return Err(AppError::SelfParent);
        }

        let category = self.get(id).await?;
        let parent = self.fetch_parent(new_parent).await?;

        if category.parent_id == new_parent {
            return Ok(());
        }

        let subtree = self.store.subtree(id).await?;

        // The new parent must not sit inside the moved subtree: if walking
        // its parent_id chain through the subtree rows reaches `id`, the
        // move would create a cycle. A parent outside the subtree leaves
        // the row map on the first hop.
        if let Some(p) = parent.as_ref() {
            let by_id: HashMap<Uuid, Category> =
                subtree.iter().map(|c| (c.id, c.clone())).collect();
            if self.resolver.is_ancestor(id, p, &by_id) {
                return Err(AppError::Cycle {
                    id,
                    new_parent: p.id,
                });
            }
        }

        let new_level = self.resolver.level_of(parent.as_ref());
        let new_path = self.resolver.path_of(parent.as_ref(), &category.name);
        let rewrites = self.plan_rewrites(id, new_parent, new_level, new_path, &subtree);

        if let Some(deepest) = rewrites.iter().map(|rw| rw.level).max() {
            if deepest >= self.config.max_depth as i32 {
                return Err(AppError::MaxDepthExceeded {
                    level: deepest,
                    max: self.config.max_depth,
                });
            }
        }

        self.store.apply_move(&rewrites).await?;
        tracing::info!(
            "Category moved: id={}, new_parent={:?}, subtree_size={}",
            id,
            new_parent,
            rewrites.len()
        );
        Ok(())
    }

    /// Delete a childless category; blocked (never cascaded) otherwise
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let category = self.get(id).await?;

        if self.store.child_count(id).await? > 0 {
            return Err(AppError::HasChildren(id));
        }

        self.store.delete(id).await?;
        tracing::info!("Category deleted: id={}, path={:?}", id, category.path);
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Category> {
        self.store
            .find(id)
            .await?
            .ok_or(AppError::CategoryNotFound(id))
    }

    /// Flat list of all categories in depth-first (path) order
    pub async fn list(&self) -> Result<Vec<Category>> {
        self.store.list().await
    }

    /// Ancestor chain from root to the category itself. Always agrees with
    /// the materialized path string.
    pub async fn get_path(&self, id: Uuid) -> Result<Vec<Category>> {
        let mut chain = vec![self.get(id).await?];

        let mut hops = 0u32;
        while let Some(pid) = chain.last().and_then(|c| c.parent_id) {
            hops += 1;
            if hops > self.config.max_depth {
                return Err(AppError::Internal(format!(
                    "ancestor chain of category {} exceeds the configured depth",
                    id
                )));
            }
            let parent = self.store.find(pid).await?.ok_or_else(|| {
                AppError::Internal(format!("category {} references missing parent {}", id, pid))
            })?;
            chain.push(parent);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Direct children only; `None` lists the roots
    pub async fn get_children(&self, parent: Option<Uuid>) -> Result<Vec<Category>> {
        if let Some(pid) = parent {
            self.get(pid).await?;
        }
        self.store.children_of(parent).await
    }

    /// Nested hierarchy, optionally rooted and depth-bounded to cap
    /// response size
    pub async fn get_hierarchy(
        &self,
        root: Option<Uuid>,
        max_depth: Option<u32>,
    ) -> Result<Vec<CategoryNode>> {
        let rows = self.store.list().await?;
        let bound = max_depth
            .unwrap_or(self.config.max_depth)
            .min(self.config.max_depth);

        let mut by_parent: HashMap<Option<Uuid>, Vec<&Category>> = HashMap::new();
        for row in &rows {
            by_parent.entry(row.parent_id).or_default().push(row);
        }
        for siblings in by_parent.values_mut() {
            siblings.sort_by(|a, b| a.name.cmp(&b.name));
        }

        match root {
            Some(rid) => {
                let root_row = rows
                    .iter()
                    .find(|c| c.id == rid)
                    .ok_or(AppError::CategoryNotFound(rid))?;
                Ok(vec![Self::build_node(root_row, &by_parent, 0, bound)])
            }
            None => Ok(by_parent
                .get(&None)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|row| Self::build_node(row, &by_parent, 0, bound))
                .collect()),
        }
    }

    /// Server-side convenience over the same matching contract as the
    /// picker's search index
    pub async fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let rows = self.store.list().await?;
        Ok(self.index.search(&rows, query))
    }

    pub async fn child_count(&self, id: Uuid) -> Result<i64> {
        self.store.child_count(id).await
    }

    pub async fn child_counts(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, i64>> {
        self.store.child_counts(ids).await
    }

    async fn fetch_parent(&self, parent_id: Option<Uuid>) -> Result<Option<Category>> {
        match parent_id {
            Some(pid) => {
                let parent = self
                    .store
                    .find(pid)
                    .await?
                    .ok_or(AppError::ParentNotFound(pid))?;
                Ok(Some(parent))
            }
            None => Ok(None),
        }
    }

    /// Breadth-first cascade plan over a subtree: every node's new level
    /// and path come from its own already-rewritten parent, never from
    /// patching the old strings, so errors cannot compound. The moved (or
    /// renamed) root comes first, parents always before their children.
    fn plan_rewrites(
        &self,
        root_id: Uuid,
        new_parent_id: Option<Uuid>,
        new_level: i32,
        new_path: String,
        subtree: &[Category],
    ) -> Vec<SubtreeRewrite> {
        let mut children_of: HashMap<Uuid, Vec<&Category>> = HashMap::new();
        for row in subtree {
            if row.id == root_id {
                continue;
            }
            if let Some(pid) = row.parent_id {
                children_of.entry(pid).or_default().push(row);
            }
        }

        let mut rewrites = Vec::with_capacity(subtree.len());
        let mut queue: VecDeque<(Uuid, Option<Uuid>, i32, String)> =
            VecDeque::from([(root_id, new_parent_id, new_level, new_path)]);

        while let Some((id, parent_id, level, path)) = queue.pop_front() {
            for child in children_of.get(&id).into_iter().flatten() {
                queue.push_back((
                    child.id,
                    Some(id),
                    level + 1,
                    self.resolver.child_path(&path, &child.name),
                ));
            }
            rewrites.push(SubtreeRewrite {
                id,
                parent_id,
                level,
                path,
            });
        }

        rewrites
    }

    fn build_node(
        category: &Category,
        by_parent: &HashMap<Option<Uuid>, Vec<&Category>>,
        depth: u32,
        bound: u32,
    ) -> CategoryNode {
        let children_rows = by_parent.get(&Some(category.id));
        let children_count = children_rows.map_or(0, |rows| rows.len()) as i64;

        let children = if depth + 1 < bound {
            children_rows
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .map(|row| Self::build_node(row, by_parent, depth + 1, bound))
                .collect()
        } else {
            Vec::new()
        };

        CategoryNode {
            category: category.clone(),
            children_count,
            children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::categories::stores::InMemoryCategoryStore;
    use crate::shared::constants::DEFAULT_PATH_SEPARATOR;

    fn service() -> HierarchyService {
        HierarchyService::new(
            Arc::new(InMemoryCategoryStore::new()),
            HierarchyConfig::default(),
        )
    }

    fn shallow_service(max_depth: u32) -> HierarchyService {
        HierarchyService::new(
            Arc::new(InMemoryCategoryStore::new()),
            HierarchyConfig {
                max_depth,
                ..HierarchyConfig::default()
            },
        )
    }

    async fn create(svc: &HierarchyService, parent: Option<Uuid>, name: &str) -> Category {
        svc.create(parent, name, None).await.unwrap()
    }

    /// Re-derive every level and path purely from the parent_id chains and
    /// assert they match the materialized columns.
    async fn assert_invariants(svc: &HierarchyService) {
        let rows = svc.store.list().await.unwrap();
        let by_id: HashMap<Uuid, Category> = rows.iter().map(|c| (c.id, c.clone())).collect();

        for row in &rows {
            match row.parent_id {
                None => {
                    assert_eq!(row.level, 0, "root {} must sit at level 0", row.name);
                    assert_eq!(row.path, row.name, "root {} path must be its name", row.name);
                }
                Some(pid) => {
                    let parent = by_id.get(&pid).expect("parent row must exist");
                    assert_eq!(row.level, parent.level + 1);
                    assert_eq!(
                        row.path,
                        format!("{}{}{}", parent.path, DEFAULT_PATH_SEPARATOR, row.name)
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_create_root_and_child_invariants() {
        let svc = service();

        let root = create(&svc, None, "Electronics").await;
        assert_eq!(root.level, 0);
        assert_eq!(root.path, "Electronics");
        assert_eq!(root.parent_id, None);

        let child = create(&svc, Some(root.id), "Phones").await;
        assert_eq!(child.level, 1);
        assert_eq!(child.path, "Electronics > Phones");

        let grandchild = create(&svc, Some(child.id), "Android").await;
        assert_eq!(grandchild.level, 2);
        assert_eq!(grandchild.path, "Electronics > Phones > Android");

        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_create_trims_and_validates_name() {
        let svc = service();

        let cat = create(&svc, None, "  Spares  ").await;
        assert_eq!(cat.name, "Spares");
        assert_eq!(cat.path, "Spares");

        assert!(matches!(
            svc.create(None, "", None).await,
            Err(AppError::NameRequired)
        ));
        assert!(matches!(
            svc.create(None, &"x".repeat(101), None).await,
            Err(AppError::NameTooLong { .. })
        ));
        assert!(matches!(
            svc.create(None, "Ok", Some(&"d".repeat(501))).await,
            Err(AppError::DescriptionTooLong { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_parent() {
        let svc = service();
        let ghost = Uuid::new_v4();

        assert!(matches!(
            svc.create(Some(ghost), "Orphan", None).await,
            Err(AppError::ParentNotFound(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_create_enforces_max_depth() {
        let svc = shallow_service(2);

        let root = create(&svc, None, "L0").await;
        let child = create(&svc, Some(root.id), "L1").await;

        assert!(matches!(
            svc.create(Some(child.id), "L2", None).await,
            Err(AppError::MaxDepthExceeded { level: 2, max: 2 })
        ));
    }

    #[tokio::test]
    async fn test_move_rejects_self_parent() {
        let svc = service();
        let root = create(&svc, None, "Root").await;

        assert!(matches!(
            svc.move_to(root.id, Some(root.id)).await,
            Err(AppError::SelfParent)
        ));
    }

    #[tokio::test]
    async fn test_move_rejects_cycles_at_any_depth() {
        let svc = service();
        let a = create(&svc, None, "A").await;
        let b = create(&svc, Some(a.id), "B").await;
        let c = create(&svc, Some(b.id), "C").await;

        // Direct child and deep descendant both refused
        assert!(matches!(
            svc.move_to(a.id, Some(b.id)).await,
            Err(AppError::Cycle { .. })
        ));
        assert!(matches!(
            svc.move_to(a.id, Some(c.id)).await,
            Err(AppError::Cycle { .. })
        ));

        // Nothing was touched
        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_move_rejects_missing_target_and_parent() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let ghost = Uuid::new_v4();

        assert!(matches!(
            svc.move_to(ghost, None).await,
            Err(AppError::CategoryNotFound(id)) if id == ghost
        ));
        assert!(matches!(
            svc.move_to(root.id, Some(ghost)).await,
            Err(AppError::ParentNotFound(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_move_cascades_levels_and_paths_over_subtree() {
        let svc = service();
        let vehicles = create(&svc, None, "Vehicles").await;
        let cars = create(&svc, Some(vehicles.id), "Cars").await;
        let sedans = create(&svc, Some(cars.id), "Sedans").await;
        let hybrids = create(&svc, Some(sedans.id), "Hybrids").await;
        let machines = create(&svc, None, "Machines").await;

        svc.move_to(cars.id, Some(machines.id)).await.unwrap();

        let cars = svc.get(cars.id).await.unwrap();
        assert_eq!(cars.parent_id, Some(machines.id));
        assert_eq!(cars.level, 1);
        assert_eq!(cars.path, "Machines > Cars");

        let sedans = svc.get(sedans.id).await.unwrap();
        assert_eq!(sedans.level, 2);
        assert_eq!(sedans.path, "Machines > Cars > Sedans");

        let hybrids = svc.get(hybrids.id).await.unwrap();
        assert_eq!(hybrids.level, 3);
        assert_eq!(hybrids.path, "Machines > Cars > Sedans > Hybrids");

        // The old parent keeps its place
        let vehicles = svc.get(vehicles.id).await.unwrap();
        assert_eq!(vehicles.level, 0);

        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_move_to_root_lifts_whole_subtree() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let branch = create(&svc, Some(root.id), "Branch").await;
        let leaf = create(&svc, Some(branch.id), "Leaf").await;

        svc.move_to(branch.id, None).await.unwrap();

        let branch = svc.get(branch.id).await.unwrap();
        assert_eq!(branch.parent_id, None);
        assert_eq!(branch.level, 0);
        assert_eq!(branch.path, "Branch");

        let leaf = svc.get(leaf.id).await.unwrap();
        assert_eq!(leaf.level, 1);
        assert_eq!(leaf.path, "Branch > Leaf");

        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_move_to_current_parent_is_noop() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let child = create(&svc, Some(root.id), "Child").await;

        svc.move_to(child.id, Some(root.id)).await.unwrap();

        let unchanged = svc.get(child.id).await.unwrap();
        assert_eq!(unchanged.path, "Root > Child");
    }

    #[tokio::test]
    async fn test_move_enforces_max_depth_for_deep_subtrees() {
        let svc = shallow_service(3);
        let a = create(&svc, None, "A").await;
        let b = create(&svc, Some(a.id), "B").await;
        let _c = create(&svc, Some(b.id), "C").await;
        let other = create(&svc, None, "Other").await;
        let anchor = create(&svc, Some(other.id), "Anchor").await;

        // B's subtree is two levels tall; under Anchor its leaf would land
        // on level 3, past the bound
        assert!(matches!(
            svc.move_to(b.id, Some(anchor.id)).await,
            Err(AppError::MaxDepthExceeded { .. })
        ));
        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_rename_cascades_into_descendant_paths() {
        let svc = service();
        let root = create(&svc, None, "Electronics").await;
        let child = create(&svc, Some(root.id), "Phones").await;
        let leaf = create(&svc, Some(child.id), "Android").await;

        let renamed = svc
            .update(root.id, "Consumer Electronics", Some("devices"))
            .await
            .unwrap();
        assert_eq!(renamed.name, "Consumer Electronics");
        assert_eq!(renamed.path, "Consumer Electronics");
        assert_eq!(renamed.description.as_deref(), Some("devices"));

        let child = svc.get(child.id).await.unwrap();
        assert_eq!(child.path, "Consumer Electronics > Phones");
        let leaf = svc.get(leaf.id).await.unwrap();
        assert_eq!(leaf.path, "Consumer Electronics > Phones > Android");

        assert_invariants(&svc).await;
    }

    #[tokio::test]
    async fn test_update_without_rename_keeps_paths() {
        let svc = service();
        let root = create(&svc, None, "Tools").await;

        let updated = svc.update(root.id, "Tools", Some("hand tools")).await.unwrap();
        assert_eq!(updated.path, "Tools");
        assert_eq!(updated.description.as_deref(), Some("hand tools"));
    }

    #[tokio::test]
    async fn test_delete_blocked_while_children_exist() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let child = create(&svc, Some(root.id), "Child").await;

        assert!(matches!(
            svc.delete(root.id).await,
            Err(AppError::HasChildren(id)) if id == root.id
        ));

        svc.delete(child.id).await.unwrap();
        svc.delete(root.id).await.unwrap();

        assert!(matches!(
            svc.get(root.id).await,
            Err(AppError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_path_agrees_with_materialized_path() {
        let svc = service();
        let a = create(&svc, None, "A").await;
        let b = create(&svc, Some(a.id), "B").await;
        let c = create(&svc, Some(b.id), "C").await;

        let chain = svc.get_path(c.id).await.unwrap();
        let names: Vec<&str> = chain.iter().map(|cat| cat.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        let joined = names.join(DEFAULT_PATH_SEPARATOR);
        assert_eq!(joined, svc.get(c.id).await.unwrap().path);
    }

    #[tokio::test]
    async fn test_get_children_returns_direct_children_only() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let a = create(&svc, Some(root.id), "Alpha").await;
        let _deep = create(&svc, Some(a.id), "Deep").await;
        let b = create(&svc, Some(root.id), "Beta").await;

        let children = svc.get_children(Some(root.id)).await.unwrap();
        let ids: Vec<Uuid> = children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);

        let roots = svc.get_children(None).await.unwrap();
        assert_eq!(roots.len(), 1);

        assert!(matches!(
            svc.get_children(Some(Uuid::new_v4())).await,
            Err(AppError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_hierarchy_nests_and_counts_children() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let mid = create(&svc, Some(root.id), "Mid").await;
        let _leaf = create(&svc, Some(mid.id), "Leaf").await;

        let nodes = svc.get_hierarchy(None, None).await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].category.id, root.id);
        assert_eq!(nodes[0].children_count, 1);
        assert_eq!(nodes[0].children[0].category.id, mid.id);
        assert_eq!(nodes[0].children[0].children.len(), 1);
    }

    #[tokio::test]
    async fn test_get_hierarchy_depth_bound_caps_nesting_not_counts() {
        let svc = service();
        let root = create(&svc, None, "Root").await;
        let mid = create(&svc, Some(root.id), "Mid").await;
        let _leaf = create(&svc, Some(mid.id), "Leaf").await;

        let nodes = svc.get_hierarchy(Some(root.id), Some(2)).await.unwrap();
        assert_eq!(nodes[0].children.len(), 1);
        let mid_node = &nodes[0].children[0];
        assert!(mid_node.children.is_empty());
        // The true child count survives the trim
        assert_eq!(mid_node.children_count, 1);
    }

    #[tokio::test]
    async fn test_get_hierarchy_unknown_root() {
        let svc = service();
        assert!(matches!(
            svc.get_hierarchy(Some(Uuid::new_v4()), None).await,
            Err(AppError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_ranks_and_annotates() {
        let svc = service();
        let parts = create(&svc, None, "Parts").await;
        create(&svc, Some(parts.id), "Engine").await;
        create(&svc, Some(parts.id), "Engines").await;
        create(&svc, Some(parts.id), "Suspension").await;

        let results = svc.search("eng").await.unwrap();
        assert!(results.len() >= 2);
        assert_eq!(results[0].name, "Engine");
        assert_eq!(results[1].name, "Engines");
        for m in results.iter().take(2) {
            assert_eq!(m.ancestors, vec!["Parts".to_string()]);
            assert!(m.highlighted.contains("<mark>"));
        }
    }
}
