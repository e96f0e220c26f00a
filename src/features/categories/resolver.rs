use std::collections::HashMap;

use uuid::Uuid;

use crate::core::config::HierarchyConfig;
use crate::features::categories::models::Category;

/// Pure level/path computation over categories supplied by the store.
///
/// Holds no state beyond its configuration; every structural mutation in
/// [`crate::features::categories::HierarchyService`] goes through it.
#[derive(Debug, Clone)]
pub struct PathResolver {
    separator: String,
    max_depth: u32,
}

impl PathResolver {
    pub fn new(config: &HierarchyConfig) -> Self {
        Self {
            separator: config.path_separator.clone(),
            max_depth: config.max_depth,
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Depth of a node under the given parent; roots sit at level 0
    pub fn level_of(&self, parent: Option<&Category>) -> i32 {
        match parent {
            Some(p) => p.level + 1,
            None => 0,
        }
    }

    /// Materialized path of a node under the given parent
    pub fn path_of(&self, parent: Option<&Category>, name: &str) -> String {
        match parent {
            Some(p) => self.child_path(&p.path, name),
            None => name.to_string(),
        }
    }

    /// Extends an already-computed parent path by one segment. Used by the
    /// cascade planner, which carries fresh parent paths that are not yet
    /// persisted anywhere.
    pub fn child_path(&self, parent_path: &str, name: &str) -> String {
        format!("{}{}{}", parent_path, self.separator, name)
    }

    /// Whether `candidate` is a (strict) ancestor of `node`, walking the
    /// parent_id pointers through the supplied rows.
    ///
    /// Path-prefix comparison is deliberately avoided: names may contain the
    /// separator, so prefix tests can produce false positives. The walk is
    /// bounded by the configured maximum depth, which also makes it safe on
    /// corrupted (cyclic) data.
    pub fn is_ancestor(
        &self,
        candidate: Uuid,
        node: &Category,
        by_id: &HashMap<Uuid, Category>,
    ) -> bool {
        let mut cursor = node.parent_id;
        let mut hops = 0;

        while let Some(pid) = cursor {
            if pid == candidate {
                return true;
            }
            hops += 1;
            if hops > self.max_depth {
                return false;
            }
            cursor = by_id.get(&pid).and_then(|p| p.parent_id);
        }

        false
    }
}
