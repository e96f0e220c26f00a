use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat category row as supplied to the picker by the embedding UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryItem {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub level: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_count: Option<i64>,
}

/// Per-session UI state, keyed by category id.
///
/// Owned by one selector instance so several pickers can coexist; nothing
/// here ever flows back into the domain records.
#[derive(Debug, Clone, Default)]
pub struct TreeState {
    expanded: HashSet<Uuid>,
    loaded: HashSet<Uuid>,
    load_requested: HashSet<Uuid>,
}

impl TreeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.expanded.contains(&id)
    }

    pub fn set_expanded(&mut self, id: Uuid, expanded: bool) {
        if expanded {
            self.expanded.insert(id);
        } else {
            self.expanded.remove(&id);
        }
    }

    /// Flips membership in the expanded set; returns the new state
    pub fn toggle_expanded(&mut self, id: Uuid) -> bool {
        let expanded = !self.is_expanded(id);
        self.set_expanded(id, expanded);
        expanded
    }

    pub fn expand_all<I: IntoIterator<Item = Uuid>>(&mut self, ids: I) {
        self.expanded.extend(ids);
    }

    pub fn is_loaded(&self, id: Uuid) -> bool {
        self.loaded.contains(&id)
    }

    pub fn mark_loaded(&mut self, id: Uuid) {
        self.loaded.insert(id);
        self.load_requested.remove(&id);
    }

    /// True exactly once per node until [`Self::mark_loaded`] is called,
    /// so a lazy-load callback fires once however often the node is toggled.
    pub fn should_request_load(&mut self, id: Uuid) -> bool {
        if self.loaded.contains(&id) || self.load_requested.contains(&id) {
            return false;
        }
        self.load_requested.insert(id);
        true
    }

    /// Snapshot of the expanded set, taken before search auto-expansion
    pub fn expanded_snapshot(&self) -> HashSet<Uuid> {
        self.expanded.clone()
    }

    pub fn restore_expanded(&mut self, snapshot: HashSet<Uuid>) {
        self.expanded = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_expanded() {
        let mut state = TreeState::new();
        let id = Uuid::new_v4();

        assert!(!state.is_expanded(id));
        assert!(state.toggle_expanded(id));
        assert!(state.is_expanded(id));
        assert!(!state.toggle_expanded(id));
        assert!(!state.is_expanded(id));
    }

    #[test]
    fn test_should_request_load_fires_once() {
        let mut state = TreeState::new();
        let id = Uuid::new_v4();

        assert!(state.should_request_load(id));
        assert!(!state.should_request_load(id));

        state.mark_loaded(id);
        assert!(state.is_loaded(id));
        assert!(!state.should_request_load(id));
    }

    #[test]
    fn test_snapshot_restore_round_trip() {
        let mut state = TreeState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        state.set_expanded(a, true);
        let snapshot = state.expanded_snapshot();

        state.set_expanded(b, true);
        state.set_expanded(a, false);
        state.restore_expanded(snapshot);

        assert!(state.is_expanded(a));
        assert!(!state.is_expanded(b));
    }
}
