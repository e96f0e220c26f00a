use std::collections::HashSet;

use uuid::Uuid;

use crate::features::picker::position::{place_dropdown, Placement, Rect, Size};
use crate::features::picker::search::{SearchConfig, SearchIndex, SearchMatch};
use crate::features::picker::state::{CategoryItem, TreeState};
use crate::features::picker::tree::{build_tree, TreeBuildOptions, TreeNode};

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    /// Re-selecting the selected node clears the selection
    pub allow_clear: bool,
    /// Keep the dropdown open after a selection and track a selection set
    pub multi_select: bool,
    pub search: SearchConfig,
    pub tree: TreeBuildOptions,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            allow_clear: true,
            multi_select: false,
            search: SearchConfig::default(),
            tree: TreeBuildOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorView {
    Closed,
    Browsing,
    Searching,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
}

/// Everything the embedding UI can do to the selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorAction {
    /// Trigger clicked
    Open,
    /// Outside click or focus loss
    Close,
    QueryChanged(String),
    /// A search issued earlier has finished; stale sequence numbers are
    /// dropped here
    SearchResolved { seq: u64, results: Vec<SearchMatch> },
    ToggleExpand(Uuid),
    Select(Uuid),
    /// The lazy loader finished fetching a node's children
    ChildrenLoaded { parent: Uuid, items: Vec<CategoryItem> },
    Key(Key),
    /// Open, scroll or resize; drives dropdown placement
    ViewportChanged {
        trigger: Rect,
        dropdown: Size,
        viewport: Size,
    },
}

/// Everything the selector asks the embedding UI to do. The selector does
/// no I/O itself: `Changed` maps to the onChange callback, `LoadChildren`
/// to onLoadMore, and `SearchRequested` to a debounced search run.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorEffect {
    Opened,
    Closed,
    Changed(Option<Uuid>),
    LoadChildren(Uuid),
    SearchRequested {
        seq: u64,
        query: String,
        delay_ms: u64,
    },
    Placed(Placement),
}

/// Headless category dropdown: a state machine over
/// closed / open-browsing / open-searching.
///
/// All mutation happens synchronously inside [`Self::handle`]; overlapping
/// async searches are serialized by sequence number, never by preemption.
pub struct TreeSelector {
    config: SelectorConfig,
    items: Vec<CategoryItem>,
    state: TreeState,
    index: SearchIndex,
    view: SelectorView,
    selected: Option<Uuid>,
    multi_selected: HashSet<Uuid>,
    query: String,
    query_seq: u64,
    results: Vec<SearchMatch>,
    /// Expanded set as it stood before search auto-expansion
    saved_expanded: Option<HashSet<Uuid>>,
    /// Index into the visible node sequence
    focus: Option<usize>,
    geometry: Option<(Rect, Size, Size)>,
}

impl TreeSelector {
    pub fn new(config: SelectorConfig, items: Vec<CategoryItem>) -> Self {
        let index = SearchIndex::new(config.search.clone());
        Self {
            config,
            items,
            state: TreeState::new(),
            index,
            view: SelectorView::Closed,
            selected: None,
            multi_selected: HashSet::new(),
            query: String::new(),
            query_seq: 0,
            results: Vec::new(),
            saved_expanded: None,
            focus: None,
            geometry: None,
        }
    }

    pub fn view(&self) -> SelectorView {
        self.view
    }

    pub fn selected(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_set(&self) -> &HashSet<Uuid> {
        &self.multi_selected
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[SearchMatch] {
        &self.results
    }

    pub fn is_expanded(&self, id: Uuid) -> bool {
        self.state.is_expanded(id)
    }

    /// Current browsing tree, rebuilt from the flat items and session state
    pub fn tree(&self) -> Vec<TreeNode> {
        build_tree(&self.items, &self.state, &self.config.tree)
    }

    /// Node ids in visually rendered order: search results while searching,
    /// the expanded-tree traversal otherwise. Keyboard focus follows this.
    pub fn visible_ids(&self) -> Vec<Uuid> {
        match self.view {
            SelectorView::Searching => self.results.iter().map(|m| m.id).collect(),
            _ => {
                let mut out = Vec::new();
                flatten_visible(&self.tree(), &mut out);
                out
            }
        }
    }

    pub fn focused(&self) -> Option<Uuid> {
        self.focus
            .and_then(|i| self.visible_ids().get(i).copied())
    }

    /// Execute the search a `SearchRequested` effect asked for. Split from
    /// [`Self::handle`] so the caller can await the debounce window (and
    /// any remote fetch) in between.
    pub fn run_search(&self, query: &str) -> Vec<SearchMatch> {
        self.index.search(&self.items, query)
    }

    pub fn handle(&mut self, action: SelectorAction) -> Vec<SelectorEffect> {
        match action {
            SelectorAction::Open => self.open(),
            SelectorAction::Close => self.close(),
            SelectorAction::QueryChanged(query) => self.query_changed(query),
            SelectorAction::SearchResolved { seq, results } => self.search_resolved(seq, results),
            SelectorAction::ToggleExpand(id) => self.toggle_expand(id),
            SelectorAction::Select(id) => self.select(id),
            SelectorAction::ChildrenLoaded { parent, items } => self.children_loaded(parent, items),
            SelectorAction::Key(key) => self.key(key),
            SelectorAction::ViewportChanged {
                trigger,
                dropdown,
                viewport,
            } => self.viewport_changed(trigger, dropdown, viewport),
        }
    }

    fn open(&mut self) -> Vec<SelectorEffect> {
        if self.view != SelectorView::Closed {
            return Vec::new();
        }

        self.view = SelectorView::Browsing;
        self.focus = None;

        let mut effects = vec![SelectorEffect::Opened];
        if let Some((trigger, dropdown, viewport)) = self.geometry {
            effects.push(SelectorEffect::Placed(place_dropdown(
                trigger, dropdown, viewport,
            )));
        }
        effects
    }

    fn close(&mut self) -> Vec<SelectorEffect> {
        if self.view == SelectorView::Closed {
            return Vec::new();
        }

        self.leave_search();
        self.query.clear();
        self.view = SelectorView::Closed;
        self.focus = None;
        vec![SelectorEffect::Closed]
    }

    /// Undo search-time state: restore the pre-search expanded set and drop
    /// any in-flight query by bumping the sequence
    fn leave_search(&mut self) {
        if let Some(snapshot) = self.saved_expanded.take() {
            self.state.restore_expanded(snapshot);
        }
        self.results.clear();
        self.query_seq += 1;
    }

    fn query_changed(&mut self, query: String) -> Vec<SelectorEffect> {
        if self.view == SelectorView::Closed {
            return Vec::new();
        }

        self.query = query.clone();

        let length = query.trim().chars().count();
        if length >= self.config.search.min_search_length {
            self.query_seq += 1;
            return vec![SelectorEffect::SearchRequested {
                seq: self.query_seq,
                query,
                delay_ms: self.config.search.debounce_ms,
            }];
        }

        // Below the minimum the query is inert; if a search was showing,
        // return to browsing with the prior expand state intact
        if self.view == SelectorView::Searching {
            self.leave_search();
            self.view = SelectorView::Browsing;
            self.focus = None;
        } else {
            self.query_seq += 1;
        }
        Vec::new()
    }

    fn search_resolved(&mut self, seq: u64, results: Vec<SearchMatch>) -> Vec<SelectorEffect> {
        // Results for anything but the latest issued query are stale and
        // must never overwrite the current result set
        if self.view == SelectorView::Closed || seq != self.query_seq {
            return Vec::new();
        }

        if self.view != SelectorView::Searching {
            self.saved_expanded = Some(self.state.expanded_snapshot());
            self.view = SelectorView::Searching;
        }

        for m in &results {
            self.state.expand_all(m.ancestor_ids.iter().copied());
        }
        self.focus = if results.is_empty() { None } else { Some(0) };
        self.results = results;
        Vec::new()
    }

    fn toggle_expand(&mut self, id: Uuid) -> Vec<SelectorEffect> {
        if self.view != SelectorView::Browsing {
            return Vec::new();
        }

        let expanded = self.state.toggle_expanded(id);

        let mut effects = Vec::new();
        if expanded
            && !self.state.is_loaded(id)
            && !self.has_children_in_items(id)
            && self.state.should_request_load(id)
        {
            effects.push(SelectorEffect::LoadChildren(id));
        }
        effects
    }

    fn select(&mut self, id: Uuid) -> Vec<SelectorEffect> {
        if self.view == SelectorView::Closed {
            return Vec::new();
        }

        if self.config.multi_select {
            if self.multi_selected.contains(&id) {
                if !self.config.allow_clear {
                    return Vec::new();
                }
                self.multi_selected.remove(&id);
                return vec![SelectorEffect::Changed(None)];
            }
            self.multi_selected.insert(id);
            // multi-select keeps the dropdown open
            return vec![SelectorEffect::Changed(Some(id))];
        }

        if self.selected == Some(id) {
            if !self.config.allow_clear {
                return Vec::new();
            }
            self.selected = None;
            return vec![SelectorEffect::Changed(None)];
        }

        self.selected = Some(id);
        let mut effects = vec![SelectorEffect::Changed(Some(id))];
        if !self.has_children_in_items(id) {
            effects.extend(self.close());
        }
        effects
    }

    fn children_loaded(&mut self, parent: Uuid, items: Vec<CategoryItem>) -> Vec<SelectorEffect> {
        let incoming: HashSet<Uuid> = items.iter().map(|i| i.id).collect();
        self.items.retain(|i| !incoming.contains(&i.id));
        self.items.extend(items);
        self.state.mark_loaded(parent);
        Vec::new()
    }

    fn key(&mut self, key: Key) -> Vec<SelectorEffect> {
        if self.view == SelectorView::Closed {
            return Vec::new();
        }

        match key {
            Key::Escape => self.close(),
            Key::ArrowDown => {
                self.move_focus(1);
                Vec::new()
            }
            Key::ArrowUp => {
                self.move_focus(-1);
                Vec::new()
            }
            Key::Enter | Key::Space => match self.focused() {
                Some(id) => self.select(id),
                None => Vec::new(),
            },
            Key::ArrowRight => match self.focused() {
                Some(id) if !self.state.is_expanded(id) && self.is_expandable(id) => {
                    self.toggle_expand(id)
                }
                _ => Vec::new(),
            },
            Key::ArrowLeft => match self.focused() {
                Some(id) if self.state.is_expanded(id) => self.toggle_expand(id),
                _ => Vec::new(),
            },
        }
    }

    fn viewport_changed(
        &mut self,
        trigger: Rect,
        dropdown: Size,
        viewport: Size,
    ) -> Vec<SelectorEffect> {
        self.geometry = Some((trigger, dropdown, viewport));
        if self.view == SelectorView::Closed {
            return Vec::new();
        }
        vec![SelectorEffect::Placed(place_dropdown(
            trigger, dropdown, viewport,
        ))]
    }

    fn move_focus(&mut self, delta: i64) {
        let visible = self.visible_ids();
        if visible.is_empty() {
            self.focus = None;
            return;
        }

        let next = match self.focus {
            None => 0,
            Some(current) => (current as i64 + delta).clamp(0, visible.len() as i64 - 1) as usize,
        };
        self.focus = Some(next);
    }

    fn has_children_in_items(&self, id: Uuid) -> bool {
        self.items.iter().any(|i| i.parent_id == Some(id))
    }

    /// A node can expand if it has known children or its children have not
    /// been fetched yet (expanding will trigger the lazy loader)
    fn is_expandable(&self, id: Uuid) -> bool {
        self.has_children_in_items(id) || !self.state.is_loaded(id)
    }
}

fn flatten_visible(nodes: &[TreeNode], out: &mut Vec<Uuid>) {
    for node in nodes {
        out.push(node.item.id);
        if node.is_expanded {
            flatten_visible(&node.children, out);
        }
    }
}
