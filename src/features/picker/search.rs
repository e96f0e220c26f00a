use std::collections::HashMap;
use std::ops::Range;
use std::time::Duration;

use uuid::Uuid;

use crate::features::categories::models::Category;
use crate::features::picker::state::CategoryItem;

/// Extra score granted to exact substring matches on top of fuzzy
/// similarity, so "eng" pins "Engine" above mere look-alikes
const SUBSTRING_BOOST: f64 = 0.25;

/// Seam between the matcher and whatever rows it searches: the server-side
/// [`Category`] carries description and materialized path, the picker's
/// [`CategoryItem`] only a name.
pub trait Searchable {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn level(&self) -> i32;
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str> {
        None
    }
    fn full_path(&self) -> Option<&str> {
        None
    }
}

impl Searchable for CategoryItem {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
    fn level(&self) -> i32 {
        self.level
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Searchable for Category {
    fn id(&self) -> Uuid {
        self.id
    }
    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }
    fn level(&self) -> i32 {
        self.level
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
    fn full_path(&self) -> Option<&str> {
        Some(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Description,
    Path,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Minimum jaro-winkler similarity for a non-substring match
    pub fuzzy_threshold: f64,
    pub max_results: usize,
    /// Queries shorter than this leave search inactive
    pub min_search_length: usize,
    pub search_fields: Vec<SearchField>,
    /// Delay between keystroke and search execution; see [`debounce`]
    pub debounce_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.7,
            max_results: 50,
            min_search_length: 2,
            search_fields: vec![SearchField::Name, SearchField::Path, SearchField::Description],
            debounce_ms: 250,
        }
    }
}

/// A scored search hit, annotated for breadcrumb display
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub path: Option<String>,
    pub score: f64,
    /// The field the best score came from
    pub field: SearchField,
    /// Ancestor chain, root first, as far as the input list reaches
    pub ancestor_ids: Vec<Uuid>,
    pub ancestors: Vec<String>,
    /// Matched field with `<mark>` around the matched span
    pub highlighted: String,
}

/// Fuzzy/substring matcher over a flat category list.
///
/// Ordering is deterministic: score descending, then shallower level, then
/// lexical name order.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    config: SearchConfig,
}

impl SearchIndex {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn search<T: Searchable>(&self, items: &[T], query: &str) -> Vec<SearchMatch> {
        let query = query.trim();
        if query.chars().count() < self.config.min_search_length {
            return Vec::new();
        }
        let query_lower = query.to_lowercase();

        let by_id: HashMap<Uuid, &T> = items.iter().map(|item| (item.id(), item)).collect();

        let mut matches: Vec<SearchMatch> = items
            .iter()
            .filter_map(|item| {
                let (score, field, text, span) = self.best_field(item, &query_lower)?;
                let (ancestor_ids, ancestors) = breadcrumb(item, &by_id);
                Some(SearchMatch {
                    id: item.id(),
                    name: item.name().to_string(),
                    level: item.level(),
                    path: item.full_path().map(String::from),
                    score,
                    field,
                    ancestor_ids,
                    ancestors,
                    highlighted: highlight(text, span),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.level.cmp(&b.level))
                .then_with(|| a.name.cmp(&b.name))
        });
        matches.truncate(self.config.max_results);
        matches
    }

    /// Best-scoring configured field, with the matched span when the match
    /// was an exact substring
    fn best_field<'a, T: Searchable>(
        &self,
        item: &'a T,
        query_lower: &str,
    ) -> Option<(f64, SearchField, &'a str, Option<Range<usize>>)> {
        let mut best: Option<(f64, SearchField, &'a str, Option<Range<usize>>)> = None;

        for field in &self.config.search_fields {
            let text = match field {
                SearchField::Name => Some(item.name()),
                SearchField::Description => item.description(),
                SearchField::Path => item.full_path(),
            };
            let Some(text) = text else { continue };
            let Some((score, span)) = self.score_field(query_lower, text) else {
                continue;
            };
            if best.as_ref().map_or(true, |(s, ..)| score > *s) {
                best = Some((score, *field, text, span));
            }
        }

        best
    }

    fn score_field(&self, query_lower: &str, text: &str) -> Option<(f64, Option<Range<usize>>)> {
        let text_lower = text.to_lowercase();
        let similarity = strsim::jaro_winkler(query_lower, &text_lower);

        match text_lower.find(query_lower) {
            Some(start) => {
                // Byte offsets come from the lowercased copy; only reuse them
                // when they land on boundaries of the original text.
                let end = start + query_lower.len();
                let span = (end <= text.len()
                    && text.is_char_boundary(start)
                    && text.is_char_boundary(end))
                .then_some(start..end);
                Some((similarity + SUBSTRING_BOOST, span))
            }
            None if similarity >= self.config.fuzzy_threshold => Some((similarity, None)),
            None => None,
        }
    }
}

/// Ancestor chain of `item` through the supplied rows, root first. Bounded
/// by the list size so corrupted input cannot loop.
fn breadcrumb<T: Searchable>(item: &T, by_id: &HashMap<Uuid, &T>) -> (Vec<Uuid>, Vec<String>) {
    let mut ids = Vec::new();
    let mut names = Vec::new();

    let mut cursor = item.parent_id();
    let mut hops = 0;
    while let Some(pid) = cursor {
        hops += 1;
        if hops > by_id.len() {
            break;
        }
        let Some(parent) = by_id.get(&pid) else { break };
        ids.push(pid);
        names.push(parent.name().to_string());
        cursor = parent.parent_id();
    }

    ids.reverse();
    names.reverse();
    (ids, names)
}

/// Wraps the matched span in `<mark>` tags; fuzzy (non-substring) matches
/// highlight the whole field
pub fn highlight(text: &str, span: Option<Range<usize>>) -> String {
    match span {
        Some(span) => format!(
            "{}<mark>{}</mark>{}",
            &text[..span.start],
            &text[span.start..span.end],
            &text[span.end..]
        ),
        None => format!("<mark>{}</mark>", text),
    }
}

/// Waits out the debounce window before a search is executed.
///
/// Cancellation is by supersession, not preemption: the selector stamps
/// every query with a sequence number before the caller awaits this, and a
/// result arriving with anything but the latest sequence is discarded.
pub async fn debounce(delay_ms: u64) {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: Uuid, parent_id: Option<Uuid>, name: &str, level: i32) -> CategoryItem {
        CategoryItem {
            id,
            name: name.to_string(),
            parent_id,
            level,
            product_count: None,
        }
    }

    fn index() -> SearchIndex {
        SearchIndex::new(SearchConfig::default())
    }

    #[test]
    fn test_eng_ranks_engines_above_suspension() {
        let parent = Uuid::new_v4();
        let items = vec![
            item(parent, None, "Parts", 0),
            item(Uuid::new_v4(), Some(parent), "Engine", 1),
            item(Uuid::new_v4(), Some(parent), "Engines", 1),
            item(Uuid::new_v4(), Some(parent), "Suspension", 1),
        ];

        let results = index().search(&items, "eng");
        let names: Vec<&str> = results.iter().map(|m| m.name.as_str()).collect();

        assert!(names.len() >= 2);
        assert_eq!(names[0], "Engine");
        assert_eq!(names[1], "Engines");
        assert!(!names.iter().take(2).any(|n| *n == "Suspension"));

        // Every engine match carries a non-empty breadcrumb
        for m in results.iter().take(2) {
            assert_eq!(m.ancestors, vec!["Parts".to_string()]);
            assert_eq!(m.ancestor_ids, vec![parent]);
        }
    }

    #[test]
    fn test_query_below_min_length_is_inactive() {
        let items = vec![item(Uuid::new_v4(), None, "Engine", 0)];
        assert!(index().search(&items, "e").is_empty());
        assert!(index().search(&items, " ").is_empty());
    }

    #[test]
    fn test_ties_break_by_level_then_name() {
        let root = Uuid::new_v4();
        // "Carpet" and "Carbon" score identically for "car" (same length,
        // same matching prefix)
        let items = vec![
            item(root, None, "Carpet", 0),
            item(Uuid::new_v4(), Some(root), "Carbon", 1),
            item(Uuid::new_v4(), Some(root), "Carpet", 1),
        ];

        let results = index().search(&items, "car");
        let ranked: Vec<(i32, &str)> = results.iter().map(|m| (m.level, m.name.as_str())).collect();
        assert_eq!(
            ranked,
            vec![(0, "Carpet"), (1, "Carbon"), (1, "Carpet")]
        );
    }

    #[test]
    fn test_max_results_caps_output() {
        let config = SearchConfig {
            max_results: 1,
            ..SearchConfig::default()
        };
        let items = vec![
            item(Uuid::new_v4(), None, "Engine", 0),
            item(Uuid::new_v4(), None, "Engines", 0),
        ];

        let results = SearchIndex::new(config).search(&items, "eng");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Engine");
    }

    #[test]
    fn test_non_matching_text_is_discarded() {
        let items = vec![item(Uuid::new_v4(), None, "Suspension", 0)];
        assert!(index().search(&items, "engine").is_empty());
    }

    #[test]
    fn test_substring_match_is_highlighted() {
        let items = vec![item(Uuid::new_v4(), None, "Engine", 0)];
        let results = index().search(&items, "eng");
        assert_eq!(results[0].highlighted, "<mark>Eng</mark>ine");
    }

    #[test]
    fn test_description_field_matches_category_rows() {
        let now = Utc::now();
        let rows = vec![Category {
            id: Uuid::new_v4(),
            parent_id: None,
            name: "Widgets".to_string(),
            description: Some("engine spares and seals".to_string()),
            level: 0,
            path: "Widgets".to_string(),
            created_at: now,
            updated_at: now,
        }];

        let results = index().search(&rows, "engine");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field, SearchField::Description);
        assert!(results[0].highlighted.starts_with("<mark>engine</mark>"));
    }

    #[tokio::test]
    async fn test_debounce_resolves() {
        debounce(1).await;
    }
}
