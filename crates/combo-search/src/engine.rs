#![forbid(unsafe_code)]

//! Ranked search over a slice of records.
//!
//! [`search`] tokenizes the query, scores every candidate, filters out
//! zero scores, sorts with the resolved [`Comparator`] and truncates to
//! the limit. Candidates are addressed by their index in the input slice;
//! records are never cloned.
//!
//! # Invariants
//!
//! 1. An empty or whitespace-only query bypasses scoring: every candidate
//!    scores `1` and input order is kept unless a sort spec applies.
//! 2. `total` counts matches before the limit is applied.
//! 3. Sorting is stable, so full ties keep input order.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Query with only regex metacharacters | Escaped and matched literally |
//! | Field missing on a record | Scores `0` for that field |
//! | Custom score returns NaN | Treated as `0` (filtered out) |

use combo_text::{TokenList, Tokenizer};

use crate::field::Searchable;
use crate::options::SearchOptions;
use crate::scorer::Scorer;
use crate::sort::Comparator;

/// A matched candidate: its score and its index in the input slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    /// Relevance; `1` for every candidate of an empty query.
    pub score: f64,
    /// Index into the searched slice.
    pub id: usize,
}

/// The result of one [`search`] call.
#[derive(Debug, Clone)]
pub struct PreparedSearch {
    /// Options the search ran with.
    pub options: SearchOptions,
    /// Trimmed, lowercased query.
    pub query: String,
    /// Tokens compiled from the query.
    pub tokens: TokenList,
    /// Number of matches before `limit`.
    pub total: usize,
    /// Matches in result order.
    pub items: Vec<ScoredItem>,
}

impl PreparedSearch {
    /// Tokenize `query` without scoring anything yet.
    #[must_use]
    pub fn prepare(query: &str, options: &SearchOptions) -> Self {
        let query = query.trim().to_lowercase();
        let tokens = Tokenizer::new()
            .diacritics(options.diacritics)
            .tokenize(&query, options.respect_word_boundaries);
        Self {
            options: options.clone(),
            query,
            tokens,
            total: 0,
            items: Vec::new(),
        }
    }

    /// Whether the query was empty after trimming.
    #[must_use]
    pub fn is_empty_query(&self) -> bool {
        self.query.is_empty()
    }

    /// Ids of the matched candidates, in result order.
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.items.iter().map(|item| item.id)
    }

    fn score<T: Searchable>(&self, record: &T) -> f64 {
        let score = match &self.options.score {
            Some(custom) => custom(record),
            None => Scorer::new(
                &self.tokens,
                &self.options.fields,
                self.options.conjunction,
                self.options.nesting,
            )
            .score(record),
        };
        if score.is_nan() { 0.0 } else { score }
    }

    fn run<T: Searchable>(mut self, items: &[T]) -> Self {
        let _span = tracing::debug_span!(
            "search",
            query_len = self.query.len(),
            tokens = self.tokens.len(),
            candidates = items.len()
        )
        .entered();

        // A query of pure whitespace yields no tokens but is already trimmed
        // to empty here, so both cases take the bypass.
        if self.is_empty_query() {
            self.items = (0..items.len()).map(|id| ScoredItem { score: 1.0, id }).collect();
        } else {
            let keep_all = !self.options.filter;
            self.items = items
                .iter()
                .enumerate()
                .filter_map(|(id, record)| {
                    let score = self.score(record);
                    (keep_all || score > 0.0).then_some(ScoredItem { score, id })
                })
                .collect();
        }
        self.total = self.items.len();

        if let Some(cmp) = Comparator::build(!self.is_empty_query(), &self.options) {
            cmp.sort(items, &mut self.items);
        }
        if let Some(limit) = self.options.limit {
            self.items.truncate(limit);
        }

        tracing::debug!(matched = self.total, returned = self.items.len(), "search done");
        self
    }
}

/// Search `items` for `query`.
///
/// ```
/// use combo_search::{SearchOptions, search};
/// use serde_json::json;
///
/// let items = vec![
///     json!({"id": 1, "text": "Apple"}),
///     json!({"id": 2, "text": "Banana"}),
///     json!({"id": 3, "text": "Grape"}),
/// ];
/// let result = search(&items, "ap", &SearchOptions::new().with_field("text"));
/// assert_eq!(result.ids().collect::<Vec<_>>(), vec![0, 2]);
/// ```
#[must_use]
pub fn search<T: Searchable>(items: &[T], query: &str, options: &SearchOptions) -> PreparedSearch {
    PreparedSearch::prepare(query, options).run(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{Conjunction, SortSpec};
    use serde_json::{Value, json};

    fn fruit() -> Vec<Value> {
        vec![
            json!({"id": 1, "text": "Apple", "kind": "pome"}),
            json!({"id": 2, "text": "Banana", "kind": "berry"}),
            json!({"id": 3, "text": "Grape", "kind": "berry"}),
            json!({"id": 4, "text": "Pineapple", "kind": "multiple"}),
        ]
    }

    fn ids(result: &PreparedSearch) -> Vec<usize> {
        result.ids().collect()
    }

    // ── Empty query ─────────────────────────────────────────────────

    #[test]
    fn empty_query_returns_everything_in_order() {
        let items = fruit();
        let result = search(&items, "", &SearchOptions::new().with_field("text"));
        assert_eq!(ids(&result), vec![0, 1, 2, 3]);
        assert!(result.items.iter().all(|i| i.score == 1.0));
        assert_eq!(result.total, 4);
        assert!(result.tokens.is_empty());
    }

    #[test]
    fn whitespace_query_is_empty() {
        let items = fruit();
        let result = search(&items, "   \t ", &SearchOptions::new().with_field("text"));
        assert!(result.is_empty_query());
        assert_eq!(result.total, 4);
    }

    #[test]
    fn empty_query_uses_sort_empty() {
        let items = fruit();
        let opts = SearchOptions::new()
            .with_field("text")
            .with_sort_empty([SortSpec::desc("text")]);
        let result = search(&items, "", &opts);
        assert_eq!(ids(&result), vec![3, 2, 1, 0]);
    }

    // ── Scoring and filtering ───────────────────────────────────────

    #[test]
    fn prefix_match_ranks_first() {
        let items = fruit();
        let result = search(&items, "ap", &SearchOptions::new().with_field("text"));
        // Apple (prefix) ahead of Grape and Pineapple (inner matches).
        assert_eq!(result.items[0].id, 0);
        assert!(!ids(&result).contains(&1));
        assert_eq!(result.total, 3);
    }

    #[test]
    fn filter_off_keeps_zero_scores() {
        let items = fruit();
        let opts = SearchOptions::new().with_field("text").with_filter(false);
        let result = search(&items, "zzz", &opts);
        assert_eq!(result.total, 4);
        assert!(result.items.iter().all(|i| i.score == 0.0));
    }

    #[test]
    fn and_conjunction_excludes_partial_matches() {
        let items = fruit();
        let opts = SearchOptions::new()
            .with_fields(["text", "kind"])
            .with_conjunction(Conjunction::And);
        let result = search(&items, "grape berry", &opts);
        assert_eq!(ids(&result), vec![2]);

        let opts = opts.with_conjunction(Conjunction::Or);
        let result = search(&items, "grape berry", &opts);
        assert_eq!(result.items[0].id, 2);
        assert!(ids(&result).contains(&1));
    }

    #[test]
    fn custom_score_overrides_tokens() {
        let items = fruit();
        let opts = SearchOptions::new().with_score(|r| match r.resolve("id", false) {
            Some(crate::FieldValue::Number(n)) if n > 2.0 => n,
            _ => 0.0,
        });
        let result = search(&items, "anything", &opts);
        assert_eq!(ids(&result), vec![3, 2]);
    }

    #[test]
    fn nan_custom_score_is_filtered() {
        let items = fruit();
        let opts = SearchOptions::new().with_score(|_| f64::NAN);
        assert_eq!(search(&items, "x", &opts).total, 0);
    }

    // ── Limit and ordering ──────────────────────────────────────────

    #[test]
    fn limit_truncates_after_sort() {
        let items = fruit();
        let opts = SearchOptions::new().with_field("text").with_limit(1);
        let result = search(&items, "ap", &opts);
        assert_eq!(result.total, 3);
        assert_eq!(ids(&result), vec![0]);
    }

    #[test]
    fn preserve_order_keeps_input_order() {
        let items = fruit();
        let opts = SearchOptions::new().with_field("text").preserve_order(true);
        let result = search(&items, "ap", &opts);
        assert_eq!(ids(&result), vec![0, 2, 3]);
    }

    #[test]
    fn regex_metacharacters_match_literally() {
        let items = vec![json!({"text": "C++ (lang)"}), json!({"text": "C"})];
        let result = search(&items, "c++ (", &SearchOptions::new().with_field("text"));
        assert_eq!(ids(&result), vec![0]);
    }

    #[test]
    fn query_is_trimmed_and_lowercased() {
        let items = fruit();
        let result = search(&items, "  APPLE ", &SearchOptions::new().with_field("text"));
        assert_eq!(result.query, "apple");
        assert_eq!(result.items[0].id, 0);
    }
}
