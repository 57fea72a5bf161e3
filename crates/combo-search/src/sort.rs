#![forbid(unsafe_code)]

//! Result ordering.
//!
//! [`Comparator::build`] resolves the effective sort fields for a search:
//!
//! - With a query, `$score` descending is prepended unless the spec already
//!   names `$score`.
//! - Without a query, `sort_empty` replaces `sort` when provided and any
//!   `$score` entry is dropped.
//! - An empty field list (or `preserve_order`) means "no sorting".
//!
//! Fields are evaluated in order and the first non-equal comparison wins.

use std::cmp::Ordering;

use crate::engine::ScoredItem;
use crate::field::{FieldValue, Searchable, compare_values};
use crate::options::{Direction, SearchOptions, SortSpec};

/// A resolved multi-field comparator.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparator {
    fields: Vec<SortSpec>,
    nesting: bool,
}

impl Comparator {
    /// Resolve the comparator for a search with (`has_query`) or without a
    /// query. Returns `None` when input order should be kept.
    #[must_use]
    pub fn build(has_query: bool, options: &SearchOptions) -> Option<Self> {
        if options.preserve_order {
            return None;
        }
        let spec = match (&options.sort_empty, has_query) {
            (Some(empty), false) => empty,
            _ => &options.sort,
        };
        let mut fields: Vec<SortSpec> = spec
            .iter()
            .filter(|s| has_query || !s.is_score())
            .cloned()
            .collect();
        if has_query && !fields.iter().any(SortSpec::is_score) {
            fields.insert(0, SortSpec::desc(crate::options::SCORE_FIELD));
        }
        if fields.is_empty() {
            return None;
        }
        Some(Self {
            fields,
            nesting: options.nesting,
        })
    }

    /// The effective sort fields, in evaluation order.
    #[must_use]
    pub fn fields(&self) -> &[SortSpec] {
        &self.fields
    }

    /// Compare two scored items of `items`.
    #[must_use]
    pub fn compare<T: Searchable>(&self, items: &[T], a: &ScoredItem, b: &ScoredItem) -> Ordering {
        for spec in &self.fields {
            let ord = if spec.is_score() {
                a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal)
            } else {
                let va = self.field(items, a, &spec.field);
                let vb = self.field(items, b, &spec.field);
                compare_values(va.as_ref(), vb.as_ref())
            };
            let ord = match spec.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn field<'t, T: Searchable>(
        &self,
        items: &'t [T],
        item: &ScoredItem,
        name: &str,
    ) -> Option<FieldValue<'t>> {
        items.get(item.id)?.resolve(name, self.nesting)
    }

    /// Stable-sort `scored` in place.
    pub fn sort<T: Searchable>(&self, items: &[T], scored: &mut [ScoredItem]) {
        scored.sort_by(|a, b| self.compare(items, a, b));
    }
}
