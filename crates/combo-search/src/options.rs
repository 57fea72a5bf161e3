#![forbid(unsafe_code)]

//! Search configuration.

use std::fmt;
use std::sync::Arc;

use crate::field::Searchable;

/// Name of the synthetic sort field holding the computed score.
pub const SCORE_FIELD: &str = "$score";

/// Custom scoring function replacing the token scorer.
pub type ScoreFn = Arc<dyn Fn(&dyn Searchable) -> f64 + Send + Sync>;

/// How multiple query tokens combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Conjunction {
    /// Every token must match; any miss scores the record 0.
    And,
    /// Tokens are averaged; a partial match still scores above 0.
    #[default]
    Or,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One `{field, direction}` entry of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SortSpec {
    /// Field name, or [`SCORE_FIELD`].
    pub field: String,
    /// Direction; ascending unless stated.
    #[cfg_attr(feature = "serde", serde(default))]
    pub direction: Direction,
}

impl SortSpec {
    /// Ascending sort on `field`.
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending sort on `field`.
    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Whether this entry sorts on the computed score.
    #[must_use]
    pub fn is_score(&self) -> bool {
        self.field == SCORE_FIELD
    }
}

/// Options for one search call.
///
/// ```
/// use combo_search::{Conjunction, SearchOptions, SortSpec};
///
/// let opts = SearchOptions::new()
///     .with_fields(["text", "tags"])
///     .with_sort([SortSpec::asc("text")])
///     .with_conjunction(Conjunction::And)
///     .with_limit(10);
/// assert_eq!(opts.fields, vec!["text", "tags"]);
/// ```
#[derive(Clone)]
pub struct SearchOptions {
    /// Fields searched by the token scorer.
    pub fields: Vec<String>,
    /// Sort specification used when a query is present (and when empty,
    /// unless `sort_empty` is set).
    pub sort: Vec<SortSpec>,
    /// Sort specification used instead of `sort` for an empty query.
    pub sort_empty: Option<Vec<SortSpec>>,
    /// Scoring override.
    pub score: Option<ScoreFn>,
    /// When false, zero-score records are kept in the results.
    pub filter: bool,
    /// Maximum number of items returned; `total` still counts all matches.
    pub limit: Option<usize>,
    /// Token combination mode.
    pub conjunction: Conjunction,
    /// Resolve dotted field names through nested objects.
    pub nesting: bool,
    /// Expand base letters to their accented variants.
    pub diacritics: bool,
    /// Anchor every token at a word boundary.
    pub respect_word_boundaries: bool,
    /// Never sort; keep input order (used for grouped lists).
    pub preserve_order: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            sort: Vec::new(),
            sort_empty: None,
            score: None,
            filter: true,
            limit: None,
            conjunction: Conjunction::Or,
            nesting: false,
            diacritics: true,
            respect_word_boundaries: false,
            preserve_order: false,
        }
    }
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("fields", &self.fields)
            .field("sort", &self.sort)
            .field("sort_empty", &self.sort_empty)
            .field("score", &self.score.as_ref().map(|_| "<fn>"))
            .field("filter", &self.filter)
            .field("limit", &self.limit)
            .field("conjunction", &self.conjunction)
            .field("nesting", &self.nesting)
            .field("diacritics", &self.diacritics)
            .field("respect_word_boundaries", &self.respect_word_boundaries)
            .field("preserve_order", &self.preserve_order)
            .finish()
    }
}

impl SearchOptions {
    /// Default options: no fields, no sort, filtering on, diacritics on.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search a single field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields = vec![field.into()];
        self
    }

    /// Search several fields; scores are averaged across them.
    #[must_use]
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the sort specification.
    #[must_use]
    pub fn with_sort(mut self, sort: impl IntoIterator<Item = SortSpec>) -> Self {
        self.sort = sort.into_iter().collect();
        self
    }

    /// Set the sort specification used for empty queries.
    #[must_use]
    pub fn with_sort_empty(mut self, sort: impl IntoIterator<Item = SortSpec>) -> Self {
        self.sort_empty = Some(sort.into_iter().collect());
        self
    }

    /// Replace the token scorer.
    #[must_use]
    pub fn with_score(mut self, score: impl Fn(&dyn Searchable) -> f64 + Send + Sync + 'static) -> Self {
        self.score = Some(Arc::new(score));
        self
    }

    /// Keep (`false`) or drop (`true`, default) zero-score records.
    #[must_use]
    pub fn with_filter(mut self, filter: bool) -> Self {
        self.filter = filter;
        self
    }

    /// Truncate results after sorting.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the token combination mode.
    #[must_use]
    pub fn with_conjunction(mut self, conjunction: Conjunction) -> Self {
        self.conjunction = conjunction;
        self
    }

    /// Enable dotted-path field resolution.
    #[must_use]
    pub fn with_nesting(mut self, nesting: bool) -> Self {
        self.nesting = nesting;
        self
    }

    /// Enable or disable diacritic expansion.
    #[must_use]
    pub fn with_diacritics(mut self, diacritics: bool) -> Self {
        self.diacritics = diacritics;
        self
    }

    /// Anchor tokens at word boundaries.
    #[must_use]
    pub fn respect_word_boundaries(mut self, enabled: bool) -> Self {
        self.respect_word_boundaries = enabled;
        self
    }

    /// Disable sorting entirely, keeping input order.
    #[must_use]
    pub fn preserve_order(mut self, enabled: bool) -> Self {
        self.preserve_order = enabled;
        self
    }
}
