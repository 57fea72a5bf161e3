#![forbid(unsafe_code)]

//! Ranked search over option records.
//!
//! The pipeline is tokenize → score → filter → sort → limit:
//!
//! - [`Scorer`] rates one record against the query tokens
//! - [`Comparator`] orders matches by score and configured fields
//! - [`search`] drives both over a slice and returns a [`PreparedSearch`]
//!
//! Records implement [`Searchable`]; `serde_json` objects do so out of the
//! box, with optional dotted-path resolution into nested objects.

pub mod engine;
pub mod field;
pub mod options;
pub mod scorer;
pub mod sort;

pub use engine::{PreparedSearch, ScoredItem, search};
pub use field::{FieldValue, Searchable, compare_values, scalar};
pub use options::{Conjunction, Direction, SCORE_FIELD, ScoreFn, SearchOptions, SortSpec};
pub use scorer::{Scorer, score_value};
pub use sort::Comparator;
