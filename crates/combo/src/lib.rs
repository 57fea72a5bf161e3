#![forbid(unsafe_code)]

//! Option matching and selection state for combo selection widgets.
//!
//! This crate re-exports the workspace crates under one name:
//!
//! | Module | Crate | Contents |
//! |--------|-------|----------|
//! | [`text`] | `combo-text` | Diacritic folding, tokenizer, markup fragments |
//! | [`search`] | `combo-search` | Scorer, sorter, ranked search |
//! | [`runtime`] | `combo-runtime` | Reactive cells, debounced remote fetching |
//! | [`widgets`] | `combo-widgets` | Option lists, navigation, highlighting, selection store |
//!
//! `runtime` and `widgets` sit behind the default `widgets` feature.
//!
//! # Example
//!
//! ```
//! use combo::prelude::*;
//! use serde_json::json;
//!
//! let store = SelectionStore::from_json(
//!     &json!([{"id": 1, "name": "Lisboa"}, {"id": 2, "name": "Porto"}]),
//!     StoreSettings::default(),
//! );
//! store.set_query("lis");
//! let row = store.navigate(None, NavKey::Down).unwrap();
//! let id = store.option_at(row).unwrap();
//! assert_eq!(store.render_label(id).as_deref(), Some("<span class=\"highlight\">Lis</span>boa"));
//! ```

pub use combo_search as search;
pub use combo_text as text;

#[cfg(feature = "widgets")]
pub use combo_runtime as runtime;
#[cfg(feature = "widgets")]
pub use combo_widgets as widgets;

pub use combo_search::{Conjunction, Direction, PreparedSearch, SearchOptions, SortSpec};
pub use combo_text::{Fragment, Tokenizer, fold};

#[cfg(feature = "widgets")]
pub use combo_widgets::{
    FlatEntry, NavIndex, NavKey, OptionId, OptionSet, RemoteOptions, RemoteState, SelectTarget,
    SelectionStore, StoreSettings, highlight_match,
};

/// Everything a widget implementation usually needs.
pub mod prelude {
    pub use combo_search::{SearchOptions, SortSpec, search};
    pub use combo_text::fold;

    #[cfg(feature = "widgets")]
    pub use combo_runtime::{FetchError, PendingRequest};
    #[cfg(feature = "widgets")]
    pub use combo_widgets::{
        FlatEntry, HttpClient, NavKey, OptionId, RemoteOptions, RemoteState, SelectTarget, SelectionStore,
        StoreSettings, highlight_match,
    };
}
