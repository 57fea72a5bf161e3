#![forbid(unsafe_code)]

//! Option lists and selection state for combo selection widgets.
//!
//! Options arrive as JSON records, optionally grouped under `label` +
//! `options` objects. From there:
//!
//! - [`record`]: the option arena ([`OptionSet`]) with selection order
//! - [`flatten`] and [`filter`]: the display list of group headers and items
//! - [`index`]: keyboard navigation over the display list ([`NavIndex`])
//! - [`highlight`]: query highlighting inside rendered item markup
//! - [`settings`]: [`StoreSettings`] and field auto-detection
//! - [`store`]: [`SelectionStore`], the reactive state tying it together
//! - [`remote`]: debounced remote option loading
//!
//! # Example
//!
//! ```
//! use combo_widgets::{NavKey, SelectionStore, StoreSettings};
//! use serde_json::json;
//!
//! let store = SelectionStore::from_json(
//!     &json!([
//!         {"label": "Fruit", "options": [{"value": "ap", "text": "Apple"}, {"value": "gr", "text": "Grape"}]},
//!         {"label": "Veg", "options": [{"value": "ca", "text": "Carrot"}]},
//!     ]),
//!     StoreSettings::default(),
//! );
//! assert_eq!(store.current_list_length(), 3);
//! let row = store.navigate(None, NavKey::Down).unwrap();
//! let apple = store.option_at(row).unwrap();
//! store.select_option(apple);
//! assert_eq!(store.selected_values(), vec![json!("ap")]);
//! ```

pub mod filter;
pub mod flatten;
pub mod highlight;
pub mod index;
pub mod record;
pub mod remote;
pub mod settings;
pub mod store;

pub use filter::filter_list;
pub use flatten::{FlatEntry, FlatList, flatten};
pub use highlight::{HIGHLIGHT_CLASS, highlight_fragment, highlight_item, highlight_match, label_formatter};
pub use index::{IndexError, NavIndex, NavKey, Slot};
pub use record::{GroupId, OptionGroup, OptionId, OptionRecord, OptionSet};
pub use remote::{HttpClient, RemoteOptions, UrlSource};
pub use settings::{ConfigError, Messages, RemoteFetchMode, ResolvedFields, StoreSettings};
pub use store::{RemoteState, SelectTarget, SelectionStore};
