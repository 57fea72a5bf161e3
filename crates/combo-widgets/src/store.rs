#![forbid(unsafe_code)]

//! The selection store.
//!
//! [`SelectionStore`] owns the option set, the live query and the settings
//! as [`Observable`]s. Everything the dropdown shows is derived from those
//! three through [`Computed`] values that recompute lazily on read:
//!
//! ```text
//! settings ─┬─> fields ─┐
//! options ──┼─> flat ───┼─> matching ─> index
//! query ────┴───────────┘
//! ```
//!
//! Mutations go through the store's operations; multi-step operations run
//! inside a [`BatchScope`] so dependents are invalidated once.
//!
//! # Invariants
//!
//! 1. Matching options never contain a selected item while a query is
//!    active, nor in multiple mode.
//! 2. When the selection is full, matching options are empty.
//! 3. Single-select mode never holds more than one selected item.
//! 4. In multiple mode with `max > 0`, at most `max` items are selected.
//! 5. Every successful selection clears the query.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Selecting a disabled option | Ignored, returns `None` |
//! | Selecting while the selection is full | Ignored, returns `None` |
//! | Selecting text without `creatable` | Ignored, returns `None` |
//! | Remote fetch fails | Options cleared, `fetchEmpty` message, warning logged |

use std::fmt;

use ahash::AHashSet;
use combo_runtime::{BatchScope, Binding, BindingScope, Computed, FetchError, Observable, Subscription};
use serde_json::Value;

use crate::filter::filter_list;
use crate::flatten::{FlatEntry, FlatList, flatten};
use crate::highlight::{highlight_item, label_formatter};
use crate::index::{NavIndex, NavKey};
use crate::record::{OptionId, OptionRecord, OptionSet};
use crate::settings::{ResolvedFields, StoreSettings};

/// What [`SelectionStore::select_option`] should select.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectTarget {
    /// An existing option.
    Option(OptionId),
    /// The first option whose value field loosely equals this value.
    Value(Value),
    /// Typed text, turned into a new option (creatable mode only).
    Text(String),
}

impl From<OptionId> for SelectTarget {
    fn from(id: OptionId) -> Self {
        Self::Option(id)
    }
}

impl From<Value> for SelectTarget {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for SelectTarget {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for SelectTarget {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Remote loading status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RemoteState {
    /// Options are local; no remote source.
    #[default]
    Local,
    /// Remote source configured; nothing requested yet.
    Waiting,
    /// A request is scheduled or in flight.
    Fetching,
    /// The last request succeeded.
    Loaded,
    /// The last request failed.
    Failed,
}

enum Pick {
    Existing(OptionId),
    Create(OptionRecord),
}

/// Options, query and selection with derived dropdown state.
pub struct SelectionStore {
    options: Observable<OptionSet>,
    query: Observable<String>,
    settings: Observable<StoreSettings>,
    remote: Observable<RemoteState>,
    fields: Computed<ResolvedFields>,
    matching: Computed<Vec<FlatEntry>>,
    index: Computed<NavIndex>,
    message: Binding<Option<String>>,
    _reconcile: BindingScope,
}

impl fmt::Debug for SelectionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionStore")
            .field("options", &self.options.with(OptionSet::len))
            .field("selected", &self.options.with(|s| s.selected_ids().to_vec()))
            .field("query", &self.query.get())
            .field("remote", &self.remote.get())
            .finish_non_exhaustive()
    }
}

impl SelectionStore {
    /// Build a store over `options`.
    ///
    /// ```
    /// use combo_widgets::{OptionSet, SelectionStore, StoreSettings};
    /// use serde_json::json;
    ///
    /// let store = SelectionStore::new(
    ///     OptionSet::from_json(&json!([{"id": 1, "name": "Oslo"}, {"id": 2, "name": "Bergen"}])),
    ///     StoreSettings::default(),
    /// );
    /// store.set_query("osl");
    /// assert_eq!(store.matching_options().len(), 1);
    /// let picked = store.select_option(json!(2)).unwrap();
    /// assert_eq!(store.selected_ids(), vec![picked]);
    /// assert_eq!(store.query(), "");
    /// ```
    #[must_use]
    pub fn new(options: OptionSet, settings: StoreSettings) -> Self {
        let mut initial = options;
        reconcile(&mut initial, &settings);
        let remote_state = if settings.fetch.is_some() {
            RemoteState::Waiting
        } else {
            RemoteState::Local
        };

        let options = Observable::new(initial);
        let query = Observable::new(String::new());
        let settings = Observable::new(settings);
        let remote = Observable::new(remote_state);

        let fields = Computed::from2(&settings, &options, ResolvedFields::resolve);
        let flat = Computed::from_observable(&options, flatten);

        let matching = {
            let (options, query, settings, remote) =
                (options.clone(), query.clone(), settings.clone(), remote.clone());
            let (fields, flat) = (fields.clone(), flat.clone());
            Computed::new(move || {
                let remote_active = remote.get() != RemoteState::Local;
                settings.with(|s| {
                    options.with(|set| {
                        query.with(|q| {
                            flat.with(|fl| fields.with(|f| matching_entries(set, fl, q, s, f, remote_active)))
                        })
                    })
                })
            })
        }
        .track(&options)
        .track(&query)
        .track(&settings)
        .track(&remote)
        .track_computed(&fields)
        .track_computed(&flat);

        let index = {
            let (options, matching) = (options.clone(), matching.clone());
            Computed::new(move || options.with(|set| matching.with(|m| NavIndex::build(set, m))))
        }
        .track_computed(&matching);

        let message = {
            let (options, query, settings, remote, matching) = (
                options.clone(),
                query.clone(),
                settings.clone(),
                remote.clone(),
                matching.clone(),
            );
            Binding::new(move || {
                settings.with(|s| {
                    let (selected, is_empty) = options.with(|set| (set.selected_ids().len(), set.is_empty()));
                    if s.is_max_reached(selected) {
                        return Some(s.messages.max_message(s.max));
                    }
                    if matching.with(|m| !m.is_empty()) {
                        return None;
                    }
                    let blank_query = query.with(|q| q.trim().is_empty());
                    match remote.get() {
                        RemoteState::Fetching => return None,
                        RemoteState::Waiting if blank_query => return Some(s.messages.fetch_before.clone()),
                        RemoteState::Loaded | RemoteState::Failed if is_empty => {
                            return Some(s.messages.fetch_empty.clone());
                        }
                        _ => {}
                    }
                    if is_empty || blank_query {
                        Some(s.messages.empty.clone())
                    } else {
                        Some(s.messages.nomatch.clone())
                    }
                })
            })
        };

        let mut scope = BindingScope::new();
        let opts = options.clone();
        scope.subscribe(&settings, move |s: &StoreSettings| {
            if opts.with(|set| overflows(set, s)) {
                opts.update(|set| reconcile(set, s));
            }
        });

        Self {
            options,
            query,
            settings,
            remote,
            fields,
            matching,
            index,
            message,
            _reconcile: scope,
        }
    }

    /// Build from a JSON option array.
    #[must_use]
    pub fn from_json(options: &Value, settings: StoreSettings) -> Self {
        Self::new(OptionSet::from_json(options), settings)
    }

    // ── Selection ───────────────────────────────────────────────────

    /// Select an option, a value or typed text. Returns the selected id.
    ///
    /// In single-select mode the previous selection is replaced. Typed
    /// text creates a new option (`_created`) when `creatable` is on.
    /// A successful selection clears the query.
    pub fn select_option(&self, target: impl Into<SelectTarget>) -> Option<OptionId> {
        let target = target.into();
        let _span = tracing::debug_span!("select_option", target = ?target).entered();
        let settings = self.settings.get();
        let fields = self.fields.get();

        let selected = self.options.with(|set| set.selected_ids().len());
        if settings.is_max_reached(selected) {
            tracing::debug!(selected, max = settings.max, "selection full; ignored");
            return None;
        }

        let pick = match target {
            SelectTarget::Option(id) => self.options.with(|set| set.is_selectable(id).then_some(id)).map(Pick::Existing),
            SelectTarget::Value(value) => self
                .options
                .with(|set| set.find_by_value(&fields.value, &value).filter(|id| set.is_selectable(*id)))
                .map(Pick::Existing),
            SelectTarget::Text(text) => (settings.creatable && !text.trim().is_empty()).then(|| {
                Pick::Create(OptionRecord::created(
                    &fields.value,
                    &fields.label,
                    &settings.creatable_prefix,
                    &text,
                ))
            }),
        };
        let Some(pick) = pick else {
            tracing::debug!("nothing selectable");
            return None;
        };

        let _batch = BatchScope::new();
        let id = self.options.update(|set| {
            if !settings.multiple {
                set.retain_selected(|_, _| false);
            }
            let id = match pick {
                Pick::Existing(id) => id,
                Pick::Create(record) => set.push(record),
            };
            set.select(id);
            id
        });
        self.query.set(String::new());
        tracing::debug!(id = id.index(), "selected");
        Some(id)
    }

    /// Deselect `id`. Returns false if it was not selected.
    pub fn deselect_option(&self, id: OptionId) -> bool {
        let selected = self.options.with(|set| set.get(id).is_some_and(OptionRecord::is_selected));
        if selected {
            self.options.update(|set| set.deselect(id));
        }
        selected
    }

    /// Deselect everything except members of disabled groups, and drop
    /// created options that are no longer selected.
    pub fn clear_selection(&self) {
        let _batch = BatchScope::new();
        self.options.update(|set| {
            let locked: Vec<OptionId> = set
                .selected_ids()
                .iter()
                .copied()
                .filter(|id| in_disabled_group(set, *id))
                .collect();
            set.retain_selected(|id, _| locked.contains(&id));
            set.retain_options(|r| !r.is_created() || r.is_selected());
        });
    }

    /// Clear the selection, then select every option whose value loosely
    /// equals one of `values`. Objects are looked up by their value field.
    pub fn select_by_values(&self, values: &[Value]) -> Vec<OptionId> {
        let value_field = self.fields.with(|f| f.value.clone());
        let wanted: Vec<Value> = values
            .iter()
            .map(|v| match v {
                Value::Object(map) => map.get(&value_field).cloned().unwrap_or(Value::Null),
                other => other.clone(),
            })
            .collect();

        let _batch = BatchScope::new();
        self.clear_selection();
        let ids: Vec<OptionId> = self
            .options
            .with(|set| wanted.iter().filter_map(|v| set.find_by_value(&value_field, v)).collect());
        ids.into_iter().filter_map(|id| self.select_option(id)).collect()
    }

    /// Replace the option list. The selection is re-seeded from the new
    /// list's `isSelected` flags and reconciled with the settings.
    pub fn update_opts(&self, options: OptionSet) {
        let _span = tracing::debug_span!("update_opts", options = options.len()).entered();
        let mut options = options;
        self.settings.with(|s| reconcile(&mut options, s));
        self.options.set(options);
    }

    // ── Query ───────────────────────────────────────────────────────

    /// Set the live query.
    pub fn set_query(&self, query: impl Into<String>) {
        self.query.set(query.into());
    }

    #[must_use]
    pub fn query(&self) -> String {
        self.query.get()
    }

    /// Create and select an option from the query (creatable mode).
    pub fn commit_query(&self) -> Option<OptionId> {
        let query = self.query.get();
        if query.is_empty() {
            return None;
        }
        self.select_option(SelectTarget::Text(query))
    }

    /// Handle a typed character. In creatable mode a delimiter commits the
    /// query and is consumed (returns true) instead of being typed.
    pub fn handle_delimiter(&self, key: char) -> bool {
        let consumed = self.settings.with(|s| s.creatable && s.delimiter.contains(key));
        if consumed {
            self.commit_query();
        }
        consumed
    }

    /// Create one option per delimiter- or newline-separated piece of
    /// `text` (creatable mode). Blank pieces are skipped.
    pub fn paste(&self, text: &str) -> Vec<OptionId> {
        let (creatable, delimiter) = self.settings.with(|s| (s.creatable, s.delimiter.clone()));
        if !creatable {
            return Vec::new();
        }
        text.split(|c: char| c == '\n' || delimiter.contains(c))
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .filter_map(|piece| self.select_option(SelectTarget::Text(piece.to_owned())))
            .collect()
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> StoreSettings {
        self.settings.get()
    }

    /// Replace the settings; the selection is trimmed to fit.
    pub fn set_settings(&self, settings: StoreSettings) {
        self.settings.set(settings);
    }

    /// Field names currently in effect.
    #[must_use]
    pub fn fields(&self) -> ResolvedFields {
        self.fields.get()
    }

    // ── Derived state ───────────────────────────────────────────────

    /// Rows to show in the dropdown.
    #[must_use]
    pub fn matching_options(&self) -> Vec<FlatEntry> {
        self.matching.get()
    }

    /// Navigable index over [`matching_options`](Self::matching_options).
    #[must_use]
    pub fn list_index_map(&self) -> NavIndex {
        self.index.get()
    }

    /// Row to focus after `key`.
    #[must_use]
    pub fn navigate(&self, current: Option<usize>, key: NavKey) -> Option<usize> {
        self.index.with(|index| index.navigate(current, key))
    }

    /// Option at dropdown row `row`, if that row is navigable.
    #[must_use]
    pub fn option_at(&self, row: usize) -> Option<OptionId> {
        self.index.with(|index| index.id_at(row))
    }

    /// Number of focusable rows, counting the "create" row shown for a
    /// non-empty query in creatable mode.
    #[must_use]
    pub fn current_list_length(&self) -> usize {
        let rows = self.index.with(NavIndex::navigable_count);
        let create_row = self.settings.with(|s| s.creatable && !self.is_max_reached())
            && self.query.with(|q| !q.is_empty());
        rows + usize::from(create_row)
    }

    /// Message to show instead of (or above) the list, if any.
    #[must_use]
    pub fn list_message(&self) -> Option<String> {
        self.message.get()
    }

    #[must_use]
    pub fn is_max_reached(&self) -> bool {
        let selected = self.options.with(|set| set.selected_ids().len());
        self.settings.with(|s| s.is_max_reached(selected))
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<OptionId> {
        self.options.with(|set| set.selected_ids().to_vec())
    }

    /// Selected records as JSON, flags included.
    #[must_use]
    pub fn selected_options(&self) -> Vec<Value> {
        self.options.with(|set| {
            set.selected_ids()
                .iter()
                .filter_map(|id| set.get(*id))
                .map(OptionRecord::to_value)
                .collect()
        })
    }

    /// Value field of each selected record (`null` when missing).
    #[must_use]
    pub fn selected_values(&self) -> Vec<Value> {
        let value_field = self.fields.with(|f| f.value.clone());
        self.options.with(|set| {
            set.selected_ids()
                .iter()
                .filter_map(|id| set.get(*id))
                .map(|r| r.get(&value_field).cloned().unwrap_or(Value::Null))
                .collect()
        })
    }

    /// Borrow the option set.
    pub fn with_options<R>(&self, f: impl FnOnce(&OptionSet) -> R) -> R {
        self.options.with(f)
    }

    /// Run `callback` with the selected ids after every option change.
    pub fn subscribe_selection(&self, callback: impl Fn(&[OptionId]) + 'static) -> Subscription {
        self.options.subscribe(move |set| callback(set.selected_ids()))
    }

    /// Render option `id` with `formatter` and highlight the query in it.
    pub fn render_item(
        &self,
        id: OptionId,
        formatter: impl Fn(&OptionRecord, bool) -> String,
    ) -> Option<String> {
        let query = self.query.get();
        self.options.with(|set| set.get(id).map(|r| highlight_item(r, &query, formatter)))
    }

    /// Render option `id` as its escaped label with the query highlighted.
    #[must_use]
    pub fn render_label(&self, id: OptionId) -> Option<String> {
        let label = self.fields.with(|f| f.label.clone());
        self.render_item(id, label_formatter(&label))
    }

    // ── Remote ──────────────────────────────────────────────────────

    #[must_use]
    pub fn remote_state(&self) -> RemoteState {
        self.remote.get()
    }

    pub(crate) fn set_remote_state(&self, state: RemoteState) {
        self.remote.set(state);
    }

    /// Install remote results. Selected options missing from the results
    /// are kept. On failure the list is emptied and the "fetch empty"
    /// message is shown.
    pub fn apply_fetch(&self, result: Result<Vec<Value>, FetchError>) {
        let _span = tracing::debug_span!("apply_fetch", ok = result.is_ok()).entered();
        let (records, state) = match result {
            Ok(records) => (records, RemoteState::Loaded),
            Err(err) => {
                tracing::warn!(error = %err, "remote options unavailable; list cleared");
                (Vec::new(), RemoteState::Failed)
            }
        };
        let value_field = self.fields.with(|f| f.value.clone());
        let mut next = OptionSet::from_values(records);
        self.options.with(|old| {
            for record in old.selected_ids().iter().filter_map(|id| old.get(*id)) {
                let found = record
                    .get(&value_field)
                    .and_then(|v| next.find_by_value(&value_field, v));
                match found {
                    Some(id) => {
                        next.select(id);
                    }
                    None => {
                        if let Value::Object(map) = record.to_value() {
                            next.push(OptionRecord::from_map(map));
                        }
                    }
                }
            }
        });
        tracing::debug!(options = next.len(), "remote options applied");

        let _batch = BatchScope::new();
        self.remote.set(state);
        self.update_opts(next);
    }
}

fn matching_entries(
    set: &OptionSet,
    flat: &FlatList,
    query: &str,
    settings: &StoreSettings,
    fields: &ResolvedFields,
    remote_active: bool,
) -> Vec<FlatEntry> {
    let _span = tracing::debug_span!(
        "matching_options",
        query_len = query.len(),
        candidates = set.len()
    )
    .entered();
    if settings.is_max_reached(set.selected_ids().len()) {
        return Vec::new();
    }
    let options = fields.search_options();
    if query.trim().is_empty() || (remote_active && !settings.sort_remote) {
        return filter_list(set, flat, "", settings.multiple, &options);
    }
    filter_list(set, flat, query, true, &options)
}

fn in_disabled_group(set: &OptionSet, id: OptionId) -> bool {
    set.get(id)
        .and_then(OptionRecord::group)
        .and_then(|g| set.group(g))
        .is_some_and(|g| g.is_disabled())
}

/// Whether the selection breaks the selection limits of `settings`.
fn overflows(set: &OptionSet, settings: &StoreSettings) -> bool {
    let selected = set.selected_ids().len();
    (!settings.multiple && selected > 1) || (settings.multiple && settings.max > 0 && selected > settings.max)
}

/// Trim the selection to fit `settings`: single-select with several
/// selected clears all; an overfull multiple selection keeps the first
/// `max` in option order.
fn reconcile(set: &mut OptionSet, settings: &StoreSettings) {
    if !overflows(set, settings) {
        return;
    }
    let selected = set.selected_ids().len();
    if !settings.multiple {
        tracing::debug!(selected, "single select with several selected; clearing");
        set.retain_selected(|_, _| false);
        return;
    }
    let keep: AHashSet<OptionId> = set
        .ids()
        .filter(|id| set.get(*id).is_some_and(OptionRecord::is_selected))
        .take(settings.max)
        .collect();
    tracing::debug!(selected, max = settings.max, "selection above max; trimming");
    set.retain_selected(|id, _| keep.contains(&id));
}
