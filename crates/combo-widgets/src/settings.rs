#![forbid(unsafe_code)]

//! Selection store settings.
//!
//! [`StoreSettings`] deserializes from camelCase JSON (or TOML with the
//! `toml-config` feature). Every key is optional. Field names left unset
//! are detected from the first option by [`ResolvedFields::resolve`].
//!
//! # Example
//!
//! ```
//! use combo_widgets::StoreSettings;
//!
//! let settings = StoreSettings::from_json_str(
//!     r#"{"multiple": true, "max": 3, "searchField": "name", "messages": {"empty": "Nothing"}}"#,
//! ).unwrap();
//! assert!(settings.multiple);
//! assert_eq!(settings.creatable_prefix, "*");
//! assert_eq!(settings.messages.empty, "Nothing");
//! assert_eq!(settings.messages.nomatch, "No matching options");
//! ```
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Malformed input | `ConfigError::Json` / `ConfigError::Toml` |
//! | Empty delimiter | `ConfigError::Invalid` |
//! | `max > 1` without `multiple` | Clamped to 1 with a warning |

use std::fmt;

use combo_search::{SearchOptions, SortSpec};
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::record::OptionSet;

/// Settings that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// JSON did not parse into settings.
    Json(String),
    /// TOML did not parse into settings.
    #[cfg(feature = "toml-config")]
    Toml(String),
    /// Parsed, but a value is unusable.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid settings JSON: {msg}"),
            #[cfg(feature = "toml-config")]
            Self::Toml(msg) => write!(f, "invalid settings TOML: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One field name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldList {
    One(String),
    Many(Vec<String>),
}

impl FieldList {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name.clone()],
            Self::Many(names) => names.clone(),
        }
    }
}

/// A sort field name (ascending) or full sort specs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SortField {
    Name(String),
    Specs(Vec<SortSpec>),
}

impl SortField {
    #[must_use]
    pub fn to_specs(&self) -> Vec<SortSpec> {
        match self {
            Self::Name(name) => vec![SortSpec::asc(name.clone())],
            Self::Specs(specs) => specs.clone(),
        }
    }
}

/// When a remote URL is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteFetchMode {
    /// Per query when the URL has a `[query]` placeholder, once otherwise.
    #[default]
    Auto,
    /// Always fetch once, ignoring the query.
    Init,
}

/// Dropdown messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Messages {
    pub empty: String,
    pub nomatch: String,
    /// `{max}` is replaced by the configured maximum.
    pub max: String,
    pub fetch_before: String,
    pub fetch_empty: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            empty: "No options".into(),
            nomatch: "No matching options".into(),
            max: "Maximum items {max} selected".into(),
            fetch_before: "Type to search".into(),
            fetch_empty: "No data related to your search".into(),
        }
    }
}

impl Messages {
    /// The max-reached message for `max`.
    #[must_use]
    pub fn max_message(&self, max: usize) -> String {
        self.max.replace("{max}", &max.to_string())
    }
}

/// Selection store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Field holding the option value; detected when unset.
    pub value_field: Option<String>,
    /// Field holding the option label; detected when unset.
    pub label_field: Option<String>,
    /// Maximum selected items in multiple mode; `0` is unlimited.
    pub max: usize,
    pub multiple: bool,
    /// Allow committing typed text as a new option.
    pub creatable: bool,
    /// Prepended to the label of created options.
    pub creatable_prefix: String,
    /// Searched fields; every field of the first option when unset.
    pub search_field: Option<FieldList>,
    /// Sort order for ungrouped lists; label ascending when unset.
    pub sort_field: Option<SortField>,
    /// Filter and rank remote results locally.
    #[serde(alias = "sortRemoteResults")]
    pub sort_remote: bool,
    /// Characters that commit typed text in creatable mode.
    pub delimiter: String,
    /// Remote URL; `[query]` is replaced by the encoded query.
    pub fetch: Option<String>,
    pub fetch_mode: RemoteFetchMode,
    pub fetch_debounce_ms: u64,
    pub messages: Messages,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            value_field: None,
            label_field: None,
            max: 0,
            multiple: false,
            creatable: false,
            creatable_prefix: "*".into(),
            search_field: None,
            sort_field: None,
            sort_remote: true,
            delimiter: ",".into(),
            fetch: None,
            fetch_mode: RemoteFetchMode::Auto,
            fetch_debounce_ms: 500,
            messages: Messages::default(),
        }
    }
}

impl StoreSettings {
    /// Parse and validate JSON settings.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str::<Self>(input)
            .map_err(|err| ConfigError::Json(err.to_string()))?
            .validated()
    }

    /// Parse and validate TOML settings.
    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(input)
            .map_err(|err| ConfigError::Toml(err.to_string()))?
            .validated()
    }

    /// Check values and clamp the ones that can be repaired.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.delimiter.is_empty() {
            return Err(ConfigError::Invalid("delimiter must not be empty".into()));
        }
        if !self.multiple && self.max > 1 {
            tracing::warn!(max = self.max, "max above 1 has no effect without multiple; clamped");
            self.max = 1;
        }
        Ok(self)
    }

    /// Remote fetch debounce.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.fetch_debounce_ms)
    }

    /// Whether `selected` items fill the selection. Only multiple mode has
    /// a limit; single mode always replaces.
    #[must_use]
    pub fn is_max_reached(&self, selected: usize) -> bool {
        self.multiple && self.max > 0 && selected >= self.max
    }
}

const VALUE_GUESSES: [&str; 3] = ["id", "value", "ID"];
const LABEL_GUESSES: [&str; 3] = ["name", "title", "label"];
const NOT_SEARCHED: [&str; 5] = ["value", "isSelected", "isDisabled", "selected", "disabled"];

/// Field names in effect for an option set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    pub value: String,
    pub label: String,
    pub search: Vec<String>,
    /// Empty for grouped lists.
    pub sort: Vec<SortSpec>,
}

impl ResolvedFields {
    /// Apply `settings` to `set`, detecting unset names from the first
    /// option.
    ///
    /// ```
    /// use combo_widgets::{OptionSet, ResolvedFields, StoreSettings};
    /// use serde_json::json;
    ///
    /// let set = OptionSet::from_json(&json!([{"code": "cz", "name": "Czechia", "pop": 10}]));
    /// let fields = ResolvedFields::resolve(&StoreSettings::default(), &set);
    /// assert_eq!(fields.value, "code");
    /// assert_eq!(fields.label, "name");
    /// assert_eq!(fields.search, vec!["code", "name", "pop"]);
    /// ```
    #[must_use]
    pub fn resolve(settings: &StoreSettings, set: &OptionSet) -> Self {
        let first = set.first_record();
        let keys: Vec<&str> = first
            .map(|r| r.fields().keys().map(String::as_str).collect())
            .unwrap_or_default();

        let value = settings
            .value_field
            .clone()
            .unwrap_or_else(|| guess(&keys, &VALUE_GUESSES, 0, "value"));
        let label = settings
            .label_field
            .clone()
            .unwrap_or_else(|| guess(&keys, &LABEL_GUESSES, 1, "text"));

        let search = match &settings.search_field {
            Some(list) => list.to_vec(),
            None if first.is_some() => keys
                .iter()
                .filter(|k| !NOT_SEARCHED.contains(*k))
                .map(|k| (*k).to_owned())
                .collect(),
            None => vec![label.clone()],
        };
        let sort = if set.has_groups() {
            Vec::new()
        } else {
            settings
                .sort_field
                .as_ref()
                .map_or_else(|| vec![SortSpec::asc(label.clone())], SortField::to_specs)
        };
        Self {
            value,
            label,
            search,
            sort,
        }
    }

    /// Search options for these fields.
    #[must_use]
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions::new()
            .with_fields(self.search.iter().cloned())
            .with_sort(self.sort.iter().cloned())
    }
}

/// First key of `keys` (in record order) among `guesses`, else the key at
/// `fallback_pos`, else `default`.
fn guess(keys: &[&str], guesses: &[&str], fallback_pos: usize, default: &str) -> String {
    keys.iter()
        .find(|k| guesses.contains(*k))
        .or_else(|| keys.get(fallback_pos))
        .map_or_else(|| default.to_owned(), |k| (*k).to_owned())
}
