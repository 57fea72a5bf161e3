#![forbid(unsafe_code)]

//! Option records and the option arena.
//!
//! An [`OptionSet`] owns every record exactly once. Records are addressed
//! by [`OptionId`] (their arena slot); flattened lists, filtered lists,
//! index maps and the selection all hold ids, never copies, so toggling a
//! record's selection is visible in every view at once.
//!
//! Input is a JSON array. An object with an `options` array is a group
//! (one level only); any other object is an option record. The reserved
//! keys `isSelected`, `isDisabled` and `_created` become flags and are
//! removed from the record's searchable fields.
//!
//! # Invariants
//!
//! 1. `record.is_selected()` ⇔ its id is in `selected_ids()`.
//! 2. `selected_ids()` keeps selection order and has no duplicates.
//! 3. Layout order is input order; group members keep their input order.

use serde_json::{Map, Value};

use combo_search::{FieldValue, Searchable};

/// Reserved key: selection flag.
pub const KEY_SELECTED: &str = "isSelected";
/// Reserved key: disabled flag.
pub const KEY_DISABLED: &str = "isDisabled";
/// Reserved key: marks records synthesized from typed text.
pub const KEY_CREATED: &str = "_created";
/// Key holding a group's members.
pub const KEY_OPTIONS: &str = "options";
/// Key holding a group's label.
pub const KEY_LABEL: &str = "label";

/// Arena slot of an option record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptionId(pub(crate) usize);

impl OptionId {
    /// The arena index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an option group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub(crate) usize);

/// One selectable option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionRecord {
    fields: Map<String, Value>,
    selected: bool,
    disabled: bool,
    created: bool,
    group: Option<GroupId>,
}

impl OptionRecord {
    /// Build a record from its fields, lifting the reserved flags out.
    #[must_use]
    pub fn from_map(mut fields: Map<String, Value>) -> Self {
        let selected = take_flag(&mut fields, KEY_SELECTED);
        let disabled = take_flag(&mut fields, KEY_DISABLED);
        let created = take_flag(&mut fields, KEY_CREATED);
        Self {
            fields,
            selected,
            disabled,
            created,
            group: None,
        }
    }

    /// A record synthesized from typed text.
    #[must_use]
    pub fn created(value_field: &str, label_field: &str, prefix: &str, text: &str) -> Self {
        let mut fields = Map::new();
        // Value first, label second: field detection on a list that starts
        // with a created record picks them up in that order.
        fields.insert(value_field.to_owned(), Value::String(encode_uri_component(text)));
        fields.insert(label_field.to_owned(), Value::String(format!("{prefix}{text}")));
        Self {
            fields,
            selected: false,
            disabled: false,
            created: true,
            group: None,
        }
    }

    /// Searchable fields (reserved flags excluded).
    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Field `name`, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Field `name` as display text; `""` when missing or not a scalar.
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(combo_search::scalar)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Whether the record was synthesized from typed text.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// The group this record belongs to.
    #[must_use]
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    /// Set the disabled flag.
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// The record as JSON, flags included (`isSelected`, plus `isDisabled`
    /// and `_created` when set).
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert(KEY_SELECTED.to_owned(), Value::Bool(self.selected));
        if self.disabled {
            out.insert(KEY_DISABLED.to_owned(), Value::Bool(true));
        }
        if self.created {
            out.insert(KEY_CREATED.to_owned(), Value::Bool(true));
        }
        Value::Object(out)
    }
}

impl Searchable for OptionRecord {
    fn resolve(&self, name: &str, nesting: bool) -> Option<FieldValue<'_>> {
        self.fields.resolve(name, nesting)
    }
}

fn take_flag(fields: &mut Map<String, Value>, key: &str) -> bool {
    fields.shift_remove(key).is_some_and(|v| truthy(&v))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A non-selectable group of options.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionGroup {
    label: String,
    disabled: bool,
    members: Vec<OptionId>,
}

impl OptionGroup {
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Disabled groups make all their members non-navigable.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Member ids in input order.
    #[must_use]
    pub fn members(&self) -> &[OptionId] {
        &self.members
    }
}

/// One top-level entry of the input list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutEntry {
    /// A plain option.
    Option(OptionId),
    /// A group of options.
    Group(GroupId),
}

/// The canonical option list: record arena, groups, layout and selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    records: Vec<OptionRecord>,
    groups: Vec<OptionGroup>,
    layout: Vec<LayoutEntry>,
    selection: Vec<OptionId>,
}

impl OptionSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON array (any other value yields an empty set).
    ///
    /// ```
    /// use combo_widgets::OptionSet;
    /// use serde_json::json;
    ///
    /// let set = OptionSet::from_json(&json!([
    ///     {"label": "Fruit", "options": [{"id": 1, "text": "Apple", "isSelected": true}]},
    ///     {"id": 2, "text": "Bread"},
    /// ]));
    /// assert_eq!(set.len(), 2);
    /// assert!(set.has_groups());
    /// assert_eq!(set.selected_ids().len(), 1);
    /// ```
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::from_values(items.iter().cloned()),
            _ => Self::new(),
        }
    }

    /// Build from option and group objects.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut set = Self::new();
        for value in values {
            let Value::Object(mut map) = value else {
                tracing::warn!("skipping non-object option entry");
                continue;
            };
            // Only a non-empty `options` array makes a group; anything else
            // stays a field of a plain option.
            let members = match map.get(KEY_OPTIONS) {
                Some(Value::Array(members)) if !members.is_empty() => map.shift_remove(KEY_OPTIONS),
                _ => None,
            };
            match members {
                Some(Value::Array(members)) => {
                    let label = map.get(KEY_LABEL).and_then(combo_search::scalar).map(|v| v.to_string());
                    let disabled = map.get(KEY_DISABLED).is_some_and(truthy);
                    set.push_group(label.unwrap_or_default(), disabled, members);
                }
                _ => {
                    set.push(OptionRecord::from_map(map));
                }
            }
        }
        set
    }

    fn push_group(&mut self, label: String, disabled: bool, members: Vec<Value>) {
        let gid = GroupId(self.groups.len());
        let mut ids = Vec::with_capacity(members.len());
        for member in members {
            let Value::Object(map) = member else {
                tracing::warn!(group = %label, "skipping non-object group member");
                continue;
            };
            let mut record = OptionRecord::from_map(map);
            record.group = Some(gid);
            ids.push(self.insert(record));
        }
        self.groups.push(OptionGroup {
            label,
            disabled,
            members: ids,
        });
        self.layout.push(LayoutEntry::Group(gid));
    }

    fn insert(&mut self, record: OptionRecord) -> OptionId {
        let id = OptionId(self.records.len());
        let selected = record.selected;
        self.records.push(record);
        if selected {
            self.selection.push(id);
        }
        id
    }

    /// Append a top-level option.
    pub fn push(&mut self, record: OptionRecord) -> OptionId {
        let id = self.insert(record);
        self.layout.push(LayoutEntry::Option(id));
        id
    }

    /// Number of option records (groups not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: OptionId) -> Option<&OptionRecord> {
        self.records.get(id.0)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: OptionId) -> Option<&mut OptionRecord> {
        self.records.get_mut(id.0)
    }

    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&OptionGroup> {
        self.groups.get(id.0)
    }

    /// Top-level entries in input order.
    #[must_use]
    pub fn layout(&self) -> &[LayoutEntry] {
        &self.layout
    }

    /// Whether any group has at least one member.
    #[must_use]
    pub fn has_groups(&self) -> bool {
        self.groups.iter().any(|g| !g.members.is_empty())
    }

    /// Record ids in layout order (group members inline).
    pub fn ids(&self) -> impl Iterator<Item = OptionId> + '_ {
        self.layout.iter().flat_map(move |entry| match entry {
            LayoutEntry::Option(id) => std::slice::from_ref(id).iter().copied(),
            LayoutEntry::Group(gid) => self.groups[gid.0].members.iter().copied(),
        })
    }

    /// The first record in layout order; used for field detection.
    #[must_use]
    pub fn first_record(&self) -> Option<&OptionRecord> {
        self.ids().next().and_then(|id| self.get(id))
    }

    /// Whether a record can be picked: it exists and neither it nor its
    /// group is disabled.
    #[must_use]
    pub fn is_selectable(&self, id: OptionId) -> bool {
        self.get(id).is_some_and(|r| {
            !r.disabled && !r.group.and_then(|g| self.group(g)).is_some_and(OptionGroup::is_disabled)
        })
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn selected_ids(&self) -> &[OptionId] {
        &self.selection
    }

    /// Mark `id` selected. Returns false if it was already selected or
    /// does not exist.
    pub fn select(&mut self, id: OptionId) -> bool {
        match self.records.get_mut(id.0) {
            Some(record) if !record.selected => {
                record.selected = true;
                self.selection.push(id);
                true
            }
            _ => false,
        }
    }

    /// Clear the selection flag of `id`. Returns false if it was not selected.
    pub fn deselect(&mut self, id: OptionId) -> bool {
        match self.records.get_mut(id.0) {
            Some(record) if record.selected => {
                record.selected = false;
                self.selection.retain(|s| *s != id);
                true
            }
            _ => false,
        }
    }

    /// Deselect every record for which `keep` returns false.
    pub fn retain_selected(&mut self, mut keep: impl FnMut(OptionId, &OptionRecord) -> bool) {
        let records = &mut self.records;
        self.selection.retain(|id| {
            let Some(record) = records.get_mut(id.0) else {
                return false;
            };
            if keep(*id, record) {
                true
            } else {
                record.selected = false;
                false
            }
        });
    }

    /// Remove top-level records for which `keep` returns false. Group
    /// members are always kept. Ids are renumbered; selection order is
    /// preserved.
    pub fn retain_options(&mut self, mut keep: impl FnMut(&OptionRecord) -> bool) {
        let old = std::mem::take(self);
        let mut slots: Vec<Option<OptionRecord>> = old.records.into_iter().map(Some).collect();
        let mut remap: Vec<Option<OptionId>> = vec![None; slots.len()];
        for entry in &old.layout {
            match *entry {
                LayoutEntry::Option(id) => {
                    let Some(record) = slots[id.0].take().filter(|r| keep(r)) else {
                        continue;
                    };
                    let new_id = OptionId(self.records.len());
                    self.records.push(record);
                    self.layout.push(LayoutEntry::Option(new_id));
                    remap[id.0] = Some(new_id);
                }
                LayoutEntry::Group(gid) => {
                    let group = &old.groups[gid.0];
                    let new_gid = GroupId(self.groups.len());
                    let mut members = Vec::with_capacity(group.members.len());
                    for member in &group.members {
                        let Some(mut record) = slots[member.0].take() else {
                            continue;
                        };
                        record.group = Some(new_gid);
                        let new_id = OptionId(self.records.len());
                        self.records.push(record);
                        members.push(new_id);
                        remap[member.0] = Some(new_id);
                    }
                    self.groups.push(OptionGroup {
                        label: group.label.clone(),
                        disabled: group.disabled,
                        members,
                    });
                    self.layout.push(LayoutEntry::Group(new_gid));
                }
            }
        }
        self.selection = old.selection.iter().filter_map(|id| remap[id.0]).collect();
    }

    /// First record (layout order) whose `field` loosely equals `value`.
    #[must_use]
    pub fn find_by_value(&self, field: &str, value: &Value) -> Option<OptionId> {
        self.ids()
            .find(|id| self.get(*id).and_then(|r| r.get(field)).is_some_and(|v| loose_eq(v, value)))
    }
}

/// Equality the way a dynamically typed `==` treats JSON scalars:
/// numbers and numeric strings compare by value, booleans act as `1`/`0`,
/// `null` equals only `null`.
///
/// ```
/// use combo_widgets::record::loose_eq;
/// use serde_json::json;
///
/// assert!(loose_eq(&json!(1), &json!("1")));
/// assert!(loose_eq(&json!(true), &json!(1)));
/// assert!(!loose_eq(&json!(null), &json!(0)));
/// ```
#[must_use]
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Bool(x), other) | (other, Value::Bool(x)) => {
            loose_eq(&Value::from(u8::from(*x)), other)
        }
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => match (to_number(a), to_number(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        _ => a == b,
    }
}

fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() { Some(0.0) } else { s.parse().ok() }
        }
        _ => None,
    }
}

/// RFC 2396 marks that `encodeURIComponent` keeps but `urlencoding` escapes.
const KEPT_MARKS: [(&str, &str); 5] = [("%21", "!"), ("%2A", "*"), ("%27", "'"), ("%28", "("), ("%29", ")")];

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
///
/// ```
/// use combo_widgets::record::encode_uri_component;
///
/// assert_eq!(encode_uri_component("a b/é"), "a%20b%2F%C3%A9");
/// assert_eq!(encode_uri_component("it's (ok)!"), "it's%20(ok)!");
/// ```
#[must_use]
pub fn encode_uri_component(text: &str) -> String {
    let encoded = urlencoding::encode(text);
    if !encoded.contains('%') {
        return encoded.into_owned();
    }
    // Every `%` in the output opens an escape, so these never overlap.
    KEPT_MARKS
        .iter()
        .fold(encoded.into_owned(), |out, (escaped, mark)| out.replace(escaped, mark))
}
