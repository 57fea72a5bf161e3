#![forbid(unsafe_code)]

//! Grouped option tree → flat list with header markers.

use crate::record::{GroupId, LayoutEntry, OptionId, OptionSet};

/// One row of a flattened list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatEntry {
    /// Synthetic marker placed before a group's members. Never selectable.
    GroupHeader { group: GroupId, label: String },
    /// An option; `group` is set for group members.
    Item { id: OptionId, group: Option<GroupId> },
}

impl FlatEntry {
    #[must_use]
    pub fn is_header(&self) -> bool {
        matches!(self, Self::GroupHeader { .. })
    }

    /// The option id, for item rows.
    #[must_use]
    pub fn id(&self) -> Option<OptionId> {
        match self {
            Self::Item { id, .. } => Some(*id),
            Self::GroupHeader { .. } => None,
        }
    }
}

/// A flattened option list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatList {
    pub entries: Vec<FlatEntry>,
    /// Whether at least one non-empty group was flattened.
    pub has_groups: bool,
}

/// Flatten `set` in one pass.
///
/// Each non-empty group contributes a header followed by its members. An
/// entry whose `options` array is empty was never a group and flattens as
/// a plain option. A group left without members (all of them removed or
/// malformed) contributes nothing.
///
/// ```
/// use combo_widgets::{FlatEntry, OptionSet, flatten};
/// use serde_json::json;
///
/// let set = OptionSet::from_json(&json!([
///     {"label": "Fruit", "options": [{"id": 1, "text": "Apple"}, {"id": 2, "text": "Banana"}]}
/// ]));
/// let flat = flatten(&set);
/// assert!(flat.has_groups);
/// assert!(flat.entries[0].is_header());
/// assert_eq!(flat.entries.len(), 3);
/// ```
#[must_use]
pub fn flatten(set: &OptionSet) -> FlatList {
    let mut out = FlatList {
        entries: Vec::with_capacity(set.len() + set.layout().len()),
        has_groups: false,
    };
    for entry in set.layout() {
        match *entry {
            LayoutEntry::Option(id) => out.entries.push(FlatEntry::Item { id, group: None }),
            LayoutEntry::Group(gid) => {
                let Some(group) = set.group(gid).filter(|g| !g.members().is_empty()) else {
                    continue;
                };
                out.has_groups = true;
                out.entries.push(FlatEntry::GroupHeader {
                    group: gid,
                    label: group.label().to_owned(),
                });
                out.entries.extend(group.members().iter().map(|&id| FlatEntry::Item {
                    id,
                    group: Some(gid),
                }));
            }
        }
    }
    out
}
