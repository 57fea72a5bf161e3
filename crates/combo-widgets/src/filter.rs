#![forbid(unsafe_code)]

//! Query filtering over a flattened list.
//!
//! # Invariants
//!
//! 1. With an empty query and nothing excluded, the output equals the
//!    input entries.
//! 2. Every surviving group member is preceded by its group header, and
//!    each header appears at most once.
//! 3. A header never appears without at least one member after it.
//! 4. Grouped results keep flattened order; only ungrouped results are
//!    ranked.

use ahash::AHashSet;
use combo_search::{Conjunction, SearchOptions, search};

use crate::flatten::{FlatEntry, FlatList};
use crate::record::{OptionRecord, OptionSet};

/// Filter `flat` by `query`.
///
/// The search runs over item rows only, with `and` conjunction and the
/// fields and sort of `options`. When the list has groups, sorting is
/// turned off and each surviving member brings back its header.
#[must_use]
pub fn filter_list(
    set: &OptionSet,
    flat: &FlatList,
    query: &str,
    exclude_selected: bool,
    options: &SearchOptions,
) -> Vec<FlatEntry> {
    let _span = tracing::debug_span!(
        "filter_list",
        query_len = query.len(),
        entries = flat.entries.len(),
        grouped = flat.has_groups,
        exclude_selected
    )
    .entered();

    let is_excluded = |entry: &FlatEntry| {
        exclude_selected
            && entry
                .id()
                .and_then(|id| set.get(id))
                .is_some_and(OptionRecord::is_selected)
    };

    if query.trim().is_empty() {
        let kept: Vec<FlatEntry> = flat.entries.iter().filter(|e| !is_excluded(e)).cloned().collect();
        return drop_orphan_headers(kept);
    }

    let mut positions = Vec::with_capacity(flat.entries.len());
    let mut records = Vec::with_capacity(flat.entries.len());
    for (pos, entry) in flat.entries.iter().enumerate() {
        if let Some(record) = entry.id().and_then(|id| set.get(id)) {
            positions.push(pos);
            records.push(record);
        }
    }

    let opts = options
        .clone()
        .with_conjunction(Conjunction::And)
        .preserve_order(options.preserve_order || flat.has_groups);
    let result = search(&records, query, &opts);

    let mut out = Vec::with_capacity(result.items.len());
    let mut headers = AHashSet::new();
    for item in &result.items {
        let pos = positions[item.id];
        let entry = &flat.entries[pos];
        if is_excluded(entry) {
            continue;
        }
        if let FlatEntry::Item { group: Some(group), .. } = entry {
            if headers.insert(*group) {
                if let Some(header) = flat.entries[..pos].iter().rev().find(|e| e.is_header()) {
                    out.push(header.clone());
                }
            }
        }
        out.push(entry.clone());
    }
    tracing::debug!(matched = result.total, kept = out.len(), "filtered");
    out
}

/// Remove headers that are not followed by an item.
fn drop_orphan_headers(entries: Vec<FlatEntry>) -> Vec<FlatEntry> {
    let mut out = Vec::with_capacity(entries.len());
    let mut iter = entries.into_iter().peekable();
    while let Some(entry) = iter.next() {
        if entry.is_header() && iter.peek().is_none_or(FlatEntry::is_header) {
            continue;
        }
        out.push(entry);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::flatten;
    use crate::record::OptionId;
    use combo_search::SortSpec;
    use serde_json::json;

    fn opts() -> SearchOptions {
        SearchOptions::new().with_field("text").with_sort([SortSpec::asc("text")])
    }

    fn shape(set: &OptionSet, entries: &[FlatEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| match e {
                FlatEntry::GroupHeader { label, .. } => format!("#{label}"),
                FlatEntry::Item { id, .. } => set.get(*id).map(|r| r.text("text")).unwrap_or_default(),
            })
            .collect()
    }

    fn grouped() -> OptionSet {
        OptionSet::from_json(&json!([
            {"label": "Fruit", "options": [
                {"id": 1, "text": "Apple"},
                {"id": 2, "text": "Banana", "isSelected": true},
            ]},
            {"label": "Veg", "options": [
                {"id": 3, "text": "Carrot", "isSelected": true},
            ]},
            {"label": "Nuts", "options": [
                {"id": 4, "text": "Almond"},
                {"id": 5, "text": "Pecan"},
            ]},
        ]))
    }

    // ── Empty query ─────────────────────────────────────────────────

    #[test]
    fn empty_query_is_identity() {
        let set = grouped();
        let flat = flatten(&set);
        assert_eq!(filter_list(&set, &flat, "", false, &opts()), flat.entries);
    }

    #[test]
    fn empty_query_excluding_selected_drops_empty_groups() {
        let set = grouped();
        let flat = flatten(&set);
        let out = filter_list(&set, &flat, "  ", true, &opts());
        assert_eq!(shape(&set, &out), vec!["#Fruit", "Apple", "#Nuts", "Almond", "Pecan"]);
    }

    // ── Grouped search ──────────────────────────────────────────────

    #[test]
    fn grouped_results_keep_order_and_headers() {
        let set = grouped();
        let flat = flatten(&set);
        let out = filter_list(&set, &flat, "a", false, &opts());
        assert_eq!(
            shape(&set, &out),
            vec!["#Fruit", "Apple", "Banana", "#Veg", "Carrot", "#Nuts", "Almond", "Pecan"]
        );
    }

    #[test]
    fn grouped_results_drop_headers_of_unmatched_groups() {
        let set = grouped();
        let flat = flatten(&set);
        let out = filter_list(&set, &flat, "an", true, &opts());
        assert_eq!(shape(&set, &out), vec!["#Nuts", "Pecan"]);
    }

    #[test]
    fn and_conjunction_is_forced() {
        let set = grouped();
        let flat = flatten(&set);
        let out = filter_list(&set, &flat, "apple zzz", false, &opts());
        assert!(out.is_empty());
    }

    // ── Flat search ─────────────────────────────────────────────────

    #[test]
    fn flat_results_are_ranked() {
        let set = OptionSet::from_json(&json!([
            {"id": 1, "text": "Pineapple"},
            {"id": 2, "text": "Apple"},
            {"id": 3, "text": "Kiwi"},
        ]));
        let flat = flatten(&set);
        let out = filter_list(&set, &flat, "apple", false, &opts());
        assert_eq!(shape(&set, &out), vec!["Apple", "Pineapple"]);
        assert_eq!(out[0].id(), Some(OptionId(1)));
    }

    #[test]
    fn orphan_headers_collapse() {
        let entries = vec![
            FlatEntry::GroupHeader { group: crate::record::GroupId(0), label: "A".into() },
            FlatEntry::GroupHeader { group: crate::record::GroupId(1), label: "B".into() },
            FlatEntry::Item { id: OptionId(0), group: Some(crate::record::GroupId(1)) },
            FlatEntry::GroupHeader { group: crate::record::GroupId(2), label: "C".into() },
        ];
        let out = drop_orphan_headers(entries);
        assert_eq!(out.len(), 2);
        assert!(matches!(&out[0], FlatEntry::GroupHeader { label, .. } if label == "B"));
    }
}
