#![forbid(unsafe_code)]

//! Property tests for flattening, filtering, navigation and highlighting.

use combo_search::SearchOptions;
use combo_text::fold;
use combo_widgets::{NavIndex, OptionSet, filter_list, flatten, highlight_match};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Option lists mixing plain options and groups, some disabled.
fn option_list() -> impl Strategy<Value = Value> {
    let option = ("[a-z]{1,6}", any::<bool>())
        .prop_map(|(text, disabled)| json!({"text": text, "isDisabled": disabled && text.len() % 3 == 0}));
    let entry = prop_oneof![
        3 => option.clone(),
        1 => ("[A-Z][a-z]{2,5}", proptest::collection::vec(option, 0..4), any::<bool>())
            .prop_map(|(label, options, disabled)| json!({"label": label, "options": options, "isDisabled": disabled})),
    ];
    proptest::collection::vec(entry, 0..12).prop_map(Value::Array)
}

proptest! {
    #[test]
    fn empty_query_filter_is_identity(list in option_list()) {
        let set = OptionSet::from_json(&list);
        let flat = flatten(&set);
        let filtered = filter_list(&set, &flat, "", false, &SearchOptions::default());
        prop_assert_eq!(filtered, flat.entries);
    }

    #[test]
    fn headers_always_precede_members(list in option_list(), query in "[a-z]{0,2}") {
        let set = OptionSet::from_json(&list);
        let flat = flatten(&set);
        let filtered = filter_list(&set, &flat, &query, false, &SearchOptions::default().with_fields(["text"]));
        for (pos, entry) in filtered.iter().enumerate() {
            if entry.is_header() {
                prop_assert!(filtered.get(pos + 1).is_some_and(|next| !next.is_header()));
            }
        }
    }

    #[test]
    fn navigation_cycles_through_every_navigable_row(list in option_list()) {
        let set = OptionSet::from_json(&list);
        let flat = flatten(&set);
        let index = NavIndex::build(&set, &flat.entries);
        let count = index.navigable_count();
        let Some(first) = index.first() else {
            prop_assert_eq!(count, 0);
            prop_assert_eq!(index.last(), None);
            return Ok(());
        };

        let mut pos = first;
        let mut visited = vec![first];
        for _ in 1..count {
            pos = index.next(pos).unwrap();
            prop_assert!(index.id_at(pos).is_some());
            visited.push(pos);
        }
        prop_assert_eq!(index.next(pos), Some(first));
        prop_assert!(visited.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(index.prev(first), index.last());
    }

    #[test]
    fn highlighting_preserves_text(text in "[a-zA-Zéü ]{0,16}", query in "[a-zéü]{1,3}") {
        let out = highlight_match(&text, &query);
        let stripped = out.replace("<span class=\"highlight\">", "").replace("</span>", "");
        prop_assert_eq!(&stripped, &text);
        let expect_match = fold(&text).to_lowercase().contains(&fold(&query).to_lowercase());
        prop_assert_eq!(out.contains("<span"), expect_match);
    }
}
