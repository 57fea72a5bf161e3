#![no_main]

use arbitrary::Arbitrary;
use combo_widgets::{NavKey, SelectionStore, StoreSettings};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Debug, Arbitrary)]
enum Op {
    Query(String),
    Commit,
    Delimiter(char),
    Paste(String),
    SelectRow(u8),
    Deselect(u8),
    Clear,
    Navigate(Option<u8>, u8),
    SetMax(u8),
    SetMultiple(bool),
}

fuzz_target!(|input: (Vec<(String, bool)>, Vec<Op>)| {
    let (seed, ops) = input;
    let options: Vec<_> = seed
        .iter()
        .enumerate()
        .map(|(i, (text, disabled))| json!({"id": i, "text": text, "isDisabled": disabled}))
        .collect();
    let store = SelectionStore::from_json(
        &json!(options),
        StoreSettings {
            creatable: true,
            multiple: true,
            ..StoreSettings::default()
        },
    );

    for op in ops.into_iter().take(64) {
        match op {
            Op::Query(q) => store.set_query(q),
            Op::Commit => {
                store.commit_query();
            }
            Op::Delimiter(c) => {
                store.handle_delimiter(c);
            }
            Op::Paste(text) => {
                store.paste(&text);
            }
            Op::SelectRow(row) => {
                if let Some(id) = store.option_at(usize::from(row)) {
                    store.select_option(id);
                }
            }
            Op::Deselect(n) => {
                if let Some(id) = store.selected_ids().get(usize::from(n)).copied() {
                    store.deselect_option(id);
                }
            }
            Op::Clear => store.clear_selection(),
            Op::Navigate(current, key) => {
                let key = [NavKey::Up, NavKey::Down, NavKey::Home, NavKey::End][usize::from(key % 4)];
                if let Some(row) = store.navigate(current.map(usize::from), key) {
                    assert!(store.option_at(row).is_some());
                }
            }
            Op::SetMax(max) => store.set_settings(StoreSettings {
                max: usize::from(max % 8),
                ..store.settings()
            }),
            Op::SetMultiple(multiple) => store.set_settings(StoreSettings {
                multiple,
                ..store.settings()
            }),
        }

        let settings = store.settings();
        let selected = store.selected_ids().len();
        if !settings.multiple {
            assert!(selected <= 1);
        } else if settings.max > 0 {
            assert!(selected <= settings.max);
        }
        let index = store.list_index_map();
        assert_eq!(index.len(), store.matching_options().len());
    }
});
