#![no_main]

use arbitrary::Arbitrary;
use combo_search::{Conjunction, SearchOptions, SortSpec, search};
use libfuzzer_sys::fuzz_target;
use serde_json::json;

#[derive(Debug, Arbitrary)]
struct Input {
    query: String,
    labels: Vec<String>,
    and: bool,
    nesting: bool,
    word_boundaries: bool,
    limit: Option<u8>,
}

fuzz_target!(|input: Input| {
    let records: Vec<_> = input
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| json!({"id": i, "text": label, "meta": {"text": label}}))
        .collect();
    let mut options = SearchOptions::new()
        .with_fields(["text", "meta.text"])
        .with_sort([SortSpec::asc("text")])
        .with_nesting(input.nesting)
        .respect_word_boundaries(input.word_boundaries)
        .with_conjunction(if input.and { Conjunction::And } else { Conjunction::Or });
    if let Some(limit) = input.limit {
        options = options.with_limit(usize::from(limit));
    }

    let result = search(&records, &input.query, &options);
    assert!(result.items.len() <= result.total);
    assert!(result.total <= records.len());
    for item in &result.items {
        assert!(item.id < records.len());
        assert!(item.score > 0.0);
    }
});
