#![no_main]

use combo_text::{Fragment, fold};
use combo_widgets::highlight_match;
use libfuzzer_sys::fuzz_target;

// Input: `query \0 markup`. Highlighting never loses or reorders text.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (query, markup) = input.split_once('\0').unwrap_or(("a", input));

    let out = highlight_match(markup, query);
    let before = Fragment::parse(markup).unwrap_or_else(|_| Fragment::from_text(markup));
    let after = Fragment::parse(&out).expect("highlighter output parses");
    assert_eq!(after.text_content(), before.text_content());
    assert_eq!(fold(&out).chars().count(), out.chars().count());
});
