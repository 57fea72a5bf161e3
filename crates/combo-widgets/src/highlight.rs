#![forbid(unsafe_code)]

//! Query highlighting inside rendered item markup.
//!
//! The query and each text node are diacritic-folded before matching, so
//! `cafe` highlights `Café`. Folding maps one `char` to one `char`, which
//! lets a match found in the folded text be cut out of the original text
//! at the same character offsets.
//!
//! Only the first match in the whole fragment is wrapped. `<script>`,
//! `<style>` and existing `<span class="highlight">` subtrees are not
//! searched.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Markup does not parse | Treated as plain text (escaped) and highlighted |
//! | Query with regex metacharacters | Matched literally |
//! | Empty or blank query | Input returned as is |

use combo_text::{Element, Fragment, Node, fold};
use regex::{Regex, RegexBuilder};

use crate::record::OptionRecord;

/// Class of the wrapping `<span>`.
pub const HIGHLIGHT_CLASS: &str = "highlight";

/// Highlight the first match of `query` in `markup`.
///
/// ```
/// use combo_widgets::highlight_match;
///
/// assert_eq!(
///     highlight_match("<b>Café</b> au lait", "cafe"),
///     "<b><span class=\"highlight\">Café</span></b> au lait"
/// );
/// assert_eq!(highlight_match("<b>Café</b>", ""), "<b>Café</b>");
/// ```
#[must_use]
pub fn highlight_match(markup: &str, query: &str) -> String {
    if query.trim().is_empty() {
        return markup.to_owned();
    }
    let mut fragment = Fragment::parse(markup).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "item markup did not parse; highlighting as text");
        Fragment::from_text(markup)
    });
    highlight_fragment(&mut fragment, query);
    fragment.to_markup()
}

/// Highlight the first match of `query` inside `fragment`, in place.
/// Returns whether a match was wrapped.
pub fn highlight_fragment(fragment: &mut Fragment, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return false;
    }
    let Some(regex) = query_regex(query) else {
        return false;
    };
    highlight_nodes(&mut fragment.nodes, &regex)
}

/// Format `record` and highlight `query` in the result. Selected items are
/// returned exactly as formatted.
pub fn highlight_item(
    record: &OptionRecord,
    query: &str,
    formatter: impl Fn(&OptionRecord, bool) -> String,
) -> String {
    let markup = formatter(record, record.is_selected());
    if record.is_selected() {
        return markup;
    }
    highlight_match(&markup, query)
}

/// Formatter that renders `label_field` as escaped text.
pub fn label_formatter(label_field: &str) -> impl Fn(&OptionRecord, bool) -> String + '_ {
    move |record, _selected| Fragment::from_text(record.text(label_field)).to_markup()
}

fn query_regex(query: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(&fold(query)))
        .case_insensitive(true)
        .build()
        .map_err(|err| tracing::warn!(error = %err, "highlight pattern rejected"))
        .ok()
}

fn is_opaque(element: &Element) -> bool {
    element.is_raw_text() || (element.tag == "span" && element.has_class(HIGHLIGHT_CLASS))
}

fn highlight_nodes(nodes: &mut Vec<Node>, regex: &Regex) -> bool {
    for i in 0..nodes.len() {
        let replacement = match &mut nodes[i] {
            Node::Text(text) => match split_match(text, regex) {
                Some(parts) => parts,
                None => continue,
            },
            Node::Element(element) => {
                if !is_opaque(element) && highlight_nodes(&mut element.children, regex) {
                    return true;
                }
                continue;
            }
            Node::Comment(_) => continue,
        };
        let tail = nodes.split_off(i + 1);
        nodes.truncate(i);
        nodes.extend(replacement);
        nodes.extend(tail);
        return true;
    }
    false
}

/// Split `text` around the first folded match: `[before] <span>match</span> [after]`.
fn split_match(text: &str, regex: &Regex) -> Option<Vec<Node>> {
    if text.is_empty() {
        return None;
    }
    let folded = fold(text);
    let found = regex.find(&folded).filter(|m| !m.is_empty())?;
    let start_char = folded[..found.start()].chars().count();
    let len_chars = found.as_str().chars().count();

    let start = byte_offset(text, start_char);
    let end = byte_offset(text, start_char + len_chars);

    let mut parts = Vec::with_capacity(3);
    if start > 0 {
        parts.push(Node::text(&text[..start]));
    }
    parts.push(Node::Element(
        Element::new("span")
            .with_attr("class", HIGHLIGHT_CLASS)
            .with_child(Node::text(&text[start..end])),
    ));
    if end < text.len() {
        parts.push(Node::text(&text[end..]));
    }
    Some(parts)
}

fn byte_offset(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(i, _)| i)
}
