#![forbid(unsafe_code)]

//! Token scoring.
//!
//! A record's score against a query is built bottom-up:
//!
//! - **value**: `0` when the field is empty or the token does not match,
//!   otherwise `token_len / value_len`, plus `0.5` when the match starts
//!   the value (prefix bonus). Lengths are counted in `char`s.
//! - **object**: `0` with no search fields, the value score with one field,
//!   the mean of the value scores with several.
//! - **query**: `0` with no tokens, the object score with one token, the
//!   mean of the per-token object scores with several. Under
//!   [`Conjunction::And`] the first token scoring `0` makes the whole
//!   record score `0`.
//!
//! # Invariants
//!
//! 1. Scores are never negative.
//! 2. With `And`, a record missing any token scores exactly `0`.
//! 3. With `Or`, a record matching at least one token scores `> 0`.

use combo_text::Token;

use crate::field::{FieldValue, Searchable};
use crate::options::Conjunction;

/// Bonus for a match at the start of the value.
pub const PREFIX_BONUS: f64 = 0.5;

/// Score one field value against one token.
///
/// ```
/// use combo_search::scorer::score_value;
/// use combo_search::FieldValue;
/// use combo_text::Tokenizer;
///
/// let tokens = Tokenizer::new().tokenize("ap", false);
/// let apple = FieldValue::Text("Apple".into());
/// assert_eq!(score_value(Some(&apple), &tokens[0]), 2.0 / 5.0 + 0.5);
/// ```
#[must_use]
pub fn score_value(value: Option<&FieldValue<'_>>, token: &Token) -> f64 {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return 0.0;
    };
    let text = value.to_text();
    let Some(pos) = token.find_in(&text) else {
        return 0.0;
    };
    let len = text.chars().count();
    let mut score = token.char_len() as f64 / len as f64;
    if pos == 0 {
        score += PREFIX_BONUS;
    }
    score
}

/// Scores records against a fixed set of tokens and fields.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    tokens: &'a [Token],
    fields: &'a [String],
    conjunction: Conjunction,
    nesting: bool,
}

impl<'a> Scorer<'a> {
    /// Create a scorer.
    #[must_use]
    pub fn new(
        tokens: &'a [Token],
        fields: &'a [String],
        conjunction: Conjunction,
        nesting: bool,
    ) -> Self {
        Self {
            tokens,
            fields,
            conjunction,
            nesting,
        }
    }

    /// Score one token against all search fields of `record`.
    #[must_use]
    pub fn score_object(&self, token: &Token, record: &dyn Searchable) -> f64 {
        match self.fields {
            [] => 0.0,
            [field] => score_value(record.resolve(field, self.nesting).as_ref(), token),
            fields => {
                let sum: f64 = fields
                    .iter()
                    .map(|f| score_value(record.resolve(f, self.nesting).as_ref(), token))
                    .sum();
                sum / fields.len() as f64
            }
        }
    }

    /// Score `record` against every token.
    #[must_use]
    pub fn score(&self, record: &dyn Searchable) -> f64 {
        match self.tokens {
            [] => 0.0,
            [token] => self.score_object(token, record),
            tokens => {
                let mut sum = 0.0;
                for token in tokens {
                    let score = self.score_object(token, record);
                    if self.conjunction == Conjunction::And && score <= 0.0 {
                        return 0.0;
                    }
                    sum += score;
                }
                sum / tokens.len() as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use combo_text::{TokenList, Tokenizer};
    use serde_json::json;

    fn tokens(q: &str) -> TokenList {
        Tokenizer::new().tokenize(q, false)
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    // ── Value scoring ───────────────────────────────────────────────

    #[test]
    fn value_prefix_bonus() {
        let t = tokens("ap");
        let v = FieldValue::Text("Apple".into());
        assert!((score_value(Some(&v), &t[0]) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn value_inner_match_has_no_bonus() {
        let t = tokens("pl");
        let v = FieldValue::Text("Apple".into());
        assert!((score_value(Some(&v), &t[0]) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn value_miss_and_empty_score_zero() {
        let t = tokens("zz");
        assert_eq!(score_value(Some(&FieldValue::Text("Apple".into())), &t[0]), 0.0);
        assert_eq!(score_value(Some(&FieldValue::Text("".into())), &t[0]), 0.0);
        assert_eq!(score_value(None, &t[0]), 0.0);
    }

    #[test]
    fn value_numbers_are_stringified() {
        let t = tokens("12");
        let v = FieldValue::Number(123.0);
        assert!((score_value(Some(&v), &t[0]) - (2.0 / 3.0 + 0.5)).abs() < 1e-9);
        assert_eq!(score_value(Some(&FieldValue::Number(0.0)), &tokens("0")[0]), 0.0);
    }

    #[test]
    fn value_lengths_count_chars() {
        let t = tokens("cafe");
        let v = FieldValue::Text("Café".into());
        assert!((score_value(Some(&v), &t[0]) - 1.5).abs() < 1e-9);
    }

    // ── Object scoring ──────────────────────────────────────────────

    #[test]
    fn object_without_fields_scores_zero() {
        let t = tokens("apple");
        let f = fields(&[]);
        let s = Scorer::new(&t, &f, Conjunction::Or, false);
        assert_eq!(s.score(&json!({"text": "apple"})), 0.0);
    }

    #[test]
    fn object_averages_fields() {
        let t = tokens("apple");
        let f = fields(&["text", "note"]);
        let s = Scorer::new(&t, &f, Conjunction::Or, false);
        let score = s.score(&json!({"text": "apple", "note": "none"}));
        assert!((score - 0.75).abs() < 1e-9);
    }

    // ── Conjunction ─────────────────────────────────────────────────

    #[test]
    fn and_requires_every_token() {
        let t = tokens("red apple");
        let f = fields(&["text"]);
        let s = Scorer::new(&t, &f, Conjunction::And, false);
        assert!(s.score(&json!({"text": "red apple"})) > 0.0);
        assert_eq!(s.score(&json!({"text": "green apple"})), 0.0);
    }

    #[test]
    fn or_accepts_partial_matches() {
        let t = tokens("red apple");
        let f = fields(&["text"]);
        let s = Scorer::new(&t, &f, Conjunction::Or, false);
        let partial = s.score(&json!({"text": "green apple"}));
        let full = s.score(&json!({"text": "red apple"}));
        assert!(partial > 0.0);
        assert!(full > partial);
    }

    #[test]
    fn no_tokens_scores_zero() {
        let t = tokens("");
        let f = fields(&["text"]);
        let s = Scorer::new(&t, &f, Conjunction::Or, false);
        assert_eq!(s.score(&json!({"text": "anything"})), 0.0);
    }

    #[test]
    fn nested_fields_resolve() {
        let t = tokens("tolkien");
        let f = fields(&["meta.author"]);
        let s = Scorer::new(&t, &f, Conjunction::Or, true);
        assert!(s.score(&json!({"meta": {"author": "J. R. R. Tolkien"}})) > 0.0);
    }
}
