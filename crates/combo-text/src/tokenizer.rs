#![forbid(unsafe_code)]

//! Query tokenizer.
//!
//! A query is trimmed, lowercased, and split on runs of whitespace. Each
//! word becomes a [`Token`]: the literal word (kept for length-ratio
//! scoring) plus a compiled case-insensitive matcher.
//!
//! With diacritics enabled, every base letter in the word is replaced by
//! its bracket expression from the folding table, so `cafe` matches
//! `Café`. With word boundaries enabled the pattern is anchored with `\b`.
//!
//! An empty or whitespace-only query yields no tokens; callers treat that
//! as "match everything".

use regex::{Regex, RegexBuilder};
use smallvec::SmallVec;

use crate::diacritics::class_for;

/// Tokens for one query. Most queries are one or two words.
pub type TokenList = SmallVec<[Token; 4]>;

/// One search word and its compiled matcher.
#[derive(Debug, Clone)]
pub struct Token {
    word: String,
    regex: Regex,
}

impl Token {
    /// The lowercase literal word as typed.
    #[must_use]
    pub fn word(&self) -> &str {
        &self.word
    }

    /// Length of the literal word in `char`s.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.word.chars().count()
    }

    /// The compiled matcher.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Byte offset of the first match in `haystack`, if any.
    #[must_use]
    pub fn find_in(&self, haystack: &str) -> Option<usize> {
        self.regex.find(haystack).map(|m| m.start())
    }

    /// Whether the token matches anywhere in `haystack`.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        self.regex.is_match(haystack)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word && self.regex.as_str() == other.regex.as_str()
    }
}

/// Splits queries into [`Token`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tokenizer {
    diacritics: bool,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self { diacritics: true }
    }
}

impl Tokenizer {
    /// Create a tokenizer. Diacritic expansion is on by default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable diacritic expansion.
    #[must_use]
    pub fn diacritics(mut self, enabled: bool) -> Self {
        self.diacritics = enabled;
        self
    }

    /// Whether diacritic expansion is enabled.
    #[must_use]
    pub fn has_diacritics(&self) -> bool {
        self.diacritics
    }

    /// Tokenize `query`.
    ///
    /// ```
    /// use combo_text::Tokenizer;
    ///
    /// let tokens = Tokenizer::new().tokenize("  Creme BRULEE ", false);
    /// assert_eq!(tokens.len(), 2);
    /// assert_eq!(tokens[0].word(), "creme");
    /// assert!(tokens[1].is_match("Crème brûlée"));
    /// ```
    #[must_use]
    pub fn tokenize(&self, query: &str, respect_word_boundaries: bool) -> TokenList {
        let query = query.trim().to_lowercase();
        let mut tokens = TokenList::new();
        for word in query.split_whitespace() {
            let pattern = self.pattern_for(word, respect_word_boundaries);
            match compile(&pattern) {
                Ok(regex) => tokens.push(Token {
                    word: word.to_owned(),
                    regex,
                }),
                Err(err) => {
                    tracing::warn!(word, error = %err, "token pattern rejected, using literal");
                    let literal = anchor(regex::escape(word), respect_word_boundaries);
                    match compile(&literal) {
                        Ok(regex) => tokens.push(Token {
                            word: word.to_owned(),
                            regex,
                        }),
                        Err(err) => tracing::warn!(word, error = %err, "token dropped"),
                    }
                }
            }
        }
        tracing::trace!(count = tokens.len(), "tokenized query");
        tokens
    }

    /// Build the regex source for one word.
    fn pattern_for(&self, word: &str, respect_word_boundaries: bool) -> String {
        let mut pattern = String::with_capacity(word.len() * 2);
        let mut buf = [0u8; 4];
        for c in word.chars() {
            match self.diacritics.then(|| class_for(c)).flatten() {
                Some(class) => pattern.push_str(class),
                None => pattern.push_str(&regex::escape(c.encode_utf8(&mut buf))),
            }
        }
        anchor(pattern, respect_word_boundaries)
    }
}

fn anchor(pattern: String, respect_word_boundaries: bool) -> String {
    if respect_word_boundaries {
        format!(r"\b{pattern}")
    } else {
        pattern
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Splitting ───────────────────────────────────────────────────

    #[test]
    fn empty_query_has_no_tokens() {
        assert!(Tokenizer::new().tokenize("", false).is_empty());
        assert!(Tokenizer::new().tokenize("   \t\n ", false).is_empty());
    }

    #[test]
    fn splits_on_whitespace_runs() {
        let tokens = Tokenizer::new().tokenize("red   green\tblue", false);
        let words: Vec<_> = tokens.iter().map(Token::word).collect();
        assert_eq!(words, vec!["red", "green", "blue"]);
    }

    #[test]
    fn words_are_lowercased() {
        let tokens = Tokenizer::new().tokenize("HeLLo", false);
        assert_eq!(tokens[0].word(), "hello");
    }

    // ── Matching ────────────────────────────────────────────────────

    #[test]
    fn matching_is_case_insensitive() {
        let tokens = Tokenizer::new().tokenize("apple", false);
        assert!(tokens[0].is_match("Green APPLE"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let tokens = Tokenizer::new().tokenize("a.b (c)", false);
        assert!(tokens[0].is_match("xa.by"));
        assert!(!tokens[0].is_match("axb"));
        assert!(tokens[1].is_match("(c)"));
    }

    #[test]
    fn diacritics_expand_base_letters() {
        let tokens = Tokenizer::new().tokenize("cafe", false);
        assert!(tokens[0].is_match("Café"));
    }

    #[test]
    fn diacritics_off_is_strict() {
        let tokens = Tokenizer::new().diacritics(false).tokenize("cafe", false);
        assert!(!tokens[0].is_match("Café"));
        assert!(tokens[0].is_match("CAFE"));
    }

    #[test]
    fn word_boundary_anchor() {
        let tokens = Tokenizer::new().tokenize("app", true);
        assert!(tokens[0].is_match("my app"));
        assert!(!tokens[0].is_match("happy"));
    }

    #[test]
    fn find_in_reports_byte_offset() {
        let tokens = Tokenizer::new().tokenize("na", false);
        assert_eq!(tokens[0].find_in("banana"), Some(2));
        assert_eq!(tokens[0].find_in("xyz"), None);
    }

    #[test]
    fn char_len_counts_chars() {
        let tokens = Tokenizer::new().tokenize("crème", false);
        assert_eq!(tokens[0].char_len(), 5);
    }

    #[test]
    #[tracing_test::traced_test]
    fn tokenizing_is_traced() {
        let tokens = Tokenizer::new().tokenize("a b c", false);
        assert_eq!(tokens.len(), 3);
        assert!(logs_contain("tokenized query"));
    }
}
