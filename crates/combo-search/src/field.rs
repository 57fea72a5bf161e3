#![forbid(unsafe_code)]

//! Field access for searchable records.
//!
//! Records are open-ended key/value maps, so scoring and sorting address
//! fields by name. With nesting enabled a name like `"meta.author"` walks
//! into nested objects one segment at a time; a missing or empty segment
//! anywhere along the path resolves to `None`, never an error.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use combo_text::fold;
use serde_json::{Map, Value};

/// A resolved field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    /// Text, compared after diacritic folding.
    Text(Cow<'a, str>),
    /// Numbers compare numerically against other numbers.
    Number(f64),
    /// Booleans stringify to `"true"`/`"false"`.
    Bool(bool),
}

impl FieldValue<'_> {
    /// Whether the value counts as empty for scoring: `""`, `0`, `false`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(t) => t.is_empty(),
            Self::Number(n) => *n == 0.0 || n.is_nan(),
            Self::Bool(b) => !*b,
        }
    }

    /// Owned string form used for matching.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(t) => Cow::Borrowed(t.as_ref()),
            other => Cow::Owned(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(t) => f.write_str(t),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Compare two optional field values the way the sorter needs.
///
/// Two numbers compare numerically. Everything else is stringified
/// (missing and empty values become `""`), folded, and compared
/// lexicographically.
#[must_use]
pub fn compare_values(a: Option<&FieldValue<'_>>, b: Option<&FieldValue<'_>>) -> Ordering {
    if let (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) = (a, b) {
        return x.partial_cmp(y).unwrap_or(Ordering::Equal);
    }
    let text = |v: Option<&FieldValue<'_>>| match v {
        Some(v) if !v.is_empty() => fold(&v.to_text()),
        _ => String::new(),
    };
    text(a).cmp(&text(b))
}

/// A record whose fields can be looked up by name.
///
/// Implementations must not panic on unknown names; they return `None`.
pub trait Searchable {
    /// Resolve `name`, walking dotted segments when `nesting` is set.
    fn resolve(&self, name: &str, nesting: bool) -> Option<FieldValue<'_>>;
}

impl<T: Searchable + ?Sized> Searchable for &T {
    fn resolve(&self, name: &str, nesting: bool) -> Option<FieldValue<'_>> {
        (**self).resolve(name, nesting)
    }
}

impl Searchable for Map<String, Value> {
    fn resolve(&self, name: &str, nesting: bool) -> Option<FieldValue<'_>> {
        if name.is_empty() {
            return None;
        }
        if !nesting {
            return self.get(name).and_then(scalar);
        }
        let mut segments = name.split('.');
        let mut current = self.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                _ => return None,
            };
        }
        scalar(current)
    }
}

impl Searchable for Value {
    fn resolve(&self, name: &str, nesting: bool) -> Option<FieldValue<'_>> {
        match self {
            Value::Object(map) => map.resolve(name, nesting),
            _ => None,
        }
    }
}

/// Convert a JSON value to a field value. Objects and `null` are not
/// searchable; arrays join their scalar members with `,`.
#[must_use]
pub fn scalar(value: &Value) -> Option<FieldValue<'_>> {
    match value {
        Value::String(s) => Some(FieldValue::Text(Cow::Borrowed(s))),
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::Bool(b) => Some(FieldValue::Bool(*b)),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(scalar)
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            Some(FieldValue::Text(Cow::Owned(joined)))
        }
        Value::Null | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Resolution ──────────────────────────────────────────────────

    #[test]
    fn resolve_flat_field() {
        let v = json!({"text": "Apple", "id": 3});
        assert_eq!(
            v.resolve("text", false),
            Some(FieldValue::Text(Cow::Borrowed("Apple")))
        );
        assert_eq!(v.resolve("id", false), Some(FieldValue::Number(3.0)));
    }

    #[test]
    fn resolve_missing_is_none() {
        let v = json!({"text": "Apple"});
        assert_eq!(v.resolve("nope", false), None);
        assert_eq!(v.resolve("", true), None);
    }

    #[test]
    fn dotted_name_without_nesting_is_literal_key() {
        let v = json!({"a.b": "flat", "a": {"b": "deep"}});
        assert_eq!(v.resolve("a.b", false).unwrap().to_string(), "flat");
        assert_eq!(v.resolve("a.b", true).unwrap().to_string(), "deep");
    }

    #[test]
    fn nesting_stops_at_missing_segment() {
        let v = json!({"a": {"b": "deep"}, "s": "str"});
        assert_eq!(v.resolve("a.x.y", true), None);
        assert_eq!(v.resolve("s.len", true), None);
    }

    #[test]
    fn null_and_objects_are_not_searchable() {
        let v = json!({"n": null, "o": {"k": 1}, "arr": [1, "two", null]});
        assert_eq!(v.resolve("n", false), None);
        assert_eq!(v.resolve("o", false), None);
        assert_eq!(v.resolve("arr", false).unwrap().to_string(), "1,two");
    }

    // ── Display / emptiness ─────────────────────────────────────────

    #[test]
    fn numbers_stringify_like_integers() {
        assert_eq!(FieldValue::Number(42.0).to_string(), "42");
        assert_eq!(FieldValue::Number(1.5).to_string(), "1.5");
    }

    #[test]
    fn empty_values() {
        assert!(FieldValue::Text(Cow::Borrowed("")).is_empty());
        assert!(FieldValue::Number(0.0).is_empty());
        assert!(FieldValue::Bool(false).is_empty());
        assert!(!FieldValue::Text(Cow::Borrowed("0")).is_empty());
    }

    // ── Comparison ──────────────────────────────────────────────────

    #[test]
    fn compare_numbers_numerically() {
        let a = FieldValue::Number(9.0);
        let b = FieldValue::Number(10.0);
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Less);
    }

    #[test]
    fn compare_mixed_as_folded_text() {
        let a = FieldValue::Text(Cow::Borrowed("Éclair"));
        let b = FieldValue::Text(Cow::Borrowed("eclair"));
        assert_eq!(compare_values(Some(&a), Some(&b)), Ordering::Equal);

        let n = FieldValue::Number(10.0);
        let t = FieldValue::Text(Cow::Borrowed("9"));
        assert_eq!(compare_values(Some(&n), Some(&t)), Ordering::Less);
    }

    #[test]
    fn compare_missing_sorts_first() {
        let a = FieldValue::Text(Cow::Borrowed("a"));
        assert_eq!(compare_values(None, Some(&a)), Ordering::Less);
        assert_eq!(compare_values(None, None), Ordering::Equal);
    }
}
