#![forbid(unsafe_code)]

//! Minimal markup fragments.
//!
//! Item formatters render a record to a markup string such as
//! `<b>Apple</b> <small>fruit</small>`. [`Fragment::parse`] turns that into
//! a node tree that can be walked and edited, and [`Fragment::to_markup`]
//! turns it back into a string.
//!
//! The parser handles what formatters emit: elements with quoted or bare
//! attributes, void and self-closing elements, comments, raw-text
//! `<script>`/`<style>` bodies, and the common character references.
//! It is not an HTML5 parser.
//!
//! # Invariants
//!
//! 1. Text nodes and attribute values hold decoded text; serialization
//!    re-escapes `&`, `<`, `>`, `"`, `'` and `/`.
//! 2. `Fragment::parse(&f.to_markup())` yields a fragment equal to `f`.
//! 3. Element names are stored lowercase.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unterminated tag | `<div` at end of input | `MarkupError::UnterminatedTag` |
//! | Stray close tag | `</b>` with no open `<b>` | `MarkupError::UnexpectedClose` |
//! | Unclosed element | `<b>text` at end of input | `MarkupError::Unclosed` |
//! | Unknown entity | `&foo;` | Kept as literal text |

use std::fmt::{self, Write as _};

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is raw text up to the matching close tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Errors from parsing a markup fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupError {
    /// A `<` opened a tag that never ended.
    UnterminatedTag { offset: usize },
    /// A close tag did not match the innermost open element.
    UnexpectedClose { tag: String, offset: usize },
    /// Input ended with an element still open.
    Unclosed { tag: String },
}

impl fmt::Display for MarkupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedTag { offset } => write!(f, "unterminated tag at byte {offset}"),
            Self::UnexpectedClose { tag, offset } => {
                write!(f, "unexpected close tag '</{tag}>' at byte {offset}")
            }
            Self::Unclosed { tag } => write!(f, "element '<{tag}>' is never closed"),
        }
    }
}

impl std::error::Error for MarkupError {}

/// An element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name.
    pub tag: String,
    /// Attributes in source order; `None` for bare attributes like `disabled`.
    pub attrs: Vec<(String, Option<String>)>,
    /// Child nodes.
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element with no attributes or children.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), Some(value.into())));
        self
    }

    /// Add a child node.
    #[must_use]
    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Value of attribute `name`, if present.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    /// Whether the space-separated `class` attribute contains `class`.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    }

    /// Whether this is a raw-text element (`script`, `style`).
    #[must_use]
    pub fn is_raw_text(&self) -> bool {
        RAW_TEXT_ELEMENTS.contains(&self.tag.as_str())
    }

    fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str())
    }
}

/// A node in a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Decoded text.
    Text(String),
    /// An element with children.
    Element(Element),
    /// A comment body (without `<!--`/`-->`).
    Comment(String),
}

impl Node {
    /// Convenience constructor for a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A parsed markup fragment: a sequence of sibling nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// Top-level nodes.
    pub nodes: Vec<Node>,
}

impl Fragment {
    /// A fragment holding a single text node.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::Text(text.into())],
        }
    }

    /// Parse a markup string.
    ///
    /// ```
    /// use combo_text::{Fragment, Node};
    ///
    /// let frag = Fragment::parse("<b class=\"x\">Tom &amp; Jerry</b>").unwrap();
    /// assert_eq!(frag.text_content(), "Tom & Jerry");
    /// assert_eq!(frag.to_markup(), "<b class=\"x\">Tom &amp; Jerry</b>");
    /// ```
    pub fn parse(input: &str) -> Result<Self, MarkupError> {
        Parser::new(input).parse()
    }

    /// Serialize back to markup.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        out
    }

    /// Concatenated text of all text nodes, excluding comments.
    #[must_use]
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            collect_text(&mut out, node);
        }
        out
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

fn collect_text(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => out.push_str(t),
        Node::Element(el) => {
            for child in &el.children {
                collect_text(out, child);
            }
        }
        Node::Comment(_) => {}
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Text(t) => escape_into(out, t),
        Node::Comment(c) => {
            out.push_str("<!--");
            out.push_str(c);
            out.push_str("-->");
        }
        Node::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                if let Some(value) = value {
                    out.push_str("=\"");
                    escape_into(out, value);
                    out.push('"');
                }
            }
            out.push('>');
            if el.is_void() {
                return;
            }
            for child in &el.children {
                match child {
                    Node::Text(t) if el.is_raw_text() => out.push_str(t),
                    other => write_node(out, other),
                }
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn escape_into(out: &mut String, text: &str) {
    // Writing into a `String` cannot fail.
    let _ = write!(out, "{}", v_htmlescape::escape(text));
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Open elements, innermost last, each with its children so far.
    stack: Vec<Element>,
    root: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn push_node(&mut self, node: Node) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn push_text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let decoded = decode_entities(raw);
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.root,
        };
        if let Some(Node::Text(prev)) = siblings.last_mut() {
            prev.push_str(&decoded);
        } else {
            siblings.push(Node::Text(decoded));
        }
    }

    fn parse(mut self) -> Result<Fragment, MarkupError> {
        while self.pos < self.input.len() {
            let rest = self.rest();
            let Some(lt) = rest.find('<') else {
                self.push_text(rest);
                self.pos = self.input.len();
                break;
            };
            self.push_text(&rest[..lt]);
            self.pos += lt;
            let rest = self.rest();

            if let Some(body) = rest.strip_prefix("<!--") {
                let end = body
                    .find("-->")
                    .ok_or(MarkupError::UnterminatedTag { offset: self.pos })?;
                self.push_node(Node::Comment(body[..end].to_owned()));
                self.pos += 4 + end + 3;
            } else if rest.starts_with("</") {
                self.parse_close()?;
            } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
                self.parse_open()?;
            } else {
                // A lone '<' that does not start a tag is text.
                self.push_text("<");
                self.pos += 1;
            }
        }

        if let Some(open) = self.stack.pop() {
            return Err(MarkupError::Unclosed { tag: open.tag });
        }
        Ok(Fragment { nodes: self.root })
    }

    fn parse_close(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let rest = self.rest();
        let end = rest
            .find('>')
            .ok_or(MarkupError::UnterminatedTag { offset: start })?;
        let tag = rest[2..end].trim().to_ascii_lowercase();
        self.pos += end + 1;
        match self.stack.pop() {
            Some(open) if open.tag == tag => {
                self.push_node(Node::Element(open));
                Ok(())
            }
            _ => Err(MarkupError::UnexpectedClose { tag, offset: start }),
        }
    }

    fn parse_open(&mut self) -> Result<(), MarkupError> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut i = self.pos + 1;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' && bytes[i] != b'/'
        {
            i += 1;
        }
        let mut element = Element::new(&self.input[self.pos + 1..i]);
        let mut self_closing = false;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i) {
                None => return Err(MarkupError::UnterminatedTag { offset: start }),
                Some(b'>') => {
                    i += 1;
                    break;
                }
                Some(b'/') => {
                    self_closing = true;
                    i += 1;
                }
                Some(_) => {
                    let name_start = i;
                    while i < bytes.len()
                        && !bytes[i].is_ascii_whitespace()
                        && !matches!(bytes[i], b'=' | b'>' | b'/')
                    {
                        i += 1;
                    }
                    let name = self.input[name_start..i].to_owned();
                    if bytes.get(i) == Some(&b'=') {
                        i += 1;
                        let value;
                        match bytes.get(i) {
                            Some(&q @ (b'"' | b'\'')) => {
                                let body = &self.input[i + 1..];
                                let close = body
                                    .find(q as char)
                                    .ok_or(MarkupError::UnterminatedTag { offset: start })?;
                                value = decode_entities(&body[..close]);
                                i += 1 + close + 1;
                            }
                            Some(_) => {
                                let value_start = i;
                                while i < bytes.len()
                                    && !bytes[i].is_ascii_whitespace()
                                    && bytes[i] != b'>'
                                {
                                    i += 1;
                                }
                                value = decode_entities(&self.input[value_start..i]);
                            }
                            None => return Err(MarkupError::UnterminatedTag { offset: start }),
                        }
                        element.attrs.push((name, Some(value)));
                    } else {
                        element.attrs.push((name, None));
                    }
                }
            }
        }
        self.pos = i;

        if self_closing || element.is_void() {
            self.push_node(Node::Element(element));
            return Ok(());
        }

        if element.is_raw_text() {
            let close = format!("</{}", element.tag);
            let body = self.rest();
            let end = find_ascii_case_insensitive(body, &close)
                .ok_or_else(|| MarkupError::Unclosed {
                    tag: element.tag.clone(),
                })?;
            if end > 0 {
                element.children.push(Node::Text(body[..end].to_owned()));
            }
            let after = &body[end..];
            let gt = after
                .find('>')
                .ok_or(MarkupError::UnterminatedTag { offset: self.pos + end })?;
            self.pos += end + gt + 1;
            self.push_node(Node::Element(element));
            return Ok(());
        }

        self.stack.push(element);
        Ok(())
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let n = needle.len();
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            haystack
                .get(i..i + n)
                .is_some_and(|window| window.eq_ignore_ascii_case(needle))
        })
}

/// Decode the character references formatters commonly emit.
fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let name = &rest[1..semi];
            let c = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
