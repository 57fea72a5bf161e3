#![forbid(unsafe_code)]

//! Text primitives for combo selection lists.
//!
//! This crate provides:
//! - [`fold`] for diacritic-insensitive comparison (one char in, one char out)
//! - [`Tokenizer`] for splitting a typed query into compiled [`Token`]s
//! - [`Fragment`] for parsing and serializing the small markup fragments
//!   produced by item formatters

pub mod diacritics;
pub mod markup;
pub mod tokenizer;

pub use diacritics::{base_letters, class_for, fold, fold_char};
pub use markup::{Element, Fragment, MarkupError, Node};
pub use tokenizer::{Token, TokenList, Tokenizer};
