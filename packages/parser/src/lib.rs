//! # DarkDOM Parser
//!
//! Lexes, parses and serializes the markup fragments that flow through the
//! engine: watched subtrees, render output and content text.

pub mod ast;
pub mod decorate;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod tokenizer;

pub use ast::{is_raw_text_tag, is_void_tag, Attribute, Element, MarkupNode};
pub use decorate::{decorate_root, starts_with_tag};
pub use error::{ParseError, ParseResult};
pub use parser::{parse_fragment, Parser};
pub use serializer::{serialize, Serializer};
pub use tokenizer::{tokenize, AttrToken, Token};
