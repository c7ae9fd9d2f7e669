//! Helpers for post-processing markup produced by a render function

use crate::error::ParseResult;
use crate::parser::parse_fragment;
use crate::serializer::serialize;
use crate::tokenizer::Token;
use logos::Logos;

/// Does the markup begin with a tag, comment or declaration (after optional
/// whitespace)?
pub fn starts_with_tag(markup: &str) -> bool {
    matches!(
        Token::lexer(markup.trim_start()).next(),
        Some(Ok(Token::OpenTag(_) | Token::Declaration(_) | Token::Comment(_)))
    )
}

/// Set `attrs` on the first top-level element of `markup`.
///
/// Markup that does not start with a tag is returned unchanged; it will be
/// inserted as text and carries no identity.
pub fn decorate_root(markup: &str, attrs: &[(&str, &str)]) -> ParseResult<String> {
    if !starts_with_tag(markup) {
        return Ok(markup.to_string());
    }

    let mut nodes = parse_fragment(markup)?;
    if let Some(root) = nodes.iter_mut().find_map(|node| node.as_element_mut()) {
        for (name, value) in attrs {
            root.set_attr(*name, *value);
        }
    }

    Ok(serialize(&nodes))
}
