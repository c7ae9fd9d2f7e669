use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{AttrToken, Token};
use logos::{Lexer, Logos};

/// Parser for markup fragments
///
/// Unlike a browser, the parser does not repair markup: a stray closing tag
/// or an element left open at the end of input is an error.
pub struct Parser<'src> {
    lexer: Lexer<'src, Token<'src>>,
    /// Open elements with the byte offset of their start tag
    stack: Vec<(Element, usize)>,
    roots: Vec<MarkupNode>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            lexer: Token::lexer(source),
            stack: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Parse the whole input as a list of sibling nodes
    pub fn parse_fragment(mut self) -> ParseResult<Vec<MarkupNode>> {
        while let Some(result) = self.lexer.next() {
            let pos = self.lexer.span().start;
            let token = result.map_err(|_| ParseError::lexer_error(pos))?;

            match token {
                Token::Text(text) => self.push_text(text),
                Token::Lt => self.push_text("<"),
                Token::Comment(content) => self.push_node(MarkupNode::comment(content)),
                Token::Declaration(content) => self.push_node(MarkupNode::Declaration {
                    content: content.to_string(),
                }),
                Token::OpenTag(body) => self.open_tag(body, pos)?,
                Token::CloseTag(tag) => self.close_tag(tag, pos)?,
            }
        }

        if let Some((element, pos)) = self.stack.pop() {
            return Err(ParseError::unclosed_element(pos, element.tag));
        }

        Ok(self.roots)
    }

    fn open_tag(&mut self, body: &'src str, pos: usize) -> ParseResult<()> {
        let mut element = parse_tag_body(body, pos)?;

        if element.self_closing || element.is_void() {
            self.push_node(MarkupNode::Element(element));
            return Ok(());
        }

        if is_raw_text_tag(&element.tag) {
            let raw = self.take_raw_text(&element.tag, pos)?;
            if !raw.is_empty() {
                element.children.push(MarkupNode::text(raw));
            }
            self.push_node(MarkupNode::Element(element));
            return Ok(());
        }

        self.stack.push((element, pos));
        Ok(())
    }

    fn close_tag(&mut self, tag: &str, pos: usize) -> ParseResult<()> {
        match self.stack.pop() {
            Some((element, _)) if element.tag.eq_ignore_ascii_case(tag) => {
                self.push_node(MarkupNode::Element(element));
                Ok(())
            }
            _ => Err(ParseError::unexpected_close_tag(pos, tag)),
        }
    }

    /// Consume everything up to and including `</tag>` and return the body
    fn take_raw_text(&mut self, tag: &str, pos: usize) -> ParseResult<&'src str> {
        let rest = self.lexer.remainder();
        let needle = format!("</{}", tag.to_ascii_lowercase());
        let end = rest
            .to_ascii_lowercase()
            .find(&needle)
            .ok_or_else(|| ParseError::unclosed_element(pos, tag))?;
        let close = rest[end..]
            .find('>')
            .ok_or_else(|| ParseError::unclosed_element(pos, tag))?;

        self.lexer.bump(end + close + 1);
        Ok(&rest[..end])
    }

    fn push_text(&mut self, text: &str) {
        // Merge with a preceding text node so stray `<` do not split runs
        let siblings = match self.stack.last_mut() {
            Some((parent, _)) => &mut parent.children,
            None => &mut self.roots,
        };
        if let Some(MarkupNode::Text { content }) = siblings.last_mut() {
            content.push_str(text);
            return;
        }
        siblings.push(MarkupNode::text(text));
    }

    fn push_node(&mut self, node: MarkupNode) {
        match self.stack.last_mut() {
            Some((parent, _)) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }
}

/// Split `tag attr="v" ...` into an element with its attributes
fn parse_tag_body(body: &str, pos: usize) -> ParseResult<Element> {
    let name_end = body
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(body.len());
    let mut element = Element::new(&body[..name_end]);

    let mut pending: Option<String> = None;
    let mut expect_value = false;
    let mut lexer = AttrToken::lexer(&body[name_end..]);

    while let Some(result) = lexer.next() {
        let token = result
            .map_err(|_| ParseError::lexer_error(pos + name_end + lexer.span().start))?;
        match token {
            AttrToken::Name(text) if expect_value => {
                set_value(&mut element, &mut pending, text);
                expect_value = false;
            }
            AttrToken::DoubleQuoted(text) | AttrToken::SingleQuoted(text) => {
                if !expect_value {
                    return Err(ParseError::invalid_syntax(
                        pos,
                        "quoted value without attribute name",
                    ));
                }
                set_value(&mut element, &mut pending, text);
                expect_value = false;
            }
            AttrToken::Name(name) => {
                flush_bare(&mut element, &mut pending);
                element.self_closing = false;
                pending = Some(name.to_string());
            }
            AttrToken::Eq => {
                if pending.is_none() {
                    return Err(ParseError::invalid_syntax(pos, "'=' without attribute name"));
                }
                expect_value = true;
            }
            AttrToken::Slash => {
                flush_bare(&mut element, &mut pending);
                element.self_closing = true;
            }
        }
    }

    if expect_value {
        return Err(ParseError::invalid_syntax(pos, "attribute value missing after '='"));
    }
    flush_bare(&mut element, &mut pending);

    Ok(element)
}

fn set_value(element: &mut Element, pending: &mut Option<String>, value: &str) {
    if let Some(name) = pending.take() {
        element.attributes.push(Attribute {
            name,
            value: Some(value.to_string()),
        });
    }
}

fn flush_bare(element: &mut Element, pending: &mut Option<String>) {
    if let Some(name) = pending.take() {
        element.attributes.push(Attribute { name, value: None });
    }
}

/// Parse a markup fragment into its top-level nodes
pub fn parse_fragment(source: &str) -> ParseResult<Vec<MarkupNode>> {
    Parser::new(source).parse_fragment()
}
