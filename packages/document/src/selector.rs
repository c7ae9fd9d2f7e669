//! CSS selector subset used to locate watched nodes
//!
//! Supported: `*`, tag names, `#id`, `.class`, `[attr]`, `[attr=value]`
//! (quoted or bare), descendant and child (`>`) combinators, `,` groups.

use crate::tree::{DocumentTree, NodeId, NodeKind};
use logos::Logos;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unexpected {found} in selector '{selector}'")]
    Unexpected { selector: String, found: String },

    #[error("Unterminated attribute selector in '{selector}'")]
    UnterminatedAttribute { selector: String },
}

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
enum SelToken<'src> {
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"[0-9][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"#[a-zA-Z0-9_-]+", |lex| &lex.slice()[1..])]
    Hash(&'src str),

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Str(&'src str),

    #[token(".")]
    Dot,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("=")]
    Eq,

    #[token(">")]
    Gt,

    #[token(",")]
    Comma,

    #[token("*")]
    Star,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    universal: bool,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }

    fn matches<D: DocumentTree + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        let tag = match doc.kind(node) {
            NodeKind::Element(tag) => tag,
            _ => return false,
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(&tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attr(node, "id").as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = doc.attr(node, "class").unwrap_or_default();
            let classes: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| classes.contains(&c.as_str())) {
                return false;
            }
        }
        self.attrs.iter().all(|m| match (&m.value, doc.attr(node, &m.name)) {
            (None, found) => found.is_some(),
            (Some(expected), Some(found)) => *expected == found,
            (Some(_), None) => false,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Compounds left to right; the first combinator is unused
    parts: Vec<(Combinator, Compound)>,
}

impl Complex {
    fn matches<D: DocumentTree + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        self.matches_at(doc, node, self.parts.len() - 1)
    }

    fn matches_at<D: DocumentTree + ?Sized>(&self, doc: &D, node: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.parts[idx];
        if !compound.matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .map_or(false, |parent| self.matches_at(doc, parent, idx - 1)),
            Combinator::Descendant => doc
                .ancestors(node)
                .into_iter()
                .any(|ancestor| self.matches_at(doc, ancestor, idx - 1)),
        }
    }
}

/// A parsed selector group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let unexpected = |found: String| SelectorError::Unexpected {
            selector: source.to_string(),
            found,
        };

        let mut groups = Vec::new();
        let mut parts: Vec<(Combinator, Compound)> = Vec::new();
        let mut current = Compound::default();
        let mut combinator = Combinator::Descendant;
        let mut lexer = SelToken::lexer(source);

        while let Some(result) = lexer.next() {
            let token = result.map_err(|_| unexpected(format!("'{}'", lexer.slice())))?;
            match token {
                SelToken::Whitespace => {
                    if !current.is_empty() {
                        parts.push((combinator, std::mem::take(&mut current)));
                        combinator = Combinator::Descendant;
                    }
                }
                SelToken::Gt => {
                    if !current.is_empty() {
                        parts.push((combinator, std::mem::take(&mut current)));
                    }
                    if parts.is_empty() {
                        return Err(unexpected("'>'".to_string()));
                    }
                    combinator = Combinator::Child;
                }
                SelToken::Comma => {
                    if !current.is_empty() {
                        parts.push((combinator, std::mem::take(&mut current)));
                    }
                    if parts.is_empty() {
                        return Err(unexpected("','".to_string()));
                    }
                    groups.push(Complex {
                        parts: std::mem::take(&mut parts),
                    });
                    combinator = Combinator::Descendant;
                }
                SelToken::Ident(tag) => {
                    if !current.is_empty() {
                        return Err(unexpected(format!("tag '{}' after other selectors", tag)));
                    }
                    current.tag = Some(tag.to_string());
                }
                SelToken::Star => current.universal = true,
                SelToken::Hash(id) => current.id = Some(id.to_string()),
                SelToken::Dot => match lexer.next() {
                    Some(Ok(SelToken::Ident(class))) => current.classes.push(class.to_string()),
                    _ => return Err(unexpected("'.' without class name".to_string())),
                },
                SelToken::LBracket => {
                    let attr = Self::parse_attr(&mut lexer).ok_or_else(|| {
                        SelectorError::UnterminatedAttribute {
                            selector: source.to_string(),
                        }
                    })?;
                    current.attrs.push(attr);
                }
                other => return Err(unexpected(format!("{:?}", other))),
            }
        }

        if !current.is_empty() {
            parts.push((combinator, current));
        }
        if parts.is_empty() {
            return if groups.is_empty() {
                Err(SelectorError::Empty)
            } else {
                Err(unexpected("trailing ','".to_string()))
            };
        }
        groups.push(Complex { parts });

        Ok(Self { groups })
    }

    fn parse_attr<'src>(lexer: &mut logos::Lexer<'src, SelToken<'src>>) -> Option<AttrMatch> {
        let name = match lexer.next()? {
            Ok(SelToken::Ident(name)) => name.to_string(),
            _ => return None,
        };
        match lexer.next()? {
            Ok(SelToken::RBracket) => Some(AttrMatch { name, value: None }),
            Ok(SelToken::Eq) => {
                let value = match lexer.next()? {
                    Ok(SelToken::Ident(v)) | Ok(SelToken::Number(v)) | Ok(SelToken::Str(v)) => {
                        v.to_string()
                    }
                    _ => return None,
                };
                match lexer.next()? {
                    Ok(SelToken::RBracket) => Some(AttrMatch {
                        name,
                        value: Some(value),
                    }),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    pub fn matches<D: DocumentTree + ?Sized>(&self, doc: &D, node: NodeId) -> bool {
        self.groups.iter().any(|group| group.matches(doc, node))
    }
}
