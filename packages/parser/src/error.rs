use thiserror::Error;

pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected closing tag </{tag}> at {pos}")]
    UnexpectedCloseTag { pos: usize, tag: String },

    #[error("Element <{tag}> opened at {pos} is never closed")]
    UnclosedElement { pos: usize, tag: String },

    #[error("Invalid syntax at {pos}: {message}")]
    InvalidSyntax { pos: usize, message: String },

    #[error("Lexer error at {pos}")]
    LexerError { pos: usize },
}

impl ParseError {
    pub fn unexpected_close_tag(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnexpectedCloseTag {
            pos,
            tag: tag.into(),
        }
    }

    pub fn unclosed_element(pos: usize, tag: impl Into<String>) -> Self {
        Self::UnclosedElement {
            pos,
            tag: tag.into(),
        }
    }

    pub fn invalid_syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            pos,
            message: message.into(),
        }
    }

    pub fn lexer_error(pos: usize) -> Self {
        Self::LexerError { pos }
    }

    /// Byte offset in the source where the error was detected
    pub fn pos(&self) -> usize {
        match self {
            Self::UnexpectedCloseTag { pos, .. }
            | Self::UnclosedElement { pos, .. }
            | Self::InvalidSyntax { pos, .. }
            | Self::LexerError { pos } => *pos,
        }
    }
}
