use darkdom_parser::ParseError;
use std::fmt::Display;
use thiserror::Error;

pub type DarkResult<T> = Result<T, DarkError>;

/// Errors surfaced by the engine.
///
/// Operating on an id that has no registered guard is not an error; those
/// calls are silent no-ops.
#[derive(Error, Debug)]
pub enum DarkError {
    #[error("Markup error: {0}")]
    Parse(#[from] ParseError),

    #[error("Update handler for '{subject}' failed: {message}")]
    Handler { subject: String, message: String },

    #[error("Script for '{id}' failed: {message}")]
    Script { id: String, message: String },

    #[error("Invalid update subject '{0}'")]
    InvalidSubject(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DarkError {
    pub fn handler(subject: impl Display, message: impl Into<String>) -> Self {
        DarkError::Handler {
            subject: subject.to_string(),
            message: message.into(),
        }
    }

    pub fn script(id: impl Into<String>, message: impl Into<String>) -> Self {
        DarkError::Script {
            id: id.into(),
            message: message.into(),
        }
    }
}
