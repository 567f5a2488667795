//! Error types.
//!
//! Syntax errors in the input are never Rust errors: they are [`ParseError`]
//! values collected next to the tree. [`BuilderError`] is the other kind, a
//! bug in a grammar rule, and is raised as a panic.

use std::panic::Location;

use rowan::TextRange;
use thiserror::Error;

/// A diagnostic produced while parsing. Does not abort the parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[error("{message} at {range:?}")]
pub struct ParseError {
    pub message: String,
    pub range: TextRange,
}

impl ParseError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Misuse of the marker API by a grammar rule.
///
/// `location` is where the offending marker was started, which names the
/// production at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("marker started at {location} was rolled back after a node was committed past it")]
    RollbackAfterCommit { location: &'static Location<'static> },

    #[error("marker started at {location} was abandoned after a node was committed past it")]
    AbandonAfterCommit { location: &'static Location<'static> },

    #[error("marker started at {location} was dropped without being completed or abandoned")]
    Unfinished { location: &'static Location<'static> },

    #[error("unbalanced event stream: {0}")]
    Unbalanced(&'static str),
}

/// A language name that [`Language::from_str`](crate::Language) does not know.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}' (expected script, template or makefile)")]
pub struct UnknownLanguage(pub String);
