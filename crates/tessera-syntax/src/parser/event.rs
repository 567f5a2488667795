//! # Parser Events
//!
//! Events are the intermediate representation between parsing and tree building.
//! Instead of building the tree directly, the parser emits a **flat sequence**
//! of events that describe the tree structure.
//!
//! ## Why Events?
//!
//! This indirection provides several benefits:
//!
//! 1. **Decoupling**: Grammar code doesn't know about Rowan internals
//! 2. **Forward parent links**: Enables the "precede" pattern for left-recursion
//! 3. **Cheap backtracking**: Rolling back a speculative parse is a truncate
//!
//! ## Event Types
//!
//! ```text
//! Start(CALL_EXPR)         ← Begin a CALL_EXPR node
//!   Start(NAME_REF)
//!     Token(IDENT)
//!   Finish
//!   Start(ARG_LIST)
//!     Token(L_PAREN)
//!     Error("expected closing parenthesis", Empty)
//!   Finish
//! Finish                   ← End the CALL_EXPR node
//! ```
//!
//! The Sink processes these in order, maintaining a stack of open nodes.
//! Start pushes, Finish pops. Error events become [`ParseError`]s whose range
//! is computed from the sink's position.
//!
//! [`ParseError`]: crate::ParseError
//!
//! ## Forward Parent Links
//!
//! The `forward_parent` field in `Start` handles cases where we need to wrap
//! an already-parsed node. Instead of restructuring the event list, we store
//! a link that says "when you process me, also process that other Start first."

use crate::syntax_kind::SyntaxKind;

/// Which part of the tree a diagnostic covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSpan {
    /// Zero-width, at the end of the last emitted token.
    Empty,
    /// The innermost open node, from its start to here.
    Node,
    /// The token emitted just before the error.
    LastToken,
}

/// An event emitted by the parser during tree construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Begin a new composite node.
    ///
    /// If `forward_parent` is set, it points to another `Start` event that
    /// becomes this node's parent. The Sink follows these links to build the
    /// correct nesting structure.
    Start {
        kind: SyntaxKind,
        forward_parent: Option<usize>,
    },

    /// Add the next lexer token to the current node, as `kind`.
    ///
    /// The kind is usually the lexer's, but can differ for contextual
    /// keywords (`extends` is lexed as an identifier).
    Token { kind: SyntaxKind },

    /// Finish the current node.
    Finish,

    /// Record a diagnostic.
    Error { message: String, span: ErrorSpan },

    /// A placeholder that will be replaced.
    ///
    /// When `parser.start()` is called, a `Placeholder` is pushed. Later,
    /// `marker.complete()` replaces it with a real `Start`, or
    /// `marker.abandon()` leaves it (the Sink ignores placeholders).
    Placeholder,
}

impl Event {
    /// Create a start event with no forward parent.
    pub fn start(kind: SyntaxKind) -> Self {
        Event::Start {
            kind,
            forward_parent: None,
        }
    }

    pub fn token(kind: SyntaxKind) -> Self {
        Event::Token { kind }
    }

    pub fn error(message: impl Into<String>, span: ErrorSpan) -> Self {
        Event::Error {
            message: message.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_start_creation() {
        let event = Event::start(SyntaxKind::BLOCK);
        assert_eq!(
            event,
            Event::Start {
                kind: SyntaxKind::BLOCK,
                forward_parent: None
            }
        );
    }

    #[test]
    fn event_error_creation() {
        let event = Event::error("expected ';'", ErrorSpan::Empty);
        assert_eq!(
            event,
            Event::Error {
                message: "expected ';'".to_string(),
                span: ErrorSpan::Empty
            }
        );
    }
}
