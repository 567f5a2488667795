//! # Parser - Event-Based Tree Construction
//!
//! This module implements the token stream and tree builder that grammar
//! rules drive, using the **event-based** architecture from rust-analyzer.
//!
//! ## Why Event-Based Parsing?
//!
//! Traditional recursive descent parsers build the tree directly during parsing.
//! This has problems:
//!
//! 1. **Backtracking is expensive** when you've already built tree nodes
//! 2. **Error recovery is tricky** when partially-built nodes exist
//! 3. **Left recursion** needs the parent before the child is known
//!
//! Instead, we emit a flat list of **events** ([`Event`]) that describe the
//! tree structure. The [`Sink`] then builds the actual Rowan tree from events.
//!
//! ## Significant Tokens and Trivia
//!
//! Lookahead (`current`, `nth`, `at`, ...) only ever sees *significant*
//! tokens. Which kinds are trivia is a per-language [`TokenSet`] handed to
//! [`Parser::new`]; newlines are trivia in scripts but significant in
//! Makefiles. Skipped trivia is not lost: it is flushed into the innermost
//! open node right before the next significant token is bumped, or before a
//! new marker starts. Node ranges therefore never begin with trivia.
//!
//! ## The Marker System
//!
//! When you call `parser.start()`, you get a [`Marker`]. This marker **must**
//! be either:
//!
//! - Completed with `marker.complete(p, KIND)` → emits Start+Finish
//! - Turned into an error node with `marker.error(p, "message")`
//! - Abandoned with `marker.abandon(p)` → no node is created
//! - Rolled back with `marker.rollback(p)` → the token position and event
//!   stream are restored to where the marker started
//!
//! If you drop a marker without doing any of these, **the program panics**.
//! Abandoning or rolling back after a node was committed past the marker is a
//! grammar bug and panics as well, with a [`BuilderError`] naming the source
//! location that started the marker.
//!
//! ```ignore
//! let m = p.start();
//! p.bump();
//! m.complete(p, SyntaxKind::NAME_REF);
//! ```
//!
//! ## Error Recovery
//!
//! - [`Parser::error`] records a zero-width diagnostic
//! - [`Parser::err_recover`] skips up to a recovery set, possibly nothing
//! - [`Parser::err_and_skip`] always skips at least one token
//!
//! Skipped tokens are wrapped in an `ERROR` node that carries the message.
//!
//! ## Module Structure
//!
//! - [`event`] - The Event enum
//! - [`sink`] - Converts events to a Rowan green tree
//! - [`grammar`] - Grammar rules for every language

pub mod event;
pub mod grammar;
pub mod sink;

use std::panic::Location;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::BuilderError;
use crate::lexer::Token;
use crate::syntax_kind::SyntaxKind;
use crate::token_set::TokenSet;
use event::{ErrorSpan, Event};

pub use sink::Sink;

/// Nesting limit used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Cooperative cancellation flag, shared between the parse and whoever wants
/// to stop it.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything the parser produced, ready for the [`Sink`].
#[derive(Debug)]
pub struct ParserOutput {
    pub events: Vec<Event>,
    pub cancelled: bool,
}

/// The parser state machine.
///
/// Holds the token stream, current position, and accumulated events.
/// Grammar functions receive `&mut Parser` and use its methods to:
///
/// - Inspect tokens: `current()`, `nth()`, `at()`, `at_ts()`, `at_end()`
/// - Consume tokens: `bump()`, `eat()`, `expect()`
/// - Build structure: `start()` → `Marker` → `complete()`/`error()`
/// - Recover: `error()`, `err_recover()`, `err_and_skip()`
pub struct Parser<'t, 's> {
    text: &'s str,
    tokens: &'t [Token],
    /// Indices of the significant tokens in `tokens`.
    significant: Vec<usize>,
    /// Position in `significant`.
    pos: usize,
    /// Next raw token to emit.
    raw_pos: usize,
    events: Vec<Event>,
    /// Number of nodes committed so far.
    commits: usize,
    depth: usize,
    max_depth: usize,
    cancel: Option<Cancellation>,
    cancelled: bool,
}

impl<'t, 's> Parser<'t, 's> {
    /// Create a parser over `tokens`, which must be the lexed form of `text`.
    pub fn new(text: &'s str, tokens: &'t [Token], trivia: TokenSet) -> Self {
        let significant = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !trivia.contains(t.kind))
            .map(|(i, _)| i)
            .collect();
        Self {
            text,
            tokens,
            significant,
            pos: 0,
            raw_pos: 0,
            events: Vec::new(),
            commits: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            cancel: None,
            cancelled: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cancellation(mut self, cancel: Option<Cancellation>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Hand the events over for tree building.
    pub fn finish(self) -> ParserOutput {
        ParserOutput {
            events: self.events,
            cancelled: self.cancelled,
        }
    }

    /// Start a new node and return a marker.
    ///
    /// Pending trivia goes to the enclosing node first, except for the root
    /// marker which has no enclosing node.
    #[track_caller]
    pub fn start(&mut self) -> Marker {
        if !self.cancelled
            && let Some(cancel) = &self.cancel
            && cancel.is_cancelled()
        {
            log::debug!("parse cancelled at token {}", self.pos);
            self.cancelled = true;
        }
        if !self.events.is_empty() {
            self.flush_trivia();
        }
        let pos = self.events.len();
        self.events.push(Event::Placeholder);
        Marker::new(pos, self, Location::caller())
    }

    /// Current token kind, or EOF if past end.
    pub fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    /// Look ahead n significant tokens.
    pub fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_token(n).map_or(SyntaxKind::EOF, |t| t.kind)
    }

    fn nth_token(&self, n: usize) -> Option<&Token> {
        if self.cancelled {
            return None;
        }
        self.significant
            .get(self.pos + n)
            .map(|&raw| &self.tokens[raw])
    }

    /// Check if at end of input (or cancelled).
    pub fn at_end(&self) -> bool {
        self.current() == SyntaxKind::EOF
    }

    /// Check if current token is of given kind.
    pub fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub fn nth_at(&self, n: usize, kind: SyntaxKind) -> bool {
        self.nth(n) == kind
    }

    /// Check if current token is in the set.
    pub fn at_ts(&self, set: TokenSet) -> bool {
        set.contains(self.current())
    }

    /// An identifier spelled `kw`, for keywords that are only keywords in
    /// some positions.
    pub fn at_contextual_kw(&self, kw: &str) -> bool {
        self.at(SyntaxKind::IDENT) && self.current_text() == kw
    }

    /// Get the text of the current token.
    pub fn current_text(&self) -> &'s str {
        self.nth_text(0)
    }

    pub fn nth_text(&self, n: usize) -> &'s str {
        let text = self.text;
        self.nth_token(n).map_or("", |t| &text[t.range])
    }

    /// Whether a line break separates the current token from the previous
    /// significant one. True at the start of input.
    pub fn has_newline_before(&self) -> bool {
        if self.pos == 0 {
            return true;
        }
        let from = self.significant[self.pos - 1] + 1;
        let to = self
            .significant
            .get(self.pos)
            .copied()
            .unwrap_or(self.tokens.len());
        self.tokens[from..to].iter().any(|t| {
            t.kind == SyntaxKind::NEWLINE || self.text[t.range].contains(['\n', '\r'])
        })
    }

    /// Whether any trivia separates the current token from the previous
    /// significant one.
    pub fn has_trivia_before(&self) -> bool {
        if self.pos == 0 || self.cancelled {
            return false;
        }
        let prev = self.significant[self.pos - 1];
        self.significant
            .get(self.pos)
            .map_or(prev + 1 < self.tokens.len(), |&next| next > prev + 1)
    }

    /// Position among significant tokens, for progress checks.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Consume the current token if it matches.
    pub fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume `kind` or record "expected ..." using its display name.
    pub fn expect(&mut self, kind: SyntaxKind) -> bool {
        self.expect_with(kind, &format!("expected {}", kind.display_name()))
    }

    pub fn expect_with(&mut self, kind: SyntaxKind, message: &str) -> bool {
        if self.eat(kind) {
            return true;
        }
        self.error(message);
        false
    }

    /// Consume the current token unconditionally. No-op at the end.
    pub fn bump(&mut self) {
        let kind = self.current();
        self.bump_remap(kind);
    }

    /// Consume the current token, recording it in the tree as `kind`.
    pub fn bump_remap(&mut self, kind: SyntaxKind) {
        if self.at_end() {
            return;
        }
        self.flush_trivia();
        let raw = self.significant[self.pos];
        self.emit_raw(raw, kind);
        self.pos += 1;
    }

    /// Record a zero-width diagnostic at the current position.
    pub fn error(&mut self, message: &str) {
        if !self.cancelled {
            log::trace!("parse error at token {}: {message}", self.pos);
            self.events.push(Event::error(message, ErrorSpan::Empty));
        }
    }

    /// Report `message` and skip to the next token in `recovery`, wrapping
    /// whatever was skipped in an `ERROR` node. Skips nothing if already at a
    /// recovery token or the end.
    pub fn err_recover(&mut self, message: &str, recovery: TokenSet) {
        if self.at_end() || self.at_ts(recovery) {
            self.error(message);
            return;
        }
        self.skip_to_error(message, recovery);
    }

    /// Report `message`, skip at least one token and then on to the next
    /// token in `recovery`. Guarantees progress unless at the end.
    pub fn err_and_skip(&mut self, message: &str, recovery: TokenSet) {
        if self.at_end() {
            self.error(message);
            return;
        }
        self.skip_to_error(message, recovery);
    }

    fn skip_to_error(&mut self, message: &str, recovery: TokenSet) {
        let m = self.start();
        self.bump();
        while !self.at_end() && !self.at_ts(recovery) {
            self.bump();
        }
        log::trace!("recovered at token {}", self.pos);
        m.error(self, message);
    }

    /// Enter one level of nesting. Returns false when the limit is reached;
    /// the caller must still call [`exit`](Self::exit).
    pub fn enter(&mut self) -> bool {
        self.depth += 1;
        self.depth <= self.max_depth
    }

    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Emit every token not consumed yet into the current node: trailing
    /// trivia, or everything left after a cancellation.
    pub fn drain_remaining(&mut self) {
        while self.raw_pos < self.tokens.len() {
            let kind = self.tokens[self.raw_pos].kind;
            self.emit_raw(self.raw_pos, kind);
        }
        self.pos = self.significant.len();
    }

    fn flush_trivia(&mut self) {
        let until = self
            .significant
            .get(self.pos)
            .copied()
            .unwrap_or(self.tokens.len());
        while self.raw_pos < until {
            let kind = self.tokens[self.raw_pos].kind;
            self.emit_raw(self.raw_pos, kind);
        }
    }

    fn emit_raw(&mut self, raw: usize, kind: SyntaxKind) {
        let token = self.tokens[raw];
        self.events.push(Event::token(kind));
        self.raw_pos = raw + 1;
        if token.unterminated && !self.cancelled {
            self.events
                .push(Event::error(unterminated_message(token.kind), ErrorSpan::LastToken));
        }
    }
}

fn unterminated_message(kind: SyntaxKind) -> &'static str {
    match kind {
        SyntaxKind::STRING => "unterminated string",
        SyntaxKind::COMMENT => "unterminated comment",
        SyntaxKind::UNTERMINATED_EMBED => "unterminated embedded expression",
        SyntaxKind::VAR_REF => "unterminated variable reference",
        _ => "unterminated token",
    }
}

/// A marker for a node being constructed.
///
/// When you call `parser.start()`, a `Placeholder` event is pushed and you get
/// a `Marker` pointing to it, along with enough of the parser's position to
/// roll back to it.
///
/// ## The Must-Use Contract
///
/// The `#[must_use]` attribute and the `Drop` impl together enforce that
/// every marker is completed, turned into an error, abandoned, or rolled back.
/// Dropping it otherwise panics. This catches bugs at runtime rather than
/// producing corrupt trees.
#[must_use = "Markers must be completed or abandoned, dropping them is a bug"]
pub struct Marker {
    /// Position in the events vector where our Placeholder lives
    pos: usize,
    token_pos: usize,
    raw_pos: usize,
    /// Parser commit count when the marker started
    commits: usize,
    /// Start event of the node this marker precedes
    child: Option<usize>,
    location: &'static Location<'static>,
    /// Tracks whether the marker was consumed
    done: bool,
}

impl Marker {
    fn new(pos: usize, p: &Parser<'_, '_>, location: &'static Location<'static>) -> Self {
        Self {
            pos,
            token_pos: p.pos,
            raw_pos: p.raw_pos,
            commits: p.commits,
            child: None,
            location,
            done: false,
        }
    }

    /// Complete this marker, creating a node of the given kind.
    ///
    /// This:
    /// 1. Replaces the `Placeholder` at our position with `Start { kind, ... }`
    /// 2. Pushes a `Finish` event
    /// 3. Returns a `CompletedMarker` for potential `precede()` calls
    pub fn complete(mut self, p: &mut Parser<'_, '_>, kind: SyntaxKind) -> CompletedMarker {
        self.done = true;
        let event_at_pos = &mut p.events[self.pos];
        debug_assert!(matches!(event_at_pos, Event::Placeholder));
        *event_at_pos = Event::start(kind);
        p.events.push(Event::Finish);
        p.commits += 1;
        CompletedMarker {
            pos: self.pos,
            kind,
        }
    }

    /// Commit an `ERROR` node carrying `message`. The node may be empty.
    pub fn error(mut self, p: &mut Parser<'_, '_>, message: &str) -> CompletedMarker {
        self.done = true;
        p.events[self.pos] = Event::start(SyntaxKind::ERROR);
        if !p.cancelled {
            p.events.push(Event::error(message, ErrorSpan::Node));
        }
        p.events.push(Event::Finish);
        p.commits += 1;
        CompletedMarker {
            pos: self.pos,
            kind: SyntaxKind::ERROR,
        }
    }

    /// Abandon this marker without creating a node. Tokens consumed since the
    /// marker started stay where they are, in the enclosing node.
    ///
    /// # Panics
    ///
    /// If a node was committed after this marker started.
    pub fn abandon(mut self, p: &mut Parser<'_, '_>) {
        self.done = true;
        if p.commits != self.commits {
            panic!(
                "{}",
                BuilderError::AbandonAfterCommit {
                    location: self.location
                }
            );
        }
        self.unlink_child(p);
        if self.pos == p.events.len() - 1 {
            p.events.pop();
        }
    }

    /// Undo everything since the marker started: consumed tokens, events and
    /// diagnostics.
    ///
    /// # Panics
    ///
    /// If a node was committed after this marker started.
    pub fn rollback(mut self, p: &mut Parser<'_, '_>) {
        self.done = true;
        if p.commits != self.commits {
            panic!(
                "{}",
                BuilderError::RollbackAfterCommit {
                    location: self.location
                }
            );
        }
        self.unlink_child(p);
        p.events.truncate(self.pos);
        p.pos = self.token_pos;
        p.raw_pos = self.raw_pos;
    }

    fn unlink_child(&self, p: &mut Parser<'_, '_>) {
        if let Some(child) = self.child
            && let Event::Start { forward_parent, .. } = &mut p.events[child]
        {
            *forward_parent = None;
        }
    }
}

impl Drop for Marker {
    fn drop(&mut self) {
        if !self.done && !std::thread::panicking() {
            panic!(
                "{}",
                BuilderError::Unfinished {
                    location: self.location
                }
            );
        }
    }
}

/// A marker for a node that has been completed.
///
/// The only thing you can do with a `CompletedMarker` is call `precede()`
/// to wrap the completed node in a new parent. This is how binary
/// expressions are built after their left operand:
///
/// ```ignore
/// let lhs = atom(p);
/// if p.at(SyntaxKind::PLUS) {
///     let m = lhs.precede(p);
///     p.bump();
///     atom(p);
///     m.complete(p, SyntaxKind::BIN_EXPR);
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CompletedMarker {
    /// Position of the Start event for this completed node
    pos: usize,
    kind: SyntaxKind,
}

impl CompletedMarker {
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Create a new parent node that will contain this node.
    #[track_caller]
    pub fn precede(self, p: &mut Parser<'_, '_>) -> Marker {
        let new_pos = p.events.len();
        p.events.push(Event::Placeholder);

        // Update the original Start event to point to this new parent
        if let Event::Start { forward_parent, .. } = &mut p.events[self.pos] {
            *forward_parent = Some(new_pos);
        }

        let mut marker = Marker::new(new_pos, p, Location::caller());
        marker.child = Some(self.pos);
        marker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::lexer::{script::ScriptRules, Lexer};
    use crate::syntax_kind::SyntaxNode;
    use pretty_assertions::assert_eq;

    const TRIVIA: TokenSet = TokenSet::new(&[
        SyntaxKind::WHITESPACE,
        SyntaxKind::NEWLINE,
        SyntaxKind::COMMENT,
    ]);

    fn lex(text: &str) -> Vec<Token> {
        Lexer::new(ScriptRules, text).collect()
    }

    /// Run `rule` inside a ROOT node and build the tree.
    fn build(text: &str, rule: impl FnOnce(&mut Parser<'_, '_>)) -> (SyntaxNode, Vec<ParseError>) {
        let tokens = lex(text);
        let mut p = Parser::new(text, &tokens, TRIVIA);
        let root = p.start();
        rule(&mut p);
        p.drain_remaining();
        root.complete(&mut p, SyntaxKind::ROOT);
        let (green, errors) = Sink::new(text, &tokens, p.finish().events).finish();
        (SyntaxNode::new_root(green), errors)
    }

    fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
        payload
            .downcast_ref::<String>()
            .cloned()
            .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
            .unwrap_or_default()
    }

    #[test]
    fn lookahead_skips_trivia() {
        let text = "a /* c */ b\n c";
        let tokens = lex(text);
        let p = Parser::new(text, &tokens, TRIVIA);
        assert_eq!(p.current(), SyntaxKind::IDENT);
        assert_eq!(p.nth_text(1), "b");
        assert_eq!(p.nth_text(2), "c");
        assert_eq!(p.nth(3), SyntaxKind::EOF);
    }

    #[test]
    fn trivia_goes_to_the_enclosing_node() {
        let (tree, _) = build("  a  ", |p| {
            let m = p.start();
            p.bump();
            m.complete(p, SyntaxKind::NAME_REF);
        });
        let name = tree.first_child().unwrap();
        assert_eq!(name.text().to_string(), "a");
        assert_eq!(tree.text().to_string(), "  a  ");
    }

    #[test]
    fn trivia_detection() {
        let text = "a b(c";
        let tokens = lex(text);
        let mut p = Parser::new(text, &tokens, TRIVIA);
        let m = p.start();
        assert!(!p.has_trivia_before());
        p.bump();
        assert!(p.has_trivia_before());
        p.bump();
        assert!(!p.has_trivia_before());
        m.rollback(&mut p);
    }

    #[test]
    fn newline_detection() {
        let text = "a b\nc /* x\n */ d";
        let tokens = lex(text);
        let mut p = Parser::new(text, &tokens, TRIVIA);
        let m = p.start();
        assert!(p.has_newline_before());
        p.bump();
        assert!(!p.has_newline_before());
        p.bump();
        assert!(p.has_newline_before());
        p.bump();
        // the line break hides inside a block comment
        assert!(p.has_newline_before());
        p.bump();
        m.complete(&mut p, SyntaxKind::ROOT);
    }

    #[test]
    fn expect_reports_display_name() {
        let (_, errors) = build("a", |p| {
            p.bump();
            p.expect(SyntaxKind::R_PAREN);
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expected closing parenthesis");
        assert_eq!(errors[0].range, rowan::TextRange::empty(1.into()));
    }

    #[test]
    fn bump_remap_changes_kind() {
        let (tree, _) = build("extends", |p| p.bump_remap(SyntaxKind::EXTENDS_KW));
        let token = tree.first_token().unwrap();
        assert_eq!(token.kind(), SyntaxKind::EXTENDS_KW);
    }

    #[test]
    fn marker_must_be_completed() {
        let result = std::panic::catch_unwind(|| {
            let tokens = lex("test");
            let mut parser = Parser::new("test", &tokens, TRIVIA);
            let _marker = parser.start();
            // Marker dropped without completion - should panic
        });
        let message = panic_message(result.unwrap_err());
        assert!(message.contains("dropped without being completed"));
        assert!(message.contains("parser/mod.rs"));
    }

    #[test]
    fn marker_can_be_abandoned() {
        let (tree, _) = build("a", |p| {
            let m = p.start();
            p.bump();
            m.abandon(p);
        });
        assert_eq!(tree.children().count(), 0);
        assert_eq!(tree.text().to_string(), "a");
    }

    #[test]
    fn rollback_restores_position() {
        let (tree, errors) = build("a b", |p| {
            let m = p.start();
            p.bump();
            p.error("speculation failed");
            m.rollback(p);
            assert_eq!(p.current_text(), "a");
            let m = p.start();
            p.bump();
            p.bump();
            m.complete(p, SyntaxKind::EXPR_STMT);
        });
        assert!(errors.is_empty());
        assert_eq!(tree.first_child().unwrap().text().to_string(), "a b");
    }

    #[test]
    fn rollback_after_commit_panics() {
        let result = std::panic::catch_unwind(|| {
            build("a b", |p| {
                let outer = p.start();
                let inner = p.start();
                p.bump();
                inner.complete(p, SyntaxKind::NAME_REF);
                outer.rollback(p);
            })
        });
        let message = panic_message(result.unwrap_err());
        assert!(message.contains("rolled back after a node was committed"));
    }

    #[test]
    fn abandon_after_commit_panics() {
        let result = std::panic::catch_unwind(|| {
            build("a", |p| {
                let outer = p.start();
                let inner = p.start();
                p.bump();
                inner.complete(p, SyntaxKind::NAME_REF);
                outer.abandon(p);
            })
        });
        assert!(panic_message(result.unwrap_err()).contains("abandoned"));
    }

    #[test]
    fn precede_wraps_completed_node() {
        let (tree, _) = build("a + b", |p| {
            let m = p.start();
            p.bump();
            let lhs = m.complete(p, SyntaxKind::NAME_REF);
            let bin = lhs.precede(p);
            p.bump();
            let m = p.start();
            p.bump();
            m.complete(p, SyntaxKind::NAME_REF);
            bin.complete(p, SyntaxKind::BIN_EXPR);
        });
        let bin = tree.first_child().unwrap();
        assert_eq!(bin.kind(), SyntaxKind::BIN_EXPR);
        assert_eq!(bin.text().to_string(), "a + b");
        assert_eq!(bin.children().count(), 2);
    }

    #[test]
    fn rolled_back_precede_leaves_child_intact() {
        let (tree, _) = build("a", |p| {
            let m = p.start();
            p.bump();
            let lhs = m.complete(p, SyntaxKind::NAME_REF);
            let wrapper = lhs.precede(p);
            wrapper.rollback(p);
        });
        assert_eq!(tree.first_child().unwrap().kind(), SyntaxKind::NAME_REF);
    }

    #[test]
    fn err_recover_wraps_skipped_tokens() {
        let recovery = TokenSet::new(&[SyntaxKind::SEMICOLON]);
        let (tree, errors) = build("x y ; z", |p| {
            p.err_recover("expected something", recovery);
            assert!(p.at(SyntaxKind::SEMICOLON));
            // nothing left to skip
            p.err_recover("again", recovery);
            p.bump();
            p.bump();
        });
        let error = tree.first_child().unwrap();
        assert_eq!(error.kind(), SyntaxKind::ERROR);
        assert_eq!(error.text().to_string(), "x y");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].range, error.text_range());
        assert!(errors[1].range.is_empty());
    }

    #[test]
    fn err_and_skip_always_progresses() {
        let recovery = TokenSet::new(&[SyntaxKind::SEMICOLON]);
        let (tree, _) = build("; ;", |p| {
            p.err_and_skip("unexpected", recovery);
            assert!(p.at(SyntaxKind::SEMICOLON));
            p.bump();
        });
        assert_eq!(tree.first_child().unwrap().text().to_string(), ";");
    }

    #[test]
    fn unterminated_token_reports_its_range() {
        let (_, errors) = build("x \"open", |p| {
            p.bump();
            p.bump();
        });
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "unterminated string");
        assert_eq!(errors[0].range, rowan::TextRange::new(2.into(), 7.into()));
    }

    #[test]
    fn depth_limit() {
        let tokens = lex("");
        let mut p = Parser::new("", &tokens, TRIVIA).with_max_depth(2);
        assert!(p.enter());
        assert!(p.enter());
        assert!(!p.enter());
        p.exit();
        p.exit();
        p.exit();
        assert!(p.enter());
    }

    #[test]
    fn cancellation_reports_eof_and_keeps_text() {
        let cancel = Cancellation::new();
        let text = "a b c";
        let tokens = lex(text);
        let mut p = Parser::new(text, &tokens, TRIVIA).with_cancellation(Some(cancel.clone()));
        let root = p.start();
        p.bump();
        cancel.cancel();
        let m = p.start();
        assert!(p.at_end());
        p.expect(SyntaxKind::IDENT);
        m.complete(&mut p, SyntaxKind::EXPR_STMT);
        p.drain_remaining();
        root.complete(&mut p, SyntaxKind::ROOT);
        let output = p.finish();
        assert!(output.cancelled);
        let (green, errors) = Sink::new(text, &tokens, output.events).finish();
        assert!(errors.is_empty());
        assert_eq!(SyntaxNode::new_root(green).text().to_string(), text);
    }
}
