//! Layered lexing: one lexer hands embedded regions to another.
//!
//! A [`LayeredLexer`] drives a *primary* token source (template markup) and
//! watches for activation tokens (`{{`, `{{#`, ...). When one appears, the
//! primary is probed ahead for the first terminator (`}}`), taking the
//! primary's own string and comment rules into account. The region between
//! opener and terminator is lexed by the *secondary* source (script), and the
//! primary resumes at the terminator. The merged stream is ordered by offset
//! and still covers every byte exactly once.
//!
//! ```text
//! <p title="{{ x + 1 }}">
//! primary   : L_ANGLE TAG_NAME WS ATTR_NAME EQ QUOTE OPEN ........ CLOSE QUOTE R_ANGLE
//! secondary :                                          WS IDENT WS PLUS WS INT WS
//! ```
//!
//! An opener without a terminator turns the rest of the input into a single
//! `UNTERMINATED_EMBED` token.

use std::collections::VecDeque;
use std::ops::Range;

use super::{text_range, LexState, Token, TokenSource};
use crate::syntax_kind::SyntaxKind;
use crate::token_set::TokenSet;

/// Which primary tokens open and close an embedded region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embedding {
    pub activation: TokenSet,
    pub terminators: TokenSet,
}

impl Embedding {
    /// Mustache tags in templates.
    pub const MUSTACHE: Embedding = Embedding {
        activation: TokenSet::new(&[
            SyntaxKind::OPEN,
            SyntaxKind::OPEN_UNESCAPED,
            SyntaxKind::OPEN_BLOCK,
            SyntaxKind::OPEN_ENDBLOCK,
            SyntaxKind::OPEN_INVERSE,
            SyntaxKind::OPEN_PARTIAL,
        ]),
        terminators: TokenSet::new(&[SyntaxKind::CLOSE, SyntaxKind::CLOSE_UNESCAPED]),
    };
}

#[derive(Debug, Clone)]
pub struct LayeredLexer<'s, P, S> {
    primary: P,
    secondary: S,
    embedding: Embedding,
    text: &'s str,
    end: usize,
    pending: VecDeque<Token>,
}

impl<'s, P, S> LayeredLexer<'s, P, S>
where
    P: TokenSource<'s> + Clone,
    S: TokenSource<'s>,
{
    /// Layer `secondary` into `primary` over the whole of `text`.
    pub fn new(primary: P, secondary: S, embedding: Embedding, text: &'s str) -> Self {
        let mut lexer = Self {
            primary,
            secondary,
            embedding,
            text,
            end: 0,
            pending: VecDeque::new(),
        };
        lexer.start(text, 0..text.len(), LexState::INITIAL);
        lexer
    }

    /// Lex the embedded region starting at `from`, whose primary state is
    /// `state`, and park the primary at its terminator.
    fn enter_embedded(&mut self, from: usize, state: LexState) {
        let terminators = self.embedding.terminators;
        let mut probe = self.primary.clone();
        probe.start(self.text, from..self.end, state);
        let boundary = probe
            .find(|t| terminators.contains(t.kind))
            .map(|t| t.start());

        match boundary {
            Some(boundary) => {
                log::trace!("embedded region {from}..{boundary}");
                self.secondary.start(self.text, from..boundary, LexState::INITIAL);
                self.pending.extend(self.secondary.by_ref());
                self.primary.start(self.text, boundary..self.end, state);
            }
            None => {
                log::trace!("unterminated embedded region from {from}");
                if from < self.end {
                    self.pending.push_back(Token {
                        kind: SyntaxKind::UNTERMINATED_EMBED,
                        range: text_range(from, self.end),
                        unterminated: true,
                    });
                }
                self.primary.start(self.text, self.end..self.end, state);
            }
        }
    }
}

impl<'s, P, S> Iterator for LayeredLexer<'s, P, S>
where
    P: TokenSource<'s> + Clone,
    S: TokenSource<'s>,
{
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if let Some(token) = self.pending.pop_front() {
            return Some(token);
        }
        let token = self.primary.next()?;
        if self.embedding.activation.contains(token.kind) {
            let state = self.primary.state();
            self.enter_embedded(token.end(), state);
        }
        Some(token)
    }
}

impl<'s, P, S> TokenSource<'s> for LayeredLexer<'s, P, S>
where
    P: TokenSource<'s> + Clone,
    S: TokenSource<'s>,
{
    fn start(&mut self, text: &'s str, range: Range<usize>, state: LexState) {
        self.text = text;
        self.end = range.end.min(text.len()).min(u32::MAX as usize);
        self.pending.clear();
        self.primary.start(text, range.clone(), state);
        if self.primary.is_embedding_state(state) {
            self.enter_embedded(range.start.min(self.end), state);
        }
    }

    /// The primary's state. Inside an embedded region this is the state just
    /// after the opener, which restarts the region correctly from any token
    /// boundary in it.
    fn state(&self) -> LexState {
        self.primary.state()
    }

    fn is_embedding_state(&self, state: LexState) -> bool {
        self.primary.is_embedding_state(state)
    }
}
