//! # Lexer - Tokenizing Source Text
//!
//! This module provides the first stage of parsing: breaking source text into
//! tokens. Each language contributes a set of [`LexRules`] (mostly built on the
//! [Logos] lexer generator); the generic [`Lexer`] driver turns those rules into
//! a lazy, restartable stream of [`Token`]s.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! The most important property of this lexer is that **every byte in the input
//! appears in exactly one token**. We never skip or discard characters. Tokens
//! are contiguous and non-overlapping, so concatenating them gives back the
//! original:
//!
//! ```
//! use tessera_syntax::lexer::{Lexer, script::ScriptRules};
//!
//! let input = "let x = 1; // done\n";
//! let tokens: Vec<_> = Lexer::new(ScriptRules, input).collect();
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text(input)).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! When no rule matches, the driver emits a single `BAD_CHARACTER` token for
//! one character and carries on. Lexing never fails.
//!
//! ## Lexer State
//!
//! Context-sensitive languages (markup with embedded mustaches, Makefiles with
//! recipe lines) thread a small [`LexState`] from token to token. The state at
//! any token boundary can be handed back to [`TokenSource::start`] to resume
//! lexing from that point, which is what layered lexing and editor relexing
//! build on.
//!
//! ## Public API
//!
//! - [`Lexer`] - The generic driver, an `Iterator<Item = Token>`
//! - [`TokenSource`] - Restartable token stream, implemented by [`Lexer`] and
//!   [`layered::LayeredLexer`]
//! - [`LanguageRules`] - Enum dispatch over the per-language rule sets

pub mod layered;
pub mod makefile;
pub mod script;
pub mod template;

use std::ops::Range;

use rowan::{TextRange, TextSize};

use crate::syntax_kind::SyntaxKind;

use makefile::MakefileRules;
use script::ScriptRules;
use template::TemplateRules;

/// Opaque lexer state threaded between tokens. Zero is the initial state of
/// every language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LexState(pub u16);

impl LexState {
    pub const INITIAL: LexState = LexState(0);
}

/// A lexed token: its kind and the range it covers in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: SyntaxKind,
    pub range: TextRange,
    /// Set on strings, comments and embedded regions that ran into the end of
    /// input before their closing delimiter.
    pub unterminated: bool,
}

impl Token {
    pub fn new(kind: SyntaxKind, range: TextRange) -> Self {
        Self {
            kind,
            range,
            unterminated: false,
        }
    }

    /// The slice of `source` this token covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.range]
    }

    pub fn start(&self) -> usize {
        self.range.start().into()
    }

    pub fn end(&self) -> usize {
        self.range.end().into()
    }
}

/// One classification produced by a [`LexRules`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexed {
    pub kind: SyntaxKind,
    /// Length in bytes; must be non-zero and end on a char boundary.
    pub len: usize,
    /// State after this token.
    pub state: LexState,
    pub unterminated: bool,
}

impl Lexed {
    pub fn new(kind: SyntaxKind, len: usize, state: LexState) -> Self {
        Self {
            kind,
            len,
            state,
            unterminated: false,
        }
    }

    pub fn unterminated(mut self, unterminated: bool) -> Self {
        self.unterminated = unterminated;
        self
    }
}

/// Token rules of one language.
///
/// `lex` looks at the start of `rest` only and classifies exactly one token.
/// Returning `None` means no rule matched; the driver then produces a
/// `BAD_CHARACTER`. `rest` always ends at the lexer's range end, so rules can
/// never run past a boundary the caller imposed.
pub trait LexRules {
    fn lex(&self, rest: &str, state: LexState) -> Option<Lexed>;

    /// Whether `state` lies inside a region another grammar may take over.
    fn is_embedding_state(&self, _state: LexState) -> bool {
        false
    }
}

/// A lazy token stream that can be restarted at any previously observed state
/// boundary.
pub trait TokenSource<'s>: Iterator<Item = Token> {
    /// Restart lexing `text[range]` in `state`.
    fn start(&mut self, text: &'s str, range: Range<usize>, state: LexState);

    /// State at the current token boundary.
    fn state(&self) -> LexState;

    fn is_embedding_state(&self, state: LexState) -> bool;
}

/// The generic lexer driver.
#[derive(Debug, Clone)]
pub struct Lexer<'s, R> {
    rules: R,
    text: &'s str,
    pos: usize,
    end: usize,
    state: LexState,
}

impl<'s, R: LexRules> Lexer<'s, R> {
    /// Lex the whole of `text` from the initial state.
    pub fn new(rules: R, text: &'s str) -> Self {
        let mut lexer = Self {
            rules,
            text,
            pos: 0,
            end: 0,
            state: LexState::INITIAL,
        };
        lexer.start(text, 0..text.len(), LexState::INITIAL);
        lexer
    }

    /// Byte offset of the next token.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }
}

impl<R: LexRules> Iterator for Lexer<'_, R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.pos >= self.end {
            return None;
        }

        let rest = &self.text[self.pos..self.end];
        let (kind, len, state, unterminated) = match self.rules.lex(rest, self.state) {
            Some(lexed)
                if lexed.len > 0 && lexed.len <= rest.len() && rest.is_char_boundary(lexed.len) =>
            {
                (lexed.kind, lexed.len, lexed.state, lexed.unterminated)
            }
            _ => {
                let len = rest.chars().next().map_or(1, char::len_utf8);
                (SyntaxKind::BAD_CHARACTER, len, self.state, false)
            }
        };

        let start = self.pos;
        self.pos += len;
        self.state = state;

        Some(Token {
            kind,
            range: text_range(start, self.pos),
            unterminated,
        })
    }
}

impl<'s, R: LexRules> TokenSource<'s> for Lexer<'s, R> {
    fn start(&mut self, text: &'s str, range: Range<usize>, state: LexState) {
        // Rowan offsets are u32; anything beyond is left unlexed.
        let end = snap_to_char_boundary(text, range.end.min(text.len()).min(u32::MAX as usize));
        let start = snap_to_char_boundary(text, range.start.min(end));
        self.text = text;
        self.pos = start;
        self.end = end;
        self.state = state;
    }

    fn state(&self) -> LexState {
        self.state
    }

    fn is_embedding_state(&self, state: LexState) -> bool {
        self.rules.is_embedding_state(state)
    }
}

/// Drain a token source, returning its tokens and the terminal state.
pub fn collect_tokens<'s, T: TokenSource<'s>>(mut source: T) -> (Vec<Token>, LexState) {
    let tokens: Vec<Token> = source.by_ref().collect();
    (tokens, source.state())
}

/// Enum dispatch over every language's rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageRules {
    Script(ScriptRules),
    Template(TemplateRules),
    Makefile(MakefileRules),
}

impl LexRules for LanguageRules {
    fn lex(&self, rest: &str, state: LexState) -> Option<Lexed> {
        match self {
            LanguageRules::Script(rules) => rules.lex(rest, state),
            LanguageRules::Template(rules) => rules.lex(rest, state),
            LanguageRules::Makefile(rules) => rules.lex(rest, state),
        }
    }

    fn is_embedding_state(&self, state: LexState) -> bool {
        match self {
            LanguageRules::Script(rules) => rules.is_embedding_state(state),
            LanguageRules::Template(rules) => rules.is_embedding_state(state),
            LanguageRules::Makefile(rules) => rules.is_embedding_state(state),
        }
    }
}

pub(crate) fn text_range(start: usize, end: usize) -> TextRange {
    // Callers stay within a range clamped to u32 in `start`.
    TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32))
}

fn snap_to_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Length of the first char of `s`, or 0 for an empty string.
pub(crate) fn first_char_len(s: &str) -> usize {
    s.chars().next().map_or(0, char::len_utf8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Rules that only understand the letter `a`.
    #[derive(Debug, Clone, Copy)]
    struct OnlyA;

    impl LexRules for OnlyA {
        fn lex(&self, rest: &str, state: LexState) -> Option<Lexed> {
            let len = rest.bytes().take_while(|b| *b == b'a').count();
            (len > 0).then(|| Lexed::new(SyntaxKind::IDENT, len, LexState(state.0 + 1)))
        }
    }

    fn kinds(tokens: &[Token]) -> Vec<SyntaxKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert_eq!(Lexer::new(OnlyA, "").count(), 0);
    }

    #[test]
    fn unmatched_characters_become_single_bad_characters() {
        let tokens: Vec<_> = Lexer::new(OnlyA, "aa€b").collect();
        assert_eq!(
            kinds(&tokens),
            vec![
                SyntaxKind::IDENT,
                SyntaxKind::BAD_CHARACTER,
                SyntaxKind::BAD_CHARACTER
            ]
        );
        // the euro sign is three bytes but one character
        assert_eq!(tokens[1].range, text_range(2, 5));
        assert_eq!(tokens[2].range, text_range(5, 6));
    }

    #[test]
    fn state_threads_through_tokens() {
        let (tokens, state) = collect_tokens(Lexer::new(OnlyA, "aa-aa"));
        assert_eq!(tokens.len(), 3);
        // BAD_CHARACTER leaves the state untouched
        assert_eq!(state, LexState(2));
    }

    #[test]
    fn restart_lexes_only_the_requested_range() {
        let text = "aaXaaa";
        let mut lexer = Lexer::new(OnlyA, text);
        lexer.start(text, 3..5, LexState(7));
        let tokens: Vec<_> = lexer.by_ref().collect();
        assert_eq!(tokens, vec![Token::new(SyntaxKind::IDENT, text_range(3, 5))]);
        assert_eq!(lexer.state(), LexState(8));
    }

    #[test]
    fn restart_range_is_clamped_to_text() {
        let text = "aa";
        let mut lexer = Lexer::new(OnlyA, text);
        lexer.start(text, 1..99, LexState::INITIAL);
        assert_eq!(lexer.count(), 1);
    }

    #[test]
    fn token_text_slices_source() {
        let text = "aab";
        let tokens: Vec<_> = Lexer::new(OnlyA, text).collect();
        let texts: Vec<_> = tokens.iter().map(|t| t.text(text)).collect();
        assert_eq!(texts, vec!["aa", "b"]);
    }
}
