//! Brace and block matching over a token stream.
//!
//! Delimiters are token kinds, not characters: a Makefile `ifdef` closes with
//! `endif`, a template `{{#each}}` with `{{/each}}`. Each language provides a
//! [`BraceTable`] saying which kinds pair up, and [`find_match`] walks the
//! tokens from the caret, counting nesting until the depth returns to zero.
//!
//! ```
//! use tessera_syntax::{brace::find_match, Language};
//!
//! let text = "f(a, (b))";
//! let tokens = Language::Script.tokenize(text).0;
//! let table = Language::Script.brace_table();
//! assert_eq!(find_match(&tokens, 1, table), Some(8));
//! assert_eq!(find_match(&tokens, 8, table), Some(1));
//! assert_eq!(find_match(&tokens, 0, table), None);
//! ```

use crate::lexer::Token;
use crate::syntax_kind::SyntaxKind;
use crate::token_set::TokenSet;

/// Token kinds that open a construct, and the kind that closes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracePair {
    pub open: TokenSet,
    pub close: SyntaxKind,
    /// An opener immediately followed by this kind stands alone (`{{^}}`).
    pub bare_when_followed_by: Option<SyntaxKind>,
    /// An opener immediately after this kind continues the enclosing
    /// construct instead of opening a new one (`else ifdef`).
    pub chained_after: Option<SyntaxKind>,
}

impl BracePair {
    const fn simple(open: SyntaxKind, close: SyntaxKind) -> Self {
        BracePair {
            open: TokenSet::new(&[open]),
            close,
            bare_when_followed_by: None,
            chained_after: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BraceTable {
    pub pairs: &'static [BracePair],
    /// Tokens that never take part in matching and are stepped over when
    /// looking at neighbours.
    pub trivia: TokenSet,
}

const WS_TRIVIA: TokenSet = TokenSet::new(&[
    SyntaxKind::WHITESPACE,
    SyntaxKind::NEWLINE,
    SyntaxKind::COMMENT,
    SyntaxKind::LINE_CONTINUATION,
]);

impl BraceTable {
    pub const SCRIPT: BraceTable = BraceTable {
        pairs: &[
            BracePair::simple(SyntaxKind::L_PAREN, SyntaxKind::R_PAREN),
            BracePair::simple(SyntaxKind::L_BRACE, SyntaxKind::R_BRACE),
            BracePair::simple(SyntaxKind::L_BRACK, SyntaxKind::R_BRACK),
        ],
        trivia: WS_TRIVIA,
    };

    pub const TEMPLATE: BraceTable = BraceTable {
        pairs: &[
            BracePair {
                open: TokenSet::new(&[SyntaxKind::OPEN_BLOCK, SyntaxKind::OPEN_INVERSE]),
                close: SyntaxKind::OPEN_ENDBLOCK,
                bare_when_followed_by: Some(SyntaxKind::CLOSE),
                chained_after: None,
            },
            BracePair::simple(SyntaxKind::L_PAREN, SyntaxKind::R_PAREN),
        ],
        trivia: WS_TRIVIA,
    };

    pub const MAKEFILE: BraceTable = BraceTable {
        pairs: &[
            BracePair {
                open: TokenSet::new(&[
                    SyntaxKind::IFEQ_KW,
                    SyntaxKind::IFNEQ_KW,
                    SyntaxKind::IFDEF_KW,
                    SyntaxKind::IFNDEF_KW,
                ]),
                close: SyntaxKind::ENDIF_KW,
                bare_when_followed_by: None,
                chained_after: Some(SyntaxKind::ELSE_KW),
            },
            BracePair::simple(SyntaxKind::DEFINE_KW, SyntaxKind::ENDEF_KW),
        ],
        trivia: TokenSet::new(&[
            SyntaxKind::WHITESPACE,
            SyntaxKind::COMMENT,
            SyntaxKind::LINE_CONTINUATION,
        ]),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Scanning,
    DepthTracking {
        pair: &'static BracePair,
        direction: Direction,
        index: usize,
        depth: usize,
    },
    Found(usize),
}

/// Index of the token paired with `tokens[caret]`.
///
/// `None` when the caret token is not a delimiter, or when the stream ends
/// before the nesting depth returns to zero. Unbalanced delimiters are the
/// normal state of a file being edited.
pub fn find_match(tokens: &[Token], caret: usize, table: &BraceTable) -> Option<usize> {
    let mut state = State::Scanning;
    loop {
        state = match state {
            State::Scanning => {
                let kind = tokens.get(caret)?.kind;
                if let Some(pair) = table.pairs.iter().find(|p| p.close == kind) {
                    State::DepthTracking {
                        pair,
                        direction: Direction::Backward,
                        index: caret,
                        depth: 1,
                    }
                } else if let Some(pair) = table.pairs.iter().find(|p| p.open.contains(kind)) {
                    if !is_opener(tokens, caret, pair, table) {
                        return None;
                    }
                    State::DepthTracking {
                        pair,
                        direction: Direction::Forward,
                        index: caret,
                        depth: 1,
                    }
                } else {
                    return None;
                }
            }
            State::DepthTracking {
                pair,
                direction,
                index,
                depth,
            } => {
                let index = match direction {
                    Direction::Forward => index + 1,
                    Direction::Backward => index.checked_sub(1)?,
                };
                let kind = tokens.get(index)?.kind;
                let (nest, unnest) = match direction {
                    Direction::Forward => (
                        pair.open.contains(kind) && is_opener(tokens, index, pair, table),
                        kind == pair.close,
                    ),
                    Direction::Backward => (
                        kind == pair.close,
                        pair.open.contains(kind) && is_opener(tokens, index, pair, table),
                    ),
                };
                match (nest, unnest) {
                    (true, _) => State::DepthTracking {
                        pair,
                        direction,
                        index,
                        depth: depth + 1,
                    },
                    (_, true) if depth == 1 => State::Found(index),
                    (_, true) => State::DepthTracking {
                        pair,
                        direction,
                        index,
                        depth: depth - 1,
                    },
                    _ => State::DepthTracking {
                        pair,
                        direction,
                        index,
                        depth,
                    },
                }
            }
            State::Found(index) => return Some(index),
        };
    }
}

/// Whether the opener-kind token at `index` really opens a construct.
fn is_opener(tokens: &[Token], index: usize, pair: &BracePair, table: &BraceTable) -> bool {
    let significant = |t: &&Token| !table.trivia.contains(t.kind);
    if let Some(bare) = pair.bare_when_followed_by {
        let next = tokens[index + 1..].iter().find(significant);
        if next.is_some_and(|t| t.kind == bare) {
            return false;
        }
    }
    if let Some(chain) = pair.chained_after {
        let prev = tokens[..index].iter().rev().find(significant);
        if prev.is_some_and(|t| t.kind == chain) {
            return false;
        }
    }
    true
}
