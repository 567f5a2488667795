//! Token rules for the script language: a small C-family expression language
//! with `fn`/`class` declarations, `let`/`var`/`const` bindings and the usual
//! operator zoo.
//!
//! Strings and block comments may span lines. When they run into the end of
//! the lexed range before closing, the token extends to that end and is
//! flagged unterminated. Block comments nest.

use logos::Logos;

use super::{LexRules, LexState, Lexed};
use crate::syntax_kind::SyntaxKind;

/// Whether a delimited token found its closing delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Closed,
    Open,
}

/// Token kinds produced by the Logos lexer.
///
/// Each variant maps to a corresponding `SyntaxKind` token via
/// [`ScriptToken::to_syntax_kind`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptToken {
    /// Horizontal whitespace
    #[regex(r"[ \t\f]+")]
    Whitespace,

    /// Line ending (LF, CRLF or lone CR)
    #[regex(r"\r\n|\n|\r")]
    Newline,

    #[regex(r"//[^\r\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment(Termination),

    #[token("\"", |lex| quoted(lex, '"'))]
    #[token("'", |lex| quoted(lex, '\''))]
    Str(Termination),

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+")]
    Float,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*")]
    Ident,

    // Keywords
    #[token("fn")]
    Fn,
    #[token("class")]
    Class,
    #[token("let")]
    Let,
    #[token("var")]
    Var,
    #[token("const")]
    Const,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("return")]
    Return,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBrack,
    #[token("]")]
    RBrack,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token("@")]
    At,
    #[token("=>")]
    FatArrow,

    // Operators
    #[token("=")]
    Eq,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("==")]
    Eq2,
    #[token("!=")]
    Neq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("&&")]
    Amp2,
    #[token("||")]
    Pipe2,
    #[token("??")]
    Question2,
}

impl ScriptToken {
    /// Convert to SyntaxKind.
    pub fn to_syntax_kind(self) -> SyntaxKind {
        use SyntaxKind as K;
        match self {
            ScriptToken::Whitespace => K::WHITESPACE,
            ScriptToken::Newline => K::NEWLINE,
            ScriptToken::LineComment | ScriptToken::BlockComment(_) => K::COMMENT,
            ScriptToken::Str(_) => K::STRING,
            ScriptToken::Int => K::INT_NUMBER,
            ScriptToken::Float => K::FLOAT_NUMBER,
            ScriptToken::Ident => K::IDENT,
            ScriptToken::Fn => K::FN_KW,
            ScriptToken::Class => K::CLASS_KW,
            ScriptToken::Let => K::LET_KW,
            ScriptToken::Var => K::VAR_KW,
            ScriptToken::Const => K::CONST_KW,
            ScriptToken::If => K::IF_KW,
            ScriptToken::Else => K::ELSE_KW,
            ScriptToken::While => K::WHILE_KW,
            ScriptToken::For => K::FOR_KW,
            ScriptToken::In => K::IN_KW,
            ScriptToken::Return => K::RETURN_KW,
            ScriptToken::Break => K::BREAK_KW,
            ScriptToken::Continue => K::CONTINUE_KW,
            ScriptToken::True => K::TRUE_KW,
            ScriptToken::False => K::FALSE_KW,
            ScriptToken::Null => K::NULL_KW,
            ScriptToken::LParen => K::L_PAREN,
            ScriptToken::RParen => K::R_PAREN,
            ScriptToken::LBrace => K::L_BRACE,
            ScriptToken::RBrace => K::R_BRACE,
            ScriptToken::LBrack => K::L_BRACK,
            ScriptToken::RBrack => K::R_BRACK,
            ScriptToken::Comma => K::COMMA,
            ScriptToken::Semicolon => K::SEMICOLON,
            ScriptToken::Colon => K::COLON,
            ScriptToken::Dot => K::DOT,
            ScriptToken::Question => K::QUESTION,
            ScriptToken::At => K::AT,
            ScriptToken::FatArrow => K::FAT_ARROW,
            ScriptToken::Eq => K::EQ,
            ScriptToken::PlusEq => K::PLUS_EQ,
            ScriptToken::MinusEq => K::MINUS_EQ,
            ScriptToken::StarEq => K::STAR_EQ,
            ScriptToken::SlashEq => K::SLASH_EQ,
            ScriptToken::Eq2 => K::EQ2,
            ScriptToken::Neq => K::NEQ,
            ScriptToken::Lt => K::LT,
            ScriptToken::LtEq => K::LTEQ,
            ScriptToken::Gt => K::GT,
            ScriptToken::GtEq => K::GTEQ,
            ScriptToken::Plus => K::PLUS,
            ScriptToken::Minus => K::MINUS,
            ScriptToken::Star => K::STAR,
            ScriptToken::Slash => K::SLASH,
            ScriptToken::Percent => K::PERCENT,
            ScriptToken::Bang => K::BANG,
            ScriptToken::Amp2 => K::AMP2,
            ScriptToken::Pipe2 => K::PIPE2,
            ScriptToken::Question2 => K::QUESTION2,
        }
    }

    fn is_unterminated(self) -> bool {
        matches!(
            self,
            ScriptToken::Str(Termination::Open) | ScriptToken::BlockComment(Termination::Open)
        )
    }
}

/// Scan the body of a string opened by `quote`. Backslash escapes the next
/// character.
fn quoted(lex: &mut logos::Lexer<ScriptToken>, quote: char) -> Option<Termination> {
    let (len, termination) = scan_quoted(lex.remainder(), quote);
    lex.bump(len);
    Some(termination)
}

/// Length of a string body (after the opening quote) including the closing
/// quote if present.
pub(crate) fn scan_quoted(rest: &str, quote: char) -> (usize, Termination) {
    let mut chars = rest.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return (i + c.len_utf8(), Termination::Closed);
        }
    }
    (rest.len(), Termination::Open)
}

fn block_comment(lex: &mut logos::Lexer<ScriptToken>) -> Option<Termination> {
    let bytes = lex.remainder().as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i..].starts_with(b"*/") {
            i += 2;
            depth -= 1;
            if depth == 0 {
                lex.bump(i);
                return Some(Termination::Closed);
            }
        } else if bytes[i..].starts_with(b"/*") {
            i += 2;
            depth += 1;
        } else {
            i += 1;
        }
    }
    lex.bump(bytes.len());
    Some(Termination::Open)
}

/// Script token rules. The script lexer has a single state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptRules;

impl LexRules for ScriptRules {
    fn lex(&self, rest: &str, state: LexState) -> Option<Lexed> {
        let mut lexer = ScriptToken::lexer(rest);
        let token = lexer.next()?.ok()?;
        let len = lexer.span().end;
        Some(Lexed::new(token.to_syntax_kind(), len, state).unterminated(token.is_unterminated()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Token};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(ScriptRules, input).collect()
    }

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        lex(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lossless_roundtrip() {
        let input = "fn add(a, b) {\n  return a + b; /* sum */\n}\n";
        let tokens = lex(input);
        let reconstructed: String = tokens.iter().map(|t| t.text(input)).collect();
        assert_eq!(input, reconstructed);
    }

    #[test]
    fn assignment_with_precedence_operators() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("a = 1 + 2 * 3"),
            vec![
                IDENT, WHITESPACE, EQ, WHITESPACE, INT_NUMBER, WHITESPACE, PLUS, WHITESPACE,
                INT_NUMBER, WHITESPACE, STAR, WHITESPACE, INT_NUMBER
            ]
        );
    }

    #[rstest]
    #[case("fn", SyntaxKind::FN_KW)]
    #[case("class", SyntaxKind::CLASS_KW)]
    #[case("null", SyntaxKind::NULL_KW)]
    #[case("extends", SyntaxKind::IDENT)]
    #[case("format", SyntaxKind::IDENT)]
    #[case("$el", SyntaxKind::IDENT)]
    #[case("42", SyntaxKind::INT_NUMBER)]
    #[case("4.2", SyntaxKind::FLOAT_NUMBER)]
    #[case("1e9", SyntaxKind::FLOAT_NUMBER)]
    #[case("\"hi\"", SyntaxKind::STRING)]
    #[case("'hi'", SyntaxKind::STRING)]
    #[case("=>", SyntaxKind::FAT_ARROW)]
    #[case("??", SyntaxKind::QUESTION2)]
    #[case("// note", SyntaxKind::COMMENT)]
    fn single_token(#[case] input: &str, #[case] expected: SyntaxKind) {
        assert_eq!(kinds(input), vec![expected]);
    }

    #[test]
    fn number_followed_by_member_access() {
        use SyntaxKind::*;
        assert_eq!(kinds("1.foo"), vec![INT_NUMBER, DOT, IDENT]);
    }

    #[test]
    fn strings_span_lines_and_honour_escapes() {
        let tokens = lex("\"a\\\"\nb\" x");
        assert_eq!(tokens[0].kind, SyntaxKind::STRING);
        assert_eq!(tokens[0].end(), 7);
        assert!(!tokens[0].unterminated);
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        let input = "x = \"never closed\nstill string";
        let tokens = lex(input);
        let last = tokens.last().copied().unwrap();
        assert_eq!(last.kind, SyntaxKind::STRING);
        assert!(last.unterminated);
        assert_eq!(last.end(), input.len());
    }

    #[test]
    fn block_comments_nest() {
        let input = "/* a /* b */ c */x";
        let tokens = lex(input);
        assert_eq!(tokens[0].kind, SyntaxKind::COMMENT);
        assert_eq!(tokens[0].text(input), "/* a /* b */ c */");
        assert_eq!(tokens[1].kind, SyntaxKind::IDENT);
    }

    #[test]
    fn unterminated_block_comment_is_flagged() {
        let tokens = lex("/* open /* nested */");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].unterminated);
    }

    #[test]
    fn stray_characters_are_bad() {
        use SyntaxKind::*;
        assert_eq!(kinds("a & b"), vec![IDENT, WHITESPACE, BAD_CHARACTER, WHITESPACE, IDENT]);
        assert_eq!(kinds("#"), vec![BAD_CHARACTER]);
    }

    #[test]
    fn crlf_is_one_newline() {
        use SyntaxKind::*;
        assert_eq!(kinds("a\r\nb"), vec![IDENT, NEWLINE, IDENT]);
    }
}
