//! Token rules for GNU-style Makefiles.
//!
//! Makefiles are line oriented and context sensitive: a leading tab means a
//! recipe only after a rule header, directives are keywords only at the start
//! of a line, and the text after `=` or `ifeq` is opaque. The lexer tracks the
//! current line mode plus whether the next line is inside a rule.

use logos::Logos;

use super::script::Termination;
use super::{LexRules, LexState, Lexed};
use crate::syntax_kind::SyntaxKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    LineStart,
    Line,
    ValueStart,
    Value,
    Condition,
    Recipe,
    DefineHeader,
    DefineBody,
    /// After `export`, `override`, `private` or `else`: another directive may
    /// follow on the same line.
    Modifier,
}

impl Mode {
    const ALL: [Mode; 9] = [
        Mode::LineStart,
        Mode::Line,
        Mode::ValueStart,
        Mode::Value,
        Mode::Condition,
        Mode::Recipe,
        Mode::DefineHeader,
        Mode::DefineBody,
        Mode::Modifier,
    ];
}

const IN_RULE: u16 = 0x10;
const NEXT_IN_RULE: u16 = 0x20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MakeState {
    mode: Mode,
    /// Whether a tab at the start of this line begins a recipe.
    in_rule: bool,
    /// What `in_rule` becomes after the next newline.
    next_in_rule: bool,
}

impl MakeState {
    fn encode(self) -> LexState {
        let mode = Mode::ALL.iter().position(|m| *m == self.mode).unwrap_or(0) as u16;
        let mut bits = mode;
        if self.in_rule {
            bits |= IN_RULE;
        }
        if self.next_in_rule {
            bits |= NEXT_IN_RULE;
        }
        LexState(bits)
    }

    fn decode(state: LexState) -> Self {
        let mode = Mode::ALL
            .get(usize::from(state.0 & 0xf))
            .copied()
            .unwrap_or(Mode::LineStart);
        Self {
            mode,
            in_rule: state.0 & IN_RULE != 0,
            next_in_rule: state.0 & NEXT_IN_RULE != 0,
        }
    }

    fn with_mode(self, mode: Mode) -> Self {
        Self { mode, ..self }
    }

    fn after_newline(self) -> Self {
        Self {
            mode: Mode::LineStart,
            in_rule: self.next_in_rule,
            next_in_rule: self.next_in_rule,
        }
    }
}

/// Tokens of target lines, variable names and directive arguments.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum LineToken {
    #[regex(r"[ \t]+")]
    Whitespace,
    #[regex(r"\r\n|\n|\r")]
    Newline,
    #[regex(r"\\(\r\n|\n|\r)")]
    Continuation,
    #[regex(r"#[^\r\n]*")]
    Comment,
    #[token("::")]
    DoubleColon,
    #[token(":")]
    Colon,
    #[token("=")]
    #[token(":=")]
    #[token("::=")]
    #[token("?=")]
    #[token("+=")]
    #[token("!=")]
    Assign,
    #[token("|")]
    Pipe,
    #[token(";")]
    Semicolon,
    #[token("$", var_ref)]
    VarRef(Termination),
    #[regex(r"[^\s:=#;|$]", word_tail)]
    Word,
}

/// `$(...)` and `${...}` nest; `$x` and `$$` are two characters. A reference
/// left open stops at the end of the line.
fn var_ref(lex: &mut logos::Lexer<LineToken>) -> Option<Termination> {
    let rest = lex.remainder();
    match rest.chars().next() {
        Some(open @ ('(' | '{')) => {
            let close = if open == '(' { ')' } else { '}' };
            let mut depth = 0usize;
            for (i, c) in rest.char_indices() {
                if c == open {
                    depth += 1;
                } else if c == close {
                    depth -= 1;
                    if depth == 0 {
                        lex.bump(i + 1);
                        return Some(Termination::Closed);
                    }
                } else if c == '\n' || c == '\r' {
                    lex.bump(i);
                    return Some(Termination::Open);
                }
            }
            lex.bump(rest.len());
            Some(Termination::Open)
        }
        Some(c) if !c.is_whitespace() => {
            lex.bump(c.len_utf8());
            Some(Termination::Closed)
        }
        _ => Some(Termination::Open),
    }
}

fn word_tail(lex: &mut logos::Lexer<LineToken>) {
    let rest = lex.remainder();
    let mut len = rest.len();
    let mut chars = rest.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);
        let stop = c.is_whitespace()
            || matches!(c, ':' | '=' | '#' | ';' | '|' | '$')
            || (c == '\\' && matches!(next, Some('\n' | '\r')))
            || (matches!(c, '?' | '+' | '!') && next == Some('='));
        if stop {
            len = i;
            break;
        }
    }
    lex.bump(len);
}

/// Makefile token rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MakefileRules;

impl LexRules for MakefileRules {
    fn lex(&self, rest: &str, state: LexState) -> Option<Lexed> {
        let st = MakeState::decode(state);
        match st.mode {
            Mode::LineStart => lex_line_start(rest, st),
            Mode::Line => lex_line(rest, st),
            Mode::Modifier => lex_modifier(rest, st),
            Mode::ValueStart | Mode::Value => Some(lex_value(rest, st)),
            Mode::Condition => Some(lex_condition(rest, st)),
            Mode::Recipe => Some(lex_recipe(rest, st)),
            Mode::DefineHeader => lex_define_header(rest, st),
            Mode::DefineBody => Some(lex_define_body(rest, st)),
        }
    }
}

fn lexed(kind: SyntaxKind, len: usize, st: MakeState) -> Lexed {
    Lexed::new(kind, len, st.encode())
}

fn newline_len(rest: &str) -> usize {
    if rest.starts_with("\r\n") {
        2
    } else if rest.starts_with(['\n', '\r']) {
        1
    } else {
        0
    }
}

fn continuation_len(rest: &str) -> usize {
    match rest.strip_prefix('\\') {
        Some(after) if newline_len(after) > 0 => 1 + newline_len(after),
        _ => 0,
    }
}

fn blank_len(rest: &str) -> usize {
    rest.find(|c| c != ' ' && c != '\t').unwrap_or(rest.len())
}

/// Length of an opaque run up to the end of the line, a continuation, or a
/// char accepted by `stop`.
fn run_len(rest: &str, stop: impl Fn(char) -> bool) -> usize {
    for (i, c) in rest.char_indices() {
        if c == '\n' || c == '\r' || stop(c) || continuation_len(&rest[i..]) > 0 {
            return i;
        }
    }
    rest.len()
}

/// Shared handling of line ends and continuations. `None` if `rest` starts
/// with neither.
fn line_break(rest: &str, st: MakeState) -> Option<Lexed> {
    let len = newline_len(rest);
    if len > 0 {
        return Some(lexed(SyntaxKind::NEWLINE, len, st.after_newline()));
    }
    let len = continuation_len(rest);
    (len > 0).then(|| lexed(SyntaxKind::LINE_CONTINUATION, len, st))
}

fn directive(rest: &str) -> Option<(SyntaxKind, usize)> {
    use SyntaxKind as K;
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(rest.len());
    let kind = match &rest[..len] {
        "ifeq" => K::IFEQ_KW,
        "ifneq" => K::IFNEQ_KW,
        "ifdef" => K::IFDEF_KW,
        "ifndef" => K::IFNDEF_KW,
        "else" => K::ELSE_KW,
        "endif" => K::ENDIF_KW,
        "define" => K::DEFINE_KW,
        "endef" => K::ENDEF_KW,
        "include" | "-include" | "sinclude" => K::INCLUDE_KW,
        "export" => K::EXPORT_KW,
        "override" => K::OVERRIDE_KW,
        "private" => K::PRIVATE_KW,
        "undefine" => K::UNDEFINE_KW,
        "vpath" => K::VPATH_KW,
        _ => return None,
    };
    let terminated = match rest[len..].chars().next() {
        None | Some(' ' | '\t' | '\n' | '\r') => true,
        Some('(') => matches!(kind, K::IFEQ_KW | K::IFNEQ_KW),
        Some(_) => false,
    };
    terminated.then_some((kind, len))
}

fn lex_directive(kind: SyntaxKind, len: usize, st: MakeState) -> Lexed {
    use SyntaxKind as K;
    let next = match kind {
        K::IFEQ_KW | K::IFNEQ_KW | K::IFDEF_KW | K::IFNDEF_KW => MakeState {
            mode: Mode::Condition,
            next_in_rule: st.in_rule,
            ..st
        },
        K::ELSE_KW => MakeState {
            mode: Mode::Modifier,
            next_in_rule: st.in_rule,
            ..st
        },
        K::ENDIF_KW => MakeState {
            mode: Mode::Line,
            next_in_rule: st.in_rule,
            ..st
        },
        K::DEFINE_KW => MakeState {
            mode: Mode::DefineHeader,
            next_in_rule: false,
            ..st
        },
        K::EXPORT_KW | K::OVERRIDE_KW | K::PRIVATE_KW => MakeState {
            mode: Mode::Modifier,
            next_in_rule: false,
            ..st
        },
        _ => MakeState {
            mode: Mode::Line,
            next_in_rule: false,
            ..st
        },
    };
    lexed(kind, len, next)
}

fn lex_line_start(rest: &str, st: MakeState) -> Option<Lexed> {
    if st.in_rule && rest.starts_with('\t') {
        let recipe = MakeState {
            mode: Mode::Recipe,
            next_in_rule: true,
            ..st
        };
        return Some(lexed(SyntaxKind::RECIPE_PREFIX, 1, recipe));
    }
    let st = MakeState {
        next_in_rule: st.in_rule,
        ..st
    };
    if let Some(brk) = line_break(rest, st) {
        return Some(brk);
    }
    let blanks = blank_len(rest);
    if blanks > 0 {
        return Some(lexed(SyntaxKind::WHITESPACE, blanks, st));
    }
    if rest.starts_with('#') {
        return Some(lexed(SyntaxKind::COMMENT, run_len(rest, |_| false), st));
    }
    if let Some((kind, len)) = directive(rest) {
        return Some(lex_directive(kind, len, st));
    }
    lex_line(
        rest,
        MakeState {
            mode: Mode::Line,
            in_rule: false,
            next_in_rule: false,
        },
    )
}

fn lex_modifier(rest: &str, st: MakeState) -> Option<Lexed> {
    let blanks = blank_len(rest);
    if blanks > 0 {
        return Some(lexed(SyntaxKind::WHITESPACE, blanks, st));
    }
    if let Some((kind, len)) = directive(rest) {
        return Some(lex_directive(kind, len, st));
    }
    lex_line(rest, st.with_mode(Mode::Line))
}

fn lex_line(rest: &str, st: MakeState) -> Option<Lexed> {
    let mut lexer = LineToken::lexer(rest);
    let token = lexer.next()?.ok()?;
    let len = lexer.span().end;
    let rule = MakeState {
        next_in_rule: true,
        ..st
    };
    let result = match token {
        LineToken::Whitespace => lexed(SyntaxKind::WHITESPACE, len, st),
        LineToken::Newline => lexed(SyntaxKind::NEWLINE, len, st.after_newline()),
        LineToken::Continuation => lexed(SyntaxKind::LINE_CONTINUATION, len, st),
        LineToken::Comment => lexed(SyntaxKind::COMMENT, len, st),
        LineToken::DoubleColon => lexed(SyntaxKind::DOUBLE_COLON, len, rule),
        LineToken::Colon => lexed(SyntaxKind::COLON, len, rule),
        LineToken::Assign => lexed(SyntaxKind::ASSIGN, len, st.with_mode(Mode::ValueStart)),
        LineToken::Pipe => lexed(SyntaxKind::PIPE, len, st),
        LineToken::Semicolon => lexed(SyntaxKind::SEMICOLON, len, rule.with_mode(Mode::Recipe)),
        LineToken::VarRef(termination) => {
            lexed(SyntaxKind::VAR_REF, len, st).unterminated(termination == Termination::Open)
        }
        LineToken::Word => lexed(SyntaxKind::WORD, len, st),
    };
    Some(result)
}

fn lex_value(rest: &str, st: MakeState) -> Lexed {
    if let Some(brk) = line_break(rest, st) {
        return brk;
    }
    if st.mode == Mode::ValueStart {
        let blanks = blank_len(rest);
        if blanks > 0 {
            return lexed(SyntaxKind::WHITESPACE, blanks, st);
        }
    }
    let st = st.with_mode(Mode::Value);
    if rest.starts_with('#') {
        return lexed(SyntaxKind::COMMENT, run_len(rest, |_| false), st);
    }
    if rest.starts_with('$')
        && let Some(lexed) = lex_line(rest, st)
    {
        return lexed;
    }
    let len = run_len(rest, |c| c == '#' || c == '$');
    // A lone `$` at the end of the range is text.
    lexed(SyntaxKind::VALUE_TEXT, len.max(1), st)
}

fn lex_condition(rest: &str, st: MakeState) -> Lexed {
    if let Some(brk) = line_break(rest, st) {
        return brk;
    }
    let blanks = blank_len(rest);
    if blanks > 0 {
        return lexed(SyntaxKind::WHITESPACE, blanks, st);
    }
    if rest.starts_with('#') {
        return lexed(SyntaxKind::COMMENT, run_len(rest, |_| false), st);
    }
    lexed(SyntaxKind::CONDITION, run_len(rest, |c| c == '#'), st)
}

fn lex_recipe(rest: &str, st: MakeState) -> Lexed {
    if let Some(brk) = line_break(rest, st) {
        return brk;
    }
    lexed(SyntaxKind::RECIPE_TEXT, run_len(rest, |_| false), st)
}

fn lex_define_header(rest: &str, st: MakeState) -> Option<Lexed> {
    let mut lexed = lex_line(rest, st)?;
    let next = if lexed.kind == SyntaxKind::NEWLINE {
        st.with_mode(Mode::DefineBody)
    } else {
        st
    };
    lexed.state = next.encode();
    Some(lexed)
}

fn lex_define_body(rest: &str, st: MakeState) -> Lexed {
    let len = newline_len(rest);
    if len > 0 {
        return lexed(SyntaxKind::NEWLINE, len, st);
    }
    let trimmed = rest.trim_start_matches([' ', '\t']);
    if let Some(after) = trimmed.strip_prefix("endef")
        && (after.is_empty() || after.starts_with([' ', '\t', '\n', '\r', '#']))
    {
        let indent = rest.len() - trimmed.len();
        if indent > 0 {
            return lexed(SyntaxKind::WHITESPACE, indent, st);
        }
        let line = MakeState {
            mode: Mode::Line,
            in_rule: false,
            next_in_rule: false,
        };
        return lexed(SyntaxKind::ENDEF_KW, 5, line);
    }
    let len = rest.find(['\n', '\r']).unwrap_or(rest.len());
    lexed(SyntaxKind::DEFINE_LINE, len, st)
}
