//! Token rules for the template language: HTML-ish markup with mustache
//! (`{{ ... }}`) tags.
//!
//! The lexer is a small mode machine. The mode and, inside a mustache, the
//! markup context to return to are packed into the [`LexState`]:
//!
//! ```text
//! Content --'<' name--> TagName --name--> Tag --'"'--> AttrValue --'"'--> Tag
//!    ^                                     | '>'
//!    +-------------------------------------+
//!
//! any markup mode --'{{'--> Mustache(return to that mode) --'}}'--> back
//!
//! Content --'\' before '{{'--> Escaped --text--> Content
//! ```
//!
//! Inside a mustache this lexer only knows where the mustache ends. The
//! interior is a run of [`MUSTACHE_CONTENT`](SyntaxKind::MUSTACHE_CONTENT),
//! whitespace and strings; a layered lexer replaces it with script tokens
//! when an expression grammar is registered.

use logos::Logos;

use super::script::{scan_quoted, Termination};
use super::{first_char_len, LexRules, LexState, Lexed};
use crate::syntax_kind::SyntaxKind;

/// Markup modes a mustache can interrupt and return to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Content,
    Tag,
    AttrDouble,
    AttrSingle,
    AfterEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Markup(Context),
    TagName,
    Mustache(Context),
    /// After a `\` that escapes a mustache opener.
    Escaped,
}

impl Context {
    fn id(self) -> u16 {
        match self {
            Context::Content => 0,
            Context::Tag => 1,
            Context::AttrDouble => 2,
            Context::AttrSingle => 3,
            Context::AfterEq => 4,
        }
    }

    fn from_id(id: u16) -> Context {
        match id {
            1 => Context::Tag,
            2 => Context::AttrDouble,
            3 => Context::AttrSingle,
            4 => Context::AfterEq,
            _ => Context::Content,
        }
    }

    /// Where markup resumes after a mustache closes.
    fn resume(self) -> Context {
        match self {
            // `a={{x}}` is a complete unquoted value
            Context::AfterEq => Context::Tag,
            other => other,
        }
    }
}

const MUSTACHE_BIT: u16 = 0x100;
const TAG_NAME: u16 = 0x200;
const ESCAPED: u16 = 0x400;

impl Mode {
    fn encode(self) -> LexState {
        LexState(match self {
            Mode::Markup(ctx) => ctx.id(),
            Mode::TagName => TAG_NAME,
            Mode::Mustache(ctx) => MUSTACHE_BIT | ctx.id(),
            Mode::Escaped => ESCAPED,
        })
    }

    fn decode(state: LexState) -> Mode {
        if state.0 == TAG_NAME {
            Mode::TagName
        } else if state.0 == ESCAPED {
            Mode::Escaped
        } else if state.0 & MUSTACHE_BIT != 0 {
            Mode::Mustache(Context::from_id(state.0 & 0xff))
        } else {
            Mode::Markup(Context::from_id(state.0 & 0xff))
        }
    }
}

/// Tokens inside a start or end tag.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum TagToken {
    #[regex(r"[ \t\f]+")]
    Whitespace,
    #[regex(r"\r\n|\n|\r")]
    Newline,
    #[token(">")]
    RAngle,
    #[token("/>")]
    SlashRAngle,
    #[token("=")]
    Eq,
    #[token("\"")]
    DoubleQuote,
    #[token("'")]
    SingleQuote,
    #[regex(r"[A-Za-z_:@][-A-Za-z0-9_:.@]*")]
    Name,
}

/// Tokens inside a mustache when nothing is layered in.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum MustacheToken {
    #[regex(r"[ \t\f]+")]
    Whitespace,
    #[regex(r"\r\n|\n|\r")]
    Newline,
    #[token("}}}")]
    CloseUnescaped,
    #[token("}}")]
    Close,
    #[token("\"", |lex| quoted(lex, '"'))]
    #[token("'", |lex| quoted(lex, '\''))]
    Str(Termination),
    // Anything else up to whitespace, a quote or a brace. A lone `}` is
    // content too.
    #[regex(r#"([^\s"'}]|\}[^\s"'}])+"#)]
    #[token("}")]
    Content,
}

fn quoted(lex: &mut logos::Lexer<MustacheToken>, quote: char) -> Option<Termination> {
    let (len, termination) = scan_quoted(lex.remainder(), quote);
    lex.bump(len);
    Some(termination)
}

/// Template token rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateRules;

impl TemplateRules {
    pub fn is_mustache_state(state: LexState) -> bool {
        matches!(Mode::decode(state), Mode::Mustache(_))
    }
}

impl LexRules for TemplateRules {
    fn lex(&self, rest: &str, state: LexState) -> Option<Lexed> {
        match Mode::decode(state) {
            Mode::Mustache(ctx) => lex_mustache(rest, ctx),
            Mode::Escaped => Some(lex_escaped(rest)),
            mode => lex_markup(rest, mode),
        }
    }

    fn is_embedding_state(&self, state: LexState) -> bool {
        Self::is_mustache_state(state)
    }
}

fn lex_markup(rest: &str, mode: Mode) -> Option<Lexed> {
    let ctx = match mode {
        Mode::Markup(ctx) => ctx,
        Mode::TagName | Mode::Mustache(_) | Mode::Escaped => Context::Tag,
    };
    if let Some(lexed) = lex_mustache_open(rest, ctx) {
        return Some(lexed);
    }
    match mode {
        Mode::TagName => lex_tag(rest, true),
        Mode::Markup(Context::Content) => Some(lex_content(rest)),
        Mode::Markup(Context::Tag) => lex_tag(rest, false),
        Mode::Markup(Context::AfterEq) => lex_after_eq(rest),
        Mode::Markup(Context::AttrDouble) => Some(lex_attr_value(rest, '"', Context::AttrDouble)),
        Mode::Markup(Context::AttrSingle) => Some(lex_attr_value(rest, '\'', Context::AttrSingle)),
        Mode::Mustache(_) | Mode::Escaped => None,
    }
}

/// `{{`, `{{{`, `{{#`, `{{/`, `{{^`, `{{>` and mustache comments.
fn lex_mustache_open(rest: &str, ctx: Context) -> Option<Lexed> {
    if !rest.starts_with("{{") {
        return None;
    }
    let here = Mode::Markup(ctx).encode();
    if let Some(body) = rest.strip_prefix("{{!--") {
        return Some(delimited_comment(rest, body, "--}}", here));
    }
    if let Some(body) = rest.strip_prefix("{{!") {
        return Some(delimited_comment(rest, body, "}}", here));
    }
    let (kind, len) = match rest.as_bytes().get(2) {
        Some(b'{') => (SyntaxKind::OPEN_UNESCAPED, 3),
        Some(b'#') => (SyntaxKind::OPEN_BLOCK, 3),
        Some(b'/') => (SyntaxKind::OPEN_ENDBLOCK, 3),
        Some(b'^') => (SyntaxKind::OPEN_INVERSE, 3),
        Some(b'>') => (SyntaxKind::OPEN_PARTIAL, 3),
        _ => (SyntaxKind::OPEN, 2),
    };
    Some(Lexed::new(kind, len, Mode::Mustache(ctx).encode()))
}

fn delimited_comment(rest: &str, body: &str, close: &str, state: LexState) -> Lexed {
    let opener = rest.len() - body.len();
    match body.find(close) {
        Some(at) => Lexed::new(SyntaxKind::COMMENT, opener + at + close.len(), state),
        None => Lexed::new(SyntaxKind::COMMENT, rest.len(), state).unterminated(true),
    }
}

fn starts_tag_name(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn lex_content(rest: &str) -> Lexed {
    let content = Mode::Markup(Context::Content).encode();
    if let Some(body) = rest.strip_prefix("<!--") {
        return delimited_comment(rest, body, "-->", content);
    }
    if let Some(after) = rest.strip_prefix("</")
        && starts_tag_name(after)
    {
        return Lexed::new(SyntaxKind::L_ANGLE_SLASH, 2, Mode::TagName.encode());
    }
    if let Some(after) = rest.strip_prefix('<')
        && starts_tag_name(after)
    {
        return Lexed::new(SyntaxKind::L_ANGLE, 1, Mode::TagName.encode());
    }
    if rest.starts_with("\\{{") {
        return Lexed::new(SyntaxKind::ESCAPE_CHAR, 1, Mode::Escaped.encode());
    }
    // Text runs to the next construct. The first char is known not to start
    // one, so a stray `<` is absorbed.
    let first = first_char_len(rest);
    let len = rest[first..]
        .find(['<', '{'])
        .map_or(rest.len(), |at| first + at);
    let mut len = extend_over_single_braces(rest, len);
    // `a\{{x}}` leaves the backslash for the escape; `a\\{{x}}` is a literal one
    let escapes_next = rest[len..].starts_with("{{")
        && rest[..len].ends_with('\\')
        && !rest[..len].ends_with("\\\\");
    if escapes_next {
        len -= 1;
    }
    Lexed::new(SyntaxKind::TEXT, len, content)
}

/// The escaped opener and the text after it, up to the next construct.
fn lex_escaped(rest: &str) -> Lexed {
    let skip = if rest.starts_with("{{") {
        2
    } else {
        first_char_len(rest)
    };
    let len = rest[skip..]
        .find(['<', '{'])
        .map_or(rest.len(), |at| skip + at);
    let len = extend_over_single_braces(rest, len);
    Lexed::new(SyntaxKind::TEXT, len, Mode::Markup(Context::Content).encode())
}

/// A lone `{` does not open a mustache; keep it in the text run.
fn extend_over_single_braces(rest: &str, mut len: usize) -> usize {
    while len < rest.len() && rest[len..].starts_with('{') && !rest[len..].starts_with("{{") {
        len += 1;
        len += rest[len..].find(['<', '{']).unwrap_or(rest.len() - len);
    }
    len
}

fn lex_tag(rest: &str, expect_name: bool) -> Option<Lexed> {
    if rest.starts_with('<') {
        // A new tag before the previous one closed.
        return Some(lex_content(rest));
    }
    let mut lexer = TagToken::lexer(rest);
    let token = lexer.next()?.ok()?;
    let len = lexer.span().end;
    let tag = Mode::Markup(Context::Tag).encode();
    let content = Mode::Markup(Context::Content).encode();
    let lexed = match token {
        TagToken::Whitespace => Lexed::new(SyntaxKind::WHITESPACE, len, tag),
        TagToken::Newline => Lexed::new(SyntaxKind::NEWLINE, len, tag),
        TagToken::RAngle => Lexed::new(SyntaxKind::R_ANGLE, len, content),
        TagToken::SlashRAngle => Lexed::new(SyntaxKind::SLASH_R_ANGLE, len, content),
        TagToken::Eq => Lexed::new(SyntaxKind::EQ, len, Mode::Markup(Context::AfterEq).encode()),
        TagToken::DoubleQuote => Lexed::new(SyntaxKind::QUOTE, len, Mode::Markup(Context::AttrDouble).encode()),
        TagToken::SingleQuote => Lexed::new(SyntaxKind::QUOTE, len, Mode::Markup(Context::AttrSingle).encode()),
        TagToken::Name if expect_name => Lexed::new(SyntaxKind::TAG_NAME, len, tag),
        TagToken::Name => Lexed::new(SyntaxKind::ATTR_NAME, len, tag),
    };
    Some(lexed)
}

fn lex_after_eq(rest: &str) -> Option<Lexed> {
    let after_eq = Mode::Markup(Context::AfterEq).encode();
    let c = rest.chars().next()?;
    match c {
        '"' => Some(Lexed::new(SyntaxKind::QUOTE, 1, Mode::Markup(Context::AttrDouble).encode())),
        '\'' => Some(Lexed::new(SyntaxKind::QUOTE, 1, Mode::Markup(Context::AttrSingle).encode())),
        ' ' | '\t' | '\x0c' => {
            let len = rest.find(|c| !matches!(c, ' ' | '\t' | '\x0c')).unwrap_or(rest.len());
            Some(Lexed::new(SyntaxKind::WHITESPACE, len, after_eq))
        }
        '>' | '<' | '\n' | '\r' => lex_tag(rest, false),
        _ => {
            let len = rest
                .find(|c: char| c.is_whitespace() || matches!(c, '>' | '<' | '"' | '\'' | '='))
                .unwrap_or(rest.len());
            let len = match rest[..len].find("{{") {
                Some(0) => return None,
                Some(at) => at,
                None => len,
            };
            Some(Lexed::new(SyntaxKind::ATTR_VALUE, len, Mode::Markup(Context::Tag).encode()))
        }
    }
}

fn lex_attr_value(rest: &str, quote: char, ctx: Context) -> Lexed {
    if rest.starts_with(quote) {
        return Lexed::new(SyntaxKind::QUOTE, 1, Mode::Markup(Context::Tag).encode());
    }
    let mut len = rest.len();
    for (i, c) in rest.char_indices() {
        if c == quote || rest[i..].starts_with("{{") {
            len = i;
            break;
        }
    }
    Lexed::new(SyntaxKind::ATTR_VALUE, len, Mode::Markup(ctx).encode())
}

fn lex_mustache(rest: &str, ctx: Context) -> Option<Lexed> {
    let here = Mode::Mustache(ctx).encode();
    let back = Mode::Markup(ctx.resume()).encode();
    let mut lexer = MustacheToken::lexer(rest);
    let token = lexer.next()?.ok()?;
    let len = lexer.span().end;
    let lexed = match token {
        MustacheToken::Whitespace => Lexed::new(SyntaxKind::WHITESPACE, len, here),
        MustacheToken::Newline => Lexed::new(SyntaxKind::NEWLINE, len, here),
        MustacheToken::CloseUnescaped => Lexed::new(SyntaxKind::CLOSE_UNESCAPED, len, back),
        MustacheToken::Close => Lexed::new(SyntaxKind::CLOSE, len, back),
        MustacheToken::Str(termination) => Lexed::new(SyntaxKind::STRING, len, here)
            .unterminated(termination == Termination::Open),
        MustacheToken::Content => Lexed::new(SyntaxKind::MUSTACHE_CONTENT, len, here),
    };
    Some(lexed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{Lexer, Token};
    use pretty_assertions::assert_eq;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(TemplateRules, input).collect()
    }

    fn kinds_and_text(input: &str) -> Vec<(SyntaxKind, &str)> {
        lex(input).into_iter().map(|t| (t.kind, t.text(input))).collect()
    }

    #[test]
    fn plain_text_is_one_token() {
        assert_eq!(
            kinds_and_text("Hello, world"),
            vec![(SyntaxKind::TEXT, "Hello, world")]
        );
    }

    #[test]
    fn mustache_in_text() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("Hi {{name}}!"),
            vec![
                (TEXT, "Hi "),
                (OPEN, "{{"),
                (MUSTACHE_CONTENT, "name"),
                (CLOSE, "}}"),
                (TEXT, "!")
            ]
        );
    }

    #[test]
    fn block_openers() {
        use SyntaxKind::*;
        let kinds: Vec<_> = lex("{{#if a}}{{^}}{{/if}}{{> p}}{{{raw}}}")
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !matches!(k, MUSTACHE_CONTENT | WHITESPACE))
            .collect();
        assert_eq!(
            kinds,
            vec![
                OPEN_BLOCK, CLOSE, OPEN_INVERSE, CLOSE, OPEN_ENDBLOCK, CLOSE, OPEN_PARTIAL, CLOSE,
                OPEN_UNESCAPED, CLOSE_UNESCAPED
            ]
        );
    }

    #[test]
    fn tag_with_quoted_mustache_attribute() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("<div attr=\"{{ x + 1 }}\">"),
            vec![
                (L_ANGLE, "<"),
                (TAG_NAME, "div"),
                (WHITESPACE, " "),
                (ATTR_NAME, "attr"),
                (EQ, "="),
                (QUOTE, "\""),
                (OPEN, "{{"),
                (WHITESPACE, " "),
                (MUSTACHE_CONTENT, "x"),
                (WHITESPACE, " "),
                (MUSTACHE_CONTENT, "+"),
                (WHITESPACE, " "),
                (MUSTACHE_CONTENT, "1"),
                (WHITESPACE, " "),
                (CLOSE, "}}"),
                (QUOTE, "\""),
                (R_ANGLE, ">")
            ]
        );
    }

    #[test]
    fn attribute_value_mixes_text_and_mustaches() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("<a class='btn {{kind}}'>"),
            vec![
                (L_ANGLE, "<"),
                (TAG_NAME, "a"),
                (WHITESPACE, " "),
                (ATTR_NAME, "class"),
                (EQ, "="),
                (QUOTE, "'"),
                (ATTR_VALUE, "btn "),
                (OPEN, "{{"),
                (MUSTACHE_CONTENT, "kind"),
                (CLOSE, "}}"),
                (QUOTE, "'"),
                (R_ANGLE, ">")
            ]
        );
    }

    #[test]
    fn unquoted_attribute_value() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("<input size=10/>"),
            vec![
                (L_ANGLE, "<"),
                (TAG_NAME, "input"),
                (WHITESPACE, " "),
                (ATTR_NAME, "size"),
                (EQ, "="),
                (ATTR_VALUE, "10/"),
                (R_ANGLE, ">")
            ]
        );
    }

    #[test]
    fn end_tag_and_comments() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("<!-- c --></p>{{! note }}{{!-- a }} b --}}"),
            vec![
                (COMMENT, "<!-- c -->"),
                (L_ANGLE_SLASH, "</"),
                (TAG_NAME, "p"),
                (R_ANGLE, ">"),
                (COMMENT, "{{! note }}"),
                (COMMENT, "{{!-- a }} b --}}")
            ]
        );
    }

    #[test]
    fn stray_angle_and_brace_stay_text() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("a < b { c"),
            vec![(TEXT, "a "), (TEXT, "< b { c")]
        );
    }

    #[test]
    fn escaped_mustache_is_text() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("a\\{{x}} b<p>"),
            vec![
                (TEXT, "a"),
                (ESCAPE_CHAR, "\\"),
                (TEXT, "{{x}} b"),
                (L_ANGLE, "<"),
                (TAG_NAME, "p"),
                (R_ANGLE, ">")
            ]
        );
    }

    #[test]
    fn escaped_text_stops_at_the_next_mustache() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("\\{{x}} {{y}}"),
            vec![
                (ESCAPE_CHAR, "\\"),
                (TEXT, "{{x}} "),
                (OPEN, "{{"),
                (MUSTACHE_CONTENT, "y"),
                (CLOSE, "}}")
            ]
        );
    }

    #[test]
    fn double_backslash_does_not_escape() {
        use SyntaxKind::*;
        assert_eq!(
            kinds_and_text("a\\\\{{x}}"),
            vec![
                (TEXT, "a\\\\"),
                (OPEN, "{{"),
                (MUSTACHE_CONTENT, "x"),
                (CLOSE, "}}")
            ]
        );
    }

    #[test]
    fn mustache_state_is_embedding() {
        let (_, state) = crate::lexer::collect_tokens(Lexer::new(TemplateRules, "<p title=\"{{"));
        assert!(TemplateRules.is_embedding_state(state));
        let (_, state) = crate::lexer::collect_tokens(Lexer::new(TemplateRules, "<p>"));
        assert!(!TemplateRules.is_embedding_state(state));
    }

    #[test]
    fn closing_mustache_returns_to_attribute_value() {
        use SyntaxKind::*;
        let tokens = kinds_and_text("<p a=\"{{x}}y\">");
        assert!(tokens.contains(&(ATTR_VALUE, "y")));
        assert_eq!(tokens.last(), Some(&(R_ANGLE, ">")));
    }

    #[test]
    fn unterminated_mustache_string_is_flagged() {
        let tokens = lex("{{ 'abc");
        let last = tokens.last().copied().unwrap();
        assert_eq!(last.kind, SyntaxKind::STRING);
        assert!(last.unterminated);
    }
}
