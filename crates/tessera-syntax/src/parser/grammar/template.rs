//! Template grammar: markup with Handlebars-style mustaches.
//!
//! ```text
//! document      := STATEMENTS
//! program       := statements ((simple_inverse | inverse_chain) statements)*
//! statement     := block | mustache | partial | ESCAPE_CHAR TEXT | TEXT | tag | end_tag
//! block         := OPEN_BLOCK_STACHE program CLOSE_BLOCK_STACHE
//! simple_inverse:= '{{^' '}}' | '{{' 'else' '}}'
//! inverse_chain := '{{' 'else' in_mustache '}}'
//! in_mustache   := path params hash | expr
//! ```
//!
//! Markup is flat: a tag and its end tag are siblings, not a subtree. When an
//! expression grammar is layered in, mustache interiors are script tokens;
//! otherwise they are `MUSTACHE_CONTENT` runs and end up in a
//! `RAW_MUSTACHE_BODY`.

use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind::{self, *};
use crate::token_set::TokenSet;

use super::items;
use super::script::expressions::{self, LITERALS};

const CLOSERS: TokenSet = TokenSet::new(&[CLOSE, CLOSE_UNESCAPED]);

const STACHE_OPENERS: TokenSet = TokenSet::new(&[
    OPEN,
    OPEN_UNESCAPED,
    OPEN_BLOCK,
    OPEN_ENDBLOCK,
    OPEN_INVERSE,
    OPEN_PARTIAL,
]);

/// Where a broken statement resynchronises.
const RECOVERY: TokenSet =
    STACHE_OPENERS.union(TokenSet::new(&[TEXT, ESCAPE_CHAR, L_ANGLE, L_ANGLE_SLASH]));

const MUSTACHE_RECOVERY: TokenSet = CLOSERS.union(RECOVERY);

const TAG_RECOVERY: TokenSet =
    RECOVERY.union(TokenSet::new(&[ATTR_NAME, R_ANGLE, SLASH_R_ANGLE]));

pub(crate) fn document(p: &mut Parser<'_, '_>) {
    let m = p.start();
    items(
        p,
        |_| false,
        |p| {
            if p.at(OPEN_ENDBLOCK) {
                stray_stache(p, "unexpected closing block");
            } else if at_inverse(p) {
                stray_stache(p, "'else' outside a block");
            } else {
                statement(p);
            }
        },
    );
    m.complete(p, STATEMENTS);
}

fn program(p: &mut Parser<'_, '_>) {
    let m = p.start();
    items(p, |p| p.at(OPEN_ENDBLOCK) || at_inverse(p), statement);
    m.complete(p, STATEMENTS);
}

fn statement(p: &mut Parser<'_, '_>) {
    match p.current() {
        TEXT => p.bump(),
        ESCAPE_CHAR => {
            p.bump();
            p.eat(TEXT);
        }
        OPEN_BLOCK => block(p, OPEN_BLOCK_STACHE),
        OPEN_INVERSE => block(p, OPEN_INVERSE_BLOCK_STACHE),
        OPEN | OPEN_UNESCAPED => mustache(p),
        OPEN_PARTIAL => partial(p),
        L_ANGLE => html_tag(p),
        L_ANGLE_SLASH => html_end_tag(p),
        _ => p.err_and_skip("unexpected token", RECOVERY),
    }
}

/// `{{^}}` or `{{else}}`.
fn at_simple_inverse(p: &Parser<'_, '_>) -> bool {
    match p.current() {
        OPEN_INVERSE => p.nth_at(1, CLOSE),
        OPEN => at_else(p) && p.nth_at(2, CLOSE),
        _ => false,
    }
}

/// `{{else if b}}`: an inverse that opens a chained block sharing the
/// enclosing block's close.
fn at_inverse_chain(p: &Parser<'_, '_>) -> bool {
    p.at(OPEN) && at_else(p) && !p.nth_at(2, CLOSE)
}

fn at_inverse(p: &Parser<'_, '_>) -> bool {
    at_simple_inverse(p) || at_inverse_chain(p)
}

/// Whether the token after the opener is `else`, lexed either way.
fn at_else(p: &Parser<'_, '_>) -> bool {
    p.nth_at(1, ELSE_KW) || (p.nth_at(1, MUSTACHE_CONTENT) && p.nth_text(1) == "else")
}

/// A whole mustache that cannot appear here, as one `ERROR`.
fn stray_stache(p: &mut Parser<'_, '_>, message: &str) {
    let m = p.start();
    p.bump();
    while !p.at_end() && !p.at_ts(MUSTACHE_RECOVERY) {
        p.bump();
    }
    if p.at_ts(CLOSERS) {
        p.bump();
    }
    m.error(p, message);
}

fn block(p: &mut Parser<'_, '_>, open_kind: SyntaxKind) {
    let m = p.start();
    let name = open_stache(p, open_kind);

    if p.enter() {
        program(p);
        loop {
            if at_simple_inverse(p) {
                simple_inverse(p);
            } else if at_inverse_chain(p) {
                inverse_chain(p);
            } else {
                break;
            }
            program(p);
        }
    } else {
        p.err_recover("nesting too deep", TokenSet::new(&[OPEN_ENDBLOCK]));
    }
    p.exit();

    if p.at(OPEN_ENDBLOCK) {
        close_stache(p, name);
    } else if name.is_empty() {
        p.error("expected closing block");
    } else {
        p.error(&format!("expected '{{{{/{name}}}}}'"));
    }
    m.complete(p, BLOCK_WRAPPER);
}

/// Text of the block's helper name, for matching against the closing block.
fn block_name<'s>(p: &Parser<'_, 's>) -> &'s str {
    if at_path_start(p) || p.at(MUSTACHE_CONTENT) {
        p.current_text()
    } else {
        ""
    }
}

fn open_stache<'s>(p: &mut Parser<'_, 's>, kind: SyntaxKind) -> &'s str {
    let m = p.start();
    p.bump(); // {{# or {{^
    let name = block_name(p);
    stache_body(p, CLOSE);
    m.complete(p, kind);
    name
}

fn close_stache(p: &mut Parser<'_, '_>, open_name: &str) {
    let m = p.start();
    p.bump(); // {{/
    if p.at(UNTERMINATED_EMBED) {
        p.bump();
        m.complete(p, CLOSE_BLOCK_STACHE);
        return;
    }

    let name = block_name(p);
    if raw_ahead(p) {
        raw_body(p);
    } else if at_path_start(p) {
        path(p);
    } else {
        p.error("expected a block name");
    }
    if !name.is_empty() && !open_name.is_empty() && name != open_name {
        p.error(&format!(
            "mismatched closing block: expected '{open_name}', found '{name}'"
        ));
    }
    close(p, CLOSE);
    m.complete(p, CLOSE_BLOCK_STACHE);
}

fn simple_inverse(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // {{ or {{^
    if p.at(ELSE_KW) || p.at(MUSTACHE_CONTENT) {
        p.bump();
    }
    p.expect(CLOSE);
    m.complete(p, SIMPLE_INVERSE);
}

fn inverse_chain(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // {{
    p.bump(); // else
    stache_body(p, CLOSE);
    m.complete(p, OPEN_INVERSE_CHAIN);
}

fn mustache(p: &mut Parser<'_, '_>) {
    let m = p.start();
    let close = if p.at(OPEN_UNESCAPED) {
        CLOSE_UNESCAPED
    } else {
        CLOSE
    };
    p.bump();
    stache_body(p, close);
    m.complete(p, MUSTACHE);
}

fn partial(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // {{>
    if p.at(UNTERMINATED_EMBED) {
        p.bump();
    } else {
        if raw_ahead(p) {
            raw_body(p);
        } else if at_path_start(p) || p.at(STRING) {
            helper_call(p);
        } else {
            p.error("expected a partial name");
        }
        close(p, CLOSE);
    }
    m.complete(p, PARTIAL_STACHE);
}

/// Everything after an opener: the interior and the closer.
fn stache_body(p: &mut Parser<'_, '_>, closer: SyntaxKind) {
    // the token already carries the diagnostic
    if p.at(UNTERMINATED_EMBED) {
        p.bump();
        return;
    }

    if raw_ahead(p) {
        raw_body(p);
    } else if p.at_end() || p.at_ts(MUSTACHE_RECOVERY) {
        p.error("expected an expression");
    } else if helper_ahead(p) {
        helper_call(p);
    } else {
        expressions::expr_no_assign(p);
    }
    close(p, closer);
}

/// Skip leftovers and consume `closer`. The other closer is consumed with
/// a diagnostic.
fn close(p: &mut Parser<'_, '_>, closer: SyntaxKind) {
    if !p.at_end() && !p.at_ts(MUSTACHE_RECOVERY) {
        p.err_recover(
            &format!("expected {}", closer.display_name()),
            MUSTACHE_RECOVERY,
        );
    }
    if p.eat(closer) {
        return;
    }
    if p.at_ts(CLOSERS) {
        let m = p.start();
        p.bump();
        m.error(p, &format!("expected {}", closer.display_name()));
    } else {
        p.expect(closer);
    }
}

/// Whether the interior is uninterpreted `MUSTACHE_CONTENT`.
fn raw_ahead(p: &Parser<'_, '_>) -> bool {
    (0..)
        .map(|n| p.nth(n))
        .take_while(|&kind| kind != EOF && !CLOSERS.contains(kind))
        .any(|kind| kind == MUSTACHE_CONTENT)
}

fn raw_body(p: &mut Parser<'_, '_>) {
    let m = p.start();
    while !p.at_end() && !p.at_ts(CLOSERS) {
        p.bump();
    }
    m.complete(p, RAW_MUSTACHE_BODY);
}

fn at_path_start(p: &Parser<'_, '_>) -> bool {
    let kind = p.current();
    kind == IDENT || kind == DOT || (kind.is_keyword() && !LITERALS.contains(kind))
}

fn at_segment(p: &Parser<'_, '_>) -> bool {
    p.at(IDENT) || (p.current().is_keyword() && !LITERALS.contains(p.current()))
}

fn at_param_start(p: &Parser<'_, '_>) -> bool {
    if p.at(L_PAREN) {
        // `f(x)` is a call expression, `f (x)` a sub-expression parameter
        return p.has_trivia_before();
    }
    at_path_start(p) || p.at(AT) || p.at_ts(LITERALS)
}

/// Chooses between `path params hash` and an expression. Keyword helpers
/// (`if`, `with`), relative paths (`../x`) and `@data` always take the helper
/// form; a plain name takes it only if a parameter follows. Looks ahead speculatively and rolls
/// back.
fn helper_ahead(p: &mut Parser<'_, '_>) -> bool {
    if p.at(AT) || (at_path_start(p) && !p.at(IDENT)) {
        return true;
    }
    if !p.at(IDENT) {
        return false;
    }
    let m = p.start();
    path_segments(p);
    let found = at_param_start(p);
    m.rollback(p);
    found
}

fn helper_call(p: &mut Parser<'_, '_>) {
    if p.at(AT) {
        data(p);
    } else if p.at(STRING) {
        literal(p);
    } else {
        path(p);
    }
    while !p.at_end() && !p.at_ts(CLOSERS) {
        if at_segment(p) && p.nth_at(1, EQ) {
            hash_segment(p);
        } else if at_param_start(p) {
            let m = p.start();
            param_value(p);
            m.complete(p, MUSTACHE_PARAM);
        } else {
            break;
        }
    }
}

/// `a.b/c`, `../x`, `this`. Assumes the parser is at a path start.
fn path_segments(p: &mut Parser<'_, '_>) {
    let mut want_segment = true;
    loop {
        if want_segment && at_segment(p) {
            p.bump();
            want_segment = false;
        } else if p.at(DOT) || p.at(SLASH) {
            p.bump();
            want_segment = true;
        } else {
            break;
        }
    }
}

fn path(p: &mut Parser<'_, '_>) {
    let m = p.start();
    path_segments(p);
    m.complete(p, PATH);
}

fn data(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // @
    if at_path_start(p) {
        path_segments(p);
    } else {
        p.error("expected a name");
    }
    m.complete(p, DATA);
}

fn literal(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump();
    m.complete(p, LITERAL);
}

fn hash_segment(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // key
    p.bump(); // =
    param_value(p);
    m.complete(p, HASH_SEGMENT);
}

fn param_value(p: &mut Parser<'_, '_>) {
    match p.current() {
        AT => data(p),
        L_PAREN => sub_expression(p),
        k if LITERALS.contains(k) => literal(p),
        _ if at_path_start(p) => path(p),
        _ if p.at_end() || p.at_ts(MUSTACHE_RECOVERY) => p.error("expected a value"),
        _ => p.err_and_skip("expected a value", MUSTACHE_RECOVERY),
    }
}

/// `(helper a b)` or `(a + b)`.
fn sub_expression(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // (
    if !p.enter() {
        p.err_recover("nesting too deep", MUSTACHE_RECOVERY);
    } else if helper_ahead(p) {
        helper_call(p);
    } else {
        expressions::expr_no_assign(p);
    }
    p.exit();
    p.expect(R_PAREN);
    m.complete(p, PAREN_EXPR);
}

fn html_tag(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // <
    p.expect(TAG_NAME);
    loop {
        match p.current() {
            ATTR_NAME => attribute(p),
            OPEN | OPEN_UNESCAPED => mustache(p),
            EQ | QUOTE | ATTR_VALUE | BAD_CHARACTER => {
                p.err_and_skip("unexpected token in tag", TAG_RECOVERY)
            }
            _ => break,
        }
    }
    if !p.eat(R_ANGLE) && !p.eat(SLASH_R_ANGLE) {
        p.error("expected '>'");
    }
    m.complete(p, HTML_TAG);
}

fn html_end_tag(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // </
    p.expect(TAG_NAME);
    p.expect(R_ANGLE);
    m.complete(p, HTML_END_TAG);
}

fn attribute(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // name
    if p.eat(EQ) {
        attr_value(p);
    }
    m.complete(p, HTML_ATTRIBUTE);
}

fn attr_value(p: &mut Parser<'_, '_>) {
    let m = p.start();
    match p.current() {
        QUOTE => {
            p.bump();
            loop {
                match p.current() {
                    ATTR_VALUE => p.bump(),
                    OPEN | OPEN_UNESCAPED => mustache(p),
                    _ => break,
                }
            }
            p.expect(QUOTE);
        }
        ATTR_VALUE => p.bump(),
        OPEN | OPEN_UNESCAPED => mustache(p),
        _ => p.error("expected an attribute value"),
    }
    m.complete(p, HTML_ATTR_VALUE);
}
