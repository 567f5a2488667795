//! Expressions, by precedence climbing.
//!
//! Binding powers, loosest first:
//!
//! | operators                  | node           | associativity |
//! |----------------------------|----------------|---------------|
//! | `=` `+=` `-=` `*=` `/=`    | `ASSIGN_EXPR`  | right         |
//! | `? :`                      | `TERNARY_EXPR` | right         |
//! | `??`                       | `BIN_EXPR`     | left          |
//! | `\|\|`                     | `BIN_EXPR`     | left          |
//! | `&&`                       | `BIN_EXPR`     | left          |
//! | `==` `!=`                  | `BIN_EXPR`     | left          |
//! | `<` `<=` `>` `>=`          | `BIN_EXPR`     | left          |
//! | `+` `-`                    | `BIN_EXPR`     | left          |
//! | `*` `/` `%`                | `BIN_EXPR`     | left          |
//! | prefix `-` `!`             | `PREFIX_EXPR`  |               |
//! | call, index, field         | postfix        |               |

use crate::parser::{CompletedMarker, Parser};
use crate::syntax_kind::SyntaxKind::{self, *};
use crate::token_set::TokenSet;

use super::{block, name_ref, param_list, ITEM_RECOVERY};

pub(crate) const LITERALS: TokenSet =
    TokenSet::new(&[INT_NUMBER, FLOAT_NUMBER, STRING, TRUE_KW, FALSE_KW, NULL_KW]);

pub(crate) const EXPR_START: TokenSet =
    LITERALS.union(TokenSet::new(&[IDENT, L_PAREN, L_BRACK, MINUS, BANG]));

/// Tokens that end an expression, including the closers of the template
/// mustaches expressions are embedded in.
const EXPR_RECOVERY: TokenSet = ITEM_RECOVERY.union(TokenSet::new(&[
    R_PAREN,
    R_BRACK,
    COMMA,
    COLON,
    FAT_ARROW,
    CLOSE,
    CLOSE_UNESCAPED,
]));

const TERNARY_BP: (u8, u8) = (4, 3);
const PREFIX_BP: u8 = 19;

/// Left and right binding power of an infix operator, and the node it builds.
fn infix_binding_power(op: SyntaxKind) -> Option<(u8, u8, SyntaxKind)> {
    let bp = match op {
        EQ | PLUS_EQ | MINUS_EQ | STAR_EQ | SLASH_EQ => (2, 1, ASSIGN_EXPR),
        QUESTION2 => (5, 6, BIN_EXPR),
        PIPE2 => (7, 8, BIN_EXPR),
        AMP2 => (9, 10, BIN_EXPR),
        EQ2 | NEQ => (11, 12, BIN_EXPR),
        LT | LTEQ | GT | GTEQ => (13, 14, BIN_EXPR),
        PLUS | MINUS => (15, 16, BIN_EXPR),
        STAR | SLASH | PERCENT => (17, 18, BIN_EXPR),
        _ => return None,
    };
    Some(bp)
}

/// A full expression, assignment included.
pub(crate) fn expr(p: &mut Parser<'_, '_>) -> Option<CompletedMarker> {
    expr_bp(p, 0, true)
}

/// An expression that may not be an assignment at the top level, as in
/// template mustaches.
pub(crate) fn expr_no_assign(p: &mut Parser<'_, '_>) -> Option<CompletedMarker> {
    expr_bp(p, 0, false)
}

fn expr_bp(p: &mut Parser<'_, '_>, min_bp: u8, allow_assign: bool) -> Option<CompletedMarker> {
    if !p.enter() {
        p.err_and_skip("nesting too deep", EXPR_RECOVERY);
        p.exit();
        return None;
    }
    let result = expr_bp_inner(p, min_bp, allow_assign);
    p.exit();
    result
}

fn expr_bp_inner(p: &mut Parser<'_, '_>, min_bp: u8, allow_assign: bool) -> Option<CompletedMarker> {
    let mut lhs = lhs(p)?;

    loop {
        let op = p.current();

        if op == QUESTION {
            let (l_bp, r_bp) = TERNARY_BP;
            if l_bp < min_bp {
                break;
            }
            let m = lhs.precede(p);
            p.bump(); // ?
            expr_bp(p, 0, allow_assign);
            p.expect(COLON);
            expr_bp(p, r_bp, allow_assign);
            lhs = m.complete(p, TERNARY_EXPR);
            continue;
        }

        let Some((l_bp, r_bp, kind)) = infix_binding_power(op) else {
            break;
        };
        if l_bp < min_bp || (kind == ASSIGN_EXPR && !allow_assign) {
            break;
        }

        let m = lhs.precede(p);
        p.bump();
        expr_bp(p, r_bp, allow_assign);
        lhs = m.complete(p, kind);
    }

    Some(lhs)
}

fn lhs(p: &mut Parser<'_, '_>) -> Option<CompletedMarker> {
    let mut lhs = if p.at(MINUS) || p.at(BANG) {
        let m = p.start();
        p.bump();
        expr_bp(p, PREFIX_BP, false);
        m.complete(p, PREFIX_EXPR)
    } else {
        primary(p)?
    };

    loop {
        // A line break before `(` or `[` starts a new statement
        let postfix_ok = !p.has_newline_before();
        lhs = match p.current() {
            L_PAREN if postfix_ok => {
                let m = lhs.precede(p);
                arg_list(p);
                m.complete(p, CALL_EXPR)
            }
            L_BRACK if postfix_ok => {
                let m = lhs.precede(p);
                p.bump();
                expr(p);
                p.expect(R_BRACK);
                m.complete(p, INDEX_EXPR)
            }
            DOT => {
                let m = lhs.precede(p);
                p.bump();
                name_ref(p);
                m.complete(p, FIELD_EXPR)
            }
            _ => break,
        };
    }

    Some(lhs)
}

fn primary(p: &mut Parser<'_, '_>) -> Option<CompletedMarker> {
    let cm = match p.current() {
        k if LITERALS.contains(k) => {
            let m = p.start();
            p.bump();
            m.complete(p, LITERAL)
        }
        IDENT => {
            let m = p.start();
            p.bump();
            m.complete(p, NAME_REF)
        }
        L_PAREN if lambda_ahead(p) => lambda(p),
        L_PAREN => paren_expr(p),
        L_BRACK => list_expr(p),
        _ => {
            if p.at_end() || p.at_ts(EXPR_RECOVERY) {
                p.error("expected an expression");
            } else {
                let m = p.start();
                p.bump();
                m.error(p, "expected an expression");
            }
            return None;
        }
    };
    Some(cm)
}

fn paren_expr(p: &mut Parser<'_, '_>) -> CompletedMarker {
    let m = p.start();
    p.bump(); // (
    expr(p);
    p.expect(R_PAREN);
    m.complete(p, PAREN_EXPR)
}

fn list_expr(p: &mut Parser<'_, '_>) -> CompletedMarker {
    let m = p.start();
    p.bump(); // [
    delimited(p, R_BRACK);
    p.expect(R_BRACK);
    m.complete(p, LIST_EXPR)
}

fn arg_list(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // (
    delimited(p, R_PAREN);
    p.expect(R_PAREN);
    m.complete(p, ARG_LIST);
}

/// Comma-separated expressions up to, not including, `close`. A trailing
/// comma is allowed. Stray tokens between elements become `ERROR` nodes
/// inside the list, so the closer still lands in its own node.
fn delimited(p: &mut Parser<'_, '_>, close: SyntaxKind) {
    let stop = ITEM_RECOVERY.union(TokenSet::new(&[CLOSE, CLOSE_UNESCAPED]));
    let recovery = EXPR_START
        .union(TokenSet::new(&[COMMA, close]))
        .union(stop);
    let unexpected = format!("expected ',' or {}", close.display_name());

    while !p.at(close) && !p.at_end() && !p.at_ts(stop) {
        if p.at_ts(EXPR_START) {
            expr(p);
        } else if p.at(COMMA) {
            p.error("expected an expression");
        } else {
            p.err_and_skip("expected an expression", recovery);
            continue;
        }

        if p.at(close) || p.eat(COMMA) {
            continue;
        }
        if p.at_end() || p.at_ts(stop) {
            break;
        }
        if p.at_ts(EXPR_START) {
            p.error(&unexpected);
        } else {
            p.err_and_skip(&unexpected, recovery);
            p.eat(COMMA);
        }
    }
}

/// Whether a lambda starts here: a parameter list followed by `=>`, or by
/// `{` on the same line. Only looks; the speculative scan is rolled back.
fn lambda_ahead(p: &mut Parser<'_, '_>) -> bool {
    let m = p.start();
    let found =
        scan_params(p) && (p.at(FAT_ARROW) || (p.at(L_BRACE) && !p.has_newline_before()));
    m.rollback(p);
    found
}

fn scan_params(p: &mut Parser<'_, '_>) -> bool {
    if !p.eat(L_PAREN) {
        return false;
    }
    if p.eat(R_PAREN) {
        return true;
    }
    loop {
        if !p.eat(IDENT) {
            return false;
        }
        if p.eat(COLON) {
            if !p.eat(IDENT) {
                return false;
            }
            p.eat(QUESTION);
        }
        if p.eat(R_PAREN) {
            return true;
        }
        if !p.eat(COMMA) {
            return false;
        }
    }
}

fn lambda(p: &mut Parser<'_, '_>) -> CompletedMarker {
    let m = p.start();
    param_list(p);
    if p.eat(FAT_ARROW) {
        expr(p);
    } else {
        block(p);
    }
    m.complete(p, LAMBDA_EXPR)
}
