//! Script grammar: declarations and statements.
//!
//! ```text
//! file      := item*
//! item      := fn_decl | class_decl | var_decl | stmt
//! fn_decl   := 'fn' NAME PARAM_LIST (BLOCK | '=>' expr stmt_end)
//! class_decl:= 'class' NAME ('extends' NAME_REF)? '{' (fn_decl | var_decl)* '}'
//! var_decl  := ('let' | 'var' | 'const') NAME (':' TYPE_REF)? ('=' expr)? stmt_end
//! ```
//!
//! Statements end at `;`, at a line break, before `}` or at the end of input.

pub(crate) mod expressions;

use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind::{self, *};
use crate::token_set::TokenSet;

use super::items;

pub(crate) const DECL_KW: TokenSet = TokenSet::new(&[LET_KW, VAR_KW, CONST_KW]);

const ITEM_START: TokenSet = TokenSet::new(&[FN_KW, CLASS_KW]).union(DECL_KW);

const STMT_START: TokenSet = TokenSet::new(&[
    IF_KW,
    WHILE_KW,
    FOR_KW,
    RETURN_KW,
    BREAK_KW,
    CONTINUE_KW,
    L_BRACE,
    SEMICOLON,
]);

/// Where a broken item or statement resynchronises.
pub(crate) const ITEM_RECOVERY: TokenSet = ITEM_START
    .union(STMT_START)
    .union(TokenSet::new(&[R_BRACE]));

const MEMBER_RECOVERY: TokenSet = TokenSet::new(&[FN_KW, R_BRACE]).union(DECL_KW);

/// Where an over-deep statement resumes: the next declaration or the end of
/// the enclosing statement.
const NESTING_RECOVERY: TokenSet = ITEM_START.union(TokenSet::new(&[SEMICOLON, R_BRACE]));

const PARAM_RECOVERY: TokenSet = TokenSet::new(&[COMMA, R_PAREN, L_BRACE, FAT_ARROW]);

pub(crate) fn file(p: &mut Parser<'_, '_>) {
    items(
        p,
        |_| false,
        |p| {
            if p.at(R_BRACE) {
                p.err_and_skip("unexpected closing brace", ITEM_RECOVERY);
            } else {
                item(p);
            }
        },
    );
}

fn item(p: &mut Parser<'_, '_>) {
    match p.current() {
        FN_KW => fn_decl(p),
        CLASS_KW => class_decl(p),
        LET_KW | VAR_KW | CONST_KW => var_decl(p),
        _ => statement(p),
    }
}

fn fn_decl(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // fn
    name(p);

    if p.at(L_PAREN) {
        param_list(p);
    } else {
        p.error("expected parameter list");
    }

    if p.at(L_BRACE) {
        block(p);
    } else if p.eat(FAT_ARROW) {
        expressions::expr(p);
        stmt_end(p);
    } else {
        p.err_recover("expected a function body", ITEM_RECOVERY);
    }

    m.complete(p, FN_DECL);
}

fn class_decl(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // class
    name(p);

    if p.at_contextual_kw("extends") {
        let e = p.start();
        p.bump_remap(EXTENDS_KW);
        name_ref(p);
        e.complete(p, EXTENDS_CLAUSE);
    }

    if p.at(L_BRACE) {
        class_body(p);
    } else {
        p.err_recover("expected class body", ITEM_RECOVERY);
    }

    m.complete(p, CLASS_DECL);
}

fn class_body(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // {
    let deep = !p.enter();
    if deep {
        p.err_recover("nesting too deep", TokenSet::new(&[R_BRACE]));
    }

    items(
        p,
        |p| p.at(R_BRACE),
        |p| match p.current() {
            FN_KW => fn_decl(p),
            LET_KW | VAR_KW | CONST_KW => var_decl(p),
            _ => p.err_and_skip("expected a class member", MEMBER_RECOVERY),
        },
    );

    p.exit();
    p.expect(R_BRACE);
    m.complete(p, CLASS_BODY);
}

fn var_decl(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // let, var or const
    name(p);
    if p.eat(COLON) {
        type_ref(p);
    }
    if p.eat(EQ) {
        expressions::expr(p);
    }
    stmt_end(p);
    m.complete(p, VAR_DECL);
}

pub(crate) fn name(p: &mut Parser<'_, '_>) {
    if p.at(IDENT) {
        let m = p.start();
        p.bump();
        m.complete(p, NAME);
    } else {
        p.error("expected a name");
    }
}

pub(crate) fn name_ref(p: &mut Parser<'_, '_>) {
    if p.at(IDENT) {
        let m = p.start();
        p.bump();
        m.complete(p, NAME_REF);
    } else {
        p.error("expected a name");
    }
}

fn type_ref(p: &mut Parser<'_, '_>) {
    if p.at(IDENT) {
        let m = p.start();
        p.bump();
        p.eat(QUESTION); // nullable
        m.complete(p, TYPE_REF);
    } else {
        p.error("expected a type");
    }
}

/// `'(' (PARAM (',' PARAM)*)? ')'`
pub(crate) fn param_list(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // (
    while !p.at(R_PAREN) && !p.at_end() && !p.at_ts(TokenSet::new(&[L_BRACE, FAT_ARROW])) {
        if !p.at(IDENT) {
            p.err_and_skip("expected a parameter", PARAM_RECOVERY);
            p.eat(COMMA);
            continue;
        }
        param(p);
        if !p.at(R_PAREN) && !p.eat(COMMA) {
            break;
        }
    }
    p.expect(R_PAREN);
    m.complete(p, PARAM_LIST);
}

fn param(p: &mut Parser<'_, '_>) {
    let m = p.start();
    name(p);
    if p.eat(COLON) {
        type_ref(p);
    }
    if p.eat(EQ) {
        expressions::expr(p);
    }
    m.complete(p, PARAM);
}

pub(crate) fn block(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // {
    if !p.enter() {
        p.err_recover("nesting too deep", TokenSet::new(&[R_BRACE]));
    }

    items(p, |p| p.at(R_BRACE), item);

    p.exit();
    p.expect(R_BRACE);
    m.complete(p, BLOCK);
}

fn statement(p: &mut Parser<'_, '_>) {
    match p.current() {
        IF_KW => if_stmt(p),
        WHILE_KW => while_stmt(p),
        FOR_KW => for_stmt(p),
        RETURN_KW => return_stmt(p),
        BREAK_KW => keyword_stmt(p, BREAK_STMT),
        CONTINUE_KW => keyword_stmt(p, CONTINUE_STMT),
        L_BRACE => block(p),
        SEMICOLON => {
            let m = p.start();
            p.bump();
            m.complete(p, EMPTY_STMT);
        }
        _ if p.at_ts(expressions::EXPR_START) => expr_stmt(p),
        _ if p.at(R_BRACE) || p.at_end() => p.error("expected a statement"),
        _ => p.err_and_skip("expected a statement", ITEM_RECOVERY),
    }
}

/// A statement in a position that only takes statements, such as the body
/// of an `if`. Declarations there are reported but still parsed.
fn sub_statement(p: &mut Parser<'_, '_>) {
    if !p.enter() {
        p.err_recover("nesting too deep", NESTING_RECOVERY);
    } else if p.at_ts(ITEM_START) {
        let m = p.start();
        item(p);
        m.error(p, "expected a statement, found a declaration");
    } else {
        statement(p);
    }
    p.exit();
}

fn if_stmt(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // if
    condition(p);
    sub_statement(p);
    if p.at(ELSE_KW) {
        let e = p.start();
        p.bump();
        sub_statement(p);
        e.complete(p, ELSE_BRANCH);
    }
    m.complete(p, IF_STMT);
}

fn while_stmt(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // while
    condition(p);
    sub_statement(p);
    m.complete(p, WHILE_STMT);
}

/// `'for' '(' ('let' | 'var' | 'const')? NAME 'in' expr ')' stmt`
fn for_stmt(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // for
    p.expect(L_PAREN);
    if p.at_ts(DECL_KW) {
        p.bump();
    }
    name(p);
    p.expect(IN_KW);
    expressions::expr(p);
    p.expect(R_PAREN);
    sub_statement(p);
    m.complete(p, FOR_STMT);
}

fn condition(p: &mut Parser<'_, '_>) {
    p.expect(L_PAREN);
    expressions::expr(p);
    p.expect(R_PAREN);
}

fn return_stmt(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // return
    if !at_stmt_end(p) {
        expressions::expr(p);
    }
    stmt_end(p);
    m.complete(p, RETURN_STMT);
}

fn keyword_stmt(p: &mut Parser<'_, '_>, kind: SyntaxKind) {
    let m = p.start();
    p.bump();
    stmt_end(p);
    m.complete(p, kind);
}

fn expr_stmt(p: &mut Parser<'_, '_>) {
    let m = p.start();
    expressions::expr(p);
    stmt_end(p);
    m.complete(p, EXPR_STMT);
}

fn at_stmt_end(p: &Parser<'_, '_>) -> bool {
    p.at(SEMICOLON) || p.at(R_BRACE) || p.at(ELSE_KW) || p.at_end() || p.has_newline_before()
}

fn stmt_end(p: &mut Parser<'_, '_>) {
    if p.eat(SEMICOLON) || at_stmt_end(p) {
        return;
    }
    p.err_recover("expected ';'", ITEM_RECOVERY);
    p.eat(SEMICOLON);
}
