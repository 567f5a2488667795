//! Makefile grammar.
//!
//! Newlines are significant here, so every line-level production ends by
//! consuming its `NEWLINE`, and recovery skips to the end of the line.
//!
//! ```text
//! makefile    := line*
//! rule        := TARGET_LINE RECIPE?
//! TARGET_LINE := TARGETS (':' | '::') (TARGET_PATTERN ':')?
//!                (VARIABLE_ASSIGNMENT | PREREQUISITES ('|' ORDER_ONLY_PREREQUISITES)? (';' RECIPE_TEXT?)?)
//!                NEWLINE?
//! CONDITIONAL := if-keyword CONDITION NEWLINE CONDITIONAL_BRANCH
//!                ('else' (if-keyword CONDITION)? NEWLINE CONDITIONAL_BRANCH)* 'endif'
//! DEFINE      := 'define' VARIABLE ASSIGN? NEWLINE DEFINE_LINE* 'endef'
//! ```

use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind::{self, *};
use crate::token_set::TokenSet;

use super::items;

const LINE_END: TokenSet = TokenSet::new(&[NEWLINE]);

const IF_KW: TokenSet = TokenSet::new(&[IFEQ_KW, IFNEQ_KW, IFDEF_KW, IFNDEF_KW]);

const NAME_PARTS: TokenSet = TokenSet::new(&[WORD, VAR_REF]);

const VALUE_PARTS: TokenSet = TokenSet::new(&[VALUE_TEXT, VAR_REF]);

pub(crate) fn makefile(p: &mut Parser<'_, '_>) {
    items(p, |_| false, line);
}

fn line(p: &mut Parser<'_, '_>) {
    match p.current() {
        NEWLINE => p.bump(),
        k if IF_KW.contains(k) => conditional(p),
        DEFINE_KW => define(p),
        INCLUDE_KW => directive(p, INCLUDE),
        UNDEFINE_KW => directive(p, UNDEFINE),
        VPATH_KW => directive(p, VPATH),
        EXPORT_KW => modifier(p, EXPORT),
        OVERRIDE_KW => modifier(p, OVERRIDE),
        PRIVATE_KW => modifier(p, PRIVATE),
        RECIPE_PREFIX => recipe(p),
        ELSE_KW => stray_line(p, "'else' without a conditional"),
        ENDIF_KW => stray_line(p, "'endif' without a conditional"),
        ENDEF_KW => stray_line(p, "'endef' without 'define'"),
        WORD | VAR_REF => rule_or_assignment(p),
        _ => stray_line(p, "unexpected token"),
    }
}

/// What the first separator on the current line is.
fn separator(p: &Parser<'_, '_>) -> SyntaxKind {
    (0..)
        .map(|n| p.nth(n))
        .find(|&k| matches!(k, COLON | DOUBLE_COLON | ASSIGN | NEWLINE | EOF))
        .unwrap_or(EOF)
}

fn rule_or_assignment(p: &mut Parser<'_, '_>) {
    match separator(p) {
        ASSIGN => {
            variable_assignment(p);
            end_of_line(p);
        }
        COLON | DOUBLE_COLON => rule(p),
        _ => {
            let bare_call = (0..)
                .map(|n| p.nth(n))
                .take_while(|&k| k != NEWLINE && k != EOF)
                .all(|k| k == VAR_REF);
            if bare_call {
                // `$(eval ...)` and friends: expanded for their side effects
                while p.at(VAR_REF) {
                    p.bump();
                }
                end_of_line(p);
            } else {
                stray_line(p, "missing separator");
            }
        }
    }
}

/// The rest of the line as one `ERROR`, plus its newline.
fn stray_line(p: &mut Parser<'_, '_>, message: &str) {
    p.err_and_skip(message, LINE_END);
    p.eat(NEWLINE);
}

fn end_of_line(p: &mut Parser<'_, '_>) {
    if p.at_end() || p.eat(NEWLINE) {
        return;
    }
    p.err_recover("expected end of line", LINE_END);
    p.eat(NEWLINE);
}

fn rule(p: &mut Parser<'_, '_>) {
    let m = p.start();
    target_line(p);
    if p.at(RECIPE_PREFIX) || blank_lines_before_recipe(p) > 0 {
        recipe(p);
    }
    m.complete(p, RULE);
}

fn target_line(p: &mut Parser<'_, '_>) {
    let m = p.start();

    list(p, TARGETS, TARGET);
    p.bump(); // : or ::

    let rest = line_shape(p);
    if rest.assign {
        variable_assignment(p);
    } else {
        if rest.second_colon {
            let pattern = p.start();
            while p.at_ts(NAME_PARTS) {
                p.bump();
            }
            pattern.complete(p, TARGET_PATTERN);
            p.expect(COLON);
        }
        list(p, PREREQUISITES, PREREQUISITE);
        if p.eat(PIPE) {
            list(p, ORDER_ONLY_PREREQUISITES, PREREQUISITE);
        }
        if p.eat(SEMICOLON) {
            p.eat(RECIPE_TEXT);
        }
    }

    if !p.at_end() && !p.at(NEWLINE) {
        p.err_recover("unexpected token in rule", LINE_END);
    }
    p.eat(NEWLINE);
    m.complete(p, TARGET_LINE);
}

struct LineShape {
    assign: bool,
    second_colon: bool,
}

/// Looks at the rest of a target line, after its colon, up to `;` or the
/// end of the line.
fn line_shape(p: &Parser<'_, '_>) -> LineShape {
    let mut shape = LineShape {
        assign: false,
        second_colon: false,
    };
    for kind in (0..)
        .map(|n| p.nth(n))
        .take_while(|&k| !matches!(k, NEWLINE | EOF | SEMICOLON | PIPE))
    {
        match kind {
            ASSIGN => {
                shape.assign = true;
                break;
            }
            COLON => shape.second_colon = true,
            _ => {}
        }
    }
    shape
}

/// `outer` containing one `inner` per word or reference. Nothing is built
/// for an empty list.
fn list(p: &mut Parser<'_, '_>, outer: SyntaxKind, inner: SyntaxKind) {
    if !p.at_ts(NAME_PARTS) {
        return;
    }
    let m = p.start();
    while p.at_ts(NAME_PARTS) {
        let item = p.start();
        p.bump();
        item.complete(p, inner);
    }
    m.complete(p, outer);
}

/// How many blank or comment-only lines come before the next recipe line;
/// zero if something else follows them.
fn blank_lines_before_recipe(p: &Parser<'_, '_>) -> usize {
    let mut n = 0;
    while p.nth_at(n, NEWLINE) {
        n += 1;
    }
    if p.nth_at(n, RECIPE_PREFIX) {
        n
    } else {
        0
    }
}

fn recipe(p: &mut Parser<'_, '_>) {
    let m = p.start();
    loop {
        if p.at(RECIPE_PREFIX) {
            command(p);
            continue;
        }
        let blank = blank_lines_before_recipe(p);
        if blank == 0 {
            break;
        }
        for _ in 0..blank {
            p.bump();
        }
    }
    m.complete(p, RECIPE);
}

fn command(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // tab
    while p.at(RECIPE_TEXT) {
        p.bump();
    }
    p.eat(NEWLINE);
    m.complete(p, COMMAND);
}

fn variable_assignment(p: &mut Parser<'_, '_>) {
    let m = p.start();
    variable(p);
    p.expect_with(ASSIGN, "expected an assignment operator");
    if p.at_ts(VALUE_PARTS) {
        let value = p.start();
        while p.at_ts(VALUE_PARTS) {
            p.bump();
        }
        value.complete(p, VARIABLE_VALUE);
    }
    m.complete(p, VARIABLE_ASSIGNMENT);
}

fn variable(p: &mut Parser<'_, '_>) {
    if !p.at_ts(NAME_PARTS) {
        p.error("expected a variable name");
        return;
    }
    let m = p.start();
    while p.at_ts(NAME_PARTS) {
        p.bump();
    }
    m.complete(p, VARIABLE);
}

fn conditional(p: &mut Parser<'_, '_>) {
    let m = p.start();
    condition(p);
    end_of_line(p);

    if p.enter() {
        branch(p);
        while p.at(ELSE_KW) {
            p.bump();
            if p.at_ts(IF_KW) {
                condition(p);
            }
            end_of_line(p);
            branch(p);
        }
    } else {
        p.err_recover("nesting too deep", TokenSet::new(&[ENDIF_KW]));
    }
    p.exit();

    if p.eat(ENDIF_KW) {
        end_of_line(p);
    } else {
        p.error("expected 'endif'");
    }
    m.complete(p, CONDITIONAL);
}

/// An `if*` keyword and its condition text.
fn condition(p: &mut Parser<'_, '_>) {
    p.bump();
    if !p.at(CONDITION) {
        p.error("expected a condition");
    }
    while p.at(CONDITION) {
        p.bump();
    }
}

fn branch(p: &mut Parser<'_, '_>) {
    let m = p.start();
    items(p, |p| p.at(ELSE_KW) || p.at(ENDIF_KW), line);
    m.complete(p, CONDITIONAL_BRANCH);
}

fn define(p: &mut Parser<'_, '_>) {
    let m = p.start();
    p.bump(); // define
    variable(p);
    p.eat(ASSIGN);
    end_of_line(p);

    while p.at(DEFINE_LINE) || p.at(NEWLINE) {
        p.bump();
    }

    if p.eat(ENDEF_KW) {
        end_of_line(p);
    } else {
        p.error("expected 'endef'");
    }
    m.complete(p, DEFINE);
}

/// `include`, `undefine` and `vpath`: a keyword and words to the end of the
/// line.
fn directive(p: &mut Parser<'_, '_>, kind: SyntaxKind) {
    let m = p.start();
    p.bump();
    while p.at_ts(NAME_PARTS) || p.at(COLON) {
        p.bump();
    }
    end_of_line(p);
    m.complete(p, kind);
}

/// `export`, `override` and `private` wrap an assignment, a `define`, or a
/// list of variable names.
fn modifier(p: &mut Parser<'_, '_>, kind: SyntaxKind) {
    let m = p.start();
    p.bump();
    if !p.enter() {
        p.err_recover("nesting too deep", LINE_END);
        p.eat(NEWLINE);
        p.exit();
        m.complete(p, kind);
        return;
    }
    match p.current() {
        EXPORT_KW => modifier(p, EXPORT),
        OVERRIDE_KW => modifier(p, OVERRIDE),
        PRIVATE_KW => modifier(p, PRIVATE),
        DEFINE_KW => define(p),
        WORD | VAR_REF if separator(p) == ASSIGN => {
            variable_assignment(p);
            end_of_line(p);
        }
        _ => {
            while p.at_ts(NAME_PARTS) {
                p.bump();
            }
            end_of_line(p);
        }
    }
    p.exit();
    m.complete(p, kind);
}
