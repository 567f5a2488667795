//! # Grammar Rules
//!
//! This module contains the grammar rules that drive parsing. Each function
//! takes a `&mut Parser` and uses its methods to:
//!
//! 1. Inspect the current token (`p.current()`, `p.at()`, `p.nth()`)
//! 2. Consume tokens (`p.bump()`, `p.eat()`, `p.expect()`)
//! 3. Build tree structure (`p.start()` → marker → `complete()`/`abandon()`)
//!
//! ## Module Structure
//!
//! - [`script`] - Declarations, statements and expressions of the script language
//! - [`template`] - Markup, mustaches and blocks of templates
//! - [`makefile`] - Line-oriented Makefile grammar
//!
//! ## Writing Grammar Rules
//!
//! A typical grammar function looks like:
//!
//! ```ignore
//! fn while_stmt(p: &mut Parser) {
//!     let m = p.start();               // 1. Start a node
//!     p.bump();                        // 2. Consume `while`
//!     condition(p);                    // 3. Call other grammar rules
//!     statement(p);
//!     m.complete(p, SyntaxKind::WHILE_STMT); // 4. Complete the node
//! }
//! ```
//!
//! ## Error Recovery
//!
//! Grammar functions must be total: they produce a tree for any input.
//! When something unexpected happens:
//!
//! - Record a zero-width diagnostic if the missing piece can simply be absent
//! - Wrap unexpected tokens in an ERROR node with `err_recover`/`err_and_skip`
//! - Never panic and never return an error
//!
//! Every loop over a sequence must consume at least one token per iteration
//! or stop; [`items`] enforces this for the top-level loops. The goal is a
//! valid tree that preserves all input bytes.

pub mod makefile;
pub mod script;
pub mod template;

use crate::parser::Parser;
use crate::syntax_kind::SyntaxKind;

/// Parse a script file.
pub fn script_file(p: &mut Parser<'_, '_>) {
    root(p, script::file);
}

/// Parse a template document.
pub fn template_file(p: &mut Parser<'_, '_>) {
    root(p, template::document);
}

/// Parse a Makefile.
pub fn makefile_file(p: &mut Parser<'_, '_>) {
    root(p, makefile::makefile);
}

/// Wrap `body` in the ROOT node.
///
/// Whatever `body` leaves behind (trailing trivia, or the rest of the input
/// after a cancellation) still goes into the root, so the tree always renders
/// back to the full source.
fn root(p: &mut Parser<'_, '_>, body: fn(&mut Parser<'_, '_>)) {
    let m = p.start();
    body(p);
    p.drain_remaining();
    m.complete(p, SyntaxKind::ROOT);
}

/// Run `item` until `done` holds or the input ends.
///
/// An iteration that consumes nothing is turned into an error that skips one
/// token, so the loop always terminates.
pub(crate) fn items(
    p: &mut Parser<'_, '_>,
    done: impl Fn(&Parser<'_, '_>) -> bool,
    mut item: impl FnMut(&mut Parser<'_, '_>),
) {
    while !p.at_end() && !done(p) {
        let before = p.position();
        item(p);
        if p.position() == before && !p.at_end() && !done(p) {
            let m = p.start();
            p.bump();
            m.error(p, "unexpected token");
        }
    }
}
