//! Tree queries.
//!
//! Navigation is plain Rowan: parents are computed on demand from the red
//! tree and never own anything, so the functions here are thin, named entry
//! points over it plus a debug dump.

use std::ops::Range;

use rowan::{NodeOrToken, TextSize};

use crate::syntax_kind::{SyntaxElement, SyntaxNode, TesseraLang};

/// The innermost node containing `offset`.
///
/// An offset on a token boundary belongs to the token that starts there; the
/// end of the text belongs to the last token. Offsets past the end give
/// `None`.
pub fn node_at(root: &SyntaxNode, offset: TextSize) -> Option<SyntaxNode> {
    if !root.text_range().contains_inclusive(offset) {
        return None;
    }
    let token = root.token_at_offset(offset).right_biased();
    Some(token.and_then(|t| t.parent()).unwrap_or_else(|| root.clone()))
}

/// The slice of `source` that `node` spans. Empty if `node` did not come from
/// `source`.
pub fn text_of<'s>(source: &'s str, node: &SyntaxNode) -> &'s str {
    source.get(Range::<usize>::from(node.text_range())).unwrap_or_default()
}

pub fn children_of(node: &SyntaxNode) -> rowan::SyntaxElementChildren<TesseraLang> {
    node.children_with_tokens()
}

pub fn parent_of(element: &SyntaxElement) -> Option<SyntaxNode> {
    element.parent()
}

/// Concatenation of every leaf token in order.
pub fn render(root: &SyntaxNode) -> String {
    root.descendants_with_tokens()
        .filter_map(NodeOrToken::into_token)
        .map(|token| token.text().to_string())
        .collect()
}

/// One line per node or token, indented two spaces per level:
///
/// ```text
/// ROOT@0..2
///   EXPR_STMT@0..2
///     LITERAL@0..1
///       INT_NUMBER@0..1 "1"
///     SEMICOLON@1..2 ";"
/// ```
pub fn debug_tree(node: &SyntaxNode) -> String {
    let mut out = String::new();
    write_node(&mut out, node, 0);
    out
}

fn write_node(out: &mut String, node: &SyntaxNode, indent: usize) {
    let prefix = "  ".repeat(indent);
    out.push_str(&format!("{prefix}{:?}@{:?}\n", node.kind(), node.text_range()));
    for child in node.children_with_tokens() {
        match child {
            NodeOrToken::Node(n) => write_node(out, &n, indent + 1),
            NodeOrToken::Token(t) => out.push_str(&format!(
                "{prefix}  {:?}@{:?} {:?}\n",
                t.kind(),
                t.text_range(),
                t.text()
            )),
        }
    }
}
