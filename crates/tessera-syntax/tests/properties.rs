//! Property tests over arbitrary input: every byte is tokenized exactly once,
//! trees print back to their source, marker misuse is caught, one stray token
//! costs one diagnostic, and brace matching is an involution on well-nested
//! input.

use std::panic::{catch_unwind, AssertUnwindSafe};

use proptest::prelude::*;
use tessera_syntax::brace::find_match;
use tessera_syntax::lexer::{script::ScriptRules, Lexer, Token};
use tessera_syntax::parser::{Marker, Parser, Sink};
use tessera_syntax::{tree, Language, SyntaxKind, SyntaxNode, TokenSet};

const TRIVIA: TokenSet = TokenSet::new(&[SyntaxKind::WHITESPACE, SyntaxKind::NEWLINE]);

/// Text biased towards the characters every grammar treats specially.
fn source() -> impl Strategy<Value = String> {
    prop_oneof![
        r#"[a-z0-9{}()\[\]<>"'$:=#;,.@!^|/*+\\ \t\n-]{0,80}"#,
        any::<String>(),
    ]
}

fn assert_covers(text: &str, tokens: &[Token]) -> Result<(), TestCaseError> {
    let mut offset = 0;
    for token in tokens {
        prop_assert_eq!(token.start(), offset, "gap or overlap at {}", offset);
        prop_assert!(token.end() > token.start(), "empty token at {}", offset);
        offset = token.end();
    }
    prop_assert_eq!(offset, text.len());
    Ok(())
}

proptest! {
    #[test]
    fn tokens_cover_the_input(text in source()) {
        for language in Language::ALL {
            let (tokens, _) = language.tokenize(&text);
            assert_covers(&text, &tokens)?;
        }
    }

    #[test]
    fn trees_render_back_to_the_input(text in source()) {
        for language in Language::ALL {
            let parse = language.parse(&text);
            let root = parse.syntax();
            prop_assert_eq!(tree::render(&root), text.clone());
            for node in root.descendants() {
                let children: String = node
                    .children_with_tokens()
                    .map(|c| match c {
                        rowan::NodeOrToken::Node(n) => n.text().to_string(),
                        rowan::NodeOrToken::Token(t) => t.text().to_string(),
                    })
                    .collect();
                prop_assert_eq!(children, node.text().to_string());
            }
            for error in parse.errors() {
                prop_assert!(usize::from(error.range.end()) <= text.len());
            }
        }
    }

    #[test]
    fn unclosed_nesting_terminates(open in "[({\\[]", depth in 0usize..3000) {
        let text = open.repeat(depth);
        let parse = Language::Script.parse(&text);
        prop_assert_eq!(parse.syntax().text().to_string(), text);
    }

    #[test]
    fn deep_unclosed_constructs_terminate(
        (language, head, open) in prop_oneof![
            Just((Language::Script, "", "if (a) ")),
            Just((Language::Script, "", "while (a) ")),
            Just((Language::Script, "", "- ")),
            Just((Language::Script, "", "f(")),
            Just((Language::Template, "{{f ", "(g ")),
            Just((Language::Template, "", "{{#if a}}")),
            Just((Language::Makefile, "", "export ")),
            Just((Language::Makefile, "", "ifdef A\n")),
        ],
        depth in 0usize..3000,
    ) {
        let text = format!("{head}{}", open.repeat(depth));
        let parse = language.parse(&text);
        prop_assert_eq!(parse.syntax().text().to_string(), text);
    }

    #[test]
    fn one_stray_token_in_a_script_costs_one_diagnostic(
        garbage in prop_oneof![Just("@"), Just("#"), Just("&")],
        slot in 0usize..=6,
    ) {
        let mut parts = vec!["let a = f(", "x", ", ", "y", ")\n", "let b = 2\n"];
        parts.insert(slot, garbage);
        let text = parts.concat();
        let parse = Language::Script.parse(&text);
        prop_assert_eq!(parse.syntax().text().to_string(), text.clone());
        prop_assert_eq!(parse.errors().len(), 1, "{:?} in {:?}", parse.errors(), text);
        let decls = parse
            .syntax()
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::VAR_DECL)
            .count();
        prop_assert_eq!(decls, 2);
    }

    #[test]
    fn one_stray_token_in_a_template_costs_one_diagnostic(slot in 1usize..=3) {
        let mut parts = vec!["<p>{{f", " a", " b", "}}</p>{{g}}"];
        parts.insert(slot, ")");
        let text = parts.concat();
        let parse = Language::Template.parse(&text);
        prop_assert_eq!(parse.syntax().text().to_string(), text.clone());
        prop_assert_eq!(parse.errors().len(), 1, "{:?} in {:?}", parse.errors(), text);
        let mustaches = parse
            .syntax()
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::MUSTACHE)
            .count();
        prop_assert_eq!(mustaches, 2);
    }

    #[test]
    fn one_stray_line_in_a_makefile_costs_one_diagnostic(slot in 0usize..=4) {
        let mut lines = vec!["CC = cc\n", "all: app\n", "\tcc -o app\n", "clean:\n"];
        lines.insert(slot, "endif\n");
        let text = lines.concat();
        let parse = Language::Makefile.parse(&text);
        prop_assert_eq!(parse.syntax().text().to_string(), text.clone());
        let errors: Vec<_> = parse.errors().iter().map(|e| e.message.as_str()).collect();
        prop_assert_eq!(errors, vec!["'endif' without a conditional"], "in {:?}", text);
        let rules = parse
            .syntax()
            .children()
            .filter(|n| n.kind() == SyntaxKind::RULE)
            .count();
        prop_assert_eq!(rules, 2);
    }

    #[test]
    fn legal_marker_sequences_build_lossless_trees(
        text in "[a-z ]{0,40}",
        ops in prop::collection::vec(0u8..5, 0..60),
    ) {
        let root = build_with_ops(&text, &ops);
        prop_assert_eq!(root.text().to_string(), text);
    }

    #[test]
    fn rollback_after_commit_is_rejected(prefix in 0usize..4) {
        let text = "a b c d e f";
        let tokens: Vec<Token> = Lexer::new(ScriptRules, text).collect();
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut p = Parser::new(text, &tokens, TRIVIA);
            let root = p.start();
            for _ in 0..prefix {
                p.bump();
            }
            let outer = p.start();
            let inner = p.start();
            p.bump();
            inner.complete(&mut p, SyntaxKind::NAME_REF);
            outer.rollback(&mut p);
            root.complete(&mut p, SyntaxKind::ROOT);
        }));
        prop_assert!(result.is_err());
    }

    #[test]
    fn script_brace_matching_is_an_involution(text in nested_brackets()) {
        check_involution(Language::Script, &text)?;
    }

    #[test]
    fn template_block_matching_is_an_involution(text in nested_blocks()) {
        check_involution(Language::Template, &text)?;
    }

    #[test]
    fn makefile_conditional_matching_is_an_involution(text in nested_conditionals()) {
        check_involution(Language::Makefile, &text)?;
    }
}

/// Drive the builder with `ops`, only ever doing what is legal at that point:
/// 0 bump, 1 start, 2 complete, 3 abandon, 4 rollback. Abandon and rollback
/// turn into complete once a node was committed inside the marker.
fn build_with_ops(text: &str, ops: &[u8]) -> SyntaxNode {
    let tokens: Vec<Token> = Lexer::new(ScriptRules, text).collect();
    let mut p = Parser::new(text, &tokens, TRIVIA);
    let root = p.start();
    // Each open marker with the number of nodes committed before it started.
    let mut open: Vec<(Marker, usize)> = Vec::new();
    let mut committed = 0;

    for op in ops {
        match op {
            0 if !p.at_end() => p.bump(),
            1 => open.push((p.start(), committed)),
            2..=4 if !open.is_empty() => {
                let (marker, before) = open.pop().unwrap();
                match op {
                    3 if before == committed => marker.abandon(&mut p),
                    4 if before == committed => marker.rollback(&mut p),
                    _ => {
                        marker.complete(&mut p, SyntaxKind::EXPR_STMT);
                        committed += 1;
                    }
                }
            }
            _ => {}
        }
    }
    while let Some((marker, _)) = open.pop() {
        marker.complete(&mut p, SyntaxKind::EXPR_STMT);
    }
    p.drain_remaining();
    root.complete(&mut p, SyntaxKind::ROOT);
    let (green, errors) = Sink::new(text, &tokens, p.finish().events).finish();
    assert!(errors.is_empty());
    SyntaxNode::new_root(green)
}

fn nested_brackets() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![Just(String::new()), "[a-z]{1,3}", "[0-9]{1,2}"];
    leaf.prop_recursive(5, 48, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|v| v.join(" ")),
            inner.clone().prop_map(|s| format!("({s})")),
            inner.clone().prop_map(|s| format!("[{s}]")),
            inner.prop_map(|s| format!("{{{s}}}")),
        ]
    })
}

fn nested_blocks() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![Just(String::new()), "[a-z ]{1,5}", "[a-z]{1,4}".prop_map(|s| format!("{{{{{s}}}}}"))];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|v| v.concat()),
            inner
                .clone()
                .prop_map(|s| format!("{{{{#each list}}}}{s}{{{{/each}}}}")),
            (inner.clone(), inner).prop_map(|(a, b)| {
                format!("{{{{^empty}}}}{a}{{{{^}}}}{b}{{{{/empty}}}}")
            }),
        ]
    })
}

/// Whole lines: assignments, `define` blocks and conditionals, including
/// `else` and `else ifndef` branches.
fn nested_conditionals() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just(String::new()),
        "[A-Z]{1,3} = [a-z]{1,3}\n",
        "[0-9 ]{0,6}".prop_map(|body| format!("define V\n{body}\nendef\n")),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(|v| v.concat()),
            inner.clone().prop_map(|s| format!("ifdef A\n{s}endif\n")),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| format!("ifeq (a,b)\n{a}else\n{b}endif\n")),
            (inner.clone(), inner.clone(), inner).prop_map(|(a, b, c)| {
                format!("ifdef A\n{a}else ifndef B\n{b}else\n{c}endif\n")
            }),
        ]
    })
}

fn check_involution(language: Language, text: &str) -> Result<(), TestCaseError> {
    let (tokens, _) = language.tokenize(text);
    let table = language.brace_table();
    for (i, token) in tokens.iter().enumerate() {
        let is_delimiter = table
            .pairs
            .iter()
            .any(|pair| pair.open.contains(token.kind) || pair.close == token.kind);
        let Some(j) = find_match(&tokens, i, table) else {
            // Only a bare `{{^}}` or an `else ifdef` may go unmatched in
            // well-nested input
            let chained = tokens[..i]
                .iter()
                .rev()
                .find(|t| !table.trivia.contains(t.kind))
                .is_some_and(|t| t.kind == SyntaxKind::ELSE_KW);
            prop_assert!(
                !is_delimiter || token.kind == SyntaxKind::OPEN_INVERSE || chained,
                "unmatched {:?} at {} in {:?}",
                token.kind,
                i,
                text
            );
            continue;
        };
        prop_assert_eq!(find_match(&tokens, j, table), Some(i), "in {:?}", text);
    }
    Ok(())
}
