//! # tessera-syntax
//!
//! Error-tolerant lexers and lossless syntax trees for a small script
//! language, Handlebars-style templates and Makefiles, using [Rowan] +
//! [Logos] and following the [rust-analyzer] architecture model.
//!
//! [Rowan]: https://docs.rs/rowan
//! [Logos]: https://docs.rs/logos
//! [rust-analyzer]: https://rust-analyzer.github.io/book/contributing/syntax.html
//!
//! ## What is a Lossless CST?
//!
//! Unlike an Abstract Syntax Tree (AST) which discards formatting details, a
//! Concrete Syntax Tree (CST) preserves **every byte** of the original source:
//! whitespace, comments, even garbage the parser could not make sense of.
//! Editors need exactly that: diagnostics point at real offsets, and the tree
//! prints back to the text the user typed.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source Text → Lexer → Tokens → Parser → Events → Sink → Rowan Tree
//!               (Logos)          (Grammar)        (GreenNodeBuilder)
//! ```
//!
//! ### 1. Lexer ([`lexer`] module)
//!
//! Each language has its own rules, driven by a generic, restartable
//! [`Lexer`](lexer::Lexer). Templates run two lexers at once: the
//! [`LayeredLexer`](lexer::layered::LayeredLexer) hands the inside of every
//! `{{ ... }}` to the script lexer.
//!
//! ```text
//! "<b>{{ x }}</b>" → [L_ANGLE, TAG_NAME, R_ANGLE, OPEN, WHITESPACE, IDENT,
//!                     WHITESPACE, CLOSE, L_ANGLE_SLASH, TAG_NAME, R_ANGLE]
//! ```
//!
//! ### 2. Parser ([`parser`] module)
//!
//! Grammar rules in [`parser::grammar`] drive a [`Parser`](parser::Parser)
//! that emits **events** (Start, Token, Finish, Error). Markers can be
//! completed, turned into error nodes, abandoned or rolled back for
//! speculative parsing. Recovery wraps unexpected tokens in `ERROR` nodes.
//!
//! ### 3. Sink ([`parser::sink`] module)
//!
//! The sink consumes events and builds a Rowan green tree. The resulting tree
//! is immutable, `Send + Sync`, and cheap to clone.
//!
//! ## Module Structure
//!
//! ```text
//! tessera-syntax/
//! ├── lib.rs           # This file - public API and fixture tests
//! ├── language.rs      # Language, Registry, ParseOptions, Parse
//! ├── syntax_kind.rs   # SyntaxKind enum (tokens + nodes) and Rowan integration
//! ├── token_set.rs     # Bitset of kinds for lookahead and recovery
//! ├── error.rs         # ParseError diagnostics and BuilderError bugs
//! ├── brace.rs         # Brace and block matching
//! ├── tree.rs          # Tree queries and the debug dump
//! ├── lexer/           # Per-language rules and the layered lexer
//! └── parser/
//!     ├── mod.rs       # Parser struct and the Marker system
//!     ├── event.rs     # Event enum
//!     ├── sink.rs      # Converts events to a Rowan GreenNode
//!     └── grammar/     # Script, template and Makefile grammars
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use tessera_syntax::{Language, SyntaxKind};
//!
//! let parse = Language::Script.parse("let x = 1 +;\n");
//!
//! // The tree preserves all text, even with errors
//! assert_eq!(parse.syntax().text().to_string(), "let x = 1 +;\n");
//! assert_eq!(parse.errors().len(), 1);
//!
//! let decl = parse.syntax().first_child().unwrap();
//! assert_eq!(decl.kind(), SyntaxKind::VAR_DECL);
//! ```

mod error;

pub mod brace;
pub mod language;
pub mod lexer;
pub mod parser;
pub mod syntax_kind;
pub mod token_set;
pub mod tree;

pub use error::{BuilderError, ParseError, UnknownLanguage};
pub use language::{Language, Parse, ParseOptions, Registry};
pub use lexer::{LexState, Token};
pub use parser::Cancellation;
pub use syntax_kind::{SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken, TesseraLang};
pub use token_set::TokenSet;
