//! Languages, the embedding registry and the parse entry points.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use log::debug;
use rowan::GreenNode;

use crate::brace::BraceTable;
use crate::error::{ParseError, UnknownLanguage};
use crate::lexer::layered::{Embedding, LayeredLexer};
use crate::lexer::makefile::MakefileRules;
use crate::lexer::script::ScriptRules;
use crate::lexer::template::TemplateRules;
use crate::lexer::{collect_tokens, LanguageRules, LexState, Lexer, Token};
use crate::parser::{grammar, Cancellation, Parser, Sink, DEFAULT_MAX_DEPTH};
use crate::syntax_kind::{SyntaxKind, SyntaxNode};
use crate::token_set::TokenSet;

/// Every language this crate can lex and parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Script,
    Template,
    Makefile,
}

const SCRIPT_TRIVIA: TokenSet =
    TokenSet::new(&[SyntaxKind::WHITESPACE, SyntaxKind::NEWLINE, SyntaxKind::COMMENT]);

const MAKEFILE_TRIVIA: TokenSet = TokenSet::new(&[
    SyntaxKind::WHITESPACE,
    SyntaxKind::COMMENT,
    SyntaxKind::LINE_CONTINUATION,
]);

impl Language {
    pub const ALL: [Language; 3] = [Language::Script, Language::Template, Language::Makefile];

    pub fn name(self) -> &'static str {
        match self {
            Language::Script => "script",
            Language::Template => "template",
            Language::Makefile => "makefile",
        }
    }

    /// Guess the language from a file name or extension.
    pub fn from_path(path: &Path) -> Option<Language> {
        let file_name = path.file_name()?.to_str()?;
        if matches!(file_name, "Makefile" | "makefile" | "GNUmakefile") {
            return Some(Language::Makefile);
        }
        match path.extension()?.to_str()? {
            "tss" => Some(Language::Script),
            "hbs" | "handlebars" | "mustache" => Some(Language::Template),
            "mk" | "mak" => Some(Language::Makefile),
            _ => None,
        }
    }

    pub fn rules(self) -> LanguageRules {
        match self {
            Language::Script => LanguageRules::Script(ScriptRules),
            Language::Template => LanguageRules::Template(TemplateRules),
            Language::Makefile => LanguageRules::Makefile(MakefileRules),
        }
    }

    /// Kinds the parser skips over. Newlines are significant in Makefiles.
    pub fn trivia(self) -> TokenSet {
        match self {
            Language::Script | Language::Template => SCRIPT_TRIVIA,
            Language::Makefile => MAKEFILE_TRIVIA,
        }
    }

    pub fn brace_table(self) -> &'static BraceTable {
        match self {
            Language::Script => &BraceTable::SCRIPT,
            Language::Template => &BraceTable::TEMPLATE,
            Language::Makefile => &BraceTable::MAKEFILE,
        }
    }

    /// Lex `text` with the process-wide registry.
    pub fn tokenize(self, text: &str) -> (Vec<Token>, LexState) {
        self.tokenize_with(text, Registry::global())
    }

    /// Lex `text`, layering in whatever `registry` embeds into this language.
    pub fn tokenize_with(self, text: &str, registry: &Registry) -> (Vec<Token>, LexState) {
        let primary = Lexer::new(self.rules(), text);
        match (self.embedding_point(), registry.embedded(self)) {
            (Some(embedding), Some(guest)) => {
                let secondary = Lexer::new(guest.rules(), text);
                collect_tokens(LayeredLexer::new(primary, secondary, embedding, text))
            }
            _ => collect_tokens(primary),
        }
    }

    /// Where another grammar can take over this language's token stream.
    fn embedding_point(self) -> Option<Embedding> {
        match self {
            Language::Template => Some(Embedding::MUSTACHE),
            Language::Script | Language::Makefile => None,
        }
    }

    /// Parse `text` with the process-wide registry and no cancellation.
    pub fn parse(self, text: &str) -> Parse {
        self.parse_with(text, &ParseOptions::default())
    }

    pub fn parse_with(self, text: &str, options: &ParseOptions<'_>) -> Parse {
        let (tokens, end_state) = self.tokenize_with(text, options.registry);

        let mut parser = Parser::new(text, &tokens, self.trivia())
            .with_max_depth(options.registry.max_depth())
            .with_cancellation(options.cancel.clone());
        match self {
            Language::Script => grammar::script_file(&mut parser),
            Language::Template => grammar::template_file(&mut parser),
            Language::Makefile => grammar::makefile_file(&mut parser),
        }
        let output = parser.finish();
        let (green, errors) = Sink::new(text, &tokens, output.events).finish();

        debug!(
            "parsed {} bytes of {self}: {} tokens, {} errors{}",
            text.len(),
            tokens.len(),
            errors.len(),
            if output.cancelled { ", cancelled" } else { "" }
        );

        Parse {
            green,
            errors,
            end_state,
            cancelled: output.cancelled,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "script" | "tss" => Ok(Language::Script),
            "template" | "hbs" | "handlebars" => Ok(Language::Template),
            "makefile" | "make" | "mk" => Ok(Language::Makefile),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Which grammar is embedded into which host language, and parser limits.
///
/// Passed explicitly to [`Language::parse_with`]; [`Registry::global`] is the
/// read-only default used by [`Language::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    /// `(host, guest)` pairs. A host appears at most once.
    embedded: Vec<(Language, Language)>,
    max_depth: usize,
}

impl Default for Registry {
    /// Templates embed the script grammar inside mustaches.
    fn default() -> Self {
        Self {
            embedded: vec![(Language::Template, Language::Script)],
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::default);

impl Registry {
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Layer `guest` into `host`. Hosts without an embedding point ignore it.
    pub fn with_embedded(mut self, host: Language, guest: Language) -> Self {
        self.embedded.retain(|(h, _)| *h != host);
        self.embedded.push((host, guest));
        self
    }

    /// Lex `host` on its own; for templates this keeps mustache bodies raw.
    pub fn without_embedded(mut self, host: Language) -> Self {
        self.embedded.retain(|(h, _)| *h != host);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn embedded(&self, host: Language) -> Option<Language> {
        self.embedded
            .iter()
            .find(|(h, _)| *h == host)
            .map(|(_, guest)| *guest)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[derive(Debug, Clone)]
pub struct ParseOptions<'r> {
    pub registry: &'r Registry,
    pub cancel: Option<Cancellation>,
}

impl Default for ParseOptions<'static> {
    fn default() -> Self {
        Self {
            registry: Registry::global(),
            cancel: None,
        }
    }
}

/// The result of a parse: a lossless tree plus diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    green: GreenNode,
    errors: Vec<ParseError>,
    end_state: LexState,
    cancelled: bool,
}

impl Parse {
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// No diagnostics were reported.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Lexer state at the end of the input, for resuming tokenization there.
    pub fn end_state(&self) -> LexState {
        self.end_state
    }

    /// The parse stopped early; the tree still covers the whole text.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn debug_tree(&self) -> String {
        crate::tree::debug_tree(&self.syntax())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("script", Language::Script)]
    #[case("Template", Language::Template)]
    #[case("hbs", Language::Template)]
    #[case("make", Language::Makefile)]
    fn names(#[case] name: &str, #[case] expected: Language) {
        assert_eq!(name.parse::<Language>(), Ok(expected));
        assert_eq!(expected.to_string().parse::<Language>(), Ok(expected));
    }

    #[test]
    fn unknown_name() {
        let err = "cobol".parse::<Language>().unwrap_err();
        assert_eq!(err, UnknownLanguage("cobol".to_string()));
    }

    #[rstest]
    #[case("src/main.tss", Some(Language::Script))]
    #[case("views/page.hbs", Some(Language::Template))]
    #[case("Makefile", Some(Language::Makefile))]
    #[case("build/rules.mk", Some(Language::Makefile))]
    #[case("README.md", None)]
    #[case("LICENSE", None)]
    fn detection(#[case] path: &str, #[case] expected: Option<Language>) {
        assert_eq!(Language::from_path(Path::new(path)), expected);
    }

    #[test]
    fn registry_controls_layering() {
        let text = "{{ a.b }}";
        let layered = Language::Template.tokenize(text).0;
        assert!(layered.iter().any(|t| t.kind == SyntaxKind::IDENT));

        let raw = Registry::default().without_embedded(Language::Template);
        let plain = Language::Template.tokenize_with(text, &raw).0;
        assert!(plain.iter().all(|t| t.kind != SyntaxKind::IDENT));
        assert!(plain.iter().any(|t| t.kind == SyntaxKind::MUSTACHE_CONTENT));
    }

    #[test]
    fn end_state_resumes_lexing() {
        let text = "<p>{{ x";
        let parse = Language::Template.parse(text);
        assert!(TemplateRules::is_mustache_state(parse.end_state()));
        assert_eq!(Language::Script.parse("x").end_state(), LexState::INITIAL);
    }

    #[test]
    fn max_depth_comes_from_registry() {
        let shallow = Registry::default().with_max_depth(4);
        let options = ParseOptions {
            registry: &shallow,
            cancel: None,
        };
        let parse = Language::Script.parse_with("((((((1))))))", &options);
        assert!(parse.errors().iter().any(|e| e.message == "nesting too deep"));
        assert!(Language::Script.parse("((((((1))))));").ok());
    }

    #[test]
    fn cancelled_parse_keeps_all_text() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let options = ParseOptions {
            registry: Registry::global(),
            cancel: Some(cancel),
        };
        let text = "fn f() { return 1; }";
        let parse = Language::Script.parse_with(text, &options);
        assert!(parse.is_cancelled());
        assert!(parse.ok());
        assert_eq!(parse.syntax().text().to_string(), text);
    }
}
