//! SyntaxKind enum for all tokens and nodes of every supported language.
//!
//! Following the rust-analyzer model, all tokens and nodes share a single enum.
//! The token spaces of the languages overlap where the meaning is the same
//! (`L_PAREN`, `STRING`, `NEWLINE`, ...), so an embedded region keeps the kinds
//! its own lexer produced and the parser tells them apart by kind alone.

/// All syntax kinds for the Tessera CST.
///
/// This enum represents both tokens (lexer output) and composite nodes (parser output).
/// The `repr(u16)` ensures efficient storage in rowan's green tree.
///
/// We use SCREAMING_CASE following the rust-analyzer convention for SyntaxKind.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // === Shared tokens ===
    /// Horizontal whitespace
    WHITESPACE,
    /// Line ending
    NEWLINE,
    /// Line, block, markup or mustache comment
    COMMENT,
    /// Backslash-newline (Makefile)
    LINE_CONTINUATION,
    /// A single character no rule matched
    BAD_CHARACTER,
    /// Embedded region that never found its closing delimiter
    UNTERMINATED_EMBED,
    /// End of file marker
    EOF,

    // === Script punctuation and operators ===
    L_PAREN,
    R_PAREN,
    L_BRACE,
    R_BRACE,
    L_BRACK,
    R_BRACK,
    COMMA,
    SEMICOLON,
    COLON,
    DOT,
    QUESTION,
    AT,
    /// `=>`
    FAT_ARROW,
    EQ,
    PLUS_EQ,
    MINUS_EQ,
    STAR_EQ,
    SLASH_EQ,
    /// `==`
    EQ2,
    NEQ,
    LT,
    LTEQ,
    GT,
    GTEQ,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    PERCENT,
    BANG,
    /// `&&`
    AMP2,
    /// `||`
    PIPE2,
    /// `??`
    QUESTION2,

    // === Script literals ===
    INT_NUMBER,
    FLOAT_NUMBER,
    STRING,
    IDENT,

    // === Script keywords ===
    FN_KW,
    CLASS_KW,
    /// Contextual: lexed as `IDENT`, remapped inside a class header
    EXTENDS_KW,
    LET_KW,
    VAR_KW,
    CONST_KW,
    IF_KW,
    ELSE_KW,
    WHILE_KW,
    FOR_KW,
    IN_KW,
    RETURN_KW,
    BREAK_KW,
    CONTINUE_KW,
    TRUE_KW,
    FALSE_KW,
    NULL_KW,

    // === Template tokens ===
    /// Markup text outside tags and mustaches
    TEXT,
    /// `\` escaping the mustache that follows
    ESCAPE_CHAR,
    /// `<`
    L_ANGLE,
    /// `</`
    L_ANGLE_SLASH,
    /// `>`
    R_ANGLE,
    /// `/>`
    SLASH_R_ANGLE,
    TAG_NAME,
    ATTR_NAME,
    /// `"` or `'` around an attribute value
    QUOTE,
    ATTR_VALUE,
    /// `{{`
    OPEN,
    /// `{{{`
    OPEN_UNESCAPED,
    /// `{{#`
    OPEN_BLOCK,
    /// `{{/`
    OPEN_ENDBLOCK,
    /// `{{^`
    OPEN_INVERSE,
    /// `{{>`
    OPEN_PARTIAL,
    /// `}}`
    CLOSE,
    /// `}}}`
    CLOSE_UNESCAPED,
    /// Mustache interior when no expression grammar is layered in
    MUSTACHE_CONTENT,

    // === Makefile tokens ===
    /// Target, prerequisite, variable name or filename
    WORD,
    /// `$(...)`, `${...}` or `$x`
    VAR_REF,
    /// `::`
    DOUBLE_COLON,
    /// `=`, `:=`, `::=`, `?=`, `+=`, `!=`
    ASSIGN,
    /// `|`
    PIPE,
    /// Tab that starts a recipe line
    RECIPE_PREFIX,
    RECIPE_TEXT,
    VALUE_TEXT,
    CONDITION,
    DEFINE_LINE,
    IFEQ_KW,
    IFNEQ_KW,
    IFDEF_KW,
    IFNDEF_KW,
    ENDIF_KW,
    DEFINE_KW,
    ENDEF_KW,
    INCLUDE_KW,
    EXPORT_KW,
    OVERRIDE_KW,
    PRIVATE_KW,
    UNDEFINE_KW,
    VPATH_KW,

    // === Composite nodes (parser output) ===
    /// Root node of every file
    ROOT,

    // Script declarations and statements
    FN_DECL,
    CLASS_DECL,
    CLASS_BODY,
    EXTENDS_CLAUSE,
    VAR_DECL,
    NAME,
    PARAM_LIST,
    PARAM,
    TYPE_REF,
    BLOCK,
    EXPR_STMT,
    IF_STMT,
    ELSE_BRANCH,
    WHILE_STMT,
    FOR_STMT,
    RETURN_STMT,
    BREAK_STMT,
    CONTINUE_STMT,
    EMPTY_STMT,

    // Script expressions
    LITERAL,
    NAME_REF,
    PAREN_EXPR,
    LIST_EXPR,
    LAMBDA_EXPR,
    PREFIX_EXPR,
    BIN_EXPR,
    ASSIGN_EXPR,
    TERNARY_EXPR,
    CALL_EXPR,
    ARG_LIST,
    INDEX_EXPR,
    FIELD_EXPR,

    // Template
    STATEMENTS,
    BLOCK_WRAPPER,
    OPEN_BLOCK_STACHE,
    OPEN_INVERSE_BLOCK_STACHE,
    CLOSE_BLOCK_STACHE,
    SIMPLE_INVERSE,
    /// `{{else if b}}`
    OPEN_INVERSE_CHAIN,
    MUSTACHE,
    PARTIAL_STACHE,
    PATH,
    MUSTACHE_PARAM,
    HASH_SEGMENT,
    DATA,
    RAW_MUSTACHE_BODY,
    HTML_TAG,
    HTML_END_TAG,
    HTML_ATTRIBUTE,
    HTML_ATTR_VALUE,

    // Makefile
    RULE,
    TARGET_LINE,
    TARGETS,
    TARGET,
    TARGET_PATTERN,
    PREREQUISITES,
    ORDER_ONLY_PREREQUISITES,
    PREREQUISITE,
    RECIPE,
    COMMAND,
    VARIABLE_ASSIGNMENT,
    VARIABLE,
    VARIABLE_VALUE,
    CONDITIONAL,
    CONDITIONAL_BRANCH,
    DEFINE,
    INCLUDE,
    EXPORT,
    OVERRIDE,
    PRIVATE,
    UNDEFINE,
    VPATH,

    /// Error recovery node
    ERROR,
}

impl SyntaxKind {
    /// Number of kinds, used to size [`TokenSet`](crate::TokenSet).
    pub const COUNT: usize = SyntaxKind::ERROR as usize + 1;

    /// Returns true if this kind represents a token (lexer output).
    pub fn is_token(self) -> bool {
        (self as u16) < (Self::ROOT as u16)
    }

    /// Returns true if this kind represents a composite node.
    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    /// Returns true if this kind is trivia in the default token-stream policy.
    ///
    /// Individual languages may narrow this (newlines are significant in
    /// Makefiles), see [`Language::trivia`](crate::Language::trivia).
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::NEWLINE | Self::COMMENT | Self::LINE_CONTINUATION
        )
    }

    pub fn is_keyword(self) -> bool {
        let raw = self as u16;
        (raw >= Self::FN_KW as u16 && raw <= Self::NULL_KW as u16)
            || (raw >= Self::IFEQ_KW as u16 && raw <= Self::VPATH_KW as u16)
    }

    /// Human readable name used in "expected ..." diagnostics.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::L_PAREN => "opening parenthesis",
            Self::R_PAREN => "closing parenthesis",
            Self::L_BRACE => "opening brace",
            Self::R_BRACE => "closing brace",
            Self::L_BRACK => "'['",
            Self::R_BRACK => "closing bracket",
            Self::COMMA => "','",
            Self::SEMICOLON => "';'",
            Self::COLON => "':'",
            Self::FAT_ARROW => "'=>'",
            Self::EQ => "'='",
            Self::IDENT => "identifier",
            Self::STRING => "string",
            Self::IN_KW => "'in'",
            Self::R_ANGLE => "'>'",
            Self::TAG_NAME => "tag name",
            Self::QUOTE => "closing quote",
            Self::CLOSE => "'}}'",
            Self::CLOSE_UNESCAPED => "'}}}'",
            Self::NEWLINE => "end of line",
            Self::ENDIF_KW => "'endif'",
            Self::ENDEF_KW => "'endef'",
            Self::WORD => "name",
            _ => "token",
        }
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language definition for rowan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TesseraLang {}

impl rowan::Language for TesseraLang {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 <= SyntaxKind::ERROR as u16);
        // SAFETY: We check bounds above and SyntaxKind is repr(u16)
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type alias for our syntax nodes.
pub type SyntaxNode = rowan::SyntaxNode<TesseraLang>;
/// Type alias for our syntax tokens.
pub type SyntaxToken = rowan::SyntaxToken<TesseraLang>;
/// Type alias for syntax elements (node or token).
pub type SyntaxElement = rowan::SyntaxElement<TesseraLang>;
