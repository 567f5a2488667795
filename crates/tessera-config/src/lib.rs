use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tessera_syntax::{Language, Registry, UnknownLanguage};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid file pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("Invalid language mapping for '{pattern}': {source}")]
    UnknownLanguage {
        pattern: String,
        source: UnknownLanguage,
    },
}

/// How mustache interiors in templates are lexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionMode {
    /// Re-lexed and parsed as script expressions.
    #[default]
    Script,
    /// Kept as uninterpreted content.
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: Registry::default().max_depth(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub expressions: ExpressionMode,
}

/// Files matching `pattern` are parsed as `language`. Patterns may use `~`
/// and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMapping {
    pub pattern: String,
    pub language: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub parser: ParserConfig,
    pub template: TemplateConfig,
    pub languages: Vec<LanguageMapping>,
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/tessera");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Check that every mapping has a valid pattern and a known language.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for mapping in &self.languages {
            Self::compile(&mapping.pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: mapping.pattern.clone(),
                source,
            })?;
            mapping
                .language
                .parse::<Language>()
                .map_err(|source| ConfigError::UnknownLanguage {
                    pattern: mapping.pattern.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    /// The registry parses run with: configured depth limit, and no
    /// expression grammar in templates when they are raw.
    pub fn registry(&self) -> Registry {
        let registry = Registry::default().with_max_depth(self.parser.max_depth);
        match self.template.expressions {
            ExpressionMode::Script => registry,
            ExpressionMode::Raw => registry.without_embedded(Language::Template),
        }
    }

    /// Language for `path`: the first matching mapping wins, then the file
    /// name decides.
    pub fn language_for(&self, path: &Path) -> Option<Language> {
        self.languages
            .iter()
            .find(|mapping| {
                Self::compile(&mapping.pattern).is_ok_and(|pattern| pattern.matches_path(path))
            })
            .and_then(|mapping| mapping.language.parse().ok())
            .or_else(|| Language::from_path(path))
    }

    fn compile(pattern: &str) -> Result<glob::Pattern, glob::PatternError> {
        let expanded = Self::expand(pattern);
        glob::Pattern::new(&expanded)
    }

    fn expand(pattern: &str) -> String {
        match shellexpand::full(pattern) {
            Ok(expanded) => expanded.into_owned(),
            Err(_) => pattern.to_string(),
        }
    }
}
