use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use tessera_config::Config;
use tessera_syntax::brace::find_match;
use tessera_syntax::{Language, ParseOptions, Registry, Token};

#[derive(Debug, Parser)]
#[command(name = "tessera", version, about = "Inspect lossless syntax trees")]
struct Cli {
    /// Parse every file as this language instead of detecting it
    #[arg(short, long, global = true)]
    language: Option<Language>,

    /// Config file to use instead of ~/.config/tessera/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every token with its range
    Tokens { file: PathBuf },
    /// Print the syntax tree and any diagnostics
    Tree { file: PathBuf },
    /// Report diagnostics; exits non-zero if there are any
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the delimiter paired with the one at a byte offset
    Match { file: PathBuf, offset: usize },
}

/// Everything a command needs besides its arguments.
struct Session {
    config: Config,
    registry: Registry,
    language: Option<Language>,
}

impl Session {
    fn new(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => Config::load_from_path(path)?
                .with_context(|| format!("config file {} not found", path.display()))?,
            None => Config::load()?.unwrap_or_default(),
        };
        let registry = config.registry();
        Ok(Self {
            config,
            registry,
            language: cli.language,
        })
    }

    fn language_for(&self, path: &Path) -> Result<Language> {
        match self.language.or_else(|| self.config.language_for(path)) {
            Some(language) => Ok(language),
            None => bail!(
                "cannot tell the language of {}; pass --language",
                path.display()
            ),
        }
    }

    fn read(&self, path: &Path) -> Result<(Language, String)> {
        let language = self.language_for(path)?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        log::debug!("{}: {} bytes as {language}", path.display(), text.len());
        Ok((language, text))
    }

    fn options(&self) -> ParseOptions<'_> {
        ParseOptions {
            registry: &self.registry,
            cancel: None,
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    match run(&cli, &mut io::stdout().lock()) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}

/// Run the command, returning whether it succeeded.
fn run(cli: &Cli, out: &mut impl Write) -> Result<bool> {
    let session = Session::new(cli)?;
    match &cli.command {
        Command::Tokens { file } => {
            let (language, text) = session.read(file)?;
            let (tokens, _) = language.tokenize_with(&text, &session.registry);
            write_tokens(out, &text, &tokens)?;
            Ok(true)
        }
        Command::Tree { file } => {
            let (language, text) = session.read(file)?;
            let parse = language.parse_with(&text, &session.options());
            write!(out, "{}", parse.debug_tree())?;
            write_diagnostics(out, file, &text, &parse)?;
            Ok(true)
        }
        Command::Check { files } => {
            let mut clean = true;
            for file in files {
                let (language, text) = session.read(file)?;
                let parse = language.parse_with(&text, &session.options());
                clean &= parse.ok();
                write_diagnostics(out, file, &text, &parse)?;
            }
            Ok(clean)
        }
        Command::Match { file, offset } => {
            let (language, text) = session.read(file)?;
            let (tokens, _) = language.tokenize_with(&text, &session.registry);
            let table = language.brace_table();
            let matched = token_at(&tokens, *offset).and_then(|i| find_match(&tokens, i, table));
            match matched {
                Some(index) => {
                    let token = &tokens[index];
                    writeln!(
                        out,
                        "{}..{} {:?}",
                        token.start(),
                        token.end(),
                        token.text(&text)
                    )?;
                    Ok(true)
                }
                None => {
                    writeln!(out, "no match")?;
                    Ok(false)
                }
            }
        }
    }
}

fn write_tokens(out: &mut impl Write, text: &str, tokens: &[Token]) -> io::Result<()> {
    for token in tokens {
        write!(
            out,
            "{:?}@{}..{} {:?}",
            token.kind,
            token.start(),
            token.end(),
            token.text(text)
        )?;
        if token.unterminated {
            write!(out, " (unterminated)")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn write_diagnostics(
    out: &mut impl Write,
    file: &Path,
    text: &str,
    parse: &tessera_syntax::Parse,
) -> io::Result<()> {
    for error in parse.errors() {
        let (line, column) = line_col(text, usize::from(error.range.start()));
        writeln!(
            out,
            "{}:{line}:{column}: {}",
            file.display(),
            error.message
        )?;
    }
    Ok(())
}

/// 1-based line and column (in chars) of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = text.get(..offset).unwrap_or(text);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (line, before[line_start..].chars().count() + 1)
}

/// Index of the delimiter token at `offset`: the token containing it, or
/// the one ending right there when the caret sits after a closer.
fn token_at(tokens: &[Token], offset: usize) -> Option<usize> {
    let containing = tokens
        .iter()
        .position(|t| t.start() <= offset && offset < t.end());
    let before = tokens.iter().position(|t| t.end() == offset);
    match (containing, before) {
        (Some(i), Some(j)) if tokens[i].kind.is_trivia() => Some(j),
        (Some(i), _) => Some(i),
        (None, j) => j,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("tessera").chain(args.iter().copied())).unwrap()
    }

    /// Runs with an empty config so the user's own config does not leak in.
    fn run_in(dir: &TempDir, args: &[&str]) -> (bool, String) {
        let config = write(dir, "config.toml", "");
        let mut args: Vec<&str> = args.to_vec();
        args.extend(["--config", config.as_str()]);
        let mut out = Vec::new();
        let ok = run(&cli(&args), &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn line_and_column() {
        let text = "ab\ncdé\nf";
        assert_eq!(line_col(text, 0), (1, 1));
        assert_eq!(line_col(text, 4), (2, 2));
        assert_eq!(line_col(text, 8), (3, 1));
    }

    #[test]
    fn check_reports_diagnostics() {
        let dir = TempDir::new().unwrap();
        let good = write(&dir, "good.tss", "let a = 1;\n");
        let bad = write(&dir, "bad.tss", "let a = 1;\nfunc(");

        let (ok, output) = run_in(&dir, &["check", &good]);
        assert!(ok);
        assert_eq!(output, "");

        let (ok, output) = run_in(&dir, &["check", &good, &bad]);
        assert!(!ok);
        assert_eq!(output, format!("{bad}:2:6: expected closing parenthesis\n"));
    }

    #[test]
    fn language_flag_overrides_detection() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "rules.txt", "all:\n\techo hi\n");

        let (ok, output) = run_in(&dir, &["--language", "makefile", "tree", &file]);
        assert!(ok);
        assert!(output.starts_with("ROOT@0..14\n  RULE@0..14\n"), "{output}");
    }

    #[test]
    fn undetectable_language_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "notes.txt", "hello");
        let config = write(&dir, "config.toml", "");
        let args = cli(&["tokens", &file, "--config", &config]);
        let err = run(&args, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("--language"), "{err}");
    }

    #[test]
    fn tokens_are_listed_with_ranges() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "a.hbs", "<b>{{x}}");
        let (_, output) = run_in(&dir, &["tokens", &file]);
        assert_eq!(
            output,
            "L_ANGLE@0..1 \"<\"\nTAG_NAME@1..2 \"b\"\nR_ANGLE@2..3 \">\"\n\
             OPEN@3..5 \"{{\"\nIDENT@5..6 \"x\"\nCLOSE@6..8 \"}}\"\n"
        );
    }

    #[test]
    fn match_finds_the_partner() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "m.tss", "f(a, [b])");

        let (ok, output) = run_in(&dir, &["match", &file, "1"]);
        assert!(ok);
        assert_eq!(output, "8..9 \")\"\n");

        // caret just after the closing parenthesis
        let (_, output) = run_in(&dir, &["match", &file, "9"]);
        assert_eq!(output, "1..2 \"(\"\n");

        let (ok, output) = run_in(&dir, &["match", &file, "2"]);
        assert!(!ok);
        assert_eq!(output, "no match\n");
    }
}
