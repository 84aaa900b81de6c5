//! Data-driven cases for the caret verifier.
//!
//! Each `.toml` file under `cases/` holds a fixture, the recorded answers of
//! a completion service and the checks to run against them.

use std::path::{Path, PathBuf};

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use caret_config::VerifyConfig;

pub mod case;
pub mod parser;
pub mod scenarios;

pub use case::{Case, CaseResult, NamedScenarioResult, PreprocessedCase, ScenarioResult};
pub use parser::{CaseData, CaseFile, ParseResult, parse_case_file};
pub use scenarios::ScenarioError;

/// Settings shared by every case of a run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Verification defaults for cases without their own `verify` table.
    pub verify: VerifyConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum CollectCasesError {
    #[error("failed to read {}: {error}", path.display())]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("failed to parse {}: {error}", path.display())]
    ParseError {
        path: PathBuf,
        error: toml::de::Error,
        input: String,
    },
}

impl CollectCasesError {
    pub fn path(&self) -> &Path {
        match self {
            CollectCasesError::IoError { path, .. } | CollectCasesError::ParseError { path, .. } => {
                path
            }
        }
    }
}

/// The `cases/` directory of this crate.
pub fn cases_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("cases")
}

pub fn collect_cases() -> std::io::Result<Vec<Result<ParseResult, CollectCasesError>>> {
    collect_cases_in(&cases_dir())
}

/// Parse every `.toml` file below `dir`, in path order. A file that cannot
/// be read or parsed is reported in place of its cases.
pub fn collect_cases_in(dir: &Path) -> std::io::Result<Vec<Result<ParseResult, CollectCasesError>>> {
    let mut paths = Vec::new();
    collect_case_paths(dir, &mut paths)?;
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let input = match std::fs::read_to_string(&path) {
                Ok(input) => input,
                Err(error) => return Err(CollectCasesError::IoError { path, error }),
            };
            match parse_case_file(&input) {
                Ok(case_file) => Ok(ParseResult {
                    path,
                    case_file,
                    input,
                }),
                Err(error) => Err(CollectCasesError::ParseError { path, error, input }),
            }
        })
        .collect())
}

fn collect_case_paths(dir: &Path, paths: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_case_paths(&path, paths)?;
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            paths.push(path);
        }
    }
    Ok(())
}

/// Format a case file parse error with source context using annotate-snippets.
pub fn format_parse_error(error: &toml::de::Error, input: &str, path: &Path) -> String {
    render_parse_error(error, input, path, true)
}

/// Format a case file parse error with source context (plain text, no colors).
pub fn format_parse_error_plain(error: &toml::de::Error, input: &str, path: &Path) -> String {
    render_parse_error(error, input, path, false)
}

fn render_parse_error(error: &toml::de::Error, input: &str, path: &Path, styled: bool) -> String {
    let message = error.message();
    let path = path.display().to_string();
    let snippet = match error.span() {
        Some(span) => {
            let start = span.start.min(input.len());
            let end = span.end.min(input.len()).max(start);
            Snippet::source(input)
                .line_start(1)
                .path(&path)
                .annotation(AnnotationKind::Primary.span(start..end).label(message))
        }
        None => Snippet::source("")
            .line_start(1)
            .path(&path)
            .annotation(AnnotationKind::Primary.span(0..0)),
    };
    let groups = vec![Level::ERROR.primary_title(message).element(snippet)];

    let renderer = if styled {
        Renderer::styled()
    } else {
        Renderer::plain()
    };
    renderer.render(&groups).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_shows_the_offending_line() {
        let input = "markup = \"x\"\nno_items = = 3\n";
        let error = parse_case_file(input).unwrap_err();
        let rendered = format_parse_error_plain(&error, input, Path::new("cases/bad.toml"));
        assert!(rendered.starts_with("error"), "{rendered}");
        assert!(rendered.contains("cases/bad.toml:2:"), "{rendered}");
        assert!(rendered.contains("no_items = = 3"), "{rendered}");
        assert!(rendered.contains('^'), "{rendered}");
    }

    #[test]
    fn parse_error_without_span_keeps_the_message() {
        let error = <toml::de::Error as serde::de::Error>::custom("case file is empty");
        let rendered = format_parse_error_plain(&error, "", Path::new("cases/empty.toml"));
        assert!(rendered.contains("case file is empty"), "{rendered}");
        assert!(rendered.contains("cases/empty.toml"), "{rendered}");
    }

    #[test]
    fn bundled_cases_parse() {
        let cases = collect_cases().unwrap();
        assert!(!cases.is_empty());
        for case in &cases {
            if let Err(error) = case {
                panic!("{error}");
            }
        }
    }
}
