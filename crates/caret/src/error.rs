use std::fmt;

use caret_fixture::{FixtureError, ReferenceKind};
use lsp_types::Position;
use similar::{ChangeTag, TextDiff};

use crate::config::{Placement, VerificationConfig};
use crate::expectation::{AttributeMismatch, ExpectationKind};
use crate::service::ServiceError;

/// Where a failing query ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryContext {
    /// Index of the caret among the carets of the fixture.
    pub caret: usize,
    /// Caret offset in the queried text.
    pub offset: usize,
    /// Zero-based line and UTF-16 character of `offset`.
    pub position: Position,
    pub config: VerificationConfig,
    pub placement: Placement,
    /// Text typed at the caret before querying.
    pub typed: Option<char>,
}

impl fmt::Display for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "caret #{} at {}:{}, {}, {}",
            self.caret,
            self.position.line + 1,
            self.position.character + 1,
            self.config,
            self.placement
        )?;
        if let Some(typed) = self.typed {
            write!(f, ", with `{typed}` typed")?;
        }
        Ok(())
    }
}

/// Why an expected item counts as missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingReason {
    /// No offered item has the expected identity.
    NotOffered { offered: Vec<String> },
    /// The item is offered but specified attributes differ.
    AttributeMismatch { mismatches: Vec<AttributeMismatch> },
}

impl fmt::Display for MissingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingReason::NotOffered { offered } if offered.is_empty() => {
                f.write_str("No items were offered.")
            }
            MissingReason::NotOffered { offered } => {
                writeln!(f, "Offered items ({}):", offered.len())?;
                for item in offered {
                    writeln!(f, "  {item}")?;
                }
                Ok(())
            }
            MissingReason::AttributeMismatch { mismatches } => {
                for mismatch in mismatches {
                    if mismatch.expected.contains('\n') || mismatch.actual.contains('\n') {
                        writeln!(f, "{} differs (expected → actual):", mismatch.attribute)?;
                        write_diff(f, &mismatch.expected, &mismatch.actual)?;
                    } else {
                        writeln!(
                            f,
                            "{}: expected `{}`, found `{}`",
                            mismatch.attribute, mismatch.expected, mismatch.actual
                        )?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A violated expectation or a fixture that could not be verified.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("`{}` failed: item {item} is missing ({context})\n{reason}", ExpectationKind::Exists)]
    MissingExpectedItem {
        item: String,
        context: QueryContext,
        reason: MissingReason,
    },
    #[error("`{}` failed: item {item} is offered ({context})", ExpectationKind::Absent)]
    UnexpectedItemPresent { item: String, context: QueryContext },
    #[error("`{}` failed: item {item} is offered {count} times ({context})", ExpectationKind::Exists)]
    AmbiguousItem {
        item: String,
        count: usize,
        context: QueryContext,
    },
    #[error("expected no items but {} were offered ({context}): {}", .items.len(), .items.join(", "))]
    UnexpectedItems {
        items: Vec<String>,
        context: QueryContext,
    },
    #[error("expected some items but none were offered ({context})")]
    NoItems { context: QueryContext },
    #[error("expected {expected} symbol(s) named `{item}` with {reference}, found {actual}")]
    ConfigurationMismatch {
        item: String,
        reference: ReferenceKind,
        expected: usize,
        actual: usize,
    },
    #[error("committing `{item}` produced unexpected text ({context})\n{}", render_diff(.expected, .actual))]
    CommitMismatch {
        item: String,
        context: QueryContext,
        expected: String,
        actual: String,
    },
    #[error("committing `{item}` left the caret at {actual}, expected {expected} ({context})")]
    CaretMismatch {
        item: String,
        context: QueryContext,
        expected: usize,
        actual: usize,
    },
    #[error("malformed fixture: {0}")]
    MalformedFixture(#[from] FixtureError),
    #[error("completion service failed ({context}): {source}")]
    Service {
        context: QueryContext,
        #[source]
        source: ServiceError,
    },
}

impl VerificationError {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            VerificationError::MissingExpectedItem { .. } => "missing_expected_item",
            VerificationError::UnexpectedItemPresent { .. } => "unexpected_item_present",
            VerificationError::AmbiguousItem { .. } => "ambiguous_item",
            VerificationError::UnexpectedItems { .. } => "unexpected_items",
            VerificationError::NoItems { .. } => "no_items",
            VerificationError::ConfigurationMismatch { .. } => "configuration_mismatch",
            VerificationError::CommitMismatch { .. } => "commit_mismatch",
            VerificationError::CaretMismatch { .. } => "caret_mismatch",
            VerificationError::MalformedFixture(_) => "malformed_fixture",
            VerificationError::Service { .. } => "service",
        }
    }

    /// Kind of the violated expectation, for failures of a single item.
    pub fn expectation_kind(&self) -> Option<ExpectationKind> {
        match self {
            VerificationError::MissingExpectedItem { .. }
            | VerificationError::AmbiguousItem { .. } => Some(ExpectationKind::Exists),
            VerificationError::UnexpectedItemPresent { .. } => Some(ExpectationKind::Absent),
            _ => None,
        }
    }
}

/// Line diff of `expected` against `actual`.
pub fn render_diff(expected: &str, actual: &str) -> String {
    struct Diff<'a>(&'a str, &'a str);
    impl fmt::Display for Diff<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write_diff(f, self.0, self.1)
        }
    }
    Diff(expected, actual).to_string()
}

fn write_diff(f: &mut fmt::Formatter<'_>, expected: &str, actual: &str) -> fmt::Result {
    let diff = TextDiff::from_lines(expected, actual);
    if diff.iter_all_changes().all(|c| c.tag() == ChangeTag::Equal) {
        return writeln!(f, "expected {expected:?}\nactual   {actual:?}");
    }
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        write!(f, "{sign}{change}")?;
        if change.missing_newline() {
            writeln!(f)?;
        }
    }
    Ok(())
}
