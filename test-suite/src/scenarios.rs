use std::fmt;

use caret::{RecordedService, VerificationError, Verifier};

pub mod any_item;
pub mod editor_browsable;
pub mod expected_items;
pub mod linked_files;
pub mod no_items;
pub mod provider_commit;

pub trait Scenario {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError>;
}

/// Error type for scenario execution failures.
#[derive(Debug)]
pub enum ScenarioError {
    /// The verifier reported a violated expectation
    Verification(VerificationError),
    /// The case declares `fails_with` but every check passed
    UnexpectedPass { expected: String },
    /// The case failed, but not with the declared error kind
    WrongFailure {
        expected: String,
        actual: VerificationError,
    },
    /// The case file does not describe a runnable scenario
    PreprocessingError { message: String },
}

impl From<VerificationError> for ScenarioError {
    fn from(error: VerificationError) -> Self {
        ScenarioError::Verification(error)
    }
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioError::Verification(error) => {
                writeln!(f, "Verification failed [{}]:", error.kind())?;
                write!(f, "{error}")
            }
            ScenarioError::UnexpectedPass { expected } => {
                write!(f, "Expected failure `{expected}`, but verification passed.")
            }
            ScenarioError::WrongFailure { expected, actual } => {
                writeln!(f, "Expected failure `{expected}`, got `{}`:", actual.kind())?;
                write!(f, "{actual}")
            }
            ScenarioError::PreprocessingError { message } => {
                write!(f, "Preprocessing error: {message}")
            }
        }
    }
}

impl std::error::Error for ScenarioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScenarioError::Verification(error) => Some(error),
            ScenarioError::WrongFailure { actual, .. } => Some(actual),
            _ => None,
        }
    }
}

/// Turn the outcome of a scenario into the outcome of a case declaring
/// `fails_with`. Without a declared failure the outcome is kept.
pub fn expect_failure(
    outcome: Result<(), ScenarioError>,
    fails_with: Option<&str>,
) -> Result<(), ScenarioError> {
    let Some(expected) = fails_with else {
        return outcome;
    };
    match outcome {
        Ok(()) => Err(ScenarioError::UnexpectedPass {
            expected: expected.to_string(),
        }),
        Err(ScenarioError::Verification(error)) if error.kind() == expected => Ok(()),
        Err(ScenarioError::Verification(actual)) => Err(ScenarioError::WrongFailure {
            expected: expected.to_string(),
            actual,
        }),
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use caret::FixtureError;

    use super::*;

    fn malformed() -> Result<(), ScenarioError> {
        Err(VerificationError::from(FixtureError::NoActiveDocument).into())
    }

    #[test]
    fn declared_failure_matches_kind() {
        assert!(expect_failure(malformed(), Some("malformed_fixture")).is_ok());
        assert!(matches!(
            expect_failure(malformed(), Some("no_items")),
            Err(ScenarioError::WrongFailure { .. })
        ));
        assert!(matches!(
            expect_failure(Ok(()), Some("no_items")),
            Err(ScenarioError::UnexpectedPass { .. })
        ));
    }

    #[test]
    fn outcome_kept_without_declaration() {
        assert!(expect_failure(Ok(()), None).is_ok());
        assert!(matches!(
            expect_failure(malformed(), None),
            Err(ScenarioError::Verification(_))
        ));
    }

    #[test]
    fn preprocessing_errors_are_never_expected() {
        let outcome = Err(ScenarioError::PreprocessingError {
            message: "case has no `markup`".into(),
        });
        assert!(matches!(
            expect_failure(outcome, Some("malformed_fixture")),
            Err(ScenarioError::PreprocessingError { .. })
        ));
    }
}
