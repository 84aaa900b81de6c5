use caret::{RecordedService, Verifier, VerifyOptions};

use crate::scenarios::{Scenario, ScenarioError};

/// Committing an item and comparing the resulting document
#[derive(Debug, Clone)]
pub struct ProviderCommitScenario<'a> {
    /// Fixture markup with a single `$$` caret
    pub markup: &'a str,
    /// Display text plus suffix of the item to commit
    pub item: &'a str,
    /// Document after the commit, optionally with a `$$` caret
    pub expected: &'a str,
    pub commit_char: Option<char>,
    pub options: &'a VerifyOptions,
}

impl Scenario for ProviderCommitScenario<'_> {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_provider_commit(
            self.markup,
            self.item,
            self.expected,
            self.commit_char,
            self.options,
        )?;
        Ok(())
    }
}
