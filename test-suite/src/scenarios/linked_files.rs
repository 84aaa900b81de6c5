use caret::{RecordedService, Verifier};

use crate::scenarios::{Scenario, ScenarioError};

/// An item offered in a document that other projects link to
#[derive(Debug, Clone)]
pub struct LinkedFilesScenario<'a> {
    /// `<Workspace>` markup
    pub markup: &'a str,
    pub item: &'a str,
    pub description: Option<&'a str>,
}

impl Scenario for LinkedFilesScenario<'_> {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_item_in_linked_files(self.markup, self.item, self.description)?;
        Ok(())
    }
}
