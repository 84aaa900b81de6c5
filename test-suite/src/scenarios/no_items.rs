use caret::{RecordedService, Verifier, VerifyOptions};

use crate::scenarios::{Scenario, ScenarioError};

#[derive(Debug, Clone)]
pub struct NoItemsScenario<'a> {
    pub markup: &'a str,
    pub options: &'a VerifyOptions,
}

impl Scenario for NoItemsScenario<'_> {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_no_items_exist(self.markup, self.options)?;
        Ok(())
    }
}
