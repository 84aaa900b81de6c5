use caret::{RecordedService, Verifier, VerifyOptions};

use crate::scenarios::{Scenario, ScenarioError};

#[derive(Debug, Clone)]
pub struct AnyItemScenario<'a> {
    pub markup: &'a str,
    pub options: &'a VerifyOptions,
}

impl Scenario for AnyItemScenario<'_> {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_any_item_exists(self.markup, self.options)?;
        Ok(())
    }
}
