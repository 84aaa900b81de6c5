use caret::{Expectation, RecordedService, Verifier, VerifyOptions};

use crate::scenarios::{Scenario, ScenarioError};

/// Presence and absence expectations checked in every configuration and placement
#[derive(Debug, Clone)]
pub struct ExpectedItemsScenario<'a> {
    /// Fixture markup with `$$` carets
    pub markup: &'a str,
    pub expectations: &'a [Expectation],
    pub options: &'a VerifyOptions,
}

impl Scenario for ExpectedItemsScenario<'_> {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_expected_items(self.markup, self.expectations, self.options)?;
        Ok(())
    }
}
