use caret::{BrowsableCase, RecordedService, Verifier};

use crate::scenarios::{Scenario, ScenarioError};

/// Symbol counts of an item seen through a project reference and a metadata reference
#[derive(Debug, Clone)]
pub struct EditorBrowsableScenario {
    pub case: BrowsableCase,
}

impl Scenario for EditorBrowsableScenario {
    fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        verifier.verify_item_in_editor_browsable_contexts(&self.case)?;
        Ok(())
    }
}
