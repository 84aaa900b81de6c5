use std::path::PathBuf;

use caret::{BrowsableCase, Fixture, Language, RecordedService, Verifier, VerifyOptions};
use tracing::{debug, trace};

use crate::RunConfig;
use crate::parser::CaseData;
use crate::scenarios::any_item::AnyItemScenario;
use crate::scenarios::editor_browsable::EditorBrowsableScenario;
use crate::scenarios::expected_items::ExpectedItemsScenario;
use crate::scenarios::linked_files::LinkedFilesScenario;
use crate::scenarios::no_items::NoItemsScenario;
use crate::scenarios::provider_commit::ProviderCommitScenario;
use crate::scenarios::{Scenario, ScenarioError, expect_failure};

pub struct Case {
    pub path: PathBuf,
    pub name: String,
    pub data: CaseData,
}

/// Result of running a single scenario
#[derive(Debug, Clone)]
pub enum ScenarioResult {
    Passed,
    Failed { error: String },
}

impl ScenarioResult {
    pub fn is_passed(&self) -> bool {
        matches!(self, ScenarioResult::Passed)
    }
}

/// Named scenario with its result
#[derive(Debug, Clone)]
pub struct NamedScenarioResult {
    pub name: String,
    pub result: ScenarioResult,
}

/// Result of running all scenarios in a test case
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub scenarios: Vec<NamedScenarioResult>,
}

impl CaseResult {
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.result.is_passed()).count()
    }

    pub fn total_count(&self) -> usize {
        self.scenarios.len()
    }

    pub fn all_passed(&self) -> bool {
        self.scenarios.iter().all(|s| s.result.is_passed())
    }

    pub fn failed_scenarios(&self) -> Vec<&NamedScenarioResult> {
        self.scenarios.iter().filter(|s| !s.result.is_passed()).collect()
    }
}

/// A runnable scenario with its name
pub enum CaseScenario<'a> {
    ExpectedItems(ExpectedItemsScenario<'a>),
    NoItems(NoItemsScenario<'a>),
    AnyItem(AnyItemScenario<'a>),
    EditorBrowsable(EditorBrowsableScenario),
    LinkedFiles(LinkedFilesScenario<'a>),
    ProviderCommit(ProviderCommitScenario<'a>),
}

impl CaseScenario<'_> {
    pub fn name(&self) -> String {
        match self {
            CaseScenario::ExpectedItems(_) => "expected_items".to_string(),
            CaseScenario::NoItems(_) => "no_items".to_string(),
            CaseScenario::AnyItem(_) => "any_item".to_string(),
            CaseScenario::EditorBrowsable(_) => "editor_browsable".to_string(),
            CaseScenario::LinkedFiles(_) => "linked_files".to_string(),
            CaseScenario::ProviderCommit(s) => format!("provider_commit({})", s.item),
        }
    }

    pub fn run(self, verifier: &Verifier<'_, RecordedService>) -> Result<(), ScenarioError> {
        match self {
            CaseScenario::ExpectedItems(s) => s.run(verifier),
            CaseScenario::NoItems(s) => s.run(verifier),
            CaseScenario::AnyItem(s) => s.run(verifier),
            CaseScenario::EditorBrowsable(s) => s.run(verifier),
            CaseScenario::LinkedFiles(s) => s.run(verifier),
            CaseScenario::ProviderCommit(s) => s.run(verifier),
        }
    }
}

/// What the case fixture looks like once parsed, for failure reports.
pub enum PreprocessedFixture {
    Missing,
    Ok {
        language: Language,
        projects: usize,
        documents: usize,
        carets: usize,
        spans: usize,
    },
    Err {
        error: String,
    },
}

impl PreprocessedFixture {
    pub fn status(&self) -> String {
        match self {
            PreprocessedFixture::Missing => "no markup".to_string(),
            PreprocessedFixture::Ok {
                language,
                projects,
                documents,
                carets,
                spans,
            } => {
                let mut status = format!(
                    "{language}, {projects} project(s), {documents} document(s), {carets} caret(s)"
                );
                if *spans > 0 {
                    status.push_str(&format!(", {spans} span(s)"));
                }
                status
            }
            PreprocessedFixture::Err { error } => format!("error: {error}"),
        }
    }
}

pub struct PreprocessedCase {
    pub name: String,
    pub data: CaseData,
    pub service: RecordedService,
    pub options: VerifyOptions,
    pub fixture: PreprocessedFixture,
}

impl Case {
    pub fn new(path: PathBuf, name: String, data: CaseData) -> Self {
        Self { path, name, data }
    }

    pub fn language(&self) -> Language {
        self.data.language.unwrap_or_default()
    }

    /// Resolve verification options and the recorded service, and parse the
    /// fixture once to describe it in reports.
    pub fn preprocess(&self, config: &RunConfig) -> PreprocessedCase {
        let language = self.language();
        let verify = self.data.verify.as_ref().unwrap_or(&config.verify);
        let options = VerifyOptions::from(verify).with_language(language);

        let fixture = match &self.data.markup {
            None => PreprocessedFixture::Missing,
            Some(markup) => match Fixture::parse(markup, language) {
                Ok(fixture) => PreprocessedFixture::Ok {
                    language: fixture.language(),
                    projects: fixture.workspace().projects().count(),
                    documents: fixture.workspace().documents().count(),
                    carets: fixture.carets().len(),
                    spans: fixture.span_count(),
                },
                Err(error) => PreprocessedFixture::Err {
                    error: error.to_string(),
                },
            },
        };

        PreprocessedCase {
            name: self.name.clone(),
            data: self.data.clone(),
            service: RecordedService::new(self.data.rules.clone()),
            options,
            fixture,
        }
    }
}

impl PreprocessedCase {
    /// Shape of the fixture and size of the recorded service.
    pub fn status_summary(&self) -> String {
        format!(
            "fixture: {}\nrules: {}",
            self.fixture.status(),
            self.service.rules.len()
        )
    }

    /// Returns all scenarios that this case will run.
    pub fn scenarios(&self) -> Result<Vec<CaseScenario<'_>>, ScenarioError> {
        let data = &self.data;
        let markup = || {
            data.markup
                .as_deref()
                .ok_or_else(|| ScenarioError::PreprocessingError {
                    message: "case has no `markup`".to_string(),
                })
        };
        let mut scenarios = Vec::new();

        if !data.expect.is_empty() {
            scenarios.push(CaseScenario::ExpectedItems(ExpectedItemsScenario {
                markup: markup()?,
                expectations: &data.expect,
                options: &self.options,
            }));
        }
        if data.no_items {
            scenarios.push(CaseScenario::NoItems(NoItemsScenario {
                markup: markup()?,
                options: &self.options,
            }));
        }
        if data.any_item {
            scenarios.push(CaseScenario::AnyItem(AnyItemScenario {
                markup: markup()?,
                options: &self.options,
            }));
        }
        if let Some(browsable) = &data.browsable {
            let language = self.options.language;
            let case = BrowsableCase::new(markup()?, &browsable.referenced, &browsable.item)
                .expect(browsable.same_solution, browsable.metadata_reference)
                .languages(language, browsable.referenced_language.unwrap_or(language))
                .hide_advanced_members(browsable.hide_advanced_members);
            scenarios.push(CaseScenario::EditorBrowsable(EditorBrowsableScenario { case }));
        }
        if let Some(linked) = &data.linked {
            scenarios.push(CaseScenario::LinkedFiles(LinkedFilesScenario {
                markup: markup()?,
                item: &linked.item,
                description: linked.description.as_deref(),
            }));
        }
        for commit in &data.commit {
            scenarios.push(CaseScenario::ProviderCommit(ProviderCommitScenario {
                markup: markup()?,
                item: &commit.item,
                expected: &commit.expected,
                commit_char: commit.commit_char,
                options: &self.options,
            }));
        }

        if scenarios.is_empty() && data.unimplemented.is_none() {
            return Err(ScenarioError::PreprocessingError {
                message: "case has nothing to verify".to_string(),
            });
        }
        Ok(scenarios)
    }

    /// Run all scenarios and return structured results.
    /// This does not panic on assertion failures - it captures them as failed scenarios.
    pub fn run_all(&self) -> CaseResult {
        let scenarios = match self.scenarios() {
            Ok(scenarios) => scenarios,
            Err(error) => {
                return CaseResult {
                    scenarios: vec![NamedScenarioResult {
                        name: "preprocess".to_string(),
                        result: ScenarioResult::Failed {
                            error: error.to_string(),
                        },
                    }],
                };
            }
        };
        debug!(case = %self.name, scenarios = scenarios.len(), "running case");

        let verifier = Verifier::new(&self.service);
        let fails_with = self.data.fails_with.as_deref();
        let results = scenarios
            .into_iter()
            .map(|scenario| {
                let name = scenario.name();
                let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    expect_failure(scenario.run(&verifier), fails_with)
                })) {
                    Ok(Ok(())) => ScenarioResult::Passed,
                    Ok(Err(e)) => ScenarioResult::Failed {
                        error: e.to_string(),
                    },
                    Err(panic) => {
                        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            "Unknown panic".to_string()
                        };
                        ScenarioResult::Failed {
                            error: format!("panic: {}", msg),
                        }
                    }
                };
                trace!(scenario = %name, passed = result.is_passed(), "scenario finished");
                NamedScenarioResult { name, result }
            })
            .collect();

        CaseResult { scenarios: results }
    }
}
