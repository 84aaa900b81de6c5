use caret_markup::{MarkupError, MarkupSource};
use tracing::trace;

use crate::{DocumentId, FixtureError, Language, Workspace, xml};

/// Project and assembly name of the single project built from plain markup.
pub const DEFAULT_PROJECT: &str = "Test";

/// A workspace snapshot with one active document holding the caret(s).
#[derive(Debug, Clone)]
pub struct Fixture {
    workspace: Workspace,
    active: DocumentId,
    markup: MarkupSource,
}

impl Fixture {
    /// Parse plain markup or a `<Workspace>` description.
    ///
    /// Plain markup becomes a single project named `Test` in `language`
    /// holding a single document `Test.cs` (or `Test.vb`). Workspace markup
    /// carries its own languages.
    pub fn parse(markup: &str, language: Language) -> Result<Self, FixtureError> {
        if is_workspace_markup(markup) {
            xml::parse_workspace(markup)
        } else {
            Self::single(markup, language)
        }
    }

    fn single(markup: &str, language: Language) -> Result<Self, FixtureError> {
        let path = format!("{DEFAULT_PROJECT}.{}", language.file_extension());
        let source = caret_markup::parse(markup).map_err(|source| FixtureError::Markup {
            path: path.clone(),
            source,
        })?;
        if !source.has_caret() {
            return Err(FixtureError::Markup {
                path,
                source: MarkupError::MissingCaret,
            });
        }

        let mut builder = Workspace::builder();
        let project = builder.add_project(DEFAULT_PROJECT, DEFAULT_PROJECT, language);
        let active = builder.add_document(project, path, source.text(), false);
        trace!(carets = source.carets().len(), "parsed single-document fixture");
        Ok(Self::new(builder.build(), active, source))
    }

    /// Assemble a fixture from a workspace built elsewhere. `markup` must be
    /// the parsed markup of `active`.
    pub fn new(workspace: Workspace, active: DocumentId, markup: MarkupSource) -> Self {
        debug_assert_eq!(workspace.document_text(active), markup.text());
        Self {
            workspace,
            active,
            markup,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn active_document(&self) -> DocumentId {
        self.active
    }

    pub fn markup(&self) -> &MarkupSource {
        &self.markup
    }

    /// Clean text of the active document.
    pub fn text(&self) -> &str {
        self.markup.text()
    }

    pub fn carets(&self) -> &[usize] {
        self.markup.carets()
    }

    /// Number of anonymous and named spans marked in the active document.
    pub fn span_count(&self) -> usize {
        let named: usize = self
            .markup
            .span_names()
            .map(|name| self.markup.named_spans(name).len())
            .sum();
        self.markup.spans().len() + named
    }

    /// Language of the project owning the active document.
    pub fn language(&self) -> Language {
        self.workspace.project_of(self.active).language
    }
}

/// Whether `markup` uses the `<Workspace>` dialect.
pub fn is_workspace_markup(markup: &str) -> bool {
    markup.trim_start().starts_with("<Workspace")
}
