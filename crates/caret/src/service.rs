//! The contract of the completion service under test.

use caret_fixture::{DocumentId, Project, Workspace};

use crate::config::{CompletionTrigger, VerificationConfig};
use crate::item::{CompletionChange, CompletionItem, CompletionList, TextEdit};

/// A failure reported by the completion service itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// One completion query: a caret in a document of a workspace snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub workspace: &'a Workspace,
    pub document: DocumentId,
    pub offset: usize,
    pub trigger: CompletionTrigger,
    pub config: VerificationConfig,
}

impl<'a> CompletionRequest<'a> {
    pub fn text(&self) -> &'a str {
        self.workspace.document_text(self.document)
    }

    pub fn project(&self) -> &'a Project {
        self.workspace.project_of(self.document)
    }

    /// Text before the caret.
    pub fn before_caret(&self) -> &'a str {
        let text = self.text();
        text.get(..self.offset).unwrap_or(text)
    }
}

/// A completion engine as seen by the verifier.
///
/// Any `Fn(&CompletionRequest) -> Result<Option<CompletionList>, ServiceError>`
/// closure is a service that uses the default description and commit
/// behavior.
pub trait CompletionService {
    /// Items offered for `request`. `None` means the service was not
    /// triggered, which verifies like an empty list.
    fn completions(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Option<CompletionList>, ServiceError>;

    /// Full description of `item`.
    fn description(
        &self,
        _request: &CompletionRequest<'_>,
        item: &CompletionItem,
    ) -> Result<Option<String>, ServiceError> {
        Ok(item.description.clone())
    }

    /// The edit committing `item` makes. Typing `commit_char` afterwards is
    /// left to the caller unless the change says it already includes it.
    fn change(
        &self,
        _request: &CompletionRequest<'_>,
        list: &CompletionList,
        item: &CompletionItem,
        _commit_char: Option<char>,
    ) -> Result<CompletionChange, ServiceError> {
        Ok(CompletionChange::new(TextEdit::new(
            list.span,
            item.insertion_text(),
        )))
    }
}

/// Pin a closure to the [`CompletionService`] call signature.
pub fn service_fn<F>(f: F) -> F
where
    F: Fn(&CompletionRequest<'_>) -> Result<Option<CompletionList>, ServiceError>,
{
    f
}

impl<F> CompletionService for F
where
    F: Fn(&CompletionRequest<'_>) -> Result<Option<CompletionList>, ServiceError>,
{
    fn completions(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Option<CompletionList>, ServiceError> {
        self(request)
    }
}
