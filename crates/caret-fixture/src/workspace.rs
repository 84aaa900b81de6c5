//! Projects, documents and references of an in-memory workspace.

use serde::{Deserialize, Serialize};

use crate::Language;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(usize);

/// Linked documents share one text slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TextId(usize);

impl ProjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl DocumentId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A reference from one project to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reference {
    /// Source reference to a project of the same solution.
    Project(ProjectId),
    /// Reference to the compiled output of a project.
    Metadata(ProjectId),
}

impl Reference {
    pub fn target(self) -> ProjectId {
        match self {
            Reference::Project(id) | Reference::Metadata(id) => id,
        }
    }

    pub fn kind(self) -> ReferenceKind {
        match self {
            Reference::Project(_) => ReferenceKind::Project,
            Reference::Metadata(_) => ReferenceKind::Metadata,
        }
    }
}

/// How the active project sees the code it depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    #[default]
    None,
    Project,
    Metadata,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceKind::None => "no reference",
            ReferenceKind::Project => "project reference",
            ReferenceKind::Metadata => "metadata reference",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct Project {
    id: ProjectId,
    pub name: String,
    pub assembly_name: String,
    pub language: Language,
    pub preprocessor_symbols: Vec<String>,
    pub common_references: bool,
    /// Only reachable through a metadata reference; never holds the caret.
    pub is_metadata_only: bool,
    documents: Vec<DocumentId>,
    references: Vec<Reference>,
}

impl Project {
    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn documents(&self) -> &[DocumentId] {
        &self.documents
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn defines(&self, symbol: &str) -> bool {
        self.preprocessor_symbols.iter().any(|s| s == symbol)
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    project: ProjectId,
    pub path: String,
    pub is_linked: bool,
    text: TextId,
}

impl Document {
    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }
}

/// A snapshot of projects and documents.
///
/// Snapshots are values: [`Workspace::with_document_text`] returns a new
/// snapshot and leaves the original untouched.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    projects: Vec<Project>,
    documents: Vec<Document>,
    texts: Vec<String>,
}

impl Workspace {
    pub fn builder() -> WorkspaceBuilder {
        WorkspaceBuilder::default()
    }

    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.iter()
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    pub fn project(&self, id: ProjectId) -> &Project {
        &self.projects[id.0]
    }

    pub fn document(&self, id: DocumentId) -> &Document {
        &self.documents[id.0]
    }

    pub fn document_text(&self, id: DocumentId) -> &str {
        &self.texts[self.document(id).text.0]
    }

    pub fn project_of(&self, document: DocumentId) -> &Project {
        self.project(self.document(document).project)
    }

    pub fn find_project(&self, assembly_name: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.assembly_name == assembly_name)
    }

    pub fn find_document(&self, project: ProjectId, path: &str) -> Option<&Document> {
        self.project(project)
            .documents
            .iter()
            .map(|&id| self.document(id))
            .find(|d| d.path == path)
    }

    /// Other documents sharing text with `document`.
    pub fn linked_documents(&self, document: DocumentId) -> Vec<DocumentId> {
        let text = self.document(document).text;
        self.documents
            .iter()
            .filter(|d| d.text == text && d.id != document)
            .map(|d| d.id)
            .collect()
    }

    /// The strongest kind of reference `project` holds. Metadata outranks
    /// project references.
    pub fn reference_kind(&self, project: ProjectId) -> ReferenceKind {
        let references = &self.project(project).references;
        if references.iter().any(|r| matches!(r, Reference::Metadata(_))) {
            ReferenceKind::Metadata
        } else if references.is_empty() {
            ReferenceKind::None
        } else {
            ReferenceKind::Project
        }
    }

    /// A copy of this snapshot with the text of `document` (and of every
    /// document linked to it) replaced.
    pub fn with_document_text(&self, document: DocumentId, text: impl Into<String>) -> Workspace {
        let mut next = self.clone();
        let slot = next.document(document).text;
        next.texts[slot.0] = text.into();
        next
    }
}

/// Builds a [`Workspace`] project by project.
#[derive(Debug, Default)]
pub struct WorkspaceBuilder {
    workspace: Workspace,
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(
        &mut self,
        name: impl Into<String>,
        assembly_name: impl Into<String>,
        language: Language,
    ) -> ProjectId {
        let id = ProjectId(self.workspace.projects.len());
        self.workspace.projects.push(Project {
            id,
            name: name.into(),
            assembly_name: assembly_name.into(),
            language,
            preprocessor_symbols: Vec::new(),
            common_references: true,
            is_metadata_only: false,
            documents: Vec::new(),
            references: Vec::new(),
        });
        id
    }

    /// Add a project whose only purpose is to be compiled into a metadata
    /// reference.
    pub fn add_metadata_project(
        &mut self,
        assembly_name: impl Into<String>,
        language: Language,
    ) -> ProjectId {
        let assembly_name = assembly_name.into();
        let id = self.add_project(assembly_name.clone(), assembly_name, language);
        self.workspace.projects[id.0].is_metadata_only = true;
        id
    }

    /// Add a document to `project`.
    ///
    /// A linked document shares its text with the first non-linked document
    /// of the same path in another project, and `content` is ignored. When
    /// no such document exists yet the document gets its own text.
    pub fn add_document(
        &mut self,
        project: ProjectId,
        path: impl Into<String>,
        content: impl Into<String>,
        is_linked: bool,
    ) -> DocumentId {
        let path = path.into();
        let shared = is_linked
            .then(|| {
                self.workspace
                    .documents
                    .iter()
                    .find(|d| !d.is_linked && d.path == path && d.project != project)
                    .map(|d| d.text)
            })
            .flatten();
        let text = match shared {
            Some(text) => text,
            None => self.push_text(content.into()),
        };
        self.push_document(project, path, is_linked, text)
    }

    /// Add a document to `project` that shares text with `target`.
    pub fn add_linked_document(&mut self, project: ProjectId, target: DocumentId) -> DocumentId {
        let target = &self.workspace.documents[target.0];
        let (path, text) = (target.path.clone(), target.text);
        self.push_document(project, path, true, text)
    }

    pub fn set_preprocessor_symbols<I, S>(&mut self, project: ProjectId, symbols: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.workspace.projects[project.0].preprocessor_symbols =
            symbols.into_iter().map(Into::into).collect();
    }

    pub fn set_common_references(&mut self, project: ProjectId, common_references: bool) {
        self.workspace.projects[project.0].common_references = common_references;
    }

    pub fn add_project_reference(&mut self, from: ProjectId, to: ProjectId) {
        self.add_reference(from, Reference::Project(to));
    }

    pub fn add_metadata_reference(&mut self, from: ProjectId, to: ProjectId) {
        self.add_reference(from, Reference::Metadata(to));
    }

    /// Look up a project added earlier.
    pub fn project(&self, id: ProjectId) -> &Project {
        self.workspace.project(id)
    }

    pub fn find_project(&self, assembly_name: &str) -> Option<&Project> {
        self.workspace.find_project(assembly_name)
    }

    pub fn find_document(&self, project: ProjectId, path: &str) -> Option<DocumentId> {
        self.workspace.find_document(project, path).map(Document::id)
    }

    pub fn build(self) -> Workspace {
        self.workspace
    }

    fn add_reference(&mut self, from: ProjectId, reference: Reference) {
        let references = &mut self.workspace.projects[from.0].references;
        if !references.contains(&reference) {
            references.push(reference);
        }
    }

    fn push_text(&mut self, text: String) -> TextId {
        let id = TextId(self.workspace.texts.len());
        self.workspace.texts.push(text);
        id
    }

    fn push_document(
        &mut self,
        project: ProjectId,
        path: String,
        is_linked: bool,
        text: TextId,
    ) -> DocumentId {
        let id = DocumentId(self.workspace.documents.len());
        self.workspace.documents.push(Document {
            id,
            project,
            path,
            is_linked,
            text,
        });
        self.workspace.projects[project.0].documents.push(id);
        id
    }
}
