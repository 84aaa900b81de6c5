//! Counting an item across project and metadata references.
//!
//! Editor-browsable attributes only apply across a metadata boundary, so the
//! same referenced code is compiled into separate fixture graphs and the
//! item is counted in each.

use caret_fixture::{Fixture, FixtureError, Language, MarkupError, ReferenceKind, Workspace};
use tracing::debug;

use crate::config::VerificationConfig;
use crate::error::VerificationError;
use crate::service::CompletionService;
use crate::verifier::{Variant, Verifier};

const SOURCE_PROJECT: &str = "Project1";
const REFERENCED_PROJECT: &str = "Project2";
const SOURCE_DOCUMENT: &str = "SourceDocument";
const REFERENCED_DOCUMENT: &str = "ReferencedDocument";

/// An item whose visibility depends on how its declaring code is referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowsableCase {
    /// Source markup holding the caret.
    pub markup: String,
    /// Code declaring the item.
    pub referenced_code: String,
    pub item: String,
    /// Symbols expected when the code is in the same solution.
    pub expected_same_solution: usize,
    /// Symbols expected when the code is referenced as compiled metadata.
    pub expected_metadata_reference: usize,
    pub source_language: Language,
    pub referenced_language: Language,
    pub hide_advanced_members: bool,
}

impl BrowsableCase {
    pub fn new(
        markup: impl Into<String>,
        referenced_code: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        Self {
            markup: markup.into(),
            referenced_code: referenced_code.into(),
            item: item.into(),
            expected_same_solution: 1,
            expected_metadata_reference: 1,
            source_language: Language::CSharp,
            referenced_language: Language::CSharp,
            hide_advanced_members: false,
        }
    }

    pub fn expect(mut self, same_solution: usize, metadata_reference: usize) -> Self {
        self.expected_same_solution = same_solution;
        self.expected_metadata_reference = metadata_reference;
        self
    }

    pub fn languages(mut self, source: Language, referenced: Language) -> Self {
        self.source_language = source;
        self.referenced_language = referenced;
        self
    }

    pub fn hide_advanced_members(mut self, enabled: bool) -> Self {
        self.hide_advanced_members = enabled;
        self
    }

    /// Fixture graphs to count in, with the count each should yield.
    /// Projects of different languages cannot share a project, so the
    /// same-project graph only exists when the languages agree.
    pub fn graphs(&self) -> Vec<(ReferenceKind, usize)> {
        let mut graphs = vec![
            (ReferenceKind::Metadata, self.expected_metadata_reference),
            (ReferenceKind::Project, self.expected_same_solution),
        ];
        if self.source_language == self.referenced_language {
            graphs.push((ReferenceKind::None, self.expected_same_solution));
        }
        graphs
    }

    /// Build the graph in which the referenced code is seen through `reference`.
    /// [`ReferenceKind::None`] puts both documents in one project.
    pub fn fixture(&self, reference: ReferenceKind) -> Result<Fixture, FixtureError> {
        let markup = caret_markup::parse(&self.markup).map_err(|source| FixtureError::Markup {
            path: SOURCE_DOCUMENT.to_string(),
            source,
        })?;
        if !markup.has_caret() {
            return Err(FixtureError::Markup {
                path: SOURCE_DOCUMENT.to_string(),
                source: MarkupError::MissingCaret,
            });
        }

        let mut builder = Workspace::builder();
        let source = builder.add_project(SOURCE_PROJECT, SOURCE_PROJECT, self.source_language);
        let active = builder.add_document(source, SOURCE_DOCUMENT, markup.text(), false);
        match reference {
            ReferenceKind::None => {
                builder.add_document(source, REFERENCED_DOCUMENT, self.referenced_code.as_str(), false);
            }
            ReferenceKind::Project => {
                let referenced =
                    builder.add_project(REFERENCED_PROJECT, REFERENCED_PROJECT, self.referenced_language);
                builder.add_document(referenced, REFERENCED_DOCUMENT, self.referenced_code.as_str(), false);
                builder.add_project_reference(source, referenced);
            }
            ReferenceKind::Metadata => {
                let referenced = builder.add_metadata_project(REFERENCED_PROJECT, self.referenced_language);
                builder.add_document(referenced, REFERENCED_DOCUMENT, self.referenced_code.as_str(), false);
                builder.add_metadata_reference(source, referenced);
            }
        }
        Ok(Fixture::new(builder.build(), active, markup))
    }
}

impl<'s, S: CompletionService + ?Sized> Verifier<'s, S> {
    /// Count the symbols named `case.item` once per fixture graph and fail
    /// with [`VerificationError::ConfigurationMismatch`] on the first graph
    /// whose count differs from the expected one.
    pub fn verify_item_in_editor_browsable_contexts(
        &self,
        case: &BrowsableCase,
    ) -> Result<(), VerificationError> {
        let config = VerificationConfig {
            hide_advanced_members: case.hide_advanced_members,
            ..VerificationConfig::default()
        };
        for (reference, expected) in case.graphs() {
            let fixture = case.fixture(reference)?;
            let offset = fixture
                .markup()
                .single_caret()
                .map_err(|source| FixtureError::Markup {
                    path: SOURCE_DOCUMENT.to_string(),
                    source,
                })?;
            let variant = Variant::at_position(&fixture, offset);
            let context = variant.context(0, config);
            let (_, list) = self.query(fixture.active_document(), &variant, config, &context)?;
            let actual: usize = list
                .iter()
                .flat_map(|list| &list.items)
                .filter(|item| item.display_text == case.item)
                .map(|item| item.symbol_count)
                .sum();
            debug!(%reference, expected, actual, item = %case.item, "counted symbols");
            if actual != expected {
                return Err(VerificationError::ConfigurationMismatch {
                    item: case.item.clone(),
                    reference,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use caret_markup::TextSpan;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::item::{CompletionItem, CompletionList};
    use crate::service::service_fn;

    const SOURCE: &str = "class Program { void M() { $$ } }";
    const GOO: &str = "[System.ComponentModel.EditorBrowsable(System.ComponentModel.EditorBrowsableState.Never)]\npublic enum Goo { Member }";

    #[test]
    fn graphs_are_composed_per_reference_kind() {
        let case = BrowsableCase::new(SOURCE, GOO, "Goo").expect(1, 0);
        assert_eq!(
            case.graphs(),
            vec![
                (ReferenceKind::Metadata, 0),
                (ReferenceKind::Project, 1),
                (ReferenceKind::None, 1)
            ]
        );

        let metadata = case.fixture(ReferenceKind::Metadata).unwrap();
        let workspace = metadata.workspace();
        let project = workspace.project_of(metadata.active_document());
        assert_eq!(workspace.reference_kind(project.id()), ReferenceKind::Metadata);
        assert!(workspace.find_project("Project2").unwrap().is_metadata_only);

        let same = case.fixture(ReferenceKind::None).unwrap();
        assert_eq!(same.workspace().projects().count(), 1);
        assert_eq!(same.workspace().documents().count(), 2);

        let mixed = case.languages(Language::CSharp, Language::VisualBasic);
        assert_eq!(mixed.graphs().len(), 2);
    }

    #[test]
    fn hidden_across_metadata_boundary() {
        let service = service_fn(|request| {
            let hidden = request.workspace.reference_kind(request.project().id())
                == ReferenceKind::Metadata;
            let items = if hidden {
                Vec::new()
            } else {
                vec![CompletionItem::new("Goo")]
            };
            Ok(Some(CompletionList::new(items, TextSpan::empty(request.offset))))
        });
        let verifier = Verifier::new(&service);

        verifier
            .verify_item_in_editor_browsable_contexts(&BrowsableCase::new(SOURCE, GOO, "Goo").expect(1, 0))
            .unwrap();

        let err = verifier
            .verify_item_in_editor_browsable_contexts(&BrowsableCase::new(SOURCE, GOO, "Goo").expect(1, 1))
            .unwrap_err();
        match err {
            VerificationError::ConfigurationMismatch {
                reference,
                expected,
                actual,
                ..
            } => {
                assert_eq!(reference, ReferenceKind::Metadata);
                assert_eq!((expected, actual), (1, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn overloads_count_as_symbols() {
        let service = service_fn(|request| {
            Ok(Some(CompletionList::new(
                vec![CompletionItem::new("Bar").with_symbol_count(2)],
                TextSpan::empty(request.offset),
            )))
        });
        Verifier::new(&service)
            .verify_item_in_editor_browsable_contexts(
                &BrowsableCase::new(SOURCE, "public class Foo { public void Bar() {} public void Bar(int x) {} }", "Bar")
                    .expect(2, 2),
            )
            .unwrap();
    }

    #[test]
    fn source_without_caret_is_malformed() {
        let service = service_fn(|_| Ok(None));
        let err = Verifier::new(&service)
            .verify_item_in_editor_browsable_contexts(&BrowsableCase::new("class C { }", GOO, "Goo"))
            .unwrap_err();
        assert!(matches!(err, VerificationError::MalformedFixture(_)));
    }
}
