//! The `<Workspace>` project-description dialect.
//!
//! ```xml
//! <Workspace>
//!   <Project Language="C#" AssemblyName="Proj1" CommonReferences="true" PreprocessorSymbols="FOO,BAR">
//!     <Document FilePath="Current.cs"><![CDATA[ class C { $$ } ]]></Document>
//!     <ProjectReference>Proj2</ProjectReference>
//!     <MetadataReferenceFromSource Language="C#" CommonReferences="true">
//!       <Document FilePath="Referenced.cs">public class Lib { }</Document>
//!     </MetadataReferenceFromSource>
//!   </Project>
//!   <Project Language="C#" AssemblyName="Proj2">
//!     <Document IsLinkFile="true" LinkAssemblyName="Proj1" LinkFilePath="Current.cs"/>
//!   </Project>
//! </Workspace>
//! ```

use caret_markup::MarkupSource;
use roxmltree::Node;
use tracing::{trace, warn};

use crate::{DocumentId, Fixture, FixtureError, Language, ProjectId, WorkspaceBuilder};

struct PendingLink {
    project: ProjectId,
    assembly: String,
    path: String,
}

struct PendingReference {
    from: ProjectId,
    assembly: String,
}

#[derive(Default)]
struct Parser {
    builder: WorkspaceBuilder,
    links: Vec<PendingLink>,
    references: Vec<PendingReference>,
    active: Vec<(DocumentId, String, MarkupSource)>,
    metadata_count: usize,
}

pub(crate) fn parse_workspace(markup: &str) -> Result<Fixture, FixtureError> {
    let doc = roxmltree::Document::parse(markup)?;
    let root = doc.root_element();
    if !root.has_tag_name("Workspace") {
        return Err(FixtureError::UnexpectedElement {
            expected: "Workspace",
            found: root.tag_name().name().to_string(),
        });
    }

    let mut parser = Parser::default();
    for node in root.children().filter(Node::is_element) {
        match node.tag_name().name() {
            "Project" => parser.project(&node)?,
            other => warn!(element = other, "ignoring unsupported workspace element"),
        }
    }
    parser.finish()
}

impl Parser {
    fn project(&mut self, node: &Node<'_, '_>) -> Result<(), FixtureError> {
        let language = language_attribute(node, "Project")?;
        let assembly_name = required_attribute(node, "Project", "AssemblyName")?;
        let name = node.attribute("Name").unwrap_or(assembly_name);
        let project = self.builder.add_project(name, assembly_name, language);
        self.project_options(node, project)?;

        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "Document" => self.document(&child, project, language)?,
                "ProjectReference" => self.references.push(PendingReference {
                    from: project,
                    assembly: element_text(&child).trim().to_string(),
                }),
                "MetadataReferenceFromSource" => self.metadata_reference(&child, project)?,
                other => warn!(element = other, "ignoring unsupported project element"),
            }
        }
        Ok(())
    }

    fn project_options(&mut self, node: &Node<'_, '_>, project: ProjectId) -> Result<(), FixtureError> {
        if let Some(common) = bool_attribute(node, "CommonReferences")? {
            self.builder.set_common_references(project, common);
        }
        if let Some(symbols) = node.attribute("PreprocessorSymbols") {
            self.builder.set_preprocessor_symbols(
                project,
                symbols.split(',').map(str::trim).filter(|s| !s.is_empty()),
            );
        }
        Ok(())
    }

    fn document(
        &mut self,
        node: &Node<'_, '_>,
        project: ProjectId,
        language: Language,
    ) -> Result<(), FixtureError> {
        if bool_attribute(node, "IsLinkFile")?.unwrap_or(false) {
            self.links.push(PendingLink {
                project,
                assembly: required_attribute(node, "Document", "LinkAssemblyName")?.to_string(),
                path: required_attribute(node, "Document", "LinkFilePath")?.to_string(),
            });
            return Ok(());
        }

        let path = self.document_path(node, project, language);
        let source = parse_markup(&path, &element_text(node))?;
        let id = self.builder.add_document(project, path.clone(), source.text(), false);
        if source.has_caret() {
            self.active.push((id, path, source));
        }
        Ok(())
    }

    fn metadata_reference(&mut self, node: &Node<'_, '_>, from: ProjectId) -> Result<(), FixtureError> {
        let language = language_attribute(node, "MetadataReferenceFromSource")?;
        self.metadata_count += 1;
        let assembly_name = node
            .attribute("AssemblyName")
            .map(str::to_string)
            .unwrap_or_else(|| format!("MetadataReference{}", self.metadata_count));
        let project = self.builder.add_metadata_project(assembly_name, language);
        self.project_options(node, project)?;

        for child in node.children().filter(|n| n.has_tag_name("Document")) {
            let path = self.document_path(&child, project, language);
            let source = parse_markup(&path, &element_text(&child))?;
            if source.has_caret() {
                warn!(path = %path, "ignoring caret inside a metadata reference");
            }
            self.builder.add_document(project, path, source.into_text(), false);
        }
        self.builder.add_metadata_reference(from, project);
        Ok(())
    }

    fn document_path(&self, node: &Node<'_, '_>, project: ProjectId, language: Language) -> String {
        node.attribute("FilePath").map(str::to_string).unwrap_or_else(|| {
            let index = self.builder.project(project).documents().len() + 1;
            format!("Test{index}.{}", language.file_extension())
        })
    }

    fn finish(mut self) -> Result<Fixture, FixtureError> {
        for reference in std::mem::take(&mut self.references) {
            let target = self
                .builder
                .find_project(&reference.assembly)
                .map(|p| p.id())
                .ok_or(FixtureError::UnknownProject(reference.assembly))?;
            self.builder.add_project_reference(reference.from, target);
        }

        for link in std::mem::take(&mut self.links) {
            let target_project = self
                .builder
                .find_project(&link.assembly)
                .map(|p| p.id())
                .ok_or_else(|| FixtureError::UnknownProject(link.assembly.clone()))?;
            let target = self
                .builder
                .find_document(target_project, &link.path)
                .ok_or(FixtureError::UnknownLinkTarget {
                    assembly: link.assembly,
                    path: link.path,
                })?;
            self.builder.add_linked_document(link.project, target);
        }

        let (active, markup) = match self.active.len() {
            0 => return Err(FixtureError::NoActiveDocument),
            1 => {
                let (id, _, markup) = self.active.remove(0);
                (id, markup)
            }
            _ => {
                return Err(FixtureError::MultipleActiveDocuments {
                    paths: self.active.into_iter().map(|(_, path, _)| path).collect(),
                });
            }
        };

        let workspace = self.builder.build();
        trace!(
            projects = workspace.projects().count(),
            documents = workspace.documents().count(),
            "parsed workspace fixture"
        );
        Ok(Fixture::new(workspace, active, markup))
    }
}

fn parse_markup(path: &str, raw: &str) -> Result<MarkupSource, FixtureError> {
    caret_markup::parse(raw).map_err(|source| FixtureError::Markup {
        path: path.to_string(),
        source,
    })
}

/// Text and CDATA content of an element. Trailing whitespace (the
/// indentation before the closing tag) is dropped.
fn element_text(node: &Node<'_, '_>) -> String {
    let text: String = node
        .children()
        .filter(Node::is_text)
        .filter_map(|n| n.text())
        .collect();
    text.trim_end().to_string()
}

fn required_attribute<'a>(
    node: &Node<'a, '_>,
    element: &'static str,
    attribute: &'static str,
) -> Result<&'a str, FixtureError> {
    node.attribute(attribute)
        .ok_or(FixtureError::MissingAttribute { element, attribute })
}

fn language_attribute(node: &Node<'_, '_>, element: &'static str) -> Result<Language, FixtureError> {
    required_attribute(node, element, "Language")?.parse()
}

fn bool_attribute(node: &Node<'_, '_>, attribute: &'static str) -> Result<Option<bool>, FixtureError> {
    node.attribute(attribute)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(FixtureError::InvalidAttribute {
                attribute,
                value: value.to_string(),
            }),
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{Fixture, FixtureError, Language, MarkupError, ReferenceKind};

    fn parse(markup: &str) -> Result<Fixture, FixtureError> {
        Fixture::parse(markup, Language::CSharp)
    }

    #[test]
    fn linked_file_shares_active_text() {
        let fixture = parse(
            r#"<Workspace>
    <Project Language="C#" AssemblyName="Proj1" CommonReferences="true">
        <Document FilePath="CurrentDocument.cs"><![CDATA[
class C
{
    void M()
    {
        $$
    }
}
]]>
        </Document>
    </Project>
    <Project Language="C#" AssemblyName="Proj2" CommonReferences="true">
        <Document IsLinkFile="true" LinkAssemblyName="Proj1" LinkFilePath="CurrentDocument.cs"/>
    </Project>
</Workspace>"#,
        )
        .unwrap();

        let workspace = fixture.workspace();
        let active = fixture.active_document();
        assert_eq!(workspace.project_of(active).assembly_name, "Proj1");
        assert!(fixture.text().starts_with("\nclass C"));
        assert!(fixture.text().ends_with('}'));

        let linked = workspace.linked_documents(active);
        assert_eq!(linked.len(), 1);
        assert_eq!(workspace.project_of(linked[0]).assembly_name, "Proj2");
        assert_eq!(workspace.document_text(linked[0]), fixture.text());
        assert!(workspace.document(linked[0]).is_linked);
    }

    #[test]
    fn project_and_metadata_references() {
        let fixture = parse(
            r#"<Workspace>
    <Project Language="C#" AssemblyName="Project1" PreprocessorSymbols="FOO, BAR">
        <Document FilePath="SourceDocument">class Program { void M() { new Goo().$$ } }</Document>
        <ProjectReference>Project2</ProjectReference>
        <MetadataReferenceFromSource Language="Visual Basic" CommonReferences="false">
            <Document FilePath="Lib.vb">Public Class Lib
End Class</Document>
        </MetadataReferenceFromSource>
    </Project>
    <Project Language="Visual Basic" AssemblyName="Project2">
        <Document FilePath="ReferencedDocument">Public Class Goo
End Class</Document>
    </Project>
</Workspace>"#,
        )
        .unwrap();

        let workspace = fixture.workspace();
        let project = workspace.project_of(fixture.active_document());
        assert!(project.defines("FOO"));
        assert!(project.defines("BAR"));
        assert_eq!(project.references().len(), 2);
        assert_eq!(workspace.reference_kind(project.id()), ReferenceKind::Metadata);

        let metadata = workspace
            .projects()
            .find(|p| p.is_metadata_only)
            .unwrap();
        assert_eq!(metadata.assembly_name, "MetadataReference1");
        assert_eq!(metadata.language, Language::VisualBasic);
        assert!(!metadata.common_references);

        let project2 = workspace.find_project("Project2").unwrap();
        assert_eq!(project2.language, Language::VisualBasic);
        assert_eq!(fixture.language(), Language::CSharp);
    }

    #[test]
    fn caret_must_be_in_exactly_one_document() {
        let none = parse(
            r#"<Workspace><Project Language="C#" AssemblyName="P"><Document>class C { }</Document></Project></Workspace>"#,
        )
        .unwrap_err();
        assert!(matches!(none, FixtureError::NoActiveDocument));

        let many = parse(
            r#"<Workspace>
    <Project Language="C#" AssemblyName="P">
        <Document FilePath="A.cs">$$</Document>
        <Document FilePath="B.cs">$$</Document>
    </Project>
</Workspace>"#,
        )
        .unwrap_err();
        match many {
            FixtureError::MultipleActiveDocuments { paths } => assert_eq!(paths, vec!["A.cs", "B.cs"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unnamed_documents_get_generated_paths() {
        let fixture = parse(
            r#"<Workspace><Project Language="Visual Basic" AssemblyName="P"><Document>Class C : End Class</Document><Document>$$</Document></Project></Workspace>"#,
        )
        .unwrap();
        let document = fixture.workspace().document(fixture.active_document());
        assert_eq!(document.path, "Test2.vb");
    }

    #[test]
    fn malformed_workspaces() {
        let err = parse(r#"<Workspace><Project AssemblyName="P"/></Workspace>"#).unwrap_err();
        assert!(matches!(
            err,
            FixtureError::MissingAttribute { element: "Project", attribute: "Language" }
        ));

        let err = parse(r#"<Workspace><Project Language="F#" AssemblyName="P"/></Workspace>"#)
            .unwrap_err();
        assert!(matches!(err, FixtureError::UnknownLanguage(ref name) if name == "F#"));

        let err = parse(
            r#"<Workspace><Project Language="C#" AssemblyName="P" CommonReferences="yes"/></Workspace>"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::InvalidAttribute { attribute: "CommonReferences", .. }));

        let err = parse(
            r#"<Workspace><Project Language="C#" AssemblyName="P"><Document>$$</Document><ProjectReference>Missing</ProjectReference></Project></Workspace>"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::UnknownProject(ref name) if name == "Missing"));

        let err = parse(
            r#"<Workspace><Project Language="C#" AssemblyName="P"><Document>$$</Document></Project><Project Language="C#" AssemblyName="Q"><Document IsLinkFile="true" LinkAssemblyName="P" LinkFilePath="Nope.cs"/></Project></Workspace>"#,
        )
        .unwrap_err();
        assert!(matches!(err, FixtureError::UnknownLinkTarget { .. }));

        let err = parse(r#"<Workspace><Project Language="C#" AssemblyName="P"><Document>[|$$</Document></Project></Workspace>"#)
            .unwrap_err();
        assert!(matches!(
            err,
            FixtureError::Markup { source: MarkupError::UnclosedSpan { .. }, .. }
        ));

        let err = parse("<Workspace><Project>").unwrap_err();
        assert!(matches!(err, FixtureError::Xml(_)));
    }
}
