use caret_markup::MarkupError;

/// A fixture that cannot be turned into a workspace.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("invalid markup in `{path}`: {source}")]
    Markup {
        path: String,
        #[source]
        source: MarkupError,
    },
    #[error("malformed workspace XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("expected <{expected}> element, found <{found}>")]
    UnexpectedElement {
        expected: &'static str,
        found: String,
    },
    #[error("<{element}> is missing the `{attribute}` attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("`{value}` is not a valid value for `{attribute}`")]
    InvalidAttribute {
        attribute: &'static str,
        value: String,
    },
    #[error("unknown language `{0}`")]
    UnknownLanguage(String),
    #[error("no project with assembly name `{0}`")]
    UnknownProject(String),
    #[error("linked document `{path}` does not exist in `{assembly}`")]
    UnknownLinkTarget { assembly: String, path: String },
    #[error("no document contains a `$$` caret")]
    NoActiveDocument,
    #[error("carets found in more than one document: {}", paths.join(", "))]
    MultipleActiveDocuments { paths: Vec<String> },
    #[error("no character before the caret at offset {offset} to use as a typed trigger")]
    NoTriggerCharacter { offset: usize },
}
