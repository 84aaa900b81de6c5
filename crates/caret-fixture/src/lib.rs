//! In-memory workspace fixtures for completion tests.
//!
//! A fixture is a [`Workspace`] snapshot plus the active document that holds
//! the caret(s). Fixtures come either from plain markup (one project, one
//! document) or from the `<Workspace>` XML project-description dialect, see
//! [`Fixture::parse`].

mod error;
mod fixture;
mod workspace;
mod xml;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use caret_markup::{MarkupError, MarkupSource, TextSpan};
pub use error::FixtureError;
pub use fixture::{DEFAULT_PROJECT, Fixture, is_workspace_markup};
pub use workspace::{
    Document, DocumentId, Project, ProjectId, Reference, ReferenceKind, Workspace,
    WorkspaceBuilder,
};

/// Source language of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "C#", alias = "csharp")]
    CSharp,
    #[serde(rename = "Visual Basic", alias = "vb")]
    VisualBasic,
}

impl Language {
    /// The name used by the `Language` attribute of the workspace dialect.
    pub fn name(self) -> &'static str {
        match self {
            Language::CSharp => "C#",
            Language::VisualBasic => "Visual Basic",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            Language::CSharp => "cs",
            Language::VisualBasic => "vb",
        }
    }

    /// A comment that can sit right after the caret without ending the line.
    pub fn inline_comment(self) -> Option<&'static str> {
        match self {
            Language::CSharp => Some("/**/"),
            Language::VisualBasic => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Language {
    type Err = FixtureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C#" | "csharp" => Ok(Language::CSharp),
            "Visual Basic" | "vb" => Ok(Language::VisualBasic),
            other => Err(FixtureError::UnknownLanguage(other.to_string())),
        }
    }
}
