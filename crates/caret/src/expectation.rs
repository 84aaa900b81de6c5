//! What a test expects to find, or not find, at a caret.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{CompletionItem, FilterTag, Glyph};

/// Describes the candidate an expectation is about.
///
/// Identity is the display text, the display-text suffix and the inline
/// description. An unspecified suffix or inline description stands for the
/// empty string. Every other attribute is only compared when specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemMatcher {
    item: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    display_text_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    glyph: Option<Glyph>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    matching_filters: Option<BTreeSet<FilterTag>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    is_complex_text_edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_text: Option<String>,
}

impl ItemMatcher {
    pub fn new(item: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            display_text_suffix: None,
            inline_description: None,
            glyph: None,
            description: None,
            matching_filters: None,
            is_complex_text_edit: None,
            sort_text: None,
        }
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.display_text_suffix = Some(suffix.into());
        self
    }

    pub fn inline_description(mut self, inline_description: impl Into<String>) -> Self {
        self.inline_description = Some(inline_description.into());
        self
    }

    pub fn glyph(mut self, glyph: Glyph) -> Self {
        self.glyph = Some(glyph);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = FilterTag>) -> Self {
        self.matching_filters = Some(filters.into_iter().collect());
        self
    }

    pub fn complex_text_edit(mut self, is_complex_text_edit: bool) -> Self {
        self.is_complex_text_edit = Some(is_complex_text_edit);
        self
    }

    pub fn sort_text(mut self, sort_text: impl Into<String>) -> Self {
        self.sort_text = Some(sort_text.into());
        self
    }

    pub fn item(&self) -> &str {
        &self.item
    }

    /// Whether the description has to be resolved to check this matcher.
    pub fn expects_description(&self) -> bool {
        self.description.is_some()
    }

    /// The character typed by the partially-written check, if any. Verbatim
    /// identifiers (`@class`) type the character after the `@`.
    pub fn leading_character(&self) -> Option<char> {
        let mut chars = self.item.chars();
        match chars.next()? {
            '@' => chars.next().or(Some('@')),
            first => Some(first),
        }
    }

    pub fn identity_matches(&self, item: &CompletionItem) -> bool {
        item.display_text == self.item
            && item.display_text_suffix == self.display_text_suffix.as_deref().unwrap_or("")
            && item.inline_description == self.inline_description.as_deref().unwrap_or("")
    }

    /// Specified attributes that differ from `item`. `description` is the
    /// resolved description of `item`.
    pub fn mismatches(
        &self,
        item: &CompletionItem,
        description: Option<&str>,
    ) -> Vec<AttributeMismatch> {
        let mut mismatches = Vec::new();
        if let Some(glyph) = self.glyph
            && item.glyph != Some(glyph)
        {
            mismatches.push(AttributeMismatch::new(
                "glyph",
                format!("{glyph:?}"),
                item.glyph.map_or_else(|| "none".to_string(), |g| format!("{g:?}")),
            ));
        }
        if let Some(expected) = &self.description
            && description != Some(expected.as_str())
        {
            mismatches.push(AttributeMismatch::new(
                "description",
                expected.clone(),
                description.unwrap_or_default().to_string(),
            ));
        }
        if let Some(filters) = &self.matching_filters
            && *filters != item.matching_filters
        {
            mismatches.push(AttributeMismatch::new(
                "matching filters",
                format!("{filters:?}"),
                format!("{:?}", item.matching_filters),
            ));
        }
        if let Some(complex) = self.is_complex_text_edit
            && complex != item.is_complex_text_edit
        {
            mismatches.push(AttributeMismatch::new(
                "complex text edit",
                complex.to_string(),
                item.is_complex_text_edit.to_string(),
            ));
        }
        if let Some(sort_text) = &self.sort_text
            && sort_text != item.sort_text()
        {
            mismatches.push(AttributeMismatch::new(
                "sort text",
                sort_text.clone(),
                item.sort_text().to_string(),
            ));
        }
        mismatches
    }
}

impl fmt::Display for ItemMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}", self.item)?;
        if let Some(suffix) = &self.display_text_suffix {
            f.write_str(suffix)?;
        }
        f.write_str("`")?;
        if let Some(inline) = self.inline_description.as_deref().filter(|s| !s.is_empty()) {
            write!(f, " ({inline})")?;
        }
        Ok(())
    }
}

/// A specified attribute whose value differs from the offered item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMismatch {
    pub attribute: &'static str,
    pub expected: String,
    pub actual: String,
}

impl AttributeMismatch {
    fn new(attribute: &'static str, expected: String, actual: String) -> Self {
        Self {
            attribute,
            expected,
            actual,
        }
    }
}

/// A single presence or absence assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expectation {
    Exists(ItemMatcher),
    Absent(ItemMatcher),
}

impl Expectation {
    pub fn exists(item: impl Into<String>) -> Self {
        Expectation::Exists(ItemMatcher::new(item))
    }

    pub fn absent(item: impl Into<String>) -> Self {
        Expectation::Absent(ItemMatcher::new(item))
    }

    pub fn matcher(&self) -> &ItemMatcher {
        match self {
            Expectation::Exists(matcher) | Expectation::Absent(matcher) => matcher,
        }
    }

    pub fn kind(&self) -> ExpectationKind {
        match self {
            Expectation::Exists(_) => ExpectationKind::Exists,
            Expectation::Absent(_) => ExpectationKind::Absent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpectationKind {
    Exists,
    Absent,
}

impl fmt::Display for ExpectationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectationKind::Exists => f.write_str("exists"),
            ExpectationKind::Absent => f.write_str("absent"),
        }
    }
}
