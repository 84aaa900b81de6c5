//! Completion items as produced by a completion service.

use std::collections::BTreeSet;

use caret_markup::TextSpan;
use serde::{Deserialize, Serialize};

/// The icon shown next to a completion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    Class,
    Constant,
    Delegate,
    Enum,
    EnumMember,
    Event,
    ExtensionMethod,
    Field,
    Interface,
    Keyword,
    Label,
    Local,
    Method,
    Module,
    Namespace,
    Operator,
    Parameter,
    Property,
    RangeVariable,
    Snippet,
    Structure,
    TypeParameter,
}

/// A completion-list filter an item can be selected by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTag {
    Class,
    Constant,
    Delegate,
    Enum,
    EnumMember,
    Event,
    ExtensionMethod,
    Field,
    Interface,
    Keyword,
    Local,
    Method,
    Module,
    Namespace,
    Parameter,
    Property,
    Snippet,
    Structure,
    TargetTypeMatch,
    TypeParameter,
}

/// One candidate offered at a caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletionItem {
    pub display_text: String,
    pub display_text_prefix: String,
    pub display_text_suffix: String,
    pub inline_description: String,
    pub glyph: Option<Glyph>,
    pub sort_text: Option<String>,
    pub filter_text: Option<String>,
    pub insertion_text: Option<String>,
    /// Eagerly known description. Services may compute it lazily instead.
    pub description: Option<String>,
    pub matching_filters: BTreeSet<FilterTag>,
    pub is_complex_text_edit: bool,
    /// Number of symbols merged into this item, e.g. overloads.
    pub symbol_count: usize,
}

impl Default for CompletionItem {
    fn default() -> Self {
        Self {
            display_text: String::new(),
            display_text_prefix: String::new(),
            display_text_suffix: String::new(),
            inline_description: String::new(),
            glyph: None,
            sort_text: None,
            filter_text: None,
            insertion_text: None,
            description: None,
            matching_filters: BTreeSet::new(),
            is_complex_text_edit: false,
            symbol_count: 1,
        }
    }
}

impl CompletionItem {
    pub fn new(display_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            ..Self::default()
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.display_text_suffix = suffix.into();
        self
    }

    pub fn with_inline_description(mut self, inline_description: impl Into<String>) -> Self {
        self.inline_description = inline_description.into();
        self
    }

    pub fn with_glyph(mut self, glyph: Glyph) -> Self {
        self.glyph = Some(glyph);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_filters(mut self, filters: impl IntoIterator<Item = FilterTag>) -> Self {
        self.matching_filters = filters.into_iter().collect();
        self
    }

    pub fn with_insertion_text(mut self, insertion_text: impl Into<String>) -> Self {
        self.insertion_text = Some(insertion_text.into());
        self
    }

    pub fn with_symbol_count(mut self, symbol_count: usize) -> Self {
        self.symbol_count = symbol_count;
        self
    }

    pub fn filter_text(&self) -> &str {
        self.filter_text.as_deref().unwrap_or(&self.display_text)
    }

    pub fn sort_text(&self) -> &str {
        self.sort_text.as_deref().unwrap_or(&self.display_text)
    }

    pub fn insertion_text(&self) -> &str {
        self.insertion_text.as_deref().unwrap_or(&self.display_text)
    }

    /// Display text with its suffix, the form commit lookups use.
    pub fn display_text_with_suffix(&self) -> String {
        format!("{}{}", self.display_text, self.display_text_suffix)
    }

    /// Everything shown in the list row, used in failure reports.
    pub fn label(&self) -> String {
        let mut label = format!(
            "{}{}{}",
            self.display_text_prefix, self.display_text, self.display_text_suffix
        );
        if !self.inline_description.is_empty() {
            label.push_str(" (");
            label.push_str(&self.inline_description);
            label.push(')');
        }
        label
    }
}

/// Items offered at a caret plus the span they would replace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionList {
    pub items: Vec<CompletionItem>,
    pub span: TextSpan,
}

impl CompletionList {
    pub fn new(items: Vec<CompletionItem>, span: TextSpan) -> Self {
        Self { items, span }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Replacement of a span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: TextSpan,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(span: TextSpan, new_text: impl Into<String>) -> Self {
        Self {
            span,
            new_text: new_text.into(),
        }
    }

    /// `text` with the edit applied, or `None` when the span does not fit `text`.
    pub fn apply(&self, text: &str) -> Option<String> {
        let before = text.get(..self.span.start)?;
        let after = text.get(self.span.end..)?;
        Some(format!("{before}{}{after}", self.new_text))
    }
}

/// What committing an item does to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionChange {
    pub edit: TextEdit,
    /// Caret after the commit. Defaults to the end of the inserted text.
    pub new_caret: Option<usize>,
    /// The edit already contains the commit character.
    pub includes_commit_character: bool,
}

impl CompletionChange {
    pub fn new(edit: TextEdit) -> Self {
        Self {
            edit,
            new_caret: None,
            includes_commit_character: false,
        }
    }

    pub fn caret(&self) -> usize {
        self.new_caret
            .unwrap_or(self.edit.span.start + self.edit.new_text.len())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn texts_fall_back_to_display_text() {
        let item = CompletionItem::new("Colors");
        assert_eq!(item.filter_text(), "Colors");
        assert_eq!(item.sort_text(), "Colors");
        assert_eq!(item.insertion_text(), "Colors");
        assert_eq!(item.symbol_count, 1);

        let item = CompletionItem {
            filter_text: Some("colors".into()),
            insertion_text: Some("Colors()".into()),
            ..item
        };
        assert_eq!(item.filter_text(), "colors");
        assert_eq!(item.insertion_text(), "Colors()");
    }

    #[test]
    fn label_shows_suffix_and_inline_description() {
        let item = CompletionItem::new("List")
            .with_suffix("<>")
            .with_inline_description("System.Collections.Generic");
        assert_eq!(item.label(), "List<> (System.Collections.Generic)");
        assert_eq!(item.display_text_with_suffix(), "List<>");
    }

    #[test]
    fn edit_apply() {
        let edit = TextEdit::new(TextSpan::new(4, 5), "Colors");
        assert_eq!(edit.apply("x = C;").as_deref(), Some("x = Colors;"));
        assert_eq!(TextEdit::new(TextSpan::new(4, 9), "").apply("abc"), None);
        assert_eq!(CompletionChange::new(edit).caret(), 10);
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let item: CompletionItem = serde_json::from_str(
            r#"{ "display_text": "Goo", "glyph": "enum", "matching_filters": ["enum"] }"#,
        )
        .unwrap();
        assert_eq!(item.glyph, Some(Glyph::Enum));
        assert_eq!(item.symbol_count, 1);
        assert!(item.matching_filters.contains(&FilterTag::Enum));
    }
}
