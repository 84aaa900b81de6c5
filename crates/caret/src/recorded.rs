//! A completion service that replays recorded answers.
//!
//! It does no analysis of its own. Each rule says under which conditions a
//! list of items is offered, and the typed identifier prefix narrows the
//! result the way a completion list filters as the user types.
//!
//! ```toml
//! [[rule]]
//! when = { after = "case", contains = "MAX_SIZE" }
//! items = [{ display_text = "MAX_SIZE", glyph = "constant" }]
//! ```

use caret_fixture::{Language, ReferenceKind};
use caret_markup::TextSpan;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::{CompletionTrigger, SourceKind};
use crate::item::{CompletionItem, CompletionList};
use crate::service::{CompletionRequest, CompletionService, ServiceError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordedService {
    #[serde(default, rename = "rule")]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(default)]
    pub when: Condition,
    #[serde(default)]
    pub items: Vec<CompletionItem>,
}

/// Requirements a request has to meet. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Condition {
    /// Text before the typed prefix ends with this, trailing whitespace ignored.
    pub after: Option<String>,
    /// The document contains this text.
    pub contains: Option<String>,
    pub source_kind: Option<SourceKind>,
    pub trigger: Option<TriggerFilter>,
    pub hide_advanced_members: Option<bool>,
    /// How the active project references the rest of the workspace.
    pub reference: Option<ReferenceKind>,
    /// Assembly name of the active project.
    pub project: Option<String>,
    pub language: Option<Language>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerFilter {
    Invoke,
    /// Any typed character.
    Typed,
    Char(char),
}

impl TriggerFilter {
    fn matches(self, trigger: CompletionTrigger) -> bool {
        match (self, trigger) {
            (TriggerFilter::Invoke, CompletionTrigger::Invoke) => true,
            (TriggerFilter::Typed, CompletionTrigger::Insertion(_)) => true,
            (TriggerFilter::Char(expected), CompletionTrigger::Insertion(c)) => expected == c,
            _ => false,
        }
    }
}

impl Condition {
    fn matches(&self, request: &CompletionRequest<'_>, before_prefix: &str) -> bool {
        let project = request.project();
        self.after
            .as_deref()
            .is_none_or(|after| before_prefix.trim_end().ends_with(after.trim_end()))
            && self
                .contains
                .as_deref()
                .is_none_or(|needle| request.text().contains(needle))
            && self
                .source_kind
                .is_none_or(|kind| kind == request.config.source_kind)
            && self.trigger.is_none_or(|t| t.matches(request.trigger))
            && self
                .hide_advanced_members
                .is_none_or(|hide| hide == request.config.hide_advanced_members)
            && self
                .reference
                .is_none_or(|kind| kind == request.workspace.reference_kind(project.id()))
            && self
                .project
                .as_deref()
                .is_none_or(|name| name == project.assembly_name)
            && self.language.is_none_or(|language| language == project.language)
    }
}

impl RecordedService {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Start of the identifier that ends at `offset`.
fn prefix_start(text: &str, offset: usize) -> usize {
    text[..offset]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| c.is_alphanumeric() || c == '_' || c == '@')
        .last()
        .map_or(offset, |(i, _)| i)
}

impl CompletionService for RecordedService {
    fn completions(
        &self,
        request: &CompletionRequest<'_>,
    ) -> Result<Option<CompletionList>, ServiceError> {
        let text = request.text();
        if !text.is_char_boundary(request.offset) {
            return Err(ServiceError::new(format!(
                "offset {} is not on a character boundary",
                request.offset
            )));
        }
        let start = prefix_start(text, request.offset);
        let prefix = text[start..request.offset].to_lowercase();
        let before = &text[..start];

        let mut matched = false;
        let mut items = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.when.matches(request, before)) {
            matched = true;
            items.extend(
                rule.items
                    .iter()
                    .filter(|item| item.filter_text().to_lowercase().starts_with(&prefix))
                    .cloned(),
            );
        }
        trace!(matched, items = items.len(), prefix = %prefix, "recorded answer");
        Ok(matched.then(|| CompletionList::new(items, TextSpan::new(start, request.offset))))
    }
}

#[cfg(test)]
mod tests {
    use caret_fixture::Fixture;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{TriggerMode, VerificationConfig};

    fn service() -> RecordedService {
        RecordedService::from_json(
            r#"{
                "rule": [
                    { "when": { "after": "case" }, "items": [{ "display_text": "MAX_SIZE" }, { "display_text": "i" }] },
                    { "when": { "after": ".", "trigger": { "char": "." } }, "items": [{ "display_text": "Red" }] },
                    { "when": { "reference": "metadata" }, "items": [{ "display_text": "Hidden" }] }
                ]
            }"#,
        )
        .unwrap()
    }

    fn complete(service: &RecordedService, markup: &str, config: VerificationConfig) -> Option<Vec<String>> {
        let fixture = Fixture::parse(markup, Language::CSharp).unwrap();
        let offset = fixture.carets()[0];
        let request = CompletionRequest {
            workspace: fixture.workspace(),
            document: fixture.active_document(),
            offset,
            trigger: config.trigger(fixture.text(), offset).unwrap(),
            config,
        };
        service
            .completions(&request)
            .unwrap()
            .map(|list| list.items.into_iter().map(|i| i.display_text).collect())
    }

    #[test]
    fn rules_match_text_before_prefix() {
        let service = service();
        let config = VerificationConfig::default();
        assert_eq!(
            complete(&service, "switch (i) { case $$", config),
            Some(vec!["MAX_SIZE".to_string(), "i".to_string()])
        );
        assert_eq!(
            complete(&service, "switch (i) { case m$$", config),
            Some(vec!["MAX_SIZE".to_string()])
        );
        assert_eq!(
            complete(&service, "switch (i) { case x$$", config),
            Some(Vec::new())
        );
        assert_eq!(complete(&service, "var x = $$", config), None);
    }

    #[test]
    fn trigger_filter() {
        let service = service();
        let typed = VerificationConfig {
            trigger_mode: TriggerMode::TypedCharacter,
            use_previous_char_as_trigger: true,
            ..VerificationConfig::default()
        };
        assert_eq!(
            complete(&service, "Colors.$$", typed),
            Some(vec!["Red".to_string()])
        );
        assert_eq!(complete(&service, "Colors.$$", VerificationConfig::default()), None);
    }

    #[test]
    fn prefix_start_stops_at_non_identifier() {
        assert_eq!(prefix_start("a.Bc", 4), 2);
        assert_eq!(prefix_start("x = @cl", 7), 4);
        assert_eq!(prefix_start("x = ", 4), 4);
    }

    #[test]
    fn unknown_condition_is_rejected() {
        let err = RecordedService::from_json(r#"{ "rule": [{ "when": { "afterr": "." } }] }"#);
        assert!(err.is_err());
    }
}
