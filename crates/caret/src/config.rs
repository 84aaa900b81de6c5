//! Verification configurations and the options that expand into them.

use std::fmt;

pub use caret_config::SourceKind;
use caret_config::VerifyConfig;
use caret_fixture::{FixtureError, Language};
use serde::{Deserialize, Serialize};

/// How the completion session is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    #[default]
    InvokedExplicitly,
    /// The character before the caret was just typed.
    TypedCharacter,
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::InvokedExplicitly => f.write_str("invoked explicitly"),
            TriggerMode::TypedCharacter => f.write_str("typed character"),
        }
    }
}

/// The trigger handed to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionTrigger {
    Invoke,
    Insertion(char),
}

/// One point of the configuration fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VerificationConfig {
    pub source_kind: SourceKind,
    pub trigger_mode: TriggerMode,
    pub hide_advanced_members: bool,
    pub use_previous_char_as_trigger: bool,
}

impl VerificationConfig {
    /// The trigger for a caret at `offset` in `text`.
    pub fn trigger(&self, text: &str, offset: usize) -> Result<CompletionTrigger, FixtureError> {
        match self.trigger_mode {
            TriggerMode::InvokedExplicitly => Ok(CompletionTrigger::Invoke),
            TriggerMode::TypedCharacter => text
                .get(..offset)
                .and_then(|before| before.chars().next_back())
                .map(CompletionTrigger::Insertion)
                .ok_or(FixtureError::NoTriggerCharacter { offset }),
        }
    }
}

impl fmt::Display for VerificationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} source, {}", self.source_kind, self.trigger_mode)?;
        if self.hide_advanced_members {
            f.write_str(", advanced members hidden")?;
        }
        Ok(())
    }
}

/// Where the caret sits relative to the rest of the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    AtPosition,
    /// An inline comment follows the caret.
    InFrontOfComment,
    /// The text ends at the caret.
    AtEndOfFile,
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::AtPosition => f.write_str("at position"),
            Placement::InFrontOfComment => f.write_str("in front of comment"),
            Placement::AtEndOfFile => f.write_str("at end of file"),
        }
    }
}

/// Placement variants to verify in addition to [`Placement::AtPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placements {
    pub in_front_of_comment: bool,
    pub at_end_of_file: bool,
    /// Re-run expected items with their leading character typed.
    pub partially_written: bool,
}

impl Default for Placements {
    fn default() -> Self {
        Self {
            in_front_of_comment: true,
            at_end_of_file: true,
            partially_written: true,
        }
    }
}

impl Placements {
    pub fn at_position_only() -> Self {
        Self {
            in_front_of_comment: false,
            at_end_of_file: false,
            partially_written: false,
        }
    }

    pub(crate) fn iter(self) -> impl Iterator<Item = Placement> {
        [
            Some(Placement::AtPosition),
            self.in_front_of_comment.then_some(Placement::InFrontOfComment),
            self.at_end_of_file.then_some(Placement::AtEndOfFile),
        ]
        .into_iter()
        .flatten()
    }
}

/// Caller-supplied options of a verification call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Empty means regular source only.
    pub source_kinds: Vec<SourceKind>,
    pub use_previous_char_as_trigger: bool,
    pub both_trigger_modes: bool,
    pub hide_advanced_members: bool,
    pub placements: Placements,
    /// Language of plain (non-workspace) markup.
    pub language: Language,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            source_kinds: vec![SourceKind::Regular],
            use_previous_char_as_trigger: false,
            both_trigger_modes: false,
            hide_advanced_members: false,
            placements: Placements::default(),
            language: Language::CSharp,
        }
    }
}

impl From<&VerifyConfig> for VerifyOptions {
    fn from(config: &VerifyConfig) -> Self {
        Self {
            source_kinds: config.source_kinds.clone(),
            use_previous_char_as_trigger: config.use_previous_char_as_trigger,
            both_trigger_modes: config.both_trigger_modes,
            hide_advanced_members: config.hide_advanced_members,
            placements: Placements {
                in_front_of_comment: config.in_front_of_comment,
                at_end_of_file: config.at_end_of_file,
                partially_written: config.partially_written,
            },
            language: Language::CSharp,
        }
    }
}

impl VerifyOptions {
    pub fn with_source_kinds(mut self, kinds: impl IntoIterator<Item = SourceKind>) -> Self {
        self.source_kinds = kinds.into_iter().collect();
        self
    }

    pub fn with_script(mut self) -> Self {
        if !self.source_kinds.contains(&SourceKind::Script) {
            self.source_kinds.push(SourceKind::Script);
        }
        self
    }

    pub fn use_previous_char_as_trigger(mut self, enabled: bool) -> Self {
        self.use_previous_char_as_trigger = enabled;
        self
    }

    pub fn both_trigger_modes(mut self, enabled: bool) -> Self {
        self.both_trigger_modes = enabled;
        self
    }

    pub fn hide_advanced_members(mut self, enabled: bool) -> Self {
        self.hide_advanced_members = enabled;
        self
    }

    pub fn with_placements(mut self, placements: Placements) -> Self {
        self.placements = placements;
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn trigger_modes(&self) -> Vec<TriggerMode> {
        if self.both_trigger_modes {
            vec![TriggerMode::InvokedExplicitly, TriggerMode::TypedCharacter]
        } else if self.use_previous_char_as_trigger {
            vec![TriggerMode::TypedCharacter]
        } else {
            vec![TriggerMode::InvokedExplicitly]
        }
    }

    /// Every configuration to verify, source kinds outermost.
    pub fn configurations(&self) -> Vec<VerificationConfig> {
        let kinds: &[SourceKind] = if self.source_kinds.is_empty() {
            &[SourceKind::Regular]
        } else {
            &self.source_kinds
        };
        let modes = self.trigger_modes();
        kinds
            .iter()
            .flat_map(|&source_kind| {
                modes.iter().map(move |&trigger_mode| VerificationConfig {
                    source_kind,
                    trigger_mode,
                    hide_advanced_members: self.hide_advanced_members,
                    use_previous_char_as_trigger: trigger_mode == TriggerMode::TypedCharacter,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_fans_out_to_one_configuration() {
        let configs = VerifyOptions::default().configurations();
        assert_eq!(configs, vec![VerificationConfig::default()]);
    }

    #[test]
    fn script_and_both_trigger_modes() {
        let configs = VerifyOptions::default()
            .with_script()
            .both_trigger_modes(true)
            .hide_advanced_members(true)
            .configurations();
        let summary: Vec<_> = configs
            .iter()
            .map(|c| (c.source_kind, c.trigger_mode, c.hide_advanced_members))
            .collect();
        assert_eq!(
            summary,
            vec![
                (SourceKind::Regular, TriggerMode::InvokedExplicitly, true),
                (SourceKind::Regular, TriggerMode::TypedCharacter, true),
                (SourceKind::Script, TriggerMode::InvokedExplicitly, true),
                (SourceKind::Script, TriggerMode::TypedCharacter, true),
            ]
        );
    }

    #[test]
    fn typed_trigger_uses_previous_character() {
        let config = VerificationConfig {
            trigger_mode: TriggerMode::TypedCharacter,
            use_previous_char_as_trigger: true,
            ..VerificationConfig::default()
        };
        assert_eq!(
            config.trigger("Colors.", 7).unwrap(),
            CompletionTrigger::Insertion('.')
        );
        assert!(matches!(
            config.trigger("Colors.", 0),
            Err(FixtureError::NoTriggerCharacter { offset: 0 })
        ));
        assert_eq!(
            VerificationConfig::default().trigger("", 0).unwrap(),
            CompletionTrigger::Invoke
        );
    }

    #[test]
    fn placements_from_config() {
        let config = VerifyConfig {
            at_end_of_file: false,
            ..VerifyConfig::default()
        };
        let options = VerifyOptions::from(&config);
        let placements: Vec<_> = options.placements.iter().collect();
        assert_eq!(
            placements,
            vec![Placement::AtPosition, Placement::InFrontOfComment]
        );
        assert!(options.placements.partially_written);
    }

    #[test]
    fn display() {
        let config = VerificationConfig {
            source_kind: SourceKind::Script,
            hide_advanced_members: true,
            ..VerificationConfig::default()
        };
        assert_eq!(
            config.to_string(),
            "script source, invoked explicitly, advanced members hidden"
        );
    }
}
