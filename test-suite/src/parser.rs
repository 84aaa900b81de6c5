use std::collections::BTreeMap;
use std::path::PathBuf;

use caret::recorded::Rule;
use caret::{Expectation, Language};
use caret_config::VerifyConfig;
use serde::Deserialize;

/// Source declaring the item of an editor-browsable check.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowsableData {
    /// Code declaring `item`, seen from the case markup through each reference kind.
    pub referenced: String,
    pub item: String,
    pub same_solution: usize,
    pub metadata_reference: usize,
    /// Language of `referenced`; the case language when unset.
    #[serde(default)]
    pub referenced_language: Option<Language>,
    #[serde(default)]
    pub hide_advanced_members: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkedData {
    pub item: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommitData {
    /// Display text plus suffix of the committed item.
    pub item: String,
    /// Document after the commit, with an optional `$$` for the caret.
    pub expected: String,
    #[serde(default, rename = "char")]
    pub commit_char: Option<char>,
}

/// One test case: a fixture, recorded answers and what to verify.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaseData {
    pub language: Option<Language>,
    pub markup: Option<String>,
    /// Overrides the `[verify]` table of `Caret.toml`.
    pub verify: Option<VerifyConfig>,
    pub expect: Vec<Expectation>,
    pub no_items: bool,
    pub any_item: bool,
    pub browsable: Option<BrowsableData>,
    pub linked: Option<LinkedData>,
    pub commit: Vec<CommitData>,
    #[serde(rename = "rule")]
    pub rules: Vec<Rule>,
    /// The case passes only if every scenario fails with this error kind.
    pub fails_with: Option<String>,
    pub unimplemented: Option<String>,
}

impl CaseData {
    /// True when the case has nothing to verify.
    pub fn is_empty(&self) -> bool {
        self.expect.is_empty()
            && !self.no_items
            && !self.any_item
            && self.browsable.is_none()
            && self.linked.is_none()
            && self.commit.is_empty()
    }

    /// Fill unset settings from the top-level case of the file.
    fn inherit(&self, parent: &CaseData) -> CaseData {
        let mut case = self.clone();
        if case.language.is_none() {
            case.language = parent.language;
        }
        if case.markup.is_none() {
            case.markup.clone_from(&parent.markup);
        }
        if case.verify.is_none() {
            case.verify.clone_from(&parent.verify);
        }
        if case.rules.is_empty() {
            case.rules.clone_from(&parent.rules);
        }
        case
    }
}

/// A file containing one or more test cases
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaseFile {
    #[serde(flatten)]
    pub default_case: CaseData,
    #[serde(default)]
    pub cases: BTreeMap<String, CaseData>,
}

impl CaseFile {
    /// Returns all cases (default + named).
    /// Each item is (name, case_data) where name is "" for the default case.
    /// Named cases inherit language, markup, verify settings and rules they
    /// leave unset. A file without named cases always yields its default
    /// case, so a file that checks nothing is still reported.
    pub fn all_cases(&self) -> impl Iterator<Item = (&str, CaseData)> {
        let default_iter = self
            .has_default_case()
            .then(|| ("", self.default_case.clone()));
        let named_iter = self
            .cases
            .iter()
            .map(|(name, case)| (name.as_str(), case.inherit(&self.default_case)));
        default_iter.into_iter().chain(named_iter)
    }

    pub fn case_count(&self) -> usize {
        usize::from(self.has_default_case()) + self.cases.len()
    }

    fn has_default_case(&self) -> bool {
        !self.default_case.is_empty() || self.cases.is_empty()
    }
}

pub struct ParseResult {
    pub path: PathBuf,
    pub case_file: CaseFile,
    pub input: String,
}

pub fn parse_case_file(input: &str) -> Result<CaseFile, toml::de::Error> {
    toml::from_str(input)
}

#[cfg(test)]
mod tests {
    use caret::{FilterTag, Glyph, ItemMatcher};
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn default_case_with_expectations() {
        let file = parse_case_file(
            r#"
markup = "class C { $$ }"
expect = [
    { kind = "exists", item = "Colors", glyph = "enum", matching_filters = ["enum"] },
    { kind = "absent", item = "Red" },
]

[[rule]]
when = { after = "{" }
items = [{ display_text = "Colors" }]
"#,
        )
        .unwrap();
        let cases: Vec<_> = file.all_cases().collect();
        assert_eq!(cases.len(), 1);
        let (name, case) = &cases[0];
        assert_eq!(*name, "");
        assert_eq!(
            case.expect,
            vec![
                Expectation::Exists(
                    ItemMatcher::new("Colors")
                        .glyph(Glyph::Enum)
                        .filters([FilterTag::Enum])
                ),
                Expectation::absent("Red"),
            ]
        );
        assert_eq!(case.rules.len(), 1);
    }

    #[test]
    fn named_cases_inherit_from_default() {
        let file = parse_case_file(
            r#"
language = "Visual Basic"
markup = "Dim x = $$"

[[rule]]
items = [{ display_text = "Foo" }]

[cases.offered]
any_item = true

[cases.nothing]
markup = "' $$"
no_items = true
"#,
        )
        .unwrap();
        assert!(file.default_case.is_empty());
        assert_eq!(file.case_count(), 2);

        let cases: BTreeMap<_, _> = file.all_cases().collect();
        let offered = &cases["offered"];
        assert_eq!(offered.language, Some(Language::VisualBasic));
        assert_eq!(offered.markup.as_deref(), Some("Dim x = $$"));
        assert_eq!(offered.rules.len(), 1);

        let nothing = &cases["nothing"];
        assert_eq!(nothing.markup.as_deref(), Some("' $$"));
        assert_eq!(nothing.rules.len(), 1);
    }

    #[test]
    fn commit_and_browsable_tables() {
        let file = parse_case_file(
            r#"
markup = "class C { void M() { $$ } }"

[[commit]]
item = "Foo"
expected = "class C { void M() { Foo($$ } }"
char = "("

[browsable]
referenced = "public class Foo { }"
item = "Foo"
same_solution = 1
metadata_reference = 0
"#,
        )
        .unwrap();
        let case = &file.default_case;
        assert_eq!(
            case.commit,
            vec![CommitData {
                item: "Foo".into(),
                expected: "class C { void M() { Foo($$ } }".into(),
                commit_char: Some('('),
            }]
        );
        let browsable = case.browsable.as_ref().unwrap();
        assert_eq!(browsable.metadata_reference, 0);
        assert_eq!(browsable.referenced_language, None);
    }

    #[test]
    fn file_without_named_cases_keeps_its_default_case() {
        let file = parse_case_file(
            r#"
markup = "class C { $$ }"
expct = [{ kind = "exists", item = "Missing" }]
"#,
        )
        .unwrap();
        assert!(file.default_case.is_empty());
        assert_eq!(file.case_count(), 1);
        assert_eq!(file.all_cases().count(), 1);
    }

    #[test]
    fn misspelled_matcher_attribute_is_rejected() {
        let err = parse_case_file(
            r#"expect = [{ kind = "exists", item = "M", glpyh = "property" }]"#,
        )
        .unwrap_err();
        assert!(err.message().contains("glpyh"), "{err}");
    }

    #[test]
    fn misspelled_item_attribute_is_rejected() {
        let err = parse_case_file(
            r#"
[[rule]]
items = [{ display_text = "M", glpyh = "method" }]
"#,
        )
        .unwrap_err();
        assert!(err.message().contains("glpyh"), "{err}");
    }

    #[test]
    fn unknown_expectation_kind_is_rejected() {
        let err = parse_case_file(r#"expect = [{ kind = "maybe", item = "x" }]"#);
        assert!(err.is_err());
    }
}
