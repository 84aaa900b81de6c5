use caret_fixture::{Fixture, FixtureError};
use caret_markup::MarkupError;
use tracing::debug;

use crate::config::VerifyOptions;
use crate::error::{MissingReason, VerificationError};
use crate::item::{CompletionItem, CompletionList};
use crate::service::{CompletionRequest, CompletionService, ServiceError};
use crate::verifier::{Variant, Verifier};

impl<'s, S: CompletionService + ?Sized> Verifier<'s, S> {
    /// Commit `item` (display text plus suffix) with `commit_char` and compare
    /// the document against `expected_after_commit`. When the expected markup
    /// carries a `$$`, the caret after the commit must sit there.
    ///
    /// The commit character is typed at the new caret unless it is a tab or a
    /// newline, or the service reports that its change already includes it.
    pub fn verify_provider_commit(
        &self,
        markup: &str,
        item: &str,
        expected_after_commit: &str,
        commit_char: Option<char>,
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        let fixture = Fixture::parse(markup, options.language)?;
        let document = fixture.active_document();
        let offset = fixture
            .markup()
            .single_caret()
            .map_err(|source| FixtureError::Markup {
                path: fixture.workspace().document(document).path.clone(),
                source,
            })?;
        let expected = caret_markup::parse(expected_after_commit).map_err(markup_error)?;
        let expected_caret = match expected.carets() {
            [] => None,
            [caret] => Some(*caret),
            carets => {
                return Err(markup_error(MarkupError::MultipleCarets {
                    count: carets.len(),
                })
                .into());
            }
        };

        let variant = Variant::at_position(&fixture, offset);
        for config in options.configurations() {
            let context = variant.context(0, config);
            let (request, list) = self.query(document, &variant, config, &context)?;
            let list = list.unwrap_or_default();
            let Some(found) = list
                .items
                .iter()
                .find(|candidate| candidate.display_text_with_suffix() == item)
            else {
                return Err(VerificationError::MissingExpectedItem {
                    item: format!("`{item}`"),
                    context,
                    reason: MissingReason::NotOffered {
                        offered: list.items.iter().map(CompletionItem::label).collect(),
                    },
                });
            };

            let (actual, caret) = self
                .commit(&request, &list, found, commit_char)
                .map_err(|source| VerificationError::Service {
                    context: context.clone(),
                    source,
                })?;
            debug!(%context, caret, "committed item");

            if actual != expected.text() {
                return Err(VerificationError::CommitMismatch {
                    item: item.to_string(),
                    context,
                    expected: expected.text().to_string(),
                    actual,
                });
            }
            if let Some(expected) = expected_caret
                && expected != caret
            {
                return Err(VerificationError::CaretMismatch {
                    item: item.to_string(),
                    context,
                    expected,
                    actual: caret,
                });
            }
        }
        Ok(())
    }

    /// Text and caret after committing `item`.
    fn commit(
        &self,
        request: &CompletionRequest<'_>,
        list: &CompletionList,
        item: &CompletionItem,
        commit_char: Option<char>,
    ) -> Result<(String, usize), ServiceError> {
        let change = self.service().change(request, list, item, commit_char)?;
        let mut text = change.edit.apply(request.text()).ok_or_else(|| {
            ServiceError::new(format!(
                "edit span {} is outside the document",
                change.edit.span
            ))
        })?;
        let mut caret = change.caret();
        if let Some(c) = commit_char
            && !matches!(c, '\t' | '\n')
            && !change.includes_commit_character
        {
            if !text.is_char_boundary(caret) {
                return Err(ServiceError::new(format!(
                    "caret {caret} is outside the committed text"
                )));
            }
            text.insert(caret, c);
            caret += c.len_utf8();
        }
        Ok((text, caret))
    }
}

fn markup_error(source: MarkupError) -> FixtureError {
    FixtureError::Markup {
        path: "expected text".to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use caret_markup::TextSpan;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::item::{CompletionChange, TextEdit};

    struct Methods;

    impl CompletionService for Methods {
        fn completions(
            &self,
            request: &CompletionRequest<'_>,
        ) -> Result<Option<CompletionList>, ServiceError> {
            let start = request.offset - 1;
            Ok(Some(CompletionList::new(
                vec![
                    CompletionItem::new("Goo").with_suffix("()"),
                    CompletionItem::new("Gel"),
                ],
                TextSpan::new(start, request.offset),
            )))
        }

        fn change(
            &self,
            _request: &CompletionRequest<'_>,
            list: &CompletionList,
            item: &CompletionItem,
            _commit_char: Option<char>,
        ) -> Result<CompletionChange, ServiceError> {
            let text = format!("{}()", item.display_text);
            let caret = list.span.start + text.len() - 1;
            Ok(CompletionChange {
                new_caret: Some(caret),
                ..CompletionChange::new(TextEdit::new(list.span, text))
            })
        }
    }

    const BEFORE: &str = "class C { void M() { G$$ } }";

    #[test]
    fn commit_applies_change_and_types_commit_character() {
        let verifier = Verifier::new(&Methods);
        let options = VerifyOptions::default();
        verifier
            .verify_provider_commit(BEFORE, "Goo()", "class C { void M() { Goo($$) } }", None, &options)
            .unwrap();
        verifier
            .verify_provider_commit(BEFORE, "Goo()", "class C { void M() { Goo(;) } }", Some(';'), &options)
            .unwrap();
        verifier
            .verify_provider_commit(BEFORE, "Goo()", "class C { void M() { Goo() } }", Some('\t'), &options)
            .unwrap();
    }

    #[test]
    fn commit_mismatch_and_caret_mismatch() {
        let verifier = Verifier::new(&Methods);
        let options = VerifyOptions::default();

        let err = verifier
            .verify_provider_commit(BEFORE, "Gel", "class C { void M() { Gel } }", None, &options)
            .unwrap_err();
        match err {
            VerificationError::CommitMismatch { expected, actual, .. } => {
                assert_eq!(expected, "class C { void M() { Gel } }");
                assert_eq!(actual, "class C { void M() { Gel() } }");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = verifier
            .verify_provider_commit(BEFORE, "Goo()", "class C { void M() { Goo()$$ } }", None, &options)
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::CaretMismatch { expected: 26, actual: 25, .. }
        ));
    }

    #[test]
    fn commit_of_missing_item() {
        let err = Verifier::new(&Methods)
            .verify_provider_commit(BEFORE, "Goo", "", None, &VerifyOptions::default())
            .unwrap_err();
        match err {
            VerificationError::MissingExpectedItem { item, reason, .. } => {
                assert_eq!(item, "`Goo`");
                assert_eq!(
                    reason,
                    MissingReason::NotOffered {
                        offered: vec!["Goo()".into(), "Gel".into()]
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_change_replaces_span_with_insertion_text() {
        let service = crate::service::service_fn(|request| {
            Ok(Some(CompletionList::new(
                vec![CompletionItem::new("MAX_SIZE")],
                TextSpan::new(request.offset - 2, request.offset),
            )))
        });
        let options = VerifyOptions::default();
        Verifier::new(&service)
            .verify_provider_commit(
                "switch (i) { case MA$$ }",
                "MAX_SIZE",
                "switch (i) { case MAX_SIZE:$$ }",
                Some(':'),
                &options,
            )
            .unwrap();
    }
}
