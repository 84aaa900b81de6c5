//! The expectation verifier.
//!
//! Every verification parses the markup into a [`Fixture`], then for each
//! caret, configuration and placement queries the service once and checks
//! the answer. Work is sequential and nothing is cached between calls.

use caret_fixture::{DocumentId, Fixture, Language, Workspace};
use lsp_types::Position;
use tracing::{debug, trace};

use crate::config::{Placement, Placements, VerificationConfig, VerifyOptions};
use crate::error::{MissingReason, QueryContext, VerificationError};
use crate::expectation::{Expectation, ItemMatcher};
use crate::item::{CompletionItem, CompletionList};
use crate::service::{CompletionRequest, CompletionService};

/// Checks a [`CompletionService`] against expectations.
pub struct Verifier<'s, S: ?Sized> {
    service: &'s S,
}

/// The fixture text as seen from one placement of one caret.
pub(crate) struct Variant {
    pub placement: Placement,
    pub typed: Option<char>,
    pub workspace: Workspace,
    pub offset: usize,
    /// Line and character of `offset`.
    pub position: Position,
}

impl Variant {
    /// The fixture as written.
    pub(crate) fn at_position(fixture: &Fixture, offset: usize) -> Self {
        Self {
            placement: Placement::AtPosition,
            typed: None,
            workspace: fixture.workspace().clone(),
            offset,
            position: caret_markup::position_at(fixture.text(), offset),
        }
    }

    /// `None` when the language has no way to express `placement`.
    pub(crate) fn new(fixture: &Fixture, offset: usize, placement: Placement) -> Option<Self> {
        let text = fixture.text();
        let text = match placement {
            Placement::AtPosition => return Some(Self::at_position(fixture, offset)),
            Placement::InFrontOfComment => {
                let comment = fixture.language().inline_comment()?;
                format!("{}{comment}{}", &text[..offset], &text[offset..])
            }
            Placement::AtEndOfFile => text[..offset].to_string(),
        };
        Some(Self {
            placement,
            typed: None,
            workspace: fixture
                .workspace()
                .with_document_text(fixture.active_document(), text),
            offset,
            position: caret_markup::position_at(fixture.text(), offset),
        })
    }

    /// This variant with `typed` inserted at the caret and the caret after it.
    pub(crate) fn with_typed(&self, document: DocumentId, typed: char) -> Self {
        let text = self.workspace.document_text(document);
        let mut next = String::with_capacity(text.len() + typed.len_utf8());
        next.push_str(&text[..self.offset]);
        next.push(typed);
        next.push_str(&text[self.offset..]);
        let offset = self.offset + typed.len_utf8();
        Self {
            placement: self.placement,
            typed: Some(typed),
            position: caret_markup::position_at(&next, offset),
            workspace: self.workspace.with_document_text(document, next),
            offset,
        }
    }

    pub(crate) fn context(&self, caret: usize, config: VerificationConfig) -> QueryContext {
        QueryContext {
            caret,
            offset: self.offset,
            position: self.position,
            config,
            placement: self.placement,
            typed: self.typed,
        }
    }
}

impl<'s, S: CompletionService + ?Sized> Verifier<'s, S> {
    pub fn new(service: &'s S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &'s S {
        self.service
    }

    /// Fail with [`VerificationError::MissingExpectedItem`] unless exactly one
    /// offered item matches `matcher` in every configuration and placement.
    pub fn verify_exists(
        &self,
        markup: &str,
        matcher: ItemMatcher,
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        self.verify_expected_items(markup, &[Expectation::Exists(matcher)], options)
    }

    /// Fail with [`VerificationError::UnexpectedItemPresent`] if an offered
    /// item matches `matcher` in any configuration and placement.
    pub fn verify_absent(
        &self,
        markup: &str,
        matcher: ItemMatcher,
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        self.verify_expected_items(markup, &[Expectation::Absent(matcher)], options)
    }

    /// Check a batch of expectations against one fixture, stopping at the
    /// first violation.
    pub fn verify_expected_items(
        &self,
        markup: &str,
        expectations: &[Expectation],
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        let fixture = Fixture::parse(markup, options.language)?;
        self.verify_fixture(&fixture, expectations, options)
    }

    pub(crate) fn verify_fixture(
        &self,
        fixture: &Fixture,
        expectations: &[Expectation],
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        self.for_each_query(fixture, options, |request, context, list| {
            let items = list.map_or(&[][..], |l| &l.items[..]);
            for expectation in expectations {
                self.check(expectation, items, request, context)?;
            }
            Ok(())
        })?;

        if options.placements.partially_written {
            self.verify_partially_written(fixture, expectations, options)?;
        }
        Ok(())
    }

    /// Fail with [`VerificationError::UnexpectedItems`] if anything is offered.
    pub fn verify_no_items_exist(
        &self,
        markup: &str,
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        let fixture = Fixture::parse(markup, options.language)?;
        self.for_each_query(&fixture, options, |_, context, list| match list {
            Some(list) if !list.is_empty() => Err(VerificationError::UnexpectedItems {
                items: list.items.iter().map(CompletionItem::label).collect(),
                context: context.clone(),
            }),
            _ => Ok(()),
        })
    }

    /// Fail with [`VerificationError::NoItems`] if nothing is offered.
    pub fn verify_any_item_exists(
        &self,
        markup: &str,
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        let fixture = Fixture::parse(markup, options.language)?;
        self.for_each_query(&fixture, options, |_, context, list| match list {
            Some(list) if !list.is_empty() => Ok(()),
            _ => Err(VerificationError::NoItems {
                context: context.clone(),
            }),
        })
    }

    /// Check that `item` is offered in the active document of a workspace
    /// with linked files, carrying `expected_description`.
    pub fn verify_item_in_linked_files(
        &self,
        markup: &str,
        item: &str,
        expected_description: Option<&str>,
    ) -> Result<(), VerificationError> {
        let fixture = Fixture::parse(markup, Language::default())?;
        let linked = fixture
            .workspace()
            .linked_documents(fixture.active_document());
        trace!(linked = linked.len(), "verifying item in linked files");

        let mut matcher = ItemMatcher::new(item);
        if let Some(description) = expected_description {
            matcher = matcher.description(description);
        }
        let options = VerifyOptions::default().with_placements(Placements::at_position_only());
        self.verify_fixture(&fixture, &[Expectation::Exists(matcher)], &options)
    }

    /// Run `check` on the answer of every caret, configuration and placement.
    fn for_each_query<F>(
        &self,
        fixture: &Fixture,
        options: &VerifyOptions,
        mut check: F,
    ) -> Result<(), VerificationError>
    where
        F: FnMut(
            &CompletionRequest<'_>,
            &QueryContext,
            Option<&CompletionList>,
        ) -> Result<(), VerificationError>,
    {
        let configs = options.configurations();
        for (caret, &offset) in fixture.carets().iter().enumerate() {
            for placement in options.placements.iter() {
                let Some(variant) = Variant::new(fixture, offset, placement) else {
                    debug!(%placement, language = %fixture.language(), "placement not available, skipping");
                    continue;
                };
                for &config in &configs {
                    let context = variant.context(caret, config);
                    let (request, list) = self.query(fixture.active_document(), &variant, config, &context)?;
                    check(&request, &context, list.as_ref())?;
                }
            }
        }
        Ok(())
    }

    /// The same checks with each expected item's leading character typed.
    fn verify_partially_written(
        &self,
        fixture: &Fixture,
        expectations: &[Expectation],
        options: &VerifyOptions,
    ) -> Result<(), VerificationError> {
        let configs = options.configurations();
        let document = fixture.active_document();
        for expectation in expectations {
            let Expectation::Exists(matcher) = expectation else {
                continue;
            };
            let Some(typed) = matcher.leading_character() else {
                continue;
            };
            for (caret, &offset) in fixture.carets().iter().enumerate() {
                for placement in options.placements.iter() {
                    let Some(variant) = Variant::new(fixture, offset, placement) else {
                        continue;
                    };
                    let variant = variant.with_typed(document, typed);
                    for &config in &configs {
                        let context = variant.context(caret, config);
                        let (request, list) = self.query(document, &variant, config, &context)?;
                        let items = list.as_ref().map_or(&[][..], |l| &l.items[..]);
                        self.check(expectation, items, &request, &context)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub(crate) fn query<'v>(
        &self,
        document: DocumentId,
        variant: &'v Variant,
        config: VerificationConfig,
        context: &QueryContext,
    ) -> Result<(CompletionRequest<'v>, Option<CompletionList>), VerificationError> {
        let text = variant.workspace.document_text(document);
        let trigger = config.trigger(text, variant.offset)?;
        let request = CompletionRequest {
            workspace: &variant.workspace,
            document,
            offset: variant.offset,
            trigger,
            config,
        };
        debug!(%context, ?trigger, "querying completions");
        let list = self
            .service
            .completions(&request)
            .map_err(|source| VerificationError::Service {
                context: context.clone(),
                source,
            })?;
        trace!(
            items = list.as_ref().map_or(0, |l| l.items.len()),
            "service answered"
        );
        Ok((request, list))
    }

    fn check(
        &self,
        expectation: &Expectation,
        items: &[CompletionItem],
        request: &CompletionRequest<'_>,
        context: &QueryContext,
    ) -> Result<(), VerificationError> {
        let matcher = expectation.matcher();
        let candidates: Vec<&CompletionItem> = items
            .iter()
            .filter(|item| matcher.identity_matches(item))
            .collect();

        match expectation {
            Expectation::Exists(_) => match candidates.as_slice() {
                [] => Err(VerificationError::MissingExpectedItem {
                    item: matcher.to_string(),
                    context: context.clone(),
                    reason: MissingReason::NotOffered {
                        offered: items.iter().map(CompletionItem::label).collect(),
                    },
                }),
                [item] => {
                    let mismatches =
                        matcher.mismatches(item, self.description(matcher, item, request, context)?.as_deref());
                    if mismatches.is_empty() {
                        Ok(())
                    } else {
                        Err(VerificationError::MissingExpectedItem {
                            item: matcher.to_string(),
                            context: context.clone(),
                            reason: MissingReason::AttributeMismatch { mismatches },
                        })
                    }
                }
                many => Err(VerificationError::AmbiguousItem {
                    item: matcher.to_string(),
                    count: many.len(),
                    context: context.clone(),
                }),
            },
            Expectation::Absent(_) => {
                for item in candidates {
                    let description = self.description(matcher, item, request, context)?;
                    if matcher.mismatches(item, description.as_deref()).is_empty() {
                        return Err(VerificationError::UnexpectedItemPresent {
                            item: matcher.to_string(),
                            context: context.clone(),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    fn description(
        &self,
        matcher: &ItemMatcher,
        item: &CompletionItem,
        request: &CompletionRequest<'_>,
        context: &QueryContext,
    ) -> Result<Option<String>, VerificationError> {
        if !matcher.expects_description() {
            return Ok(None);
        }
        self.service
            .description(request, item)
            .map_err(|source| VerificationError::Service {
                context: context.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use caret_markup::TextSpan;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::CompletionTrigger;
    use crate::item::Glyph;
    use crate::service::{ServiceError, service_fn};

    const COLORS: &str = "class C { void M() { Colors c = $$ } }";

    fn offering(
        items: &'static [&'static str],
    ) -> impl Fn(&CompletionRequest<'_>) -> Result<Option<CompletionList>, ServiceError> {
        service_fn(move |request| {
            Ok(Some(CompletionList::new(
                items.iter().copied().map(CompletionItem::new).collect(),
                TextSpan::empty(request.offset),
            )))
        })
    }

    #[test]
    fn exists_and_absent() {
        let service = offering(&["Colors", "Red"]);
        let verifier = Verifier::new(&service);
        let options = VerifyOptions::default();

        verifier
            .verify_exists(COLORS, ItemMatcher::new("Colors"), &options)
            .unwrap();
        verifier
            .verify_absent(COLORS, ItemMatcher::new("Green"), &options)
            .unwrap();

        let err = verifier
            .verify_exists(COLORS, ItemMatcher::new("Green"), &options)
            .unwrap_err();
        match err {
            VerificationError::MissingExpectedItem { item, context, reason } => {
                assert_eq!(item, "`Green`");
                assert_eq!(context.placement, Placement::AtPosition);
                assert_eq!(
                    reason,
                    MissingReason::NotOffered {
                        offered: vec!["Colors".into(), "Red".into()]
                    }
                );
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = verifier
            .verify_absent(COLORS, ItemMatcher::new("Red"), &options)
            .unwrap_err();
        assert!(matches!(err, VerificationError::UnexpectedItemPresent { .. }));
    }

    #[test]
    fn absent_only_fails_when_specified_attributes_match() {
        let service = service_fn(|request| {
            Ok(Some(CompletionList::new(
                vec![CompletionItem::new("Red").with_glyph(Glyph::EnumMember)],
                TextSpan::empty(request.offset),
            )))
        });
        let verifier = Verifier::new(&service);
        verifier
            .verify_absent(
                COLORS,
                ItemMatcher::new("Red").glyph(Glyph::Field),
                &VerifyOptions::default(),
            )
            .unwrap();
    }

    #[test]
    fn duplicate_identity_is_ambiguous() {
        let service = offering(&["Red", "Red"]);
        let err = Verifier::new(&service)
            .verify_exists(COLORS, ItemMatcher::new("Red"), &VerifyOptions::default())
            .unwrap_err();
        assert!(matches!(err, VerificationError::AmbiguousItem { count: 2, .. }));
    }

    #[test]
    fn every_placement_is_queried() {
        let seen = RefCell::new(Vec::new());
        let service = service_fn(|request| {
            seen.borrow_mut().push(request.text().to_string());
            Ok(Some(CompletionList::new(
                vec![CompletionItem::new("Colors")],
                TextSpan::empty(request.offset),
            )))
        });
        Verifier::new(&service)
            .verify_exists("x = $$;", ItemMatcher::new("Colors"), &VerifyOptions::default())
            .unwrap();
        assert_eq!(
            seen.into_inner(),
            vec![
                "x = ;",
                "x = /**/;",
                "x = ",
                "x = C;",
                "x = C/**/;",
                "x = C",
            ]
        );
    }

    #[test]
    fn visual_basic_has_no_comment_placement() {
        let count = RefCell::new(0);
        let service = service_fn(|request| {
            *count.borrow_mut() += 1;
            Ok(Some(CompletionList::new(Vec::new(), TextSpan::empty(request.offset))))
        });
        let options = VerifyOptions::default().with_language(Language::VisualBasic);
        Verifier::new(&service)
            .verify_no_items_exist("Dim x = $$", &options)
            .unwrap();
        assert_eq!(count.into_inner(), 2);
    }

    #[test]
    fn typed_trigger_sends_previous_character() {
        let triggers = RefCell::new(Vec::new());
        let service = service_fn(|request| {
            triggers.borrow_mut().push(request.trigger);
            Ok(None)
        });
        let options = VerifyOptions::default()
            .both_trigger_modes(true)
            .with_placements(Placements::at_position_only());
        Verifier::new(&service)
            .verify_no_items_exist("Colors.$$", &options)
            .unwrap();
        assert_eq!(
            *triggers.borrow(),
            vec![CompletionTrigger::Invoke, CompletionTrigger::Insertion('.')]
        );

        let err = Verifier::new(&service)
            .verify_no_items_exist("$$Colors", &options)
            .unwrap_err();
        assert!(matches!(err, VerificationError::MalformedFixture(_)));
    }

    #[test]
    fn no_items_and_any_item() {
        let empty = service_fn(|_| Ok(None));
        let full = offering(&["Red"]);
        let options = VerifyOptions::default();

        Verifier::new(&empty).verify_no_items_exist(COLORS, &options).unwrap();
        Verifier::new(&full).verify_any_item_exists(COLORS, &options).unwrap();

        let err = Verifier::new(&empty)
            .verify_any_item_exists(COLORS, &options)
            .unwrap_err();
        assert!(matches!(err, VerificationError::NoItems { .. }));

        let err = Verifier::new(&full)
            .verify_no_items_exist(COLORS, &options)
            .unwrap_err();
        match err {
            VerificationError::UnexpectedItems { items, .. } => assert_eq!(items, vec!["Red"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn each_caret_is_a_sub_case() {
        let offsets = RefCell::new(Vec::new());
        let service = service_fn(|request| {
            offsets.borrow_mut().push(request.offset);
            Ok(None)
        });
        let options = VerifyOptions::default().with_placements(Placements::at_position_only());
        Verifier::new(&service)
            .verify_no_items_exist("a$$b$$c", &options)
            .unwrap();
        assert_eq!(offsets.into_inner(), vec![1, 2]);
    }

    #[test]
    fn context_reports_line_and_column() {
        let failing = service_fn(|_| Err(ServiceError::new("engine crashed")));
        let options = VerifyOptions::default().with_placements(Placements::at_position_only());
        let err = Verifier::new(&failing)
            .verify_no_items_exist("class C\n{\n    void M() { $$ }\n}", &options)
            .unwrap_err();
        assert!(err.to_string().contains("(caret #0 at 3:16, "), "{err}");
    }

    #[test]
    fn service_failure_is_reported_with_context() {
        let failing = service_fn(|_| Err(ServiceError::new("engine crashed")));
        let err = Verifier::new(&failing)
            .verify_any_item_exists(COLORS, &VerifyOptions::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "completion service failed (caret #0 at 1:33, regular source, invoked explicitly, at position): engine crashed"
        );
    }

    #[test]
    fn linked_files_check_description() {
        let service = service_fn(|request| {
            Ok(Some(CompletionList::new(
                vec![CompletionItem::new("Goo").with_description("void Goo()")],
                TextSpan::empty(request.offset),
            )))
        });
        let markup = r#"<Workspace>
    <Project Language="C#" AssemblyName="Proj1">
        <Document FilePath="C.cs">class C { void M() { $$ } }</Document>
    </Project>
    <Project Language="C#" AssemblyName="Proj2">
        <Document IsLinkFile="true" LinkAssemblyName="Proj1" LinkFilePath="C.cs"/>
    </Project>
</Workspace>"#;
        let verifier = Verifier::new(&service);
        verifier
            .verify_item_in_linked_files(markup, "Goo", Some("void Goo()"))
            .unwrap();
        let err = verifier
            .verify_item_in_linked_files(markup, "Goo", Some("void Goo(int)"))
            .unwrap_err();
        assert!(matches!(
            err,
            VerificationError::MissingExpectedItem {
                reason: MissingReason::AttributeMismatch { .. },
                ..
            }
        ));
    }
}
