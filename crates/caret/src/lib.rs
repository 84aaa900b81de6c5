//! Expectation verification for code-completion services.
//!
//! A test describes a source fixture with `$$` carets and what the
//! completion list at each caret should and should not contain. The
//! [`Verifier`] drives a [`CompletionService`] through every requested
//! configuration and caret placement and reports the first violated
//! expectation as a [`VerificationError`].
//!
//! ```
//! use caret::{
//!     CompletionItem, CompletionList, ItemMatcher, Placements, TextSpan, Verifier, VerifyOptions,
//!     service_fn,
//! };
//!
//! let service = service_fn(|request| {
//!     Ok(Some(CompletionList::new(
//!         vec![CompletionItem::new("MAX_SIZE")],
//!         TextSpan::empty(request.offset),
//!     )))
//! });
//! Verifier::new(&service)
//!     .verify_exists(
//!         "switch (i) { case $$ }",
//!         ItemMatcher::new("MAX_SIZE"),
//!         &VerifyOptions::default().with_placements(Placements::at_position_only()),
//!     )
//!     .unwrap();
//! ```

mod browsable;
mod commit;
pub mod config;
mod error;
mod expectation;
mod item;
pub mod recorded;
mod service;
mod verifier;

pub use browsable::BrowsableCase;
pub use caret_fixture::{Fixture, FixtureError, Language, ReferenceKind, Workspace};
pub use caret_markup::TextSpan;
pub use config::{
    CompletionTrigger, Placement, Placements, SourceKind, TriggerMode, VerificationConfig,
    VerifyOptions,
};
pub use error::{MissingReason, QueryContext, VerificationError, render_diff};
pub use expectation::{AttributeMismatch, Expectation, ExpectationKind, ItemMatcher};
pub use item::{CompletionChange, CompletionItem, CompletionList, FilterTag, Glyph, TextEdit};
pub use recorded::RecordedService;
pub use service::{CompletionRequest, CompletionService, ServiceError, service_fn};
pub use verifier::Verifier;
