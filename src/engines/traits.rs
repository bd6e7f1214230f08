//! Engine and reporting callback contracts.

use crate::resolution::bindings::ValueBinding;
use crate::types::check::CheckImport;
use crate::types::common::ResultKind;
use crate::types::item::Rule;
use crate::types::result::RuleResult;

/// Reserved system URI identifying per-rule start callbacks.
pub const START_CALLBACK_URN: &str = "urn:xccdf:system:callback:start";

/// Reserved system URI identifying per-result output callbacks.
pub const OUTPUT_CALLBACK_URN: &str = "urn:xccdf:system:callback:output";

/// One dispatch to a checking engine.
#[derive(Debug)]
pub struct CheckRequest<'a> {
    /// Id of the rule being evaluated, when dispatched from rule level.
    pub rule_id: Option<&'a str>,
    /// Definition name inside the content, when the content-ref carries one.
    pub content_name: Option<&'a str>,
    /// Location of the check content.
    pub href: Option<&'a str>,
    /// Resolved value bindings exported to the engine.
    pub bindings: &'a [ValueBinding],
}

/// A checking engine bound to one system URI.
///
/// Engines do the blocking work (content loading, actual assertions); the
/// policy layer holds no locks across these calls.
pub trait CheckEngine {
    /// Evaluate one content reference. Returning [`ResultKind::NotChecked`]
    /// means "not mine, try the next registered engine"; any other value is
    /// final for this content-ref. The engine may record its outputs into
    /// `imports`.
    fn evaluate(&mut self, request: &CheckRequest<'_>, imports: &mut [CheckImport]) -> ResultKind;

    /// Definition names available inside the referenced content, used for
    /// multi-check expansion. `None` means the engine cannot answer.
    fn names_for_href(&mut self, _href: &str) -> Option<Vec<String>> {
        None
    }
}

/// Fired before each rule evaluation (and again between multi-check
/// targets). A non-zero return aborts the policy evaluation; -1 is fatal.
pub type StartHook = Box<dyn FnMut(&Rule) -> i32>;

/// Fired once per emitted rule result. Same return convention as
/// [`StartHook`].
pub type OutputHook = Box<dyn FnMut(&RuleResult) -> i32>;
