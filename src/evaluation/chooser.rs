//! Choosing the single check to execute for a rule.
//!
//! A benchmark consumer must pick at most one check or complex-check per
//! rule. Complex-checks always win; otherwise the profile's refine-rule
//! selector filters the simple checks, falling back to selector-less
//! checks when the refined selector matches nothing, and the last
//! candidate backed by a registered engine is taken.

use crate::engines::EngineRegistry;
use crate::types::check::Check;
use crate::types::item::Rule;
use crate::types::profile::Profile;

pub fn applicable_check<'a>(
    rule: &'a Rule,
    profile: Option<&Profile>,
    engines: &EngineRegistry,
) -> Option<&'a Check> {
    // A rule with a complex-check must have it processed and every plain
    // check ignored.
    if let Some(complex) = rule.complex_checks.first() {
        return Some(complex);
    }

    let selector = profile
        .and_then(|p| p.refine_rule(&rule.id))
        .and_then(|r| r.selector.as_deref());

    let mut candidates: Vec<&Check> = rule
        .checks
        .iter()
        .filter(|c| c.selector.as_deref() == selector)
        .collect();
    if selector.is_some() && candidates.is_empty() {
        // A refined selector that matches nothing falls back to the
        // checks carrying no selector at all.
        candidates = rule.checks.iter().filter(|c| c.selector.is_none()).collect();
    }

    let mut chosen = None;
    for check in candidates {
        if engines.is_registered(&check.system) {
            chosen = Some(check);
        }
    }
    chosen
}
