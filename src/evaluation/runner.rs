//! Per-rule evaluation driver.
//!
//! For every rule the pipeline is: start hook, selection, applicability,
//! check choice, evaluation, rule-result emission, output hook. Each
//! emitted rule result fires the output hook exactly once; any hook
//! returning non-zero unwinds the policy evaluation. Multi-check rules fan
//! out into one rule result per definition name the engine reports.

use super::chooser;
use super::evaluator::CheckEvaluator;
use crate::algebra;
use crate::applicability::cpe::{CpeDict, CpeLangModel};
use crate::applicability::session::{CheckContentLoader, SessionCache};
use crate::applicability::ApplicabilityChecker;
use crate::engines::{CheckRequest, EngineRegistry, OutputHook, StartHook};
use crate::resolution::bindings::build_value_bindings;
use crate::resolution::selection::SelectionMap;
use crate::types::check::{Check, CheckContentRef};
use crate::types::common::ResultKind;
use crate::types::item::{Benchmark, ItemId, Rule};
use crate::types::profile::Profile;
use crate::types::result::{RuleMessage, RuleResult, TestResult};
use tracing::{debug, warn};

/// A hook asked the evaluation to stop. Code -1 is fatal: the partial test
/// result is discarded instead of returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupt(pub i32);

impl Interrupt {
    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_fatal(self) -> bool {
        self.0 == -1
    }
}

/// Everything one policy evaluation borrows from the model.
pub struct EvaluationContext<'a> {
    pub benchmark: &'a Benchmark,
    pub profile: Option<&'a Profile>,
    pub selection: &'a SelectionMap,
    pub engines: &'a mut EngineRegistry,
    pub start_hooks: &'a mut [StartHook],
    pub output_hooks: &'a mut [OutputHook],
    pub cpe_dicts: &'a [CpeDict],
    pub cpe_lang_models: &'a [CpeLangModel],
    pub cpe_loader: Option<&'a dyn CheckContentLoader>,
    pub cpe_sessions: &'a mut SessionCache,
}

impl<'a> EvaluationContext<'a> {
    /// Run one rule to a terminal state, appending its result(s) to the
    /// test result.
    pub fn evaluate_rule(
        &mut self,
        rule_item: ItemId,
        rule: &Rule,
        test_result: &mut TestResult,
    ) -> Result<(), Interrupt> {
        debug!(rule = %rule.id, "evaluating rule");
        self.fire_start_hooks(rule)?;

        if !self.selection.is_selected(&rule.id) {
            return self.emit(test_result, rule, ResultKind::NotSelected, None, None);
        }

        if !self.is_applicable(rule_item) {
            return self.emit(test_result, rule, ResultKind::NotApplicable, None, None);
        }

        let Some(original) = chooser::applicable_check(rule, self.profile, self.engines) else {
            return self.emit(
                test_result,
                rule,
                ResultKind::NotChecked,
                None,
                Some("No candidate or applicable check found.".to_string()),
            );
        };
        // The chosen check is immutable benchmark content; everything from
        // here on happens on a clone owned by the emitted rule result.
        let mut check = original.clone();

        if check.is_complex() {
            let (result, message) =
                CheckEvaluator::new(self.benchmark, self.profile, self.engines, Some(&rule.id))
                    .evaluate(&mut check);
            return self.emit(test_result, rule, result, Some(check), message);
        }

        // A single simple check under a rule is evaluated right here rather
        // than through the generic evaluator: whether it fans out under
        // multi-check is not predictable before the engine is queried.
        let bindings = match build_value_bindings(self.benchmark, self.profile, &check.exports) {
            Ok(bindings) => bindings,
            Err(err) => {
                let message = err.to_string();
                return self.emit(
                    test_result,
                    rule,
                    ResultKind::Unknown,
                    Some(check),
                    Some(message),
                );
            }
        };

        let refs: Vec<CheckContentRef> = check.content_refs().to_vec();
        let mut result = ResultKind::NotChecked;
        let mut message: Option<String> = None;
        for content in &refs {
            message = None;

            if content.name.is_none() && check.multicheck {
                if let Some(names) = self.engines.names_for_href(&check.system, &content.href) {
                    return self.evaluate_multicheck(test_result, rule, &check, content, &names);
                }
                message = Some(
                    "Checking engine does not support multi-check; falling back to multi-check='false'"
                        .to_string(),
                );
            }

            let request = CheckRequest {
                rule_id: Some(&rule.id),
                content_name: content.name.as_deref(),
                href: Some(&content.href),
                bindings: &bindings,
            };
            result = match self
                .engines
                .dispatch(&check.system, &request, &mut check.imports)
            {
                Ok(result) => result,
                Err(err) => {
                    warn!(%err, "check left unresolved");
                    ResultKind::NotChecked
                }
            };
            if result != ResultKind::NotChecked {
                check.pin_content_ref(content, None);
                break;
            }
        }
        if result == ResultKind::NotChecked {
            message = Some("None of the check-content-ref elements was resolvable.".to_string());
        }
        if check.negate {
            result = algebra::negate(result);
        }
        self.emit(test_result, rule, result, Some(check), message)
    }

    /// One rule result per definition name, with the start hook re-fired
    /// between consecutive names so per-name progress is observable.
    fn evaluate_multicheck(
        &mut self,
        test_result: &mut TestResult,
        rule: &Rule,
        check: &Check,
        content: &CheckContentRef,
        names: &[String],
    ) -> Result<(), Interrupt> {
        if names.is_empty() {
            return self.emit(
                test_result,
                rule,
                ResultKind::Unknown,
                Some(check.clone()),
                Some("No definitions found for @multi-check.".to_string()),
            );
        }

        let mut names = names.iter().peekable();
        while let Some(name) = names.next() {
            let mut cloned = check.clone();
            cloned.pin_content_ref(content, Some(name));
            let (result, message) =
                CheckEvaluator::new(self.benchmark, self.profile, self.engines, Some(&rule.id))
                    .evaluate(&mut cloned);
            self.emit(test_result, rule, result, Some(cloned), message)?;
            if names.peek().is_some() {
                self.fire_start_hooks(rule)?;
            }
        }
        Ok(())
    }

    fn is_applicable(&mut self, item: ItemId) -> bool {
        ApplicabilityChecker::new(
            self.benchmark,
            self.cpe_dicts,
            self.cpe_lang_models,
            self.cpe_loader,
            self.cpe_sessions,
        )
        .item_is_applicable(item)
    }

    fn fire_start_hooks(&mut self, rule: &Rule) -> Result<(), Interrupt> {
        for hook in self.start_hooks.iter_mut() {
            let code = hook(rule);
            if code != 0 {
                return Err(Interrupt(code));
            }
        }
        Ok(())
    }

    /// Build the rule result, fire the output hooks and record it. Refine
    /// rule weight/severity/role overrides apply here, since the benchmark
    /// rule itself is never rewritten.
    fn emit(
        &mut self,
        test_result: &mut TestResult,
        rule: &Rule,
        result: ResultKind,
        check: Option<Check>,
        message: Option<String>,
    ) -> Result<(), Interrupt> {
        let mut rule_result = RuleResult::from_rule(rule, result);
        if let Some(refine) = self.profile.and_then(|p| p.refine_rule(&rule.id)) {
            if let Some(weight) = refine.weight {
                rule_result.weight = weight;
            }
            if let Some(severity) = refine.severity {
                rule_result.severity = severity;
            }
            if let Some(role) = refine.role {
                rule_result.role = role;
            }
        }
        rule_result.check = check;
        if let Some(message) = message {
            rule_result.messages.push(RuleMessage::info(message));
        }

        let mut abort = 0;
        for hook in self.output_hooks.iter_mut() {
            let code = hook(&rule_result);
            if code != 0 {
                abort = code;
                break;
            }
        }
        // An aborting hook stops the evaluation but the result it was
        // handed still stands.
        test_result.add_rule_result(rule_result);
        if abort != 0 {
            Err(Interrupt(abort))
        } else {
            Ok(())
        }
    }
}
