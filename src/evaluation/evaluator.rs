//! Check evaluation.
//!
//! Works on clones of benchmark checks: content-ref pinning and engine
//! imports land on the clone, the benchmark originals never change. A
//! simple check tries its content refs as alternatives in declaration
//! order; a complex check folds its children left-to-right through the
//! result algebra. Each check applies its own negate flag exactly once, at
//! its root.

use crate::algebra;
use crate::engines::{CheckRequest, EngineRegistry};
use crate::resolution::bindings::build_value_bindings;
use crate::types::check::{Check, CheckBody, CheckContentRef};
use crate::types::common::ResultKind;
use crate::types::item::Benchmark;
use crate::types::profile::Profile;
use tracing::{debug, warn};

pub struct CheckEvaluator<'a> {
    benchmark: &'a Benchmark,
    profile: Option<&'a Profile>,
    engines: &'a mut EngineRegistry,
    rule_id: Option<&'a str>,
}

impl<'a> CheckEvaluator<'a> {
    pub fn new(
        benchmark: &'a Benchmark,
        profile: Option<&'a Profile>,
        engines: &'a mut EngineRegistry,
        rule_id: Option<&'a str>,
    ) -> Self {
        CheckEvaluator {
            benchmark,
            profile,
            engines,
            rule_id,
        }
    }

    /// Evaluate a check clone in place. Returns the reduced result and an
    /// optional diagnostic destined for the rule result.
    pub fn evaluate(&mut self, check: &mut Check) -> (ResultKind, Option<String>) {
        let (result, message) = if check.is_complex() {
            (self.evaluate_complex(check), None)
        } else {
            self.evaluate_simple(check)
        };
        let result = if check.negate {
            algebra::negate(result)
        } else {
            result
        };
        (result, message)
    }

    fn evaluate_complex(&mut self, check: &mut Check) -> ResultKind {
        let CheckBody::Complex { operator, children } = &mut check.body else {
            return ResultKind::Unknown;
        };
        let operator = *operator;
        let mut folded: Option<ResultKind> = None;
        for child in children.iter_mut() {
            let (child_result, _) = self.evaluate(child);
            folded = Some(match folded {
                None => child_result,
                Some(prev) => algebra::combine(prev, child_result, operator),
            });
        }
        match folded {
            Some(result) => result,
            None => {
                debug!("complex check without children");
                ResultKind::Error
            }
        }
    }

    fn evaluate_simple(&mut self, check: &mut Check) -> (ResultKind, Option<String>) {
        let bindings = match build_value_bindings(self.benchmark, self.profile, &check.exports) {
            Ok(bindings) => bindings,
            Err(err) => return (ResultKind::Unknown, Some(err.to_string())),
        };

        let refs: Vec<CheckContentRef> = check.content_refs().to_vec();
        let mut result = ResultKind::NotChecked;
        for content in &refs {
            let request = CheckRequest {
                rule_id: self.rule_id,
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
            // Content refs are alternatives: the first one an engine
            // claims settles the check.
            if result != ResultKind::NotChecked {
                check.pin_content_ref(content, None);
                break;
            }
        }
        let message = (result == ResultKind::NotChecked)
            .then(|| "None of the check-content-ref elements was resolvable.".to_string());
        (result, message)
    }
}
