//! The policy model: benchmark ownership, engines, hooks, CPE state and the
//! evaluation entry point.

use super::substitute::substitute;
use super::tailor::tailor_item;
use super::Policy;
use crate::applicability::cpe::{CpeDict, CpeLangModel};
use crate::applicability::session::{CheckContentLoader, SessionCache};
use crate::engines::{CheckEngine, EngineRegistry, OutputHook, StartHook};
use crate::error::PolicyError;
use crate::evaluation::EvaluationContext;
use crate::scoring;
use crate::types::check::Check;
use crate::types::item::{Benchmark, Item};
use crate::types::profile::Profile;
use crate::types::result::{test_result_id, Score, TestResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Check content referenced from the benchmark: the system URI of the
/// engine it belongs to plus the href of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub system: String,
    pub href: String,
}

pub struct PolicyModel {
    benchmark: Benchmark,
    policies: Vec<Policy>,
    engines: EngineRegistry,
    start_hooks: Vec<StartHook>,
    output_hooks: Vec<OutputHook>,
    cpe_dicts: Vec<CpeDict>,
    cpe_lang_models: Vec<CpeLangModel>,
    cpe_loader: Option<Box<dyn CheckContentLoader>>,
    cpe_sessions: SessionCache,
}

impl PolicyModel {
    /// Take ownership of the benchmark, resolve its internal references and
    /// build one policy per profile plus the default policy.
    pub fn new(mut benchmark: Benchmark) -> Result<Self, PolicyError> {
        benchmark.resolve()?;

        let mut policies = Vec::with_capacity(benchmark.profiles.len() + 1);
        policies.push(Policy::new(&benchmark, Profile::default_policy()));
        for profile in &benchmark.profiles {
            policies.push(Policy::new(&benchmark, profile.clone()));
        }

        Ok(PolicyModel {
            benchmark,
            policies,
            engines: EngineRegistry::new(),
            start_hooks: Vec::new(),
            output_hooks: Vec::new(),
            cpe_dicts: Vec::new(),
            cpe_lang_models: Vec::new(),
            cpe_loader: None,
            cpe_sessions: SessionCache::new(),
        })
    }

    pub fn benchmark(&self) -> &Benchmark {
        &self.benchmark
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn register_engine(&mut self, system: impl Into<String>, engine: Box<dyn CheckEngine>) {
        self.engines.register(system, engine);
    }

    pub fn register_start_hook(&mut self, hook: StartHook) {
        self.start_hooks.push(hook);
    }

    pub fn register_output_hook(&mut self, hook: OutputHook) {
        self.output_hooks.push(hook);
    }

    pub fn add_cpe_dict(&mut self, dict: CpeDict) {
        self.cpe_dicts.push(dict);
    }

    pub fn add_cpe_lang_model(&mut self, lang_model: CpeLangModel) {
        self.cpe_lang_models.push(lang_model);
    }

    /// Loader used to import check content for CPE applicability decisions.
    pub fn set_content_loader(&mut self, loader: Box<dyn CheckContentLoader>) {
        self.cpe_loader = Some(loader);
    }

    /// Number of cached applicability sessions, one per loaded href.
    pub fn cached_session_count(&self) -> usize {
        self.cpe_sessions.len()
    }

    pub fn policy_by_profile_id(&self, profile_id: Option<&str>) -> Option<&Policy> {
        self.policy_index(profile_id).map(|pos| &self.policies[pos])
    }

    pub fn policy_by_profile_id_mut(&mut self, profile_id: Option<&str>) -> Option<&mut Policy> {
        self.policy_index(profile_id)
            .map(move |pos| &mut self.policies[pos])
    }

    fn policy_index(&self, profile_id: Option<&str>) -> Option<usize> {
        self.policies
            .iter()
            .position(|p| p.profile_id() == profile_id)
    }

    /// Evaluate the policy selected by `profile_id` (`None` for the default
    /// policy).
    ///
    /// Walks the policy's selection list in benchmark order, producing one
    /// rule result per rule (several under multi-check). A hook returning
    /// non-zero cancels the walk: the partial test result is kept and
    /// returned, unless the code was -1, which discards it and surfaces
    /// [`PolicyError::HookAbort`]. The result is stored on the policy and
    /// returned.
    pub fn evaluate(&mut self, profile_id: Option<&str>) -> Result<TestResult, PolicyError> {
        let index = self
            .policy_index(profile_id)
            .ok_or_else(|| PolicyError::ProfileMissing(profile_id.map(str::to_string)))?;

        let PolicyModel {
            benchmark,
            policies,
            engines,
            start_hooks,
            output_hooks,
            cpe_dicts,
            cpe_lang_models,
            cpe_loader,
            cpe_sessions,
        } = self;
        let benchmark: &Benchmark = benchmark;
        let policy = &policies[index];

        let mut test_result = TestResult::new(test_result_id(
            &benchmark.schema_version,
            policy.profile_id(),
        ));

        let mut context = EvaluationContext {
            benchmark,
            profile: Some(policy.profile()),
            selection: policy.selection(),
            engines,
            start_hooks: start_hooks.as_mut_slice(),
            output_hooks: output_hooks.as_mut_slice(),
            cpe_dicts: cpe_dicts.as_slice(),
            cpe_lang_models: cpe_lang_models.as_slice(),
            cpe_loader: cpe_loader.as_deref(),
            cpe_sessions,
        };

        for entry in policy.selection().entries() {
            let Some(item_id) = benchmark.find(&entry.item_id) else {
                warn!(item = %entry.item_id, "selector id does not exist in benchmark");
                continue;
            };
            let Some(Item::Rule(rule)) = benchmark.item(item_id) else {
                continue;
            };
            if let Err(interrupt) = context.evaluate_rule(item_id, rule, &mut test_result) {
                if interrupt.is_fatal() {
                    return Err(PolicyError::HookAbort(interrupt.code()));
                }
                debug!(code = interrupt.code(), "evaluation cancelled by callback");
                break;
            }
        }
        drop(context);

        test_result.end_time = Some(Utc::now());
        policies[index].add_result(test_result.clone());
        Ok(test_result)
    }

    /// Score a test result under the scoring system named by `system` and
    /// record the score on the stored copy of the result.
    pub fn score(
        &mut self,
        profile_id: Option<&str>,
        result_id: &str,
        system: &str,
    ) -> Result<Score, PolicyError> {
        let index = self
            .policy_index(profile_id)
            .ok_or_else(|| PolicyError::ProfileMissing(profile_id.map(str::to_string)))?;
        let stored = self.policies[index]
            .results
            .iter_mut()
            .find(|r| r.id == result_id)
            .ok_or_else(|| {
                PolicyError::Internal(format!("test result \"{result_id}\" is not recorded"))
            })?;
        let score = scoring::score(&self.benchmark, stored, system)?;
        stored.scores.push(score.clone());
        Ok(score)
    }

    /// Clone of `item_id` with the named policy's tailoring applied.
    pub fn tailor_item(&self, profile_id: Option<&str>, item_id: &str) -> Option<Item> {
        let policy = self.policy_by_profile_id(profile_id)?;
        tailor_item(&self.benchmark, policy.profile(), item_id)
    }

    /// Replace `<sub idref="..."/>` markers in `text` using the named
    /// policy's tailored values. Unresolvable markers stay verbatim.
    pub fn substitute(&self, profile_id: Option<&str>, text: &str) -> String {
        match self.policy_by_profile_id(profile_id) {
            Some(policy) => substitute(&self.benchmark, policy.profile(), text),
            None => text.to_string(),
        }
    }

    /// Every (system, href) pair referenced by checks anywhere in the
    /// benchmark, deduplicated preserving first occurrence.
    pub fn systems_and_files(&self) -> Vec<FileRef> {
        let mut files = Vec::new();
        for item_id in self.benchmark.iter_pre_order() {
            if let Some(Item::Rule(rule)) = self.benchmark.item(item_id) {
                for check in rule.checks.iter().chain(&rule.complex_checks) {
                    collect_check_files(check, &mut files);
                }
            }
        }
        files
    }

    /// Hrefs of every referenced check content file, deduplicated
    /// preserving first occurrence.
    pub fn files(&self) -> Vec<String> {
        let mut hrefs = Vec::new();
        for file in self.systems_and_files() {
            if !hrefs.contains(&file.href) {
                hrefs.push(file.href);
            }
        }
        hrefs
    }
}

fn collect_check_files(check: &Check, files: &mut Vec<FileRef>) {
    if check.is_complex() {
        for child in check.children() {
            collect_check_files(child, files);
        }
        return;
    }
    for content in check.content_refs() {
        let entry = FileRef {
            system: check.system.clone(),
            href: content.href.clone(),
        };
        if !files.contains(&entry) {
            files.push(entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applicability::cpe::CpeCheckRef;
    use crate::applicability::session::CheckContentSession;
    use crate::scoring::{
        SCORING_ABSOLUTE, SCORING_DEFAULT, SCORING_FLAT, SCORING_FLAT_UNWEIGHTED,
    };
    use crate::test_support::ScriptedEngine;
    use crate::types::common::ResultKind;
    use crate::types::item::{Group, Rule};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SYS: &str = "urn:test:sys";

    fn simple_check(href: &str) -> Check {
        Check::simple(SYS).with_content_ref(href, None)
    }

    fn single_rule_model(engine: ScriptedEngine) -> PolicyModel {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_check(simple_check("x.xml")))
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(engine));
        model
    }

    #[test]
    fn test_trivial_pass_end_to_end() {
        let mut model = single_rule_model(ScriptedEngine::returning(ResultKind::Pass));

        let result = model.evaluate(None).unwrap();
        assert_eq!(result.id, "xccdf_org.open-scap_testresult_default-profile");
        assert_eq!(result.rule_results.len(), 1);
        assert_eq!(result.rule_results[0].idref, "r1");
        assert_eq!(result.rule_results[0].result, ResultKind::Pass);
        assert!(result.end_time.is_some());

        let check = result.rule_results[0].check.as_ref().unwrap();
        assert_eq!(check.content_refs()[0].href, "x.xml");

        let default = model.score(None, &result.id, SCORING_DEFAULT).unwrap();
        assert_eq!(default.score, 100.0);
        let flat = model.score(None, &result.id, SCORING_FLAT).unwrap();
        assert_eq!((flat.score, flat.maximum), (1.0, 1.0));
        let unweighted = model
            .score(None, &result.id, SCORING_FLAT_UNWEIGHTED)
            .unwrap();
        assert_eq!((unweighted.score, unweighted.maximum), (1.0, 1.0));
        let absolute = model.score(None, &result.id, SCORING_ABSOLUTE).unwrap();
        assert_eq!(absolute.score, 1.0);

        let policy = model.policy_by_profile_id(None).unwrap();
        assert_eq!(policy.results().len(), 1);
        assert_eq!(policy.results()[0].scores.len(), 4);
    }

    #[test]
    fn test_deselected_group_yields_not_selected() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        let g1 = benchmark.add_group(root, Group::new("g1")).unwrap();
        benchmark
            .add_rule(g1, Rule::new("r2").with_check(simple_check("x.xml")))
            .unwrap();
        let benchmark = benchmark.with_profile(Profile::new("p1").with_select("g1", false));
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));

        let result = model.evaluate(Some("p1")).unwrap();
        assert_eq!(result.rule_results.len(), 1);
        assert_eq!(result.rule_results[0].result, ResultKind::NotSelected);

        let default = model.score(Some("p1"), &result.id, SCORING_DEFAULT).unwrap();
        assert_eq!(default.score, 0.0);
    }

    #[test]
    fn test_multicheck_fans_out_per_definition() {
        let engine = ScriptedEngine::new()
            .with_names(
                "x.xml",
                vec!["d1".to_string(), "d2".to_string(), "d3".to_string()],
            )
            .with_response("x.xml", Some("d1"), ResultKind::Pass)
            .with_response("x.xml", Some("d2"), ResultKind::Fail)
            .with_response("x.xml", Some("d3"), ResultKind::Pass);
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(
                root,
                Rule::new("r1").with_check(simple_check("x.xml").with_multicheck(true)),
            )
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(engine));

        let starts = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&starts);
        model.register_start_hook(Box::new(move |_rule| {
            *counter.borrow_mut() += 1;
            0
        }));

        let result = model.evaluate(None).unwrap();
        let outcomes: Vec<ResultKind> = result.rule_results.iter().map(|r| r.result).collect();
        assert_eq!(
            outcomes,
            vec![ResultKind::Pass, ResultKind::Fail, ResultKind::Pass]
        );
        assert!(result.rule_results.iter().all(|r| r.idref == "r1"));
        assert_eq!(*starts.borrow(), 3);

        let names: Vec<String> = result
            .rule_results
            .iter()
            .filter_map(|r| r.check.as_ref())
            .filter_map(|c| c.content_refs()[0].name.clone())
            .collect();
        assert_eq!(names, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_multicheck_with_empty_definition_list() {
        let engine = ScriptedEngine::returning(ResultKind::Pass).with_names("x.xml", Vec::new());
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(
                root,
                Rule::new("r1").with_check(simple_check("x.xml").with_multicheck(true)),
            )
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(engine));

        let result = model.evaluate(None).unwrap();
        assert_eq!(result.rule_results.len(), 1);
        assert_eq!(result.rule_results[0].result, ResultKind::Unknown);
        assert!(result.rule_results[0]
            .messages
            .iter()
            .any(|m| m.content == "No definitions found for @multi-check."));
    }

    #[test]
    fn test_multicheck_unsupported_falls_back_to_single() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(
                root,
                Rule::new("r1").with_check(simple_check("x.xml").with_multicheck(true)),
            )
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));

        let result = model.evaluate(None).unwrap();
        assert_eq!(result.rule_results.len(), 1);
        assert_eq!(result.rule_results[0].result, ResultKind::Pass);
        assert!(result.rule_results[0]
            .messages
            .iter()
            .any(|m| m.content.contains("does not support multi-check")));
    }

    #[test]
    fn test_rule_without_registered_engine_is_not_checked() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_check(simple_check("x.xml")))
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();

        let result = model.evaluate(None).unwrap();
        assert_eq!(result.rule_results[0].result, ResultKind::NotChecked);
        assert!(result.rule_results[0]
            .messages
            .iter()
            .any(|m| m.content == "No candidate or applicable check found."));
    }

    #[test]
    fn test_inapplicable_platform_yields_not_applicable() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(
                root,
                Rule::new("r1")
                    .with_platform("cpe:/o:unmatched")
                    .with_check(simple_check("x.xml")),
            )
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));

        let result = model.evaluate(None).unwrap();
        assert_eq!(result.rule_results[0].result, ResultKind::NotApplicable);
    }

    #[test]
    fn test_output_hook_abort_keeps_partial_result() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_check(simple_check("x.xml")))
            .unwrap();
        benchmark
            .add_rule(root, Rule::new("r2").with_check(simple_check("x.xml")))
            .unwrap();
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));
        model.register_output_hook(Box::new(|_result| 1));

        let result = model.evaluate(None).unwrap();
        // The result the aborting hook saw still stands; r2 was never run.
        assert_eq!(result.rule_results.len(), 1);
        assert_eq!(result.rule_results[0].idref, "r1");
        assert_eq!(
            model.policy_by_profile_id(None).unwrap().results().len(),
            1
        );
    }

    #[test]
    fn test_fatal_start_hook_discards_result() {
        let mut model = single_rule_model(ScriptedEngine::returning(ResultKind::Pass));
        model.register_start_hook(Box::new(|_rule| -1));

        let err = model.evaluate(None).unwrap_err();
        assert!(matches!(err, PolicyError::HookAbort(-1)));
        assert!(model.policy_by_profile_id(None).unwrap().results().is_empty());
    }

    struct StaticSession(bool);

    impl CheckContentSession for StaticSession {
        fn evaluate(&mut self, _name: &str) -> Result<bool, PolicyError> {
            Ok(self.0)
        }
    }

    struct CountingLoader {
        loads: Rc<RefCell<usize>>,
    }

    impl CheckContentLoader for CountingLoader {
        fn load(&self, _href: &str) -> Result<Box<dyn CheckContentSession>, PolicyError> {
            *self.loads.borrow_mut() += 1;
            Ok(Box::new(StaticSession(true)))
        }
    }

    #[test]
    fn test_cpe_session_cache_shared_across_rules() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        for id in ["r1", "r2"] {
            benchmark
                .add_rule(
                    root,
                    Rule::new(id)
                        .with_platform("cpe:/o:x")
                        .with_check(simple_check("x.xml")),
                )
                .unwrap();
        }
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));
        model.add_cpe_dict(CpeDict::new().with_item(
            "cpe:/o:x",
            vec![CpeCheckRef {
                system: "urn:test:oval".to_string(),
                href: Some("oval1.xml".to_string()),
                name: "oval:def:1".to_string(),
            }],
        ));
        let loads = Rc::new(RefCell::new(0));
        model.set_content_loader(Box::new(CountingLoader {
            loads: Rc::clone(&loads),
        }));

        let result = model.evaluate(None).unwrap();
        assert!(result
            .rule_results
            .iter()
            .all(|r| r.result == ResultKind::Pass));
        // The applicability content was imported once and the session
        // reused for the second rule.
        assert_eq!(*loads.borrow(), 1);
        assert_eq!(model.cached_session_count(), 1);
    }

    #[test]
    fn test_refine_rule_overrides_emitted_result() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_check(simple_check("x.xml")))
            .unwrap();
        let benchmark = benchmark.with_profile(Profile::new("p1").with_refine_rule(
            crate::types::profile::RefineRule {
                rule_id: "r1".to_string(),
                weight: Some(4.0),
                severity: Some(crate::types::common::Severity::High),
                role: None,
                selector: None,
            },
        ));
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Fail)));

        let result = model.evaluate(Some("p1")).unwrap();
        assert_eq!(result.rule_results[0].weight, 4.0);
        assert_eq!(
            result.rule_results[0].severity,
            crate::types::common::Severity::High
        );
    }

    #[test]
    fn test_one_policy_per_profile_plus_default() {
        let benchmark = Benchmark::new("bench")
            .with_profile(Profile::new("p1"))
            .with_profile(Profile::new("p2"));
        let mut model = PolicyModel::new(benchmark).unwrap();

        assert_eq!(model.policies().len(), 3);
        assert!(model.policy_by_profile_id(None).is_some());
        assert!(model.policy_by_profile_id(Some("p1")).is_some());
        assert!(model.policy_by_profile_id(Some("p2")).is_some());
        assert!(model.policy_by_profile_id(Some("p3")).is_none());
        assert!(matches!(
            model.evaluate(Some("p3")),
            Err(PolicyError::ProfileMissing(Some(id))) if id == "p3"
        ));
    }

    #[test]
    fn test_legacy_result_id_for_old_documents() {
        let mut benchmark = Benchmark::new("bench").with_schema_version("1.1");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_check(simple_check("x.xml")))
            .unwrap();
        let benchmark = benchmark.with_profile(Profile::new("p1"));
        let mut model = PolicyModel::new(benchmark).unwrap();
        model.register_engine(SYS, Box::new(ScriptedEngine::returning(ResultKind::Pass)));

        let result = model.evaluate(Some("p1")).unwrap();
        assert_eq!(result.id, "OSCAP-Test-p1");
    }

    #[test]
    fn test_systems_and_files_deduplicates_in_order() {
        use crate::types::common::BoolOperator;

        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(
                root,
                Rule::new("r1")
                    .with_check(simple_check("x.xml"))
                    .with_complex_check(
                        Check::complex(BoolOperator::And)
                            .with_child(simple_check("y.xml"))
                            .with_child(simple_check("x.xml")),
                    ),
            )
            .unwrap();
        let model = PolicyModel::new(benchmark).unwrap();

        let files = model.systems_and_files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].href, "x.xml");
        assert_eq!(files[1].href, "y.xml");
        assert_eq!(model.files(), vec!["x.xml".to_string(), "y.xml".to_string()]);
    }

    #[test]
    fn test_tailor_and_substitute_through_model() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_value(
                root,
                crate::types::item::Value::new("v1", crate::types::common::ValueType::String)
                    .with_instance(None, "abc"),
            )
            .unwrap();
        let benchmark = benchmark.with_profile(Profile::new("p1").with_setvalue("v1", "xyz"));
        let model = PolicyModel::new(benchmark).unwrap();

        let Some(Item::Value(tailored)) = model.tailor_item(Some("p1"), "v1") else {
            panic!("expected a value");
        };
        assert_eq!(tailored.instances[0].value, "xyz");

        assert_eq!(
            model.substitute(Some("p1"), r#"value is <sub idref="v1"/>"#),
            "value is xyz"
        );
        // The default policy has no setvalue for v1.
        assert_eq!(
            model.substitute(None, r#"value is <sub idref="v1"/>"#),
            "value is abc"
        );
    }
}
