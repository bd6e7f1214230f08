//! Platform applicability of benchmark items.
//!
//! An item applies to the target iff its parent applies (recursively up to
//! the benchmark root, which always applies) and at least one of its
//! platform references resolves to true. Every reference is tried against
//! four sources in a fixed order: the benchmark's embedded language model,
//! external language models, the embedded dictionary, external
//! dictionaries. Language models take precedence over dictionaries; XCCDF
//! does not prescribe an order, this implementation picks one.

pub mod cpe;
pub mod session;

use crate::types::item::{Benchmark, ItemId};
use cpe::{cpe_name_matches, is_cpe_name, CpeCheckRef, CpeDict, CpeLangExpr, CpeLangModel};
use session::{CheckContentLoader, SessionCache};
use std::path::Path;

pub use session::{CheckContentSession, SessionCache as CpeSessionCache};

/// Borrow bundle running applicability checks for one evaluation. The
/// session cache outlives it, so content stays loaded across rules and
/// across policies.
pub struct ApplicabilityChecker<'a> {
    benchmark: &'a Benchmark,
    dicts: &'a [CpeDict],
    lang_models: &'a [CpeLangModel],
    loader: Option<&'a dyn CheckContentLoader>,
    sessions: &'a mut SessionCache,
}

impl<'a> ApplicabilityChecker<'a> {
    pub fn new(
        benchmark: &'a Benchmark,
        dicts: &'a [CpeDict],
        lang_models: &'a [CpeLangModel],
        loader: Option<&'a dyn CheckContentLoader>,
        sessions: &'a mut SessionCache,
    ) -> Self {
        ApplicabilityChecker {
            benchmark,
            dicts,
            lang_models,
            loader,
            sessions,
        }
    }

    /// Whether the item (and every ancestor) applies to the target.
    pub fn item_is_applicable(&mut self, item_id: ItemId) -> bool {
        if let Some(parent) = self.benchmark.parent(item_id) {
            if !self.item_is_applicable(parent) {
                return false;
            }
        }

        let platforms: Vec<String> = match self.benchmark.item(item_id) {
            Some(item) => item.platforms().to_vec(),
            None => return false,
        };
        // No platform references means applicable everywhere.
        if platforms.is_empty() {
            return true;
        }

        if let Some(embedded) = &self.benchmark.embedded_cpe_lang_model {
            if self.matches_lang_model(embedded, &platforms) {
                return true;
            }
        }
        for lang_model in self.lang_models {
            if self.matches_lang_model(lang_model, &platforms) {
                return true;
            }
        }
        if let Some(embedded) = &self.benchmark.embedded_cpe_dict {
            if self.matches_dict(embedded, &platforms) {
                return true;
            }
        }
        for dict in self.dicts {
            if self.matches_dict(dict, &platforms) {
                return true;
            }
        }
        false
    }

    fn matches_lang_model(&mut self, lang_model: &CpeLangModel, platforms: &[String]) -> bool {
        for platform in platforms {
            // A leading "#" marks a platform reference, but content exists
            // that omits it, so both spellings are accepted.
            let id = platform.strip_prefix('#').unwrap_or(platform);
            let Some(platform) = lang_model.platform(id) else {
                continue;
            };
            if self.eval_lang_expr(&platform.test) {
                return true;
            }
        }
        false
    }

    fn eval_lang_expr(&mut self, expr: &CpeLangExpr) -> bool {
        match expr {
            CpeLangExpr::And(children) => children.iter().all(|c| self.eval_lang_expr(c)),
            CpeLangExpr::Or(children) => children.iter().any(|c| self.eval_lang_expr(c)),
            CpeLangExpr::Not(child) => !self.eval_lang_expr(child),
            CpeLangExpr::FactRef(name) => self.name_matches_any_dict(name),
            // Language-model hrefs are used as given, with no prefixing.
            CpeLangExpr::CheckFactRef(check) => self.eval_check_ref(check, None),
        }
    }

    fn matches_dict(&mut self, dict: &CpeDict, platforms: &[String]) -> bool {
        platforms
            .iter()
            .filter(|p| is_cpe_name(p))
            .any(|p| self.name_applicable_in_dict(dict, p))
    }

    /// Whether any dictionary (embedded first) has an applicable item for
    /// the CPE name. Used for language-model fact-refs.
    fn name_matches_any_dict(&mut self, name: &str) -> bool {
        if let Some(embedded) = &self.benchmark.embedded_cpe_dict {
            if self.name_applicable_in_dict(embedded, name) {
                return true;
            }
        }
        for dict in self.dicts {
            if self.name_applicable_in_dict(dict, name) {
                return true;
            }
        }
        false
    }

    fn name_applicable_in_dict(&mut self, dict: &CpeDict, name: &str) -> bool {
        let origin_dir = dict
            .origin_file
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        for item in &dict.items {
            if !cpe_name_matches(&item.name, name) {
                continue;
            }
            // A dictionary item without checks applies by name match alone.
            if item.checks.is_empty() {
                return true;
            }
            if item
                .checks
                .iter()
                .any(|c| self.eval_check_ref(c, origin_dir.as_deref()))
            {
                return true;
            }
        }
        false
    }

    /// Resolve the prefixed href and evaluate the referenced definition.
    /// Dictionary-origin hrefs resolve relative to the dictionary file.
    fn eval_check_ref(&mut self, check: &CpeCheckRef, origin_dir: Option<&Path>) -> bool {
        let Some(href) = check.href.as_deref() else {
            return false;
        };
        let prefixed = match origin_dir {
            Some(dir) if !dir.as_os_str().is_empty() => {
                dir.join(href).to_string_lossy().into_owned()
            }
            _ => href.to_string(),
        };
        self.sessions
            .evaluate_or_false(self.loader, &prefixed, &check.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PolicyError;
    use crate::types::item::{Group, Rule};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    struct MapSession(HashMap<String, bool>);

    impl CheckContentSession for MapSession {
        fn evaluate(&mut self, name: &str) -> Result<bool, PolicyError> {
            Ok(self.0.get(name).copied().unwrap_or(false))
        }
    }

    struct TrueLoader {
        loads: Rc<RefCell<Vec<String>>>,
    }

    impl CheckContentLoader for TrueLoader {
        fn load(&self, href: &str) -> Result<Box<dyn CheckContentSession>, PolicyError> {
            self.loads.borrow_mut().push(href.to_string());
            let mut map = HashMap::new();
            map.insert("oval:def:true".to_string(), true);
            map.insert("oval:def:false".to_string(), false);
            Ok(Box::new(MapSession(map)))
        }
    }

    fn dict_with_check(name: &str, def: &str) -> CpeDict {
        CpeDict::new()
            .with_origin_file("/content/cpe/dict.xml")
            .with_item(
                name,
                vec![CpeCheckRef {
                    system: "urn:test:oval".to_string(),
                    href: Some("oval1.xml".to_string()),
                    name: def.to_string(),
                }],
            )
    }

    #[test]
    fn test_item_without_platforms_is_applicable() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark.add_rule(root, Rule::new("r1")).unwrap();
        benchmark.resolve().unwrap();
        let r1 = benchmark.find("r1").unwrap();

        let mut sessions = SessionCache::new();
        let mut checker = ApplicabilityChecker::new(&benchmark, &[], &[], None, &mut sessions);
        assert!(checker.item_is_applicable(r1));
    }

    #[test]
    fn test_unmatched_platform_is_not_applicable() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("cpe:/o:debian:debian_linux"))
            .unwrap();
        benchmark.resolve().unwrap();
        let r1 = benchmark.find("r1").unwrap();

        let mut sessions = SessionCache::new();
        let mut checker = ApplicabilityChecker::new(&benchmark, &[], &[], None, &mut sessions);
        assert!(!checker.item_is_applicable(r1));
    }

    #[test]
    fn test_checkless_dict_item_applies_by_name() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("cpe:/o:fedoraproject:fedora"))
            .unwrap();
        benchmark.resolve().unwrap();
        let r1 = benchmark.find("r1").unwrap();
        let dicts = vec![CpeDict::new().with_item("cpe:/o:fedoraproject:fedora", Vec::new())];

        let mut sessions = SessionCache::new();
        let mut checker = ApplicabilityChecker::new(&benchmark, &dicts, &[], None, &mut sessions);
        assert!(checker.item_is_applicable(r1));
    }

    #[test]
    fn test_parent_group_platform_gates_rules() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        let g1 = benchmark
            .add_group(root, Group::new("g1").with_platform("cpe:/o:debian:debian_linux"))
            .unwrap();
        benchmark.add_rule(g1, Rule::new("r1")).unwrap();
        benchmark.resolve().unwrap();
        let r1 = benchmark.find("r1").unwrap();

        let mut sessions = SessionCache::new();
        let mut checker = ApplicabilityChecker::new(&benchmark, &[], &[], None, &mut sessions);
        // r1 itself has no platforms, but its parent group is inapplicable.
        assert!(!checker.item_is_applicable(r1));
    }

    #[test]
    fn test_dict_check_sessions_are_cached_per_href() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("cpe:/o:x"))
            .unwrap();
        benchmark
            .add_rule(root, Rule::new("r2").with_platform("cpe:/o:x"))
            .unwrap();
        benchmark.resolve().unwrap();
        let dicts = vec![dict_with_check("cpe:/o:x", "oval:def:true")];

        let loads = Rc::new(RefCell::new(Vec::new()));
        let loader = TrueLoader {
            loads: Rc::clone(&loads),
        };
        let mut sessions = SessionCache::new();
        let mut checker =
            ApplicabilityChecker::new(&benchmark, &dicts, &[], Some(&loader), &mut sessions);

        let r1 = benchmark.find("r1").unwrap();
        let r2 = benchmark.find("r2").unwrap();
        assert!(checker.item_is_applicable(r1));
        assert!(checker.item_is_applicable(r2));

        // The href is prefixed with the dictionary's directory and the
        // content is imported exactly once.
        assert_eq!(loads.borrow().as_slice(), ["/content/cpe/oval1.xml"]);
    }

    #[test]
    fn test_lang_model_platform_with_and_without_hash() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("#web_server"))
            .unwrap();
        benchmark
            .add_rule(root, Rule::new("r2").with_platform("web_server"))
            .unwrap();
        benchmark.resolve().unwrap();

        let dicts = vec![CpeDict::new().with_item("cpe:/a:nginx:nginx", Vec::new())];
        let lang_models = vec![CpeLangModel::new().with_platform(
            "web_server",
            CpeLangExpr::Or(vec![
                CpeLangExpr::FactRef("cpe:/a:apache:httpd".to_string()),
                CpeLangExpr::FactRef("cpe:/a:nginx:nginx".to_string()),
            ]),
        )];

        let mut sessions = SessionCache::new();
        let mut checker =
            ApplicabilityChecker::new(&benchmark, &dicts, &lang_models, None, &mut sessions);
        assert!(checker.item_is_applicable(benchmark.find("r1").unwrap()));
        assert!(checker.item_is_applicable(benchmark.find("r2").unwrap()));
    }

    #[test]
    fn test_embedded_sources_are_consulted_first() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("cpe:/o:embedded"))
            .unwrap();
        let mut benchmark = benchmark
            .with_embedded_cpe_dict(CpeDict::new().with_item("cpe:/o:embedded", Vec::new()));
        benchmark.resolve().unwrap();
        let r1 = benchmark.find("r1").unwrap();

        let mut sessions = SessionCache::new();
        let mut checker = ApplicabilityChecker::new(&benchmark, &[], &[], None, &mut sessions);
        assert!(checker.item_is_applicable(r1));
    }

    #[test]
    fn test_lang_model_negation() {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        benchmark
            .add_rule(root, Rule::new("r1").with_platform("#not_debian"))
            .unwrap();
        benchmark.resolve().unwrap();

        let dicts = vec![CpeDict::new().with_item("cpe:/o:debian:debian_linux", Vec::new())];
        let lang_models = vec![CpeLangModel::new().with_platform(
            "not_debian",
            CpeLangExpr::Not(Box::new(CpeLangExpr::FactRef(
                "cpe:/o:debian:debian_linux".to_string(),
            ))),
        )];

        let mut sessions = SessionCache::new();
        let mut checker =
            ApplicabilityChecker::new(&benchmark, &dicts, &lang_models, None, &mut sessions);
        assert!(!checker.item_is_applicable(benchmark.find("r1").unwrap()));
    }
}
