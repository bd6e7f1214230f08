//! Policies and the policy model.
//!
//! A policy is one profile applied to the benchmark: its effective rule
//! selection plus the test results it has produced. The policy model owns
//! the benchmark, every policy (one per profile plus the default), the
//! checking-engine registry and the CPE applicability state shared across
//! evaluations.

mod model;
mod substitute;
mod tailor;

pub use model::{FileRef, PolicyModel};

use crate::resolution::selection::SelectionMap;
use crate::types::item::Benchmark;
use crate::types::profile::Profile;
use crate::types::result::TestResult;

pub struct Policy {
    profile: Profile,
    selection: SelectionMap,
    results: Vec<TestResult>,
}

impl Policy {
    /// Resolve a profile against the benchmark. The selection map ends up
    /// with exactly one entry per reachable rule, in benchmark pre-order.
    pub fn new(benchmark: &Benchmark, profile: Profile) -> Self {
        let selection = SelectionMap::resolve(benchmark, Some(&profile));
        Policy {
            profile,
            selection,
            results: Vec::new(),
        }
    }

    /// Profile id; `None` for the default policy.
    pub fn profile_id(&self) -> Option<&str> {
        self.profile.id.as_deref()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn selection(&self) -> &SelectionMap {
        &self.selection
    }

    pub fn is_rule_selected(&self, rule_id: &str) -> bool {
        self.selection.is_selected(rule_id)
    }

    /// Ids of the rules this policy would evaluate, in order.
    pub fn selected_rules(&self) -> Vec<&str> {
        self.selection
            .entries()
            .iter()
            .filter(|e| e.selected)
            .map(|e| e.item_id.as_str())
            .collect()
    }

    /// Override one selection entry after construction.
    pub fn set_selected(&mut self, rule_id: &str, selected: bool) {
        self.selection.set(rule_id, selected);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn result_by_id(&self, id: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.id == id)
    }

    pub(crate) fn add_result(&mut self, result: TestResult) {
        self.results.push(result);
    }
}
