//! Profiles and their tailoring directives.
//!
//! Directive lists keep document order: when a profile carries several
//! setvalues or refine-values for the same target, the LAST one wins. That
//! rule is load-bearing for compatibility and must not be replaced with a
//! first-match hash lookup.

use super::common::{RuleRole, Severity, ValueOperator};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSelect {
    pub item_id: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetValue {
    pub value_id: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineRule {
    pub rule_id: String,
    pub weight: Option<f64>,
    pub severity: Option<Severity>,
    pub role: Option<RuleRole>,
    pub selector: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineValue {
    pub value_id: String,
    pub selector: Option<String>,
    pub operator: Option<ValueOperator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Option<String>,
    pub title: Option<String>,
    pub selects: Vec<ProfileSelect>,
    pub setvalues: Vec<SetValue>,
    pub refine_rules: Vec<RefineRule>,
    pub refine_values: Vec<RefineValue>,
}

impl Profile {
    pub fn new(id: impl Into<String>) -> Self {
        Profile {
            id: Some(id.into()),
            title: None,
            selects: Vec::new(),
            setvalues: Vec::new(),
            refine_rules: Vec::new(),
            refine_values: Vec::new(),
        }
    }

    /// The synthetic profile backing the default policy.
    pub fn default_policy() -> Self {
        Profile {
            id: None,
            title: Some("No profile (default benchmark)".to_string()),
            selects: Vec::new(),
            setvalues: Vec::new(),
            refine_rules: Vec::new(),
            refine_values: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_select(mut self, item_id: impl Into<String>, selected: bool) -> Self {
        self.selects.push(ProfileSelect {
            item_id: item_id.into(),
            selected,
        });
        self
    }

    pub fn with_setvalue(mut self, value_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.setvalues.push(SetValue {
            value_id: value_id.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_refine_rule(mut self, refine: RefineRule) -> Self {
        self.refine_rules.push(refine);
        self
    }

    pub fn with_refine_value(mut self, refine: RefineValue) -> Self {
        self.refine_values.push(refine);
        self
    }

    /// Last select naming `item_id`, if any.
    pub fn select_for(&self, item_id: &str) -> Option<bool> {
        self.selects
            .iter()
            .rev()
            .find(|s| s.item_id == item_id)
            .map(|s| s.selected)
    }

    /// Last setvalue naming `value_id`. Last match wins.
    pub fn last_setvalue(&self, value_id: &str) -> Option<&SetValue> {
        self.setvalues.iter().rev().find(|s| s.value_id == value_id)
    }

    /// Last refine-value naming `value_id`. Last match wins.
    pub fn last_refine_value(&self, value_id: &str) -> Option<&RefineValue> {
        self.refine_values
            .iter()
            .rev()
            .find(|r| r.value_id == value_id)
    }

    /// Refine-rule for a rule. A valid profile carries at most one.
    pub fn refine_rule(&self, rule_id: &str) -> Option<&RefineRule> {
        self.refine_rules.iter().find(|r| r.rule_id == rule_id)
    }
}
