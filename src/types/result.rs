//! Evaluation output types.
//!
//! A test result collects one rule result per evaluated rule (more under
//! multi-check) in benchmark pre-order, plus any scores computed afterwards.
//! These types are serialization-ready for downstream reporting; the core
//! itself never persists them.

use super::check::Check;
use super::common::{ResultKind, RuleRole, Severity};
use super::item::{Fix, Ident, Rule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

/// Diagnostic attached to a rule result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMessage {
    pub severity: MessageSeverity,
    pub content: String,
}

impl RuleMessage {
    pub fn info(content: impl Into<String>) -> Self {
        RuleMessage {
            severity: MessageSeverity::Info,
            content: content.into(),
        }
    }
}

/// Outcome of one rule (or of one multi-check target of a rule).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub idref: String,
    pub result: ResultKind,
    pub weight: f64,
    pub version: Option<String>,
    pub severity: Severity,
    pub role: RuleRole,
    pub time: DateTime<Utc>,
    pub fixes: Vec<Fix>,
    pub idents: Vec<Ident>,
    /// Clone of the evaluated check with the used content-ref pinned.
    /// Always owned by this result, never shared with the benchmark.
    pub check: Option<Check>,
    pub messages: Vec<RuleMessage>,
}

impl RuleResult {
    /// Snapshot the rule's identity and collateral into a fresh result.
    pub fn from_rule(rule: &Rule, result: ResultKind) -> Self {
        RuleResult {
            idref: rule.id.clone(),
            result,
            weight: rule.weight,
            version: rule.version.clone(),
            severity: rule.severity,
            role: rule.role,
            time: Utc::now(),
            fixes: rule.fixes.clone(),
            idents: rule.idents.clone(),
            check: None,
            messages: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.check = Some(check);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(RuleMessage::info(message));
        self
    }
}

/// Score of a benchmark subtree under one scoring system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub system: String,
    pub score: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub rule_results: Vec<RuleResult>,
    pub scores: Vec<Score>,
}

impl TestResult {
    pub fn new(id: impl Into<String>) -> Self {
        TestResult {
            id: id.into(),
            start_time: Utc::now(),
            end_time: None,
            rule_results: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn add_rule_result(&mut self, rule_result: RuleResult) {
        self.rule_results.push(rule_result);
    }

    /// First rule result for the given rule id. Multi-check rules own
    /// several results sharing the idref; scoring only needs the first.
    pub fn rule_result_by_id(&self, idref: &str) -> Option<&RuleResult> {
        self.rule_results.iter().find(|r| r.idref == idref)
    }
}

/// Result id mandated by the document schema version: the long
/// `xccdf_org.open-scap_testresult_` form for 1.2 and newer documents, the
/// historical `OSCAP-Test-` form for older ones.
pub fn test_result_id(schema_version: &str, profile_id: Option<&str>) -> String {
    let profile = profile_id.unwrap_or("default-profile");
    if schema_version_at_least(schema_version, 1, 2) {
        format!("xccdf_org.open-scap_testresult_{profile}")
    } else {
        format!("OSCAP-Test-{profile}")
    }
}

fn schema_version_at_least(version: &str, major: u32, minor: u32) -> bool {
    let mut parts = version.split('.').map(|p| p.parse::<u32>().unwrap_or(0));
    let doc_major = parts.next().unwrap_or(0);
    let doc_minor = parts.next().unwrap_or(0);
    (doc_major, doc_minor) >= (major, minor)
}
