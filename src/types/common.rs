//! Enumerations shared across the benchmark model and the evaluation layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a check or rule evaluation.
///
/// The discriminants are the ranks used by the result algebra and by the
/// skip-absorption rule: kinds of rank 5 and above are "skip" states that
/// never contribute to scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Pass = 1,
    Fail = 2,
    Error = 3,
    Unknown = 4,
    NotApplicable = 5,
    NotChecked = 6,
    NotSelected = 7,
    Informational = 8,
    /// Failed, then remediated. Scores and combines as [`ResultKind::Pass`].
    Fixed = 9,
}

impl ResultKind {
    /// Rank inside the reduction tables. `Fixed` collapses onto `Pass`.
    pub fn rank(self) -> usize {
        match self {
            ResultKind::Fixed => ResultKind::Pass as usize,
            other => other as usize,
        }
    }

    pub fn from_rank(rank: usize) -> Option<ResultKind> {
        Some(match rank {
            1 => ResultKind::Pass,
            2 => ResultKind::Fail,
            3 => ResultKind::Error,
            4 => ResultKind::Unknown,
            5 => ResultKind::NotApplicable,
            6 => ResultKind::NotChecked,
            7 => ResultKind::NotSelected,
            8 => ResultKind::Informational,
            9 => ResultKind::Fixed,
            _ => return None,
        })
    }

    /// Skip states are absorbed by any lower-ranked value when combined.
    pub fn is_skip(self) -> bool {
        self.rank() >= ResultKind::NotApplicable as usize
    }

    /// Whether a rule result with this kind participates in scoring.
    pub fn counts_toward_score(self) -> bool {
        !matches!(
            self,
            ResultKind::NotSelected
                | ResultKind::NotApplicable
                | ResultKind::Informational
                | ResultKind::NotChecked
        )
    }

    /// Pass-equivalent for scoring purposes.
    pub fn is_passing(self) -> bool {
        matches!(self, ResultKind::Pass | ResultKind::Fixed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResultKind::Pass => "pass",
            ResultKind::Fail => "fail",
            ResultKind::Error => "error",
            ResultKind::Unknown => "unknown",
            ResultKind::NotApplicable => "notapplicable",
            ResultKind::NotChecked => "notchecked",
            ResultKind::NotSelected => "notselected",
            ResultKind::Informational => "informational",
            ResultKind::Fixed => "fixed",
        }
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator joining the children of a complex check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoolOperator {
    And,
    Or,
}

/// Comparison operator carried by a Value and exported to checking engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueOperator {
    Equals,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    PatternMatch,
}

impl Default for ValueOperator {
    fn default() -> Self {
        ValueOperator::Equals
    }
}

/// Data type of a Value element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
    Boolean,
}

/// Rule severity, refinable per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unknown
    }
}

/// Rule role, refinable per profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleRole {
    Full,
    Unscored,
    Unchecked,
}

impl Default for RuleRole {
    fn default() -> Self {
        RuleRole::Full
    }
}
