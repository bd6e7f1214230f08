//! Data model shared by the policy layer.
//!
//! The benchmark tree is read-only input produced by an external parser;
//! everything here is the in-memory representation plus the result types an
//! evaluation emits.

pub mod check;
pub mod common;
pub mod item;
pub mod profile;
pub mod result;

pub use check::{Check, CheckBody, CheckContentRef, CheckExport, CheckImport};
pub use common::{BoolOperator, ResultKind, RuleRole, Severity, ValueOperator, ValueType};
pub use item::{Benchmark, Fix, Group, Ident, Item, ItemId, Rule, Value, ValueInstance};
pub use profile::{Profile, ProfileSelect, RefineRule, RefineValue, SetValue};
pub use result::{RuleMessage, RuleResult, Score, TestResult};
