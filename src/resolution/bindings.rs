//! Value bindings exported to checking engines.
//!
//! Bindings tie Refine-values, Set-values, Value elements and check exports
//! together at dispatch time. They live only for the duration of one check
//! dispatch and are rebuilt from scratch on the next one.

use crate::error::PolicyError;
use crate::types::check::CheckExport;
use crate::types::common::{ValueOperator, ValueType};
use crate::types::item::Benchmark;
use crate::types::profile::Profile;

/// One engine-visible variable resolved from a benchmark Value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueBinding {
    /// Variable name the engine sees (from the check export).
    pub name: String,
    pub value_type: ValueType,
    /// Value of the instance picked by the effective selector.
    pub value: String,
    /// Profile setvalue override, attached alongside the resolved value.
    pub setvalue: Option<String>,
    pub operator: ValueOperator,
}

/// Resolve every export of a check into a binding list.
///
/// The selector and operator come from the LAST matching refine-value in
/// the profile; the setvalue override from the LAST matching setvalue. A
/// missing Value or a selector that resolves to no instance fails the whole
/// list.
pub fn build_value_bindings(
    benchmark: &Benchmark,
    profile: Option<&Profile>,
    exports: &[CheckExport],
) -> Result<Vec<ValueBinding>, PolicyError> {
    let mut bindings = Vec::with_capacity(exports.len());

    for export in exports {
        let value = benchmark
            .find(&export.value_id)
            .and_then(|id| benchmark.item(id))
            .and_then(|item| item.as_value())
            .ok_or_else(|| PolicyError::ValueMissing(export.value_id.clone()))?;

        let refine = profile.and_then(|p| p.last_refine_value(&value.id));
        let selector = refine.and_then(|r| r.selector.as_deref());
        let operator = refine
            .and_then(|r| r.operator)
            .unwrap_or(value.operator);

        let instance = value.instance_by_selector(selector).ok_or_else(|| {
            PolicyError::ValueInstanceMissing {
                value_id: value.id.clone(),
                selector: selector.map(str::to_string),
            }
        })?;

        let setvalue = profile
            .and_then(|p| p.last_setvalue(&value.id))
            .map(|s| s.value.clone());

        bindings.push(ValueBinding {
            name: export.export_name.clone(),
            value_type: value.value_type,
            value: instance.value.clone(),
            setvalue,
            operator,
        });
    }

    Ok(bindings)
}
