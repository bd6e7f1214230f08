//! Item tailoring: clones adjusted by a profile's refine directives.

#[cfg(test)]
use crate::types::common::ValueOperator;
use crate::types::item::{Benchmark, Item, Value, ValueInstance};
use crate::types::profile::Profile;

/// Clone `item_id` with the profile's refine-rules, setvalues and
/// refine-values applied. Items the profile does not touch come back as
/// plain clones; unknown ids and the benchmark root yield `None`.
pub(crate) fn tailor_item(benchmark: &Benchmark, profile: &Profile, item_id: &str) -> Option<Item> {
    let item = benchmark.find(item_id).and_then(|id| benchmark.item(id))?;
    match item {
        Item::Rule(rule) => {
            let mut rule = rule.clone();
            if let Some(refine) = profile.refine_rule(&rule.id) {
                if let Some(weight) = refine.weight {
                    rule.weight = weight;
                }
                if let Some(severity) = refine.severity {
                    rule.severity = severity;
                }
                if let Some(role) = refine.role {
                    rule.role = role;
                }
            }
            Some(Item::Rule(rule))
        }
        Item::Group(group) => {
            let mut group = group.clone();
            // Weight is the only refine-rule attribute applicable to groups.
            if let Some(weight) = profile.refine_rule(&group.id).and_then(|r| r.weight) {
                group.weight = weight;
            }
            Some(Item::Group(group))
        }
        Item::Value(value) => Some(Item::Value(tailor_value(profile, value))),
        Item::Benchmark(_) => None,
    }
}

/// Apply setvalue / refine-value to a Value clone: keep only the selected
/// instances, let a setvalue that matches no instance land on the default
/// one, and apply a refined operator.
fn tailor_value(profile: &Profile, value: &Value) -> Value {
    let mut value = value.clone();

    let setvalue = profile.last_setvalue(&value.id).map(|s| s.value.as_str());
    let refine = profile.last_refine_value(&value.id);

    let effective = setvalue.or_else(|| {
        let selector = refine.and_then(|r| r.selector.as_deref());
        refine.and(
            value
                .instance_by_selector(selector)
                .map(|i| i.value.as_str()),
        )
    });

    if let Some(effective) = effective.map(str::to_string) {
        // Selector of the instance already carrying the effective value,
        // if there is one.
        let mut selector: Option<String> = None;
        let mut matched = false;
        for instance in &value.instances {
            if instance.value == effective {
                selector = instance.selector.clone();
                matched = true;
            }
        }
        value
            .instances
            .retain(|i| !matched || i.selector == selector);
        if !matched {
            // The literal has no instance of its own; it becomes the
            // default instance's value.
            match value.instances.iter_mut().find(|i| i.selector.is_none()) {
                Some(default_instance) => default_instance.value = effective,
                None => value.instances.push(ValueInstance {
                    selector: None,
                    value: effective,
                }),
            }
        }
    }

    if let Some(operator) = refine.and_then(|r| r.operator) {
        value.operator = operator;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::common::{Severity, ValueType};
    use crate::types::item::{Group, Rule};
    use crate::types::profile::{RefineRule, RefineValue};

    fn benchmark() -> Benchmark {
        let mut benchmark = Benchmark::new("bench");
        let root = benchmark.root();
        let g1 = benchmark.add_group(root, Group::new("g1")).unwrap();
        benchmark
            .add_rule(g1, Rule::new("r1").with_weight(1.0))
            .unwrap();
        benchmark
            .add_value(
                root,
                Value::new("v1", ValueType::String)
                    .with_instance(None, "default")
                    .with_instance(Some("strict"), "tight"),
            )
            .unwrap();
        benchmark.resolve().unwrap();
        benchmark
    }

    #[test]
    fn test_refine_rule_overrides_apply_to_clone() {
        let benchmark = benchmark();
        let profile = Profile::new("p1").with_refine_rule(RefineRule {
            rule_id: "r1".to_string(),
            weight: Some(5.0),
            severity: Some(Severity::High),
            role: None,
            selector: None,
        });

        let Some(Item::Rule(tailored)) = tailor_item(&benchmark, &profile, "r1") else {
            panic!("expected a rule");
        };
        assert_eq!(tailored.weight, 5.0);
        assert_eq!(tailored.severity, Severity::High);

        // The benchmark original is untouched.
        let original = benchmark
            .find("r1")
            .and_then(|id| benchmark.item(id))
            .and_then(Item::as_rule)
            .unwrap();
        assert_eq!(original.weight, 1.0);
        assert_eq!(original.severity, Severity::Unknown);
    }

    #[test]
    fn test_untouched_item_comes_back_as_plain_clone() {
        let benchmark = benchmark();
        let profile = Profile::new("p1");
        let Some(Item::Rule(tailored)) = tailor_item(&benchmark, &profile, "r1") else {
            panic!("expected a rule");
        };
        assert_eq!(tailored.weight, 1.0);
        assert!(tailor_item(&benchmark, &profile, "missing").is_none());
        assert!(tailor_item(&benchmark, &profile, "bench").is_none());
    }

    #[test]
    fn test_refine_value_selector_prunes_instances() {
        let benchmark = benchmark();
        let profile = Profile::new("p1").with_refine_value(RefineValue {
            value_id: "v1".to_string(),
            selector: Some("strict".to_string()),
            operator: Some(ValueOperator::PatternMatch),
        });

        let Some(Item::Value(tailored)) = tailor_item(&benchmark, &profile, "v1") else {
            panic!("expected a value");
        };
        assert_eq!(tailored.instances.len(), 1);
        assert_eq!(tailored.instances[0].value, "tight");
        assert_eq!(tailored.operator, ValueOperator::PatternMatch);
    }

    #[test]
    fn test_setvalue_without_matching_instance_lands_on_default() {
        let benchmark = benchmark();
        let profile = Profile::new("p1").with_setvalue("v1", "custom");

        let Some(Item::Value(tailored)) = tailor_item(&benchmark, &profile, "v1") else {
            panic!("expected a value");
        };
        let default_instance = tailored.instance_by_selector(None).unwrap();
        assert_eq!(default_instance.value, "custom");
    }

    #[test]
    fn test_setvalue_matching_instance_selects_it() {
        let benchmark = benchmark();
        let profile = Profile::new("p1").with_setvalue("v1", "tight");

        let Some(Item::Value(tailored)) = tailor_item(&benchmark, &profile, "v1") else {
            panic!("expected a value");
        };
        assert_eq!(tailored.instances.len(), 1);
        assert_eq!(tailored.instances[0].selector.as_deref(), Some("strict"));
    }
}
