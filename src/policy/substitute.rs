//! Textual substitution of `<sub idref="..."/>` markers.
//!
//! A marker resolves, in order, to the benchmark plain-text of that id, or
//! to the first instance value of the tailored Value of that id. Markers
//! that resolve to nothing are left verbatim.

use super::tailor::tailor_item;
use crate::types::item::{Benchmark, Item};
use crate::types::profile::Profile;
use regex::Regex;
use std::sync::OnceLock;

fn sub_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"<sub\s+idref="([^"]+)"\s*/>"#).ok())
        .as_ref()
}

pub(crate) fn substitute(benchmark: &Benchmark, profile: &Profile, text: &str) -> String {
    let Some(pattern) = sub_pattern() else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let id = &caps[1];
            if let Some(plain) = benchmark.plain_texts.get(id) {
                return plain.clone();
            }
            if let Some(Item::Value(value)) = tailor_item(benchmark, profile, id) {
                if let Some(instance) = value.instances.first() {
                    return instance.value.clone();
                }
            }
            caps[0].to_string()
        })
        .into_owned()
}
