//! CPE dictionary and language-model inputs.
//!
//! Parsing CPE content is an external collaborator's job; these are the
//! in-memory models the applicability checker consumes. A dictionary maps
//! CPE names to optional check references; a language model composes named
//! platforms out of fact-refs (CPE names) and check-fact-refs joined by
//! boolean operators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to a check deciding whether a CPE item applies (usually an
/// OVAL definition).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpeCheckRef {
    pub system: String,
    pub href: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpeDictItem {
    pub name: String,
    pub checks: Vec<CpeCheckRef>,
}

/// CPE 1.x style dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpeDict {
    /// File the dictionary was loaded from; check hrefs resolve relative to
    /// its directory.
    pub origin_file: Option<PathBuf>,
    pub items: Vec<CpeDictItem>,
}

impl CpeDict {
    pub fn new() -> Self {
        CpeDict::default()
    }

    pub fn with_origin_file(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin_file = Some(origin.into());
        self
    }

    pub fn with_item(mut self, name: impl Into<String>, checks: Vec<CpeCheckRef>) -> Self {
        self.items.push(CpeDictItem {
            name: name.into(),
            checks,
        });
        self
    }
}

/// Boolean expression of a CPE language platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpeLangExpr {
    And(Vec<CpeLangExpr>),
    Or(Vec<CpeLangExpr>),
    Not(Box<CpeLangExpr>),
    /// Reference to a CPE name, resolved against the dictionaries.
    FactRef(String),
    /// Direct check reference; the href is used as given.
    CheckFactRef(CpeCheckRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpePlatform {
    pub id: String,
    pub test: CpeLangExpr,
}

/// CPE 2.x style language model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CpeLangModel {
    pub platforms: Vec<CpePlatform>,
}

impl CpeLangModel {
    pub fn new() -> Self {
        CpeLangModel::default()
    }

    pub fn with_platform(mut self, id: impl Into<String>, test: CpeLangExpr) -> Self {
        self.platforms.push(CpePlatform {
            id: id.into(),
            test,
        });
        self
    }

    pub fn platform(&self, id: &str) -> Option<&CpePlatform> {
        self.platforms.iter().find(|p| p.id == id)
    }
}

/// Loose validity check for CPE URIs; platform strings failing this are
/// treated as language-model platform references instead.
pub fn is_cpe_name(platform: &str) -> bool {
    platform.starts_with("cpe:")
}

/// CPE name matching: component-wise, case-insensitive, with empty or
/// missing components acting as wildcards on either side.
pub fn cpe_name_matches(dict_name: &str, queried: &str) -> bool {
    let Some(dict_rest) = dict_name.strip_prefix("cpe:/") else {
        return false;
    };
    let Some(query_rest) = queried.strip_prefix("cpe:/") else {
        return false;
    };
    let dict_parts: Vec<&str> = dict_rest.split(':').collect();
    let query_parts: Vec<&str> = query_rest.split(':').collect();
    let len = dict_parts.len().max(query_parts.len());
    for pos in 0..len {
        let a = dict_parts.get(pos).copied().unwrap_or("");
        let b = query_parts.get(pos).copied().unwrap_or("");
        if a.is_empty() || b.is_empty() {
            continue;
        }
        if !a.eq_ignore_ascii_case(b) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_matching_is_component_wise() {
        assert!(cpe_name_matches("cpe:/o:fedoraproject:fedora", "cpe:/o:fedoraproject:fedora"));
        assert!(cpe_name_matches("cpe:/o:fedoraproject", "cpe:/o:fedoraproject:fedora:40"));
        assert!(cpe_name_matches("cpe:/o:fedoraproject:fedora:40", "cpe:/o:fedoraproject"));
        assert!(cpe_name_matches("cpe:/o:FedoraProject", "cpe:/o:fedoraproject"));
        assert!(!cpe_name_matches("cpe:/o:debian", "cpe:/o:fedoraproject"));
        assert!(!cpe_name_matches("not-a-cpe", "cpe:/o:debian"));
    }

    #[test]
    fn test_cpe_name_detection() {
        assert!(is_cpe_name("cpe:/o:redhat:enterprise_linux:9"));
        assert!(!is_cpe_name("#web_server"));
        assert!(!is_cpe_name("web_server"));
    }
}
