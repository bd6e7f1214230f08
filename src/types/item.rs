//! Benchmark item tree.
//!
//! Items live in an arena indexed by [`ItemId`]; the parent link is a
//! back-index, never an owning reference, so the policy layer can walk both
//! directions without reference cycles. The tree is treated as immutable
//! once a policy model is built: tailoring and evaluation clone items
//! instead of mutating them.

use super::check::Check;
use super::common::{RuleRole, Severity, ValueOperator, ValueType};
use super::profile::Profile;
use crate::applicability::cpe::{CpeDict, CpeLangModel};
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arena index of an item inside its benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(usize);

/// Remediation text attached to a rule, cloned into rule results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub system: Option<String>,
    pub content: String,
}

/// External identifier of a rule (e.g. a CCE or CVE reference).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub system: String,
    pub name: String,
}

/// One concrete value of a Value element, keyed by an optional selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInstance {
    pub selector: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub weight: f64,
    pub platforms: Vec<String>,
    pub selected: bool,
    pub version: Option<String>,
    pub severity: Severity,
    pub role: RuleRole,
    pub checks: Vec<Check>,
    pub complex_checks: Vec<Check>,
    pub fixes: Vec<Fix>,
    pub idents: Vec<Ident>,
}

impl Rule {
    pub fn new(id: impl Into<String>) -> Self {
        Rule {
            id: id.into(),
            weight: 1.0,
            platforms: Vec::new(),
            selected: true,
            version: None,
            severity: Severity::default(),
            role: RuleRole::default(),
            checks: Vec::new(),
            complex_checks: Vec::new(),
            fixes: Vec::new(),
            idents: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.push(platform.into());
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_role(mut self, role: RuleRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_complex_check(mut self, check: Check) -> Self {
        self.complex_checks.push(check);
        self
    }

    pub fn with_fix(mut self, system: Option<&str>, content: impl Into<String>) -> Self {
        self.fixes.push(Fix {
            system: system.map(str::to_string),
            content: content.into(),
        });
        self
    }

    pub fn with_ident(mut self, system: impl Into<String>, name: impl Into<String>) -> Self {
        self.idents.push(Ident {
            system: system.into(),
            name: name.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub weight: f64,
    pub platforms: Vec<String>,
    pub selected: bool,
    pub children: Vec<ItemId>,
}

impl Group {
    pub fn new(id: impl Into<String>) -> Self {
        Group {
            id: id.into(),
            weight: 1.0,
            platforms: Vec::new(),
            selected: true,
            children: Vec::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platforms.push(platform.into());
        self
    }

    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    pub id: String,
    pub weight: f64,
    pub value_type: ValueType,
    pub operator: ValueOperator,
    pub instances: Vec<ValueInstance>,
}

impl Value {
    pub fn new(id: impl Into<String>, value_type: ValueType) -> Self {
        Value {
            id: id.into(),
            weight: 1.0,
            value_type,
            operator: ValueOperator::default(),
            instances: Vec::new(),
        }
    }

    pub fn with_operator(mut self, operator: ValueOperator) -> Self {
        self.operator = operator;
        self
    }

    pub fn with_instance(mut self, selector: Option<&str>, value: impl Into<String>) -> Self {
        self.instances.push(ValueInstance {
            selector: selector.map(str::to_string),
            value: value.into(),
        });
        self
    }

    /// Instance matching the given selector, `None` selector meaning the
    /// default instance.
    pub fn instance_by_selector(&self, selector: Option<&str>) -> Option<&ValueInstance> {
        self.instances
            .iter()
            .find(|i| i.selector.as_deref() == selector)
    }
}

/// Root node of the tree. Platforms on the root apply to the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRoot {
    pub id: String,
    pub weight: f64,
    pub platforms: Vec<String>,
    pub children: Vec<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Benchmark(BenchmarkRoot),
    Group(Group),
    Rule(Rule),
    Value(Value),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Benchmark(b) => &b.id,
            Item::Group(g) => &g.id,
            Item::Rule(r) => &r.id,
            Item::Value(v) => &v.id,
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Item::Benchmark(b) => b.weight,
            Item::Group(g) => g.weight,
            Item::Rule(r) => r.weight,
            Item::Value(v) => v.weight,
        }
    }

    pub fn platforms(&self) -> &[String] {
        match self {
            Item::Benchmark(b) => &b.platforms,
            Item::Group(g) => &g.platforms,
            Item::Rule(r) => &r.platforms,
            Item::Value(_) => &[],
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Item::Rule(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ItemNode {
    parent: Option<ItemId>,
    item: Item,
}

/// The benchmark document: item arena plus the document-level collateral the
/// policy layer consumes (profiles, plain-text blocks, embedded CPE models).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benchmark {
    items: Vec<ItemNode>,
    root: ItemId,
    #[serde(skip)]
    index: HashMap<String, ItemId>,
    pub schema_version: String,
    pub profiles: Vec<Profile>,
    pub plain_texts: HashMap<String, String>,
    pub embedded_cpe_dict: Option<CpeDict>,
    pub embedded_cpe_lang_model: Option<CpeLangModel>,
}

impl Benchmark {
    pub fn new(id: impl Into<String>) -> Self {
        Benchmark {
            items: vec![ItemNode {
                parent: None,
                item: Item::Benchmark(BenchmarkRoot {
                    id: id.into(),
                    weight: 1.0,
                    platforms: Vec::new(),
                    children: Vec::new(),
                }),
            }],
            root: ItemId(0),
            index: HashMap::new(),
            schema_version: "1.2".to_string(),
            profiles: Vec::new(),
            plain_texts: HashMap::new(),
            embedded_cpe_dict: None,
            embedded_cpe_lang_model: None,
        }
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_plain_text(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.plain_texts.insert(id.into(), text.into());
        self
    }

    pub fn with_embedded_cpe_dict(mut self, dict: CpeDict) -> Self {
        self.embedded_cpe_dict = Some(dict);
        self
    }

    pub fn with_embedded_cpe_lang_model(mut self, lang_model: CpeLangModel) -> Self {
        self.embedded_cpe_lang_model = Some(lang_model);
        self
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.0).map(|node| &node.item)
    }

    pub fn parent(&self, id: ItemId) -> Option<ItemId> {
        self.items.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: ItemId) -> &[ItemId] {
        match self.items.get(id.0).map(|node| &node.item) {
            Some(Item::Benchmark(b)) => &b.children,
            Some(Item::Group(g)) => &g.children,
            _ => &[],
        }
    }

    pub fn add_group(&mut self, parent: ItemId, group: Group) -> Result<ItemId, PolicyError> {
        self.attach(parent, Item::Group(group))
    }

    pub fn add_rule(&mut self, parent: ItemId, rule: Rule) -> Result<ItemId, PolicyError> {
        self.attach(parent, Item::Rule(rule))
    }

    pub fn add_value(&mut self, parent: ItemId, value: Value) -> Result<ItemId, PolicyError> {
        self.attach(parent, Item::Value(value))
    }

    fn attach(&mut self, parent: ItemId, item: Item) -> Result<ItemId, PolicyError> {
        let id = ItemId(self.items.len());
        match self.items.get_mut(parent.0).map(|node| &mut node.item) {
            Some(Item::Benchmark(b)) => b.children.push(id),
            Some(Item::Group(g)) => g.children.push(id),
            Some(other) => return Err(PolicyError::InvalidParent(other.id().to_string())),
            None => {
                return Err(PolicyError::Internal(format!(
                    "parent index {} out of bounds",
                    parent.0
                )))
            }
        }
        self.items.push(ItemNode {
            parent: Some(parent),
            item,
        });
        self.index.clear();
        Ok(id)
    }

    /// Rebuild the id index and verify id uniqueness. Called when a policy
    /// model takes ownership of the benchmark.
    pub fn resolve(&mut self) -> Result<(), PolicyError> {
        let mut index = HashMap::with_capacity(self.items.len());
        for (pos, node) in self.items.iter().enumerate() {
            if index
                .insert(node.item.id().to_string(), ItemId(pos))
                .is_some()
            {
                return Err(PolicyError::DuplicateItem(node.item.id().to_string()));
            }
        }
        self.index = index;
        Ok(())
    }

    /// Look an item up by its string id. Falls back to a linear scan when
    /// the index has not been rebuilt since the last mutation.
    pub fn find(&self, id: &str) -> Option<ItemId> {
        if !self.index.is_empty() {
            return self.index.get(id).copied();
        }
        self.items
            .iter()
            .position(|node| node.item.id() == id)
            .map(ItemId)
    }

    /// Item ids in pre-order, the order rule results are emitted in.
    pub fn iter_pre_order(&self) -> Vec<ItemId> {
        let mut out = Vec::with_capacity(self.items.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }
}
