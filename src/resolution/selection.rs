//! Effective rule selection for one policy.
//!
//! A depth-first walk of the benchmark carries the parent's selection state
//! down the tree: a deselected group forces all its transitive rules to be
//! unselected no matter what the profile says about them individually. The
//! resulting map holds exactly one entry per reachable rule, in benchmark
//! pre-order, which is also the order rule results are emitted in.

use crate::types::item::{Benchmark, Item, ItemId};
use crate::types::profile::Profile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub item_id: String,
    pub selected: bool,
}

/// Rule-id ordered selection list plus a hash index for O(1) lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionMap {
    entries: Vec<SelectionEntry>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl SelectionMap {
    /// Walk the benchmark and compute the effective selection under
    /// `profile` (`None` for the default policy).
    pub fn resolve(benchmark: &Benchmark, profile: Option<&Profile>) -> Self {
        let mut map = SelectionMap::default();
        for child in benchmark.children(benchmark.root()) {
            resolve_item(benchmark, profile, *child, true, &mut map);
        }
        map
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Option<bool> {
        if let Some(pos) = self.index.get(item_id) {
            return Some(self.entries[*pos].selected);
        }
        // Index can be empty after deserialization; fall back to a scan.
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.selected)
    }

    /// Rules absent from the map are not selected.
    pub fn is_selected(&self, item_id: &str) -> bool {
        self.get(item_id).unwrap_or(false)
    }

    /// Insert or overwrite one entry. New entries append at the end.
    pub fn set(&mut self, item_id: &str, selected: bool) {
        match self.index.get(item_id) {
            Some(pos) => self.entries[*pos].selected = selected,
            None => {
                self.index.insert(item_id.to_string(), self.entries.len());
                self.entries.push(SelectionEntry {
                    item_id: item_id.to_string(),
                    selected,
                });
            }
        }
    }
}

fn resolve_item(
    benchmark: &Benchmark,
    profile: Option<&Profile>,
    item_id: ItemId,
    parent_selected: bool,
    map: &mut SelectionMap,
) {
    let Some(item) = benchmark.item(item_id) else {
        return;
    };
    match item {
        Item::Rule(rule) => {
            let own = profile
                .and_then(|p| p.select_for(&rule.id))
                .unwrap_or(rule.selected);
            map.set(&rule.id, parent_selected && own);
        }
        Item::Group(group) => {
            // A deselected parent wins over any profile select below it.
            let selected = parent_selected
                && profile
                    .and_then(|p| p.select_for(&group.id))
                    .unwrap_or(group.selected);
            for child in benchmark.children(item_id) {
                resolve_item(benchmark, profile, *child, selected, map);
            }
        }
        Item::Value(_) | Item::Benchmark(_) => {}
    }
}
