//! Benchmark scoring.
//!
//! All four systems walk the tree post-order. Rules whose result is a skip
//! kind (not selected, not applicable, informational, not checked)
//! contribute nothing and are not counted; children that contribute
//! nothing are dropped rather than folded into the accumulator.
//!
//! Both walks keep their own frame stack instead of using call recursion,
//! so arbitrarily deep group chains cannot overflow the call stack.

use crate::error::PolicyError;
use crate::types::item::{Benchmark, Item, ItemId, Rule};
use crate::types::result::{Score, TestResult};
use tracing::{debug, warn};

pub const SCORING_DEFAULT: &str = "urn:xccdf:scoring:default";
pub const SCORING_FLAT: &str = "urn:xccdf:scoring:flat";
pub const SCORING_FLAT_UNWEIGHTED: &str = "urn:xccdf:scoring:flat-unweighted";
pub const SCORING_ABSOLUTE: &str = "urn:xccdf:scoring:absolute";

/// Score the whole benchmark under the scoring system named by `system`.
pub fn score(
    benchmark: &Benchmark,
    test_result: &TestResult,
    system: &str,
) -> Result<Score, PolicyError> {
    match system {
        SCORING_DEFAULT => {
            let node = default_score(benchmark, benchmark.root(), test_result)
                .unwrap_or_default();
            Ok(Score {
                system: system.to_string(),
                score: node.score,
                maximum: 100.0,
            })
        }
        SCORING_FLAT => {
            let node = flat_score(benchmark, benchmark.root(), test_result, false)
                .unwrap_or_default();
            Ok(Score {
                system: system.to_string(),
                score: node.score,
                maximum: node.weight,
            })
        }
        SCORING_FLAT_UNWEIGHTED => {
            let node = flat_score(benchmark, benchmark.root(), test_result, true)
                .unwrap_or_default();
            Ok(Score {
                system: system.to_string(),
                score: node.score,
                maximum: node.weight,
            })
        }
        SCORING_ABSOLUTE => {
            let node = flat_score(benchmark, benchmark.root(), test_result, false)
                .unwrap_or_default();
            let absolute = node.weight > 0.0 && node.score == node.weight;
            Ok(Score {
                system: system.to_string(),
                score: if absolute { 1.0 } else { 0.0 },
                maximum: node.weight,
            })
        }
        other => {
            warn!(system = other, "scoring system is not supported");
            Err(PolicyError::UnknownScoringSystem(other.to_string()))
        }
    }
}

#[derive(Debug, Default)]
struct DefaultScore {
    score: f64,
    weight_score: f64,
    count: u32,
}

#[derive(Debug, Default)]
struct FlatScore {
    score: f64,
    weight: f64,
}

fn default_rule_score(rule: &Rule, test_result: &TestResult) -> Option<DefaultScore> {
    let Some(rule_result) = test_result.rule_result_by_id(&rule.id) else {
        debug!(rule = %rule.id, "no rule result, skipping in score");
        return None;
    };
    if !rule_result.result.counts_toward_score() {
        return None;
    }
    let score = if rule_result.result.is_passing() {
        100.0
    } else {
        0.0
    };
    Some(DefaultScore {
        score,
        weight_score: score * rule.weight,
        count: 1,
    })
}

fn flat_rule_score(rule: &Rule, test_result: &TestResult, unweighted: bool) -> Option<FlatScore> {
    let Some(rule_result) = test_result.rule_result_by_id(&rule.id) else {
        debug!(rule = %rule.id, "no rule result, skipping in score");
        return None;
    };
    if !rule_result.result.counts_toward_score() {
        return None;
    }
    let weight = if unweighted { 1.0 } else { rule.weight };
    let score = if rule_result.result.is_passing() {
        weight
    } else {
        0.0
    };
    Some(FlatScore { score, weight })
}

/// Default model: rules score 100/0, groups normalize the weighted sum of
/// their counted children. Post-order over an explicit frame stack.
fn default_score(
    benchmark: &Benchmark,
    root: ItemId,
    test_result: &TestResult,
) -> Option<DefaultScore> {
    struct Frame {
        item: ItemId,
        child: usize,
        sum: f64,
        accumulator: f64,
        count: u32,
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut current = Some(root);
    let mut finished: Option<DefaultScore> = None;

    loop {
        // Descend until a leaf (or a childless container) completes.
        while let Some(item_id) = current.take() {
            match benchmark.item(item_id) {
                Some(Item::Benchmark(_)) | Some(Item::Group(_)) => {
                    match benchmark.children(item_id).first() {
                        Some(first) => {
                            stack.push(Frame {
                                item: item_id,
                                child: 0,
                                sum: 0.0,
                                accumulator: 0.0,
                                count: 0,
                            });
                            current = Some(*first);
                        }
                        None => finished = Some(DefaultScore::default()),
                    }
                }
                Some(Item::Rule(rule)) => finished = default_rule_score(rule, test_result),
                _ => finished = None,
            }
        }

        let Some(frame) = stack.last_mut() else {
            return finished;
        };
        if let Some(child_score) = finished.take() {
            // Children contributing nothing are dropped, not folded.
            if child_score.count > 0 {
                let child_weight = benchmark
                    .children(frame.item)
                    .get(frame.child)
                    .and_then(|id| benchmark.item(*id))
                    .map(Item::weight);
                if let Some(child_weight) = child_weight {
                    frame.sum += child_score.weight_score;
                    frame.count += 1;
                    frame.accumulator += child_weight;
                }
            }
        }
        frame.child += 1;
        match benchmark.children(frame.item).get(frame.child) {
            Some(next) => current = Some(*next),
            None => {
                if let Some(done) = stack.pop() {
                    finished = benchmark.item(done.item).map(|item| {
                        let mut score = done.sum;
                        if done.count > 0 && done.accumulator > 0.0 {
                            score /= done.accumulator;
                        }
                        DefaultScore {
                            score,
                            weight_score: score * item.weight(),
                            count: done.count,
                        }
                    });
                }
            }
        }
    }
}

/// Flat model: a rule is worth its weight when passing; groups just sum.
/// The unweighted variant forces every rule's weight to 1. Same
/// explicit-stack post-order as the default model.
fn flat_score(
    benchmark: &Benchmark,
    root: ItemId,
    test_result: &TestResult,
    unweighted: bool,
) -> Option<FlatScore> {
    struct Frame {
        item: ItemId,
        child: usize,
        score: f64,
        weight: f64,
    }

    let mut stack: Vec<Frame> = Vec::new();
    let mut current = Some(root);
    let mut finished: Option<FlatScore> = None;

    loop {
        while let Some(item_id) = current.take() {
            match benchmark.item(item_id) {
                Some(Item::Benchmark(_)) | Some(Item::Group(_)) => {
                    match benchmark.children(item_id).first() {
                        Some(first) => {
                            stack.push(Frame {
                                item: item_id,
                                child: 0,
                                score: 0.0,
                                weight: 0.0,
                            });
                            current = Some(*first);
                        }
                        None => finished = Some(FlatScore::default()),
                    }
                }
                Some(Item::Rule(rule)) => {
                    finished = flat_rule_score(rule, test_result, unweighted)
                }
                _ => finished = None,
            }
        }

        let Some(frame) = stack.last_mut() else {
            return finished;
        };
        if let Some(child_score) = finished.take() {
            if child_score.weight != 0.0 {
                frame.score += child_score.score;
                frame.weight += child_score.weight;
            }
        }
        frame.child += 1;
        match benchmark.children(frame.item).get(frame.child) {
            Some(next) => current = Some(*next),
            None => {
                if let Some(done) = stack.pop() {
                    finished = Some(FlatScore {
                        score: done.score,
                        weight: done.weight,
                    });
                }
            }
        }
    }
}
