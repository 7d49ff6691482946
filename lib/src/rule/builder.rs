/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Evaluation graph construction. The free-text shape expands to one
// query / reduce / threshold triple per sub-condition, chained by math
// nodes; the structured shape maps sub-queries to query (or math) nodes
// directly, with one threshold node per severity. Ref ids are assigned
// sequentially in emission order, so repeated builds of the same record
// yield identical graphs.

use std::collections::BTreeMap;

use super::node::{EvaluationNode, MathExpr, NodeKind, RefId, RefIdGen, ReducerFunc, RuleGraph};
use crate::{
    condition::{ConditionShape, LogicalOp, NormalizedCondition, SubQueryBody, SubQueryName},
    query::{self, Dialect},
    source::Severity,
};

pub struct GraphBuilder {
    dialect: Dialect,
}

impl GraphBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Build the evaluation graph for a normalized condition. Returns
    /// `None` for silenced or empty conditions.
    pub fn build(&self, condition: &NormalizedCondition) -> Option<RuleGraph> {
        if condition.skip {
            return None;
        }
        match condition.shape {
            ConditionShape::FreeText => self.build_chained(condition),
            ConditionShape::Structured => self.build_structured(condition),
        }
    }

    fn build_chained(&self, condition: &NormalizedCondition) -> Option<RuleGraph> {
        let mut gen = RefIdGen::new();
        let mut nodes = Vec::new();
        let mut terminals = Vec::new();

        for (sub, (_, threshold)) in condition.sub_queries.iter().zip(&condition.thresholds) {
            let SubQueryBody::Expression(expr) = &sub.body else {
                continue;
            };
            let query_ref = gen.next()?;
            nodes.push(EvaluationNode {
                ref_id: query_ref,
                kind: NodeKind::Query(query::translate(expr, self.dialect)),
            });
            let reduce_ref = gen.next()?;
            nodes.push(EvaluationNode {
                ref_id: reduce_ref,
                kind: NodeKind::Reduce {
                    func: ReducerFunc::infer(expr),
                    input: query_ref,
                },
            });
            let threshold_ref = gen.next()?;
            nodes.push(EvaluationNode {
                ref_id: threshold_ref,
                kind: NodeKind::Threshold {
                    op: threshold.op,
                    value: threshold.value,
                    input: reduce_ref,
                },
            });
            terminals.push(threshold_ref);
        }

        if terminals.len() > 1 && condition.combinators.len() != terminals.len() - 1 {
            log::warn!(
                "{} connectives for {} sub-conditions; missing ones default to &&",
                condition.combinators.len(),
                terminals.len()
            );
        }

        let mut terminals = terminals.into_iter();
        let mut current = terminals.next()?;
        for (i, rhs) in terminals.enumerate() {
            let op = condition
                .combinators
                .get(i)
                .copied()
                .unwrap_or(LogicalOp::And);
            let combine_ref = gen.next()?;
            nodes.push(EvaluationNode {
                ref_id: combine_ref,
                kind: NodeKind::Math(MathExpr::Combine {
                    lhs: current,
                    op,
                    rhs,
                }),
            });
            current = combine_ref;
        }

        Some(RuleGraph {
            nodes,
            final_ref: current,
        })
    }

    fn build_structured(&self, condition: &NormalizedCondition) -> Option<RuleGraph> {
        let mut gen = RefIdGen::new();
        let mut nodes = Vec::new();
        let mut by_name = BTreeMap::<&SubQueryName, RefId>::new();

        for sub in &condition.sub_queries {
            let ref_id = gen.next()?;
            let kind = match &sub.body {
                SubQueryBody::Expression(expr) => {
                    NodeKind::Query(query::translate(expr, self.dialect))
                }
                SubQueryBody::Alias(Some(target)) => match by_name.get(target) {
                    Some(r) => NodeKind::Math(MathExpr::Alias(*r)),
                    None => NodeKind::Math(MathExpr::Zero),
                },
                SubQueryBody::Alias(None) => NodeKind::Math(MathExpr::Zero),
            };
            nodes.push(EvaluationNode { ref_id, kind });
            by_name.insert(&sub.name, ref_id);
        }

        let last_source = nodes.last().map(|n| n.ref_id);
        let mut thresholds = Vec::new();
        for (key, threshold) in &condition.thresholds {
            let input = threshold
                .referenced
                .as_ref()
                .and_then(|n| by_name.get(n).copied())
                .or(last_source)
                .or_else(|| RefIdGen::new().next())?;
            let ref_id = gen.next()?;
            nodes.push(EvaluationNode {
                ref_id,
                kind: NodeKind::Threshold {
                    op: threshold.op,
                    value: threshold.value,
                    input,
                },
            });
            thresholds.push((key, ref_id));
        }

        // The severest defined threshold decides the alert; rules with
        // thresholds but no recognized severity fall back to the last
        // threshold, and threshold-free rules to the last node.
        let named = |severity: Severity| {
            thresholds
                .iter()
                .find(|(key, _)| {
                    matches!(key, crate::condition::SeverityKey::Named(s) if *s == severity)
                })
                .map(|(_, r)| *r)
        };
        let final_ref = named(Severity::Severe)
            .or_else(|| named(Severity::Warn))
            .or_else(|| thresholds.last().map(|(_, r)| *r))
            .or_else(|| nodes.last().map(|n| n.ref_id))?;

        Some(RuleGraph {
            nodes,
            final_ref,
        })
    }
}
