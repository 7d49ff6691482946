/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Wire format of the provisioning API's alert rule, written as emitted
// by POST /api/v1/provisioning/alert-rules. Expression nodes (reduce,
// threshold, math) run in the expression engine and carry the reserved
// `__expr__` datasource; only query nodes address the real datasource.

use std::collections::BTreeMap;

use ordered_float::NotNan;
use serde::Serialize;

use super::node::{EvaluationNode, MathExpr, NodeKind, RefId, ReducerFunc};
use crate::{condition::ComparisonOp, query::TranslatedQuery};

const EXPRESSION_UID: &str = "__expr__";
const INTERVAL_MS: u64 = 1000;
const MAX_DATA_POINTS: u64 = 43200;

#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub title: String,
    pub condition: RefId,
    pub data: Vec<RuleNode>,
    pub no_data_state: NoDataState,
    pub exec_err_state: ExecErrState,
    pub r#for: String,
    pub annotations: Annotations,
    pub labels: BTreeMap<String, String>,
    pub is_paused: bool,
}

#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum NoDataState {
    NoData,
}

#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub enum ExecErrState {
    Alerting,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct Annotations {
    pub description: String,
    pub runbook_url: String,
    pub summary: String,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RuleNode {
    pub ref_id: RefId,
    pub relative_time_range: RelativeTimeRange,
    pub datasource_uid: String,
    pub model: NodeModel,
}

#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
pub struct RelativeTimeRange {
    pub from: u64,
    pub to: u64,
}

impl Default for RelativeTimeRange {
    fn default() -> Self {
        Self { from: 600, to: 0 }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(untagged)]
pub enum NodeModel {
    Query(QueryModel),
    Reduce(ReduceModel),
    Threshold(ThresholdModel),
    Math(MathModel),
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryModel {
    pub datasource: DatasourceRef,
    /// Query text for label-matching datasources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    /// Query text for SQL-like datasources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_query: Option<bool>,
    pub instant: bool,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub ref_id: RefId,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct DatasourceRef {
    pub r#type: String,
    pub uid: String,
}

impl DatasourceRef {
    fn expression() -> Self {
        Self {
            r#type: EXPRESSION_UID.to_string(),
            uid: EXPRESSION_UID.to_string(),
        }
    }
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReduceModel {
    pub datasource: DatasourceRef,
    pub expression: RefId,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub reducer: ReducerFunc,
    pub ref_id: RefId,
    pub r#type: ExpressionType,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdModel {
    pub conditions: Vec<ThresholdCondition>,
    pub datasource: DatasourceRef,
    pub expression: RefId,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub ref_id: RefId,
    pub r#type: ExpressionType,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct ThresholdCondition {
    pub evaluator: Evaluator,
    pub operator: ConditionOperator,
    pub query: ConditionQuery,
    pub reducer: ConditionReducer,
    pub r#type: String,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Evaluator {
    pub params: Vec<NotNan<f64>>,
    pub r#type: ComparisonOp,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ConditionOperator {
    pub r#type: String,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
pub struct ConditionQuery {
    pub params: Vec<RefId>,
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct ConditionReducer {
    pub params: Vec<NotNan<f64>>,
    pub r#type: ReducerFunc,
}

#[derive(Serialize, PartialEq, Eq, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MathModel {
    pub datasource: DatasourceRef,
    pub expression: String,
    pub interval_ms: u64,
    pub max_data_points: u64,
    pub ref_id: RefId,
    pub r#type: ExpressionType,
}

#[derive(Serialize, PartialEq, Eq, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionType {
    Reduce,
    Threshold,
    Math,
}

impl RuleNode {
    pub(super) fn render(node: &EvaluationNode, datasource_uid: &str) -> Self {
        let (datasource_uid, model) = match &node.kind {
            NodeKind::Query(query) => (
                datasource_uid.to_string(),
                NodeModel::Query(render_query(query, node.ref_id, datasource_uid)),
            ),
            NodeKind::Reduce { func, input } => (
                EXPRESSION_UID.to_string(),
                NodeModel::Reduce(ReduceModel {
                    datasource: DatasourceRef::expression(),
                    expression: *input,
                    interval_ms: INTERVAL_MS,
                    max_data_points: MAX_DATA_POINTS,
                    reducer: *func,
                    ref_id: node.ref_id,
                    r#type: ExpressionType::Reduce,
                }),
            ),
            NodeKind::Threshold { op, value, input } => (
                EXPRESSION_UID.to_string(),
                NodeModel::Threshold(ThresholdModel {
                    conditions: vec![ThresholdCondition {
                        evaluator: Evaluator {
                            params: vec![*value],
                            r#type: *op,
                        },
                        operator: ConditionOperator {
                            r#type: "and".to_string(),
                        },
                        query: ConditionQuery {
                            params: vec![node.ref_id],
                        },
                        reducer: ConditionReducer {
                            params: Vec::new(),
                            r#type: ReducerFunc::Last,
                        },
                        r#type: "query".to_string(),
                    }],
                    datasource: DatasourceRef::expression(),
                    expression: *input,
                    interval_ms: INTERVAL_MS,
                    max_data_points: MAX_DATA_POINTS,
                    ref_id: node.ref_id,
                    r#type: ExpressionType::Threshold,
                }),
            ),
            NodeKind::Math(expr) => (
                EXPRESSION_UID.to_string(),
                NodeModel::Math(render_math(expr, node.ref_id)),
            ),
        };
        Self {
            ref_id: node.ref_id,
            relative_time_range: RelativeTimeRange::default(),
            datasource_uid,
            model,
        }
    }
}

fn render_query(query: &TranslatedQuery, ref_id: RefId, datasource_uid: &str) -> QueryModel {
    let sql_like = matches!(query.dialect, crate::query::Dialect::InfluxDb);
    QueryModel {
        datasource: DatasourceRef {
            r#type: query.dialect.to_string(),
            uid: datasource_uid.to_string(),
        },
        expr: (!sql_like).then(|| query.text.clone()),
        query: sql_like.then(|| query.text.clone()),
        raw_query: sql_like.then_some(true),
        instant: true,
        interval_ms: INTERVAL_MS,
        max_data_points: MAX_DATA_POINTS,
        ref_id,
    }
}

fn render_math(expr: &MathExpr, ref_id: RefId) -> MathModel {
    MathModel {
        datasource: DatasourceRef::expression(),
        expression: expr.to_string(),
        interval_ms: INTERVAL_MS,
        max_data_points: MAX_DATA_POINTS,
        ref_id,
        r#type: ExpressionType::Math,
    }
}

#[cfg(test)]
mod test {
    use ordered_float::NotNan;
    use serde_json::json;

    use super::RuleNode;
    use crate::{
        condition::ComparisonOp,
        query::{Dialect, TranslatedQuery},
        rule::node::{EvaluationNode, NodeKind, ReducerFunc},
    };

    #[test]
    fn query_node_wire_format() {
        let node = EvaluationNode {
            ref_id: "A".parse().unwrap(),
            kind: NodeKind::Query(TranslatedQuery {
                dialect: Dialect::Prometheus,
                text: "avg(cpu_load)".to_string(),
            }),
        };
        assert_eq!(
            serde_json::to_value(RuleNode::render(&node, "prom-uid")).unwrap(),
            json!({
                "refId": "A",
                "relativeTimeRange": { "from": 600, "to": 0 },
                "datasourceUid": "prom-uid",
                "model": {
                    "datasource": { "type": "prometheus", "uid": "prom-uid" },
                    "expr": "avg(cpu_load)",
                    "instant": true,
                    "intervalMs": 1000,
                    "maxDataPoints": 43200,
                    "refId": "A"
                }
            })
        );
    }

    #[test]
    fn sql_like_query_node_uses_raw_query() {
        let node = EvaluationNode {
            ref_id: "A".parse().unwrap(),
            kind: NodeKind::Query(TranslatedQuery {
                dialect: Dialect::InfluxDb,
                text: "SELECT 1".to_string(),
            }),
        };
        let value = serde_json::to_value(RuleNode::render(&node, "influx-uid")).unwrap();
        assert_eq!(value["model"]["query"], json!("SELECT 1"));
        assert_eq!(value["model"]["rawQuery"], json!(true));
        assert!(value["model"].get("expr").is_none());
    }

    #[test]
    fn reduce_node_wire_format() {
        let node = EvaluationNode {
            ref_id: "B".parse().unwrap(),
            kind: NodeKind::Reduce {
                func: ReducerFunc::Mean,
                input: "A".parse().unwrap(),
            },
        };
        assert_eq!(
            serde_json::to_value(RuleNode::render(&node, "prom-uid")).unwrap(),
            json!({
                "refId": "B",
                "relativeTimeRange": { "from": 600, "to": 0 },
                "datasourceUid": "__expr__",
                "model": {
                    "datasource": { "type": "__expr__", "uid": "__expr__" },
                    "expression": "A",
                    "intervalMs": 1000,
                    "maxDataPoints": 43200,
                    "reducer": "mean",
                    "refId": "B",
                    "type": "reduce"
                }
            })
        );
    }

    #[test]
    fn threshold_node_wire_format() {
        let node = EvaluationNode {
            ref_id: "C".parse().unwrap(),
            kind: NodeKind::Threshold {
                op: ComparisonOp::Gte,
                value: NotNan::new(80.5).unwrap(),
                input: "B".parse().unwrap(),
            },
        };
        assert_eq!(
            serde_json::to_value(RuleNode::render(&node, "prom-uid")).unwrap(),
            json!({
                "refId": "C",
                "relativeTimeRange": { "from": 600, "to": 0 },
                "datasourceUid": "__expr__",
                "model": {
                    "conditions": [{
                        "evaluator": { "params": [80.5], "type": "gte" },
                        "operator": { "type": "and" },
                        "query": { "params": ["C"] },
                        "reducer": { "params": [], "type": "last" },
                        "type": "query"
                    }],
                    "datasource": { "type": "__expr__", "uid": "__expr__" },
                    "expression": "B",
                    "intervalMs": 1000,
                    "maxDataPoints": 43200,
                    "refId": "C",
                    "type": "threshold"
                }
            })
        );
    }
}
