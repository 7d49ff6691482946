/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod builder;
mod duration;
mod node;
mod serial;

use crate::{condition::NormalizedCondition, query::Dialect, source::SourceAlert};

pub use builder::GraphBuilder;
pub use duration::duration_string;
pub use node::{EvaluationNode, MathExpr, NodeKind, RefId, RefIdGen, ReducerFunc, RuleGraph};
pub use serial::{
    AlertRule, Annotations, ExecErrState, NoDataState, NodeModel, RelativeTimeRange, RuleNode,
};

/// End-to-end migration of one source alert record into a provisionable
/// alert rule.
pub struct Migrator {
    dialect: Dialect,
    datasource_uid: String,
}

impl Migrator {
    pub fn new(dialect: Dialect, datasource_uid: String) -> Self {
        Self {
            dialect,
            datasource_uid,
        }
    }

    /// Migrate one record. Returns `None` for snoozed alerts and for
    /// records whose condition yields no evaluation graph.
    pub fn migrate(&self, alert: &SourceAlert) -> Option<AlertRule> {
        if alert.is_snoozed() {
            log::info!(
                "skipping snoozed alert {}",
                alert.name.as_deref().unwrap_or("(unnamed)")
            );
            return None;
        }
        let condition = NormalizedCondition::normalize(alert);
        let graph = GraphBuilder::new(self.dialect).build(&condition)?;
        let data = graph
            .nodes
            .iter()
            .map(|node| RuleNode::render(node, &self.datasource_uid))
            .collect();
        Some(AlertRule {
            uid: None,
            title: alert
                .name
                .clone()
                .unwrap_or_else(|| "Migrated Alert".to_string()),
            condition: graph.final_ref,
            data,
            no_data_state: NoDataState::NoData,
            exec_err_state: ExecErrState::Alerting,
            r#for: duration_string(alert.minutes),
            annotations: Annotations {
                description: alert.additional_information.clone().unwrap_or_default(),
                runbook_url: String::new(),
                summary: alert.name.clone().unwrap_or_default(),
            },
            labels: alert
                .tags
                .iter()
                .map(|tag| (format!("tag_{tag}"), tag.clone()))
                .collect(),
            is_paused: false,
        })
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::Migrator;
    use crate::{query::Dialect, source::SourceAlert};

    fn migrate(record: serde_json::Value) -> Option<serde_json::Value> {
        let alert = serde_json::from_value::<SourceAlert>(record).unwrap();
        Migrator::new(Dialect::Prometheus, "prom-uid".to_string())
            .migrate(&alert)
            .map(|rule| serde_json::to_value(rule).unwrap())
    }

    #[test]
    fn migrate_simple_alert() {
        let rule = migrate(json!({
            "id": "1459375928549",
            "name": "High CPU",
            "minutes": 90,
            "additionalInformation": "Check the host.",
            "tags": ["prod", "cpu"],
            "condition": "avg(ts(cpu.load)) > 80"
        }))
        .unwrap();
        assert_eq!(
            rule,
            json!({
                "title": "High CPU",
                "condition": "C",
                "data": [
                    {
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
                    },
                    {
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
                    },
                    {
                        "refId": "C",
                        "relativeTimeRange": { "from": 600, "to": 0 },
                        "datasourceUid": "__expr__",
                        "model": {
                            "conditions": [{
                                "evaluator": { "params": [80.0], "type": "gt" },
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
                    }
                ],
                "noDataState": "NoData",
                "execErrState": "Alerting",
                "for": "1h",
                "annotations": {
                    "description": "Check the host.",
                    "runbook_url": "",
                    "summary": "High CPU"
                },
                "labels": { "tag_cpu": "cpu", "tag_prod": "prod" },
                "isPaused": false
            })
        );
    }

    #[test]
    fn snoozed_alert_is_skipped() {
        assert_eq!(
            migrate(json!({
                "name": "Old alert",
                "condition": "ts(a) > 1",
                "status": "SNOOZED"
            })),
            None
        );
    }

    #[test]
    fn unnamed_alert_gets_default_title() {
        let rule = migrate(json!({ "condition": "ts(a) > 1" })).unwrap();
        assert_eq!(rule["title"], json!("Migrated Alert"));
        assert_eq!(rule["annotations"]["summary"], json!(""));
        assert_eq!(rule["for"], json!("5m"));
    }
}
