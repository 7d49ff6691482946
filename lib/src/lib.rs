/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

pub(crate) mod condition;
pub(crate) mod error;
pub(crate) mod query;
pub(crate) mod rule;
pub(crate) mod source;

pub use condition::{
    ComparisonOp, ConditionShape, LogicalOp, NormalizedCondition, SeverityKey, SubQuery,
    SubQueryBody, SubQueryName, Threshold,
};
pub use error::{Error, Result};
pub use query::{translate, AggregateFn, Dialect, MetricSelector, TranslatedQuery, WindowFn};
pub use rule::{
    duration_string, AlertRule, Annotations, EvaluationNode, ExecErrState, GraphBuilder, MathExpr,
    Migrator, NoDataState, NodeKind, NodeModel, RefId, RefIdGen, ReducerFunc, RelativeTimeRange,
    RuleGraph, RuleNode,
};
pub use source::{AlertSource, ConditionForm, Severity, SeverityLabel, SourceAlert, Status};
