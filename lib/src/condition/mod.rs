/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

mod freetext;
mod structured;

use std::{fmt::Display, str::FromStr};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, space0},
    combinator::{map_opt, opt, recognize, value},
    sequence::{pair, preceded, tuple},
    IResult,
};
use ordered_float::NotNan;

use crate::{
    error::Error,
    source::{ConditionForm, Severity, SourceAlert},
};

/// Common intermediate model both source condition shapes normalize
/// into. Sub-query order is declaration order; threshold entries keep
/// their own stable order so graph construction is deterministic.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct NormalizedCondition {
    pub shape: ConditionShape,
    pub sub_queries: Vec<SubQuery>,
    pub thresholds: Vec<(SeverityKey, Threshold)>,
    /// Logical operators at their original positions in the free-text
    /// shape, used for combinator wiring.
    pub combinators: Vec<LogicalOp>,
    /// True when the source alert is administratively silenced; no
    /// graph may be built.
    pub skip: bool,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ConditionShape {
    FreeText,
    Structured,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SubQuery {
    pub name: SubQueryName,
    pub body: SubQueryBody,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum SubQueryBody {
    /// A real query expression, to be translated.
    Expression(String),
    /// A pure reference to another sub-query's result. `None` encodes
    /// an unresolvable (forward or unknown) reference, which degrades
    /// to a literal zero at graph-build time.
    Alias(Option<SubQueryName>),
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Threshold {
    pub referenced: Option<SubQueryName>,
    pub op: ComparisonOp,
    pub value: NotNan<f64>,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            referenced: None,
            op: ComparisonOp::Gt,
            value: NotNan::new(0.0).unwrap(),
        }
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Debug)]
pub enum SeverityKey {
    Named(Severity),
    /// Positional key for thresholds of the free-text shape, which has
    /// no severity names.
    Synthetic(usize),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Debug)]
pub struct SubQueryName(String);

impl FromStr for SubQueryName {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        (!s.is_empty())
            .then(|| Self(s.to_string()))
            .ok_or_else(|| Error::InvalidSubQueryName(s.to_string()))
    }
}

impl Display for SubQueryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug)]
pub enum LogicalOp {
    And,
    Or,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

/// Comparison operator of a threshold node, in the rule sink's
/// evaluator vocabulary.
#[derive(
    serde_with::SerializeDisplay,
    serde_with::DeserializeFromStr,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    Debug,
)]
pub enum ComparisonOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl FromStr for ComparisonOp {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            _ => Err(Error::InvalidComparisonOp(s.to_string())),
        }
    }
}

impl Display for ComparisonOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gt => write!(f, "gt"),
            Self::Gte => write!(f, "gte"),
            Self::Lt => write!(f, "lt"),
            Self::Lte => write!(f, "lte"),
            Self::Eq => write!(f, "eq"),
            Self::Neq => write!(f, "neq"),
        }
    }
}

impl NormalizedCondition {
    pub fn normalize(alert: &SourceAlert) -> Self {
        if alert.is_snoozed() {
            return Self::skipped();
        }
        match &alert.condition {
            ConditionForm::FreeText { condition } => freetext::normalize(condition),
            ConditionForm::Structured {
                alert_sources,
                conditions,
            } => structured::normalize(alert_sources, conditions),
        }
    }

    fn skipped() -> Self {
        Self {
            shape: ConditionShape::FreeText,
            sub_queries: Vec::new(),
            thresholds: Vec::new(),
            combinators: Vec::new(),
            skip: true,
        }
    }
}

/// Parse a comparison token. Source tokens `=` and `==` both map to
/// equality.
pub(crate) fn comparison_op(s: &str) -> IResult<&str, ComparisonOp> {
    alt((
        value(ComparisonOp::Gte, tag(">=")),
        value(ComparisonOp::Lte, tag("<=")),
        value(ComparisonOp::Neq, tag("!=")),
        value(ComparisonOp::Eq, tag("==")),
        value(ComparisonOp::Gt, tag(">")),
        value(ComparisonOp::Lt, tag("<")),
        value(ComparisonOp::Eq, tag("=")),
    ))(s)
}

/// Parse a threshold literal: optional sign, digits, optional decimal
/// part. NaN cannot occur by construction.
pub(crate) fn literal(s: &str) -> IResult<&str, NotNan<f64>> {
    map_opt(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        |t: &str| t.parse::<f64>().ok().and_then(|v| NotNan::new(v).ok()),
    )(s)
}

/// Find the first comparator followed by a numeric literal anywhere in
/// the text, returning its byte offset along with the parsed parts.
/// Comparators without a trailing number (including `=` inside quoted
/// tag values) are skipped.
pub(crate) fn scan_threshold(s: &str) -> Option<(usize, ComparisonOp, NotNan<f64>)> {
    s.char_indices().find_map(|(i, _)| {
        let (rest, op) = comparison_op(&s[i..]).ok()?;
        let (_, v) = preceded(space0, literal)(rest).ok()?;
        Some((i, op, v))
    })
}

#[cfg(test)]
mod test {
    use ordered_float::NotNan;

    use super::{scan_threshold, ComparisonOp};

    #[test]
    fn scan_finds_first_numeric_comparison() {
        let (pos, op, v) = scan_threshold(r#"ts(cpu.load, env="prod") >= 80.5"#).unwrap();
        assert_eq!(pos, 25);
        assert_eq!(op, ComparisonOp::Gte);
        assert_eq!(v, NotNan::new(80.5).unwrap());
    }

    #[test]
    fn scan_skips_equals_in_quoted_tags() {
        // The `=` inside the fragment is followed by a quote, not a
        // number, and must not be taken for a threshold.
        assert!(scan_threshold(r#"ts(cpu.load, env="prod")"#).is_none());
    }

    #[test]
    fn scan_token_mapping() {
        assert_eq!(scan_threshold("x == 3").unwrap().1, ComparisonOp::Eq);
        assert_eq!(scan_threshold("x != 3").unwrap().1, ComparisonOp::Neq);
        assert_eq!(scan_threshold("x < -2.5").unwrap().1, ComparisonOp::Lt);
    }
}
