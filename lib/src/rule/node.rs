/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{
    condition::{ComparisonOp, LogicalOp},
    error::Error,
    query::TranslatedQuery,
};
use ordered_float::NotNan;

/// Reference id of an evaluation node, a single uppercase letter.
#[derive(
    SerializeDisplay, DeserializeFromStr, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug,
)]
pub struct RefId(char);

impl FromStr for RefId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => Ok(Self(c)),
            _ => Err(Error::InvalidRefId(s.to_string())),
        }
    }
}

impl Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential ref id allocator, starting at `A` with no gaps. Yields
/// `None` once the single-letter space runs out; ids must stay unique
/// within one rule, so callers drop the record instead of reusing a
/// letter.
pub struct RefIdGen(char);

impl RefIdGen {
    pub fn new() -> Self {
        Self('A')
    }

    pub fn next(&mut self) -> Option<RefId> {
        if self.0 > 'Z' {
            log::warn!("evaluation graph exceeds 26 nodes; dropping the rule");
            return None;
        }
        let id = RefId(self.0);
        self.0 = (self.0 as u8 + 1) as char;
        Some(id)
    }
}

impl Default for RefIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Series-to-scalar reduction applied between a query node and its
/// threshold.
#[derive(
    SerializeDisplay, DeserializeFromStr, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Debug,
)]
pub enum ReducerFunc {
    Mean,
    Sum,
    Max,
    Min,
    Count,
    StdDev,
    Median,
    First,
    Last,
}

impl ReducerFunc {
    /// Infer the reducer from the function keywords of a source
    /// expression. First match wins; expressions without a recognized
    /// aggregation reduce to the most recent value.
    pub fn infer(expr: &str) -> Self {
        let lower = expr.to_ascii_lowercase();
        if lower.contains("avg(") {
            Self::Mean
        } else if lower.contains("sum(") {
            Self::Sum
        } else if lower.contains("max(") {
            Self::Max
        } else if lower.contains("min(") {
            Self::Min
        } else if lower.contains("count(") {
            Self::Count
        } else if lower.contains("stddev(") {
            Self::StdDev
        } else if lower.contains("median(") {
            Self::Median
        } else if lower.contains("first(") {
            Self::First
        } else {
            Self::Last
        }
    }
}

impl FromStr for ReducerFunc {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mean" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "max" => Ok(Self::Max),
            "min" => Ok(Self::Min),
            "count" => Ok(Self::Count),
            "stdDev" => Ok(Self::StdDev),
            "median" => Ok(Self::Median),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            _ => Err(Error::InvalidReducer(s.to_string())),
        }
    }
}

impl Display for ReducerFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mean => write!(f, "mean"),
            Self::Sum => write!(f, "sum"),
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
            Self::Count => write!(f, "count"),
            Self::StdDev => write!(f, "stdDev"),
            Self::Median => write!(f, "median"),
            Self::First => write!(f, "first"),
            Self::Last => write!(f, "last"),
        }
    }
}

/// Expression of a math node, in the rule sink's `$REF` syntax.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MathExpr {
    Combine {
        lhs: RefId,
        op: LogicalOp,
        rhs: RefId,
    },
    /// Pass-through of another node's value.
    Alias(RefId),
    /// Literal zero, standing in for an unresolvable reference.
    Zero,
}

impl Display for MathExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Combine { lhs, op, rhs } => write!(f, "${lhs} {op} ${rhs}"),
            Self::Alias(r) => write!(f, "${r}"),
            Self::Zero => write!(f, "0"),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub struct EvaluationNode {
    pub ref_id: RefId,
    pub kind: NodeKind,
}

#[derive(PartialEq, Eq, Clone, Debug)]
pub enum NodeKind {
    Query(TranslatedQuery),
    Reduce {
        func: ReducerFunc,
        input: RefId,
    },
    Threshold {
        op: ComparisonOp,
        value: NotNan<f64>,
        input: RefId,
    },
    Math(MathExpr),
}

/// Dialect-independent evaluation graph of one migrated rule. Node
/// order is emission order; `final_ref` names the node whose boolean
/// result fires the alert.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RuleGraph {
    pub nodes: Vec<EvaluationNode>,
    pub final_ref: RefId,
}

#[cfg(test)]
mod test {
    use super::{MathExpr, RefId, RefIdGen, ReducerFunc};
    use crate::condition::LogicalOp;

    #[test]
    fn ref_ids_are_sequential() {
        let mut gen = RefIdGen::new();
        assert_eq!(gen.next().unwrap().to_string(), "A");
        assert_eq!(gen.next().unwrap().to_string(), "B");
        assert_eq!(gen.next().unwrap().to_string(), "C");
    }

    #[test]
    fn ref_id_space_is_bounded() {
        let mut gen = RefIdGen::new();
        let ids = (0..26)
            .map(|_| gen.next().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids.first().unwrap(), "A");
        assert_eq!(ids.last().unwrap(), "Z");
        assert_eq!(gen.next(), None);
    }

    #[test]
    fn ref_id_parsing() {
        assert!("A".parse::<RefId>().is_ok());
        assert!("a".parse::<RefId>().is_err());
        assert!("AB".parse::<RefId>().is_err());
        assert!("".parse::<RefId>().is_err());
    }

    #[test]
    fn reducer_inference() {
        assert_eq!(ReducerFunc::infer("avg(ts(cpu.load))"), ReducerFunc::Mean);
        // The `avg(` substring of `mavg(` selects the mean as well.
        assert_eq!(
            ReducerFunc::infer("mavg(5m, ts(cpu.load))"),
            ReducerFunc::Mean
        );
        assert_eq!(ReducerFunc::infer("stddev(ts(a))"), ReducerFunc::StdDev);
        assert_eq!(ReducerFunc::infer("ts(a)"), ReducerFunc::Last);
    }

    #[test]
    fn math_expression_syntax() {
        let expr = MathExpr::Combine {
            lhs: "C".parse().unwrap(),
            op: LogicalOp::And,
            rhs: "F".parse().unwrap(),
        };
        assert_eq!(expr.to_string(), "$C && $F");
        assert_eq!(MathExpr::Alias("A".parse().unwrap()).to_string(), "$A");
        assert_eq!(MathExpr::Zero.to_string(), "0");
    }
}
