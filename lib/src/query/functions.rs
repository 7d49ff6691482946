/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use nom::{
    bytes::complete::tag,
    character::complete::{char, digit1, one_of, space0},
    combinator::recognize,
    sequence::{pair, tuple},
    IResult,
};

/// The single outer window / aggregation transform recognized in a
/// source expression. Detection is a priority-ordered keyword scan over
/// the whole expression: the first keyword that matches wins and
/// co-occurring keywords are not composed. Nested function calls are
/// therefore translated from their outer-priority match only; callers
/// depend on this single-match policy, so a future recursive matcher
/// must be swapped in here rather than layered on top.
#[derive(PartialEq, Eq, Clone, Debug)]
pub enum WindowFn {
    /// `mavg(<duration>, ts(...))`, carrying the window duration.
    MovingAverage(String),
    /// `rate(...)`, carrying the window duration (default `5m`).
    Rate(String),
    /// `percentile(<n>, ...)`; `None` when the percentile number is
    /// absent, in which case no transform is applied.
    Percentile(Option<u32>),
    Aggregate(AggregateFn),
    Derivative,
    Last,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AggregateFn {
    Avg,
    Sum,
    Max,
    Min,
    Count,
    StdDev,
}

impl WindowFn {
    pub fn detect(expr: &str) -> Option<Self> {
        let lower = expr.to_ascii_lowercase();
        if let Some(duration) = windowed_call(&lower, "mavg(") {
            Some(Self::MovingAverage(duration))
        } else if lower.contains("rate(") {
            Some(Self::Rate(
                windowed_call(&lower, "rate(").unwrap_or_else(|| "5m".to_string()),
            ))
        } else if let Some(rest) = substr_after(&lower, "percentile(") {
            Some(Self::Percentile(
                digit1::<_, nom::error::Error<&str>>(rest)
                    .ok()
                    .and_then(|(_, n)| n.parse().ok()),
            ))
        } else if lower.contains("avg(") {
            Some(Self::Aggregate(AggregateFn::Avg))
        } else if lower.contains("sum(") {
            Some(Self::Aggregate(AggregateFn::Sum))
        } else if lower.contains("max(") {
            Some(Self::Aggregate(AggregateFn::Max))
        } else if lower.contains("min(") {
            Some(Self::Aggregate(AggregateFn::Min))
        } else if lower.contains("count(") {
            Some(Self::Aggregate(AggregateFn::Count))
        } else if lower.contains("stddev(") {
            Some(Self::Aggregate(AggregateFn::StdDev))
        } else if lower.contains("deriv(") {
            Some(Self::Derivative)
        } else if lower.contains("last(") {
            Some(Self::Last)
        } else {
            None
        }
    }
}

/// Match `<keyword><digits><unit>, ts(` and return the duration, e.g.
/// `mavg(5m, ts(...)` yields `5m`.
fn windowed_call(lower: &str, keyword: &str) -> Option<String> {
    let rest = substr_after(lower, keyword)?;
    let parsed: IResult<&str, (&str, (char, &str, &str))> = pair(
        recognize(pair(digit1, one_of("smhd"))),
        tuple((char(','), space0, tag("ts("))),
    )(rest);
    let (_, (duration, _)) = parsed.ok()?;
    Some(duration.to_string())
}

fn substr_after<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    s.find(keyword).map(|i| &s[i + keyword.len()..])
}

/// Detect a `aliasMetric(..., "name")` rename. The rename is applied on
/// top of whatever transform fired, always last. Like the keyword scan
/// above this looks at the last quoted argument in the call, which is
/// where the literal name sits in practice.
pub fn rename_target(expr: &str) -> Option<&str> {
    let rest = substr_after(expr, "aliasMetric(")?;
    rest.rmatch_indices(',').find_map(|(i, _)| {
        let after = rest[i + 1..].trim_start();
        let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let inner = &after[1..];
        let end = inner.find(quote)?;
        (end > 0).then(|| &inner[..end])
    })
}
