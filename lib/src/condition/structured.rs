/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Normalization of the structured condition shape: named sub-queries
// plus per-severity threshold expressions. Sub-query bodies may embed
// `${Name}` references to earlier sub-queries; these are expanded
// in declaration order, so a reference always sees the fully expanded
// text of its target. Forward and unknown references expand to the
// literal `0`.

use std::collections::BTreeMap;

use nom::{character::complete::space0, sequence::separated_pair, IResult};
use ordered_float::NotNan;

use super::{
    comparison_op, literal, ComparisonOp, ConditionShape, NormalizedCondition, SeverityKey,
    SubQuery, SubQueryBody, SubQueryName, Threshold,
};
use crate::source::{AlertSource, SeverityLabel};

pub(super) fn normalize(
    sources: &[AlertSource],
    conditions: &BTreeMap<SeverityLabel, String>,
) -> NormalizedCondition {
    let mut sub_queries = Vec::new();
    let mut expanded = BTreeMap::<SubQueryName, String>::new();

    for source in sources {
        let Ok(name) = source.name.parse::<SubQueryName>() else {
            log::warn!("skipping sub-query with empty name: {:?}", source.query);
            continue;
        };
        let body = match pure_alias(&source.query) {
            Some(target) => {
                let target_text = expanded.get(&target).cloned();
                let resolved = target_text.is_some().then_some(target);
                expanded.insert(
                    name.clone(),
                    target_text.unwrap_or_else(|| "0".to_string()),
                );
                SubQueryBody::Alias(resolved)
            }
            None => {
                let text = substitute(&source.query, &expanded);
                expanded.insert(name.clone(), text.clone());
                SubQueryBody::Expression(text)
            }
        };
        sub_queries.push(SubQuery { name, body });
    }

    // Custom severity labels keep their thresholds under positional
    // keys; they sort after the known severities, so they never shadow
    // the severe/warn priority.
    let thresholds = conditions
        .iter()
        .enumerate()
        .map(|(index, (label, text))| {
            let key = match label {
                SeverityLabel::Known(severity) => SeverityKey::Named(*severity),
                SeverityLabel::Other(_) => SeverityKey::Synthetic(index),
            };
            (key, parse_threshold(text))
        })
        .collect();

    NormalizedCondition {
        shape: ConditionShape::Structured,
        sub_queries,
        thresholds,
        combinators: Vec::new(),
        skip: false,
    }
}

/// A body that is nothing but a single `${Name}` reference.
fn pure_alias(text: &str) -> Option<SubQueryName> {
    let inner = text.trim().strip_prefix("${")?.strip_suffix('}')?;
    (!inner.contains('}') && !inner.contains("${"))
        .then(|| inner.parse().ok())
        .flatten()
}

/// Replace every `${Name}` occurrence with the already expanded text of
/// the named sub-query, or `0` when the name is unknown at this point.
fn substitute(text: &str, expanded: &BTreeMap<SubQueryName, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find("${") {
        out.push_str(&rest[..i]);
        match rest[i + 2..].find('}') {
            Some(j) => {
                let target = rest[i + 2..i + 2 + j].parse::<SubQueryName>().ok();
                match target.as_ref().and_then(|n| expanded.get(n)) {
                    Some(t) => out.push_str(t),
                    None => out.push('0'),
                }
                rest = &rest[i + 2 + j + 1..];
            }
            None => {
                // Unterminated reference: keep the tail as-is.
                out.push_str(&rest[i..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Parse a per-severity condition of the form `${Name} <op> <number>`.
/// A bare reference without comparison degrades to the default
/// comparison; anything else degrades to the default threshold.
fn parse_threshold(text: &str) -> Threshold {
    let t = text.trim();
    let Some((name, tail)) = t
        .strip_prefix("${")
        .and_then(|rest| rest.split_once('}'))
        .and_then(|(inner, tail)| Some((inner.parse::<SubQueryName>().ok()?, tail)))
    else {
        return Threshold::default();
    };
    let parsed: IResult<&str, (ComparisonOp, NotNan<f64>)> =
        separated_pair(comparison_op, space0, literal)(tail.trim_start());
    match parsed {
        Ok((_, (op, value))) => Threshold {
            referenced: Some(name),
            op,
            value,
        },
        Err(_) => Threshold {
            referenced: Some(name),
            ..Threshold::default()
        },
    }
}
