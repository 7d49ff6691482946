/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// SQL-like dialect. The measurement name keeps its dots (it is emitted
// as a quoted string); the tag fragment is re-parsed into discrete
// key="value" pairs for the WHERE clause. This parse is deliberately
// independent from the verbatim pass-through of the label-matching
// dialect: the two target grammars inherited different handling of the
// same input and keeping them separate preserves parity with both.

use itertools::Itertools;
use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    sequence::{delimited, separated_pair},
    IResult,
};

use super::selector::MetricSelector;

pub fn translate(expr: &str) -> String {
    let Some(sel) = MetricSelector::find(expr) else {
        return format!("-- TODO: translate WQL: {expr}");
    };
    let mut text = format!(
        "SELECT {}(\"value\") FROM \"{}\"",
        select_function(expr),
        sel.metric
    );
    if let Some(tags) = &sel.tags {
        let pairs = tag_pairs(tags);
        if !pairs.is_empty() {
            text.push_str(" WHERE ");
            text.push_str(
                &pairs
                    .iter()
                    .map(|(k, v)| format!("\"{k}\"='{v}'"))
                    .join(" AND "),
            );
        }
    }
    text.push_str(" GROUP BY time($__interval) fill(null)");
    text
}

fn select_function(expr: &str) -> &'static str {
    if expr.contains("avg(") {
        "mean"
    } else if expr.contains("sum(") {
        "sum"
    } else if expr.contains("max(") {
        "max"
    } else if expr.contains("min(") {
        "min"
    } else {
        "mean"
    }
}

/// Extract every `key="value"` occurrence from the raw fragment,
/// skipping anything in between (connectives, stray parens).
fn tag_pairs(fragment: &str) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    let mut rest = fragment;
    while !rest.is_empty() {
        match tag_pair(rest) {
            Ok((r, pair)) => {
                pairs.push(pair);
                rest = r;
            }
            Err(_) => {
                let mut chars = rest.chars();
                chars.next();
                rest = chars.as_str();
            }
        }
    }
    pairs
}

fn tag_pair(s: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        char('='),
        delimited(char('"'), take_while1(|c| c != '"'), char('"')),
    )(s)
}

#[cfg(test)]
mod test {
    use super::translate;

    #[test]
    fn measurement_keeps_dots() {
        assert_eq!(
            translate("ts(a.b.c)"),
            r#"SELECT mean("value") FROM "a.b.c" GROUP BY time($__interval) fill(null)"#
        );
    }

    #[test]
    fn tags_reparsed_into_where_clause() {
        assert_eq!(
            translate(r#"ts(cpu.load, env="prod" and dc="eu")"#),
            r#"SELECT mean("value") FROM "cpu.load" WHERE "env"='prod' AND "dc"='eu' GROUP BY time($__interval) fill(null)"#
        );
    }

    #[test]
    fn aggregation_selects_function() {
        assert_eq!(
            translate("sum(ts(req.count))"),
            r#"SELECT sum("value") FROM "req.count" GROUP BY time($__interval) fill(null)"#
        );
        assert_eq!(
            translate("max(ts(cpu.load))"),
            r#"SELECT max("value") FROM "cpu.load" GROUP BY time($__interval) fill(null)"#
        );
    }

    #[test]
    fn untranslatable_marker() {
        assert_eq!(
            translate("some opaque text"),
            "-- TODO: translate WQL: some opaque text"
        );
    }
}
