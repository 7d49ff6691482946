/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

use std::ops::Range;

use nom::{
    bytes::complete::{tag, take_while1},
    character::complete::{char, space0},
    combinator::opt,
    error::{Error, ErrorKind},
    sequence::{preceded, tuple},
    IResult,
};

/// A single `ts(metric.path[, tag-fragment])` construct extracted from a
/// source query expression. The metric path keeps its dot-separated
/// form; dialect-specific rewriting happens at translation time.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MetricSelector {
    pub metric: String,
    pub tags: Option<String>,
}

impl MetricSelector {
    /// Find the first selector construct in an expression. Returns
    /// `None` when the expression contains no selector; the caller is
    /// expected to degrade to a marker string, not to fail.
    pub fn find(expr: &str) -> Option<Self> {
        expr.match_indices("ts(").find_map(|(i, _)| {
            at_boundary(expr, i)
                .then(|| parse_selector(&expr[i..]).ok().map(|(_, sel)| sel))
                .flatten()
        })
    }

    /// Byte ranges of every well-formed selector construct in an
    /// expression, in order of occurrence.
    pub fn snippets(expr: &str) -> Vec<Range<usize>> {
        expr.match_indices("ts(")
            .filter_map(|(i, _)| {
                at_boundary(expr, i)
                    .then(|| {
                        parse_selector(&expr[i..])
                            .ok()
                            .map(|(rest, _)| i..expr.len() - rest.len())
                    })
                    .flatten()
            })
            .collect()
    }
}

/// The `ts(` keyword must not be the tail of a longer identifier (as in
/// `counts(`).
fn at_boundary(expr: &str, i: usize) -> bool {
    expr[..i]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphanumeric() && c != '_')
}

fn parse_selector(s: &str) -> IResult<&str, MetricSelector> {
    let (s, _) = tag("ts(")(s)?;
    let (s, metric) = take_while1(is_metric_char)(s)?;
    let (s, tags) = opt(preceded(tuple((char(','), space0)), tag_fragment))(s)?;
    let (s, _) = char(')')(s)?;
    Ok((
        s,
        MetricSelector {
            metric: metric.to_string(),
            tags: tags.filter(|t| !t.is_empty()).map(str::to_string),
        },
    ))
}

fn is_metric_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

/// Take everything up to the selector's own closing parenthesis,
/// tracking nesting so a fragment may itself contain balanced parens.
fn tag_fragment(s: &str) -> IResult<&str, &str> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' if depth == 0 => return Ok((&s[i..], s[..i].trim_end())),
            ')' => depth -= 1,
            _ => {}
        }
    }
    Err(nom::Err::Error(Error::new(s, ErrorKind::TakeUntil)))
}

#[cfg(test)]
mod test {
    use super::MetricSelector;

    #[test]
    fn bare_selector() {
        assert_eq!(
            MetricSelector::find("ts(cpu.load.avg)"),
            Some(MetricSelector {
                metric: "cpu.load.avg".to_string(),
                tags: None
            })
        );
    }

    #[test]
    fn selector_with_tags() {
        assert_eq!(
            MetricSelector::find(r#"ts(cpu.load, env="prod" and dc="eu")"#),
            Some(MetricSelector {
                metric: "cpu.load".to_string(),
                tags: Some(r#"env="prod" and dc="eu""#.to_string())
            })
        );
    }

    #[test]
    fn selector_inside_function() {
        assert_eq!(
            MetricSelector::find(r#"avg(ts(disk.used, host="db-1"))"#),
            Some(MetricSelector {
                metric: "disk.used".to_string(),
                tags: Some(r#"host="db-1""#.to_string())
            })
        );
    }

    #[test]
    fn no_selector() {
        assert_eq!(MetricSelector::find("counts(other.metric)"), None);
        assert_eq!(MetricSelector::find("plain text"), None);
    }

    #[test]
    fn snippet_ranges() {
        let expr = "ts(a.b) + ts(c.d)";
        let ranges = MetricSelector::snippets(expr);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&expr[ranges[0].clone()], "ts(a.b)");
        assert_eq!(&expr[ranges[1].clone()], "ts(c.d)");
    }

    #[test]
    fn fragment_with_nested_parens() {
        assert_eq!(
            MetricSelector::find(r#"sum(ts(req.count, not (env="dev")))"#),
            Some(MetricSelector {
                metric: "req.count".to_string(),
                tags: Some(r#"not (env="dev")"#.to_string())
            })
        );
    }
}
