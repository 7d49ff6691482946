/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Normalization of the free-text condition shape: one opaque string
// mixing selectors, comparators and logical connectives. The string is
// split on top-level `and` / `or` words; each segment yields one
// sub-query per selector construct, paired with the first numeric
// comparison found in the rest of the segment.

use super::{
    scan_threshold, ConditionShape, LogicalOp, NormalizedCondition, SeverityKey, SubQuery,
    SubQueryBody, SubQueryName, Threshold,
};
use crate::query::MetricSelector;

pub(super) fn normalize(condition: &str) -> NormalizedCondition {
    let (segments, combinators) = split_logical(condition);
    let mut sub_queries = Vec::new();
    let mut thresholds = Vec::new();

    let mut push = |sub_queries: &mut Vec<SubQuery>, expr: String, threshold: Threshold| {
        sub_queries.push(SubQuery {
            name: SubQueryName(format!("Q{}", sub_queries.len() + 1)),
            body: SubQueryBody::Expression(expr),
        });
        thresholds.push((SeverityKey::Synthetic(thresholds.len()), threshold));
    };

    for seg in &segments {
        let snippets = MetricSelector::snippets(seg);
        match snippets.as_slice() {
            [] => {}
            [range] => {
                let remainder = format!("{}{}", &seg[..range.start], &seg[range.end..]);
                push(
                    &mut sub_queries,
                    expression_text(seg, range.end),
                    segment_threshold(&remainder),
                );
            }
            many => {
                // Multiple selectors in one segment (arithmetic between
                // series): each becomes its own sub-query, all sharing
                // the segment's comparison.
                for range in many {
                    let remainder = format!("{}{}", &seg[..range.start], &seg[range.end..]);
                    push(
                        &mut sub_queries,
                        seg[range.clone()].to_string(),
                        segment_threshold(&remainder),
                    );
                }
            }
        }
    }

    if sub_queries.is_empty() && !condition.trim().is_empty() {
        // No selector anywhere: keep the whole condition verbatim so it
        // surfaces as an untranslatable marker instead of vanishing.
        push(
            &mut sub_queries,
            condition.trim().to_string(),
            segment_threshold(condition),
        );
    }

    NormalizedCondition {
        shape: ConditionShape::FreeText,
        sub_queries,
        thresholds,
        combinators,
        skip: false,
    }
}

/// Split on the logical connective words `and` / `or` (case
/// insensitive, whitespace-delimited), keeping the operators in
/// positional order.
fn split_logical(s: &str) -> (Vec<&str>, Vec<LogicalOp>) {
    let lower = s.to_ascii_lowercase();
    let mut segments = Vec::new();
    let mut ops = Vec::new();
    let mut seg_start = 0;
    while let Some((start, end, op)) = next_connective(&lower, seg_start) {
        segments.push(s[seg_start..start].trim());
        ops.push(op);
        seg_start = end;
    }
    segments.push(s[seg_start..].trim());
    (segments, ops)
}

fn next_connective(lower: &str, from: usize) -> Option<(usize, usize, LogicalOp)> {
    let mut best: Option<(usize, usize, LogicalOp)> = None;
    for (word, op) in [("and", LogicalOp::And), ("or", LogicalOp::Or)] {
        let mut search = from;
        while let Some(i) = lower[search..].find(word) {
            let start = search + i;
            let end = start + word.len();
            let delimited = start > from
                && lower.as_bytes()[start - 1].is_ascii_whitespace()
                && lower
                    .as_bytes()
                    .get(end)
                    .is_some_and(|b| b.is_ascii_whitespace());
            if delimited {
                if best.map_or(true, |(b, _, _)| start < b) {
                    best = Some((start, end, op));
                }
                break;
            }
            search = end;
        }
    }
    best
}

/// The sub-query expression is the segment up to its comparison (so
/// enclosing window functions around the selector are preserved). A
/// trailing comparator without a number is stripped as well.
fn expression_text(seg: &str, after: usize) -> String {
    let tail = &seg[after..];
    let cut = match scan_threshold(tail) {
        Some((pos, _, _)) => after + pos,
        None => tail
            .char_indices()
            .find_map(|(i, _)| {
                super::comparison_op(&tail[i..])
                    .ok()
                    .map(|_| after + i)
            })
            .unwrap_or(seg.len()),
    };
    seg[..cut].trim().to_string()
}

fn segment_threshold(remainder: &str) -> Threshold {
    scan_threshold(remainder)
        .map(|(_, op, value)| Threshold {
            referenced: None,
            op,
            value,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use ordered_float::NotNan;

    use super::{normalize, split_logical};
    use crate::condition::{ComparisonOp, LogicalOp, SubQueryBody, Threshold};

    fn expr(body: &SubQueryBody) -> &str {
        match body {
            SubQueryBody::Expression(e) => e,
            SubQueryBody::Alias(_) => panic!("expected expression"),
        }
    }

    #[test]
    fn split_keeps_operator_positions() {
        let (segments, ops) = split_logical("ts(a) > 1 and ts(b) < 2 or ts(c) = 3");
        assert_eq!(segments, vec!["ts(a) > 1", "ts(b) < 2", "ts(c) = 3"]);
        assert_eq!(ops, vec![LogicalOp::And, LogicalOp::Or]);
    }

    #[test]
    fn connective_words_inside_identifiers_are_kept() {
        let (segments, ops) = split_logical("ts(band.width) > 1");
        assert_eq!(segments, vec!["ts(band.width) > 1"]);
        assert_eq!(ops, vec![]);
    }

    #[test]
    fn single_segment_keeps_enclosing_function() {
        let cond = normalize("avg(ts(cpu.load)) > 80");
        assert_eq!(cond.sub_queries.len(), 1);
        assert_eq!(expr(&cond.sub_queries[0].body), "avg(ts(cpu.load))");
        assert_eq!(
            cond.thresholds[0].1,
            Threshold {
                referenced: None,
                op: ComparisonOp::Gt,
                value: NotNan::new(80.0).unwrap(),
            }
        );
    }

    #[test]
    fn chained_segments() {
        let cond = normalize("ts(a) > 1 and ts(b) < 2 or ts(c) = 3");
        assert_eq!(cond.sub_queries.len(), 3);
        assert_eq!(cond.combinators, vec![LogicalOp::And, LogicalOp::Or]);
        assert_eq!(cond.thresholds[1].1.op, ComparisonOp::Lt);
        assert_eq!(cond.thresholds[2].1.op, ComparisonOp::Eq);
    }

    #[test]
    fn arithmetic_between_series_splits_per_selector() {
        let cond = normalize("ts(a) + ts(b) > 5");
        assert_eq!(cond.sub_queries.len(), 2);
        assert_eq!(expr(&cond.sub_queries[0].body), "ts(a)");
        assert_eq!(expr(&cond.sub_queries[1].body), "ts(b)");
        assert_eq!(cond.thresholds[0].1.value, NotNan::new(5.0).unwrap());
        assert_eq!(cond.thresholds[1].1.value, NotNan::new(5.0).unwrap());
    }

    #[test]
    fn missing_threshold_defaults() {
        let cond = normalize("ts(heartbeat.age)");
        assert_eq!(cond.thresholds[0].1, Threshold::default());
        // Dangling comparator is stripped from the expression.
        let cond = normalize("ts(heartbeat.age) >");
        assert_eq!(expr(&cond.sub_queries[0].body), "ts(heartbeat.age)");
        assert_eq!(cond.thresholds[0].1, Threshold::default());
    }

    #[test]
    fn selector_free_condition_kept_verbatim() {
        let cond = normalize("external check failed");
        assert_eq!(cond.sub_queries.len(), 1);
        assert_eq!(expr(&cond.sub_queries[0].body), "external check failed");
    }
}
