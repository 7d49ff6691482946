/******************************************************************************
 * Copyright ContinuousC. Licensed under the "Elastic License 2.0".           *
 ******************************************************************************/

// Label-matching dialect. Metric path dots become underscores (label
// identifiers forbid dots); the tag fragment is passed through verbatim
// into the braces syntax, without key/value validation.

use super::{
    functions::{rename_target, AggregateFn, WindowFn},
    selector::MetricSelector,
};

pub fn translate(expr: &str) -> String {
    let Some(sel) = MetricSelector::find(expr) else {
        return format!("# TODO: translate WQL: {expr}");
    };
    let metric = sel.metric.replace('.', "_");
    let mut text = match &sel.tags {
        Some(tags) => format!("{metric}{{{tags}}}"),
        None => metric,
    };
    match WindowFn::detect(expr) {
        Some(WindowFn::MovingAverage(d)) => text = format!("avg_over_time({text}[{d}])"),
        Some(WindowFn::Rate(d)) => text = format!("rate({text}[{d}])"),
        Some(WindowFn::Percentile(Some(p))) => {
            text = format!("quantile({}, {text})", p as f64 / 100.0)
        }
        Some(WindowFn::Aggregate(f)) => text = format!("{}({text})", aggregate_name(f)),
        Some(WindowFn::Derivative) => text = format!("deriv({text}[5m])"),
        Some(WindowFn::Last) => text = format!("last_over_time({text}[5m])"),
        Some(WindowFn::Percentile(None)) | None => {}
    }
    if let Some(name) = rename_target(expr) {
        text = format!("label_replace({text}, \"__name__\", \"{name}\", \"\", \"\")");
    }
    text
}

fn aggregate_name(f: AggregateFn) -> &'static str {
    match f {
        AggregateFn::Avg => "avg",
        AggregateFn::Sum => "sum",
        AggregateFn::Max => "max",
        AggregateFn::Min => "min",
        AggregateFn::Count => "count",
        AggregateFn::StdDev => "stddev",
    }
}

#[cfg(test)]
mod test {
    use super::translate;

    #[test]
    fn dots_become_underscores() {
        assert_eq!(translate("ts(a.b.c)"), "a_b_c");
    }

    #[test]
    fn tags_pass_through_verbatim() {
        assert_eq!(
            translate(r#"ts(cpu.load, env="prod" and dc="eu")"#),
            r#"cpu_load{env="prod" and dc="eu"}"#
        );
    }

    #[test]
    fn window_functions() {
        assert_eq!(
            translate("mavg(5m, ts(cpu.load))"),
            "avg_over_time(cpu_load[5m])"
        );
        assert_eq!(translate("rate(ts(req.count))"), "rate(req_count[5m])");
        assert_eq!(
            translate("percentile(95, ts(api.latency))"),
            "quantile(0.95, api_latency)"
        );
        assert_eq!(translate("avg(ts(cpu.load))"), "avg(cpu_load)");
        assert_eq!(translate("deriv(ts(queue.size))"), "deriv(queue_size[5m])");
        assert_eq!(
            translate("last(ts(heartbeat.age))"),
            "last_over_time(heartbeat_age[5m])"
        );
    }

    #[test]
    fn rename_wraps_last() {
        assert_eq!(
            translate(r#"aliasMetric(avg(ts(cpu.load)), "cpu")"#),
            r#"label_replace(avg(cpu_load), "__name__", "cpu", "", "")"#
        );
    }

    #[test]
    fn untranslatable_marker() {
        assert_eq!(
            translate("some opaque text"),
            "# TODO: translate WQL: some opaque text"
        );
    }
}
