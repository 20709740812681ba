//! Paired t-test for two measurements of the same cases.

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    fmt_p, ChartPoint, ChartSpec, Infeasible, PairedTable, TestResult, TestTable,
};

/// Per-row differences between two scale variables; t = mean difference
/// over its standard error, df = n−1. A pair is complete when both
/// variables are non-missing under their own missing codes.
pub fn paired_ttest(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let (first, second) = match selected {
        [a, b, ..] => (*a, *b),
        [a] => {
            let second = classify::partner_for(ds, a, &classify::scale_candidates(ds))
                .ok_or_else(|| {
                    Infeasible::new(
                        "Paired t-test requires two scale variables.",
                        "Select a second scale variable.",
                    )
                })?;
            (*a, second)
        }
        [] => classify::pick_pair(ds, &classify::scale_candidates(ds)).ok_or_else(|| {
            Infeasible::new(
                "Paired t-test requires two scale variables.",
                "Set two variables' measurement level to scale.",
            )
        })?,
    };

    let pairs = ds.paired_numeric(first, second);
    let n = pairs.len();
    if n < 3 {
        return Err(Infeasible::new(
            format!("Paired t-test requires at least 3 complete pairs; found {n}."),
            "Collect more rows with values for both variables.",
        ));
    }

    let diffs: Vec<f64> = pairs.iter().map(|(a, b)| a - b).collect();
    let mean_diff = numeric::mean(&diffs).unwrap_or(0.0);
    let sd_diff = numeric::std_dev(&diffs).unwrap_or(0.0);
    if sd_diff < 1e-300 {
        return Err(Infeasible::new(
            "The per-row differences have zero variance.",
            "The two variables move in lockstep; a paired test is uninformative.",
        ));
    }

    let df = n - 1;
    let t = mean_diff / (sd_diff / (n as f64).sqrt());
    let p = numeric::p_from_t(t, df as f64);

    let firsts: Vec<f64> = pairs.iter().map(|(a, _)| *a).collect();
    let seconds: Vec<f64> = pairs.iter().map(|(_, b)| *b).collect();
    let mean_first = numeric::mean(&firsts).unwrap_or(0.0);
    let mean_second = numeric::mean(&seconds).unwrap_or(0.0);

    let direction = if mean_diff > 0.0 { "higher" } else { "lower" };
    let insight = format!(
        "Mean({}) = {:.2}, Mean({}) = {:.2}; the first is {} by {:.3} on average. t({}) = {:.3}, {}.",
        first.label,
        mean_first,
        second.label,
        mean_second,
        direction,
        mean_diff.abs(),
        df,
        t,
        fmt_p(p)
    );

    let chart = ChartSpec::bar(
        "variable",
        "mean",
        vec![
            ChartPoint {
                label: first.label.clone(),
                value: mean_first,
            },
            ChartPoint {
                label: second.label.clone(),
                value: mean_second,
            },
        ],
    );

    Ok(TestResult::new(
        TestId::PairedTTest.as_str(),
        TestId::PairedTTest.display_name(),
        TestTable::Paired(PairedTable {
            first: first.label.clone(),
            second: second.label.clone(),
            n,
            mean_first,
            mean_second,
            mean_difference: mean_diff,
            sd_difference: sd_diff,
            t,
            df,
            p,
        }),
        insight,
    )
    .chart(chart)
    .key_stat(format!("t = {t:.3}"))
    .variables_analyzed(vec![first.name.clone(), second.name.clone()]))
}

// ── Tests ─────────────────────────────────────────────────────────────
