//! Descriptive tests: frequencies, descriptive statistics, and the
//! missing-value summary.

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    round1, Cell, ChartPoint, ChartSpec, DescriptiveRow, FrequencyRow, Infeasible, MissingRow,
    TestResult, TestTable,
};

// ── Frequencies ───────────────────────────────────────────────────────

/// Counts and percentages per distinct value of one variable, with an
/// explicit "(missing)" bucket. Percentages are over all rows, so they
/// sum to 100 within rounding.
pub fn frequencies(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let var = selected
        .first()
        .copied()
        .or_else(|| classify::categorical_candidates(ds).first().copied())
        .or_else(|| classify::scale_candidates(ds).first().copied())
        .ok_or_else(|| {
            Infeasible::new(
                "No variable is available for a frequency table.",
                "Add at least one variable included in analysis.",
            )
        })?;

    let total = ds.row_count();
    if total == 0 {
        return Err(Infeasible::new(
            "The dataset has no rows.",
            "Load data before running analyses.",
        ));
    }

    let observations = ds.category_observations(var);
    let mut order: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for obs in &observations {
        match order.iter().position(|c| c == obs) {
            Some(i) => counts[i] += 1,
            None => {
                order.push(obs.clone());
                counts.push(1);
            }
        }
    }
    let missing = total - observations.len();

    let mut rows: Vec<FrequencyRow> = order
        .iter()
        .zip(counts.iter())
        .map(|(cat, &count)| FrequencyRow {
            value: var.display_label(cat),
            count,
            percent: round1(100.0 * count as f64 / total as f64),
        })
        .collect();
    if missing > 0 {
        rows.push(FrequencyRow {
            value: "(missing)".into(),
            count: missing,
            percent: round1(100.0 * missing as f64 / total as f64),
        });
    }

    let chart = ChartSpec::bar(
        "value",
        "count",
        rows.iter()
            .map(|r| ChartPoint {
                label: r.value.clone(),
                value: r.count as f64,
            })
            .collect(),
    );

    let insight = match rows.iter().max_by_key(|r| r.count) {
        Some(top) => format!(
            "Most common value of '{}' is '{}' ({} of {} rows, {}%).",
            var.label, top.value, top.count, total, top.percent
        ),
        None => format!("'{}' has no observations.", var.label),
    };

    let mut maps = std::collections::BTreeMap::new();
    if !var.value_labels.is_empty() {
        maps.insert(var.name.clone(), var.value_labels.clone());
    }

    Ok(TestResult::new(
        TestId::Frequencies.as_str(),
        TestId::Frequencies.display_name(),
        TestTable::Frequencies(rows),
        insight,
    )
    .chart(chart)
    .variables_analyzed(vec![var.name.clone()])
    .value_label_maps(maps))
}

// ── Descriptives ──────────────────────────────────────────────────────

/// N, mean, SD, min, max per scale variable. SD renders "—" below two
/// observations; all four statistics render "—" at zero.
pub fn descriptives(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let vars: Vec<&Variable> = if selected.is_empty() {
        classify::scale_candidates(ds)
    } else {
        selected.to_vec()
    };
    if vars.is_empty() {
        return Err(Infeasible::new(
            "No scale variables are available to describe.",
            "Set at least one variable's measurement level to scale.",
        ));
    }

    let mut rows = Vec::with_capacity(vars.len());
    let mut best: Option<(&str, f64)> = None;
    for var in &vars {
        let obs = ds.numeric_observations(var);
        let n = obs.len();
        let m = numeric::mean(&obs);
        if let Some(m) = m {
            if best.map_or(true, |(_, b)| m > b) {
                best = Some((&var.label, m));
            }
        }
        let (min, max) = if n == 0 {
            (None, None)
        } else {
            (
                Some(obs.iter().cloned().fold(f64::INFINITY, f64::min)),
                Some(obs.iter().cloned().fold(f64::NEG_INFINITY, f64::max)),
            )
        };
        rows.push(DescriptiveRow {
            variable: var.label.clone(),
            n,
            mean: Cell::stat(m),
            sd: Cell::stat(numeric::std_dev(&obs)),
            min: Cell::stat(min),
            max: Cell::stat(max),
        });
    }

    let insight = match best {
        Some((label, m)) => format!(
            "Described {} variable(s); '{}' has the highest mean ({:.3}).",
            rows.len(),
            label,
            m
        ),
        None => format!(
            "Described {} variable(s); none has numeric observations.",
            rows.len()
        ),
    };

    Ok(TestResult::new(
        TestId::Descriptives.as_str(),
        TestId::Descriptives.display_name(),
        TestTable::Descriptives(rows),
        insight,
    )
    .variables_analyzed(vars.iter().map(|v| v.name.clone()).collect()))
}

// ── Missing summary ───────────────────────────────────────────────────

/// Missing count and percentage per variable under the dataset-wide
/// missing rule, flagging variables above 30%.
pub fn missing_summary(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let vars: Vec<&Variable> = if selected.is_empty() {
        classify::included(ds)
    } else {
        selected.to_vec()
    };
    if vars.is_empty() {
        return Err(Infeasible::new(
            "The dataset has no variables to summarize.",
            "Load data before running analyses.",
        ));
    }

    let rows: Vec<MissingRow> = vars
        .iter()
        .map(|var| {
            let pct = ds.missing_percent(var);
            MissingRow {
                variable: var.label.clone(),
                missing: ds.missing_count(var),
                percent: round1(pct),
                flagged: pct > 30.0,
            }
        })
        .collect();

    let flagged = rows.iter().filter(|r| r.flagged).count();
    let worst = rows
        .iter()
        .max_by(|a, b| {
            a.percent
                .partial_cmp(&b.percent)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .filter(|r| r.missing > 0);
    let insight = match worst {
        Some(w) => format!(
            "{} of {} variable(s) exceed 30% missing; highest is '{}' ({}%).",
            flagged,
            rows.len(),
            w.variable,
            w.percent
        ),
        None => format!("No missing values detected across {} variable(s).", rows.len()),
    };

    Ok(TestResult::new(
        TestId::MissingSummary.as_str(),
        TestId::MissingSummary.display_name(),
        TestTable::MissingSummary(rows),
        insight,
    )
    .variables_analyzed(vars.iter().map(|v| v.name.clone()).collect()))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MeasurementLevel, Value};

    fn sample() -> Dataset {
        let vars = vec![
            Variable::new("color", MeasurementLevel::Nominal)
                .value_label("r", "Red")
                .value_label("b", "Blue"),
            Variable::new("score", MeasurementLevel::Scale).missing_codes(["99"]),
        ];
        let rows = vec![
            Dataset::row(&[("color", Value::text("r")), ("score", Value::Number(1.0))]),
            Dataset::row(&[("color", Value::text("r")), ("score", Value::Number(2.0))]),
            Dataset::row(&[("color", Value::text("b")), ("score", Value::Number(99.0))]),
            Dataset::row(&[("color", Value::Null), ("score", Value::Number(4.0))]),
        ];
        Dataset::new(vars, rows).unwrap()
    }

    #[test]
    fn frequencies_include_missing_bucket() {
        let ds = sample();
        let var = ds.variable("color").unwrap();
        let r = frequencies(&ds, &[var]).unwrap();
        let TestTable::Frequencies(rows) = &r.table else {
            panic!("wrong table");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].value, "Red");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[2].value, "(missing)");
        let sum: f64 = rows.iter().map(|r| r.percent).sum();
        assert!((sum - 100.0).abs() < 0.1);
    }

    #[test]
    fn frequencies_insight_names_top_value() {
        let ds = sample();
        let var = ds.variable("color").unwrap();
        let r = frequencies(&ds, &[var]).unwrap();
        assert!(r.insight.contains("Red"));
        assert!(r.chart.is_some());
        assert!(r.value_label_maps.is_some());
    }

    #[test]
    fn frequencies_infeasible_without_rows() {
        let vars = vec![Variable::new("x", MeasurementLevel::Nominal)];
        let ds = Dataset::new(vars, Vec::new()).unwrap();
        let var = ds.variable("x").unwrap();
        let inf = frequencies(&ds, &[var]).unwrap_err();
        assert!(inf.requirement.contains("no rows"));
    }

    #[test]
    fn descriptives_missing_codes_excluded() {
        let ds = sample();
        let var = ds.variable("score").unwrap();
        let r = descriptives(&ds, &[var]).unwrap();
        let TestTable::Descriptives(rows) = &r.table else {
            panic!("wrong table");
        };
        // 99 is a missing code: observations are 1, 2, 4
        assert_eq!(rows[0].n, 3);
        assert_eq!(rows[0].mean, Cell::Number(2.333));
        assert_eq!(rows[0].min, Cell::Number(1.0));
        assert_eq!(rows[0].max, Cell::Number(4.0));
    }

    #[test]
    fn descriptives_sd_sentinel_below_two_obs() {
        let vars = vec![Variable::new("x", MeasurementLevel::Scale)];
        let rows = vec![Dataset::row(&[("x", Value::Number(5.0))])];
        let ds = Dataset::new(vars, rows).unwrap();
        let var = ds.variable("x").unwrap();
        let r = descriptives(&ds, &[var]).unwrap();
        let TestTable::Descriptives(rows) = &r.table else {
            panic!("wrong table");
        };
        assert_eq!(rows[0].sd, Cell::Missing);
        assert_eq!(rows[0].mean, Cell::Number(5.0));
    }

    #[test]
    fn missing_summary_counts_match_missing_rule() {
        let ds = sample();
        let r = missing_summary(&ds, &[]).unwrap();
        let TestTable::MissingSummary(rows) = &r.table else {
            panic!("wrong table");
        };
        let score = rows.iter().find(|r| r.variable == "score").unwrap();
        assert_eq!(score.missing, 1);
        assert_eq!(score.percent, 25.0);
        assert!(!score.flagged);
    }

    #[test]
    fn missing_summary_flags_over_30_percent() {
        let vars = vec![Variable::new("x", MeasurementLevel::Scale)];
        let rows = vec![
            Dataset::row(&[("x", Value::Number(1.0))]),
            Dataset::row(&[("x", Value::Null)]),
            Dataset::row(&[("x", Value::Null)]),
        ];
        let ds = Dataset::new(vars, rows).unwrap();
        let r = missing_summary(&ds, &[]).unwrap();
        let TestTable::MissingSummary(rows) = &r.table else {
            panic!("wrong table");
        };
        assert!(rows[0].flagged);
        assert!(r.insight.contains("1 of 1"));
    }
}
