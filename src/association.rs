//! Bivariate association tests: crosstab with chi-square (plus Fisher's
//! exact for 2×2), and Pearson / Spearman correlation.
//!
//! All extraction is pairwise-complete: a row participates when both
//! chosen variables are non-missing under the dataset-wide missing rule.

use std::collections::BTreeMap;

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    fmt_p, Cell, ChartPoint, ChartSpec, CorrelationTable, CrosstabRow, CrosstabTable,
    EffectFamily, Infeasible, TestResult, TestTable,
};

// ── Crosstab & chi-square ─────────────────────────────────────────────

pub fn crosstab(ds: &Dataset, selected: &[&Variable]) -> Result<TestResult, Infeasible> {
    let (row_var, col_var) = match selected {
        [a, b, ..] => (*a, *b),
        [a] => {
            let partner = classify::partner_for(ds, a, &classify::categorical_candidates(ds))
                .ok_or_else(|| {
                    Infeasible::new(
                        "Crosstab requires two categorical variables.",
                        "Select a second nominal or ordinal variable.",
                    )
                })?;
            (*a, partner)
        }
        [] => classify::pick_pair(ds, &classify::categorical_candidates(ds)).ok_or_else(|| {
            Infeasible::new(
                "Crosstab requires two categorical variables.",
                "Set two variables' measurement level to nominal or ordinal.",
            )
        })?,
    };

    let pairs = ds.paired_categories(row_var, col_var);
    let total = pairs.len();
    if total == 0 {
        return Err(Infeasible::new(
            "No rows have values for both variables.",
            "Check the missing codes declared on the selected variables.",
        ));
    }

    // Categories in first-appearance order
    let mut row_cats: Vec<String> = Vec::new();
    let mut col_cats: Vec<String> = Vec::new();
    for (r, c) in &pairs {
        if !row_cats.contains(r) {
            row_cats.push(r.clone());
        }
        if !col_cats.contains(c) {
            col_cats.push(c.clone());
        }
    }
    let (r, c) = (row_cats.len(), col_cats.len());
    for (var, k) in [(row_var, r), (col_var, c)] {
        if k < 2 {
            return Err(Infeasible::new(
                format!("'{}' has only {} observed category.", var.label, k),
                "Choose variables with at least two categories each.",
            ));
        }
    }

    let mut counts = vec![vec![0usize; c]; r];
    for (rv, cv) in &pairs {
        let i = row_cats.iter().position(|x| x == rv).unwrap_or(0);
        let j = col_cats.iter().position(|x| x == cv).unwrap_or(0);
        counts[i][j] += 1;
    }
    let row_totals: Vec<usize> = counts.iter().map(|row| row.iter().sum()).collect();
    let col_totals: Vec<usize> = (0..c).map(|j| counts.iter().map(|row| row[j]).sum()).collect();

    let mut chi_square = 0.0;
    for i in 0..r {
        for j in 0..c {
            let expected = row_totals[i] as f64 * col_totals[j] as f64 / total as f64;
            if expected > 0.0 {
                let diff = counts[i][j] as f64 - expected;
                chi_square += diff * diff / expected;
            }
        }
    }
    let df = (r - 1) * (c - 1);
    let p = numeric::chi_square_p(chi_square, df as f64);

    let fisher_p = if r == 2 && c == 2 {
        numeric::fisher_exact_2x2(
            counts[0][0] as u64,
            counts[0][1] as u64,
            counts[1][0] as u64,
            counts[1][1] as u64,
        )
    } else {
        None
    };

    let cramers_v = (chi_square / (total as f64 * (r.min(c) - 1) as f64)).sqrt();

    let table_rows: Vec<CrosstabRow> = row_cats
        .iter()
        .zip(counts.iter())
        .zip(row_totals.iter())
        .map(|((cat, row), &rt)| CrosstabRow {
            category: row_var.display_label(cat),
            counts: row.clone(),
            total: rt,
        })
        .collect();

    let mut insight = format!(
        "Chi-square = {:.3} (df = {}), {}; the association is {} (Cramér's V = {:.3}).",
        chi_square,
        df,
        fmt_p(p),
        effect_phrase(cramers_v),
        cramers_v
    );
    if let Some(fp) = fisher_p {
        insight.push_str(&format!(" Fisher's exact test: {}.", fmt_p(fp)));
    }

    let mut maps = BTreeMap::new();
    for var in [row_var, col_var] {
        if !var.value_labels.is_empty() {
            maps.insert(var.name.clone(), var.value_labels.clone());
        }
    }

    let key_stat = format!("χ² = {chi_square:.3}");
    Ok(TestResult::new(
        TestId::Crosstab.as_str(),
        TestId::Crosstab.display_name(),
        TestTable::Crosstab(CrosstabTable {
            row_variable: row_var.label.clone(),
            col_variable: col_var.label.clone(),
            col_categories: col_cats.iter().map(|c| col_var.display_label(c)).collect(),
            rows: table_rows,
            col_totals,
            total,
            chi_square,
            df,
            p,
            fisher_p,
            cramers_v,
        }),
        insight,
    )
    .key_stat(key_stat)
    .effect_size(EffectFamily::CramersV, cramers_v)
    .variables_analyzed(vec![row_var.name.clone(), col_var.name.clone()])
    .value_label_maps(maps))
}

fn effect_phrase(v: f64) -> String {
    use crate::output::effect_size_label;
    effect_size_label(EffectFamily::CramersV, v).to_string()
}

// ── Correlation ───────────────────────────────────────────────────────

/// Correlation method selector shared by the two handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMethod {
    Pearson,
    Spearman,
}

pub fn correlation(
    ds: &Dataset,
    selected: &[&Variable],
    method: CorrelationMethod,
) -> Result<TestResult, Infeasible> {
    let test_id = match method {
        CorrelationMethod::Pearson => TestId::PearsonCorrelation,
        CorrelationMethod::Spearman => TestId::SpearmanCorrelation,
    };
    let (x_var, y_var) = match selected {
        [a, b, ..] => (*a, *b),
        [a] => {
            let cands = classify::scale_candidates(ds);
            let others: Vec<&Variable> = cands
                .iter()
                .copied()
                .filter(|v| v.name != a.name)
                .collect();
            let y = classify::preferred_outcome(&others).ok_or_else(|| {
                Infeasible::new(
                    "Correlation requires two scale variables.",
                    "Select a second scale variable.",
                )
            })?;
            (*a, y)
        }
        [] => {
            let cands = classify::scale_candidates(ds);
            let y = classify::preferred_outcome(&cands);
            let x = y.and_then(|y| cands.iter().find(|v| v.name != y.name).copied());
            match (x, y) {
                (Some(x), Some(y)) => (x, y),
                _ => {
                    return Err(Infeasible::new(
                        "Correlation requires two scale variables.",
                        "Set two variables' measurement level to scale.",
                    ))
                }
            }
        }
    };

    let pairs = ds.paired_numeric(x_var, y_var);
    let n = pairs.len();
    if n < 3 {
        return Err(Infeasible::new(
            format!("Correlation requires at least 3 complete pairs; found {n}."),
            "Collect more rows with values for both variables.",
        ));
    }

    let xs: Vec<f64> = pairs.iter().map(|(x, _)| *x).collect();
    let ys: Vec<f64> = pairs.iter().map(|(_, y)| *y).collect();
    let r = match method {
        CorrelationMethod::Pearson => numeric::pearson_r(&xs, &ys),
        CorrelationMethod::Spearman => numeric::spearman_r(&xs, &ys),
    }
    .ok_or_else(|| {
        Infeasible::new(
            "One of the variables has no variance over the complete pairs.",
            "Choose variables whose values vary.",
        )
    })?;
    let (t, p) = numeric::correlation_significance(r, n);

    let method_name = match method {
        CorrelationMethod::Pearson => "Pearson",
        CorrelationMethod::Spearman => "Spearman",
    };
    let direction = if r >= 0.0 { "positive" } else { "negative" };
    let strength = crate::output::effect_size_label(EffectFamily::CorrelationR, r);
    let insight = format!(
        "{} r = {:.3} between '{}' and '{}' (N = {}), {}; a {} {} relationship.",
        method_name,
        r,
        x_var.label,
        y_var.label,
        n,
        fmt_p(p),
        strength,
        direction
    );

    let chart = ChartSpec::scatter(
        &x_var.label,
        &y_var.label,
        pairs
            .iter()
            .map(|(x, y)| ChartPoint {
                label: format!("{x}"),
                value: *y,
            })
            .collect(),
    );

    Ok(TestResult::new(
        test_id.as_str(),
        test_id.display_name(),
        TestTable::Correlation(CorrelationTable {
            method: method_name.to_string(),
            var_x: x_var.label.clone(),
            var_y: y_var.label.clone(),
            n,
            r,
            t: Cell::stat(Some(t)),
            df: n - 2,
            p,
        }),
        insight,
    )
    .chart(chart)
    .key_stat(format!("r = {r:.3}"))
    .effect_size(EffectFamily::CorrelationR, r)
    .variables_analyzed(vec![x_var.name.clone(), y_var.name.clone()]))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MeasurementLevel, Value};

    fn two_by_two(diagonal: bool) -> Dataset {
        let vars = vec![
            Variable::new("a", MeasurementLevel::Nominal),
            Variable::new("b", MeasurementLevel::Nominal),
        ];
        let mut rows = Vec::new();
        for i in 0..20 {
            let a = if i < 10 { "x" } else { "y" };
            let b = if diagonal {
                if i < 10 {
                    "p"
                } else {
                    "q"
                }
            } else if i % 2 == 0 {
                "p"
            } else {
                "q"
            };
            rows.push(Dataset::row(&[
                ("a", Value::text(a)),
                ("b", Value::text(b)),
            ]));
        }
        Dataset::new(vars, rows).unwrap()
    }

    #[test]
    fn crosstab_perfect_association() {
        let ds = two_by_two(true);
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let r = crosstab(&ds, &[a, b]).unwrap();
        let TestTable::Crosstab(t) = &r.table else {
            panic!("wrong table");
        };
        // Perfect 10/0 | 0/10 split: chi-square = N, V = 1
        assert!((t.chi_square - 20.0).abs() < 1e-9);
        assert_eq!(t.df, 1);
        assert!((t.cramers_v - 1.0).abs() < 1e-9);
        assert!(t.fisher_p.unwrap() < 0.001);
        assert!(t.p < 0.05);
    }

    #[test]
    fn crosstab_no_association() {
        let ds = two_by_two(false);
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let r = crosstab(&ds, &[a, b]).unwrap();
        let TestTable::Crosstab(t) = &r.table else {
            panic!("wrong table");
        };
        assert!(t.chi_square.abs() < 1e-9);
        assert!(t.p > 0.9);
    }

    #[test]
    fn crosstab_margins_consistent() {
        let ds = two_by_two(true);
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let r = crosstab(&ds, &[a, b]).unwrap();
        let TestTable::Crosstab(t) = &r.table else {
            panic!("wrong table");
        };
        let row_sum: usize = t.rows.iter().map(|r| r.total).sum();
        let col_sum: usize = t.col_totals.iter().sum();
        assert_eq!(row_sum, t.total);
        assert_eq!(col_sum, t.total);
    }

    #[test]
    fn crosstab_single_category_infeasible() {
        let vars = vec![
            Variable::new("a", MeasurementLevel::Nominal),
            Variable::new("b", MeasurementLevel::Nominal),
        ];
        let rows = (0..5)
            .map(|i| {
                Dataset::row(&[
                    ("a", Value::text("only")),
                    ("b", Value::text(if i % 2 == 0 { "p" } else { "q" })),
                ])
            })
            .collect();
        let ds = Dataset::new(vars, rows).unwrap();
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let inf = crosstab(&ds, &[a, b]).unwrap_err();
        assert!(inf.requirement.contains("only 1 observed category"));
    }

    #[test]
    fn crosstab_single_selection_keeps_chosen_variable() {
        let ds = two_by_two(true);
        let b = ds.variable("b").unwrap();
        let r = crosstab(&ds, &[b]).unwrap();
        // The chosen name stays in the row slot; the partner is derived
        assert_eq!(
            r.variables_analyzed.as_deref(),
            Some(&["b".to_string(), "a".to_string()][..])
        );
    }

    fn linear_pair() -> Dataset {
        let vars = vec![
            Variable::new("x", MeasurementLevel::Scale),
            Variable::new("y", MeasurementLevel::Scale),
        ];
        let rows = (1..=5)
            .map(|i| {
                Dataset::row(&[
                    ("x", Value::Number(i as f64)),
                    ("y", Value::Number(2.0 * i as f64)),
                ])
            })
            .collect();
        Dataset::new(vars, rows).unwrap()
    }

    #[test]
    fn pearson_perfect_line() {
        let ds = linear_pair();
        let x = ds.variable("x").unwrap();
        let y = ds.variable("y").unwrap();
        let r = correlation(&ds, &[x, y], CorrelationMethod::Pearson).unwrap();
        let TestTable::Correlation(t) = &r.table else {
            panic!("wrong table");
        };
        assert!((t.r - 1.0).abs() < 1e-9);
        assert_eq!(t.p, 0.0);
        assert!(r.insight.contains("p < 0.001"));
        // |r| = 1 leaves t undefined
        assert_eq!(t.t, Cell::Missing);
    }

    #[test]
    fn spearman_monotonic() {
        let vars = vec![
            Variable::new("x", MeasurementLevel::Scale),
            Variable::new("y", MeasurementLevel::Scale),
        ];
        let rows = (1..=6)
            .map(|i| {
                Dataset::row(&[
                    ("x", Value::Number(i as f64)),
                    ("y", Value::Number((i * i) as f64)),
                ])
            })
            .collect();
        let ds = Dataset::new(vars, rows).unwrap();
        let x = ds.variable("x").unwrap();
        let y = ds.variable("y").unwrap();
        let r = correlation(&ds, &[x, y], CorrelationMethod::Spearman).unwrap();
        let TestTable::Correlation(t) = &r.table else {
            panic!("wrong table");
        };
        assert!((t.r - 1.0).abs() < 1e-9);
        assert_eq!(t.method, "Spearman");
    }

    #[test]
    fn correlation_single_selection_keeps_chosen_variable() {
        let vars = vec![
            Variable::new("a", MeasurementLevel::Scale),
            Variable::new("b", MeasurementLevel::Scale),
            Variable::new("c", MeasurementLevel::Scale),
        ];
        let rows = (1..=6)
            .map(|i| {
                Dataset::row(&[
                    ("a", Value::Number(i as f64)),
                    ("b", Value::Number(7.0 - i as f64)),
                    ("c", Value::Number((i * i) as f64)),
                ])
            })
            .collect();
        let ds = Dataset::new(vars, rows).unwrap();
        let c = ds.variable("c").unwrap();
        let r = correlation(&ds, &[c], CorrelationMethod::Pearson).unwrap();
        // Automatic selection would pair a and b; the chosen name must survive
        assert_eq!(
            r.variables_analyzed.as_deref(),
            Some(&["c".to_string(), "a".to_string()][..])
        );
    }

    #[test]
    fn correlation_too_few_pairs() {
        let vars = vec![
            Variable::new("x", MeasurementLevel::Scale),
            Variable::new("y", MeasurementLevel::Scale),
        ];
        let rows = vec![
            Dataset::row(&[("x", Value::Number(1.0)), ("y", Value::Number(2.0))]),
            Dataset::row(&[("x", Value::Number(2.0)), ("y", Value::Null)]),
            Dataset::row(&[("x", Value::Number(3.0)), ("y", Value::Number(6.0))]),
        ];
        let ds = Dataset::new(vars, rows).unwrap();
        let x = ds.variable("x").unwrap();
        let y = ds.variable("y").unwrap();
        let inf = correlation(&ds, &[x, y], CorrelationMethod::Pearson).unwrap_err();
        assert!(inf.requirement.contains("found 2"));
    }
}
