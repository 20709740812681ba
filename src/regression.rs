//! Regression tests: OLS linear regression and logistic regression.
//!
//! Both share a design-matrix builder: scale predictors enter directly,
//! nominal predictors are dummy-coded against their lexicographically
//! first observed category. The normal equations are solved by Gaussian
//! elimination ([`numeric::solve_linear_system`]); a singular system is an
//! expected infeasibility (collinearity), not an error.

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    fmt_p, Cell, CoefficientRow, Infeasible, LogisticRow, LogisticTable, RegressionTable,
    TestResult, TestTable,
};

// ── Design matrix ─────────────────────────────────────────────────────

enum Raw {
    Num(f64),
    Cat(String),
}

/// Complete cases for `outcome` and `predictors`: outcome as a raw value
/// (numeric or category per `numeric_outcome`), predictors as raw values
/// by their measurement level. Listwise deletion under the missing rule.
fn complete_cases(
    ds: &Dataset,
    outcome: &Variable,
    predictors: &[&Variable],
    numeric_outcome: bool,
) -> Vec<(Raw, Vec<Raw>)> {
    let mut cases = Vec::new();
    'rows: for i in 0..ds.row_count() {
        let yv = ds.value_at(i, outcome);
        if ds.is_missing(outcome, yv) {
            continue;
        }
        let y = if numeric_outcome {
            match yv.as_number() {
                Some(n) => Raw::Num(n),
                None => continue,
            }
        } else {
            Raw::Cat(yv.display())
        };
        let mut preds = Vec::with_capacity(predictors.len());
        for var in predictors {
            let v = ds.value_at(i, var);
            if ds.is_missing(var, v) {
                continue 'rows;
            }
            if var.level.is_categorical() {
                preds.push(Raw::Cat(v.display()));
            } else {
                match v.as_number() {
                    Some(n) => preds.push(Raw::Num(n)),
                    None => continue 'rows,
                }
            }
        }
        cases.push((y, preds));
    }
    cases
}

/// Expands raw predictor values into term names and design rows with a
/// leading intercept column. Dummy levels are ordered lexicographically;
/// the lexicographically first category is the baseline.
fn build_design(
    cases: &[(Raw, Vec<Raw>)],
    predictors: &[&Variable],
) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut terms = vec!["(Intercept)".to_string()];
    // Per-predictor dummy levels (empty for scale predictors)
    let mut dummy_levels: Vec<Vec<String>> = Vec::with_capacity(predictors.len());
    for (j, var) in predictors.iter().enumerate() {
        if var.level.is_categorical() {
            let mut levels: Vec<String> = Vec::new();
            for (_, preds) in cases {
                if let Raw::Cat(c) = &preds[j] {
                    if !levels.contains(c) {
                        levels.push(c.clone());
                    }
                }
            }
            levels.sort();
            for level in levels.iter().skip(1) {
                terms.push(format!("{} [{}]", var.label, level));
            }
            dummy_levels.push(levels);
        } else {
            terms.push(var.label.clone());
            dummy_levels.push(Vec::new());
        }
    }

    let rows = cases
        .iter()
        .map(|(_, preds)| {
            let mut row = vec![1.0];
            for (j, raw) in preds.iter().enumerate() {
                match raw {
                    Raw::Num(n) => row.push(*n),
                    Raw::Cat(c) => {
                        for level in dummy_levels[j].iter().skip(1) {
                            row.push(if c == level { 1.0 } else { 0.0 });
                        }
                    }
                }
            }
            row
        })
        .collect();
    (terms, rows)
}

fn xtx_and_xty(x: &[Vec<f64>], y: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let k = x.first().map_or(0, Vec::len);
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &yi) in x.iter().zip(y.iter()) {
        for a in 0..k {
            xty[a] += row[a] * yi;
            for b in 0..k {
                xtx[a][b] += row[a] * row[b];
            }
        }
    }
    (xtx, xty)
}

// ── Linear regression ─────────────────────────────────────────────────

pub fn linear_regression(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let (outcome, predictors): (&Variable, Vec<&Variable>) = match selected {
        [o] => {
            // Lone name is the outcome; every other scale variable predicts it.
            let preds: Vec<&Variable> = classify::scale_candidates(ds)
                .into_iter()
                .filter(|v| v.name != o.name)
                .collect();
            (*o, preds)
        }
        [o, rest @ ..] => (*o, rest.to_vec()),
        [] => {
            let scales = classify::scale_candidates(ds);
            let outcome = classify::preferred_outcome(&scales).ok_or_else(|| {
                Infeasible::new(
                    "Linear regression requires a scale outcome variable.",
                    "Set one variable's measurement level to scale.",
                )
            })?;
            let preds: Vec<&Variable> = scales
                .iter()
                .filter(|v| v.name != outcome.name)
                .copied()
                .collect();
            (outcome, preds)
        }
    };
    if predictors.is_empty() {
        return Err(Infeasible::new(
            "Linear regression requires at least one predictor.",
            "Add another scale or categorical variable.",
        ));
    }

    let cases = complete_cases(ds, outcome, &predictors, true);
    let n = cases.len();
    if n < 4 {
        return Err(Infeasible::new(
            format!("Linear regression requires at least 4 complete cases; found {n}."),
            "Collect more rows with values for every chosen variable.",
        ));
    }

    let (terms, x) = build_design(&cases, &predictors);
    let k = terms.len();
    if k < 2 {
        return Err(Infeasible::new(
            "No predictor varies over the complete cases.",
            "Choose predictors whose values vary.",
        ));
    }
    if n <= k {
        return Err(Infeasible::new(
            format!("The model has {k} coefficients but only {n} complete cases."),
            "Remove predictors or collect more cases.",
        ));
    }

    let y: Vec<f64> = cases
        .iter()
        .map(|(raw, _)| match raw {
            Raw::Num(n) => *n,
            Raw::Cat(_) => 0.0,
        })
        .collect();

    let (xtx, xty) = xtx_and_xty(&x, &y);
    let beta = numeric::solve_linear_system(&xtx, &xty).ok_or_else(|| {
        Infeasible::new(
            "Predictors are collinear; the normal equations are singular.",
            "Remove redundant predictors.",
        )
    })?;

    let y_mean = numeric::mean(&y).unwrap_or(0.0);
    let mut sse = 0.0;
    let mut sst = 0.0;
    for (row, &yi) in x.iter().zip(y.iter()) {
        let fitted: f64 = row.iter().zip(beta.iter()).map(|(&a, &b)| a * b).sum();
        sse += (yi - fitted) * (yi - fitted);
        sst += (yi - y_mean) * (yi - y_mean);
    }
    if sst < 1e-300 {
        return Err(Infeasible::new(
            "The outcome has zero variance over the complete cases.",
            "Choose an outcome whose values vary.",
        ));
    }

    let df_model = k - 1;
    let df_residual = n - k;
    let r_squared = 1.0 - sse / sst;
    let mse = sse / df_residual as f64;
    let f = if mse > 1e-300 {
        ((sst - sse) / df_model as f64) / mse
    } else {
        f64::INFINITY
    };
    let p = numeric::p_from_f(f, df_residual as f64);

    let inv_diag = numeric::inverse_diagonal(&xtx);
    let coefficients: Vec<CoefficientRow> = terms
        .iter()
        .zip(beta.iter())
        .enumerate()
        .map(|(j, (term, &b))| {
            let se = inv_diag
                .as_ref()
                .and_then(|d| d.get(j).copied())
                .map(|dj| (mse * dj).sqrt())
                .filter(|&s| s.is_finite() && s > 1e-300);
            let (t_cell, p_cell) = match se {
                Some(s) => {
                    let t = b / s;
                    (
                        Cell::stat(Some(t)),
                        Cell::stat(Some(numeric::p_from_t(t, df_residual as f64))),
                    )
                }
                None => (Cell::Missing, Cell::Missing),
            };
            CoefficientRow {
                term: term.clone(),
                estimate: b,
                se: Cell::stat(se),
                t: t_cell,
                p: p_cell,
            }
        })
        .collect();

    // Strongest predictor by |t|, falling back to |estimate|
    let strongest = coefficients
        .iter()
        .skip(1)
        .max_by(|a, b| {
            let key = |c: &CoefficientRow| match c.t {
                Cell::Number(t) => t.abs(),
                _ => c.estimate.abs(),
            };
            key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
        });
    let mut insight = format!(
        "R² = {:.3}; F({}, {}) = {:.3}, {}.",
        r_squared,
        df_model,
        df_residual,
        f,
        fmt_p(p)
    );
    if let Some(s) = strongest {
        insight.push_str(&format!(
            " Strongest predictor: '{}' (β = {:.3}).",
            s.term, s.estimate
        ));
    }

    Ok(TestResult::new(
        TestId::LinearRegression.as_str(),
        TestId::LinearRegression.display_name(),
        TestTable::Regression(RegressionTable {
            outcome: outcome.label.clone(),
            n,
            r_squared,
            f,
            df_model,
            df_residual,
            p,
            coefficients,
        }),
        insight,
    )
    .key_stat(format!("R² = {r_squared:.3}"))
    .variables_analyzed(
        std::iter::once(outcome.name.clone())
            .chain(predictors.iter().map(|v| v.name.clone()))
            .collect(),
    ))
}

// ── Logistic regression ───────────────────────────────────────────────

const IRLS_MAX_ITER: usize = 30;
const IRLS_TOLERANCE: f64 = 1e-6;
const LINEAR_PREDICTOR_CLIP: f64 = 20.0;

pub fn logistic_regression(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let (outcome, predictors): (&Variable, Vec<&Variable>) = match selected {
        [o] => {
            // Lone name is the outcome; predictors default to the scale variables.
            let preds: Vec<&Variable> = classify::scale_candidates(ds)
                .into_iter()
                .filter(|v| v.name != o.name)
                .collect();
            (*o, preds)
        }
        [o, rest @ ..] => (*o, rest.to_vec()),
        [] => {
            let binary: Vec<&Variable> = classify::categorical_candidates(ds)
                .into_iter()
                .filter(|v| ds.distinct_categories(v).len() == 2)
                .collect();
            let outcome = classify::preferred_outcome(&binary).ok_or_else(|| {
                Infeasible::new(
                    "Logistic regression requires a binary categorical outcome.",
                    "Choose a nominal variable with exactly two categories.",
                )
            })?;
            (outcome, classify::scale_candidates(ds))
        }
    };
    if predictors.is_empty() {
        return Err(Infeasible::new(
            "Logistic regression requires at least one predictor.",
            "Add a scale or categorical predictor variable.",
        ));
    }

    let cases = complete_cases(ds, outcome, &predictors, false);
    let n = cases.len();
    if n < 10 {
        return Err(Infeasible::new(
            format!("Logistic regression requires at least 10 complete cases; found {n}."),
            "Collect more rows with values for every chosen variable.",
        ));
    }

    let mut categories: Vec<String> = Vec::new();
    for (raw, _) in &cases {
        if let Raw::Cat(c) = raw {
            if !categories.contains(c) {
                categories.push(c.clone());
            }
        }
    }
    categories.sort();
    if categories.len() != 2 {
        return Err(Infeasible::new(
            format!(
                "Outcome has {} categories; logistic regression requires exactly 2.",
                categories.len()
            ),
            "Choose a binary outcome variable.",
        ));
    }
    // Positive class: lexicographically second
    let positive = categories[1].clone();
    let y: Vec<f64> = cases
        .iter()
        .map(|(raw, _)| match raw {
            Raw::Cat(c) if *c == positive => 1.0,
            _ => 0.0,
        })
        .collect();

    let (terms, x) = build_design(&cases, &predictors);
    let k = terms.len();
    if k < 2 {
        return Err(Infeasible::new(
            "No predictor varies over the complete cases.",
            "Choose predictors whose values vary.",
        ));
    }
    if n <= k {
        return Err(Infeasible::new(
            format!("The model has {k} coefficients but only {n} complete cases."),
            "Remove predictors or collect more cases.",
        ));
    }

    // IRLS: β ← β + (XᵗWX)⁻¹ Xᵗ(y − μ), W = diag(μ(1−μ))
    let mut beta = vec![0.0; k];
    let mut converged = false;
    let mut iterations = 0;
    let mut info: Option<Vec<Vec<f64>>> = None;
    for _ in 0..IRLS_MAX_ITER {
        iterations += 1;
        let mu: Vec<f64> = x
            .iter()
            .map(|row| {
                let eta: f64 = row.iter().zip(beta.iter()).map(|(&a, &b)| a * b).sum();
                let eta = eta.clamp(-LINEAR_PREDICTOR_CLIP, LINEAR_PREDICTOR_CLIP);
                1.0 / (1.0 + (-eta).exp())
            })
            .collect();

        let mut xtwx = vec![vec![0.0; k]; k];
        let mut score = vec![0.0; k];
        for (i, row) in x.iter().enumerate() {
            let w = mu[i] * (1.0 - mu[i]);
            for a in 0..k {
                score[a] += row[a] * (y[i] - mu[i]);
                for b in 0..k {
                    xtwx[a][b] += w * row[a] * row[b];
                }
            }
        }

        let Some(delta) = numeric::solve_linear_system(&xtwx, &score) else {
            break;
        };
        info = Some(xtwx);
        for (b, d) in beta.iter_mut().zip(delta.iter()) {
            *b += d;
        }
        if delta.iter().all(|d| d.abs() < IRLS_TOLERANCE) {
            converged = true;
            break;
        }
    }

    let wald_diag = info.as_ref().and_then(|m| numeric::inverse_diagonal(m));
    let coefficients: Vec<LogisticRow> = terms
        .iter()
        .zip(beta.iter())
        .enumerate()
        .map(|(j, (term, &b))| {
            let se = wald_diag
                .as_ref()
                .and_then(|d| d.get(j).copied())
                .filter(|&d| d.is_finite() && d > 0.0)
                .map(f64::sqrt);
            let p = se.map(|s| {
                let z = b / s;
                (2.0 * (1.0 - numeric::standard_normal_cdf(z.abs()))).clamp(0.0, 1.0)
            });
            LogisticRow {
                term: term.clone(),
                estimate: b,
                odds_ratio: b.exp(),
                se: Cell::stat(se),
                p: Cell::stat(p),
            }
        })
        .collect();

    let convergence_note = if converged {
        format!("converged in {iterations} iteration(s)")
    } else {
        format!("did not converge within {IRLS_MAX_ITER} iterations")
    };
    let strongest = coefficients.iter().skip(1).max_by(|a, b| {
        a.estimate
            .abs()
            .partial_cmp(&b.estimate.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut insight = format!(
        "Predicting '{}' = '{}' (N = {}); the fit {}.",
        outcome.label, positive, n, convergence_note
    );
    if let Some(s) = strongest {
        insight.push_str(&format!(
            " Strongest predictor: '{}' (odds ratio = {:.3}).",
            s.term, s.odds_ratio
        ));
    }

    Ok(TestResult::new(
        TestId::LogisticRegression.as_str(),
        TestId::LogisticRegression.display_name(),
        TestTable::Logistic(LogisticTable {
            outcome: outcome.label.clone(),
            positive_class: positive,
            n,
            converged,
            iterations,
            coefficients,
        }),
        insight,
    )
    .variables_analyzed(
        std::iter::once(outcome.name.clone())
            .chain(predictors.iter().map(|v| v.name.clone()))
            .collect(),
    ))
}

// ── Tests ─────────────────────────────────────────────────────────────
