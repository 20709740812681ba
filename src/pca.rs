//! Principal component analysis over the dataset's scale variables.
//!
//! Centers the listwise-complete data, forms the sample covariance matrix
//! (n−1 denominator), and extracts eigenpairs one at a time by power
//! iteration with deflation ([`numeric::top_eigenpairs`]). Components are
//! reported in decreasing eigenvalue order with percent and cumulative
//! variance, plus the number of components needed to reach 80% of the
//! total variance.

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    ChartPoint, ChartSpec, Infeasible, PcaRow, PcaTable, TestResult, TestTable,
};

const VARIANCE_TARGET_PERCENT: f64 = 80.0;

pub fn principal_components(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let vars: Vec<&Variable> = if selected.is_empty() {
        classify::scale_candidates(ds).into_iter().take(8).collect()
    } else {
        selected.to_vec()
    };
    if vars.is_empty() {
        return Err(Infeasible::new(
            "PCA requires at least one scale variable.",
            "Set at least one variable's measurement level to scale.",
        ));
    }

    let data = ds.listwise_numeric(&vars);
    let n = data.len();
    if n < 4 {
        return Err(Infeasible::new(
            format!("PCA requires at least 4 complete cases; found {n}."),
            "Collect more rows with values for every chosen variable.",
        ));
    }

    let d = vars.len();
    let means: Vec<f64> = (0..d)
        .map(|j| data.iter().map(|row| row[j]).sum::<f64>() / n as f64)
        .collect();

    // Sample covariance, n−1 denominator
    let mut cov = vec![vec![0.0; d]; d];
    for row in &data {
        for a in 0..d {
            let da = row[a] - means[a];
            for b in 0..d {
                cov[a][b] += da * (row[b] - means[b]);
            }
        }
    }
    for row in cov.iter_mut() {
        for v in row.iter_mut() {
            *v /= (n - 1) as f64;
        }
    }

    let total_variance: f64 = (0..d).map(|j| cov[j][j]).sum();
    if total_variance < 1e-300 {
        return Err(Infeasible::new(
            "All chosen variables have zero variance.",
            "Choose variables whose values vary.",
        ));
    }

    let pairs = numeric::top_eigenpairs(&cov, d);
    let mut components = Vec::with_capacity(pairs.len());
    let mut cumulative = 0.0;
    let mut components_for_80 = pairs.len();
    for (i, (lambda, _)) in pairs.iter().enumerate() {
        // Deflation round-off can leave a tiny negative in place of zero
        let eigenvalue = lambda.max(0.0);
        let percent = 100.0 * eigenvalue / total_variance;
        cumulative += percent;
        if cumulative >= VARIANCE_TARGET_PERCENT && components_for_80 == pairs.len() {
            components_for_80 = i + 1;
        }
        components.push(PcaRow {
            component: i + 1,
            eigenvalue,
            percent_variance: percent,
            cumulative_percent: cumulative,
        });
    }

    let chart = ChartSpec::bar(
        "component",
        "percent_variance",
        components
            .iter()
            .map(|c| ChartPoint {
                label: format!("PC{}", c.component),
                value: c.percent_variance,
            })
            .collect(),
    );

    let first_pct = components.first().map(|c| c.percent_variance).unwrap_or(0.0);
    let insight = format!(
        "{} of {} component(s) reach {}% of total variance; PC1 alone explains {:.1}%.",
        components_for_80,
        d,
        VARIANCE_TARGET_PERCENT,
        first_pct
    );

    Ok(TestResult::new(
        TestId::Pca.as_str(),
        TestId::Pca.display_name(),
        TestTable::Pca(PcaTable {
            variables: vars.iter().map(|v| v.label.clone()).collect(),
            n,
            components,
            components_for_80,
        }),
        insight,
    )
    .chart(chart)
    .key_stat(format!("PC1 = {first_pct:.1}% of variance"))
    .variables_analyzed(vars.iter().map(|v| v.name.clone()).collect()))
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MeasurementLevel, Value};

    fn scale_dataset(cols: &[(&str, Vec<f64>)]) -> Dataset {
        let vars = cols
            .iter()
            .map(|(name, _)| Variable::new(*name, MeasurementLevel::Scale))
            .collect();
        let n = cols.first().map(|(_, v)| v.len()).unwrap_or(0);
        let rows = (0..n)
            .map(|i| {
                cols.iter()
                    .map(|(name, vals)| (name.to_string(), Value::Number(vals[i])))
                    .collect()
            })
            .collect();
        Dataset::new(vars, rows).unwrap()
    }

    #[test]
    fn identical_columns_collapse_to_one_component() {
        let vals = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ds = scale_dataset(&[("a", vals.clone()), ("b", vals)]);
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let r = principal_components(&ds, &[a, b]).unwrap();
        let TestTable::Pca(t) = &r.table else {
            panic!("wrong table");
        };
        // Total variance 2.5 + 2.5, all on the first component
        assert!((t.components[0].eigenvalue - 5.0).abs() < 1e-6);
        assert!(t.components[1].eigenvalue < 1e-6);
        assert_eq!(t.components_for_80, 1);
    }

    #[test]
    fn eigenvalue_sum_matches_total_variance() {
        let ds = scale_dataset(&[
            ("a", vec![1.0, 2.0, 4.0, 3.0, 5.0, 2.5]),
            ("b", vec![2.0, 1.0, 3.0, 5.0, 4.0, 3.5]),
            ("c", vec![0.5, 2.5, 1.5, 3.5, 2.0, 4.0]),
        ]);
        let vars: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|n| ds.variable(n).unwrap())
            .collect();
        let r = principal_components(&ds, &vars).unwrap();
        let TestTable::Pca(t) = &r.table else {
            panic!("wrong table");
        };
        let sum: f64 = t.components.iter().map(|c| c.eigenvalue).sum();
        let total: f64 = vars
            .iter()
            .map(|v| {
                let obs = ds.numeric_observations(v);
                crate::numeric::variance(&obs).unwrap()
            })
            .sum();
        assert!((sum - total).abs() < 1e-6, "sum={sum} total={total}");
        // Non-increasing eigenvalues
        for w in t.components.windows(2) {
            assert!(w[0].eigenvalue >= w[1].eigenvalue - 1e-9);
        }
        // Cumulative percent reaches 100
        let last = t.components.last().unwrap();
        assert!((last.cumulative_percent - 100.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_cases_infeasible() {
        let ds = scale_dataset(&[("a", vec![1.0, 2.0, 3.0]), ("b", vec![2.0, 3.0, 4.0])]);
        let a = ds.variable("a").unwrap();
        let b = ds.variable("b").unwrap();
        let inf = principal_components(&ds, &[a, b]).unwrap_err();
        assert!(inf.requirement.contains("found 3"));
    }

    #[test]
    fn zero_variance_infeasible() {
        let ds = scale_dataset(&[("a", vec![2.0, 2.0, 2.0, 2.0])]);
        let a = ds.variable("a").unwrap();
        let inf = principal_components(&ds, &[a]).unwrap_err();
        assert!(inf.requirement.contains("zero variance"));
    }
}
