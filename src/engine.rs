//! Test dispatch: the closed set of test identifiers and the execution
//! contract.
//!
//! [`TestId`] is a closed enum with one handler per variant, selected by
//! exhaustive pattern matching — adding a variant without a handler is a
//! compile error. [`run_test`] always yields a [`TestResult`]: expected
//! infeasibility (wrong variable types, too few complete cases, a
//! degenerate design matrix) comes back as a not-applicable result, and
//! only contract violations (an unknown variable name in the selection)
//! propagate as [`EngineError`]. The string boundary
//! [`run_test_by_name`] maps unknown identifiers to a stub "not
//! implemented" result instead of failing.
//!
//! # Example
//!
//! ```
//! use autostat::dataset::{Dataset, Variable, MeasurementLevel, Value};
//! use autostat::engine::{run_test, TestId};
//!
//! let vars = vec![
//!     Variable::new("age", MeasurementLevel::Scale),
//!     Variable::new("gender", MeasurementLevel::Nominal),
//! ];
//! let rows = vec![
//!     Dataset::row(&[("age", Value::Number(25.0)), ("gender", Value::text("M"))]),
//!     Dataset::row(&[("age", Value::Number(30.0)), ("gender", Value::text("F"))]),
//!     Dataset::row(&[("age", Value::Number(28.0)), ("gender", Value::text("M"))]),
//!     Dataset::row(&[("age", Value::Number(35.0)), ("gender", Value::text("F"))]),
//!     Dataset::row(&[("age", Value::Number(22.0)), ("gender", Value::text("M"))]),
//! ];
//! let ds = Dataset::new(vars, rows).unwrap();
//!
//! let result = run_test(TestId::IndependentTTest, &ds, &[]).unwrap();
//! assert!(result.insight.contains("Mean(M) = 25.00"));
//! ```

use crate::dataset::{Dataset, Variable};
use crate::error::EngineError;
use crate::output::TestResult;
use crate::{association, descriptive, group, paired, pca, regression};

/// Closed set of supported tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestId {
    Frequencies,
    Descriptives,
    MissingSummary,
    Crosstab,
    PearsonCorrelation,
    SpearmanCorrelation,
    IndependentTTest,
    OneWayAnova,
    /// Mann-Whitney U for two groups, Kruskal-Wallis for three or more.
    RankComparison,
    LinearRegression,
    LogisticRegression,
    PairedTTest,
    Pca,
}

impl TestId {
    /// Every supported test, in presentation order.
    pub const ALL: [TestId; 13] = [
        TestId::Frequencies,
        TestId::Descriptives,
        TestId::MissingSummary,
        TestId::Crosstab,
        TestId::PearsonCorrelation,
        TestId::SpearmanCorrelation,
        TestId::IndependentTTest,
        TestId::OneWayAnova,
        TestId::RankComparison,
        TestId::LinearRegression,
        TestId::LogisticRegression,
        TestId::PairedTTest,
        TestId::Pca,
    ];

    /// Stable string identifier used at the API boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Frequencies => "frequencies",
            Self::Descriptives => "descriptives",
            Self::MissingSummary => "missing_summary",
            Self::Crosstab => "crosstab",
            Self::PearsonCorrelation => "pearson",
            Self::SpearmanCorrelation => "spearman",
            Self::IndependentTTest => "ttest",
            Self::OneWayAnova => "anova",
            Self::RankComparison => "rank_comparison",
            Self::LinearRegression => "linear_regression",
            Self::LogisticRegression => "logistic_regression",
            Self::PairedTTest => "paired_ttest",
            Self::Pca => "pca",
        }
    }

    /// Human-readable test name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Frequencies => "Frequencies",
            Self::Descriptives => "Descriptives",
            Self::MissingSummary => "Missing Value Summary",
            Self::Crosstab => "Crosstab & Chi-Square",
            Self::PearsonCorrelation => "Pearson Correlation",
            Self::SpearmanCorrelation => "Spearman Correlation",
            Self::IndependentTTest => "Independent t-Test",
            Self::OneWayAnova => "One-Way ANOVA",
            Self::RankComparison => "Mann-Whitney / Kruskal-Wallis",
            Self::LinearRegression => "Linear Regression",
            Self::LogisticRegression => "Logistic Regression",
            Self::PairedTTest => "Paired t-Test",
            Self::Pca => "Principal Component Analysis",
        }
    }

    /// Parses a string identifier, accepting common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let id = match key.as_str() {
            "frequencies" | "frequency" => Self::Frequencies,
            "descriptives" | "descriptive" => Self::Descriptives,
            "missing_summary" | "missing" => Self::MissingSummary,
            "crosstab" | "chi_square" | "chisquare" => Self::Crosstab,
            "pearson" | "correlation" => Self::PearsonCorrelation,
            "spearman" => Self::SpearmanCorrelation,
            "ttest" | "t_test" | "independent_ttest" => Self::IndependentTTest,
            "anova" | "one_way_anova" => Self::OneWayAnova,
            "rank_comparison" | "mann_whitney" | "mannwhitney" | "kruskal_wallis" => {
                Self::RankComparison
            }
            "linear_regression" | "regression" | "ols" => Self::LinearRegression,
            "logistic_regression" | "logistic" => Self::LogisticRegression,
            "paired_ttest" | "paired_t_test" => Self::PairedTTest,
            "pca" => Self::Pca,
            _ => return None,
        };
        Some(id)
    }
}

impl std::fmt::Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runs one test. Explicit `selected` variable names take priority over
/// automatic selection (and bypass the `include_in_analysis` filter);
/// an unknown name is a contract error. Expected infeasibility becomes a
/// not-applicable [`TestResult`].
pub fn run_test(
    test_id: TestId,
    ds: &Dataset,
    selected: &[String],
) -> Result<TestResult, EngineError> {
    let vars: Vec<&Variable> = selected
        .iter()
        .map(|name| ds.require_variable(name))
        .collect::<Result<_, _>>()?;

    let attempt = match test_id {
        TestId::Frequencies => descriptive::frequencies(ds, &vars),
        TestId::Descriptives => descriptive::descriptives(ds, &vars),
        TestId::MissingSummary => descriptive::missing_summary(ds, &vars),
        TestId::Crosstab => association::crosstab(ds, &vars),
        TestId::PearsonCorrelation => {
            association::correlation(ds, &vars, association::CorrelationMethod::Pearson)
        }
        TestId::SpearmanCorrelation => {
            association::correlation(ds, &vars, association::CorrelationMethod::Spearman)
        }
        TestId::IndependentTTest => group::independent_ttest(ds, &vars),
        TestId::OneWayAnova => group::one_way_anova(ds, &vars),
        TestId::RankComparison => group::rank_comparison(ds, &vars),
        TestId::LinearRegression => regression::linear_regression(ds, &vars),
        TestId::LogisticRegression => regression::logistic_regression(ds, &vars),
        TestId::PairedTTest => paired::paired_ttest(ds, &vars),
        TestId::Pca => pca::principal_components(ds, &vars),
    };

    Ok(match attempt {
        Ok(result) => result,
        Err(infeasible) => {
            TestResult::not_applicable(test_id.as_str(), test_id.display_name(), infeasible)
        }
    })
}

/// String-identifier boundary: unknown identifiers produce a stub
/// "not implemented" result rather than an error.
pub fn run_test_by_name(
    name: &str,
    ds: &Dataset,
    selected: &[String],
) -> Result<TestResult, EngineError> {
    match TestId::parse(name) {
        Some(id) => run_test(id, ds, selected),
        None => Ok(TestResult::not_implemented(name)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{MeasurementLevel, Value};
    use crate::output::TestTable;

    fn sample() -> Dataset {
        let vars = vec![
            Variable::new("age", MeasurementLevel::Scale),
            Variable::new("gender", MeasurementLevel::Nominal),
        ];
        let ages = [25.0, 30.0, 28.0, 35.0, 22.0];
        let genders = ["M", "F", "M", "F", "M"];
        let rows = ages
            .iter()
            .zip(genders.iter())
            .map(|(&a, &g)| {
                Dataset::row(&[("age", Value::Number(a)), ("gender", Value::text(g))])
            })
            .collect();
        Dataset::new(vars, rows).unwrap()
    }

    #[test]
    fn parse_aliases() {
        assert_eq!(TestId::parse("t-test"), Some(TestId::IndependentTTest));
        assert_eq!(TestId::parse("Mann Whitney"), Some(TestId::RankComparison));
        assert_eq!(TestId::parse("kruskal_wallis"), Some(TestId::RankComparison));
        assert_eq!(TestId::parse("nope"), None);
    }

    #[test]
    fn round_trip_ids() {
        for id in TestId::ALL {
            assert_eq!(TestId::parse(id.as_str()), Some(id));
        }
    }

    #[test]
    fn unknown_test_name_stub_result() {
        let ds = sample();
        let r = run_test_by_name("quantile_regression", &ds, &[]).unwrap();
        assert!(matches!(r.table, TestTable::NotImplemented));
        assert!(r.insight.contains("not implemented"));
    }

    #[test]
    fn unknown_variable_is_contract_error() {
        let ds = sample();
        let err = run_test(TestId::Descriptives, &ds, &["height".to_string()]).unwrap_err();
        assert!(matches!(err, EngineError::UnknownVariable { .. }));
    }

    #[test]
    fn infeasible_folds_into_not_applicable() {
        // Single-category grouping variable, explicitly selected
        let vars = vec![
            Variable::new("y", MeasurementLevel::Scale),
            Variable::new("g", MeasurementLevel::Nominal),
        ];
        let rows = (0..5)
            .map(|i| {
                Dataset::row(&[
                    ("y", Value::Number(i as f64)),
                    ("g", Value::text("only")),
                ])
            })
            .collect();
        let ds = Dataset::new(vars, rows).unwrap();
        let r = run_test(
            TestId::IndependentTTest,
            &ds,
            &["y".to_string(), "g".to_string()],
        )
        .unwrap();
        let TestTable::NotApplicable(row) = &r.table else {
            panic!("expected not-applicable");
        };
        assert_eq!(
            row.requirement,
            "Grouping variable has 1 categories; t-test requires exactly 2."
        );
        assert!(r.insight.starts_with(&row.requirement));
    }

    #[test]
    fn automatic_selection_matches_explicit() {
        let ds = sample();
        let auto = run_test(TestId::IndependentTTest, &ds, &[]).unwrap();
        let explicit = run_test(
            TestId::IndependentTTest,
            &ds,
            &["age".to_string(), "gender".to_string()],
        )
        .unwrap();
        assert_eq!(auto.table, explicit.table);
    }

    #[test]
    fn determinism_bit_identical_tables() {
        let ds = sample();
        for id in TestId::ALL {
            let a = run_test(id, &ds, &[]).unwrap();
            let b = run_test(id, &ds, &[]).unwrap();
            assert_eq!(a.table, b.table, "{id}");
            assert_eq!(a.insight, b.insight, "{id}");
        }
    }
}
