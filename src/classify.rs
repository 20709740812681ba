//! Variable classification and test suggestion.
//!
//! Given a dataset's declared measurement levels and per-variable data
//! hygiene, [`suggest_variables`] proposes a default set of variables and
//! roles for a requested test. The suggestion is advisory only:
//! [`run_test`](crate::engine::run_test) independently re-validates
//! feasibility, and an empty or partial suggestion is a valid answer, not
//! an error.
//!
//! Candidate ordering is by a "data hygiene" key: ascending effective
//! missing percentage, then (for categorical variables) ascending maximum
//! single-category share, a proxy for near-zero variance. Ties keep
//! declaration order. A variable tagged `role = target` is preferred as
//! the outcome wherever the test distinguishes one; question-group
//! co-membership is preferred when pairing variables for crosstab and
//! paired tests.
//!
//! # Example
//!
//! ```
//! use autostat::dataset::{Dataset, Variable, MeasurementLevel, Value};
//! use autostat::engine::TestId;
//! use autostat::classify::suggest_variables;
//!
//! let vars = vec![
//!     Variable::new("age", MeasurementLevel::Scale),
//!     Variable::new("gender", MeasurementLevel::Nominal),
//! ];
//! let rows = vec![
//!     Dataset::row(&[("age", Value::Number(25.0)), ("gender", Value::text("M"))]),
//!     Dataset::row(&[("age", Value::Number(32.0)), ("gender", Value::text("F"))]),
//! ];
//! let ds = Dataset::new(vars, rows).unwrap();
//!
//! let s = suggest_variables(TestId::IndependentTTest, &ds);
//! assert_eq!(s.variables.len(), 2);
//! assert_eq!(s.variables[0].role, "outcome");
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::dataset::{Dataset, Variable, VariableRole};
use crate::engine::TestId;

// ── Public surface ────────────────────────────────────────────────────

/// One suggested variable with its proposed role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedVariable {
    /// Variable name.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Proposed role, e.g. "outcome", "group", "predictor".
    pub role: String,
}

/// Advisory variable suggestion for one test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedVars {
    /// Human-readable description of the proposed analysis.
    pub description: String,
    /// Proposed variables in role order; may be empty or partial.
    pub variables: Vec<SuggestedVariable>,
}

impl SuggestedVars {
    fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            variables: Vec::new(),
        }
    }

    fn push(&mut self, var: &Variable, role: &str) {
        self.variables.push(SuggestedVariable {
            name: var.name.clone(),
            label: var.label.clone(),
            role: role.to_string(),
        });
    }
}

/// Proposes default variables and roles for `test_id`. Never fails; an
/// empty variable list means no suitable columns exist.
pub fn suggest_variables(test_id: TestId, ds: &Dataset) -> SuggestedVars {
    match test_id {
        TestId::Frequencies => {
            let mut s = SuggestedVars::new("Frequency table for one variable.");
            if let Some(v) = categorical_candidates(ds)
                .first()
                .copied()
                .or_else(|| scale_candidates(ds).first().copied())
            {
                s.push(v, "variable");
            }
            s
        }
        TestId::Descriptives => {
            let mut s = SuggestedVars::new("Descriptive statistics for scale variables.");
            for v in scale_candidates(ds) {
                s.push(v, "variable");
            }
            s
        }
        TestId::MissingSummary => {
            let mut s = SuggestedVars::new("Missing-value summary across all variables.");
            for v in included(ds) {
                s.push(v, "variable");
            }
            s
        }
        TestId::Crosstab => {
            let mut s =
                SuggestedVars::new("Cross-tabulation of two categorical variables.");
            let cands = categorical_candidates(ds);
            if let Some((a, b)) = pick_pair(ds, &cands) {
                s.push(a, "row");
                s.push(b, "column");
            }
            s
        }
        TestId::PearsonCorrelation | TestId::SpearmanCorrelation => {
            let label = if test_id == TestId::PearsonCorrelation {
                "Pearson correlation between two scale variables."
            } else {
                "Spearman rank correlation between two scale variables."
            };
            let mut s = SuggestedVars::new(label);
            let cands = scale_candidates(ds);
            if let Some(y) = preferred_outcome(&cands) {
                if let Some(x) = cands.iter().find(|v| v.name != y.name) {
                    s.push(x, "x");
                    s.push(y, "y");
                }
            }
            s
        }
        TestId::IndependentTTest => {
            let mut s = SuggestedVars::new("Compare means of two groups (t-test).");
            let scales = scale_candidates(ds);
            if let Some(outcome) = preferred_outcome(&scales) {
                if let Some(group) = grouping_candidate(ds, Some(2)) {
                    s.push(outcome, "outcome");
                    s.push(group, "group");
                }
            }
            s
        }
        TestId::OneWayAnova => {
            let mut s =
                SuggestedVars::new("Compare means of three or more groups (ANOVA).");
            let scales = scale_candidates(ds);
            if let Some(outcome) = preferred_outcome(&scales) {
                if let Some(group) = grouping_candidate(ds, Some(3)) {
                    s.push(outcome, "outcome");
                    s.push(group, "group");
                }
            }
            s
        }
        TestId::RankComparison => {
            let mut s = SuggestedVars::new(
                "Non-parametric group comparison (Mann-Whitney / Kruskal-Wallis).",
            );
            let scales = scale_candidates(ds);
            if let Some(outcome) = preferred_outcome(&scales) {
                if let Some(group) = grouping_candidate(ds, None) {
                    s.push(outcome, "outcome");
                    s.push(group, "group");
                }
            }
            s
        }
        TestId::LinearRegression => {
            let mut s = SuggestedVars::new("Linear regression (OLS).");
            let scales = scale_candidates(ds);
            if let Some(outcome) = preferred_outcome(&scales) {
                s.push(outcome, "outcome");
                for v in scales.iter().filter(|v| v.name != outcome.name) {
                    s.push(v, "predictor");
                }
            }
            s
        }
        TestId::LogisticRegression => {
            let mut s = SuggestedVars::new("Logistic regression for a binary outcome.");
            let binary: Vec<&Variable> = categorical_candidates(ds)
                .into_iter()
                .filter(|v| ds.distinct_categories(v).len() == 2)
                .collect();
            if let Some(outcome) = preferred_outcome(&binary) {
                s.push(outcome, "outcome");
                for v in scale_candidates(ds) {
                    s.push(v, "predictor");
                }
            }
            s
        }
        TestId::PairedTTest => {
            let mut s = SuggestedVars::new("Paired t-test for two scale variables.");
            let cands = scale_candidates(ds);
            if let Some((a, b)) = pick_pair(ds, &cands) {
                s.push(a, "first");
                s.push(b, "second");
            }
            s
        }
        TestId::Pca => {
            let mut s =
                SuggestedVars::new("Principal component analysis of scale variables.");
            for v in scale_candidates(ds).into_iter().take(8) {
                s.push(v, "variable");
            }
            s
        }
    }
}

/// Suggests variables for every known test.
pub fn suggest_all(ds: &Dataset) -> Vec<(TestId, SuggestedVars)> {
    TestId::ALL
        .iter()
        .map(|&id| (id, suggest_variables(id, ds)))
        .collect()
}

// ── Candidate ranking (shared with the handlers) ──────────────────────

/// Included variables in declaration order: `include_in_analysis` true and
/// not an identifier column.
pub(crate) fn included(ds: &Dataset) -> Vec<&Variable> {
    ds.variables()
        .iter()
        .filter(|v| v.include_in_analysis && v.role != VariableRole::Id)
        .collect()
}

/// Scale variables ranked by data hygiene.
pub(crate) fn scale_candidates(ds: &Dataset) -> Vec<&Variable> {
    rank(
        ds,
        included(ds)
            .into_iter()
            .filter(|v| !v.level.is_categorical())
            .collect(),
    )
}

/// Categorical (nominal/ordinal) variables ranked by data hygiene.
pub(crate) fn categorical_candidates(ds: &Dataset) -> Vec<&Variable> {
    rank(
        ds,
        included(ds)
            .into_iter()
            .filter(|v| v.level.is_categorical())
            .collect(),
    )
}

/// First target-tagged candidate, else the best-ranked one.
pub(crate) fn preferred_outcome<'a>(cands: &[&'a Variable]) -> Option<&'a Variable> {
    cands
        .iter()
        .find(|v| v.role == VariableRole::Target)
        .or_else(|| cands.first())
        .copied()
}

/// Best-ranked categorical variable usable for grouping.
///
/// `wanted` filters on distinct category count: `Some(2)` requires exactly
/// two, `Some(k)` for k ≥ 3 requires at least three, `None` accepts any
/// count ≥ 2. Falls back to the best-ranked categorical variable when no
/// candidate matches the count filter.
pub(crate) fn grouping_candidate(ds: &Dataset, wanted: Option<usize>) -> Option<&Variable> {
    let cands = categorical_candidates(ds);
    let matches = |v: &&Variable| {
        let k = ds.distinct_categories(v).len();
        match wanted {
            Some(2) => k == 2,
            Some(_) => k >= 3,
            None => k >= 2,
        }
    };
    cands
        .iter()
        .copied()
        .find(matches)
        .or_else(|| cands.first().copied())
}

/// Best partner for an explicitly chosen variable: a question-group
/// co-member from `cands` when one exists, else the best-ranked candidate
/// other than the chosen one.
pub(crate) fn partner_for<'a>(
    ds: &Dataset,
    chosen: &Variable,
    cands: &[&'a Variable],
) -> Option<&'a Variable> {
    for qg in ds.question_groups() {
        if qg.members.iter().any(|m| m == &chosen.name) {
            if let Some(v) = cands.iter().copied().find(|v| {
                v.name != chosen.name && qg.members.iter().any(|m| m == &v.name)
            }) {
                return Some(v);
            }
        }
    }
    cands.iter().copied().find(|v| v.name != chosen.name)
}

/// Picks a variable pair, preferring two members of one question group
/// over the two globally best-ranked candidates.
pub(crate) fn pick_pair<'a>(
    ds: &Dataset,
    cands: &[&'a Variable],
) -> Option<(&'a Variable, &'a Variable)> {
    for qg in ds.question_groups() {
        let members: Vec<&'a Variable> = cands
            .iter()
            .copied()
            .filter(|v| qg.members.iter().any(|m| m == &v.name))
            .collect();
        if members.len() >= 2 {
            return Some((members[0], members[1]));
        }
    }
    if cands.len() >= 2 {
        Some((cands[0], cands[1]))
    } else {
        None
    }
}

fn rank<'a>(ds: &Dataset, mut vars: Vec<&'a Variable>) -> Vec<&'a Variable> {
    // sort_by is stable, so ties keep declaration order
    vars.sort_by(|a, b| {
        hygiene_key(ds, a)
            .partial_cmp(&hygiene_key(ds, b))
            .unwrap_or(Ordering::Equal)
    });
    vars
}

// (missing %, max single-category share); lower is cleaner
fn hygiene_key(ds: &Dataset, var: &Variable) -> (f64, f64) {
    let missing = ds.missing_percent(var);
    let share = if var.level.is_categorical() {
        max_category_share(ds, var)
    } else {
        0.0
    };
    (missing, share)
}

fn max_category_share(ds: &Dataset, var: &Variable) -> f64 {
    let obs = ds.category_observations(var);
    if obs.is_empty() {
        return 1.0;
    }
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for cat in &obs {
        *counts.entry(cat.as_str()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);
    max as f64 / obs.len() as f64
}

// ── Tests ─────────────────────────────────────────────────────────────
