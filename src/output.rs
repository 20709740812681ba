//! Result assembly: tables, charts, insights, effect sizes.
//!
//! Every analysis produces a [`TestResult`]: a typed table, an optional
//! chart descriptor, and an always-present `insight` narrative built from
//! the literal computed statistics. Table shapes vary per test, so each
//! test family gets its own small row/record type collected in the closed
//! [`TestTable`] union; [`TestTable::rows`] flattens any of them into
//! ordered label→cell rows for generic rendering downstream.
//!
//! Infeasible runs are first-class: handlers return
//! `Result<TestResult, Infeasible>` internally and the dispatcher folds
//! the [`Infeasible`] branch into a not-applicable `TestResult` carrying a
//! `{Requirement, Suggestion}` row — never `null`, never an exception.
//!
//! Numerical degeneracy inside a feasible run (say, a zero standard
//! error) surfaces as the [`Cell::Missing`] sentinel, rendered "—",
//! rather than letting `NaN`/`Infinity` leak into a table.

use std::collections::BTreeMap;

use serde::Serialize;

// ── Rounding & formatting ─────────────────────────────────────────────

/// Rounds to 3 decimal places (the table-wide convention for statistics).
pub fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/// Rounds to 1 decimal place (used for percentages).
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Formats a statistic with 3 decimals for narrative text.
pub fn fmt3(x: f64) -> String {
    format!("{x:.3}")
}

/// Formats a mean-style value with 2 decimals for narrative text.
pub fn fmt2(x: f64) -> String {
    format!("{x:.2}")
}

/// Formats a p-value for narrative text: `p < 0.001` below the floor,
/// `p = 0.042` otherwise.
pub fn fmt_p(p: f64) -> String {
    if p < 0.001 {
        "p < 0.001".to_string()
    } else {
        format!("p = {p:.3}")
    }
}

// ── Cells ─────────────────────────────────────────────────────────────

/// One table cell: a rounded number, a string, or the "—" sentinel for
/// undefined statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Numeric cell.
    Number(f64),
    /// Text cell.
    Text(String),
    /// Undefined statistic, rendered "—".
    Missing,
}

impl Cell {
    /// Builds a numeric cell rounded to 3 decimals, or the sentinel when
    /// the value is absent or non-finite.
    pub fn stat(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Number(round3(v)),
            _ => Self::Missing,
        }
    }

    /// Builds a text cell.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Builds an integer-valued numeric cell.
    pub fn count(n: usize) -> Self {
        Self::Number(n as f64)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Missing => write!(f, "—"),
        }
    }
}

/// One rendered table row: ordered (column label, cell) pairs.
pub type RenderedRow = Vec<(String, Cell)>;

// ── Charts ────────────────────────────────────────────────────────────

/// A renderer-agnostic chart description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    /// Chart kind: "bar", "scatter", "line".
    pub chart_type: String,
    /// Key naming the x axis.
    pub x_key: String,
    /// Key naming the y axis.
    pub y_key: String,
    /// Data points.
    pub data: Vec<ChartPoint>,
}

/// One chart data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Category or x label.
    pub label: String,
    /// Numeric value.
    pub value: f64,
}

impl ChartSpec {
    /// Bar chart over labelled values.
    pub fn bar(x_key: &str, y_key: &str, data: Vec<ChartPoint>) -> Self {
        Self {
            chart_type: "bar".into(),
            x_key: x_key.into(),
            y_key: y_key.into(),
            data,
        }
    }

    /// Scatter chart; point labels carry the x value.
    pub fn scatter(x_key: &str, y_key: &str, data: Vec<ChartPoint>) -> Self {
        Self {
            chart_type: "scatter".into(),
            x_key: x_key.into(),
            y_key: y_key.into(),
            data,
        }
    }
}

// ── Effect sizes ──────────────────────────────────────────────────────

/// Effect-size family, determining the magnitude thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectFamily {
    /// Cohen's d (0.2 / 0.5 / 0.8).
    CohensD,
    /// Correlation r (0.1 / 0.3 / 0.5).
    CorrelationR,
    /// η² (0.01 / 0.06 / 0.14).
    EtaSquared,
    /// Cramér's V (0.1 / 0.3 / 0.5).
    CramersV,
}

/// Conventional magnitude label for an effect size.
pub fn effect_size_label(family: EffectFamily, value: f64) -> &'static str {
    let v = value.abs();
    let (small, medium, large) = match family {
        EffectFamily::CohensD => (0.2, 0.5, 0.8),
        EffectFamily::CorrelationR | EffectFamily::CramersV => (0.1, 0.3, 0.5),
        EffectFamily::EtaSquared => (0.01, 0.06, 0.14),
    };
    if v >= large {
        "large"
    } else if v >= medium {
        "medium"
    } else if v >= small {
        "small"
    } else {
        "negligible"
    }
}

// ── Infeasibility ─────────────────────────────────────────────────────

/// An expected infeasibility: the requirement that failed and what to do
/// about it. Folded into a not-applicable [`TestResult`] by the
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Infeasible {
    /// What the test needs and does not have.
    pub requirement: String,
    /// Actionable suggestion for the analyst.
    pub suggestion: String,
}

impl Infeasible {
    /// Creates an infeasibility record.
    pub fn new(requirement: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            requirement: requirement.into(),
            suggestion: suggestion.into(),
        }
    }
}

// ── Per-test row types ────────────────────────────────────────────────

/// Frequencies: one distinct value (or the "(missing)" bucket).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyRow {
    /// Display value (value label applied when declared).
    pub value: String,
    /// Occurrence count.
    pub count: usize,
    /// Percentage of all rows, 1 decimal.
    pub percent: f64,
}

/// Descriptives: one scale variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DescriptiveRow {
    /// Variable label.
    pub variable: String,
    /// Non-missing count.
    pub n: usize,
    /// Mean ("—" when N = 0).
    pub mean: Cell,
    /// Standard deviation ("—" when N < 2).
    pub sd: Cell,
    /// Minimum.
    pub min: Cell,
    /// Maximum.
    pub max: Cell,
}

/// Missing summary: one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRow {
    /// Variable label.
    pub variable: String,
    /// Missing count under the dataset-wide rule.
    pub missing: usize,
    /// Missing percentage, 1 decimal.
    pub percent: f64,
    /// True when missingness exceeds 30%.
    pub flagged: bool,
}

/// Per-group summary used by the comparison tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummaryRow {
    /// Group category (value label applied).
    pub group: String,
    /// Observations in the group.
    pub n: usize,
    /// Group mean.
    pub mean: f64,
    /// Group SD ("—" when n < 2).
    pub sd: Cell,
}

/// One contingency-table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabRow {
    /// Row category.
    pub category: String,
    /// Counts per column category.
    pub counts: Vec<usize>,
    /// Row total.
    pub total: usize,
}

/// Crosstab with chi-square (and Fisher for 2×2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosstabTable {
    /// Row variable label.
    pub row_variable: String,
    /// Column variable label.
    pub col_variable: String,
    /// Column categories, in first-appearance order.
    pub col_categories: Vec<String>,
    /// Contingency rows.
    pub rows: Vec<CrosstabRow>,
    /// Column totals.
    pub col_totals: Vec<usize>,
    /// Grand total N.
    pub total: usize,
    /// Pearson chi-square statistic.
    pub chi_square: f64,
    /// Degrees of freedom (r−1)(c−1).
    pub df: usize,
    /// Approximate p-value.
    pub p: f64,
    /// Fisher's exact two-tailed p (2×2 tables only).
    pub fisher_p: Option<f64>,
    /// Cramér's V effect size.
    pub cramers_v: f64,
}

/// Bivariate correlation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationTable {
    /// "Pearson" or "Spearman".
    pub method: String,
    /// First variable label.
    pub var_x: String,
    /// Second variable label.
    pub var_y: String,
    /// Complete pairs.
    pub n: usize,
    /// Correlation coefficient.
    pub r: f64,
    /// t statistic ("—" for |r| = 1).
    pub t: Cell,
    /// Degrees of freedom n−2.
    pub df: usize,
    /// Two-tailed p.
    pub p: f64,
}

/// Independent-samples t-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TTestTable {
    /// Outcome variable label.
    pub outcome: String,
    /// Grouping variable label.
    pub group_variable: String,
    /// The two group summaries.
    pub groups: Vec<GroupSummaryRow>,
    /// Mean difference (group 1 − group 2).
    pub mean_difference: f64,
    /// Pooled t.
    pub t: f64,
    /// Pooled df = n1+n2−2.
    pub df: usize,
    /// Two-tailed p for the pooled t.
    pub p: f64,
    /// Welch's t.
    pub welch_t: f64,
    /// Satterthwaite df, rounded to the nearest integer (floor 1).
    pub welch_df: usize,
    /// Two-tailed p for Welch's t.
    pub welch_p: f64,
    /// Levene's F (ANOVA on |x − group median|); "—" when degenerate.
    pub levene_f: Cell,
    /// Levene's p.
    pub levene_p: Cell,
    /// Cohen's d from the pooled SD.
    pub cohens_d: f64,
}

/// One Tukey-style pairwise comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostHocRow {
    /// First group.
    pub group_a: String,
    /// Second group.
    pub group_b: String,
    /// Absolute mean difference.
    pub mean_diff: f64,
    /// Studentized-range-style statistic.
    pub q: f64,
    /// Approximated critical value q(k, df).
    pub q_crit: f64,
    /// Whether q exceeds the critical value.
    pub significant: bool,
}

/// One-way ANOVA.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTable {
    /// Outcome variable label.
    pub outcome: String,
    /// Grouping variable label.
    pub group_variable: String,
    /// Per-group summaries.
    pub groups: Vec<GroupSummaryRow>,
    /// F = MSB/MSW.
    pub f: f64,
    /// df between = k−1.
    pub df_between: usize,
    /// df within = n−k.
    pub df_within: usize,
    /// Approximate p.
    pub p: f64,
    /// η² = SSB/SST.
    pub eta_squared: f64,
    /// Levene's F.
    pub levene_f: Cell,
    /// Levene's p.
    pub levene_p: Cell,
    /// Pairwise post-hoc rows (only when p < 0.05).
    pub post_hoc: Vec<PostHocRow>,
}

/// Rank-based group comparison statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum RankStatistic {
    /// Mann-Whitney U with its normal-approximation z.
    MannWhitney { u: f64, z: f64 },
    /// Kruskal-Wallis H with df = k−1.
    KruskalWallis { h: f64, df: usize },
}

/// One group in a rank comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankGroupRow {
    /// Group category.
    pub group: String,
    /// Observations.
    pub n: usize,
    /// Mean rank in the combined sample.
    pub mean_rank: f64,
}

/// Mann-Whitney U / Kruskal-Wallis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankTable {
    /// Outcome variable label.
    pub outcome: String,
    /// Grouping variable label.
    pub group_variable: String,
    /// Per-group rank summaries.
    pub groups: Vec<RankGroupRow>,
    /// U or H.
    pub statistic: RankStatistic,
    /// Two-tailed p.
    pub p: f64,
}

/// One regression coefficient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoefficientRow {
    /// Term name ("(Intercept)", predictor, or dummy like "color [red]").
    pub term: String,
    /// Estimate.
    pub estimate: f64,
    /// Standard error ("—" when degenerate).
    pub se: Cell,
    /// t statistic.
    pub t: Cell,
    /// Two-tailed p.
    pub p: Cell,
}

/// OLS linear regression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionTable {
    /// Outcome variable label.
    pub outcome: String,
    /// Complete cases used.
    pub n: usize,
    /// R².
    pub r_squared: f64,
    /// Overall F.
    pub f: f64,
    /// Model df (number of predictors).
    pub df_model: usize,
    /// Residual df.
    pub df_residual: usize,
    /// Overall p.
    pub p: f64,
    /// Intercept first, then predictors.
    pub coefficients: Vec<CoefficientRow>,
}

/// One logistic-regression coefficient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticRow {
    /// Term name.
    pub term: String,
    /// Log-odds estimate.
    pub estimate: f64,
    /// Odds ratio e^β.
    pub odds_ratio: f64,
    /// Wald SE ("—" when the information matrix is degenerate).
    pub se: Cell,
    /// Wald p.
    pub p: Cell,
}

/// Logistic regression (IRLS fit).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticTable {
    /// Outcome variable label.
    pub outcome: String,
    /// Category coded as 1.
    pub positive_class: String,
    /// Complete cases used.
    pub n: usize,
    /// Whether IRLS converged within the iteration cap.
    pub converged: bool,
    /// Iterations run.
    pub iterations: usize,
    /// Intercept first, then predictors.
    pub coefficients: Vec<LogisticRow>,
}

/// Paired t-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedTable {
    /// First variable label.
    pub first: String,
    /// Second variable label.
    pub second: String,
    /// Complete pairs.
    pub n: usize,
    /// Mean of the first variable.
    pub mean_first: f64,
    /// Mean of the second variable.
    pub mean_second: f64,
    /// Mean of per-row differences (first − second).
    pub mean_difference: f64,
    /// SD of the differences.
    pub sd_difference: f64,
    /// t = mean / (SD/√n).
    pub t: f64,
    /// df = n−1.
    pub df: usize,
    /// Two-tailed p.
    pub p: f64,
}

/// One principal component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaRow {
    /// 1-based component index.
    pub component: usize,
    /// Eigenvalue.
    pub eigenvalue: f64,
    /// Percent of total variance.
    pub percent_variance: f64,
    /// Cumulative percent.
    pub cumulative_percent: f64,
}

/// PCA result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PcaTable {
    /// Variables analyzed.
    pub variables: Vec<String>,
    /// Complete cases used.
    pub n: usize,
    /// Components in decreasing eigenvalue order.
    pub components: Vec<PcaRow>,
    /// Number of components reaching ≥80% cumulative variance.
    pub components_for_80: usize,
}

/// The single row of a not-applicable result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotApplicableRow {
    /// What the test needs and does not have.
    pub requirement: String,
    /// Actionable suggestion.
    pub suggestion: String,
}

// ── The table union ───────────────────────────────────────────────────

/// Closed union of all table shapes the engine produces. Each variant's
/// row type documents that test's contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TestTable {
    Frequencies(Vec<FrequencyRow>),
    Descriptives(Vec<DescriptiveRow>),
    MissingSummary(Vec<MissingRow>),
    Crosstab(CrosstabTable),
    Correlation(CorrelationTable),
    TTest(TTestTable),
    Anova(AnovaTable),
    Ranks(RankTable),
    Regression(RegressionTable),
    Logistic(LogisticTable),
    Paired(PairedTable),
    Pca(PcaTable),
    NotApplicable(NotApplicableRow),
    NotImplemented,
}

impl TestTable {
    /// Flattens the typed table into ordered label→cell rows for generic
    /// rendering.
    pub fn rows(&self) -> Vec<RenderedRow> {
        match self {
            Self::Frequencies(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        ("Value".into(), Cell::text(&r.value)),
                        ("Count".into(), Cell::count(r.count)),
                        ("Percent".into(), Cell::Number(r.percent)),
                    ]
                })
                .collect(),
            Self::Descriptives(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        ("Variable".into(), Cell::text(&r.variable)),
                        ("N".into(), Cell::count(r.n)),
                        ("Mean".into(), r.mean.clone()),
                        ("SD".into(), r.sd.clone()),
                        ("Min".into(), r.min.clone()),
                        ("Max".into(), r.max.clone()),
                    ]
                })
                .collect(),
            Self::MissingSummary(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        ("Variable".into(), Cell::text(&r.variable)),
                        ("Missing".into(), Cell::count(r.missing)),
                        ("Percent".into(), Cell::Number(r.percent)),
                        (
                            "Flag".into(),
                            Cell::text(if r.flagged { "over 30% missing" } else { "" }),
                        ),
                    ]
                })
                .collect(),
            Self::Crosstab(t) => {
                let mut out: Vec<RenderedRow> = t
                    .rows
                    .iter()
                    .map(|r| {
                        let mut row: RenderedRow =
                            vec![("Category".into(), Cell::text(&r.category))];
                        for (cat, &count) in t.col_categories.iter().zip(r.counts.iter()) {
                            row.push((cat.clone(), Cell::count(count)));
                        }
                        row.push(("Total".into(), Cell::count(r.total)));
                        row
                    })
                    .collect();
                let mut totals: RenderedRow = vec![("Category".into(), Cell::text("Total"))];
                for (cat, &count) in t.col_categories.iter().zip(t.col_totals.iter()) {
                    totals.push((cat.clone(), Cell::count(count)));
                }
                totals.push(("Total".into(), Cell::count(t.total)));
                out.push(totals);

                let mut stats: RenderedRow = vec![
                    ("Chi-Square".into(), Cell::stat(Some(t.chi_square))),
                    ("df".into(), Cell::count(t.df)),
                    ("p".into(), Cell::stat(Some(t.p))),
                    ("Cramér's V".into(), Cell::stat(Some(t.cramers_v))),
                ];
                if let Some(fp) = t.fisher_p {
                    stats.push(("Fisher's Exact p".into(), Cell::stat(Some(fp))));
                }
                out.push(stats);
                out
            }
            Self::Correlation(t) => vec![vec![
                ("Method".into(), Cell::text(&t.method)),
                (
                    "Variables".into(),
                    Cell::text(format!("{} × {}", t.var_x, t.var_y)),
                ),
                ("N".into(), Cell::count(t.n)),
                ("r".into(), Cell::stat(Some(t.r))),
                ("t".into(), t.t.clone()),
                ("df".into(), Cell::count(t.df)),
                ("p".into(), Cell::stat(Some(t.p))),
            ]],
            Self::TTest(t) => {
                let mut out = group_rows(&t.groups);
                out.push(stat_row("t (pooled)", Cell::stat(Some(t.t))));
                out.push(stat_row("df", Cell::count(t.df)));
                out.push(stat_row("p", Cell::stat(Some(t.p))));
                out.push(stat_row("Welch t", Cell::stat(Some(t.welch_t))));
                out.push(stat_row("Welch df", Cell::count(t.welch_df)));
                out.push(stat_row("Welch p", Cell::stat(Some(t.welch_p))));
                out.push(stat_row("Levene F", t.levene_f.clone()));
                out.push(stat_row("Levene p", t.levene_p.clone()));
                out.push(stat_row("Cohen's d", Cell::stat(Some(t.cohens_d))));
                out
            }
            Self::Anova(t) => {
                let mut out = group_rows(&t.groups);
                out.push(stat_row("F", Cell::stat(Some(t.f))));
                out.push(stat_row("df between", Cell::count(t.df_between)));
                out.push(stat_row("df within", Cell::count(t.df_within)));
                out.push(stat_row("p", Cell::stat(Some(t.p))));
                out.push(stat_row("Eta-squared", Cell::stat(Some(t.eta_squared))));
                out.push(stat_row("Levene F", t.levene_f.clone()));
                out.push(stat_row("Levene p", t.levene_p.clone()));
                for ph in &t.post_hoc {
                    out.push(vec![
                        (
                            "Comparison".into(),
                            Cell::text(format!("{} vs {}", ph.group_a, ph.group_b)),
                        ),
                        ("Mean Diff".into(), Cell::stat(Some(ph.mean_diff))),
                        ("q".into(), Cell::stat(Some(ph.q))),
                        ("q crit".into(), Cell::stat(Some(ph.q_crit))),
                        (
                            "Significant".into(),
                            Cell::text(if ph.significant { "yes" } else { "no" }),
                        ),
                    ]);
                }
                out
            }
            Self::Ranks(t) => {
                let mut out: Vec<RenderedRow> = t
                    .groups
                    .iter()
                    .map(|g| {
                        vec![
                            ("Group".into(), Cell::text(&g.group)),
                            ("N".into(), Cell::count(g.n)),
                            ("Mean Rank".into(), Cell::stat(Some(g.mean_rank))),
                        ]
                    })
                    .collect();
                match &t.statistic {
                    RankStatistic::MannWhitney { u, z } => {
                        out.push(stat_row("U", Cell::stat(Some(*u))));
                        out.push(stat_row("z", Cell::stat(Some(*z))));
                    }
                    RankStatistic::KruskalWallis { h, df } => {
                        out.push(stat_row("H", Cell::stat(Some(*h))));
                        out.push(stat_row("df", Cell::count(*df)));
                    }
                }
                out.push(stat_row("p", Cell::stat(Some(t.p))));
                out
            }
            Self::Regression(t) => {
                let mut out = vec![
                    stat_row("R²", Cell::stat(Some(t.r_squared))),
                    stat_row("F", Cell::stat(Some(t.f))),
                    stat_row(
                        "df",
                        Cell::text(format!("{}, {}", t.df_model, t.df_residual)),
                    ),
                    stat_row("p", Cell::stat(Some(t.p))),
                ];
                for c in &t.coefficients {
                    out.push(vec![
                        ("Term".into(), Cell::text(&c.term)),
                        ("Estimate".into(), Cell::stat(Some(c.estimate))),
                        ("SE".into(), c.se.clone()),
                        ("t".into(), c.t.clone()),
                        ("p".into(), c.p.clone()),
                    ]);
                }
                out
            }
            Self::Logistic(t) => {
                let mut out = vec![
                    stat_row("N", Cell::count(t.n)),
                    stat_row(
                        "Converged",
                        Cell::text(if t.converged { "yes" } else { "no" }),
                    ),
                ];
                for c in &t.coefficients {
                    out.push(vec![
                        ("Term".into(), Cell::text(&c.term)),
                        ("Estimate".into(), Cell::stat(Some(c.estimate))),
                        ("Odds Ratio".into(), Cell::stat(Some(c.odds_ratio))),
                        ("SE".into(), c.se.clone()),
                        ("p".into(), c.p.clone()),
                    ]);
                }
                out
            }
            Self::Paired(t) => vec![
                stat_row("N pairs", Cell::count(t.n)),
                stat_row(
                    format!("Mean ({})", t.first),
                    Cell::stat(Some(t.mean_first)),
                ),
                stat_row(
                    format!("Mean ({})", t.second),
                    Cell::stat(Some(t.mean_second)),
                ),
                stat_row("Mean Difference", Cell::stat(Some(t.mean_difference))),
                stat_row("SD of Differences", Cell::stat(Some(t.sd_difference))),
                stat_row("t", Cell::stat(Some(t.t))),
                stat_row("df", Cell::count(t.df)),
                stat_row("p", Cell::stat(Some(t.p))),
            ],
            Self::Pca(t) => t
                .components
                .iter()
                .map(|c| {
                    vec![
                        ("Component".into(), Cell::text(format!("PC{}", c.component))),
                        ("Eigenvalue".into(), Cell::stat(Some(c.eigenvalue))),
                        ("% Variance".into(), Cell::stat(Some(c.percent_variance))),
                        (
                            "Cumulative %".into(),
                            Cell::stat(Some(c.cumulative_percent)),
                        ),
                    ]
                })
                .collect(),
            Self::NotApplicable(r) => vec![vec![
                ("Requirement".into(), Cell::text(&r.requirement)),
                ("Suggestion".into(), Cell::text(&r.suggestion)),
            ]],
            Self::NotImplemented => vec![vec![(
                "Status".into(),
                Cell::text("not implemented"),
            )]],
        }
    }
}

fn stat_row(name: impl Into<String>, value: Cell) -> RenderedRow {
    vec![
        ("Statistic".into(), Cell::Text(name.into())),
        ("Value".into(), value),
    ]
}

fn group_rows(groups: &[GroupSummaryRow]) -> Vec<RenderedRow> {
    groups
        .iter()
        .map(|g| {
            vec![
                ("Group".into(), Cell::text(&g.group)),
                ("N".into(), Cell::count(g.n)),
                ("Mean".into(), Cell::stat(Some(g.mean))),
                ("SD".into(), g.sd.clone()),
            ]
        })
        .collect()
}

// ── TestResult ────────────────────────────────────────────────────────

/// The immutable outcome of one test run. Carries no reference back to
/// the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    /// Stable string identifier of the test.
    pub test_id: String,
    /// Human-readable test name.
    pub test_name: String,
    /// The typed result table.
    pub table: TestTable,
    /// Optional chart description.
    pub chart: Option<ChartSpec>,
    /// Narrative built from the literal computed statistics.
    pub insight: String,
    /// Optional plain-language restatement.
    pub plain_language: Option<String>,
    /// Optional suggested follow-up.
    pub next_step: Option<String>,
    /// Optional headline statistic, e.g. "t = 2.31".
    pub key_stat: Option<String>,
    /// Optional effect-size magnitude.
    pub effect_size: Option<f64>,
    /// Optional conventional label for the effect size.
    pub effect_size_label: Option<String>,
    /// Variable names consumed by the run.
    pub variables_analyzed: Option<Vec<String>>,
    /// Raw-code → display-label maps for the variables analyzed.
    pub value_label_maps: Option<BTreeMap<String, BTreeMap<String, String>>>,
}

impl TestResult {
    /// Creates a result with the required fields; optional fields attach
    /// via the builder methods.
    pub fn new(
        test_id: &str,
        test_name: &str,
        table: TestTable,
        insight: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.to_string(),
            test_name: test_name.to_string(),
            table,
            chart: None,
            insight: insight.into(),
            plain_language: None,
            next_step: None,
            key_stat: None,
            effect_size: None,
            effect_size_label: None,
            variables_analyzed: None,
            value_label_maps: None,
        }
    }

    /// Builds the structured not-applicable result for an expected
    /// infeasibility.
    pub fn not_applicable(test_id: &str, test_name: &str, inf: Infeasible) -> Self {
        let insight = format!("{} {}", inf.requirement, inf.suggestion);
        Self::new(
            test_id,
            test_name,
            TestTable::NotApplicable(NotApplicableRow {
                requirement: inf.requirement,
                suggestion: inf.suggestion,
            }),
            insight,
        )
    }

    /// Stub result for a test identifier the engine does not know.
    pub fn not_implemented(test_id: &str) -> Self {
        Self::new(
            test_id,
            test_id,
            TestTable::NotImplemented,
            format!("Test '{test_id}' is not implemented."),
        )
    }

    /// Attaches a chart.
    pub fn chart(mut self, chart: ChartSpec) -> Self {
        self.chart = Some(chart);
        self
    }

    /// Attaches a plain-language restatement.
    pub fn plain_language(mut self, text: impl Into<String>) -> Self {
        self.plain_language = Some(text.into());
        self
    }

    /// Attaches a suggested next step.
    pub fn next_step(mut self, text: impl Into<String>) -> Self {
        self.next_step = Some(text.into());
        self
    }

    /// Attaches the headline statistic.
    pub fn key_stat(mut self, text: impl Into<String>) -> Self {
        self.key_stat = Some(text.into());
        self
    }

    /// Attaches an effect size with its conventional label.
    pub fn effect_size(mut self, family: EffectFamily, value: f64) -> Self {
        self.effect_size = Some(round3(value));
        self.effect_size_label = Some(effect_size_label(family, value).to_string());
        self
    }

    /// Records which variables the run consumed.
    pub fn variables_analyzed(mut self, names: Vec<String>) -> Self {
        self.variables_analyzed = Some(names);
        self
    }

    /// Attaches value-label maps for downstream rendering.
    pub fn value_label_maps(mut self, maps: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        if !maps.is_empty() {
            self.value_label_maps = Some(maps);
        }
        self
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round3_behaviour() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0004), -0.0);
        assert_eq!(round1(33.333), 33.3);
    }

    #[test]
    fn cell_stat_sentinel_for_non_finite() {
        assert_eq!(Cell::stat(Some(f64::NAN)), Cell::Missing);
        assert_eq!(Cell::stat(Some(f64::INFINITY)), Cell::Missing);
        assert_eq!(Cell::stat(None), Cell::Missing);
        assert_eq!(Cell::stat(Some(1.23456)), Cell::Number(1.235));
    }

    #[test]
    fn cell_display_dash() {
        assert_eq!(Cell::Missing.to_string(), "—");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
    }

    #[test]
    fn fmt_p_floor() {
        assert_eq!(fmt_p(0.0001), "p < 0.001");
        assert_eq!(fmt_p(0.042), "p = 0.042");
    }

    #[test]
    fn effect_labels() {
        assert_eq!(effect_size_label(EffectFamily::CohensD, 0.9), "large");
        assert_eq!(effect_size_label(EffectFamily::CohensD, -0.9), "large");
        assert_eq!(effect_size_label(EffectFamily::CorrelationR, 0.2), "small");
        assert_eq!(effect_size_label(EffectFamily::EtaSquared, 0.07), "medium");
        assert_eq!(
            effect_size_label(EffectFamily::CramersV, 0.05),
            "negligible"
        );
    }

    #[test]
    fn not_applicable_concatenates_insight() {
        let r = TestResult::not_applicable(
            "ttest",
            "Independent t-test",
            Infeasible::new("Needs 2 groups.", "Pick a binary grouping variable."),
        );
        assert_eq!(
            r.insight,
            "Needs 2 groups. Pick a binary grouping variable."
        );
        assert!(matches!(r.table, TestTable::NotApplicable(_)));
        let rows = r.table.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].0, "Requirement");
    }

    #[test]
    fn rendered_crosstab_has_totals_and_stats() {
        let t = CrosstabTable {
            row_variable: "a".into(),
            col_variable: "b".into(),
            col_categories: vec!["x".into(), "y".into()],
            rows: vec![
                CrosstabRow {
                    category: "p".into(),
                    counts: vec![1, 2],
                    total: 3,
                },
                CrosstabRow {
                    category: "q".into(),
                    counts: vec![3, 4],
                    total: 7,
                },
            ],
            col_totals: vec![4, 6],
            total: 10,
            chi_square: 0.476,
            df: 1,
            p: 0.49,
            fisher_p: Some(1.0),
            cramers_v: 0.218,
        };
        let rows = TestTable::Crosstab(t).rows();
        // 2 data rows + totals row + statistics row
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2][0].1, Cell::text("Total"));
        assert!(rows[3].iter().any(|(k, _)| k == "Fisher's Exact p"));
    }

    #[test]
    fn builder_attaches_optionals() {
        let r = TestResult::new("pearson", "Pearson Correlation", TestTable::NotImplemented, "x")
            .key_stat("r = 0.8")
            .effect_size(EffectFamily::CorrelationR, 0.8)
            .variables_analyzed(vec!["a".into(), "b".into()]);
        assert_eq!(r.key_stat.as_deref(), Some("r = 0.8"));
        assert_eq!(r.effect_size, Some(0.8));
        assert_eq!(r.effect_size_label.as_deref(), Some("large"));
    }
}
