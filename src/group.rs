//! Group comparison tests: independent t-test, one-way ANOVA with
//! Tukey-style post-hoc comparisons, and the rank-based alternatives
//! (Mann-Whitney U for two groups, Kruskal-Wallis for three or more).
//!
//! Levene's test for equality of variances is computed as a one-way ANOVA
//! on absolute deviations from each group's median (Brown & Forsythe,
//! 1974), and drives the pooled-vs-Welch recommendation in the t-test
//! narrative.

use crate::classify;
use crate::dataset::{Dataset, Variable};
use crate::engine::TestId;
use crate::numeric;
use crate::output::{
    fmt_p, AnovaTable, Cell, ChartPoint, ChartSpec, EffectFamily, GroupSummaryRow, Infeasible,
    PostHocRow, RankGroupRow, RankStatistic, RankTable, TTestTable, TestResult, TestTable,
};

// ── Shared plumbing ───────────────────────────────────────────────────

struct GroupedData<'a> {
    outcome: &'a Variable,
    group_var: &'a Variable,
    /// (display label, observations), first-appearance order.
    groups: Vec<(String, Vec<f64>)>,
}

fn resolve_groups<'a>(
    ds: &'a Dataset,
    selected: &[&'a Variable],
    wanted: Option<usize>,
) -> Result<GroupedData<'a>, Infeasible> {
    let (outcome, group_var) = match selected {
        [a, b, ..] => (*a, *b),
        [a] => {
            // A lone categorical name is the grouping variable, a lone
            // scale name the outcome; derive the other half.
            let (outcome, group) = if a.level.is_categorical() {
                (
                    classify::preferred_outcome(&classify::scale_candidates(ds)),
                    Some(*a),
                )
            } else {
                (Some(*a), classify::grouping_candidate(ds, wanted))
            };
            match (outcome, group) {
                (Some(o), Some(g)) => (o, g),
                _ => {
                    return Err(Infeasible::new(
                        "A scale outcome and a categorical grouping variable are required.",
                        "Set one variable to scale and one to nominal or ordinal.",
                    ))
                }
            }
        }
        [] => {
            let scales = classify::scale_candidates(ds);
            let outcome = classify::preferred_outcome(&scales);
            let group = classify::grouping_candidate(ds, wanted);
            match (outcome, group) {
                (Some(o), Some(g)) => (o, g),
                _ => {
                    return Err(Infeasible::new(
                        "A scale outcome and a categorical grouping variable are required.",
                        "Set one variable to scale and one to nominal or ordinal.",
                    ))
                }
            }
        }
    };
    let groups = ds
        .grouped_numeric(group_var, outcome)
        .into_iter()
        .map(|(cat, vals)| (group_var.display_label(&cat), vals))
        .collect();
    Ok(GroupedData {
        outcome,
        group_var,
        groups,
    })
}

/// One-way decomposition over the given groups.
struct OneWay {
    f: f64,
    df_between: usize,
    df_within: usize,
    ss_between: f64,
    ss_total: f64,
    ms_within: f64,
}

/// `None` when fewer than 2 groups, no within-group degrees of freedom,
/// or zero within-group variance.
fn one_way(groups: &[Vec<f64>]) -> Option<OneWay> {
    let k = groups.len();
    let n: usize = groups.iter().map(Vec::len).sum();
    if k < 2 || n <= k {
        return None;
    }
    let grand: f64 = groups.iter().flatten().sum::<f64>() / n as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in groups {
        let m = numeric::mean(g)?;
        ss_between += g.len() as f64 * (m - grand) * (m - grand);
        ss_within += g.iter().map(|&x| (x - m) * (x - m)).sum::<f64>();
    }
    let df_between = k - 1;
    let df_within = n - k;
    let ms_within = ss_within / df_within as f64;
    if ms_within < 1e-300 {
        return None;
    }
    let f = (ss_between / df_between as f64) / ms_within;
    Some(OneWay {
        f,
        df_between,
        df_within,
        ss_between,
        ss_total: ss_between + ss_within,
        ms_within,
    })
}

/// Levene's F and p from absolute deviations around each group's median.
fn levene(groups: &[Vec<f64>]) -> Option<(f64, f64)> {
    let deviations: Option<Vec<Vec<f64>>> = groups
        .iter()
        .map(|g| {
            let med = numeric::median(g)?;
            Some(g.iter().map(|&x| (x - med).abs()).collect())
        })
        .collect();
    let ow = one_way(&deviations?)?;
    Some((ow.f, numeric::p_from_f(ow.f, ow.df_within as f64)))
}

fn group_summaries(groups: &[(String, Vec<f64>)]) -> Vec<GroupSummaryRow> {
    groups
        .iter()
        .map(|(label, vals)| GroupSummaryRow {
            group: label.clone(),
            n: vals.len(),
            mean: numeric::mean(vals).unwrap_or(0.0),
            sd: Cell::stat(numeric::std_dev(vals)),
        })
        .collect()
}

fn means_chart(summaries: &[GroupSummaryRow]) -> ChartSpec {
    ChartSpec::bar(
        "group",
        "mean",
        summaries
            .iter()
            .map(|g| ChartPoint {
                label: g.group.clone(),
                value: g.mean,
            })
            .collect(),
    )
}

// ── Independent t-test ────────────────────────────────────────────────

pub fn independent_ttest(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let data = resolve_groups(ds, selected, Some(2))?;
    let k = data.groups.len();
    if k != 2 {
        return Err(Infeasible::new(
            format!("Grouping variable has {k} categories; t-test requires exactly 2."),
            "Choose a grouping variable with exactly two categories.",
        ));
    }
    for (label, vals) in &data.groups {
        if vals.len() < 2 {
            return Err(Infeasible::new(
                format!(
                    "Group '{}' has only {} observation(s); t-test requires at least 2 per group.",
                    label,
                    vals.len()
                ),
                "Collect more observations for each group.",
            ));
        }
    }

    let (g1, g2) = (&data.groups[0], &data.groups[1]);
    let (n1, n2) = (g1.1.len() as f64, g2.1.len() as f64);
    let (m1, m2) = (
        numeric::mean(&g1.1).unwrap_or(0.0),
        numeric::mean(&g2.1).unwrap_or(0.0),
    );
    let (v1, v2) = (
        numeric::variance(&g1.1).unwrap_or(0.0),
        numeric::variance(&g2.1).unwrap_or(0.0),
    );

    let df = n1 + n2 - 2.0;
    let pooled_var = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    if pooled_var < 1e-300 {
        return Err(Infeasible::new(
            "Outcome has zero variance within both groups.",
            "Choose an outcome whose values vary.",
        ));
    }
    let mean_diff = m1 - m2;
    let t = mean_diff / (pooled_var * (1.0 / n1 + 1.0 / n2)).sqrt();
    let p = numeric::p_from_t(t, df);

    // Welch with Satterthwaite df
    let se2 = v1 / n1 + v2 / n2;
    let welch_t = mean_diff / se2.sqrt();
    let welch_df_raw = se2 * se2
        / ((v1 / n1) * (v1 / n1) / (n1 - 1.0) + (v2 / n2) * (v2 / n2) / (n2 - 1.0));
    let welch_df = (welch_df_raw.round().max(1.0)) as usize;
    let welch_p = numeric::p_from_t(welch_t, welch_df as f64);

    let lev = levene(&[g1.1.clone(), g2.1.clone()]);
    let cohens_d = mean_diff / pooled_var.sqrt();

    let summaries = group_summaries(&data.groups);
    let variance_note = match lev {
        Some((_, lp)) if lp < 0.05 => format!(
            "Levene's test indicates unequal variances ({}); prefer Welch's t({}) = {:.3}, {}.",
            fmt_p(lp),
            welch_df,
            welch_t,
            fmt_p(welch_p)
        ),
        Some((_, lp)) => format!(
            "Levene's test indicates equal variances ({}); the pooled t is appropriate.",
            fmt_p(lp)
        ),
        None => "Levene's test could not be computed; the pooled t is reported.".to_string(),
    };
    let d_label = crate::output::effect_size_label(EffectFamily::CohensD, cohens_d);
    let insight = format!(
        "Mean({}) = {:.2}, Mean({}) = {:.2}; t({}) = {:.3}, {}. {} Cohen's d = {:.3} ({}).",
        g1.0,
        m1,
        g2.0,
        m2,
        df as usize,
        t,
        fmt_p(p),
        variance_note,
        cohens_d,
        d_label
    );

    let chart = means_chart(&summaries);
    Ok(TestResult::new(
        TestId::IndependentTTest.as_str(),
        TestId::IndependentTTest.display_name(),
        TestTable::TTest(TTestTable {
            outcome: data.outcome.label.clone(),
            group_variable: data.group_var.label.clone(),
            groups: summaries,
            mean_difference: mean_diff,
            t,
            df: df as usize,
            p,
            welch_t,
            welch_df,
            welch_p,
            levene_f: Cell::stat(lev.map(|(f, _)| f)),
            levene_p: Cell::stat(lev.map(|(_, p)| p)),
            cohens_d,
        }),
        insight,
    )
    .chart(chart)
    .key_stat(format!("t = {t:.3}"))
    .effect_size(EffectFamily::CohensD, cohens_d)
    .variables_analyzed(vec![
        data.outcome.name.clone(),
        data.group_var.name.clone(),
    ]))
}

// ── One-way ANOVA ─────────────────────────────────────────────────────

pub fn one_way_anova(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let data = resolve_groups(ds, selected, Some(3))?;
    let k = data.groups.len();
    if k < 3 {
        let suggestion = if k == 2 {
            "Use the independent t-test for two groups."
        } else {
            "Choose a grouping variable with three or more categories."
        };
        return Err(Infeasible::new(
            format!("Grouping variable has {k} categories; ANOVA requires at least 3."),
            suggestion,
        ));
    }
    for (label, vals) in &data.groups {
        if vals.len() < 2 {
            return Err(Infeasible::new(
                format!(
                    "Group '{}' has only {} observation(s); ANOVA requires at least 2 per group.",
                    label,
                    vals.len()
                ),
                "Collect more observations for each group.",
            ));
        }
    }

    let value_groups: Vec<Vec<f64>> = data.groups.iter().map(|(_, v)| v.clone()).collect();
    let ow = one_way(&value_groups).ok_or_else(|| {
        Infeasible::new(
            "Outcome has zero variance within groups.",
            "Choose an outcome whose values vary.",
        )
    })?;
    let p = numeric::p_from_f(ow.f, ow.df_within as f64);
    let eta_squared = ow.ss_between / ow.ss_total;
    let lev = levene(&value_groups);

    // Pairwise Tukey-style comparisons, only after a significant omnibus F
    let mut post_hoc = Vec::new();
    if p < 0.05 {
        let qc = numeric::q_crit(k, ow.df_within as f64);
        for i in 0..k {
            for j in (i + 1)..k {
                let (la, va) = (&data.groups[i].0, &data.groups[i].1);
                let (lb, vb) = (&data.groups[j].0, &data.groups[j].1);
                let diff =
                    (numeric::mean(va).unwrap_or(0.0) - numeric::mean(vb).unwrap_or(0.0)).abs();
                let se = (ow.ms_within
                    * (1.0 / va.len() as f64 + 1.0 / vb.len() as f64))
                    .sqrt();
                let q = diff / se;
                post_hoc.push(PostHocRow {
                    group_a: la.clone(),
                    group_b: lb.clone(),
                    mean_diff: diff,
                    q,
                    q_crit: qc,
                    significant: q > qc,
                });
            }
        }
    }

    let eta_label = crate::output::effect_size_label(EffectFamily::EtaSquared, eta_squared);
    let mut insight = format!(
        "F({}, {}) = {:.3}, {}; η² = {:.3} ({} effect).",
        ow.df_between,
        ow.df_within,
        ow.f,
        fmt_p(p),
        eta_squared,
        eta_label
    );
    if p < 0.05 {
        let sig: Vec<&PostHocRow> = post_hoc.iter().filter(|r| r.significant).collect();
        match sig.first() {
            Some(first) => insight.push_str(&format!(
                " Post-hoc: {} pair(s) differ, including '{}' vs '{}' (q = {:.3}).",
                sig.len(),
                first.group_a,
                first.group_b,
                first.q
            )),
            None => insight.push_str(" Post-hoc comparisons find no pairwise difference."),
        }
    } else {
        insight.push_str(" Group means do not differ significantly.");
    }

    let summaries = group_summaries(&data.groups);
    let chart = means_chart(&summaries);
    Ok(TestResult::new(
        TestId::OneWayAnova.as_str(),
        TestId::OneWayAnova.display_name(),
        TestTable::Anova(AnovaTable {
            outcome: data.outcome.label.clone(),
            group_variable: data.group_var.label.clone(),
            groups: summaries,
            f: ow.f,
            df_between: ow.df_between,
            df_within: ow.df_within,
            p,
            eta_squared,
            levene_f: Cell::stat(lev.map(|(f, _)| f)),
            levene_p: Cell::stat(lev.map(|(_, p)| p)),
            post_hoc,
        }),
        insight,
    )
    .chart(chart)
    .key_stat(format!("F = {:.3}", ow.f))
    .effect_size(EffectFamily::EtaSquared, eta_squared)
    .variables_analyzed(vec![
        data.outcome.name.clone(),
        data.group_var.name.clone(),
    ]))
}

// ── Mann-Whitney U / Kruskal-Wallis ───────────────────────────────────

pub fn rank_comparison(
    ds: &Dataset,
    selected: &[&Variable],
) -> Result<TestResult, Infeasible> {
    let data = resolve_groups(ds, selected, None)?;
    let k = data.groups.len();
    if k < 2 {
        return Err(Infeasible::new(
            format!("Grouping variable has {k} categories; at least 2 are required."),
            "Choose a grouping variable with two or more categories.",
        ));
    }
    let n: usize = data.groups.iter().map(|(_, v)| v.len()).sum();
    if n < 3 {
        return Err(Infeasible::new(
            format!("Rank comparison requires at least 3 observations; found {n}."),
            "Collect more observations.",
        ));
    }

    // Rank the combined sample with mid-ranks for ties
    let combined: Vec<f64> = data.groups.iter().flat_map(|(_, v)| v.clone()).collect();
    let ranks = numeric::average_ranks(&combined);
    let mut rank_sums = Vec::with_capacity(k);
    let mut offset = 0;
    for (_, vals) in &data.groups {
        let sum: f64 = ranks[offset..offset + vals.len()].iter().sum();
        rank_sums.push(sum);
        offset += vals.len();
    }

    let group_rows: Vec<RankGroupRow> = data
        .groups
        .iter()
        .zip(rank_sums.iter())
        .map(|((label, vals), &sum)| RankGroupRow {
            group: label.clone(),
            n: vals.len(),
            mean_rank: sum / vals.len() as f64,
        })
        .collect();
    let top = group_rows
        .iter()
        .max_by(|a, b| {
            a.mean_rank
                .partial_cmp(&b.mean_rank)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|g| g.group.clone())
        .unwrap_or_default();

    let (statistic, p, insight) = if k == 2 {
        let (n1, n2) = (data.groups[0].1.len() as f64, data.groups[1].1.len() as f64);
        let u1 = n1 * n2 + n1 * (n1 + 1.0) / 2.0 - rank_sums[0];
        let u2 = n1 * n2 - u1;
        let u = u1.min(u2);
        let mu = n1 * n2 / 2.0;
        let sigma = (n1 * n2 * (n1 + n2 + 1.0) / 12.0).sqrt();
        let z = (u - mu) / sigma;
        let p = (2.0 * (1.0 - numeric::standard_normal_cdf(z.abs()))).clamp(0.0, 1.0);
        let insight = format!(
            "Mann-Whitney U = {:.1}, z = {:.3}, {}; '{}' has the higher mean rank.",
            u,
            z,
            fmt_p(p),
            top
        );
        (RankStatistic::MannWhitney { u, z }, p, insight)
    } else {
        let nf = n as f64;
        let mut h = rank_sums
            .iter()
            .zip(data.groups.iter())
            .map(|(&r, (_, v))| r * r / v.len() as f64)
            .sum::<f64>()
            * 12.0
            / (nf * (nf + 1.0))
            - 3.0 * (nf + 1.0);
        // Tie correction: divide by 1 − Σ(t³−t)/(n³−n)
        let mut sorted = combined.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mut tie_sum = 0.0;
        let mut i = 0;
        while i < sorted.len() {
            let mut j = i + 1;
            while j < sorted.len() && (sorted[j] - sorted[i]).abs() < 1e-12 {
                j += 1;
            }
            let t = (j - i) as f64;
            tie_sum += t * t * t - t;
            i = j;
        }
        let correction = 1.0 - tie_sum / (nf * nf * nf - nf);
        h = if correction > 0.0 { h / correction } else { 0.0 };

        let df = k - 1;
        let z = (h - df as f64) / (2.0 * df as f64).sqrt();
        let p = (1.0 - numeric::standard_normal_cdf(z)).clamp(0.0, 1.0);
        let insight = format!(
            "Kruskal-Wallis H = {:.3} (df = {}), {}; highest mean rank: '{}'.",
            h,
            df,
            fmt_p(p),
            top
        );
        (RankStatistic::KruskalWallis { h, df }, p, insight)
    };

    Ok(TestResult::new(
        TestId::RankComparison.as_str(),
        TestId::RankComparison.display_name(),
        TestTable::Ranks(RankTable {
            outcome: data.outcome.label.clone(),
            group_variable: data.group_var.label.clone(),
            groups: group_rows,
            statistic,
            p,
        }),
        insight,
    )
    .variables_analyzed(vec![
        data.outcome.name.clone(),
        data.group_var.name.clone(),
    ]))
}

// ── Tests ─────────────────────────────────────────────────────────────
