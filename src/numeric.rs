//! Numerical primitives and probability approximations.
//!
//! Everything numeric the test handlers need lives here: descriptive
//! moments, tie-aware ranking, Pearson/Spearman correlation, a symmetric
//! linear-system solver (Gaussian elimination with partial pivoting), a
//! power-iteration eigensolver, and the probability approximations used
//! for p-values.
//!
//! The p-value routines are deliberate *approximations*, not exact
//! distribution evaluations — a simplicity/no-external-library trade-off:
//!
//! - t → normal with a continuity adjustment below 30 degrees of freedom
//! - F and χ² via the Wilson–Hilferty cube-root-normal transform
//!
//! They diverge from exact CDFs at very small degrees of freedom. The
//! linear-algebra routines are kept behind narrow interfaces
//! ([`solve_linear_system`], [`top_eigenpairs`]) so a vetted numerical
//! library could replace them without touching any test handler.

use std::cmp::Ordering;

// ── Descriptive moments ───────────────────────────────────────────────

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample variance (n−1 denominator). `None` for fewer than 2 values.
pub fn variance(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 2 {
        return None;
    }
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    Some(ss / (n - 1) as f64)
}

/// Sample standard deviation. `None` for fewer than 2 values.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    variance(data).map(f64::sqrt)
}

/// Median. `None` for an empty slice.
pub fn median(data: &[f64]) -> Option<f64> {
    quantile(data, 0.5)
}

/// Quantile with linear interpolation between order statistics.
///
/// `q` is clamped to [0, 1]. `None` for an empty slice.
pub fn quantile(data: &[f64], q: f64) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Adjusted Fisher-Pearson sample skewness. `None` for fewer than 3 values
/// or zero spread.
pub fn skewness(data: &[f64]) -> Option<f64> {
    let n = data.len();
    if n < 3 {
        return None;
    }
    let m = mean(data)?;
    let sd = std_dev(data)?;
    if sd < 1e-300 {
        return None;
    }
    let nf = n as f64;
    let m3: f64 = data.iter().map(|&x| ((x - m) / sd).powi(3)).sum();
    Some(nf / ((nf - 1.0) * (nf - 2.0)) * m3)
}

// ── Ranks and correlation ─────────────────────────────────────────────

/// Mid-ranks for the values (1-based; tied values share the average of
/// their positions).
pub fn average_ranks(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| data[a].partial_cmp(&data[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && (data[order[j]] - data[order[i]]).abs() < 1e-12 {
            j += 1;
        }
        // Positions i..j are tied; average rank = (i+1 + j) / 2
        let avg = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            ranks[idx] = avg;
        }
        i = j;
    }
    ranks
}

/// Pearson product-moment correlation coefficient.
///
/// `None` for fewer than 3 pairs, length mismatch, or zero variance in
/// either variable.
pub fn pearson_r(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx < 1e-300 || syy < 1e-300 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Spearman rank correlation: Pearson on mid-ranks.
pub fn spearman_r(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    pearson_r(&average_ranks(x), &average_ranks(y))
}

/// Significance of a correlation coefficient: t = r·√((n−2)/(1−r²)) and
/// its two-tailed p. For |r| = 1 the p-value collapses to 0.
pub fn correlation_significance(r: f64, n: usize) -> (f64, f64) {
    let df = (n.saturating_sub(2)) as f64;
    let denom = 1.0 - r * r;
    if denom < 1e-12 {
        return (f64::INFINITY, 0.0);
    }
    let t = r * (df / denom).sqrt();
    (t, p_from_t(t, df))
}

// ── Probability approximations ────────────────────────────────────────

/// Standard normal CDF via the Abramowitz & Stegun erf approximation
/// (7.1.26), absolute error below 1.5e-7.
pub fn standard_normal_cdf(z: f64) -> f64 {
    if z < -8.0 {
        return 0.0;
    }
    if z > 8.0 {
        return 1.0;
    }
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

// Abramowitz & Stegun 7.1.26 rational approximation
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Inverse standard normal CDF via the Abramowitz & Stegun 26.2.23
/// rational approximation, absolute error below 4.5e-4.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    let (tail, sign) = if p < 0.5 { (p, -1.0) } else { (1.0 - p, 1.0) };
    let t = (-2.0 * tail.ln()).sqrt();
    let num = 2.30753 + 0.27061 * t;
    let den = 1.0 + 0.99229 * t + 0.04481 * t * t;
    sign * (t - num / den)
}

/// Two-tailed p-value for a t-statistic.
///
/// For df ≥ 30 the statistic is treated as standard normal; below that a
/// continuity-adjusted normal approximation is used:
/// z = t·(1 − 1/(4df)) / √(1 + t²/(2df)).
pub fn p_from_t(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    if df < 1.0 {
        return 1.0;
    }
    let t = t.abs();
    let z = if df >= 30.0 {
        t
    } else {
        t * (1.0 - 1.0 / (4.0 * df)) / (1.0 + t * t / (2.0 * df)).sqrt()
    };
    (2.0 * (1.0 - standard_normal_cdf(z))).clamp(0.0, 1.0)
}

/// Upper-tail p-value for an F-statistic via the Wilson–Hilferty
/// cube-root-normal approximation, keyed on the denominator degrees of
/// freedom only.
pub fn p_from_f(f: f64, df2: f64) -> f64 {
    if !f.is_finite() {
        return 0.0;
    }
    if f <= 0.0 || df2 < 1.0 {
        return 1.0;
    }
    let v = 2.0 / (9.0 * df2);
    let z = (f.powf(1.0 / 3.0) - (1.0 - v)) / v.sqrt();
    (1.0 - standard_normal_cdf(z)).clamp(0.0, 1.0)
}

/// Upper-tail p-value for a chi-square statistic via the Wilson–Hilferty
/// transform: (χ²/df)^(1/3) is approximately normal.
pub fn chi_square_p(x: f64, df: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    if x <= 0.0 || df < 1.0 {
        return 1.0;
    }
    let v = 2.0 / (9.0 * df);
    let z = ((x / df).powf(1.0 / 3.0) - (1.0 - v)) / v.sqrt();
    (1.0 - standard_normal_cdf(z)).clamp(0.0, 1.0)
}

/// Approximate 5% critical value of the studentized range statistic
/// q(k, df), via √2 × a Bonferroni-adjusted normal quantile with a
/// small-df inflation.
///
/// A hand-tuned closed form, not exact studentized-range tables; it runs
/// slightly conservative (within roughly ±0.2 of reference tables for
/// k ≤ 8, df ≥ 10).
pub fn q_crit(k: usize, df: f64) -> f64 {
    let m = (k * k.saturating_sub(1) / 2).max(1) as f64;
    let alpha = 0.05 / m;
    let z = inverse_normal_cdf(1.0 - alpha / 2.0);
    let t = if df >= 1.0 {
        z * (1.0 + (z * z + 1.0) / (4.0 * df))
    } else {
        z
    };
    std::f64::consts::SQRT_2 * t
}

// ── Exact hypergeometric (Fisher) ─────────────────────────────────────

// ln(n!) by direct accumulation; inputs here are cell counts, so the loop
// is short.
fn ln_factorial(n: u64) -> f64 {
    (2..=n).map(|i| (i as f64).ln()).sum()
}

// ln P(table | margins) under the hypergeometric distribution.
fn ln_hypergeom(a: u64, b: u64, c: u64, d: u64) -> f64 {
    let (r1, r2, c1, c2) = (a + b, c + d, a + c, b + d);
    let n = r1 + r2;
    ln_factorial(r1) + ln_factorial(r2) + ln_factorial(c1) + ln_factorial(c2)
        - ln_factorial(n)
        - ln_factorial(a)
        - ln_factorial(b)
        - ln_factorial(c)
        - ln_factorial(d)
}

/// Fisher's exact two-tailed p-value for a 2×2 table.
///
/// Enumerates every table with the observed margins and sums the
/// hypergeometric probabilities that do not exceed the observed table's
/// probability (the standard two-tailed definition). `None` if any margin
/// is zero.
pub fn fisher_exact_2x2(a: u64, b: u64, c: u64, d: u64) -> Option<f64> {
    let (r1, r2, c1, c2) = (a + b, c + d, a + c, b + d);
    if r1 == 0 || r2 == 0 || c1 == 0 || c2 == 0 {
        return None;
    }

    let ln_obs = ln_hypergeom(a, b, c, d);
    let lo = c1.saturating_sub(r2);
    let hi = r1.min(c1);

    let mut p = 0.0;
    for aa in lo..=hi {
        let bb = r1 - aa;
        let cc = c1 - aa;
        let dd = r2 - cc;
        let ln_p = ln_hypergeom(aa, bb, cc, dd);
        // Tolerance absorbs round-off when a table ties the observed one.
        if ln_p <= ln_obs + 1e-7 {
            p += ln_p.exp();
        }
    }
    Some(p.min(1.0))
}

// ── Linear algebra ────────────────────────────────────────────────────

/// Solves `A·x = b` by Gaussian elimination with partial pivoting.
///
/// `None` if the system is singular (a pivot smaller than 1e-12 relative
/// to the matrix scale).
pub fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = a.len();
    if n == 0 || b.len() != n || a.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented working copy
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &bi)| {
            let mut r = row.clone();
            r.push(bi);
            r
        })
        .collect();

    let scale = m
        .iter()
        .flat_map(|r| r.iter().take(n))
        .fold(0.0f64, |acc, &v| acc.max(v.abs()))
        .max(1.0);

    for col in 0..n {
        // Partial pivoting: largest absolute value in this column
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                m[i][col]
                    .abs()
                    .partial_cmp(&m[j][col].abs())
                    .unwrap_or(Ordering::Equal)
            })
            .unwrap_or(col);
        if m[pivot_row][col].abs() < 1e-12 * scale {
            return None;
        }
        m.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut sum = m[row][n];
        for k in (row + 1)..n {
            sum -= m[row][k] * x[k];
        }
        x[row] = sum / m[row][row];
    }
    Some(x)
}

/// Diagonal of `A⁻¹`, obtained by solving `A·x = eᵢ` for each canonical
/// basis vector. `None` if `A` is singular.
pub fn inverse_diagonal(a: &[Vec<f64>]) -> Option<Vec<f64>> {
    let n = a.len();
    let mut diag = Vec::with_capacity(n);
    for i in 0..n {
        let mut e = vec![0.0; n];
        e[i] = 1.0;
        let x = solve_linear_system(a, &e)?;
        diag.push(x[i]);
    }
    Some(diag)
}

/// Extracts the top `k` eigenpairs of a symmetric matrix by power
/// iteration with deflation.
///
/// Fixed procedure: uniform initial vector, 50 iterations, L2-normalize
/// each step, stop early if the iterate's norm falls below 1e-12; after
/// each component the working matrix is deflated by λ·vvᵀ. Pairs are
/// returned in decreasing eigenvalue order.
pub fn top_eigenpairs(matrix: &[Vec<f64>], k: usize) -> Vec<(f64, Vec<f64>)> {
    let d = matrix.len();
    if d == 0 || matrix.iter().any(|row| row.len() != d) {
        return Vec::new();
    }
    let k = k.min(d);

    let mut work: Vec<Vec<f64>> = matrix.to_vec();
    let mut pairs: Vec<(f64, Vec<f64>)> = Vec::with_capacity(k);

    for _ in 0..k {
        let mut v = vec![1.0 / (d as f64).sqrt(); d];

        for _ in 0..50 {
            // w = W·v
            let mut w = vec![0.0; d];
            for (i, row) in work.iter().enumerate() {
                w[i] = row.iter().zip(v.iter()).map(|(&a, &b)| a * b).sum();
            }
            let norm = w.iter().map(|&x| x * x).sum::<f64>().sqrt();
            if norm < 1e-12 {
                break;
            }
            for (vi, wi) in v.iter_mut().zip(w.iter()) {
                *vi = wi / norm;
            }
        }

        // Rayleigh quotient λ = vᵀWv (v is unit length)
        let mut lambda = 0.0;
        for (i, row) in work.iter().enumerate() {
            let wv: f64 = row.iter().zip(v.iter()).map(|(&a, &b)| a * b).sum();
            lambda += v[i] * wv;
        }

        // Deflation: W ← W − λ·vvᵀ
        for i in 0..d {
            for j in 0..d {
                work[i][j] -= lambda * v[i] * v[j];
            }
        }

        pairs.push((lambda, v));
    }

    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    pairs
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Moments ──────────────────────────────────────────────────

    #[test]
    fn mean_and_std_dev() {
        let data = [2.0, 4.0, 6.0, 8.0];
        assert_eq!(mean(&data), Some(5.0));
        let sd = std_dev(&data).unwrap();
        assert!((sd - (20.0f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn std_dev_needs_two() {
        assert_eq!(std_dev(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn quantile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&data, 0.0), Some(1.0));
        assert_eq!(quantile(&data, 1.0), Some(4.0));
        assert!((quantile(&data, 0.25).unwrap() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn skewness_symmetric_zero() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(skewness(&data).unwrap().abs() < 1e-12);
    }

    #[test]
    fn skewness_right_tail_positive() {
        let data = [1.0, 1.0, 1.0, 2.0, 10.0];
        assert!(skewness(&data).unwrap() > 0.0);
    }

    // ── Ranks & correlation ──────────────────────────────────────

    #[test]
    fn ranks_with_ties() {
        let r = average_ranks(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(r, vec![1.0, 2.5, 2.5, 4.0]);
    }

    #[test]
    fn pearson_perfect_linear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert!((pearson_r(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_zero_variance() {
        let x = [1.0, 1.0, 1.0];
        let y = [2.0, 3.0, 4.0];
        assert_eq!(pearson_r(&x, &y), None);
    }

    #[test]
    fn spearman_monotonic_nonlinear() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert!((spearman_r(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_significance_perfect_r() {
        let (t, p) = correlation_significance(1.0, 10);
        assert!(t.is_infinite());
        assert_eq!(p, 0.0);
    }

    // ── Probability approximations ───────────────────────────────

    #[test]
    fn normal_cdf_known_values() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
        assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-3);
        let sym = standard_normal_cdf(1.3) + standard_normal_cdf(-1.3);
        assert!((sym - 1.0).abs() < 1e-7);
    }

    #[test]
    fn inverse_normal_round_trip() {
        for &p in &[0.025, 0.1, 0.5, 0.9, 0.975] {
            let z = inverse_normal_cdf(p);
            assert!((standard_normal_cdf(z) - p).abs() < 1e-3, "p={p}");
        }
    }

    #[test]
    fn p_from_t_large_df_matches_normal() {
        let p = p_from_t(1.96, 100.0);
        assert!((p - 0.05).abs() < 2e-3, "p={p}");
    }

    #[test]
    fn p_from_t_monotone_in_t() {
        assert!(p_from_t(3.0, 10.0) < p_from_t(1.0, 10.0));
        assert!(p_from_t(0.0, 10.0) > 0.99);
    }

    #[test]
    fn chi_square_threshold_near_05() {
        // χ² = 3.84 with df = 1 corresponds to p ≈ 0.05
        let p = chi_square_p(3.84, 1.0);
        assert!((p - 0.05).abs() < 0.01, "p={p}");
    }

    #[test]
    fn f_p_decreases_with_f() {
        assert!(p_from_f(8.0, 20.0) < p_from_f(2.0, 20.0));
        assert!(p_from_f(0.0, 20.0) >= 0.999);
    }

    #[test]
    fn q_crit_plausible_range() {
        // Reference tables: q(3, 20) ≈ 3.58, q(4, 20) ≈ 3.96
        let q3 = q_crit(3, 20.0);
        let q4 = q_crit(4, 20.0);
        assert!(q3 > 3.0 && q3 < 4.2, "q3={q3}");
        assert!(q4 > q3 && q4 < 4.6, "q4={q4}");
    }

    // ── Fisher exact ─────────────────────────────────────────────

    #[test]
    fn fisher_perfect_separation() {
        let p = fisher_exact_2x2(10, 0, 0, 10).unwrap();
        assert!(p < 0.001, "p={p}");
    }

    #[test]
    fn fisher_no_association() {
        let p = fisher_exact_2x2(5, 5, 5, 5).unwrap();
        assert!(p > 0.9, "p={p}");
    }

    #[test]
    fn fisher_degenerate_margin() {
        assert_eq!(fisher_exact_2x2(0, 0, 5, 5), None);
    }

    #[test]
    fn fisher_classic_tea_tasting() {
        // Fisher (1935): 3/1 vs 1/3 has two-tailed p ≈ 0.486
        let p = fisher_exact_2x2(3, 1, 1, 3).unwrap();
        assert!((p - 0.486).abs() < 0.01, "p={p}");
    }

    // ── Linear algebra ───────────────────────────────────────────

    #[test]
    fn solve_2x2_system() {
        let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
        let b = vec![5.0, 10.0];
        let x = solve_linear_system(&a, &b).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-10);
        assert!((x[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn solve_requires_pivoting() {
        // Zero in the top-left forces a row swap
        let a = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let b = vec![2.0, 3.0];
        let x = solve_linear_system(&a, &b).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-10);
        assert!((x[1] - 2.0).abs() < 1e-10);
    }

    #[test]
    fn solve_singular_returns_none() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        let b = vec![1.0, 2.0];
        assert_eq!(solve_linear_system(&a, &b), None);
    }

    #[test]
    fn inverse_diagonal_of_diagonal_matrix() {
        let a = vec![vec![2.0, 0.0], vec![0.0, 4.0]];
        let d = inverse_diagonal(&a).unwrap();
        assert!((d[0] - 0.5).abs() < 1e-12);
        assert!((d[1] - 0.25).abs() < 1e-12);
    }

    // ── Eigensolver ──────────────────────────────────────────────

    #[test]
    fn eigenpairs_of_diagonal_matrix() {
        let m = vec![vec![3.0, 0.0], vec![0.0, 1.0]];
        let pairs = top_eigenpairs(&m, 2);
        assert!((pairs[0].0 - 3.0).abs() < 1e-6);
        assert!((pairs[1].0 - 1.0).abs() < 1e-6);
        // Dominant eigenvector along the first axis
        assert!(pairs[0].1[0].abs() > 0.99);
    }

    #[test]
    fn eigenvalue_sum_equals_trace() {
        let m = vec![
            vec![2.0, 0.5, 0.1],
            vec![0.5, 1.5, 0.2],
            vec![0.1, 0.2, 1.0],
        ];
        let pairs = top_eigenpairs(&m, 3);
        let sum: f64 = pairs.iter().map(|(l, _)| l).sum();
        assert!((sum - 4.5).abs() < 1e-6, "sum={sum}");
    }

    #[test]
    fn eigenvectors_unit_length() {
        let m = vec![vec![2.0, 1.0], vec![1.0, 2.0]];
        for (_, v) in top_eigenpairs(&m, 2) {
            let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn rank_deficient_matrix_zero_second_eigenvalue() {
        // Two identical directions: rank 1
        let m = vec![vec![2.0, 2.0], vec![2.0, 2.0]];
        let pairs = top_eigenpairs(&m, 2);
        assert!((pairs[0].0 - 4.0).abs() < 1e-6);
        assert!(pairs[1].0.abs() < 1e-6);
    }
}
