use crate::utils::Result;
use statrs::distribution::{Binomial, ChiSquared, ContinuousCDF, DiscreteCDF};

/// Largest sample size for which the exact KS distribution is computed.
const KS_EXACT_MAX_SIZE: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    pub statistic: f64,
    pub p_value: f64,
}

/// Two-sample Kolmogorov-Smirnov test on integer-valued samples.
///
/// Ties are handled by stepping both empirical CDFs past every copy of a
/// value before taking the difference. The two-sided p-value is exact up to
/// `KS_EXACT_MAX_SIZE` observations per sample; larger samples use the
/// asymptotic Kolmogorov distribution with Stephens' small-sample
/// correction. An empty sample cannot reject the null, so it yields a
/// p-value of 1.
pub fn ks_two_sample(a: &[usize], b: &[usize]) -> KsResult {
    if a.is_empty() || b.is_empty() {
        return KsResult {
            statistic: 0.0,
            p_value: 1.0,
        };
    }

    let mut a_sorted = a.to_vec();
    let mut b_sorted = b.to_vec();
    a_sorted.sort_unstable();
    b_sorted.sort_unstable();

    let (n_a, n_b) = (a_sorted.len(), b_sorted.len());
    let (mut i, mut j) = (0, 0);
    let mut d_max: f64 = 0.0;
    while i < n_a && j < n_b {
        let value = a_sorted[i].min(b_sorted[j]);
        while i < n_a && a_sorted[i] == value {
            i += 1;
        }
        while j < n_b && b_sorted[j] == value {
            j += 1;
        }
        let cdf_a = i as f64 / n_a as f64;
        let cdf_b = j as f64 / n_b as f64;
        d_max = d_max.max((cdf_a - cdf_b).abs());
    }

    let p_value = if n_a.max(n_b) <= KS_EXACT_MAX_SIZE {
        ks_exact_upper_tail(n_a, n_b, d_max)
    } else {
        let en = (n_a * n_b) as f64 / (n_a + n_b) as f64;
        let lambda = (en.sqrt() + 0.12 + 0.11 / en.sqrt()) * d_max;
        kolmogorov_upper_tail(lambda)
    };

    KsResult {
        statistic: d_max,
        p_value: p_value.clamp(0.0, 1.0),
    }
}

/// P(D >= d) under the null for sample sizes `n` and `m`.
///
/// Counts the monotone lattice paths from (0, 0) to (n, m) that stay
/// strictly inside |i/n - j/m| < d, working in units of lcm(n, m) so the
/// boundary test is integral. Each cell holds the fraction of all paths
/// reaching it, which keeps the values in [0, 1].
fn ks_exact_upper_tail(n: usize, m: usize, d: f64) -> f64 {
    let lcm = n / gcd(n, m) * m;
    let (step_i, step_j) = ((lcm / n) as i64, (lcm / m) as i64);
    let h = (d * lcm as f64).round() as i64;
    if h <= 0 {
        return 1.0;
    }
    let inside = |i: usize, j: usize| (i as i64 * step_i - j as i64 * step_j).abs() < h;

    let mut row = vec![0.0; m + 1];
    for i in 0..=n {
        for j in 0..=m {
            let fraction = if !inside(i, j) {
                0.0
            } else if i == 0 && j == 0 {
                1.0
            } else {
                let total = (i + j) as f64;
                let from_above = if i > 0 { row[j] * i as f64 / total } else { 0.0 };
                let from_left = if j > 0 { row[j - 1] * j as f64 / total } else { 0.0 };
                from_above + from_left
            };
            row[j] = fraction;
        }
    }
    1.0 - row[m]
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Q_KS(z) = 1 - P_KS(z); the theta-function form is used below z = 1.18
/// where the alternating series converges slowly.
fn kolmogorov_upper_tail(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z < 1.18 {
        let y = (-1.233_700_550_136_169_8 / (z * z)).exp();
        let cdf = 2.256_758_334_191_025 * (-y.ln()).sqrt() * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - cdf
    } else {
        let x = (-2.0 * z * z).exp();
        2.0 * (x - x.powi(4) + x.powi(9))
    }
}

/// Upper-tail probability of a chi-square statistic.
pub fn chi_square_upper_tail(statistic: f64, dof: f64) -> Result<f64> {
    if statistic <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(dof).map_err(|e| format!("Invalid chi-square dof {}: {}", dof, e))?;
    Ok(dist.sf(statistic))
}

/// P(X <= k) for X ~ Binomial(n, p).
pub fn binomial_lower_tail(k: u64, n: u64, p: f64) -> Result<f64> {
    if n == 0 || k >= n {
        return Ok(1.0);
    }
    let dist = Binomial::new(p, n).map_err(|e| format!("Invalid binomial ({}, {}): {}", n, p, e))?;
    Ok(dist.cdf(k))
}

/// Summary statistics of a sample of counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub min: usize,
    pub max: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
}

/// Range, mean, median and population standard deviation; all zero for an
/// empty sample.
pub fn calculate_stats(data: &[usize]) -> Stats {
    if data.is_empty() {
        return Stats {
            min: 0,
            max: 0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
        };
    }
    let mut sorted = data.to_vec();
    sorted.sort_unstable();
    let len = sorted.len();
    let median = if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) as f64 / 2.0
    } else {
        sorted[len / 2] as f64
    };
    let sum: usize = sorted.iter().sum();
    let mean = sum as f64 / len as f64;
    let std_dev = (sorted
        .iter()
        .map(|&x| (x as f64 - mean).powi(2))
        .sum::<f64>()
        / len as f64)
        .sqrt();
    Stats {
        min: sorted[0],
        max: sorted[len - 1],
        mean,
        median,
        std_dev,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ks_identical_samples_do_not_reject() {
        let sample = vec![10, 10, 11, 12, 12, 12];
        let result = ks_two_sample(&sample, &sample);
        assert_eq!(result.statistic, 0.0);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn ks_statistic_handles_ties() {
        let a = vec![1, 2, 3, 4, 5];
        let b = vec![3, 4, 5, 6, 7];
        let result = ks_two_sample(&a, &b);
        assert_abs_diff_eq!(result.statistic, 0.4, epsilon = 1e-12);

        let a = vec![10; 50];
        let mut b = vec![10; 25];
        b.extend(vec![14; 25]);
        let result = ks_two_sample(&a, &b);
        assert_abs_diff_eq!(result.statistic, 0.5, epsilon = 1e-12);
        assert!(result.p_value < 1e-4);
    }

    #[test]
    fn ks_disjoint_samples_reject() {
        let a = vec![5; 100];
        let b = vec![9; 100];
        let result = ks_two_sample(&a, &b);
        assert_eq!(result.statistic, 1.0);
        assert!(result.p_value < 1e-10);
    }

    #[test]
    fn ks_small_samples_use_exact_distribution() {
        // D = 12/40 on 40 vs 40 reads
        let normal = vec![10; 40];
        let mut tumor = vec![10; 28];
        tumor.extend(vec![14; 12]);
        let result = ks_two_sample(&normal, &tumor);
        assert_abs_diff_eq!(result.statistic, 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(result.p_value, 0.054141, epsilon = 1e-5);

        // D = 9/25 on 25 vs 25 reads
        let a = vec![10; 25];
        let mut b = vec![10; 16];
        b.extend(vec![12; 9]);
        assert_abs_diff_eq!(ks_two_sample(&a, &b).p_value, 0.077898, epsilon = 1e-5);
    }

    #[test]
    fn ks_exact_tail_of_unequal_samples() {
        assert_eq!(gcd(40, 50), 10);
        assert_eq!(ks_exact_upper_tail(40, 50, 0.0), 1.0);
        // Only the two extreme paths leave |i/2 - j/3| < 1
        assert_abs_diff_eq!(ks_exact_upper_tail(2, 3, 1.0), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn ks_empty_sample_does_not_reject() {
        let result = ks_two_sample(&[], &[1, 2, 3]);
        assert_eq!(result.p_value, 1.0);
    }

    #[test]
    fn kolmogorov_tail_is_continuous_across_branches() {
        let below = kolmogorov_upper_tail(1.18 - 1e-9);
        let above = kolmogorov_upper_tail(1.18 + 1e-9);
        assert_abs_diff_eq!(below, above, epsilon = 1e-6);
        assert_abs_diff_eq!(kolmogorov_upper_tail(1.36), 0.0494, epsilon = 1e-3);
    }

    #[test]
    fn chi_square_two_dof_matches_closed_form() {
        for stat in [0.5, 2.0, 5.991, 13.8] {
            let expected = (-stat / 2.0_f64).exp();
            assert_abs_diff_eq!(chi_square_upper_tail(stat, 2.0).unwrap(), expected, epsilon = 1e-9);
        }
        assert_eq!(chi_square_upper_tail(-1.0, 2.0).unwrap(), 1.0);
    }

    #[test]
    fn binomial_lower_tail_values() {
        assert_abs_diff_eq!(binomial_lower_tail(0, 2, 0.5).unwrap(), 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(binomial_lower_tail(5, 10, 0.5).unwrap(), 0.623046875, epsilon = 1e-9);
        assert_eq!(binomial_lower_tail(0, 0, 0.5).unwrap(), 1.0);
        assert!(binomial_lower_tail(1, 1001, 0.5).unwrap() < 1e-100);
    }

    #[test]
    fn stats_of_small_sample() {
        let stats = calculate_stats(&[4, 1, 3, 2]);
        assert_eq!((stats.min, stats.max), (1, 4));
        assert_abs_diff_eq!(stats.median, 2.5);
        assert_abs_diff_eq!(stats.mean, 2.5);
        assert_abs_diff_eq!(stats.std_dev, 1.25f64.sqrt(), epsilon = 1e-12);

        let empty = calculate_stats(&[]);
        assert_eq!(empty.max, 0);
        assert_abs_diff_eq!(empty.median, 0.0);
    }
}
