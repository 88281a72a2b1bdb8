//! Expectation-maximisation fit of a fixed-order allele mixture.
//!
//! Allele lengths are integral, so the maximisation step over allele
//! position is a grid search over the well-supported lengths rather than a
//! continuous update.

use super::AlleleSet;
use crate::msi::{error_model::ErrorModel, histogram::Histogram};
use rand::{seq::index, Rng};

/// Added to probabilities and normalisers so that zero cells never produce
/// -inf or NaN.
pub const EPSILON: f64 = 1e-10;
const CONVERGENCE_TOL: f64 = 1e-5;
const MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone)]
struct Fit {
    alleles: Vec<usize>,
    freqs: Vec<f64>,
    log_likelihood: f64,
}

/// Fits a mixture of `num_alleles` alleles to `hist`, restarting EM
/// `num_restarts` times from random seeds drawn from `supported`, and
/// returns the highest-likelihood parameters seen.
pub fn fit_mixture<R: Rng + ?Sized>(
    hist: &Histogram,
    supported: &[usize],
    num_alleles: usize,
    num_restarts: usize,
    model: &ErrorModel,
    rng: &mut R,
) -> AlleleSet {
    assert!(num_alleles >= 1 && num_alleles <= supported.len());

    let restart = |rng: &mut R| {
        let seeds = index::sample(rng, supported.len(), num_alleles)
            .into_iter()
            .map(|i| supported[i])
            .collect();
        run_em(hist, supported, seeds, model)
    };

    let mut best = restart(&mut *rng);
    for _ in 1..num_restarts {
        let fit = restart(&mut *rng);
        if fit.log_likelihood > best.log_likelihood {
            best = fit;
        }
    }

    AlleleSet::new(&best.alleles, &best.freqs, best.log_likelihood)
}

fn run_em(hist: &Histogram, supported: &[usize], mut alleles: Vec<usize>, model: &ErrorModel) -> Fit {
    let num_alleles = alleles.len();
    let total_reads = hist.total_reads() as f64;
    let mut freqs = vec![1.0 / num_alleles as f64; num_alleles];
    // Responsibilities, one row of `num_alleles` per histogram entry
    let mut resp = vec![0.0; hist.len() * num_alleles];

    let mut best = Fit {
        alleles: alleles.clone(),
        freqs: freqs.clone(),
        log_likelihood: f64::NEG_INFINITY,
    };
    let mut prev_log_likelihood: Option<f64> = None;

    for _ in 0..MAX_ITERATIONS {
        for (row, len) in resp.chunks_mut(num_alleles).zip(hist.lens()) {
            let norm = alleles
                .iter()
                .zip(&freqs)
                .map(|(&allele, &freq)| model.prob(allele, *len) * freq)
                .sum::<f64>()
                + EPSILON;
            for (z, (&allele, &freq)) in row.iter_mut().zip(alleles.iter().zip(&freqs)) {
                *z = model.prob(allele, *len) * freq / norm;
            }
        }

        for (j, freq) in freqs.iter_mut().enumerate() {
            *freq = resp
                .chunks(num_alleles)
                .zip(hist.counts())
                .map(|(row, &count)| row[j] * count as f64)
                .sum::<f64>()
                / total_reads;
        }

        for (j, allele) in alleles.iter_mut().enumerate() {
            *allele = best_position(hist, supported, &resp, j, num_alleles, model);
        }

        let log_likelihood = log_likelihood(hist, &alleles, &freqs, model, EPSILON);
        if log_likelihood > best.log_likelihood {
            best = Fit {
                alleles: alleles.clone(),
                freqs: freqs.clone(),
                log_likelihood,
            };
        }

        if let Some(prev) = prev_log_likelihood {
            if (prev - log_likelihood).abs() < CONVERGENCE_TOL {
                break;
            }
        }
        prev_log_likelihood = Some(log_likelihood);
    }

    best
}

/// Supported length maximising the responsibility-weighted log-probability
/// of the reads for component `j`. Ties keep the shortest length.
fn best_position(
    hist: &Histogram,
    supported: &[usize],
    resp: &[f64],
    j: usize,
    num_alleles: usize,
    model: &ErrorModel,
) -> usize {
    let mut best_len = supported[0];
    let mut best_score = f64::NEG_INFINITY;
    for &candidate in supported {
        let score = resp
            .chunks(num_alleles)
            .zip(hist.iter())
            .map(|(row, (len, count))| row[j] * (model.prob(candidate, len) + EPSILON).ln() * count as f64)
            .sum::<f64>();
        if score > best_score {
            best_score = score;
            best_len = candidate;
        }
    }
    best_len
}

/// Log-likelihood of the reads in `hist` under the mixture (`alleles`,
/// `freqs`): sum over lengths of reads * ln(sum_j freq_j * P(len | allele_j) + epsilon).
///
/// Lengths without reads contribute nothing.
pub fn log_likelihood(
    hist: &Histogram,
    alleles: &[usize],
    freqs: &[f64],
    model: &ErrorModel,
    epsilon: f64,
) -> f64 {
    hist.iter()
        .filter(|(_, count)| *count > 0)
        .map(|(len, count)| {
            let mixture = alleles
                .iter()
                .zip(freqs)
                .map(|(&allele, &freq)| freq * model.prob(allele, len))
                .sum::<f64>();
            count as f64 * (mixture + epsilon).ln()
        })
        .sum()
}
