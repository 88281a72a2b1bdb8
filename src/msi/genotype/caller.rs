//! Allele caller: picks the number of alleles with a chain of likelihood
//! ratio tests over increasingly complex mixtures.

use super::{em::fit_mixture, AlleleSet};
use crate::msi::{error_model::ErrorModel, histogram::Histogram};
use crate::utils::{chi_square_upper_tail, Result};
use rand::Rng;

/// Each extra allele adds a length and a frequency.
const LRT_DOF: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CallerParams {
    /// Highest mixture order considered
    pub max_alleles: usize,
    /// Independent EM runs per order
    pub num_restarts: usize,
    /// A length is well-supported when its read count exceeds this
    pub min_reads: usize,
    /// Significance level of each likelihood ratio test
    pub lrt_alpha: f64,
    /// Lengths at or above this are dropped before genotyping
    pub max_repeat_len: usize,
}

impl Default for CallerParams {
    fn default() -> Self {
        Self {
            max_alleles: 4,
            num_restarts: 10,
            min_reads: 5,
            lrt_alpha: 0.05,
            max_repeat_len: 40,
        }
    }
}

/// Why the model-order search stopped where it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStop {
    /// Only one well-supported length; no fitting was done
    SingleSupported,
    /// The next order did not improve the fit significantly
    NotSignificant,
    /// Not enough well-supported lengths to seed another allele
    ExhaustedSupport,
    /// Reached `max_alleles`
    MaxOrder,
}

/// Infers the best-supported allele set for a filtered histogram.
pub fn infer<R: Rng + ?Sized>(
    hist: &Histogram,
    model: &ErrorModel,
    params: &CallerParams,
    rng: &mut R,
) -> Result<AlleleSet> {
    select_model_order(hist, model, params, rng).map(|(alleles, _)| alleles)
}

pub fn select_model_order<R: Rng + ?Sized>(
    hist: &Histogram,
    model: &ErrorModel,
    params: &CallerParams,
    rng: &mut R,
) -> Result<(AlleleSet, OrderStop)> {
    model.check_histogram(hist)?;

    let supported = hist.supported_lens(params.min_reads);
    match supported.len() {
        0 => {
            return Err(format!(
                "No repeat length is supported by more than {} reads",
                params.min_reads
            ))
        }
        1 => return Ok((AlleleSet::single(supported[0]), OrderStop::SingleSupported)),
        _ => {}
    }

    let fit = |num_alleles: usize, rng: &mut R| {
        fit_mixture(hist, &supported, num_alleles, params.num_restarts, model, rng)
    };

    let mut current = fit(1, &mut *rng);
    for num_alleles in 2..=params.max_alleles {
        let candidate = fit(num_alleles, &mut *rng);
        let statistic = 2.0 * (candidate.log_likelihood() - current.log_likelihood());
        if statistic <= 0.0 || chi_square_upper_tail(statistic, LRT_DOF)? > params.lrt_alpha {
            return Ok((current, OrderStop::NotSignificant));
        }
        current = candidate;
        if supported.len() <= num_alleles {
            return Ok((current, OrderStop::ExhaustedSupport));
        }
    }

    Ok((current, OrderStop::MaxOrder))
}
