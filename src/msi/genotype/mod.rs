mod caller;
mod em;

pub use caller::{infer, select_model_order, CallerParams, OrderStop};
pub use em::{fit_mixture, log_likelihood, EPSILON};

use itertools::Itertools;

/// Genotype of one sample at one locus: allele lengths, their mixture
/// frequencies and the log-likelihood of the chosen model order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleSet {
    lens: Vec<usize>,
    freqs: Vec<f64>,
    log_likelihood: f64,
}

impl AlleleSet {
    /// Sorts alleles by length, merges components that share a length and
    /// rescales the frequencies to sum to one.
    pub fn new(lens: &[usize], freqs: &[f64], log_likelihood: f64) -> Self {
        assert_eq!(lens.len(), freqs.len());
        let mut merged: Vec<(usize, f64)> = Vec::with_capacity(lens.len());
        for (len, freq) in lens.iter().zip(freqs).sorted_by_key(|(len, _)| **len) {
            match merged.last_mut() {
                Some(last) if last.0 == *len => last.1 += freq,
                _ => merged.push((*len, *freq)),
            }
        }

        let total: f64 = merged.iter().map(|(_, f)| f).sum();
        if total > 0.0 {
            merged.iter_mut().for_each(|(_, f)| *f /= total);
        }

        let (lens, freqs) = merged.into_iter().unzip();
        Self {
            lens,
            freqs,
            log_likelihood,
        }
    }

    /// A single allele explaining every read; no model competition took place.
    pub fn single(len: usize) -> Self {
        Self {
            lens: vec![len],
            freqs: vec![1.0],
            log_likelihood: 0.0,
        }
    }

    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn len(&self) -> usize {
        self.lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lens.is_empty()
    }

    pub fn same_alleles(&self, other: &AlleleSet) -> bool {
        self.lens == other.lens
    }
}
