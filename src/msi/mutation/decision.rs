//! Tumor/normal mutation decision for one microsatellite locus.

use super::support::{check_read_support, ReadSupport};
use crate::msi::{
    error_model::ErrorModel,
    genotype::{log_likelihood, AlleleSet},
    histogram::Histogram,
};
use crate::utils::{ks_two_sample, Result};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// AIC separation confirmed by a significant KS shift
    Mutation,
    /// Allele sets differ but neither model is clearly better on its own reads
    NoDifference,
    /// Normal allele read support is too unbalanced to trust
    Insufficient,
    /// Normal sample has more than two alleles
    TooManyAlleles,
    /// AIC separation without a significant KS shift
    NotConfirmed,
}

impl Decision {
    pub const ALL: [Decision; 5] = [
        Decision::Mutation,
        Decision::NoDifference,
        Decision::Insufficient,
        Decision::TooManyAlleles,
        Decision::NotConfirmed,
    ];

    pub fn code(self) -> i32 {
        match self {
            Decision::Mutation => 1,
            Decision::NoDifference => 0,
            Decision::Insufficient => -1,
            Decision::TooManyAlleles => -2,
            Decision::NotConfirmed => -3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Decision::Mutation => "MUTATION",
            Decision::NoDifference => "NO_DIFFERENCE",
            Decision::Insufficient => "INSUFFICIENT",
            Decision::TooManyAlleles => "TOO_MANY_ALLELES",
            Decision::NotConfirmed => "NOT_CONFIRMED",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionParams {
    /// Minimum AIC improvement (positive) each sample's own model must show
    pub lor_threshold: f64,
    /// Significance level of the normal allele balance test
    pub p_equal: f64,
    /// Significance level of the KS confirmation
    pub ks_threshold: f64,
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            lor_threshold: 1.0,
            p_equal: 0.05,
            ks_threshold: 0.05,
        }
    }
}

pub fn aic(num_alleles: usize, log_likelihood: f64) -> f64 {
    2.0 * num_alleles as f64 - 2.0 * log_likelihood
}

/// Returns (AIC(tumor | tumor) - AIC(tumor | normal),
/// AIC(normal | normal) - AIC(normal | tumor)), scoring each sample's reads
/// under both fitted models. Negative values mean a sample's own model
/// explains its reads better.
pub fn cross_model_separation(
    normal_hist: &Histogram,
    normal: &AlleleSet,
    tumor_hist: &Histogram,
    tumor: &AlleleSet,
    model: &ErrorModel,
) -> (f64, f64) {
    let score = |hist: &Histogram, alleles: &AlleleSet| {
        aic(
            alleles.len(),
            log_likelihood(hist, alleles.lens(), alleles.freqs(), model, 0.0),
        )
    };

    let tumor_delta = score(tumor_hist, tumor) - score(tumor_hist, normal);
    let normal_delta = score(normal_hist, normal) - score(normal_hist, tumor);
    (tumor_delta, normal_delta)
}

/// Decides whether the tumor read distribution reflects a somatic change
/// relative to the normal one.
pub fn decide(
    normal_hist: &Histogram,
    normal: &AlleleSet,
    tumor_hist: &Histogram,
    tumor: &AlleleSet,
    model: &ErrorModel,
    params: &DecisionParams,
) -> Result<Decision> {
    model.check_histogram(normal_hist)?;
    model.check_histogram(tumor_hist)?;
    for alleles in [normal, tumor] {
        if let Some(len) = alleles.lens().iter().find(|&&len| len >= model.num_true_lens()) {
            return Err(format!(
                "Allele length {} is outside the error model range 0..{}",
                len,
                model.num_true_lens()
            ));
        }
    }

    match check_read_support(normal_hist, normal, params.p_equal)? {
        ReadSupport::Sufficient => {}
        ReadSupport::Insufficient => return Ok(Decision::Insufficient),
        ReadSupport::TooManyAlleles => return Ok(Decision::TooManyAlleles),
    }

    let threshold = -params.lor_threshold;
    let (tumor_delta, normal_delta) =
        cross_model_separation(normal_hist, normal, tumor_hist, tumor, model);
    if !(tumor_delta < threshold && normal_delta < threshold) {
        return Ok(Decision::NoDifference);
    }

    let ks = ks_two_sample(&normal_hist.expand(), &tumor_hist.expand());
    if ks.p_value < params.ks_threshold {
        Ok(Decision::Mutation)
    } else {
        Ok(Decision::NotConfirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msi::error_model::tests::stutter_model;
    use approx::assert_abs_diff_eq;

    fn hist(entries: &[(usize, usize)]) -> Histogram {
        Histogram::new(entries.to_vec()).unwrap()
    }

    #[test]
    fn codes_match_the_decision_table() {
        let codes: Vec<i32> = Decision::ALL.iter().map(|d| d.code()).collect();
        assert_eq!(codes, vec![1, 0, -1, -2, -3]);
        assert_eq!(Decision::NotConfirmed.to_string(), "-3");
    }

    #[test]
    fn aic_penalises_alleles() {
        assert_abs_diff_eq!(aic(2, -10.0), 24.0);
        assert_abs_diff_eq!(aic(1, 0.0), 2.0);
    }

    #[test]
    fn new_peak_in_tumor_is_a_mutation() {
        let model = stutter_model(44);
        let normal_hist = hist(&[(10, 50)]);
        let tumor_hist = hist(&[(10, 25), (14, 25)]);
        let normal = AlleleSet::single(10);
        let tumor = AlleleSet::new(&[10, 14], &[0.5, 0.5], -45.0);
        let (tumor_delta, normal_delta) =
            cross_model_separation(&normal_hist, &normal, &tumor_hist, &tumor, &model);
        assert!(tumor_delta < -1.0);
        assert!(normal_delta < -1.0);
        let decision = decide(
            &normal_hist,
            &normal,
            &tumor_hist,
            &tumor,
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::Mutation);
    }

    #[test]
    fn small_distribution_shift_is_not_confirmed() {
        let model = stutter_model(44);
        let normal_hist = hist(&[(10, 50), (11, 45)]);
        let tumor_hist = hist(&[(10, 45), (11, 50)]);
        let decision = decide(
            &normal_hist,
            &AlleleSet::single(10),
            &tumor_hist,
            &AlleleSet::single(11),
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::NotConfirmed);
    }

    #[test]
    fn borderline_shift_at_moderate_depth_is_not_confirmed() {
        // KS D = 0.3 on 40 vs 40 reads: exact p is about 0.054
        let model = stutter_model(44);
        let normal_hist = hist(&[(10, 40)]);
        let tumor_hist = hist(&[(10, 28), (14, 12)]);
        let tumor = AlleleSet::new(&[10, 14], &[0.7, 0.3], -30.0);
        let decision = decide(
            &normal_hist,
            &AlleleSet::single(10),
            &tumor_hist,
            &tumor,
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::NotConfirmed);
    }

    #[test]
    fn marginal_extra_allele_shows_no_difference() {
        let model = stutter_model(44);
        let reads = hist(&[(10, 100)]);
        let tumor = AlleleSet::new(&[10, 11], &[0.99, 0.01], -21.0);
        let decision = decide(
            &reads,
            &AlleleSet::single(10),
            &reads,
            &tumor,
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::NoDifference);
    }

    #[test]
    fn unbalanced_normal_heterozygote_is_insufficient() {
        let model = stutter_model(44);
        let normal_hist = hist(&[(10, 1000), (12, 1)]);
        let normal = AlleleSet::new(&[10, 12], &[0.99, 0.01], -1.0);
        let tumor_hist = hist(&[(16, 40)]);
        let decision = decide(
            &normal_hist,
            &normal,
            &tumor_hist,
            &AlleleSet::single(16),
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::Insufficient);
    }

    #[test]
    fn three_normal_alleles_are_too_many() {
        let model = stutter_model(44);
        let normal_hist = hist(&[(8, 30), (10, 30), (12, 30)]);
        let normal = AlleleSet::new(&[8, 10, 12], &[0.3, 0.3, 0.4], -1.0);
        let tumor_hist = hist(&[(16, 40)]);
        let decision = decide(
            &normal_hist,
            &normal,
            &tumor_hist,
            &AlleleSet::single(16),
            &model,
            &DecisionParams::default(),
        )
        .unwrap();
        assert_eq!(decision, Decision::TooManyAlleles);
    }

    #[test]
    fn lengths_outside_the_model_are_errors() {
        let model = stutter_model(20);
        let result = decide(
            &hist(&[(10, 30)]),
            &AlleleSet::single(10),
            &hist(&[(25, 30)]),
            &AlleleSet::single(25),
            &model,
            &DecisionParams::default(),
        );
        assert!(result.is_err());
    }
}
