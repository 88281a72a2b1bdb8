use super::{PairOutcome, PairResult, SampleResult};
use crate::msi::{
    error_model::ErrorModel,
    genotype::{select_model_order, CallerParams},
    locus::{LocusPair, LocusRecord},
    mutation::{decide, DecisionParams},
};
use crate::utils::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

pub struct Params {
    pub caller: CallerParams,
    pub decision: DecisionParams,
    pub seed: u64,
}

/// Random generator for one locus; depends only on the run seed and the
/// locus' record index, never on which worker picks the locus up.
pub fn locus_rng(seed: u64, index: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Filters a record's histogram and infers its allele set.
pub fn genotype_sample<R: Rng + ?Sized>(
    record: &LocusRecord,
    model: &ErrorModel,
    params: &CallerParams,
    rng: &mut R,
) -> Result<SampleResult> {
    let histogram = record.filtered(params.max_repeat_len)?;
    let (alleles, stop) = select_model_order(&histogram, model, params, rng)?;
    log::debug!(
        "{}: supported lengths {:?}, alleles {:?} with frequencies {:?} ({:?})",
        record.id,
        histogram.supported_lens(params.min_reads),
        alleles.lens(),
        alleles.freqs(),
        stop
    );
    Ok(SampleResult { histogram, alleles })
}

/// Genotypes a single-sample record with its own locus generator.
pub fn genotype_record(
    record: &LocusRecord,
    model: &ErrorModel,
    params: &Params,
) -> Result<SampleResult> {
    let mut rng = locus_rng(params.seed, record.index);
    genotype_sample(record, model, &params.caller, &mut rng)
        .map_err(|e| format!("{}: {}", record.id, e))
}

/// Genotypes both samples of a locus and, when their allele sets differ,
/// decides whether the difference is a somatic mutation.
pub fn analyze_pair(pair: &LocusPair, model: &ErrorModel, params: &Params) -> Result<PairResult> {
    let with_id = |e: String| format!("{}: {}", pair.id, e);

    // Both samples start from the same generator state, so identical
    // histograms always yield identical allele sets
    let normal = genotype_sample(&pair.normal, model, &params.caller, &mut locus_rng(params.seed, pair.index))
        .map_err(|e| with_id(format!("normal: {}", e)))?;
    let tumor = genotype_sample(&pair.tumor, model, &params.caller, &mut locus_rng(params.seed, pair.index))
        .map_err(|e| with_id(format!("tumor: {}", e)))?;

    let outcome = if normal.alleles.same_alleles(&tumor.alleles) {
        PairOutcome::Identical
    } else {
        let decision = decide(
            &normal.histogram,
            &normal.alleles,
            &tumor.histogram,
            &tumor.alleles,
            model,
            &params.decision,
        )
        .map_err(with_id)?;
        log::debug!("{}: decision {} ({})", pair.id, decision, decision.name());
        PairOutcome::Evaluated(decision)
    };

    Ok(PairResult {
        normal,
        tumor,
        outcome,
    })
}
