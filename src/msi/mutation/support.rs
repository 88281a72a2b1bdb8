use crate::msi::{genotype::AlleleSet, histogram::Histogram};
use crate::utils::{binomial_lower_tail, Result};

/// Whether the normal sample's genotype is trustworthy enough to compare
/// against the tumor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSupport {
    Sufficient,
    Insufficient,
    TooManyAlleles,
}

/// Gates a normal genotype on allelic balance.
///
/// A heterozygote's minority allele count should follow Binomial(n1 + n2, 0.5);
/// a lower tail probability below `p_equal` marks the split as too skewed.
/// Zero or one allele passes without a depth check.
pub fn check_read_support(
    hist: &Histogram,
    alleles: &AlleleSet,
    p_equal: f64,
) -> Result<ReadSupport> {
    match alleles.lens() {
        [] | [_] => Ok(ReadSupport::Sufficient),
        [first, second] => {
            let first_reads = hist.count(*first) as u64;
            let second_reads = hist.count(*second) as u64;
            let p = binomial_lower_tail(
                first_reads.min(second_reads),
                first_reads + second_reads,
                0.5,
            )?;
            if p < p_equal {
                Ok(ReadSupport::Insufficient)
            } else {
                Ok(ReadSupport::Sufficient)
            }
        }
        _ => Ok(ReadSupport::TooManyAlleles),
    }
}
