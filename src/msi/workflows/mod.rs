mod analyze;
mod locus_result;

pub use analyze::{analyze_pair, genotype_record, genotype_sample, locus_rng, Params};
pub use locus_result::{PairOutcome, PairResult, SampleResult, Summary};
