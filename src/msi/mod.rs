//! Statistical core: histograms, the stutter error model, the EM allele
//! caller, the tumor/normal decision engine and the per-locus driver.

pub mod error_model;
pub mod genotype;
pub mod histogram;
pub mod locus;
pub mod mutation;
pub mod workflows;
pub mod writers;
