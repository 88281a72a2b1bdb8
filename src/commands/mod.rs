pub mod call;
pub mod genotype;
pub mod validate;
