use crate::msi::{genotype::AlleleSet, histogram::Histogram, mutation::Decision};
use std::collections::HashMap;

/// Genotype of one sample together with the filtered histogram it was
/// inferred from.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    pub histogram: Histogram,
    pub alleles: AlleleSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairOutcome {
    /// Normal and tumor allele sets agree; the locus is not evaluated
    Identical,
    Evaluated(Decision),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairResult {
    pub normal: SampleResult,
    pub tumor: SampleResult,
    pub outcome: PairOutcome,
}

/// Order-independent tally of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub loci: usize,
    pub failed: usize,
    pub identical: usize,
    decisions: HashMap<Decision, usize>,
}

impl Summary {
    pub fn add(&mut self, outcome: PairOutcome) {
        self.loci += 1;
        match outcome {
            PairOutcome::Identical => self.identical += 1,
            PairOutcome::Evaluated(decision) => *self.decisions.entry(decision).or_insert(0) += 1,
        }
    }

    pub fn add_failure(&mut self) {
        self.loci += 1;
        self.failed += 1;
    }

    /// Loci whose normal and tumor allele sets differ
    pub fn differing(&self) -> usize {
        self.decisions.values().sum()
    }

    pub fn count(&self, decision: Decision) -> usize {
        self.decisions.get(&decision).copied().unwrap_or(0)
    }

    pub fn mutated(&self) -> usize {
        self.count(Decision::Mutation)
    }
}
