//! Tab-separated output of tumor/normal mutation calls and the run summary.

use super::{join_freqs, join_lens};
use crate::msi::{
    mutation::Decision,
    workflows::{PairOutcome, PairResult, Summary},
};
use crate::utils::{open_file_writer, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
};

const HEADER: [&str; 8] = [
    "#locus",
    "decision",
    "normal_histogram",
    "normal_alleles",
    "normal_frequencies",
    "tumor_histogram",
    "tumor_alleles",
    "tumor_frequencies",
];

pub struct CallWriter<W: Write> {
    writer: W,
}

impl CallWriter<BufWriter<File>> {
    pub fn create(output_path: &str) -> Result<Self> {
        Self::new(open_file_writer(output_path)?)
    }
}

impl<W: Write> CallWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", HEADER.join("\t")).map_err(|e| e.to_string())?;
        Ok(Self { writer })
    }

    /// Writes evaluated loci; loci with identical allele sets are not reported.
    pub fn write(&mut self, locus_id: &str, result: &PairResult) -> Result<()> {
        let decision = match result.outcome {
            PairOutcome::Identical => return Ok(()),
            PairOutcome::Evaluated(decision) => decision,
        };
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            locus_id,
            decision,
            result.normal.histogram,
            join_lens(result.normal.alleles.lens()),
            join_freqs(result.normal.alleles.freqs()),
            result.tumor.histogram,
            join_lens(result.tumor.alleles.lens()),
            join_freqs(result.tumor.alleles.freqs())
        )
        .map_err(|e| format!("Failed to write call for {}: {}", locus_id, e))
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().map_err(|e| e.to_string())?;
        Ok(self.writer)
    }
}

pub fn write_summary<W: Write>(mut writer: W, summary: &Summary) -> Result<()> {
    let mut lines = vec![
        ("loci_processed".to_string(), summary.loci),
        ("loci_failed".to_string(), summary.failed),
        ("loci_identical_alleles".to_string(), summary.identical),
        ("loci_differing_alleles".to_string(), summary.differing()),
        ("loci_mutated".to_string(), summary.mutated()),
    ];
    for decision in Decision::ALL {
        lines.push((
            format!("decision_{}_{}", decision.code(), decision.name()),
            summary.count(decision),
        ));
    }
    for (key, value) in lines {
        writeln!(writer, "{}\t{}", key, value).map_err(|e| e.to_string())?;
    }
    writer.flush().map_err(|e| e.to_string())
}
