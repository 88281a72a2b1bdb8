//! Tab-separated output of per-sample allele calls.

use super::{join_freqs, join_lens};
use crate::msi::{locus::LocusRecord, workflows::SampleResult};
use crate::utils::{open_file_writer, Result};
use std::{
    fs::File,
    io::{BufWriter, Write},
};

const HEADER: [&str; 6] = [
    "#id",
    "unit",
    "histogram",
    "log_likelihood",
    "alleles",
    "frequencies",
];

pub struct AlleleWriter<W: Write> {
    writer: W,
}

impl AlleleWriter<BufWriter<File>> {
    pub fn create(output_path: &str) -> Result<Self> {
        Self::new(open_file_writer(output_path)?)
    }
}

impl<W: Write> AlleleWriter<W> {
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{}", HEADER.join("\t")).map_err(|e| e.to_string())?;
        Ok(Self { writer })
    }

    pub fn write(&mut self, record: &LocusRecord, result: &SampleResult) -> Result<()> {
        writeln!(
            self.writer,
            "{}\t{}\t{}\t{:.6}\t{}\t{}",
            record.id,
            record.unit_len,
            result.histogram,
            result.alleles.log_likelihood(),
            join_lens(result.alleles.lens()),
            join_freqs(result.alleles.freqs())
        )
        .map_err(|e| format!("Failed to write alleles for {}: {}", record.id, e))
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().map_err(|e| e.to_string())?;
        Ok(self.writer)
    }
}
