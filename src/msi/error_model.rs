//! Stutter/sequencing error model: P(observed length | true allele length).

use super::histogram::Histogram;
use crate::utils::{open_text_reader, Result};
use std::{io::BufRead, path::Path};

/// Dense probability table indexed by (true length, observed length).
///
/// Loaded once and shared read-only by every locus worker.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorModel {
    num_true: usize,
    num_observed: usize,
    probs: Vec<f64>,
}

impl ErrorModel {
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let num_true = rows.len();
        let num_observed = rows.first().map(|r| r.len()).unwrap_or(0);
        if num_true == 0 || num_observed == 0 {
            return Err("Error model table is empty".to_string());
        }

        let mut probs = Vec::with_capacity(num_true * num_observed);
        for (true_len, row) in rows.into_iter().enumerate() {
            if row.len() != num_observed {
                return Err(format!(
                    "Error model row {} has {} columns, expected {}",
                    true_len,
                    row.len(),
                    num_observed
                ));
            }
            if let Some((observed_len, value)) = row
                .iter()
                .enumerate()
                .find(|(_, p)| !(0.0..=1.0).contains(*p))
            {
                return Err(format!(
                    "Error model probability at ({}, {}) is outside [0, 1]: {}",
                    true_len, observed_len, value
                ));
            }
            probs.extend(row);
        }

        Ok(Self {
            num_true,
            num_observed,
            probs,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let row = line
                .split(',')
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|_| {
                        format!(
                            "Invalid probability '{}' at line {}",
                            field.trim(),
                            line_number + 1
                        )
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }
        Self::new(rows)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let reader = open_text_reader(path)?;
        Self::from_reader(reader).map_err(|e| format!("{}: {}", path.display(), e))
    }

    /// Largest true length that can be queried, plus one.
    pub fn num_true_lens(&self) -> usize {
        self.num_true
    }

    /// Largest observed length that can be queried, plus one.
    pub fn num_observed_lens(&self) -> usize {
        self.num_observed
    }

    /// P(observed_len | true_len).
    ///
    /// Panics when either length is outside the table; callers validate
    /// their lengths once with [`ErrorModel::check_histogram`].
    #[inline]
    pub fn prob(&self, true_len: usize, observed_len: usize) -> f64 {
        assert!(true_len < self.num_true && observed_len < self.num_observed);
        self.probs[true_len * self.num_observed + observed_len]
    }

    /// Ensures every length of `hist` can be used both as an observed length
    /// and as a candidate true length.
    pub fn check_histogram(&self, hist: &Histogram) -> Result<()> {
        let limit = self.num_true.min(self.num_observed);
        match hist.max_len() {
            Some(len) if len >= limit => Err(format!(
                "Repeat length {} is outside the error model range 0..{}",
                len, limit
            )),
            _ => Ok(()),
        }
    }
}
