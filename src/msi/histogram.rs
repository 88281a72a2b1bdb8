//! Per-locus repeat-length histograms and the plausibility pre-filter.

use crate::utils::Result;
use itertools::Itertools;
use std::{fmt, str::FromStr};

/// Read count observed at each repeat length of one locus in one sample.
///
/// Lengths are unique and kept in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Histogram {
    lens: Vec<usize>,
    counts: Vec<usize>,
}

impl Histogram {
    pub fn new(entries: impl IntoIterator<Item = (usize, usize)>) -> Result<Self> {
        let entries = entries.into_iter().sorted_by_key(|(len, _)| *len).collect_vec();
        if let Some(((len, _), _)) = entries.iter().tuple_windows().find(|(a, b)| a.0 == b.0) {
            return Err(format!("Duplicate repeat length {} in histogram", len));
        }
        let (lens, counts) = entries.into_iter().unzip();
        Ok(Self { lens, counts })
    }

    pub fn lens(&self) -> &[usize] {
        &self.lens
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.lens.iter().copied().zip(self.counts.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.lens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lens.len()
    }

    pub fn total_reads(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_len(&self) -> Option<usize> {
        self.lens.last().copied()
    }

    /// Read count at `len`, zero when the length was never observed.
    pub fn count(&self, len: usize) -> usize {
        match self.lens.binary_search(&len) {
            Ok(index) => self.counts[index],
            Err(_) => 0,
        }
    }

    /// Keeps lengths in `min_len..max_len`.
    pub fn filter(&self, min_len: usize, max_len: usize) -> Histogram {
        let (lens, counts) = self
            .iter()
            .filter(|(len, _)| (min_len..max_len).contains(len))
            .unzip();
        Histogram { lens, counts }
    }

    /// Lengths with strictly more than `min_reads` reads; only these may
    /// anchor an allele.
    pub fn supported_lens(&self, min_reads: usize) -> Vec<usize> {
        self.iter()
            .filter(|(_, count)| *count > min_reads)
            .map(|(len, _)| len)
            .collect()
    }

    /// Flattens the histogram into one observed length per read.
    pub fn expand(&self) -> Vec<usize> {
        self.iter()
            .flat_map(|(len, count)| std::iter::repeat(len).take(count))
            .collect()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, ".");
        }
        let encoding = self
            .iter()
            .map(|(len, count)| format!("{}:{}", len, count))
            .join(",");
        write!(f, "{}", encoding)
    }
}

impl FromStr for Histogram {
    type Err = String;

    fn from_str(encoding: &str) -> Result<Self> {
        let encoding = encoding.trim();
        if encoding.is_empty() || encoding == "." {
            return Ok(Histogram::default());
        }
        let mut entries = Vec::new();
        for pair in encoding.split(',') {
            let error_msg = || format!("Histogram entry must be 'length:count': '{}'", pair);
            let (len, count) = pair.split_once(':').ok_or_else(error_msg)?;
            let len: usize = len.trim().parse().map_err(|_| error_msg())?;
            let count: usize = count.trim().parse().map_err(|_| error_msg())?;
            entries.push((len, count));
        }
        Histogram::new(entries)
    }
}

/// Shortest plausible repeat length for a microsatellite with the given
/// motif (repeat unit) length.
pub fn min_repeat_len(unit_len: usize) -> Result<usize> {
    match unit_len {
        0 => Err("Repeat unit length must be at least 1".to_string()),
        1 => Ok(5),
        2 => Ok(4),
        _ => Ok(3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let hist: Histogram = "14:25,10:50".parse().unwrap();
        assert_eq!(hist.lens(), &[10, 14]);
        assert_eq!(hist.counts(), &[50, 25]);
        assert_eq!(hist.to_string(), "10:50,14:25");
        assert_eq!(".".parse::<Histogram>().unwrap(), Histogram::default());
        assert_eq!(Histogram::default().to_string(), ".");
    }

    #[test]
    fn parse_rejects_malformed_entries() {
        assert!("10-50".parse::<Histogram>().is_err());
        assert!("10:x".parse::<Histogram>().is_err());
        assert!("-1:4".parse::<Histogram>().is_err());
        assert_eq!(
            "10:5,10:6".parse::<Histogram>(),
            Err("Duplicate repeat length 10 in histogram".to_string())
        );
    }

    #[test]
    fn filter_keeps_plausible_range() {
        let hist = Histogram::new(vec![(2, 9), (3, 9), (10, 20), (39, 7), (40, 8), (43, 1)]).unwrap();
        let filtered = hist.filter(min_repeat_len(3).unwrap(), 40);
        assert_eq!(filtered.lens(), &[3, 10, 39]);
        let filtered = hist.filter(min_repeat_len(1).unwrap(), 40);
        assert_eq!(filtered.lens(), &[10, 39]);
    }

    #[test]
    fn supported_lens_require_more_than_min_reads() {
        let hist = Histogram::new(vec![(8, 5), (9, 6), (10, 40), (11, 2)]).unwrap();
        assert_eq!(hist.supported_lens(5), vec![9, 10]);
        assert_eq!(hist.total_reads(), 53);
        assert_eq!(hist.count(10), 40);
        assert_eq!(hist.count(12), 0);
    }

    #[test]
    fn expand_repeats_each_length_by_count() {
        let hist = Histogram::new(vec![(12, 1), (10, 2), (11, 0)]).unwrap();
        assert_eq!(hist.expand(), vec![10, 10, 12]);
    }

    #[test]
    fn min_repeat_len_by_unit() {
        assert_eq!(min_repeat_len(1), Ok(5));
        assert_eq!(min_repeat_len(2), Ok(4));
        assert_eq!(min_repeat_len(3), Ok(3));
        assert_eq!(min_repeat_len(6), Ok(3));
        assert!(min_repeat_len(0).is_err());
    }
}
