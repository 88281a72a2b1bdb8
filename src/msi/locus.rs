use super::histogram::{min_repeat_len, Histogram};
use crate::utils::{open_text_reader, Result};
use crossbeam_channel::Sender;
use itertools::{EitherOrBoth, Itertools};
use std::{io::BufRead, path::Path};

/// One sample's histogram at one microsatellite locus.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusRecord {
    /// Position of the record among the data lines of its file
    pub index: usize,
    pub id: String,
    /// Length of the repeated motif
    pub unit_len: usize,
    pub histogram: Histogram,
}

impl LocusRecord {
    /// Parses a `ID<TAB>UNIT_LEN<TAB>HISTOGRAM` line.
    pub fn new(index: usize, line: &str) -> Result<Self> {
        const EXPECTED_FIELD_COUNT: usize = 3;
        let split_line: Vec<&str> = line.trim_end().split('\t').collect();
        let (id, unit_len, histogram) = match &split_line[..] {
            [id, unit_len, histogram] => (*id, *unit_len, *histogram),
            [id, unit_len] => (*id, *unit_len, ""),
            _ => {
                return Err(format!(
                    "Expected {} tab-separated fields in the format 'id unit_len histogram', found {}: {}",
                    EXPECTED_FIELD_COUNT,
                    split_line.len(),
                    line
                ))
            }
        };

        if id.is_empty() {
            return Err(format!("Missing locus id: {}", line));
        }
        let unit_len: usize = unit_len
            .trim()
            .parse()
            .map_err(|_| format!("{}: invalid repeat unit length '{}'", id, unit_len))?;
        min_repeat_len(unit_len).map_err(|e| format!("{}: {}", id, e))?;
        let histogram = histogram.parse().map_err(|e| format!("{}: {}", id, e))?;

        Ok(Self {
            index,
            id: id.to_string(),
            unit_len,
            histogram,
        })
    }

    /// Histogram restricted to plausible lengths for this locus' motif.
    pub fn filtered(&self, max_repeat_len: usize) -> Result<Histogram> {
        let min_len = min_repeat_len(self.unit_len)?;
        Ok(self.histogram.filter(min_len, max_repeat_len))
    }
}

/// Normal and tumor histograms of the same locus.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusPair {
    pub index: usize,
    pub id: String,
    pub unit_len: usize,
    pub normal: LocusRecord,
    pub tumor: LocusRecord,
}

impl LocusPair {
    pub fn new(normal: LocusRecord, tumor: LocusRecord) -> Result<Self> {
        if normal.id != tumor.id {
            return Err(format!(
                "Normal locus '{}' is paired with tumor locus '{}'",
                normal.id, tumor.id
            ));
        }
        if normal.unit_len != tumor.unit_len {
            return Err(format!(
                "{}: repeat unit length differs between normal ({}) and tumor ({})",
                normal.id, normal.unit_len, tumor.unit_len
            ));
        }
        Ok(Self {
            index: normal.index,
            id: normal.id.clone(),
            unit_len: normal.unit_len,
            normal,
            tumor,
        })
    }
}

fn is_skippable(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

pub fn get_records<R: BufRead>(reader: R) -> impl Iterator<Item = Result<LocusRecord>> {
    reader
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(line) if is_skippable(line)))
        .enumerate()
        .map(|(index, (line_number, result_line))| {
            result_line
                .map_err(|e| format!("Error at histogram line {}: {}", line_number + 1, e))
                .and_then(|line| {
                    LocusRecord::new(index, &line)
                        .map_err(|e| format!("Error at histogram line {}: {}", line_number + 1, e))
                })
        })
}

/// Pairs the n-th normal record with the n-th tumor record.
pub fn pair_records(
    normal: Result<LocusRecord>,
    tumor: Result<LocusRecord>,
) -> Result<LocusPair> {
    LocusPair::new(normal?, tumor?)
}

pub fn stream_records_into_channel(
    path: &Path,
    sender: Sender<Result<LocusRecord>>,
) -> Result<()> {
    let reader = open_text_reader(path)?;
    for record in get_records(reader) {
        sender
            .send(record)
            .expect("Failed to send locus through channel");
    }
    Ok(())
}

/// Streams positional normal/tumor pairs. Files with different numbers of
/// records fail the stream once the shorter one is exhausted.
pub fn stream_pairs_into_channel(
    normal_path: &Path,
    tumor_path: &Path,
    sender: Sender<Result<LocusPair>>,
) -> Result<()> {
    let normal_records = get_records(open_text_reader(normal_path)?);
    let tumor_records = get_records(open_text_reader(tumor_path)?);

    for records in normal_records.zip_longest(tumor_records) {
        let pair = match records {
            EitherOrBoth::Both(normal, tumor) => pair_records(normal, tumor),
            EitherOrBoth::Left(_) | EitherOrBoth::Right(_) => {
                return Err(
                    "Normal and tumor histogram files have different numbers of loci".to_string(),
                )
            }
        };
        sender
            .send(pair)
            .expect("Failed to send locus pair through channel");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_record_line() {
        let record = LocusRecord::new(3, "chr1:1000:BAT25\t1\t20:40,25:3,4:9").unwrap();
        assert_eq!(record.index, 3);
        assert_eq!(record.id, "chr1:1000:BAT25");
        assert_eq!(record.unit_len, 1);
        assert_eq!(record.histogram.lens(), &[4, 20, 25]);
        assert_eq!(record.filtered(40).unwrap().lens(), &[20, 25]);
    }

    #[test]
    fn parse_record_without_reads() {
        let record = LocusRecord::new(0, "locus\t2\t.").unwrap();
        assert!(record.histogram.is_empty());
        let record = LocusRecord::new(0, "locus\t2").unwrap();
        assert!(record.histogram.is_empty());
    }

    #[test]
    fn malformed_records_are_rejected() {
        assert!(LocusRecord::new(0, "locus 2 10:4").is_err());
        assert!(LocusRecord::new(0, "locus\tx\t10:4").is_err());
        assert!(LocusRecord::new(0, "locus\t0\t10:4").is_err());
        assert!(LocusRecord::new(0, "locus\t2\t10:4,10:5").is_err());
        assert!(LocusRecord::new(0, "\t2\t10:4").is_err());
    }

    #[test]
    fn records_skip_comments_and_blank_lines() {
        let data = "#id\tunit\thist\na\t1\t10:5\n\nb\t2\t12:7\nc\t2\t12:x\n";
        let records: Vec<Result<LocusRecord>> = get_records(Cursor::new(data)).collect();
        assert_eq!(records.len(), 3);
        let a = records[0].as_ref().unwrap();
        let b = records[1].as_ref().unwrap();
        assert_eq!((a.index, a.id.as_str()), (0, "a"));
        assert_eq!((b.index, b.id.as_str()), (1, "b"));
        assert!(records[2].as_ref().unwrap_err().starts_with("Error at histogram line 5"));
    }

    fn stream_pairs(normal: &str, tumor: &str) -> (Result<()>, Vec<Result<LocusPair>>) {
        let dir = tempfile::tempdir().unwrap();
        let normal_path = dir.path().join("normal.tsv");
        let tumor_path = dir.path().join("tumor.tsv");
        std::fs::write(&normal_path, normal).unwrap();
        std::fs::write(&tumor_path, tumor).unwrap();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let status = stream_pairs_into_channel(&normal_path, &tumor_path, sender);
        (status, receiver.into_iter().collect())
    }

    #[test]
    fn pairs_match_by_position_and_id() {
        let (status, pairs) = stream_pairs(
            "a\t1\t10:5\nb\t2\t12:7\n",
            "a\t1\t10:6\nc\t2\t12:8\n",
        );
        assert!(status.is_ok());
        assert_eq!(pairs.len(), 2);
        let first = pairs[0].as_ref().unwrap();
        assert_eq!(first.id, "a");
        assert_eq!(first.tumor.histogram.count(10), 6);
        assert!(pairs[1].is_err());
    }

    #[test]
    fn record_count_mismatch_fails_the_stream() {
        let (status, pairs) = stream_pairs(
            "a\t1\t10:5\nb\t2\t12:7\nc\t2\t12:7\n",
            "a\t1\t10:6\n",
        );
        assert_eq!(
            status,
            Err("Normal and tumor histogram files have different numbers of loci".to_string())
        );
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0].is_ok());
    }

    #[test]
    fn missing_input_fails_the_stream() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let status = stream_records_into_channel(Path::new("/definitely/not/here.tsv"), sender);
        assert!(status.is_err());
        assert_eq!(receiver.into_iter().count(), 0);
    }

    #[test]
    fn pairing_propagates_record_errors() {
        let normal = LocusRecord::new(0, "a\t1\t10:5");
        assert!(pair_records(normal, Err("bad tumor line".to_string())).is_err());
    }

    #[test]
    fn unit_length_must_agree() {
        let normal = LocusRecord::new(0, "a\t1\t10:5").unwrap();
        let tumor = LocusRecord::new(0, "a\t2\t10:5").unwrap();
        assert!(LocusPair::new(normal, tumor).is_err());
    }
}
