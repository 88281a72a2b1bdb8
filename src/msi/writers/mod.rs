mod write_alleles;
mod write_calls;

pub use write_alleles::AlleleWriter;
pub use write_calls::{write_summary, CallWriter};

use itertools::Itertools;

fn join_lens(lens: &[usize]) -> String {
    if lens.is_empty() {
        return ".".to_string();
    }
    lens.iter().join(",")
}

fn join_freqs(freqs: &[f64]) -> String {
    if freqs.is_empty() {
        return ".".to_string();
    }
    freqs.iter().map(|f| format!("{:.6}", f)).join(",")
}
