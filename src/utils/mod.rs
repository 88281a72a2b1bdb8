mod io_utils;
mod math;
mod readers;
mod util;

pub use io_utils::{create_writer, open_file_writer};
pub use math::{
    binomial_lower_tail, calculate_stats, chi_square_upper_tail, ks_two_sample, KsResult, Stats,
};
pub use readers::open_text_reader;
pub use util::{handle_error_and_exit, Result};
