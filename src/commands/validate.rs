use crate::cli::ValidateArgs;
use crate::msi::{error_model::ErrorModel, locus::get_records, locus::LocusRecord};
use crate::utils::{calculate_stats, open_text_reader, Result};

pub fn validate(args: ValidateArgs) -> Result<()> {
    let error_model = ErrorModel::from_path(&args.error_model_path)?;
    let reader = open_text_reader(&args.histograms_path)?;
    let mut error_count = 0;
    let mut success_count = 0;
    let mut read_counts = Vec::new();
    let mut supported_counts = Vec::new();

    for result in get_records(reader) {
        match result.and_then(|record| check_record(&record, &error_model, &args)) {
            Ok((reads, supported)) => {
                read_counts.push(reads);
                supported_counts.push(supported);
                success_count += 1
            }
            Err(e) => {
                log::error!("{}", e);
                error_count += 1;
            }
        }
    }

    let read_stats = calculate_stats(&read_counts);
    let supported_stats = calculate_stats(&supported_counts);

    let total = success_count + error_count;
    let success_percentage = (success_count as f64 / total as f64) * 100.0;
    let error_percentage = (error_count as f64 / total as f64) * 100.0;

    log::info!(
        "Reads per Locus - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
        read_stats.min,
        read_stats.max,
        read_stats.median,
        read_stats.mean,
        read_stats.std_dev
    );
    log::info!(
        "Supported Lengths per Locus - Range: [{},{}], Median: {:.2}, Mean: {:.2}, StdDev: {:.2}",
        supported_stats.min,
        supported_stats.max,
        supported_stats.median,
        supported_stats.mean,
        supported_stats.std_dev
    );

    match error_count {
        0 => log::info!("Validation successful. Loci pass={}", success_count),
        _ => log::info!(
            "Validation failed. Loci pass={} ({:.2}%), fail={} ({:.2}%)",
            success_count,
            success_percentage,
            error_count,
            error_percentage
        ),
    }

    Ok(())
}

/// Read count and number of well-supported lengths of a record that can be
/// genotyped.
fn check_record(
    record: &LocusRecord,
    error_model: &ErrorModel,
    args: &ValidateArgs,
) -> Result<(usize, usize)> {
    let histogram = record.filtered(args.max_repeat_len)?;
    error_model
        .check_histogram(&histogram)
        .map_err(|e| format!("{}: {}", record.id, e))?;
    let supported = histogram.supported_lens(args.min_reads).len();
    if supported == 0 {
        return Err(format!(
            "{}: no repeat length has more than {} reads",
            record.id, args.min_reads
        ));
    }
    Ok((histogram.total_reads(), supported))
}
