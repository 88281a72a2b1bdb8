use crate::cli::GenotypeArgs;
use crate::msi::{
    error_model::ErrorModel,
    locus::{stream_records_into_channel, LocusRecord},
    workflows::{genotype_record, Params, SampleResult},
    writers::AlleleWriter,
};
use crate::utils::{create_writer, Result};
use crossbeam_channel::{bounded, Sender};
use rayon::{
    iter::{ParallelBridge, ParallelIterator},
    ThreadPoolBuilder,
};
use std::{sync::Arc, thread};

pub(crate) const CHANNEL_BUFFER_SIZE: usize = 2048;

pub fn genotype(args: GenotypeArgs) -> Result<()> {
    let error_model = Arc::new(ErrorModel::from_path(&args.error_model_path)?);
    log::info!(
        "Loaded error model with {} true and {} observed lengths",
        error_model.num_true_lens(),
        error_model.num_observed_lens()
    );

    let mut allele_writer = create_writer(&args.output_prefix, "alleles.tsv", AlleleWriter::create)?;

    let (sender_record, receiver_record) = bounded(CHANNEL_BUFFER_SIZE);
    let histograms_path = args.histograms_path.clone();
    let record_stream_thread =
        thread::spawn(move || stream_records_into_channel(&histograms_path, sender_record));

    let (sender_result, receiver_result) = bounded::<(LocusRecord, SampleResult)>(CHANNEL_BUFFER_SIZE);
    let writer_thread = thread::spawn(move || -> Result<usize> {
        let mut num_written = 0;
        for (record, result) in &receiver_result {
            allele_writer.write(&record, &result)?;
            num_written += 1;
        }
        allele_writer.finish()?;
        Ok(num_written)
    });

    let params = Arc::new(Params {
        caller: args.caller.caller_params(),
        decision: Default::default(),
        seed: args.caller.seed,
    });

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = initialize_thread_pool(args.num_threads)?;
    pool.install(|| {
        receiver_record
            .into_iter()
            .par_bridge()
            .for_each_with(&sender_result, |s, record| match record {
                Ok(record) => process_record(record, &error_model, &params, s),
                Err(err) => log::error!("Locus processing: {:#}", err),
            });
    });

    // Clean-up
    drop(sender_result);
    let num_written = writer_thread.join().expect("Writer thread panicked")?;
    log::trace!("Writer thread finished");
    let stream_status = record_stream_thread
        .join()
        .expect("Histogram stream thread panicked");
    log::info!("Genotyped {} loci", num_written);

    stream_status.map_err(|e| format!("Histogram streaming failed: {}", e))
}

fn process_record(
    record: LocusRecord,
    error_model: &ErrorModel,
    params: &Params,
    sender_result: &Sender<(LocusRecord, SampleResult)>,
) {
    match genotype_record(&record, error_model, params) {
        Ok(result) => {
            if let Err(e) = sender_result.send((record, result)) {
                log::error!("Failed to send locus result to writer thread: {}", e);
            }
        }
        Err(err) => log::error!("Error analyzing locus {}", err),
    }
}

pub(crate) fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("msmut-{}", i))
        .start_handler(|_thread_index| {
            log::trace!("Initialized thread {:?}", std::thread::current().id());
        })
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}
