use super::genotype::{initialize_thread_pool, CHANNEL_BUFFER_SIZE};
use crate::cli::CallArgs;
use crate::msi::{
    error_model::ErrorModel,
    locus::{stream_pairs_into_channel, LocusPair},
    mutation::Decision,
    workflows::{analyze_pair, Params, PairResult, Summary},
    writers::{write_summary, CallWriter},
};
use crate::utils::{create_writer, open_file_writer, Result};
use crossbeam_channel::{bounded, Sender};
use rayon::iter::{ParallelBridge, ParallelIterator};
use std::{sync::Arc, thread};

/// Message from a worker to the writer thread; failed loci still count
/// towards the summary.
enum PairMessage {
    Done(String, PairResult),
    Failed,
}

pub fn call(args: CallArgs) -> Result<()> {
    let error_model = Arc::new(ErrorModel::from_path(&args.error_model_path)?);
    log::info!(
        "Loaded error model with {} true and {} observed lengths",
        error_model.num_true_lens(),
        error_model.num_observed_lens()
    );

    let mut call_writer = create_writer(&args.output_prefix, "calls.tsv", CallWriter::create)?;
    let summary_writer = create_writer(&args.output_prefix, "summary.tsv", open_file_writer)?;

    let (sender_pair, receiver_pair) = bounded(CHANNEL_BUFFER_SIZE);
    let normal_path = args.normal_path.clone();
    let tumor_path = args.tumor_path.clone();
    let pair_stream_thread = thread::spawn(move || {
        stream_pairs_into_channel(&normal_path, &tumor_path, sender_pair)
    });

    let (sender_result, receiver_result) = bounded(CHANNEL_BUFFER_SIZE);
    let writer_thread = thread::spawn(move || -> Result<Summary> {
        let mut summary = Summary::default();
        for message in &receiver_result {
            match message {
                PairMessage::Done(locus_id, result) => {
                    call_writer.write(&locus_id, &result)?;
                    summary.add(result.outcome);
                }
                PairMessage::Failed => summary.add_failure(),
            }
        }
        call_writer.finish()?;
        write_summary(summary_writer, &summary)?;
        Ok(summary)
    });

    let params = Arc::new(Params {
        caller: args.caller.caller_params(),
        decision: args.decision_params(),
        seed: args.caller.seed,
    });

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = initialize_thread_pool(args.num_threads)?;
    pool.install(|| {
        receiver_pair
            .into_iter()
            .par_bridge()
            .for_each_with(&sender_result, |s, pair| match pair {
                Ok(pair) => process_pair(pair, &error_model, &params, s),
                Err(err) => {
                    log::error!("Locus processing: {:#}", err);
                    send(s, PairMessage::Failed);
                }
            });
    });

    // Clean-up
    drop(sender_result);
    let summary = writer_thread.join().expect("Writer thread panicked")?;
    log::trace!("Writer thread finished");
    let stream_status = pair_stream_thread
        .join()
        .expect("Histogram stream thread panicked");

    if summary.failed > 0 {
        log::warn!("{} loci could not be analyzed", summary.failed);
    }
    for decision in Decision::ALL {
        log::debug!(
            "Decision {} ({}): {} loci",
            decision.code(),
            decision.name(),
            summary.count(decision)
        );
    }
    log::info!(
        "Total loci with differing called alleles: {}, total mutated loci: {}",
        summary.differing(),
        summary.mutated()
    );

    stream_status.map_err(|e| format!("Histogram streaming failed: {}", e))
}

fn process_pair(
    pair: LocusPair,
    error_model: &ErrorModel,
    params: &Params,
    sender_result: &Sender<PairMessage>,
) {
    match analyze_pair(&pair, error_model, params) {
        Ok(result) => send(sender_result, PairMessage::Done(pair.id, result)),
        Err(err) => {
            log::error!("Error analyzing locus {}", err);
            send(sender_result, PairMessage::Failed);
        }
    }
}

fn send(sender_result: &Sender<PairMessage>, message: PairMessage) {
    if let Err(e) = sender_result.send(message) {
        log::error!("Failed to send locus result to writer thread: {}", e);
    }
}
