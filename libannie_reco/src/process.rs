use std::sync::mpsc::Sender;

use super::config::Config;
use super::error::ProcessorError;
use super::hdf_reader::PmtDataFile;
use super::hdf_writer::HDFWriter;
use super::pulse_finder::PulseFinder;
use super::raw_reader::RawReader;
use super::raw_readout::RawReadout;
use super::reco_readout::RecoReadout;
use super::worker_status::{BarColor, WorkerStatus};

/// Reconstruct a single readout.
///
/// Every selected channel gets a baseline and a (possibly empty) list of pulses for each of
/// its minibuffers.
pub fn reconstruct_readout(
    raw: &RawReadout,
    config: &Config,
) -> Result<RecoReadout, ProcessorError> {
    let mut reco = RecoReadout::new(raw.sequence_id());
    for (card_id, card) in raw.cards().iter() {
        for (channel_id, channel) in card.channels().iter() {
            if !config.is_channel_selected(*card_id, *channel_id) {
                continue;
            }
            let baseline = config.baseline.estimate(channel);
            let pulses = config
                .pulse_finder
                .find_channel_pulses(channel, baseline.mean)?;
            for (minibuffer, mb_pulses) in pulses.into_iter().enumerate() {
                reco.add_pulses(*card_id, *channel_id, minibuffer, mb_pulses);
            }
            reco.add_baseline(*card_id, *channel_id, baseline);
        }
    }
    Ok(reco)
}

/// Count the candidates passing the event selection over every minibuffer in which the
/// trigger PMT was reconstructed.
///
/// Readouts without the trigger PMT have no candidates. Other selection failures are
/// logged and the minibuffer contributes nothing.
pub fn count_candidates(reco: &RecoReadout, config: &Config) -> usize {
    let (trigger_card, trigger_channel) = config.selection.trigger_pmt;
    let mut n_candidates = 0;
    for key in reco
        .pulses()
        .keys()
        .filter(|k| k.card == trigger_card && k.channel == trigger_channel)
    {
        match config
            .selection
            .select_events(reco, &config.topology, key.minibuffer)
        {
            Ok(candidates) => n_candidates += candidates.len(),
            Err(e) => log::warn!(
                "Event selection failed for readout {} minibuffer {}: {e}",
                reco.sequence_id(),
                key.minibuffer
            ),
        }
    }
    n_candidates
}

/// The main loop of annie_reco.
///
/// This takes in a config (and progress monitor) and reconstructs every readout of a run.
pub fn process_run(
    config: &Config,
    run_number: i32,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let raw_path = config.get_raw_file_name(run_number);
    let reco_path = config.get_reco_file_name(run_number)?;

    let source = PmtDataFile::open(&raw_path)?;
    log::info!(
        "Total run size: {}",
        human_bytes::human_bytes(source.size_bytes() as f64)
    );
    let mut writer = HDFWriter::new(&reco_path)?;
    writer.write_fileinfo(&source)?;

    let mut reader = RawReader::new(source);
    let total_entries = reader.n_entries();
    let flush_frac: f32 = 0.01;
    let flush_val = ((total_entries as f64 * flush_frac as f64) as usize).max(1);
    let mut last_flush = 0;
    let mut readout_counter: u64 = 0;
    let mut n_candidates = 0;

    tx.send(WorkerStatus::new(
        0.0,
        run_number,
        *worker_id,
        BarColor::CYAN,
    ))?;
    while let Some(raw) = reader.next() {
        let raw = raw?;
        if readout_counter == 0 {
            if let Some(Ok(start)) = raw.cards().values().next().map(|c| c.start_datetime()) {
                log::info!("Run {run_number} started at {start}");
            }
        }

        let reco = reconstruct_readout(&raw, config)?;
        n_candidates += count_candidates(&reco, config);
        writer.write_readout(&reco, &readout_counter)?;
        readout_counter += 1;

        if reader.current_entry() - last_flush >= flush_val {
            last_flush = reader.current_entry();
            tx.send(WorkerStatus::new(
                last_flush as f32 / total_entries as f32,
                run_number,
                *worker_id,
                BarColor::CYAN,
            ))?;
        }
    }
    writer.close()?;

    tx.send(WorkerStatus::new(
        1.0,
        run_number,
        *worker_id,
        BarColor::GREEN,
    ))?;
    log::info!(
        "Reconstructed {readout_counter} readouts; {n_candidates} passed the event selection."
    );
    Ok(())
}

/// The function to be called by a separate thread.
/// This particular flavor is unused by annie_reco_cli but could be useful to someone else
/// Allows multiple runs to be processed
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let runs: Vec<i32> = (config.first_run_number..(config.last_run_number + 1)).collect();
    process_subset(config, tx, worker_id, runs)
}

/// Process a subset of runs
pub fn process_subset(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<i32>,
) -> Result<(), ProcessorError> {
    for run in subset {
        if config.does_run_exist(run) {
            log::info!("Processing run {}...", run);
            process_run(&config, run, &tx, &worker_id)?;
            log::info!("Finished processing run {}.", run);
        } else {
            log::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Divide a run range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<i32>> {
    let mut subsets: Vec<Vec<i32>> = vec![Vec::new(); config.n_threads.max(1) as usize];
    let n_subsets = subsets.len();

    for (idx, run) in (config.first_run_number..(config.last_run_number + 1)).enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}
