use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use libannie_reco::config::Config;
use libannie_reco::hdf_reader::PmtDataFile;
use libannie_reco::process::{create_subsets, process_subset};
use libannie_reco::worker_status::{BarColor, WorkerStatus};

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = match serde_yaml::to_string(&config) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Unable to serialize the template config: {e}");
            return;
        }
    };
    match File::create(path) {
        Ok(mut file) => {
            if let Err(e) = file.write_all(yaml_str.as_bytes()) {
                log::error!("Failed to write yaml data to {}: {e}", path.display());
            }
        }
        Err(e) => log::error!("Could not create template config file {}: {e}", path.display()),
    }
}

/// Print a summary of the readouts in a raw file
fn scan_raw_file(path: &Path) {
    let file = match PmtDataFile::open(path) {
        Ok(f) => f,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    let mut sequence_ids = file.sequence_ids().to_vec();
    sequence_ids.dedup();
    log::info!(
        "{} contains {} PMTData entries in {} readouts.",
        path.display(),
        file.sequence_ids().len(),
        sequence_ids.len()
    );
    if let (Some(first), Some(last)) = (sequence_ids.first(), sequence_ids.last()) {
        log::info!("SequenceIDs run from {first} to {last}.");
    }
    log::info!("TrigData present: {}", file.has_trig_data());
}

fn make_bar_style(color: &BarColor) -> ProgressStyle {
    let template = format!(
        "{{prefix}} [{{bar:40.{}/blue}}] {{pos:>3}}% {{msg}}",
        color.style_name()
    );
    ProgressStyle::with_template(&template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn main() {
    // Create a cli
    let matches = Command::new("annie_reco_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(Command::new("scan").about("Summarize the readouts in a raw data file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    match matches.subcommand() {
        Some(("new", _)) => {
            log::info!(
                "Making a template config at {}...",
                config_path.to_string_lossy()
            );

            make_template_config(&config_path);
            log::info!("Done.");
            return;
        }
        Some(("scan", _)) => {
            scan_raw_file(&config_path);
            return;
        }
        _ => (),
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if !config.is_n_threads_valid() {
        log::error!("n_threads must be at least 1, found {}", config.n_threads);
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("Raw Path: {}", config.raw_path.to_string_lossy());
    log::info!("Reco Path: {}", config.reco_path.to_string_lossy());
    log::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );
    log::info!("Number of Workers: {}", config.n_threads);
    match &config.channels {
        Some(channels) => log::info!("Reconstructing {} selected channels", channels.len()),
        None => log::info!("Reconstructing all channels"),
    }

    // Spawn the workers, each with its own progress bar
    let (tx, rx) = mpsc::channel::<WorkerStatus>();
    let subsets = create_subsets(&config);
    let mut bars: Vec<Option<ProgressBar>> = vec![None; subsets.len()];
    let mut workers = Vec::new();
    for (idx, subset) in subsets.into_iter().enumerate() {
        // Dont make empty workers
        if subset.is_empty() {
            continue;
        }
        let bar = pb_manager.add(ProgressBar::new(100));
        bar.set_style(make_bar_style(&BarColor::CYAN));
        bar.set_prefix(format!("Worker {idx}"));
        bars[idx] = Some(bar);

        let conf = config.clone();
        let worker_tx = tx.clone();
        workers.push(std::thread::spawn(move || {
            process_subset(conf, worker_tx, idx, subset)
        }));
    }
    drop(tx);

    loop {
        // No UI event loop here, so poll the workers about once a second
        std::thread::sleep(std::time::Duration::from_secs(1));
        // Checked before draining so that final messages are not missed
        let finished = workers.iter().all(|w| w.is_finished());
        loop {
            match rx.try_recv() {
                Ok(status) => {
                    if let Some(Some(bar)) = bars.get(status.worker_id) {
                        bar.set_style(make_bar_style(&status.color));
                        bar.set_message(format!("Run {}", status.run_number));
                        bar.set_position((status.progress * 100.0) as u64);
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => break,
            }
        }

        if finished {
            break;
        }
    }

    for worker in workers {
        match worker.join() {
            Ok(result) => match result {
                Ok(_) => log::info!("Worker complete"),
                Err(e) => log::error!("Reconstruction failed with error: {e}"),
            },
            Err(_) => log::error!("Failed to join reconstruction task!"),
        }
    }

    for bar in bars.iter().flatten() {
        bar.finish();
    }

    log::info!("Done.");
}
