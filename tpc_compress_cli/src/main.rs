//! # tpc_compress_cli
//!
//! Part of the tpc_compress crate family.
//!
//! Command line driver of the TPC cluster compression benchmark.
//!
//! ## Use
//!
//! Make a template configuration:
//!
//! ```bash
//! tpc_compress_cli -p config.yml new
//! ```
//!
//! Benchmark a list of cluster array files, one path per line, read from stdin:
//!
//! ```bash
//! ls data/*.bin | tpc_compress_cli -p config.yml
//! ```
//!
//! or from a file with `-i list.txt`. To print the clusters of a single file use
//! `tpc_compress_cli dump data/clusters.bin`.
//!
//! To build a Huffman table from the listed inputs use
//!
//! ```bash
//! ls data/*.bin | tpc_compress_cli -p config.yml train huffmanConfiguration.yml
//! ```
//!
//! then point `code_table_path` of a `huffman` config at the written table. The same run can be
//! set up in the config alone with `deflater: training` and a `training_output_path`.
use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use libtpc_compress::config::Config;
use libtpc_compress::error::ProcessorError;
use libtpc_compress::process::{process, read_input_list, BatchReport};
use libtpc_compress::record_array::RecordArray;
use libtpc_compress::worker_status::BenchmarkStatus;

fn make_template_config(path: &Path) {
    match Config::default().write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

fn dump_cluster_array(path: &Path) {
    match RecordArray::from_file(path) {
        Ok(array) => {
            log::info!(
                "{} holds {} cluster(s), {}",
                path.to_string_lossy(),
                array.len(),
                human_bytes::human_bytes(array.body().len() as f64)
            );
            print!("{array}");
        }
        Err(e) => log::error!("{e}"),
    }
}

fn run_batch(
    config: Config,
    input_list: Option<PathBuf>,
    tx: std::sync::mpsc::Sender<BenchmarkStatus>,
) -> Result<BatchReport, ProcessorError> {
    match input_list {
        Some(list_path) => {
            let file = File::open(list_path)?;
            process(&config, read_input_list(BufReader::new(file)), Some(&tx))
        }
        None => process(&config, read_input_list(std::io::stdin().lock()), Some(&tx)),
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("tpc_compress_cli")
        .about("Benchmark the compression of TPC cluster data")
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("train")
                .about("Gather symbol statistics of the inputs and write a Huffman code table")
                .arg(
                    Arg::new("output")
                        .required(true)
                        .help("Path of the code table to write"),
                ),
        )
        .subcommand(
            Command::new("dump")
                .about("Print the clusters of a cluster array file")
                .arg(Arg::new("file").required(true).help("Cluster array file")),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("inputs")
                .short('i')
                .long("inputs")
                .help("File listing the cluster arrays to benchmark, one per line (default: stdin)"),
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

    if let Err(e) = LogWrapper::new(pb_manager.clone(), logger).try_init() {
        eprintln!("Could not create logging/progress: {e}");
        return;
    }
    log::set_max_level(simplelog::LevelFilter::Info);

    if let Some(("dump", sub)) = matches.subcommand() {
        if let Some(file) = sub.get_one::<String>("file") {
            dump_cluster_array(Path::new(file));
        }
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration file is required, use -p <path>");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let mut config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    if let Some(("train", sub)) = matches.subcommand() {
        if let Some(output) = sub.get_one::<String>("output") {
            config = config.into_training(Path::new(output));
        }
    }
    log::info!("Deflater: {:?}", config.deflater);
    if config.is_training() {
        match &config.training_output_path {
            Some(path) => log::info!("Trained code table: {}", path.to_string_lossy()),
            None => log::warn!("Training without a training_output_path, no table will be written"),
        }
    } else if let Some(path) = &config.code_table_path {
        log::info!("Code table: {}", path.to_string_lossy());
    } else if let Some(path) = &config.cdb_path {
        log::info!(
            "Calibration database: {} entry {} run {}",
            path.to_string_lossy(),
            config.cdb_entry,
            config.run_number
        );
    }
    log::info!(
        "Parameters: {}",
        config
            .parameters
            .iter()
            .map(|p| format!("{}({})", p.name, p.bit_width))
            .collect::<Vec<String>>()
            .join(" ")
    );

    let input_list = matches.get_one::<String>("inputs").map(PathBuf::from);

    // Setup the progress bar
    let pb = pb_manager.add(ProgressBar::new(100));
    if let Ok(style) = ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}%") {
        pb.set_style(style);
    }
    let (tx, rx) = std::sync::mpsc::channel::<BenchmarkStatus>();
    // Spawn the task!
    let handle = std::thread::spawn(move || run_batch(config, input_list, tx));

    // The channel closes once the worker is done with it
    for status in rx.iter() {
        pb.set_message(format!("input {}", status.input_index));
        pb.set_position((status.progress() * 100.0) as u64);
    }

    match handle.join() {
        Ok(result) => match result {
            Ok(batch) => {
                if batch.n_failed() > 0 {
                    log::warn!(
                        "{} of {} input(s) failed, see the log above",
                        batch.n_failed(),
                        batch.n_processed()
                    );
                } else {
                    log::info!("Successfully benchmarked all inputs!");
                }
            }
            Err(e) => log::error!("Benchmark failed with error: {e}"),
        },
        Err(_) => log::error!("Failed to join benchmark task!"),
    }

    pb.finish();

    log::info!("Done.");
}
