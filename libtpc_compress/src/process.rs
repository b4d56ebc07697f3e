use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use super::benchmark::{Benchmark, CompressionReport};
use super::code_table::CodeTable;
use super::config::Config;
use super::error::{BenchmarkError, InputError, ProcessorError};
use super::record_array::RecordArray;
use super::worker_status::BenchmarkStatus;

/// The report of one successfully benchmarked input
#[derive(Debug, Clone)]
pub struct InputReport {
    pub input: String,
    pub report: CompressionReport,
}

/// An input which could not be benchmarked, and why
#[derive(Debug)]
pub struct InputFailure {
    pub input: String,
    pub error: InputError,
}

/// Per-input and grand total results of a batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub inputs: Vec<InputReport>,
    pub failures: Vec<InputFailure>,
    pub total: CompressionReport,
    pub elapsed: Duration,
}

impl BatchReport {
    /// Number of inputs seen, failed or not
    pub fn n_processed(&self) -> usize {
        self.inputs.len() + self.failures.len()
    }

    pub fn n_failed(&self) -> usize {
        self.failures.len()
    }

    /// Write the per-input results and the grand totals to the log
    pub fn log_summary(&self, parameter_names: &[String]) {
        for input in self.inputs.iter() {
            log::info!("{}: {}", input.input, input.report);
        }
        for failure in self.failures.iter() {
            log::warn!("{}: failed -- {}", failure.input, failure.error);
        }
        for (name, bits) in parameter_names.iter().zip(self.total.parameter_bits.iter()) {
            let per_cluster = if self.total.n_clusters > 0 {
                *bits as f64 / self.total.n_clusters as f64
            } else {
                0.0
            };
            log::info!("  {name:<10} {bits} bit(s), {per_cluster:.3} bit(s)/cluster");
        }
        log::info!(
            "{} file(s) processed, {} failed, {} cluster(s), {} -- realtime {:.3} s",
            self.n_processed(),
            self.n_failed(),
            self.total.n_clusters,
            human_bytes::human_bytes(self.total.n_bytes() as f64),
            self.elapsed.as_secs_f64()
        );
        log::info!("Total: {}", self.total);
    }
}

/// Turn a line oriented control stream into input identifiers.
///
/// Lines are trimmed and blank lines are skipped. The sequence ends at the end of the stream.
pub fn read_input_list<R: BufRead>(reader: R) -> impl Iterator<Item = std::io::Result<String>> {
    reader.lines().filter_map(|line| match line {
        Ok(line) => {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(Ok(trimmed.to_string()))
            }
        }
        Err(e) => Some(Err(e)),
    })
}

/// Parse and benchmark a single input file
pub fn process_input(
    bench: &mut Benchmark,
    input: &str,
    input_index: usize,
    tx: Option<&Sender<BenchmarkStatus>>,
) -> Result<CompressionReport, InputError> {
    let array = RecordArray::from_file(Path::new(input))?;
    log::debug!("Read {} cluster(s) from {}", array.len(), input);
    Ok(bench.run_with_status(&array, tx.map(|tx| (tx, input_index)))?)
}

/// Benchmark every input of a sequence.
///
/// An input which fails to parse or encode is logged and counted as failed; the batch then moves
/// on to the next input. Failing to read the sequence itself ends the batch.
pub fn process_inputs<I>(
    bench: &mut Benchmark,
    inputs: I,
    tx: Option<&Sender<BenchmarkStatus>>,
) -> Result<BatchReport, ProcessorError>
where
    I: IntoIterator<Item = std::io::Result<String>>,
{
    let start = Instant::now();
    let mut batch = BatchReport {
        total: CompressionReport::new(
            bench.deflater().parameters().len(),
            bench.deflater().is_training_mode(),
        ),
        ..Default::default()
    };

    for (input_index, input) in inputs.into_iter().enumerate() {
        let input = input?;
        match process_input(bench, &input, input_index, tx) {
            Ok(report) => {
                log::info!("{input}: {report}");
                batch.total.accumulate(&report);
                batch.inputs.push(InputReport { input, report });
            }
            Err(InputError::Benchmark(BenchmarkError::SendError(e))) => {
                return Err(ProcessorError::SendError(e));
            }
            Err(error) => {
                log::error!("Failed to benchmark {input}: {error}");
                batch.failures.push(InputFailure { input, error });
            }
        }
    }

    batch.elapsed = start.elapsed();
    Ok(batch)
}

/// The main loop of the benchmark.
///
/// Builds the deflater from the config (any configuration problem ends the run here, before any
/// input is read), benchmarks all inputs, and in training mode writes the resulting code table
/// if the config names an output path.
pub fn process<I>(
    config: &Config,
    inputs: I,
    tx: Option<&Sender<BenchmarkStatus>>,
) -> Result<BatchReport, ProcessorError>
where
    I: IntoIterator<Item = std::io::Result<String>>,
{
    let mut bench = Benchmark::new(config)?;
    let batch = process_inputs(&mut bench, inputs, tx)?;

    let names: Vec<String> = bench
        .deflater()
        .parameters()
        .iter()
        .map(|p| p.name.clone())
        .collect();
    batch.log_summary(&names);

    if let (Some(path), Some(stats)) = (
        config.training_output_path.as_ref(),
        bench.deflater().statistics(),
    ) {
        let table = CodeTable::from_statistics(stats)?;
        table.write_file(path)?;
        log::info!("Wrote trained code table to {}", path.to_string_lossy());
    }

    Ok(batch)
}
