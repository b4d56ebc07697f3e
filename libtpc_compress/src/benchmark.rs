use std::fmt::Display;
use std::sync::mpsc::Sender;

use super::config::Config;
use super::constants::{BASELINE_BITS_PER_CLUSTER, MAX_SCRATCH_BYTES, STATUS_INTERVAL};
use super::deflater::{build_deflater, BoxedDeflater, Deflater};
use super::error::{BenchmarkError, ConfigError};
use super::quantizer::Quantizer;
use super::record_array::RecordArray;
use super::worker_status::BenchmarkStatus;

/// The outcome of benchmarking one cluster array
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompressionReport {
    pub n_clusters: u64,
    pub n_bits: u64,
    /// Bits spent on each parameter, in dictionary order
    pub parameter_bits: Vec<u64>,
    pub training: bool,
}

impl CompressionReport {
    pub fn new(n_parameters: usize, training: bool) -> Self {
        Self {
            n_clusters: 0,
            n_bits: 0,
            parameter_bits: vec![0; n_parameters],
            training,
        }
    }

    /// Compressed size rounded up to whole bytes
    pub fn n_bytes(&self) -> u64 {
        self.n_bits.div_ceil(8)
    }

    pub fn baseline_bits(&self) -> u64 {
        BASELINE_BITS_PER_CLUSTER * self.n_clusters
    }

    /// Emitted bits relative to the baseline. None if there were no clusters.
    pub fn ratio(&self) -> Option<f64> {
        if self.n_clusters == 0 {
            None
        } else {
            Some(self.n_bits as f64 / self.baseline_bits() as f64)
        }
    }

    /// Add the totals of another report to this one
    pub fn accumulate(&mut self, other: &CompressionReport) {
        self.n_clusters += other.n_clusters;
        self.n_bits += other.n_bits;
        if self.parameter_bits.len() < other.parameter_bits.len() {
            self.parameter_bits.resize(other.parameter_bits.len(), 0);
        }
        for (total, bits) in self.parameter_bits.iter_mut().zip(other.parameter_bits.iter()) {
            *total += bits;
        }
        self.training |= other.training;
    }
}

impl Display for CompressionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "wrote {} cluster(s)", self.n_clusters)?;
        if self.training {
            write!(f, " (training mode, no output)")
        } else {
            match self.ratio() {
                Some(ratio) => write!(f, " {} byte(s) {:.4}", self.n_bytes(), ratio),
                None => write!(f, " no data"),
            }
        }
    }
}

/// Benchmark runs clusters through the quantizer and a deflater and counts the bits produced.
///
/// The deflater is chosen once at construction. Each cluster is encoded into freshly reset
/// scratch space; the pad row of the previous cluster is the only state carried between
/// clusters, and it restarts from 0 for every array.
pub struct Benchmark {
    quantizer: Quantizer,
    deflater: BoxedDeflater,
    scratch_buffer_size: usize,
}

impl Benchmark {
    /// Create a benchmark from a config, loading the code table if needed
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let deflater = build_deflater(config)?;
        Self::with_deflater(deflater, config.scratch_buffer_size)
    }

    /// Create a benchmark around an already configured deflater
    pub fn with_deflater(
        deflater: BoxedDeflater,
        scratch_buffer_size: usize,
    ) -> Result<Self, ConfigError> {
        if !(1..=MAX_SCRATCH_BYTES).contains(&scratch_buffer_size) {
            return Err(ConfigError::BadScratchSize(scratch_buffer_size));
        }
        let quantizer = Quantizer::new(deflater.parameters())?;
        Ok(Self {
            quantizer,
            deflater,
            scratch_buffer_size,
        })
    }

    pub fn deflater(&self) -> &dyn Deflater {
        self.deflater.as_ref()
    }

    /// Benchmark every cluster of an array
    pub fn run(&mut self, array: &RecordArray) -> Result<CompressionReport, BenchmarkError> {
        self.run_with_status(array, None)
    }

    /// Benchmark every cluster of an array, publishing progress to a channel.
    ///
    /// Any encoding failure aborts the array and no report is returned.
    pub fn run_with_status(
        &mut self,
        array: &RecordArray,
        status: Option<(&Sender<BenchmarkStatus>, usize)>,
    ) -> Result<CompressionReport, BenchmarkError> {
        let mut report = CompressionReport::new(
            self.deflater.parameters().len(),
            self.deflater.is_training_mode(),
        );
        let n_total = array.len() as u64;
        let mut last_pad_row: u16 = 0;

        for (record, cluster) in array.iter().enumerate() {
            self.deflater.reset(self.scratch_buffer_size);

            let quantized = self
                .quantizer
                .quantize(&cluster, last_pad_row)
                .map_err(|source| BenchmarkError::Encode { record, source })?;
            last_pad_row = cluster.pad_row();

            for (index, value) in quantized.iter() {
                let bits = self
                    .deflater
                    .append_parameter(index, value)
                    .map_err(|source| BenchmarkError::Encode { record, source })?;
                report.parameter_bits[index] += bits as u64;
            }

            report.n_bits += (self.deflater.output_size_bytes() * 8 + 7
                - self.deflater.current_bit_position() as usize)
                as u64;
            report.n_clusters += 1;

            if let Some((tx, input_index)) = status {
                if report.n_clusters % STATUS_INTERVAL == 0 {
                    tx.send(BenchmarkStatus::new(input_index, report.n_clusters, n_total))?;
                }
            }
        }

        if let Some((tx, input_index)) = status {
            tx.send(BenchmarkStatus::new(input_index, report.n_clusters, n_total))?;
        }

        Ok(report)
    }
}
