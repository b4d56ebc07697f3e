use std::path::PathBuf;
use thiserror::Error;

use super::constants::{HEADER_SIZE, MAX_BIT_WIDTH, MAX_SCRATCH_BYTES, NUMBER_OF_PARAMETERS};
use super::worker_status::BenchmarkStatus;

#[derive(Debug, Error)]
pub enum RecordArrayError {
    #[error("Failed to read cluster array: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not open cluster array because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Format error, buffer of {0} byte(s) is smaller than the {size} byte header", size=HEADER_SIZE)]
    TooShortForHeader(usize),
    #[error("Format error, {count} cluster(s) would require {required} byte(s), but only {available} available")]
    InsufficientSize {
        count: u32,
        required: usize,
        available: usize,
    },
}

#[derive(Debug, Clone, Error)]
pub enum ParameterError {
    #[error("Parameter {0} has invalid bit width {1}; expected 1 to {max}", max=MAX_BIT_WIDTH)]
    InvalidBitWidth(String, u8),
    #[error("Parameter {0} is defined more than once")]
    DuplicateName(String),
}

#[derive(Debug, Error)]
pub enum CodeTableError {
    #[error("Could not load code table because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Code table failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Code table failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("No calibration entry in {0:?} covers run {1}")]
    NoMatchingEntry(PathBuf, u32),
    #[error("Code table for parameter {0} is defined more than once")]
    DuplicateParameter(String),
    #[error("Code table for parameter {parameter} has invalid code {code:?} for value {value}")]
    InvalidCode {
        parameter: String,
        value: u64,
        code: String,
    },
    #[error("Code table for parameter {parameter} has a code of {length} bits for value {value}; at most {max} are supported", max=MAX_BIT_WIDTH)]
    CodeTooLong {
        parameter: String,
        value: u64,
        length: usize,
    },
    #[error("Code table for parameter {parameter} lists value {value} more than once")]
    DuplicateValue { parameter: String, value: u64 },
    #[error("Code table for parameter {parameter} is not prefix free; code {code:?} is ambiguous")]
    NotPrefixFree { parameter: String, code: String },
    #[error("Cannot build a code table for parameter {0} without any recorded symbols")]
    EmptyStatistics(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Huffman mode requires either a code_table_path or a cdb_path")]
    MissingCodeTableSource,
    #[error("Config failed due to code table error: {0}")]
    CodeTableError(#[from] CodeTableError),
    #[error("Config failed due to parameter error: {0}")]
    ParameterError(#[from] ParameterError),
    #[error("Parameter dictionary has {0} entries but the quantizer produces {exp}", exp=NUMBER_OF_PARAMETERS)]
    ParameterCountMismatch(usize),
    #[error("Code table has no entry for parameter {0}")]
    MissingParameterTable(String),
    #[error("Scratch buffer size {0} is outside of 1..={max} bytes", max=MAX_SCRATCH_BYTES)]
    BadScratchSize(usize),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("Parameter index {0} was never registered")]
    UnknownParameter(usize),
    #[error("Value {value} of parameter {parameter} does not fit in {width} bit(s)")]
    ValueTooWide {
        parameter: String,
        value: u64,
        width: u8,
    },
    #[error("Value {value} of parameter {parameter} has no entry in the code table")]
    MissingCode { parameter: String, value: u64 },
    #[error("Bit output overflow, {requested} bit(s) requested with {available} of {capacity} remaining")]
    Overflow {
        requested: usize,
        available: usize,
        capacity: usize,
    },
    #[error("Value {value} of parameter {parameter} cannot be quantized to an unsigned code")]
    Unrepresentable { parameter: String, value: f32 },
}

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Benchmark failed at cluster {record}: {source}")]
    Encode {
        record: usize,
        #[source]
        source: EncodeError,
    },
    #[error("Benchmark failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<BenchmarkStatus>),
}

/// Errors which end the benchmark of a single input but not the batch
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{0}")]
    Format(#[from] RecordArrayError),
    #[error("{0}")]
    Benchmark(#[from] BenchmarkError),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed to read the input list: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<BenchmarkStatus>),
    #[error("Processor failed due to code table error: {0}")]
    CodeTableError(#[from] CodeTableError),
}
