use serde::{Deserialize, Serialize};

use super::bit_output::BitOutputStream;
use super::code_table::{CodeTable, ParameterCodeTable, ParameterStatistics};
use super::config::Config;
use super::error::{ConfigError, EncodeError};
use super::parameter::ParameterDictionary;

/// The output strategy used to encode cluster parameters. Selected once from the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeflaterKind {
    #[default]
    FixedWidth,
    Huffman,
    Training,
}

/// Common contract of the bit output encoders.
///
/// Parameters must be registered in the order they will be appended in. A deflater writes into
/// a bounded scratch output which is reset before each cluster.
pub trait Deflater {
    /// Register the next parameter, returning its index
    fn register_parameter(&mut self, name: &str, bit_width: u8) -> Result<usize, ConfigError>;

    fn parameters(&self) -> &ParameterDictionary;

    /// Clear the scratch output and give it a capacity in bytes
    fn reset(&mut self, capacity_bytes: usize);

    /// Encode a value of a parameter, returning the number of bits written
    fn append_parameter(&mut self, index: usize, value: u64) -> Result<usize, EncodeError>;

    fn output(&self) -> &BitOutputStream;

    /// Bits written over the lifetime of the deflater, across resets
    fn total_bits_written(&self) -> u64;

    /// Completely filled bytes of the scratch output
    fn output_size_bytes(&self) -> usize {
        self.output().size_bytes()
    }

    /// Next bit inside the current byte of the scratch output, 7 down to 0
    fn current_bit_position(&self) -> u8 {
        self.output().current_bit_position()
    }

    /// A deflater in training mode only gathers statistics and never produces output
    fn is_training_mode(&self) -> bool {
        false
    }

    /// Symbol statistics gathered in training mode
    fn statistics(&self) -> Option<&[ParameterStatistics]> {
        None
    }
}

pub type BoxedDeflater = Box<dyn Deflater + Send>;

/// Writes every parameter with exactly its declared number of bits
#[derive(Debug, Clone, Default)]
pub struct FixedWidthDeflater {
    dictionary: ParameterDictionary,
    output: BitOutputStream,
    total_bits: u64,
}

impl FixedWidthDeflater {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deflater for FixedWidthDeflater {
    fn register_parameter(&mut self, name: &str, bit_width: u8) -> Result<usize, ConfigError> {
        Ok(self.dictionary.add(name, bit_width)?)
    }

    fn parameters(&self) -> &ParameterDictionary {
        &self.dictionary
    }

    fn reset(&mut self, capacity_bytes: usize) {
        self.output.reset(capacity_bytes);
    }

    fn append_parameter(&mut self, index: usize, value: u64) -> Result<usize, EncodeError> {
        let def = self
            .dictionary
            .get(index)
            .ok_or(EncodeError::UnknownParameter(index))?;
        if value > def.max_value() {
            return Err(EncodeError::ValueTooWide {
                parameter: def.name.clone(),
                value,
                width: def.bit_width,
            });
        }
        let written = self.output.write_value(value, def.bit_width)?;
        self.total_bits += written as u64;
        Ok(written)
    }

    fn output(&self) -> &BitOutputStream {
        &self.output
    }

    fn total_bits_written(&self) -> u64 {
        self.total_bits
    }
}

/// Writes the Huffman code of each value, looked up in a per-parameter code table
#[derive(Debug, Clone)]
pub struct HuffmanDeflater {
    table: CodeTable,
    dictionary: ParameterDictionary,
    parameter_tables: Vec<ParameterCodeTable>,
    output: BitOutputStream,
    total_bits: u64,
}

impl HuffmanDeflater {
    pub fn new(table: CodeTable) -> Self {
        Self {
            table,
            dictionary: ParameterDictionary::new(),
            parameter_tables: Vec::new(),
            output: BitOutputStream::default(),
            total_bits: 0,
        }
    }

    /// The code table of a registered parameter
    pub fn parameter_table(&self, index: usize) -> Option<&ParameterCodeTable> {
        self.parameter_tables.get(index)
    }
}

impl Deflater for HuffmanDeflater {
    fn register_parameter(&mut self, name: &str, bit_width: u8) -> Result<usize, ConfigError> {
        let parameter_table = self
            .table
            .get(name)
            .ok_or_else(|| ConfigError::MissingParameterTable(name.to_string()))?
            .clone();
        let index = self.dictionary.add(name, bit_width)?;
        self.parameter_tables.push(parameter_table);
        Ok(index)
    }

    fn parameters(&self) -> &ParameterDictionary {
        &self.dictionary
    }

    fn reset(&mut self, capacity_bytes: usize) {
        self.output.reset(capacity_bytes);
    }

    fn append_parameter(&mut self, index: usize, value: u64) -> Result<usize, EncodeError> {
        let parameter_table = self
            .parameter_tables
            .get(index)
            .ok_or(EncodeError::UnknownParameter(index))?;
        let code = parameter_table
            .code(value)
            .ok_or_else(|| EncodeError::MissingCode {
                parameter: parameter_table.name().to_string(),
                value,
            })?;
        let written = self.output.write_code(code)?;
        self.total_bits += written as u64;
        Ok(written)
    }

    fn output(&self) -> &BitOutputStream {
        &self.output
    }

    fn total_bits_written(&self) -> u64 {
        self.total_bits
    }
}

/// Tallies how often each value of each parameter occurs. Writes nothing.
#[derive(Debug, Clone, Default)]
pub struct TrainingDeflater {
    dictionary: ParameterDictionary,
    statistics: Vec<ParameterStatistics>,
    output: BitOutputStream,
}

impl TrainingDeflater {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deflater for TrainingDeflater {
    fn register_parameter(&mut self, name: &str, bit_width: u8) -> Result<usize, ConfigError> {
        let index = self.dictionary.add(name, bit_width)?;
        self.statistics.push(ParameterStatistics::new(name));
        Ok(index)
    }

    fn parameters(&self) -> &ParameterDictionary {
        &self.dictionary
    }

    fn reset(&mut self, capacity_bytes: usize) {
        self.output.reset(capacity_bytes);
    }

    fn append_parameter(&mut self, index: usize, value: u64) -> Result<usize, EncodeError> {
        self.statistics
            .get_mut(index)
            .ok_or(EncodeError::UnknownParameter(index))?
            .record(value);
        Ok(0)
    }

    fn output(&self) -> &BitOutputStream {
        &self.output
    }

    fn total_bits_written(&self) -> u64 {
        0
    }

    fn is_training_mode(&self) -> bool {
        true
    }

    fn statistics(&self) -> Option<&[ParameterStatistics]> {
        Some(&self.statistics)
    }
}

/// Load the code table named by the config, from a file if one is given, else from the
/// calibration database
pub fn load_code_table(config: &Config) -> Result<CodeTable, ConfigError> {
    if let Some(path) = &config.code_table_path {
        Ok(CodeTable::read_file(path)?)
    } else if let Some(cdb_path) = &config.cdb_path {
        Ok(CodeTable::read_cdb(cdb_path, &config.cdb_entry, config.run_number)?)
    } else {
        Err(ConfigError::MissingCodeTableSource)
    }
}

/// Create the deflater selected by the config and register the config's parameters with it.
///
/// All configuration problems (missing or malformed code table, bad parameters) surface here,
/// before any cluster is encoded.
pub fn build_deflater(config: &Config) -> Result<BoxedDeflater, ConfigError> {
    let mut deflater: BoxedDeflater = match config.deflater {
        DeflaterKind::FixedWidth => Box::new(FixedWidthDeflater::new()),
        DeflaterKind::Huffman => Box::new(HuffmanDeflater::new(load_code_table(config)?)),
        DeflaterKind::Training => Box::new(TrainingDeflater::new()),
    };
    for def in config.parameters.iter() {
        deflater.register_parameter(&def.name, def.bit_width)?;
    }
    log::info!(
        "Created {:?} deflater with {} parameter(s), {} bit(s) fixed width",
        config.deflater,
        deflater.parameters().len(),
        deflater.parameters().total_bit_width()
    );
    Ok(deflater)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_output::BitReader;
    use crate::code_table::{CodeEntry, CodeTableConfig, ParameterTableConfig};
    use crate::constants::STANDARD_PARAMETERS;

    fn fixed_standard() -> FixedWidthDeflater {
        let mut deflater = FixedWidthDeflater::new();
        for (name, width) in STANDARD_PARAMETERS {
            assert!(deflater.register_parameter(name, width).is_ok());
        }
        deflater
    }

    fn small_code_table() -> CodeTable {
        let codes = |pairs: &[(u64, &str)]| -> Vec<CodeEntry> {
            pairs
                .iter()
                .map(|(value, code)| CodeEntry {
                    value: *value,
                    code: code.to_string(),
                })
                .collect()
        };
        let config = CodeTableConfig {
            name: String::from("test"),
            parameters: vec![
                ParameterTableConfig {
                    name: String::from("padrow"),
                    codes: codes(&[(0, "0"), (1, "10"), (61, "11")]),
                },
                ParameterTableConfig {
                    name: String::from("charge"),
                    codes: codes(&[(100, "1"), (200, "01"), (300, "00")]),
                },
            ],
        };
        match CodeTable::from_config(&config) {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn test_fixed_width_round_trip() {
        let mut deflater = fixed_standard();
        deflater.reset(32);
        let values = [63u64, 16383, 0, 255, 17, 65535, 1023];
        for (index, value) in values.iter().enumerate() {
            assert_eq!(
                deflater.append_parameter(index, *value),
                Ok(STANDARD_PARAMETERS[index].1 as usize)
            );
        }
        assert_eq!(deflater.output().bits_written(), 77);
        assert_eq!(deflater.output_size_bytes(), 9);
        assert_eq!(deflater.current_bit_position(), 2);

        let mut reader = BitReader::new(deflater.output().as_bitslice());
        for (index, value) in values.iter().enumerate() {
            assert_eq!(reader.read_value(STANDARD_PARAMETERS[index].1), Some(*value));
        }
    }

    #[test]
    fn test_fixed_width_rejects_wide_values() {
        let mut deflater = fixed_standard();
        deflater.reset(32);
        assert!(matches!(
            deflater.append_parameter(0, 64),
            Err(EncodeError::ValueTooWide { width: 6, .. })
        ));
        assert_eq!(deflater.output().bits_written(), 0);
        assert_eq!(
            deflater.append_parameter(7, 0),
            Err(EncodeError::UnknownParameter(7))
        );
    }

    #[test]
    fn test_total_bits_accumulate_across_resets() {
        let mut deflater = fixed_standard();
        for _ in 0..3 {
            deflater.reset(32);
            assert!(deflater.append_parameter(1, 5).is_ok());
        }
        assert_eq!(deflater.output().bits_written(), 14);
        assert_eq!(deflater.total_bits_written(), 42);
    }

    #[test]
    fn test_huffman_round_trip() {
        let mut deflater = HuffmanDeflater::new(small_code_table());
        assert_eq!(deflater.register_parameter("padrow", 6).ok(), Some(0));
        assert_eq!(deflater.register_parameter("charge", 16).ok(), Some(1));
        deflater.reset(8);
        let values = [(0usize, 61u64), (1, 300), (0, 0), (1, 100), (0, 1), (1, 200)];
        for (index, value) in values {
            assert!(deflater.append_parameter(index, value).is_ok());
        }
        assert_eq!(deflater.output().bits_written(), 2 + 2 + 1 + 1 + 2 + 2);

        let mut reader = BitReader::new(deflater.output().as_bitslice());
        for (index, value) in values {
            let table = match deflater.parameter_table(index) {
                Some(t) => t,
                None => panic!(),
            };
            assert_eq!(table.decode(&mut reader), Some(value));
        }
    }

    #[test]
    fn test_huffman_missing_code_writes_nothing() {
        let mut deflater = HuffmanDeflater::new(small_code_table());
        assert!(deflater.register_parameter("padrow", 6).is_ok());
        deflater.reset(8);
        assert!(deflater.append_parameter(0, 1).is_ok());
        assert_eq!(
            deflater.append_parameter(0, 2),
            Err(EncodeError::MissingCode {
                parameter: String::from("padrow"),
                value: 2
            })
        );
        assert_eq!(deflater.output().bits_written(), 2);
        assert_eq!(deflater.total_bits_written(), 2);
    }

    #[test]
    fn test_huffman_requires_table_for_every_parameter() {
        let mut deflater = HuffmanDeflater::new(small_code_table());
        assert!(matches!(
            deflater.register_parameter("time", 15),
            Err(ConfigError::MissingParameterTable(_))
        ));
    }

    #[test]
    fn test_training_collects_statistics() {
        let mut deflater = TrainingDeflater::new();
        assert!(deflater.register_parameter("padrow", 6).is_ok());
        assert!(deflater.is_training_mode());
        deflater.reset(8);
        for value in [1u64, 1, 4] {
            assert_eq!(deflater.append_parameter(0, value), Ok(0));
        }
        assert_eq!(deflater.output().bits_written(), 0);
        let stats = match deflater.statistics() {
            Some(s) => s,
            None => panic!(),
        };
        assert_eq!(stats[0].counts.get(&1), Some(&2));
        assert_eq!(stats[0].total(), 3);
        assert!(deflater.append_parameter(1, 0).is_err());
    }

    #[test]
    fn test_build_deflater_from_config() {
        let config = Config::default();
        let deflater = match build_deflater(&config) {
            Ok(d) => d,
            Err(e) => panic!("{e}"),
        };
        assert!(!deflater.is_training_mode());
        assert_eq!(deflater.parameters().total_bit_width(), 77);

        let config = Config {
            deflater: DeflaterKind::Huffman,
            ..Default::default()
        };
        assert!(matches!(
            build_deflater(&config),
            Err(ConfigError::MissingCodeTableSource)
        ));

        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            deflater: DeflaterKind::Huffman,
            code_table_path: Some(dir.path().join("no_table.yml")),
            ..Default::default()
        };
        assert!(matches!(
            build_deflater(&config),
            Err(ConfigError::CodeTableError(_))
        ));
    }
}
