use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::constants::{DEFAULT_CDB_ENTRY, DEFAULT_SCRATCH_BYTES, MAX_SCRATCH_BYTES};
use super::deflater::DeflaterKind;
use super::error::ConfigError;
use super::parameter::{ParameterDefinition, ParameterDictionary};

/// Structure representing the benchmark configuration. Contains the deflater selection, the code
/// table source and the parameter dictionary.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub deflater: DeflaterKind,
    pub code_table_path: Option<PathBuf>,
    pub cdb_path: Option<PathBuf>,
    pub cdb_entry: String,
    pub run_number: u32,
    pub scratch_buffer_size: usize,
    pub training_output_path: Option<PathBuf>,
    pub parameters: Vec<ParameterDefinition>,
}

impl Default for Config {
    /// Generate a new Config object using fixed width encoding of the standard parameters
    fn default() -> Self {
        Self {
            deflater: DeflaterKind::FixedWidth,
            code_table_path: None,
            cdb_path: None,
            cdb_entry: String::from(DEFAULT_CDB_ENTRY),
            run_number: 0,
            scratch_buffer_size: DEFAULT_SCRATCH_BYTES,
            training_output_path: None,
            parameters: ParameterDictionary::standard().definitions().to_vec(),
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        let config = serde_yaml::from_str::<Self>(&yaml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Check the values which cannot be checked by deserialization alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SCRATCH_BYTES).contains(&self.scratch_buffer_size) {
            return Err(ConfigError::BadScratchSize(self.scratch_buffer_size));
        }
        if self.deflater == DeflaterKind::Huffman && !self.has_code_table_source() {
            return Err(ConfigError::MissingCodeTableSource);
        }
        self.dictionary()?;
        Ok(())
    }

    /// The parameter dictionary described by this config
    pub fn dictionary(&self) -> Result<ParameterDictionary, ConfigError> {
        Ok(ParameterDictionary::from_definitions(&self.parameters)?)
    }

    pub fn has_code_table_source(&self) -> bool {
        self.code_table_path.is_some() || self.cdb_path.is_some()
    }

    pub fn is_training(&self) -> bool {
        self.deflater == DeflaterKind::Training
    }

    /// Turn this config into a training run which writes the trained code table to `output_path`
    pub fn into_training(self, output_path: &Path) -> Self {
        Self {
            deflater: DeflaterKind::Training,
            training_output_path: Some(output_path.to_path_buf()),
            ..self
        }
    }
}
