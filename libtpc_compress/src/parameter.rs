use serde::{Deserialize, Serialize};

use super::constants::{MAX_BIT_WIDTH, STANDARD_PARAMETERS};
use super::error::ParameterError;

/// One named field of a compressed cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub bit_width: u8,
}

impl ParameterDefinition {
    pub fn new(name: &str, bit_width: u8) -> Result<Self, ParameterError> {
        if bit_width == 0 || bit_width > MAX_BIT_WIDTH {
            return Err(ParameterError::InvalidBitWidth(name.to_string(), bit_width));
        }
        Ok(Self {
            name: name.to_string(),
            bit_width,
        })
    }

    /// The largest value representable in this parameter's bit width
    pub fn max_value(&self) -> u64 {
        max_value_for_width(self.bit_width)
    }
}

/// Largest value of a field `width` bits wide (saturating at 64 bits)
pub fn max_value_for_width(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// The ordered set of parameters making up a compressed cluster.
///
/// The order in which parameters are added is the order they are serialized, and must match the
/// order the quantizer produces them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterDictionary {
    parameters: Vec<ParameterDefinition>,
}

impl ParameterDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The dictionary of the standard TPC cluster format (77 bits in total)
    pub fn standard() -> Self {
        Self {
            parameters: STANDARD_PARAMETERS
                .iter()
                .map(|(name, bit_width)| ParameterDefinition {
                    name: name.to_string(),
                    bit_width: *bit_width,
                })
                .collect(),
        }
    }

    /// Build a dictionary from a list of definitions, checking each of them
    pub fn from_definitions(definitions: &[ParameterDefinition]) -> Result<Self, ParameterError> {
        let mut dictionary = Self::new();
        for def in definitions {
            dictionary.add(&def.name, def.bit_width)?;
        }
        Ok(dictionary)
    }

    /// Add a parameter, returning its index
    pub fn add(&mut self, name: &str, bit_width: u8) -> Result<usize, ParameterError> {
        if self.index_of(name).is_some() {
            return Err(ParameterError::DuplicateName(name.to_string()));
        }
        self.parameters.push(ParameterDefinition::new(name, bit_width)?);
        Ok(self.parameters.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&ParameterDefinition> {
        self.parameters.get(index)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParameterDefinition> {
        self.parameters.iter()
    }

    pub fn definitions(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    /// Sum of all bit widths; the fixed width cost of one cluster
    pub fn total_bit_width(&self) -> u64 {
        self.parameters.iter().map(|p| p.bit_width as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_dictionary() {
        let dict = ParameterDictionary::standard();
        assert_eq!(dict.len(), 7);
        assert_eq!(dict.total_bit_width(), 77);
        assert_eq!(dict.index_of("sigmaY2"), Some(3));
        assert_eq!(dict.get(3).map(|p| p.max_value()), Some(255));
        assert_eq!(dict.get(0).map(|p| p.max_value()), Some(63));
    }

    #[test]
    fn test_bit_width_limits() {
        assert!(ParameterDefinition::new("zero", 0).is_err());
        assert!(ParameterDefinition::new("wide", 65).is_err());
        let def = match ParameterDefinition::new("full", 64) {
            Ok(d) => d,
            Err(e) => panic!("{e}"),
        };
        assert_eq!(def.max_value(), u64::MAX);
    }

    #[test]
    fn test_duplicate_name() {
        let mut dict = ParameterDictionary::new();
        assert_eq!(dict.add("pad", 14).ok(), Some(0));
        assert!(matches!(
            dict.add("pad", 10),
            Err(ParameterError::DuplicateName(_))
        ));
    }
}
