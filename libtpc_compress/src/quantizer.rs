use super::cluster::ClusterRef;
use super::constants::*;
use super::error::{ConfigError, EncodeError};
use super::parameter::ParameterDictionary;

// Parameter indices in the standard order
const PAD_ROW: usize = 0;
const PAD: usize = 1;
const TIME: usize = 2;
const SIGMA_PAD2: usize = 3;
const SIGMA_TIME2: usize = 4;
const CHARGE: usize = 5;
const QMAX: usize = 6;

/// The integer codes of one cluster, in dictionary order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantizedCluster {
    pub values: [u64; NUMBER_OF_PARAMETERS],
}

impl QuantizedCluster {
    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.values.iter().copied().enumerate()
    }
}

/// Quantizer maps the physical values of a cluster onto integer parameter codes.
///
/// - padrow: difference to the previous cluster's pad row, modulo 2^width
/// - pad, time: scaled and truncated
/// - sigmaY2, sigmaZ2: scaled, truncated and saturated at the field maximum
/// - charge, qmax: unchanged
///
/// Unclamped fields which scale to a negative or non-finite value are rejected. Unclamped values
/// too wide for their field are left for the encoder to reject.
#[derive(Debug, Clone)]
pub struct Quantizer {
    dictionary: ParameterDictionary,
    pad_row_mask: u64,
    sigma_pad2_max: u64,
    sigma_time2_max: u64,
}

impl Quantizer {
    /// Create a quantizer for a dictionary. The dictionary must have exactly one entry per
    /// cluster field.
    pub fn new(dictionary: &ParameterDictionary) -> Result<Self, ConfigError> {
        if dictionary.len() != NUMBER_OF_PARAMETERS {
            return Err(ConfigError::ParameterCountMismatch(dictionary.len()));
        }
        let max_of = |index: usize| dictionary.get(index).map(|p| p.max_value()).unwrap_or(0);
        Ok(Self {
            dictionary: dictionary.clone(),
            pad_row_mask: max_of(PAD_ROW),
            sigma_pad2_max: max_of(SIGMA_PAD2),
            sigma_time2_max: max_of(SIGMA_TIME2),
        })
    }

    /// Quantize a cluster. `previous_pad_row` is the pad row of the preceding cluster (0 for the
    /// first cluster of an array).
    pub fn quantize(
        &self,
        cluster: &ClusterRef<'_>,
        previous_pad_row: u16,
    ) -> Result<QuantizedCluster, EncodeError> {
        let mut values = [0u64; NUMBER_OF_PARAMETERS];
        values[PAD_ROW] = self.pad_row_delta(cluster.pad_row(), previous_pad_row);
        values[PAD] = self.scale(PAD, cluster.pad(), PAD_SCALE)?;
        values[TIME] = self.scale(TIME, cluster.time(), TIME_SCALE)?;
        values[SIGMA_PAD2] =
            scale_saturating(cluster.sigma_pad2(), SIGMA_PAD2_SCALE, self.sigma_pad2_max);
        values[SIGMA_TIME2] =
            scale_saturating(cluster.sigma_time2(), SIGMA_TIME2_SCALE, self.sigma_time2_max);
        values[CHARGE] = cluster.charge() as u64;
        values[QMAX] = cluster.qmax() as u64;
        Ok(QuantizedCluster { values })
    }

    fn pad_row_delta(&self, pad_row: u16, previous_pad_row: u16) -> u64 {
        ((pad_row as i64 - previous_pad_row as i64) as u64) & self.pad_row_mask
    }

    fn scale(&self, index: usize, value: f32, scale: f32) -> Result<u64, EncodeError> {
        let scaled = (value * scale).trunc();
        if !scaled.is_finite() || scaled < 0.0 {
            return Err(EncodeError::Unrepresentable {
                parameter: self.parameter_name(index),
                value,
            });
        }
        Ok(scaled as u64)
    }

    fn parameter_name(&self, index: usize) -> String {
        self.dictionary
            .get(index)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }
}

/// Scale and truncate, saturating into [0, max]. NaN maps to 0.
fn scale_saturating(value: f32, scale: f32, max: u64) -> u64 {
    ((value * scale) as u64).min(max)
}
