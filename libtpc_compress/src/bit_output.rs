//! Bit level scratch output and the matching reader.
//!
//! Values are written most significant bit first, and bits fill each byte starting from bit 7.
//! The current bit position therefore counts down from 7 to 0 within the byte being filled.
use bitvec::prelude::*;

use super::error::EncodeError;

/// A bounded scratch buffer that values and codes are appended to.
///
/// The capacity is fixed at reset. A write which would exceed it fails without writing anything.
#[derive(Debug, Clone, Default)]
pub struct BitOutputStream {
    bits: BitVec<u8, Msb0>,
    capacity_bits: usize,
}

impl BitOutputStream {
    pub fn new(capacity_bytes: usize) -> Self {
        let mut stream = Self::default();
        stream.reset(capacity_bytes);
        stream
    }

    /// Discard everything written and set a new capacity
    pub fn reset(&mut self, capacity_bytes: usize) {
        self.bits.clear();
        self.capacity_bits = capacity_bytes.saturating_mul(8);
    }

    fn check_capacity(&self, requested: usize) -> Result<(), EncodeError> {
        let available = self.capacity_bits - self.bits.len();
        if requested > available {
            return Err(EncodeError::Overflow {
                requested,
                available,
                capacity: self.capacity_bits,
            });
        }
        Ok(())
    }

    /// Append the lowest `width` bits of a value, most significant first
    pub fn write_value(&mut self, value: u64, width: u8) -> Result<usize, EncodeError> {
        let width = width.min(64) as usize;
        self.check_capacity(width)?;
        for shift in (0..width).rev() {
            self.bits.push((value >> shift) & 1 == 1);
        }
        Ok(width)
    }

    /// Append a complete code
    pub fn write_code(&mut self, code: &BitSlice<u8, Msb0>) -> Result<usize, EncodeError> {
        self.check_capacity(code.len())?;
        self.bits.extend_from_bitslice(code);
        Ok(code.len())
    }

    pub fn bits_written(&self) -> usize {
        self.bits.len()
    }

    /// Number of completely filled bytes
    pub fn size_bytes(&self) -> usize {
        self.bits.len() / 8
    }

    /// Position of the next bit inside the current byte, from 7 (empty byte) down to 0
    pub fn current_bit_position(&self) -> u8 {
        7 - (self.bits.len() % 8) as u8
    }

    pub fn capacity_bits(&self) -> usize {
        self.capacity_bits
    }

    pub fn as_bitslice(&self) -> &BitSlice<u8, Msb0> {
        self.bits.as_bitslice()
    }

    /// The written bytes, the last one zero padded
    pub fn as_raw_slice(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }
}

/// Sequential reader over bits written by a BitOutputStream
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bits: &'a BitSlice<u8, Msb0>,
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(bits: &'a BitSlice<u8, Msb0>) -> Self {
        Self { bits, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bits.len() - self.position
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        let bit = *self.bits.get(self.position)?;
        self.position += 1;
        Some(bit)
    }

    /// Read a `width` bit value, most significant bit first. None if not enough bits remain.
    pub fn read_value(&mut self, width: u8) -> Option<u64> {
        let width = width.min(64) as usize;
        let slice = self.bits.get(self.position..(self.position + width))?;
        self.position += width;
        Some(
            slice
                .iter()
                .by_vals()
                .fold(0u64, |acc, bit| (acc << 1) | bit as u64),
        )
    }
}
