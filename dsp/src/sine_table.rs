//! Quantized sine lookup table backing the NCO.

use std::f64::consts::TAU;

use crate::error::{ConfigError, Result};
use crate::fixed::{NumericFormat, Scaling};
use crate::iq::FixedIq;
use crate::math::round_div;

/// One full cycle of `sin`, quantized to the base sample format.
///
/// Immutable once built. Loops share a table through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SineTable {
    values: Box<[i16]>,
    format: NumericFormat,
    mask: usize,
    quarter: usize,
    two_pi: i64,
}

impl SineTable {
    /// Generate the table for `format`: `round(sin(2 pi k / N) * sample_max)`.
    pub fn new(format: &NumericFormat) -> Result<Self> {
        let scaling = format.scaling()?;
        let n = scaling.table_len;
        let values: Box<[i16]> = (0..n)
            .map(|k| (f64::sin(TAU * k as f64 / n as f64) * scaling.sample_max as f64).round() as i16)
            .collect();
        Ok(Self::build(values, *format, &scaling))
    }

    /// Wrap a table computed elsewhere, checking it against `format`.
    pub fn from_values(values: impl Into<Box<[i16]>>, format: &NumericFormat) -> Result<Self> {
        let scaling = format.scaling()?;
        let values = values.into();
        if values.len() != scaling.table_len {
            return Err(ConfigError::TableSize {
                expected: scaling.table_len,
                actual: values.len(),
            });
        }
        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|&(_, &v)| (v as i32).abs() > scaling.sample_max)
        {
            return Err(ConfigError::TableAmplitude {
                index,
                value,
                max: scaling.sample_max,
            });
        }
        Ok(Self::build(values, *format, &scaling))
    }

    fn build(values: Box<[i16]>, format: NumericFormat, scaling: &Scaling) -> Self {
        let n = values.len();
        Self {
            values,
            format,
            mask: n - 1,
            quarter: n / 4,
            two_pi: 2 * scaling.phase_pi as i64,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn format(&self) -> &NumericFormat {
        &self.format
    }

    pub fn values(&self) -> &[i16] {
        &self.values
    }

    /// Table index nearest to `angle` (phase units), in `0..len()`.
    pub fn index_of(&self, angle: i32) -> usize {
        let index = round_div(angle as i64 * self.values.len() as i64, self.two_pi);
        // Two's complement masking wraps negative indices by adding N.
        (index as usize) & self.mask
    }

    /// Oscillator output at table position `index` (taken modulo the length):
    /// cosine on the in-phase side, sine on the quadrature side.
    pub fn lookup_index(&self, index: usize) -> FixedIq {
        FixedIq::new(
            self.values[index.wrapping_add(self.quarter) & self.mask],
            self.values[index & self.mask],
        )
    }

    /// Oscillator output at `angle` in phase units.
    pub fn lookup(&self, angle: i32) -> FixedIq {
        self.lookup_index(self.index_of(angle))
    }
}
