use std::f64::consts::PI;

use crate::error::{ConfigError, Result};

/// Declared bit widths of one loop instance.
///
/// Every other constant is derived from these by [`NumericFormat::scaling`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericFormat {
    /// Fractional bits of the input samples and the sine table (`i16`, so at most 15).
    pub sample_bits: u32,
    /// Fractional bits of the phase accumulator; one radian is `(1 << phase_bits) - 1`.
    pub phase_bits: u32,
    /// Fractional bits of the loop filter coefficients.
    pub filter_bits: u32,
    /// Base-two logarithm of the sine table length.
    pub table_bits: u32,
    /// Shift `k` of the rational phase detector; `1 << k` is an eighth of a turn.
    pub detector_shift: u32,
}

impl Default for NumericFormat {
    /// 15-bit samples and phase, a 2048 entry table and `k = 13`.
    ///
    /// The filter uses 20 fractional bits: at 15 bits the `wn^3` term of a
    /// third-order design rounds away and the loop is left one integrator
    /// short.
    fn default() -> Self {
        Self {
            sample_bits: 15,
            phase_bits: 15,
            filter_bits: 20,
            table_bits: 11,
            detector_shift: 13,
        }
    }
}

/// Constants derived from a [`NumericFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaling {
    /// Full-scale sample amplitude, `(1 << sample_bits) - 1`.
    pub sample_max: i32,
    /// One radian in phase units.
    pub phase_one: i32,
    /// Pi in phase units.
    pub phase_pi: i32,
    /// Pi in phase detector units, `1 << (detector_shift + 2)`.
    pub detector_pi: i32,
    /// Multiplier from detector units to phase units.
    pub err_scale: i32,
    /// Inclusive saturation bounds of the loop filter output and state.
    pub filter_min: i32,
    pub filter_max: i32,
    /// `1 << filter_bits`, the fixed-point representation of one in the filter.
    pub filter_one: i32,
    pub table_len: usize,
}

impl NumericFormat {
    /// Validate the format and derive its constants.
    pub fn scaling(&self) -> Result<Scaling> {
        check("sample_bits", self.sample_bits, 1, 15, "samples are i16")?;
        check(
            "phase_bits",
            self.phase_bits,
            4,
            26,
            "the filter range 2^(phase_bits + 3) must fit i32",
        )?;
        check(
            "filter_bits",
            self.filter_bits,
            1,
            30,
            "one must be representable as i32",
        )?;
        check("table_bits", self.table_bits, 2, 16, "table length 4..=65536")?;
        check(
            "detector_shift",
            self.detector_shift,
            1,
            15,
            "(i + |q|) << k must fit i32",
        )?;

        let phase_one = (1i32 << self.phase_bits) - 1;
        let phase_pi = (phase_one as f64 * PI).round() as i32;
        let detector_pi = 1i32 << (self.detector_shift + 2);
        let err_scale = (phase_pi as f64 / detector_pi as f64).round() as i32;
        if err_scale < 1 {
            return Err(ConfigError::Format {
                field: "detector_shift",
                value: self.detector_shift,
                reason: "detector resolution finer than the phase accumulator",
            });
        }

        let range = 1i32 << (self.phase_bits + 3);
        Ok(Scaling {
            sample_max: (1 << self.sample_bits) - 1,
            phase_one,
            phase_pi,
            detector_pi,
            err_scale,
            filter_min: -range,
            filter_max: range - 1,
            filter_one: 1 << self.filter_bits,
            table_len: 1 << self.table_bits,
        })
    }
}

fn check(field: &'static str, value: u32, min: u32, max: u32, reason: &'static str) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Format {
            field,
            value,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scaling_matches_reference_constants() {
        let s = NumericFormat::default().scaling().unwrap();
        assert_eq!(s.sample_max, 32767);
        assert_eq!(s.phase_one, 32767);
        assert_eq!(s.phase_pi, 102941);
        assert_eq!(s.detector_pi, 32768);
        assert_eq!(s.err_scale, 3);
        assert_eq!(s.filter_max, 262143);
        assert_eq!(s.filter_min, -262144);
        assert_eq!(s.filter_one, 1 << 20);
        assert_eq!(s.table_len, 2048);
    }

    #[test]
    fn filter_bounds_follow_phase_bits() {
        let s = NumericFormat {
            phase_bits: 20,
            ..NumericFormat::default()
        }
        .scaling()
        .unwrap();
        assert_eq!(s.filter_max, (1 << 23) - 1);
        assert_eq!(s.filter_min, -(1 << 23));
    }

    #[test]
    fn rejects_wide_samples() {
        let err = NumericFormat {
            sample_bits: 16,
            ..NumericFormat::default()
        }
        .scaling()
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Format {
                field: "sample_bits",
                ..
            }
        ));
    }

    #[test]
    fn rejects_detector_finer_than_phase() {
        let err = NumericFormat {
            phase_bits: 10,
            detector_shift: 15,
            ..NumericFormat::default()
        }
        .scaling()
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Format {
                field: "detector_shift",
                ..
            }
        ));
    }
}
