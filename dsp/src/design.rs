//! Loop filter coefficient design.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use tracing::warn;

use crate::error::{ConfigError, Result};
use crate::filter::{LoopFilterCoefficients, LoopFilterConfig};
use crate::fixed::NumericFormat;
use crate::fll::FllCoefficients;

/// Shaping constants of the third-order loop.
const THIRD_ORDER_B: f64 = 2.8;
const THIRD_ORDER_C: f64 = 2.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOrder {
    /// Proportional only. Tracks a phase offset but not a frequency offset.
    First,
    /// Proportional-integral, critically damped. Tracks a frequency offset.
    Second,
    /// Adds a second integrator. Tracks a frequency ramp.
    Third,
}

/// Unquantized filter taps, with `a[0] == 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Taps {
    pub b: Vec<f64>,
    pub a: Vec<f64>,
}

/// IIR loop filter design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopDesign {
    /// Hz.
    pub sample_rate: f64,
    /// Hz.
    pub loop_bandwidth: f64,
    pub order: LoopOrder,
}

impl LoopDesign {
    /// Natural frequency of the loop in radians per sample.
    pub fn natural_frequency(&self) -> Result<f64> {
        check_rates(self.sample_rate, self.loop_bandwidth)?;
        Ok(2.0 * PI * self.loop_bandwidth / self.sample_rate)
    }

    pub fn taps(&self) -> Result<Taps> {
        let wn = self.natural_frequency()?;
        Ok(match self.order {
            LoopOrder::First => Taps {
                b: vec![wn],
                a: vec![1.0],
            },
            LoopOrder::Second => {
                let zeta = FRAC_1_SQRT_2;
                let t1 = 1.0 / (wn * wn);
                let t2 = 2.0 * zeta / wn;
                Taps {
                    b: vec![(2.0 * t2 + 1.0) / (2.0 * t1), (1.0 - 2.0 * t2) / (2.0 * t1)],
                    a: vec![1.0, -1.0],
                }
            }
            LoopOrder::Third => {
                let (b, c) = (THIRD_ORDER_B, THIRD_ORDER_C);
                let wn2 = wn * wn;
                let wn3 = wn2 * wn;
                Taps {
                    b: vec![
                        b * wn2 / 2.0 + c * wn + wn3 / 4.0,
                        -2.0 * c * wn + wn3 / 2.0,
                        -b * wn2 / 2.0 + c * wn + wn3 / 4.0,
                    ],
                    a: vec![1.0, -2.0, 1.0],
                }
            }
        })
    }

    /// Round the taps to `format.filter_bits` fractional bits.
    pub fn quantize(&self, format: &NumericFormat) -> Result<LoopFilterCoefficients> {
        let taps = self.taps()?;
        let one = format.scaling()?.filter_one as f64;
        let b = taps
            .b
            .iter()
            .zip(["b0", "b1", "b2"])
            .map(|(&v, name)| to_fixed(v, one, name, format.filter_bits))
            .collect::<Result<Vec<_>>>()?;
        let a = taps
            .a
            .iter()
            .zip(["a0", "a1", "a2"])
            .map(|(&v, name)| to_fixed(v, one, name, format.filter_bits))
            .collect::<Result<Vec<_>>>()?;

        // The numerator sum is the DC gain of the integrating part. If rounding
        // zeroes it or flips it, an integrator is effectively lost.
        let float_gain: f64 = taps.b.iter().sum();
        let fixed_gain: i64 = b.iter().map(|&v| v as i64).sum();
        if fixed_gain == 0 || (fixed_gain > 0) != (float_gain > 0.0) {
            warn!(
                order = ?self.order,
                filter_bits = format.filter_bits,
                float_gain,
                fixed_gain,
                "quantized loop filter lost its DC gain; use more filter bits"
            );
        }

        LoopFilterCoefficients::new(&b, &a, format)
    }

    pub fn filter_config(&self, format: &NumericFormat) -> Result<LoopFilterConfig> {
        Ok(LoopFilterConfig::Iir(self.quantize(format)?))
    }
}

/// Frequency-locked loop design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FllDesign {
    /// Hz.
    pub sample_rate: f64,
    /// Hz.
    pub loop_bandwidth: f64,
    /// Largest carrier offset the loop will follow, in Hz.
    pub pull_in: f64,
}

impl FllDesign {
    /// Proportional and integral gains, critically damped.
    pub fn gains(&self) -> Result<(f64, f64)> {
        check_rates(self.sample_rate, self.loop_bandwidth)?;
        let wn = 2.0 * PI * self.loop_bandwidth / self.sample_rate;
        Ok((2.0 * FRAC_1_SQRT_2 * wn, wn * wn))
    }

    pub fn quantize(&self, format: &NumericFormat) -> Result<FllCoefficients> {
        let (alpha, beta) = self.gains()?;
        if !(self.pull_in >= 0.0 && self.pull_in < self.sample_rate / 2.0) {
            return Err(ConfigError::Design(format!(
                "pull-in range {} Hz must be within [0, {}) Hz",
                self.pull_in,
                self.sample_rate / 2.0
            )));
        }
        let scaling = format.scaling()?;
        let one = scaling.filter_one as f64;
        let alpha = to_fixed(alpha, one, "alpha", format.filter_bits)?;
        let beta = to_fixed(beta, one, "beta", format.filter_bits)?;
        if beta == 0 {
            warn!(
                filter_bits = format.filter_bits,
                "FLL integral gain rounds to zero; the loop cannot follow a frequency offset"
            );
        }

        let limit =
            (self.pull_in / self.sample_rate * 2.0 * scaling.phase_pi as f64).round() as i32;
        FllCoefficients::new(alpha, beta, -limit, limit, format)
    }

    pub fn filter_config(&self, format: &NumericFormat) -> Result<LoopFilterConfig> {
        Ok(LoopFilterConfig::Fll(self.quantize(format)?))
    }
}

fn check_rates(sample_rate: f64, loop_bandwidth: f64) -> Result<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(ConfigError::Design(format!(
            "sample rate must be positive, got {sample_rate}"
        )));
    }
    if !(loop_bandwidth > 0.0 && loop_bandwidth < sample_rate / 2.0) {
        return Err(ConfigError::Design(format!(
            "loop bandwidth {loop_bandwidth} Hz must be within (0, {}) Hz",
            sample_rate / 2.0
        )));
    }
    Ok(())
}

fn to_fixed(value: f64, one: f64, name: &'static str, bits: u32) -> Result<i32> {
    let scaled = (value * one).round();
    if scaled.is_finite() && scaled >= i32::MIN as f64 && scaled <= i32::MAX as f64 {
        Ok(scaled as i32)
    } else {
        Err(ConfigError::CoefficientRange { name, value, bits })
    }
}
