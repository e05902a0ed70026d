use std::f64::consts::PI;

use crate::error::{ConfigError, Result};
use crate::fixed::NumericFormat;

use super::{fold, PhaseDetector};

/// Further steps would round to a zero-angle rotation at the default format.
pub const MAX_ITERATIONS: u32 = 15;

/// Magnitude and phase of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Polar {
    pub magnitude: u16,
    /// Detector units, see [`PhaseDetector`].
    pub phase: i32,
}

/// Vectoring-mode CORDIC.
///
/// Rotates `(i, q)` onto the positive real axis by successive `atan(2^-k)`
/// steps, summing the steps into the phase. Samples in the left half plane are
/// first turned by a quarter cycle, since the iteration only converges within
/// ±90 degrees.
#[derive(Debug, Clone)]
pub struct Cordic {
    atan: [i32; MAX_ITERATIONS as usize],
    iterations: u32,
    /// Inverse processing gain in 16-bit fixed point.
    gain: i64,
    half_turn: i32,
}

impl Cordic {
    pub fn new(iterations: u32, format: &NumericFormat) -> Result<Self> {
        if !(1..=MAX_ITERATIONS).contains(&iterations) {
            return Err(ConfigError::CordicIterations {
                iterations,
                max: MAX_ITERATIONS,
            });
        }
        let half_turn = format.scaling()?.detector_pi;

        let mut atan = [0; MAX_ITERATIONS as usize];
        let mut gain = 1.0;
        for (k, slot) in atan.iter_mut().enumerate().take(iterations as usize) {
            let step = f64::powi(2.0, -(k as i32));
            *slot = (step.atan() / PI * half_turn as f64).round() as i32;
            gain /= (1.0 + step * step).sqrt();
        }

        Ok(Self {
            atan,
            iterations,
            gain: (gain * 65536.0).round() as i64,
            half_turn,
        })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn atan_table(&self) -> &[i32] {
        &self.atan[..self.iterations as usize]
    }

    /// The inverse CORDIC gain, scaled by 65536.
    pub fn gain(&self) -> i64 {
        self.gain
    }

    pub fn to_polar(&self, i: i16, q: i16) -> Polar {
        if i == 0 && q == 0 {
            return Polar {
                magnitude: 0,
                phase: 0,
            };
        }

        // i32 leaves room for the ~1.65x growth of the rotation.
        let mut x = i as i32;
        let mut y = q as i32;
        let mut angle = 0;
        let quarter = self.half_turn / 2;

        if x < 0 {
            let t = x;
            if y > 0 {
                x = y;
                y = -t;
                angle = quarter;
            } else {
                x = -y;
                y = t;
                angle = -quarter;
            }
        }

        for (k, &step) in self.atan_table().iter().enumerate() {
            let t = x;
            if y > 0 {
                x += y >> k;
                y -= t >> k;
                angle += step;
            } else {
                x -= y >> k;
                y += t >> k;
                angle -= step;
            }
        }

        let magnitude = (x as i64 * self.gain) >> 16;
        Polar {
            magnitude: magnitude.clamp(0, u16::MAX as i64) as u16,
            phase: fold(angle, self.half_turn),
        }
    }
}

impl PhaseDetector for Cordic {
    fn detect(&self, i: i16, q: i16) -> i32 {
        self.to_polar(i, q).phase
    }
}
