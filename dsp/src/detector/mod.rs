//! Rectangular-to-phase converters.

mod cordic;
mod exact;
mod rational;

pub use cordic::{Cordic, Polar, MAX_ITERATIONS};
pub use exact::Exact;
pub use rational::Rational;

use crate::error::Result;
use crate::fixed::NumericFormat;

/// Results are in detector units, where `detector_pi` stands for pi, and lie
/// in `(-detector_pi, detector_pi]`. A `(0, 0)` sample reads as zero.
pub trait PhaseDetector {
    /// Angle of `(i, q)`, approximating `atan2(q, i)` in detector units.
    fn detect(&self, i: i16, q: i16) -> i32;
}

/// Which phase detector a loop uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorKind {
    /// Shift-and-divide rational approximation. Integer only.
    #[default]
    Rational,
    /// Vectoring CORDIC. Integer only; also yields the magnitude.
    Cordic { iterations: u32 },
    /// Floating-point `atan2`, for host-side reference runs.
    Exact,
}

/// The closed set of detectors a loop can be configured with.
#[derive(Debug, Clone)]
pub enum Detector {
    Rational(Rational),
    Cordic(Cordic),
    Exact(Exact),
}

impl Detector {
    pub fn new(kind: DetectorKind, format: &NumericFormat) -> Result<Self> {
        Ok(match kind {
            DetectorKind::Rational => Self::Rational(Rational::new(format)?),
            DetectorKind::Cordic { iterations } => Self::Cordic(Cordic::new(iterations, format)?),
            DetectorKind::Exact => Self::Exact(Exact::new(format)?),
        })
    }

    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Rational(_) => DetectorKind::Rational,
            Self::Cordic(c) => DetectorKind::Cordic {
                iterations: c.iterations(),
            },
            Self::Exact(_) => DetectorKind::Exact,
        }
    }
}

impl PhaseDetector for Detector {
    #[inline]
    fn detect(&self, i: i16, q: i16) -> i32 {
        match self {
            Self::Rational(d) => d.detect(i, q),
            Self::Cordic(d) => d.detect(i, q),
            Self::Exact(d) => d.detect(i, q),
        }
    }
}

/// Envelope estimate `max(|i|, |q|) + min(|i|, |q|) / 4`.
///
/// Within about 12% of the true magnitude, with no multiply or divide.
pub fn approx_magnitude(i: i16, q: i16) -> u16 {
    let absi = (i as i32).abs();
    let absq = (q as i32).abs();
    let estimate = if absi > absq {
        absi + absq / 4
    } else {
        absq + absi / 4
    };
    estimate as u16
}

/// Fold an angle that overshot by less than a full turn back into
/// `(-half_turn, half_turn]`.
fn fold(angle: i32, half_turn: i32) -> i32 {
    if angle > half_turn {
        angle - 2 * half_turn
    } else if angle <= -half_turn {
        angle + 2 * half_turn
    } else {
        angle
    }
}
