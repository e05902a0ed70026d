use crate::error::Result;
use crate::fixed::NumericFormat;
use crate::math::{Real, PI};

use super::{fold, PhaseDetector};

/// `atan2` in floating point, rounded to detector units.
///
/// Needs an FPU, so it only serves as a reference when running on a host.
#[derive(Debug, Clone, Copy)]
pub struct Exact {
    half_turn: i32,
}

impl Exact {
    pub fn new(format: &NumericFormat) -> Result<Self> {
        Ok(Self {
            half_turn: format.scaling()?.detector_pi,
        })
    }
}

impl PhaseDetector for Exact {
    fn detect(&self, i: i16, q: i16) -> i32 {
        if i == 0 && q == 0 {
            return 0;
        }
        let angle = Real::atan2(q as Real, i as Real) / PI * self.half_turn as Real;
        // Rounding just above -pi can land on -half_turn itself.
        fold(angle.round() as i32, self.half_turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_detector_units() {
        let d = Exact::new(&NumericFormat::default()).unwrap();
        assert_eq!(d.detect(100, 100), 8192);
        assert_eq!(d.detect(-100, 0), 32768);
        assert_eq!(d.detect(-32768, -1), 32768);
        assert_eq!(d.detect(1, -1), -8192);
    }
}
