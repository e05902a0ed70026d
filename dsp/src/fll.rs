use crate::error::{ConfigError, Result};
use crate::fixed::{NumericFormat, Scaling};
use crate::math::saturate;

/// Gains and frequency clamp of an [`FllLoopFilter`].
///
/// Only built through [`FllCoefficients::new`], so the clamp is never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FllCoefficients {
    alpha: i32,
    beta: i32,
    freq_min: i32,
    freq_max: i32,
    filter_bits: u32,
}

impl FllCoefficients {
    pub fn new(
        alpha: i32,
        beta: i32,
        freq_min: i32,
        freq_max: i32,
        format: &NumericFormat,
    ) -> Result<Self> {
        let scaling = format.scaling()?;
        if freq_min > freq_max || freq_min < scaling.filter_min || freq_max > scaling.filter_max {
            return Err(ConfigError::FrequencyClamp {
                min: freq_min,
                max: freq_max,
            });
        }
        Ok(Self {
            alpha,
            beta,
            freq_min,
            freq_max,
            filter_bits: format.filter_bits,
        })
    }

    /// Proportional gain, `filter_bits` fractional bits.
    pub fn alpha(&self) -> i32 {
        self.alpha
    }

    /// Integral gain, `filter_bits` fractional bits.
    pub fn beta(&self) -> i32 {
        self.beta
    }

    /// Lowest frequency estimate, in phase units per sample.
    pub fn freq_min(&self) -> i32 {
        self.freq_min
    }

    /// Highest frequency estimate, in phase units per sample.
    pub fn freq_max(&self) -> i32 {
        self.freq_max
    }

    pub fn filter_bits(&self) -> u32 {
        self.filter_bits
    }
}

/// Frequency integrator and the two truncation remainders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FllState {
    pub freq: i32,
    pub freq_remainder: i32,
    pub phase_remainder: i32,
}

/// Proportional-plus-integral filter whose integrator holds the carrier
/// frequency offset, clamped to the pull-in range.
#[derive(Debug, Clone)]
pub struct FllLoopFilter {
    coefficients: FllCoefficients,
    state: FllState,
    mask: i64,
    min: i32,
    max: i32,
}

impl FllLoopFilter {
    pub fn new(coefficients: FllCoefficients, scaling: &Scaling) -> Self {
        Self {
            coefficients,
            state: FllState::default(),
            mask: (1i64 << coefficients.filter_bits) - 1,
            min: scaling.filter_min,
            max: scaling.filter_max,
        }
    }

    pub fn coefficients(&self) -> &FllCoefficients {
        &self.coefficients
    }

    pub fn state(&self) -> &FllState {
        &self.state
    }

    /// Current frequency estimate, in phase units per sample.
    pub fn frequency(&self) -> i32 {
        self.state.freq
    }

    pub fn reset(&mut self) {
        self.state = FllState::default();
    }

    pub fn advance(&mut self, error: i32) -> i32 {
        let c = &self.coefficients;
        let s = &mut self.state;
        let bits = c.filter_bits;

        let acc = c.beta as i64 * error as i64 + s.freq_remainder as i64;
        s.freq_remainder = (acc & self.mask) as i32;
        s.freq = saturate(s.freq as i64 + (acc >> bits), c.freq_min, c.freq_max);

        let acc = c.alpha as i64 * error as i64 + s.phase_remainder as i64;
        s.phase_remainder = (acc & self.mask) as i32;
        saturate(s.freq as i64 + (acc >> bits), self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: i32 = 1 << 20;

    fn fll(alpha: i32, beta: i32, limit: i32) -> FllLoopFilter {
        let format = NumericFormat::default();
        let c = FllCoefficients::new(alpha, beta, -limit, limit, &format).unwrap();
        FllLoopFilter::new(c, &format.scaling().unwrap())
    }

    #[test]
    fn rejects_bad_clamp() {
        let format = NumericFormat::default();
        assert_eq!(
            FllCoefficients::new(1, 1, 10, -10, &format).unwrap_err(),
            ConfigError::FrequencyClamp { min: 10, max: -10 }
        );
        assert!(FllCoefficients::new(1, 1, -1 << 20, 1 << 20, &format).is_err());
        assert!(FllCoefficients::new(1, 1, 0, 0, &format).is_ok());
    }

    #[test]
    fn extreme_errors_stay_inside_the_clamp() {
        let format = NumericFormat::default();
        let c = FllCoefficients::new(ONE, ONE, -10, 10, &format).unwrap();
        assert_eq!((c.alpha(), c.beta()), (ONE, ONE));
        assert_eq!((c.freq_min(), c.freq_max()), (-10, 10));

        let scaling = format.scaling().unwrap();
        let mut f = FllLoopFilter::new(c, &scaling);
        for e in [i32::MAX, i32::MIN, 98304, -98304, 0] {
            let out = f.advance(e);
            assert!((-10..=10).contains(&f.frequency()));
            assert!((scaling.filter_min..=scaling.filter_max).contains(&out));
        }
    }

    #[test]
    fn zero_input_stays_zero() {
        let mut f = fll(ONE / 10, ONE / 1000, 2745);
        for _ in 0..1000 {
            assert_eq!(f.advance(0), 0);
        }
        assert_eq!(*f.state(), FllState::default());
    }

    #[test]
    fn integrator_accumulates_and_clamps() {
        let mut f = fll(0, ONE / 4, 100);
        for n in 1..=100 {
            f.advance(4);
            assert_eq!(f.frequency(), n.min(100));
        }
        for _ in 0..50 {
            f.advance(4);
        }
        assert_eq!(f.frequency(), 100);
        for _ in 0..300 {
            f.advance(-4);
        }
        assert_eq!(f.frequency(), -100);
    }

    #[test]
    fn proportional_path_keeps_its_fraction() {
        // alpha = 0.25, beta = 0: the output alone carries the error.
        let mut f = fll(ONE / 4, 0, 100);
        let total: i64 = (0..1000).map(|_| f.advance(1) as i64).sum();
        assert_eq!(total, 250);
        assert_eq!(f.frequency(), 0);
    }

    #[test]
    fn reset_clears_state() {
        let mut f = fll(ONE / 3, ONE / 7, 1000);
        for e in [100, -3, 47] {
            f.advance(e);
        }
        assert_ne!(*f.state(), FllState::default());
        f.reset();
        assert_eq!(*f.state(), FllState::default());
    }
}
