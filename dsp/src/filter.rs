use crate::error::{ConfigError, Result};
use crate::fixed::{NumericFormat, Scaling};
use crate::fll::{FllCoefficients, FllLoopFilter};
use crate::math::saturate;

/// Longest numerator or denominator the filter supports.
pub const MAX_TAPS: usize = 3;

/// Quantized numerator and denominator of an IIR loop filter.
///
/// `b` carries `filter_bits` fractional bits. `a` uses the same scale but must
/// be made of whole numbers with `a[0] == 1`, so the recursion needs no
/// rounding. The number of recursive terms is `a.len() - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFilterCoefficients {
    b: [i32; MAX_TAPS],
    feedback: [i32; MAX_TAPS - 1],
    num_b: usize,
    num_feedback: usize,
    filter_bits: u32,
}

impl LoopFilterCoefficients {
    pub fn new(b: &[i32], a: &[i32], format: &NumericFormat) -> Result<Self> {
        let scaling = format.scaling()?;
        if !(1..=MAX_TAPS).contains(&b.len()) {
            return Err(ConfigError::TapCount {
                side: "numerator",
                len: b.len(),
            });
        }
        if !(1..=MAX_TAPS).contains(&a.len()) {
            return Err(ConfigError::TapCount {
                side: "denominator",
                len: a.len(),
            });
        }

        let one = scaling.filter_one;
        if a[0] != one {
            return Err(ConfigError::DenominatorNotNormalized { a0: a[0], one });
        }

        let mut feedback = [0; MAX_TAPS - 1];
        for (k, &value) in a.iter().enumerate().skip(1) {
            if value % one != 0 {
                return Err(ConfigError::FractionalFeedback {
                    index: k,
                    value,
                    one,
                });
            }
            feedback[k - 1] = value / one;
        }

        let mut taps = [0; MAX_TAPS];
        taps[..b.len()].copy_from_slice(b);

        Ok(Self {
            b: taps,
            feedback,
            num_b: b.len(),
            num_feedback: a.len() - 1,
            filter_bits: format.filter_bits,
        })
    }

    pub fn b(&self) -> &[i32] {
        &self.b[..self.num_b]
    }

    /// Denominator taps after `a0`, as whole numbers.
    pub fn feedback(&self) -> &[i32] {
        &self.feedback[..self.num_feedback]
    }

    /// The larger of the numerator and denominator lengths.
    pub fn order(&self) -> usize {
        self.num_b.max(self.num_feedback + 1)
    }

    pub fn filter_bits(&self) -> u32 {
        self.filter_bits
    }
}

/// Delay line and quantization-error register of an IIR loop filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopFilterState {
    pub x1: i32,
    pub x2: i32,
    pub y1: i32,
    pub y2: i32,
    /// Fraction dropped by the last right shift, added back into the next
    /// sample. Always in `[0, 1 << filter_bits)`.
    pub remainder: i32,
}

/// Fixed-point IIR loop filter with truncation-error feedback.
///
/// Without the feedback, flooring every output biases the correction towards
/// negative infinity and the loop settles with a standing phase error.
#[derive(Debug, Clone)]
pub struct IirLoopFilter {
    coefficients: LoopFilterCoefficients,
    state: LoopFilterState,
    mask: i64,
    min: i32,
    max: i32,
}

impl IirLoopFilter {
    pub fn new(coefficients: LoopFilterCoefficients, scaling: &Scaling) -> Self {
        Self {
            coefficients,
            state: LoopFilterState::default(),
            mask: (1i64 << coefficients.filter_bits) - 1,
            min: scaling.filter_min,
            max: scaling.filter_max,
        }
    }

    pub fn coefficients(&self) -> &LoopFilterCoefficients {
        &self.coefficients
    }

    pub fn state(&self) -> &LoopFilterState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = LoopFilterState::default();
    }

    /// Filter one error sample.
    pub fn advance(&mut self, error: i32) -> i32 {
        let c = &self.coefficients;
        let s = &mut self.state;

        let history = [error, s.x1, s.x2];
        let mut acc = s.remainder as i64;
        for (&x, &b) in history.iter().zip(c.b()) {
            acc += x as i64 * b as i64;
        }

        s.remainder = (acc & self.mask) as i32;
        let mut y0 = acc >> c.filter_bits;

        let outputs = [s.y1, s.y2];
        for (&y, &a) in outputs.iter().zip(c.feedback()) {
            y0 -= a as i64 * y as i64;
        }
        let y0 = saturate(y0, self.min, self.max);

        s.x2 = s.x1;
        s.x1 = error;
        s.y2 = s.y1;
        s.y1 = y0;
        y0
    }
}

/// Loop filter choice, fixed when the loop is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopFilterConfig {
    Iir(LoopFilterCoefficients),
    Fll(FllCoefficients),
}

#[derive(Debug, Clone)]
pub enum LoopFilter {
    Iir(IirLoopFilter),
    Fll(FllLoopFilter),
}

impl LoopFilter {
    pub fn new(config: LoopFilterConfig, scaling: &Scaling) -> Self {
        match config {
            LoopFilterConfig::Iir(c) => Self::Iir(IirLoopFilter::new(c, scaling)),
            LoopFilterConfig::Fll(c) => Self::Fll(FllLoopFilter::new(c, scaling)),
        }
    }

    #[inline]
    pub fn advance(&mut self, error: i32) -> i32 {
        match self {
            Self::Iir(f) => f.advance(error),
            Self::Fll(f) => f.advance(error),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Iir(f) => f.reset(),
            Self::Fll(f) => f.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE: i32 = 1 << 20;

    fn format() -> NumericFormat {
        NumericFormat::default()
    }

    fn filter(b: &[i32], a: &[i32]) -> IirLoopFilter {
        let format = format();
        let coefficients = LoopFilterCoefficients::new(b, a, &format).unwrap();
        IirLoopFilter::new(coefficients, &format.scaling().unwrap())
    }

    #[test]
    fn recursion_length_follows_denominator() {
        let f = LoopFilterCoefficients::new(&[5, 6, 7], &[ONE, -2 * ONE, ONE], &format()).unwrap();
        assert_eq!(f.feedback(), &[-2, 1]);
        assert_eq!(f.order(), 3);

        let f = LoopFilterCoefficients::new(&[5, 6], &[ONE, -ONE], &format()).unwrap();
        assert_eq!(f.feedback(), &[-1]);
        assert_eq!(f.order(), 2);

        let f = LoopFilterCoefficients::new(&[5], &[ONE], &format()).unwrap();
        assert!(f.feedback().is_empty());
        assert_eq!(f.order(), 1);
    }

    #[test]
    fn rejects_bad_coefficients() {
        let format = format();
        assert_eq!(
            LoopFilterCoefficients::new(&[], &[ONE], &format).unwrap_err(),
            ConfigError::TapCount {
                side: "numerator",
                len: 0
            }
        );
        assert_eq!(
            LoopFilterCoefficients::new(&[1], &[ONE, 0, 0, 0], &format).unwrap_err(),
            ConfigError::TapCount {
                side: "denominator",
                len: 4
            }
        );
        assert_eq!(
            LoopFilterCoefficients::new(&[1], &[ONE - 1], &format).unwrap_err(),
            ConfigError::DenominatorNotNormalized {
                a0: ONE - 1,
                one: ONE
            }
        );
        assert_eq!(
            LoopFilterCoefficients::new(&[1, 1], &[ONE, -ONE / 2], &format).unwrap_err(),
            ConfigError::FractionalFeedback {
                index: 1,
                value: -ONE / 2,
                one: ONE
            }
        );
    }

    #[test]
    fn zero_input_stays_zero() {
        let mut f = filter(&[37126, -73800, 36700], &[ONE, -2 * ONE, ONE]);
        for _ in 0..10_000 {
            assert_eq!(f.advance(0), 0);
            assert_eq!(f.state().remainder, 0);
        }
    }

    #[test]
    fn remainder_carries_the_fraction() {
        // Gain 0.3: every single output floors to zero, but the fraction
        // accumulates and surfaces every few samples.
        let b0 = (0.3 * ONE as f64).round() as i32;
        let mut f = filter(&[b0], &[ONE]);
        let total: i64 = (0..1000).map(|_| f.advance(1) as i64).sum();
        assert_eq!(total, 1000 * b0 as i64 >> 20);
        assert_eq!(total, 300);
        assert!((0..ONE).contains(&f.state().remainder));
    }

    #[test]
    fn negative_errors_floor_consistently() {
        let b0 = (0.3 * ONE as f64).round() as i32;
        let mut f = filter(&[b0], &[ONE]);
        let total: i64 = (0..1000).map(|_| f.advance(-1) as i64).sum();
        assert_eq!(total, -(1000 * b0 as i64) >> 20);
        assert_eq!(total, -301);
    }

    #[test]
    fn integrating_filter_follows_float_reference() {
        // Second-order design for 30 Hz at 15 kHz.
        let (b0, b1) = (0.0178505_f64, -0.0176926_f64);
        let qb = [
            (b0 * ONE as f64).round() as i32,
            (b1 * ONE as f64).round() as i32,
        ];
        let mut f = filter(&qb, &[ONE, -ONE]);

        let (mut x1, mut y1) = (0.0, 0.0);
        for _ in 0..500 {
            let e = 1000.0;
            let y = e * b0 + x1 * b1 + y1;
            x1 = e;
            y1 = y;
            let fixed = f.advance(1000);
            assert!((fixed as f64 - y).abs() <= 2.0, "{fixed} vs {y}");
        }
    }

    #[test]
    fn output_saturates() {
        let scaling = format().scaling().unwrap();
        let mut f = filter(&[ONE], &[ONE, -ONE]);
        for _ in 0..100 {
            f.advance(100_000);
        }
        assert_eq!(f.state().y1, scaling.filter_max);
        for _ in 0..200 {
            f.advance(-100_000);
        }
        assert_eq!(f.state().y1, scaling.filter_min);
    }

    #[test]
    fn reset_clears_state() {
        let mut f = filter(&[ONE / 3, ONE / 5], &[ONE, -ONE]);
        for e in [5, -7, 11] {
            f.advance(e);
        }
        assert_ne!(*f.state(), LoopFilterState::default());
        f.reset();
        assert_eq!(*f.state(), LoopFilterState::default());
    }
}
