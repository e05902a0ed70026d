use std::ops;

use num_complex::Complex;

use crate::math::{cos, saturate_i16, sin, Real};

/// Floating-point complex sample, used by the reference loop and the test
/// signal generators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IQ {
    pub i: Real,
    pub q: Real,
}

impl IQ {
    pub const ZERO: Self = Self { i: 0.0, q: 0.0 };

    pub fn new(i: Real, q: Real) -> Self {
        Self { i, q }
    }

    pub fn new_polar(phase: Real, magnitude: Real) -> Self {
        Self {
            i: magnitude * cos(phase),
            q: magnitude * sin(phase),
        }
    }

    pub fn phase(&self) -> Real {
        Real::atan2(self.q, self.i)
    }

    pub fn magnitude(&self) -> Real {
        ((self.i * self.i) + (self.q * self.q)).sqrt()
    }

    /// Quantize to the base sample format, where `full_scale` is the integer
    /// value of 1.0. Out-of-range components saturate.
    pub fn to_fixed(&self, full_scale: i32) -> FixedIq {
        let quantize = |x: Real| {
            let scaled = (x * full_scale as Real).round();
            saturate_i16(scaled.clamp(i32::MIN as Real, i32::MAX as Real) as i32)
        };
        FixedIq::new(quantize(self.i), quantize(self.q))
    }
}

impl ops::Add for IQ {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            i: self.i + rhs.i,
            q: self.q + rhs.q,
        }
    }
}

impl ops::AddAssign for IQ {
    fn add_assign(&mut self, rhs: Self) {
        self.i += rhs.i;
        self.q += rhs.q;
    }
}

impl From<Complex<Real>> for IQ {
    fn from(value: Complex<Real>) -> Self {
        IQ::new(value.re, value.im)
    }
}

impl From<IQ> for Complex<Real> {
    fn from(value: IQ) -> Self {
        Complex::new(value.i, value.q)
    }
}

/// Complex sample in the base fixed-point format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedIq {
    pub i: i16,
    pub q: i16,
}

impl FixedIq {
    pub const ZERO: Self = Self { i: 0, q: 0 };

    pub fn new(i: i16, q: i16) -> Self {
        Self { i, q }
    }

    /// Multiply by the conjugate of `osc` and shift the product back down by
    /// `shift` bits. Each component saturates to `i16`.
    ///
    /// With `osc` a unit phasor at angle `θ` this rotates the sample by `-θ`.
    pub fn mix_conj(self, osc: FixedIq, shift: u32) -> FixedIq {
        let (i, q) = (self.i as i32, self.q as i32);
        let (oi, oq) = (osc.i as i32, osc.q as i32);
        // Both sums stay inside i32 for |osc| <= i16::MAX.
        let re = (i * oi + q * oq) >> shift;
        let im = (q * oi - i * oq) >> shift;
        FixedIq::new(saturate_i16(re), saturate_i16(im))
    }

    pub fn to_real(self, full_scale: i32) -> IQ {
        IQ::new(
            self.i as Real / full_scale as Real,
            self.q as Real / full_scale as Real,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_conj_removes_oscillator_phase() {
        // 90 degrees in, oscillator at 90 degrees: residual on the real axis.
        let sample = FixedIq::new(0, 16384);
        let osc = FixedIq::new(0, 32767);
        let mixed = sample.mix_conj(osc, 15);
        assert_eq!(mixed, FixedIq::new(16383, 0));
    }

    #[test]
    fn mix_conj_saturates() {
        let sample = FixedIq::new(i16::MIN, i16::MIN);
        let osc = FixedIq::new(-32767, -32767);
        let mixed = sample.mix_conj(osc, 15);
        assert_eq!(mixed.i, i16::MAX);
        assert_eq!(mixed.q, 0);
    }

    #[test]
    fn quantize_saturates() {
        let fixed = IQ::new(2.0, -0.5).to_fixed(32767);
        assert_eq!(fixed, FixedIq::new(i16::MAX, -16384));
    }

    #[test]
    fn complex_round_trip() {
        let z = Complex::new(0.25, -0.75);
        let iq = IQ::from(z);
        assert_eq!(Complex::<Real>::from(iq), z);
    }
}
