use crate::detector::{PhaseDetector, Rational};
use crate::error::Result;
use crate::fixed::NumericFormat;
use crate::iq::FixedIq;

/// Demodulates FM from baseband IQ samples.
///
/// This simply calculates the phase difference between successive baseband
/// samples, in detector units, wrapped into `(-pi, pi]`. It does not handle
/// the modulation index; that would just alter the amplitude of the output.
#[derive(Debug, Clone)]
pub struct FmDemod {
    detector: Rational,
    half_turn: i32,
    last: i32,
}

impl FmDemod {
    pub fn new(format: &NumericFormat) -> Result<Self> {
        Ok(Self {
            detector: Rational::new(format)?,
            half_turn: format.scaling()?.detector_pi,
            last: 0,
        })
    }

    pub fn next(&mut self, sample: FixedIq) -> i32 {
        let phase = self.detector.detect(sample.i, sample.q);
        let mut frequency = phase - self.last;
        self.last = phase;
        if frequency > self.half_turn {
            frequency -= 2 * self.half_turn;
        } else if frequency <= -self.half_turn {
            frequency += 2 * self.half_turn;
        }
        frequency
    }

    pub fn fill(&mut self, inp: &[FixedIq], out: &mut [i32]) {
        for (i, o) in inp.iter().zip(out) {
            *o = self.next(*i);
        }
    }

    pub fn reset(&mut self) {
        self.last = 0;
    }
}
