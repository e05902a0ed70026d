use crate::iq::IQ;
use crate::math::{Real, TAU};

/// Complex tone generator.
///
/// Frequencies are given in cycles per sample, so a 50 Hz tone at 15 kHz is
/// `50.0 / 15000.0`. Negative frequencies rotate clockwise.
#[derive(Debug, Clone)]
pub struct Tone {
    amplitude: Real,
    frequency: Real,
    sweep: Real,
    /// In cycles, kept in `[0, 1)`.
    phase: Real,
}

impl Tone {
    /// Construct a tone with a given frequency, amplitude and starting phase.
    ///
    /// The starting phase is in radians.
    ///
    /// # Examples
    ///
    /// A quarter-scale tone at 1/16 of the sample rate, starting at 90
    /// degrees:
    ///
    /// ```
    /// # use amsync_dsp::wave::Tone;
    /// # use amsync_dsp::math::FRAC_PI_2;
    /// let mut tone = Tone::new(1.0 / 16.0, 0.25, FRAC_PI_2);
    /// let first = tone.next();
    /// assert!(first.i.abs() < 1e-6 && (first.q - 0.25).abs() < 1e-6);
    /// ```
    pub fn new(frequency: Real, amplitude: Real, starting_phase: Real) -> Self {
        let mut tone = Self {
            amplitude,
            frequency,
            sweep: 0.0,
            phase: 0.0,
        };
        tone.step_phase(starting_phase);
        tone
    }

    /// Change the frequency linearly by `rate` cycles per sample, every sample.
    pub fn with_sweep(self, rate: Real) -> Self {
        Self { sweep: rate, ..self }
    }

    pub fn frequency(&self) -> Real {
        self.frequency
    }

    /// Current phase in radians, in `[0, 2 pi)`.
    pub fn phase(&self) -> Real {
        self.phase * TAU
    }

    /// Jump the phase by `delta` radians.
    pub fn step_phase(&mut self, delta: Real) {
        self.phase = (self.phase + delta / TAU).rem_euclid(1.0);
    }

    /// Generate the next sample of this tone.
    ///
    /// This automatically increments the internal state; the next call to
    /// `next()` will produce the next sample in succession.
    pub fn next(&mut self) -> IQ {
        let sample = IQ::new_polar(self.phase * TAU, self.amplitude);
        self.phase = (self.phase + self.frequency).rem_euclid(1.0);
        self.frequency += self.sweep;
        sample
    }

    /// Fill the provided buffer with the next samples of this tone.
    pub fn fill(&mut self, buffer: &mut [IQ]) {
        for slot in buffer {
            *slot = self.next();
        }
    }
}
