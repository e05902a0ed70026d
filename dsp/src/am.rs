//! AM demodulators.

use std::sync::Arc;

use crate::detector::approx_magnitude;
use crate::error::Result;
use crate::iq::FixedIq;
use crate::math::saturate;
use crate::pll::{Pll, PllConfig};
use crate::sine_table::SineTable;

/// Removes the DC component with a first-order IIR low-pass estimate.
///
/// The estimate is `acc >> shift`, with a time constant of `2^shift` samples.
#[derive(Debug, Clone)]
pub struct DcBlocker {
    acc: i64,
    shift: u32,
}

impl DcBlocker {
    pub const DEFAULT_SHIFT: u32 = 5;
    /// Longer time constants are clamped to this one.
    pub const MAX_SHIFT: u32 = 31;

    pub fn new(shift: u32) -> Self {
        Self {
            acc: 0,
            shift: shift.min(Self::MAX_SHIFT),
        }
    }

    pub fn shift(&self) -> u32 {
        self.shift
    }

    /// Current DC estimate.
    pub fn dc(&self) -> i32 {
        saturate(self.acc >> self.shift, i32::MIN, i32::MAX)
    }

    pub fn process(&mut self, x: i32) -> i32 {
        self.acc += x as i64 - (self.acc >> self.shift);
        saturate(x as i64 - (self.acc >> self.shift), i32::MIN, i32::MAX)
    }

    pub fn reset(&mut self) {
        self.acc = 0;
    }
}

impl Default for DcBlocker {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SHIFT)
    }
}

/// Envelope detector: magnitude estimate minus its DC.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeDemod {
    dc: DcBlocker,
}

impl EnvelopeDemod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, sample: FixedIq) -> i32 {
        let magnitude = approx_magnitude(sample.i, sample.q);
        self.dc.process(magnitude as i32)
    }

    pub fn fill(&mut self, inp: &[FixedIq], out: &mut [i32]) {
        for (i, o) in inp.iter().zip(out) {
            *o = self.next(*i);
        }
    }
}

/// Synchronous AM detector.
///
/// A [`Pll`] rotates the carrier onto the real axis; the audio is the
/// in-phase part of the rotated signal, minus DC. Unlike the envelope detector
/// this stays linear through selective fading and overmodulation.
#[derive(Debug, Clone)]
pub struct SyncAmDemod {
    pll: Pll,
    dc: DcBlocker,
}

impl SyncAmDemod {
    pub fn new(config: PllConfig, table: Arc<SineTable>) -> Result<Self> {
        Ok(Self {
            pll: Pll::new(config, table)?,
            dc: DcBlocker::default(),
        })
    }

    pub fn pll(&self) -> &Pll {
        &self.pll
    }

    pub fn next(&mut self, sample: FixedIq) -> i32 {
        let out = self.pll.process(sample.i, sample.q);
        self.dc.process(out.baseband.i as i32)
    }

    pub fn fill(&mut self, inp: &[FixedIq], out: &mut [i32]) {
        for (i, o) in inp.iter().zip(out) {
            *o = self.next(*i);
        }
    }

    pub fn reset(&mut self) {
        self.pll.reset();
        self.dc.reset();
    }
}
