use std::f64::consts::{PI, TAU};
use std::sync::Arc;

use tracing::debug;

use crate::design::{LoopDesign, LoopOrder, Taps};
use crate::detector::{Detector, DetectorKind, PhaseDetector};
use crate::error::{ConfigError, Result};
use crate::filter::{LoopFilter, LoopFilterConfig, MAX_TAPS};
use crate::fixed::{NumericFormat, Scaling};
use crate::iq::{FixedIq, IQ};
use crate::lock::{LockConfig, LockDetector};
use crate::math::Real;
use crate::nco::Nco;
use crate::sine_table::SineTable;

/// 30 Hz third-order loop at 15 kHz.
pub const REFERENCE_DESIGN: LoopDesign = LoopDesign {
    sample_rate: 15000.0,
    loop_bandwidth: 30.0,
    order: LoopOrder::Third,
};

/// Everything needed to build a [`Pll`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PllConfig {
    pub format: NumericFormat,
    pub detector: DetectorKind,
    pub filter: LoopFilterConfig,
    pub lock: LockConfig,
}

impl PllConfig {
    /// Default format and detector around an already quantized filter.
    pub fn new(filter: LoopFilterConfig) -> Self {
        Self {
            format: NumericFormat::default(),
            detector: DetectorKind::default(),
            filter,
            lock: LockConfig::default(),
        }
    }

    /// [`REFERENCE_DESIGN`] with the rational detector and default format.
    pub fn reference() -> Result<Self> {
        let format = NumericFormat::default();
        Ok(Self::new(REFERENCE_DESIGN.filter_config(&format)?))
    }
}

/// Result of processing one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Output {
    /// In-phase oscillator output used for this sample.
    pub i: i16,
    /// Quadrature oscillator output used for this sample.
    pub q: i16,
    /// Phase error, in phase units.
    pub error: i32,
    /// The input rotated by the oscillator phase.
    pub baseband: FixedIq,
}

/// Fixed-point phase-locked loop.
///
/// The oscillator output for a sample is taken before that sample's
/// correction is applied, which gives the loop one sample of delay.
/// Processing is integer only (unless the exact detector is selected), never
/// allocates, and cannot fail. Independent loops share nothing but the
/// read-only sine table.
#[derive(Debug, Clone)]
pub struct Pll {
    config: PllConfig,
    scaling: Scaling,
    table: Arc<SineTable>,
    detector: Detector,
    filter: LoopFilter,
    nco: Nco,
    lock: LockDetector,
}

impl Pll {
    pub fn new(config: PllConfig, table: Arc<SineTable>) -> Result<Self> {
        let format = config.format;
        let scaling = format.scaling()?;

        let built = table.format();
        if built.sample_bits != format.sample_bits
            || built.phase_bits != format.phase_bits
            || built.table_bits != format.table_bits
        {
            return Err(ConfigError::TableFormatMismatch);
        }

        let filter_bits = match &config.filter {
            LoopFilterConfig::Iir(c) => c.filter_bits(),
            LoopFilterConfig::Fll(c) => c.filter_bits(),
        };
        if filter_bits != format.filter_bits {
            return Err(ConfigError::FilterBits {
                expected: format.filter_bits,
                actual: filter_bits,
            });
        }

        let detector = Detector::new(config.detector, &format)?;
        let lock = LockDetector::new(config.lock, scaling.detector_pi * scaling.err_scale)?;

        debug!(
            detector = ?config.detector,
            filter = ?config.filter,
            phase_pi = scaling.phase_pi,
            err_scale = scaling.err_scale,
            filter_min = scaling.filter_min,
            filter_max = scaling.filter_max,
            "configured phase-locked loop"
        );

        Ok(Self {
            filter: LoopFilter::new(config.filter, &scaling),
            nco: Nco::new(&scaling),
            lock,
            config,
            scaling,
            table,
            detector,
        })
    }

    pub fn config(&self) -> &PllConfig {
        &self.config
    }

    pub fn scaling(&self) -> &Scaling {
        &self.scaling
    }

    pub fn table(&self) -> &Arc<SineTable> {
        &self.table
    }

    /// Oscillator phase that the next sample will be mixed with.
    pub fn phase(&self) -> i32 {
        self.nco.phase()
    }

    pub fn filter(&self) -> &LoopFilter {
        &self.filter
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_locked()
    }

    /// Smoothed `|error|`, in phase units.
    pub fn lock_level(&self) -> i32 {
        self.lock.level()
    }

    pub fn process(&mut self, i: i16, q: i16) -> Output {
        let osc = self.table.lookup(self.nco.phase());
        let baseband = FixedIq::new(i, q).mix_conj(osc, self.config.format.sample_bits);
        let error = self.detector.detect(baseband.i, baseband.q) * self.scaling.err_scale;

        let correction = self.filter.advance(error);
        self.nco.advance(correction);
        self.lock.update(error);

        Output {
            i: osc.i,
            q: osc.q,
            error,
            baseband,
        }
    }

    /// Process a buffer of samples, writing one [`Output`] per input.
    pub fn fill(&mut self, input: &[FixedIq], output: &mut [Output]) {
        for (sample, slot) in input.iter().zip(output) {
            *slot = self.process(sample.i, sample.q);
        }
    }

    /// Return to the just-constructed state.
    pub fn reset(&mut self) {
        self.nco.reset();
        self.filter.reset();
        self.lock.reset();
        debug!("phase-locked loop reset");
    }
}

/// Output of [`ReferencePll::process`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceOutput {
    pub oscillator: IQ,
    /// Phase error in radians.
    pub error: Real,
    pub baseband: IQ,
}

/// Floating-point model of [`Pll`], for judging the fixed-point loop.
///
/// Same structure and delay, but with `atan2`, `cos`/`sin` and unquantized
/// taps in `f64`.
#[derive(Debug, Clone)]
pub struct ReferencePll {
    b: [f64; MAX_TAPS],
    feedback: [f64; MAX_TAPS - 1],
    num_b: usize,
    num_feedback: usize,
    x: [f64; MAX_TAPS - 1],
    y: [f64; MAX_TAPS - 1],
    phase: f64,
}

impl ReferencePll {
    pub fn new(design: &LoopDesign) -> Result<Self> {
        Self::from_taps(&design.taps()?)
    }

    pub fn from_taps(taps: &Taps) -> Result<Self> {
        if !(1..=MAX_TAPS).contains(&taps.b.len()) {
            return Err(ConfigError::TapCount {
                side: "numerator",
                len: taps.b.len(),
            });
        }
        if !(1..=MAX_TAPS).contains(&taps.a.len()) {
            return Err(ConfigError::TapCount {
                side: "denominator",
                len: taps.a.len(),
            });
        }
        if taps.a[0] != 1.0 {
            return Err(ConfigError::Design(format!(
                "denominator tap a0 must be 1, got {}",
                taps.a[0]
            )));
        }

        let mut b = [0.0; MAX_TAPS];
        b[..taps.b.len()].copy_from_slice(&taps.b);
        let mut feedback = [0.0; MAX_TAPS - 1];
        feedback[..taps.a.len() - 1].copy_from_slice(&taps.a[1..]);

        Ok(Self {
            b,
            feedback,
            num_b: taps.b.len(),
            num_feedback: taps.a.len() - 1,
            x: [0.0; MAX_TAPS - 1],
            y: [0.0; MAX_TAPS - 1],
            phase: 0.0,
        })
    }

    /// Oscillator phase in radians, in `(-pi, pi]`.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    pub fn process(&mut self, sample: IQ) -> ReferenceOutput {
        let (sin, cos) = self.phase.sin_cos();
        let (i, q) = (sample.i as f64, sample.q as f64);
        let re = i * cos + q * sin;
        let im = q * cos - i * sin;
        let error = if re == 0.0 && im == 0.0 {
            0.0
        } else {
            im.atan2(re)
        };

        let history = [error, self.x[0], self.x[1]];
        let mut y = history
            .iter()
            .zip(&self.b[..self.num_b])
            .map(|(x, b)| x * b)
            .sum::<f64>();
        for (y_k, a_k) in self.y.iter().zip(&self.feedback[..self.num_feedback]) {
            y -= a_k * y_k;
        }
        self.x = [error, self.x[0]];
        self.y = [y, self.y[0]];

        let mut phase = self.phase + y.clamp(-TAU, TAU);
        if phase > PI {
            phase -= TAU;
        } else if phase <= -PI {
            phase += TAU;
        }
        self.phase = phase;

        ReferenceOutput {
            oscillator: IQ::new(cos as Real, sin as Real),
            error: error as Real,
            baseband: IQ::new(re as Real, im as Real),
        }
    }

    pub fn reset(&mut self) {
        self.x = [0.0; MAX_TAPS - 1];
        self.y = [0.0; MAX_TAPS - 1];
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::FllDesign;

    fn table() -> Arc<SineTable> {
        Arc::new(SineTable::new(&NumericFormat::default()).unwrap())
    }

    fn assert_send<T: Send>() {}

    #[test]
    fn loops_can_move_between_threads() {
        assert_send::<Pll>();
        assert_send::<ReferencePll>();
    }

    #[test]
    fn zero_input_keeps_everything_at_zero() {
        let mut pll = Pll::new(PllConfig::reference().unwrap(), table()).unwrap();
        for _ in 0..1000 {
            let out = pll.process(0, 0);
            assert_eq!(out.error, 0);
            assert_eq!(out.baseband, FixedIq::ZERO);
            assert_eq!((out.i, out.q), (32767, 0));
            assert_eq!(pll.phase(), 0);
        }
        match pll.filter() {
            LoopFilter::Iir(f) => assert_eq!(f.state().remainder, 0),
            LoopFilter::Fll(_) => unreachable!(),
        }
    }

    #[test]
    fn oscillator_is_read_before_the_update() {
        let mut pll = Pll::new(PllConfig::reference().unwrap(), table()).unwrap();
        // A quarter-turn input: the first output still uses phase zero.
        let first = pll.process(0, 3277);
        assert_eq!((first.i, first.q), (32767, 0));
        assert_eq!(first.error, 16384 * 3);
        let phase = pll.phase();
        assert!(phase > 0);
        let second = pll.process(0, 3277);
        assert_eq!(second, {
            let osc = pll.table().lookup(phase);
            let baseband = FixedIq::new(0, 3277).mix_conj(osc, 15);
            Output {
                i: osc.i,
                q: osc.q,
                error: second.error,
                baseband,
            }
        });
    }

    #[test]
    fn rejects_mismatched_table() {
        let small = Arc::new(
            SineTable::new(&NumericFormat {
                table_bits: 10,
                ..NumericFormat::default()
            })
            .unwrap(),
        );
        assert_eq!(
            Pll::new(PllConfig::reference().unwrap(), small).unwrap_err(),
            ConfigError::TableFormatMismatch
        );
    }

    #[test]
    fn rejects_mismatched_filter_bits() {
        let coarse = NumericFormat {
            filter_bits: 15,
            ..NumericFormat::default()
        };
        let filter = REFERENCE_DESIGN.filter_config(&coarse).unwrap();
        assert_eq!(
            Pll::new(PllConfig::new(filter), table()).unwrap_err(),
            ConfigError::FilterBits {
                expected: 20,
                actual: 15
            }
        );
    }

    #[test]
    fn rejects_bad_detector() {
        let config = PllConfig {
            detector: DetectorKind::Cordic { iterations: 0 },
            ..PllConfig::reference().unwrap()
        };
        assert!(matches!(
            Pll::new(config, table()),
            Err(ConfigError::CordicIterations { .. })
        ));
    }

    #[test]
    fn rejects_oversized_lock_smoothing() {
        for smoothing_shift in [32, 64, u32::MAX] {
            let config = PllConfig {
                lock: LockConfig {
                    threshold: 1024,
                    smoothing_shift,
                },
                ..PllConfig::reference().unwrap()
            };
            assert!(matches!(
                Pll::new(config, table()),
                Err(ConfigError::LockShift { shift, .. }) if shift == smoothing_shift
            ));
        }
    }

    #[test]
    fn reset_restores_initial_state() {
        let fll = FllDesign {
            sample_rate: 15000.0,
            loop_bandwidth: 30.0,
            pull_in: 200.0,
        };
        let config = PllConfig::new(fll.filter_config(&NumericFormat::default()).unwrap());
        let mut pll = Pll::new(config, table()).unwrap();
        let fresh = pll.clone();
        for n in 0..500 {
            pll.process((n * 37 % 4000) as i16, 1200);
        }
        assert_ne!(pll.phase(), 0);
        pll.reset();
        assert_eq!(pll.phase(), fresh.phase());
        assert_eq!(pll.lock_level(), fresh.lock_level());
        match pll.filter() {
            LoopFilter::Fll(f) => assert_eq!(f.frequency(), 0),
            LoopFilter::Iir(_) => unreachable!(),
        }
    }

    #[test]
    fn reference_loop_rejects_bad_taps() {
        let taps = Taps {
            b: vec![0.1],
            a: vec![2.0],
        };
        assert!(ReferencePll::from_taps(&taps).is_err());
        let taps = Taps {
            b: vec![0.1; 4],
            a: vec![1.0],
        };
        assert!(ReferencePll::from_taps(&taps).is_err());
    }

    #[test]
    fn reference_loop_wraps_phase() {
        let mut pll = ReferencePll::new(&REFERENCE_DESIGN).unwrap();
        for n in 0..15000 {
            let theta = TAU * 50.0 * n as f64 / 15000.0;
            pll.process(IQ::new_polar(theta as Real, 0.1));
            assert!(pll.phase() > -PI && pll.phase() <= PI);
        }
    }
}
