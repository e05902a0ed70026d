use crate::iq::IQ;
use crate::math::Real;
use rand::{rngs::ThreadRng, thread_rng, Rng};
use rand_distr::Normal;

/// Additive white Gaussian noise, applied independently to both components.
pub struct Awgn<R = ThreadRng> {
    distr: Normal<Real>,
    rng: R,
}

impl Awgn {
    pub fn new(std_dev: Real) -> Self {
        Self::with_rng(thread_rng(), std_dev)
    }
}

impl<R: Rng> Awgn<R> {
    /// Use a specific generator, e.g. a seeded one for repeatable runs.
    ///
    /// A negative or non-finite `std_dev` is treated as zero.
    pub fn with_rng(rng: R, std_dev: Real) -> Self {
        let std_dev = if std_dev.is_finite() { std_dev.max(0.0) } else { 0.0 };
        Self {
            distr: Normal::new(0.0, std_dev).expect("std_dev is finite and non-negative"),
            rng,
        }
    }

    pub fn sample(&mut self) -> IQ {
        IQ::new(self.rng.sample(self.distr), self.rng.sample(self.distr))
    }

    pub fn apply(&mut self, buffer: &mut [IQ]) {
        for slot in buffer {
            *slot += self.sample();
        }
    }
}
