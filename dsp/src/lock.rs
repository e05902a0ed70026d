use crate::error::{ConfigError, Result};

/// Largest usable [`LockConfig::smoothing_shift`]. Keeps the accumulator, a
/// full-scale `i32` shifted up, well inside `i64`.
pub const MAX_SMOOTHING_SHIFT: u32 = 31;

/// Lock detector settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// Smoothed `|error|` below which the loop counts as locked, in phase units.
    pub threshold: i32,
    /// Time constant of the smoother, `2^smoothing_shift` samples.
    pub smoothing_shift: u32,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            threshold: 1024,
            smoothing_shift: 6,
        }
    }
}

/// Tracks the average magnitude of the phase error.
///
/// Starts out at the largest possible error, so a fresh or reset loop reads as
/// unlocked until the error has actually come down.
#[derive(Debug, Clone)]
pub struct LockDetector {
    config: LockConfig,
    acc: i64,
    initial: i64,
}

impl LockDetector {
    /// `full_scale` is the largest error magnitude the detector can report.
    pub fn new(config: LockConfig, full_scale: i32) -> Result<Self> {
        if config.smoothing_shift > MAX_SMOOTHING_SHIFT {
            return Err(ConfigError::LockShift {
                shift: config.smoothing_shift,
                max: MAX_SMOOTHING_SHIFT,
            });
        }
        let initial = (full_scale as i64) << config.smoothing_shift;
        Ok(Self {
            config,
            acc: initial,
            initial,
        })
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn update(&mut self, error: i32) {
        self.acc += (error as i64).abs() - (self.acc >> self.config.smoothing_shift);
    }

    /// Smoothed error magnitude.
    pub fn level(&self) -> i32 {
        (self.acc >> self.config.smoothing_shift).min(i32::MAX as i64) as i32
    }

    pub fn is_locked(&self) -> bool {
        self.level() < self.config.threshold
    }

    pub fn reset(&mut self) {
        self.acc = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unlocked() {
        let d = LockDetector::new(LockConfig::default(), 98304).unwrap();
        assert_eq!(d.level(), 98304);
        assert!(!d.is_locked());
    }

    #[test]
    fn locks_once_error_settles() {
        let mut d = LockDetector::new(LockConfig::default(), 98304).unwrap();
        let mut locked_at = None;
        for n in 0..2000 {
            d.update(if n % 2 == 0 { 50 } else { -50 });
            if locked_at.is_none() && d.is_locked() {
                locked_at = Some(n);
            }
        }
        let n = locked_at.unwrap();
        assert!(n > 100 && n < 400, "{n}");
        assert!((d.level() - 50).abs() <= 1);

        for _ in 0..1000 {
            d.update(20000);
        }
        assert!(!d.is_locked());

        d.reset();
        assert_eq!(d.level(), 98304);
    }

    #[test]
    fn smoothing_shift_is_bounded() {
        let config = LockConfig {
            threshold: 1024,
            smoothing_shift: MAX_SMOOTHING_SHIFT + 1,
        };
        assert_eq!(
            LockDetector::new(config, 98304).unwrap_err(),
            ConfigError::LockShift { shift: 32, max: 31 }
        );

        // The widest allowed smoother still holds a full-scale error.
        let config = LockConfig {
            smoothing_shift: MAX_SMOOTHING_SHIFT,
            ..config
        };
        let mut d = LockDetector::new(config, i32::MAX).unwrap();
        assert_eq!(d.level(), i32::MAX);
        for _ in 0..1000 {
            d.update(i32::MIN);
        }
        assert_eq!(d.level(), i32::MAX);
    }
}
