use crate::fixed::Scaling;
use crate::math::saturate;

/// Numerically controlled oscillator phase.
///
/// Holds the phase in `(-pi, pi]` phase units. Each correction is limited to
/// one full cycle, which keeps a single add or subtract sufficient to wrap.
#[derive(Debug, Clone)]
pub struct Nco {
    phase: i32,
    pi: i32,
}

impl Nco {
    pub fn new(scaling: &Scaling) -> Self {
        Self {
            phase: 0,
            pi: scaling.phase_pi,
        }
    }

    pub fn phase(&self) -> i32 {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = 0;
    }

    pub fn advance(&mut self, correction: i32) -> i32 {
        let turn = 2 * self.pi as i64;
        let correction = saturate(correction as i64, -turn as i32, turn as i32);
        let mut phase = self.phase as i64 + correction as i64;
        if phase > self.pi as i64 {
            phase -= turn;
        } else if phase <= -self.pi as i64 {
            phase += turn;
        }
        self.phase = phase as i32;
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::NumericFormat;

    fn nco() -> Nco {
        Nco::new(&NumericFormat::default().scaling().unwrap())
    }

    #[test]
    fn wraps_at_pi() {
        let mut n = nco();
        assert_eq!(n.advance(102941), 102941);
        assert_eq!(n.advance(1), 102942 - 205882);
        n.reset();
        assert_eq!(n.advance(-102941), 102941);
    }

    #[test]
    fn every_reachable_value_lands_in_range() {
        let pi = 102941;
        let mut n = nco();
        let corrections = [-262144, -205882, -205883, -102941, -1, 0, 1, 102941, 205882, 262143];
        for start in [-pi + 1, -1, 0, 1, pi / 2, pi] {
            for &c in &corrections {
                n.phase = start;
                let p = n.advance(c);
                assert!(p > -pi && p <= pi, "{start} + {c} -> {p}");
            }
        }
    }

    #[test]
    fn full_turn_returns_to_start() {
        let mut n = nco();
        n.advance(5000);
        assert_eq!(n.advance(205882), 5000);
        assert_eq!(n.advance(-205882), 5000);
    }
}
