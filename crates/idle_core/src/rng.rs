//! Injected randomness.
//!
//! The engine never touches system randomness. Every random draw goes
//! through a [`RandomSource`] owned by the caller, so a seed (or a
//! scripted sequence in tests) fully determines a run.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// A source of uniformly distributed values in `[0, 1)`.
pub trait RandomSource {
    /// Draw the next value in `[0, 1)`.
    fn next_unit(&mut self) -> Fixed;

    /// Draw an integer uniformly from `[min, max)`.
    ///
    /// Returns `min` when the range is empty.
    fn next_int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = Fixed::from_num(max - min);
        min + (self.next_unit() * span).floor().to_num::<i32>()
    }

    /// Draw a fixed-point value uniformly from `[min, max)`.
    fn next_range(&mut self, min: Fixed, max: Fixed) -> Fixed {
        min + self.next_unit() * (max - min)
    }
}

/// Seeded deterministic generator used by live sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimRng {
    state: u64,
}

impl SimRng {
    /// Create a generator from a seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next_u64(&mut self) -> u64 {
        // splitmix64
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SimRng {
    fn next_unit(&mut self) -> Fixed {
        // The top 32 bits become the fractional part of an I32F32.
        Fixed::from_bits((self.next_u64() >> 32) as i64)
    }
}

/// Replays a fixed sequence of draws, wrapping around at the end.
///
/// Used to pin down crit/dodge rolls and spawn attributes in tests.
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<Fixed>,
    cursor: usize,
}

impl ScriptedRng {
    /// Create a scripted source. Values are clamped into `[0, 1)`.
    #[must_use]
    pub fn new(values: &[f64]) -> Self {
        let below_one = Fixed::from_num(1) - Fixed::DELTA;
        let values = values
            .iter()
            .map(|v| Fixed::saturating_from_num(*v).clamp(Fixed::ZERO, below_one))
            .collect();
        Self { values, cursor: 0 }
    }

    /// A source that always returns the same value.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(&[value])
    }

    /// Number of values drawn so far.
    #[must_use]
    pub const fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedRng {
    fn next_unit(&mut self) -> Fixed {
        if self.values.is_empty() {
            return Fixed::ZERO;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_rng_is_deterministic() {
        let mut a = SimRng::new(42);
        let mut b = SimRng::new(42);
        for _ in 0..100 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_sim_rng_stays_in_unit_interval() {
        let mut rng = SimRng::new(7);
        for _ in 0..1000 {
            let v = rng.next_unit();
            assert!(v >= Fixed::ZERO && v < Fixed::from_num(1));
        }
    }

    #[test]
    fn test_next_int_respects_bounds() {
        let mut rng = SimRng::new(99);
        for _ in 0..1000 {
            let v = rng.next_int(5, 7);
            assert!((5..7).contains(&v));
        }
    }

    #[test]
    fn test_scripted_rng_wraps() {
        let mut rng = ScriptedRng::new(&[0.25, 0.5]);
        assert_eq!(rng.next_unit(), Fixed::from_num(0.25));
        assert_eq!(rng.next_unit(), Fixed::from_num(0.5));
        assert_eq!(rng.next_unit(), Fixed::from_num(0.25));
        assert_eq!(rng.draws(), 3);
    }

    #[test]
    fn test_scripted_rng_clamps_one() {
        let mut rng = ScriptedRng::constant(1.0);
        assert!(rng.next_unit() < Fixed::from_num(1));
    }
}
