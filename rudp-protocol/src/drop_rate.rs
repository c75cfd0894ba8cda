//! Artificial loss policy
//!
//! A drop rate is a percentage in `[0, 100]`. The receiver draws a uniform
//! value in `[0, 100)` per datagram and withholds the acknowledgement when the
//! draw falls below the rate. Test harnesses use the same policy to skip
//! packets on the sending side.

use rand::Rng;
use std::fmt;

/// Clamped drop percentage
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct DropRate(f64);

impl DropRate {
    /// Never drop
    pub const NONE: DropRate = DropRate(0.0);
    /// Always drop
    pub const ALL: DropRate = DropRate(100.0);

    /// Clamp `percent` into `[0, 100]`; NaN becomes 0
    pub fn new(percent: f64) -> Self {
        if percent.is_nan() {
            DropRate::NONE
        } else {
            DropRate(percent.clamp(0.0, 100.0))
        }
    }

    #[inline]
    pub fn percent(self) -> f64 {
        self.0
    }

    /// Decide whether the next packet is dropped
    ///
    /// A zero rate never consumes randomness.
    pub fn should_drop<R: Rng + ?Sized>(self, rng: &mut R) -> bool {
        self.0 > 0.0 && rng.gen_range(0.0..100.0) < self.0
    }
}

impl fmt::Display for DropRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_clamping() {
        assert_eq!(DropRate::new(-5.0).percent(), 0.0);
        assert_eq!(DropRate::new(150.0).percent(), 100.0);
        assert_eq!(DropRate::new(37.5).percent(), 37.5);
        assert_eq!(DropRate::new(f64::NAN).percent(), 0.0);
        assert_eq!(DropRate::new(f64::INFINITY).percent(), 100.0);
    }

    #[test]
    fn test_extremes_are_deterministic() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(!DropRate::NONE.should_drop(&mut rng));
            assert!(DropRate::ALL.should_drop(&mut rng));
        }
    }

    #[test]
    fn test_rate_is_roughly_honoured() {
        let mut rng = StdRng::seed_from_u64(42);
        let rate = DropRate::new(30.0);
        let dropped = (0..10_000).filter(|_| rate.should_drop(&mut rng)).count();
        assert!((2_500..3_500).contains(&dropped), "dropped {}", dropped);
    }

    #[test]
    fn test_display() {
        assert_eq!(DropRate::new(12.34).to_string(), "12.3%");
    }
}
