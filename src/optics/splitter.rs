use crate::config::{SplitterConfig, check_non_negative};
use crate::errors::{ConfigurationError, PreconditionError};
use crate::optics::pulse::Pulse;
use crate::rng::{self, SimRng};
use rand::Rng;
use tracing::debug;

/// Half-width of the band around each axis that routes without leakage, degrees.
pub const AXIS_BAND_DEG: f64 = 22.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SplitterPort {
    H,
    V,
}

/// Smallest distance between two polarization angles modulo 180°.
pub fn angle_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(180.0);
    d.min(180.0 - d)
}

/// Polarizing beam splitter with finite extinction ratio and alignment jitter.
#[derive(Clone, Debug)]
pub struct PolarizingBeamSplitter {
    pub extinction_ratio_db: f64,
    /// Degrees
    pub angle_jitter_std: f64,
    rng: SimRng,
}

impl PolarizingBeamSplitter {
    pub fn new(
        extinction_ratio_db: f64,
        angle_jitter_std: f64,
        rng: SimRng,
    ) -> Result<Self, ConfigurationError> {
        check_non_negative("extinction_ratio_db", extinction_ratio_db)?;
        check_non_negative("angle_jitter_std", angle_jitter_std)?;
        Ok(Self {
            extinction_ratio_db,
            angle_jitter_std,
            rng,
        })
    }

    pub fn from_config(config: &SplitterConfig, rng: SimRng) -> Result<Self, ConfigurationError> {
        Self::new(config.extinction_ratio_db, config.angle_jitter_std, rng)
    }

    /// Probability that a diagonal pulse leaks through instead of being blocked.
    pub fn leakage_probability(&self) -> f64 {
        10f64.powf(-self.extinction_ratio_db / 10.0)
    }

    /// Picks the output port, or `None` when the pulse is blocked.
    pub fn split(&mut self, pulse: &Pulse) -> Result<Option<SplitterPort>, PreconditionError> {
        let polarization = pulse
            .polarization
            .ok_or(PreconditionError::MissingPolarization {
                component: "polarizing beam splitter",
            })?;

        let pol = (polarization + rng::gaussian(&mut self.rng, self.angle_jitter_std))
            .rem_euclid(180.0);

        if angle_distance(pol, 0.0) < AXIS_BAND_DEG {
            return Ok(Some(SplitterPort::H));
        }
        if angle_distance(pol, 90.0) < AXIS_BAND_DEG {
            return Ok(Some(SplitterPort::V));
        }

        let leak = self.leakage_probability();
        if rng::bernoulli(&mut self.rng, leak) {
            let port = if self.rng.random_bool(0.5) {
                SplitterPort::H
            } else {
                SplitterPort::V
            };
            return Ok(Some(port));
        }

        debug!(polarization = pol, "diagonal pulse blocked by splitter");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polarized(deg: f64) -> Pulse {
        Pulse::new(1550e-9, 1e-9, 1.0, 0.0).with_polarization(deg)
    }

    #[test]
    fn horizontal_goes_to_h() {
        let mut pbs = PolarizingBeamSplitter::new(30.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        assert_eq!(pbs.split(&polarized(0.0)).unwrap(), Some(SplitterPort::H));
        assert_eq!(pbs.split(&polarized(179.0)).unwrap(), Some(SplitterPort::H));
    }

    #[test]
    fn vertical_goes_to_v() {
        let mut pbs = PolarizingBeamSplitter::new(30.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        assert_eq!(pbs.split(&polarized(90.0)).unwrap(), Some(SplitterPort::V));
        assert_eq!(pbs.split(&polarized(100.0)).unwrap(), Some(SplitterPort::V));
    }

    #[test]
    fn diagonal_is_blocked_with_infinite_extinction() {
        let mut pbs =
            PolarizingBeamSplitter::new(f64::MAX, 0.0, SimRng::seed_from_u64(0)).unwrap();
        for _ in 0..100 {
            assert_eq!(pbs.split(&polarized(45.0)).unwrap(), None);
        }
    }

    #[test]
    fn diagonal_always_leaks_with_zero_extinction() {
        let mut pbs = PolarizingBeamSplitter::new(0.0, 0.0, SimRng::seed_from_u64(8)).unwrap();
        let mut seen_h = false;
        let mut seen_v = false;
        for _ in 0..200 {
            match pbs.split(&polarized(135.0)).unwrap() {
                Some(SplitterPort::H) => seen_h = true,
                Some(SplitterPort::V) => seen_v = true,
                None => panic!("zero extinction ratio must never block"),
            }
        }
        assert!(seen_h && seen_v);
    }

    #[test]
    fn angle_distance_wraps() {
        assert!((angle_distance(179.0, 0.0) - 1.0).abs() < 1e-12);
        assert!((angle_distance(-10.0, 0.0) - 10.0).abs() < 1e-12);
        assert!((angle_distance(45.0, 90.0) - 45.0).abs() < 1e-12);
    }

    #[test]
    fn unpolarized_pulse_is_a_precondition_error() {
        let mut pbs = PolarizingBeamSplitter::new(30.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        let pulse = Pulse::new(1550e-9, 1e-9, 1.0, 0.0);
        assert!(pbs.split(&pulse).is_err());
    }
}
