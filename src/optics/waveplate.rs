use crate::config::{WavePlateConfig, check_non_negative, check_probability};
use crate::errors::{ConfigurationError, PreconditionError};
use crate::optics::pulse::Pulse;
use crate::rng::{self, SimRng};
use rand::Rng;

/// Half-wave plate set at `theta_deg`: rotates linear polarization by 2θ.
///
/// Mounting error is drawn per pulse; with probability `depol_prob` the
/// output polarization is scrambled to a uniform angle. That is a classical
/// depolarization of the polarization angle and leaves any quantum state alone.
#[derive(Clone, Debug)]
pub struct HalfWavePlate {
    pub theta_deg: f64,
    /// Degrees
    pub angle_error_std: f64,
    pub depol_prob: f64,
    rng: SimRng,
}

impl HalfWavePlate {
    pub fn new(
        theta_deg: f64,
        angle_error_std: f64,
        depol_prob: f64,
        rng: SimRng,
    ) -> Result<Self, ConfigurationError> {
        check_non_negative("angle_error_std", angle_error_std)?;
        check_probability("depol_prob", depol_prob)?;
        Ok(Self {
            theta_deg,
            angle_error_std,
            depol_prob,
            rng,
        })
    }

    pub fn from_config(config: &WavePlateConfig, rng: SimRng) -> Result<Self, ConfigurationError> {
        Self::new(
            config.theta_deg,
            config.angle_error_std,
            config.depol_prob,
            rng,
        )
    }

    /// Rotates the pulse polarization in place, result in [0, 180).
    pub fn apply(&mut self, pulse: &mut Pulse) -> Result<(), PreconditionError> {
        let old_pol = pulse
            .polarization
            .ok_or(PreconditionError::MissingPolarization {
                component: "half-wave plate",
            })?;

        let effective_theta = self.theta_deg + rng::gaussian(&mut self.rng, self.angle_error_std);
        let mut new_pol = (old_pol + 2.0 * effective_theta).rem_euclid(180.0);
        // rem_euclid rounds tiny negatives up to the modulus
        if new_pol >= 180.0 {
            new_pol = 0.0;
        }

        if rng::bernoulli(&mut self.rng, self.depol_prob) {
            new_pol = self.rng.random_range(0.0..180.0);
        }

        pulse.polarization = Some(new_pol);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polarized(deg: f64) -> Pulse {
        Pulse::new(1550e-9, 1e-9, 1.0, 0.0).with_polarization(deg)
    }

    #[test]
    fn forty_five_degree_plate_turns_h_into_v() {
        let mut hwp = HalfWavePlate::new(45.0, 0.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        let mut pulse = polarized(0.0);
        hwp.apply(&mut pulse).unwrap();
        assert_eq!(pulse.polarization, Some(90.0));
    }

    #[test]
    fn rotation_wraps_modulo_180() {
        let mut hwp = HalfWavePlate::new(-30.0, 0.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        let mut pulse = polarized(10.0);
        hwp.apply(&mut pulse).unwrap();
        let pol = pulse.polarization.unwrap();
        assert!((pol - 130.0).abs() < 1e-12);
    }

    #[test]
    fn certain_depolarization_stays_in_range() {
        let mut hwp = HalfWavePlate::new(0.0, 0.0, 1.0, SimRng::seed_from_u64(4)).unwrap();
        for _ in 0..200 {
            let mut pulse = polarized(0.0);
            hwp.apply(&mut pulse).unwrap();
            let pol = pulse.polarization.unwrap();
            assert!((0.0..180.0).contains(&pol));
        }
    }

    #[test]
    fn unpolarized_pulse_is_a_precondition_error() {
        let mut hwp = HalfWavePlate::new(45.0, 0.0, 0.0, SimRng::seed_from_u64(0)).unwrap();
        let mut pulse = Pulse::new(1550e-9, 1e-9, 1.0, 0.0);
        assert!(matches!(
            hwp.apply(&mut pulse),
            Err(PreconditionError::MissingPolarization { .. })
        ));
    }
}
