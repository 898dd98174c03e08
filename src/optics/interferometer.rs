use crate::config::{InterferometerConfig, check_non_negative, check_probability};
use crate::errors::ConfigurationError;
use crate::optics::detector::{DetectionRecord, Detector};
use crate::optics::pulse::Pulse;
use crate::rng::{self, SimRng};
use tracing::debug;

/// Result of one interference event.
#[derive(Clone, Debug)]
pub struct InterferenceOutcome {
    /// 0 if only detector 0 clicked, 1 if only detector 1 clicked, otherwise discarded
    pub bit: Option<u8>,
    /// Noisy phase difference that was applied, radians
    pub phase_difference: f64,
    pub detector0: DetectionRecord,
    pub detector1: DetectionRecord,
}

/// Delay-line Mach–Zehnder interferometer with two output detectors.
///
/// Overlaps consecutive pulses, splits their photon number between the two
/// outputs according to the phase difference, and keeps only events where
/// exactly one detector fired.
#[derive(Clone, Debug)]
pub struct MachZehnderInterferometer {
    pub visibility: f64,
    /// Radians
    pub phase_noise_std: f64,
    detectors: [Detector; 2],
    rng: SimRng,
}

impl MachZehnderInterferometer {
    pub fn new(
        detector0: Detector,
        detector1: Detector,
        visibility: f64,
        phase_noise_std: f64,
        rng: SimRng,
    ) -> Result<Self, ConfigurationError> {
        check_probability("visibility", visibility)?;
        check_non_negative("phase_noise_std", phase_noise_std)?;
        Ok(Self {
            visibility,
            phase_noise_std,
            detectors: [detector0, detector1],
            rng,
        })
    }

    pub fn from_config(
        config: &InterferometerConfig,
        rng: SimRng,
    ) -> Result<Self, ConfigurationError> {
        Self::new(
            Detector::from_config(&config.detector0, rng.clone())?,
            Detector::from_config(&config.detector1, rng.clone())?,
            config.visibility,
            config.phase_noise_std,
            rng,
        )
    }

    pub fn detectors(&self) -> &[Detector; 2] {
        &self.detectors
    }

    pub fn detectors_mut(&mut self) -> &mut [Detector; 2] {
        &mut self.detectors
    }

    /// Output-port probabilities (p0, p1) for a phase difference `delta_phi`.
    pub fn output_probabilities(&self, delta_phi: f64) -> (f64, f64) {
        let p0 = 0.5 * (1.0 + self.visibility * delta_phi.cos());
        (p0, 1.0 - p0)
    }

    /// Interferes `pulse_prev` with `pulse_next` and reads both detectors at `current_time`.
    pub fn measure(
        &mut self,
        pulse_prev: &Pulse,
        pulse_next: &Pulse,
        current_time: f64,
    ) -> InterferenceOutcome {
        let phase_difference = pulse_next.phase - pulse_prev.phase
            + rng::gaussian(&mut self.rng, self.phase_noise_std);
        let (p0, p1) = self.output_probabilities(phase_difference);

        let arm0 = Self::output_share(pulse_prev, p0);
        let arm1 = Self::output_share(pulse_prev, p1);

        let [det0, det1] = &mut self.detectors;
        let detector0 = det0.detect(Some(&arm0), current_time, None);
        let detector1 = det1.detect(Some(&arm1), current_time, None);

        let bit = match (detector0.clicked, detector1.clicked) {
            (true, false) => Some(0),
            (false, true) => Some(1),
            (clicked, _) => {
                debug!(both = clicked, phase_difference, "event discarded");
                None
            }
        };

        InterferenceOutcome {
            bit,
            phase_difference,
            detector0,
            detector1,
        }
    }

    /// Virtual pulse carrying the fraction `share` of the input's energy and photon number.
    fn output_share(input: &Pulse, share: f64) -> Pulse {
        Pulse::new(
            input.wavelength,
            input.duration,
            input.amplitude * share.max(0.0).sqrt(),
            0.0,
        )
        .with_mean_photon_number(share * input.mean_photon_number)
    }
}
