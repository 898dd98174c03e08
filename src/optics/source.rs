use crate::config::{SourceConfig, check_non_negative, check_probability};
use crate::errors::{ConfigurationError, StateError};
use crate::optics::pulse::Pulse;
use crate::rng::{self, SimRng};
use crate::{Gate, QuantumState};

/// What happened on one trigger of a [`SinglePhotonSource`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmissionInfo {
    pub trigger_time: f64,
    pub emitted: bool,
    pub n_photons: u32,
    pub photon_times: Vec<f64>,
    pub wavelengths: Vec<f64>,
    pub is_background: bool,
    pub is_multiphoton: bool,
    pub is_polarization_error: bool,
    pub is_depolarized: bool,
    /// Tr(ρ²) of the emitted qubit
    pub purity: Option<f64>,
    /// Running g²(0) estimate, when statistics are tracked
    pub g2_0_empirical: Option<f64>,
}

/// Running photon-number tallies used for the empirical g²(0).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct EmissionStats {
    trials: u64,
    single: u64,
    double: u64,
}

impl EmissionStats {
    fn g2(&self) -> Option<f64> {
        if self.trials == 0 {
            return None;
        }
        let trials = self.trials as f64;
        let mean_n = (self.single + 2 * self.double) as f64 / trials;
        let mean_n2 = (self.single + 4 * self.double) as f64 / trials;
        Some(if mean_n > 0.0 {
            mean_n2 / (mean_n * mean_n)
        } else {
            0.0
        })
    }
}

/// Heralded single-photon source with background light, multiphoton
/// emission, timing/wavelength jitter and polarization-qubit errors.
#[derive(Clone, Debug)]
pub struct SinglePhotonSource {
    pub wavelength: f64,
    pub duration: f64,
    pub phase: f64,
    pub eta_src: f64,
    pub p_multi: f64,
    pub sigma_t: f64,
    pub sigma_lambda: f64,
    pub p_bg: f64,
    pub p_polarization_error: f64,
    pub p_depolarize: f64,
    initial_state: QuantumState,
    stats: Option<EmissionStats>,
    rng: SimRng,
}

impl SinglePhotonSource {
    pub fn from_config(config: &SourceConfig, rng: SimRng) -> Result<Self, ConfigurationError> {
        let p_multi = config.effective_p_multi();
        check_probability("eta_src", config.eta_src)?;
        check_probability("p_multi", p_multi)?;
        check_probability("p_bg", config.p_bg)?;
        check_probability("p_polarization_error", config.p_polarization_error)?;
        check_probability("p_depolarize", config.p_depolarize)?;
        check_non_negative("sigma_t", config.sigma_t)?;
        check_non_negative("sigma_lambda", config.sigma_lambda)?;
        check_non_negative("duration", config.duration)?;

        // |V> = |1> unless told otherwise
        let initial_state = QuantumState::basis(1, 1);

        Ok(Self {
            wavelength: config.wavelength,
            duration: config.duration,
            phase: config.phase,
            eta_src: config.eta_src,
            p_multi,
            sigma_t: config.sigma_t,
            sigma_lambda: config.sigma_lambda,
            p_bg: config.p_bg,
            p_polarization_error: config.p_polarization_error,
            p_depolarize: config.p_depolarize,
            initial_state,
            stats: config.track_statistics.then(EmissionStats::default),
            rng,
        })
    }

    /// Replaces the polarization qubit prepared on every emission.
    pub fn with_initial_state(mut self, state: QuantumState) -> Self {
        self.initial_state = state;
        self
    }

    /// Empirical g²(0) over all triggers so far, if statistics are tracked.
    pub fn g2_0_empirical(&self) -> Option<f64> {
        self.stats.and_then(|s| s.g2())
    }

    /// Fires the source once.
    ///
    /// Returns the pulse (photon number stored as its mean photon number)
    /// or `None` when nothing was emitted, plus the emission record.
    pub fn emit_pulse(
        &mut self,
        trigger_time: f64,
    ) -> Result<(Option<Pulse>, EmissionInfo), StateError> {
        let mut info = EmissionInfo {
            trigger_time,
            ..EmissionInfo::default()
        };

        let (n_photons, is_background) = if rng::bernoulli(&mut self.rng, self.p_bg) {
            (1, true)
        } else if rng::bernoulli(&mut self.rng, self.p_multi) {
            (2, false)
        } else if rng::bernoulli(&mut self.rng, self.eta_src) {
            (1, false)
        } else {
            if let Some(stats) = self.stats.as_mut() {
                stats.trials += 1;
            }
            return Ok((None, info));
        };

        info.emitted = true;
        info.n_photons = n_photons;
        info.is_background = is_background;
        info.is_multiphoton = n_photons > 1;

        if let Some(stats) = self.stats.as_mut() {
            stats.trials += 1;
            match n_photons {
                1 => stats.single += 1,
                _ => stats.double += 1,
            }
        }

        for _ in 0..n_photons {
            let jitter = rng::gaussian(&mut self.rng, self.sigma_t);
            let arrival = trigger_time + self.duration / 2.0 + jitter;
            info.photon_times.push(arrival);
            let shift = rng::gaussian(&mut self.rng, self.sigma_lambda);
            info.wavelengths.push(self.wavelength + shift);
        }

        let mut qubit = self.initial_state.clone();
        if rng::bernoulli(&mut self.rng, self.p_polarization_error) {
            // H <-> V flip
            qubit.apply_gate(&Gate::x())?;
            info.is_polarization_error = true;
        }
        if rng::bernoulli(&mut self.rng, self.p_depolarize) {
            qubit.depolarize();
            info.is_depolarized = true;
        }
        info.purity = Some(qubit.purity());
        info.g2_0_empirical = self.g2_0_empirical();

        let pulse = Pulse::new(info.wavelengths[0], self.duration, 1.0, self.phase)
            .with_quantum_state(qubit)
            .with_mean_photon_number(f64::from(n_photons))
            .with_timestamp(info.photon_times[0]);

        Ok((Some(pulse), info))
    }
}
