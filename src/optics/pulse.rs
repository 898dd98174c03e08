use crate::QuantumState;
use crate::config::LaserConfig;
use crate::rng;
use rand::Rng;

/// Planck constant (J·s).
pub const PLANCK: f64 = 6.626_070_15e-34;
/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

const SHAPE_SAMPLES: usize = 1000;

/// Temporal intensity profile of a pulse over its duration.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PulseShape {
    /// Gaussian centred in the window with σ = duration / 6.
    #[default]
    Gaussian,
    /// Constant intensity over the window.
    Flat,
}

impl PulseShape {
    /// Unnormalized profile value at time `t` within `[0, duration]`.
    pub fn profile(&self, t: f64, duration: f64) -> f64 {
        match self {
            PulseShape::Gaussian => {
                let t0 = duration / 2.0;
                let sigma = duration / 6.0;
                (-0.5 * ((t - t0) / sigma).powi(2)).exp()
            }
            PulseShape::Flat => 1.0,
        }
    }
}

/// Trapezoid rule over uniformly spaced samples.
fn trapezoid(values: &[f64], step: f64) -> f64 {
    values
        .windows(2)
        .map(|w| 0.5 * (w[0] + w[1]) * step)
        .sum()
}

/// Diagnostic snapshot of a pulse, attached to detection records.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseProperties {
    pub wavelength: f64,
    pub arrival_time: Option<f64>,
    pub mean_photon_number: f64,
}

/// A light pulse: the physical carrier of both classical and quantum degrees of freedom.
#[derive(Clone, Debug)]
pub struct Pulse {
    /// Wavelength in metres
    pub wavelength: f64,
    /// Duration in seconds
    pub duration: f64,
    pub amplitude: f64,
    /// Optical phase in radians
    pub phase: f64,
    pub shape: PulseShape,
    /// Linear polarization in degrees (0 = H, 90 = V), if the pulse carries one
    pub polarization: Option<f64>,
    /// Mean photon number. Derived from the energy at construction; protocols
    /// usually overwrite it with an attenuated value such as 0.2.
    pub mean_photon_number: f64,
    pub quantum_state: Option<QuantumState>,
    pub id: Option<u64>,
    pub timestamp: Option<f64>,
}

impl Pulse {
    pub fn new(wavelength: f64, duration: f64, amplitude: f64, phase: f64) -> Self {
        let mut pulse = Self {
            wavelength,
            duration,
            amplitude,
            phase,
            shape: PulseShape::default(),
            polarization: None,
            mean_photon_number: 0.0,
            quantum_state: None,
            id: None,
            timestamp: None,
        };
        pulse.mean_photon_number = pulse.derived_mean_photon_number();
        pulse
    }

    /// Changes the temporal profile and re-derives the mean photon number.
    pub fn with_shape(mut self, shape: PulseShape) -> Self {
        self.shape = shape;
        self.mean_photon_number = self.derived_mean_photon_number();
        self
    }

    pub fn with_polarization(mut self, degrees: f64) -> Self {
        self.polarization = Some(degrees);
        self
    }

    pub fn with_mean_photon_number(mut self, mu: f64) -> Self {
        self.mean_photon_number = mu;
        self
    }

    pub fn with_quantum_state(mut self, state: QuantumState) -> Self {
        self.quantum_state = Some(state);
        self
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_timestamp(mut self, time: f64) -> Self {
        self.timestamp = Some(time);
        self
    }

    /// Energy of a single photon at this wavelength, E = hc/λ.
    pub fn photon_energy(&self) -> f64 {
        PLANCK * SPEED_OF_LIGHT / self.wavelength
    }

    /// Pulse energy: amplitude² times the normalized temporal profile,
    /// integrated over the duration.
    pub fn energy(&self) -> f64 {
        let intensity_scale = self.amplitude * self.amplitude;
        if self.duration <= 0.0 {
            return intensity_scale;
        }

        let step = self.duration / (SHAPE_SAMPLES - 1) as f64;
        let samples: Vec<f64> = (0..SHAPE_SAMPLES)
            .map(|i| self.shape.profile(i as f64 * step, self.duration))
            .collect();
        let area = trapezoid(&samples, step);
        if area <= 0.0 {
            return intensity_scale;
        }

        let intensity: Vec<f64> = samples
            .iter()
            .map(|s| intensity_scale * s / area)
            .collect();
        trapezoid(&intensity, step)
    }

    fn derived_mean_photon_number(&self) -> f64 {
        let per_photon = self.photon_energy();
        if per_photon.is_finite() && per_photon > 0.0 {
            self.energy() / per_photon
        } else {
            0.0
        }
    }

    /// Poisson photon count of this (weak coherent) pulse.
    ///
    /// Zero means nothing would reach a detector; this is a presence test,
    /// not a timing model.
    pub fn sample_photon_arrivals<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng::poisson(rng, self.mean_photon_number)
    }

    pub fn properties(&self) -> PulseProperties {
        PulseProperties {
            wavelength: self.wavelength,
            arrival_time: self.timestamp,
            mean_photon_number: self.mean_photon_number,
        }
    }
}

/// Continuous-wave source carved into pulses on demand.
#[derive(Clone, Debug)]
pub struct Laser {
    pub wavelength: f64,
    pub amplitude: f64,
    pub shape: PulseShape,
    next_id: u64,
}

impl Laser {
    pub fn new(wavelength: f64, amplitude: f64) -> Self {
        Self {
            wavelength,
            amplitude,
            shape: PulseShape::default(),
            next_id: 0,
        }
    }

    pub fn from_config(config: &LaserConfig) -> Self {
        Self::new(config.wavelength, config.amplitude)
    }

    pub fn with_shape(mut self, shape: PulseShape) -> Self {
        self.shape = shape;
        self
    }

    /// Emits one pulse; pulses are numbered in emission order.
    pub fn emit_pulse(
        &mut self,
        duration: f64,
        phase: f64,
        quantum_state: Option<QuantumState>,
    ) -> Pulse {
        let mut pulse = Pulse::new(self.wavelength, duration, self.amplitude, phase)
            .with_shape(self.shape)
            .with_id(self.next_id);
        pulse.quantum_state = quantum_state;
        self.next_id += 1;
        pulse
    }

    /// Number of pulses emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next_id
    }
}
