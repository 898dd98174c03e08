use crate::QuantumState;
use crate::config::{DetectorConfig, check_non_negative, check_probability};
use crate::errors::ConfigurationError;
use crate::optics::pulse::{Pulse, PulseProperties};
use crate::rng::{self, SimRng};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Window used for dark counts when neither a window nor a pulse is given.
pub const DEFAULT_WINDOW: f64 = 1e-9;

/// Which instant starts the dead time after a click.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadTimeReference {
    /// The jittered detection time of the click.
    #[default]
    DetectionTime,
    /// The nominal time `detect` was called with.
    CallTime,
}

/// Wavelength-dependent detection efficiency as a piecewise-linear table.
///
/// Deserializes from a list of `[wavelength, efficiency]` pairs through
/// [`EfficiencySpectrum::new`], so tables read from config are validated and sorted.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct EfficiencySpectrum {
    /// (wavelength in metres, efficiency) pairs
    points: Vec<(f64, f64)>,
}

impl EfficiencySpectrum {
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self, ConfigurationError> {
        for &(_, eff) in &points {
            check_probability("efficiency_spectrum", eff)?;
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self { points })
    }

    /// Efficiency at `wavelength`, clamped to the table ends.
    pub fn efficiency_at(&self, wavelength: f64) -> Option<f64> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        if wavelength <= first.0 {
            return Some(first.1);
        }
        if wavelength >= last.0 {
            return Some(last.1);
        }
        self.points.windows(2).find_map(|w| {
            let ((x0, y0), (x1, y1)) = (w[0], w[1]);
            (wavelength >= x0 && wavelength <= x1).then(|| {
                if x1 == x0 {
                    y0
                } else {
                    y0 + (y1 - y0) * (wavelength - x0) / (x1 - x0)
                }
            })
        })
    }
}

impl TryFrom<Vec<(f64, f64)>> for EfficiencySpectrum {
    type Error = ConfigurationError;

    fn try_from(points: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<EfficiencySpectrum> for Vec<(f64, f64)> {
    fn from(spectrum: EfficiencySpectrum) -> Self {
        spectrum.points
    }
}

/// Everything `detect` observed, click or not.
#[derive(Clone, Debug, Default)]
pub struct DetectionRecord {
    pub clicked: bool,
    pub photon_present: bool,
    pub dark_count: bool,
    pub dead_time_active: bool,
    pub detection_time: Option<f64>,
    pub timing_jitter: f64,
    pub input_state: Option<QuantumState>,
    pub pulse_properties: Option<PulseProperties>,
}

/// Single-photon detector (SNSPD-like) with efficiency, dark counts, dead time and jitter.
///
/// `last_detection_time` is the only state carried between calls, which makes
/// outcomes depend on the order of calls and not only on their timestamps.
#[derive(Clone, Debug)]
pub struct Detector {
    pub efficiency: f64,
    pub dark_count_rate: f64,
    pub dead_time: f64,
    pub timing_jitter: f64,
    pub efficiency_spectrum: Option<EfficiencySpectrum>,
    pub dead_time_reference: DeadTimeReference,
    last_detection_time: Option<f64>,
    rng: SimRng,
}

impl Detector {
    pub fn new(
        efficiency: f64,
        dark_count_rate: f64,
        dead_time: f64,
        timing_jitter: f64,
        rng: SimRng,
    ) -> Result<Self, ConfigurationError> {
        check_probability("efficiency", efficiency)?;
        check_non_negative("dark_count_rate", dark_count_rate)?;
        check_non_negative("dead_time", dead_time)?;
        check_non_negative("timing_jitter", timing_jitter)?;

        Ok(Self {
            efficiency,
            dark_count_rate,
            dead_time,
            timing_jitter,
            efficiency_spectrum: None,
            dead_time_reference: DeadTimeReference::default(),
            last_detection_time: None,
            rng,
        })
    }

    pub fn from_config(config: &DetectorConfig, rng: SimRng) -> Result<Self, ConfigurationError> {
        let mut detector = Self::new(
            config.efficiency,
            config.dark_count_rate,
            config.dead_time,
            config.timing_jitter,
            rng,
        )?
        .with_dead_time_reference(config.dead_time_reference);
        detector.efficiency_spectrum = config.efficiency_spectrum.clone();
        Ok(detector)
    }

    pub fn with_dead_time_reference(mut self, reference: DeadTimeReference) -> Self {
        self.dead_time_reference = reference;
        self
    }

    pub fn with_efficiency_spectrum(mut self, spectrum: EfficiencySpectrum) -> Self {
        self.efficiency_spectrum = Some(spectrum);
        self
    }

    pub fn last_detection_time(&self) -> Option<f64> {
        self.last_detection_time
    }

    /// Forgets the previous click, e.g. between independent runs.
    pub fn reset(&mut self) {
        self.last_detection_time = None;
    }

    fn efficiency_for(&self, pulse: &Pulse) -> f64 {
        self.efficiency_spectrum
            .as_ref()
            .and_then(|s| s.efficiency_at(pulse.wavelength))
            .unwrap_or(self.efficiency)
    }

    fn in_dead_time(&self, current_time: f64) -> bool {
        self.last_detection_time
            .is_some_and(|last| current_time - last < self.dead_time)
    }

    /// Jitters the click time and restarts the dead time.
    fn register_click(&mut self, current_time: f64) -> f64 {
        let detection_time = current_time + rng::gaussian(&mut self.rng, self.timing_jitter);
        self.last_detection_time = Some(match self.dead_time_reference {
            DeadTimeReference::DetectionTime => detection_time,
            DeadTimeReference::CallTime => current_time,
        });
        detection_time
    }

    /// Decides whether the detector clicks for `pulse` (or for nothing) at `current_time`.
    ///
    /// The dark-count window defaults to the pulse duration, or 1 ns without a pulse.
    pub fn detect(
        &mut self,
        pulse: Option<&Pulse>,
        current_time: f64,
        window: Option<f64>,
    ) -> DetectionRecord {
        let mut record = DetectionRecord {
            timing_jitter: self.timing_jitter,
            ..DetectionRecord::default()
        };

        if self.in_dead_time(current_time) {
            record.dead_time_active = true;
            return record;
        }

        if let Some(pulse) = pulse {
            record.photon_present = true;
            record.input_state = pulse.quantum_state.clone();
            record.pulse_properties = Some(pulse.properties());

            let efficiency = self.efficiency_for(pulse);
            let n_photons = rng::poisson(&mut self.rng, pulse.mean_photon_number);
            // at least one of n photons passes: 1 - (1 - eff)^n
            let p_click = if n_photons == 0 {
                0.0
            } else {
                1.0 - (1.0 - efficiency).powf(n_photons as f64)
            };
            let detected = rng::bernoulli(&mut self.rng, p_click);

            if detected {
                let detection_time = self.register_click(current_time);
                record.clicked = true;
                record.detection_time = Some(detection_time);
                trace!(detection_time, n_photons, "photon click");
                return record;
            }
        }

        let window = window
            .or_else(|| pulse.map(|p| p.duration))
            .unwrap_or(DEFAULT_WINDOW);
        let p_dark = self.dark_count_rate * window;
        if self.rng.random::<f64>() < p_dark {
            let detection_time = self.register_click(current_time);
            record.clicked = true;
            record.dark_count = true;
            record.detection_time = Some(detection_time);
            trace!(detection_time, "dark count");
        }

        record
    }
}
