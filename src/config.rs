//! Serializable configuration for hardware components and whole runs.
//!
//! Every struct falls back to the hardware defaults for fields missing from
//! the TOML source, so a file only needs to name what it changes.

use crate::errors::ConfigurationError;
use crate::optics::{DeadTimeReference, EfficiencySpectrum};
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};

/// Fails unless `value` lies in [0, 1].
pub(crate) fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigurationError::InvalidParameter { name, value });
    }
    Ok(())
}

/// Fails unless `value` is finite and non-negative.
pub(crate) fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigurationError::InvalidParameter { name, value });
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub efficiency: f64,
    /// Dark counts per second
    pub dark_count_rate: f64,
    /// Seconds
    pub dead_time: f64,
    /// Standard deviation of the click time, seconds
    pub timing_jitter: f64,
    pub dead_time_reference: DeadTimeReference,
    pub efficiency_spectrum: Option<EfficiencySpectrum>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            efficiency: 0.93,
            dark_count_rate: 0.1,
            dead_time: 20e-9,
            timing_jitter: 20e-12,
            dead_time_reference: DeadTimeReference::default(),
            efficiency_spectrum: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Lossy and depolarizing
    #[default]
    Quantum,
    /// Lossy, leaves quantum states alone
    Optical,
    /// Delay only
    Classical,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub name: String,
    pub kind: ChannelKind,
    /// Metres
    pub length: f64,
    /// dB per metre
    pub attenuation: f64,
    /// Metres per second
    pub light_speed: f64,
    pub depol_prob: f64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: "channel".to_string(),
            kind: ChannelKind::default(),
            length: 0.0,
            attenuation: 0.0,
            light_speed: 2e8,
            depol_prob: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WavePlateConfig {
    pub theta_deg: f64,
    pub angle_error_std: f64,
    pub depol_prob: f64,
}

impl Default for WavePlateConfig {
    fn default() -> Self {
        Self {
            theta_deg: 0.0,
            angle_error_std: 0.5,
            depol_prob: 0.01,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    pub extinction_ratio_db: f64,
    pub angle_jitter_std: f64,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            extinction_ratio_db: 30.0,
            angle_jitter_std: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferometerConfig {
    pub visibility: f64,
    /// Radians
    pub phase_noise_std: f64,
    pub detector0: DetectorConfig,
    pub detector1: DetectorConfig,
}

impl Default for InterferometerConfig {
    fn default() -> Self {
        Self {
            visibility: 0.98,
            phase_noise_std: 0.01,
            detector0: DetectorConfig::default(),
            detector1: DetectorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaserConfig {
    pub wavelength: f64,
    pub amplitude: f64,
}

impl Default for LaserConfig {
    fn default() -> Self {
        Self {
            wavelength: 1550e-9,
            amplitude: 1.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub wavelength: f64,
    pub duration: f64,
    pub phase: f64,
    /// Probability that a trigger yields a photon
    pub eta_src: f64,
    /// Two-photon probability; derived from `g2_target` when that is set
    pub p_multi: f64,
    pub g2_target: Option<f64>,
    /// Emission-time jitter, seconds
    pub sigma_t: f64,
    /// Wavelength jitter, metres
    pub sigma_lambda: f64,
    /// Background photon probability per trigger
    pub p_bg: f64,
    pub p_polarization_error: f64,
    pub p_depolarize: f64,
    pub track_statistics: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            wavelength: 1550e-9,
            duration: 1e-9,
            phase: 0.0,
            eta_src: 0.8,
            p_multi: 1e-4,
            g2_target: None,
            sigma_t: 50e-12,
            sigma_lambda: 0.2e-9,
            p_bg: 1e-6,
            p_polarization_error: 0.0,
            p_depolarize: 0.0,
            track_statistics: false,
        }
    }
}

impl SourceConfig {
    /// Multiphoton probability actually used by the source.
    pub fn effective_p_multi(&self) -> f64 {
        match self.g2_target {
            Some(g2) => g2 * self.eta_src * self.eta_src / 2.0,
            None => self.p_multi,
        }
    }
}

/// Everything needed to set up one reproducible run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    /// Simulated seconds after which the run stops
    pub horizon: f64,
    pub laser: LaserConfig,
    pub source: SourceConfig,
    pub detector: DetectorConfig,
    pub wave_plate: WavePlateConfig,
    pub splitter: SplitterConfig,
    pub interferometer: InterferometerConfig,
    pub channels: Vec<ChannelConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            horizon: 1e-6,
            laser: LaserConfig::default(),
            source: SourceConfig::default(),
            detector: DetectorConfig::default(),
            wave_plate: WavePlateConfig::default(),
            splitter: SplitterConfig::default(),
            interferometer: InterferometerConfig::default(),
            channels: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            toml::from_str(source).map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigurationError> {
        toml::to_string(self).map_err(|e| ConfigurationError::Parse(e.to_string()))
    }

    /// Checks run-level fields; component fields are checked when the
    /// components are built.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        check_non_negative("horizon", self.horizon)
    }

    /// The run's random stream. Seeded here and nowhere else.
    pub fn rng(&self) -> SimRng {
        SimRng::seed_from_u64(self.seed)
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, SimulationConfig::default());
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg = SimulationConfig::from_toml_str(
            r#"
            seed = 7
            [detector]
            efficiency = 0.5
            dead_time_reference = "call_time"

            [[channels]]
            name = "alice-bob"
            kind = "classical"
            length = 1000.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.detector.efficiency, 0.5);
        assert_eq!(cfg.detector.dark_count_rate, 0.1);
        assert_eq!(cfg.detector.dead_time_reference, DeadTimeReference::CallTime);
        let ch = cfg.channel("alice-bob").unwrap();
        assert_eq!(ch.kind, ChannelKind::Classical);
        assert_eq!(ch.light_speed, 2e8);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SimulationConfig::from_toml_str("seed = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn spectrum_table_is_sorted_on_load() {
        let cfg = SimulationConfig::from_toml_str(
            r#"
            [detector]
            efficiency_spectrum = [[1.6e-6, 0.9], [1.5e-6, 0.5]]
            "#,
        )
        .unwrap();
        let spectrum = cfg.detector.efficiency_spectrum.unwrap();
        let eff = spectrum.efficiency_at(1.55e-6).unwrap();
        assert!((eff - 0.7).abs() < 1e-9);
        assert_eq!(spectrum.efficiency_at(1.0e-6), Some(0.5));
    }

    #[test]
    fn spectrum_table_rejects_bad_efficiency() {
        let err = SimulationConfig::from_toml_str(
            r#"
            [detector]
            efficiency_spectrum = [[1.5e-6, 1.7]]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn g2_target_overrides_p_multi() {
        let cfg = SourceConfig {
            g2_target: Some(0.02),
            eta_src: 0.5,
            ..SourceConfig::default()
        };
        assert!((cfg.effective_p_multi() - 0.0025).abs() < 1e-15);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = SimulationConfig {
            seed: 99,
            channels: vec![ChannelConfig::default()],
            ..SimulationConfig::default()
        };
        let text = cfg.to_toml_string().unwrap();
        assert_eq!(SimulationConfig::from_toml_str(&text).unwrap(), cfg);
    }
}
