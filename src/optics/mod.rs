mod detector;
mod interferometer;
mod pulse;
mod source;
mod splitter;
mod waveplate;

pub use detector::{
    DEFAULT_WINDOW, DeadTimeReference, DetectionRecord, Detector, EfficiencySpectrum,
};
pub use interferometer::{InterferenceOutcome, MachZehnderInterferometer};
pub use pulse::{Laser, PLANCK, Pulse, PulseProperties, PulseShape, SPEED_OF_LIGHT};
pub use source::{EmissionInfo, SinglePhotonSource};
pub use splitter::{AXIS_BAND_DEG, PolarizingBeamSplitter, SplitterPort, angle_distance};
pub use waveplate::HalfWavePlate;

/// A hardware element installed on a node, looked up by name.
#[derive(Clone, Debug)]
pub enum Component {
    Laser(Laser),
    Source(SinglePhotonSource),
    Detector(Detector),
    WavePlate(HalfWavePlate),
    Splitter(PolarizingBeamSplitter),
    Interferometer(MachZehnderInterferometer),
}

macro_rules! component_variant {
    ($variant:ident, $ty:ty, $as_ref:ident, $as_mut:ident) => {
        impl From<$ty> for Component {
            fn from(value: $ty) -> Self {
                Component::$variant(value)
            }
        }

        impl Component {
            pub fn $as_ref(&self) -> Option<&$ty> {
                match self {
                    Component::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            pub fn $as_mut(&mut self) -> Option<&mut $ty> {
                match self {
                    Component::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

component_variant!(Laser, Laser, as_laser, as_laser_mut);
component_variant!(Source, SinglePhotonSource, as_source, as_source_mut);
component_variant!(Detector, Detector, as_detector, as_detector_mut);
component_variant!(WavePlate, HalfWavePlate, as_wave_plate, as_wave_plate_mut);
component_variant!(Splitter, PolarizingBeamSplitter, as_splitter, as_splitter_mut);
component_variant!(
    Interferometer,
    MachZehnderInterferometer,
    as_interferometer,
    as_interferometer_mut
);

impl Component {
    pub fn kind(&self) -> &'static str {
        match self {
            Component::Laser(_) => "laser",
            Component::Source(_) => "source",
            Component::Detector(_) => "detector",
            Component::WavePlate(_) => "wave_plate",
            Component::Splitter(_) => "splitter",
            Component::Interferometer(_) => "interferometer",
        }
    }
}
