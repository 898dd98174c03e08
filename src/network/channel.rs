use crate::QuantumState;
use crate::config::{ChannelConfig, ChannelKind};
use crate::errors::ChannelError;
use crate::optics::Pulse;
use crate::rng::{self, SimRng};

/// What travels over a channel: light, or a classical message.
#[derive(Clone, Debug)]
pub enum Payload {
    Pulse(Pulse),
    Classical(String),
}

impl Payload {
    pub fn as_pulse(&self) -> Option<&Pulse> {
        match self {
            Payload::Pulse(pulse) => Some(pulse),
            Payload::Classical(_) => None,
        }
    }

    pub fn as_classical(&self) -> Option<&str> {
        match self {
            Payload::Classical(message) => Some(message),
            Payload::Pulse(_) => None,
        }
    }

    pub fn into_pulse(self) -> Option<Pulse> {
        match self {
            Payload::Pulse(pulse) => Some(pulse),
            Payload::Classical(_) => None,
        }
    }

    pub fn quantum_state_mut(&mut self) -> Option<&mut QuantumState> {
        match self {
            Payload::Pulse(pulse) => pulse.quantum_state.as_mut(),
            Payload::Classical(_) => None,
        }
    }
}

impl From<Pulse> for Payload {
    fn from(pulse: Pulse) -> Self {
        Payload::Pulse(pulse)
    }
}

impl From<String> for Payload {
    fn from(message: String) -> Self {
        Payload::Classical(message)
    }
}

impl From<&str> for Payload {
    fn from(message: &str) -> Self {
        Payload::Classical(message.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LossModel {
    /// Attenuation applies
    Lossy,
    Lossless,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoiseModel {
    /// Carried quantum states may be depolarized
    Depolarizing,
    Clean,
}

/// How a channel treats what it carries, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransmissionPolicy {
    pub loss: LossModel,
    pub noise: NoiseModel,
}

impl TransmissionPolicy {
    pub const QUANTUM: Self = Self {
        loss: LossModel::Lossy,
        noise: NoiseModel::Depolarizing,
    };
    pub const OPTICAL: Self = Self {
        loss: LossModel::Lossy,
        noise: NoiseModel::Clean,
    };
    pub const CLASSICAL: Self = Self {
        loss: LossModel::Lossless,
        noise: NoiseModel::Clean,
    };
}

impl From<ChannelKind> for TransmissionPolicy {
    fn from(kind: ChannelKind) -> Self {
        match kind {
            ChannelKind::Quantum => Self::QUANTUM,
            ChannelKind::Optical => Self::OPTICAL,
            ChannelKind::Classical => Self::CLASSICAL,
        }
    }
}

/// Outcome of pushing a payload through a channel.
#[derive(Clone, Debug)]
pub enum Transmission {
    Delivered { payload: Payload, delay: f64 },
    /// Absorbed by the fibre. Not an error.
    Lost,
}

impl Transmission {
    pub fn is_lost(&self) -> bool {
        matches!(self, Transmission::Lost)
    }
}

/// Fibre or link between two ports.
#[derive(Clone, Debug)]
pub struct Channel {
    pub name: String,
    /// Metres
    pub length: f64,
    /// dB per metre
    pub attenuation: f64,
    /// Metres per second
    pub light_speed: f64,
    pub depol_prob: f64,
    pub policy: TransmissionPolicy,
    rng: SimRng,
}

impl Channel {
    pub const DEFAULT_LIGHT_SPEED: f64 = 2e8;

    pub fn new(
        name: impl Into<String>,
        length: f64,
        attenuation: f64,
        depol_prob: f64,
        policy: TransmissionPolicy,
        rng: SimRng,
    ) -> Result<Self, ChannelError> {
        if !length.is_finite() || length < 0.0 {
            return Err(ChannelError::InvalidLength(length));
        }
        if !attenuation.is_finite() || attenuation < 0.0 {
            return Err(ChannelError::InvalidAttenuation(attenuation));
        }
        if !(0.0..=1.0).contains(&depol_prob) {
            return Err(ChannelError::InvalidProbability(depol_prob));
        }
        Ok(Self {
            name: name.into(),
            length,
            attenuation,
            light_speed: Self::DEFAULT_LIGHT_SPEED,
            depol_prob,
            policy,
            rng,
        })
    }

    /// Lossy channel that may depolarize carried quantum states.
    pub fn quantum(
        name: impl Into<String>,
        length: f64,
        attenuation: f64,
        depol_prob: f64,
        rng: SimRng,
    ) -> Result<Self, ChannelError> {
        Self::new(
            name,
            length,
            attenuation,
            depol_prob,
            TransmissionPolicy::QUANTUM,
            rng,
        )
    }

    /// Lossy channel that leaves quantum states untouched.
    pub fn optical(
        name: impl Into<String>,
        length: f64,
        attenuation: f64,
        rng: SimRng,
    ) -> Result<Self, ChannelError> {
        Self::new(name, length, attenuation, 0.0, TransmissionPolicy::OPTICAL, rng)
    }

    /// Delay-only channel.
    pub fn classical(
        name: impl Into<String>,
        length: f64,
        rng: SimRng,
    ) -> Result<Self, ChannelError> {
        Self::new(name, length, 0.0, 0.0, TransmissionPolicy::CLASSICAL, rng)
    }

    pub fn from_config(config: &ChannelConfig, rng: SimRng) -> Result<Self, ChannelError> {
        Self::new(
            config.name.clone(),
            config.length,
            config.attenuation,
            config.depol_prob,
            config.kind.into(),
            rng,
        )?
        .with_light_speed(config.light_speed)
    }

    pub fn with_light_speed(mut self, light_speed: f64) -> Result<Self, ChannelError> {
        if !light_speed.is_finite() || light_speed <= 0.0 {
            return Err(ChannelError::InvalidSpeed(light_speed));
        }
        self.light_speed = light_speed;
        Ok(self)
    }

    /// 1 − 10^(−αL/10); always 0 for lossless channels.
    pub fn loss_probability(&self) -> f64 {
        match self.policy.loss {
            LossModel::Lossy => 1.0 - 10f64.powf(-self.attenuation * self.length / 10.0),
            LossModel::Lossless => 0.0,
        }
    }

    /// Propagation delay, seconds.
    pub fn delay(&self) -> f64 {
        self.length / self.light_speed
    }

    /// Sends `payload` through the channel.
    ///
    /// Lossy channels draw once for loss; depolarizing channels then draw
    /// once more if the payload carries a quantum state.
    pub fn transmit(&mut self, mut payload: Payload) -> Transmission {
        if self.policy.loss == LossModel::Lossy {
            let loss = self.loss_probability();
            if rng::bernoulli(&mut self.rng, loss) {
                return Transmission::Lost;
            }
        }

        if self.policy.noise == NoiseModel::Depolarizing && self.depol_prob > 0.0 {
            if let Some(state) = payload.quantum_state_mut() {
                if rng::bernoulli(&mut self.rng, self.depol_prob) {
                    state.depolarize();
                }
            }
        }

        Transmission::Delivered {
            payload,
            delay: self.delay(),
        }
    }
}
