pub mod config;
mod core;
pub mod network;
pub mod optics;
pub mod rng;
mod sampler;

pub use crate::core::{
    BellState, Gate, Measurement, MeasurementOutcome, MeasurementResult, QuantumState, errors,
    utils,
};
pub use crate::sampler::{Counts, Sampler};
