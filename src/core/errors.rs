use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GateError {
    #[error("Matrix is not Unitary (U†U != I)")]
    NonUnitary,

    #[error("Matrix must be square")]
    NotSquareMatrix,

    #[error("Invalid Dimensions")]
    InvalidDimensions,

    #[error("Qubit {0} cannot be both control and target")]
    ControlTargetOverlap(usize),

    #[error("Duplicate qubit index found: {0}")]
    DuplicateQubit(usize),
}

#[derive(Error, Debug, Clone)]
pub enum MeasurementError {
    #[error("Number of operators ({ops}) does not match number of values ({vals})")]
    CountMismatch { ops: usize, vals: usize },

    #[error("Projectors do not sum to Identity (Completeness relation failed)")]
    NotComplete,

    #[error("Invalid operator dimensions")]
    InvalidDimensions,

    #[error("Operator expansion failed: {0}")]
    ExpansionError(#[from] GateError),

    #[error("Duplicate qubit index found: {0}")]
    DuplicateQubit(usize),

    #[error("Number of shots must be at least 1")]
    NoShots,

    #[error("Outcome probabilities vanish (sum = {0})")]
    Degenerate(f64),
}

#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("Trace is not unity: {0}")]
    InvalidTrace(Complex64),

    #[error("Vector is not normalized. Norm squared: {0}")]
    NotNormalized(f64),

    #[error("Invalid dimensions")]
    InvalidDimensions,

    #[error("Dimension mismatch")]
    DimensionMismatch {
        expected: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("Density matrix is not Hermitian")]
    NotHermitian,

    #[error("Density matrix has a negative eigenvalue: {0}")]
    NotPositive(f64),

    #[error("Qubit index out of bounds")]
    IndexOutOfBounds { index: usize, num_qubits: usize },

    #[error("Invalid mixing probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),

    #[error("Measurement error: {0}")]
    MeasurementError(#[from] MeasurementError),

    #[error("Gate error: {0}")]
    GateError(#[from] GateError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Wiring and setup mistakes. Fatal, never retried.
#[derive(Error, Debug, Clone)]
pub enum ConfigurationError {
    #[error("Port {port} on node {node} is not connected")]
    PortNotConnected { node: String, port: String },

    #[error("Unknown node id {0}")]
    UnknownNode(usize),

    #[error("Quantum state requires a state vector or a density matrix")]
    EmptyState,

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// A component was handed a pulse lacking a physical attribute it needs.
#[derive(Error, Debug, Clone)]
pub enum PreconditionError {
    #[error("{component} requires a pulse with a polarization")]
    MissingPolarization { component: &'static str },
}

#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("Invalid probability: {0}. Must be between 0.0 and 1.0")]
    InvalidProbability(f64),

    #[error("Channel length must be finite and non-negative, got {0}")]
    InvalidLength(f64),

    #[error("Attenuation must be finite and non-negative, got {0}")]
    InvalidAttenuation(f64),

    #[error("Propagation speed must be finite and positive, got {0}")]
    InvalidSpeed(f64),
}

#[derive(Error, Debug, Clone)]
pub enum SchedulerError {
    #[error("Delay must be finite and non-negative, got {0}")]
    InvalidDelay(f64),

    #[error("Cannot schedule at {at}, clock is already at {now}")]
    InThePast { at: f64, now: f64 },
}

/// Errors surfaced by the run loop and by node callbacks.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    State(#[from] StateError),
}
