use crate::core::Gate;
use crate::core::errors::{ConfigurationError, MeasurementError, StateError};
use crate::core::measurements::{Measurement, MeasurementResult};
use crate::core::utils::{self, dagger, find_duplicate, trace};
use crate::sampler::{Counts, Sampler};
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rand::Rng;

const TRACE_TOL: f64 = 1e-9;

/// The four maximally entangled two-qubit states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BellState {
    /// (|00> + |11>)/√2
    PhiPlus,
    /// (|00> - |11>)/√2
    PhiMinus,
    /// (|01> + |10>)/√2
    PsiPlus,
    /// (|01> - |10>)/√2
    PsiMinus,
}

/// What [`QuantumState::measure`] produced.
#[derive(Clone, Debug, PartialEq)]
pub enum MeasurementOutcome {
    /// Single shot; the state collapsed onto this outcome.
    Collapsed(MeasurementResult),
    /// Several shots on independent copies; the state is unchanged.
    Counts(Counts),
}

/// Density-matrix state of one or two qubits (larger registers work but are not needed).
///
/// `density_matrix` is always a valid state: square, trace one, Hermitian and
/// positive semidefinite. The pure-state vector is a derived cache that only
/// survives unitary evolution.
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub density_matrix: Array2<Complex64>,
    pub num_qubits: usize,
    state_vector: Option<Array1<Complex64>>,
}

impl QuantumState {
    /// Creates a new quantum state initialized to |0...0>.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut density_matrix = Array2::<Complex64>::zeros((dim, dim));
        density_matrix[[0, 0]] = Complex64::new(1.0, 0.0);
        let mut ket = Array1::<Complex64>::zeros(dim);
        ket[0] = Complex64::new(1.0, 0.0);

        Self {
            density_matrix,
            num_qubits,
            state_vector: Some(ket),
        }
    }

    /// Computational basis state |index>. `index` is reduced modulo 2^n.
    pub fn basis(num_qubits: usize, index: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut ket = Array1::<Complex64>::zeros(dim);
        ket[index % dim] = Complex64::new(1.0, 0.0);

        Self {
            density_matrix: utils::outer_product(&ket, &ket),
            num_qubits,
            state_vector: Some(ket),
        }
    }

    /// Validates that the input vector is a valid quantum state.
    fn check_vector_state(vector: &Array1<Complex64>) -> Result<(), StateError> {
        if !vector.len().is_power_of_two() {
            return Err(StateError::InvalidDimensions);
        }

        let norm_sqr: f64 = vector.iter().map(|c| c.norm_sqr()).sum();
        if (norm_sqr - 1.0).abs() > 1e-12 {
            return Err(StateError::NotNormalized(norm_sqr));
        }

        Ok(())
    }

    /// Checks the validity of a density matrix
    fn check_density_matrix(matrix: &Array2<Complex64>) -> Result<(), StateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(StateError::DimensionMismatch {
                expected: rows,
                got_rows: rows,
                got_cols: cols,
            });
        }
        if !rows.is_power_of_two() {
            return Err(StateError::InvalidDimensions);
        }

        let tr = trace(matrix);
        if (tr - Complex64::new(1.0, 0.0)).norm() > TRACE_TOL {
            return Err(StateError::InvalidTrace(tr));
        }

        if !utils::is_hermitian(matrix, TRACE_TOL) {
            return Err(StateError::NotHermitian);
        }

        let min_eig = utils::min_eigenvalue(matrix);
        if min_eig < -TRACE_TOL {
            return Err(StateError::NotPositive(min_eig));
        }

        Ok(())
    }

    /// Apply already extended operator to whole system
    fn apply_operator(&mut self, u: &Array2<Complex64>) -> Result<(), StateError> {
        let (rows, cols) = u.dim();
        let dim = self.dim();

        if rows != dim || cols != dim {
            return Err(StateError::DimensionMismatch {
                expected: dim,
                got_rows: rows,
                got_cols: cols,
            });
        }

        self.density_matrix = u.dot(&self.density_matrix).dot(&dagger(u));
        self.state_vector = self.state_vector.take().map(|ket| u.dot(&ket));

        Ok(())
    }

    /// Checks if a given index is within the system QuantumState's range
    fn validate_qubit_index(&self, index: usize) -> Result<(), StateError> {
        if index >= self.num_qubits {
            return Err(StateError::IndexOutOfBounds {
                index,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Creates a QuantumState from a generic vector state.
    pub fn from_state_vector(vector: Array1<Complex64>) -> Result<Self, StateError> {
        Self::check_vector_state(&vector)?;

        let num_qubits = vector.len().trailing_zeros() as usize;
        // rho = |psi><psi|
        let density_matrix = utils::outer_product(&vector, &vector);

        Ok(Self {
            density_matrix,
            num_qubits,
            state_vector: Some(vector),
        })
    }

    /// Creates a QuantumState from a generic density matrix.
    pub fn from_density_matrix(matrix: Array2<Complex64>) -> Result<Self, StateError> {
        Self::check_density_matrix(&matrix)?;
        // log_2 as rows is power of two
        let num_qubits = matrix.nrows().trailing_zeros() as usize;

        Ok(Self {
            density_matrix: matrix,
            num_qubits,
            state_vector: None,
        })
    }

    /// Builds a state from whichever representation is available.
    ///
    /// The vector takes precedence when both are supplied; supplying neither
    /// is a configuration error.
    pub fn try_from_parts(
        vector: Option<Array1<Complex64>>,
        matrix: Option<Array2<Complex64>>,
    ) -> Result<Self, StateError> {
        match (vector, matrix) {
            (Some(v), _) => Self::from_state_vector(v),
            (None, Some(m)) => Self::from_density_matrix(m),
            (None, None) => Err(ConfigurationError::EmptyState.into()),
        }
    }

    /// One of the four Bell states as a pure two-qubit state.
    pub fn bell_pair(kind: BellState) -> Self {
        let a = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let ket = match kind {
            BellState::PhiPlus => Array1::from(vec![a, zero, zero, a]),
            BellState::PhiMinus => Array1::from(vec![a, zero, zero, -a]),
            BellState::PsiPlus => Array1::from(vec![zero, a, a, zero]),
            BellState::PsiMinus => Array1::from(vec![zero, a, -a, zero]),
        };
        Self {
            density_matrix: utils::outer_product(&ket, &ket),
            num_qubits: 2,
            state_vector: Some(ket),
        }
    }

    /// Hilbert-space dimension.
    pub fn dim(&self) -> usize {
        self.density_matrix.nrows()
    }

    /// Pure-state vector, if it is still known.
    pub fn state_vector(&self) -> Option<&Array1<Complex64>> {
        self.state_vector.as_ref()
    }

    /// Checks if a QuantumState is valid.
    pub fn is_valid(&self) -> Result<(), StateError> {
        Self::check_density_matrix(&self.density_matrix)
    }

    /// Tr(ρ²): 1 for pure states, 1/d for the maximally mixed state.
    pub fn purity(&self) -> f64 {
        trace(&self.density_matrix.dot(&self.density_matrix)).re
    }

    /// Applies a gate spanning the whole register: ρ ← UρU†.
    ///
    /// Unitarity was established when the [`Gate`] was built; only the
    /// dimension is checked here.
    pub fn apply_gate(&mut self, gate: &Gate) -> Result<(), StateError> {
        self.apply_operator(&gate.matrix)
    }

    /// Applies non controlled quantum gate
    pub fn apply(&mut self, gate: &Gate, target_qubits: &[usize]) -> Result<(), StateError> {
        self.apply_controlled(gate, target_qubits, None)
    }

    /// Applies a gate to a subset of qubits, optionally controlled by others.
    pub fn apply_controlled(
        &mut self,
        gate: &Gate,
        target_qubits: &[usize],
        control_qubits: Option<&[usize]>,
    ) -> Result<(), StateError> {
        if gate.num_qubits != target_qubits.len() {
            return Err(StateError::DimensionMismatch {
                expected: gate.num_qubits,
                got_rows: target_qubits.len(),
                got_cols: 0,
            });
        }

        let controls = control_qubits.unwrap_or(&[]);
        for &q in target_qubits.iter().chain(controls) {
            self.validate_qubit_index(q)?;
        }

        let full_gate_operator = Gate::expand_gate(self.num_qubits, gate, target_qubits, controls)?;

        self.apply_operator(&full_gate_operator.matrix)
    }

    /// Complete depolarization: ρ ← I/d.
    pub fn depolarize(&mut self) {
        let dim = self.dim();
        self.density_matrix = Array2::<Complex64>::eye(dim) / Complex64::new(dim as f64, 0.0);
        self.state_vector = None;
    }

    /// Mixes in white noise: ρ ← (1 − p)ρ + p·I/d.
    pub fn mix_with_identity(&mut self, p: f64) -> Result<(), StateError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(StateError::InvalidProbability(p));
        }
        if p == 0.0 {
            return Ok(());
        }
        let dim = self.dim();
        let noise = Array2::<Complex64>::eye(dim) * Complex64::new(p / dim as f64, 0.0);
        self.density_matrix = &self.density_matrix * Complex64::new(1.0 - p, 0.0) + noise;
        self.state_vector = None;
        Ok(())
    }

    /// Born probabilities p_i = Re Tr(P_i ρ) for a measurement over the whole register.
    ///
    /// Probabilities are clamped at zero and renormalized to sum to one.
    pub fn probabilities(&self, measurement: &Measurement) -> Result<Vec<f64>, StateError> {
        if measurement.dim() != self.dim() {
            return Err(MeasurementError::InvalidDimensions.into());
        }
        let raw: Vec<f64> = measurement
            .operators
            .iter()
            .map(|p| trace(&p.dot(&self.density_matrix)).re.max(0.0))
            .collect();
        normalize(raw)
    }

    /// Measures the whole register with a complete projector set.
    ///
    /// With `shots == 1` this is a physical measurement: one outcome is drawn
    /// and the state collapses to PρP/p. With `shots > 1` the outcomes are
    /// drawn from independent copies and the state is left as it was.
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        measurement: &Measurement,
        shots: usize,
        rng: &mut R,
    ) -> Result<MeasurementOutcome, StateError> {
        match shots {
            0 => Err(MeasurementError::NoShots.into()),
            1 => self
                .measure_once(measurement, rng)
                .map(MeasurementOutcome::Collapsed),
            n => Sampler::new()
                .run(self, measurement, n, rng)
                .map(MeasurementOutcome::Counts),
        }
    }

    /// Single projective measurement of the whole register with collapse.
    pub fn measure_once<R: Rng + ?Sized>(
        &mut self,
        measurement: &Measurement,
        rng: &mut R,
    ) -> Result<MeasurementResult, StateError> {
        let probs = self.probabilities(measurement)?;
        let outcome_idx = Sampler::sample_index(&probs, rng);
        self.collapse(&measurement.operators[outcome_idx], probs[outcome_idx])?;

        Ok(MeasurementResult {
            index: outcome_idx,
            value: measurement.values[outcome_idx],
        })
    }

    /// Returns the probability of each projector expanded to the whole system
    pub fn set_measurement(
        &self,
        measurement: &Measurement,
        target_qubits: &[usize],
    ) -> Result<(Vec<f64>, Vec<Array2<Complex64>>), StateError> {
        for &q in target_qubits {
            self.validate_qubit_index(q)?;
        }

        if let Some(dup) = find_duplicate(target_qubits) {
            return Err(MeasurementError::DuplicateQubit(dup).into());
        }

        let expanded_ops = measurement.get_expanded_operators(self.num_qubits, target_qubits)?;

        let raw = expanded_ops
            .iter()
            .map(|op| trace(&op.dot(&self.density_matrix)).re.max(0.0))
            .collect();

        Ok((normalize(raw)?, expanded_ops))
    }

    /// Single-shot measurement of some qubits; the whole state collapses.
    pub fn measure_qubits<R: Rng + ?Sized>(
        &mut self,
        measurement: &Measurement,
        target_qubits: &[usize],
        rng: &mut R,
    ) -> Result<MeasurementResult, StateError> {
        let (probs, ops) = self.set_measurement(measurement, target_qubits)?;

        let outcome_idx = Sampler::sample_index(&probs, rng);
        self.collapse(&ops[outcome_idx], probs[outcome_idx])?;

        Ok(MeasurementResult {
            index: outcome_idx,
            value: measurement.values[outcome_idx],
        })
    }

    /// ρ' = PρP† / p
    fn collapse(&mut self, projector: &Array2<Complex64>, p: f64) -> Result<(), StateError> {
        if p <= 1e-12 {
            return Err(StateError::InvalidTrace(Complex64::new(p, 0.0)));
        }
        let numerator = projector.dot(&self.density_matrix).dot(&dagger(projector));
        self.density_matrix = numerator / Complex64::new(p, 0.0);
        self.state_vector = None;
        Ok(())
    }
}

/// Rescales clamped probabilities so they sum to one.
fn normalize(mut probs: Vec<f64>) -> Result<Vec<f64>, StateError> {
    let sum: f64 = probs.iter().sum();
    if sum <= 1e-15 {
        return Err(MeasurementError::Degenerate(sum).into());
    }
    for p in &mut probs {
        *p /= sum;
    }
    Ok(probs)
}
