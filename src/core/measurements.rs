use crate::core::errors::MeasurementError;
use crate::core::utils;
use ndarray::{Array1, Array2, array};
use num_complex::Complex64;

/// A projective measurement: an ordered list of projectors summing to the identity.
#[derive(Clone, Debug)]
pub struct Measurement {
    /// List of projectors, one per outcome
    pub operators: Vec<Array2<Complex64>>,
    /// Value reported for each outcome
    pub values: Vec<f64>,
    /// Number of qubits the measurement acts on
    pub num_qubits: usize,
}

impl Measurement {
    pub fn new(
        operators: Vec<Array2<Complex64>>,
        values: Vec<f64>,
    ) -> Result<Self, MeasurementError> {
        if operators.len() != values.len() {
            return Err(MeasurementError::CountMismatch {
                ops: operators.len(),
                vals: values.len(),
            });
        }

        let Some(first) = operators.first() else {
            return Err(MeasurementError::InvalidDimensions);
        };

        let (rows, cols) = first.dim();
        if rows != cols || !rows.is_power_of_two() {
            return Err(MeasurementError::InvalidDimensions);
        }
        // log_2 as rows is power of two
        let num_qubits = rows.trailing_zeros() as usize;

        if operators.iter().any(|op| op.dim() != (rows, cols)) {
            return Err(MeasurementError::InvalidDimensions);
        }

        if !utils::check_projector_completeness(&operators, rows) {
            return Err(MeasurementError::NotComplete);
        }

        Ok(Self {
            operators,
            values,
            num_qubits,
        })
    }

    /// Rank-one projectors onto an orthonormal qubit basis, outcome values 0 and 1.
    fn from_basis(v0: Array1<Complex64>, v1: Array1<Complex64>) -> Measurement {
        Measurement {
            operators: vec![
                utils::outer_product(&v0, &v0),
                utils::outer_product(&v1, &v1),
            ],
            values: vec![0.0, 1.0],
            num_qubits: 1,
        }
    }

    /// Dimension of the space the projectors act on.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Number of possible outcomes.
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Expands the projectors to a larger register
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, MeasurementError> {
        if targets.len() != self.num_qubits {
            return Err(MeasurementError::InvalidDimensions);
        }

        Ok(self
            .operators
            .iter()
            .map(|op| utils::expand_operator(num_total_qubits, op, targets, &[]))
            .collect())
    }

    /// Z basis (Computational) -> {|0>, |1>}.
    pub fn z_basis() -> Measurement {
        Self::from_basis(
            array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            array![Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
        )
    }

    /// X basis (Hadamard) -> {|+>, |->}.
    pub fn x_basis() -> Measurement {
        let inv_sqrt2 = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Self::from_basis(array![inv_sqrt2, inv_sqrt2], array![inv_sqrt2, -inv_sqrt2])
    }

    /// Y basis -> {|+i>, |-i>}
    pub fn y_basis() -> Measurement {
        let inv_sqrt2 = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        let i_inv_sqrt2 = Complex64::new(0.0, 1.0 / 2.0_f64.sqrt());
        Self::from_basis(
            array![inv_sqrt2, i_inv_sqrt2],
            array![inv_sqrt2, -i_inv_sqrt2],
        )
    }

    /// Linear polarization analyser at `angle_deg`: outcome 0 is the
    /// polarization along the axis, outcome 1 the orthogonal one.
    pub fn polarization(angle_deg: f64) -> Measurement {
        let (s, c) = angle_deg.to_radians().sin_cos();
        Self::from_basis(
            array![Complex64::new(c, 0.0), Complex64::new(s, 0.0)],
            array![Complex64::new(-s, 0.0), Complex64::new(c, 0.0)],
        )
    }

    /// Spin measurement along direction `phi` in the x–z plane of the Bloch sphere.
    ///
    /// Projectors are (I ± n·σ)/2 with n·σ = cos φ Z + sin φ X; outcomes are +1 and −1.
    pub fn xz_plane(phi: f64) -> Measurement {
        let (s, c) = phi.sin_cos();
        let half = |x: f64| Complex64::new(x / 2.0, 0.0);
        let plus = array![[half(1.0 + c), half(s)], [half(s), half(1.0 - c)]];
        let minus = array![[half(1.0 - c), half(-s)], [half(-s), half(1.0 + c)]];
        Measurement {
            operators: vec![plus, minus],
            values: vec![1.0, -1.0],
            num_qubits: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementResult {
    /// Index of the projector that fired
    pub index: usize,
    /// Measurement value
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_bases_are_complete() {
        for m in [
            Measurement::z_basis(),
            Measurement::x_basis(),
            Measurement::y_basis(),
            Measurement::polarization(22.5),
            Measurement::xz_plane(0.7),
        ] {
            assert!(utils::check_projector_completeness(&m.operators, 2));
            assert_eq!(m.len(), 2);
        }
    }

    #[test]
    fn new_rejects_incomplete_set() {
        let z = Measurement::z_basis();
        let err = Measurement::new(vec![z.operators[0].clone()], vec![0.0]).unwrap_err();
        assert!(matches!(err, MeasurementError::NotComplete));
    }

    #[test]
    fn new_rejects_count_mismatch() {
        let z = Measurement::z_basis();
        let err = Measurement::new(z.operators, vec![0.0]).unwrap_err();
        assert!(matches!(err, MeasurementError::CountMismatch { ops: 2, vals: 1 }));
    }

    #[test]
    fn polarization_at_zero_is_z_basis() {
        let p = Measurement::polarization(0.0);
        let z = Measurement::z_basis();
        for (a, b) in p.operators.iter().zip(z.operators.iter()) {
            assert!(a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < 1e-12));
        }
    }
}
