use crate::core::errors::GateError;
use crate::core::utils;
use ndarray::{Array2, arr2};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Represents a quantum gate.
///
/// A gate is defined by its unitary matrix and the number of qubits it acts on.
#[derive(Clone, Debug)]
pub struct Gate {
    /// The unitary matrix of the gate.
    pub matrix: Array2<Complex64>,
    /// The number of qubits the gate acts on.
    pub num_qubits: usize,
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

impl Gate {
    /// Creates a new `Gate` from a unitary matrix.
    ///
    /// # Errors
    ///
    /// Returns a `GateError` if:
    /// - The matrix is not square.
    /// - The matrix dimensions are not a power of 2.
    /// - The matrix is not unitary.
    pub fn new(matrix: Array2<Complex64>) -> Result<Self, GateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }

        if !rows.is_power_of_two() {
            return Err(GateError::InvalidDimensions);
        }

        if !Self::check_unitary(&matrix) {
            return Err(GateError::NonUnitary);
        }

        let num_qubits = rows.trailing_zeros() as usize;

        Ok(Self { matrix, num_qubits })
    }

    /// Builds a gate from a matrix known to be unitary.
    fn known(matrix: Array2<Complex64>) -> Self {
        let num_qubits = matrix.nrows().trailing_zeros() as usize;
        Self { matrix, num_qubits }
    }

    /// Checks if a given matrix is unitary
    fn check_unitary(matrix: &Array2<Complex64>) -> bool {
        let (rows, _) = matrix.dim();
        let eye = Array2::<Complex64>::eye(rows);
        let product = matrix.dot(&utils::dagger(matrix));

        product
            .iter()
            .zip(eye.iter())
            .all(|(a, b)| (*a - *b).norm() < 1e-6)
    }

    /// Dimension of the Hilbert space the gate acts on.
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    /// Expands a gate to act on a larger system of qubits.
    ///
    /// The base `gate` is applied to `targets`, optionally conditioned on
    /// `controls`, and Identity acts on every other qubit.
    ///
    /// # Errors
    ///
    /// Returns `GateError` if:
    /// - Duplicate indices are found in `targets` or `controls`.
    /// - A qubit is used as both control and target.
    pub fn expand_gate(
        num_total_qubits: usize,
        gate: &Gate,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<Gate, GateError> {
        if let Some(dup) = utils::find_duplicate(targets) {
            return Err(GateError::DuplicateQubit(dup));
        }

        if let Some(dup) = utils::find_duplicate(controls) {
            return Err(GateError::DuplicateQubit(dup));
        }

        if let Some(&c) = controls.iter().find(|c| targets.contains(c)) {
            return Err(GateError::ControlTargetOverlap(c));
        }

        Ok(Gate {
            matrix: utils::expand_operator(num_total_qubits, &gate.matrix, targets, controls),
            num_qubits: num_total_qubits,
        })
    }

    // --- Standard Gates ---

    /// Creates an Identity gate.
    pub fn i() -> Gate {
        Gate::known(arr2(&[[ONE, ZERO], [ZERO, ONE]]))
    }

    /// Creates a Pauli-X gate (NOT gate).
    pub fn x() -> Gate {
        Gate::known(arr2(&[[ZERO, ONE], [ONE, ZERO]]))
    }

    /// Creates a Pauli-Y gate.
    pub fn y() -> Gate {
        Gate::known(arr2(&[
            [ZERO, Complex64::new(0.0, -1.0)],
            [Complex64::new(0.0, 1.0), ZERO],
        ]))
    }

    /// Creates a Pauli-Z gate.
    pub fn z() -> Gate {
        Gate::known(arr2(&[[ONE, ZERO], [ZERO, -ONE]]))
    }

    /// Creates a Hadamard gate.
    pub fn h() -> Gate {
        let f = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Gate::known(arr2(&[[f, f], [f, -f]]))
    }

    /// Creates an S gate (Phase gate, Z^1/2).
    pub fn s() -> Gate {
        Gate::known(arr2(&[[ONE, ZERO], [ZERO, Complex64::new(0.0, 1.0)]]))
    }

    /// Creates a T gate (Z^1/4).
    pub fn t_gate() -> Gate {
        Gate::known(arr2(&[
            [ONE, ZERO],
            [ZERO, Complex64::from_polar(1.0, PI / 4.0)],
        ]))
    }

    /// Real rotation of the polarization qubit by `angle_rad`.
    ///
    /// Maps |H> to cos|H> + sin|V>, so an angle of π/2 turns H into V.
    pub fn polarization_rotation(angle_rad: f64) -> Gate {
        let (s, c) = angle_rad.sin_cos();
        Gate::known(arr2(&[
            [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
            [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
        ]))
    }

    /// Controlled-NOT with the control on the most significant qubit of the
    /// basis index (|c t>), the textbook matrix.
    pub fn cx() -> Gate {
        Gate::known(arr2(&[
            [ONE, ZERO, ZERO, ZERO],
            [ZERO, ONE, ZERO, ZERO],
            [ZERO, ZERO, ZERO, ONE],
            [ZERO, ZERO, ONE, ZERO],
        ]))
    }

    /// Creates a SWAP gate.
    pub fn swap() -> Gate {
        Gate::known(arr2(&[
            [ONE, ZERO, ZERO, ZERO],
            [ZERO, ZERO, ONE, ZERO],
            [ZERO, ONE, ZERO, ZERO],
            [ZERO, ZERO, ZERO, ONE],
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_gates_are_unitary() {
        for gate in [
            Gate::i(),
            Gate::x(),
            Gate::y(),
            Gate::z(),
            Gate::h(),
            Gate::s(),
            Gate::t_gate(),
            Gate::polarization_rotation(0.3),
            Gate::cx(),
            Gate::swap(),
        ] {
            assert!(Gate::new(gate.matrix.clone()).is_ok());
        }
    }

    #[test]
    fn rejects_non_unitary_and_non_square() {
        let m = arr2(&[[ONE, ONE], [ZERO, ONE]]);
        assert!(matches!(Gate::new(m), Err(GateError::NonUnitary)));

        let rect = Array2::<Complex64>::zeros((2, 4));
        assert!(matches!(Gate::new(rect), Err(GateError::NotSquareMatrix)));
    }

    #[test]
    fn expand_rejects_overlapping_control() {
        let err = Gate::expand_gate(2, &Gate::x(), &[0], &[0]).unwrap_err();
        assert!(matches!(err, GateError::ControlTargetOverlap(0)));
    }

    #[test]
    fn controlled_expansion_matches_cx_after_reordering() {
        // Control on qubit 1 (high bit), target on qubit 0 is the textbook CX
        let expanded = Gate::expand_gate(2, &Gate::x(), &[0], &[1]).unwrap();
        let cx = Gate::cx();
        for (a, b) in expanded.matrix.iter().zip(cx.matrix.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }
}
