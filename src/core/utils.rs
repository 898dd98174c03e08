//! Linear-algebra helpers for density-matrix work.
//!
//! This module contains helper functions for:
//! - Matrix operations (trace, adjoint, outer product).
//! - Operator expansion from a subsystem to the whole register.
//! - Completeness, hermiticity and positivity checks.

use nalgebra::DMatrix;
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// Computes the trace of a matrix (sum of diagonal elements).
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose $M^\dagger$.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|c| c.conj())
}

/// Generates the full operator matrix ($2^N \times 2^N$) for the whole system.
///
/// It expands a local operator acting on `targets` (and controlled by `controls`)
/// to an operator on the full system of `num_total_qubits`. Qubit `i` maps to
/// bit `i` of the basis index.
pub fn expand_operator(
    num_total_qubits: usize,
    matrix: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array2<Complex64> {
    let dim = 1 << num_total_qubits;
    let mut full_matrix = Array2::<Complex64>::zeros((dim, dim));

    let control_mask = controls.iter().fold(0usize, |mask, &c| mask | (1 << c));
    let target_mask = targets.iter().fold(0usize, |mask, &t| mask | (1 << t));
    // Bits outside the targets pass through untouched
    let passive_mask = !target_mask;

    for col_idx in 0..dim {
        // Basis states without every control set are left alone
        if (col_idx & control_mask) != control_mask {
            full_matrix[[col_idx, col_idx]] = Complex64::new(1.0, 0.0);
            continue;
        }

        let small_col = extract_bits(col_idx, targets);
        for small_row in 0..matrix.nrows() {
            let val = matrix[[small_row, small_col]];
            if val.norm_sqr() < f64::EPSILON {
                continue;
            }
            let row_idx = (col_idx & passive_mask) | deposit_bits(small_row, targets);
            full_matrix[[row_idx, col_idx]] = val;
        }
    }
    full_matrix
}

/// Extracts the bits in positions `indices` of the sequence `value`
fn extract_bits(value: usize, indices: &[usize]) -> usize {
    indices
        .iter()
        .enumerate()
        .filter(|&(_, &pos)| (value >> pos) & 1 == 1)
        .fold(0, |acc, (i, _)| acc | (1 << i))
}

/// Scatters bits from `compact_value` into the positions specified by `indices`.
fn deposit_bits(compact_value: usize, indices: &[usize]) -> usize {
    indices
        .iter()
        .enumerate()
        .filter(|&(i, _)| (compact_value >> i) & 1 == 1)
        .fold(0, |acc, (_, &pos)| acc | (1 << pos))
}

/// Find duplicate in a slice of usize
pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = std::collections::HashSet::new();
    indices.iter().find(|&&idx| !seen.insert(idx)).copied()
}

/// Checks completeness relation for a projector set.
///
/// Verifies if $\sum P_k = I$.
pub fn check_projector_completeness(ops: &[Array2<Complex64>], dim: usize) -> bool {
    let mut sum = Array2::<Complex64>::zeros((dim, dim));
    for op in ops {
        sum += op;
    }
    let identity = Array2::<Complex64>::eye(dim);
    (sum - identity).iter().all(|x| x.norm() < 1e-9)
}

/// Computes the outer product of two vectors $|a\rangle\langle b|$.
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j].conj())
}

/// Checks if a matrix is Hermitian
pub fn is_hermitian(mat: &Array2<Complex64>, tol: f64) -> bool {
    mat.iter()
        .zip(mat.t().iter())
        .all(|(a, b)| (a - b.conj()).norm() < tol)
}

/// Smallest eigenvalue of a Hermitian matrix.
///
/// Goes through nalgebra's Hermitian eigendecomposition. The caller is
/// responsible for checking hermiticity first.
pub fn min_eigenvalue(mat: &Array2<Complex64>) -> f64 {
    let (rows, cols) = mat.dim();
    let na_mat = DMatrix::from_fn(rows, cols, |r, c| mat[[r, c]]);
    na_mat
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min)
}
