//! Discriminant directions from the scatter matrices
//!
//! Solves `Sw⁻¹·Sb · v = λ·v`. Since Sw is symmetric positive-definite the
//! problem is reduced to the symmetric matrix `Sw^{-1/2}·Sb·Sw^{-1/2}`, which
//! has the same eigenvalues; eigenvectors are mapped back with `Sw^{-1/2}`.

use std::cmp::Ordering;

use faer::linalg::matmul::matmul;
use faer::{Accum, Mat, MatRef, Par, Side};

use crate::errors::{LdaError, LdaResult};

/// Smallest accepted ratio between the smallest and largest eigenvalue of Sw
const SINGULARITY_TOLERANCE: f64 = 1e-12;

/// Condition number above which a warning is logged
const ILL_CONDITIONED_WARNING: f64 = 1e8;

/// An eigenvalue with its eigenvector and its index in the raw decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: f64,
    pub vector: Vec<f64>,
    pub source_index: usize,
}

/// Output of [`solve`]
#[derive(Debug, Clone)]
pub struct DiscriminantSolution {
    /// All eigenpairs, descending by eigenvalue
    pub eigenpairs: Vec<EigenPair>,
    /// The matrix `Sw⁻¹·Sb`
    pub discriminant_matrix: Mat<f64>,
    /// Eigenvalue ratio of Sw
    pub condition_number: f64,
}

/// Solve the discriminant eigen-problem for the given scatter matrices
///
/// # Arguments
/// * `within` - Within-class scatter Sw (d x d)
/// * `between` - Between-class scatter Sb (d x d)
///
/// # Returns
/// * `DiscriminantSolution` with all `d` eigenpairs in descending order
pub fn solve(within: MatRef<'_, f64>, between: MatRef<'_, f64>) -> LdaResult<DiscriminantSolution> {
    let d = within.nrows();
    if d == 0 {
        return Err(LdaError::EmptyInput { field: "features" });
    }
    for m in [within, between] {
        if m.nrows() != d || m.ncols() != d {
            return Err(LdaError::DimensionMismatch {
                expected: d,
                actual: if m.nrows() != d { m.nrows() } else { m.ncols() },
            });
        }
    }
    if !all_finite(within) || !all_finite(between) {
        return Err(LdaError::InvalidInput(
            "scatter matrices contain non-finite entries".to_string(),
        ));
    }

    let within = symmetrize(within);
    let between = symmetrize(between);

    // Sw = Q diag(w) Q^T
    let (w_values, q) = symmetric_eigen(&within, "within-class scatter")?;
    let largest = w_values.iter().fold(0.0_f64, |acc, &v| acc.max(v));
    let smallest = w_values.iter().fold(f64::INFINITY, |acc, &v| acc.min(v));
    if largest <= 0.0 || smallest <= largest * SINGULARITY_TOLERANCE {
        let condition = if smallest > 0.0 {
            largest / smallest
        } else {
            f64::INFINITY
        };
        return Err(LdaError::SingularMatrix { condition });
    }
    let condition_number = largest / smallest;
    if condition_number > ILL_CONDITIONED_WARNING {
        log::warn!(
            "Within-class scatter is ill-conditioned (condition number {:.3e})",
            condition_number
        );
    }

    let within_inv = spectral_function(&q, &w_values, |w| 1.0 / w);
    let within_inv_sqrt = spectral_function(&q, &w_values, |w| 1.0 / w.sqrt());

    let mut discriminant_matrix = Mat::<f64>::zeros(d, d);
    matmul(
        discriminant_matrix.as_mut(),
        Accum::Replace,
        within_inv.as_ref(),
        between.as_ref(),
        1.0,
        Par::Seq,
    );

    // S = Sw^{-1/2} Sb Sw^{-1/2}
    let mut tmp = Mat::<f64>::zeros(d, d);
    matmul(
        tmp.as_mut(),
        Accum::Replace,
        within_inv_sqrt.as_ref(),
        between.as_ref(),
        1.0,
        Par::Seq,
    );
    let mut reduced = Mat::<f64>::zeros(d, d);
    matmul(
        reduced.as_mut(),
        Accum::Replace,
        tmp.as_ref(),
        within_inv_sqrt.as_ref(),
        1.0,
        Par::Seq,
    );
    let reduced = symmetrize(reduced.as_ref());

    let (values, u) = symmetric_eigen(&reduced, "discriminant matrix")?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(LdaError::EigenSolve(
            "decomposition produced non-finite eigenvalues".to_string(),
        ));
    }

    // V = Sw^{-1/2} U, one candidate direction per column
    let mut directions = Mat::<f64>::zeros(d, d);
    matmul(
        directions.as_mut(),
        Accum::Replace,
        within_inv_sqrt.as_ref(),
        u.as_ref(),
        1.0,
        Par::Seq,
    );
    let pairs = values
        .iter()
        .enumerate()
        .map(|(k, &value)| {
            let vector = normalize_direction((0..d).map(|i| directions[(i, k)]).collect())?;
            Ok(EigenPair {
                value,
                vector,
                source_index: k,
            })
        })
        .collect::<LdaResult<Vec<_>>>()?;

    let eigenpairs = rank_descending(pairs);
    log::debug!(
        "Discriminant spectrum: {:?}",
        eigenpairs.iter().map(|p| p.value).collect::<Vec<_>>()
    );

    Ok(DiscriminantSolution {
        eigenpairs,
        discriminant_matrix,
        condition_number,
    })
}

/// Order eigenpairs by descending eigenvalue
///
/// Pairs are sorted ascending and then read back-to-front. Within a run of
/// equal eigenvalues the ascending sort puts higher source indices first, so
/// the reversed output lists them in discovery order. Vectors travel with
/// their values; nothing is matched up by value afterwards.
pub fn rank_descending(mut pairs: Vec<EigenPair>) -> Vec<EigenPair> {
    pairs.sort_by(|a, b| {
        a.value
            .partial_cmp(&b.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.source_index.cmp(&a.source_index))
    });
    pairs.into_iter().rev().collect()
}

fn symmetric_eigen(matrix: &Mat<f64>, context: &str) -> LdaResult<(Vec<f64>, Mat<f64>)> {
    let eig = matrix
        .as_ref()
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| LdaError::EigenSolve(format!("{} did not converge: {:?}", context, e)))?;

    let diag = eig.S();
    let mut values = Vec::with_capacity(diag.dim());
    for idx in 0..diag.dim() {
        values.push(diag[idx]);
    }
    let vectors_ref = eig.U();
    let vectors = Mat::from_fn(vectors_ref.nrows(), vectors_ref.ncols(), |i, j| {
        vectors_ref[(i, j)]
    });
    Ok((values, vectors))
}

/// `Q · diag(f(w)) · Qᵀ`
fn spectral_function(q: &Mat<f64>, values: &[f64], f: impl Fn(f64) -> f64) -> Mat<f64> {
    let d = q.nrows();
    let scaled: Vec<f64> = values.iter().map(|&w| f(w)).collect();
    let q_scaled = Mat::from_fn(d, d, |i, k| q[(i, k)] * scaled[k]);
    let mut out = Mat::<f64>::zeros(d, d);
    matmul(
        out.as_mut(),
        Accum::Replace,
        q_scaled.as_ref(),
        q.as_ref().transpose(),
        1.0,
        Par::Seq,
    );
    out
}

/// Scale a back-transformed direction to unit length with its
/// largest-magnitude component positive
fn normalize_direction(mut v: Vec<f64>) -> LdaResult<Vec<f64>> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if !norm.is_finite() || norm == 0.0 {
        return Err(LdaError::EigenSolve(
            "decomposition produced a degenerate eigenvector".to_string(),
        ));
    }
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    let scale = if pivot < 0.0 { -1.0 / norm } else { 1.0 / norm };
    for x in v.iter_mut() {
        *x *= scale;
    }
    Ok(v)
}

fn symmetrize(m: MatRef<'_, f64>) -> Mat<f64> {
    Mat::from_fn(m.nrows(), m.ncols(), |i, j| 0.5 * (m[(i, j)] + m[(j, i)]))
}

fn all_finite(m: MatRef<'_, f64>) -> bool {
    (0..m.nrows()).all(|i| (0..m.ncols()).all(|j| m[(i, j)].is_finite()))
}
