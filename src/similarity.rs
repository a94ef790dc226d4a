//! Condensed similarity matrices.
//!
//! A similarity collection is an `Array2<f64>` with one row per similarity
//! measure. Each row holds the strict upper triangle of a symmetric `n x n`
//! matrix in row-major `i < j` order (the same layout as scipy `squareform`),
//! so a row has `n * (n - 1) / 2` entries and the diagonal is implicitly zero.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{DensifyError, Result};

/// Number of condensed entries for `n` entities
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Expand a condensed row into the full symmetric matrix with a zero diagonal.
pub fn squareform(condensed: ArrayView1<f64>, n: usize) -> Result<Array2<f64>> {
    if condensed.len() != pair_count(n) {
        return Err(DensifyError::ShapeMismatch(format!(
            "condensed similarity has {} entries, expected {} for {} entities",
            condensed.len(),
            pair_count(n),
            n
        )));
    }

    let mut full = Array2::zeros((n, n));
    let mut k = 0;
    for i in 0..n {
        for j in (i + 1)..n {
            let value = condensed[k];
            full[[i, j]] = value;
            full[[j, i]] = value;
            k += 1;
        }
    }
    Ok(full)
}

/// Flatten the strict upper triangle of a square matrix.
pub fn condensed(square: &Array2<f64>) -> Array1<f64> {
    let n = square.nrows();
    let mut out = Vec::with_capacity(pair_count(n));
    for i in 0..n {
        for j in (i + 1)..n {
            out.push(square[[i, j]]);
        }
    }
    Array1::from(out)
}

/// Squared Frobenius norm of the expanded matrix, without expanding it
pub fn squared_frobenius(condensed: ArrayView1<f64>) -> f64 {
    2.0 * condensed.iter().map(|v| v * v).sum::<f64>()
}

/// Reject empty collections and negative or non-finite similarity values.
pub fn validate_similarities(similarities: ArrayView2<f64>, name: &str) -> Result<()> {
    if similarities.nrows() == 0 {
        return Err(DensifyError::InvalidInput(format!(
            "similarity collection {} is empty",
            name
        )));
    }
    if similarities.iter().any(|v| !v.is_finite()) {
        return Err(DensifyError::InvalidInput(format!(
            "{} contain non-finite values",
            name
        )));
    }
    if similarities.iter().any(|&v| v < 0.0) {
        return Err(DensifyError::InvalidInput(format!(
            "{} contain invalid values (< 0)",
            name
        )));
    }
    Ok(())
}

/// Infer the entity count from a condensed row length.
pub fn entity_count(n_pairs: usize) -> Result<usize> {
    // n(n-1)/2 = p  =>  n = (1 + sqrt(1 + 8p)) / 2
    let n = ((1.0 + (1.0 + 8.0 * n_pairs as f64).sqrt()) / 2.0).round() as usize;
    if pair_count(n) != n_pairs {
        return Err(DensifyError::ShapeMismatch(format!(
            "{} is not a valid condensed length",
            n_pairs
        )));
    }
    Ok(n)
}

/// `sum_i weights[i] * squareform(similarities[i])`
pub fn weighted_consensus(
    similarities: ArrayView2<f64>,
    weights: ArrayView1<f64>,
    n: usize,
) -> Result<Array2<f64>> {
    if weights.len() != similarities.nrows() {
        return Err(DensifyError::ShapeMismatch(format!(
            "{} weights for {} similarity matrices",
            weights.len(),
            similarities.nrows()
        )));
    }

    let mut consensus = Array2::zeros((n, n));
    for (row, &w) in similarities.axis_iter(Axis(0)).zip(weights.iter()) {
        let full = squareform(row, n)?;
        consensus.scaled_add(w, &full);
    }
    Ok(consensus)
}
