use ndarray::{Array2, Zip};

use crate::association::KnownAssociations;
use crate::error::{DensifyError, Result};

/// Theta = U * Lambda * V^T
pub fn reconstruct(u: &Array2<f64>, lambda: &Array2<f64>, v: &Array2<f64>) -> Result<Array2<f64>> {
    if u.ncols() != lambda.nrows() {
        return Err(DensifyError::ShapeMismatch(format!(
            "U has {} columns but Lambda has {} rows",
            u.ncols(),
            lambda.nrows()
        )));
    }
    if lambda.ncols() != v.ncols() {
        return Err(DensifyError::ShapeMismatch(format!(
            "Lambda has {} columns but V has {} columns",
            lambda.ncols(),
            v.ncols()
        )));
    }
    Ok(u.dot(lambda).dot(&v.t()))
}

/// Reconstruct, then pin the observed entries to their known values.
pub fn solve_theta(
    u: &Array2<f64>,
    lambda: &Array2<f64>,
    v: &Array2<f64>,
    known: &KnownAssociations,
) -> Result<Array2<f64>> {
    let mut theta = reconstruct(u, lambda, v)?;
    if theta.dim() != known.values.dim() {
        return Err(DensifyError::ShapeMismatch(format!(
            "reconstruction is {:?} but R is {:?}",
            theta.dim(),
            known.values.dim()
        )));
    }
    Zip::from(&mut theta)
        .and(&known.values)
        .and(&known.mask)
        .for_each(|t, &r, &observed| {
            if observed {
                *t = r;
            }
        });
    Ok(theta)
}
