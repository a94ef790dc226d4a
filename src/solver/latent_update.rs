use ndarray::{Array1, Array2, ArrayView2};

use super::update_rules::{split_signs, sqrt_multiplicative_update};
use crate::error::{DensifyError, Result};
use crate::similarity::{validate_similarities, weighted_consensus};

/// One multiplicative step on a latent factor `F` (`own`) for
///
///   f(F) = ||Theta - F * W^T||_F^2 + reg * ||C - F * F^T||_F^2,   W = other * coupling^T
///
/// Splitting the gradient into positive and negative parts gives
///
///   F ← F * sqrt( [(Theta*W)+ + F*(W^T*W)- + 2*reg*C*F]
///               / [(Theta*W)- + F*(W^T*W)+ + 2*reg*F*F^T*F] )
///
/// which keeps F non-negative. Rows of `theta` index the entities of `own`;
/// `coupling` is (k_own x k_other).
pub fn update_latent_factor(
    theta: ArrayView2<f64>,
    own: &Array2<f64>,
    other: &Array2<f64>,
    coupling: ArrayView2<f64>,
    reg: f64,
    consensus: &Array2<f64>,
) -> Result<Array2<f64>> {
    if !(reg > 0.0) {
        return Err(DensifyError::InvalidInput(format!(
            "regularization must be > 0, got {}",
            reg
        )));
    }
    let (n_own, k_own) = own.dim();
    let (n_other, k_other) = other.dim();
    if theta.dim() != (n_own, n_other) {
        return Err(DensifyError::ShapeMismatch(format!(
            "Theta is {:?}, expected ({}, {})",
            theta.dim(),
            n_own,
            n_other
        )));
    }
    if coupling.dim() != (k_own, k_other) {
        return Err(DensifyError::ShapeMismatch(format!(
            "coupling is {:?}, expected ({}, {})",
            coupling.dim(),
            k_own,
            k_other
        )));
    }
    if consensus.dim() != (n_own, n_own) {
        return Err(DensifyError::ShapeMismatch(format!(
            "similarity consensus is {:?}, expected ({}, {})",
            consensus.dim(),
            n_own,
            n_own
        )));
    }

    let w = other.dot(&coupling.t());
    let (theta_w_pos, theta_w_neg) = split_signs(&theta.dot(&w));
    let (gram_pos, gram_neg) = split_signs(&w.t().dot(&w));

    let numer = theta_w_pos + own.dot(&gram_neg) + consensus.dot(own) * (2.0 * reg);
    let denom = theta_w_neg + own.dot(&gram_pos) + own.dot(&own.t()).dot(own) * (2.0 * reg);
    if numer.iter().chain(denom.iter()).any(|v| !v.is_finite()) {
        return Err(DensifyError::NumericalFailure(
            "latent factor update overflowed".to_string(),
        ));
    }

    Ok(sqrt_multiplicative_update(own, &numer, &denom, 1e-16))
}

/// Refine `U` against `Theta` and the omega-weighted consensus of `D`.
pub fn solve_u(
    theta: &Array2<f64>,
    u: &Array2<f64>,
    v: &Array2<f64>,
    lambda: &Array2<f64>,
    lambda1: f64,
    d: ArrayView2<f64>,
    omega: &Array1<f64>,
) -> Result<Array2<f64>> {
    validate_similarities(d, "D")?;
    let consensus = weighted_consensus(d, omega.view(), u.nrows())?;
    update_latent_factor(theta.view(), u, v, lambda.view(), lambda1, &consensus)
}

/// Refine `V` against `Theta^T` and the pi-weighted consensus of `S`.
pub fn solve_v(
    theta: &Array2<f64>,
    u: &Array2<f64>,
    v: &Array2<f64>,
    lambda: &Array2<f64>,
    lambda2: f64,
    s: ArrayView2<f64>,
    pi: &Array1<f64>,
) -> Result<Array2<f64>> {
    validate_similarities(s, "S")?;
    let consensus = weighted_consensus(s, pi.view(), v.nrows())?;
    update_latent_factor(theta.t(), v, u, lambda.t(), lambda2, &consensus)
}
