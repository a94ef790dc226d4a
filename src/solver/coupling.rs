use log::debug;
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

use crate::association::KnownAssociations;
use crate::error::{DensifyError, Result};
use crate::util::{clone_to_dmatrix, clone_to_dvector, dvector_to_array1};

/// Singular values below `PINV_RCOND * max` are treated as zero
const PINV_RCOND: f64 = 1e-10;

/// Coupling matrix `Lambda` (k1 x k2) fitted to the observed entries:
///
///   min sum_{(i,j) observed} (R_ij - (U * Lambda * V^T)_ij)^2 + ridge * ||Lambda||_F^2
///
/// With `z = U_i ⊗ V_j` each observation is one row of a linear system in
/// `vec(Lambda)` (row-major). The normal equations are accumulated directly,
/// then solved by Cholesky when `ridge > 0`, or through an SVD pseudo-inverse
/// (minimum-norm solution) when `ridge == 0`.
pub fn solve_coupling(
    u: &Array2<f64>,
    v: &Array2<f64>,
    known: &KnownAssociations,
    ridge: f64,
) -> Result<Array2<f64>> {
    if u.nrows() != known.nrows() || v.nrows() != known.ncols() {
        return Err(DensifyError::ShapeMismatch(format!(
            "U is {:?} and V is {:?} but R is {}x{}",
            u.dim(),
            v.dim(),
            known.nrows(),
            known.ncols()
        )));
    }
    if !(ridge >= 0.0) || !ridge.is_finite() {
        return Err(DensifyError::InvalidInput(format!(
            "coupling ridge must be finite and >= 0, got {}",
            ridge
        )));
    }

    let k1 = u.ncols();
    let k2 = v.ncols();
    let p = k1 * k2;

    let mut gram = Array2::<f64>::zeros((p, p));
    let mut rhs = Array1::<f64>::zeros(p);
    let mut z = Array1::<f64>::zeros(p);

    for ((i, j), &observed) in known.mask.indexed_iter() {
        if !observed {
            continue;
        }
        let u_row = u.row(i);
        let v_row = v.row(j);
        for a in 0..k1 {
            for b in 0..k2 {
                z[a * k2 + b] = u_row[a] * v_row[b];
            }
        }
        let target = known.values[[i, j]];
        for p1 in 0..p {
            rhs[p1] += target * z[p1];
            for p2 in 0..p {
                gram[[p1, p2]] += z[p1] * z[p2];
            }
        }
    }

    let gram = clone_to_dmatrix(gram.view());
    let rhs = clone_to_dvector(rhs.view());

    let solution = if ridge > 0.0 {
        let regularized = gram + DMatrix::<f64>::identity(p, p) * ridge;
        let cholesky = regularized.cholesky().ok_or_else(|| {
            DensifyError::NumericalFailure(
                "coupling normal equations are not positive definite".to_string(),
            )
        })?;
        cholesky.solve(&rhs)
    } else {
        let svd = gram.svd(true, true);
        let max_sv = svd.singular_values.iter().cloned().fold(0.0, f64::max);
        let cutoff = max_sv * PINV_RCOND;
        let pinv = svd
            .pseudo_inverse(cutoff)
            .map_err(|e| DensifyError::NumericalFailure(e.to_string()))?;
        pinv * rhs
    };

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(DensifyError::NumericalFailure(
            "coupling solve produced non-finite values".to_string(),
        ));
    }

    let lambda = dvector_to_array1(&solution)
        .into_shape((k1, k2))
        .map_err(|e| DensifyError::ShapeMismatch(e.to_string()))?;
    debug!(
        "coupling {}x{} from {} observations, ||Lambda||_F = {:.6e}",
        k1,
        k2,
        known.observed_count(),
        lambda.mapv(|x| x * x).sum().sqrt()
    );
    Ok(lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::reconstruction::reconstruct;
    use crate::solver::test_utils::random_positive;
    use ndarray::array;

    #[test]
    fn test_recovers_coupling_when_fully_observed() {
        let u = random_positive(6, 2, 1);
        let v = random_positive(5, 3, 2);
        let lambda_true = array![[1.0, -0.5, 0.2], [0.3, 0.8, -1.0]];
        let r = u.dot(&lambda_true).dot(&v.t());
        let known = KnownAssociations::with_mask(r, Array2::from_elem((6, 5), true)).unwrap();

        let lambda = solve_coupling(&u, &v, &known, 0.0).unwrap();
        for (a, b) in lambda.iter().zip(lambda_true.iter()) {
            assert!((a - b).abs() < 1e-6, "{} vs {}", a, b);
        }
    }

    #[test]
    fn test_single_observation_is_fitted() {
        let u = random_positive(4, 2, 3);
        let v = random_positive(4, 2, 4);
        let mut r = Array2::zeros((4, 4));
        r[[1, 2]] = 2.0;
        let known = KnownAssociations::from_sentinel(r);

        let lambda = solve_coupling(&u, &v, &known, 0.0).unwrap();
        let theta = reconstruct(&u, &lambda, &v).unwrap();
        assert!((theta[[1, 2]] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_ridge_shrinks_coupling() {
        let u = random_positive(5, 2, 5);
        let v = random_positive(4, 2, 6);
        let r = random_positive(5, 4, 7);
        let known = KnownAssociations::from_sentinel(r);

        let free = solve_coupling(&u, &v, &known, 0.0).unwrap();
        let shrunk = solve_coupling(&u, &v, &known, 10.0).unwrap();
        let norm = |m: &Array2<f64>| m.mapv(|x| x * x).sum();
        assert!(norm(&shrunk) < norm(&free));
    }

    #[test]
    fn test_shape_and_ridge_validation() {
        let u = random_positive(3, 2, 8);
        let v = random_positive(4, 2, 9);
        let known = KnownAssociations::from_sentinel(Array2::ones((4, 4)));
        assert!(matches!(
            solve_coupling(&u, &v, &known, 0.0),
            Err(DensifyError::ShapeMismatch(_))
        ));

        let u = random_positive(4, 2, 8);
        assert!(matches!(
            solve_coupling(&u, &v, &known, -1.0),
            Err(DensifyError::InvalidInput(_))
        ));
    }
}
