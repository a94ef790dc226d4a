use log::debug;
use ndarray::{Array1, Array2, ArrayView2};
use rayon::prelude::*;

use super::simplex::simplex_projection;
use super::update_rules::squared_distance;
use crate::error::{DensifyError, Result};
use crate::similarity::{pair_count, squareform, validate_similarities};

/// Confidence weight per similarity matrix for one side.
///
/// With `sigma = G * G^T` and `a_i = ||squareform(similarities[i]) - sigma||_F^2`
/// the weights are `simplex_projection(a / (2 * delta))`.
///
/// similarities: (n_similarities, n(n-1)/2), grouping: (n, n_communities)
pub fn solve_weight_vector(
    similarities: ArrayView2<f64>,
    grouping: &Array2<f64>,
    delta: f64,
) -> Result<Array1<f64>> {
    validate_similarities(similarities, "similarities")?;
    if !(delta > 0.0) {
        return Err(DensifyError::InvalidInput(format!(
            "delta value of {} not allowed, needs to be > 0",
            delta
        )));
    }

    let n = grouping.nrows();
    if similarities.ncols() != pair_count(n) {
        return Err(DensifyError::ShapeMismatch(format!(
            "similarities have {} condensed entries but grouping matrix has {} rows",
            similarities.ncols(),
            n
        )));
    }

    let sigma = grouping.dot(&grouping.t());

    // each distance is independent; collect keeps index order
    let distances: Vec<f64> = (0..similarities.nrows())
        .into_par_iter()
        .map(|i| squareform(similarities.row(i), n).map(|full| squared_distance(&full, &sigma)))
        .collect::<Result<Vec<f64>>>()?;

    let a = Array1::from(distances);
    debug!("similarity distances: {:?}", a);
    if a.iter().any(|v| !v.is_finite()) {
        return Err(DensifyError::NumericalFailure(
            "similarity distances overflowed".to_string(),
        ));
    }

    simplex_projection((&a / (2.0 * delta)).view())
}

/// Source 1 weights from `D` and `U`
pub fn solve_omega(d: ArrayView2<f64>, u: &Array2<f64>, delta1: f64) -> Result<Array1<f64>> {
    solve_weight_vector(d, u, delta1)
}

/// Source 2 weights from `S` and `V`
pub fn solve_pi(s: ArrayView2<f64>, v: &Array2<f64>, delta2: f64) -> Result<Array1<f64>> {
    solve_weight_vector(s, v, delta2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;

    #[test]
    fn test_solve_weight_vector() {
        let n_nodes = 4;
        let n_communities = 2;
        let n_similarities = 3;
        let delta = 0.3;
        let mut rng = StdRng::seed_from_u64(42);
        let similarities = Array2::random_using(
            (n_similarities, pair_count(n_nodes)),
            Uniform::new(0.0, 10.0),
            &mut rng,
        );
        let grouping =
            Array2::random_using((n_nodes, n_communities), Uniform::new(0.0, 1.0), &mut rng);

        let weight = solve_weight_vector(similarities.view(), &grouping, delta).unwrap();
        assert_eq!(weight.len(), n_similarities);
        assert!(weight.iter().all(|&w| w >= 0.0));
        assert!((weight.sum() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_invalid_delta() {
        let similarities = Array2::from_elem((2, 6), 0.5);
        let grouping = Array2::from_elem((4, 2), 0.5);
        for delta in [-1.0, 0.0, f64::NAN] {
            let err = solve_weight_vector(similarities.view(), &grouping, delta).unwrap_err();
            assert!(matches!(err, DensifyError::InvalidInput(_)));
        }
    }

    #[test]
    fn test_negative_similarity() {
        let mut similarities = Array2::from_elem((3, 6), 0.5);
        similarities[[0, 3]] = -4.0;
        let grouping = Array2::from_elem((4, 2), 0.5);
        let err = solve_weight_vector(similarities.view(), &grouping, 0.3).unwrap_err();
        assert!(matches!(err, DensifyError::InvalidInput(_)));
    }

    #[test]
    fn test_overflowing_distances_are_numerical_failure() {
        // finite, non-negative, but the squared distance exceeds f64::MAX
        let similarities = Array2::from_elem((2, 6), 1e160);
        let grouping = Array2::from_elem((4, 2), 0.5);
        let err = solve_weight_vector(similarities.view(), &grouping, 1.0).unwrap_err();
        assert!(matches!(err, DensifyError::NumericalFailure(_)));
    }

    #[test]
    fn test_shape_mismatch() {
        let similarities = Array2::from_elem((2, 6), 0.5);
        let grouping = Array2::from_elem((5, 2), 0.5);
        let err = solve_weight_vector(similarities.view(), &grouping, 1.0).unwrap_err();
        assert!(matches!(err, DensifyError::ShapeMismatch(_)));
    }

    #[test]
    fn test_degenerate_constant_versus_zero() {
        let n_nodes = 4;
        let mut similarities = Array2::zeros((2, pair_count(n_nodes)));
        similarities.row_mut(0).fill(100.0);
        let grouping = Array2::ones((n_nodes, 2));

        let weight = solve_omega(similarities.view(), &grouping, 1.0).unwrap();
        assert!((weight[0] - 1.0).abs() < 1e-12);
        assert!(weight[1].abs() < 1e-12);
    }

    #[test]
    fn test_side_wrappers_agree() {
        let similarities = Array2::from_shape_fn((2, 3), |(i, j)| (i + j) as f64 * 0.25);
        let grouping = Array2::from_elem((3, 1), 0.4);
        let omega = solve_omega(similarities.view(), &grouping, 2.0).unwrap();
        let pi = solve_pi(similarities.view(), &grouping, 2.0).unwrap();
        assert_eq!(omega, pi);
    }
}
