use ndarray::{Array1, ArrayView1};

use crate::error::{DensifyError, Result};

/// Euclidean projection of `y` onto the probability simplex
/// `{x : x_i >= 0, sum(x) = 1}`.
///
/// Chen & Ye, "Projection onto a simplex" (arXiv:1101.6081): sort descending,
/// scan prefix sums for the first threshold `t = (cumsum - 1) / k` that is not
/// smaller than the next sorted value, then clip `y - t` at zero.
///
/// A single-element input always projects to `[1.0]`.
pub fn simplex_projection(y: ArrayView1<f64>) -> Result<Array1<f64>> {
    let n = y.len();
    if n == 0 {
        return Err(DensifyError::InvalidInput("y cannot be empty".to_string()));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(DensifyError::InvalidInput(
            "y contains non-finite values".to_string(),
        ));
    }
    if n == 1 {
        return Ok(Array1::ones(1));
    }

    let mut sorted: Vec<f64> = y.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut partial = 0.0;
    let mut threshold = None;
    for i in 0..n - 1 {
        partial += sorted[i];
        let t = (partial - 1.0) / (i + 1) as f64;
        if t >= sorted[i + 1] {
            threshold = Some(t);
            break;
        }
    }
    let t = threshold.unwrap_or((partial + sorted[n - 1] - 1.0) / n as f64);

    Ok(y.mapv(|v| (v - t).max(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, aview1};
    use ndarray_rand::rand::rngs::StdRng;
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::StandardNormal;
    use ndarray_rand::RandomExt;

    fn assert_on_simplex(x: &Array1<f64>) {
        assert!(x.iter().all(|&v| v >= 0.0), "negative entry in {:?}", x);
        assert!((x.sum() - 1.0).abs() < 1e-10, "sum is {}", x.sum());
    }

    #[test]
    fn test_simplex_vectors_unchanged() {
        let simplex_vectors = vec![array![0.3, 0.4, 0.3], Array1::from_elem(5, 0.2)];
        for y in simplex_vectors {
            let x = simplex_projection(y.view()).unwrap();
            for (a, b) in x.iter().zip(y.iter()) {
                assert!((a - b).abs() < 1e-12, "{:?} != {:?}", x, y);
            }
        }
    }

    #[test]
    fn test_single_element_projects_to_one() {
        let mut rng = StdRng::seed_from_u64(7);
        let samples = Array1::<f64>::random_using(10, StandardNormal, &mut rng);
        for &y in samples.iter() {
            assert_eq!(simplex_projection(aview1(&[y])).unwrap(), array![1.0]);
        }
    }

    #[test]
    fn test_empty_fails() {
        let err = simplex_projection(aview1(&[])).unwrap_err();
        assert!(matches!(err, DensifyError::InvalidInput(_)));
    }

    #[test]
    fn test_known_projections() {
        let x = simplex_projection(aview1(&[2.0, 0.0])).unwrap();
        assert_eq!(x, array![1.0, 0.0]);

        let x = simplex_projection(aview1(&[0.5, 0.5, 0.5])).unwrap();
        for &v in x.iter() {
            assert!((v - 1.0 / 3.0).abs() < 1e-12);
        }

        // order of the input is preserved
        let x = simplex_projection(aview1(&[0.0, 3.0, 1.0])).unwrap();
        assert_eq!(x, array![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_random_inputs_land_on_simplex() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in 2..8 {
            let y = Array1::<f64>::random_using(n, StandardNormal, &mut rng) * 3.0;
            let x = simplex_projection(y.view()).unwrap();
            assert_on_simplex(&x);
            // idempotent once projected
            let again = simplex_projection(x.view()).unwrap();
            for (a, b) in again.iter().zip(x.iter()) {
                assert!((a - b).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_nan_fails() {
        assert!(simplex_projection(aview1(&[0.2, f64::NAN])).is_err());
    }
}
