//! Shared test fixtures for the solvers

use ndarray::Array2;
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

/// Symmetric 20x20 similarity with two planted groups.
/// Entries inside group 0 (0-9) and group 1 (10-19) are 5.0, across groups 0.1,
/// diagonal 0.0 like an expanded condensed similarity.
pub fn make_block_similarity() -> Array2<f64> {
    let n = 20;
    let mut m = Array2::from_elem((n, n), 0.1);
    for i in 0..n {
        for j in 0..n {
            if (i < 10) == (j < 10) {
                m[[i, j]] = 5.0;
            }
        }
        m[[i, i]] = 0.0;
    }
    m
}

/// Strictly positive random matrix with a fixed seed
pub fn random_positive(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    Array2::random_using((rows, cols), Uniform::new(0.1, 1.0), &mut rng)
}
