use log::debug;
use ndarray::{Array2, ArrayView1, ArrayView2};
use ndarray_rand::rand::rngs::StdRng;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

use super::update_rules::{multiplicative_update, symmetric_error};
use crate::config::DensifyConfig;
use crate::error::{DensifyError, Result};
use crate::similarity::weighted_consensus;

/// Symmetric NMF settings: M ≈ F * F^T with F >= 0
#[derive(Debug, Clone)]
pub struct SnmfConfig {
    pub rank: usize,
    pub max_iter: usize,
    pub tol: f64,
    pub seed: Option<u64>,
}

impl Default for SnmfConfig {
    fn default() -> Self {
        Self {
            rank: 2,
            max_iter: 200,
            tol: 1e-6,
            seed: None,
        }
    }
}

pub struct SnmfResult {
    pub factor: Array2<f64>,
    /// ||M - F*F^T||_F^2 at exit
    pub error: f64,
    pub iterations: usize,
}

/// Symmetric nonnegative matrix factorization with damped multiplicative updates
/// (Ding et al., beta = 1/2):
///
///   F ← F * (M*F + F*F^T*F) / (2 * F*F^T*F)
pub struct SymmetricNmf {
    pub config: SnmfConfig,
}

impl SymmetricNmf {
    pub fn new(rank: usize) -> Self {
        Self {
            config: SnmfConfig {
                rank,
                ..Default::default()
            },
        }
    }

    pub fn with_config(config: SnmfConfig) -> Self {
        Self { config }
    }

    pub fn fit(&self, m: &Array2<f64>) -> Result<SnmfResult> {
        let n = m.nrows();
        let k = self.config.rank;
        if m.ncols() != n {
            return Err(DensifyError::ShapeMismatch(format!(
                "symmetric factorization needs a square matrix, got {:?}",
                m.dim()
            )));
        }
        if k == 0 {
            return Err(DensifyError::InvalidInput(
                "factorization rank must be at least 1".to_string(),
            ));
        }
        if m.iter().any(|&v| !v.is_finite() || v < 0.0) {
            return Err(DensifyError::InvalidInput(
                "matrix to factorize must be finite and non-negative".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed.unwrap_or(42));
        let mean = if n > 0 { m.sum() / (n * n) as f64 } else { 0.0 };
        // scale the seed so F*F^T starts at the magnitude of M
        let scale = if mean > 0.0 {
            2.0 * (mean / k as f64).sqrt()
        } else {
            1.0
        };
        let mut f = Array2::random_using((n, k), Uniform::new(0.0, 1.0), &mut rng) * scale;

        let mut prev_error = symmetric_error(m, &f);
        let mut iterations = 0;
        for iter in 0..self.config.max_iter {
            let fft_f = f.dot(&f.t()).dot(&f);
            let numer = m.dot(&f) + &fft_f;
            let denom = &fft_f * 2.0;
            f = multiplicative_update(&f, &numer, &denom, 1e-16);
            iterations = iter + 1;

            let error = symmetric_error(m, &f);
            let change = (prev_error - error).abs() / prev_error.max(f64::EPSILON);
            prev_error = error;
            if change < self.config.tol {
                break;
            }
        }

        debug!(
            "symmetric NMF rank {} on {}x{}: error {:.6e} after {} iterations",
            k, n, n, prev_error, iterations
        );

        Ok(SnmfResult {
            factor: f,
            error: prev_error,
            iterations,
        })
    }
}

/// Initial `U`, `V` from the weighted similarity consensus of each side.
///
/// d: (n_sim1, n1(n1-1)/2), s: (n_sim2, n2(n2-1)/2)
pub fn initialize_latent_matrices(
    d: ArrayView2<f64>,
    s: ArrayView2<f64>,
    omega: ArrayView1<f64>,
    pi: ArrayView1<f64>,
    n1: usize,
    n2: usize,
    config: &DensifyConfig,
) -> Result<(Array2<f64>, Array2<f64>)> {
    let base_seed = config.seed.unwrap_or(42);

    let sigma1 = weighted_consensus(d, omega, n1)?;
    let u = SymmetricNmf::with_config(SnmfConfig {
        rank: config.latent_dim1,
        max_iter: config.max_inner_iter,
        tol: config.inner_tol,
        seed: Some(base_seed),
    })
    .fit(&sigma1)?;

    let sigma2 = weighted_consensus(s, pi, n2)?;
    let v = SymmetricNmf::with_config(SnmfConfig {
        rank: config.latent_dim2,
        max_iter: config.max_inner_iter,
        tol: config.inner_tol,
        seed: Some(base_seed.wrapping_add(1)),
    })
    .fit(&sigma2)?;

    Ok((u.factor, v.factor))
}
