/*
 * File: /src/lib.rs
 * Created Date: Monday, January 22nd 2024
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 * 2025-03-10		Zihan	Similarity-fused densification (Zhang, Wang & Hu, AMIA 2014)
 */
pub mod association;
pub mod config;
pub mod error;
pub mod optimizer;
pub mod similarity;
pub mod solver;
pub mod util;

use ndarray::Array2;

pub use association::KnownAssociations;
pub use config::{DensifyConfig, Hyperparameters};
pub use error::{ConvergenceWarning, DensifyError, Result};
pub use optimizer::{ConvergenceStatus, DensifyOutcome, Densifier, ObjectiveTerms, Phase};
pub use solver::simplex_projection;

/// Densify `r` given condensed similarity collections `d` (side 1) and `s` (side 2).
///
/// * `d`: (n_similarities, n1 * (n1 - 1) / 2), entries >= 0
/// * `s`: (m_similarities, n2 * (n2 - 1) / 2), entries >= 0
/// * `r`: (n1, n2); every `0.0` entry is treated as unobserved
///
/// Returns `Theta` with shape (n1, n2). Hitting `max_outer_iter` is not an
/// error: a warning is logged and the best iterate is returned.
///
/// # Example
/// ```
/// use gfusion::{densify, DensifyConfig};
/// use ndarray::{array, Array2};
///
/// let d = array![[0.9, 0.1, 0.2], [0.8, 0.3, 0.1]];
/// let s = array![[0.5, 0.4, 0.7]];
/// let mut r = Array2::zeros((3, 3));
/// r[[0, 1]] = 1.0;
///
/// let theta = densify(&d, &s, &r, &DensifyConfig::default()).unwrap();
/// assert_eq!(theta.dim(), (3, 3));
/// assert_eq!(theta[[0, 1]], 1.0);
/// ```
pub fn densify(
    d: &Array2<f64>,
    s: &Array2<f64>,
    r: &Array2<f64>,
    config: &DensifyConfig,
) -> Result<Array2<f64>> {
    let known = KnownAssociations::from_sentinel(r.clone());
    let outcome = Densifier::new(config.clone()).run(d.view(), s.view(), &known)?;
    Ok(outcome.theta)
}

/// Like [`densify`], with an explicit observation mask (`true` = observed).
pub fn densify_with_mask(
    d: &Array2<f64>,
    s: &Array2<f64>,
    r: &Array2<f64>,
    mask: &Array2<bool>,
    config: &DensifyConfig,
) -> Result<Array2<f64>> {
    let known = KnownAssociations::with_mask(r.clone(), mask.clone())?;
    let outcome = Densifier::new(config.clone()).run(d.view(), s.view(), &known)?;
    Ok(outcome.theta)
}
