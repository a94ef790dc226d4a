use std::error::Error;
use std::fmt;

/// Errors raised while densifying an association matrix
#[derive(Debug, Clone, PartialEq)]
pub enum DensifyError {
    /// Negative similarity, non-positive regularization, empty input, ...
    InvalidInput(String),
    /// Feature counts or latent dimensions that do not compose
    ShapeMismatch(String),
    /// A sub-solver produced a singular system or non-finite values
    NumericalFailure(String),
}

impl fmt::Display for DensifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DensifyError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DensifyError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            DensifyError::NumericalFailure(msg) => write!(f, "Numerical failure: {}", msg),
        }
    }
}

impl Error for DensifyError {}

pub type Result<T> = std::result::Result<T, DensifyError>;

/// Non-fatal: the outer loop hit its iteration cap before the objective settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceWarning {
    pub iterations: usize,
    pub last_relative_change: f64,
    pub tol: f64,
}

impl fmt::Display for ConvergenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "did not converge after {} iterations (relative change {:.3e} > tol {:.3e})",
            self.iterations, self.last_relative_change, self.tol
        )
    }
}
