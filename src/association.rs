use ndarray::{Array2, Zip};

use crate::error::{DensifyError, Result};

/// Known association matrix `R` together with its observation mask.
///
/// `mask[[i, j]] == true` marks `values[[i, j]]` as observed. Unobserved
/// entries of `values` are ignored by every solver.
#[derive(Debug, Clone)]
pub struct KnownAssociations {
    pub values: Array2<f64>,
    pub mask: Array2<bool>,
}

impl KnownAssociations {
    /// Treat every zero entry as unobserved.
    pub fn from_sentinel(values: Array2<f64>) -> Self {
        let mask = values.mapv(|v| v != 0.0);
        Self { values, mask }
    }

    /// Use an explicit mask; zeros under the mask are genuine observations.
    pub fn with_mask(values: Array2<f64>, mask: Array2<bool>) -> Result<Self> {
        if values.dim() != mask.dim() {
            return Err(DensifyError::ShapeMismatch(format!(
                "association matrix is {:?} but mask is {:?}",
                values.dim(),
                mask.dim()
            )));
        }
        Ok(Self { values, mask })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn observed_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }

    /// Sum of squared observed values
    pub fn observed_energy(&self) -> f64 {
        let mut energy = 0.0;
        Zip::from(&self.values).and(&self.mask).for_each(|&v, &m| {
            if m {
                energy += v * v;
            }
        });
        energy
    }

    /// `sum over observed (R_ij - other_ij)^2`
    pub fn observed_residual(&self, other: &Array2<f64>) -> f64 {
        let mut residual = 0.0;
        Zip::from(&self.values)
            .and(&self.mask)
            .and(other)
            .for_each(|&v, &m, &o| {
                if m {
                    residual += (v - o) * (v - o);
                }
            });
        residual
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.values.iter().any(|v| !v.is_finite()) {
            return Err(DensifyError::InvalidInput(
                "association matrix contains non-finite values".to_string(),
            ));
        }
        if self.observed_count() == 0 {
            return Err(DensifyError::InvalidInput(
                "association matrix has no observed entries".to_string(),
            ));
        }
        Ok(())
    }
}
