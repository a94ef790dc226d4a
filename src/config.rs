/*
 * File: /src/config.rs
 * Created Date: Friday, January 26th 2024
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use serde::{Deserialize, Serialize};

use crate::error::{DensifyError, Result};

/// Regularization strengths, all strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// 源1相似度拟合正则
    pub lambda1: f64,
    /// 源2相似度拟合正则
    pub lambda2: f64,
    /// omega 权重正则
    pub delta1: f64,
    /// pi 权重正则
    pub delta2: f64,
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("lambda1", self.lambda1),
            ("lambda2", self.lambda2),
            ("delta1", self.delta1),
            ("delta2", self.delta2),
        ];
        for (name, value) in named {
            if !(value > 0.0) || !value.is_finite() {
                return Err(DensifyError::InvalidInput(format!(
                    "{} must be finite and > 0, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Densification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DensifyConfig {
    /// 源1隐空间维度
    pub latent_dim1: usize,
    /// 源2隐空间维度
    pub latent_dim2: usize,
    /// 外层最大迭代次数
    pub max_outer_iter: usize,
    /// 外层收敛容差 (目标函数相对变化)
    pub tol: f64,
    /// 对称NMF初始化的最大迭代次数
    pub max_inner_iter: usize,
    /// 对称NMF收敛容差
    pub inner_tol: f64,
    /// Ridge on Lambda; 0 gives the minimum-norm least-squares coupling
    pub coupling_ridge: f64,
    /// Pin observed entries of Theta to R
    pub preserve_known: bool,
    pub seed: Option<u64>,
    /// Estimated from the data when absent
    pub hyperparameters: Option<Hyperparameters>,
}

impl Default for DensifyConfig {
    fn default() -> Self {
        Self {
            latent_dim1: 2,
            latent_dim2: 2,
            max_outer_iter: 100,
            tol: 1e-5,
            max_inner_iter: 200,
            inner_tol: 1e-6,
            coupling_ridge: 0.0,
            preserve_known: true,
            seed: None,
            hyperparameters: None,
        }
    }
}

impl DensifyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.latent_dim1 == 0 || self.latent_dim2 == 0 {
            return Err(DensifyError::InvalidInput(format!(
                "latent dimensions must be >= 1, got ({}, {})",
                self.latent_dim1, self.latent_dim2
            )));
        }
        if self.max_outer_iter == 0 {
            return Err(DensifyError::InvalidInput(
                "max_outer_iter must be >= 1".to_string(),
            ));
        }
        if !(self.tol > 0.0) || !self.tol.is_finite() {
            return Err(DensifyError::InvalidInput(format!(
                "tol must be finite and > 0, got {}",
                self.tol
            )));
        }
        if !(self.inner_tol >= 0.0) || !self.inner_tol.is_finite() {
            return Err(DensifyError::InvalidInput(format!(
                "inner_tol must be finite and >= 0, got {}",
                self.inner_tol
            )));
        }
        if !(self.coupling_ridge >= 0.0) || !self.coupling_ridge.is_finite() {
            return Err(DensifyError::InvalidInput(format!(
                "coupling_ridge must be finite and >= 0, got {}",
                self.coupling_ridge
            )));
        }
        if let Some(hyper) = &self.hyperparameters {
            hyper.validate()?;
        }
        Ok(())
    }
}

/// Command line configuration
pub struct Config {
    /// 源1相似度 (n_similarities, n1(n1-1)/2)
    d: Array2<f64>,
    /// 源2相似度 (m_similarities, n2(n2-1)/2)
    s: Array2<f64>,
    /// 已知关联 (n1, n2), 0 为未知
    r: Array2<f64>,
    output: PathBuf,
    densify: DensifyConfig,
}

impl Config {
    /// constructor
    ///
    /// # Examples
    /// ```bash
    /// $ cargo run -- data/D.npy data/S.npy data/R.npy theta.npy 4 5 1e-5
    /// ```
    pub fn new(mut args: impl Iterator<Item = String>) -> std::result::Result<Config, Box<dyn Error>> {
        // args:
        // 0: program name
        // 1-3: D, S, R npy paths
        // 4: output path
        // 5, 6: latent dims (optional)
        // 7: tol (optional)
        args.next();
        let d = read_matrix(args.next().ok_or("missing path to D")?)?;
        let s = read_matrix(args.next().ok_or("missing path to S")?)?;
        let r = read_matrix(args.next().ok_or("missing path to R")?)?;
        let output = PathBuf::from(args.next().ok_or("missing output path")?);

        let mut densify = DensifyConfig::default();
        if let Some(dim) = args.next() {
            densify.latent_dim1 = dim.parse::<usize>()?;
        }
        if let Some(dim) = args.next() {
            densify.latent_dim2 = dim.parse::<usize>()?;
        }
        if let Some(tol) = args.next() {
            densify.tol = tol.parse::<f64>()?;
        }
        densify.validate()?;

        Ok(Config {
            d,
            s,
            r,
            output,
            densify,
        })
    }

    pub fn get_d(&self) -> &Array2<f64> {
        &self.d
    }

    pub fn get_s(&self) -> &Array2<f64> {
        &self.s
    }

    pub fn get_r(&self) -> &Array2<f64> {
        &self.r
    }

    pub fn get_output(&self) -> &PathBuf {
        &self.output
    }

    pub fn get_densify(&self) -> &DensifyConfig {
        &self.densify
    }
}

fn read_matrix(path: String) -> std::result::Result<Array2<f64>, Box<dyn Error>> {
    let reader = File::open(&path).map_err(|e| format!("{}: {}", path, e))?;
    Ok(Array2::<f64>::read_npy(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::write_npy;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DensifyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let bad = [
            DensifyConfig {
                latent_dim1: 0,
                ..Default::default()
            },
            DensifyConfig {
                max_outer_iter: 0,
                ..Default::default()
            },
            DensifyConfig {
                tol: 0.0,
                ..Default::default()
            },
            DensifyConfig {
                coupling_ridge: -1.0,
                ..Default::default()
            },
            DensifyConfig {
                hyperparameters: Some(Hyperparameters {
                    lambda1: 1.0,
                    lambda2: 1.0,
                    delta1: 0.0,
                    delta2: 1.0,
                }),
                ..Default::default()
            },
        ];
        for config in bad.iter() {
            assert!(matches!(
                config.validate(),
                Err(DensifyError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_new_config() {
        let dir = std::env::temp_dir().join(format!("gfusion_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let d_path = dir.join("D.npy");
        let s_path = dir.join("S.npy");
        let r_path = dir.join("R.npy");
        write_npy(&d_path, &Array2::<f64>::from_elem((2, 6), 0.5)).unwrap();
        write_npy(&s_path, &Array2::<f64>::from_elem((3, 3), 0.5)).unwrap();
        write_npy(&r_path, &Array2::<f64>::zeros((4, 3))).unwrap();

        let args = vec![
            "target/debug/gfusion".to_string(),
            d_path.to_string_lossy().into_owned(),
            s_path.to_string_lossy().into_owned(),
            r_path.to_string_lossy().into_owned(),
            "theta.npy".to_string(),
            "4".to_string(),
            "5".to_string(),
            "1e-4".to_string(),
        ];
        let config = Config::new(args.into_iter()).unwrap();
        assert_eq!(config.get_d().dim(), (2, 6));
        assert_eq!(config.get_s().dim(), (3, 3));
        assert_eq!(config.get_r().dim(), (4, 3));
        assert_eq!(config.get_output(), &PathBuf::from("theta.npy"));
        assert_eq!(config.get_densify().latent_dim1, 4);
        assert_eq!(config.get_densify().latent_dim2, 5);
        assert_eq!(config.get_densify().tol, 1e-4);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_new_config_missing_args() {
        let args = vec!["target/debug/gfusion".to_string()];
        assert!(Config::new(args.into_iter()).is_err());
    }
}
