//! # Alternating optimization
//!
//! Minimizes
//!
//! ```text
//! J = ||P_obs(R - U*Lambda*V^T)||^2 + ridge*||Lambda||^2
//!   + lambda1 * sum_i omega_i ||D_i - U*U^T||^2 + lambda2 * sum_j pi_j ||S_j - V*V^T||^2
//!   + delta1 * ||omega||^2 + delta2 * ||pi||^2
//! ```
//!
//! as a small state machine: `Initializing → Iterating → Converged | MaxIterReached`.
//! The configuration is immutable for the whole run and a single [`Iterate`]
//! record carries every mutable quantity between passes.
//!
//! The stopping rule watches the data terms of `J` only (everything but the
//! `delta` weight regularizers).

/*
 * File: /src/optimizer.rs
 * Created Date: Monday, March 10th 2025
 * Author: Zihan
 * -----
 * HISTORY:
 * Date      		By   	Comments
 * ----------		------	---------------------------------------------------------
 */
use std::time::Instant;

use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::association::KnownAssociations;
use crate::config::{DensifyConfig, Hyperparameters};
use crate::error::{ConvergenceWarning, DensifyError, Result};
use crate::similarity::{
    entity_count, squareform, squared_frobenius, validate_similarities,
};
use crate::solver::update_rules::squared_distance;
use crate::solver::{
    initialize_latent_matrices, reconstruct, solve_coupling, solve_omega, solve_pi, solve_theta,
    solve_u, solve_v,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Iterating,
    Converged,
    MaxIterReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    Converged,
    MaxIterReached,
}

/// Mutable state threaded through the passes
#[derive(Debug, Clone)]
pub struct Iterate {
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub lambda: Array2<f64>,
    pub theta: Array2<f64>,
    pub omega: Array1<f64>,
    pub pi: Array1<f64>,
    /// Full objective `J`
    pub objective: f64,
    /// `J` without the weight regularizers; drives the stopping rule
    pub data_objective: f64,
    pub iteration: usize,
}

#[derive(Debug, Clone)]
pub struct DensifyOutcome {
    /// Densified association matrix (n1, n2)
    pub theta: Array2<f64>,
    pub u: Array2<f64>,
    pub v: Array2<f64>,
    pub lambda: Array2<f64>,
    pub omega: Array1<f64>,
    pub pi: Array1<f64>,
    pub hyperparameters: Hyperparameters,
    pub status: ConvergenceStatus,
    pub iterations: usize,
    pub objective_history: Vec<f64>,
    pub warning: Option<ConvergenceWarning>,
}

impl DensifyOutcome {
    pub fn converged(&self) -> bool {
        self.status == ConvergenceStatus::Converged
    }
}

/// `|prev - cur| / max(|prev|, eps)`
pub fn relative_change(prev: f64, cur: f64) -> f64 {
    (prev - cur).abs() / prev.abs().max(f64::EPSILON)
}

/// Phase after a completed pass, given the objective of every pass so far.
pub fn next_phase(history: &[f64], tol: f64, max_outer_iter: usize) -> Phase {
    if let [.., prev, cur] = history {
        if relative_change(*prev, *cur) < tol {
            return Phase::Converged;
        }
    }
    if history.len() >= max_outer_iter {
        Phase::MaxIterReached
    } else {
        Phase::Iterating
    }
}

/// Data-driven regularization strengths.
///
/// `lambda = observed energy of R / mean ||squareform(sim_i)||_F^2` balances the
/// association fit against the similarity fit; `delta = sum ||squareform(sim_i)||_F^2`
/// keeps `a / (2 * delta)` on the scale of the simplex. Degenerate estimates fall
/// back to 1.0.
pub fn estimate_hyperparameters(
    d: ArrayView2<f64>,
    s: ArrayView2<f64>,
    known: &KnownAssociations,
) -> Hyperparameters {
    let energy = known.observed_energy();
    let norms = |sims: ArrayView2<f64>| -> Vec<f64> {
        sims.axis_iter(Axis(0)).map(squared_frobenius).collect()
    };
    let d_norms = norms(d);
    let s_norms = norms(s);

    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len().max(1) as f64;
    let total = |v: &[f64]| v.iter().sum::<f64>();

    Hyperparameters {
        lambda1: positive_or_one(energy / mean(&d_norms)),
        lambda2: positive_or_one(energy / mean(&s_norms)),
        delta1: positive_or_one(total(&d_norms)),
        delta2: positive_or_one(total(&s_norms)),
    }
}

fn positive_or_one(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// `sum_i weights[i] * ||squareform(sims[i]) - F*F^T||_F^2`
fn weighted_similarity_error(
    sims: ArrayView2<f64>,
    weights: ArrayView1<f64>,
    factor: &Array2<f64>,
) -> Result<f64> {
    let sigma = factor.dot(&factor.t());
    let n = factor.nrows();
    let mut total = 0.0;
    for (row, &w) in sims.axis_iter(Axis(0)).zip(weights.iter()) {
        total += w * squared_distance(&squareform(row, n)?, &sigma);
    }
    Ok(total)
}

/// The objective split into its terms
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveTerms {
    /// `||P_obs(R - U*Lambda*V^T)||^2`
    pub fit: f64,
    /// `ridge * ||Lambda||^2`
    pub coupling: f64,
    /// both weighted similarity errors, scaled by lambda1 / lambda2
    pub similarity: f64,
    /// `delta1 * ||omega||^2 + delta2 * ||pi||^2`
    pub weights: f64,
}

impl ObjectiveTerms {
    pub fn total(&self) -> f64 {
        self.data_terms() + self.weights
    }

    pub fn data_terms(&self) -> f64 {
        self.fit + self.coupling + self.similarity
    }
}

/// Objective terms at the given point
pub fn objective(
    d: ArrayView2<f64>,
    s: ArrayView2<f64>,
    known: &KnownAssociations,
    hyper: &Hyperparameters,
    ridge: f64,
    iterate: &Iterate,
) -> Result<ObjectiveTerms> {
    let fit = known.observed_residual(&reconstruct(&iterate.u, &iterate.lambda, &iterate.v)?);
    let coupling = ridge * iterate.lambda.mapv(|x| x * x).sum();
    let side1 = hyper.lambda1 * weighted_similarity_error(d, iterate.omega.view(), &iterate.u)?;
    let side2 = hyper.lambda2 * weighted_similarity_error(s, iterate.pi.view(), &iterate.v)?;
    let weights = hyper.delta1 * iterate.omega.dot(&iterate.omega)
        + hyper.delta2 * iterate.pi.dot(&iterate.pi);
    Ok(ObjectiveTerms {
        fit,
        coupling,
        similarity: side1 + side2,
        weights,
    })
}

/// Alternating-optimization driver
pub struct Densifier {
    config: DensifyConfig,
}

impl Densifier {
    pub fn new(config: DensifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DensifyConfig {
        &self.config
    }

    /// Densify `known` using the similarity collections `d` (side 1) and `s` (side 2).
    pub fn run(
        &self,
        d: ArrayView2<f64>,
        s: ArrayView2<f64>,
        known: &KnownAssociations,
    ) -> Result<DensifyOutcome> {
        let start_time = Instant::now();
        info!(
            "Densifying {}x{} association matrix ({} observed) with {} + {} similarity matrices",
            known.nrows(),
            known.ncols(),
            known.observed_count(),
            d.nrows(),
            s.nrows()
        );

        let mut phase = Phase::Initializing;
        debug!("phase {:?}", phase);
        let (hyper, mut iterate) = self.initialize(d, s, known)?;

        let mut history = Vec::new();
        let mut data_history = Vec::new();
        let mut best: Option<Iterate> = None;
        phase = Phase::Iterating;
        while phase == Phase::Iterating {
            self.step(d, s, known, &hyper, &mut iterate)?;
            history.push(iterate.objective);
            data_history.push(iterate.data_objective);
            if best
                .as_ref()
                .map_or(true, |b| iterate.objective < b.objective)
            {
                best = Some(iterate.clone());
            }
            phase = next_phase(&data_history, self.config.tol, self.config.max_outer_iter);
        }

        let iterations = history.len();
        let (status, chosen, warning) = match phase {
            Phase::Converged => (ConvergenceStatus::Converged, iterate, None),
            _ => {
                let last_relative_change = match data_history.as_slice() {
                    [.., prev, cur] => relative_change(*prev, *cur),
                    _ => f64::INFINITY,
                };
                let warning = ConvergenceWarning {
                    iterations,
                    last_relative_change,
                    tol: self.config.tol,
                };
                warn!("{}; returning the best iterate", warning);
                (
                    ConvergenceStatus::MaxIterReached,
                    best.unwrap_or(iterate),
                    Some(warning),
                )
            }
        };

        info!(
            "Densification {:?} after {} iterations in {:?}, objective {:.6e}",
            status,
            iterations,
            start_time.elapsed(),
            chosen.objective
        );

        Ok(DensifyOutcome {
            theta: chosen.theta,
            u: chosen.u,
            v: chosen.v,
            lambda: chosen.lambda,
            omega: chosen.omega,
            pi: chosen.pi,
            hyperparameters: hyper,
            status,
            iterations,
            objective_history: history,
            warning,
        })
    }

    /// Validate everything, fix the hyperparameters, seed weights and factors.
    fn initialize(
        &self,
        d: ArrayView2<f64>,
        s: ArrayView2<f64>,
        known: &KnownAssociations,
    ) -> Result<(Hyperparameters, Iterate)> {
        self.config.validate()?;
        validate_similarities(d, "D")?;
        validate_similarities(s, "S")?;
        known.validate()?;

        let n1 = known.nrows();
        let n2 = known.ncols();
        let d_entities = entity_count(d.ncols())?;
        if d_entities != n1 {
            return Err(DensifyError::ShapeMismatch(format!(
                "D describes {} entities but R has {} rows",
                d_entities, n1
            )));
        }
        let s_entities = entity_count(s.ncols())?;
        if s_entities != n2 {
            return Err(DensifyError::ShapeMismatch(format!(
                "S describes {} entities but R has {} columns",
                s_entities, n2
            )));
        }

        let hyper = match self.config.hyperparameters {
            Some(hyper) => hyper,
            None => estimate_hyperparameters(d, s, known),
        };
        debug!("hyperparameters: {:?}", hyper);

        let omega = Array1::from_elem(d.nrows(), 1.0 / d.nrows() as f64);
        let pi = Array1::from_elem(s.nrows(), 1.0 / s.nrows() as f64);
        let (u, v) =
            initialize_latent_matrices(d, s, omega.view(), pi.view(), n1, n2, &self.config)?;

        let lambda = solve_coupling(&u, &v, known, self.config.coupling_ridge)?;
        let theta = self.reconstruct_theta(&u, &lambda, &v, known)?;
        Ok((
            hyper,
            Iterate {
                u,
                v,
                lambda,
                theta,
                omega,
                pi,
                objective: f64::INFINITY,
                data_objective: f64::INFINITY,
                iteration: 0,
            },
        ))
    }

    /// One full pass: both weight vectors, both factors, then the coupling and
    /// reconstruction for the new factors. `Lambda` and `Theta` on entry must
    /// belong to the current `U`, `V`, which `initialize` guarantees for the
    /// first pass; `J` is evaluated on a consistent point.
    pub fn step(
        &self,
        d: ArrayView2<f64>,
        s: ArrayView2<f64>,
        known: &KnownAssociations,
        hyper: &Hyperparameters,
        iterate: &mut Iterate,
    ) -> Result<()> {
        iterate.omega = solve_omega(d, &iterate.u, hyper.delta1)?;
        iterate.pi = solve_pi(s, &iterate.v, hyper.delta2)?;

        // both sides step from the same Theta
        let u = solve_u(
            &iterate.theta,
            &iterate.u,
            &iterate.v,
            &iterate.lambda,
            hyper.lambda1,
            d,
            &iterate.omega,
        )?;
        let v = solve_v(
            &iterate.theta,
            &iterate.u,
            &iterate.v,
            &iterate.lambda,
            hyper.lambda2,
            s,
            &iterate.pi,
        )?;
        iterate.u = u;
        iterate.v = v;

        iterate.lambda = solve_coupling(&iterate.u, &iterate.v, known, self.config.coupling_ridge)?;
        iterate.theta = self.reconstruct_theta(&iterate.u, &iterate.lambda, &iterate.v, known)?;

        iterate.iteration += 1;
        let terms = objective(d, s, known, hyper, self.config.coupling_ridge, iterate)?;
        iterate.objective = terms.total();
        iterate.data_objective = terms.data_terms();
        if !iterate.objective.is_finite() {
            return Err(DensifyError::NumericalFailure(format!(
                "objective became non-finite at iteration {}",
                iterate.iteration
            )));
        }
        debug!(
            "iteration {}: objective {:.6e}, omega {:?}, pi {:?}",
            iterate.iteration, iterate.objective, iterate.omega, iterate.pi
        );
        Ok(())
    }

    fn reconstruct_theta(
        &self,
        u: &Array2<f64>,
        lambda: &Array2<f64>,
        v: &Array2<f64>,
        known: &KnownAssociations,
    ) -> Result<Array2<f64>> {
        if self.config.preserve_known {
            solve_theta(u, lambda, v, known)
        } else {
            reconstruct(u, lambda, v)
        }
    }
}
