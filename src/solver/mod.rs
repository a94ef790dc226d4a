pub mod update_rules;

pub mod coupling;
pub mod latent_update;
pub mod reconstruction;
pub mod simplex;
pub mod snmf;
pub mod weights;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-exports for convenience
pub use coupling::solve_coupling;
pub use latent_update::{solve_u, solve_v, update_latent_factor};
pub use reconstruction::{reconstruct, solve_theta};
pub use simplex::simplex_projection;
pub use snmf::{initialize_latent_matrices, SnmfConfig, SnmfResult, SymmetricNmf};
pub use weights::{solve_omega, solve_pi, solve_weight_vector};
