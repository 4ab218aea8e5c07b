//! Configuration schema for the variational inference solver.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::kernel::ViSolver`], per spec §4.G. Every
/// field carries its own `#[serde(default = "...")]`, matching
/// `asm_mcmc::config::RunConfig`'s per-field default-function pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViConfig {
    /// Hard cap on optimization iterations.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Monte Carlo draws per ELBO estimate.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Base learning rate `alpha`.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Multiplicative decay applied to `alpha` after an ELBO improvement.
    #[serde(default = "default_learning_rate_decay")]
    pub learning_rate_decay: f64,
    /// Convergence threshold on `|delta_elbo|`.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Momentum coefficient for the gradient-ascent update.
    #[serde(default = "default_momentum_beta")]
    pub momentum_beta: f64,
    /// PRNG seed; `None` derives one from the current time.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_iterations() -> usize {
    500
}

fn default_sample_size() -> usize {
    100
}

fn default_learning_rate() -> f64 {
    0.1
}

fn default_learning_rate_decay() -> f64 {
    0.99
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_momentum_beta() -> f64 {
    0.9
}

impl Default for ViConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            sample_size: default_sample_size(),
            learning_rate: default_learning_rate(),
            learning_rate_decay: default_learning_rate_decay(),
            tolerance: default_tolerance(),
            momentum_beta: default_momentum_beta(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = ViConfig::default();
        assert_eq!(cfg.max_iterations, 500);
        assert_eq!(cfg.sample_size, 100);
        assert_eq!(cfg.learning_rate, 0.1);
        assert_eq!(cfg.learning_rate_decay, 0.99);
        assert_eq!(cfg.tolerance, 1e-4);
        assert_eq!(cfg.momentum_beta, 0.9);
    }
}
