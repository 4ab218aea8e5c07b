//! Configuration schema for the Hamiltonian Monte Carlo sampler.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::kernel::HmcSampler`], per spec §4.F. Every
/// field carries its own `#[serde(default = "...")]`, matching
/// `asm_mcmc::config::RunConfig`'s per-field default-function pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmcConfig {
    /// Initial leapfrog step size `epsilon`.
    #[serde(default = "default_initial_step_size")]
    pub initial_step_size: f64,
    /// Number of leapfrog steps per iteration.
    #[serde(default = "default_num_leapfrog_steps")]
    pub num_leapfrog_steps: usize,
    /// Whether to adapt `epsilon` based on observed acceptance probability.
    #[serde(default = "default_adapt_step_size")]
    pub adapt_step_size: bool,
    /// Number of iterations over which step-size adaptation is applied.
    #[serde(default = "default_adaptation_window")]
    pub adaptation_window: usize,
    /// Reserved: per-parameter mass-matrix adaptation toggle (diagonal
    /// mass is always supported; adaptive mass estimation is not
    /// implemented by this component).
    #[serde(default)]
    pub mass_adaptation: bool,
    /// PRNG seed; `None` derives one from the current time.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_initial_step_size() -> f64 {
    0.1
}

fn default_num_leapfrog_steps() -> usize {
    10
}

fn default_adapt_step_size() -> bool {
    true
}

fn default_adaptation_window() -> usize {
    500
}

impl Default for HmcConfig {
    fn default() -> Self {
        Self {
            initial_step_size: default_initial_step_size(),
            num_leapfrog_steps: default_num_leapfrog_steps(),
            adapt_step_size: default_adapt_step_size(),
            adaptation_window: default_adaptation_window(),
            mass_adaptation: false,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = HmcConfig::default();
        assert_eq!(cfg.initial_step_size, 0.1);
        assert_eq!(cfg.num_leapfrog_steps, 10);
        assert!(cfg.adapt_step_size);
        assert_eq!(cfg.adaptation_window, 500);
        assert!(!cfg.mass_adaptation);
    }
}
