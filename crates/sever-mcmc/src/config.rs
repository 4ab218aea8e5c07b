//! Configuration schema for the Metropolis-Hastings sampler.

use serde::{Deserialize, Serialize};

/// Which Metropolis variant the sampler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MhMethod {
    /// Fixed isotropic-Gaussian proposal scale.
    MetropolisHastings,
    /// Proposal scale derived from the empirical variance of past samples.
    AdaptiveMetropolis,
    /// Declared but not implemented by this component; `sample` returns `NotImplemented`.
    Gibbs,
    /// Declared but not implemented by this component; `sample` returns `NotImplemented`.
    Hamiltonian,
    /// Declared but not implemented by this component; `sample` returns `NotImplemented`.
    Nuts,
    /// Declared but not implemented by this component; `sample` returns `NotImplemented`.
    Slice,
}

/// Configuration for [`crate::kernel::MhSampler`], per spec §4.E's table.
/// Every field carries its own `#[serde(default = "...")]` (matching
/// `asm_mcmc::config::RunConfig`'s per-field default-function pattern)
/// so a caller may supply a partial configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MhConfig {
    /// Which sampling method to run.
    #[serde(default = "default_method")]
    pub method: MhMethod,
    /// Samples retained after burn-in.
    #[serde(default = "default_num_samples")]
    pub num_samples: usize,
    /// Discarded initial iterations.
    #[serde(default = "default_burnin")]
    pub burnin: usize,
    /// Keep every `thin`-th sample after burn-in.
    #[serde(default = "default_thin")]
    pub thin: usize,
    /// Initial proposal scale.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Target acceptance rate used by step-size adaptation.
    #[serde(default = "default_target_accept_rate")]
    pub target_accept_rate: f64,
    /// Whether to adapt `step_size` during burn-in.
    #[serde(default = "default_adapt_step_size")]
    pub adapt_step_size: bool,
    /// Number of independent chains.
    #[serde(default = "default_parallel_chains")]
    pub parallel_chains: usize,
    /// PRNG seed; `None` derives one from the current time.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_method() -> MhMethod {
    MhMethod::MetropolisHastings
}

fn default_num_samples() -> usize {
    1000
}

fn default_burnin() -> usize {
    100
}

fn default_thin() -> usize {
    1
}

fn default_step_size() -> f64 {
    0.1
}

fn default_target_accept_rate() -> f64 {
    0.234
}

fn default_adapt_step_size() -> bool {
    true
}

fn default_parallel_chains() -> usize {
    1
}

impl Default for MhConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            num_samples: default_num_samples(),
            burnin: default_burnin(),
            thin: default_thin(),
            step_size: default_step_size(),
            target_accept_rate: default_target_accept_rate(),
            adapt_step_size: default_adapt_step_size(),
            parallel_chains: default_parallel_chains(),
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_table() {
        let cfg = MhConfig::default();
        assert_eq!(cfg.method, MhMethod::MetropolisHastings);
        assert_eq!(cfg.num_samples, 1000);
        assert_eq!(cfg.burnin, 100);
        assert_eq!(cfg.thin, 1);
        assert_eq!(cfg.step_size, 0.1);
        assert_eq!(cfg.target_accept_rate, 0.234);
        assert!(cfg.adapt_step_size);
        assert_eq!(cfg.parallel_chains, 1);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn partial_json_fills_remaining_defaults() {
        let json = r#"{"num_samples": 5000, "seed": 42}"#;
        let cfg: MhConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.num_samples, 5000);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.burnin, 100);
        assert_eq!(cfg.step_size, 0.1);
    }
}
