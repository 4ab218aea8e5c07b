//! Monte Carlo evidence lower bound (ELBO) estimation.

use indexmap::IndexMap;
use rand::RngCore;
use sever_dist::Registry;

use crate::family::VariationalDist;

/// Estimates the ELBO of a mean-field joint `variables` against
/// `log_prob_fn` (§4.G "ELBO estimation"):
///
/// `ELBO ~= (1/sample_size) * sum_i log_prob_fn(x_i) + sum_v entropy(v)`
///
/// where each `x_i` is an independent draw from the full mean-field joint
/// and the entropy term is the closed-form (or Monte Carlo, for a
/// `Mixture` family) entropy of each variable's current distribution.
pub fn compute_elbo<F, C>(
    variables: &IndexMap<String, VariationalDist>,
    registry: &Registry,
    rng: &mut dyn RngCore,
    sample_size: usize,
    log_prob_fn: &F,
    context: &C,
) -> f64
where
    F: Fn(&IndexMap<String, f64>, &C) -> f64,
{
    let n = sample_size.max(1);
    let mut expected_log_prob = 0.0;
    for _ in 0..n {
        let sample: IndexMap<String, f64> = variables
            .iter()
            .map(|(name, dist)| (name.clone(), dist.sample(rng, registry)))
            .collect();
        expected_log_prob += log_prob_fn(&sample, context);
    }
    expected_log_prob /= n as f64;

    let entropy_sum: f64 = variables
        .values()
        .map(|dist| dist.entropy(registry, rng, n))
        .sum();

    expected_log_prob + entropy_sum
}
