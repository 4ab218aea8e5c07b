//! Exact per-sample score-function gradients of `log q(x; theta)`, used by
//! [`crate::kernel::ViSolver`]'s autodiff gradient path as an alternative to
//! central finite differences (§4.G "Adjacency to HMC", §9).
//!
//! For `Gaussian` and `Gamma` the gradient is obtained by building a tiny
//! `sever_autodiff::Graph` around the matching composite log-density
//! primitive and calling `backward`. `Beta` and `Exponential` have no
//! composite primitive in `sever-autodiff`, so their gradient is the
//! closed-form derivative of the same formula `VariationalDist::log_prob`
//! evaluates — exact, just not autodiff-derived. `Mixture` is never
//! gradient-optimized and contributes no entries.
//!
//! The resulting `d(log q)/d(theta)` feeds the score-function (REINFORCE)
//! estimator: `grad_theta ELBO ~= E_q[ d(log q)/d(theta) * (logp(x) - log q(x)) ]`.

use indexmap::IndexMap;
use sever_autodiff::Graph;
use sever_dist::Registry;

use crate::family::{VarFamily, VariationalDist};

/// Computes `d(log q(x; theta))/d(theta)` for every parameter of `dist` at
/// a single sample `x`.
pub fn log_q_gradient(dist: &VariationalDist, x: f64) -> IndexMap<String, f64> {
    let mut out = IndexMap::new();
    match dist.family() {
        VarFamily::Gaussian => {
            let mu = dist.params()["mu"];
            let sigma = dist.params()["sigma"].max(1e-9);
            let mut graph = Graph::new();
            let xn = graph.variable("x", x);
            let mun = graph.variable("mu", mu);
            let sn = graph.variable("sigma", sigma);
            let root = graph.normal_log_prob(xn, mun, sn);
            graph.backward(root);
            out.insert("mu".to_string(), graph.grad_of("mu").unwrap_or(0.0));
            out.insert("sigma".to_string(), graph.grad_of("sigma").unwrap_or(0.0));
        }
        VarFamily::Gamma => {
            let shape = dist.params()["shape"].max(1e-9);
            let rate = dist.params()["rate"].max(1e-9);
            let mut graph = Graph::new();
            let xn = graph.variable("x", x.max(1e-12));
            let an = graph.variable("shape", shape);
            let bn = graph.variable("rate", rate);
            let root = graph.gamma_log_prob(xn, an, bn);
            graph.backward(root);
            out.insert("shape".to_string(), graph.grad_of("shape").unwrap_or(0.0));
            out.insert("rate".to_string(), graph.grad_of("rate").unwrap_or(0.0));
        }
        VarFamily::Exponential => {
            let rate = dist.params()["rate"].max(1e-9);
            out.insert("rate".to_string(), 1.0 / rate - x);
        }
        VarFamily::Beta => {
            let alpha = dist.params()["alpha"].max(1e-9);
            let beta = dist.params()["beta"].max(1e-9);
            let xc = x.clamp(1e-9, 1.0 - 1e-9);
            let d_ab = digamma(alpha + beta);
            out.insert(
                "alpha".to_string(),
                xc.ln() - digamma(alpha) + d_ab,
            );
            out.insert(
                "beta".to_string(),
                (1.0 - xc).ln() - digamma(beta) + d_ab,
            );
        }
        VarFamily::Mixture => {}
    }
    out
}

fn digamma(x: f64) -> f64 {
    let h = 1e-6;
    (sever_autodiff::log_gamma(x + h) - sever_autodiff::log_gamma(x - h)) / (2.0 * h)
}

/// Averages the score-function estimator across `sample_size` fresh draws
/// from `dist` (held fixed) against a registry (used only by `Mixture`,
/// which this function ignores since it never contributes a gradient).
pub fn estimate_gradient<F, C>(
    dist: &VariationalDist,
    _registry: &Registry,
    rng: &mut dyn rand::RngCore,
    sample_size: usize,
    weight_fn: &F,
    context: &C,
) -> IndexMap<String, f64>
where
    F: Fn(f64, &C) -> f64,
{
    let n = sample_size.max(1);
    let mut accum: IndexMap<String, f64> = IndexMap::new();
    for _ in 0..n {
        let x = dist.sample(rng, _registry);
        let weight = weight_fn(x, context) - dist.log_prob(x, _registry);
        for (name, grad) in log_q_gradient(dist, x) {
            *accum.entry(name).or_insert(0.0) += grad * weight;
        }
    }
    for value in accum.values_mut() {
        *value /= n as f64;
    }
    accum
}
