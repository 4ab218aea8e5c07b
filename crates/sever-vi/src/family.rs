//! Variational families and the per-variable distribution they parameterize.

use indexmap::IndexMap;
use rand::RngCore;
use rand_distr::{Beta as BetaDist, Distribution as _, Exp, Gamma as GammaDist, Normal};
use sever_autodiff::log_gamma;
use sever_dist::{Distribution, Registry};
use serde::{Deserialize, Serialize};

/// Tag identifying which parametric family a [`VariationalDist`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarFamily {
    /// `Normal(mu, sigma)`.
    Gaussian,
    /// `Gamma(shape, rate)`.
    Gamma,
    /// `Beta(alpha, beta)`.
    Beta,
    /// `Exponential(rate)`.
    Exponential,
    /// A fixed, registry-backed mixture; not gradient-optimized (§4.G).
    Mixture,
}

/// One variable's variational distribution.
///
/// Mean-field families (`Gaussian`/`Gamma`/`Beta`/`Exponential`) carry their
/// numeric parameters directly. `Mixture` is treated as an opaque
/// [`sever_dist::Distribution`] looked up by name in the registry passed to
/// every method here — its own parameters are never updated by
/// [`crate::kernel::ViSolver::update_parameters`].
#[derive(Debug, Clone)]
pub struct VariationalDist {
    family: VarFamily,
    params: IndexMap<String, f64>,
    mixture_distribution_name: Option<String>,
    mixture_params: Vec<f64>,
}

impl VariationalDist {
    /// Constructs a distribution with explicit parameters.
    pub fn new(family: VarFamily, params: IndexMap<String, f64>) -> Self {
        Self {
            family,
            params,
            mixture_distribution_name: None,
            mixture_params: Vec::new(),
        }
    }

    /// Constructs the family's default starting point (§4.G defaults):
    /// gaussian `{mu:0, sigma:1}`, gamma `{shape:1, rate:1}`, beta
    /// `{alpha:1, beta:1}`, exponential `{rate:1}`.
    pub fn default_for(family: VarFamily) -> Self {
        let mut params = IndexMap::new();
        match family {
            VarFamily::Gaussian => {
                params.insert("mu".to_string(), 0.0);
                params.insert("sigma".to_string(), 1.0);
            }
            VarFamily::Gamma => {
                params.insert("shape".to_string(), 1.0);
                params.insert("rate".to_string(), 1.0);
            }
            VarFamily::Beta => {
                params.insert("alpha".to_string(), 1.0);
                params.insert("beta".to_string(), 1.0);
            }
            VarFamily::Exponential => {
                params.insert("rate".to_string(), 1.0);
            }
            VarFamily::Mixture => {}
        }
        Self {
            family,
            params,
            mixture_distribution_name: None,
            mixture_params: Vec::new(),
        }
    }

    /// Binds a `Mixture` family to a named registry distribution and its
    /// positional parameter list (see
    /// [`sever_dist::registry::Registry::create_example_distributions`] for
    /// the `gaussian_mixture` built-in, which expects
    /// `[w1, mu1, sigma1, mu2, sigma2]`).
    pub fn with_mixture_distribution(mut self, name: impl Into<String>, params: Vec<f64>) -> Self {
        self.mixture_distribution_name = Some(name.into());
        self.mixture_params = params;
        self
    }

    /// The family tag.
    pub fn family(&self) -> VarFamily {
        self.family
    }

    /// The current numeric parameters (empty for `Mixture`).
    pub fn params(&self) -> &IndexMap<String, f64> {
        &self.params
    }

    /// Overwrites a single parameter's value.
    pub fn set_param(&mut self, name: &str, value: f64) {
        if let Some(slot) = self.params.get_mut(name) {
            *slot = value;
        }
    }

    /// Draws one sample from the current distribution.
    pub fn sample(&self, rng: &mut dyn RngCore, registry: &Registry) -> f64 {
        match self.family {
            VarFamily::Gaussian => {
                let mu = self.params["mu"];
                let sigma = self.params["sigma"].max(1e-9);
                Normal::new(mu, sigma).expect("sigma validated positive").sample(rng)
            }
            VarFamily::Gamma => {
                let shape = self.params["shape"].max(1e-9);
                let rate = self.params["rate"].max(1e-9);
                GammaDist::new(shape, 1.0 / rate)
                    .expect("shape/rate validated positive")
                    .sample(rng)
            }
            VarFamily::Beta => {
                let alpha = self.params["alpha"].max(1e-9);
                let beta = self.params["beta"].max(1e-9);
                BetaDist::new(alpha, beta)
                    .expect("alpha/beta validated positive")
                    .sample(rng)
            }
            VarFamily::Exponential => {
                let rate = self.params["rate"].max(1e-9);
                Exp::new(rate).expect("rate validated positive").sample(rng)
            }
            VarFamily::Mixture => self
                .mixture_dist(registry)
                .sample
                .map_or(0.0, |f| f(rng, &self.mixture_params)),
        }
    }

    /// Log-density of `x` under the current distribution.
    pub fn log_prob(&self, x: f64, registry: &Registry) -> f64 {
        match self.family {
            VarFamily::Gaussian => {
                let mu = self.params["mu"];
                let sigma = self.params["sigma"].max(1e-9);
                let z = (x - mu) / sigma;
                -0.5 * z * z - sigma.ln() - 0.5 * (2.0 * std::f64::consts::PI).ln()
            }
            VarFamily::Gamma => {
                let shape = self.params["shape"].max(1e-9);
                let rate = self.params["rate"].max(1e-9);
                if x <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                shape * rate.ln() - log_gamma(shape) + (shape - 1.0) * x.ln() - rate * x
            }
            VarFamily::Beta => {
                let alpha = self.params["alpha"].max(1e-9);
                let beta = self.params["beta"].max(1e-9);
                if !(0.0..=1.0).contains(&x) {
                    return f64::NEG_INFINITY;
                }
                (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln()
                    - log_beta(alpha, beta)
            }
            VarFamily::Exponential => {
                let rate = self.params["rate"].max(1e-9);
                if x < 0.0 {
                    return f64::NEG_INFINITY;
                }
                rate.ln() - rate * x
            }
            VarFamily::Mixture => (self.mixture_dist(registry).log_prob)(x, &self.mixture_params),
        }
    }

    /// Differential entropy, closed-form per family (Glossary "Entropy");
    /// `Mixture` has no closed form and is estimated via Monte Carlo over
    /// `sample_size` draws from the opaque registry distribution.
    pub fn entropy(&self, registry: &Registry, rng: &mut dyn RngCore, sample_size: usize) -> f64 {
        match self.family {
            VarFamily::Gaussian => {
                let sigma = self.params["sigma"].max(1e-9);
                0.5 * (2.0 * std::f64::consts::PI * std::f64::consts::E * sigma * sigma).ln()
            }
            VarFamily::Exponential => {
                let rate = self.params["rate"].max(1e-9);
                1.0 - rate.ln()
            }
            VarFamily::Gamma => {
                let shape = self.params["shape"].max(1e-9);
                let rate = self.params["rate"].max(1e-9);
                shape - rate.ln() + log_gamma(shape) + (1.0 - shape) * digamma(shape)
            }
            VarFamily::Beta => {
                let alpha = self.params["alpha"].max(1e-9);
                let beta = self.params["beta"].max(1e-9);
                log_beta(alpha, beta)
                    - (alpha - 1.0) * digamma(alpha)
                    - (beta - 1.0) * digamma(beta)
                    + (alpha + beta - 2.0) * digamma(alpha + beta)
            }
            VarFamily::Mixture => {
                let dist = self.mixture_dist(registry);
                let n = sample_size.max(1);
                let mut acc = 0.0;
                for _ in 0..n {
                    let x = dist.sample.map_or(0.0, |f| f(rng, &self.mixture_params));
                    acc -= (dist.log_prob)(x, &self.mixture_params);
                }
                acc / n as f64
            }
        }
    }

    fn mixture_dist<'a>(&self, registry: &'a Registry) -> &'a Distribution {
        let name = self
            .mixture_distribution_name
            .as_deref()
            .expect("mixture family requires with_mixture_distribution");
        registry
            .get(name)
            .unwrap_or_else(|| panic!("mixture distribution '{name}' not found in registry"))
    }
}

/// Finite-difference digamma, matching the technique `sever-autodiff` uses
/// internally for the gamma log-density gradient.
fn digamma(x: f64) -> f64 {
    let h = 1e-6;
    (log_gamma(x + h) - log_gamma(x - h)) / (2.0 * h)
}

fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn gaussian_defaults_match_spec_table() {
        let dist = VariationalDist::default_for(VarFamily::Gaussian);
        assert_eq!(dist.params()["mu"], 0.0);
        assert_eq!(dist.params()["sigma"], 1.0);
    }

    #[test]
    fn gaussian_entropy_matches_closed_form() {
        let mut params = IndexMap::new();
        params.insert("mu".to_string(), 0.0);
        params.insert("sigma".to_string(), 2.0);
        let dist = VariationalDist::new(VarFamily::Gaussian, params);
        let registry = Registry::new();
        let mut rng = StdRng::seed_from_u64(0);
        let expected = 0.5 * (2.0 * std::f64::consts::PI * std::f64::consts::E * 4.0).ln();
        assert!((dist.entropy(&registry, &mut rng, 10) - expected).abs() < 1e-9);
    }

    #[test]
    fn exponential_log_prob_matches_closed_form() {
        let mut params = IndexMap::new();
        params.insert("rate".to_string(), 2.0);
        let dist = VariationalDist::new(VarFamily::Exponential, params);
        let registry = Registry::new();
        let expected = (2.0_f64).ln() - 2.0 * 0.5;
        assert!((dist.log_prob(0.5, &registry) - expected).abs() < 1e-9);
        assert_eq!(dist.log_prob(-1.0, &registry), f64::NEG_INFINITY);
    }

    #[test]
    fn beta_entropy_is_symmetric_for_equal_params() {
        let mut params = IndexMap::new();
        params.insert("alpha".to_string(), 3.0);
        params.insert("beta".to_string(), 3.0);
        let dist = VariationalDist::new(VarFamily::Beta, params);
        let registry = Registry::new();
        let mut rng = StdRng::seed_from_u64(0);
        let entropy = dist.entropy(&registry, &mut rng, 10);
        assert!(entropy.is_finite());
    }
}
