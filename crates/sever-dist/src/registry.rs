//! The two-layer distribution registry: built-ins plus a custom overlay.

use indexmap::IndexMap;
use rand::RngCore;
use rand_distr::{Bernoulli as RandBernoulli, Distribution as _, Exp, Normal};
use sever_autodiff::{gamma_lp_value, log_gamma, normal_lp_value};

use crate::descriptor::{Distribution, ParamConstraint, ParamSpec, SupportKind};

fn normal_log_prob(x: f64, params: &[f64]) -> f64 {
    normal_lp_value(x, params[0], params[1])
}

fn normal_sample(rng: &mut dyn RngCore, params: &[f64]) -> f64 {
    let dist = Normal::new(params[0], params[1]).expect("validated sigma > 0");
    dist.sample(rng)
}

fn normal_moments(params: &[f64]) -> (f64, f64) {
    (params[0], params[1] * params[1])
}

fn bernoulli_log_prob(x: f64, params: &[f64]) -> f64 {
    let p = params[0];
    if x == 1.0 {
        p.ln()
    } else if x == 0.0 {
        (1.0 - p).ln()
    } else {
        f64::NEG_INFINITY
    }
}

fn bernoulli_sample(rng: &mut dyn RngCore, params: &[f64]) -> f64 {
    let dist = RandBernoulli::new(params[0]).expect("validated p in [0,1]");
    if dist.sample(rng) {
        1.0
    } else {
        0.0
    }
}

fn bernoulli_moments(params: &[f64]) -> (f64, f64) {
    let p = params[0];
    (p, p * (1.0 - p))
}

fn exponential_log_prob(x: f64, params: &[f64]) -> f64 {
    if x < 0.0 {
        return f64::NEG_INFINITY;
    }
    let lambda = params[0];
    lambda.ln() - lambda * x
}

fn exponential_sample(rng: &mut dyn RngCore, params: &[f64]) -> f64 {
    let dist = Exp::new(params[0]).expect("validated rate > 0");
    dist.sample(rng)
}

fn exponential_moments(params: &[f64]) -> (f64, f64) {
    let lambda = params[0];
    (1.0 / lambda, 1.0 / (lambda * lambda))
}

fn normal_descriptor() -> Distribution {
    Distribution {
        name: "normal".to_string(),
        params: vec![
            ParamSpec::new("mu", ParamConstraint::none()),
            ParamSpec::new("sigma", ParamConstraint::positive()),
        ],
        support: SupportKind::RealLine,
        discrete: false,
        exponential_family: true,
        location_scale: true,
        log_prob: normal_log_prob,
        sample: Some(normal_sample),
        moments: Some(normal_moments),
        description: "Normal(mu, sigma): Gaussian on the real line".to_string(),
    }
}

fn bernoulli_descriptor() -> Distribution {
    Distribution {
        name: "bernoulli".to_string(),
        params: vec![ParamSpec::new("p", ParamConstraint::bounded(0.0, 1.0))],
        support: SupportKind::DiscreteSet(vec![0.0, 1.0]),
        discrete: true,
        exponential_family: true,
        location_scale: false,
        log_prob: bernoulli_log_prob,
        sample: Some(bernoulli_sample),
        moments: Some(bernoulli_moments),
        description: "Bernoulli(p): coin flip with support {0, 1}".to_string(),
    }
}

fn exponential_descriptor() -> Distribution {
    Distribution {
        name: "exponential".to_string(),
        params: vec![ParamSpec::new("lambda", ParamConstraint::positive())],
        support: SupportKind::PositiveReal,
        discrete: false,
        exponential_family: true,
        location_scale: false,
        log_prob: exponential_log_prob,
        sample: Some(exponential_sample),
        moments: Some(exponential_moments),
        description: "Exponential(lambda): waiting time on the positive reals".to_string(),
    }
}

fn beta_binomial_log_prob(x: f64, params: &[f64]) -> f64 {
    let (n, alpha, beta) = (params[0], params[1], params[2]);
    if x < 0.0 || x > n || x.fract() != 0.0 {
        return f64::NEG_INFINITY;
    }
    let k = x;
    let log_binom = log_gamma(n + 1.0) - log_gamma(k + 1.0) - log_gamma(n - k + 1.0);
    let log_beta_num = log_beta(k + alpha, n - k + beta);
    let log_beta_den = log_beta(alpha, beta);
    log_binom + log_beta_num - log_beta_den
}

fn log_beta(a: f64, b: f64) -> f64 {
    log_gamma(a) + log_gamma(b) - log_gamma(a + b)
}

fn beta_binomial_descriptor() -> Distribution {
    Distribution {
        name: "beta_binomial".to_string(),
        params: vec![
            ParamSpec::new(
                "n",
                ParamConstraint {
                    positive_only: true,
                    integer_only: true,
                    ..ParamConstraint::none()
                },
            ),
            ParamSpec::new("alpha", ParamConstraint::positive()),
            ParamSpec::new("beta", ParamConstraint::positive()),
        ],
        support: SupportKind::NonNegativeInteger,
        discrete: true,
        exponential_family: false,
        location_scale: false,
        log_prob: beta_binomial_log_prob,
        sample: None,
        moments: None,
        description: "BetaBinomial(n, alpha, beta): binomial with a Beta-distributed success rate"
            .to_string(),
    }
}

fn gaussian_mixture_log_prob(x: f64, params: &[f64]) -> f64 {
    let (w1, mu1, sigma1, mu2, sigma2) = (params[0], params[1], params[2], params[3], params[4]);
    let w2 = 1.0 - w1;
    let lp1 = w1.ln() + normal_lp_value(x, mu1, sigma1);
    let lp2 = w2.ln() + normal_lp_value(x, mu2, sigma2);
    let m = lp1.max(lp2);
    m + ((lp1 - m).exp() + (lp2 - m).exp()).ln()
}

fn gaussian_mixture_descriptor() -> Distribution {
    Distribution {
        name: "gaussian_mixture".to_string(),
        params: vec![
            ParamSpec::new("w1", ParamConstraint::bounded(0.0, 1.0)),
            ParamSpec::new("mu1", ParamConstraint::none()),
            ParamSpec::new("sigma1", ParamConstraint::positive()),
            ParamSpec::new("mu2", ParamConstraint::none()),
            ParamSpec::new("sigma2", ParamConstraint::positive()),
        ],
        support: SupportKind::RealLine,
        discrete: false,
        exponential_family: false,
        location_scale: false,
        log_prob: gaussian_mixture_log_prob,
        sample: None,
        moments: None,
        description: "GaussianMixture(w1, mu1, sigma1, mu2, sigma2): two-component Gaussian mixture"
            .to_string(),
    }
}

fn student_t_log_prob(x: f64, params: &[f64]) -> f64 {
    let (nu, mu, sigma) = (params[0], params[1], params[2]);
    let z = (x - mu) / sigma;
    log_gamma((nu + 1.0) / 2.0) - log_gamma(nu / 2.0) - 0.5 * (nu * std::f64::consts::PI).ln()
        - sigma.ln()
        - (nu + 1.0) / 2.0 * (1.0 + z * z / nu).ln()
}

fn student_t_descriptor() -> Distribution {
    Distribution {
        name: "student_t".to_string(),
        params: vec![
            ParamSpec::new("nu", ParamConstraint::positive()),
            ParamSpec::new("mu", ParamConstraint::none()),
            ParamSpec::new("sigma", ParamConstraint::positive()),
        ],
        support: SupportKind::RealLine,
        discrete: false,
        exponential_family: false,
        location_scale: true,
        log_prob: student_t_log_prob,
        sample: None,
        moments: None,
        description: "StudentT(nu, mu, sigma): heavy-tailed location-scale family".to_string(),
    }
}

/// Dirichlet's log-density is exposed over its first marginal (a Beta
/// distribution with `alpha = params[0]`, `beta = sum(params[1..])`),
/// since this registry's `log_prob` signature is scalar-`x` throughout and
/// Dirichlet's natural domain is the simplex. See DESIGN.md.
fn dirichlet_log_prob(x: f64, params: &[f64]) -> f64 {
    let alpha = params[0];
    let beta: f64 = params[1..].iter().sum();
    if !(0.0..=1.0).contains(&x) {
        return f64::NEG_INFINITY;
    }
    (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln() - log_beta(alpha, beta)
}

fn dirichlet_descriptor() -> Distribution {
    Distribution {
        name: "dirichlet".to_string(),
        params: vec![
            ParamSpec::new("alpha1", ParamConstraint::positive()),
            ParamSpec::new("alpha2", ParamConstraint::positive()),
            ParamSpec::new("alpha3", ParamConstraint::positive()),
        ],
        support: SupportKind::Simplex(3),
        discrete: false,
        exponential_family: true,
        location_scale: false,
        log_prob: dirichlet_log_prob,
        sample: None,
        moments: None,
        description:
            "Dirichlet(alpha1, alpha2, alpha3): concentration over the 3-category simplex, exposed by its first marginal"
                .to_string(),
    }
}

/// Two-layer registry of distribution descriptors.
///
/// Lookup checks the `custom` layer first, then falls back to the
/// fixed `builtin` layer (§4.D). Registering a custom name a second time
/// replaces the prior entry.
#[derive(Clone)]
pub struct Registry {
    builtin: IndexMap<String, Distribution>,
    custom: IndexMap<String, Distribution>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates a registry seeded with the three hard-coded built-ins.
    pub fn new() -> Self {
        let mut builtin = IndexMap::new();
        for d in [
            normal_descriptor(),
            bernoulli_descriptor(),
            exponential_descriptor(),
        ] {
            builtin.insert(d.name.clone(), d);
        }
        Self {
            builtin,
            custom: IndexMap::new(),
        }
    }

    /// Registers (or replaces) a custom distribution.
    pub fn register(&mut self, dist: Distribution) {
        self.custom.insert(dist.name.clone(), dist);
    }

    /// Looks up a distribution by name, custom layer first.
    pub fn get(&self, name: &str) -> Option<&Distribution> {
        self.custom.get(name).or_else(|| self.builtin.get(name))
    }

    /// Whether a distribution with this name is known, in either layer.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Validates a positional parameter list for a named distribution.
    /// Returns `false` for an unknown name, missing/extra parameters, a
    /// constraint violation, or a non-finite value.
    pub fn validate(&self, name: &str, params: &[f64]) -> bool {
        match self.get(name) {
            Some(dist) => dist.validate(params),
            None => false,
        }
    }

    /// Names of every built-in distribution.
    pub fn list_builtin(&self) -> Vec<&str> {
        self.builtin.keys().map(String::as_str).collect()
    }

    /// Names of every custom-registered distribution.
    pub fn list_custom(&self) -> Vec<&str> {
        self.custom.keys().map(String::as_str).collect()
    }

    /// Seeds the custom layer with a fixed demonstration set: BetaBinomial,
    /// GaussianMixture, StudentT, Dirichlet.
    pub fn create_example_distributions(&mut self) {
        self.register(beta_binomial_descriptor());
        self.register(gaussian_mixture_descriptor());
        self.register(student_t_descriptor());
        self.register(dirichlet_descriptor());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup_works_without_registration() {
        let reg = Registry::new();
        assert!(reg.has("normal"));
        assert!(reg.has("bernoulli"));
        assert!(reg.has("exponential"));
        assert!(!reg.has("nonexistent"));
    }

    #[test]
    fn custom_layer_shadows_builtin_of_same_name() {
        let mut reg = Registry::new();
        let mut shadow = normal_descriptor();
        shadow.description = "shadowed".to_string();
        reg.register(shadow);
        assert_eq!(reg.get("normal").unwrap().description, "shadowed");
    }

    #[test]
    fn validate_rejects_unknown_parameter_count() {
        let reg = Registry::new();
        assert!(!reg.validate("normal", &[0.0]));
        assert!(reg.validate("normal", &[0.0, 1.0]));
    }

    #[test]
    fn validate_rejects_constraint_violations() {
        let reg = Registry::new();
        assert!(!reg.validate("normal", &[0.0, -1.0])); // sigma must be positive
        assert!(!reg.validate("bernoulli", &[1.5])); // out of [0,1]
        assert!(!reg.validate("exponential", &[-0.1])); // lambda must be positive
        assert!(!reg.validate("unknown_dist", &[1.0]));
    }

    #[test]
    fn validate_rejects_nan_and_infinite_values() {
        let reg = Registry::new();
        assert!(!reg.validate("normal", &[0.0, f64::NAN]));
        assert!(!reg.validate("normal", &[0.0, f64::INFINITY]));
    }

    #[test]
    fn example_distributions_are_registered_under_fixed_names() {
        let mut reg = Registry::new();
        reg.create_example_distributions();
        for name in ["beta_binomial", "gaussian_mixture", "student_t", "dirichlet"] {
            assert!(reg.has(name), "missing example distribution {name}");
        }
        assert_eq!(reg.list_custom().len(), 4);
    }

    #[test]
    fn normal_log_prob_matches_known_value() {
        let reg = Registry::new();
        let dist = reg.get("normal").unwrap();
        let lp = (dist.log_prob)(1.0, &[0.0, 1.0]);
        assert!((lp - (-1.4189385)).abs() < 1e-6);
    }

    #[test]
    fn bernoulli_log_prob_matches_closed_form() {
        let reg = Registry::new();
        let dist = reg.get("bernoulli").unwrap();
        assert!(((dist.log_prob)(1.0, &[0.3]) - 0.3_f64.ln()).abs() < 1e-10);
        assert!(((dist.log_prob)(0.0, &[0.3]) - 0.7_f64.ln()).abs() < 1e-10);
    }

    #[test]
    fn beta_binomial_rejects_out_of_range_counts() {
        let reg = {
            let mut r = Registry::new();
            r.create_example_distributions();
            r
        };
        let dist = reg.get("beta_binomial").unwrap();
        assert_eq!((dist.log_prob)(-1.0, &[5.0, 1.0, 1.0]), f64::NEG_INFINITY);
        assert_eq!((dist.log_prob)(6.0, &[5.0, 1.0, 1.0]), f64::NEG_INFINITY);
    }
}
