//! Accumulates declared random variables and normalizes them into a
//! single log-density program (§4.I).
//!
//! The shape follows the teacher's accumulate-then-`build()`-and-validate
//! pipeline: callers call [`ModelBuilder::observe`], [`ModelBuilder::latent`],
//! and [`ModelBuilder::mixture`] in any order to accumulate declarations,
//! then [`ModelBuilder::build`] normalizes and validates the whole model
//! in one pass, surfacing every structural problem as
//! [`SeverError::InvalidModel`] rather than failing lazily mid-evaluation.

use std::collections::HashMap;

use indexmap::IndexMap;
use sever_autodiff::{eval_expr, Graph};
use sever_core::errors::ErrorInfo;
use sever_core::SeverError;
use sever_dist::{Mixture, MixtureComponent, Registry};
use sever_expr::{Expr, Lit, OperatorKind};

#[derive(Debug, Clone)]
enum Declaration {
    Observe {
        distribution: String,
        params: Vec<Expr>,
        value: Option<f64>,
    },
    Latent {
        distribution: String,
        params: Vec<Expr>,
    },
    Mixture {
        components: Mixture,
        params: Vec<Expr>,
    },
}

/// Accumulates named random-variable declarations, then normalizes them
/// into a [`LoweredModel`] against a [`Registry`].
#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    declarations: IndexMap<String, Declaration>,
}

impl ModelBuilder {
    /// An empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a fixed observation `name ~ distribution(params)`, scored
    /// at `value`. Passing `None` for `value` is permitted at declaration
    /// time (e.g. a placeholder filled in later) but [`Self::build`] fails
    /// with `InvalidModel` if it is still absent when the model is built.
    pub fn observe(
        &mut self,
        name: impl Into<String>,
        distribution: impl Into<String>,
        params: Vec<Expr>,
        value: Option<f64>,
    ) -> &mut Self {
        self.declarations.insert(
            name.into(),
            Declaration::Observe {
                distribution: distribution.into(),
                params,
                value,
            },
        );
        self
    }

    /// Declares a free latent variable `name ~ distribution(params)`,
    /// scored at whatever value the caller's context map supplies for
    /// `name` when the model is evaluated.
    pub fn latent(
        &mut self,
        name: impl Into<String>,
        distribution: impl Into<String>,
        params: Vec<Expr>,
    ) -> &mut Self {
        self.declarations.insert(
            name.into(),
            Declaration::Latent {
                distribution: distribution.into(),
                params,
            },
        );
        self
    }

    /// Declares a latent mixture variable over named component
    /// distributions, all sharing `params` (§4.D "Mixture constructor").
    /// Weight validation (`EmptyMixture`/`InvalidWeight`/
    /// `WeightsNotNormalized`) happens immediately.
    pub fn mixture(
        &mut self,
        name: impl Into<String>,
        components: Vec<MixtureComponent>,
        params: Vec<Expr>,
    ) -> Result<&mut Self, SeverError> {
        let mixture = Mixture::new(components)?;
        self.declarations
            .insert(name.into(), Declaration::Mixture { components: mixture, params });
        Ok(self)
    }

    /// Normalizes the accumulated declarations against `registry`,
    /// validating every referenced distribution and parent variable, and
    /// produces a [`LoweredModel`].
    ///
    /// Fails with `InvalidModel` when: the model has no declarations; an
    /// `observe` site has no value; a declared distribution name is
    /// unknown to `registry`; a mixture component's distribution name is
    /// unknown; or a parameter expression references a variable that was
    /// never declared in this model (a missing parent) or uses a node
    /// kind this evaluator does not support.
    pub fn build(&self, registry: &Registry) -> Result<LoweredModel, SeverError> {
        if self.declarations.is_empty() {
            return Err(SeverError::InvalidModel(ErrorInfo::new(
                "LW001",
                "model has no declared variables",
            )));
        }

        for (name, decl) in &self.declarations {
            match decl {
                Declaration::Observe { distribution, params, value } => {
                    require_known(registry, distribution, name)?;
                    if value.is_none() {
                        return Err(SeverError::InvalidModel(
                            ErrorInfo::new("LW002", format!("observe '{name}' has no value"))
                                .with_context("variable", name),
                        ));
                    }
                    for param in params {
                        validate_param_expr(param, &self.declarations, name)?;
                    }
                }
                Declaration::Latent { distribution, params } => {
                    require_known(registry, distribution, name)?;
                    for param in params {
                        validate_param_expr(param, &self.declarations, name)?;
                    }
                }
                Declaration::Mixture { components, params } => {
                    for component in components.components() {
                        require_known(registry, &component.distribution_name, name)?;
                    }
                    for param in params {
                        validate_param_expr(param, &self.declarations, name)?;
                    }
                }
            }
        }

        Ok(LoweredModel {
            declarations: self.declarations.clone(),
            registry: registry.clone(),
        })
    }
}

fn require_known(registry: &Registry, distribution: &str, site: &str) -> Result<(), SeverError> {
    if registry.has(distribution) {
        Ok(())
    } else {
        Err(SeverError::InvalidModel(
            ErrorInfo::new(
                "LW003",
                format!("variable '{site}' references unknown distribution '{distribution}'"),
            )
            .with_context("variable", site)
            .with_context("distribution", distribution),
        ))
    }
}

fn validate_param_expr(
    expr: &Expr,
    declarations: &IndexMap<String, Declaration>,
    site: &str,
) -> Result<(), SeverError> {
    match expr {
        Expr::Literal(Lit::Int(_) | Lit::Float(_) | Lit::Bool(_)) => Ok(()),
        Expr::Variable(name) => {
            if declarations.contains_key(name) {
                Ok(())
            } else {
                Err(SeverError::InvalidModel(
                    ErrorInfo::new(
                        "LW004",
                        format!("variable '{site}' references undeclared parent '{name}'"),
                    )
                    .with_context("variable", site)
                    .with_context("parent", name),
                ))
            }
        }
        Expr::Operator { args, .. } => {
            args.iter().try_for_each(|a| validate_param_expr(a, declarations, site))
        }
        Expr::Call { name, args } => {
            if matches!(name.as_str(), "log" | "exp" | "sin" | "cos" | "sqrt") {
                args.iter().try_for_each(|a| validate_param_expr(a, declarations, site))
            } else {
                Err(unsupported_param(site))
            }
        }
        _ => Err(unsupported_param(site)),
    }
}

fn unsupported_param(site: &str) -> SeverError {
    SeverError::InvalidModel(
        ErrorInfo::new(
            "LW005",
            format!("variable '{site}' has a parameter expression this evaluator cannot handle"),
        )
        .with_hint("parameter expressions may only use literals, variables, arithmetic, and log/exp/sin/cos/sqrt calls"),
    )
}

/// The normalized output of [`ModelBuilder::build`]: a validated set of
/// declarations ready to be evaluated as a log-density or differentiated
/// through [`sever_autodiff`].
#[derive(Clone)]
pub struct LoweredModel {
    declarations: IndexMap<String, Declaration>,
    registry: Registry,
}

impl LoweredModel {
    /// Returns a plain log-density callable matching §6's MH/VI contract:
    /// `(params_map, context) -> logp`. `params_map` supplies the current
    /// value of every latent (and mixture) site by name; observed sites
    /// use their fixed value regardless of what `params_map` contains.
    /// An unknown distribution lookup or constraint violation contributes
    /// `-inf`, never a panic (§7 "numerical domain issues are silent").
    pub fn log_prob_fn(&self) -> impl Fn(&HashMap<String, f64>, &()) -> f64 + '_ {
        move |ctx: &HashMap<String, f64>, _: &()| self.log_prob(ctx)
    }

    fn log_prob(&self, ctx: &HashMap<String, f64>) -> f64 {
        let mut env = ctx.clone();
        for (name, decl) in &self.declarations {
            if let Declaration::Observe { value: Some(v), .. } = decl {
                env.insert(name.clone(), *v);
            }
        }

        let mut total = 0.0;
        for (name, decl) in &self.declarations {
            let site_value = match env.get(name) {
                Some(v) => *v,
                None => return f64::NEG_INFINITY,
            };
            let term = match decl {
                Declaration::Observe { distribution, params, .. }
                | Declaration::Latent { distribution, params } => {
                    let Some(params) = eval_params(params, &env) else {
                        return f64::NEG_INFINITY;
                    };
                    match self.registry.get(distribution) {
                        Some(dist) if dist.validate(&params) => (dist.log_prob)(site_value, &params),
                        _ => f64::NEG_INFINITY,
                    }
                }
                Declaration::Mixture { components, params } => {
                    let Some(params) = eval_params(params, &env) else {
                        return f64::NEG_INFINITY;
                    };
                    let logs: Vec<f64> = components
                        .components()
                        .iter()
                        .map(|c| match self.registry.get(&c.distribution_name) {
                            Some(dist) if dist.validate(&params) => {
                                c.weight.ln() + (dist.log_prob)(site_value, &params)
                            }
                            _ => f64::NEG_INFINITY,
                        })
                        .collect();
                    log_sum_exp(&logs)
                }
            };
            total += term;
        }
        total
    }

    /// Returns a gradient-log-density callable matching §6's HMC
    /// contract: `(params_map, out_gradients, context) -> logp`, built by
    /// rewriting every `Observe`/`Latent` site whose distribution has a
    /// known autodiff composite (`normal`, `gamma`) into the
    /// corresponding graph primitive and running `backward` per call
    /// (§5: "recreating per iteration is the normal pattern for HMC").
    ///
    /// Fails with `InvalidOperation` at construction time if any declared
    /// site (including mixture sites, which have no single differentiable
    /// composite) uses a distribution without one.
    pub fn grad_log_prob_fn(
        &self,
    ) -> Result<impl Fn(&IndexMap<String, f64>, &mut IndexMap<String, f64>, &()) -> f64 + '_, SeverError>
    {
        let expr = self.differentiable_expr()?;
        let observed: HashMap<String, f64> = self
            .declarations
            .iter()
            .filter_map(|(name, decl)| match decl {
                Declaration::Observe { value: Some(v), .. } => Some((name.clone(), *v)),
                _ => None,
            })
            .collect();

        Ok(move |params: &IndexMap<String, f64>, out: &mut IndexMap<String, f64>, _: &()| {
            let mut env = observed.clone();
            for (k, v) in params {
                env.insert(k.clone(), *v);
            }
            let mut graph = Graph::new();
            let root = match eval_expr(&mut graph, &expr, &env) {
                Ok(r) => r,
                Err(_) => return f64::NEG_INFINITY,
            };
            graph.backward(root);
            for name in params.keys() {
                out.insert(name.clone(), graph.grad_of(name).unwrap_or(0.0));
            }
            graph.value(root)
        })
    }

    fn differentiable_expr(&self) -> Result<Expr, SeverError> {
        let mut terms = Vec::with_capacity(self.declarations.len());
        for (name, decl) in &self.declarations {
            let (distribution, params, value_expr) = match decl {
                Declaration::Observe { distribution, params, value } => (
                    distribution.as_str(),
                    params,
                    Expr::float(value.unwrap_or(0.0)),
                ),
                Declaration::Latent { distribution, params } => {
                    (distribution.as_str(), params, Expr::var(name.clone()))
                }
                Declaration::Mixture { .. } => {
                    return Err(no_composite(name, "mixture"));
                }
            };
            let call_name = match distribution {
                "normal" => "normal_lp",
                "gamma" => "gamma_lp",
                other => return Err(no_composite(name, other)),
            };
            let mut args = vec![value_expr];
            args.extend(params.clone());
            terms.push(Expr::Call { name: call_name.to_string(), args });
        }
        Ok(terms
            .into_iter()
            .reduce(|a, b| Expr::binary(OperatorKind::Add, a, b))
            .expect("declarations checked non-empty in build()"))
    }

    /// Names of every latent (free) site in the model, in declaration order.
    pub fn latent_names(&self) -> Vec<String> {
        self.declarations
            .iter()
            .filter_map(|(name, decl)| match decl {
                Declaration::Observe { .. } => None,
                Declaration::Latent { .. } | Declaration::Mixture { .. } => Some(name.clone()),
            })
            .collect()
    }
}

fn no_composite(site: &str, distribution: &str) -> SeverError {
    SeverError::InvalidOperation(
        ErrorInfo::new(
            "LW006",
            format!("variable '{site}' uses distribution '{distribution}', which has no autodiff composite"),
        )
        .with_hint("use log_prob_fn with MH/VI instead of grad_log_prob_fn with HMC for this model"),
    )
}

fn eval_params(params: &[Expr], env: &HashMap<String, f64>) -> Option<Vec<f64>> {
    params.iter().map(|p| eval_numeric(p, env)).collect()
}

fn eval_numeric(expr: &Expr, env: &HashMap<String, f64>) -> Option<f64> {
    match expr {
        Expr::Literal(Lit::Int(v)) => Some(*v as f64),
        Expr::Literal(Lit::Float(v)) => Some(*v),
        Expr::Literal(Lit::Bool(v)) => Some(if *v { 1.0 } else { 0.0 }),
        Expr::Variable(name) => env.get(name).copied(),
        Expr::Operator { kind, args } => {
            let values: Vec<f64> = args
                .iter()
                .map(|a| eval_numeric(a, env))
                .collect::<Option<_>>()?;
            match (kind, values.as_slice()) {
                (OperatorKind::Add, [a, b]) => Some(a + b),
                (OperatorKind::Sub, [a, b]) => Some(a - b),
                (OperatorKind::Sub, [a]) => Some(-a),
                (OperatorKind::Mul, [a, b]) => Some(a * b),
                (OperatorKind::Div, [a, b]) => Some(a / b),
                _ => None,
            }
        }
        Expr::Call { name, args } => {
            let values: Vec<f64> = args
                .iter()
                .map(|a| eval_numeric(a, env))
                .collect::<Option<_>>()?;
            match (name.as_str(), values.as_slice()) {
                ("log", [a]) => Some(a.ln()),
                ("exp", [a]) => Some(a.exp()),
                ("sin", [a]) => Some(a.sin()),
                ("cos", [a]) => Some(a.cos()),
                ("sqrt", [a]) => Some(a.sqrt()),
                _ => None,
            }
        }
        _ => None,
    }
}

fn log_sum_exp(values: &[f64]) -> f64 {
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sever_expr::Expr;

    #[test]
    fn empty_model_is_invalid() {
        let builder = ModelBuilder::new();
        let err = builder.build(&Registry::new()).unwrap_err();
        assert!(matches!(err, SeverError::InvalidModel(_)));
    }

    #[test]
    fn unknown_distribution_is_invalid_model() {
        let mut builder = ModelBuilder::new();
        builder.latent("x", "frobnormal", vec![Expr::float(0.0), Expr::float(1.0)]);
        let err = builder.build(&Registry::new()).unwrap_err();
        assert!(matches!(err, SeverError::InvalidModel(_)));
    }

    #[test]
    fn observe_without_value_is_invalid_model() {
        let mut builder = ModelBuilder::new();
        builder.observe("y", "normal", vec![Expr::float(0.0), Expr::float(1.0)], None);
        let err = builder.build(&Registry::new()).unwrap_err();
        assert!(matches!(err, SeverError::InvalidModel(_)));
    }

    #[test]
    fn undeclared_parent_reference_is_invalid_model() {
        let mut builder = ModelBuilder::new();
        builder.latent("x", "normal", vec![Expr::var("mu_missing"), Expr::float(1.0)]);
        let err = builder.build(&Registry::new()).unwrap_err();
        assert!(matches!(err, SeverError::InvalidModel(_)));
    }

    #[test]
    fn hierarchical_model_scores_log_prob() {
        let mut builder = ModelBuilder::new();
        builder.latent("mu", "normal", vec![Expr::float(0.0), Expr::float(10.0)]);
        builder.observe(
            "y",
            "normal",
            vec![Expr::var("mu"), Expr::float(1.0)],
            Some(1.5),
        );
        let model = builder.build(&Registry::new()).unwrap();
        let logp_fn = model.log_prob_fn();

        let mut ctx = HashMap::new();
        ctx.insert("mu".to_string(), 1.5);
        let at_mode = logp_fn(&ctx, &());

        ctx.insert("mu".to_string(), 5.0);
        let off_mode = logp_fn(&ctx, &());

        assert!(at_mode > off_mode);
    }

    #[test]
    fn scenario_s5_style_gradient_matches_normal_log_density_derivative() {
        let mut builder = ModelBuilder::new();
        builder.latent("x", "normal", vec![Expr::float(0.0), Expr::float(1.0)]);
        let model = builder.build(&Registry::new()).unwrap();
        let grad_fn = model.grad_log_prob_fn().unwrap();

        let mut params = IndexMap::new();
        params.insert("x".to_string(), 1.0);
        let mut out = IndexMap::new();
        let logp = grad_fn(&params, &mut out, &());

        assert!((logp - (-1.4189385)).abs() < 1e-6);
        assert!((out["x"] - (-1.0)).abs() < 1e-10);
    }

    #[test]
    fn mixture_rejects_unnormalized_weights() {
        let mut builder = ModelBuilder::new();
        let err = builder
            .mixture(
                "z",
                vec![
                    MixtureComponent::new("normal", 0.3),
                    MixtureComponent::new("normal", 0.3),
                ],
                vec![Expr::float(0.0), Expr::float(1.0)],
            )
            .unwrap_err();
        assert!(matches!(err, SeverError::WeightsNotNormalized(_)));
    }

    #[test]
    fn mixture_site_scores_as_logsumexp_of_components() {
        let mut builder = ModelBuilder::new();
        builder
            .mixture(
                "z",
                vec![
                    MixtureComponent::new("normal", 0.5),
                    MixtureComponent::new("normal", 0.5),
                ],
                vec![Expr::float(0.0), Expr::float(1.0)],
            )
            .unwrap();
        let model = builder.build(&Registry::new()).unwrap();
        let logp_fn = model.log_prob_fn();

        let mut ctx = HashMap::new();
        ctx.insert("z".to_string(), 0.0);
        let logp = logp_fn(&ctx, &());
        // Both components are identical Normal(0,1); mixture log-density
        // at the shared mode collapses to the single-component value.
        let expected = sever_autodiff::normal_lp_value(0.0, 0.0, 1.0);
        assert!((logp - expected).abs() < 1e-9, "logp={logp}");
    }

    #[test]
    fn grad_log_prob_fn_rejects_distribution_without_composite() {
        let mut builder = ModelBuilder::new();
        builder.latent("p", "bernoulli", vec![Expr::float(0.5)]);
        let model = builder.build(&Registry::new()).unwrap();
        let err = model.grad_log_prob_fn().err().unwrap();
        assert!(matches!(err, SeverError::InvalidOperation(_)));
    }
}
