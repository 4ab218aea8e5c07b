//! Random-walk / adaptive-Metropolis sampling kernel.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;
use rand_distr::{Distribution, Normal};
use sever_core::errors::ErrorInfo;
use sever_core::{RngHandle, SeverError};

use crate::bounds::ParameterBounds;
use crate::config::{MhConfig, MhMethod};
use crate::determinism::chain_seed;
use crate::trace::{ParameterStats, ParameterTrace};

/// Log-density callable passed to [`MhSampler::sample`] (§6): maps a
/// parameter-name-to-value map plus caller context to a log-density. A
/// domain violation is represented by returning `-inf`, never a panic.
pub type LogProbFn<C> = dyn Fn(&IndexMap<String, f64>, &C) -> f64;

/// Random-walk / adaptive-Metropolis MCMC sampler over named continuous
/// parameters.
pub struct MhSampler {
    config: MhConfig,
    bounds: IndexMap<String, ParameterBounds>,
    traces: IndexMap<String, ParameterTrace>,
    current: IndexMap<String, f64>,
    current_log_prob: f64,
    best: Option<(IndexMap<String, f64>, f64)>,
    step_size: f64,
    rng: RngHandle,
    accepted_total: usize,
    proposed_total: usize,
    recent_accept_window: Vec<bool>,
}

impl MhSampler {
    /// Constructs a sampler from a configuration, deriving a time-based
    /// seed when `config.seed` is absent.
    pub fn new(config: MhConfig) -> Self {
        let seed = config.seed.unwrap_or_else(time_derived_seed);
        let step_size = config.step_size;
        Self {
            config,
            bounds: IndexMap::new(),
            traces: IndexMap::new(),
            current: IndexMap::new(),
            current_log_prob: f64::NEG_INFINITY,
            best: None,
            step_size,
            rng: RngHandle::from_seed(seed),
            accepted_total: 0,
            proposed_total: 0,
            recent_accept_window: Vec::new(),
        }
    }

    /// Registers a bound pair for a named parameter.
    pub fn set_parameter_bounds(&mut self, name: impl Into<String>, bounds: ParameterBounds) {
        self.bounds.insert(name.into(), bounds);
    }

    /// Initializes a parameter's starting value and creates its trace.
    /// A non-finite initial log-density (computed lazily on the first
    /// `sample` call) is permitted; the first accepted proposal replaces it.
    pub fn init_parameter(&mut self, name: impl Into<String>, initial: f64) {
        let name = name.into();
        self.current.insert(name.clone(), initial);
        self.traces.entry(name).or_insert_with(ParameterTrace::new);
    }

    /// Runs the full sampling loop against the supplied log-density callable.
    ///
    /// Unimplemented methods (`gibbs`, `hamiltonian`, `nuts`, `slice`)
    /// return [`SeverError::NotImplemented`] immediately.
    pub fn sample<F, C>(&mut self, log_prob_fn: F, context: &C) -> Result<(), SeverError>
    where
        F: Fn(&IndexMap<String, f64>, &C) -> f64,
    {
        match self.config.method {
            MhMethod::MetropolisHastings | MhMethod::AdaptiveMetropolis => {}
            other => {
                return Err(SeverError::NotImplemented(
                    ErrorInfo::new(
                        "MC001",
                        format!("method {other:?} is not implemented by the MH sampler"),
                    )
                    .with_hint("use metropolis_hastings or adaptive_metropolis"),
                ));
            }
        }

        self.current_log_prob = log_prob_fn(&self.current, context);
        self.best = Some((self.current.clone(), self.current_log_prob));

        let total_iterations = self.config.burnin + self.config.num_samples;
        let names: Vec<String> = self.current.keys().cloned().collect();
        let dimension = names.len().max(1);

        for iteration in 0..total_iterations {
            let in_burnin = iteration < self.config.burnin;
            let proposal = self.propose(&names, dimension);
            let clamped = self.clamp_to_bounds(proposal);
            let candidate_log_prob = log_prob_fn(&clamped, context);

            let accept_log_ratio = candidate_log_prob - self.current_log_prob;
            let accept =
                accept_log_ratio >= 0.0 || self.rng_uniform() < accept_log_ratio.exp();

            if accept {
                self.current = clamped;
                self.current_log_prob = candidate_log_prob;
                let best_so_far = self.best.as_ref().map(|(_, lp)| *lp).unwrap_or(f64::NEG_INFINITY);
                if candidate_log_prob > best_so_far {
                    self.best = Some((self.current.clone(), candidate_log_prob));
                }
            }

            self.proposed_total += 1;
            if accept {
                self.accepted_total += 1;
            }
            self.recent_accept_window.push(accept);

            if !in_burnin {
                let post_burnin_index = iteration - self.config.burnin;
                if post_burnin_index % self.config.thin.max(1) == 0 {
                    for name in &names {
                        let value = self.current[name];
                        self.traces.get_mut(name).unwrap().push(
                            value,
                            accept,
                            self.current_log_prob,
                        );
                    }
                }
            }

            if in_burnin && self.config.adapt_step_size && (iteration + 1) % 50 == 0 {
                self.adapt_step_size();
            }
        }

        Ok(())
    }

    fn propose(&mut self, names: &[String], dimension: usize) -> IndexMap<String, f64> {
        let mut proposal = self.current.clone();
        for name in names {
            let sigma = self.proposal_sigma(name, dimension);
            let normal = Normal::new(0.0, sigma.max(1e-12)).expect("sigma validated positive");
            let delta = normal.sample(self.rng.inner_mut());
            *proposal.get_mut(name).unwrap() += delta;
        }
        proposal
    }

    fn proposal_sigma(&self, name: &str, dimension: usize) -> f64 {
        if self.config.method != MhMethod::AdaptiveMetropolis {
            return self.step_size;
        }
        let trace = match self.traces.get(name) {
            Some(t) => t,
            None => return self.step_size,
        };
        if trace.len() < 10 {
            return self.step_size;
        }
        let stats = trace.stats();
        stats.variance.sqrt() * 2.38 / (dimension as f64).sqrt()
    }

    fn clamp_to_bounds(&self, mut proposal: IndexMap<String, f64>) -> IndexMap<String, f64> {
        for (name, value) in proposal.iter_mut() {
            if let Some(bounds) = self.bounds.get(name) {
                *value = bounds.constrain(*value);
            }
        }
        proposal
    }

    fn adapt_step_size(&mut self) {
        let window = &self.recent_accept_window;
        let recent = &window[window.len().saturating_sub(50)..];
        let rate = recent.iter().filter(|a| **a).count() as f64 / recent.len() as f64;
        let target = self.config.target_accept_rate;
        if rate < target - 0.05 {
            self.step_size *= 0.9;
        } else if rate > target + 0.05 {
            self.step_size *= 1.1;
        }
    }

    fn rng_uniform(&mut self) -> f64 {
        use rand::Rng;
        self.rng.inner_mut().gen::<f64>()
    }

    /// The trace recorded for a named parameter.
    pub fn get_trace(&self, name: &str) -> Option<&ParameterTrace> {
        self.traces.get(name)
    }

    /// Summary statistics for a named parameter's trace.
    pub fn get_parameter_stats(&self, name: &str) -> Option<ParameterStats> {
        self.traces.get(name).map(ParameterTrace::stats)
    }

    /// Overall acceptance rate across every proposal in the run.
    pub fn get_acceptance_rate(&self) -> f64 {
        if self.proposed_total == 0 {
            return 0.0;
        }
        self.accepted_total as f64 / self.proposed_total as f64
    }

    /// Effective sample size for a named parameter's trace.
    pub fn get_effective_sample_size(&self, name: &str) -> Option<f64> {
        self.traces
            .get(name)
            .map(ParameterTrace::effective_sample_size)
    }

    /// The current proposal step size (post-adaptation, if enabled).
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// The best (highest log-density) state observed so far.
    pub fn best_state(&self) -> Option<(&IndexMap<String, f64>, f64)> {
        self.best.as_ref().map(|(state, lp)| (state, *lp))
    }

    /// Writes every parameter's trace to `writer` as CSV, per §4.H /
    /// §6's persisted trace format: `iteration,<param>,...,log_prob,accepted`.
    pub fn export_trace<W: Write>(&self, writer: W) -> Result<(), SeverError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let names: Vec<&String> = self.traces.keys().collect();
        let mut header = vec!["iteration".to_string()];
        header.extend(names.iter().map(|n| n.to_string()));
        header.push("log_prob".to_string());
        header.push("accepted".to_string());
        wtr.write_record(&header)
            .map_err(|e| io_error(e.to_string()))?;

        let len = names
            .first()
            .and_then(|n| self.traces.get(*n))
            .map(ParameterTrace::len)
            .unwrap_or(0);

        for i in 0..len {
            let mut row = vec![i.to_string()];
            let mut log_prob = 0.0;
            let mut accepted = false;
            for name in &names {
                let entry = self.traces[*name].entries()[i];
                row.push(entry.value.to_string());
                log_prob = entry.log_prob;
                accepted = entry.accepted;
            }
            row.push(log_prob.to_string());
            row.push(accepted.to_string());
            wtr.write_record(&row).map_err(|e| io_error(e.to_string()))?;
        }
        wtr.flush().map_err(|e| io_error(e.to_string()))?;
        Ok(())
    }

    /// Snapshot of the current per-parameter state, for diagnostics that
    /// compare in-progress chains.
    pub fn current_state(&self) -> BTreeMap<String, f64> {
        self.current.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}

fn io_error(message: impl Into<String>) -> SeverError {
    SeverError::IoError(ErrorInfo::new("MC010", message.into()))
}

fn time_derived_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Runs `config.parallel_chains` independent [`MhSampler`] instances to
/// completion, one after another (§5: no inter-chain swap protocol, no
/// shared mutable state). Each chain gets its own deterministic seed via
/// [`chain_seed`], derived from a shared master seed so the whole run is
/// reproducible from `config.seed` alone even though every chain explores
/// its own substream (§5 "no shared global RNG for parallel chains").
///
/// Every chain is initialized identically from `init`/`bounds` before
/// sampling. The returned samplers are read-only from the caller's
/// perspective and meant to be handed to `sever-diag`'s R-hat/multi-chain
/// ESS routines.
pub fn run_chains<F, C>(
    config: &MhConfig,
    init: &IndexMap<String, f64>,
    bounds: &IndexMap<String, ParameterBounds>,
    log_prob_fn: F,
    context: &C,
) -> Result<Vec<MhSampler>, SeverError>
where
    F: Fn(&IndexMap<String, f64>, &C) -> f64,
{
    let master_seed = config.seed.unwrap_or_else(time_derived_seed);
    let num_chains = config.parallel_chains.max(1);
    let mut chains = Vec::with_capacity(num_chains);

    for chain_index in 0..num_chains {
        let mut chain_config = config.clone();
        chain_config.seed = Some(chain_seed(master_seed, chain_index));
        let mut sampler = MhSampler::new(chain_config);
        for (name, value) in init {
            sampler.init_parameter(name.clone(), *value);
        }
        for (name, b) in bounds {
            sampler.set_parameter_bounds(name.clone(), *b);
        }
        sampler.sample(&log_prob_fn, context)?;
        chains.push(sampler);
    }

    Ok(chains)
}
