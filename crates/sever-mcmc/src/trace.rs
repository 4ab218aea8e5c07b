//! Per-parameter sample trace and its derived statistics.

use serde::{Deserialize, Serialize};

/// One recorded step of a parameter's trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// The parameter's value at this step.
    pub value: f64,
    /// Whether the proposal that produced this step was accepted.
    pub accepted: bool,
    /// The log-density of the full state at this step.
    pub log_prob: f64,
}

/// Summary statistics derived from a [`ParameterTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStats {
    /// Sample mean.
    pub mean: f64,
    /// Sample variance (population, matching §4.E's adaptive-scale formula).
    pub variance: f64,
    /// Minimum recorded value.
    pub min: f64,
    /// Maximum recorded value.
    pub max: f64,
    /// Fraction of recorded steps with `accepted = true`.
    pub acceptance_rate: f64,
}

/// Ordered recording of one parameter's sampled values across a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterTrace {
    entries: Vec<TraceEntry>,
}

impl ParameterTrace {
    /// An empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one recorded step.
    pub fn push(&mut self, value: f64, accepted: bool, log_prob: f64) {
        self.entries.push(TraceEntry {
            value,
            accepted,
            log_prob,
        });
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no steps have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The recorded entries, in recording order.
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Recorded values only, in recording order.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    /// Computes mean/variance/min/max/acceptance-rate over the recorded entries.
    ///
    /// Returns all zeros (and an empty-range min/max of 0.0) if the trace
    /// is empty; callers are expected to check `is_empty` first in
    /// practice (a sampler never reads stats before its first recorded
    /// step).
    pub fn stats(&self) -> ParameterStats {
        if self.entries.is_empty() {
            return ParameterStats {
                mean: 0.0,
                variance: 0.0,
                min: 0.0,
                max: 0.0,
                acceptance_rate: 0.0,
            };
        }
        let n = self.entries.len() as f64;
        let mean = self.entries.iter().map(|e| e.value).sum::<f64>() / n;
        let variance = self
            .entries
            .iter()
            .map(|e| (e.value - mean).powi(2))
            .sum::<f64>()
            / n;
        let min = self
            .entries
            .iter()
            .map(|e| e.value)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .entries
            .iter()
            .map(|e| e.value)
            .fold(f64::NEG_INFINITY, f64::max);
        let accepted = self.entries.iter().filter(|e| e.accepted).count() as f64;
        ParameterStats {
            mean,
            variance,
            min,
            max,
            acceptance_rate: accepted / n,
        }
    }

    /// Effective sample size via truncated-autocorrelation estimation
    /// (§4.E, Glossary "Effective sample size"):
    ///
    /// `ESS = n / max(1, 1 + 2 * sum_k rho(k))`, accumulating `rho(k)`
    /// until `|rho(k)| < 0.05` or `k > min(n/4, 100)`.
    ///
    /// Returns `1.0` when the trace has zero variance (Testable Property
    /// 7's documented edge case), and `0.0` for an empty trace.
    pub fn effective_sample_size(&self) -> f64 {
        let n = self.entries.len();
        if n == 0 {
            return 0.0;
        }
        let values = self.values();
        let mean = values.iter().sum::<f64>() / n as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        if variance == 0.0 {
            return 1.0;
        }

        let max_lag = ((n / 4).min(100)).max(1);
        let mut sum = 1.0;
        for k in 1..=max_lag {
            let rho = autocorrelation(&values, mean, variance, k);
            if rho.abs() < 0.05 {
                break;
            }
            sum += 2.0 * rho;
        }
        n as f64 / sum.max(1.0)
    }
}

fn autocorrelation(values: &[f64], mean: f64, variance: f64, lag: usize) -> f64 {
    let n = values.len();
    if lag >= n {
        return 0.0;
    }
    let cov: f64 = (0..n - lag)
        .map(|i| (values[i] - mean) * (values[i + lag] - mean))
        .sum::<f64>()
        / n as f64;
    cov / variance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_reflect_pushed_entries() {
        let mut trace = ParameterTrace::new();
        trace.push(1.0, true, 0.0);
        trace.push(2.0, false, -1.0);
        trace.push(3.0, true, -2.0);
        let stats = trace.stats();
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.acceptance_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn testable_property_7_ess_of_constant_trace_is_one() {
        let mut trace = ParameterTrace::new();
        for _ in 0..50 {
            trace.push(5.0, true, 0.0);
        }
        assert_eq!(trace.effective_sample_size(), 1.0);
    }

    #[test]
    fn testable_property_7_ess_is_between_zero_and_trace_length() {
        let mut trace = ParameterTrace::new();
        let mut x = 0.0_f64;
        for i in 0..500 {
            // deterministic pseudo-noise, not actually random but varied
            x = (x * 1.0001 + (i as f64).sin()).fract() * 10.0;
            trace.push(x, true, 0.0);
        }
        let ess = trace.effective_sample_size();
        assert!(ess > 0.0);
        assert!(ess <= trace.len() as f64 + 1e-9);
    }
}
