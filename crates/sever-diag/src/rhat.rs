//! Gelman-Rubin R-hat and multi-chain effective sample size.
//!
//! Both operate on a slice of already-finished chains' traces for one
//! named parameter (§4.H); neither mutates nor re-runs a sampler.

use sever_core::errors::ErrorInfo;
use sever_core::SeverError;
use sever_mcmc::ParameterTrace;

/// Computes the Gelman-Rubin convergence diagnostic R-hat for one
/// parameter across several independent chains.
///
/// Fails with [`SeverError::InsufficientChains`] when fewer than two
/// chains are supplied, and [`SeverError::InsufficientData`] when any
/// supplied chain has fewer than two recorded samples. Chain lengths may
/// differ; the shortest chain's length is used for every chain so that
/// per-chain statistics are computed over comparable windows.
pub fn gelman_rubin(chains: &[&ParameterTrace]) -> Result<f64, SeverError> {
    if chains.len() < 2 {
        return Err(SeverError::InsufficientChains(
            ErrorInfo::new(
                "DG001",
                format!("need at least 2 chains, got {}", chains.len()),
            )
            .with_hint("run a second chain with a distinct seed before computing R-hat"),
        ));
    }
    let n = chains.iter().map(|c| c.len()).min().unwrap_or(0);
    if n < 2 {
        return Err(SeverError::InsufficientData(
            ErrorInfo::new("DG002", format!("shortest chain has {n} samples, need at least 2")),
        ));
    }

    let per_chain_values: Vec<Vec<f64>> = chains
        .iter()
        .map(|c| c.values().into_iter().take(n).collect())
        .collect();

    let n_f = n as f64;
    let m_f = chains.len() as f64;

    let means: Vec<f64> = per_chain_values
        .iter()
        .map(|v| v.iter().sum::<f64>() / n_f)
        .collect();
    let variances: Vec<f64> = per_chain_values
        .iter()
        .zip(&means)
        .map(|(v, mean)| v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n_f - 1.0))
        .collect();

    let grand_mean = means.iter().sum::<f64>() / m_f;
    let between = n_f / (m_f - 1.0)
        * means
            .iter()
            .map(|mean| (mean - grand_mean).powi(2))
            .sum::<f64>();
    let within = variances.iter().sum::<f64>() / m_f;

    let v_hat = (n_f - 1.0) / n_f * within + between / n_f;
    Ok((v_hat / within).sqrt())
}

/// Sums per-chain effective sample size for one parameter across several
/// independent chains (§4.H "Multi-chain ESS").
pub fn multi_chain_ess(chains: &[&ParameterTrace]) -> f64 {
    chains.iter().map(|c| c.effective_sample_size()).sum()
}
