#![deny(missing_docs)]
//! Multi-chain convergence diagnostics and trace export for Sever.
//!
//! These operate on finished samplers' traces only (§5: "diagnostics take
//! a read-only list of finished samplers") — this crate never drives a
//! sampler itself, it just reduces several chains'
//! [`sever_mcmc::ParameterTrace`] into a scalar convergence report or a
//! combined CSV export.

/// CSV export for a named collection of parameter traces.
pub mod export;
/// Gelman-Rubin R-hat and multi-chain effective sample size.
pub mod rhat;

pub use export::export_trace_csv;
pub use rhat::{gelman_rubin, multi_chain_ess};
