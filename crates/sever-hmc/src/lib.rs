#![deny(missing_docs)]
//! Leapfrog Hamiltonian Monte Carlo sampler for Sever.

/// Sampler configuration schema.
pub mod config;
/// The leapfrog sampling kernel itself.
pub mod kernel;

pub use config::HmcConfig;
pub use kernel::{GradLogProbFn, HmcSampler};
